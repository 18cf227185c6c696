use std::collections::{BTreeMap, BTreeSet};

use log::{info, warn};

use super::model::{
    AgeGroup, CellValue, DatasetStats, DeliveryRecord, DerivedTable, Dimension, Table, AGENT_AGE,
    AGENT_RATING, DELIVERY_TIME, UNKNOWN,
};
use super::stats;
use crate::error::{DashboardError, Result};

/// Label that disables the filter for a dimension.
pub const ALL: &str = "All";

/// Build the derived table from a raw table. The input is left untouched.
///
/// Steps run in a fixed order since later ones read earlier fills:
/// 1. null categoricals → `"Unknown"`
/// 2. null Agent_Rating → mean of the non-null ratings
/// 3. null Agent_Age → median of the non-null ages
/// 4. mean and sample std of Delivery_Time
/// 5. `Is_Late = Delivery_Time > mean + std`
/// 6. Agent_Age_Group bucket
pub fn derive(table: &Table) -> Result<DerivedTable> {
    if !table.has_column(DELIVERY_TIME) {
        return Err(DashboardError::Schema(format!(
            "required column '{DELIVERY_TIME}' is missing"
        )));
    }

    let dimensions: Vec<Dimension> = Dimension::ALL
        .into_iter()
        .filter(|d| table.has_column(d.column_name()))
        .collect();

    let delivery_times = numeric_column(table, DELIVERY_TIME)?;

    let ratings = if table.has_column(AGENT_RATING) {
        Some(numeric_column(table, AGENT_RATING)?)
    } else {
        warn!("column '{AGENT_RATING}' is missing; ratings left empty");
        None
    };
    let rating_fill = ratings.as_deref().and_then(observed_mean);
    let ratings = ratings.map(|col| fill_nulls(col, rating_fill));

    let (ages, age_fill) = if table.has_column(AGENT_AGE) {
        impute_ages(table)
    } else {
        warn!("column '{AGENT_AGE}' is missing; age groups left empty");
        (vec![AgeCell::Missing; table.len()], None)
    };

    let observed: Vec<f64> = delivery_times.iter().flatten().copied().collect();
    let avg_delivery_time = stats::mean(&observed);
    let std_delivery_time = stats::sample_std(&observed);
    let late_threshold = avg_delivery_time.zip(std_delivery_time).map(|(m, s)| m + s);

    let mut invalid_ages = 0;
    let mut records = Vec::with_capacity(table.len());
    for row in 0..table.len() {
        let category = |dim: Dimension| -> Option<String> {
            dimensions.contains(&dim).then(|| {
                table
                    .cell(row, dim.column_name())
                    .as_category()
                    .unwrap_or_else(|| UNKNOWN.to_string())
            })
        };

        let delivery_time = delivery_times[row];
        let is_late = match (delivery_time, late_threshold) {
            (Some(t), Some(threshold)) => t > threshold,
            _ => false,
        };

        let (agent_age, agent_age_group) = match age_group(row, &ages[row]) {
            Ok(bucketed) => bucketed,
            Err(err) => {
                warn!("{err}; row excluded from age grouping");
                invalid_ages += 1;
                (None, None)
            }
        };

        records.push(DeliveryRecord {
            weather: category(Dimension::Weather),
            traffic: category(Dimension::Traffic),
            vehicle: category(Dimension::Vehicle),
            area: category(Dimension::Area),
            category: category(Dimension::Category),
            agent_rating: ratings.as_ref().and_then(|col| col[row]),
            agent_age,
            delivery_time,
            is_late,
            agent_age_group,
        });
    }

    let late_percentage = late_rate(&records);

    let options = dimensions
        .iter()
        .map(|&dim| (dim, option_list(&records, dim)))
        .collect();

    let stats = DatasetStats {
        avg_delivery_time,
        std_delivery_time,
        late_threshold,
        late_percentage,
        rating_fill,
        age_fill,
        invalid_ages,
    };
    info!(
        "derived {} rows: late threshold {:?}, late {:?}%",
        records.len(),
        stats.late_threshold,
        stats.late_percentage
    );

    Ok(DerivedTable {
        records,
        stats,
        dimensions,
        options,
    })
}

/// `100 × mean(is_late)`, `None` for no rows.
pub(crate) fn late_rate<'a, I>(records: I) -> Option<f64>
where
    I: IntoIterator<Item = &'a DeliveryRecord>,
{
    let (late, n) = records
        .into_iter()
        .fold((0usize, 0usize), |(late, n), r| (late + r.is_late as usize, n + 1));
    (n > 0).then(|| late as f64 / n as f64 * 100.0)
}

/// Read a numeric column. Nulls stay `None`; any other non-number is rejected.
fn numeric_column(table: &Table, column: &str) -> Result<Vec<Option<f64>>> {
    (0..table.len())
        .map(|row| {
            let cell = table.cell(row, column);
            match cell {
                CellValue::Null => Ok(None),
                other => other
                    .as_f64()
                    .map(Some)
                    .ok_or_else(|| DashboardError::InvalidNumber {
                        column: column.to_string(),
                        row,
                        value: other.to_string(),
                    }),
            }
        })
        .collect()
}

fn observed_mean(values: &[Option<f64>]) -> Option<f64> {
    let observed: Vec<f64> = values.iter().flatten().copied().collect();
    stats::mean(&observed)
}

fn fill_nulls(values: Vec<Option<f64>>, fill: Option<f64>) -> Vec<Option<f64>> {
    values.into_iter().map(|v| v.or(fill)).collect()
}

/// An Agent_Age cell after imputation.
#[derive(Debug, Clone, PartialEq)]
enum AgeCell {
    Numeric(f64),
    /// Null with nothing to impute from, or the column is absent.
    Missing,
    /// Survived imputation without being a number.
    Invalid(String),
}

/// Fill null ages with the median of the numeric ones.
fn impute_ages(table: &Table) -> (Vec<AgeCell>, Option<f64>) {
    let observed: Vec<f64> = (0..table.len())
        .filter_map(|row| table.cell(row, AGENT_AGE).as_f64())
        .collect();
    let fill = stats::median(&observed);

    let cells = (0..table.len())
        .map(|row| match table.cell(row, AGENT_AGE) {
            CellValue::Null => fill.map_or(AgeCell::Missing, AgeCell::Numeric),
            other => other
                .as_f64()
                .map_or_else(|| AgeCell::Invalid(other.to_string()), AgeCell::Numeric),
        })
        .collect();
    (cells, fill)
}

fn age_group(row: usize, cell: &AgeCell) -> Result<(Option<f64>, Option<AgeGroup>)> {
    match cell {
        AgeCell::Numeric(age) => Ok((Some(*age), AgeGroup::from_age(*age))),
        AgeCell::Missing => Ok((None, None)),
        AgeCell::Invalid(value) => Err(DashboardError::InvalidAge {
            row,
            value: value.clone(),
        }),
    }
}

/// `"All"` followed by the sorted distinct values of `dim`.
fn option_list(records: &[DeliveryRecord], dim: Dimension) -> Vec<String> {
    let distinct: BTreeSet<&str> = records.iter().filter_map(|r| r.dimension(dim)).collect();
    std::iter::once(ALL.to_string())
        .chain(distinct.into_iter().map(str::to_string))
        .collect()
}

/// Grouping of option lists by dimension, for display.
pub fn options_by_column(table: &DerivedTable) -> BTreeMap<&'static str, &[String]> {
    table
        .dimensions
        .iter()
        .map(|&dim| (dim.column_name(), table.filter_options(dim)))
        .collect()
}

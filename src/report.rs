//! Hand-off to the presentation layer: KPIs plus one summary table per chart,
//! as JSON or as plain-text tables.

use std::fmt::Write as _;
use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Array, StringArray, UInt64Array};
use arrow::datatypes::{Field, Schema};
use arrow::error::ArrowError;
use arrow::record_batch::RecordBatch;
use arrow::util::pretty::pretty_format_batches;
use serde::Serialize;

use crate::data::aggregate::{
    self, CategorySummary, CategoryTime, GroupMean, Kpis, LateRate, RatingPoint,
    WeatherTrafficMean,
};
use crate::data::filter::{FilterSelection, FilteredView, Selection};
use crate::data::model::Dimension;

/// Chart titles, in display order.
pub const CHARTS: [(&str, &str); 6] = [
    ("Delay Analyzer", "Avg Time by Weather & Traffic"),
    ("Vehicle Comparison", "Avg Time by Vehicle"),
    ("Agent Performance", "Delivery Time vs Rating"),
    ("Area Heatmap", "Avg Time by Area"),
    ("Category Visualizer", "Time Dist. by Category"),
    ("Late by Weather", "% Late Deliveries (Weather)"),
];

const NO_DATA: &str = "no data";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardReport {
    pub selection: Vec<(Dimension, Selection)>,
    pub kpis: Kpis,
    pub mean_by_weather_traffic: Vec<WeatherTrafficMean>,
    pub mean_by_vehicle: Vec<GroupMean>,
    pub rating_vs_time: Vec<RatingPoint>,
    pub mean_by_area: Vec<GroupMean>,
    pub time_dist_by_category: Vec<CategoryTime>,
    pub category_summary: Vec<CategorySummary>,
    pub late_rate_by_weather: Vec<LateRate>,
}

impl DashboardReport {
    pub fn build(view: &FilteredView<'_>, selection: &FilterSelection) -> Self {
        let selection = Dimension::ALL
            .iter()
            .map(|d| (*d, selection.get(d).cloned().unwrap_or_default()))
            .collect();
        DashboardReport {
            selection,
            kpis: aggregate::kpis(view),
            mean_by_weather_traffic: aggregate::mean_by_weather_traffic(view),
            mean_by_vehicle: aggregate::mean_by_vehicle(view),
            rating_vs_time: aggregate::rating_vs_time(view),
            mean_by_area: aggregate::mean_by_area(view),
            time_dist_by_category: aggregate::time_dist_by_category(view),
            category_summary: aggregate::describe_by_category(view),
            late_rate_by_weather: aggregate::late_rate_by_weather(view),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// KPI cards followed by one table per chart.
    pub fn to_text(&self) -> anyhow::Result<String> {
        let mut out = String::new();
        let k = &self.kpis;
        writeln!(out, "Average Delivery Time : {} mins", fmt_opt(k.avg_delivery_time))?;
        writeln!(out, "% Late Deliveries     : {}%", fmt_opt(k.late_percentage))?;
        writeln!(out, "Records (Filtered)    : {}", k.filtered_records)?;

        let batches = [
            weather_traffic_batch(&self.mean_by_weather_traffic)?,
            group_mean_batch("Vehicle", &self.mean_by_vehicle)?,
            rating_batch(&self.rating_vs_time)?,
            group_mean_batch("Area", &self.mean_by_area)?,
            category_summary_batch(&self.category_summary)?,
            late_rate_batch(&self.late_rate_by_weather)?,
        ];
        for ((card, title), batch) in CHARTS.iter().zip(batches) {
            writeln!(out, "\n== {card}: {title}")?;
            if batch.num_rows() == 0 {
                writeln!(out, "{NO_DATA}")?;
            } else {
                writeln!(out, "{}", pretty_format_batches(&[batch])?)?;
            }
        }
        Ok(out)
    }
}

fn fmt_opt(v: Option<f64>) -> String {
    v.map_or_else(|| NO_DATA.to_string(), |v| format!("{v:.2}"))
}

// ---------------------------------------------------------------------------
// Arrow batches for text rendering
// ---------------------------------------------------------------------------

fn batch(columns: Vec<(&str, ArrayRef)>) -> Result<RecordBatch, ArrowError> {
    let fields: Vec<Field> = columns
        .iter()
        .map(|(name, arr)| Field::new(*name, arr.data_type().clone(), true))
        .collect();
    let arrays = columns.into_iter().map(|(_, arr)| arr).collect();
    RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays)
}

fn strings<'a>(values: impl Iterator<Item = &'a str>) -> ArrayRef {
    Arc::new(StringArray::from_iter_values(values))
}

fn floats(values: impl Iterator<Item = Option<f64>>) -> ArrayRef {
    Arc::new(Float64Array::from_iter(values))
}

fn weather_traffic_batch(rows: &[WeatherTrafficMean]) -> Result<RecordBatch, ArrowError> {
    batch(vec![
        ("Weather", strings(rows.iter().map(|r| r.weather.as_str()))),
        ("Traffic", strings(rows.iter().map(|r| r.traffic.as_str()))),
        ("Delivery_Time", floats(rows.iter().map(|r| r.mean_delivery_time))),
    ])
}

fn group_mean_batch(key: &str, rows: &[GroupMean]) -> Result<RecordBatch, ArrowError> {
    batch(vec![
        (key, strings(rows.iter().map(|r| r.group.as_str()))),
        ("Delivery_Time", floats(rows.iter().map(|r| r.mean_delivery_time))),
    ])
}

fn rating_batch(rows: &[RatingPoint]) -> Result<RecordBatch, ArrowError> {
    let groups: ArrayRef = Arc::new(StringArray::from_iter(
        rows.iter().map(|r| r.agent_age_group.map(|g| g.label())),
    ));
    batch(vec![
        ("Agent_Rating", floats(rows.iter().map(|r| r.agent_rating))),
        ("Delivery_Time", floats(rows.iter().map(|r| r.delivery_time))),
        ("Agent_Age_Group", groups),
    ])
}

fn category_summary_batch(rows: &[CategorySummary]) -> Result<RecordBatch, ArrowError> {
    let counts: ArrayRef = Arc::new(UInt64Array::from_iter_values(
        rows.iter().map(|r| r.count as u64),
    ));
    batch(vec![
        ("Category", strings(rows.iter().map(|r| r.category.as_str()))),
        ("count", counts),
        ("mean", floats(rows.iter().map(|r| r.mean))),
        ("std", floats(rows.iter().map(|r| r.std))),
        ("min", floats(rows.iter().map(|r| r.min))),
        ("25%", floats(rows.iter().map(|r| r.q1))),
        ("50%", floats(rows.iter().map(|r| r.median))),
        ("75%", floats(rows.iter().map(|r| r.q3))),
        ("max", floats(rows.iter().map(|r| r.max))),
    ])
}

fn late_rate_batch(rows: &[LateRate]) -> Result<RecordBatch, ArrowError> {
    batch(vec![
        ("Weather", strings(rows.iter().map(|r| r.weather.as_str()))),
        ("Late_%", floats(rows.iter().map(|r| Some(r.late_pct)))),
    ])
}

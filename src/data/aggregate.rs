//! Chart-feeding summaries over a filtered view.
//!
//! Group-by results are ordered by key and only contain keys that occur in
//! the view; an empty view yields empty results.

use std::collections::BTreeMap;

use serde::Serialize;

use super::derive::late_rate;
use super::filter::FilteredView;
use super::model::{AgeGroup, DeliveryRecord, Dimension};
use super::stats;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeatherTrafficMean {
    pub weather: String,
    pub traffic: String,
    pub mean_delivery_time: Option<f64>,
}

/// Mean delivery time of one group. `None` when every time in it is null.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupMean {
    pub group: String,
    pub mean_delivery_time: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RatingPoint {
    pub agent_rating: Option<f64>,
    pub delivery_time: Option<f64>,
    pub agent_age_group: Option<AgeGroup>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryTime {
    pub category: String,
    pub delivery_time: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LateRate {
    pub weather: String,
    /// Fraction of late rows in the group.
    pub is_late: f64,
    pub late_pct: f64,
}

/// Box-plot summary of Delivery_Time for one Category.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategorySummary {
    pub category: String,
    /// Rows with a non-null delivery time.
    pub count: usize,
    pub mean: Option<f64>,
    pub std: Option<f64>,
    pub min: Option<f64>,
    pub q1: Option<f64>,
    pub median: Option<f64>,
    pub q3: Option<f64>,
    pub max: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Kpis {
    /// Full-table mean; unaffected by filters.
    pub avg_delivery_time: Option<f64>,
    /// Full-table late percentage; unaffected by filters.
    pub late_percentage: Option<f64>,
    pub filtered_records: usize,
    pub filtered_avg_delivery_time: Option<f64>,
    pub filtered_late_percentage: Option<f64>,
}

#[derive(Default)]
struct MeanAcc {
    sum: f64,
    n: usize,
}

impl MeanAcc {
    fn push(&mut self, value: Option<f64>) {
        if let Some(v) = value.filter(|v| !v.is_nan()) {
            self.sum += v;
            self.n += 1;
        }
    }

    fn mean(&self) -> Option<f64> {
        (self.n > 0).then(|| self.sum / self.n as f64)
    }
}

fn group_mean<'a, K, F>(view: &FilteredView<'a>, key: F) -> BTreeMap<K, Option<f64>>
where
    K: Ord,
    F: Fn(&'a DeliveryRecord) -> Option<K>,
{
    let mut groups: BTreeMap<K, MeanAcc> = BTreeMap::new();
    for rec in view.rows() {
        if let Some(k) = key(rec) {
            groups.entry(k).or_default().push(rec.delivery_time);
        }
    }
    groups.into_iter().map(|(k, acc)| (k, acc.mean())).collect()
}

fn mean_by(view: &FilteredView<'_>, dim: Dimension) -> Vec<GroupMean> {
    group_mean(view, |r| r.dimension(dim))
        .into_iter()
        .map(|(group, mean)| GroupMean {
            group: group.to_string(),
            mean_delivery_time: mean,
        })
        .collect()
}

/// Grouped-bar chart: mean delivery time per (Weather, Traffic).
pub fn mean_by_weather_traffic(view: &FilteredView<'_>) -> Vec<WeatherTrafficMean> {
    group_mean(view, |r| r.weather.as_deref().zip(r.traffic.as_deref()))
        .into_iter()
        .map(|((weather, traffic), mean)| WeatherTrafficMean {
            weather: weather.to_string(),
            traffic: traffic.to_string(),
            mean_delivery_time: mean,
        })
        .collect()
}

pub fn mean_by_vehicle(view: &FilteredView<'_>) -> Vec<GroupMean> {
    mean_by(view, Dimension::Vehicle)
}

pub fn mean_by_area(view: &FilteredView<'_>) -> Vec<GroupMean> {
    mean_by(view, Dimension::Area)
}

/// Scatter points, one per row.
pub fn rating_vs_time(view: &FilteredView<'_>) -> Vec<RatingPoint> {
    view.rows()
        .map(|r| RatingPoint {
            agent_rating: r.agent_rating,
            delivery_time: r.delivery_time,
            agent_age_group: r.agent_age_group,
        })
        .collect()
}

/// Box-plot input, one per row that has a Category.
pub fn time_dist_by_category(view: &FilteredView<'_>) -> Vec<CategoryTime> {
    view.rows()
        .filter_map(|r| {
            r.category.as_ref().map(|c| CategoryTime {
                category: c.clone(),
                delivery_time: r.delivery_time,
            })
        })
        .collect()
}

/// Percentage of late rows per Weather.
pub fn late_rate_by_weather(view: &FilteredView<'_>) -> Vec<LateRate> {
    let mut groups: BTreeMap<&str, Vec<&DeliveryRecord>> = BTreeMap::new();
    for rec in view.rows() {
        if let Some(w) = rec.weather.as_deref() {
            groups.entry(w).or_default().push(rec);
        }
    }
    groups
        .into_iter()
        .filter_map(|(weather, recs)| {
            late_rate(recs).map(|pct| LateRate {
                weather: weather.to_string(),
                is_late: pct / 100.0,
                late_pct: pct,
            })
        })
        .collect()
}

/// Describe-style statistics of Delivery_Time per Category.
pub fn describe_by_category(view: &FilteredView<'_>) -> Vec<CategorySummary> {
    let mut groups: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    for rec in view.rows() {
        if let Some(c) = rec.category.as_deref() {
            let times = groups.entry(c).or_default();
            times.extend(rec.delivery_time);
        }
    }
    groups
        .into_iter()
        .map(|(category, times)| CategorySummary {
            category: category.to_string(),
            count: times.len(),
            mean: stats::mean(&times),
            std: stats::sample_std(&times),
            min: stats::quantile(&times, 0.0),
            q1: stats::quantile(&times, 0.25),
            median: stats::median(&times),
            q3: stats::quantile(&times, 0.75),
            max: stats::quantile(&times, 1.0),
        })
        .collect()
}

/// Headline numbers. The full-table figures come from the derived stats.
pub fn kpis(view: &FilteredView<'_>) -> Kpis {
    let mut acc = MeanAcc::default();
    for rec in view.rows() {
        acc.push(rec.delivery_time);
    }
    Kpis {
        avg_delivery_time: view.table.stats.avg_delivery_time,
        late_percentage: view.table.stats.late_percentage,
        filtered_records: view.len(),
        filtered_avg_delivery_time: acc.mean(),
        filtered_late_percentage: late_rate(view.rows()),
    }
}

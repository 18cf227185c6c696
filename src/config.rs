use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::data::filter::{FilterSelection, Selection};
use crate::data::model::Dimension;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "delivery-dashboard")]
#[command(about = "Last-mile delivery performance: KPIs and chart tables for a filtered view")]
pub struct Args {
    /// Delivery dataset (.csv, .tsv, .json or .parquet)
    #[arg(long, env = "DASHBOARD_DATA", default_value = "cleaned_delivery_data.csv")]
    pub data: PathBuf,

    #[arg(long, default_value = "All")]
    pub weather: String,

    #[arg(long, default_value = "All")]
    pub traffic: String,

    #[arg(long, default_value = "All")]
    pub vehicle: String,

    #[arg(long, default_value = "All")]
    pub area: String,

    #[arg(long, default_value = "All")]
    pub category: String,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Print the filter choices for each column and exit
    #[arg(long)]
    pub options: bool,
}

impl Args {
    /// The five single-select inputs as a filter selection.
    pub fn selection(&self) -> FilterSelection {
        [
            (Dimension::Weather, &self.weather),
            (Dimension::Traffic, &self.traffic),
            (Dimension::Vehicle, &self.vehicle),
            (Dimension::Area, &self.area),
            (Dimension::Category, &self.category),
        ]
        .into_iter()
        .map(|(dim, raw)| (dim, Selection::parse(raw)))
        .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_select_everything() {
        let args = Args::parse_from(["delivery-dashboard"]);
        assert_eq!(args.format, OutputFormat::Text);
        assert!(args.selection().values().all(|s| *s == Selection::All));
    }

    #[test]
    fn flags_become_exact_selections() {
        let args = Args::parse_from([
            "delivery-dashboard",
            "--data",
            "d.csv",
            "--vehicle",
            "motorcycle",
            "--format",
            "json",
        ]);
        assert_eq!(args.data, PathBuf::from("d.csv"));
        assert_eq!(args.format, OutputFormat::Json);
        let sel = args.selection();
        assert_eq!(sel[&Dimension::Vehicle], Selection::Value("motorcycle".into()));
        assert_eq!(sel[&Dimension::Weather], Selection::All);
    }
}

use std::io::Write;
use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use tempfile::{Builder, NamedTempFile};

use delivery_dashboard::data::aggregate::{mean_by_vehicle, rating_vs_time};
use delivery_dashboard::data::filter::{complement, filtered_indices, FilterSelection, Selection};
use delivery_dashboard::data::model::{AgeGroup, Dimension, UNKNOWN};
use delivery_dashboard::{derive, initialize, load, DashboardError, DashboardSession, SourceCache};

const CSV: &str = "\
Agent_Age,Agent_Rating,Weather,Traffic,Vehicle,Area,Delivery_Time,Category
24,4.5,Sunny,Low,motorcycle,Urban,10,Food
25,,Fog,High,van,Metropolitian,20,Toys
40,5.0,,Jam,motorcycle,Urban,30,
,4.0,Sunny,High,scooter,Other,100,Food
";

fn write_file(suffix: &str, contents: &str) -> NamedTempFile {
    let mut tmp = Builder::new().suffix(suffix).tempfile().unwrap();
    write!(tmp, "{}", contents).unwrap();
    tmp
}

#[test]
fn end_to_end_threshold_and_imputation() {
    let tmp = write_file(".csv", CSV);
    let derived = derive(&load(tmp.path()).unwrap()).unwrap();

    assert_eq!(derived.stats.avg_delivery_time, Some(40.0));
    let late: Vec<bool> = derived.records.iter().map(|r| r.is_late).collect();
    assert_eq!(late, vec![false, false, false, true]);
    assert_eq!(derived.stats.late_percentage, Some(25.0));

    // Rating mean of 4.5, 5.0, 4.0; age median of 24, 25, 40.
    assert_eq!(derived.records[1].agent_rating, Some(4.5));
    assert_eq!(derived.records[3].agent_age, Some(25.0));

    let groups: Vec<_> = derived.records.iter().map(|r| r.agent_age_group).collect();
    assert_eq!(
        groups,
        vec![
            Some(AgeGroup::Under25),
            Some(AgeGroup::From25To40),
            Some(AgeGroup::From25To40),
            Some(AgeGroup::From25To40),
        ]
    );

    for rec in &derived.records {
        for dim in Dimension::ALL {
            assert!(rec.dimension(dim).is_some());
        }
    }
    assert_eq!(derived.records[2].weather.as_deref(), Some(UNKNOWN));
    assert_eq!(derived.records[2].category.as_deref(), Some(UNKNOWN));
}

#[test]
fn filter_options_do_not_shrink() {
    let tmp = write_file(".csv", CSV);
    let table = initialize(&SourceCache::new(), tmp.path()).unwrap();
    let before = table.filter_options(Dimension::Vehicle).to_vec();
    assert_eq!(before, ["All", "motorcycle", "scooter", "van"]);

    let mut session = DashboardSession::new(Arc::clone(&table));
    session.set_filter(Dimension::Weather, Selection::parse("Fog"));
    assert_eq!(session.view().len(), 1);
    assert_eq!(session.table().filter_options(Dimension::Vehicle), before.as_slice());
}

#[test]
fn filtered_and_complement_cover_the_table() {
    let tmp = write_file(".csv", CSV);
    let derived = derive(&load(tmp.path()).unwrap()).unwrap();
    for value in derived.filter_options(Dimension::Traffic).iter().skip(1) {
        let mut sel = FilterSelection::new();
        sel.insert(Dimension::Traffic, Selection::parse(value));
        let kept = filtered_indices(&derived, &sel);
        let rest = complement(&derived, &kept);
        assert_eq!(kept.len() + rest.len(), derived.len());
        assert!(kept
            .iter()
            .all(|&i| derived.records[i].traffic.as_deref() == Some(value.as_str())));
    }
}

#[test]
fn empty_selection_degrades_to_no_groups() {
    let tmp = write_file(".csv", CSV);
    let table = initialize(&SourceCache::new(), tmp.path()).unwrap();
    let mut session = DashboardSession::new(table);
    session.set_filter(Dimension::Vehicle, Selection::parse("van"));
    session.set_filter(Dimension::Area, Selection::parse("Urban"));

    let view = session.view();
    assert!(view.is_empty());
    assert!(mean_by_vehicle(&view).is_empty());
    assert!(rating_vs_time(&view).is_empty());
    let report = session.report();
    assert_eq!(report.kpis.filtered_records, 0);
    assert!(report.to_text().unwrap().contains("no data"));
}

#[test]
fn source_cache_reads_each_file_once() {
    let tmp = write_file(".csv", CSV);
    let cache = SourceCache::new();
    let first = cache.load(tmp.path()).unwrap();
    let second = cache.load(tmp.path()).unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(cache.len(), 1);
}

#[test]
fn reloading_gives_identical_derivation() {
    let tmp = write_file(".csv", CSV);
    let a = derive(&load(tmp.path()).unwrap()).unwrap();
    let b = derive(&load(tmp.path()).unwrap()).unwrap();
    assert_eq!(a, b);
}

#[test]
fn tsv_and_json_load_like_csv() {
    let csv = write_file(".csv", CSV);
    let tsv = write_file(".tsv", &CSV.replace(',', "\t"));
    let from_csv = derive(&load(csv.path()).unwrap()).unwrap();
    let from_tsv = derive(&load(tsv.path()).unwrap()).unwrap();
    assert_eq!(from_csv, from_tsv);

    let json = write_file(
        ".json",
        r#"[{"Weather": "Sunny", "Delivery_Time": 10},
            {"Weather": null, "Delivery_Time": 30}]"#,
    );
    let from_json = derive(&load(json.path()).unwrap()).unwrap();
    assert_eq!(from_json.records[1].weather.as_deref(), Some(UNKNOWN));
    assert_eq!(from_json.stats.avg_delivery_time, Some(20.0));
}

#[test]
fn parquet_nulls_are_imputed_like_csv() {
    let schema = Arc::new(Schema::new(vec![
        Field::new("Weather", DataType::Utf8, true),
        Field::new("Agent_Age", DataType::Int64, true),
        Field::new("Delivery_Time", DataType::Float64, false),
    ]));
    let columns: Vec<ArrayRef> = vec![
        Arc::new(StringArray::from(vec![Some("Sunny"), None, Some("Fog"), Some("Sunny")])),
        Arc::new(Int64Array::from(vec![Some(24), None, Some(41), Some(30)])),
        Arc::new(Float64Array::from(vec![10.0, 20.0, 30.0, 100.0])),
    ];
    let batch = RecordBatch::try_new(Arc::clone(&schema), columns).unwrap();

    let tmp = Builder::new().suffix(".parquet").tempfile().unwrap();
    let mut writer = ArrowWriter::try_new(tmp.reopen().unwrap(), schema, None).unwrap();
    writer.write(&batch).unwrap();
    writer.close().unwrap();

    let derived = derive(&load(tmp.path()).unwrap()).unwrap();
    assert_eq!(derived.len(), 4);
    assert_eq!(derived.records[1].weather.as_deref(), Some(UNKNOWN));
    // Median of 24, 41, 30.
    assert_eq!(derived.records[1].agent_age, Some(30.0));
    assert_eq!(derived.records[2].agent_age_group, Some(AgeGroup::Over40));
    assert_eq!(derived.stats.late_percentage, Some(25.0));
}

#[test]
fn missing_file_is_a_data_source_error() {
    let err = SourceCache::new()
        .load(std::path::Path::new("/nonexistent/deliveries.csv"))
        .unwrap_err();
    assert!(matches!(err, DashboardError::DataSource { .. }));
}

#[test]
fn ragged_rows_are_a_data_source_error() {
    let tmp = write_file(".csv", "Weather,Delivery_Time\nSunny,10\nFog\n");
    assert!(matches!(
        load(tmp.path()),
        Err(DashboardError::DataSource { .. })
    ));
}

#[test]
fn missing_delivery_time_is_a_schema_error() {
    let tmp = write_file(".csv", "Weather,Traffic\nSunny,Low\n");
    let err = initialize(&SourceCache::new(), tmp.path()).unwrap_err();
    assert!(matches!(err, DashboardError::Schema(_)));
}

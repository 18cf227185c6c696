use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use anyhow::{bail, Context};
use arrow::array::{Array, AsArray};
use arrow::datatypes::{
    DataType, Float32Type, Float64Type, Int16Type, Int32Type, Int64Type, Int8Type, UInt16Type,
    UInt32Type, UInt64Type, UInt8Type,
};
use arrow::util::display::array_value_to_string;
use log::{debug, info};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::model::{CellValue, Row, Table};
use crate::error::{DashboardError, Result};

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Load a delivery table from a file. Dispatch by extension.
///
/// Supported formats:
/// * `.csv`     – comma-delimited with a header row
/// * `.tsv`     – tab-delimited with a header row
/// * `.json`    – `[{ "Weather": "Sunny", "Delivery_Time": 120, ... }, ...]`
/// * `.parquet` – flat columns of strings, integers, floats or bools
pub fn load(path: &Path) -> Result<Table> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let loaded = match ext.as_str() {
        "csv" => load_delimited(path, b','),
        "tsv" => load_delimited(path, b'\t'),
        "json" => load_json(path),
        "parquet" | "pq" => load_parquet(path),
        other => Err(anyhow::anyhow!("unsupported file extension: .{other}")),
    };

    let table = loaded.map_err(|e| DashboardError::DataSource {
        path: path.to_path_buf(),
        reason: format!("{e:#}"),
    })?;
    info!(
        "loaded {} rows x {} columns from {}",
        table.len(),
        table.column_names.len(),
        path.display()
    );
    Ok(table)
}

/// Process-lifetime memo of loaded tables keyed by canonical path.
///
/// The source files are assumed static, so entries are never invalidated.
#[derive(Debug, Default)]
pub struct SourceCache {
    entries: Mutex<HashMap<PathBuf, Arc<Table>>>,
}

impl SourceCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached table for `path`, reading the file on first use.
    pub fn load(&self, path: &Path) -> Result<Arc<Table>> {
        let key = std::fs::canonicalize(path).map_err(|e| DashboardError::DataSource {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        if let Some(table) = self.lock().get(&key) {
            debug!("source cache hit: {}", key.display());
            return Ok(Arc::clone(table));
        }

        debug!("source cache miss: {}", key.display());
        let table = Arc::new(load(path)?);
        Ok(Arc::clone(self.lock().entry(key).or_insert(table)))
    }

    /// Number of distinct files held.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<PathBuf, Arc<Table>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// ---------------------------------------------------------------------------
// Delimited loader
// ---------------------------------------------------------------------------

/// Header row with column names; every record must have the same number of
/// fields as the header.
fn load_delimited(path: &Path, delimiter: u8) -> anyhow::Result<Table> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(false)
        .from_path(path)
        .context("opening delimited file")?;

    let headers: Vec<String> = reader
        .headers()
        .context("reading header row")?
        .iter()
        .map(str::to_string)
        .collect();
    if headers.iter().all(|h| h.is_empty()) {
        bail!("file has no header row");
    }

    let mut rows = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("record {row_no}"))?;
        let row: Row = headers
            .iter()
            .zip(record.iter())
            .map(|(name, value)| (name.clone(), guess_cell_type(value)))
            .collect();
        rows.push(row);
    }

    Ok(Table::new(headers, rows))
}

/// Spellings a CSV reader treats as missing by default.
const NULL_TOKENS: &[&str] = &[
    "", "NA", "N/A", "n/a", "NaN", "nan", "-NaN", "null", "NULL", "None", "<NA>", "#N/A",
];

/// Text cells are kept verbatim, so `" Sunny"` and `"Sunny"` stay distinct
/// labels. Numbers may carry surrounding spaces.
fn guess_cell_type(raw: &str) -> CellValue {
    if NULL_TOKENS.contains(&raw) {
        return CellValue::Null;
    }
    let s = raw.trim();
    if let Ok(i) = s.parse::<i64>() {
        return CellValue::Integer(i);
    }
    if let Ok(f) = s.parse::<f64>() {
        return CellValue::Float(f);
    }
    if raw == "true" || raw == "false" {
        return CellValue::Bool(raw == "true");
    }
    CellValue::String(raw.to_string())
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Records-oriented JSON (`df.to_json(orient='records')`). Keys missing from
/// a record read as null.
fn load_json(path: &Path) -> anyhow::Result<Table> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    let root: JsonValue = serde_json::from_str(&text).context("parsing JSON")?;

    let records = root.as_array().context("expected top-level JSON array")?;

    let mut column_names: Vec<String> = Vec::new();
    let mut rows = Vec::with_capacity(records.len());

    for (i, rec) in records.iter().enumerate() {
        let obj = rec
            .as_object()
            .with_context(|| format!("record {i} is not a JSON object"))?;

        let mut row = BTreeMap::new();
        for (key, val) in obj {
            if !column_names.contains(key) {
                column_names.push(key.clone());
            }
            row.insert(key.clone(), json_to_cell(val));
        }
        rows.push(row);
    }

    Ok(Table::new(column_names, rows))
}

fn json_to_cell(val: &JsonValue) -> CellValue {
    match val {
        JsonValue::String(s) => CellValue::String(s.clone()),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                CellValue::Integer(i)
            } else if let Some(f) = n.as_f64() {
                CellValue::Float(f)
            } else {
                CellValue::String(n.to_string())
            }
        }
        JsonValue::Bool(b) => CellValue::Bool(*b),
        JsonValue::Null => CellValue::Null,
        other => CellValue::String(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Works with files written by both Pandas (`df.to_parquet()`) and Polars
/// (`df.write_parquet()`).
fn load_parquet(path: &Path) -> anyhow::Result<Table> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder =
        ParquetRecordBatchReaderBuilder::try_new(file).context("reading parquet metadata")?;
    let column_names: Vec<String> = builder
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect();
    let reader = builder.build().context("building parquet reader")?;

    let mut rows = Vec::new();
    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        for row in 0..batch.num_rows() {
            let cells: Row = column_names
                .iter()
                .zip(batch.columns())
                .map(|(name, col)| (name.clone(), extract_cell(col.as_ref(), row)))
                .collect();
            rows.push(cells);
        }
    }

    Ok(Table::new(column_names, rows))
}

/// Extract a single cell from an Arrow column at a given row.
fn extract_cell(col: &dyn Array, row: usize) -> CellValue {
    if col.is_null(row) {
        return CellValue::Null;
    }
    match col.data_type() {
        DataType::Utf8 => CellValue::String(col.as_string::<i32>().value(row).to_string()),
        DataType::LargeUtf8 => CellValue::String(col.as_string::<i64>().value(row).to_string()),
        DataType::Int8 => CellValue::Integer(col.as_primitive::<Int8Type>().value(row) as i64),
        DataType::Int16 => CellValue::Integer(col.as_primitive::<Int16Type>().value(row) as i64),
        DataType::Int32 => CellValue::Integer(col.as_primitive::<Int32Type>().value(row) as i64),
        DataType::Int64 => CellValue::Integer(col.as_primitive::<Int64Type>().value(row)),
        DataType::UInt8 => CellValue::Integer(col.as_primitive::<UInt8Type>().value(row) as i64),
        DataType::UInt16 => CellValue::Integer(col.as_primitive::<UInt16Type>().value(row) as i64),
        DataType::UInt32 => CellValue::Integer(col.as_primitive::<UInt32Type>().value(row) as i64),
        DataType::UInt64 => CellValue::Float(col.as_primitive::<UInt64Type>().value(row) as f64),
        DataType::Float32 => CellValue::Float(col.as_primitive::<Float32Type>().value(row) as f64),
        DataType::Float64 => CellValue::Float(col.as_primitive::<Float64Type>().value(row)),
        DataType::Boolean => CellValue::Bool(col.as_boolean().value(row)),
        _ => array_value_to_string(col, row)
            .map(CellValue::String)
            .unwrap_or(CellValue::Null),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_tokens_become_null() {
        for token in ["", "NA", "NaN", "null", "None"] {
            assert_eq!(guess_cell_type(token), CellValue::Null, "{token:?}");
        }
    }

    #[test]
    fn text_cells_keep_surrounding_whitespace() {
        assert_eq!(
            guess_cell_type(" Sunny"),
            CellValue::String(" Sunny".to_string())
        );
        assert_eq!(guess_cell_type("  "), CellValue::String("  ".to_string()));
        assert_eq!(guess_cell_type(" 24"), CellValue::Integer(24));
    }

    #[test]
    fn cell_types_are_guessed_in_order() {
        assert_eq!(guess_cell_type("42"), CellValue::Integer(42));
        assert_eq!(guess_cell_type("4.5"), CellValue::Float(4.5));
        assert_eq!(guess_cell_type("true"), CellValue::Bool(true));
        assert_eq!(
            guess_cell_type("Sunny"),
            CellValue::String("Sunny".to_string())
        );
    }

    #[test]
    fn json_numbers_keep_integer_type() {
        let v: JsonValue = serde_json::json!(35);
        assert_eq!(json_to_cell(&v), CellValue::Integer(35));
        let v: JsonValue = serde_json::json!(4.7);
        assert_eq!(json_to_cell(&v), CellValue::Float(4.7));
    }

    #[test]
    fn unsupported_extension_is_a_data_source_error() {
        let err = load(Path::new("deliveries.xlsx")).unwrap_err();
        assert!(matches!(err, DashboardError::DataSource { .. }));
    }
}

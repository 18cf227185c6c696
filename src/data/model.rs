use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

// ---------------------------------------------------------------------------
// CellValue – a single cell of the raw table
// ---------------------------------------------------------------------------

/// A dynamically-typed cell mirroring the dtypes a CSV reader infers.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    String(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Null,
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::String(s) => write!(f, "{s}"),
            CellValue::Integer(i) => write!(f, "{i}"),
            // `{:?}` keeps the fraction of integral floats: `1.0`, not `1`.
            CellValue::Float(v) => write!(f, "{v:?}"),
            CellValue::Bool(b) => write!(f, "{b}"),
            CellValue::Null => write!(f, "<null>"),
        }
    }
}

impl CellValue {
    /// Numeric view of the cell, `None` for text, bools and nulls.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Float(v) => Some(*v),
            CellValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    /// Text used when the cell is treated as a category label.
    pub fn as_category(&self) -> Option<String> {
        match self {
            CellValue::Null => None,
            other => Some(other.to_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// Table – the raw loaded dataset
// ---------------------------------------------------------------------------

/// One raw row: column_name → cell. Columns missing from a row read as null.
pub type Row = BTreeMap<String, CellValue>;

/// The raw table as read from the source file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    /// Column names in source order.
    pub column_names: Vec<String>,
    pub rows: Vec<Row>,
}

impl Table {
    pub fn new(column_names: Vec<String>, rows: Vec<Row>) -> Self {
        Table { column_names, rows }
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_names.iter().any(|c| c == name)
    }

    /// Cell at (`row`, `column`); absent cells read as null.
    pub fn cell(&self, row: usize, column: &str) -> &CellValue {
        static NULL: CellValue = CellValue::Null;
        self.rows
            .get(row)
            .and_then(|r| r.get(column))
            .unwrap_or(&NULL)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Column names
// ---------------------------------------------------------------------------

pub const DELIVERY_TIME: &str = "Delivery_Time";
pub const AGENT_RATING: &str = "Agent_Rating";
pub const AGENT_AGE: &str = "Agent_Age";

/// Placeholder written into null categorical cells.
pub const UNKNOWN: &str = "Unknown";

// ---------------------------------------------------------------------------
// Dimension – the five categorical filter/group columns
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Dimension {
    Weather,
    Traffic,
    Vehicle,
    Area,
    Category,
}

impl Dimension {
    pub const ALL: [Dimension; 5] = [
        Dimension::Weather,
        Dimension::Traffic,
        Dimension::Vehicle,
        Dimension::Area,
        Dimension::Category,
    ];

    /// Source column name (exact, case-sensitive).
    pub fn column_name(self) -> &'static str {
        match self {
            Dimension::Weather => "Weather",
            Dimension::Traffic => "Traffic",
            Dimension::Vehicle => "Vehicle",
            Dimension::Area => "Area",
            Dimension::Category => "Category",
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column_name())
    }
}

// ---------------------------------------------------------------------------
// AgeGroup
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AgeGroup {
    Under25,
    From25To40,
    Over40,
}

impl AgeGroup {
    /// `< 25`, `25..=40`, `> 40`. NaN has no bucket.
    pub fn from_age(age: f64) -> Option<AgeGroup> {
        if age.is_nan() {
            None
        } else if age < 25.0 {
            Some(AgeGroup::Under25)
        } else if age <= 40.0 {
            Some(AgeGroup::From25To40)
        } else {
            Some(AgeGroup::Over40)
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            AgeGroup::Under25 => "<25",
            AgeGroup::From25To40 => "25-40",
            AgeGroup::Over40 => "40+",
        }
    }
}

impl fmt::Display for AgeGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for AgeGroup {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// DeliveryRecord – one derived row
// ---------------------------------------------------------------------------

/// A row after imputation and feature derivation.
///
/// Categorical fields are `None` only when the column is absent from the
/// source; present columns never hold nulls after derivation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeliveryRecord {
    pub weather: Option<String>,
    pub traffic: Option<String>,
    pub vehicle: Option<String>,
    pub area: Option<String>,
    pub category: Option<String>,
    pub agent_rating: Option<f64>,
    pub agent_age: Option<f64>,
    /// Never imputed.
    pub delivery_time: Option<f64>,
    pub is_late: bool,
    pub agent_age_group: Option<AgeGroup>,
}

impl DeliveryRecord {
    pub fn dimension(&self, dim: Dimension) -> Option<&str> {
        let value = match dim {
            Dimension::Weather => &self.weather,
            Dimension::Traffic => &self.traffic,
            Dimension::Vehicle => &self.vehicle,
            Dimension::Area => &self.area,
            Dimension::Category => &self.category,
        };
        value.as_deref()
    }
}

// ---------------------------------------------------------------------------
// DerivedTable – the immutable dashboard context
// ---------------------------------------------------------------------------

/// Dataset-wide scalars computed once during derivation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DatasetStats {
    pub avg_delivery_time: Option<f64>,
    /// Sample standard deviation (ddof = 1).
    pub std_delivery_time: Option<f64>,
    /// `avg + std`; rows strictly above it are late.
    pub late_threshold: Option<f64>,
    /// `100 × mean(Is_Late)` over the full table.
    pub late_percentage: Option<f64>,
    /// Value written into null Agent_Rating cells.
    pub rating_fill: Option<f64>,
    /// Value written into null Agent_Age cells.
    pub age_fill: Option<f64>,
    /// Rows excluded from age bucketing.
    pub invalid_ages: usize,
}

/// The full derived table plus its scalar statistics. Built once, then only
/// read; filtering produces views into it.
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedTable {
    pub records: Vec<DeliveryRecord>,
    pub stats: DatasetStats,
    /// Dimensions whose column exists in the source.
    pub dimensions: Vec<Dimension>,
    /// For each dimension: `"All"` followed by the sorted distinct values.
    pub options: BTreeMap<Dimension, Vec<String>>,
}

impl DerivedTable {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Filter choices for `dim`, always headed by `"All"`.
    pub fn filter_options(&self, dim: Dimension) -> &[String] {
        self.options.get(&dim).map(Vec::as_slice).unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn age_boundaries() {
        assert_eq!(AgeGroup::from_age(24.0), Some(AgeGroup::Under25));
        assert_eq!(AgeGroup::from_age(25.0), Some(AgeGroup::From25To40));
        assert_eq!(AgeGroup::from_age(40.0), Some(AgeGroup::From25To40));
        assert_eq!(AgeGroup::from_age(41.0), Some(AgeGroup::Over40));
        assert_eq!(AgeGroup::from_age(40.5), Some(AgeGroup::Over40));
        assert_eq!(AgeGroup::from_age(f64::NAN), None);
    }

    #[test]
    fn missing_cells_read_as_null() {
        let mut row = Row::new();
        row.insert("Weather".into(), CellValue::String("Sunny".into()));
        let table = Table::new(vec!["Weather".into(), "Traffic".into()], vec![row]);
        assert!(table.cell(0, "Traffic").is_null());
        assert!(table.cell(5, "Weather").is_null());
        assert_eq!(
            table.cell(0, "Weather").as_category().as_deref(),
            Some("Sunny")
        );
    }

    #[test]
    fn numeric_cells_as_categories() {
        assert_eq!(CellValue::Integer(3).as_category().as_deref(), Some("3"));
        assert_eq!(CellValue::Float(1.5).as_category().as_deref(), Some("1.5"));
        assert_eq!(CellValue::Float(1.0).as_category().as_deref(), Some("1.0"));
        assert_eq!(CellValue::Null.as_category(), None);
    }
}

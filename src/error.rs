use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by the delivery pipeline.
#[derive(Debug, Error)]
pub enum DashboardError {
    /// The source file is missing, unreadable or malformed.
    #[error("data source {path}: {reason}")]
    DataSource { path: PathBuf, reason: String },

    /// A required column is absent.
    #[error("schema error: {0}")]
    Schema(String),

    /// An agent age that is still non-numeric after imputation.
    #[error("row {row}: agent age '{value}' is not numeric")]
    InvalidAge { row: usize, value: String },

    /// A non-null cell in a numeric column that does not hold a number.
    #[error("row {row}: column '{column}' value '{value}' is not numeric")]
    InvalidNumber {
        column: String,
        row: usize,
        value: String,
    },
}

pub type Result<T> = std::result::Result<T, DashboardError>;

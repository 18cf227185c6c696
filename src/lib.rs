pub mod config;
pub mod data;
pub mod error;
pub mod report;
pub mod state;

use std::path::Path;
use std::sync::Arc;

pub use data::derive::derive;
pub use data::loader::{load, SourceCache};
pub use error::{DashboardError, Result};
pub use report::DashboardReport;
pub use state::DashboardSession;

use data::model::DerivedTable;

/// Load `path` through `cache` and derive the shared dashboard table.
pub fn initialize(cache: &SourceCache, path: &Path) -> Result<Arc<DerivedTable>> {
    let raw = cache.load(path)?;
    Ok(Arc::new(derive(&raw)?))
}

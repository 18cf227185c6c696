/// Data layer: loading, derivation, filtering and aggregation.
///
/// Architecture:
/// ```text
///  .csv / .tsv / .json / .parquet
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse file → Table (memoised per path)
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  derive   │  impute, Is_Late, Agent_Age_Group → DerivedTable (once)
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  equality predicates → FilteredView (per interaction)
///   └──────────┘
///        │
///        ▼
///   ┌───────────┐
///   │ aggregate  │  group-by means, late rates, describe → chart tables
///   └───────────┘
/// ```

pub mod aggregate;
pub mod derive;
pub mod filter;
pub mod loader;
pub mod model;
pub mod stats;

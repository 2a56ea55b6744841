/// Data layer: core types, loading, and filtering.
///
/// Architecture:
/// ```text
///  .csv / .json / .parquet
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse file → Table
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  Table    │  named f64 columns, NaN = missing, row labels
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  pairwise-complete observations for two columns
///   └──────────┘
/// ```

pub mod loader;
pub mod model;
pub mod filter;

pub use filter::pairwise_complete;
pub use loader::{LoadOptions, load_table};
pub use model::{Column, MissingMask, Table};

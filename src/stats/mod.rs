//! Correlation analysis between feature columns and target scales.
//!
//! - `metric`: Pearson / Spearman / Kendall coefficient + two-sided p-value
//! - `rank`: average ranks and tie groups
//! - `engine`: per-scale result tables over a whole feature table

pub mod engine;
pub mod metric;
pub mod rank;

pub use engine::{
    CorrelationEngine, CorrelationRow, CorrelationSetting, CorrelationTable, EmptyPairPolicy,
    MetricValue, assess_correlation,
};
pub use metric::{Association, MetricKind, compute_correlation, round4};

//! Exploratory statistics on paired tables: a feature matrix and a target
//! (clinical) matrix sharing the same observations.
//!
//! - [`stats`]: correlate every feature with configured target scales
//!   (Pearson, Spearman, Kendall) after pairwise removal of missing values
//! - [`residualize`]: regress covariates out of every feature
//! - [`data`]: the `Table` type and CSV / JSON / Parquet loading
//! - [`export`], [`plot`]: workbook output and the missing-value heatmap
//! - [`config`], [`pipeline`]: TOML-driven end-to-end runs

pub mod color;
pub mod config;
pub mod data;
pub mod error;
pub mod export;
pub mod pipeline;
pub mod plot;
pub mod residualize;
pub mod stats;

pub use error::{AnalysisError, ErrorCategory};

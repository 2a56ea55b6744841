//! Analysis configuration loaded from TOML.
//!
//! ```toml
//! empty_pairs = "fail"            # or "emit_nan"
//!
//! [input]
//! features = "data/features.parquet"
//! targets = "data/clinical.csv"
//! index_column = "subject"
//!
//! [[correlation]]
//! scale = "motor"
//! field_name = "updrs_iii"
//! correlation = ["pearson", "spearman", "kendall"]
//!
//! [residualize]
//! covariates = ["age", "sex"]
//! inline = false
//! model = { fit_intercept = true }
//!
//! [output]
//! workbook = "out/correlations"
//! format = "csv"                  # or "parquet"
//! missing_values = "out/missing.png"
//! residualized_features = "out/features_residualized.csv"
//!
//! [missing_values]
//! fig_size = [16, 16]
//! fig_cmap = "Greys"
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::data::loader::LoadOptions;
use crate::plot::MissingValuesPlot;
use crate::residualize::LinearModelOptions;
use crate::stats::engine::{CorrelationSetting, EmptyPairPolicy};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AnalysisConfig {
    pub input: InputConfig,
    #[serde(default)]
    pub correlation: Vec<CorrelationSetting>,
    #[serde(default)]
    pub residualize: Option<ResidualizeConfig>,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub missing_values: MissingValuesPlot,
    #[serde(default)]
    pub empty_pairs: EmptyPairPolicy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InputConfig {
    pub features: PathBuf,
    pub targets: PathBuf,
    /// Observation id column present in both files.
    #[serde(default)]
    pub index_column: Option<String>,
}

impl InputConfig {
    pub fn load_options(&self) -> LoadOptions {
        LoadOptions {
            index_column: self.index_column.clone(),
        }
    }
}

/// Remove the linear effect of target-table columns from the features
/// before correlating.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResidualizeConfig {
    /// Columns of the target table used as covariates.
    pub covariates: Vec<String>,
    #[serde(default)]
    pub inline: bool,
    #[serde(default)]
    pub model: LinearModelOptions,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkbookFormat {
    #[default]
    Csv,
    Parquet,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    /// Directory receiving one sheet per scale.
    #[serde(default)]
    pub workbook: Option<PathBuf>,
    #[serde(default)]
    pub format: WorkbookFormat,
    /// PNG path for the missing-value heatmap of the feature table.
    #[serde(default)]
    pub missing_values: Option<PathBuf>,
    /// CSV path for the residualized feature table.
    #[serde(default)]
    pub residualized_features: Option<PathBuf>,
}

impl AnalysisConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).context("parsing analysis config")
    }

    /// Load a config file. Relative input/output paths are resolved against
    /// the file's directory.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let mut config = Self::from_toml_str(&text)
            .with_context(|| format!("in {}", path.display()))?;
        if let Some(base) = path.parent() {
            config.rebase(base);
        }
        Ok(config)
    }

    fn rebase(&mut self, base: &Path) {
        let join = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        join(&mut self.input.features);
        join(&mut self.input.targets);
        for p in [
            &mut self.output.workbook,
            &mut self.output.missing_values,
            &mut self.output.residualized_features,
        ]
        .into_iter()
        .flatten()
        {
            join(p);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::ColorMapKind;
    use crate::stats::metric::MetricKind;

    const FULL: &str = r#"
empty_pairs = "emit_nan"

[input]
features = "features.csv"
targets = "clinical.csv"
index_column = "subject"

[[correlation]]
scale = "motor"
field_name = "updrs"
correlation = ["pearson", "kendall"]

[[correlation]]
scale = "age"
field_name = "age"
correlation = ["spearman"]

[residualize]
covariates = ["age"]
model = { fit_intercept = false }

[output]
workbook = "out/book"
format = "parquet"

[missing_values]
fig_size = [8, 4]
fig_cmap = "Blues"
"#;

    #[test]
    fn parses_full_config() {
        let cfg = AnalysisConfig::from_toml_str(FULL).unwrap();
        assert_eq!(cfg.empty_pairs, EmptyPairPolicy::EmitNan);
        assert_eq!(cfg.correlation.len(), 2);
        assert_eq!(cfg.correlation[0].correlation, vec![MetricKind::Pearson, MetricKind::Kendall]);
        let res = cfg.residualize.unwrap();
        assert!(!res.inline);
        assert!(!res.model.fit_intercept);
        assert_eq!(res.model.rcond, LinearModelOptions::default().rcond);
        assert_eq!(cfg.output.format, WorkbookFormat::Parquet);
        assert_eq!(cfg.missing_values.fig_size, Some((8.0, 4.0)));
        assert_eq!(cfg.missing_values.fig_cmap, Some(ColorMapKind::Blues));
        assert_eq!(cfg.input.load_options().index_column.as_deref(), Some("subject"));
    }

    #[test]
    fn unknown_metric_names_supported_set() {
        let text = r#"
[input]
features = "f.csv"
targets = "t.csv"

[[correlation]]
scale = "s"
field_name = "t"
correlation = ["spearman-rho"]
"#;
        let err = AnalysisConfig::from_toml_str(text).unwrap_err();
        let msg = format!("{err:#}");
        assert!(msg.contains("spearman-rho"), "{msg}");
        assert!(msg.contains("pearson, spearman, kendall"), "{msg}");
    }

    #[test]
    fn relative_paths_follow_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("analysis.toml");
        std::fs::write(&path, FULL).unwrap();
        let cfg = AnalysisConfig::load(&path).unwrap();
        assert_eq!(cfg.input.features, dir.path().join("features.csv"));
        assert_eq!(cfg.output.workbook, Some(dir.path().join("out/book")));
        assert_eq!(cfg.output.missing_values, None);
    }
}

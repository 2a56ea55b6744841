use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::metric::{MetricKind, compute_correlation, round4};
use crate::data::filter::pairwise_complete;
use crate::data::model::Table;
use crate::error::{AnalysisError, Result};

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// One target variable ("scale") to correlate every feature against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrelationSetting {
    /// Name of the result table (one sheet per scale on export).
    pub scale: String,
    /// Column of the target table holding the scale's values.
    pub field_name: String,
    /// Statistics to compute, in output order.
    pub correlation: Vec<MetricKind>,
}

impl CorrelationSetting {
    pub fn new(
        scale: impl Into<String>,
        field_name: impl Into<String>,
        correlation: Vec<MetricKind>,
    ) -> Self {
        CorrelationSetting {
            scale: scale.into(),
            field_name: field_name.into(),
            correlation,
        }
    }
}

/// What to do with a feature that has too few complete pairs for a statistic.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyPairPolicy {
    /// Abort the assessment with `InsufficientData` naming feature and scale.
    #[default]
    Fail,
    /// Keep the feature and report `NaN` for r and p.
    EmitNan,
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// r and p for one statistic, already rounded to 4 decimals.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricValue {
    pub kind: MetricKind,
    pub r: f64,
    pub p: f64,
}

/// One feature's results for one scale.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrelationRow {
    pub feature: String,
    /// Complete (feature, target) pairs the statistics were computed on.
    pub observations: usize,
    /// One entry per requested statistic, in setting order.
    pub values: Vec<MetricValue>,
}

impl CorrelationRow {
    pub fn get(&self, kind: MetricKind) -> Option<&MetricValue> {
        self.values.iter().find(|v| v.kind == kind)
    }
}

/// All feature rows for one scale, in feature column order.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrelationTable {
    pub scale: String,
    pub metrics: Vec<MetricKind>,
    pub rows: Vec<CorrelationRow>,
}

impl CorrelationTable {
    /// Column headers: `feature, r (kind), p (kind), ...`.
    pub fn headers(&self) -> Vec<String> {
        let mut out = vec!["feature".to_string()];
        for kind in &self.metrics {
            out.push(format!("r ({kind})"));
            out.push(format!("p ({kind})"));
        }
        out
    }

    /// One row as text cells matching [`headers`](Self::headers).
    pub fn record(&self, row: &CorrelationRow) -> Vec<String> {
        let mut out = vec![row.feature.clone()];
        for v in &row.values {
            out.push(format_value(v.r));
            out.push(format_value(v.p));
        }
        out
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

fn format_value(v: f64) -> String {
    if v.is_nan() {
        "NaN".to_string()
    } else {
        v.to_string()
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Correlates every feature column with the target columns named in a list
/// of settings. Inputs are never modified.
#[derive(Debug, Clone, Copy, Default)]
pub struct CorrelationEngine {
    pub empty_pairs: EmptyPairPolicy,
}

impl CorrelationEngine {
    pub fn new(empty_pairs: EmptyPairPolicy) -> Self {
        CorrelationEngine { empty_pairs }
    }

    /// Produce one [`CorrelationTable`] per setting, in settings order.
    ///
    /// All settings are validated before any statistic is computed.
    pub fn assess(
        &self,
        features: &Table,
        targets: &Table,
        settings: &[CorrelationSetting],
    ) -> Result<Vec<CorrelationTable>> {
        features.ensure_same_rows(targets, "features vs targets")?;
        validate_settings(targets, settings)?;

        let mut tables = Vec::with_capacity(settings.len());
        for setting in settings {
            let target = targets.column(&setting.field_name)?;
            let rows = features
                .columns()
                .iter()
                .map(|col| self.assess_feature(&col.name, &col.values, target, setting))
                .collect::<Result<Vec<_>>>()?;

            log::info!(
                "Scale '{}' ({}): {} features x {} metrics",
                setting.scale,
                setting.field_name,
                rows.len(),
                setting.correlation.len()
            );
            tables.push(CorrelationTable {
                scale: setting.scale.clone(),
                metrics: setting.correlation.clone(),
                rows,
            });
        }
        Ok(tables)
    }

    fn assess_feature(
        &self,
        feature: &str,
        values: &[f64],
        target: &[f64],
        setting: &CorrelationSetting,
    ) -> Result<CorrelationRow> {
        let (x, y) = pairwise_complete(values, target);
        log::debug!(
            "{feature} vs {}: {} complete pairs of {}",
            setting.field_name,
            x.len(),
            values.len()
        );

        let mut metric_values = Vec::with_capacity(setting.correlation.len());
        for &kind in &setting.correlation {
            let (r, p) = match compute_correlation(&x, &y, kind) {
                Ok(a) => (a.r, a.p),
                Err(AnalysisError::InsufficientData { found, required, .. })
                    if self.empty_pairs == EmptyPairPolicy::EmitNan =>
                {
                    log::warn!(
                        "{feature} vs {}: {found} complete pairs (need {required}), reporting NaN",
                        setting.scale
                    );
                    (f64::NAN, f64::NAN)
                }
                Err(AnalysisError::InsufficientData { found, required, .. }) => {
                    return Err(AnalysisError::InsufficientData {
                        context: format!(
                            "feature '{feature}' vs scale '{}' ({kind})",
                            setting.scale
                        ),
                        found,
                        required,
                    });
                }
                Err(e) => return Err(e),
            };
            metric_values.push(MetricValue {
                kind,
                r: round4(r),
                p: round4(p),
            });
        }

        Ok(CorrelationRow {
            feature: feature.to_string(),
            observations: x.len(),
            values: metric_values,
        })
    }
}

fn validate_settings(targets: &Table, settings: &[CorrelationSetting]) -> Result<()> {
    let mut scales = BTreeSet::new();
    for setting in settings {
        if !scales.insert(setting.scale.as_str()) {
            return Err(AnalysisError::DuplicateScale(setting.scale.clone()));
        }
        if setting.correlation.is_empty() {
            return Err(AnalysisError::EmptyMetricList(setting.scale.clone()));
        }
        targets.column(&setting.field_name)?;
    }
    Ok(())
}

/// Assess with the default policy (fail on features without enough pairs).
pub fn assess_correlation(
    features: &Table,
    targets: &Table,
    settings: &[CorrelationSetting],
) -> Result<Vec<CorrelationTable>> {
    CorrelationEngine::default().assess(features, targets, settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::Column;

    fn features() -> Table {
        Table::from_columns(vec![
            Column::new("f1", vec![1.0, 2.0, 3.0, 4.0, 5.0]),
            Column::new("f2", vec![5.0, 3.0, f64::NAN, 2.0, 1.0]),
        ])
        .unwrap()
    }

    fn targets() -> Table {
        Table::from_columns(vec![
            Column::new("updrs", vec![2.0, 1.0, 4.0, 3.0, 5.0]),
            Column::new("age", vec![60.0, f64::NAN, 62.0, 70.0, 65.0]),
        ])
        .unwrap()
    }

    #[test]
    fn one_table_per_setting_in_order() {
        let settings = vec![
            CorrelationSetting::new(
                "motor",
                "updrs",
                vec![MetricKind::Pearson, MetricKind::Kendall],
            ),
            CorrelationSetting::new("age", "age", vec![MetricKind::Spearman]),
        ];
        let tables = assess_correlation(&features(), &targets(), &settings).unwrap();
        assert_eq!(tables.len(), 2);
        assert_eq!(tables[0].scale, "motor");
        assert_eq!(tables[1].scale, "age");

        let motor = &tables[0];
        assert_eq!(motor.rows.len(), 2);
        assert_eq!(motor.rows[0].feature, "f1");
        assert_eq!(motor.rows[1].feature, "f2");
        assert_eq!(motor.rows[0].get(MetricKind::Pearson).unwrap().r, 0.8);
        assert_eq!(motor.rows[0].get(MetricKind::Kendall).unwrap().r, 0.6);
        assert_eq!(motor.rows[1].observations, 4);
        assert_eq!(
            motor.headers(),
            vec!["feature", "r (pearson)", "p (pearson)", "r (kendall)", "p (kendall)"]
        );
    }

    #[test]
    fn values_rounded_to_four_decimals() {
        let settings = vec![CorrelationSetting::new("motor", "updrs", MetricKind::ALL.to_vec())];
        let tables = assess_correlation(&features(), &targets(), &settings).unwrap();
        for row in &tables[0].rows {
            for v in &row.values {
                assert_eq!(v.r, round4(v.r));
                assert_eq!(v.p, round4(v.p));
            }
        }
        assert_eq!(tables[0].rows[0].get(MetricKind::Pearson).unwrap().p, 0.1041);
    }

    #[test]
    fn unknown_field_fails_before_computing() {
        let settings = vec![CorrelationSetting::new("x", "nope", vec![MetricKind::Pearson])];
        let err = assess_correlation(&features(), &targets(), &settings).unwrap_err();
        assert!(matches!(err, AnalysisError::UnknownColumn { ref name, .. } if name == "nope"));
    }

    #[test]
    fn duplicate_scale_and_empty_metrics_rejected() {
        let dup = vec![
            CorrelationSetting::new("s", "updrs", vec![MetricKind::Pearson]),
            CorrelationSetting::new("s", "age", vec![MetricKind::Pearson]),
        ];
        assert_eq!(
            assess_correlation(&features(), &targets(), &dup).unwrap_err(),
            AnalysisError::DuplicateScale("s".into())
        );
        let empty = vec![CorrelationSetting::new("s", "updrs", vec![])];
        assert_eq!(
            assess_correlation(&features(), &targets(), &empty).unwrap_err(),
            AnalysisError::EmptyMetricList("s".into())
        );
    }

    #[test]
    fn row_count_mismatch() {
        let short = Table::from_columns(vec![Column::new("updrs", vec![1.0, 2.0])]).unwrap();
        let settings = vec![CorrelationSetting::new("s", "updrs", vec![MetricKind::Pearson])];
        let err = assess_correlation(&features(), &short, &settings).unwrap_err();
        assert!(matches!(err, AnalysisError::ShapeMismatch { left: 5, right: 2, .. }));
    }

    fn sparse_inputs() -> (Table, Table) {
        let feats = Table::from_columns(vec![
            Column::new("ok", vec![1.0, 2.0, 3.0]),
            Column::new("empty", vec![f64::NAN, f64::NAN, 1.0]),
        ])
        .unwrap();
        let targets =
            Table::from_columns(vec![Column::new("t", vec![3.0, 1.0, f64::NAN])]).unwrap();
        (feats, targets)
    }

    #[test]
    fn zero_pairs_fail_by_default() {
        let (feats, targets) = sparse_inputs();
        let settings = vec![CorrelationSetting::new("s", "t", vec![MetricKind::Pearson])];
        let err = assess_correlation(&feats, &targets, &settings).unwrap_err();
        match err {
            AnalysisError::InsufficientData { context, found, required } => {
                assert!(context.contains("'empty'"));
                assert!(context.contains("'s'"));
                assert_eq!(found, 0);
                assert_eq!(required, 2);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn zero_pairs_emit_nan_when_configured() {
        let (feats, targets) = sparse_inputs();
        let settings = vec![CorrelationSetting::new(
            "s",
            "t",
            vec![MetricKind::Pearson, MetricKind::Spearman],
        )];
        let tables = CorrelationEngine::new(EmptyPairPolicy::EmitNan)
            .assess(&feats, &targets, &settings)
            .unwrap();
        let rows = &tables[0].rows;
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].observations, 0);
        assert!(rows[1].values.iter().all(|v| v.r.is_nan() && v.p.is_nan()));
        assert_eq!(tables[0].record(&rows[1])[1], "NaN");
    }

    #[test]
    fn inputs_untouched() {
        let f = features();
        let t = targets();
        let settings = vec![CorrelationSetting::new("s", "updrs", vec![MetricKind::Pearson])];
        assess_correlation(&f, &t, &settings).unwrap();
        assert_eq!(f.column("f2").unwrap()[1], 3.0);
        assert!(f.column("f2").unwrap()[2].is_nan());
    }
}

use std::collections::BTreeMap;

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::data::model::Table;
use crate::error::{AnalysisError, Result};

// ---------------------------------------------------------------------------
// Linear model options
// ---------------------------------------------------------------------------

/// Fit options for the per-feature least-squares models.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinearModelOptions {
    /// Fit an unpenalised intercept (data are centred before solving).
    pub fit_intercept: bool,
    /// Singular values below `rcond × largest` are treated as zero.
    pub rcond: f64,
}

impl Default for LinearModelOptions {
    fn default() -> Self {
        LinearModelOptions {
            fit_intercept: true,
            rcond: 1e-12,
        }
    }
}

// ---------------------------------------------------------------------------
// LinearRegressor – one feature = f(covariates)
// ---------------------------------------------------------------------------

/// Ordinary least-squares model predicting one feature from the covariates.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearRegressor {
    pub intercept: f64,
    /// One weight per covariate column, in covariate order.
    pub coefficients: Vec<f64>,
}

impl LinearRegressor {
    /// Fit by SVD least squares on the rows where `target` is observed.
    /// Rank-deficient designs get the minimum-norm solution.
    pub fn fit(
        feature: &str,
        covariates: &Table,
        target: &[f64],
        options: &LinearModelOptions,
    ) -> Result<Self> {
        let n = covariates.n_rows();
        let k = covariates.n_cols();
        if target.len() != n {
            return Err(AnalysisError::LengthMismatch(target.len(), n));
        }
        if target.iter().any(|v| v.is_infinite()) {
            return Err(AnalysisError::NonFiniteInput(format!("feature '{feature}'")));
        }
        // NaN marks a missing observation; its residual stays NaN.
        let rows: Vec<usize> = (0..n).filter(|&r| !target[r].is_nan()).collect();
        let n = rows.len();
        if n == 0 {
            return Err(AnalysisError::InsufficientData {
                context: format!("regressor for '{feature}'"),
                found: 0,
                required: 1,
            });
        }

        let x = DMatrix::from_fn(n, k, |i, c| covariates.columns()[c].values[rows[i]]);
        let y = DVector::from_iterator(n, rows.iter().map(|&r| target[r]));

        let (x, y, x_mean, y_mean) = if options.fit_intercept {
            let x_mean: Vec<f64> = x.column_iter().map(|c| c.mean()).collect();
            let y_mean = y.mean();
            let xc = DMatrix::from_fn(n, k, |r, c| x[(r, c)] - x_mean[c]);
            let yc = y.add_scalar(-y_mean);
            (xc, yc, x_mean, y_mean)
        } else {
            (x, y, vec![0.0; k], 0.0)
        };

        if k == 0 {
            return Ok(LinearRegressor {
                intercept: y_mean,
                coefficients: Vec::new(),
            });
        }

        let svd = x.svd(true, true);
        let eps = options.rcond * svd.singular_values.max();
        let beta = svd
            .solve(&y, eps)
            .map_err(|e| AnalysisError::Numerical(format!("least squares for '{feature}': {e}")))?;

        let coefficients: Vec<f64> = beta.iter().copied().collect();
        let intercept = y_mean
            - coefficients
                .iter()
                .zip(x_mean.iter())
                .map(|(b, m)| b * m)
                .sum::<f64>();

        Ok(LinearRegressor {
            intercept,
            coefficients,
        })
    }

    /// Predicted feature values for every row of `covariates`.
    pub fn predict(&self, covariates: &Table) -> Result<Vec<f64>> {
        if covariates.n_cols() != self.coefficients.len() {
            return Err(AnalysisError::ShapeMismatch {
                context: "covariate columns vs fitted coefficients".to_string(),
                left: covariates.n_cols(),
                right: self.coefficients.len(),
            });
        }
        let cols = covariates.columns();
        Ok((0..covariates.n_rows())
            .map(|r| {
                self.intercept
                    + self
                        .coefficients
                        .iter()
                        .zip(cols)
                        .map(|(b, col)| b * col.values[r])
                        .sum::<f64>()
            })
            .collect())
    }
}

// ---------------------------------------------------------------------------
// RegressorBank – feature name → fitted model
// ---------------------------------------------------------------------------

/// Independently fitted regressors, one per feature, sharing one covariate set.
#[derive(Debug, Clone, PartialEq)]
pub struct RegressorBank {
    covariate_names: Vec<String>,
    order: Vec<String>,
    regressors: BTreeMap<String, LinearRegressor>,
}

impl RegressorBank {
    /// Fit one model per feature column of `features`.
    ///
    /// Covariates must be fully observed; any non-finite cell fails before
    /// the first model is fitted.
    pub fn fit(features: &Table, covariates: &Table, options: &LinearModelOptions) -> Result<Self> {
        features.ensure_same_rows(covariates, "features vs covariates")?;
        if let Some(col) = covariates
            .columns()
            .iter()
            .find(|c| c.values.iter().any(|v| !v.is_finite()))
        {
            return Err(AnalysisError::NonFiniteInput(format!("covariate '{}'", col.name)));
        }

        let mut order = Vec::with_capacity(features.n_cols());
        let mut regressors = BTreeMap::new();
        for col in features.columns() {
            let model = LinearRegressor::fit(&col.name, covariates, &col.values, options)?;
            log::debug!(
                "Fitted '{}': intercept {:.4}, coefficients {:?}",
                col.name,
                model.intercept,
                model.coefficients
            );
            order.push(col.name.clone());
            regressors.insert(col.name.clone(), model);
        }

        Ok(RegressorBank {
            covariate_names: covariates.column_names().map(str::to_string).collect(),
            order,
            regressors,
        })
    }

    pub fn get(&self, feature: &str) -> Option<&LinearRegressor> {
        self.regressors.get(feature)
    }

    /// Feature names in the order they were fitted.
    pub fn features(&self) -> &[String] {
        &self.order
    }

    pub fn covariate_names(&self) -> &[String] {
        &self.covariate_names
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::Column;

    fn covariates() -> Table {
        Table::from_columns(vec![
            Column::new("age", vec![50.0, 55.0, 60.0, 65.0, 70.0]),
            Column::new("sex", vec![0.0, 1.0, 0.0, 1.0, 1.0]),
        ])
        .unwrap()
    }

    #[test]
    fn recovers_exact_linear_relation() {
        let cov = covariates();
        // f = 3 + 0.5 * age - 2 * sex
        let target: Vec<f64> = (0..5)
            .map(|r| 3.0 + 0.5 * cov.columns()[0].values[r] - 2.0 * cov.columns()[1].values[r])
            .collect();
        let model =
            LinearRegressor::fit("f", &cov, &target, &LinearModelOptions::default()).unwrap();
        assert!((model.intercept - 3.0).abs() < 1e-8);
        assert!((model.coefficients[0] - 0.5).abs() < 1e-10);
        assert!((model.coefficients[1] + 2.0).abs() < 1e-8);

        let pred = model.predict(&cov).unwrap();
        for (p, t) in pred.iter().zip(target.iter()) {
            assert!((p - t).abs() < 1e-8);
        }
    }

    #[test]
    fn without_intercept_passes_through_origin() {
        let cov = Table::from_columns(vec![Column::new("c", vec![1.0, 2.0, 3.0])]).unwrap();
        let target = [2.0, 4.0, 6.0];
        let options = LinearModelOptions {
            fit_intercept: false,
            ..Default::default()
        };
        let model = LinearRegressor::fit("f", &cov, &target, &options).unwrap();
        assert_eq!(model.intercept, 0.0);
        assert!((model.coefficients[0] - 2.0).abs() < 1e-12);
    }

    #[test]
    fn rank_deficient_design_still_predicts() {
        // duplicated covariate column
        let cov = Table::from_columns(vec![
            Column::new("a", vec![1.0, 2.0, 3.0, 4.0]),
            Column::new("b", vec![1.0, 2.0, 3.0, 4.0]),
        ])
        .unwrap();
        let target = [2.0, 4.0, 6.0, 8.0];
        let model =
            LinearRegressor::fit("f", &cov, &target, &LinearModelOptions::default()).unwrap();
        // minimum-norm split of the weight between the copies
        assert!((model.coefficients[0] - 1.0).abs() < 1e-8);
        assert!((model.coefficients[1] - 1.0).abs() < 1e-8);
        let pred = model.predict(&cov).unwrap();
        assert!((pred[3] - 8.0).abs() < 1e-8);
    }

    #[test]
    fn no_covariates_predicts_mean() {
        let cov = Table::new(vec!["a".into(), "b".into()], vec![]).unwrap();
        let model =
            LinearRegressor::fit("f", &cov, &[1.0, 3.0], &LinearModelOptions::default()).unwrap();
        assert_eq!(model.predict(&cov).unwrap(), vec![2.0, 2.0]);
    }

    #[test]
    fn missing_target_rows_are_skipped() {
        let cov = Table::from_columns(vec![Column::new("c", vec![1.0, 2.0, 3.0, 4.0])]).unwrap();
        let target = [3.0, f64::NAN, 7.0, 9.0];
        let model =
            LinearRegressor::fit("f", &cov, &target, &LinearModelOptions::default()).unwrap();
        assert!((model.intercept - 1.0).abs() < 1e-10);
        assert!((model.coefficients[0] - 2.0).abs() < 1e-10);

        let err = LinearRegressor::fit("f", &cov, &[f64::NAN; 4], &LinearModelOptions::default())
            .unwrap_err();
        assert!(matches!(err, AnalysisError::InsufficientData { found: 0, .. }));
    }

    #[test]
    fn non_finite_inputs_rejected() {
        let cov = covariates();
        let target = [1.0, f64::INFINITY, 3.0, 4.0, 5.0];
        let err = LinearRegressor::fit("f", &cov, &target, &LinearModelOptions::default())
            .unwrap_err();
        assert_eq!(err, AnalysisError::NonFiniteInput("feature 'f'".into()));

        let bad_cov = Table::from_columns(vec![Column::new("age", vec![1.0, f64::NAN])]).unwrap();
        let feats = Table::from_columns(vec![Column::new("f", vec![1.0, 2.0])]).unwrap();
        let err = RegressorBank::fit(&feats, &bad_cov, &LinearModelOptions::default()).unwrap_err();
        assert_eq!(err, AnalysisError::NonFiniteInput("covariate 'age'".into()));
    }

    #[test]
    fn bank_keeps_feature_order() {
        let cov = covariates();
        let feats = Table::from_columns(vec![
            Column::new("zeta", vec![1.0, 2.0, 3.0, 4.0, 5.0]),
            Column::new("alpha", vec![5.0, 4.0, 3.0, 2.0, 1.0]),
        ])
        .unwrap();
        let bank = RegressorBank::fit(&feats, &cov, &LinearModelOptions::default()).unwrap();
        assert_eq!(bank.features(), &["zeta".to_string(), "alpha".to_string()]);
        assert_eq!(bank.covariate_names(), &["age".to_string(), "sex".to_string()]);
        assert!(bank.get("alpha").is_some());
        assert!(bank.get("beta").is_none());
    }
}

//! Covariate control: remove the linear effect of confounding variables.
//!
//! For every feature a least-squares model `feature = f(covariates)` is
//! fitted, and the feature is replaced by its residuals:
//!
//! ```text
//! feature' = feature - regressor.fit(covariates, feature).predict(covariates)
//! ```
//!
//! The two phases are separate types. [`CovariateResidualizer`] only knows
//! how to fit; fitting yields a [`FittedResidualizer`], the only type that can
//! transform. Feature scaling or normalisation, if wanted, happens before.
//!
//! Transforms always predict from the covariates captured at fit time, so a
//! fitted residualizer only applies to tables whose rows align with the
//! training covariates.

pub mod regressor;

use std::borrow::Cow;

pub use regressor::{LinearModelOptions, LinearRegressor, RegressorBank};

use crate::data::model::Table;
use crate::error::{AnalysisError, Result};

// ---------------------------------------------------------------------------
// Capabilities
// ---------------------------------------------------------------------------

/// Something that can be fitted on features and covariates.
pub trait Trainable {
    type Fitted;

    fn fit(
        &self,
        features: &Table,
        covariates: &Table,
        options: &LinearModelOptions,
    ) -> Result<Self::Fitted>;
}

/// Fitted state that maps a feature table to a transformed one.
pub trait Transformer {
    /// Overwrite `features` with the transformed values.
    fn transform_in_place(&self, features: &mut Table) -> Result<()>;

    /// Transformed copy of `features`; the input is left untouched.
    fn transform(&self, features: &Table) -> Result<Table> {
        let mut out = features.clone();
        self.transform_in_place(&mut out)?;
        Ok(out)
    }
}

// ---------------------------------------------------------------------------
// Untrained residualizer
// ---------------------------------------------------------------------------

/// Unfitted covariate controller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CovariateResidualizer {
    /// When set, [`FittedResidualizer::apply`] mutates the caller's table
    /// instead of returning a copy.
    pub inline: bool,
}

impl CovariateResidualizer {
    pub fn new(inline: bool) -> Self {
        CovariateResidualizer { inline }
    }
}

impl Trainable for CovariateResidualizer {
    type Fitted = FittedResidualizer;

    fn fit(
        &self,
        features: &Table,
        covariates: &Table,
        options: &LinearModelOptions,
    ) -> Result<FittedResidualizer> {
        let bank = RegressorBank::fit(features, covariates, options)?;
        log::info!(
            "Fitted {} regressors on {} covariates ({} observations)",
            bank.len(),
            covariates.n_cols(),
            covariates.n_rows()
        );
        Ok(FittedResidualizer {
            bank,
            covariates: covariates.clone(),
            inline: self.inline,
        })
    }
}

// ---------------------------------------------------------------------------
// Fitted residualizer
// ---------------------------------------------------------------------------

/// Regressor bank plus the covariates it was fitted on. Immutable; call
/// [`refit`](Self::refit) to replace it wholesale.
#[derive(Debug, Clone, PartialEq)]
pub struct FittedResidualizer {
    bank: RegressorBank,
    covariates: Table,
    inline: bool,
}

impl FittedResidualizer {
    pub fn bank(&self) -> &RegressorBank {
        &self.bank
    }

    /// Covariates stored at fit time; every transform predicts from these.
    pub fn covariates(&self) -> &Table {
        &self.covariates
    }

    pub fn inline(&self) -> bool {
        self.inline
    }

    /// Discard this state and fit from scratch, keeping the `inline` setting.
    pub fn refit(
        self,
        features: &Table,
        covariates: &Table,
        options: &LinearModelOptions,
    ) -> Result<FittedResidualizer> {
        CovariateResidualizer::new(self.inline).fit(features, covariates, options)
    }

    /// Transform honouring the `inline` flag: mutate and borrow the caller's
    /// table, or leave it alone and return an owned copy.
    pub fn apply<'a>(&self, features: &'a mut Table) -> Result<Cow<'a, Table>> {
        if self.inline {
            self.transform_in_place(features)?;
            let shared: &'a Table = features;
            Ok(Cow::Borrowed(shared))
        } else {
            self.transform(features).map(Cow::Owned)
        }
    }
}

impl Transformer for FittedResidualizer {
    fn transform_in_place(&self, features: &mut Table) -> Result<()> {
        features.ensure_same_rows(&self.covariates, "features vs fitted covariates")?;

        // Predict everything before touching the table so a failure leaves it intact.
        let names: Vec<String> = features.column_names().map(str::to_string).collect();
        let mut predictions = Vec::with_capacity(names.len());
        for name in &names {
            let model = self
                .bank
                .get(name)
                .ok_or_else(|| AnalysisError::MissingRegressor(name.clone()))?;
            predictions.push(model.predict(&self.covariates)?);
        }

        for (name, predicted) in names.iter().zip(predictions) {
            let values = features.column_mut(name)?;
            for (v, p) in values.iter_mut().zip(predicted) {
                *v -= p;
            }
        }
        log::debug!("Residualized {} features", names.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::Column;

    fn covariates() -> Table {
        Table::from_columns(vec![Column::new("age", vec![50.0, 60.0, 70.0, 80.0])]).unwrap()
    }

    fn features() -> Table {
        Table::from_columns(vec![
            // 1 + 0.1 * age + noise
            Column::new("f1", vec![6.5, 6.5, 8.5, 8.5]),
            Column::new("f2", vec![1.0, 2.0, 3.0, 4.0]),
        ])
        .unwrap()
    }

    #[test]
    fn residuals_replace_features() {
        let fitted = CovariateResidualizer::default()
            .fit(&features(), &covariates(), &LinearModelOptions::default())
            .unwrap();
        let out = fitted.transform(&features()).unwrap();
        // f2 is exactly linear in age
        for v in out.column("f2").unwrap() {
            assert!(v.abs() < 1e-10);
        }
        // residuals of a model with intercept sum to zero
        let sum: f64 = out.column("f1").unwrap().iter().sum();
        assert!(sum.abs() < 1e-10);
        assert_eq!(out.row_labels(), features().row_labels());
    }

    #[test]
    fn copy_by_default_inline_when_configured() {
        let options = LinearModelOptions::default();
        let mut input = features();

        let fitted = CovariateResidualizer::default().fit(&input, &covariates(), &options).unwrap();
        let out = fitted.apply(&mut input).unwrap();
        assert!(matches!(out, Cow::Owned(_)));
        assert_eq!(input, features());

        let fitted = fitted.refit(&input, &covariates(), &options).unwrap();
        assert!(!fitted.inline());
        let fitted = CovariateResidualizer::new(true).fit(&input, &covariates(), &options).unwrap();
        let out = fitted.apply(&mut input).unwrap();
        assert!(matches!(out, Cow::Borrowed(_)));
        assert!(input.column("f2").unwrap()[0].abs() < 1e-10);
    }

    #[test]
    fn fit_rejects_row_mismatch() {
        let short = Table::from_columns(vec![Column::new("age", vec![1.0, 2.0])]).unwrap();
        let err = CovariateResidualizer::default()
            .fit(&features(), &short, &LinearModelOptions::default())
            .unwrap_err();
        assert!(matches!(err, AnalysisError::ShapeMismatch { left: 4, right: 2, .. }));
    }

    #[test]
    fn transform_rejects_unknown_feature_without_mutating() {
        let fitted = CovariateResidualizer::default()
            .fit(&features(), &covariates(), &LinearModelOptions::default())
            .unwrap();
        let mut other = Table::from_columns(vec![
            Column::new("f2", vec![1.0, 2.0, 3.0, 4.0]),
            Column::new("f9", vec![1.0, 2.0, 3.0, 4.0]),
        ])
        .unwrap();
        let before = other.clone();
        let err = fitted.transform_in_place(&mut other).unwrap_err();
        assert_eq!(err, AnalysisError::MissingRegressor("f9".into()));
        assert_eq!(other, before);
    }

    #[test]
    fn transform_subset_of_fitted_columns() {
        let fitted = CovariateResidualizer::default()
            .fit(&features(), &covariates(), &LinearModelOptions::default())
            .unwrap();
        let subset = features().select(&["f2"]).unwrap();
        let out = fitted.transform(&subset).unwrap();
        assert_eq!(out.n_cols(), 1);
    }

    #[test]
    fn missing_feature_values_stay_missing() {
        let fitted = CovariateResidualizer::default()
            .fit(&features(), &covariates(), &LinearModelOptions::default())
            .unwrap();
        let mut with_gap = features();
        with_gap.column_mut("f1").unwrap()[2] = f64::NAN;
        let out = fitted.transform(&with_gap).unwrap();
        assert!(out.column("f1").unwrap()[2].is_nan());
    }
}

use thiserror::Error;

// ---------------------------------------------------------------------------
// Error taxonomy for the numeric core
// ---------------------------------------------------------------------------

/// Broad class of an [`AnalysisError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Bad settings, unknown names, mismatched shapes.
    Configuration,
    /// The data itself cannot support the requested computation.
    Data,
}

/// Errors raised by the correlation engine and the covariate residualizer.
///
/// I/O layers (loader, export, plot) wrap these in `anyhow` with context.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AnalysisError {
    #[error("unsupported correlation type '{given}'; supported: {supported}")]
    UnsupportedMetric { given: String, supported: String },

    #[error("unknown column '{name}'; available: [{available}]")]
    UnknownColumn { name: String, available: String },

    #[error("duplicate column '{0}'")]
    DuplicateColumn(String),

    #[error("column '{name}' has {len} values but the table has {rows} rows")]
    RaggedColumn { name: String, len: usize, rows: usize },

    #[error("{context}: row counts differ ({left} vs {right})")]
    ShapeMismatch {
        context: String,
        left: usize,
        right: usize,
    },

    #[error("sequences differ in length ({0} vs {1})")]
    LengthMismatch(usize, usize),

    #[error("no fitted regressor for feature '{0}'")]
    MissingRegressor(String),

    #[error("setting for scale '{0}' lists no correlation types")]
    EmptyMetricList(String),

    #[error("scale '{0}' appears in more than one setting")]
    DuplicateScale(String),

    #[error("{context}: {found} valid paired observations, at least {required} required")]
    InsufficientData {
        context: String,
        found: usize,
        required: usize,
    },

    #[error("{0}: non-finite value in model input")]
    NonFiniteInput(String),

    #[error("numerical failure: {0}")]
    Numerical(String),
}

impl AnalysisError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            AnalysisError::InsufficientData { .. }
            | AnalysisError::NonFiniteInput(_)
            | AnalysisError::Numerical(_) => ErrorCategory::Data,
            _ => ErrorCategory::Configuration,
        }
    }

    pub(crate) fn unknown_column<'a>(
        name: &str,
        available: impl IntoIterator<Item = &'a str>,
    ) -> Self {
        AnalysisError::UnknownColumn {
            name: name.to_string(),
            available: available.into_iter().collect::<Vec<_>>().join(", "),
        }
    }
}

pub type Result<T> = std::result::Result<T, AnalysisError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn categories() {
        let e = AnalysisError::InsufficientData {
            context: "f1".into(),
            found: 0,
            required: 2,
        };
        assert_eq!(e.category(), ErrorCategory::Data);
        assert_eq!(
            AnalysisError::MissingRegressor("f1".into()).category(),
            ErrorCategory::Configuration
        );
    }

    #[test]
    fn unknown_column_lists_available() {
        let e = AnalysisError::unknown_column("age", ["f1", "f2"]);
        assert_eq!(e.to_string(), "unknown column 'age'; available: [f1, f2]");
    }
}

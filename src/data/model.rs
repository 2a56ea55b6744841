use std::collections::BTreeSet;

use crate::error::{AnalysisError, Result};

// ---------------------------------------------------------------------------
// Column – one named numeric variable
// ---------------------------------------------------------------------------

/// A named numeric column. Missing cells are stored as `NaN`.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub values: Vec<f64>,
}

impl Column {
    pub fn new(name: impl Into<String>, values: Vec<f64>) -> Self {
        Column {
            name: name.into(),
            values,
        }
    }

    /// Number of missing (`NaN`) cells.
    pub fn missing_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_nan()).count()
    }
}

// ---------------------------------------------------------------------------
// Table – ordered named columns over shared rows
// ---------------------------------------------------------------------------

/// Dense in-memory table: rows are observations, columns are variables.
///
/// Every column has exactly `row_labels.len()` values and column names are
/// unique. Both invariants are checked on construction, so a `Table` handed
/// to the engine or the residualizer never needs re-validation.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    row_labels: Vec<String>,
    columns: Vec<Column>,
}

impl Table {
    /// Build a table, validating column lengths and name uniqueness.
    pub fn new(row_labels: Vec<String>, columns: Vec<Column>) -> Result<Self> {
        let rows = row_labels.len();
        let mut seen = BTreeSet::new();
        for col in &columns {
            if col.values.len() != rows {
                return Err(AnalysisError::RaggedColumn {
                    name: col.name.clone(),
                    len: col.values.len(),
                    rows,
                });
            }
            if !seen.insert(col.name.as_str()) {
                return Err(AnalysisError::DuplicateColumn(col.name.clone()));
            }
        }
        Ok(Table {
            row_labels,
            columns,
        })
    }

    /// Build a table with positional row labels (`"0"`, `"1"`, ...).
    ///
    /// The row count is taken from the first column; an empty column list
    /// yields an empty table.
    pub fn from_columns(columns: Vec<Column>) -> Result<Self> {
        let rows = columns.first().map(|c| c.values.len()).unwrap_or(0);
        Table::new((0..rows).map(|i| i.to_string()).collect(), columns)
    }

    pub fn n_rows(&self) -> usize {
        self.row_labels.len()
    }

    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty() || self.row_labels.is_empty()
    }

    pub fn row_labels(&self) -> &[String] {
        &self.row_labels
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    /// Values of the named column.
    pub fn column(&self, name: &str) -> Result<&[f64]> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.values.as_slice())
            .ok_or_else(|| AnalysisError::unknown_column(name, self.column_names()))
    }

    /// Mutable values of the named column. Length cannot change through this.
    pub fn column_mut(&mut self, name: &str) -> Result<&mut [f64]> {
        match self.columns.iter().position(|c| c.name == name) {
            Some(i) => Ok(self.columns[i].values.as_mut_slice()),
            None => Err(AnalysisError::unknown_column(name, self.column_names())),
        }
    }

    /// Sub-table with the named columns, in the order given.
    pub fn select<S: AsRef<str>>(&self, names: &[S]) -> Result<Table> {
        let columns = names
            .iter()
            .map(|n| {
                let name = n.as_ref();
                self.column(name).map(|v| Column::new(name, v.to_vec()))
            })
            .collect::<Result<Vec<_>>>()?;
        Table::new(self.row_labels.clone(), columns)
    }

    /// Fail with `ShapeMismatch` unless `other` has the same number of rows.
    pub fn ensure_same_rows(&self, other: &Table, context: &str) -> Result<()> {
        if self.n_rows() != other.n_rows() {
            return Err(AnalysisError::ShapeMismatch {
                context: context.to_string(),
                left: self.n_rows(),
                right: other.n_rows(),
            });
        }
        Ok(())
    }

    /// Boolean missingness grid for the whole table.
    pub fn missing_mask(&self) -> MissingMask {
        let n_rows = self.n_rows();
        let n_cols = self.n_cols();
        let mut cells = vec![false; n_rows * n_cols];
        for (c, col) in self.columns.iter().enumerate() {
            for (r, v) in col.values.iter().enumerate() {
                cells[r * n_cols + c] = v.is_nan();
            }
        }
        MissingMask {
            n_rows,
            n_cols,
            cells,
            row_labels: self.row_labels.clone(),
            column_names: self.column_names().map(str::to_string).collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// MissingMask – which cells are missing
// ---------------------------------------------------------------------------

/// Row-major grid where `true` marks a missing cell.
#[derive(Debug, Clone, PartialEq)]
pub struct MissingMask {
    pub n_rows: usize,
    pub n_cols: usize,
    cells: Vec<bool>,
    pub row_labels: Vec<String>,
    pub column_names: Vec<String>,
}

impl MissingMask {
    pub fn is_missing(&self, row: usize, col: usize) -> bool {
        self.cells[row * self.n_cols + col]
    }

    pub fn missing_count(&self) -> usize {
        self.cells.iter().filter(|&&m| m).count()
    }

    pub fn any_missing(&self) -> bool {
        self.cells.iter().any(|&m| m)
    }

    /// Missing-cell count per column, in column order.
    pub fn column_missing_counts(&self) -> Vec<usize> {
        (0..self.n_cols)
            .map(|c| (0..self.n_rows).filter(|&r| self.is_missing(r, c)).count())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Table {
        Table::from_columns(vec![
            Column::new("a", vec![1.0, f64::NAN, 3.0]),
            Column::new("b", vec![4.0, 5.0, f64::NAN]),
        ])
        .unwrap()
    }

    #[test]
    fn ragged_columns_rejected() {
        let err = Table::from_columns(vec![
            Column::new("a", vec![1.0, 2.0]),
            Column::new("b", vec![1.0]),
        ])
        .unwrap_err();
        assert!(matches!(
            err,
            AnalysisError::RaggedColumn { ref name, len: 1, rows: 2 } if name == "b"
        ));
    }

    #[test]
    fn duplicate_columns_rejected() {
        let err = Table::from_columns(vec![
            Column::new("a", vec![1.0]),
            Column::new("a", vec![2.0]),
        ])
        .unwrap_err();
        assert_eq!(err, AnalysisError::DuplicateColumn("a".into()));
    }

    #[test]
    fn unknown_column_names_available() {
        let t = sample();
        let msg = t.column("zzz").unwrap_err().to_string();
        assert!(msg.contains("'zzz'"));
        assert!(msg.contains("a, b"));
    }

    #[test]
    fn select_keeps_requested_order() {
        let t = sample();
        let s = t.select(&["b", "a"]).unwrap();
        assert_eq!(s.column_names().collect::<Vec<_>>(), vec!["b", "a"]);
        assert_eq!(s.row_labels(), t.row_labels());
    }

    #[test]
    fn missing_mask_counts() {
        let mask = sample().missing_mask();
        assert_eq!(mask.missing_count(), 2);
        assert!(mask.any_missing());
        assert!(mask.is_missing(1, 0));
        assert!(mask.is_missing(2, 1));
        assert!(!mask.is_missing(0, 0));
        assert_eq!(mask.column_missing_counts(), vec![1, 1]);
    }
}

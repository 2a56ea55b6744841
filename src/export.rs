use std::collections::BTreeSet;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use arrow::array::{ArrayRef, Float64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use csv::Writer;
use parquet::arrow::ArrowWriter;

use crate::data::model::Table;
use crate::stats::engine::CorrelationTable;

/// Create the parent directories of `path` if they do not exist yet.
pub fn ensure_directory(path: &Path) -> Result<()> {
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() && !dir.exists() {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("creating directory {}", dir.display()))?;
        }
    }
    Ok(())
}

/// Turn a scale name into a safe file stem.
pub fn sanitize_sheet_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    if cleaned.is_empty() {
        "sheet".to_string()
    } else {
        cleaned
    }
}

// ---------------------------------------------------------------------------
// Result sinks
// ---------------------------------------------------------------------------

/// Persists result tables, one sheet per table, in the order given.
pub trait ResultSink {
    fn save_tables(&self, tables: &[CorrelationTable], sheet_names: &[String]) -> Result<()>;
}

fn sheet_paths(
    root: &Path,
    sheet_names: &[String],
    ext: &str,
    n_tables: usize,
) -> Result<Vec<PathBuf>> {
    if sheet_names.len() != n_tables {
        bail!(
            "{} tables but {} sheet names",
            n_tables,
            sheet_names.len()
        );
    }
    let mut seen = BTreeSet::new();
    let mut out = Vec::with_capacity(sheet_names.len());
    for name in sheet_names {
        let stem = sanitize_sheet_name(name);
        if !seen.insert(stem.clone()) {
            bail!("sheet name '{name}' collides with another sheet");
        }
        out.push(root.join(format!("{stem}.{ext}")));
    }
    Ok(out)
}

/// Workbook stored as a directory with one CSV file per sheet.
#[derive(Debug, Clone)]
pub struct CsvWorkbook {
    pub root: PathBuf,
}

impl CsvWorkbook {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        CsvWorkbook { root: root.into() }
    }
}

impl ResultSink for CsvWorkbook {
    fn save_tables(&self, tables: &[CorrelationTable], sheet_names: &[String]) -> Result<()> {
        let paths = sheet_paths(&self.root, sheet_names, "csv", tables.len())?;
        std::fs::create_dir_all(&self.root)
            .with_context(|| format!("creating workbook {}", self.root.display()))?;

        for (table, path) in tables.iter().zip(paths) {
            let file = File::create(&path)
                .with_context(|| format!("Failed to create CSV file: {}", path.display()))?;
            let mut writer = Writer::from_writer(file);
            writer.write_record(table.headers())?;
            for row in &table.rows {
                writer.write_record(table.record(row))?;
            }
            writer.flush()?;
            log::info!(
                "Wrote sheet '{}' ({} rows) to {}",
                table.scale,
                table.len(),
                path.display()
            );
        }
        Ok(())
    }
}

/// Workbook stored as a directory with one Parquet file per sheet.
#[derive(Debug, Clone)]
pub struct ParquetWorkbook {
    pub root: PathBuf,
}

impl ParquetWorkbook {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        ParquetWorkbook { root: root.into() }
    }
}

fn correlation_batch(table: &CorrelationTable) -> Result<RecordBatch> {
    let headers = table.headers();
    let mut fields = vec![Field::new(&headers[0], DataType::Utf8, false)];
    let features: Vec<&str> = table.rows.iter().map(|r| r.feature.as_str()).collect();
    let mut arrays: Vec<ArrayRef> = vec![Arc::new(StringArray::from(features))];

    for (m, _) in table.metrics.iter().enumerate() {
        let r: Vec<f64> = table.rows.iter().map(|row| row.values[m].r).collect();
        let p: Vec<f64> = table.rows.iter().map(|row| row.values[m].p).collect();
        fields.push(Field::new(&headers[1 + 2 * m], DataType::Float64, false));
        fields.push(Field::new(&headers[2 + 2 * m], DataType::Float64, false));
        arrays.push(Arc::new(Float64Array::from(r)));
        arrays.push(Arc::new(Float64Array::from(p)));
    }

    RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays).context("building record batch")
}

impl ResultSink for ParquetWorkbook {
    fn save_tables(&self, tables: &[CorrelationTable], sheet_names: &[String]) -> Result<()> {
        let paths = sheet_paths(&self.root, sheet_names, "parquet", tables.len())?;
        std::fs::create_dir_all(&self.root)
            .with_context(|| format!("creating workbook {}", self.root.display()))?;

        for (table, path) in tables.iter().zip(paths) {
            let batch = correlation_batch(table)?;
            let file = File::create(&path)
                .with_context(|| format!("Failed to create parquet file: {}", path.display()))?;
            let mut writer = ArrowWriter::try_new(file, batch.schema(), None)?;
            writer.write(&batch)?;
            writer.close()?;
            log::info!(
                "Wrote sheet '{}' ({} rows) to {}",
                table.scale,
                table.len(),
                path.display()
            );
        }
        Ok(())
    }
}

/// Save result tables with sheet names taken from their scales, in order.
pub fn export_tables(sink: &dyn ResultSink, tables: &[CorrelationTable]) -> Result<()> {
    let sheets: Vec<String> = tables.iter().map(|t| t.scale.clone()).collect();
    sink.save_tables(tables, &sheets)
}

// ---------------------------------------------------------------------------
// Feature tables
// ---------------------------------------------------------------------------

/// Write a numeric table as CSV with a leading `index` column of row labels.
/// Missing cells are written empty.
pub fn save_table_csv(table: &Table, path: &Path) -> Result<()> {
    ensure_directory(path)?;
    let mut writer = Writer::from_path(path)
        .with_context(|| format!("Failed to create CSV file: {}", path.display()))?;

    let mut header = vec!["index".to_string()];
    header.extend(table.column_names().map(str::to_string));
    writer.write_record(&header)?;

    for (r, label) in table.row_labels().iter().enumerate() {
        let mut record = vec![label.clone()];
        record.extend(table.columns().iter().map(|c| {
            let v = c.values[r];
            if v.is_nan() { String::new() } else { v.to_string() }
        }));
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::Column;
    use crate::stats::engine::{CorrelationRow, MetricValue};
    use crate::stats::metric::MetricKind;

    fn result_table(scale: &str) -> CorrelationTable {
        CorrelationTable {
            scale: scale.to_string(),
            metrics: vec![MetricKind::Pearson],
            rows: vec![CorrelationRow {
                feature: "f1".into(),
                observations: 5,
                values: vec![MetricValue {
                    kind: MetricKind::Pearson,
                    r: 0.8,
                    p: 0.1041,
                }],
            }],
        }
    }

    #[test]
    fn sanitizes_names() {
        assert_eq!(sanitize_sheet_name("UPDRS III/total"), "UPDRS_III_total");
        assert_eq!(sanitize_sheet_name(""), "sheet");
    }

    #[test]
    fn csv_workbook_one_file_per_sheet() {
        let dir = tempfile::tempdir().unwrap();
        let book = CsvWorkbook::new(dir.path().join("book"));
        export_tables(&book, &[result_table("motor"), result_table("cognition")]).unwrap();

        let text = std::fs::read_to_string(dir.path().join("book/motor.csv")).unwrap();
        assert_eq!(text, "feature,r (pearson),p (pearson)\nf1,0.8,0.1041\n");
        assert!(dir.path().join("book/cognition.csv").exists());
    }

    #[test]
    fn sheet_count_must_match() {
        let dir = tempfile::tempdir().unwrap();
        let book = CsvWorkbook::new(dir.path());
        assert!(book.save_tables(&[result_table("a")], &[]).is_err());
    }

    #[test]
    fn colliding_sheet_names_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let book = CsvWorkbook::new(dir.path());
        let names = vec!["a/b".to_string(), "a_b".to_string()];
        assert!(book.save_tables(&[result_table("x"), result_table("y")], &names).is_err());
    }

    #[test]
    fn parquet_workbook_written() {
        let dir = tempfile::tempdir().unwrap();
        let book = ParquetWorkbook::new(dir.path());
        export_tables(&book, &[result_table("motor")]).unwrap();
        assert!(dir.path().join("motor.parquet").exists());
    }

    #[test]
    fn feature_table_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out/features.csv");
        let t = Table::from_columns(vec![Column::new("f", vec![1.5, f64::NAN])]).unwrap();
        save_table_csv(&t, &path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "index,f\n0,1.5\n1,\n");
    }
}

use std::path::Path;

use anyhow::{Context, Result, anyhow, bail};
use arrow::array::{Array, ArrayRef, AsArray};
use arrow::compute::cast;
use arrow::datatypes::{DataType, Float64Type};
use arrow::util::display::array_value_to_string;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::model::{Column, Table};

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// How to interpret a loaded file.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct LoadOptions {
    /// Column holding observation identifiers. It becomes the row labels
    /// and is not treated as a numeric variable.
    #[serde(default)]
    pub index_column: Option<String>,
}

impl LoadOptions {
    pub fn with_index(column: impl Into<String>) -> Self {
        LoadOptions {
            index_column: Some(column.into()),
        }
    }
}

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load a numeric table from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv`     – header row with column names, one observation per row
/// * `.json`    – `[{ "subject": "s1", "age": 61, ... }, ...]`
/// * `.parquet` – flat schema of numeric (or boolean) columns
///
/// Empty cells and the usual missing markers (`NA`, `NaN`, `null`, ...)
/// become `NaN`.
pub fn load_table(path: &Path, options: &LoadOptions) -> Result<Table> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let table = match ext.as_str() {
        "parquet" | "pq" => load_parquet(path, options),
        "json" => load_json(path, options),
        "csv" => load_csv(path, options),
        other => bail!("Unsupported file extension: .{other}"),
    }
    .with_context(|| format!("loading {}", path.display()))?;

    log::info!(
        "Loaded {} ({} rows x {} columns)",
        path.display(),
        table.n_rows(),
        table.n_cols()
    );
    Ok(table)
}

/// Accumulates named columns and optional row labels while a file is read.
struct ColumnAccumulator {
    names: Vec<String>,
    values: Vec<Vec<f64>>,
    labels: Vec<String>,
    has_index: bool,
}

impl ColumnAccumulator {
    fn new(names: Vec<String>, has_index: bool) -> Self {
        let values = vec![Vec::new(); names.len()];
        ColumnAccumulator {
            names,
            values,
            labels: Vec::new(),
            has_index,
        }
    }

    fn finish(self) -> Result<Table> {
        let columns = self
            .names
            .into_iter()
            .zip(self.values)
            .map(|(name, values)| Column::new(name, values))
            .collect();
        let table = if self.has_index {
            Table::new(self.labels, columns)?
        } else {
            Table::from_columns(columns)?
        };
        Ok(table)
    }
}

// ---------------------------------------------------------------------------
// Cell parsing
// ---------------------------------------------------------------------------

const MISSING_MARKERS: &[&str] = &["", "na", "nan", "n/a", "null", "none"];

/// Parse one text cell into a number, `NaN` for missing markers.
pub fn parse_cell(raw: &str) -> Option<f64> {
    let s = raw.trim();
    if MISSING_MARKERS.contains(&s.to_ascii_lowercase().as_str()) {
        return Some(f64::NAN);
    }
    if let Ok(v) = s.parse::<f64>() {
        return Some(v);
    }
    match s {
        "true" | "True" => Some(1.0),
        "false" | "False" => Some(0.0),
        _ => None,
    }
}

fn parse_cell_at(raw: &str, row: usize, col: &str) -> Result<f64> {
    parse_cell(raw).with_context(|| format!("Row {row}, column '{col}': '{raw}' is not a number"))
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

fn load_csv(path: &Path, options: &LoadOptions) -> Result<Table> {
    let mut reader = csv::Reader::from_path(path).context("opening CSV")?;
    let headers: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let index_idx = match &options.index_column {
        Some(name) => Some(
            headers
                .iter()
                .position(|h| h == name)
                .with_context(|| format!("CSV missing index column '{name}'"))?,
        ),
        None => None,
    };

    let value_cols: Vec<(usize, String)> = headers
        .iter()
        .enumerate()
        .filter(|(i, _)| Some(*i) != index_idx)
        .map(|(i, h)| (i, h.clone()))
        .collect();

    let mut builder = ColumnAccumulator::new(
        value_cols.iter().map(|(_, n)| n.clone()).collect(),
        index_idx.is_some(),
    );

    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;

        if let Some(idx) = index_idx {
            builder.labels.push(record.get(idx).unwrap_or("").to_string());
        }
        for (slot, (col_idx, name)) in value_cols.iter().enumerate() {
            let raw = record.get(*col_idx).unwrap_or("");
            builder.values[slot].push(parse_cell_at(raw, row_no, name)?);
        }
    }

    builder.finish()
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Expected JSON schema (records-oriented, `df.to_json(orient='records')`):
///
/// ```json
/// [
///   { "subject": "s01", "age": 61, "updrs": 23.5 },
///   { "subject": "s02", "age": 57, "updrs": null }
/// ]
/// ```
///
/// Column order follows the keys of the first record.
fn load_json(path: &Path, options: &LoadOptions) -> Result<Table> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    let root: JsonValue = serde_json::from_str(&text).context("parsing JSON")?;

    let records = root
        .as_array()
        .context("Expected top-level JSON array")?;

    let first = match records.first() {
        Some(rec) => rec.as_object().context("Row 0 is not a JSON object")?,
        None => return Ok(Table::from_columns(Vec::new())?),
    };

    let index = options.index_column.as_deref();
    if let Some(name) = index {
        if !first.contains_key(name) {
            bail!("JSON missing index column '{name}'");
        }
    }
    let names: Vec<String> = first
        .keys()
        .filter(|k| Some(k.as_str()) != index)
        .cloned()
        .collect();

    let mut builder = ColumnAccumulator::new(names.clone(), index.is_some());

    for (i, rec) in records.iter().enumerate() {
        let obj = rec
            .as_object()
            .with_context(|| format!("Row {i} is not a JSON object"))?;

        if let Some(name) = index {
            let label = match obj.get(name) {
                Some(JsonValue::String(s)) => s.clone(),
                Some(other) => other.to_string(),
                None => bail!("Row {i}: missing index column '{name}'"),
            };
            builder.labels.push(label);
        }

        for (slot, name) in names.iter().enumerate() {
            let value = json_to_f64(obj.get(name), i, name)?;
            builder.values[slot].push(value);
        }
    }

    builder.finish()
}

fn json_to_f64(val: Option<&JsonValue>, row: usize, col: &str) -> Result<f64> {
    match val {
        None | Some(JsonValue::Null) => Ok(f64::NAN),
        Some(JsonValue::Number(n)) => n
            .as_f64()
            .with_context(|| format!("Row {row}, column '{col}': number out of range")),
        Some(JsonValue::Bool(b)) => Ok(if *b { 1.0 } else { 0.0 }),
        Some(JsonValue::String(s)) => parse_cell_at(s, row, col),
        Some(other) => bail!("Row {row}, column '{col}': unexpected value {other}"),
    }
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file with one numeric column per variable.
///
/// Works with files written by both **Pandas** (`df.to_parquet()`) and
/// **Polars** (`df.write_parquet()`). Integer, float and boolean columns are
/// widened to `f64`; string columns are parsed cell by cell.
fn load_parquet(path: &Path, options: &LoadOptions) -> Result<Table> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .context("reading parquet metadata")?;

    let schema = builder.schema().clone();
    let index_idx = match &options.index_column {
        Some(name) => Some(
            schema
                .index_of(name)
                .map_err(|_| anyhow!("Parquet file missing index column '{name}'"))?,
        ),
        None => None,
    };
    let value_cols: Vec<(usize, String)> = schema
        .fields()
        .iter()
        .enumerate()
        .filter(|(i, _)| Some(*i) != index_idx)
        .map(|(i, f)| (i, f.name().clone()))
        .collect();

    let reader = builder.build().context("building parquet reader")?;
    let mut table = ColumnAccumulator::new(
        value_cols.iter().map(|(_, n)| n.clone()).collect(),
        index_idx.is_some(),
    );
    let mut row_offset = 0;

    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;

        if let Some(idx) = index_idx {
            let col = batch.column(idx);
            for row in 0..batch.num_rows() {
                let label = if col.is_null(row) {
                    String::new()
                } else {
                    array_value_to_string(col.as_ref(), row)?
                };
                table.labels.push(label);
            }
        }

        for (slot, (col_idx, name)) in value_cols.iter().enumerate() {
            let values = column_to_f64(batch.column(*col_idx), row_offset, name)?;
            table.values[slot].extend(values);
        }
        row_offset += batch.num_rows();
    }

    table.finish()
}

/// Convert one Arrow column to `f64`, nulls as `NaN`.
fn column_to_f64(col: &ArrayRef, row_offset: usize, name: &str) -> Result<Vec<f64>> {
    match col.data_type() {
        DataType::Utf8 | DataType::LargeUtf8 => (0..col.len())
            .map(|row| {
                if col.is_null(row) {
                    return Ok(f64::NAN);
                }
                let raw = array_value_to_string(col.as_ref(), row)?;
                parse_cell_at(&raw, row_offset + row, name)
            })
            .collect(),
        DataType::Int8
        | DataType::Int16
        | DataType::Int32
        | DataType::Int64
        | DataType::UInt8
        | DataType::UInt16
        | DataType::UInt32
        | DataType::UInt64
        | DataType::Float16
        | DataType::Float32
        | DataType::Float64
        | DataType::Boolean => {
            let widened = cast(col.as_ref(), &DataType::Float64)
                .with_context(|| format!("casting column '{name}' to Float64"))?;
            let arr = widened.as_primitive::<Float64Type>();
            Ok(arr.iter().map(|v| v.unwrap_or(f64::NAN)).collect())
        }
        other => bail!("Column '{name}' has unsupported type {other:?}"),
    }
}

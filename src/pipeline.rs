use anyhow::{Context, Result};

use crate::config::{AnalysisConfig, WorkbookFormat};
use crate::data::loader::load_table;
use crate::data::model::Table;
use crate::export::{CsvWorkbook, ParquetWorkbook, ResultSink, export_tables, save_table_csv};
use crate::plot::save_missing_values;
use crate::residualize::{CovariateResidualizer, Trainable, Transformer};
use crate::stats::engine::{CorrelationEngine, CorrelationTable};

/// Everything one configured run produced.
#[derive(Debug, Clone)]
pub struct AnalysisReport {
    /// Feature table the correlations were computed on (residualized if configured).
    pub features: Table,
    pub tables: Vec<CorrelationTable>,
    /// Missing cells in the raw feature table, when a heatmap was written.
    pub missing_cells: Option<usize>,
}

/// Load → (plot) → (residualize) → correlate → export.
///
/// Export only happens after every table has been computed.
pub fn run_analysis(config: &AnalysisConfig) -> Result<AnalysisReport> {
    let options = config.input.load_options();
    let mut features = load_table(&config.input.features, &options)?;
    let targets = load_table(&config.input.targets, &options)?;

    let missing_cells = match &config.output.missing_values {
        Some(path) => Some(save_missing_values(&features, &config.missing_values, path)?),
        None => None,
    };

    if let Some(res) = &config.residualize {
        let covariates = targets
            .select(&res.covariates)
            .context("selecting covariates from the target table")?;
        let fitted = CovariateResidualizer::new(res.inline)
            .fit(&features, &covariates, &res.model)
            .context("fitting covariate models")?;
        if fitted.inline() {
            fitted.transform_in_place(&mut features)?;
        } else {
            features = fitted.transform(&features)?;
        }
        if let Some(path) = &config.output.residualized_features {
            save_table_csv(&features, path)?;
        }
    }

    let tables = CorrelationEngine::new(config.empty_pairs)
        .assess(&features, &targets, &config.correlation)
        .context("assessing correlations")?;

    if let Some(root) = &config.output.workbook {
        let sink: Box<dyn ResultSink> = match config.output.format {
            WorkbookFormat::Csv => Box::new(CsvWorkbook::new(root)),
            WorkbookFormat::Parquet => Box::new(ParquetWorkbook::new(root)),
        };
        export_tables(sink.as_ref(), &tables)?;
    }

    Ok(AnalysisReport {
        features,
        tables,
        missing_cells,
    })
}

//! Headless run of a TOML analysis config:
//! load → (heatmap) → (residualize) → correlate → export.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use rusty_covar::config::{AnalysisConfig, WorkbookFormat};
use rusty_covar::pipeline::run_analysis;
use rusty_covar::stats::EmptyPairPolicy;

#[derive(Parser, Debug)]
#[command(name = "covar-assess", version, about = "Correlate features with clinical scales")]
struct Args {
    /// Analysis config (TOML)
    #[arg(env = "COVAR_CONFIG")]
    config: PathBuf,

    /// Override the output workbook directory
    #[arg(long)]
    workbook: Option<PathBuf>,

    /// Write parquet sheets instead of CSV
    #[arg(long)]
    parquet: bool,

    /// Report NaN instead of failing when a feature has no complete pairs
    #[arg(long)]
    emit_nan: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut config = AnalysisConfig::load(&args.config)?;
    if let Some(root) = args.workbook {
        config.output.workbook = Some(root);
    }
    if args.parquet {
        config.output.format = WorkbookFormat::Parquet;
    }
    if args.emit_nan {
        config.empty_pairs = EmptyPairPolicy::EmitNan;
    }

    let report = run_analysis(&config)?;

    if let Some(missing) = report.missing_cells {
        log::info!("Feature table has {missing} missing cells");
    }
    for table in &report.tables {
        let nan_rows = table
            .rows
            .iter()
            .filter(|r| r.values.iter().any(|v| v.r.is_nan()))
            .count();
        log::info!(
            "Scale '{}': {} features, {} without a defined correlation",
            table.scale,
            table.len(),
            nan_rows
        );
    }
    match &config.output.workbook {
        Some(root) => println!("Wrote {} sheets to {}", report.tables.len(), root.display()),
        None => println!("Computed {} tables (no workbook configured)", report.tables.len()),
    }
    Ok(())
}

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use rusty_covar::color::ColorMapKind;
use rusty_covar::data::filter::pairwise_complete;
use rusty_covar::data::loader::{LoadOptions, load_table};
use rusty_covar::data::model::Table;
use rusty_covar::export::{CsvWorkbook, export_tables};
use rusty_covar::residualize::{CovariateResidualizer, LinearModelOptions, Trainable, Transformer};
use rusty_covar::stats::{
    CorrelationEngine, CorrelationSetting, CorrelationTable, EmptyPairPolicy, MetricKind,
};

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// What the central panel shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CentralView {
    MissingValues,
    Results,
    Scatter,
}

/// A table plus the file it came from.
#[derive(Debug, Clone)]
pub struct LoadedTable {
    pub path: PathBuf,
    pub table: Table,
}

/// Scale being edited in the side panel before it is added to the settings.
#[derive(Debug, Clone)]
pub struct SettingDraft {
    pub scale: String,
    pub field_name: Option<String>,
    pub metrics: [bool; 3],
}

impl Default for SettingDraft {
    fn default() -> Self {
        Self {
            scale: String::new(),
            field_name: None,
            metrics: [true, true, false],
        }
    }
}

impl SettingDraft {
    fn selected_metrics(&self) -> Vec<MetricKind> {
        MetricKind::ALL
            .iter()
            .zip(self.metrics)
            .filter(|(_, on)| *on)
            .map(|(k, _)| *k)
            .collect()
    }
}

/// The full UI state, independent of rendering.
pub struct AppState {
    pub features: Option<LoadedTable>,
    pub targets: Option<LoadedTable>,

    /// Observation id column used when loading both tables (blank = none).
    pub index_column: String,

    /// Configured scales, in output order.
    pub settings: Vec<CorrelationSetting>,
    pub draft: SettingDraft,

    /// Regress these target columns out of the features before correlating.
    pub residualize: bool,
    pub covariates: BTreeSet<String>,
    pub fit_intercept: bool,

    pub empty_pairs: EmptyPairPolicy,

    /// Results of the last run, one table per scale.
    pub results: Vec<CorrelationTable>,
    /// Feature table the last run correlated (residualized if enabled).
    pub analyzed_features: Option<Table>,

    /// (scale, feature) picked in the results grid for the scatter view.
    pub selected: Option<(String, String)>,

    pub view: CentralView,
    pub heatmap_cmap: ColorMapKind,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            features: None,
            targets: None,
            index_column: String::new(),
            settings: Vec::new(),
            draft: SettingDraft::default(),
            residualize: false,
            covariates: BTreeSet::new(),
            fit_intercept: true,
            empty_pairs: EmptyPairPolicy::EmitNan,
            results: Vec::new(),
            analyzed_features: None,
            selected: None,
            view: CentralView::MissingValues,
            heatmap_cmap: ColorMapKind::Greys,
            status_message: None,
        }
    }
}

impl AppState {
    fn load_options(&self) -> LoadOptions {
        let index = self.index_column.trim();
        LoadOptions {
            index_column: (!index.is_empty()).then(|| index.to_string()),
        }
    }

    fn report<T>(&mut self, result: anyhow::Result<T>) -> Option<T> {
        match result {
            Ok(v) => {
                self.status_message = None;
                Some(v)
            }
            Err(e) => {
                log::error!("{e:#}");
                self.status_message = Some(format!("Error: {e:#}"));
                None
            }
        }
    }

    /// Load the feature table; clears results computed on the previous one.
    pub fn load_features(&mut self, path: &Path) {
        let loaded = load_table(path, &self.load_options());
        if let Some(table) = self.report(loaded) {
            self.features = Some(LoadedTable {
                path: path.to_path_buf(),
                table,
            });
            self.clear_results();
            self.view = CentralView::MissingValues;
        }
    }

    /// Load the target table; settings referring to vanished columns are dropped.
    pub fn load_targets(&mut self, path: &Path) {
        let loaded = load_table(path, &self.load_options());
        if let Some(table) = self.report(loaded) {
            self.settings.retain(|s| table.has_column(&s.field_name));
            self.covariates.retain(|c| table.has_column(c));
            if !self
                .draft
                .field_name
                .as_deref()
                .is_some_and(|f| table.has_column(f))
            {
                self.draft.field_name = table.column_names().next().map(str::to_string);
            }
            self.targets = Some(LoadedTable {
                path: path.to_path_buf(),
                table,
            });
            self.clear_results();
        }
    }

    fn clear_results(&mut self) {
        self.results.clear();
        self.analyzed_features = None;
        self.selected = None;
    }

    /// Turn the draft into a setting. The scale name defaults to the field.
    pub fn add_draft_setting(&mut self) {
        let Some(field) = self.draft.field_name.clone() else {
            self.status_message = Some("Pick a target column first".into());
            return;
        };
        let metrics = self.draft.selected_metrics();
        if metrics.is_empty() {
            self.status_message = Some("Select at least one correlation type".into());
            return;
        }
        let scale = match self.draft.scale.trim() {
            "" => field.clone(),
            s => s.to_string(),
        };
        if self.settings.iter().any(|s| s.scale == scale) {
            self.status_message = Some(format!("Scale '{scale}' already exists"));
            return;
        }
        self.settings.push(CorrelationSetting::new(scale, field, metrics));
        self.draft.scale.clear();
        self.status_message = None;
    }

    pub fn remove_setting(&mut self, index: usize) {
        if index < self.settings.len() {
            self.settings.remove(index);
        }
    }

    pub fn toggle_covariate(&mut self, column: &str) {
        if !self.covariates.remove(column) {
            self.covariates.insert(column.to_string());
        }
    }

    pub fn can_run(&self) -> bool {
        self.features.is_some() && self.targets.is_some() && !self.settings.is_empty()
    }

    /// Residualize (if enabled) and correlate with the current settings.
    pub fn run(&mut self) {
        let (Some(features), Some(targets)) = (&self.features, &self.targets) else {
            self.status_message = Some("Load a feature table and a target table first".into());
            return;
        };
        let outcome = analyze(
            &features.table,
            &targets.table,
            &self.settings,
            self.residualize.then_some(&self.covariates),
            self.fit_intercept,
            self.empty_pairs,
        );
        if let Some((analyzed, tables)) = self.report(outcome) {
            log::info!("Computed {} result tables", tables.len());
            self.analyzed_features = Some(analyzed);
            self.results = tables;
            self.selected = None;
            self.view = CentralView::Results;
        }
    }

    /// Write the current results as a CSV workbook directory.
    pub fn export(&mut self, root: &Path) {
        let written = export_tables(&CsvWorkbook::new(root), &self.results);
        if self.report(written).is_some() {
            self.status_message = Some(format!("Exported to {}", root.display()));
        }
    }

    /// Complete (feature, target) pairs for the selected cell of the grid.
    pub fn selected_pairs(&self) -> Option<(Vec<f64>, Vec<f64>)> {
        let (scale, feature) = self.selected.as_ref()?;
        let setting = self.settings.iter().find(|s| &s.scale == scale)?;
        let x = self.analyzed_features.as_ref()?.column(feature).ok()?;
        let y = self.targets.as_ref()?.table.column(&setting.field_name).ok()?;
        Some(pairwise_complete(x, y))
    }
}

fn analyze(
    features: &Table,
    targets: &Table,
    settings: &[CorrelationSetting],
    covariates: Option<&BTreeSet<String>>,
    fit_intercept: bool,
    empty_pairs: EmptyPairPolicy,
) -> anyhow::Result<(Table, Vec<CorrelationTable>)> {
    let analyzed = match covariates {
        Some(names) if !names.is_empty() => {
            let names: Vec<&String> = names.iter().collect();
            let cov = targets.select(&names)?;
            let options = LinearModelOptions {
                fit_intercept,
                ..Default::default()
            };
            CovariateResidualizer::default()
                .fit(features, &cov, &options)?
                .transform(features)?
        }
        _ => features.clone(),
    };
    let tables = CorrelationEngine::new(empty_pairs).assess(&analyzed, targets, settings)?;
    Ok((analyzed, tables))
}

use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};
use rusty_covar::color::ColorMapKind;
use rusty_covar::stats::{EmptyPairPolicy, MetricKind};

use crate::state::{AppState, CentralView};

// ---------------------------------------------------------------------------
// Left side panel – analysis settings
// ---------------------------------------------------------------------------

/// Render the left settings panel.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Analysis");
    ui.separator();

    let target_columns: Vec<String> = match &state.targets {
        Some(t) => t.table.column_names().map(str::to_string).collect(),
        None => {
            ui.label("No target table loaded.");
            return;
        }
    };

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            // ---- New scale ----
            ui.strong("Add scale");
            let current = state.draft.field_name.clone().unwrap_or_default();
            egui::ComboBox::from_id_salt("field_name")
                .selected_text(&current)
                .show_ui(ui, |ui: &mut Ui| {
                    for col in &target_columns {
                        if ui.selectable_label(current == *col, col).clicked() {
                            state.draft.field_name = Some(col.clone());
                        }
                    }
                });
            ui.horizontal(|ui: &mut Ui| {
                ui.label("Name");
                ui.text_edit_singleline(&mut state.draft.scale);
            });
            ui.horizontal(|ui: &mut Ui| {
                for (kind, on) in MetricKind::ALL.iter().zip(state.draft.metrics.iter_mut()) {
                    ui.checkbox(on, kind.as_str());
                }
            });
            if ui.button("Add").clicked() {
                state.add_draft_setting();
            }
            ui.separator();

            // ---- Configured scales ----
            ui.strong(format!("Scales ({})", state.settings.len()));
            let mut remove = None;
            for (i, setting) in state.settings.iter().enumerate() {
                ui.horizontal(|ui: &mut Ui| {
                    if ui.small_button("✕").clicked() {
                        remove = Some(i);
                    }
                    let metrics: Vec<&str> =
                        setting.correlation.iter().map(|k| k.as_str()).collect();
                    ui.label(format!(
                        "{} ← {} [{}]",
                        setting.scale,
                        setting.field_name,
                        metrics.join(", ")
                    ));
                });
            }
            if let Some(i) = remove {
                state.remove_setting(i);
            }
            ui.separator();

            // ---- Covariates ----
            egui::CollapsingHeader::new(RichText::new(format!(
                "Covariates  ({}/{})",
                state.covariates.len(),
                target_columns.len()
            ))
            .strong())
            .id_salt("covariates")
            .default_open(false)
            .show(ui, |ui: &mut Ui| {
                ui.checkbox(&mut state.residualize, "Regress out before correlating");
                ui.checkbox(&mut state.fit_intercept, "Fit intercept");
                for col in &target_columns {
                    let mut checked = state.covariates.contains(col);
                    if ui.checkbox(&mut checked, col).changed() {
                        state.toggle_covariate(col);
                    }
                }
            });
            ui.separator();

            let mut emit_nan = state.empty_pairs == EmptyPairPolicy::EmitNan;
            if ui
                .checkbox(&mut emit_nan, "Report NaN for features without complete pairs")
                .changed()
            {
                state.empty_pairs = if emit_nan {
                    EmptyPairPolicy::EmitNan
                } else {
                    EmptyPairPolicy::Fail
                };
            }

            ui.add_space(8.0);
            if ui
                .add_enabled(state.can_run(), egui::Button::new("Run"))
                .clicked()
            {
                state.run();
            }
        });
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Open features…").clicked() {
                if let Some(path) = pick_table_file("Open feature table") {
                    state.load_features(&path);
                }
                ui.close_menu();
            }
            if ui.button("Open targets…").clicked() {
                if let Some(path) = pick_table_file("Open target table") {
                    state.load_targets(&path);
                }
                ui.close_menu();
            }
            ui.separator();
            if ui
                .add_enabled(!state.results.is_empty(), egui::Button::new("Export results…"))
                .clicked()
            {
                export_dialog(state);
                ui.close_menu();
            }
        });

        ui.separator();
        ui.label("Index column");
        ui.add(egui::TextEdit::singleline(&mut state.index_column).desired_width(80.0));

        ui.separator();
        for (view, label) in [
            (CentralView::MissingValues, "Missing values"),
            (CentralView::Results, "Results"),
            (CentralView::Scatter, "Scatter"),
        ] {
            if ui.selectable_label(state.view == view, label).clicked() {
                state.view = view;
            }
        }

        if state.view == CentralView::MissingValues {
            egui::ComboBox::from_id_salt("heatmap_cmap")
                .selected_text(state.heatmap_cmap.name())
                .show_ui(ui, |ui: &mut Ui| {
                    for cmap in ColorMapKind::ALL {
                        ui.selectable_value(&mut state.heatmap_cmap, cmap, cmap.name());
                    }
                });
        }

        ui.separator();
        if let Some(f) = &state.features {
            ui.label(format!(
                "{} observations × {} features",
                f.table.n_rows(),
                f.table.n_cols()
            ));
        }

        if let Some(msg) = &state.status_message {
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });
}

// ---------------------------------------------------------------------------
// File dialogs
// ---------------------------------------------------------------------------

fn pick_table_file(title: &str) -> Option<std::path::PathBuf> {
    rfd::FileDialog::new()
        .set_title(title)
        .add_filter("Supported files", &["csv", "json", "parquet", "pq"])
        .add_filter("CSV", &["csv"])
        .add_filter("JSON", &["json"])
        .add_filter("Parquet", &["parquet", "pq"])
        .pick_file()
}

fn export_dialog(state: &mut AppState) {
    let folder = rfd::FileDialog::new()
        .set_title("Export workbook (one CSV per scale)")
        .pick_folder();

    if let Some(root) = folder {
        state.export(&root);
    }
}

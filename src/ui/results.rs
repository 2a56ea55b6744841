use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};
use egui_extras::{Column, TableBuilder};
use rusty_covar::stats::CorrelationTable;

use crate::state::{AppState, CentralView};

// ---------------------------------------------------------------------------
// Result tables (central panel)
// ---------------------------------------------------------------------------

/// p-values below this are highlighted.
const SIGNIFICANCE: f64 = 0.05;

fn fmt_value(v: f64) -> String {
    if v.is_nan() { "NaN".to_string() } else { format!("{v:.4}") }
}

/// One collapsible table per scale. Clicking a feature opens its scatter plot.
pub fn result_tables(ui: &mut Ui, state: &mut AppState) {
    if state.results.is_empty() {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.heading("No results yet – configure scales and press Run");
        });
        return;
    }

    let mut picked: Option<(String, String)> = None;

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            for table in &state.results {
                egui::CollapsingHeader::new(RichText::new(&table.scale).strong())
                    .id_salt(("scale", &table.scale))
                    .default_open(true)
                    .show(ui, |ui: &mut Ui| {
                        let clicked = ui
                            .push_id(("table", &table.scale), |ui: &mut Ui| scale_grid(ui, table))
                            .inner;
                        if let Some(feature) = clicked {
                            picked = Some((table.scale.clone(), feature));
                        }
                    });
            }
        });

    if let Some(sel) = picked {
        state.selected = Some(sel);
        state.view = CentralView::Scatter;
    }
}

/// Grid for one scale; returns the feature whose name was clicked.
fn scale_grid(ui: &mut Ui, table: &CorrelationTable) -> Option<String> {
    let headers = table.headers();
    let mut builder = TableBuilder::new(ui)
        .striped(true)
        .resizable(true)
        .vscroll(false)
        .column(Column::auto().at_least(140.0));
    for _ in 1..headers.len() {
        builder = builder.column(Column::auto().at_least(80.0));
    }

    let mut clicked = None;
    builder
        .header(20.0, |mut header| {
            for h in &headers {
                header.col(|ui: &mut Ui| {
                    ui.strong(h);
                });
            }
        })
        .body(|mut body| {
            for row in &table.rows {
                body.row(18.0, |mut tr| {
                    tr.col(|ui: &mut Ui| {
                        if ui.selectable_label(false, &row.feature).clicked() {
                            clicked = Some(row.feature.clone());
                        }
                    });
                    for value in &row.values {
                        tr.col(|ui: &mut Ui| {
                            ui.label(fmt_value(value.r));
                        });
                        tr.col(|ui: &mut Ui| {
                            let text = RichText::new(fmt_value(value.p));
                            if value.p < SIGNIFICANCE {
                                ui.label(text.color(Color32::from_rgb(200, 80, 40)));
                            } else {
                                ui.label(text);
                            }
                        });
                    }
                });
            }
        });
    clicked
}

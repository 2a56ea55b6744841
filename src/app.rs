use eframe::egui;

use crate::state::{AppState, CentralView};
use crate::ui::{heatmap, panels, results, scatter};

// ---------------------------------------------------------------------------
// eframe App implementation
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct RustyCovarApp {
    pub state: AppState,
}

impl eframe::App for RustyCovarApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // ---- Top panel: menu bar ----
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            panels::top_bar(ui, &mut self.state);
        });

        // ---- Left side panel: scales and covariates ----
        egui::SidePanel::left("settings_panel")
            .default_width(260.0)
            .resizable(true)
            .show(ctx, |ui| {
                panels::side_panel(ui, &mut self.state);
            });

        // ---- Central panel ----
        egui::CentralPanel::default().show(ctx, |ui| match self.state.view {
            CentralView::MissingValues => heatmap::missing_values(ui, &self.state),
            CentralView::Results => results::result_tables(ui, &mut self.state),
            CentralView::Scatter => scatter::scatter_plot(ui, &self.state),
        });
    }
}

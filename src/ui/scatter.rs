use eframe::egui::{Color32, Ui};
use egui_plot::{Legend, Plot, PlotPoints, Points};
use rusty_covar::color::generate_palette;
use rusty_covar::stats::MetricKind;

use crate::state::AppState;

// ---------------------------------------------------------------------------
// Feature vs. target scatter (central panel)
// ---------------------------------------------------------------------------

/// Plot the complete pairs behind the selected result row.
pub fn scatter_plot(ui: &mut Ui, state: &AppState) {
    let Some((scale, feature)) = &state.selected else {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.heading("Click a feature in the results to plot it");
        });
        return;
    };
    let Some((x, y)) = state.selected_pairs() else {
        ui.label(format!("'{feature}' is not available for scale '{scale}'"));
        return;
    };

    let summary = state
        .results
        .iter()
        .find(|t| &t.scale == scale)
        .and_then(|t| t.rows.iter().find(|r| &r.feature == feature))
        .map(|row| {
            let parts: Vec<String> = row
                .values
                .iter()
                .map(|v| format!("{} r={:.4} p={:.4}", v.kind, v.r, v.p))
                .collect();
            format!("n={}  {}", row.observations, parts.join("  "))
        })
        .unwrap_or_default();
    ui.label(format!("{feature} vs. {scale}   {summary}"));
    if x.len() < MetricKind::Pearson.min_observations() {
        ui.label("Too few complete pairs to correlate.");
    }

    let [r, g, b] = generate_palette(1)[0];
    let points: PlotPoints = x.iter().zip(&y).map(|(&fx, &ty)| [fx, ty]).collect();

    Plot::new("scatter_plot")
        .legend(Legend::default())
        .x_axis_label(feature.as_str())
        .y_axis_label(scale.as_str())
        .show(ui, |plot_ui| {
            plot_ui.points(
                Points::new(points)
                    .name(format!("{} complete pairs", x.len()))
                    .radius(3.0)
                    .color(Color32::from_rgb(r, g, b)),
            );
        });
}

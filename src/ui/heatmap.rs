use eframe::egui::{Color32, Pos2, Rect, Sense, Stroke, Ui, vec2};
use rusty_covar::color::parse_hex_color;
use rusty_covar::plot::DEFAULT_LINE_COLOR;

use crate::state::AppState;

// ---------------------------------------------------------------------------
// Missing-value heatmap (central panel)
// ---------------------------------------------------------------------------

/// Grid lines are only drawn once cells are at least this many points wide.
const MIN_CELL_FOR_GRID: f32 = 4.0;

fn to_color32([r, g, b]: [u8; 3]) -> Color32 {
    Color32::from_rgb(r, g, b)
}

/// Paint the feature table's missingness grid; missing cells are dark.
pub fn missing_values(ui: &mut Ui, state: &AppState) {
    let Some(features) = &state.features else {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.heading("Open a feature table to inspect missing values (File → Open features…)");
        });
        return;
    };

    let mask = features.table.missing_mask();
    ui.label(format!(
        "Missing values: {} of {} cells",
        mask.missing_count(),
        mask.n_rows * mask.n_cols
    ));
    if mask.n_rows == 0 || mask.n_cols == 0 {
        return;
    }

    let size = ui.available_size();
    let (response, painter) = ui.allocate_painter(size, Sense::hover());
    let rect = response.rect;
    let cell = vec2(
        rect.width() / mask.n_cols as f32,
        rect.height() / mask.n_rows as f32,
    );

    let present = to_color32(state.heatmap_cmap.sample(0.0));
    let missing = to_color32(state.heatmap_cmap.sample(1.0));
    painter.rect_filled(rect, 0.0, present);

    for r in 0..mask.n_rows {
        for c in 0..mask.n_cols {
            if mask.is_missing(r, c) {
                let min = rect.min + vec2(c as f32 * cell.x, r as f32 * cell.y);
                painter.rect_filled(Rect::from_min_size(min, cell), 0.0, missing);
            }
        }
    }

    if cell.x >= MIN_CELL_FOR_GRID && cell.y >= MIN_CELL_FOR_GRID {
        let line_color = parse_hex_color(DEFAULT_LINE_COLOR)
            .map(to_color32)
            .unwrap_or(Color32::LIGHT_GRAY);
        let stroke = Stroke::new(0.5, line_color);
        for c in 1..mask.n_cols {
            let x = rect.min.x + c as f32 * cell.x;
            painter.line_segment([Pos2::new(x, rect.min.y), Pos2::new(x, rect.max.y)], stroke);
        }
        for r in 1..mask.n_rows {
            let y = rect.min.y + r as f32 * cell.y;
            painter.line_segment([Pos2::new(rect.min.x, y), Pos2::new(rect.max.x, y)], stroke);
        }
    }

    if let Some(pos) = response.hover_pos() {
        let c = (((pos.x - rect.min.x) / cell.x) as usize).min(mask.n_cols - 1);
        let r = (((pos.y - rect.min.y) / cell.y) as usize).min(mask.n_rows - 1);
        let text = format!(
            "{} / {}{}",
            mask.row_labels[r],
            mask.column_names[c],
            if mask.is_missing(r, c) { "  (missing)" } else { "" }
        );
        response.on_hover_text_at_pointer(text);
    }
}

//! Missing-value heatmap rendered to PNG.
//!
//! Observations run down the rows, variables across the columns; a missing
//! cell takes the dark end of the colour map, a present one the light end.
//! All styling comes from an explicit [`MissingValuesPlot`] value, there is
//! no process-wide theme.

use std::path::Path;

use anyhow::{Context, Result};
use image::{Rgb, RgbImage};
use serde::{Deserialize, Serialize};

use crate::color::{ColorMapKind, parse_hex_color};
use crate::data::model::{MissingMask, Table};
use crate::export::ensure_directory;

pub const DEFAULT_FIG_SIZE: (f32, f32) = (16.0, 16.0);
pub const DEFAULT_DPI: u32 = 100;
pub const DEFAULT_LINE_WIDTH: f32 = 0.3;
pub const DEFAULT_LINE_COLOR: &str = "#c8d6e5";

const TICK_LEN: u32 = 6;
const TICK_COLOR: [u8; 3] = [0x22, 0x22, 0x22];

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Heatmap styling. Every field is optional; `None` means the default:
///
/// | field         | default                  |
/// |---------------|--------------------------|
/// | `fig_size`    | `(16, 16)` inches        |
/// | `dpi`         | `100`                    |
/// | `fig_cmap`    | `Greys`                  |
/// | `fig_ticks_x` | one tick per column      |
/// | `fig_ticks_y` | one tick per row         |
/// | `line_width`  | `0.3` points             |
/// | `line_color`  | `#c8d6e5`                |
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MissingValuesPlot {
    pub fig_size: Option<(f32, f32)>,
    pub dpi: Option<u32>,
    pub fig_cmap: Option<ColorMapKind>,
    pub fig_ticks_x: Option<Vec<usize>>,
    pub fig_ticks_y: Option<Vec<usize>>,
    pub line_width: Option<f32>,
    pub line_color: Option<String>,
}

/// A [`MissingValuesPlot`] with defaults filled in for a given table shape.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedPlot {
    pub width_px: u32,
    pub height_px: u32,
    pub cmap: ColorMapKind,
    pub ticks_x: Vec<usize>,
    pub ticks_y: Vec<usize>,
    /// Grid line width in pixels; 0 disables the grid.
    pub line_px: u32,
    pub line_color: [u8; 3],
}

impl MissingValuesPlot {
    pub fn resolve(&self, n_rows: usize, n_cols: usize) -> Result<ResolvedPlot> {
        let (w_in, h_in) = self.fig_size.unwrap_or(DEFAULT_FIG_SIZE);
        let dpi = self.dpi.unwrap_or(DEFAULT_DPI) as f32;
        let line_width = self.line_width.unwrap_or(DEFAULT_LINE_WIDTH);
        let line_color = parse_hex_color(self.line_color.as_deref().unwrap_or(DEFAULT_LINE_COLOR))?;

        let line_px = if line_width <= 0.0 {
            0
        } else {
            // points → pixels, never thinner than one pixel
            ((line_width * dpi / 72.0).round() as u32).max(1)
        };

        Ok(ResolvedPlot {
            width_px: ((w_in * dpi).round() as u32).max(1),
            height_px: ((h_in * dpi).round() as u32).max(1),
            cmap: self.fig_cmap.unwrap_or_default(),
            ticks_x: self.fig_ticks_x.clone().unwrap_or_else(|| (0..n_cols).collect()),
            ticks_y: self.fig_ticks_y.clone().unwrap_or_else(|| (0..n_rows).collect()),
            line_px,
            line_color,
        })
    }
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

/// Render the missingness grid into an RGB image.
pub fn render_missing_values(mask: &MissingMask, plot: &ResolvedPlot) -> RgbImage {
    let mut img = RgbImage::from_pixel(plot.width_px, plot.height_px, Rgb([255, 255, 255]));
    if mask.n_rows == 0 || mask.n_cols == 0 {
        return img;
    }

    // Ticks live in a strip on the left and bottom edges.
    let left = TICK_LEN.min(plot.width_px / 2);
    let bottom = TICK_LEN.min(plot.height_px / 2);
    let area_w = plot.width_px - left;
    let area_h = plot.height_px - bottom;
    let cell_w = area_w as f32 / mask.n_cols as f32;
    let cell_h = area_h as f32 / mask.n_rows as f32;

    let present = Rgb(plot.cmap.sample(0.0));
    let missing = Rgb(plot.cmap.sample(1.0));
    let line = Rgb(plot.line_color);

    for py in 0..area_h {
        let row = ((py as f32 / cell_h) as usize).min(mask.n_rows - 1);
        for px in 0..area_w {
            let col = ((px as f32 / cell_w) as usize).min(mask.n_cols - 1);
            let color = if mask.is_missing(row, col) { missing } else { present };
            img.put_pixel(left + px, py, color);
        }
    }

    if plot.line_px > 0 {
        for c in 1..mask.n_cols {
            let x0 = (c as f32 * cell_w) as u32;
            for x in x0..(x0 + plot.line_px).min(area_w) {
                for y in 0..area_h {
                    img.put_pixel(left + x, y, line);
                }
            }
        }
        for r in 1..mask.n_rows {
            let y0 = (r as f32 * cell_h) as u32;
            for y in y0..(y0 + plot.line_px).min(area_h) {
                for x in 0..area_w {
                    img.put_pixel(left + x, y, line);
                }
            }
        }
    }

    let tick = Rgb(TICK_COLOR);
    for &c in plot.ticks_x.iter().filter(|&&c| c < mask.n_cols) {
        let x = left + ((c as f32 + 0.5) * cell_w) as u32;
        for y in area_h..plot.height_px {
            img.put_pixel(x.min(plot.width_px - 1), y, tick);
        }
    }
    for &r in plot.ticks_y.iter().filter(|&&r| r < mask.n_rows) {
        let y = ((r as f32 + 0.5) * cell_h) as u32;
        for x in 0..left {
            img.put_pixel(x, y.min(area_h - 1), tick);
        }
    }

    img
}

/// Render the missing values of `table` and write a PNG to `path`.
///
/// Returns the number of missing cells.
pub fn save_missing_values(
    table: &Table,
    config: &MissingValuesPlot,
    path: &Path,
) -> Result<usize> {
    let mask = table.missing_mask();
    let plot = config.resolve(mask.n_rows, mask.n_cols)?;
    let img = render_missing_values(&mask, &plot);

    ensure_directory(path)?;
    img.save(path)
        .with_context(|| format!("writing heatmap {}", path.display()))?;

    let missing = mask.missing_count();
    log::info!(
        "Missing-value heatmap ({missing} of {} cells missing) saved to {}",
        mask.n_rows * mask.n_cols,
        path.display()
    );
    Ok(missing)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::Column;

    fn table() -> Table {
        Table::from_columns(vec![
            Column::new("a", vec![1.0, f64::NAN]),
            Column::new("b", vec![2.0, 3.0]),
        ])
        .unwrap()
    }

    #[test]
    fn defaults_resolve() {
        let plot = MissingValuesPlot::default().resolve(3, 2).unwrap();
        assert_eq!((plot.width_px, plot.height_px), (1600, 1600));
        assert_eq!(plot.cmap, ColorMapKind::Greys);
        assert_eq!(plot.ticks_x, vec![0, 1]);
        assert_eq!(plot.ticks_y, vec![0, 1, 2]);
        assert_eq!(plot.line_px, 1);
        assert_eq!(plot.line_color, [0xc8, 0xd6, 0xe5]);
    }

    #[test]
    fn overrides_win() {
        let config = MissingValuesPlot {
            fig_size: Some((2.0, 1.0)),
            dpi: Some(50),
            fig_cmap: Some(ColorMapKind::Reds),
            line_width: Some(0.0),
            ..Default::default()
        };
        let plot = config.resolve(1, 1).unwrap();
        assert_eq!((plot.width_px, plot.height_px), (100, 50));
        assert_eq!(plot.cmap, ColorMapKind::Reds);
        assert_eq!(plot.line_px, 0);
    }

    #[test]
    fn bad_line_color() {
        let config = MissingValuesPlot {
            line_color: Some("blue-ish".into()),
            ..Default::default()
        };
        assert!(config.resolve(1, 1).is_err());
    }

    #[test]
    fn missing_cells_are_dark() {
        let config = MissingValuesPlot {
            fig_size: Some((1.0, 1.0)),
            line_width: Some(0.0),
            ..Default::default()
        };
        let mask = table().missing_mask();
        let plot = config.resolve(2, 2).unwrap();
        let img = render_missing_values(&mask, &plot);
        // cell (row 1, col 0) is missing: bottom-left quadrant of the plot area
        let left = TICK_LEN;
        assert_eq!(img.get_pixel(left + 10, 70).0, [0, 0, 0]);
        // cell (row 0, col 1) is present
        assert_eq!(img.get_pixel(left + 70, 10).0, [255, 255, 255]);
    }

    #[test]
    fn writes_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/missing.png");
        let config = MissingValuesPlot {
            fig_size: Some((1.0, 1.0)),
            ..Default::default()
        };
        let missing = save_missing_values(&table(), &config, &path).unwrap();
        assert_eq!(missing, 1);
        assert!(path.exists());
    }
}

use std::str::FromStr;

use anyhow::{Context, Result};
use palette::{Hsl, IntoColor, LinSrgb, Mix, Srgb};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Color palette generator
// ---------------------------------------------------------------------------

/// Generates `n` visually distinct colours using evenly spaced hues.
pub fn generate_palette(n: usize) -> Vec<[u8; 3]> {
    if n == 0 {
        return Vec::new();
    }
    (0..n)
        .map(|i| {
            let hue = (i as f32 / n as f32) * 360.0;
            let hsl = Hsl::new(hue, 0.75, 0.55);
            let rgb: Srgb = hsl.into_color();
            let rgb: Srgb<u8> = rgb.into_format();
            [rgb.red, rgb.green, rgb.blue]
        })
        .collect()
}

/// Parse `#rrggbb` (or `rrggbb`) into RGB bytes.
pub fn parse_hex_color(s: &str) -> Result<[u8; 3]> {
    let rgb = Srgb::<u8>::from_str(s.trim()).with_context(|| format!("invalid colour '{s}'"))?;
    Ok([rgb.red, rgb.green, rgb.blue])
}

// ---------------------------------------------------------------------------
// Sequential colour maps: value in [0, 1] → colour
// ---------------------------------------------------------------------------

/// Single-hue sequential colour maps running from white to a dark shade.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColorMapKind {
    #[default]
    Greys,
    Blues,
    Greens,
    Reds,
    Purples,
}

impl ColorMapKind {
    pub const ALL: [ColorMapKind; 5] = [
        ColorMapKind::Greys,
        ColorMapKind::Blues,
        ColorMapKind::Greens,
        ColorMapKind::Reds,
        ColorMapKind::Purples,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ColorMapKind::Greys => "Greys",
            ColorMapKind::Blues => "Blues",
            ColorMapKind::Greens => "Greens",
            ColorMapKind::Reds => "Reds",
            ColorMapKind::Purples => "Purples",
        }
    }

    fn dark_end(self) -> [u8; 3] {
        match self {
            ColorMapKind::Greys => [0x00, 0x00, 0x00],
            ColorMapKind::Blues => [0x08, 0x30, 0x6b],
            ColorMapKind::Greens => [0x00, 0x44, 0x1b],
            ColorMapKind::Reds => [0x67, 0x00, 0x0d],
            ColorMapKind::Purples => [0x3f, 0x00, 0x7d],
        }
    }

    /// Colour at position `t` (clamped to [0, 1]), interpolated in linear RGB.
    pub fn sample(self, t: f32) -> [u8; 3] {
        let [r, g, b] = self.dark_end();
        let light: LinSrgb = Srgb::new(1.0f32, 1.0, 1.0).into_linear();
        let dark: LinSrgb = Srgb::new(r, g, b).into_format::<f32>().into_linear();
        let mixed = light.mix(dark, t.clamp(0.0, 1.0));
        let out: Srgb = Srgb::from_linear(mixed);
        let out: Srgb<u8> = out.into_format();
        [out.red, out.green, out.blue]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn palette_size() {
        assert!(generate_palette(0).is_empty());
        let p = generate_palette(4);
        assert_eq!(p.len(), 4);
        assert_ne!(p[0], p[1]);
    }

    #[test]
    fn hex_colours() {
        assert_eq!(parse_hex_color("#c8d6e5").unwrap(), [0xc8, 0xd6, 0xe5]);
        assert!(parse_hex_color("#zzz").is_err());
    }

    #[test]
    fn colormap_ends() {
        assert_eq!(ColorMapKind::Greys.sample(0.0), [255, 255, 255]);
        assert_eq!(ColorMapKind::Greys.sample(1.0), [0, 0, 0]);
        assert_eq!(ColorMapKind::Blues.sample(1.0), [0x08, 0x30, 0x6b]);
        assert_eq!(ColorMapKind::Reds.sample(7.0), ColorMapKind::Reds.sample(1.0));
    }
}

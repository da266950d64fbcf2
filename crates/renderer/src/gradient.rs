//! Colour ramps for index planes.

use field_common::style::INDEX_RANGE;

/// Default overlay opacity.
pub const OVERLAY_ALPHA: u8 = 180;

/// Color value in RGBA format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub fn transparent() -> Self {
        Self { r: 0, g: 0, b: 0, a: 0 }
    }
}

/// Map an index value from `INDEX_RANGE` onto [0, 1], saturating outside it.
///
/// NaN passes through.
#[inline]
pub fn normalize_index(value: f64) -> f64 {
    let (min, max) = INDEX_RANGE;
    ((value - min) / (max - min)).clamp(0.0, 1.0)
}

/// Two-stop red to green ramp.
///
/// `v` in [0, 1]: red = round((1 - v) * 255), green = round(v * 255), blue = 0.
/// NaN renders fully transparent.
pub fn index_ramp(value: f64, alpha: u8) -> Color {
    let v = normalize_index(value);
    if v.is_nan() {
        return Color::transparent();
    }
    Color::new(
        ((1.0 - v) * 255.0).round() as u8,
        (v * 255.0).round() as u8,
        0,
        alpha,
    )
}

/// Render values to RGBA bytes (4 per pixel, row-major) with `color_fn`.
pub fn render_grid<F>(data: &[f64], width: usize, height: usize, color_fn: F) -> Vec<u8>
where
    F: Fn(f64) -> Color,
{
    let mut pixels = vec![0u8; width * height * 4];

    for (idx, &value) in data.iter().take(width * height).enumerate() {
        let color = color_fn(value);
        let pixel_idx = idx * 4;
        pixels[pixel_idx] = color.r;
        pixels[pixel_idx + 1] = color.g;
        pixels[pixel_idx + 2] = color.b;
        pixels[pixel_idx + 3] = color.a;
    }

    pixels
}

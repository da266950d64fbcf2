//! Embedded overlays: one index plane to a size-capped PNG data URI.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use field_common::Plane;
use image::imageops::{self, FilterType};
use image::RgbaImage;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{RenderError, RenderResult};
use crate::gradient::{index_ramp, render_grid, OVERLAY_ALPHA};
use crate::png::create_png_auto;

/// Default ceiling for either overlay dimension.
pub const MAX_OVERLAY_DIMENSION: u32 = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayOptions {
    /// Neither output dimension exceeds this.
    pub max_dimension: u32,
    /// Opacity of every rendered pixel.
    pub alpha: u8,
}

impl Default for OverlayOptions {
    fn default() -> Self {
        Self {
            max_dimension: MAX_OVERLAY_DIMENSION,
            alpha: OVERLAY_ALPHA,
        }
    }
}

/// An encoded overlay image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Overlay {
    pub png: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl Overlay {
    /// `data:image/png;base64,...`
    pub fn data_uri(&self) -> String {
        format!("data:image/png;base64,{}", STANDARD.encode(&self.png))
    }
}

/// Size that fits `width` x `height` within `max` on both axes, keeping the
/// aspect ratio. Sizes already within bounds are returned unchanged.
pub fn fit_within(width: u32, height: u32, max: u32) -> (u32, u32) {
    if width <= max && height <= max {
        return (width, height);
    }
    let scale = max as f64 / width.max(height) as f64;
    let fit = |d: u32| ((d as f64 * scale).round() as u32).clamp(1, max);
    (fit(width), fit(height))
}

/// Colour, downsample and encode one index plane.
///
/// Deterministic: the same plane and options always give the same bytes.
pub fn render_overlay(plane: &Plane, options: &OverlayOptions) -> RenderResult<Overlay> {
    let (width, height) = plane.dimensions();
    if plane.is_empty() || width == 0 || height == 0 {
        return Err(RenderError::EmptyPlane { width, height });
    }

    let alpha = options.alpha;
    let pixels = render_grid(plane.values(), width, height, |v| index_ramp(v, alpha));

    let (width, height) = (width as u32, height as u32);
    let image = RgbaImage::from_raw(width, height, pixels).ok_or(RenderError::BufferSize {
        width: width as usize,
        height: height as usize,
    })?;

    let (out_w, out_h) = fit_within(width, height, options.max_dimension.max(1));
    let image = if (out_w, out_h) != (width, height) {
        debug!(width, height, out_w, out_h, "Downsampling overlay");
        imageops::resize(&image, out_w, out_h, FilterType::Lanczos3)
    } else {
        image
    };

    let png = create_png_auto(image.as_raw(), out_w as usize, out_h as usize)?;
    Ok(Overlay {
        png,
        width: out_w,
        height: out_h,
    })
}

//! Image rendering for index overlays.
//!
//! - Colour ramp from index value to RGBA
//! - Lanczos downsampling to a size ceiling
//! - Indexed / RGBA PNG encoding and data-URI packaging

pub mod error;
pub mod gradient;
pub mod overlay;
pub mod png;

pub use error::{RenderError, RenderResult};
pub use overlay::{fit_within, render_overlay, Overlay, OverlayOptions};

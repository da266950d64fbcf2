//! Spectral indices for crop-health analysis.
//!
//! Two renditions of the same six indices:
//!
//! - [`compute`] / [`compute_all`] evaluate them pixel by pixel over a
//!   decoded [`BandSet`](field_common::BandSet).
//! - [`IndexLayer`] describes them as band-math expressions over named
//!   catalog assets, for servers that compute them remotely.
//!
//! | Index | Formula |
//! |-------|---------|
//! | NDVI  | (NIR - Red) / (NIR + Red + ε) |
//! | NDWI  | (Green - NIR) / (Green + NIR + ε) |
//! | EVI   | 2.5 (NIR - Red) / (NIR + 6 Red - 7.5 Blue + 1 + ε) |
//! | SAVI  | 1.5 (NIR - Red) / (NIR + Red + 0.5 + ε) |
//! | NDRE  | (NIR - RedEdge) / (NIR + RedEdge + ε) |
//! | GNDVI | (NIR - Green) / (NIR + Green + ε) |
//!
//! Four-band sources carry no red-edge band; NDRE then falls back to the
//! NDVI formula. The result is still labelled NDRE, so treat it as an
//! approximation for those sources.

mod error;
mod expression;
mod indices;

pub use error::{SpectralError, SpectralResult};
pub use expression::{BandNames, IndexLayer};
pub use indices::{compute, compute_all, pixel_value, IndexResult, SpectralSample, EPSILON};

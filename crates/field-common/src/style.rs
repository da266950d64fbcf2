//! Visualization parameters for index layers.
//!
//! Both acquisition paths share these: tile references carry them as query
//! parameters, and embedded overlays use the same nominal value range.

use serde::{Deserialize, Serialize};

use crate::index::IndexName;

/// Nominal value range of every normalized index.
pub const INDEX_RANGE: (f64, f64) = (-1.0, 1.0);

/// Named color ramps understood by the tile service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Palette {
    /// red -> yellow -> green, for vegetation indices
    RedYellowGreen,
    /// red -> yellow -> blue, for the water index
    RedYellowBlue,
}

impl Palette {
    /// The palette an index is displayed with.
    pub fn for_index(index: IndexName) -> Self {
        if index.is_water_index() {
            Palette::RedYellowBlue
        } else {
            Palette::RedYellowGreen
        }
    }

    /// Colormap identifier used in tile URLs.
    pub fn colormap_name(&self) -> &'static str {
        match self {
            Palette::RedYellowGreen => "rdylgn",
            Palette::RedYellowBlue => "rdylbu",
        }
    }
}

/// Value range plus palette for one index layer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VisParams {
    pub min: f64,
    pub max: f64,
    pub palette: Palette,
}

impl VisParams {
    /// Default display parameters for an index: range [-1, 1] with its palette.
    pub fn for_index(index: IndexName) -> Self {
        Self {
            min: INDEX_RANGE.0,
            max: INDEX_RANGE.1,
            palette: Palette::for_index(index),
        }
    }

    /// `"min,max"` as used by the tile service's `rescale` parameter.
    pub fn rescale(&self) -> String {
        format!("{},{}", self.min, self.max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_palette_per_index() {
        assert_eq!(Palette::for_index(IndexName::Ndwi), Palette::RedYellowBlue);
        for index in IndexName::ALL.into_iter().filter(|i| *i != IndexName::Ndwi) {
            assert_eq!(Palette::for_index(index), Palette::RedYellowGreen);
        }
    }

    #[test]
    fn test_vis_params() {
        let vis = VisParams::for_index(IndexName::Ndvi);
        assert_eq!(vis.min, -1.0);
        assert_eq!(vis.max, 1.0);
        assert_eq!(vis.rescale(), "-1,1");
        assert_eq!(vis.palette.colormap_name(), "rdylgn");
    }
}

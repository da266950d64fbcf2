//! Band-math expressions for remote index computation.

use field_common::IndexName;
use serde::{Deserialize, Serialize};

/// Asset names of the optical bands in the catalog's collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BandNames {
    pub blue: String,
    pub green: String,
    pub red: String,
    pub red_edge: String,
    pub nir: String,
}

impl Default for BandNames {
    /// Sentinel-2 L2A band ids
    fn default() -> Self {
        Self {
            blue: "B02".to_string(),
            green: "B03".to_string(),
            red: "B04".to_string(),
            red_edge: "B05".to_string(),
            nir: "B08".to_string(),
        }
    }
}

/// One index expressed over catalog assets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexLayer {
    pub index: IndexName,
    /// e.g. `(B08-B04)/(B08+B04)`
    pub expression: String,
    /// Assets referenced by `expression`, each once, in order of first use.
    pub assets: Vec<String>,
}

impl IndexLayer {
    pub fn new(index: IndexName, bands: &BandNames) -> Self {
        let BandNames {
            blue,
            green,
            red,
            red_edge,
            nir,
        } = bands;

        let (expression, assets) = match index {
            IndexName::Ndvi => (normalized_difference(nir, red), vec![nir, red]),
            IndexName::Ndwi => (normalized_difference(green, nir), vec![green, nir]),
            IndexName::Evi => (
                format!(
                    "2.5*({nir}-{red})/({nir}+6*{red}-7.5*{blue}+1)",
                    nir = nir,
                    red = red,
                    blue = blue
                ),
                vec![nir, red, blue],
            ),
            IndexName::Savi => (
                format!("1.5*({nir}-{red})/({nir}+{red}+0.5)", nir = nir, red = red),
                vec![nir, red],
            ),
            IndexName::Ndre => (normalized_difference(nir, red_edge), vec![nir, red_edge]),
            IndexName::Gndvi => (normalized_difference(nir, green), vec![nir, green]),
        };

        let mut unique: Vec<String> = Vec::with_capacity(assets.len());
        for asset in assets {
            if !unique.iter().any(|a| a == asset) {
                unique.push(asset.clone());
            }
        }

        Self {
            index,
            expression,
            assets: unique,
        }
    }

    /// Layers for every index in [`IndexName::ALL`] order.
    pub fn all(bands: &BandNames) -> Vec<Self> {
        IndexName::ALL
            .iter()
            .map(|&index| Self::new(index, bands))
            .collect()
    }
}

fn normalized_difference(a: &str, b: &str) -> String {
    format!("({a}-{b})/({a}+{b})", a = a, b = b)
}

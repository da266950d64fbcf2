//! Spectral index identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The six crop-health indices produced for every field.
///
/// Serialized lowercase (`"ndvi"`), displayed uppercase (`NDVI`). Ordering
/// follows [`IndexName::ALL`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexName {
    /// Normalized Difference Vegetation Index
    Ndvi,
    /// Normalized Difference Water Index
    Ndwi,
    /// Enhanced Vegetation Index
    Evi,
    /// Soil Adjusted Vegetation Index
    Savi,
    /// Normalized Difference Red Edge
    Ndre,
    /// Green Normalized Difference Vegetation Index
    Gndvi,
}

impl IndexName {
    pub const ALL: [IndexName; 6] = [
        IndexName::Ndvi,
        IndexName::Ndwi,
        IndexName::Evi,
        IndexName::Savi,
        IndexName::Ndre,
        IndexName::Gndvi,
    ];

    /// Lowercase key used in envelopes and URLs.
    pub fn as_str(&self) -> &'static str {
        match self {
            IndexName::Ndvi => "ndvi",
            IndexName::Ndwi => "ndwi",
            IndexName::Evi => "evi",
            IndexName::Savi => "savi",
            IndexName::Ndre => "ndre",
            IndexName::Gndvi => "gndvi",
        }
    }

    /// True for the water index; everything else tracks vegetation vigour.
    pub fn is_water_index(&self) -> bool {
        matches!(self, IndexName::Ndwi)
    }
}

impl fmt::Display for IndexName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str().to_uppercase())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Unknown index name: {0}")]
pub struct UnknownIndex(pub String);

impl FromStr for IndexName {
    type Err = UnknownIndex;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        IndexName::ALL
            .into_iter()
            .find(|index| index.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownIndex(s.to_string()))
    }
}

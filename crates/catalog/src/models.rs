//! STAC API request and response types.
//!
//! Only the fields the scene selection reads are typed; everything else
//! is kept in `extra` maps.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Search request
// ---------------------------------------------------------------------------

/// Body of `POST /search`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchParams {
    pub collections: Vec<String>,
    /// `[west, south, east, north]`
    pub bbox: [f64; 4],
    /// Interval, e.g. `2024-01-01T00:00:00Z/..`
    pub datetime: String,
    /// Query extension: `{"eo:cloud_cover": {"lt": 20}}`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub sortby: Vec<SortBy>,
    pub limit: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SortBy {
    pub field: String,
    pub direction: SortDirection,
}

impl SortBy {
    pub fn newest_first() -> Self {
        Self {
            field: "properties.datetime".to_string(),
            direction: SortDirection::Desc,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

// ---------------------------------------------------------------------------
// Search response
// ---------------------------------------------------------------------------

/// A page of search results (GeoJSON FeatureCollection).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ItemCollection {
    #[serde(default)]
    pub features: Vec<Item>,
}

/// One catalogued scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bbox: Option<Vec<f64>>,
    #[serde(default)]
    pub properties: ItemProperties,
    #[serde(default)]
    pub assets: BTreeMap<String, Asset>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datetime: Option<String>,

    #[serde(
        rename = "eo:cloud_cover",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub cloud_cover: Option<f64>,

    #[serde(
        rename = "sar:instrument_mode",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub instrument_mode: Option<String>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    pub href: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
}

impl Item {
    /// Acquisition time, if the item carries a parseable RFC 3339 datetime.
    pub fn acquired(&self) -> Option<DateTime<Utc>> {
        let raw = self.properties.datetime.as_deref()?;
        DateTime::parse_from_rfc3339(raw)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }

    pub fn has_asset(&self, key: &str) -> bool {
        self.assets.contains_key(key)
    }
}

/// Most recently acquired item. Stable: equal times keep catalog order,
/// and items without a time lose to any dated item.
pub fn most_recent(mut items: Vec<Item>) -> Option<Item> {
    // Option orders None < Some, so reversing puts undated items last
    items.sort_by(|a, b| b.acquired().cmp(&a.acquired()));
    items.into_iter().next()
}

// ---------------------------------------------------------------------------
// Tile service
// ---------------------------------------------------------------------------

/// TileJSON document returned by the tile service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TileJson {
    #[serde(default)]
    pub tiles: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minzoom: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maxzoom: Option<u8>,
}

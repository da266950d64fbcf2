//! The result envelope handed to the API layer, and the field record it
//! receives from persistence.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::boundary::LatLng;
use crate::index::IndexName;
use crate::raster::RasterMetadata;

/// Outcome of an analysis request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisStatus {
    Success,
    Error,
    Pending,
}

/// The only structure that crosses from the core to the API layer.
///
/// A successful remote analysis fills `tile_urls`; a successful file
/// analysis fills `overlays` (data URIs) and `metadata`. `indices` lists the
/// index names that actually produced a display artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisEnvelope {
    pub status: AnalysisStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_id: Option<String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tile_urls: BTreeMap<IndexName, String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub overlays: BTreeMap<IndexName, String>,

    #[serde(default)]
    pub indices: Vec<IndexName>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<RasterMetadata>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Shape of the credential artifact the operator still has to supply.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_format: Option<serde_json::Value>,
}

impl AnalysisEnvelope {
    fn empty(status: AnalysisStatus, field_id: &str) -> Self {
        Self {
            status,
            field_id: Some(field_id.to_string()),
            tile_urls: BTreeMap::new(),
            overlays: BTreeMap::new(),
            indices: Vec::new(),
            metadata: None,
            message: None,
            required_format: None,
        }
    }

    /// Remote-mode success: one tile URL template per index.
    pub fn with_tiles(field_id: &str, tile_urls: BTreeMap<IndexName, String>) -> Self {
        let mut envelope = Self::empty(AnalysisStatus::Success, field_id);
        envelope.indices = tile_urls.keys().copied().collect();
        envelope.tile_urls = tile_urls;
        envelope
    }

    /// File-mode success: one embedded image per index plus raster metadata.
    pub fn with_overlays(
        field_id: &str,
        overlays: BTreeMap<IndexName, String>,
        metadata: RasterMetadata,
    ) -> Self {
        let mut envelope = Self::empty(AnalysisStatus::Success, field_id);
        envelope.indices = overlays.keys().copied().collect();
        envelope.overlays = overlays;
        envelope.metadata = Some(metadata);
        envelope
    }

    pub fn pending(field_id: &str, message: impl Into<String>) -> Self {
        let mut envelope = Self::empty(AnalysisStatus::Pending, field_id);
        envelope.message = Some(message.into());
        envelope
    }

    pub fn error(field_id: &str, message: impl Into<String>) -> Self {
        let mut envelope = Self::empty(AnalysisStatus::Error, field_id);
        envelope.message = Some(message.into());
        envelope
    }

    /// Attach a pending-credentials guidance document.
    pub fn with_required_format(mut self, format: serde_json::Value) -> Self {
        self.required_format = Some(format);
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// What the persistence collaborator knows about a field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldRecord {
    pub field_id: String,
    #[serde(default)]
    pub boundary: Vec<LatLng>,
    /// Remote-storage link to the field's multi-band raster, if any.
    #[serde(default)]
    pub imagery_url: Option<String>,
}

impl FieldRecord {
    /// The imagery link, ignoring empty or whitespace-only values.
    pub fn imagery_link(&self) -> Option<&str> {
        self.imagery_url
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

//! Analysis orchestrator.
//!
//! Runs one request end to end: acquire imagery, compute indices, render
//! display artifacts and wrap everything in an [`AnalysisEnvelope`]. Steps
//! run strictly in sequence; CPU-heavy work moves to the blocking pool.

use std::collections::BTreeMap;
use std::sync::Arc;

use catalog::{AuthContext, CatalogClient, IndexResponse, SceneSelection};
use field_common::{
    AnalysisEnvelope, AnalysisError, AnalysisResult, AnalysisStatus, BandSet, FieldRecord,
    IndexName, VisParams,
};
use metrics::counter;
use renderer::{render_overlay, OverlayOptions};
use spectral::IndexResult;
use tracing::{debug, error, info, info_span, warn, Instrument, Span};
use uuid::Uuid;

use crate::config::AnalysisConfig;
use crate::fetch::FileFetcher;
use crate::source::{FileSource, ImagerySource, Imagery, RemoteSource};

/// Entry point for both analysis modes.
pub struct Orchestrator {
    remote: RemoteSource,
    file: FileSource,
    overlay: OverlayOptions,
}

impl Orchestrator {
    /// `auth` is shared by every request handled by this process.
    pub fn new(config: &AnalysisConfig, auth: Arc<AuthContext>) -> AnalysisResult<Self> {
        Ok(Self {
            remote: RemoteSource::new(auth, config.catalog.clone(), config.buffer_meters),
            file: FileSource::new(FileFetcher::new(&config.download)?),
            overlay: config.overlay,
        })
    }

    /// Remote catalog analysis: one tile reference per index.
    pub async fn analyze_remote(&self, field: &FieldRecord) -> AnalysisEnvelope {
        self.analyze(&self.remote, field).await
    }

    /// File analysis: one embedded overlay per index.
    pub async fn analyze_file(&self, field: &FieldRecord) -> AnalysisEnvelope {
        self.analyze(&self.file, field).await
    }

    /// Run `source` for `field`. Never fails: every outcome is an envelope.
    pub async fn analyze(&self, source: &dyn ImagerySource, field: &FieldRecord) -> AnalysisEnvelope {
        let request_id = Uuid::new_v4();
        let span = info_span!(
            "analysis",
            %request_id,
            field_id = %field.field_id,
            mode = source.mode()
        );

        async move {
            info!("Starting field analysis");
            let envelope = match self.process(source, field).await {
                Ok(envelope) => envelope,
                Err(e) => {
                    error!(error = %e, code = e.code(), "Field analysis failed");
                    AnalysisEnvelope::error(&field.field_id, source.failure_message(&field.field_id, &e))
                }
            };

            let status = status_label(envelope.status);
            counter!(
                "field_analysis_requests_total",
                "mode" => source.mode(),
                "status" => status
            )
            .increment(1);
            info!(status, indices = envelope.indices.len(), "Field analysis finished");
            envelope
        }
        .instrument(span)
        .await
    }

    async fn process(
        &self,
        source: &dyn ImagerySource,
        field: &FieldRecord,
    ) -> AnalysisResult<AnalysisEnvelope> {
        match source.acquire(field).await? {
            Imagery::Pending {
                message,
                required_format,
            } => {
                info!(%message, "Analysis pending");
                let envelope = AnalysisEnvelope::pending(&field.field_id, message);
                Ok(match required_format {
                    Some(format) => envelope.with_required_format(format),
                    None => envelope,
                })
            }
            Imagery::Scene { client, selection } => {
                tile_envelope(&field.field_id, &client, &selection).await
            }
            Imagery::Bands(bands) => self.overlay_envelope(&field.field_id, bands).await,
        }
    }

    async fn overlay_envelope(
        &self,
        field_id: &str,
        bands: BandSet,
    ) -> AnalysisResult<AnalysisEnvelope> {
        let options = self.overlay;
        let span = Span::current();
        let (overlays, metadata) = tokio::task::spawn_blocking(move || {
            let _guard = span.enter();
            let metadata = bands.metadata.clone();
            let indices = spectral::compute_all(&bands)?;
            drop(bands);
            Ok::<_, AnalysisError>((render_overlays(&indices, &options), metadata))
        })
        .await
        .map_err(|e| AnalysisError::IndexComputationFailed(format!("index task failed: {}", e)))??;

        let envelope = AnalysisEnvelope::with_overlays(field_id, overlays, metadata);
        Ok(if envelope.indices.is_empty() {
            envelope.with_message("No overlays could be rendered")
        } else {
            envelope
        })
    }
}

/// Tile references for every index over the selected scene. An index whose
/// tile request fails is left out.
async fn tile_envelope(
    field_id: &str,
    client: &CatalogClient,
    selection: &SceneSelection,
) -> AnalysisResult<AnalysisEnvelope> {
    let layers = match client.compute_indices() {
        IndexResponse::Layers(layers) => layers,
        IndexResponse::Mock(mock) => {
            return Err(AnalysisError::CatalogUnavailable(mock.message));
        }
    };

    let mut tile_urls = BTreeMap::new();
    for layer in &layers {
        let vis = VisParams::for_index(layer.index);
        match client.tile_reference(selection, layer, &vis).await {
            Ok(Some(url)) => {
                debug!(index = %layer.index, %url, "Tile reference ready");
                tile_urls.insert(layer.index, url);
            }
            Ok(None) => debug!(index = %layer.index, "No tile reference"),
            Err(e) => {
                warn!(index = %layer.index, error = %e, "Tile reference failed");
                record_artifact_failure(layer.index);
            }
        }
    }

    let envelope = AnalysisEnvelope::with_tiles(field_id, tile_urls);
    Ok(if envelope.indices.is_empty() {
        envelope.with_message("No tile references could be generated")
    } else {
        envelope
    })
}

/// Encode one overlay per index as a data URI. Indices that fail to encode
/// are logged and skipped.
pub fn render_overlays(
    indices: &IndexResult,
    options: &OverlayOptions,
) -> BTreeMap<IndexName, String> {
    let mut overlays = BTreeMap::new();
    for (index, plane) in indices.iter() {
        match render_overlay(plane, options) {
            Ok(overlay) => {
                debug!(
                    index = %index,
                    width = overlay.width,
                    height = overlay.height,
                    bytes = overlay.png.len(),
                    "Rendered overlay"
                );
                overlays.insert(index, overlay.data_uri());
            }
            Err(e) => {
                let e = AnalysisError::from(e);
                warn!(index = %index, error = %e, "Overlay skipped");
                record_artifact_failure(index);
            }
        }
    }
    overlays
}

fn record_artifact_failure(index: IndexName) {
    counter!("field_analysis_overlay_failures_total", "index" => index.as_str()).increment(1);
}

fn status_label(status: AnalysisStatus) -> &'static str {
    match status {
        AnalysisStatus::Success => "success",
        AnalysisStatus::Error => "error",
        AnalysisStatus::Pending => "pending",
    }
}

//! Imagery acquisition.
//!
//! Both acquisition paths implement [`ImagerySource`]: the remote catalog
//! yields selected scenes to be rendered as tile references, the file store
//! yields decoded bands to be rendered as embedded overlays.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use catalog::{
    AuthContext, CatalogClient, CatalogSettings, SceneResponse, SceneSelection,
    ServiceAccountCredentials,
};
use field_common::{AnalysisError, AnalysisResult, BandSet, FieldRecord, Geometry};
use tracing::{info, warn, Span};

use crate::fetch::FileFetcher;

/// What a source produced for one field.
#[derive(Debug)]
pub enum Imagery {
    /// Nothing can be analysed yet; the envelope explains what is missing.
    Pending {
        message: String,
        required_format: Option<serde_json::Value>,
    },
    /// Scenes chosen on the remote catalog.
    Scene {
        client: CatalogClient,
        selection: SceneSelection,
    },
    /// Decoded local bands.
    Bands(BandSet),
}

#[async_trait]
pub trait ImagerySource: Send + Sync {
    /// Metrics and log label: `remote` or `file`.
    fn mode(&self) -> &'static str;

    async fn acquire(&self, field: &FieldRecord) -> AnalysisResult<Imagery>;

    /// Message shown to the user when `acquire` or index computation fails.
    fn failure_message(&self, field_id: &str, error: &AnalysisError) -> String;
}

// ---------------------------------------------------------------------------
// Remote catalog
// ---------------------------------------------------------------------------

pub struct RemoteSource {
    auth: Arc<AuthContext>,
    settings: CatalogSettings,
    buffer_meters: f64,
}

impl RemoteSource {
    pub fn new(auth: Arc<AuthContext>, settings: CatalogSettings, buffer_meters: f64) -> Self {
        Self {
            auth,
            settings,
            buffer_meters,
        }
    }

    fn pending(&self) -> Imagery {
        Imagery::Pending {
            message: format!(
                "Catalog service not available. Add credentials at: {}",
                self.auth.credentials_path().display()
            ),
            required_format: Some(ServiceAccountCredentials::required_format()),
        }
    }
}

#[async_trait]
impl ImagerySource for RemoteSource {
    fn mode(&self) -> &'static str {
        "remote"
    }

    async fn acquire(&self, field: &FieldRecord) -> AnalysisResult<Imagery> {
        // Credentials are checked before the boundary, so an unconfigured
        // service always answers pending
        let client = CatalogClient::connect(&self.auth, self.settings.clone()).await;
        if client.is_mock() {
            return Ok(self.pending());
        }

        let geometry = Geometry::build(&field.boundary, self.buffer_meters)?;
        match client.select_scenes(&geometry).await? {
            SceneResponse::Mock(_) => Ok(self.pending()),
            SceneResponse::Selected(selection) => {
                if selection.optical.is_none() {
                    return Err(AnalysisError::DownloadFailed(format!(
                        "no {} scene below {}% cloud cover since {}",
                        self.settings.optical_collection,
                        self.settings.max_cloud_cover,
                        self.settings.epoch
                    )));
                }
                Ok(Imagery::Scene { client, selection })
            }
        }
    }

    fn failure_message(&self, _field_id: &str, error: &AnalysisError) -> String {
        match error {
            AnalysisError::InvalidGeometry(_) => error.to_string(),
            AnalysisError::IndexComputationFailed(_) => "Failed to calculate indices".to_string(),
            _ => "Failed to fetch satellite imagery".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// File store
// ---------------------------------------------------------------------------

pub struct FileSource {
    fetcher: FileFetcher,
}

impl FileSource {
    pub fn new(fetcher: FileFetcher) -> Self {
        Self { fetcher }
    }
}

#[async_trait]
impl ImagerySource for FileSource {
    fn mode(&self) -> &'static str {
        "file"
    }

    async fn acquire(&self, field: &FieldRecord) -> AnalysisResult<Imagery> {
        let Some(link) = field.imagery_link() else {
            return Ok(Imagery::Pending {
                message: format!("No imagery configured for field {}", field.field_id),
                required_format: None,
            });
        };

        let transient = self.fetcher.fetch(link).await?;
        let path: PathBuf = transient.path().to_path_buf();

        let span = Span::current();
        let decoded = tokio::task::spawn_blocking(move || {
            let _guard = span.enter();
            geotiff_reader::read_band_set(&path)
        })
        .await
        .map_err(|e| AnalysisError::UnsupportedRaster(format!("decoder task failed: {}", e)));

        // Removed before the result is inspected, so failures leave nothing behind
        let bytes = transient.bytes();
        if let Err(e) = transient.close() {
            warn!(error = %e, "Failed to remove transient file");
        }

        let bands = decoded??;
        let (width, height) = bands.dimensions();
        info!(width, height, bytes, crs = ?bands.metadata.crs, "Decoded field imagery");
        Ok(Imagery::Bands(bands))
    }

    fn failure_message(&self, field_id: &str, error: &AnalysisError) -> String {
        match error {
            AnalysisError::DownloadFailed(_) => format!(
                "Failed to download imagery for field {}. Please check the imagery URL.",
                field_id
            ),
            AnalysisError::UnsupportedRaster(_) => {
                "Failed to read GeoTIFF. Ensure the file is a valid 4-band image.".to_string()
            }
            AnalysisError::IndexComputationFailed(_) => {
                "Failed to calculate vegetation indices.".to_string()
            }
            other => other.to_string(),
        }
    }
}

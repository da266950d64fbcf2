//! Catalog client: mock when credentials are missing, live otherwise.

use std::sync::Arc;
use std::time::Duration;

use field_common::{BoundingBox, Geometry, IndexName, VisParams};
use serde::{Deserialize, Serialize};
use spectral::{BandNames, IndexLayer};
use tracing::{debug, info, instrument, warn};

use crate::auth::{AuthContext, ServiceAccountCredentials};
use crate::error::{CatalogError, CatalogResult};
use crate::models::{most_recent, Item, ItemCollection, SearchParams, SortBy, TileJson};

const SCENE_MOCK_MESSAGE: &str =
    "Catalog credentials not configured. Please add credentials to enable real-time satellite analysis.";
const INDEX_MOCK_MESSAGE: &str = "Mock data - configure catalog credentials for real analysis";

/// Polarisation assets of radar scenes.
pub const RADAR_POLARISATIONS: [&str; 2] = ["vv", "vh"];

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogSettings {
    /// STAC API root; `/search` is appended.
    pub catalog_url: String,
    /// Tile service root.
    pub tiler_url: String,
    pub optical_collection: String,
    pub radar_collection: String,
    /// Earliest acquisition time, RFC 3339.
    pub epoch: String,
    /// Optical scenes must be strictly below this cloud-cover percentage.
    pub max_cloud_cover: f64,
    pub instrument_mode: String,
    pub bands: BandNames,
    pub request_timeout_secs: u64,
    /// Extra attempts for transient failures.
    pub max_retries: u32,
    /// Items requested per search.
    pub search_limit: u32,
}

impl Default for CatalogSettings {
    fn default() -> Self {
        Self {
            catalog_url: "https://earth-search.aws.element84.com/v1".to_string(),
            tiler_url: "https://titiler.xyz/stac".to_string(),
            optical_collection: "sentinel-2-l2a".to_string(),
            radar_collection: "sentinel-1-grd".to_string(),
            epoch: "2024-01-01T00:00:00Z".to_string(),
            max_cloud_cover: 20.0,
            instrument_mode: "IW".to_string(),
            bands: BandNames::default(),
            request_timeout_secs: 30,
            max_retries: 2,
            search_limit: 20,
        }
    }
}

impl CatalogSettings {
    fn search_url(&self) -> String {
        let base = self.catalog_url.trim_end_matches('/');
        if base.ends_with("/search") {
            base.to_string()
        } else {
            format!("{}/search", base)
        }
    }

    fn datetime_range(&self) -> String {
        format!("{}/..", self.epoch)
    }

    pub fn optical_search(&self, bounds: &BoundingBox) -> SearchParams {
        SearchParams {
            collections: vec![self.optical_collection.clone()],
            bbox: bounds.to_array(),
            datetime: self.datetime_range(),
            query: Some(serde_json::json!({
                "eo:cloud_cover": { "lt": self.max_cloud_cover }
            })),
            sortby: vec![SortBy::newest_first()],
            limit: self.search_limit,
        }
    }

    pub fn radar_search(&self, bounds: &BoundingBox) -> SearchParams {
        SearchParams {
            collections: vec![self.radar_collection.clone()],
            bbox: bounds.to_array(),
            datetime: self.datetime_range(),
            query: Some(serde_json::json!({
                "sar:instrument_mode": { "eq": self.instrument_mode }
            })),
            sortby: vec![SortBy::newest_first()],
            limit: self.search_limit,
        }
    }
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

/// Degraded-service answer given while the catalog is not authenticated.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MockResponse {
    pub mock: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub indices: Vec<IndexName>,
}

impl MockResponse {
    fn scenes() -> Self {
        Self {
            mock: true,
            message: SCENE_MOCK_MESSAGE.to_string(),
            indices: Vec::new(),
        }
    }

    fn indices() -> Self {
        Self {
            mock: true,
            message: INDEX_MOCK_MESSAGE.to_string(),
            indices: IndexName::ALL.to_vec(),
        }
    }
}

/// The scenes chosen for one field.
#[derive(Debug, Clone)]
pub struct SceneSelection {
    pub optical: Option<Item>,
    pub radar: Option<Item>,
    /// Bounds the search ran with (buffered).
    pub search_bounds: BoundingBox,
}

impl SceneSelection {
    /// Radar polarisation assets present on the selected radar scene.
    pub fn radar_assets(&self) -> Vec<&str> {
        match &self.radar {
            Some(item) => RADAR_POLARISATIONS
                .iter()
                .copied()
                .filter(|p| item.has_asset(p))
                .collect(),
            None => Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub enum SceneResponse {
    Mock(MockResponse),
    Selected(SceneSelection),
}

#[derive(Debug, Clone)]
pub enum IndexResponse {
    Mock(MockResponse),
    Layers(Vec<IndexLayer>),
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Stand-in used while credentials are unavailable.
#[derive(Debug, Clone)]
pub struct MockCatalog {
    reason: String,
}

impl MockCatalog {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Authenticated STAC + tile service client.
#[derive(Debug, Clone)]
pub struct LiveCatalog {
    http: reqwest::Client,
    settings: CatalogSettings,
    credentials: Arc<ServiceAccountCredentials>,
}

impl LiveCatalog {
    pub fn new(
        settings: CatalogSettings,
        credentials: Arc<ServiceAccountCredentials>,
    ) -> CatalogResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .user_agent(concat!("field-analysis/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            settings,
            credentials,
        })
    }

    pub fn settings(&self) -> &CatalogSettings {
        &self.settings
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.credentials.access_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Run a search and return the most recent matching item.
    async fn search_latest(&self, params: &SearchParams) -> CatalogResult<Option<Item>> {
        let url = self.settings.search_url();
        let mut attempt = 0;
        let page = loop {
            match self.post_search(&url, params).await {
                Ok(page) => break page,
                Err(e) if e.is_transient() && attempt < self.settings.max_retries => {
                    attempt += 1;
                    let delay = backoff_delay(attempt);
                    warn!(error = %e, attempt, "STAC search failed, retrying");
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        };

        debug!(
            collections = ?params.collections,
            matched = page.features.len(),
            "STAC search complete"
        );
        Ok(most_recent(page.features))
    }

    async fn post_search(&self, url: &str, params: &SearchParams) -> CatalogResult<ItemCollection> {
        let response = self.authorize(self.http.post(url).json(params)).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CatalogError::Status {
                service: "STAC search",
                status: status.as_u16(),
                body: body.chars().take(500).collect(),
            });
        }
        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| CatalogError::Parse {
            service: "STAC search",
            reason: e.to_string(),
        })
    }

    async fn select_scenes(&self, geometry: &Geometry) -> CatalogResult<SceneSelection> {
        let bounds = geometry.buffered_bounds();

        let optical = self
            .search_latest(&self.settings.optical_search(&bounds))
            .await?;
        // Radar only complements the optical scene
        let radar = match self.search_latest(&self.settings.radar_search(&bounds)).await {
            Ok(item) => item,
            Err(e) => {
                warn!(error = %e, "Radar search failed, continuing without radar");
                None
            }
        };

        info!(
            optical = optical.as_ref().map(|i| i.id.as_str()),
            radar = radar.as_ref().map(|i| i.id.as_str()),
            "Selected scenes"
        );
        Ok(SceneSelection {
            optical,
            radar,
            search_bounds: bounds,
        })
    }

    /// Tile URL template for one index layer over `item`.
    ///
    /// Tiles cover the whole scene footprint; the tilejson endpoint has no
    /// geometry clip, so callers mask to the field client-side.
    async fn tile_reference(
        &self,
        item: &Item,
        layer: &IndexLayer,
        vis: &VisParams,
    ) -> CatalogResult<Option<String>> {
        let collection = item
            .collection
            .as_deref()
            .unwrap_or(&self.settings.optical_collection);
        let url = format!(
            "{}/collections/{}/items/{}/WebMercatorQuad/tilejson.json",
            self.settings.tiler_url.trim_end_matches('/'),
            collection,
            item.id
        );

        let mut query: Vec<(&str, String)> = vec![
            ("expression", layer.expression.clone()),
            ("asset_as_band", "true".to_string()),
            ("rescale", vis.rescale()),
            ("colormap_name", vis.palette.colormap_name().to_string()),
        ];
        query.extend(layer.assets.iter().map(|a| ("assets", a.clone())));

        let response = self.authorize(self.http.get(&url).query(&query)).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CatalogError::Status {
                service: "tile service",
                status: status.as_u16(),
                body: body.chars().take(300).collect(),
            });
        }
        let tilejson: TileJson = response.json().await.map_err(|e| CatalogError::Parse {
            service: "tile service",
            reason: e.to_string(),
        })?;
        Ok(tilejson.tiles.into_iter().next())
    }
}

/// Catalog access, chosen once when connecting.
#[derive(Debug, Clone)]
pub enum CatalogClient {
    Mock(MockCatalog),
    Live(LiveCatalog),
}

impl CatalogClient {
    /// Initialize authentication if needed and pick the variant.
    ///
    /// Never fails: missing credentials or an unbuildable HTTP client give
    /// the mock variant.
    #[instrument(skip_all)]
    pub async fn connect(auth: &AuthContext, settings: CatalogSettings) -> Self {
        let credentials = match auth.ensure_initialized().await {
            Ok(creds) => creds,
            Err(e) => return CatalogClient::Mock(MockCatalog::new(e.to_string())),
        };
        match LiveCatalog::new(settings, credentials) {
            Ok(live) => CatalogClient::Live(live),
            Err(e) => {
                warn!(error = %e, "Could not build catalog HTTP client");
                CatalogClient::Mock(MockCatalog::new(e.to_string()))
            }
        }
    }

    pub fn is_mock(&self) -> bool {
        matches!(self, CatalogClient::Mock(_))
    }

    /// Most recent optical and radar scenes intersecting the buffered geometry.
    pub async fn select_scenes(&self, geometry: &Geometry) -> CatalogResult<SceneResponse> {
        match self {
            CatalogClient::Mock(mock) => {
                info!(reason = %mock.reason, "Returning mock scene response");
                Ok(SceneResponse::Mock(MockResponse::scenes()))
            }
            CatalogClient::Live(live) => live.select_scenes(geometry).await.map(SceneResponse::Selected),
        }
    }

    /// Band-math layers for every index. Mock clients return the index names only.
    pub fn compute_indices(&self) -> IndexResponse {
        match self {
            CatalogClient::Mock(_) => IndexResponse::Mock(MockResponse::indices()),
            CatalogClient::Live(live) => IndexResponse::Layers(IndexLayer::all(&live.settings.bands)),
        }
    }

    /// Tile URL template for one layer, or `None` when there is nothing to
    /// draw (mock client, no optical scene, or an empty TileJSON).
    pub async fn tile_reference(
        &self,
        selection: &SceneSelection,
        layer: &IndexLayer,
        vis: &VisParams,
    ) -> CatalogResult<Option<String>> {
        match (self, &selection.optical) {
            (CatalogClient::Live(live), Some(item)) => live.tile_reference(item, layer, vis).await,
            _ => Ok(None),
        }
    }
}

/// Delay before retry `attempt` (1-based): 500ms, 1s, 2s, ... capped at one minute.
fn backoff_delay(attempt: u32) -> Duration {
    const BASE_MS: u64 = 500;
    const MAX_MS: u64 = 60_000;
    let factor = 1u64.checked_shl(attempt.saturating_sub(1)).unwrap_or(u64::MAX);
    Duration::from_millis(BASE_MS.saturating_mul(factor).min(MAX_MS))
}

//! End-to-end analysis tests against local file-store and catalog servers.

use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::{Json, Query};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::Router;
use catalog::AuthContext;
use field_analysis::{AnalysisConfig, Orchestrator};
use field_common::{AnalysisStatus, FieldRecord, IndexName, LatLng};
use serde_json::{json, Value};
use tempfile::TempDir;
use test_utils::{
    boundary, create_split_field_bands, file_count, spawn_server, write_credentials,
    FixtureCompression, GeoTiffBuilder, Georeference,
};

// ============================================================================
// Harness
// ============================================================================

struct Harness {
    dir: TempDir,
    transient: PathBuf,
}

impl Harness {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let transient = dir.path().join("transient");
        std::fs::create_dir(&transient).unwrap();
        Self { dir, transient }
    }

    fn credentials_path(&self) -> PathBuf {
        self.dir.path().join("catalog-credentials.json")
    }

    fn write_credentials(&self) {
        write_credentials(self.dir.path(), "svc@field-health.iam");
    }

    fn config(&self, catalog_base: Option<&str>) -> AnalysisConfig {
        let mut config = AnalysisConfig::default();
        config.credentials_path = self.credentials_path();
        config.download.transient_dir = Some(self.transient.clone());
        config.download.timeout_secs = 10;
        config.catalog.max_retries = 0;
        if let Some(base) = catalog_base {
            config.catalog.catalog_url = base.to_string();
            config.catalog.tiler_url = base.to_string();
        }
        config
    }

    fn orchestrator(&self, catalog_base: Option<&str>) -> Orchestrator {
        let config = self.config(catalog_base);
        let auth = Arc::new(AuthContext::new(&config.credentials_path));
        Orchestrator::new(&config, auth).unwrap()
    }

    fn transient_files(&self) -> usize {
        file_count(&self.transient)
    }
}

fn file_field(id: &str, url: Option<String>) -> FieldRecord {
    FieldRecord {
        field_id: id.to_string(),
        boundary: Vec::new(),
        imagery_url: url,
    }
}

fn remote_field(id: &str, boundary: Vec<LatLng>) -> FieldRecord {
    FieldRecord {
        field_id: id.to_string(),
        boundary,
        imagery_url: None,
    }
}

fn geotiff(width: u32, height: u32, band_count: usize) -> Vec<u8> {
    let mut bands = create_split_field_bands(width as usize, height as usize);
    bands.truncate(band_count);
    GeoTiffBuilder::new(width, height)
        .bands(bands)
        .georeference(Georeference::utm_43n())
        .to_bytes()
        .unwrap()
}

/// Analytic-style file: MinIsBlack multiband, compressed, several strips.
/// A fifth band stands in for an extra sensor channel.
fn analytic_geotiff(band_count: usize, compression: FixtureCompression) -> Vec<u8> {
    let mut bands = create_split_field_bands(64, 48);
    while bands.len() < band_count {
        bands.push(vec![7; 64 * 48]);
    }
    GeoTiffBuilder::new(64, 48)
        .bands(bands)
        .georeference(Georeference::utm_43n())
        .multiband()
        .compression(compression)
        .rows_per_strip(10)
        .to_bytes()
        .unwrap()
}

fn serve_bytes(bytes: Vec<u8>) -> axum::routing::MethodRouter {
    get(move || {
        let body = bytes.clone();
        async move { body }
    })
}

async fn file_store() -> String {
    let router = Router::new()
        .route("/fields/four.tif", serve_bytes(geotiff(64, 48, 4)))
        .route("/fields/large.tif", serve_bytes(geotiff(1500, 20, 4)))
        .route("/fields/three.tif", serve_bytes(geotiff(64, 48, 3)))
        .route(
            "/fields/analytic.tif",
            serve_bytes(analytic_geotiff(4, FixtureCompression::Lzw)),
        )
        .route(
            "/fields/analytic5.tif",
            serve_bytes(analytic_geotiff(5, FixtureCompression::Deflate)),
        )
        .route("/fields/garbage.tif", serve_bytes(b"definitely not a tiff".to_vec()))
        .route("/fields/empty.tif", serve_bytes(Vec::new()))
        .route(
            "/fields/forbidden.tif",
            get(|| async { (StatusCode::FORBIDDEN, "denied").into_response() }),
        );
    spawn_server(router).await
}

fn stac_items(features: Value) -> Value {
    json!({"type": "FeatureCollection", "features": features})
}

async fn search(Json(body): Json<Value>) -> Json<Value> {
    if body["collections"][0] == "sentinel-1-grd" {
        return Json(stac_items(json!([
            {"id": "S1_scene", "collection": "sentinel-1-grd",
             "properties": {"datetime": "2024-07-09T00:51:00Z"},
             "assets": {"vv": {"href": "https://x/vv.tif"}}}
        ])));
    }
    Json(stac_items(json!([
        {"id": "S2_old", "collection": "sentinel-2-l2a",
         "properties": {"datetime": "2024-03-02T05:30:00Z", "eo:cloud_cover": 2.0}},
        {"id": "S2_new", "collection": "sentinel-2-l2a",
         "properties": {"datetime": "2024-07-11T05:30:00Z", "eo:cloud_cover": 8.0}}
    ])))
}

/// Tile service that refuses any expression using the red-edge band.
async fn tilejson(Query(query): Query<Vec<(String, String)>>) -> axum::response::Response {
    let expression = query
        .iter()
        .find(|(k, _)| k == "expression")
        .map(|(_, v)| v.clone())
        .unwrap_or_default();
    if expression.contains("B05") {
        return (StatusCode::INTERNAL_SERVER_ERROR, "band not found").into_response();
    }
    Json(json!({"tiles": [format!("http://tiles.local/{{z}}/{{x}}/{{y}}.png?e={}", expression.len())]}))
        .into_response()
}

async fn catalog_server() -> String {
    let router = Router::new().route("/search", post(search)).route(
        "/collections/:collection/items/:item/WebMercatorQuad/tilejson.json",
        get(tilejson),
    );
    spawn_server(router).await
}

async fn empty_catalog_server() -> String {
    let router = Router::new().route(
        "/search",
        post(|| async { Json(stac_items(json!([]))) }),
    );
    spawn_server(router).await
}

fn assert_no_transient_files(harness: &Harness) {
    assert_eq!(harness.transient_files(), 0, "transient file leaked");
}

fn decode_data_uri_prefix(uri: &str) -> &str {
    uri.split(',').next().unwrap_or_default()
}

// ============================================================================
// File mode
// ============================================================================

#[tokio::test]
async fn test_file_mode_success() {
    let harness = Harness::new();
    let base = file_store().await;
    let orchestrator = harness.orchestrator(None);

    let field = file_field("f-1", Some(format!("{}/fields/four.tif", base)));
    let envelope = orchestrator.analyze_file(&field).await;

    assert_eq!(envelope.status, AnalysisStatus::Success, "{:?}", envelope.message);
    assert_eq!(envelope.field_id.as_deref(), Some("f-1"));
    assert_eq!(envelope.indices, IndexName::ALL.to_vec());
    assert_eq!(envelope.overlays.len(), 6);
    for uri in envelope.overlays.values() {
        assert_eq!(decode_data_uri_prefix(uri), "data:image/png;base64");
    }
    assert!(envelope.tile_urls.is_empty());

    let metadata = envelope.metadata.as_ref().unwrap();
    assert_eq!((metadata.width, metadata.height), (64, 48));
    assert_eq!(metadata.crs.as_deref(), Some("EPSG:32643"));
    assert_eq!(metadata.transform[0], 712_000.0);

    assert_no_transient_files(&harness);
}

#[tokio::test]
async fn test_file_mode_multiband_layouts() {
    let harness = Harness::new();
    let base = file_store().await;
    let orchestrator = harness.orchestrator(None);

    for name in ["analytic.tif", "analytic5.tif"] {
        let field = file_field("f-2", Some(format!("{}/fields/{}", base, name)));
        let envelope = orchestrator.analyze_file(&field).await;

        assert_eq!(envelope.status, AnalysisStatus::Success, "{}: {:?}", name, envelope.message);
        assert_eq!(envelope.indices, IndexName::ALL.to_vec(), "{}", name);
        let metadata = envelope.metadata.as_ref().unwrap();
        assert_eq!((metadata.width, metadata.height), (64, 48));
        assert_eq!(metadata.crs.as_deref(), Some("EPSG:32643"));
    }
    assert_no_transient_files(&harness);
}

#[tokio::test]
async fn test_file_mode_three_bands_is_error_without_leak() {
    let harness = Harness::new();
    let base = file_store().await;
    let orchestrator = harness.orchestrator(None);

    let field = file_field("f-3", Some(format!("{}/fields/three.tif", base)));
    let envelope = orchestrator.analyze_file(&field).await;

    assert_eq!(envelope.status, AnalysisStatus::Error);
    assert_eq!(
        envelope.message.as_deref(),
        Some("Failed to read GeoTIFF. Ensure the file is a valid 4-band image.")
    );
    assert!(envelope.overlays.is_empty());
    assert_no_transient_files(&harness);
}

#[tokio::test]
async fn test_file_mode_unreadable_file() {
    let harness = Harness::new();
    let base = file_store().await;
    let orchestrator = harness.orchestrator(None);

    let envelope = orchestrator
        .analyze_file(&file_field("f-g", Some(format!("{}/fields/garbage.tif", base))))
        .await;
    assert_eq!(envelope.status, AnalysisStatus::Error);
    assert!(envelope.message.unwrap().starts_with("Failed to read GeoTIFF"));
    assert_no_transient_files(&harness);
}

#[tokio::test]
async fn test_file_mode_download_failures() {
    let harness = Harness::new();
    let base = file_store().await;
    let orchestrator = harness.orchestrator(None);

    for (id, path) in [
        ("f-403", "/fields/forbidden.tif"),
        ("f-404", "/fields/nowhere.tif"),
        ("f-0", "/fields/empty.tif"),
    ] {
        let envelope = orchestrator
            .analyze_file(&file_field(id, Some(format!("{}{}", base, path))))
            .await;
        assert_eq!(envelope.status, AnalysisStatus::Error, "{}", path);
        assert_eq!(
            envelope.message.unwrap(),
            format!(
                "Failed to download imagery for field {}. Please check the imagery URL.",
                id
            )
        );
    }
    assert_no_transient_files(&harness);
}

#[tokio::test]
async fn test_file_mode_unreachable_host() {
    let harness = Harness::new();
    let orchestrator = harness.orchestrator(None);

    // Port 9 (discard) is not served on localhost
    let envelope = orchestrator
        .analyze_file(&file_field("f-x", Some("http://127.0.0.1:9/x.tif".to_string())))
        .await;
    assert_eq!(envelope.status, AnalysisStatus::Error);
    assert_no_transient_files(&harness);
}

#[tokio::test]
async fn test_file_mode_without_link_is_pending() {
    let harness = Harness::new();
    let orchestrator = harness.orchestrator(None);

    for url in [None, Some(String::new()), Some("   ".to_string())] {
        let envelope = orchestrator.analyze_file(&file_field("f-none", url)).await;
        assert_eq!(envelope.status, AnalysisStatus::Pending);
        assert_eq!(
            envelope.message.as_deref(),
            Some("No imagery configured for field f-none")
        );
        assert!(envelope.required_format.is_none());
    }
    assert_no_transient_files(&harness);
}

#[tokio::test]
async fn test_file_mode_overlays_are_capped_and_deterministic() {
    let harness = Harness::new();
    let base = file_store().await;
    let orchestrator = harness.orchestrator(None);
    let field = file_field("f-big", Some(format!("{}/fields/large.tif", base)));

    let first = orchestrator.analyze_file(&field).await;
    let second = orchestrator.analyze_file(&field).await;
    assert_eq!(first.status, AnalysisStatus::Success);
    assert_eq!(first.overlays, second.overlays);
    assert_eq!(first.metadata.as_ref().unwrap().width, 1500);
    assert_no_transient_files(&harness);
}

// ============================================================================
// Remote mode
// ============================================================================

#[tokio::test]
async fn test_remote_without_credentials_is_pending() {
    let harness = Harness::new();
    let orchestrator = harness.orchestrator(None);

    let envelope = orchestrator
        .analyze_remote(&remote_field("r-1", boundary::delhi_square()))
        .await;
    assert_eq!(envelope.status, AnalysisStatus::Pending);
    let message = envelope.message.unwrap();
    assert!(message.starts_with("Catalog service not available. Add credentials at: "));
    assert!(message.ends_with("catalog-credentials.json"));
    assert!(envelope.required_format.unwrap()["client_email"].is_string());
    assert!(envelope.tile_urls.is_empty());

    // Even a bad boundary only gets the pending answer
    let envelope = orchestrator
        .analyze_remote(&remote_field("r-1", boundary::degenerate()))
        .await;
    assert_eq!(envelope.status, AnalysisStatus::Pending);
}

#[tokio::test]
async fn test_remote_success_lists_tile_urls() {
    let harness = Harness::new();
    harness.write_credentials();
    let base = catalog_server().await;
    let orchestrator = harness.orchestrator(Some(&base));

    let envelope = orchestrator
        .analyze_remote(&remote_field("r-2", boundary::delhi_square()))
        .await;

    assert_eq!(envelope.status, AnalysisStatus::Success, "{:?}", envelope.message);
    // The tile service refuses the red-edge expression, so NDRE is left out
    assert_eq!(
        envelope.indices,
        vec![
            IndexName::Ndvi,
            IndexName::Ndwi,
            IndexName::Evi,
            IndexName::Savi,
            IndexName::Gndvi
        ]
    );
    assert!(!envelope.tile_urls.contains_key(&IndexName::Ndre));
    assert!(envelope.tile_urls[&IndexName::Ndvi].starts_with("http://tiles.local/{z}/{x}/{y}.png"));
    assert!(envelope.overlays.is_empty());
    assert!(envelope.metadata.is_none());
}

#[tokio::test]
async fn test_remote_invalid_boundary_is_error() {
    let harness = Harness::new();
    harness.write_credentials();
    let base = catalog_server().await;
    let orchestrator = harness.orchestrator(Some(&base));

    let envelope = orchestrator
        .analyze_remote(&remote_field("r-3", boundary::degenerate()))
        .await;
    assert_eq!(envelope.status, AnalysisStatus::Error);
    assert!(envelope.message.unwrap().starts_with("Invalid field geometry"));
}

#[tokio::test]
async fn test_remote_no_scene_is_error() {
    let harness = Harness::new();
    harness.write_credentials();
    let base = empty_catalog_server().await;
    let orchestrator = harness.orchestrator(Some(&base));

    let envelope = orchestrator
        .analyze_remote(&remote_field("r-4", boundary::delhi_square()))
        .await;
    assert_eq!(envelope.status, AnalysisStatus::Error);
    assert_eq!(envelope.message.as_deref(), Some("Failed to fetch satellite imagery"));
}

#[tokio::test]
async fn test_remote_recovers_once_credentials_appear() {
    let harness = Harness::new();
    let base = catalog_server().await;
    let orchestrator = harness.orchestrator(Some(&base));
    let field = remote_field("r-5", boundary::delhi_square_closed());

    assert_eq!(
        orchestrator.analyze_remote(&field).await.status,
        AnalysisStatus::Pending
    );

    harness.write_credentials();
    assert_eq!(
        orchestrator.analyze_remote(&field).await.status,
        AnalysisStatus::Success
    );

    // Initialization is kept once it succeeded
    std::fs::remove_file(harness.credentials_path()).unwrap();
    assert_eq!(
        orchestrator.analyze_remote(&field).await.status,
        AnalysisStatus::Success
    );
}

// ============================================================================
// Envelope shape
// ============================================================================

#[tokio::test]
async fn test_envelope_json_shape() {
    let harness = Harness::new();
    let base = file_store().await;
    let orchestrator = harness.orchestrator(None);

    let envelope = orchestrator
        .analyze_file(&file_field("f-json", Some(format!("{}/fields/four.tif", base))))
        .await;
    let json = serde_json::to_value(&envelope).unwrap();
    assert_eq!(json["status"], "success");
    assert_eq!(json["field_id"], "f-json");
    assert_eq!(json["indices"][0], "ndvi");
    assert!(json["overlays"]["gndvi"].is_string());
    assert!(json.get("tile_urls").is_none());
    assert_eq!(json["metadata"]["crs"], "EPSG:32643");
}

//! Tests for decoding multi-band GeoTIFF imagery.

use field_common::AnalysisError;
use geotiff_reader::{read_band_set, read_raster, RasterError};
use tempfile::TempDir;
use test_utils::{
    assert_approx_eq, create_ramp_band, create_split_field_bands, create_uniform_bands,
    FixtureCompression, GeoTiffBuilder, Georeference, BARE_SOIL, VEGETATION, WATER,
};

fn write(dir: &TempDir, name: &str, builder: GeoTiffBuilder) -> std::path::PathBuf {
    let path = dir.path().join(name);
    builder.write(&path).expect("write fixture");
    path
}

// ============================================================================
// Band mapping
// ============================================================================

#[test]
fn test_four_band_interleaved() {
    let dir = TempDir::new().unwrap();
    let path = write(
        &dir,
        "field.tif",
        GeoTiffBuilder::new(6, 4).bands(create_uniform_bands(6, 4, VEGETATION)),
    );

    let bands = read_band_set(&path).unwrap();
    assert_eq!(bands.dimensions(), (6, 4));
    assert_eq!(bands.blue.get(0, 0), Some(f64::from(VEGETATION[0])));
    assert_eq!(bands.green.get(5, 3), Some(f64::from(VEGETATION[1])));
    assert_eq!(bands.red.get(2, 1), Some(f64::from(VEGETATION[2])));
    assert_eq!(bands.nir.get(3, 2), Some(f64::from(VEGETATION[3])));
    assert!(!bands.has_red_edge());
}

#[test]
fn test_full_resolution_preserved() {
    let dir = TempDir::new().unwrap();
    let bands = create_split_field_bands(10, 3);
    let path = write(&dir, "split.tif", GeoTiffBuilder::new(10, 3).bands(bands));

    let set = read_band_set(&path).unwrap();
    assert_eq!(set.nir.values().len(), 30);
    assert_eq!(set.nir.get(0, 0), Some(f64::from(VEGETATION[3])));
    assert_eq!(set.nir.get(9, 2), Some(f64::from(WATER[3])));
}

#[test]
fn test_pixel_order_row_major() {
    let dir = TempDir::new().unwrap();
    let ramp = create_ramp_band(5, 3, 100);
    let bands = vec![ramp.clone(), ramp.clone(), ramp.clone(), ramp];
    let path = write(&dir, "ramp.tif", GeoTiffBuilder::new(5, 3).bands(bands));

    let set = read_band_set(&path).unwrap();
    // col * 10 + row + base
    assert_eq!(set.red.get(4, 0), Some(140.0));
    assert_eq!(set.red.get(0, 2), Some(102.0));
}

// ============================================================================
// Analytic layouts (MinIsBlack multiband, extra samples, compression)
// ============================================================================

#[test]
fn test_minisblack_four_band() {
    let dir = TempDir::new().unwrap();
    let path = write(
        &dir,
        "analytic.tif",
        GeoTiffBuilder::new(8, 8)
            .bands(create_uniform_bands(8, 8, VEGETATION))
            .georeference(Georeference::utm_43n())
            .multiband(),
    );

    let raster = read_raster(&path).unwrap();
    assert_eq!(raster.band_count(), 4);
    assert_eq!(raster.metadata.crs.as_deref(), Some("EPSG:32643"));

    let set = raster.into_band_set().unwrap();
    assert_eq!(set.blue.get(7, 7), Some(f64::from(VEGETATION[0])));
    assert_eq!(set.nir.get(0, 0), Some(f64::from(VEGETATION[3])));
}

#[test]
fn test_minisblack_five_band_extra_ignored() {
    let dir = TempDir::new().unwrap();
    let mut bands = create_uniform_bands(5, 4, WATER);
    bands.push(vec![9999; 20]);
    let path = write(&dir, "five.tif", GeoTiffBuilder::new(5, 4).bands(bands).multiband());

    let raster = read_raster(&path).unwrap();
    assert_eq!(raster.band_count(), 5);
    assert_eq!(raster.bands[4].get(4, 3), Some(9999.0));

    let set = raster.into_band_set().unwrap();
    assert_eq!(set.red.get(2, 2), Some(f64::from(WATER[2])));
    assert_eq!(set.nir.get(4, 3), Some(f64::from(WATER[3])));
}

#[test]
fn test_rgb_with_two_extra_samples() {
    let dir = TempDir::new().unwrap();
    let mut bands = create_uniform_bands(4, 3, BARE_SOIL);
    bands.push(vec![1; 12]);
    let path = write(&dir, "rgbx.tif", GeoTiffBuilder::new(4, 3).bands(bands));

    let raster = read_raster(&path).unwrap();
    assert_eq!(raster.band_count(), 5);
    let set = raster.into_band_set().unwrap();
    assert_eq!(set.green.get(3, 2), Some(f64::from(BARE_SOIL[1])));
    assert_eq!(set.nir.get(0, 1), Some(f64::from(BARE_SOIL[3])));
}

#[test]
fn test_compressed_multistrip_pixels_in_place() {
    let ramp = create_ramp_band(7, 9, 100);
    for compression in [
        FixtureCompression::None,
        FixtureCompression::Lzw,
        FixtureCompression::Deflate,
    ] {
        let dir = TempDir::new().unwrap();
        let bands = vec![ramp.clone(), ramp.clone(), ramp.clone(), ramp.clone()];
        let path = write(
            &dir,
            "ramp.tif",
            GeoTiffBuilder::new(7, 9)
                .bands(bands)
                .multiband()
                .compression(compression)
                .rows_per_strip(4),
        );

        let set = read_band_set(&path).unwrap();
        assert_eq!(set.dimensions(), (7, 9), "{:?}", compression);
        // col * 10 + row + base, last strip is short
        assert_eq!(set.red.get(6, 0), Some(160.0), "{:?}", compression);
        assert_eq!(set.nir.get(3, 8), Some(138.0), "{:?}", compression);
        assert_eq!(set.blue.values(), &ramp.iter().map(|&v| f64::from(v)).collect::<Vec<_>>()[..]);
    }
}

#[test]
fn test_compressed_rgba_read_by_tiff() {
    let dir = TempDir::new().unwrap();
    let path = write(
        &dir,
        "rgba-lzw.tif",
        GeoTiffBuilder::new(6, 4)
            .bands(create_uniform_bands(6, 4, VEGETATION))
            .compression(FixtureCompression::Lzw),
    );
    let set = read_band_set(&path).unwrap();
    assert_eq!(set.nir.get(5, 3), Some(f64::from(VEGETATION[3])));
}

// ============================================================================
// Unsupported inputs
// ============================================================================

#[test]
fn test_three_band_rejected() {
    let dir = TempDir::new().unwrap();
    let rgb: Vec<Vec<u16>> = create_uniform_bands(4, 4, BARE_SOIL)
        .into_iter()
        .take(3)
        .collect();
    let path = write(&dir, "rgb.tif", GeoTiffBuilder::new(4, 4).bands(rgb));

    let raster = read_raster(&path).unwrap();
    assert_eq!(raster.band_count(), 3);

    let err = read_band_set(&path).unwrap_err();
    assert!(matches!(err, AnalysisError::UnsupportedRaster(_)));
}

#[test]
fn test_single_band_rejected() {
    let dir = TempDir::new().unwrap();
    let path = write(
        &dir,
        "gray.tif",
        GeoTiffBuilder::new(4, 4).bands(vec![vec![7; 16]]),
    );
    assert!(matches!(
        read_band_set(&path),
        Err(AnalysisError::UnsupportedRaster(_))
    ));
}

#[test]
fn test_not_a_tiff() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("page.tif");
    std::fs::write(&path, b"<html>Sign in to continue</html>").unwrap();

    assert!(matches!(read_raster(&path), Err(RasterError::Tiff(_))));
    assert!(matches!(
        read_band_set(&path),
        Err(AnalysisError::UnsupportedRaster(_))
    ));
}

#[test]
fn test_missing_file() {
    let err = read_raster("/nonexistent/field.tif").unwrap_err();
    assert!(matches!(err, RasterError::Io(_)));
}

// ============================================================================
// Georeferencing
// ============================================================================

#[test]
fn test_georeference_read() {
    let dir = TempDir::new().unwrap();
    let path = write(
        &dir,
        "geo.tif",
        GeoTiffBuilder::new(20, 10)
            .bands(create_uniform_bands(20, 10, VEGETATION))
            .georeference(Georeference::utm_43n()),
    );

    let meta = read_raster(&path).unwrap().metadata;
    assert_eq!(meta.crs.as_deref(), Some("EPSG:32643"));
    assert_eq!(meta.transform, [712_000.0, 3.0, 0.0, 3_170_000.0, 0.0, -3.0]);
    assert_approx_eq!(meta.bounds.min_x, 712_000.0, 1e-9);
    assert_approx_eq!(meta.bounds.max_x, 712_060.0, 1e-9);
    assert_approx_eq!(meta.bounds.min_y, 3_169_970.0, 1e-9);
    assert_approx_eq!(meta.bounds.max_y, 3_170_000.0, 1e-9);
    assert_eq!((meta.width, meta.height), (20, 10));
}

#[test]
fn test_geographic_crs() {
    let dir = TempDir::new().unwrap();
    let georef = Georeference {
        origin_x: 77.2090,
        origin_y: 28.6140,
        pixel_size: 0.0001,
        epsg: 4326,
    };
    let path = write(
        &dir,
        "wgs84.tif",
        GeoTiffBuilder::new(4, 4)
            .bands(create_uniform_bands(4, 4, VEGETATION))
            .georeference(georef),
    );

    let meta = read_raster(&path).unwrap().metadata;
    assert_eq!(meta.crs.as_deref(), Some("EPSG:4326"));
}

#[test]
fn test_no_georeference_falls_back_to_pixel_grid() {
    let dir = TempDir::new().unwrap();
    let path = write(
        &dir,
        "plain.tif",
        GeoTiffBuilder::new(8, 2).bands(create_uniform_bands(8, 2, VEGETATION)),
    );

    let meta = read_raster(&path).unwrap().metadata;
    assert!(meta.crs.is_none());
    assert_eq!(meta.bounds.max_x, 8.0);
    assert_eq!(meta.bounds.max_y, 2.0);
}

// ============================================================================
// Multi-page files
// ============================================================================

#[test]
fn test_one_page_per_band() {
    let dir = TempDir::new().unwrap();
    let path = write(
        &dir,
        "pages.tif",
        GeoTiffBuilder::new(3, 3)
            .bands(create_uniform_bands(3, 3, WATER))
            .georeference(Georeference::utm_43n())
            .paged(),
    );

    let raster = read_raster(&path).unwrap();
    assert_eq!(raster.band_count(), 4);
    assert_eq!(raster.metadata.crs.as_deref(), Some("EPSG:32643"));

    let set = raster.into_band_set().unwrap();
    assert_eq!(set.nir.get(1, 1), Some(f64::from(WATER[3])));
}

#[test]
fn test_five_pages_extra_band_ignored() {
    let dir = TempDir::new().unwrap();
    let mut bands = create_uniform_bands(3, 3, VEGETATION);
    bands.push(vec![9999; 9]);
    let path = write(&dir, "five.tif", GeoTiffBuilder::new(3, 3).bands(bands).paged());

    let raster = read_raster(&path).unwrap();
    assert_eq!(raster.band_count(), 5);
    let set = raster.into_band_set().unwrap();
    assert_eq!(set.nir.get(0, 0), Some(f64::from(VEGETATION[3])));
}

#[test]
fn test_overview_page_not_a_band() {
    let dir = TempDir::new().unwrap();
    let path = write(
        &dir,
        "overview.tif",
        GeoTiffBuilder::new(4, 4)
            .bands(create_uniform_bands(4, 4, VEGETATION))
            .paged()
            .with_overview(2, 2),
    );

    assert_eq!(read_raster(&path).unwrap().band_count(), 4);
}

//! Tests for building field geometries from boundaries.

use field_common::{AnalysisError, Geometry, DEFAULT_BUFFER_METERS};
use test_utils::boundary::delhi_square;

// ============================================================================
// Ring construction
// ============================================================================

#[test]
fn test_square_becomes_five_vertex_ring() {
    let boundary = delhi_square();
    let geom = Geometry::build(&boundary, DEFAULT_BUFFER_METERS).unwrap();

    assert_eq!(geom.ring().len(), 5);
    assert_eq!(&geom.ring()[..4], boundary.as_slice());
    assert_eq!(geom.ring()[4], boundary[0]);
    assert_eq!(geom.buffer_meters(), 10.0);
}

#[test]
fn test_input_not_mutated() {
    let boundary = delhi_square();
    let before = boundary.clone();
    let _ = Geometry::build(&boundary, 10.0).unwrap();
    assert_eq!(boundary, before);
}

#[test]
fn test_zero_buffer_allowed() {
    let geom = Geometry::build(&delhi_square(), 0.0).unwrap();
    assert_eq!(geom.buffered_bounds(), geom.bounds());
}

#[test]
fn test_too_few_vertices() {
    let boundary = &delhi_square()[..2];
    let err = Geometry::build(boundary, 10.0).unwrap_err();
    assert!(matches!(err, AnalysisError::InvalidGeometry(_)));

    assert!(Geometry::build(&[], 10.0).is_err());
}

// ============================================================================
// Bounds
// ============================================================================

#[test]
fn test_bounds_use_lng_as_x() {
    let geom = Geometry::build(&delhi_square(), 0.0).unwrap();
    let bounds = geom.bounds();
    assert!((bounds.min_x - 77.2090).abs() < 1e-12);
    assert!((bounds.max_x - 77.2095).abs() < 1e-12);
    assert!((bounds.min_y - 28.6135).abs() < 1e-12);
    assert!((bounds.max_y - 28.6140).abs() < 1e-12);
}

#[test]
fn test_buffered_bounds_grow_by_buffer() {
    let geom = Geometry::build(&delhi_square(), 10.0).unwrap();
    let plain = geom.bounds();
    let buffered = geom.buffered_bounds();

    // 10 m is roughly 9e-5 degrees of latitude
    let dy = plain.min_y - buffered.min_y;
    assert!((dy - 10.0 / 111_320.0).abs() < 1e-9);

    // Longitude degrees are shorter away from the equator, so dx > dy
    let dx = plain.min_x - buffered.min_x;
    assert!(dx > dy);
    assert!(buffered.contains_point(plain.min_x, plain.min_y));
    assert!(buffered.contains_point(plain.max_x, plain.max_y));
}

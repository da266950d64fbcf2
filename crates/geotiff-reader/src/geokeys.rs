//! GeoTIFF georeferencing tags.
//!
//! Reads tags 33550 (ModelPixelScale), 33922 (ModelTiepoint),
//! 34264 (ModelTransformation) and 34735 (GeoKeyDirectory).

use std::io::{Read, Seek};
use tiff::decoder::Decoder;
use tiff::tags::Tag;

/// GTModelTypeGeoKey values are not needed; only the CRS codes are.
const GEOGRAPHIC_TYPE_KEY: u16 = 2048;
const PROJECTED_CS_TYPE_KEY: u16 = 3072;
/// "user-defined" sentinel in GeoKey values
const USER_DEFINED: u16 = 32767;

/// Affine transform in GDAL order from pixel-scale + tiepoint, or from the
/// 4x4 model transformation matrix. `None` if neither is present.
pub fn read_transform<R: Read + Seek>(decoder: &mut Decoder<R>) -> Option<[f64; 6]> {
    let scale = decoder.get_tag_f64_vec(Tag::ModelPixelScaleTag).ok();
    let tiepoint = decoder.get_tag_f64_vec(Tag::ModelTiepointTag).ok();

    if let (Some(scale), Some(tiepoint)) = (&scale, &tiepoint) {
        if let Some(transform) = transform_from_tiepoint(scale, tiepoint) {
            return Some(transform);
        }
    }

    let matrix = decoder.get_tag_f64_vec(Tag::ModelTransformationTag).ok()?;
    transform_from_matrix(&matrix)
}

/// tiepoint: `[I, J, K, X, Y, Z]`, scale: `[ScaleX, ScaleY, ScaleZ]`
pub fn transform_from_tiepoint(scale: &[f64], tiepoint: &[f64]) -> Option<[f64; 6]> {
    if scale.len() < 2 || tiepoint.len() < 6 {
        return None;
    }
    let origin_x = tiepoint[3] - tiepoint[0] * scale[0];
    let origin_y = tiepoint[4] + tiepoint[1] * scale[1];
    // north-up: y decreases going down the rows
    Some([origin_x, scale[0], 0.0, origin_y, 0.0, -scale[1]])
}

/// Row-major 4x4: x = t[3] + col*t[0] + row*t[1], y = t[7] + col*t[4] + row*t[5]
pub fn transform_from_matrix(t: &[f64]) -> Option<[f64; 6]> {
    if t.len() < 16 {
        return None;
    }
    Some([t[3], t[0], t[1], t[7], t[4], t[5]])
}

/// CRS as `EPSG:{code}` from the GeoKeyDirectory, preferring the projected
/// CRS key over the geographic one.
pub fn read_crs<R: Read + Seek>(decoder: &mut Decoder<R>) -> Option<String> {
    let directory = decoder.get_tag_u16_vec(Tag::GeoKeyDirectoryTag).ok()?;
    crs_from_geokeys(&directory)
}

/// Directory layout: `[version, revision, minor, count, (key, location, count, value)*]`.
/// Only keys stored inline (location 0) are considered.
pub fn crs_from_geokeys(directory: &[u16]) -> Option<String> {
    if directory.len() < 4 {
        return None;
    }
    let num_keys = directory[3] as usize;

    let mut geographic = None;
    let mut projected = None;
    for entry in directory[4..].chunks_exact(4).take(num_keys) {
        let (key, location, value) = (entry[0], entry[1], entry[3]);
        if location != 0 || value == 0 || value == USER_DEFINED {
            continue;
        }
        match key {
            PROJECTED_CS_TYPE_KEY => projected = Some(value),
            GEOGRAPHIC_TYPE_KEY => geographic = Some(value),
            _ => {}
        }
    }

    projected.or(geographic).map(|code| format!("EPSG:{}", code))
}

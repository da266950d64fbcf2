//! Synthetic band generators.
//!
//! These create predictable reflectance patterns so index values can be
//! checked by hand. Values are digital numbers on a 0..10000 scale, the
//! way analytic surface-reflectance products store them.

use field_common::{BandSet, Plane, RasterMetadata};

/// Reflectance of a healthy canopy: low red, high near-infrared.
pub const VEGETATION: [u16; 4] = [400, 800, 500, 4500];

/// Reflectance of open water: near-infrared absorbed.
pub const WATER: [u16; 4] = [900, 1100, 700, 200];

/// Reflectance of bare soil: flat spectrum.
pub const BARE_SOIL: [u16; 4] = [1500, 1900, 2300, 2700];

/// Creates a band with a predictable value per cell.
///
/// Each cell value is `base + col * 10 + row`, so `band[row * width + col]`
/// identifies its position.
///
/// # Example
///
/// ```
/// use test_utils::create_ramp_band;
///
/// let band = create_ramp_band(10, 5, 100);
/// assert_eq!(band.len(), 50);
/// assert_eq!(band[0], 100);
/// assert_eq!(band[1], 110);  // col=1, row=0
/// assert_eq!(band[10], 101); // col=0, row=1
/// ```
pub fn create_ramp_band(width: usize, height: usize, base: u16) -> Vec<u16> {
    let mut data = Vec::with_capacity(width * height);
    for row in 0..height {
        for col in 0..width {
            data.push(base.saturating_add((col * 10 + row) as u16));
        }
    }
    data
}

/// Four bands (blue, green, red, nir) holding one spectrum everywhere.
pub fn create_uniform_bands(width: usize, height: usize, spectrum: [u16; 4]) -> Vec<Vec<u16>> {
    spectrum
        .iter()
        .map(|&v| vec![v; width * height])
        .collect()
}

/// Four bands where the left half is vegetation and the right half water.
pub fn create_split_field_bands(width: usize, height: usize) -> Vec<Vec<u16>> {
    let mut bands = vec![Vec::with_capacity(width * height); 4];
    for _row in 0..height {
        for col in 0..width {
            let spectrum = if col < width / 2 { VEGETATION } else { WATER };
            for (band, &v) in bands.iter_mut().zip(spectrum.iter()) {
                band.push(v);
            }
        }
    }
    bands
}

/// Build a [`BandSet`] directly from one spectrum, skipping the file round trip.
pub fn uniform_band_set(width: usize, height: usize, spectrum: [u16; 4]) -> BandSet {
    let planes: Vec<Plane> = spectrum
        .iter()
        .map(|&v| Plane::filled(width, height, f64::from(v)))
        .collect();
    BandSet::from_ordered_bands(planes, RasterMetadata::pixel_grid(width, height))
        .expect("uniform planes share dimensions")
}

/// Build a [`BandSet`] from raw band values.
pub fn band_set_from(width: usize, height: usize, bands: &[Vec<u16>]) -> BandSet {
    let planes: Vec<Plane> = bands
        .iter()
        .map(|b| {
            Plane::new(width, height, b.iter().map(|&v| f64::from(v)).collect())
                .expect("band length matches dimensions")
        })
        .collect();
    BandSet::from_ordered_bands(planes, RasterMetadata::pixel_grid(width, height))
        .expect("at least four bands")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_field_halves() {
        let bands = create_split_field_bands(4, 2);
        assert_eq!(bands.len(), 4);
        assert_eq!(bands[3][0], VEGETATION[3]);
        assert_eq!(bands[3][3], WATER[3]);
        assert_eq!(bands[3][4], VEGETATION[3]); // second row starts over
    }

    #[test]
    fn test_uniform_band_set() {
        let set = uniform_band_set(3, 2, BARE_SOIL);
        assert_eq!(set.dimensions(), (3, 2));
        assert_eq!(set.red.get(2, 1), Some(2300.0));
    }
}

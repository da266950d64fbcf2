//! Pixel-wise index computation.

use std::collections::BTreeMap;

use field_common::{BandSet, IndexName, Plane};
use tracing::debug;

use crate::error::{SpectralError, SpectralResult};

/// Added to every denominator so exact zeros never divide.
pub const EPSILON: f64 = 1e-10;

// EVI coefficients (MODIS)
const EVI_GAIN: f64 = 2.5;
const EVI_C1: f64 = 6.0;
const EVI_C2: f64 = 7.5;
const EVI_L: f64 = 1.0;

// SAVI soil brightness correction
const SAVI_L: f64 = 0.5;

/// Reflectances of one pixel.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SpectralSample {
    pub blue: f64,
    pub green: f64,
    pub red: f64,
    pub nir: f64,
    pub red_edge: Option<f64>,
}

#[inline]
fn normalized_difference(a: f64, b: f64) -> f64 {
    (a - b) / (a + b + EPSILON)
}

/// Evaluate one index for one pixel.
pub fn pixel_value(index: IndexName, s: &SpectralSample) -> f64 {
    match index {
        IndexName::Ndvi => normalized_difference(s.nir, s.red),
        IndexName::Ndwi => normalized_difference(s.green, s.nir),
        IndexName::Evi => {
            EVI_GAIN * (s.nir - s.red)
                / (s.nir + EVI_C1 * s.red - EVI_C2 * s.blue + EVI_L + EPSILON)
        }
        IndexName::Savi => {
            (1.0 + SAVI_L) * (s.nir - s.red) / (s.nir + s.red + SAVI_L + EPSILON)
        }
        // No red-edge band: reuse red
        IndexName::Ndre => normalized_difference(s.nir, s.red_edge.unwrap_or(s.red)),
        IndexName::Gndvi => normalized_difference(s.nir, s.green),
    }
}

/// Compute one index over a band set.
///
/// Values are not clamped. The output has the band set's dimensions.
pub fn compute(index: IndexName, bands: &BandSet) -> SpectralResult<Plane> {
    check_bands(bands)?;
    let (width, height) = bands.dimensions();

    let blue = bands.blue.values();
    let green = bands.green.values();
    let red = bands.red.values();
    let nir = bands.nir.values();
    let red_edge = bands.red_edge.as_ref().map(Plane::values);

    let values: Vec<f64> = (0..width * height)
        .map(|i| {
            let sample = SpectralSample {
                blue: blue[i],
                green: green[i],
                red: red[i],
                nir: nir[i],
                red_edge: red_edge.map(|re| re[i]),
            };
            pixel_value(index, &sample)
        })
        .collect();

    Plane::new(width, height, values).ok_or(SpectralError::DimensionMismatch {
        band: "output",
        expected: (width, height),
        found: (0, 0),
    })
}

fn check_bands(bands: &BandSet) -> SpectralResult<()> {
    let expected = bands.dimensions();
    if expected.0 == 0 || expected.1 == 0 {
        return Err(SpectralError::EmptyBandSet);
    }

    let planes = [
        ("blue", Some(&bands.blue)),
        ("green", Some(&bands.green)),
        ("red", Some(&bands.red)),
        ("nir", Some(&bands.nir)),
        ("red_edge", bands.red_edge.as_ref()),
    ];
    for (band, plane) in planes {
        if let Some(plane) = plane {
            if plane.dimensions() != expected {
                return Err(SpectralError::DimensionMismatch {
                    band,
                    expected,
                    found: plane.dimensions(),
                });
            }
        }
    }
    Ok(())
}

/// All six index planes, keyed by name.
#[derive(Debug, Clone)]
pub struct IndexResult {
    planes: BTreeMap<IndexName, Plane>,
    width: usize,
    height: usize,
}

impl IndexResult {
    pub fn get(&self, index: IndexName) -> Option<&Plane> {
        self.planes.get(&index)
    }

    pub fn iter(&self) -> impl Iterator<Item = (IndexName, &Plane)> {
        self.planes.iter().map(|(k, v)| (*k, v))
    }

    pub fn names(&self) -> Vec<IndexName> {
        self.planes.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.planes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.planes.is_empty()
    }

    /// (width, height), same as the source band set
    pub fn dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }
}

/// Compute every index in [`IndexName::ALL`].
///
/// Fails if the band set is empty or inconsistent, or if any index comes
/// out with no finite value at all.
pub fn compute_all(bands: &BandSet) -> SpectralResult<IndexResult> {
    let (width, height) = bands.dimensions();
    let mut planes = BTreeMap::new();

    for index in IndexName::ALL {
        let plane = compute(index, bands)?;
        let Some(stats) = plane.finite_stats() else {
            return Err(SpectralError::NoFiniteValues(index));
        };
        debug!(
            index = %index,
            min = stats.min,
            max = stats.max,
            mean = stats.mean,
            "Computed index"
        );
        planes.insert(index, plane);
    }

    Ok(IndexResult {
        planes,
        width,
        height,
    })
}

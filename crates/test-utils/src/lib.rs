//! Test support for the field-health workspace.
//!
//! Imagery fixtures are generated in code rather than checked in: the
//! [`GeoTiffBuilder`] writes real GeoTIFFs from synthetic bands, and the
//! spectra in [`generators`] give predictable index values. Network tests
//! run against [`spawn_server`].
//!
//! ```ignore
//! use test_utils::{boundary, create_split_field_bands, GeoTiffBuilder};
//! ```

pub mod fixtures;
pub mod generators;
pub mod geotiff;
pub mod server;

pub use fixtures::*;
pub use generators::*;
pub use geotiff::{FixtureCompression, GeoTiffBuilder, Georeference};
pub use server::spawn_server;

/// Macro for approximate floating-point equality assertions.
///
/// # Usage
///
/// ```ignore
/// use test_utils::assert_approx_eq;
///
/// assert_approx_eq!(1.0001_f64, 1.0_f64, 0.001_f64); // passes
/// assert_approx_eq!(1.1_f32, 1.0_f32, 0.001_f32);    // fails
/// ```
#[macro_export]
macro_rules! assert_approx_eq {
    ($left:expr, $right:expr, $epsilon:expr) => {{
        let left: f64 = $left as f64;
        let right: f64 = $right as f64;
        let epsilon: f64 = $epsilon as f64;
        let diff = (left - right).abs();
        if diff > epsilon {
            panic!(
                "assertion failed: `(left ≈ right)`\n  left: `{:?}`,\n right: `{:?}`,\n  diff: `{:?}` > epsilon `{:?}`",
                left, right, diff, epsilon
            );
        }
    }};
}

/// Assert every finite value of a slice lies in `[min, max]`.
///
/// ```ignore
/// use test_utils::assert_all_in_range;
///
/// assert_all_in_range!(ndvi.values(), -1.0, 1.0);
/// ```
#[macro_export]
macro_rules! assert_all_in_range {
    ($values:expr, $min:expr, $max:expr) => {{
        for (i, &v) in $values.iter().enumerate() {
            let v: f64 = v as f64;
            if v.is_finite() && (v < $min as f64 || v > $max as f64) {
                panic!(
                    "assertion failed: value[{}] = {:?} outside [{:?}, {:?}]",
                    i, v, $min, $max
                );
            }
        }
    }};
}

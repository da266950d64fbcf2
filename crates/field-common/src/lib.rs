//! Common types shared across the field-health crates.

pub mod bbox;
pub mod boundary;
pub mod envelope;
pub mod error;
pub mod index;
pub mod raster;
pub mod style;

pub use bbox::BoundingBox;
pub use boundary::{Geometry, LatLng, DEFAULT_BUFFER_METERS};
pub use envelope::{AnalysisEnvelope, AnalysisStatus, FieldRecord};
pub use error::{AnalysisError, AnalysisResult};
pub use index::IndexName;
pub use raster::{BandSet, Plane, RasterMetadata};
pub use style::{Palette, VisParams};

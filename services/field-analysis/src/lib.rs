//! Field crop-health analysis service.
//!
//! Two acquisition paths feed one index and rendering pipeline:
//!
//! - **remote**: scenes are selected on a STAC catalog and displayed as
//!   tile references evaluated by the tile service
//! - **file**: a multi-band GeoTIFF is fetched from a share link, decoded,
//!   and rendered into embedded PNG overlays
//!
//! Every request ends in an [`AnalysisEnvelope`](field_common::AnalysisEnvelope)
//! whose status is `success`, `error` or `pending`.

pub mod config;
pub mod fetch;
pub mod orchestrator;
pub mod source;

pub use config::{AnalysisConfig, ConfigError, ConfigOverrides, DownloadSettings};
pub use fetch::{normalize_share_link, FileFetcher, TransientFile};
pub use orchestrator::{render_overlays, Orchestrator};
pub use source::{FileSource, ImagerySource, Imagery, RemoteSource};

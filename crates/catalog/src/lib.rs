//! Remote catalog access for field analysis.
//!
//! Scenes are searched on a STAC API and displayed through a titiler-style
//! tile service that evaluates band-math expressions server side.
//!
//! Authentication is held in an [`AuthContext`] shared by all requests. When
//! the credential artifact is missing or malformed, [`CatalogClient::connect`]
//! yields the mock variant, whose operations answer with a [`MockResponse`]
//! instead of failing.

pub mod auth;
pub mod client;
pub mod error;
pub mod models;

pub use auth::{AuthContext, AuthState, ServiceAccountCredentials};
pub use client::{
    CatalogClient, CatalogSettings, IndexResponse, LiveCatalog, MockCatalog, MockResponse,
    SceneResponse, SceneSelection,
};
pub use error::{CatalogError, CatalogResult};
pub use models::{most_recent, Item, SearchParams};

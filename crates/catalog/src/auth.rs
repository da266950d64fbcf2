//! Catalog authentication state.
//!
//! Authentication is lazy and process-wide: the first request that needs the
//! catalog loads the credential artifact. A successful load is kept for the
//! life of the process. A failed load is not remembered, so the next request
//! tries again.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::error::{CatalogError, CatalogResult};

/// Service-account credential artifact.
#[derive(Clone, Deserialize)]
pub struct ServiceAccountCredentials {
    #[serde(rename = "type", default)]
    pub account_type: Option<String>,
    #[serde(default)]
    pub project_id: Option<String>,
    pub client_email: String,
    #[serde(default)]
    pub private_key: Option<String>,
    /// Sent as a bearer token when present.
    #[serde(default)]
    pub access_token: Option<String>,
}

impl fmt::Debug for ServiceAccountCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccountCredentials")
            .field("account_type", &self.account_type)
            .field("project_id", &self.project_id)
            .field("client_email", &self.client_email)
            .field("private_key", &self.private_key.as_ref().map(|_| "<redacted>"))
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl ServiceAccountCredentials {
    /// Parse a credential document. `client_email` must be non-empty.
    pub fn from_json(text: &str, path: &Path) -> CatalogResult<Self> {
        let creds: Self = serde_json::from_str(text).map_err(|e| CatalogError::Credentials {
            path: path.display().to_string(),
            reason: format!("malformed credential file: {}", e),
        })?;
        if creds.client_email.trim().is_empty() {
            return Err(CatalogError::Credentials {
                path: path.display().to_string(),
                reason: "client_email is empty".to_string(),
            });
        }
        Ok(creds)
    }

    pub async fn load(path: &Path) -> CatalogResult<Self> {
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| CatalogError::Credentials {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;
        Self::from_json(&text, path)
    }

    /// The document shape operators must supply, for pending responses.
    pub fn required_format() -> serde_json::Value {
        serde_json::json!({
            "type": "service_account",
            "project_id": "your-project-id",
            "private_key": "your-private-key",
            "client_email": "your-service-account@your-project.iam.gserviceaccount.com"
        })
    }
}

/// Whether the catalog credentials have been loaded.
#[derive(Debug, Clone)]
pub enum AuthState {
    Uninitialized,
    Ready(Arc<ServiceAccountCredentials>),
}

/// Shared authentication context. Clone the `Arc` around it into every
/// request; all of them see the same state.
#[derive(Debug)]
pub struct AuthContext {
    credentials_path: PathBuf,
    state: RwLock<AuthState>,
}

impl AuthContext {
    pub fn new(credentials_path: impl Into<PathBuf>) -> Self {
        Self {
            credentials_path: credentials_path.into(),
            state: RwLock::new(AuthState::Uninitialized),
        }
    }

    pub fn credentials_path(&self) -> &Path {
        &self.credentials_path
    }

    pub async fn state(&self) -> AuthState {
        self.state.read().await.clone()
    }

    pub async fn is_ready(&self) -> bool {
        matches!(*self.state.read().await, AuthState::Ready(_))
    }

    /// Return the loaded credentials, loading them first if needed.
    ///
    /// Concurrent callers load at most once; on failure the state stays
    /// `Uninitialized` and the error is returned.
    pub async fn ensure_initialized(&self) -> CatalogResult<Arc<ServiceAccountCredentials>> {
        if let AuthState::Ready(creds) = &*self.state.read().await {
            return Ok(Arc::clone(creds));
        }

        let mut state = self.state.write().await;
        // Another request may have finished loading while we waited
        if let AuthState::Ready(creds) = &*state {
            return Ok(Arc::clone(creds));
        }

        match ServiceAccountCredentials::load(&self.credentials_path).await {
            Ok(creds) => {
                info!(
                    client_email = %creds.client_email,
                    path = %self.credentials_path.display(),
                    "Catalog credentials loaded"
                );
                let creds = Arc::new(creds);
                *state = AuthState::Ready(Arc::clone(&creds));
                Ok(creds)
            }
            Err(e) => {
                warn!(error = %e, "Catalog credentials unavailable, running in mock mode");
                Err(e)
            }
        }
    }

    /// Attempt initialization again. Returns whether the context is ready.
    pub async fn retry(&self) -> bool {
        self.ensure_initialized().await.is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_fields() {
        let path = Path::new("creds.json");
        let creds =
            ServiceAccountCredentials::from_json(r#"{"client_email": "svc@x.iam"}"#, path).unwrap();
        assert_eq!(creds.client_email, "svc@x.iam");
        assert!(creds.access_token.is_none());

        assert!(ServiceAccountCredentials::from_json(r#"{"project_id": "p"}"#, path).is_err());
        assert!(ServiceAccountCredentials::from_json(r#"{"client_email": "  "}"#, path).is_err());
        assert!(ServiceAccountCredentials::from_json("not json", path).is_err());
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let creds = ServiceAccountCredentials::from_json(
            r#"{"client_email": "a@b", "private_key": "SECRET", "access_token": "TOKEN"}"#,
            Path::new("c.json"),
        )
        .unwrap();
        let debug = format!("{:?}", creds);
        assert!(!debug.contains("SECRET"));
        assert!(!debug.contains("TOKEN"));
        assert!(debug.contains("a@b"));
    }

    #[test]
    fn test_required_format_names_client_email() {
        assert!(ServiceAccountCredentials::required_format()["client_email"].is_string());
    }
}

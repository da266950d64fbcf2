//! Remote file fetcher.
//!
//! Resolves a sharing link to a direct download, then streams the body into
//! a transient file. The payload is never held in memory as a whole.

use std::path::{Path, PathBuf};
use std::time::Duration;

use bytes::Bytes;
use field_common::{AnalysisError, AnalysisResult};
use futures::StreamExt;
use reqwest::{Client, Url};
use tempfile::{NamedTempFile, TempPath};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, instrument};

use crate::config::DownloadSettings;

const TRANSIENT_PREFIX: &str = "field-imagery-";
const TRANSIENT_SUFFIX: &str = ".tif";

/// Rewrite known share-link shapes to their direct-download form.
///
/// - Google Drive `/file/d/{id}/...`, `/open?id={id}` and `/uc?id={id}`
///   become `https://drive.google.com/uc?export=download&id={id}`
/// - Dropbox links get `dl=1`
///
/// Anything else, including unparseable input, is returned unchanged.
pub fn normalize_share_link(link: &str) -> String {
    let link = link.trim();
    let Ok(mut url) = Url::parse(link) else {
        return link.to_string();
    };
    let host = url.host_str().unwrap_or_default().to_ascii_lowercase();

    if host == "drive.google.com" {
        return match drive_file_id(&url) {
            Some(id) => format!("https://drive.google.com/uc?export=download&id={}", id),
            None => link.to_string(),
        };
    }

    if host == "dropbox.com" || host.ends_with(".dropbox.com") {
        let kept: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(k, _)| k != "dl")
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        url.query_pairs_mut()
            .clear()
            .extend_pairs(kept)
            .append_pair("dl", "1");
        return url.to_string();
    }

    link.to_string()
}

fn drive_file_id(url: &Url) -> Option<String> {
    let segments: Vec<&str> = url.path_segments()?.collect();
    if let Some(pos) = segments.windows(2).position(|w| w == ["file", "d"]) {
        return segments
            .get(pos + 2)
            .filter(|id| !id.is_empty())
            .map(|id| id.to_string());
    }
    match segments.last() {
        Some(&"open") | Some(&"uc") => url
            .query_pairs()
            .find(|(k, _)| k == "id")
            .map(|(_, v)| v.into_owned())
            .filter(|id| !id.is_empty()),
        _ => None,
    }
}

/// A downloaded file that is deleted when dropped.
#[derive(Debug)]
pub struct TransientFile {
    path: TempPath,
    bytes: u64,
}

impl TransientFile {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Size of the downloaded payload.
    pub fn bytes(&self) -> u64 {
        self.bytes
    }

    /// Delete the file now, reporting any failure.
    pub fn close(self) -> std::io::Result<()> {
        self.path.close()
    }
}

/// Downloads imagery into request-scoped transient files.
#[derive(Debug, Clone)]
pub struct FileFetcher {
    client: Client,
    transient_dir: Option<PathBuf>,
}

impl FileFetcher {
    pub fn new(settings: &DownloadSettings) -> AnalysisResult<Self> {
        let timeout = settings.timeout();
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout.min(Duration::from_secs(30)))
            .tcp_nodelay(true)
            .build()
            .map_err(|e| AnalysisError::DownloadFailed(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            transient_dir: settings.transient_dir.clone(),
        })
    }

    fn create_transient(&self) -> AnalysisResult<NamedTempFile> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(TRANSIENT_PREFIX).suffix(TRANSIENT_SUFFIX);
        let file = match &self.transient_dir {
            Some(dir) => builder.tempfile_in(dir),
            None => builder.tempfile(),
        };
        file.map_err(|e| AnalysisError::DownloadFailed(format!("Failed to create transient file: {}", e)))
    }

    /// Download `link` into a fresh transient file.
    ///
    /// Network errors, timeouts, non-2xx responses and empty bodies are all
    /// `DownloadFailed`. On failure no file is left behind.
    #[instrument(skip(self, link), fields(url = %link))]
    pub async fn fetch(&self, link: &str) -> AnalysisResult<TransientFile> {
        let url = normalize_share_link(link);
        if url != link.trim() {
            debug!(direct = %url, "Rewrote share link");
        }

        let response = self.client.get(&url).send().await.map_err(transfer_error)?;
        let status = response.status();
        if !status.is_success() {
            return Err(AnalysisError::DownloadFailed(format!(
                "HTTP {} from {}",
                status, url
            )));
        }

        let (file, path) = self.create_transient()?.into_parts();
        let mut file = tokio::fs::File::from_std(file);
        let mut stream = response.bytes_stream();
        let mut bytes = 0u64;

        // `path` is dropped, and the file deleted, on every early return below
        while let Some(chunk) = stream.next().await {
            let chunk: Bytes = chunk.map_err(transfer_error)?;
            file.write_all(&chunk).await.map_err(write_error)?;
            bytes += chunk.len() as u64;
        }
        file.flush().await.map_err(write_error)?;
        file.sync_all().await.map_err(write_error)?;
        drop(file);

        if bytes == 0 {
            return Err(AnalysisError::DownloadFailed(format!(
                "empty response from {}",
                url
            )));
        }

        info!(bytes, path = %path.display(), "Imagery downloaded");
        Ok(TransientFile { path, bytes })
    }
}

fn transfer_error(e: reqwest::Error) -> AnalysisError {
    if e.is_timeout() {
        AnalysisError::DownloadFailed(format!("timed out: {}", e))
    } else {
        AnalysisError::DownloadFailed(e.to_string())
    }
}

fn write_error(e: std::io::Error) -> AnalysisError {
    AnalysisError::DownloadFailed(format!("Failed to write transient file: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drive_file_link() {
        assert_eq!(
            normalize_share_link("https://drive.google.com/file/d/1AbC-xyz_9/view?usp=sharing"),
            "https://drive.google.com/uc?export=download&id=1AbC-xyz_9"
        );
    }

    #[test]
    fn test_drive_open_and_uc_links() {
        assert_eq!(
            normalize_share_link("https://drive.google.com/open?id=XYZ"),
            "https://drive.google.com/uc?export=download&id=XYZ"
        );
        assert_eq!(
            normalize_share_link("https://drive.google.com/uc?id=XYZ&export=view"),
            "https://drive.google.com/uc?export=download&id=XYZ"
        );
    }

    #[test]
    fn test_direct_drive_link_is_stable() {
        let direct = "https://drive.google.com/uc?export=download&id=XYZ";
        assert_eq!(normalize_share_link(direct), direct);
    }

    #[test]
    fn test_drive_folder_unchanged() {
        let folder = "https://drive.google.com/drive/folders/abc";
        assert_eq!(normalize_share_link(folder), folder);
    }

    #[test]
    fn test_dropbox_link() {
        assert_eq!(
            normalize_share_link("https://www.dropbox.com/s/abc123/field.tif?dl=0"),
            "https://www.dropbox.com/s/abc123/field.tif?dl=1"
        );
        assert_eq!(
            normalize_share_link("https://www.dropbox.com/scl/fi/xyz/field.tif?rlkey=k&dl=0"),
            "https://www.dropbox.com/scl/fi/xyz/field.tif?rlkey=k&dl=1"
        );
    }

    #[test]
    fn test_other_links_unchanged() {
        for link in [
            "https://storage.example.com/fields/42.tif",
            "http://127.0.0.1:8080/imagery.tif?token=abc",
            "not a url",
        ] {
            assert_eq!(normalize_share_link(link), link);
        }
        assert_eq!(normalize_share_link("  https://x.org/a.tif "), "https://x.org/a.tif");
    }
}

//! Remote file fetching
//!
//! HTTP(S) downloads go through an async [`DownloadManager`]; the sequential
//! build pipeline reaches it through the blocking [`Fetcher`] trait, which
//! also covers `file://` and `ftp://` locations. Nothing here retries: a
//! failed download surfaces immediately.

use futures::StreamExt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tokio::runtime::Handle;
use tracing::{debug, info};

use crate::config::defaults;
use crate::error::DownloadError;

/// Download result containing file path and size
#[derive(Debug)]
pub struct DownloadResult {
    /// Path to the downloaded file
    pub path: PathBuf,
    /// Size in bytes
    pub size: u64,
}

/// Download manager for fetching files over HTTP(S)
#[derive(Debug, Clone)]
pub struct DownloadManager {
    /// HTTP client
    client: reqwest::Client,
    /// User agent sent with every request
    user_agent: String,
}

impl DownloadManager {
    /// Create a new download manager
    pub fn new(user_agent: &str) -> Self {
        Self::with_read_timeout(user_agent, Duration::from_secs(defaults::READ_TIMEOUT_SECS))
    }

    /// Downloads may take as long as they need but fail once the server stalls
    pub fn with_read_timeout(user_agent: &str, read_timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::builder()
                .read_timeout(read_timeout)
                .connect_timeout(Duration::from_secs(defaults::CONNECT_TIMEOUT_SECS))
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            user_agent: user_agent.to_string(),
        }
    }

    /// User agent for a given URL; sourceforge mirrors only serve files to wget
    fn agent_for(&self, url: &str) -> &str {
        if url.contains("sourceforge.net") {
            defaults::WGET_USER_AGENT
        } else {
            &self.user_agent
        }
    }

    /// Check whether a URL answers with HTTP 200
    pub async fn probe(&self, url: &str) -> bool {
        let response = self
            .client
            .get(url)
            .header(reqwest::header::USER_AGENT, self.agent_for(url))
            .timeout(Duration::from_secs(defaults::PROBE_TIMEOUT_SECS))
            .send()
            .await;

        match response {
            Ok(resp) => {
                debug!(url, status = %resp.status(), "Probed mirror");
                resp.status() == reqwest::StatusCode::OK
            }
            Err(e) => {
                debug!(url, "Mirror probe failed: {e}");
                false
            }
        }
    }

    /// Download a file, removing any partial file on failure
    pub async fn download(&self, url: &str, dest: &Path) -> Result<DownloadResult, DownloadError> {
        let result = self.download_once(url, dest).await;
        if result.is_err() {
            let _ = tokio::fs::remove_file(dest).await;
        }
        result
    }

    async fn download_once(&self, url: &str, dest: &Path) -> Result<DownloadResult, DownloadError> {
        let response = self
            .client
            .get(url)
            .header(reqwest::header::USER_AGENT, self.agent_for(url))
            .send()
            .await
            .map_err(|e| DownloadError::NetworkError {
                url: url.to_string(),
                error: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(DownloadError::NetworkError {
                url: url.to_string(),
                error: format!("HTTP {}", response.status()),
            });
        }

        // Create parent directories if needed
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| DownloadError::IoError {
                    path: parent.to_path_buf(),
                    error: e.to_string(),
                })?;
        }

        let mut file = File::create(dest)
            .await
            .map_err(|e| DownloadError::IoError {
                path: dest.to_path_buf(),
                error: e.to_string(),
            })?;

        let mut downloaded: u64 = 0;
        let mut stream = response.bytes_stream();

        while let Some(chunk_result) = stream.next().await {
            let chunk = chunk_result.map_err(|e| DownloadError::NetworkError {
                url: url.to_string(),
                error: e.to_string(),
            })?;

            file.write_all(&chunk)
                .await
                .map_err(|e| DownloadError::IoError {
                    path: dest.to_path_buf(),
                    error: e.to_string(),
                })?;

            downloaded += chunk.len() as u64;
        }

        file.flush().await.map_err(|e| DownloadError::IoError {
            path: dest.to_path_buf(),
            error: e.to_string(),
        })?;

        Ok(DownloadResult {
            path: dest.to_path_buf(),
            size: downloaded,
        })
    }
}

impl Default for DownloadManager {
    fn default() -> Self {
        Self::new(defaults::DEFAULT_USER_AGENT)
    }
}

/// Blocking access to remote files for the sequential pipeline
pub trait Fetcher: Send + Sync {
    /// Lightweight reachability check used for mirror selection
    fn probe(&self, url: &str) -> bool;

    /// Store the content behind `url` at `dest`
    fn fetch(&self, url: &str, dest: &Path) -> Result<(), DownloadError>;
}

/// Fetcher for `http(s)://`, `file://` and `ftp://` URLs
///
/// HTTP traffic runs on the given tokio runtime; callers must not be on one
/// of its worker threads.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    manager: DownloadManager,
    handle: Handle,
}

impl HttpFetcher {
    /// Create a fetcher driving `manager` on `handle`
    pub fn new(manager: DownloadManager, handle: Handle) -> Self {
        Self { manager, handle }
    }
}

fn local_path(url: &str) -> Option<&Path> {
    url.strip_prefix("file://").map(Path::new)
}

fn is_http(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

impl Fetcher for HttpFetcher {
    fn probe(&self, url: &str) -> bool {
        if let Some(path) = local_path(url) {
            return path.is_file();
        }
        if is_http(url) {
            return self.handle.block_on(self.manager.probe(url));
        }
        // ftp has no cheap probe; let the download decide
        url.starts_with("ftp://")
    }

    fn fetch(&self, url: &str, dest: &Path) -> Result<(), DownloadError> {
        info!("Downloading {url}");
        if let Some(src) = local_path(url) {
            std::fs::copy(src, dest).map_err(|e| DownloadError::IoError {
                path: src.to_path_buf(),
                error: e.to_string(),
            })?;
            return Ok(());
        }
        if is_http(url) {
            self.handle.block_on(self.manager.download(url, dest))?;
            return Ok(());
        }
        if url.starts_with("ftp://") {
            return fetch_with_curl(url, dest);
        }
        Err(DownloadError::UnsupportedScheme {
            url: url.to_string(),
        })
    }
}

fn fetch_with_curl(url: &str, dest: &Path) -> Result<(), DownloadError> {
    let status = std::process::Command::new("curl")
        .args(["-fsSL", "-o"])
        .arg(dest)
        .arg(url)
        .status()
        .map_err(|e| DownloadError::NetworkError {
            url: url.to_string(),
            error: format!("failed to run curl: {e}"),
        })?;

    if status.success() {
        Ok(())
    } else {
        let _ = std::fs::remove_file(dest);
        Err(DownloadError::NetworkError {
            url: url.to_string(),
            error: format!("curl exited with {status}"),
        })
    }
}

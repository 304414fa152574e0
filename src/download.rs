//! Remote fetch backing [`Store::download_file`](crate::Store::download_file).

use std::time::Duration;

use log::debug;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::StoreError;

/// Network settings for remote downloads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// Hard cap on a single download, connection time included. A hung remote
    /// server fails the operation instead of blocking it indefinitely.
    pub timeout_secs: u64,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self { timeout_secs: 30 }
    }
}

/// Fetch `url` and return the response body bytes.
pub(crate) fn fetch(url: &Url, config: &DownloadConfig) -> Result<Vec<u8>, StoreError> {
    let client = Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()
        .map_err(|err| StoreError::runtime(format!("Failed to create HTTP client: {err}")))?;

    let response = client
        .get(url.clone())
        .send()
        .map_err(|err| StoreError::runtime(format!("Downloading {url} failed: {err}")))?;

    let status = response.status();
    if !status.is_success() {
        return Err(StoreError::runtime(format!(
            "Downloading {url} failed with status {status}"
        )));
    }

    let body = response
        .bytes()
        .map_err(|err| StoreError::runtime(format!("Reading the body of {url} failed: {err}")))?;
    debug!("downloaded {} bytes from {}", body.len(), url);
    Ok(body.to_vec())
}

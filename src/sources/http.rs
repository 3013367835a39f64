use reqwest::blocking::Client;
use std::time::Duration;
use tracing::debug;

use super::traits::ArchiveFetcher;
use crate::config::defaults::DEFAULT_DATA_URL;
use crate::config::DownloadConfig;
use crate::errors::{FetchError, FetchResult};

/// Downloads the archive with a single blocking GET.
///
/// The client is built on first use, so constructing a fetcher that is
/// never needed (warm cache) costs nothing.
#[derive(Debug, Clone)]
pub struct HttpArchiveFetcher {
    url: String,
    connect_timeout: Option<Duration>,
}

impl HttpArchiveFetcher {
    /// Fetcher for `url` with no timeout
    pub fn new<U: Into<String>>(url: U) -> Self {
        Self {
            url: url.into(),
            connect_timeout: None,
        }
    }

    /// Fetcher built from the download section of the configuration
    pub fn from_config(config: &DownloadConfig) -> Self {
        Self::new(config.url.clone()).with_connect_timeout(config.connect_timeout)
    }

    /// Bound the time spent establishing the connection; the transfer itself is unbounded
    pub fn with_connect_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn client(&self) -> FetchResult<Client> {
        let mut builder = Client::builder();
        if let Some(timeout) = self.connect_timeout {
            builder = builder.connect_timeout(timeout);
        }
        builder
            .build()
            .map_err(|e| FetchError::fetch(&self.url, format!("failed to create HTTP client: {e}")))
    }
}

impl Default for HttpArchiveFetcher {
    fn default() -> Self {
        Self::new(DEFAULT_DATA_URL)
    }
}

impl ArchiveFetcher for HttpArchiveFetcher {
    fn fetch_archive(&self) -> FetchResult<Vec<u8>> {
        debug!("Fetching archive from: {}", self.url);

        let response = self
            .client()?
            .get(&self.url)
            .send()
            .map_err(|e| FetchError::fetch(&self.url, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::fetch(
                &self.url,
                format!(
                    "HTTP error: {} {}",
                    status.as_u16(),
                    status.canonical_reason().unwrap_or("Unknown")
                ),
            ));
        }

        let bytes = response
            .bytes()
            .map_err(|e| FetchError::fetch(&self.url, format!("failed to read response: {e}")))?;

        debug!("Fetched {} bytes from {}", bytes.len(), self.url);
        Ok(bytes.to_vec())
    }

    fn locator(&self) -> &str {
        &self.url
    }
}

//! Archive download.
//!
//! [`Fetch`] is the seam between provisioning and the network; the
//! production implementation is a blocking `reqwest` client that streams
//! the response body straight into the destination writer.

use std::io::Write;
use std::time::Duration;

use minicontainer_common::constants;
use minicontainer_common::error::{MinicontainerError, Result};

/// Something that can copy the body behind a URL into a writer.
pub trait Fetch {
    /// Streams the resource at `url` into `dest`, returning the byte count.
    ///
    /// # Errors
    ///
    /// Returns [`MinicontainerError::DownloadFailed`] on transport errors
    /// or a non-2xx response status.
    fn fetch(&self, url: &str, dest: &mut dyn Write) -> Result<u64>;
}

/// Blocking HTTP(S) fetcher.
#[derive(Debug)]
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

impl HttpFetcher {
    /// Builds a client with the download timeout from [`constants`].
    ///
    /// # Errors
    ///
    /// Returns [`MinicontainerError::Config`] if the TLS backend cannot be
    /// initialized.
    pub fn new() -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("minicontainer/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(constants::DOWNLOAD_TIMEOUT_SECS))
            .build()
            .map_err(|e| MinicontainerError::Config {
                message: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self { client })
    }
}

impl Fetch for HttpFetcher {
    fn fetch(&self, url: &str, dest: &mut dyn Write) -> Result<u64> {
        let failed = |reason: String| MinicontainerError::DownloadFailed {
            url: url.to_string(),
            reason,
        };

        let mut response = self
            .client
            .get(url)
            .send()
            .map_err(|e| failed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(failed(format!("HTTP {status}")));
        }
        tracing::debug!(url, %status, length = ?response.content_length(), "download started");

        let written = response.copy_to(dest).map_err(|e| failed(e.to_string()))?;
        tracing::info!(url, bytes = written, "download finished");
        Ok(written)
    }
}

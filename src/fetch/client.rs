//! HTTP client wrapper for fetching query responses.
//!
//! This module provides the `HttpClient` struct which performs a single
//! streaming GET and reports progress after every chunk.

use std::time::Duration;

use futures_util::StreamExt;
use reqwest::Client;
use reqwest::header::CONTENT_LENGTH;
use tracing::{debug, info, instrument};
use url::Url;

use super::error::FetchError;
use super::progress::ProgressEvent;
use crate::user_agent;

/// Upper bound on up-front buffer allocation from an advertised length.
const MAX_PREALLOCATION: usize = 64 * 1024 * 1024;

/// HTTP client for fetching response bodies with streaming progress.
///
/// Create once and reuse; the underlying `reqwest` client pools connections.
///
/// # Example
///
/// ```no_run
/// use optical_core::fetch::HttpClient;
/// use url::Url;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = HttpClient::new();
/// let url = Url::parse("https://optica.example.com/roles")?;
/// let body = client.fetch(&url, |event| eprintln!("{} bytes", event.bytes_so_far)).await?;
/// println!("fetched {} bytes", body.len());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpClient {
    /// Creates a client with no connect or read timeout.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client builder fails to build with the static
    /// configuration. This should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn new() -> Self {
        Self::with_timeouts(None, None)
            .expect("failed to build HTTP client with static configuration")
    }

    /// Creates a client with optional connect and overall request timeouts.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Client`] when the TLS backend or builder fails.
    pub fn with_timeouts(
        connect_timeout: Option<Duration>,
        read_timeout: Option<Duration>,
    ) -> Result<Self, FetchError> {
        let mut builder = Client::builder()
            .gzip(true)
            .user_agent(user_agent::default_user_agent());
        if let Some(timeout) = connect_timeout {
            builder = builder.connect_timeout(timeout);
        }
        if let Some(timeout) = read_timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(FetchError::client)?;
        Ok(Self { client })
    }

    /// Fetches `url` and returns the full body.
    ///
    /// `on_progress` is called after every received chunk with the
    /// cumulative byte count. The body is only returned once complete; a
    /// dropped future leaves nothing behind.
    ///
    /// # Errors
    ///
    /// Returns `FetchError` if:
    /// - The scheme is not http or https
    /// - The request fails (network error, timeout)
    /// - The server returns a non-2xx status
    /// - The body stream breaks before completion
    #[instrument(skip(self, url, on_progress), fields(url = %url))]
    pub async fn fetch<P>(&self, url: &Url, mut on_progress: P) -> Result<Vec<u8>, FetchError>
    where
        P: FnMut(ProgressEvent),
    {
        match url.scheme() {
            "http" | "https" => {}
            other => return Err(FetchError::unsupported_scheme(url.as_str(), other)),
        }

        debug!("sending GET");
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| FetchError::from_request(url.as_str(), e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::http_status(url.as_str(), status.as_u16()));
        }

        let total_bytes = content_length(&response);
        debug!(?total_bytes, "response headers received");

        let capacity = total_bytes
            .and_then(|total| usize::try_from(total).ok())
            .map_or(0, |total| total.min(MAX_PREALLOCATION));
        let mut body = Vec::with_capacity(capacity);

        let mut stream = response.bytes_stream();
        while let Some(chunk_result) = stream.next().await {
            let chunk = chunk_result.map_err(|e| FetchError::from_body(url.as_str(), e))?;
            body.extend_from_slice(&chunk);
            on_progress(ProgressEvent::new(body.len() as u64, total_bytes));
        }

        info!(bytes = body.len(), "fetch complete");
        Ok(body)
    }

    /// Returns a reference to the underlying reqwest client.
    #[must_use]
    pub fn inner(&self) -> &Client {
        &self.client
    }
}

/// Reads `Content-Length` from the headers.
///
/// Decompressed responses drop the header, so the total is unknown for them.
fn content_length(response: &reqwest::Response) -> Option<u64> {
    response
        .headers()
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok())
}

//! [`reqwest`]-backed implementation of [`Transport`].

use alloc::string::ToString;
use core::time::Duration;

use futures::{FutureExt, future::BoxFuture};

use super::{PollResponse, Transport};

/// The request failed before any status was received.
#[derive(Debug, thiserror::Error)]
#[error("HTTP request failed: {0}")]
pub struct ReqwestTransportError(#[from] reqwest::Error);

/// A [`reqwest`]-backed [`Transport`].
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    inner: reqwest::Client,
}

impl ReqwestTransport {
    /// Create a transport with default client settings (no request timeout).
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: reqwest::Client::new(),
        }
    }

    /// Create a transport whose requests give up after `timeout`.
    ///
    /// Pick a value longer than the server's hold time, or held polls
    /// surface as transport failures.
    #[must_use]
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            inner: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
        }
    }
}

impl Default for ReqwestTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for ReqwestTransport {
    type Error = ReqwestTransportError;

    fn get(&self, url: &str) -> BoxFuture<'_, Result<PollResponse, Self::Error>> {
        let request = self.inner.get(url);

        async move {
            let resp = request.send().await?;
            let status = resp.status();
            let status_text = status.canonical_reason().unwrap_or_default().to_string();

            let body = if status.as_u16() == crate::SUCCESS_STATUS {
                resp.bytes().await?.to_vec()
            } else {
                Vec::new()
            };

            Ok(PollResponse {
                status: status.as_u16(),
                status_text,
                body,
            })
        }
        .boxed()
    }
}

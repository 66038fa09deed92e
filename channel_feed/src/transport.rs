//! Transport abstraction for issuing long-poll requests.
//!
//! The poll loop only needs a status code, a status text, and the body of
//! a `GET`. How the request travels (TLS, pooling, proxies) is up to the
//! implementation.

#[cfg(feature = "reqwest")]
#[cfg_attr(docsrs, doc(cfg(feature = "reqwest")))]
mod reqwest_transport;

#[cfg(feature = "reqwest")]
pub use reqwest_transport::{ReqwestTransport, ReqwestTransportError};

use alloc::{format, string::String, vec::Vec};

use futures::future::BoxFuture;

use crate::channel::{ChannelId, Cursor};

/// A minimal async HTTP client for long-poll `GET` requests.
pub trait Transport: Clone {
    /// The error type for requests that produce no response at all.
    type Error: core::error::Error + Send + 'static;

    /// Issue a `GET` and resolve once the server answers.
    fn get(&self, url: &str) -> BoxFuture<'_, Result<PollResponse, Self::Error>>;
}

/// What the poll loop sees of an HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollResponse {
    /// The HTTP status code.
    pub status: u16,

    /// The reason phrase shown to the user on application errors.
    pub status_text: String,

    /// The response body. Only read for `200` responses.
    pub body: Vec<u8>,
}

impl PollResponse {
    /// A `200` response carrying `body`.
    #[must_use]
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        Self {
            status: crate::SUCCESS_STATUS,
            status_text: String::from("OK"),
            body: body.into(),
        }
    }

    /// A body-less response with the given status.
    #[must_use]
    pub fn status(status: u16, status_text: impl Into<String>) -> Self {
        Self {
            status,
            status_text: status_text.into(),
            body: Vec::new(),
        }
    }
}

/// Build `{base}/subscribe/{channel}?version={cursor}`.
///
/// The channel and cursor are embedded as-is.
#[must_use]
pub fn subscribe_url(base_url: &str, channel: &ChannelId, cursor: &Cursor) -> String {
    format!(
        "{}/subscribe/{channel}?version={cursor}",
        base_url.trim_end_matches('/')
    )
}

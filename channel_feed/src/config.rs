//! Configuration for a [`PollLoop`](crate::PollLoop).

use alloc::string::String;

use crate::{
    DEFAULT_CHILD_ID, DEFAULT_CONTAINER_ID,
    channel::{ChannelId, Cursor},
    policy::{FailurePolicy, RetryDelay},
    transport::subscribe_url,
};

/// Default server base URL.
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8080";

/// Everything about a poll loop that is not a collaborator.
#[derive(Debug, Clone, PartialEq)]
pub struct PollConfig {
    /// Server origin the `/subscribe` path is appended to.
    pub base_url: String,

    /// Id of the container holding the rendered feed.
    pub container_id: String,

    /// Id of the child replaced on every update.
    pub child_id: String,

    /// Wait applied before re-polling after a failure.
    pub retry_delay: RetryDelay,

    /// Handling of `200` responses with an unusable body.
    pub on_malformed: FailurePolicy,

    /// Handling of requests that produced no response.
    pub on_transport_failure: FailurePolicy,
}

impl PollConfig {
    /// Configuration for the server at `base_url`, defaults elsewhere.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Set the render target ids.
    #[must_use]
    pub fn with_target(mut self, container_id: impl Into<String>, child_id: impl Into<String>) -> Self {
        self.container_id = container_id.into();
        self.child_id = child_id.into();
        self
    }

    /// Set the retry delay.
    #[must_use]
    pub const fn with_retry_delay(mut self, retry_delay: RetryDelay) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    /// Set the malformed payload policy.
    #[must_use]
    pub const fn on_malformed(mut self, policy: FailurePolicy) -> Self {
        self.on_malformed = policy;
        self
    }

    /// Set the transport failure policy.
    #[must_use]
    pub const fn on_transport_failure(mut self, policy: FailurePolicy) -> Self {
        self.on_transport_failure = policy;
        self
    }

    /// The request URL for `(channel, cursor)`.
    #[must_use]
    pub fn subscribe_url(&self, channel: &ChannelId, cursor: &Cursor) -> String {
        subscribe_url(&self.base_url, channel, cursor)
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            base_url: String::from(DEFAULT_BASE_URL),
            container_id: String::from(DEFAULT_CONTAINER_ID),
            child_id: String::from(DEFAULT_CHILD_ID),
            retry_delay: RetryDelay::default(),
            on_malformed: FailurePolicy::NotifyAndRetry,
            on_transport_failure: FailurePolicy::RetryQuietly,
        }
    }
}

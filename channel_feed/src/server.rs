//! Subscribe endpoint for serving a channel feed.
//!
//! Provides an Axum router answering `GET /subscribe/{channel}?version=`
//! from an in-memory [`ChannelHub`]. A request is held until the channel
//! moves past the requested version. When the hold expires the handler
//! answers `502`, the same status an intermediary produces when it closes
//! a long-held request.

mod handlers;
mod hub;

pub use handlers::router;
pub use hub::{ChannelHub, Update, WaitError};

use core::time::Duration;

/// Default time a subscribe request is held before answering `502` (30 seconds).
pub const DEFAULT_POLL_TIMEOUT_SECS: u64 = 30;

/// Builder for the subscribe router.
#[derive(Debug, Clone)]
pub struct SubscribeServerBuilder {
    hub: ChannelHub,
    poll_timeout: Duration,
}

impl SubscribeServerBuilder {
    /// Serve the channels in `hub`.
    #[must_use]
    pub const fn new(hub: ChannelHub) -> Self {
        Self {
            hub,
            poll_timeout: Duration::from_secs(DEFAULT_POLL_TIMEOUT_SECS),
        }
    }

    /// Set how long a request is held waiting for a new version.
    #[must_use]
    pub const fn poll_timeout(mut self, timeout: Duration) -> Self {
        self.poll_timeout = timeout;
        self
    }

    /// Create the Axum router.
    pub fn into_router(self) -> axum::Router {
        router(self.hub, self.poll_timeout)
    }
}

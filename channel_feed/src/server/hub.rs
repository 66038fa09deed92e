//! In-memory channel state with "wait for the next version" semantics.

use alloc::{collections::BTreeMap, string::String, sync::Arc};
use core::{fmt::Write, time::Duration};

use async_lock::RwLock;
use thiserror::Error;
use tokio::sync::watch;

use crate::channel::{ChannelId, Cursor};

/// The latest state of a channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Update {
    /// Version of this state.
    pub version: Cursor,

    /// Markup describing the channel at this version.
    pub fragment: String,
}

/// Why [`ChannelHub::wait_next`] returned without an update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum WaitError {
    /// No channel with that id.
    #[error("unknown channel")]
    UnknownChannel,

    /// Nothing new was published within the hold time.
    #[error("no new version within the poll timeout")]
    TimedOut,
}

/// Thread-safe map from channel id to its latest [`Update`].
#[derive(Debug, Clone, Default)]
pub struct ChannelHub {
    channels: Arc<RwLock<BTreeMap<ChannelId, watch::Sender<Update>>>>,
}

impl ChannelHub {
    /// Create an empty hub.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create `channel` (or reset it) with an initial fragment.
    ///
    /// Returns the channel's first version.
    pub async fn create(&self, channel: ChannelId, fragment: impl Into<String>) -> Cursor {
        let update = Update {
            version: fresh_version(),
            fragment: fragment.into(),
        };
        let version = update.version.clone();

        let mut channels = self.channels.write().await;
        if let Some(tx) = channels.get(&channel) {
            tx.send_replace(update);
        } else {
            tracing::info!(channel = %channel, "created channel");
            channels.insert(channel, watch::Sender::new(update));
        }

        version
    }

    /// Publish a new state of `channel`, waking every held request.
    ///
    /// Returns the new version, or `None` if the channel does not exist.
    pub async fn publish(&self, channel: &ChannelId, fragment: impl Into<String>) -> Option<Cursor> {
        let channels = self.channels.read().await;
        let tx = channels.get(channel)?;

        let version = fresh_version();
        tx.send_replace(Update {
            version: version.clone(),
            fragment: fragment.into(),
        });
        tracing::debug!(channel = %channel, version = %version, "published update");

        Some(version)
    }

    /// The latest state of `channel`.
    pub async fn current(&self, channel: &ChannelId) -> Option<Update> {
        self.channels
            .read()
            .await
            .get(channel)
            .map(|tx| tx.borrow().clone())
    }

    /// Wait until `channel` has a version other than `cursor`.
    ///
    /// Returns at once if the channel has already moved on (including
    /// when `cursor` is empty or unknown to the server).
    ///
    /// # Errors
    ///
    /// Returns [`WaitError::UnknownChannel`] if the channel does not
    /// exist and [`WaitError::TimedOut`] if nothing was published within
    /// `timeout`.
    pub async fn wait_next(
        &self,
        channel: &ChannelId,
        cursor: &Cursor,
        timeout: Duration,
    ) -> Result<Update, WaitError> {
        let mut rx = self
            .channels
            .read()
            .await
            .get(channel)
            .map(watch::Sender::subscribe)
            .ok_or(WaitError::UnknownChannel)?;

        let latest = rx.borrow_and_update().clone();
        if latest.version != *cursor {
            return Ok(latest);
        }

        match tokio::time::timeout(timeout, rx.changed()).await {
            Ok(Ok(())) => Ok(rx.borrow_and_update().clone()),
            Ok(Err(_)) => Err(WaitError::UnknownChannel),
            Err(_) => Err(WaitError::TimedOut),
        }
    }
}

/// A random 128-bit version rendered as 32 hex characters.
fn fresh_version() -> Cursor {
    let bytes: [u8; 16] = rand::random();
    let mut hex = String::with_capacity(32);
    for byte in bytes {
        let _ = write!(hex, "{byte:02x}");
    }
    Cursor::new(hex)
}

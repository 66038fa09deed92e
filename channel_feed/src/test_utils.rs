//! Test utilities for driving a [`PollLoop`](crate::PollLoop) without a network or UI.
//!
//! - [`ScriptedTransport`] answers requests from a fixed script and records
//!   every URL it was asked for, with the (virtual) time of the request
//! - [`RecordingSink`] keeps every replacement it receives
//! - [`RecordingNotifier`] keeps every notification it receives
//!
//! All three are cheap to clone; clones share their recordings.

use alloc::{collections::VecDeque, string::String, sync::Arc, vec::Vec};
use std::sync::{Mutex, MutexGuard, PoisonError};

use futures::{FutureExt, future::BoxFuture};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::{
    fragment::Renderable,
    sink::{Notifier, RenderSink},
    transport::{PollResponse, Transport},
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// One scripted answer.
#[derive(Debug, Clone)]
pub enum Scripted {
    /// Resolve with this response.
    Respond(PollResponse),

    /// Fail as if the network were unreachable.
    Fail(String),
}

/// A request seen by a [`ScriptedTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    /// The full request URL.
    pub url: String,

    /// When the request was issued.
    pub at: Instant,
}

/// Error produced by [`Scripted::Fail`].
#[derive(Debug, Clone, thiserror::Error)]
#[error("{0}")]
pub struct ScriptedError(pub String);

#[derive(Debug, Default)]
struct ScriptState {
    script: VecDeque<Scripted>,
    requests: Vec<RecordedRequest>,
    on_exhausted: Option<CancellationToken>,
}

/// A [`Transport`] that plays back a script.
///
/// Once the script runs out, requests stay pending forever. Use
/// [`cancel_when_exhausted`](Self::cancel_when_exhausted) to stop the
/// loop at that point.
#[derive(Debug, Clone, Default)]
pub struct ScriptedTransport {
    state: Arc<Mutex<ScriptState>>,
}

impl ScriptedTransport {
    /// Create a transport that answers with `script`, in order.
    #[must_use]
    pub fn new(script: impl IntoIterator<Item = Scripted>) -> Self {
        Self {
            state: Arc::new(Mutex::new(ScriptState {
                script: script.into_iter().collect(),
                ..ScriptState::default()
            })),
        }
    }

    /// Cancel `token` when a request arrives after the script ran out.
    ///
    /// That request is still recorded.
    #[must_use]
    pub fn cancel_when_exhausted(self, token: CancellationToken) -> Self {
        lock(&self.state).on_exhausted = Some(token);
        self
    }

    /// Every request seen so far.
    #[must_use]
    pub fn requests(&self) -> Vec<RecordedRequest> {
        lock(&self.state).requests.clone()
    }

    /// The URLs of every request seen so far.
    #[must_use]
    pub fn urls(&self) -> Vec<String> {
        lock(&self.state)
            .requests
            .iter()
            .map(|r| r.url.clone())
            .collect()
    }
}

impl Transport for ScriptedTransport {
    type Error = ScriptedError;

    fn get(&self, url: &str) -> BoxFuture<'_, Result<PollResponse, Self::Error>> {
        let next = {
            let mut state = lock(&self.state);
            state.requests.push(RecordedRequest {
                url: url.into(),
                at: Instant::now(),
            });

            let next = state.script.pop_front();
            if next.is_none()
                && let Some(token) = &state.on_exhausted
            {
                token.cancel();
            }
            next
        };

        async move {
            match next {
                Some(Scripted::Respond(response)) => Ok(response),
                Some(Scripted::Fail(reason)) => Err(ScriptedError(reason)),
                None => futures::future::pending().await,
            }
        }
        .boxed()
    }
}

/// A replacement received by a [`RecordingSink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Replacement {
    /// The container addressed.
    pub container_id: String,

    /// The child replaced.
    pub child_id: String,

    /// The unit substituted in.
    pub unit: Renderable,
}

/// A [`RenderSink`] that records every replacement.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    replacements: Arc<Mutex<Vec<Replacement>>>,
}

impl RecordingSink {
    /// Every replacement so far, oldest first.
    #[must_use]
    pub fn replacements(&self) -> Vec<Replacement> {
        lock(&self.replacements).clone()
    }

    /// What the render target currently shows.
    #[must_use]
    pub fn current(&self) -> Option<Renderable> {
        lock(&self.replacements).last().map(|r| r.unit.clone())
    }
}

impl RenderSink for RecordingSink {
    fn replace(&mut self, container_id: &str, old_child_id: &str, unit: Renderable) {
        lock(&self.replacements).push(Replacement {
            container_id: container_id.into(),
            child_id: old_child_id.into(),
            unit,
        });
    }
}

/// A notification received by a [`RecordingNotifier`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    /// The text shown.
    pub message: String,

    /// When it was shown.
    pub at: Instant,
}

/// A [`Notifier`] that records every message.
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    notifications: Arc<Mutex<Vec<Notification>>>,
}

impl RecordingNotifier {
    /// Every notification so far.
    #[must_use]
    pub fn notifications(&self) -> Vec<Notification> {
        lock(&self.notifications).clone()
    }

    /// The text of every notification so far.
    #[must_use]
    pub fn messages(&self) -> Vec<String> {
        lock(&self.notifications)
            .iter()
            .map(|n| n.message.clone())
            .collect()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&mut self, message: &str) {
        lock(&self.notifications).push(Notification {
            message: message.into(),
            at: Instant::now(),
        });
    }
}

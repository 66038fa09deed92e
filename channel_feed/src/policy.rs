//! Recovery policies for failed polls.
//!
//! Timeouts always re-poll immediately and application errors always
//! notify and retry. The two failure kinds the wire protocol leaves open
//! (unparsable updates and requests that never got a response) are
//! configurable with [`FailurePolicy`].

use core::time::Duration;

use crate::backoff::Backoff;

/// What to do after a malformed payload or transport failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailurePolicy {
    /// Show a notification, wait the retry delay, re-poll the same cursor.
    NotifyAndRetry,

    /// Log only, wait the retry delay, re-poll the same cursor.
    RetryQuietly,

    /// Log, then poll from the update's own cursor without rendering it.
    ///
    /// Only an update whose cursor could be read can be skipped; any other
    /// failure is retried quietly.
    Skip,

    /// Stop the loop and return the failure to the caller.
    Halt,
}

/// How long to wait before re-polling after a failure.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RetryDelay {
    /// The same delay every time.
    Fixed(Duration),

    /// Growing delays, reset by the next Success or Timeout.
    Backoff(Backoff),
}

impl RetryDelay {
    /// Delay for the failure that just happened.
    #[must_use]
    pub fn next_delay(&mut self) -> Duration {
        match self {
            Self::Fixed(delay) => *delay,
            Self::Backoff(backoff) => backoff.next_delay(),
        }
    }

    /// Forget past failures after a healthy poll.
    pub const fn reset(&mut self) {
        if let Self::Backoff(backoff) = self {
            backoff.reset();
        }
    }
}

impl Default for RetryDelay {
    fn default() -> Self {
        Self::Fixed(Duration::from_millis(crate::DEFAULT_RETRY_DELAY_MS))
    }
}

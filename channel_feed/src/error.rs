//! Error types for the channel feed.

use alloc::string::String;

use thiserror::Error;

/// A `200` response whose body is not a usable `{cursor}\n{fragment}` envelope.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnvelopeError {
    /// The body is not valid UTF-8.
    #[error("update body is not valid UTF-8")]
    InvalidUtf8,

    /// No newline separates the cursor from the fragment.
    #[error("update body has no newline after the cursor")]
    MissingNewline,

    /// The text before the first newline is empty.
    #[error("update body carries an empty cursor")]
    EmptyCursor,

    /// The fragment could not be turned into a renderable unit.
    #[error("update fragment: {0}")]
    Fragment(#[from] FragmentError),
}

/// Problem converting a markup fragment into a [`Renderable`](crate::fragment::Renderable).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FragmentError {
    /// Nothing but whitespace.
    #[error("fragment is empty")]
    Empty,

    /// The first element is never closed.
    #[error("fragment has an unterminated element")]
    Unbalanced,
}

/// Reasons the poll loop stops on its own.
///
/// Only raised when the corresponding [`FailurePolicy`](crate::policy::FailurePolicy)
/// is `Halt`; otherwise every failure is retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PollLoopError {
    /// The server delivered an update that could not be parsed.
    #[error("malformed update payload: {0}")]
    MalformedPayload(EnvelopeError),

    /// The request never produced a response.
    #[error("transport failure: {0}")]
    TransportFailure(String),
}

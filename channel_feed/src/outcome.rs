//! Classification of a single long-poll attempt.

use alloc::{
    format,
    string::{String, ToString},
};

use crate::{
    SUCCESS_STATUS, TIMEOUT_STATUS, channel::Cursor, envelope::Envelope, error::EnvelopeError,
    fragment::Renderable, transport::PollResponse,
};

/// What one long-poll request produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// A new version was delivered, with the unit to render before advancing.
    Success(Envelope, Renderable),

    /// The held request was closed by an intermediary (`502`).
    Timeout,

    /// Any status other than `200` or `502`.
    ApplicationError {
        /// The HTTP status code.
        status: u16,

        /// The reason phrase to show the user.
        status_text: String,
    },

    /// A `200` whose body could not be used.
    MalformedPayload {
        /// Why the body was rejected.
        error: EnvelopeError,

        /// The cursor from the envelope, when only the fragment was unusable.
        cursor: Option<Cursor>,
    },

    /// No response was received at all.
    TransportFailure(String),
}

impl PollOutcome {
    /// Classify the result of a transport call.
    pub fn classify<E: core::error::Error>(result: Result<PollResponse, E>) -> Self {
        match result {
            Ok(response) => Self::from_response(response),
            Err(e) => Self::TransportFailure(e.to_string()),
        }
    }

    /// Classify a response by status code, parsing the body of a `200`.
    #[must_use]
    pub fn from_response(response: PollResponse) -> Self {
        match response.status {
            TIMEOUT_STATUS => Self::Timeout,
            SUCCESS_STATUS => parse_update(&response.body),
            status => Self::ApplicationError {
                status,
                status_text: response.status_text,
            },
        }
    }

}

fn parse_update(body: &[u8]) -> PollOutcome {
    let envelope = match Envelope::parse(body) {
        Ok(envelope) => envelope,
        Err(error) => return PollOutcome::MalformedPayload { error, cursor: None },
    };

    match Renderable::from_fragment(&envelope.fragment) {
        Ok(unit) => PollOutcome::Success(envelope, unit),
        Err(e) => PollOutcome::MalformedPayload {
            error: e.into(),
            cursor: Some(envelope.cursor),
        },
    }
}

/// Text shown to the user for an application error.
///
/// Falls back to the numeric status when the reason phrase is empty.
#[must_use]
pub fn notification_text(status: u16, status_text: &str) -> String {
    if status_text.is_empty() {
        format!("HTTP {status}")
    } else {
        status_text.to_string()
    }
}

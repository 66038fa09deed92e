//! The body of a delivered update: `{cursor}\n{fragment}`.
//!
//! The new cursor is everything before the first newline; the fragment is
//! everything after it, newlines included.

use alloc::string::{String, ToString};

use crate::{channel::Cursor, error::EnvelopeError};

/// A parsed update body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    /// Version the client moves to once the fragment is rendered.
    pub cursor: Cursor,

    /// Raw markup, untrimmed.
    pub fragment: String,
}

impl Envelope {
    /// Split a `200` response body into cursor and fragment.
    ///
    /// A single `\r` before the first newline is dropped from the cursor.
    ///
    /// # Errors
    ///
    /// Returns [`EnvelopeError`] if the body is not UTF-8, has no newline,
    /// or has nothing before the newline.
    pub fn parse(body: &[u8]) -> Result<Self, EnvelopeError> {
        let text = core::str::from_utf8(body).map_err(|_| EnvelopeError::InvalidUtf8)?;
        let (cursor, fragment) = text
            .split_once('\n')
            .ok_or(EnvelopeError::MissingNewline)?;

        let cursor = cursor.strip_suffix('\r').unwrap_or(cursor);
        if cursor.is_empty() {
            return Err(EnvelopeError::EmptyCursor);
        }

        Ok(Self {
            cursor: Cursor::new(cursor),
            fragment: fragment.to_string(),
        })
    }

    /// Encode an update body as the server sends it.
    #[must_use]
    pub fn encode(cursor: &Cursor, fragment: &str) -> String {
        let mut body = String::with_capacity(cursor.as_str().len() + 1 + fragment.len());
        body.push_str(cursor.as_str());
        body.push('\n');
        body.push_str(fragment);
        body
    }
}

//! Channel identity and version cursor.
//!
//! Both are opaque, server-defined strings. The client never interprets
//! them beyond threading them into the next request.

use alloc::string::String;
use core::fmt;

/// Identifier of the logical stream being polled.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ChannelId(String);

impl ChannelId {
    /// Wrap a server-defined channel identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The identifier as sent on the wire.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ChannelId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ChannelId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// The last version of a channel the client has seen.
///
/// The empty cursor asks for the current state or the first available
/// update.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Cursor(String);

impl Cursor {
    /// Wrap a server-defined version token.
    #[must_use]
    pub fn new(version: impl Into<String>) -> Self {
        Self(version.into())
    }

    /// The empty cursor used before any update has been seen.
    #[must_use]
    pub const fn initial() -> Self {
        Self(String::new())
    }

    /// Whether this is the empty, pre-first-update cursor.
    #[must_use]
    pub fn is_initial(&self) -> bool {
        self.0.is_empty()
    }

    /// The version token as sent on the wire.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Cursor {
    fn from(version: &str) -> Self {
        Self::new(version)
    }
}

impl From<String> for Cursor {
    fn from(version: String) -> Self {
        Self(version)
    }
}

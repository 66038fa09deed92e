//! # Channel Feed
//!
//! Client-side long-polling for a single logical channel.
//!
//! The [`PollLoop`] repeatedly asks a server for the next update after a
//! version cursor, renders each update into a sink, and decides how to
//! reconnect after every outcome:
//!
//! ```text
//!  ┌───────────┐  GET /subscribe/{id}?version={cursor}  ┌──────────┐
//!  │ PollLoop  │ ─────────────────────────────────────► │  Server  │
//!  │           │          ... (held open) ...           │          │
//!  │           │ ◄───────────────────────────────────── │          │
//!  └─────┬─────┘  200 "{cursor}\n{fragment}"            └──────────┘
//!        │        502 → re-poll now, same cursor
//!        │        other → notify, wait, same cursor
//!        ▼
//!  ┌───────────┐
//!  │RenderSink │  replace(container, child, unit)
//!  └───────────┘
//! ```
//!
//! ## Features
//!
//! - `reqwest`: [`transport::ReqwestTransport`] (enabled by default)
//! - `server`: an [`axum`] subscribe endpoint backed by an in-memory hub
//! - `test_utils`: scripted transport and recording collaborators

#![cfg_attr(docsrs, feature(doc_cfg))]

extern crate alloc;

pub mod backoff;
pub mod channel;
pub mod config;
pub mod envelope;
pub mod error;
pub mod fragment;
pub mod outcome;
pub mod poll_loop;
pub mod policy;
pub mod sink;
pub mod transport;

#[cfg(feature = "server")]
#[cfg_attr(docsrs, doc(cfg(feature = "server")))]
pub mod server;

#[cfg(any(test, feature = "test_utils"))]
pub mod test_utils;

pub use channel::{ChannelId, Cursor};
pub use config::PollConfig;
pub use poll_loop::PollLoop;

/// Status code an intermediary uses when it closes a held poll.
///
/// Not an error: the client re-polls immediately with the same cursor.
pub const TIMEOUT_STATUS: u16 = 502;

/// Status code of a delivered update.
pub const SUCCESS_STATUS: u16 = 200;

/// Default delay before retrying after a failed poll (1 second).
pub const DEFAULT_RETRY_DELAY_MS: u64 = 1000;

/// Default id of the container that holds the rendered feed.
pub const DEFAULT_CONTAINER_ID: &str = "channel";

/// Default id of the child node replaced on every update.
pub const DEFAULT_CHILD_ID: &str = "chanevents";

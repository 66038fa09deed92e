//! HTTP request handlers for the subscribe endpoint.

use alloc::string::String;
use core::time::Duration;
use std::collections::HashMap;

use axum::{
    Router,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use tracing::{debug, warn};

use super::hub::{ChannelHub, WaitError};
use crate::{
    channel::{ChannelId, Cursor},
    envelope::Envelope,
};

#[derive(Debug, Clone)]
struct SubscribeState {
    hub: ChannelHub,
    poll_timeout: Duration,
}

/// Create the Axum router for `GET /subscribe/{channel}`.
pub fn router(hub: ChannelHub, poll_timeout: Duration) -> Router {
    Router::new()
        .route("/subscribe/{channel}", get(handle_subscribe))
        .with_state(SubscribeState { hub, poll_timeout })
}

/// Hold the request until the channel moves past `version`.
async fn handle_subscribe(
    State(state): State<SubscribeState>,
    Path(channel): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let channel = ChannelId::from(channel);
    let cursor = params.get("version").map_or_else(Cursor::initial, |v| Cursor::new(v.as_str()));

    debug!(channel = %channel, cursor = %cursor, "holding subscribe request");

    match state
        .hub
        .wait_next(&channel, &cursor, state.poll_timeout)
        .await
    {
        Ok(update) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            Envelope::encode(&update.version, &update.fragment),
        )
            .into_response(),
        Err(WaitError::TimedOut) => {
            debug!(channel = %channel, "subscribe hold expired");
            StatusCode::BAD_GATEWAY.into_response()
        }
        Err(WaitError::UnknownChannel) => {
            warn!(channel = %channel, "subscribe to unknown channel");
            StatusCode::NOT_FOUND.into_response()
        }
    }
}

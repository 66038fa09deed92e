//! Host a single channel fed from stdin.

use std::{net::SocketAddr, time::Duration};

use anyhow::Result;
use channel_feed::{
    ChannelId,
    server::{ChannelHub, DEFAULT_POLL_TIMEOUT_SECS, SubscribeServerBuilder},
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;

use crate::terminal::escape_markup;

/// Arguments for the serve command.
#[derive(Debug, clap::Parser)]
pub(crate) struct ServeArgs {
    /// Socket address to bind to
    #[arg(short, long, default_value = "0.0.0.0:8080")]
    pub(crate) socket: SocketAddr,

    /// Channel identifier to host
    #[arg(short, long, default_value = "lobby")]
    pub(crate) channel: String,

    /// Seconds a subscribe request is held before answering 502
    #[arg(long, default_value_t = DEFAULT_POLL_TIMEOUT_SECS)]
    pub(crate) poll_timeout_secs: u64,
}

/// Wrap one line of text as the replaceable child.
fn line_fragment(line: &str) -> String {
    format!(
        "<div id=\"{}\">{}</div>",
        channel_feed::DEFAULT_CHILD_ID,
        escape_markup(line)
    )
}

/// Serve the channel until cancelled or stdin closes.
pub(crate) async fn run(args: ServeArgs, token: CancellationToken) -> Result<()> {
    let hub = ChannelHub::new();
    let channel = ChannelId::new(args.channel);
    let version = hub.create(channel.clone(), line_fragment("")).await;
    tracing::info!("Channel {} created at version {}", channel, version);

    let router = SubscribeServerBuilder::new(hub.clone())
        .poll_timeout(Duration::from_secs(args.poll_timeout_secs))
        .into_router();

    let listener = tokio::net::TcpListener::bind(args.socket).await?;
    tracing::info!("Serving /subscribe on {}", listener.local_addr()?);

    let server_token = token.clone();
    let server = tokio::spawn(async move {
        axum::serve(listener, router)
            .with_graceful_shutdown(async move { server_token.cancelled().await })
            .await
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            () = token.cancelled() => break,
            line = lines.next_line() => match line? {
                Some(line) => {
                    if let Some(version) = hub.publish(&channel, line_fragment(&line)).await {
                        tracing::info!("Published version {}", version);
                    }
                }
                None => {
                    tracing::info!("stdin closed, waiting for Ctrl+C");
                    token.cancelled().await;
                    break;
                }
            },
        }
    }

    server.await??;
    Ok(())
}

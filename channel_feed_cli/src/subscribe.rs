//! Follow a channel from a remote server.

use std::time::Duration;

use anyhow::Result;
use channel_feed::{
    ChannelId, Cursor, PollConfig, PollLoop,
    backoff::Backoff,
    policy::{FailurePolicy, RetryDelay},
    transport::ReqwestTransport,
};
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::terminal::{StderrNotifier, TerminalSink};

/// Arguments for the subscribe command.
#[derive(Debug, clap::Parser)]
pub(crate) struct SubscribeArgs {
    /// Server base URL
    #[arg(short, long, default_value = channel_feed::config::DEFAULT_BASE_URL)]
    pub(crate) server: Url,

    /// Channel identifier
    pub(crate) channel: String,

    /// Version cursor to start from (empty asks for the current state)
    #[arg(short, long, default_value = "")]
    pub(crate) cursor: String,

    /// Delay before retrying a failed poll, in milliseconds
    #[arg(long, default_value_t = channel_feed::DEFAULT_RETRY_DELAY_MS)]
    pub(crate) retry_delay_ms: u64,

    /// Grow the retry delay exponentially instead of keeping it fixed
    #[arg(long, default_value_t = false)]
    pub(crate) backoff: bool,

    /// Give up on a single request after this many seconds
    #[arg(long, default_value = "60")]
    pub(crate) request_timeout_secs: u64,

    /// What to do when an update cannot be parsed
    #[arg(long, value_enum, default_value_t = PolicyArg::Notify)]
    pub(crate) on_malformed: PolicyArg,

    /// What to do when the server cannot be reached
    #[arg(long, value_enum, default_value_t = PolicyArg::Quiet)]
    pub(crate) on_transport_failure: PolicyArg,
}

/// Command-line spelling of [`FailurePolicy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub(crate) enum PolicyArg {
    /// Notify, then retry after the delay
    Notify,
    /// Retry after the delay without notifying
    Quiet,
    /// Move past an update whose cursor is readable, without rendering it
    Skip,
    /// Stop with an error
    Halt,
}

impl From<PolicyArg> for FailurePolicy {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::Notify => Self::NotifyAndRetry,
            PolicyArg::Quiet => Self::RetryQuietly,
            PolicyArg::Skip => Self::Skip,
            PolicyArg::Halt => Self::Halt,
        }
    }
}

impl SubscribeArgs {
    fn poll_config(&self) -> PollConfig {
        let base = Duration::from_millis(self.retry_delay_ms);
        let retry_delay = if self.backoff {
            RetryDelay::Backoff(Backoff::new(base, Duration::from_secs(30), 2.0, 0.1))
        } else {
            RetryDelay::Fixed(base)
        };

        PollConfig::new(self.server.as_str())
            .with_retry_delay(retry_delay)
            .on_malformed(self.on_malformed.into())
            .on_transport_failure(self.on_transport_failure.into())
    }
}

/// Run the poll loop until cancelled.
pub(crate) async fn run(args: SubscribeArgs, token: CancellationToken) -> Result<()> {
    let config = args.poll_config();
    let transport = ReqwestTransport::with_timeout(Duration::from_secs(args.request_timeout_secs));

    tracing::info!("Following channel {} at {}", args.channel, args.server);

    let mut poll = PollLoop::new(
        transport,
        TerminalSink::stdout(),
        StderrNotifier,
        config,
    );

    let last = poll
        .run(ChannelId::new(args.channel), Cursor::new(args.cursor), token)
        .await?;

    tracing::info!("Stopped at version {}", last);
    Ok(())
}

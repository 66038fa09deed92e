//! The reconnect/retry state machine.
//!
//! One request is in flight at a time. After each outcome the loop
//! either advances the cursor, re-polls the same cursor immediately, or
//! waits and re-polls the same cursor:
//!
//! | Outcome            | Sink   | Notifier        | Next request             |
//! |--------------------|--------|-----------------|--------------------------|
//! | `200` + envelope   | render | —               | new cursor, immediately  |
//! | `502`              | —      | —               | same cursor, immediately |
//! | other status       | —      | status text     | same cursor, after delay |
//! | malformed `200`    | —      | per policy      | per policy               |
//! | transport failure  | —      | per policy      | same cursor, after delay |
//!
//! The loop suspends only while a request is in flight and while a retry
//! delay runs. Cancellation is observed at both points.

use alloc::string::ToString;
use core::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::{
    channel::{ChannelId, Cursor},
    config::PollConfig,
    error::PollLoopError,
    outcome::{PollOutcome, notification_text},
    policy::{FailurePolicy, RetryDelay},
    sink::{Notifier, RenderSink},
    transport::Transport,
};

/// What the loop does after an outcome has been handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Next {
    /// Poll from this cursor immediately.
    Advance(Cursor),

    /// Poll the same cursor again immediately.
    Repoll,

    /// Wait, then poll the same cursor again.
    RetryAfter(Duration),

    /// Stop the loop.
    Halt(PollLoopError),
}

/// Long-poll loop for one channel.
#[derive(Debug)]
pub struct PollLoop<T, R, N> {
    transport: T,
    sink: R,
    notifier: N,
    config: PollConfig,
    retry_delay: RetryDelay,
    consecutive_failures: u32,
}

impl<T, R, N> PollLoop<T, R, N>
where
    T: Transport,
    R: RenderSink,
    N: Notifier,
{
    /// Create a loop from its collaborators.
    #[must_use]
    pub fn new(transport: T, sink: R, notifier: N, config: PollConfig) -> Self {
        let retry_delay = config.retry_delay;
        Self {
            transport,
            sink,
            notifier,
            config,
            retry_delay,
            consecutive_failures: 0,
        }
    }

    /// Failures since the last Success or Timeout.
    #[must_use]
    pub const fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    /// Poll `channel` from `cursor` until cancelled.
    ///
    /// Returns the last cursor reached when `cancel` fires, so a later
    /// call can resume from it.
    ///
    /// # Errors
    ///
    /// Returns [`PollLoopError`] only when a [`FailurePolicy::Halt`]
    /// policy applies to a failure.
    pub async fn run(
        &mut self,
        channel: ChannelId,
        mut cursor: Cursor,
        cancel: CancellationToken,
    ) -> Result<Cursor, PollLoopError> {
        info!(channel = %channel, cursor = %cursor, "starting poll loop");

        loop {
            let outcome = tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    info!(channel = %channel, cursor = %cursor, "poll loop cancelled during request");
                    return Ok(cursor);
                }
                outcome = self.poll_once(&channel, &cursor) => outcome,
            };

            match self.handle(outcome) {
                Next::Advance(next) => cursor = next,
                Next::Repoll => {}
                Next::RetryAfter(delay) => {
                    debug!(?delay, cursor = %cursor, "waiting before retry");
                    tokio::select! {
                        biased;
                        () = cancel.cancelled() => {
                            info!(channel = %channel, cursor = %cursor, "poll loop cancelled during retry delay");
                            return Ok(cursor);
                        }
                        () = tokio::time::sleep(delay) => {}
                    }
                }
                Next::Halt(err) => {
                    error!(channel = %channel, cursor = %cursor, error = %err, "poll loop halted");
                    return Err(err);
                }
            }
        }
    }

    /// Issue one request for `(channel, cursor)` and classify the result.
    ///
    /// Has no effect on the sink or notifier.
    pub async fn poll_once(&self, channel: &ChannelId, cursor: &Cursor) -> PollOutcome {
        let url = self.config.subscribe_url(channel, cursor);
        debug!(url = %url, "issuing long poll");
        PollOutcome::classify(self.transport.get(&url).await)
    }

    /// Apply the side effects of `outcome` and decide what comes next.
    pub fn handle(&mut self, outcome: PollOutcome) -> Next {
        match outcome {
            PollOutcome::Success(envelope, unit) => {
                debug!(cursor = %envelope.cursor, "rendering update");
                self.sink
                    .replace(&self.config.container_id, &self.config.child_id, unit);
                self.recovered();
                Next::Advance(envelope.cursor)
            }
            PollOutcome::Timeout => {
                debug!("held poll closed by intermediary, reconnecting");
                self.recovered();
                Next::Repoll
            }
            PollOutcome::ApplicationError {
                status,
                status_text,
            } => {
                self.consecutive_failures = self.consecutive_failures.saturating_add(1);
                warn!(
                    status,
                    status_text = %status_text,
                    consecutive_failures = self.consecutive_failures,
                    "poll returned error status"
                );
                self.notifier.notify(&notification_text(status, &status_text));
                Next::RetryAfter(self.retry_delay.next_delay())
            }
            PollOutcome::MalformedPayload { error, cursor } => self.fail(
                self.config.on_malformed,
                PollLoopError::MalformedPayload(error),
                cursor,
            ),
            PollOutcome::TransportFailure(reason) => self.fail(
                self.config.on_transport_failure,
                PollLoopError::TransportFailure(reason),
                None,
            ),
        }
    }

    fn fail(
        &mut self,
        policy: FailurePolicy,
        err: PollLoopError,
        skip_to: Option<Cursor>,
    ) -> Next {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        warn!(
            error = %err,
            consecutive_failures = self.consecutive_failures,
            ?policy,
            "poll failed"
        );

        match policy {
            FailurePolicy::NotifyAndRetry => {
                self.notifier.notify(&err.to_string());
                Next::RetryAfter(self.retry_delay.next_delay())
            }
            FailurePolicy::Skip => match skip_to {
                Some(cursor) => {
                    warn!(cursor = %cursor, "skipping unusable update");
                    Next::Advance(cursor)
                }
                None => Next::RetryAfter(self.retry_delay.next_delay()),
            },
            FailurePolicy::RetryQuietly => Next::RetryAfter(self.retry_delay.next_delay()),
            FailurePolicy::Halt => Next::Halt(err),
        }
    }

    fn recovered(&mut self) {
        self.consecutive_failures = 0;
        self.retry_delay.reset();
    }
}

#[cfg(test)]
mod tests {
    use tokio::time::Instant;

    use super::*;
    use crate::{
        backoff::Backoff,
        error::EnvelopeError,
        fragment::Renderable,
        test_utils::{RecordingNotifier, RecordingSink, Scripted, ScriptedTransport},
        transport::PollResponse,
    };

    const BASE: &str = "http://feed.test";

    fn url(channel: &str, cursor: &str) -> String {
        format!("{BASE}/subscribe/{channel}?version={cursor}")
    }

    struct Harness {
        transport: ScriptedTransport,
        sink: RecordingSink,
        notifier: RecordingNotifier,
        cancel: CancellationToken,
        poll: PollLoop<ScriptedTransport, RecordingSink, RecordingNotifier>,
    }

    fn harness(script: Vec<Scripted>, config: PollConfig) -> Harness {
        let cancel = CancellationToken::new();
        let transport = ScriptedTransport::new(script).cancel_when_exhausted(cancel.clone());
        let sink = RecordingSink::default();
        let notifier = RecordingNotifier::default();
        let poll = PollLoop::new(transport.clone(), sink.clone(), notifier.clone(), config);
        Harness {
            transport,
            sink,
            notifier,
            cancel,
            poll,
        }
    }

    fn config() -> PollConfig {
        PollConfig::new(BASE)
    }

    /// Virtual time lands on millisecond ticks.
    fn assert_elapsed(actual: Duration, expected: Duration) {
        assert!(
            actual >= expected && actual < expected + Duration::from_millis(1),
            "expected {expected:?}, got {actual:?}"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn success_renders_and_advances_cursor() {
        let mut h = harness(
            vec![Scripted::Respond(PollResponse::ok("v2\n<div>hello</div>"))],
            config(),
        );

        let last = h
            .poll
            .run("room".into(), "v1".into(), h.cancel.clone())
            .await
            .expect("cancelled cleanly");

        assert_eq!(last, Cursor::from("v2"));
        assert_eq!(h.transport.urls(), vec![url("room", "v1"), url("room", "v2")]);

        let replacements = h.sink.replacements();
        assert_eq!(replacements.len(), 1);
        assert_eq!(replacements[0].container_id, "channel");
        assert_eq!(replacements[0].child_id, "chanevents");
        assert_eq!(
            replacements[0].unit,
            Renderable::Element("<div>hello</div>".into())
        );
        assert!(h.notifier.messages().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn cursor_follows_each_success() {
        let mut h = harness(
            vec![
                Scripted::Respond(PollResponse::ok("a\n<p>1</p>")),
                Scripted::Respond(PollResponse::ok("b\n<p>2</p>")),
                Scripted::Respond(PollResponse::ok("c\n<p>3</p>")),
            ],
            config(),
        );

        let last = h
            .poll
            .run("room".into(), Cursor::initial(), h.cancel.clone())
            .await
            .expect("cancelled cleanly");

        assert_eq!(last, Cursor::from("c"));
        assert_eq!(
            h.transport.urls(),
            vec![
                url("room", ""),
                url("room", "a"),
                url("room", "b"),
                url("room", "c"),
            ]
        );
        assert_eq!(h.sink.current(), Some(Renderable::Element("<p>3</p>".into())));
    }

    #[tokio::test(start_paused = true)]
    async fn repeated_update_replaces_instead_of_accumulating() {
        let mut h = harness(
            vec![
                Scripted::Respond(PollResponse::ok("v5\n<div>same</div>")),
                Scripted::Respond(PollResponse::ok("v5\n<div>same</div>")),
            ],
            config(),
        );

        h.poll
            .run("room".into(), "v4".into(), h.cancel.clone())
            .await
            .expect("cancelled cleanly");

        let replacements = h.sink.replacements();
        assert_eq!(replacements.len(), 2);
        assert!(
            replacements
                .iter()
                .all(|r| r.child_id == "chanevents" && r.container_id == "channel")
        );
        assert_eq!(h.sink.current(), Some(Renderable::Element("<div>same</div>".into())));
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_repolls_same_channel_and_cursor_immediately() {
        let mut h = harness(
            vec![
                Scripted::Respond(PollResponse::status(502, "Bad Gateway")),
                Scripted::Respond(PollResponse::status(502, "Bad Gateway")),
            ],
            config(),
        );

        let start = Instant::now();
        let last = h
            .poll
            .run("room".into(), "v7".into(), h.cancel.clone())
            .await
            .expect("cancelled cleanly");

        assert_eq!(last, Cursor::from("v7"));
        assert_eq!(h.transport.urls(), vec![url("room", "v7"); 3]);
        assert!(h.transport.requests().iter().all(|r| r.at == start));
        assert!(h.sink.replacements().is_empty());
        assert!(h.notifier.messages().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn application_error_notifies_once_then_retries_after_delay() {
        let mut h = harness(
            vec![Scripted::Respond(PollResponse::status(
                503,
                "Service Unavailable",
            ))],
            config(),
        );

        h.poll
            .run("room".into(), "v1".into(), h.cancel.clone())
            .await
            .expect("cancelled cleanly");

        let notes = h.notifier.notifications();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].message, "Service Unavailable");

        let requests = h.transport.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].url, url("room", "v1"));
        assert_eq!(requests[1].url, url("room", "v1"));
        assert!(requests[1].at - requests[0].at >= Duration::from_millis(1000));
        assert!(requests[1].at - notes[0].at >= Duration::from_millis(1000));
        assert!(h.sink.replacements().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn fixed_delay_does_not_grow() {
        let mut h = harness(
            vec![
                Scripted::Respond(PollResponse::status(500, "Internal Server Error")),
                Scripted::Respond(PollResponse::status(500, "Internal Server Error")),
                Scripted::Respond(PollResponse::status(500, "Internal Server Error")),
            ],
            config(),
        );

        h.poll
            .run("room".into(), "v1".into(), h.cancel.clone())
            .await
            .expect("cancelled cleanly");

        let requests = h.transport.requests();
        assert_eq!(requests.len(), 4);
        for pair in requests.windows(2) {
            assert_elapsed(pair[1].at - pair[0].at, Duration::from_millis(1000));
        }
        assert_eq!(h.notifier.messages().len(), 3);
        assert_eq!(h.poll.consecutive_failures(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn trimmed_fragment_becomes_single_unit() {
        let mut h = harness(
            vec![Scripted::Respond(PollResponse::ok("v3\n   <span>x</span>   "))],
            config(),
        );

        h.poll
            .run("room".into(), "v2".into(), h.cancel.clone())
            .await
            .expect("cancelled cleanly");

        assert_eq!(h.sink.current(), Some(Renderable::Element("<span>x</span>".into())));
        assert_eq!(h.transport.urls().last(), Some(&url("room", "v3")));
    }

    #[tokio::test(start_paused = true)]
    async fn malformed_payload_is_not_rendered_and_keeps_cursor() {
        let mut h = harness(
            vec![Scripted::Respond(PollResponse::ok("v2<div>no newline</div>"))],
            config(),
        );

        let last = h
            .poll
            .run("room".into(), "v1".into(), h.cancel.clone())
            .await
            .expect("cancelled cleanly");

        assert_eq!(last, Cursor::from("v1"));
        assert!(h.sink.replacements().is_empty());
        assert_eq!(
            h.notifier.messages(),
            vec!["malformed update payload: update body has no newline after the cursor".to_string()]
        );

        let requests = h.transport.requests();
        assert_eq!(requests[1].url, url("room", "v1"));
        assert!(requests[1].at - requests[0].at >= Duration::from_millis(1000));
    }

    #[tokio::test(start_paused = true)]
    async fn malformed_payload_can_halt() {
        let mut h = harness(
            vec![Scripted::Respond(PollResponse::ok("\n<div></div>"))],
            config().on_malformed(FailurePolicy::Halt),
        );

        let result = h.poll.run("room".into(), "v1".into(), h.cancel.clone()).await;

        assert_eq!(
            result,
            Err(PollLoopError::MalformedPayload(EnvelopeError::EmptyCursor))
        );
        assert_eq!(h.transport.requests().len(), 1);
        assert!(h.notifier.messages().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn transport_failure_retries_quietly_by_default() {
        let mut h = harness(
            vec![
                Scripted::Fail("connection refused".into()),
                Scripted::Respond(PollResponse::ok("v2\n<div>back</div>")),
            ],
            config(),
        );

        let last = h
            .poll
            .run("room".into(), "v1".into(), h.cancel.clone())
            .await
            .expect("cancelled cleanly");

        assert_eq!(last, Cursor::from("v2"));
        assert!(h.notifier.messages().is_empty());

        let requests = h.transport.requests();
        assert_eq!(requests[0].url, url("room", "v1"));
        assert_eq!(requests[1].url, url("room", "v1"));
        assert!(requests[1].at - requests[0].at >= Duration::from_millis(1000));
        assert_eq!(h.poll.consecutive_failures(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn transport_failure_can_halt() {
        let mut h = harness(
            vec![Scripted::Fail("dns failure".into())],
            config().on_transport_failure(FailurePolicy::Halt),
        );

        let result = h.poll.run("room".into(), "v1".into(), h.cancel.clone()).await;
        assert_eq!(
            result,
            Err(PollLoopError::TransportFailure("dns failure".into()))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn unusable_fragment_pins_cursor_under_retry() {
        let mut h = harness(
            vec![
                Scripted::Respond(PollResponse::ok("v2\n<div><span>x</span>")),
                Scripted::Respond(PollResponse::ok("v2\n<div><span>x</span>")),
            ],
            config(),
        );

        let last = h
            .poll
            .run("room".into(), "v1".into(), h.cancel.clone())
            .await
            .expect("cancelled cleanly");

        assert_eq!(last, Cursor::from("v1"));
        assert_eq!(h.transport.urls(), vec![url("room", "v1"); 3]);
        assert_eq!(h.notifier.messages().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn skip_policy_advances_past_unusable_fragment() {
        let mut h = harness(
            vec![
                Scripted::Respond(PollResponse::ok("v2\n<div><span>x</span>")),
                Scripted::Respond(PollResponse::ok("v3\n<div>fine</div>")),
            ],
            config().on_malformed(FailurePolicy::Skip),
        );

        let start = Instant::now();
        let last = h
            .poll
            .run("room".into(), "v1".into(), h.cancel.clone())
            .await
            .expect("cancelled cleanly");

        assert_eq!(last, Cursor::from("v3"));
        assert_eq!(
            h.transport.urls(),
            vec![url("room", "v1"), url("room", "v2"), url("room", "v3")]
        );
        assert!(h.transport.requests().iter().all(|r| r.at == start));
        assert!(h.notifier.messages().is_empty());

        let replacements = h.sink.replacements();
        assert_eq!(replacements.len(), 1);
        assert_eq!(replacements[0].unit, Renderable::Element("<div>fine</div>".into()));
    }

    #[tokio::test(start_paused = true)]
    async fn skip_policy_without_cursor_retries_after_delay() {
        let mut h = harness(
            vec![Scripted::Respond(PollResponse::ok("v2 but no newline"))],
            config().on_malformed(FailurePolicy::Skip),
        );

        let last = h
            .poll
            .run("room".into(), "v1".into(), h.cancel.clone())
            .await
            .expect("cancelled cleanly");

        assert_eq!(last, Cursor::from("v1"));
        assert!(h.notifier.messages().is_empty());

        let requests = h.transport.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1].url, url("room", "v1"));
        assert_elapsed(requests[1].at - requests[0].at, Duration::from_millis(1000));
    }

    #[tokio::test(start_paused = true)]
    async fn transport_failure_can_notify() {
        let mut h = harness(
            vec![Scripted::Fail("connection refused".into())],
            config().on_transport_failure(FailurePolicy::NotifyAndRetry),
        );

        let last = h
            .poll
            .run("room".into(), "v1".into(), h.cancel.clone())
            .await
            .expect("cancelled cleanly");

        assert_eq!(last, Cursor::from("v1"));

        let notes = h.notifier.notifications();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].message, "transport failure: connection refused");

        let requests = h.transport.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1].url, url("room", "v1"));
        assert_elapsed(requests[1].at - notes[0].at, Duration::from_millis(1000));
    }

    #[tokio::test(start_paused = true)]
    async fn empty_status_text_notifies_with_status_code() {
        let mut h = harness(
            vec![Scripted::Respond(PollResponse::status(599, ""))],
            config(),
        );

        h.poll
            .run("room".into(), "v1".into(), h.cancel.clone())
            .await
            .expect("cancelled cleanly");

        assert_eq!(h.notifier.messages(), vec!["HTTP 599".to_string()]);
        assert_eq!(h.transport.urls(), vec![url("room", "v1"); 2]);
    }

    #[tokio::test(start_paused = true)]
    async fn backoff_grows_and_resets_after_success() {
        let backoff = Backoff::new(
            Duration::from_millis(100),
            Duration::from_secs(10),
            2.0,
            0.0,
        );
        let mut h = harness(
            vec![
                Scripted::Respond(PollResponse::status(500, "Internal Server Error")),
                Scripted::Respond(PollResponse::status(500, "Internal Server Error")),
                Scripted::Respond(PollResponse::ok("v2\n<div>ok</div>")),
                Scripted::Respond(PollResponse::status(500, "Internal Server Error")),
            ],
            config().with_retry_delay(RetryDelay::Backoff(backoff)),
        );

        h.poll
            .run("room".into(), "v1".into(), h.cancel.clone())
            .await
            .expect("cancelled cleanly");

        let at: Vec<_> = h.transport.requests().iter().map(|r| r.at).collect();
        assert_eq!(at.len(), 5);
        assert_elapsed(at[1] - at[0], Duration::from_millis(100));
        assert_elapsed(at[2] - at[1], Duration::from_millis(200));
        assert_eq!(at[3], at[2]);
        assert_elapsed(at[4] - at[3], Duration::from_millis(100));
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_during_retry_delay_stops_without_another_request() {
        let cancel = CancellationToken::new();
        let transport = ScriptedTransport::new(vec![Scripted::Respond(PollResponse::status(
            503,
            "Service Unavailable",
        ))]);
        let mut poll = PollLoop::new(
            transport.clone(),
            RecordingSink::default(),
            RecordingNotifier::default(),
            config(),
        );

        let canceller = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(400)).await;
            canceller.cancel();
        });

        let start = Instant::now();
        let last = poll
            .run("room".into(), "v1".into(), cancel)
            .await
            .expect("cancelled cleanly");

        assert_eq!(last, Cursor::from("v1"));
        assert_eq!(transport.requests().len(), 1);
        assert_elapsed(Instant::now() - start, Duration::from_millis(400));
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_during_request_returns_current_cursor() {
        let cancel = CancellationToken::new();
        let transport = ScriptedTransport::new(Vec::new());
        let mut poll = PollLoop::new(
            transport.clone(),
            RecordingSink::default(),
            RecordingNotifier::default(),
            config(),
        );

        let canceller = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(30)).await;
            canceller.cancel();
        });

        let last = poll
            .run("room".into(), "v9".into(), cancel)
            .await
            .expect("cancelled cleanly");

        assert_eq!(last, Cursor::from("v9"));
        assert_eq!(transport.urls(), vec![url("room", "v9")]);
    }

    #[tokio::test]
    async fn poll_once_has_no_side_effects() {
        let h = harness(
            vec![Scripted::Respond(PollResponse::ok("v2\n<div>hello</div>"))],
            config(),
        );

        let outcome = h.poll.poll_once(&"room".into(), &"v1".into()).await;

        assert!(matches!(outcome, PollOutcome::Success(..)));
        assert!(h.sink.replacements().is_empty());
    }
}

//! Result synchronization with the ad library
//!
//! The library exposes no completion callback: its result map simply appears
//! at some point after `load`. The synchronizer polls that map on a fixed
//! interval and drains it exactly once.
//!
//! ```text
//! Waiting --(results non-empty)--> Draining --> Done
//! ```
//!
//! Polling runs as a cancellable tokio task. [`ResultSynchronizer::spawn`]
//! returns a [`SyncHandle`] that resolves when draining has finished, so the
//! state machine can be driven under a paused clock in tests.

use std::collections::HashMap;
use tokio::sync::oneshot;
use tokio::time::{Instant, MissedTickBehavior, interval_at, sleep_until};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info, trace, warn};

use crate::application::impression_token::ImpressionTokenDecoder;
use crate::application::request_normalizer::to_outbound_response;
use crate::context::AdServingContext;
use crate::domain::events::{FrameMessage, OutboundRequestPayload, SharedRenderPayload};
use crate::domain::placement::PlacementType;
use crate::error::{AdFrameError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Waiting,
    Draining,
    Done,
}

/// What a drain pass sent out
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DrainReport {
    /// Poll ticks observed, including the draining one
    pub ticks: u64,
    /// Placement keys a response was delivered for
    pub responses: Vec<String>,
    /// Placement keys whose response could not be delivered
    pub failed_responses: Vec<String>,
    /// Companion frames requested from the parent
    pub commands: Vec<PlacementType>,
    /// Whether the bootstrap iframe was injected instead of a sponsorship command
    pub bootstrap_injected: bool,
}

pub struct ResultSynchronizer {
    ctx: AdServingContext,
    request: OutboundRequestPayload,
    origin: Option<String>,
    decoder: ImpressionTokenDecoder,
    state: SyncState,
    ticks: u64,
}

impl ResultSynchronizer {
    /// `request` is the payload already sent to the parent; every response
    /// repeats it. `origin` is the postMessage target for companion commands.
    pub fn new(
        ctx: AdServingContext,
        request: OutboundRequestPayload,
        origin: Option<String>,
    ) -> Self {
        let decoder = ImpressionTokenDecoder::new(&ctx.library.domain());
        Self {
            ctx,
            request,
            origin,
            decoder,
            state: SyncState::Waiting,
            ticks: 0,
        }
    }

    pub const fn state(&self) -> SyncState {
        self.state
    }

    pub const fn ticks(&self) -> u64 {
        self.ticks
    }

    /// One poll tick. Returns the drain report on the tick that observed
    /// results; every other tick, before or after, does nothing.
    pub async fn poll_once(&mut self) -> Option<DrainReport> {
        if self.state != SyncState::Waiting {
            return None;
        }

        self.ticks += 1;
        let results = match self.ctx.library.results() {
            Some(results) if !results.is_empty() => results,
            _ => {
                trace!(tick = self.ticks, "Ad library results not ready");
                return None;
            }
        };

        self.state = SyncState::Draining;
        let report = self.drain(results).await;
        self.state = SyncState::Done;
        Some(report)
    }

    async fn drain(&self, results: HashMap<String, String>) -> DrainReport {
        info!(
            tick = self.ticks,
            placements = results.len(),
            "Ad library results ready, draining"
        );
        let mut report = DrainReport {
            ticks: self.ticks,
            ..DrainReport::default()
        };

        self.ctx.shared.publish(SharedRenderPayload {
            markup: results.clone(),
        });

        let messaging = self.ctx.messenger.supports_post_message();

        if results.contains_key(PlacementType::Top.as_str())
            && messaging
            && self.send_command(PlacementType::Top).await
        {
            report.commands.push(PlacementType::Top);
        }

        for (key, ad) in self.ctx.library.served_ads() {
            let token = results.get(&key).and_then(|markup| self.decoder.decode(markup));
            let payload = to_outbound_response(&self.request, &key, &ad, token, self.ctx.settings());

            debug!(placement = %key, ad_id = ad.id, "Sending response");
            match self
                .ctx
                .messenger
                .post(FrameMessage::Response(Box::new(payload)))
                .await
            {
                Ok(()) => report.responses.push(key),
                Err(e) => {
                    error!(placement = %key, "Response delivery failed: {}", e);
                    report.failed_responses.push(key);
                }
            }
        }

        if results.contains_key(PlacementType::Sponsorship.as_str()) {
            if messaging {
                if self.send_command(PlacementType::Sponsorship).await {
                    report.commands.push(PlacementType::Sponsorship);
                }
            } else {
                let src = &self.ctx.settings().bootstrap_frame_src;
                debug!(src = %src, "postMessage unavailable, injecting bootstrap frame");
                self.ctx.host.inject_hidden_iframe(src);
                report.bootstrap_injected = true;
            }
        }

        report
    }

    /// Normalized postMessage target. `*` is passed through.
    fn target_origin(&self) -> Result<String> {
        let origin = self.origin.as_deref().unwrap_or_default();
        if origin == "*" {
            return Ok(origin.to_string());
        }

        match url::Url::parse(origin) {
            Ok(url) if url.origin().is_tuple() => Ok(url.origin().ascii_serialization()),
            _ => Err(AdFrameError::InvalidOrigin {
                origin: origin.to_string(),
            }),
        }
    }

    async fn send_command(&self, placement: PlacementType) -> bool {
        let target_origin = match self.target_origin() {
            Ok(origin) => origin,
            Err(e) => {
                warn!(%placement, "Skipping companion frame command: {}", e);
                return false;
            }
        };

        let message = FrameMessage::CreateAdFrame {
            placement,
            target_origin,
        };
        let event = message.event_name();
        match self.ctx.messenger.post(message).await {
            Ok(()) => {
                debug!(command = event, "Companion frame requested");
                true
            }
            Err(e) => {
                error!(command = event, "Command delivery failed: {}", e);
                false
            }
        }
    }

    /// Polls until drained. Cancellation and the optional timeout end it early.
    pub async fn run(mut self) -> Result<DrainReport> {
        if self.state != SyncState::Waiting {
            return Err(AdFrameError::SynchronizerFinished);
        }

        let settings = self.ctx.settings.clone();
        let period = settings.poll_interval();
        let started = Instant::now();
        let deadline = settings.poll_timeout().map(|timeout| started + timeout);
        let token = self.ctx.cancellation_token.clone();

        let mut interval = interval_at(started + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        debug!(
            interval_ms = settings.poll_interval_ms,
            timeout_ms = ?settings.poll_timeout_ms,
            "Waiting for ad library results"
        );

        loop {
            tokio::select! {
                biased;

                () = token.cancelled() => {
                    info!(ticks = self.ticks, "Result polling cancelled");
                    return Err(AdFrameError::Cancelled { ticks: self.ticks });
                }
                () = wait_for(deadline) => {
                    let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
                    warn!(ticks = self.ticks, elapsed_ms, "Gave up waiting for ad library results");
                    return Err(AdFrameError::PollTimeout { elapsed_ms, ticks: self.ticks });
                }
                _ = interval.tick() => {
                    if let Some(report) = self.poll_once().await {
                        return Ok(report);
                    }
                }
            }
        }
    }

    /// Runs the poll on its own task, inside the caller's span.
    pub fn spawn(self) -> SyncHandle {
        let token = self.ctx.cancellation_token.clone();
        let (sender, receiver) = oneshot::channel();

        tokio::spawn(async move {
            let outcome = self.run().await;
            if sender.send(outcome).is_err() {
                debug!("Sync handle dropped before draining finished");
            }
        }
        .in_current_span());

        SyncHandle { receiver, token }
    }
}

async fn wait_for(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

/// Completion signal of a spawned synchronizer
#[derive(Debug)]
pub struct SyncHandle {
    receiver: oneshot::Receiver<Result<DrainReport>>,
    token: CancellationToken,
}

impl SyncHandle {
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub async fn wait(self) -> Result<DrainReport> {
        self.receiver
            .await
            .map_err(|_| AdFrameError::SynchronizerFinished)?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ad_result::{AdResult, Campaign, Creative, Flight};
    use crate::domain::events::PayloadShape;
    use crate::infrastructure::ad_library::house_ad_markup;
    use crate::infrastructure::{
        AdServingSettings, HostAction, InMemoryAdLibrary, RecordingFrameHost, RecordingMessenger,
    };
    use std::sync::Arc;
    use std::time::Duration;

    struct Harness {
        ctx: AdServingContext,
        library: Arc<InMemoryAdLibrary>,
        messenger: Arc<RecordingMessenger>,
        host: Arc<RecordingFrameHost>,
    }

    fn harness_with(settings: AdServingSettings, messenger: RecordingMessenger) -> Harness {
        let library = Arc::new(InMemoryAdLibrary::new("engine.adzerk.net"));
        let messenger = Arc::new(messenger);
        let host = Arc::new(RecordingFrameHost::new());
        let ctx = AdServingContext::builder(settings)
            .with_library(library.clone())
            .with_messenger(messenger.clone())
            .with_host(host.clone())
            .build()
            .unwrap();
        Harness { ctx, library, messenger, host }
    }

    fn harness() -> Harness {
        harness_with(AdServingSettings::default(), RecordingMessenger::new())
    }

    fn ad(id: u64) -> AdResult {
        AdResult {
            id,
            creative: Creative { id: id + 1, ad_type: 5 },
            flight: Flight {
                id: id + 2,
                priority_id: 1,
                rate_type: None,
                campaign: Campaign { id: id + 3 },
            },
            ecpm: None,
            companions: Vec::new(),
        }
    }

    fn synchronizer(h: &Harness, origin: Option<&str>) -> ResultSynchronizer {
        ResultSynchronizer::new(
            h.ctx.clone(),
            OutboundRequestPayload::default(),
            origin.map(str::to_string),
        )
    }

    #[tokio::test]
    async fn waits_without_side_effects_then_drains_once() {
        let h = harness();
        let mut sync = synchronizer(&h, Some("https://www.reddit.com"));

        for _ in 0..5 {
            assert!(sync.poll_once().await.is_none());
        }
        assert!(h.messenger.messages().is_empty());
        assert!(h.ctx.shared.current().is_none());
        assert_eq!(sync.state(), SyncState::Waiting);

        h.library.serve("main", ad(100), "<div>main</div>");
        h.library.serve("top", ad(200), "<div>top</div>");

        let report = sync.poll_once().await.unwrap();
        assert_eq!(report.ticks, 6);
        assert_eq!(report.responses.len(), 2);
        assert_eq!(report.commands, [PlacementType::Top]);
        assert_eq!(sync.state(), SyncState::Done);

        // results changing again has no effect
        h.library.serve("sponsorship", ad(300), "<div>sponsor</div>");
        assert!(sync.poll_once().await.is_none());
        assert_eq!(h.messenger.named("response.adzerk").len(), 2);
        assert_eq!(sync.ticks(), 6);
    }

    #[tokio::test]
    async fn empty_results_keep_waiting() {
        let h = harness();
        h.library.populate(HashMap::new(), HashMap::new());
        let mut sync = synchronizer(&h, None);
        assert!(sync.poll_once().await.is_none());
        assert_eq!(sync.state(), SyncState::Waiting);
    }

    #[tokio::test]
    async fn drain_publishes_shared_markup() {
        let h = harness();
        h.library.serve("top", ad(1), "<div>top ad</div>");
        let mut sync = synchronizer(&h, Some("https://www.reddit.com"));
        sync.poll_once().await.unwrap();

        let shared = h.ctx.shared.current().unwrap();
        assert_eq!(shared.markup_for(PlacementType::Top), Some("<div>top ad</div>"));
    }

    #[tokio::test]
    async fn commands_target_the_normalized_origin() {
        let h = harness();
        h.library.serve("sponsorship", ad(1), "<div/>");
        let mut sync = synchronizer(&h, Some("https://www.reddit.com/r/rust"));
        let report = sync.poll_once().await.unwrap();

        assert_eq!(report.commands, [PlacementType::Sponsorship]);
        let commands = h.messenger.named("ados.createAdFrame:sponsorship");
        assert_eq!(
            commands,
            [FrameMessage::CreateAdFrame {
                placement: PlacementType::Sponsorship,
                target_origin: "https://www.reddit.com".to_string(),
            }]
        );
    }

    #[tokio::test]
    async fn invalid_origin_skips_commands_but_not_responses() {
        let h = harness();
        h.library.serve("top", ad(1), "<div/>");
        let mut sync = synchronizer(&h, Some("not an origin"));
        let report = sync.poll_once().await.unwrap();

        assert!(report.commands.is_empty());
        assert_eq!(report.responses, ["top"]);
    }

    #[tokio::test]
    async fn sponsorship_falls_back_to_bootstrap_frame() {
        let h = harness_with(AdServingSettings::default(), RecordingMessenger::without_post_message());
        h.library.serve("top", ad(1), "<div/>");
        h.library.serve("sponsorship", ad(2), "<div/>");
        let mut sync = synchronizer(&h, Some("https://www.reddit.com"));
        let report = sync.poll_once().await.unwrap();

        assert!(report.commands.is_empty());
        assert!(report.bootstrap_injected);
        assert_eq!(
            h.host.actions(),
            [HostAction::InjectHiddenIframe("/static/createadframe.html".to_string())]
        );
        assert_eq!(report.responses.len(), 2);
    }

    #[tokio::test]
    async fn token_fields_follow_payload_shape() {
        let markup = house_ad_markup("engine.adzerk.net", &["Foo".to_string(), "bar".to_string()], "abc123");

        let instrumented = harness();
        instrumented.library.serve("main", ad(1), markup.clone());
        synchronizer(&instrumented, None).poll_once().await.unwrap();
        match &instrumented.messenger.named("response.adzerk")[0] {
            FrameMessage::Response(payload) => {
                assert_eq!(
                    payload.matched_keywords,
                    Some(vec!["bar".to_string(), "foo".to_string()])
                );
                assert_eq!(payload.impression_id.as_deref(), Some("abc123"));
            }
            other => panic!("unexpected message {other:?}"),
        }

        let basic = harness_with(
            AdServingSettings {
                payload_shape: PayloadShape::Basic,
                ..AdServingSettings::default()
            },
            RecordingMessenger::new(),
        );
        basic.library.serve("main", ad(1), markup);
        synchronizer(&basic, None).poll_once().await.unwrap();
        match &basic.messenger.named("response.adzerk")[0] {
            FrameMessage::Response(payload) => assert!(payload.matched_keywords.is_none()),
            other => panic!("unexpected message {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn spawned_poll_drains_after_results_appear() {
        let h = harness();
        let handle = synchronizer(&h, None).spawn();

        // ticks at 50ms and 100ms see nothing
        tokio::time::sleep(Duration::from_millis(120)).await;
        assert!(h.messenger.messages().is_empty());

        h.library.serve("main", ad(7), "<div/>");
        let report = handle.wait().await.unwrap();
        assert_eq!(report.ticks, 3);
        assert_eq!(report.responses, ["main"]);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_stops_polling() {
        let h = harness();
        let handle = synchronizer(&h, None).spawn();

        tokio::time::sleep(Duration::from_millis(75)).await;
        handle.cancel();

        let err = handle.wait().await.unwrap_err();
        assert!(matches!(err, AdFrameError::Cancelled { ticks: 1 }));
        assert!(h.ctx.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn optional_timeout_bounds_the_wait() {
        let h = harness_with(
            AdServingSettings {
                poll_timeout_ms: Some(200),
                ..AdServingSettings::default()
            },
            RecordingMessenger::new(),
        );

        let err = synchronizer(&h, None).run().await.unwrap_err();
        match err {
            AdFrameError::PollTimeout { elapsed_ms, .. } => assert_eq!(elapsed_ms, 200),
            other => panic!("unexpected error {other:?}"),
        }
        assert!(h.messenger.messages().is_empty());
    }

    #[tokio::test]
    async fn finished_synchronizer_refuses_to_run() {
        let h = harness();
        h.library.serve("main", ad(1), "<div/>");
        let mut sync = synchronizer(&h, None);
        sync.poll_once().await.unwrap();

        let err = sync.run().await.unwrap_err();
        assert!(matches!(err, AdFrameError::SynchronizerFinished));
    }
}

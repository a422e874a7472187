//! Compose-page watch loop
//!
//! Polls the page bridge for snapshots, feeds the submit control's
//! disabled state into the detector, and on an accepted submit runs
//! capture → settle → dispatch → notify. Polling doubles as the
//! mutation observer: elements are re-located on every snapshot, so a
//! SPA re-render that swaps the button out needs no special handling,
//! and the whole feature stays inert while no control is rendered.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use scraper::Html;
use tokio::time::{sleep, sleep_until, Instant};
use tracing::{debug, info, trace};

use crate::bridge::PageBridge;
use crate::capture::{capture_content, control_disabled, locate_submit_control};
use crate::detect::SubmitDetector;
use crate::dispatch::Dispatcher;
use crate::error::Result;
use crate::notify::Notifier;
use crate::types::CrosspostRequest;

pub struct WatcherConfig {
    pub poll_interval: Duration,
    pub targets: BTreeSet<String>,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(500),
            targets: BTreeSet::from(["mastodon".to_string()]),
        }
    }
}

pub struct ComposeWatcher {
    bridge: Arc<dyn PageBridge>,
    dispatcher: Dispatcher,
    notifier: Box<dyn Notifier>,
    detector: SubmitDetector,
    config: WatcherConfig,
}

impl ComposeWatcher {
    pub fn new(
        bridge: Arc<dyn PageBridge>,
        dispatcher: Dispatcher,
        notifier: Box<dyn Notifier>,
        config: WatcherConfig,
    ) -> Self {
        Self {
            bridge,
            dispatcher,
            notifier,
            detector: SubmitDetector::new(),
            config,
        }
    }

    /// Poll until the shutdown flag flips
    pub async fn run(&mut self, shutdown: Arc<AtomicBool>) -> Result<()> {
        info!(
            "Watching compose page, poll interval {:?}, targets {:?}",
            self.config.poll_interval, self.config.targets
        );

        loop {
            if shutdown.load(Ordering::Relaxed) {
                info!("Shutdown requested, stopping watch loop");
                break;
            }
            self.poll_once().await;
            sleep(self.config.poll_interval).await;
        }

        Ok(())
    }

    /// One observation cycle. A detected submit runs the full capture
    /// and dispatch sequence before returning, so at most one
    /// cross-post request is ever in flight.
    pub async fn poll_once(&mut self) {
        let now = Instant::now();
        self.detector.tick(now);

        let html = match self.bridge.snapshot().await {
            Ok(html) => html,
            Err(e) => {
                debug!("No page snapshot available: {}", e);
                return;
            }
        };

        let disabled = {
            let doc = Html::parse_document(&html);
            let Some(control) = locate_submit_control(&doc) else {
                trace!("Submit control not rendered yet");
                return;
            };
            control_disabled(&control)
        };

        let Some(signal) = self.detector.observe(disabled, now) else {
            return;
        };
        info!("Submit detected, capturing compose content");

        // Capture from the snapshot that produced the transition; the
        // host page may clear the composer while it processes the post.
        let content = capture_content(&html, self.bridge.as_ref()).await;

        // Let the host page's disable-then-process sequence finish
        sleep_until(signal.dispatch_at).await;

        self.detector.begin_dispatch();
        if let Some(content) = content {
            let request = CrosspostRequest::new(content, self.config.targets.clone());
            info!(
                request_id = %request.id,
                "Dispatching cross-post to {:?}", request.targets
            );
            let result = self.dispatcher.crosspost(&request).await;
            self.notifier.notify(&result);
        } else {
            debug!("Nothing to cross-post, draft was empty");
        }
        self.detector.finish_dispatch(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::MockPageBridge;
    use crate::platforms::mock::{MockConfig, MockDestination};
    use crate::platforms::Destination;
    use crate::settings::{DestinationSettings, MemorySettingsStore};
    use crate::types::CrosspostResult;
    use std::sync::mpsc;

    const ENABLED_PAGE: &str = r#"<html><body>
        <div data-testid="tweetTextarea_0">hello world</div>
        <button data-testid="tweetButtonInline" role="button">Post</button>
    </body></html>"#;

    const DISABLED_PAGE: &str = r#"<html><body>
        <div data-testid="tweetTextarea_0">hello world</div>
        <button data-testid="tweetButtonInline" role="button" disabled>Post</button>
    </body></html>"#;

    const NO_CONTROL_PAGE: &str = "<html><body><p>timeline</p></body></html>";

    struct ChannelNotifier(mpsc::Sender<CrosspostResult>);

    impl Notifier for ChannelNotifier {
        fn notify(&self, result: &CrosspostResult) {
            let _ = self.0.send(result.clone());
        }
    }

    fn watcher_parts() -> (
        Arc<MockPageBridge>,
        MockConfig,
        mpsc::Receiver<CrosspostResult>,
        ComposeWatcher,
    ) {
        let bridge = Arc::new(MockPageBridge::new(ENABLED_PAGE));

        let store = Arc::new(MemorySettingsStore::new());
        store.insert(
            "mastodon",
            DestinationSettings {
                enabled: true,
                token: "token".to_string(),
                instance: "mastodon.social".to_string(),
            },
        );

        let config = MockConfig::new("mastodon");
        let factory_config = config.clone();
        let dispatcher = Dispatcher::new(store, Some(bridge.clone())).with_factory(Box::new(
            move |platform, _settings, _http| {
                let mut mock_config = factory_config.clone();
                mock_config.name = platform.to_string();
                Some(Ok(
                    Box::new(MockDestination::new(mock_config)) as Box<dyn Destination>
                ))
            },
        ));

        let (tx, rx) = mpsc::channel();
        let watcher = ComposeWatcher::new(
            bridge.clone(),
            dispatcher,
            Box::new(ChannelNotifier(tx)),
            WatcherConfig::default(),
        );

        (bridge, config, rx, watcher)
    }

    #[tokio::test(start_paused = true)]
    async fn test_disable_transition_dispatches_and_notifies() {
        let (bridge, config, rx, mut watcher) = watcher_parts();

        watcher.poll_once().await;
        assert!(config.published().is_empty());

        bridge.set_snapshot(DISABLED_PAGE);
        watcher.poll_once().await;

        let published = config.published();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].0, "hello world");

        let result = rx.try_recv().unwrap();
        assert!(result.any_success());
        assert_eq!(result.succeeded(), vec!["mastodon"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cooldown_drops_duplicate_submits() {
        let (bridge, config, _rx, mut watcher) = watcher_parts();

        watcher.poll_once().await;
        bridge.set_snapshot(DISABLED_PAGE);
        watcher.poll_once().await;
        assert_eq!(config.published().len(), 1);

        // The host re-enables and re-disables the button while we are
        // cooling down; nothing new may fire.
        bridge.set_snapshot(ENABLED_PAGE);
        watcher.poll_once().await;
        bridge.set_snapshot(DISABLED_PAGE);
        watcher.poll_once().await;
        assert_eq!(config.published().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_submit_after_cooldown() {
        let (bridge, config, _rx, mut watcher) = watcher_parts();

        watcher.poll_once().await;
        bridge.set_snapshot(DISABLED_PAGE);
        watcher.poll_once().await;
        assert_eq!(config.published().len(), 1);

        tokio::time::advance(Duration::from_secs(6)).await;
        bridge.set_snapshot(ENABLED_PAGE);
        watcher.poll_once().await;
        bridge.set_snapshot(DISABLED_PAGE);
        watcher.poll_once().await;

        assert_eq!(config.published().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_control_keeps_feature_inert() {
        let (bridge, config, rx, mut watcher) = watcher_parts();

        bridge.set_snapshot(NO_CONTROL_PAGE);
        for _ in 0..5 {
            watcher.poll_once().await;
        }
        assert!(config.published().is_empty());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_draft_is_silent_noop() {
        let (bridge, config, rx, mut watcher) = watcher_parts();

        let empty_draft = r#"<html><body>
            <div data-testid="tweetTextarea_0">   </div>
            <button data-testid="tweetButtonInline" role="button" disabled>Post</button>
        </body></html>"#;

        bridge.set_snapshot(empty_draft);
        watcher.poll_once().await;

        // No dispatch, no notification, but the cooldown still runs
        assert!(config.published().is_empty());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_snapshot_failure_is_tolerated() {
        let (bridge, config, _rx, mut watcher) = watcher_parts();

        // A control replaced mid-navigation: the snapshot goes away,
        // then comes back; the watcher just re-locates.
        bridge.set_snapshot(NO_CONTROL_PAGE);
        watcher.poll_once().await;
        bridge.set_snapshot(DISABLED_PAGE);
        watcher.poll_once().await;

        assert_eq!(config.published().len(), 1);
    }
}

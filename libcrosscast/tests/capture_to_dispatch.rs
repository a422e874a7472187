//! Snapshot-to-publish pipeline tests: capture through a mock page
//! bridge, dispatch through mock destinations

use std::collections::BTreeSet;
use std::sync::Arc;

use libcrosscast::bridge::MockPageBridge;
use libcrosscast::capture::capture_content;
use libcrosscast::dispatch::DestinationFactory;
use libcrosscast::platforms::mock::{MockConfig, MockDestination};
use libcrosscast::platforms::Destination;
use libcrosscast::settings::{DestinationSettings, MemorySettingsStore};
use libcrosscast::types::{ImageMimeType, InlineImage};
use libcrosscast::{CrosspostRequest, Dispatcher};

const COMPOSE_PAGE: &str = r#"<html><body>
    <div data-testid="tweetTextarea_0RichTextInputContainer">
      <div class="public-DraftEditor-content">
        <div data-text="true">shipping a new release</div>
        <div data-text="true">today</div>
      </div>
    </div>
    <div data-testid="attachments">
      <img src="blob:https://x.com/shot-1" alt="screenshot">
      <img src="blob:https://x.com/shot-1" alt="same screenshot again">
    </div>
    <button data-testid="tweetButtonInline" role="button" disabled>Post</button>
</body></html>"#;

fn pipeline_parts() -> (Arc<MockPageBridge>, MockConfig, Dispatcher) {
    let bridge = Arc::new(MockPageBridge::new(COMPOSE_PAGE));
    bridge.add_raster(
        "blob:https://x.com/shot-1",
        InlineImage::new(ImageMimeType::Jpeg, vec![0xFF, 0xD8, 0x01]),
    );

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
    let factory: DestinationFactory = Box::new(move |platform, _settings, _http| {
        let mut mock_config = factory_config.clone();
        mock_config.name = platform.to_string();
        Some(Ok(
            Box::new(MockDestination::new(mock_config)) as Box<dyn Destination>
        ))
    });

    let dispatcher = Dispatcher::new(store, Some(bridge.clone())).with_factory(factory);
    (bridge, config, dispatcher)
}

#[tokio::test]
async fn captured_draft_flows_to_destination() {
    let (bridge, config, dispatcher) = pipeline_parts();

    let content = capture_content(COMPOSE_PAGE, bridge.as_ref())
        .await
        .expect("draft should be captured");

    // Two lines joined, duplicate attachment collapsed
    assert_eq!(content.text, "shipping a new release\ntoday");
    assert_eq!(content.media.len(), 1);
    assert_eq!(content.media[0].alt_text, "screenshot");
    assert!(content.media[0].inline.is_some());

    let request = CrosspostRequest::new(content, BTreeSet::from(["mastodon".to_string()]));
    let result = dispatcher.crosspost(&request).await;

    assert!(result.any_success());

    let uploads = config.uploads();
    assert_eq!(uploads.len(), 1);
    assert_eq!(uploads[0].bytes, vec![0xFF, 0xD8, 0x01]);
    assert_eq!(uploads[0].alt_text, "screenshot");

    let published = config.published();
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].0, "shipping a new release\ntoday");
    assert_eq!(published[0].1.len(), 1);
}

#[tokio::test]
async fn capture_survives_missing_rasterization() {
    // Bridge has no raster for the attachment; the reference is kept
    // and the dispatcher later re-requests it live
    let bridge = Arc::new(MockPageBridge::new(COMPOSE_PAGE));
    let content = capture_content(COMPOSE_PAGE, bridge.as_ref())
        .await
        .expect("draft should still be captured");

    assert_eq!(content.media.len(), 1);
    assert!(content.media[0].inline.is_none());
    assert_eq!(
        content.media[0].source_url.as_deref(),
        Some("blob:https://x.com/shot-1")
    );
}

#[tokio::test]
async fn timeline_page_captures_nothing() {
    let bridge = Arc::new(MockPageBridge::new(""));
    let html = "<html><body><main>just the timeline</main></body></html>";
    assert!(capture_content(html, bridge.as_ref()).await.is_none());
}

//! Cross-post orchestration
//!
//! One `crosspost` call per detected submit: resolve credentials,
//! upload media, publish, and collect one outcome per destination.
//! A destination's failure never aborts its siblings, and there is no
//! automatic retry; the result map is the whole story.

use std::sync::Arc;

use reqwest::header::CONTENT_TYPE;
use tracing::{debug, info, warn};

use crate::bridge::PageBridge;
use crate::error::DispatchError;
use crate::platforms::{create_destination, Destination, ResolvedMedia};
use crate::settings::{DestinationSettings, SettingsStore};
use crate::types::{unique_media, CrosspostRequest, CrosspostResult, ImageMimeType, MediaItem, PostContent};

/// Builds destination clients per request, so freshly cleared or
/// re-authorized tokens take effect on the next submit
pub type DestinationFactory = Box<
    dyn Fn(
            &str,
            &DestinationSettings,
            &reqwest::Client,
        ) -> Option<Result<Box<dyn Destination>, DispatchError>>
        + Send
        + Sync,
>;

pub struct Dispatcher {
    store: Arc<dyn SettingsStore>,
    bridge: Option<Arc<dyn PageBridge>>,
    http: reqwest::Client,
    factory: DestinationFactory,
}

impl Dispatcher {
    /// Create a dispatcher over the built-in destination registry.
    ///
    /// The page bridge is optional: without one, transient in-page
    /// media references cannot be re-rasterized and are skipped.
    pub fn new(store: Arc<dyn SettingsStore>, bridge: Option<Arc<dyn PageBridge>>) -> Self {
        Self {
            store,
            bridge,
            http: reqwest::Client::new(),
            factory: Box::new(|platform, settings, http| {
                create_destination(platform, settings, http)
            }),
        }
    }

    /// Replace the destination registry (tests use mock destinations)
    pub fn with_factory(mut self, factory: DestinationFactory) -> Self {
        self.factory = factory;
        self
    }

    /// Cross-post one captured payload to every targeted destination.
    ///
    /// Single attempt per destination. An authorization failure on the
    /// publish step clears that destination's stored token.
    pub async fn crosspost(&self, request: &CrosspostRequest) -> CrosspostResult {
        let mut result = CrosspostResult::default();

        for target in &request.targets {
            match self.dispatch_to(target, &request.content).await {
                Ok(Some(post_id)) => {
                    info!(request_id = %request.id, "Posted to {}: {}", target, post_id);
                    result.record_success(target, post_id);
                }
                Ok(None) => {
                    debug!(request_id = %request.id, "{} is disabled or not configured", target);
                    result.record_skipped(target);
                }
                Err(e) => {
                    warn!(request_id = %request.id, "Cross-post to {} failed: {}", target, e);
                    if e.is_auth_expired() {
                        if let Err(clear_err) = self.store.clear_token(target).await {
                            warn!("Failed to clear {} token: {}", target, clear_err);
                        }
                    }
                    result.record_failure(target, e);
                }
            }
        }

        result
    }

    /// Drive the upload-then-publish sequence for one destination.
    ///
    /// `Ok(None)` means the destination was skipped (disabled, not
    /// configured, or unknown); errors are this destination's alone.
    async fn dispatch_to(
        &self,
        platform: &str,
        content: &PostContent,
    ) -> Result<Option<String>, DispatchError> {
        let Some(settings) = self.store.load(platform).await else {
            return Ok(None);
        };
        if !settings.enabled {
            return Ok(None);
        }
        if !settings.has_token() {
            return Err(DispatchError::AuthRequired {
                platform: platform.to_string(),
            });
        }

        let destination = match (self.factory)(platform, &settings, &self.http) {
            Some(Ok(destination)) => destination,
            Some(Err(e)) => return Err(e),
            None => {
                warn!("No destination implementation for {}", platform);
                return Ok(None);
            }
        };

        let media_ids = self.upload_media(destination.as_ref(), &content.media).await;
        let post_id = destination.publish(&content.text, &media_ids).await?;
        Ok(Some(post_id))
    }

    /// Upload each unique media item sequentially, collecting the ids
    /// the destination assigns. An item that cannot be resolved or
    /// uploaded is skipped; the publish proceeds with what succeeded.
    async fn upload_media(&self, destination: &dyn Destination, media: &[MediaItem]) -> Vec<String> {
        let mut media_ids = Vec::new();

        for item in unique_media(media) {
            let label = item
                .source_url
                .as_deref()
                .unwrap_or("<inline media>")
                .to_string();

            let resolved = match self.resolve_media(item).await {
                Ok(resolved) => resolved,
                Err(reason) => {
                    warn!("Skipping attachment {}: {}", label, reason);
                    continue;
                }
            };

            match destination.upload_media(&resolved).await {
                Ok(id) => {
                    debug!("Uploaded {} as {}", label, id);
                    media_ids.push(id);
                }
                Err(e) => warn!("Skipping attachment {}: upload failed: {}", label, e),
            }
        }

        media_ids
    }

    /// Resolve a media item to encoded bytes.
    ///
    /// Resolution order: inline bytes captured at submit time, then a
    /// live re-rasterization for transient in-page references, then a
    /// direct fetch of the source URL.
    async fn resolve_media(&self, item: &MediaItem) -> Result<ResolvedMedia, String> {
        if let Some(inline) = &item.inline {
            return Ok(ResolvedMedia {
                bytes: inline.bytes.clone(),
                mime: inline.mime,
                alt_text: item.alt_text.clone(),
            });
        }

        let source = item
            .source_url
            .as_deref()
            .ok_or_else(|| "no bytes and no source URL".to_string())?;

        if item.is_transient_source() {
            let bridge = self
                .bridge
                .as_ref()
                .ok_or_else(|| "transient reference and no page bridge".to_string())?;
            let image = bridge.rasterize(source).await.map_err(|e| e.to_string())?;
            return Ok(ResolvedMedia {
                bytes: image.bytes,
                mime: image.mime,
                alt_text: item.alt_text.clone(),
            });
        }

        let response = self
            .http
            .get(source)
            .send()
            .await
            .map_err(|e| e.to_string())?;
        if !response.status().is_success() {
            return Err(format!("fetch returned HTTP {}", response.status().as_u16()));
        }
        let mime = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .and_then(ImageMimeType::from_mime_str)
            .unwrap_or(ImageMimeType::Jpeg);
        let bytes = response.bytes().await.map_err(|e| e.to_string())?.to_vec();

        Ok(ResolvedMedia {
            bytes,
            mime,
            alt_text: item.alt_text.clone(),
        })
    }
}

//! Destination platform abstraction and implementations
//!
//! A destination is a remote service captured content is republished
//! to. Implementations handle authentication, media upload, and
//! publishing according to the destination API's requirements.

use async_trait::async_trait;

use crate::error::DispatchError;
use crate::settings::DestinationSettings;
use crate::types::ImageMimeType;

pub mod mastodon;

// Mock destination is available for all builds so integration tests
// can exercise the dispatcher without network access
pub mod mock;

/// A media item resolved to encoded bytes, ready for a multipart upload
#[derive(Debug, Clone)]
pub struct ResolvedMedia {
    pub bytes: Vec<u8>,
    pub mime: ImageMimeType,
    pub alt_text: String,
}

/// Unified interface to one destination platform.
///
/// Errors use the dispatch taxonomy: auth problems map to
/// `AuthRequired`/`AuthExpired`, HTTP-level rejections to
/// `Destination`, and network failures to `Transport`.
#[async_trait]
pub trait Destination: Send + Sync {
    /// Lowercase platform identifier (e.g. "mastodon")
    fn name(&self) -> &str;

    /// Validate the stored token against the destination.
    ///
    /// Optional pre-flight check; dispatching does not call this.
    async fn verify_credentials(&self) -> Result<(), DispatchError>;

    /// Upload one media item and return the destination-assigned id
    async fn upload_media(&self, media: &ResolvedMedia) -> Result<String, DispatchError>;

    /// Publish text plus previously uploaded media ids as one post and
    /// return the created post's id
    async fn publish(&self, text: &str, media_ids: &[String]) -> Result<String, DispatchError>;
}

/// Build the destination client for a platform name.
///
/// `None` means the platform is unknown; `Some(Err)` means the stored
/// settings cannot produce a usable client.
pub fn create_destination(
    platform: &str,
    settings: &DestinationSettings,
    http: &reqwest::Client,
) -> Option<Result<Box<dyn Destination>, DispatchError>> {
    match platform {
        "mastodon" => Some(
            mastodon::MastodonClient::new(http.clone(), &settings.instance, settings.token.clone())
                .map(|client| Box::new(client) as Box<dyn Destination>),
        ),
        _ => None,
    }
}

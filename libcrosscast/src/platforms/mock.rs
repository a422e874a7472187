//! Mock destination for testing
//!
//! A configurable destination that can simulate upload and publish
//! failures while recording every call, so dispatcher logic can be
//! verified without credentials or network access.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::error::DispatchError;
use crate::platforms::{Destination, ResolvedMedia};

/// Behavior and shared recorders for a mock destination
#[derive(Debug, Clone)]
pub struct MockConfig {
    /// Platform name (e.g. "mock-mastodon")
    pub name: String,

    /// Whether media uploads succeed
    pub upload_succeeds: bool,

    /// Error returned by publish, if any
    pub publish_error: Option<DispatchError>,

    /// Uploaded media, in upload order
    pub uploads: Arc<Mutex<Vec<ResolvedMedia>>>,

    /// Published posts as (text, media_ids) pairs
    pub published: Arc<Mutex<Vec<(String, Vec<String>)>>>,
}

impl MockConfig {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            upload_succeeds: true,
            publish_error: None,
            uploads: Arc::new(Mutex::new(Vec::new())),
            published: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn uploads(&self) -> Vec<ResolvedMedia> {
        self.uploads.lock().unwrap().clone()
    }

    pub fn published(&self) -> Vec<(String, Vec<String>)> {
        self.published.lock().unwrap().clone()
    }
}

pub struct MockDestination {
    config: MockConfig,
    media_counter: AtomicUsize,
}

impl MockDestination {
    pub fn new(config: MockConfig) -> Self {
        Self {
            config,
            media_counter: AtomicUsize::new(0),
        }
    }

    /// A destination where everything succeeds
    pub fn success(name: &str) -> Self {
        Self::new(MockConfig::new(name))
    }

    /// A destination whose uploads fail
    pub fn upload_failure(name: &str) -> Self {
        let mut config = MockConfig::new(name);
        config.upload_succeeds = false;
        Self::new(config)
    }

    /// A destination whose publish call fails with `error`
    pub fn publish_failure(name: &str, error: DispatchError) -> Self {
        let mut config = MockConfig::new(name);
        config.publish_error = Some(error);
        Self::new(config)
    }
}

#[async_trait]
impl Destination for MockDestination {
    fn name(&self) -> &str {
        &self.config.name
    }

    async fn verify_credentials(&self) -> Result<(), DispatchError> {
        Ok(())
    }

    async fn upload_media(&self, media: &ResolvedMedia) -> Result<String, DispatchError> {
        if !self.config.upload_succeeds {
            return Err(DispatchError::Destination {
                platform: self.config.name.clone(),
                status: 500,
                body: "mock upload failure".to_string(),
            });
        }
        self.config.uploads.lock().unwrap().push(media.clone());
        let n = self.media_counter.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(format!("{}-media-{}", self.config.name, n))
    }

    async fn publish(&self, text: &str, media_ids: &[String]) -> Result<String, DispatchError> {
        if let Some(error) = &self.config.publish_error {
            return Err(error.clone());
        }
        self.config
            .published
            .lock()
            .unwrap()
            .push((text.to_string(), media_ids.to_vec()));
        Ok(format!("{}-post-1", self.config.name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ImageMimeType;

    fn media(bytes: Vec<u8>) -> ResolvedMedia {
        ResolvedMedia {
            bytes,
            mime: ImageMimeType::Jpeg,
            alt_text: String::new(),
        }
    }

    #[tokio::test]
    async fn test_mock_records_uploads_and_publishes() {
        let config = MockConfig::new("mock");
        let destination = MockDestination::new(config.clone());

        let id1 = destination.upload_media(&media(vec![1])).await.unwrap();
        let id2 = destination.upload_media(&media(vec![2])).await.unwrap();
        assert_ne!(id1, id2);

        destination.publish("hello", &[id1.clone()]).await.unwrap();

        assert_eq!(config.uploads().len(), 2);
        assert_eq!(config.published(), vec![("hello".to_string(), vec![id1])]);
    }

    #[tokio::test]
    async fn test_mock_upload_failure() {
        let destination = MockDestination::upload_failure("mock");
        let result = destination.upload_media(&media(vec![1])).await;
        assert!(matches!(
            result,
            Err(DispatchError::Destination { status: 500, .. })
        ));
    }

    #[tokio::test]
    async fn test_mock_publish_failure() {
        let destination = MockDestination::publish_failure(
            "mock",
            DispatchError::AuthExpired {
                platform: "mock".to_string(),
                detail: "HTTP 403".to_string(),
            },
        );
        let result = destination.publish("hello", &[]).await;
        assert!(matches!(result, Err(DispatchError::AuthExpired { .. })));
    }
}

//! Page-context bridge
//!
//! The compose page lives in another process; this trait is the
//! request/response seam to it. It serves two calls: the current DOM
//! serialized as HTML, and rasterization of a media reference into
//! encoded JPEG bytes (the page context draws the rendered element to
//! a canvas, so even memory-only blob references resolve).

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use async_trait::async_trait;
use thiserror::Error;

use crate::types::{ImageMimeType, InlineImage};

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("failed to read page snapshot: {0}")]
    Snapshot(String),

    #[error("no rasterization available for {0}")]
    Unavailable(String),

    #[error("rasterization failed for {url}: {detail}")]
    Raster { url: String, detail: String },
}

#[async_trait]
pub trait PageBridge: Send + Sync {
    /// Current DOM of the compose page, serialized as HTML
    async fn snapshot(&self) -> Result<String, BridgeError>;

    /// Rasterize the media at `source_url` as it currently renders on
    /// the page and return the encoded bytes.
    async fn rasterize(&self, source_url: &str) -> Result<InlineImage, BridgeError>;
}

/// Filesystem-backed bridge.
///
/// A companion capture helper running next to the browser keeps a
/// snapshot file updated and drops rasterized media into a sidecar
/// directory, one file per source URL named by its SHA-256 hex digest
/// plus an image extension.
pub struct FsPageBridge {
    snapshot_path: PathBuf,
    raster_dir: Option<PathBuf>,
}

impl FsPageBridge {
    pub fn new(snapshot_path: impl Into<PathBuf>, raster_dir: Option<PathBuf>) -> Self {
        Self {
            snapshot_path: snapshot_path.into(),
            raster_dir,
        }
    }

    /// Sidecar file stem for a source URL
    pub fn raster_key(source_url: &str) -> String {
        crate::types::sha256_hex(source_url.as_bytes())
    }
}

#[async_trait]
impl PageBridge for FsPageBridge {
    async fn snapshot(&self) -> Result<String, BridgeError> {
        tokio::fs::read_to_string(&self.snapshot_path)
            .await
            .map_err(|e| BridgeError::Snapshot(format!("{:?}: {}", self.snapshot_path, e)))
    }

    async fn rasterize(&self, source_url: &str) -> Result<InlineImage, BridgeError> {
        let Some(dir) = &self.raster_dir else {
            return Err(BridgeError::Unavailable(source_url.to_string()));
        };

        let key = Self::raster_key(source_url);
        for ext in ["jpg", "jpeg", "png", "gif", "webp"] {
            let candidate = dir.join(format!("{}.{}", key, ext));
            match tokio::fs::read(&candidate).await {
                Ok(bytes) => {
                    // Extension list is fixed, so the lookup cannot fail
                    let mime = ImageMimeType::from_extension(ext)
                        .unwrap_or(ImageMimeType::Jpeg);
                    return Ok(InlineImage::new(mime, bytes));
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => {
                    return Err(BridgeError::Raster {
                        url: source_url.to_string(),
                        detail: e.to_string(),
                    })
                }
            }
        }

        Err(BridgeError::Unavailable(source_url.to_string()))
    }
}

/// Scripted bridge for tests: canned snapshot, canned rasterizations,
/// and a record of what was requested.
#[derive(Default)]
pub struct MockPageBridge {
    snapshot: Mutex<String>,
    rasters: Mutex<HashMap<String, InlineImage>>,
    raster_requests: Mutex<Vec<String>>,
}

impl MockPageBridge {
    pub fn new(snapshot: impl Into<String>) -> Self {
        Self {
            snapshot: Mutex::new(snapshot.into()),
            ..Default::default()
        }
    }

    pub fn set_snapshot(&self, snapshot: impl Into<String>) {
        *self.snapshot.lock().unwrap() = snapshot.into();
    }

    pub fn add_raster(&self, source_url: &str, image: InlineImage) {
        self.rasters
            .lock()
            .unwrap()
            .insert(source_url.to_string(), image);
    }

    /// Source URLs rasterization was requested for, in order
    pub fn raster_requests(&self) -> Vec<String> {
        self.raster_requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl PageBridge for MockPageBridge {
    async fn snapshot(&self) -> Result<String, BridgeError> {
        Ok(self.snapshot.lock().unwrap().clone())
    }

    async fn rasterize(&self, source_url: &str) -> Result<InlineImage, BridgeError> {
        self.raster_requests
            .lock()
            .unwrap()
            .push(source_url.to_string());
        self.rasters
            .lock()
            .unwrap()
            .get(source_url)
            .cloned()
            .ok_or_else(|| BridgeError::Unavailable(source_url.to_string()))
    }
}

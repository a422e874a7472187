//! Core types for Crosscast

use std::collections::{BTreeMap, BTreeSet, HashSet};

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::error::DispatchError;

// ============================================================================
// Media
// ============================================================================

/// Supported image MIME types for captured media
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ImageMimeType {
    Jpeg,
    Png,
    Gif,
    WebP,
}

impl ImageMimeType {
    /// Parse from a MIME string (e.g. "image/jpeg"); parameters after
    /// `;` are ignored so Content-Type header values work too.
    pub fn from_mime_str(s: &str) -> Option<Self> {
        let essence = s.split(';').next().unwrap_or(s).trim();
        match essence.to_lowercase().as_str() {
            "image/jpeg" | "image/jpg" => Some(Self::Jpeg),
            "image/png" => Some(Self::Png),
            "image/gif" => Some(Self::Gif),
            "image/webp" => Some(Self::WebP),
            _ => None,
        }
    }

    /// Detect MIME type from a file extension
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            "gif" => Some(Self::Gif),
            "webp" => Some(Self::WebP),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Gif => "image/gif",
            Self::WebP => "image/webp",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
            Self::Gif => "gif",
            Self::WebP => "webp",
        }
    }
}

impl std::fmt::Display for ImageMimeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Image bytes already materialized and encoded, as opposed to a
/// reference that still needs a fetch or rasterization step.
///
/// Serializes as a `data:` URI, the wire format the page bridge speaks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineImage {
    pub mime: ImageMimeType,
    pub bytes: Vec<u8>,
}

impl InlineImage {
    pub fn new(mime: ImageMimeType, bytes: Vec<u8>) -> Self {
        Self { mime, bytes }
    }

    /// Encode as a `data:<mime>;base64,<payload>` URI
    pub fn to_data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime, BASE64.encode(&self.bytes))
    }

    /// Decode a base64 `data:` URI
    pub fn from_data_uri(uri: &str) -> Result<Self, String> {
        let rest = uri
            .strip_prefix("data:")
            .ok_or_else(|| "not a data: URI".to_string())?;
        let (mime_part, payload) = rest
            .split_once(";base64,")
            .ok_or_else(|| "data: URI is not base64-encoded".to_string())?;
        let mime = ImageMimeType::from_mime_str(mime_part)
            .ok_or_else(|| format!("unsupported media type: {}", mime_part))?;
        let bytes = BASE64
            .decode(payload)
            .map_err(|e| format!("invalid base64 payload: {}", e))?;
        Ok(Self { mime, bytes })
    }

    /// Hex SHA-256 digest of the encoded bytes
    pub fn digest(&self) -> String {
        sha256_hex(&self.bytes)
    }
}

/// Hex-encode the SHA-256 of `data`
pub(crate) fn sha256_hex(data: &[u8]) -> String {
    let digest = Sha256::digest(data);
    let mut hex = String::with_capacity(digest.len() * 2);
    for byte in digest.iter() {
        use std::fmt::Write;
        let _ = write!(&mut hex, "{byte:02x}");
    }
    hex
}

impl Serialize for InlineImage {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_data_uri())
    }
}

impl<'de> Deserialize<'de> for InlineImage {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let uri = String::deserialize(deserializer)?;
        InlineImage::from_data_uri(&uri).map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
}

/// One media attachment captured from the compose area
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MediaItem {
    pub kind: MediaKind,
    /// Where the host page sourced the media from, when known
    pub source_url: Option<String>,
    #[serde(default)]
    pub alt_text: String,
    /// Encoded bytes rasterized at capture time, when available
    pub inline: Option<InlineImage>,
}

impl MediaItem {
    pub fn from_source(url: impl Into<String>, alt_text: impl Into<String>) -> Self {
        Self {
            kind: MediaKind::Image,
            source_url: Some(url.into()),
            alt_text: alt_text.into(),
            inline: None,
        }
    }

    pub fn from_inline(inline: InlineImage, alt_text: impl Into<String>) -> Self {
        Self {
            kind: MediaKind::Image,
            source_url: None,
            alt_text: alt_text.into(),
            inline: Some(inline),
        }
    }

    pub fn with_inline(mut self, inline: InlineImage) -> Self {
        self.inline = Some(inline);
        self
    }

    /// True when the source is a transient in-page reference that only
    /// the page context can resolve (a `blob:` object URL).
    pub fn is_transient_source(&self) -> bool {
        self.source_url
            .as_deref()
            .is_some_and(|url| url.starts_with("blob:"))
    }

    /// De-duplication key: inline bytes when present, else the source
    /// URL. Items with neither cannot be keyed (or resolved) and are
    /// left alone.
    pub fn dedupe_key(&self) -> Option<MediaKey> {
        if let Some(inline) = &self.inline {
            return Some(MediaKey::Digest(inline.digest()));
        }
        self.source_url.clone().map(MediaKey::Source)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MediaKey {
    Source(String),
    Digest(String),
}

/// Drop duplicate media items, first occurrence wins.
pub fn unique_media(items: &[MediaItem]) -> Vec<&MediaItem> {
    let mut seen = HashSet::new();
    items
        .iter()
        .filter(|item| match item.dedupe_key() {
            Some(key) => seen.insert(key),
            None => true,
        })
        .collect()
}

// ============================================================================
// Post content and cross-post requests
// ============================================================================

/// A normalized post captured from the compose area.
///
/// Immutable once handed to the dispatcher; discarded after one
/// cross-post attempt.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PostContent {
    pub text: String,
    pub media: Vec<MediaItem>,
    pub captured_at: chrono::DateTime<chrono::Utc>,
}

impl PostContent {
    /// Build a post payload. Returns `None` when the trimmed text is
    /// empty: an image-only draft is not captured (source behavior,
    /// kept as-is). Media is de-duplicated, first occurrence wins.
    pub fn new(text: impl Into<String>, media: Vec<MediaItem>) -> Option<Self> {
        let text = text.into().trim().to_string();
        if text.is_empty() {
            return None;
        }

        let mut seen = HashSet::new();
        let media = media
            .into_iter()
            .filter(|item| match item.dedupe_key() {
                Some(key) => seen.insert(key),
                None => true,
            })
            .collect();

        Some(Self {
            text,
            media,
            captured_at: chrono::Utc::now(),
        })
    }
}

/// One cross-post attempt. Transient, created per detected submit.
#[derive(Debug, Clone)]
pub struct CrosspostRequest {
    pub id: String,
    pub content: PostContent,
    pub targets: BTreeSet<String>,
}

impl CrosspostRequest {
    pub fn new(content: PostContent, targets: BTreeSet<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            content,
            targets,
        }
    }
}

// ============================================================================
// Results
// ============================================================================

/// Outcome of one destination within a cross-post attempt
#[derive(Debug, Clone)]
pub struct TargetOutcome {
    pub success: bool,
    pub post_id: Option<String>,
    pub error: Option<DispatchError>,
}

/// Per-destination outcomes for one cross-post attempt
#[derive(Debug, Clone, Default)]
pub struct CrosspostResult {
    pub per_target: BTreeMap<String, TargetOutcome>,
}

impl CrosspostResult {
    pub fn record_success(&mut self, platform: &str, post_id: String) {
        self.per_target.insert(
            platform.to_string(),
            TargetOutcome {
                success: true,
                post_id: Some(post_id),
                error: None,
            },
        );
    }

    /// Destination was targeted but disabled or not configured: a
    /// `false` entry with no error attached.
    pub fn record_skipped(&mut self, platform: &str) {
        self.per_target.insert(
            platform.to_string(),
            TargetOutcome {
                success: false,
                post_id: None,
                error: None,
            },
        );
    }

    pub fn record_failure(&mut self, platform: &str, error: DispatchError) {
        self.per_target.insert(
            platform.to_string(),
            TargetOutcome {
                success: false,
                post_id: None,
                error: Some(error),
            },
        );
    }

    /// Names of destinations that succeeded, in stable order
    pub fn succeeded(&self) -> Vec<&str> {
        self.per_target
            .iter()
            .filter(|(_, outcome)| outcome.success)
            .map(|(name, _)| name.as_str())
            .collect()
    }

    pub fn any_success(&self) -> bool {
        self.per_target.values().any(|outcome| outcome.success)
    }

    pub fn first_error(&self) -> Option<&DispatchError> {
        self.per_target
            .values()
            .find_map(|outcome| outcome.error.as_ref())
    }

    /// JSON rendering for CLI `--format json` output
    pub fn to_json(&self) -> serde_json::Value {
        let per_target: serde_json::Map<String, serde_json::Value> = self
            .per_target
            .iter()
            .map(|(name, outcome)| {
                (
                    name.clone(),
                    serde_json::json!({
                        "success": outcome.success,
                        "post_id": outcome.post_id,
                        "error": outcome.error.as_ref().map(|e| e.to_string()),
                    }),
                )
            })
            .collect();
        serde_json::json!({
            "success": self.any_success(),
            "results": per_target,
        })
    }
}

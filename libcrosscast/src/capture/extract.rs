//! Content extraction from compose-page snapshots
//!
//! `scan_compose` is the synchronous core: text plus media candidates
//! out of one parsed snapshot. `capture_content` layers the async
//! rasterization step on top and produces the normalized payload.

use std::collections::HashSet;

use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};

use crate::bridge::PageBridge;
use crate::capture::locator;
use crate::types::{MediaItem, PostContent};

/// A media reference found in the compose area, before resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaCandidate {
    pub source_url: String,
    pub alt_text: String,
}

/// Raw scan of one snapshot: draft text and media references
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposeScan {
    pub text: String,
    pub candidates: Vec<MediaCandidate>,
}

/// Scan a parsed snapshot for draft text and attached media.
///
/// Returns `None` when no compose field is rendered or the trimmed
/// draft text is empty; both are silent no-ops for the caller.
pub fn scan_compose(doc: &Html) -> Option<ComposeScan> {
    let compose_field = locator::locate_compose_field(doc)?;

    let text_field = locator::locate_text_field(doc)?;
    let text = extract_text(&text_field);
    if text.trim().is_empty() {
        debug!("Compose field present but draft text is empty");
        return None;
    }

    let candidates = scan_media(doc, compose_field);
    Some(ComposeScan {
        text: text.trim().to_string(),
        candidates,
    })
}

/// Capture the compose area of `html` as a normalized post payload.
///
/// Each media candidate is rasterized through the page bridge so the
/// bytes survive the page's transient blob references going away; a
/// candidate the bridge cannot rasterize is kept as a bare reference
/// for the dispatcher's resolution chain.
pub async fn capture_content(html: &str, bridge: &dyn PageBridge) -> Option<PostContent> {
    let scan = {
        let doc = Html::parse_document(html);
        scan_compose(&doc)?
    };

    let mut media = Vec::with_capacity(scan.candidates.len());
    for candidate in scan.candidates {
        let mut item = MediaItem::from_source(&candidate.source_url, &candidate.alt_text);
        match bridge.rasterize(&candidate.source_url).await {
            Ok(image) => item.inline = Some(image),
            Err(e) => {
                warn!(
                    "Could not rasterize {} at capture time: {}",
                    candidate.source_url, e
                );
            }
        }
        media.push(item);
    }

    PostContent::new(scan.text, media)
}

/// Pull the draft text out of the text field.
///
/// Rich-text block editors render one element per line; their
/// text-bearing blocks are concatenated in document order, joined by
/// newlines. Native text inputs just yield their text content.
fn extract_text(field: &ElementRef<'_>) -> String {
    if let Ok(blocks) = Selector::parse(r#"[data-text="true"]"#) {
        let lines: Vec<String> = field
            .select(&blocks)
            .map(|block| block.text().collect::<String>())
            .collect();
        if !lines.is_empty() {
            return lines.join("\n");
        }
    }

    field.text().collect::<Vec<_>>().join("")
}

/// Enumerate media references in the designated media region, falling
/// back to the compose area's parent when no region is rendered.
/// Duplicates are dropped, first occurrence wins.
fn scan_media(doc: &Html, compose_field: ElementRef<'_>) -> Vec<MediaCandidate> {
    let region = locator::locate_media_region(doc)
        .or_else(|| compose_field.parent().and_then(ElementRef::wrap))
        .unwrap_or_else(|| doc.root_element());

    let mut seen = HashSet::new();
    let mut candidates = Vec::new();

    if let Ok(images) = Selector::parse("img") {
        for img in region.select(&images) {
            let Some(src) = img.value().attr("src") else {
                continue;
            };
            // Sources that are already inline data are not enumerated
            if src.is_empty() || src.starts_with("data:") {
                continue;
            }
            if !seen.insert(src.to_string()) {
                debug!("Skipping duplicate media reference {}", src);
                continue;
            }
            candidates.push(MediaCandidate {
                source_url: src.to_string(),
                alt_text: img.value().attr("alt").unwrap_or_default().to_string(),
            });
        }
    }

    if let Ok(styled) = Selector::parse(r#"[style*="background-image"]"#) {
        for element in region.select(&styled) {
            let Some(style) = element.value().attr("style") else {
                continue;
            };
            let Some(url) = parse_css_background_url(style) else {
                continue;
            };
            if url.starts_with("data:") {
                continue;
            }
            if !seen.insert(url.to_string()) {
                debug!("Skipping duplicate background image {}", url);
                continue;
            }
            candidates.push(MediaCandidate {
                source_url: url.to_string(),
                alt_text: String::new(),
            });
        }
    }

    candidates
}

/// Extract the URL out of a `background-image: url(...)` declaration
fn parse_css_background_url(style: &str) -> Option<&str> {
    let start = style.find("url(")? + "url(".len();
    let rest = &style[start..];
    let end = rest.find(')')?;
    let url = rest[..end].trim().trim_matches(|c| c == '"' || c == '\'');
    if url.is_empty() {
        None
    } else {
        Some(url)
    }
}

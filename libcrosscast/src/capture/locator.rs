//! Element location against the compose page
//!
//! The host page is a third-party, versioned layout; every lookup is
//! an ordered list of selector strategies, tried top to bottom, first
//! match wins. `None` always means "not rendered yet", never an error.
//!
//! Lookup strategy tables:
//!
//! | Target         | Strategies (in priority order)                         |
//! |----------------|--------------------------------------------------------|
//! | compose field  | versioned `tweet*`/`post*` test ids, Draft.js editor, toolbar/attachment anchors |
//! | text field     | `tweetTextarea_0` / `postTextarea_0` / rich-text input container |
//! | submit control | exact compose-page button, versioned test ids, any button whose text says "post"/"tweet" |
//! | media region   | `attachments` container, toolbar                       |

use scraper::{ElementRef, Html, Selector};

/// Compose-area strategies, broadest set: any of these indicates the
/// composer is on screen.
pub const COMPOSE_FIELD_SELECTORS: &[&str] = &[
    r#"[data-testid="tweetTextarea_0"]"#,
    r#"[data-testid="postTextarea_0"]"#,
    r#"[data-testid="tweetBox"]"#,
    r#"[data-testid="postBox"]"#,
    r#"[data-testid="tweetTextarea"]"#,
    r#"[data-testid="postTextarea"]"#,
    r#"[data-testid="tweetBox"] textarea"#,
    r#"[data-testid="postBox"] textarea"#,
    ".public-DraftEditor-content",
    r#"[data-testid="tweetTextarea_0RichTextInputContainer"]"#,
    r#"[data-testid="tweetTextarea_0_label"]"#,
    r#"[data-testid="toolBar"]"#,
    r#"[data-testid="fileInput"]"#,
];

/// Elements that carry the draft text itself
pub const TEXT_FIELD_SELECTORS: &[&str] = &[
    r#"[data-testid="tweetTextarea_0"]"#,
    r#"[data-testid="postTextarea_0"]"#,
    r#"[data-testid="tweetTextarea_0RichTextInputContainer"]"#,
];

/// Submit button strategies; the exact compose-page shape comes first
pub const SUBMIT_CONTROL_SELECTORS: &[&str] = &[
    r#"button[data-testid="tweetButtonInline"][role="button"]"#,
    r#"[data-testid="tweetButtonInline"]"#,
    r#"[data-testid="postButtonInline"]"#,
    r#"[data-testid="tweetButton"]"#,
    r#"[data-testid="postButton"]"#,
];

/// Containers that hold attached media thumbnails
pub const MEDIA_REGION_SELECTORS: &[&str] = &[
    r#"[data-testid="attachments"]"#,
    r#"[data-testid="toolBar"]"#,
];

/// Last-resort submit match: button text containing one of these
const SUBMIT_TEXT_FALLBACKS: &[&str] = &["post", "tweet"];

fn first_match<'a>(doc: &'a Html, selectors: &[&str]) -> Option<ElementRef<'a>> {
    for raw in selectors {
        let Ok(selector) = Selector::parse(raw) else {
            continue;
        };
        if let Some(element) = doc.select(&selector).next() {
            return Some(element);
        }
    }
    None
}

/// Resolve the compose area, or `None` when it is not rendered yet
pub fn locate_compose_field(doc: &Html) -> Option<ElementRef<'_>> {
    first_match(doc, COMPOSE_FIELD_SELECTORS)
}

/// Resolve the element carrying the draft text
pub fn locate_text_field(doc: &Html) -> Option<ElementRef<'_>> {
    first_match(doc, TEXT_FIELD_SELECTORS)
}

/// Resolve the submit control, falling back to a button-text scan
pub fn locate_submit_control(doc: &Html) -> Option<ElementRef<'_>> {
    if let Some(button) = first_match(doc, SUBMIT_CONTROL_SELECTORS) {
        return Some(button);
    }

    let Ok(buttons) = Selector::parse("button") else {
        return None;
    };
    doc.select(&buttons).find(|button| {
        let text = button.text().collect::<String>().to_lowercase();
        SUBMIT_TEXT_FALLBACKS.iter().any(|word| text.contains(word))
    })
}

/// Resolve the media thumbnail container, if any
pub fn locate_media_region(doc: &Html) -> Option<ElementRef<'_>> {
    first_match(doc, MEDIA_REGION_SELECTORS)
}

/// Whether the submit control currently carries the `disabled` attribute
pub fn control_disabled(control: &ElementRef<'_>) -> bool {
    control.value().attr("disabled").is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compose_field_priority_order() {
        let html = Html::parse_document(
            r#"<html><body>
                <div data-testid="toolBar"></div>
                <div data-testid="tweetTextarea_0">draft</div>
            </body></html>"#,
        );
        let field = locate_compose_field(&html).unwrap();
        assert_eq!(field.value().attr("data-testid"), Some("tweetTextarea_0"));
    }

    #[test]
    fn test_compose_field_absent() {
        let html = Html::parse_document("<html><body><p>timeline</p></body></html>");
        assert!(locate_compose_field(&html).is_none());
    }

    #[test]
    fn test_compose_field_draft_editor_fallback() {
        let html = Html::parse_document(
            r#"<html><body><div class="public-DraftEditor-content"></div></body></html>"#,
        );
        assert!(locate_compose_field(&html).is_some());
    }

    #[test]
    fn test_submit_control_exact_compose_shape_first() {
        let html = Html::parse_document(
            r#"<html><body>
                <div data-testid="tweetButton">outer</div>
                <button data-testid="tweetButtonInline" role="button">Post</button>
            </body></html>"#,
        );
        let control = locate_submit_control(&html).unwrap();
        assert_eq!(control.value().name(), "button");
        assert_eq!(
            control.value().attr("data-testid"),
            Some("tweetButtonInline")
        );
    }

    #[test]
    fn test_submit_control_text_fallback() {
        let html = Html::parse_document(
            r#"<html><body>
                <button>Cancel</button>
                <button><span>Post now</span></button>
            </body></html>"#,
        );
        let control = locate_submit_control(&html).unwrap();
        assert!(control.text().collect::<String>().contains("Post now"));
    }

    #[test]
    fn test_submit_control_absent() {
        let html = Html::parse_document("<html><body><button>Cancel</button></body></html>");
        assert!(locate_submit_control(&html).is_none());
    }

    #[test]
    fn test_control_disabled_attribute() {
        let html = Html::parse_document(
            r#"<html><body>
                <button data-testid="tweetButtonInline" role="button" disabled>Post</button>
            </body></html>"#,
        );
        let control = locate_submit_control(&html).unwrap();
        assert!(control_disabled(&control));

        let html = Html::parse_document(
            r#"<html><body>
                <button data-testid="tweetButtonInline" role="button">Post</button>
            </body></html>"#,
        );
        let control = locate_submit_control(&html).unwrap();
        assert!(!control_disabled(&control));
    }

    #[test]
    fn test_media_region_fallback_to_toolbar() {
        let html = Html::parse_document(
            r#"<html><body><div data-testid="toolBar"></div></body></html>"#,
        );
        let region = locate_media_region(&html).unwrap();
        assert_eq!(region.value().attr("data-testid"), Some("toolBar"));

        let html = Html::parse_document(
            r#"<html><body>
                <div data-testid="attachments"></div>
                <div data-testid="toolBar"></div>
            </body></html>"#,
        );
        let region = locate_media_region(&html).unwrap();
        assert_eq!(region.value().attr("data-testid"), Some("attachments"));
    }
}

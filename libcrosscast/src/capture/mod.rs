//! Compose-page capture: element location and content extraction
//!
//! Everything here works against serialized DOM snapshots from the
//! page bridge. The host page replaces elements at will, so nothing is
//! cached across snapshots; callers re-locate every time.

pub mod extract;
pub mod locator;

pub use extract::{capture_content, scan_compose, ComposeScan, MediaCandidate};
pub use locator::{
    control_disabled, locate_compose_field, locate_media_region, locate_submit_control,
    locate_text_field,
};

//! Crosscast - republish compose-page drafts to the Fediverse
//!
//! This library captures a post being drafted on a social platform's
//! web page (via DOM snapshots from a page-context bridge) and
//! cross-posts it to Mastodon-compatible destinations.

pub mod bridge;
pub mod capture;
pub mod config;
pub mod detect;
pub mod dispatch;
pub mod error;
pub mod logging;
pub mod notify;
pub mod platforms;
pub mod settings;
pub mod types;
pub mod watcher;

// Re-export commonly used types
pub use config::Config;
pub use dispatch::Dispatcher;
pub use error::{CrosscastError, DispatchError, Result};
pub use notify::{LogNotifier, Notifier};
pub use settings::{DestinationSettings, SettingsStore, TomlSettingsStore};
pub use types::{CrosspostRequest, CrosspostResult, MediaItem, PostContent};
pub use watcher::{ComposeWatcher, WatcherConfig};

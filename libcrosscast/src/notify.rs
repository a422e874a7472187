//! User notification of cross-post outcomes
//!
//! Exactly one message per result: either the list of destinations
//! that succeeded, or a single failure line. Delivery must never
//! propagate errors back into the pipeline.

use tracing::{error, info, warn};

use crate::types::CrosspostResult;

/// One user-visible message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub message: String,
}

/// Render the one message a result produces
pub fn summarize(result: &CrosspostResult) -> Notification {
    let succeeded = result.succeeded();
    if succeeded.is_empty() {
        Notification {
            title: "Cross-post Failed".to_string(),
            message: "Failed to post to any platform. Please check your authentication settings."
                .to_string(),
        }
    } else {
        Notification {
            title: "Cross-post Successful".to_string(),
            message: format!("Successfully posted to {}", succeeded.join(" and ")),
        }
    }
}

pub trait Notifier: Send + Sync {
    /// Surface one result to the user. Must not panic; delivery
    /// problems are logged and swallowed.
    fn notify(&self, result: &CrosspostResult);
}

/// Notifier that writes through the logging pipeline
#[derive(Debug, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, result: &CrosspostResult) {
        let notification = summarize(result);
        if result.any_success() {
            info!("{}: {}", notification.title, notification.message);
        } else {
            warn!("{}: {}", notification.title, notification.message);
            for (target, outcome) in &result.per_target {
                if let Some(e) = &outcome.error {
                    error!("{}: {}", target, e);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DispatchError;

    #[test]
    fn test_summarize_single_success() {
        let mut result = CrosspostResult::default();
        result.record_success("mastodon", "123".to_string());

        let notification = summarize(&result);
        assert_eq!(notification.title, "Cross-post Successful");
        assert_eq!(notification.message, "Successfully posted to mastodon");
    }

    #[test]
    fn test_summarize_joins_multiple_successes() {
        let mut result = CrosspostResult::default();
        result.record_success("mastodon", "1".to_string());
        result.record_success("pixelfed", "2".to_string());

        let notification = summarize(&result);
        assert_eq!(
            notification.message,
            "Successfully posted to mastodon and pixelfed"
        );
    }

    #[test]
    fn test_summarize_failure() {
        let mut result = CrosspostResult::default();
        result.record_failure(
            "mastodon",
            DispatchError::Transport {
                platform: "mastodon".to_string(),
                detail: "offline".to_string(),
            },
        );

        let notification = summarize(&result);
        assert_eq!(notification.title, "Cross-post Failed");
        assert_eq!(
            notification.message,
            "Failed to post to any platform. Please check your authentication settings."
        );
    }

    #[test]
    fn test_summarize_all_skipped_is_failure() {
        let mut result = CrosspostResult::default();
        result.record_skipped("mastodon");

        let notification = summarize(&result);
        assert_eq!(notification.title, "Cross-post Failed");
    }

    #[test]
    fn test_mixed_result_reports_successes_only() {
        let mut result = CrosspostResult::default();
        result.record_success("mastodon", "1".to_string());
        result.record_failure(
            "pixelfed",
            DispatchError::Destination {
                platform: "pixelfed".to_string(),
                status: 500,
                body: String::new(),
            },
        );

        let notification = summarize(&result);
        assert_eq!(notification.message, "Successfully posted to mastodon");
    }

    #[test]
    fn test_log_notifier_never_panics() {
        LogNotifier.notify(&CrosspostResult::default());
    }
}

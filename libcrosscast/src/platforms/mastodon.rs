//! Mastodon destination
//!
//! Speaks the Mastodon REST API directly, which also covers Pleroma,
//! GoToSocial, and other Fediverse servers implementing the same
//! endpoints: `verify_credentials` for token checks, `/api/v2/media`
//! for uploads, `/api/v1/statuses` for publishing.

use async_trait::async_trait;
use reqwest::multipart;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::DispatchError;
use crate::platforms::{Destination, ResolvedMedia};

/// Instance used when the configured host is empty
pub const DEFAULT_INSTANCE: &str = "mastodon.social";

const PLATFORM: &str = "mastodon";

pub struct MastodonClient {
    http: reqwest::Client,
    base: Url,
    token: String,
}

#[derive(Deserialize)]
struct MediaResponse {
    id: String,
}

#[derive(Deserialize)]
struct StatusResponse {
    id: String,
}

#[derive(Serialize)]
struct StatusBody<'a> {
    status: &'a str,
    visibility: &'a str,
    language: &'a str,
    media_ids: &'a [String],
}

impl MastodonClient {
    /// Create a client for `instance` with a bearer `token`.
    ///
    /// Bare hosts get an `https://` prefix; an explicit `http://` is
    /// preserved so local instances work. An empty host falls back to
    /// [`DEFAULT_INSTANCE`].
    pub fn new(
        http: reqwest::Client,
        instance: &str,
        token: String,
    ) -> Result<Self, DispatchError> {
        let base = Url::parse(&format!("{}/", normalize_instance(instance))).map_err(|e| {
            DispatchError::Transport {
                platform: PLATFORM.to_string(),
                detail: format!("invalid instance URL {:?}: {}", instance, e),
            }
        })?;
        Ok(Self { http, base, token })
    }

    fn endpoint(&self, path: &str) -> Result<Url, DispatchError> {
        self.base.join(path).map_err(|e| DispatchError::Transport {
            platform: PLATFORM.to_string(),
            detail: format!("invalid endpoint {}: {}", path, e),
        })
    }

    fn transport(e: reqwest::Error) -> DispatchError {
        DispatchError::Transport {
            platform: PLATFORM.to_string(),
            detail: e.to_string(),
        }
    }

    /// Classify a non-success response: 401/403 means the token is no
    /// longer accepted, anything else is a destination error carrying
    /// status and body.
    async fn error_from_response(context: &str, response: reqwest::Response) -> DispatchError {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        if status == 401 || status == 403 {
            DispatchError::AuthExpired {
                platform: PLATFORM.to_string(),
                detail: format!("HTTP {} during {}: {}", status, context, body),
            }
        } else {
            DispatchError::Destination {
                platform: PLATFORM.to_string(),
                status,
                body,
            }
        }
    }
}

#[async_trait]
impl Destination for MastodonClient {
    fn name(&self) -> &str {
        PLATFORM
    }

    async fn verify_credentials(&self) -> Result<(), DispatchError> {
        let url = self.endpoint("api/v1/accounts/verify_credentials")?;
        let response = self
            .http
            .get(url)
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(Self::transport)?;

        if !response.status().is_success() {
            return Err(Self::error_from_response("verify credentials", response).await);
        }
        Ok(())
    }

    async fn upload_media(&self, media: &ResolvedMedia) -> Result<String, DispatchError> {
        let part = multipart::Part::bytes(media.bytes.clone())
            .file_name(format!("image.{}", media.mime.extension()))
            .mime_str(media.mime.as_str())
            .map_err(Self::transport)?;
        let mut form = multipart::Form::new().part("file", part);
        if !media.alt_text.is_empty() {
            form = form.text("description", media.alt_text.clone());
        }

        let url = self.endpoint("api/v2/media")?;
        let response = self
            .http
            .post(url)
            .bearer_auth(&self.token)
            .multipart(form)
            .send()
            .await
            .map_err(Self::transport)?;

        if !response.status().is_success() {
            return Err(Self::error_from_response("media upload", response).await);
        }

        let uploaded: MediaResponse = response.json().await.map_err(Self::transport)?;
        Ok(uploaded.id)
    }

    async fn publish(&self, text: &str, media_ids: &[String]) -> Result<String, DispatchError> {
        let body = StatusBody {
            status: text,
            visibility: "public",
            language: "en",
            media_ids,
        };

        let url = self.endpoint("api/v1/statuses")?;
        let response = self
            .http
            .post(url)
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await
            .map_err(Self::transport)?;

        if !response.status().is_success() {
            return Err(Self::error_from_response("publish", response).await);
        }

        let status: StatusResponse = response.json().await.map_err(Self::transport)?;
        Ok(status.id)
    }
}

/// Strip surrounding whitespace and trailing slashes; prepend
/// `https://` to bare hosts; keep an explicit scheme as-is.
fn normalize_instance(raw: &str) -> String {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return format!("https://{}", DEFAULT_INSTANCE);
    }
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_bare_host() {
        assert_eq!(normalize_instance("fosstodon.org"), "https://fosstodon.org");
    }

    #[test]
    fn test_normalize_keeps_explicit_scheme() {
        assert_eq!(
            normalize_instance("https://mastodon.social"),
            "https://mastodon.social"
        );
        assert_eq!(
            normalize_instance("http://localhost:3000"),
            "http://localhost:3000"
        );
    }

    #[test]
    fn test_normalize_empty_defaults_to_public_instance() {
        assert_eq!(normalize_instance(""), "https://mastodon.social");
        assert_eq!(normalize_instance("   "), "https://mastodon.social");
    }

    #[test]
    fn test_normalize_trims_trailing_slash() {
        assert_eq!(
            normalize_instance("mastodon.social/"),
            "https://mastodon.social"
        );
    }

    #[test]
    fn test_client_endpoints() {
        let client = MastodonClient::new(
            reqwest::Client::new(),
            "mastodon.social",
            "token".to_string(),
        )
        .unwrap();

        assert_eq!(client.name(), "mastodon");
        assert_eq!(
            client.endpoint("api/v1/statuses").unwrap().as_str(),
            "https://mastodon.social/api/v1/statuses"
        );
        assert_eq!(
            client.endpoint("api/v2/media").unwrap().as_str(),
            "https://mastodon.social/api/v2/media"
        );
    }

    #[test]
    fn test_client_rejects_garbage_instance() {
        let result = MastodonClient::new(
            reqwest::Client::new(),
            "https://not a host",
            "token".to_string(),
        );
        assert!(matches!(result, Err(DispatchError::Transport { .. })));
    }

    #[test]
    fn test_status_body_serialization() {
        let ids = vec!["123".to_string()];
        let body = StatusBody {
            status: "hello",
            visibility: "public",
            language: "en",
            media_ids: &ids,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["status"], "hello");
        assert_eq!(json["visibility"], "public");
        assert_eq!(json["language"], "en");
        assert_eq!(json["media_ids"], serde_json::json!(["123"]));
    }

    #[test]
    fn test_status_body_empty_media_ids() {
        let body = StatusBody {
            status: "text only",
            visibility: "public",
            language: "en",
            media_ids: &[],
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["media_ids"], serde_json::json!([]));
    }
}

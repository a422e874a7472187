//! Error types for Crosscast

use thiserror::Error;

pub type Result<T> = std::result::Result<T, CrosscastError>;

#[derive(Error, Debug)]
pub enum CrosscastError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Dispatch error: {0}")]
    Dispatch(#[from] DispatchError),

    #[error("Page bridge error: {0}")]
    Bridge(#[from] crate::bridge::BridgeError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl CrosscastError {
    /// Returns the appropriate exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CrosscastError::InvalidInput(_) => 3,
            CrosscastError::Dispatch(
                DispatchError::AuthRequired { .. } | DispatchError::AuthExpired { .. },
            ) => 2,
            CrosscastError::Dispatch(_) => 1,
            CrosscastError::Config(_) => 1,
            CrosscastError::Bridge(_) => 1,
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(std::io::Error),

    #[error("Failed to write config file: {0}")]
    WriteError(std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),

    #[error("Missing required field: {0}")]
    MissingField(String),
}

/// Failures while cross-posting to one destination.
///
/// Every variant is caught at that destination's boundary and recorded
/// in the result map; it never aborts sibling destinations.
#[derive(Error, Debug, Clone)]
pub enum DispatchError {
    /// Destination is enabled but no access token is stored.
    #[error("{platform} authentication required: no access token is stored")]
    AuthRequired { platform: String },

    /// The destination rejected the stored token (HTTP 401/403).
    /// The dispatcher clears the token so the user re-authorizes.
    #[error("{platform} authentication expired: {detail}")]
    AuthExpired { platform: String, detail: String },

    /// Any other non-success HTTP status from the destination.
    #[error("{platform} returned HTTP {status}: {body}")]
    Destination {
        platform: String,
        status: u16,
        body: String,
    },

    /// Network-level failure before an HTTP status was available.
    #[error("network error reaching {platform}: {detail}")]
    Transport { platform: String, detail: String },
}

impl DispatchError {
    /// Platform name this error is attributed to.
    pub fn platform(&self) -> &str {
        match self {
            DispatchError::AuthRequired { platform }
            | DispatchError::AuthExpired { platform, .. }
            | DispatchError::Destination { platform, .. }
            | DispatchError::Transport { platform, .. } => platform,
        }
    }

    /// True when the stored credential should be invalidated.
    pub fn is_auth_expired(&self) -> bool {
        matches!(self, DispatchError::AuthExpired { .. })
    }
}

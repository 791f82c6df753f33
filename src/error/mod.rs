//! Error types for playdeck.

use strum::Display;
use thiserror::Error;

/// Which playback SDK listener produced an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum SdkErrorKind {
    #[strum(serialize = "Player initialization failed")]
    Initialization,
    #[strum(serialize = "Authentication failed")]
    Authentication,
    #[strum(serialize = "Account error")]
    Account,
}

/// Broad classification used for logging and retry decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorCategory {
    Authentication,
    Device,
    Playback,
    Network,
    Server,
    Configuration,
    Serialization,
    Sdk,
    Unknown,
}

/// Primary error type for all playdeck operations.
#[derive(Error, Debug)]
pub enum PlaydeckError {
    #[error("Login required to play music")]
    AuthMissing,

    #[error("Player not initialized properly: no ready playback device")]
    DeviceMissing,

    #[error("Token refresh failed: {0}")]
    RefreshFailed(String),

    #[error("Failed to transfer playback, status: {status}")]
    TransferFailed { status: u16 },

    #[error("Failed to start playback: {status} {body}")]
    PlaybackRequestFailed { status: u16, body: String },

    #[error("{kind}: {message}")]
    SdkEvent { kind: SdkErrorKind, message: String },

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),
}

impl PlaydeckError {
    /// Create an API error from a status code and response body.
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// Classify this error into a category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::AuthMissing | Self::RefreshFailed(_) | Self::Authentication(_) => {
                ErrorCategory::Authentication
            }
            Self::DeviceMissing | Self::TransferFailed { .. } => ErrorCategory::Device,
            Self::PlaybackRequestFailed { .. } => ErrorCategory::Playback,
            Self::SdkEvent { .. } => ErrorCategory::Sdk,
            Self::Network(_) | Self::Io(_) => ErrorCategory::Network,
            Self::Configuration(_) => ErrorCategory::Configuration,
            Self::Serialization(_) => ErrorCategory::Serialization,
            Self::Api { status, .. } => match status {
                401 | 403 => ErrorCategory::Authentication,
                404 => ErrorCategory::Device,
                500..=599 => ErrorCategory::Server,
                _ => ErrorCategory::Playback,
            },
            Self::InvalidState(_) => ErrorCategory::Unknown,
        }
    }

    /// Whether a later attempt at the same call could succeed without user action.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.category(),
            ErrorCategory::Network | ErrorCategory::Server | ErrorCategory::Device
        )
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, PlaydeckError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn playback_failure_message_carries_status_and_body() {
        let err = PlaydeckError::PlaybackRequestFailed {
            status: 404,
            body: "Device not found".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Failed to start playback: 404 Device not found"
        );
        assert_eq!(err.category(), ErrorCategory::Playback);
    }

    #[test]
    fn sdk_event_message_uses_listener_prefix() {
        let err = PlaydeckError::SdkEvent {
            kind: SdkErrorKind::Account,
            message: "Premium required".to_string(),
        };
        assert_eq!(err.to_string(), "Account error: Premium required");
    }

    #[test]
    fn api_status_maps_to_category() {
        assert_eq!(
            PlaydeckError::api(401, "expired").category(),
            ErrorCategory::Authentication
        );
        assert_eq!(
            PlaydeckError::api(503, "down").category(),
            ErrorCategory::Server
        );
        assert!(PlaydeckError::api(502, "bad gateway").is_retryable());
        assert!(!PlaydeckError::AuthMissing.is_retryable());
    }
}

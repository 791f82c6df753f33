use thiserror::Error;

use crate::error::PlaydeckError;

/// Errors raised while talking to the provider token endpoint or reading
/// persisted credentials.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Not logged in")]
    NotLoggedIn,
    #[error("No refresh token available")]
    MissingRefreshToken,
    #[error("Client secret is not configured")]
    MissingClientSecret,
    #[error("Token endpoint returned status {status}: {body}")]
    Upstream { status: u16, body: String },
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
    #[error("Network error: {0}")]
    Network(String),
    #[error("IO error: {0}")]
    Io(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<reqwest::Error> for AuthError {
    fn from(error: reqwest::Error) -> Self {
        Self::Network(error.to_string())
    }
}

impl From<std::io::Error> for AuthError {
    fn from(error: std::io::Error) -> Self {
        Self::Io(error.to_string())
    }
}

impl From<serde_json::Error> for AuthError {
    fn from(error: serde_json::Error) -> Self {
        Self::Serialization(error.to_string())
    }
}

impl From<toml::de::Error> for AuthError {
    fn from(error: toml::de::Error) -> Self {
        Self::Serialization(error.to_string())
    }
}

impl From<toml::ser::Error> for AuthError {
    fn from(error: toml::ser::Error) -> Self {
        Self::Serialization(error.to_string())
    }
}

impl From<AuthError> for PlaydeckError {
    fn from(error: AuthError) -> Self {
        match error {
            AuthError::NotLoggedIn => PlaydeckError::AuthMissing,
            AuthError::MissingClientSecret => PlaydeckError::Configuration(error.to_string()),
            other => PlaydeckError::Authentication(other.to_string()),
        }
    }
}

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::error::AuthError;

/// Safety margin applied when deciding whether a token is expired.
pub const DEFAULT_EXPIRY_SKEW_MS: i64 = 60_000;

pub fn default_expiry_skew() -> Duration {
    Duration::milliseconds(DEFAULT_EXPIRY_SKEW_MS)
}

/// OAuth access token held for the provider.
///
/// `expires_at` is always an absolute instant; `expires_in` from the token
/// endpoint is converted on receipt.
///
/// # Example
/// ```
/// use chrono::{Duration, Utc};
/// use playdeck::auth::Token;
///
/// let token = Token::new("access", Some("refresh".to_string()), Utc::now() + Duration::hours(1));
/// assert!(!token.is_expired_at(Utc::now(), playdeck::auth::token::default_expiry_skew()));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub last_refresh: Option<DateTime<Utc>>,
    pub scopes: Option<Vec<String>>,
}

impl Token {
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: Option<String>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token,
            expires_at,
            last_refresh: None,
            scopes: None,
        }
    }

    /// True iff `now > expires_at - skew`.
    pub fn is_expired_at(&self, now: DateTime<Utc>, skew: Duration) -> bool {
        match self.expires_at.checked_sub_signed(skew) {
            Some(deadline) => now > deadline,
            None => true,
        }
    }

    /// First characters of the access token, for log lines.
    pub fn redacted(&self) -> String {
        let prefix: String = self.access_token.chars().take(5).collect();
        format!("{prefix}...")
    }

    /// Build a token from a token-endpoint response received at `received_at`.
    ///
    /// Fails when `expires_in` is not a positive number of seconds that
    /// lands inside the representable date range.
    pub fn from_response(payload: TokenResponse, received_at: DateTime<Utc>) -> Result<Self, AuthError> {
        let expires_at = expiry_after(received_at, payload.expires_in).ok_or_else(|| {
            AuthError::InvalidResponse(format!("unusable expires_in: {}", payload.expires_in))
        })?;
        Ok(Self {
            access_token: payload.access_token,
            refresh_token: payload.refresh_token,
            expires_at,
            last_refresh: Some(received_at),
            scopes: payload
                .scope
                .map(|s| s.split_whitespace().map(str::to_string).collect()),
        })
    }
}

/// `received_at + expires_in` seconds, or `None` for a non-positive or
/// out-of-range lifetime.
pub fn expiry_after(received_at: DateTime<Utc>, expires_in: i64) -> Option<DateTime<Utc>> {
    if expires_in <= 0 {
        return None;
    }
    received_at.checked_add_signed(Duration::try_seconds(expires_in)?)
}

/// JSON body returned by the provider token endpoint.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub expires_in: i64,
    #[serde(default)]
    pub scope: Option<String>,
}

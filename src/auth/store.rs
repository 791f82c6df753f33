//! The live token held by a session.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use crate::error::{PlaydeckError, Result};

use super::error::AuthError;
use super::exchange::TokenExchange;
use super::token::{default_expiry_skew, Token};

/// Anything able to hand out a bearer token for the playback device.
///
/// This is the token-supplier callback the playback SDK is constructed with.
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn bearer_token(&self) -> Option<String>;
}

/// Holds the current access token, its expiry and the refresh token.
///
/// Clones share the same token. A refresh swaps the whole [`Token`] at once,
/// so readers never observe a new access token paired with an old expiry.
#[derive(Clone)]
pub struct TokenStore {
    exchange: Option<TokenExchange>,
    current: Arc<RwLock<Option<Token>>>,
    skew: Duration,
}

impl std::fmt::Debug for TokenStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenStore")
            .field("exchange", &self.exchange.as_ref().map(|_| ".."))
            .field("has_token", &self.current().is_some())
            .field("skew", &self.skew)
            .finish()
    }
}

impl TokenStore {
    /// A store that can refresh through `exchange`.
    pub fn new(exchange: TokenExchange) -> Self {
        Self {
            exchange: Some(exchange),
            current: Arc::new(RwLock::new(None)),
            skew: default_expiry_skew(),
        }
    }

    /// A store without refresh capability (e.g. an implicit-grant token).
    pub fn without_refresh() -> Self {
        Self {
            exchange: None,
            current: Arc::new(RwLock::new(None)),
            skew: default_expiry_skew(),
        }
    }

    pub fn with_token(self, token: Token) -> Self {
        self.set(token);
        self
    }

    pub fn with_skew(mut self, skew: Duration) -> Self {
        self.skew = skew;
        self
    }

    pub fn skew(&self) -> Duration {
        self.skew
    }

    pub fn set(&self, token: Token) {
        let mut guard = self.current.write().unwrap_or_else(|p| p.into_inner());
        *guard = Some(token);
    }

    pub fn clear(&self) {
        let mut guard = self.current.write().unwrap_or_else(|p| p.into_inner());
        *guard = None;
    }

    pub fn current(&self) -> Option<Token> {
        self.current
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }

    pub fn access_token(&self) -> Option<String> {
        self.current().map(|t| t.access_token)
    }

    pub fn has_token(&self) -> bool {
        self.current().is_some()
    }

    pub fn has_refresh_token(&self) -> bool {
        self.current()
            .and_then(|t| t.refresh_token)
            .is_some_and(|r| !r.is_empty())
    }

    /// True iff `now > expires_at - skew`; false when no token is held.
    pub fn is_expired(&self, now: DateTime<Utc>, skew: Duration) -> bool {
        self.current()
            .map(|t| t.is_expired_at(now, skew))
            .unwrap_or(false)
    }

    /// [`is_expired`](Self::is_expired) at the current time with the store's skew.
    pub fn is_expired_now(&self) -> bool {
        self.is_expired(Utc::now(), self.skew)
    }

    /// Exchange the stored refresh token for a new access token.
    ///
    /// On success every field is replaced and the new token returned. On
    /// failure the stored token is left as it was and `RefreshFailed` is
    /// returned; callers decide whether to carry on with the old token.
    pub async fn refresh(&self) -> Result<Token> {
        let exchange = self.exchange.as_ref().ok_or_else(|| {
            PlaydeckError::RefreshFailed("no token endpoint configured".to_string())
        })?;
        let previous = self.current().ok_or(PlaydeckError::AuthMissing)?;
        let refresh_token = previous
            .refresh_token
            .clone()
            .filter(|r| !r.is_empty())
            .ok_or_else(|| PlaydeckError::RefreshFailed(AuthError::MissingRefreshToken.to_string()))?;

        let mut fresh = exchange
            .refresh(&refresh_token)
            .await
            .map_err(|e| PlaydeckError::RefreshFailed(e.to_string()))?;
        if fresh.refresh_token.is_none() {
            fresh.refresh_token = Some(refresh_token);
        }

        self.set(fresh.clone());
        tracing::info!(
            token = %fresh.redacted(),
            expires_at = %fresh.expires_at,
            "Access token refreshed"
        );
        Ok(fresh)
    }

    /// Token for the playback device: refresh first when expired, and fall
    /// back to the existing token if that refresh fails.
    pub async fn valid_access_token(&self) -> Option<String> {
        if self.is_expired_now() && self.has_refresh_token() {
            if let Err(e) = self.refresh().await {
                tracing::warn!(error = %e, "Failed to refresh token for playback device, using existing token");
            }
        }
        self.access_token()
    }
}

#[async_trait]
impl TokenSource for TokenStore {
    async fn bearer_token(&self) -> Option<String> {
        self.valid_access_token().await
    }
}

//! Client for the provider token endpoint.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::Utc;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use strum::{Display, IntoStaticStr};

use crate::config::PlaydeckConfig;

use super::error::AuthError;
use super::token::{Token, TokenResponse};

/// OAuth grant types accepted by the token endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Grant {
    ClientCredentials,
    AuthorizationCode { code: String, redirect_uri: String },
    RefreshToken { refresh_token: String },
}

#[derive(Debug, Clone, Copy, Display, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
enum GrantType {
    ClientCredentials,
    AuthorizationCode,
    RefreshToken,
}

impl Grant {
    fn grant_type(&self) -> GrantType {
        match self {
            Grant::ClientCredentials => GrantType::ClientCredentials,
            Grant::AuthorizationCode { .. } => GrantType::AuthorizationCode,
            Grant::RefreshToken { .. } => GrantType::RefreshToken,
        }
    }

    fn form(&self) -> Vec<(&'static str, &str)> {
        let grant_type: &'static str = self.grant_type().into();
        let mut form = vec![("grant_type", grant_type)];
        match self {
            Grant::ClientCredentials => {}
            Grant::AuthorizationCode { code, redirect_uri } => {
                form.push(("code", code.as_str()));
                form.push(("redirect_uri", redirect_uri.as_str()));
            }
            Grant::RefreshToken { refresh_token } => {
                form.push(("refresh_token", refresh_token.as_str()));
            }
        }
        form
    }
}

/// Stateless token-endpoint client authenticated with the app credentials.
///
/// # Example
/// ```no_run
/// use playdeck::auth::TokenExchange;
///
/// # async fn example() -> Result<(), playdeck::auth::AuthError> {
/// let exchange = TokenExchange::new("client-id", "client-secret")
///     .with_token_url("https://accounts.spotify.com/api/token");
/// let token = exchange.client_credentials().await?;
/// println!("{}", token.redacted());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct TokenExchange {
    client: reqwest::Client,
    client_id: String,
    client_secret: String,
    token_url: String,
    redirect_uri: String,
}

impl TokenExchange {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        let config = PlaydeckConfig::default();
        Self {
            client: crate::provider::http::shared_client().clone(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            token_url: config.token_url(),
            redirect_uri: config.redirect_uri,
        }
    }

    /// Build from configuration; fails if the client secret is absent.
    pub fn from_config(config: &PlaydeckConfig) -> Result<Self, AuthError> {
        let secret = config
            .client_secret
            .clone()
            .ok_or(AuthError::MissingClientSecret)?;
        Ok(Self::new(config.client_id.clone(), secret)
            .with_token_url(config.token_url())
            .with_redirect_uri(config.redirect_uri.clone()))
    }

    pub fn with_token_url(mut self, url: impl Into<String>) -> Self {
        self.token_url = url.into();
        self
    }

    pub fn with_redirect_uri(mut self, uri: impl Into<String>) -> Self {
        self.redirect_uri = uri.into();
        self
    }

    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    pub fn redirect_uri(&self) -> &str {
        &self.redirect_uri
    }

    /// `Basic base64(client_id:client_secret)`.
    pub fn basic_credentials(&self) -> String {
        let raw = format!("{}:{}", self.client_id, self.client_secret);
        format!("Basic {}", STANDARD.encode(raw))
    }

    /// App-only token (no user context, no refresh token).
    pub async fn client_credentials(&self) -> Result<Token, AuthError> {
        self.exchange(&Grant::ClientCredentials).await
    }

    /// Trade an authorization code for a user token.
    pub async fn authorization_code(&self, code: &str) -> Result<Token, AuthError> {
        self.exchange(&Grant::AuthorizationCode {
            code: code.to_string(),
            redirect_uri: self.redirect_uri.clone(),
        })
        .await
    }

    /// Trade a refresh token for a fresh access token.
    pub async fn refresh(&self, refresh_token: &str) -> Result<Token, AuthError> {
        self.exchange(&Grant::RefreshToken {
            refresh_token: refresh_token.to_string(),
        })
        .await
    }

    /// Run a grant and convert the response into a [`Token`].
    pub async fn exchange(&self, grant: &Grant) -> Result<Token, AuthError> {
        let value = self.exchange_raw(grant).await?;
        let payload: TokenResponse = serde_json::from_value(value)
            .map_err(|e| AuthError::InvalidResponse(e.to_string()))?;
        Token::from_response(payload, Utc::now())
    }

    /// Run a grant and return the provider JSON untouched.
    pub async fn exchange_raw(&self, grant: &Grant) -> Result<serde_json::Value, AuthError> {
        let grant_type = grant.grant_type();
        tracing::debug!(grant_type = %grant_type, url = %self.token_url, "Requesting token");

        let resp = self
            .client
            .post(&self.token_url)
            .header(AUTHORIZATION, self.basic_credentials())
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .form(&grant.form())
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            tracing::error!(grant_type = %grant_type, status = status.as_u16(), %body, "Token request failed");
            return Err(AuthError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        Ok(resp.json().await?)
    }
}

//! Token proxy: forwards authorization codes and refresh tokens to the
//! provider token endpoint using the server-side client secret.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info};

use crate::auth::{AuthError, Grant, TokenExchange};

#[derive(Debug, Clone)]
pub struct ProxyState {
    exchange: TokenExchange,
}

/// Routes: `POST /api/spotify/token` and `POST /api/spotify/refresh`.
pub fn router(exchange: TokenExchange) -> Router {
    Router::new()
        .route("/api/spotify/token", post(exchange_code))
        .route("/api/spotify/refresh", post(refresh_token))
        .with_state(ProxyState { exchange })
}

/// Bind `addr` and serve the proxy until the process stops.
pub async fn serve(exchange: TokenExchange, addr: std::net::SocketAddr) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "Token proxy listening");
    axum::serve(listener, router(exchange)).await
}

#[derive(Debug, Default, Deserialize)]
pub struct CodeRequest {
    #[serde(default)]
    pub code: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RefreshRequest {
    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// Error reply mirroring the status the provider gave us.
#[derive(Debug)]
pub struct ProxyError {
    status: StatusCode,
    message: String,
}

impl ProxyError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    fn from_auth(err: AuthError, upstream_message: &str, network_message: &str) -> Self {
        match err {
            AuthError::Upstream { status, body } => {
                error!(status, %body, "{upstream_message}");
                let status =
                    StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
                Self::new(status, upstream_message)
            }
            other => {
                error!(error = %other, "{network_message}");
                Self::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("{network_message}: {other}"),
                )
            }
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let body = json!({
            "statusCode": self.status.as_u16(),
            "statusMessage": self.message,
        });
        (self.status, Json(body)).into_response()
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

async fn exchange_code(
    State(state): State<ProxyState>,
    Json(req): Json<CodeRequest>,
) -> Result<Json<serde_json::Value>, ProxyError> {
    let code = non_empty(req.code)
        .ok_or_else(|| ProxyError::new(StatusCode::BAD_REQUEST, "Code is required"))?;

    let grant = Grant::AuthorizationCode {
        code,
        redirect_uri: state.exchange.redirect_uri().to_string(),
    };
    let data = state.exchange.exchange_raw(&grant).await.map_err(|e| {
        ProxyError::from_auth(e, "Failed to fetch token from Spotify", "Failed to fetch token")
    })?;
    Ok(Json(data))
}

async fn refresh_token(
    State(state): State<ProxyState>,
    Json(req): Json<RefreshRequest>,
) -> Result<Json<serde_json::Value>, ProxyError> {
    let refresh_token = non_empty(req.refresh_token)
        .ok_or_else(|| ProxyError::new(StatusCode::BAD_REQUEST, "Refresh token is required"))?;

    let grant = Grant::RefreshToken { refresh_token };
    let data = state.exchange.exchange_raw(&grant).await.map_err(|e| {
        ProxyError::from_auth(
            e,
            "Failed to refresh token from Spotify",
            "Failed to refresh token",
        )
    })?;
    Ok(Json(data))
}

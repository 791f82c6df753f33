//! Shared HTTP client and bearer-auth helpers.

use std::sync::OnceLock;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};

use crate::error::PlaydeckError;

static SHARED_CLIENT: OnceLock<reqwest::Client> = OnceLock::new();

/// Get (or create) the shared reqwest client.
pub fn shared_client() -> &'static reqwest::Client {
    SHARED_CLIENT.get_or_init(|| {
        reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .pool_max_idle_per_host(10)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Falling back to default HTTP client");
                reqwest::Client::new()
            })
    })
}

/// Build default headers for a Bearer-token API.
pub fn bearer_headers(access_token: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    if let Ok(val) = HeaderValue::from_str(&format!("Bearer {access_token}")) {
        headers.insert(AUTHORIZATION, val);
    }
    headers
}

/// Map a failed HTTP status to an error. A 403 stays an `Api` error so
/// account restrictions can be told apart from a rejected token.
pub fn status_to_error(status: u16, body: &str) -> PlaydeckError {
    match status {
        401 => PlaydeckError::Authentication(error_message(body)),
        _ => PlaydeckError::api(status, error_message(body)),
    }
}

/// Pull `error.message` out of a provider error body, or return it as-is.
pub fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .and_then(|e| e.get("message").or(Some(e)))
                .and_then(|m| m.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bearer_headers_include_token() {
        let headers = bearer_headers("abc");
        assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Bearer abc");
        assert_eq!(headers.get(CONTENT_TYPE).unwrap(), "application/json");
    }

    #[test]
    fn error_message_reads_nested_and_flat_shapes() {
        assert_eq!(
            error_message(r#"{"error":{"status":404,"message":"Device not found"}}"#),
            "Device not found"
        );
        assert_eq!(error_message(r#"{"error":"invalid_grant"}"#), "invalid_grant");
        assert_eq!(error_message("plain"), "plain");
    }

    #[test]
    fn auth_statuses_map_to_authentication() {
        assert!(matches!(
            status_to_error(401, "expired"),
            PlaydeckError::Authentication(_)
        ));
        let forbidden = status_to_error(403, r#"{"error":{"message":"Premium required"}}"#);
        assert!(matches!(forbidden, PlaydeckError::Api { status: 403, .. }));
        assert_eq!(forbidden.category(), crate::error::ErrorCategory::Authentication);
        assert!(matches!(
            status_to_error(502, "bad gateway"),
            PlaydeckError::Api { status: 502, .. }
        ));
    }
}

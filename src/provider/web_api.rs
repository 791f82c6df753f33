//! Typed client for the provider playback REST surface (`/me/player`).

use reqwest::Method;
use serde_json::json;
use tracing::debug;

use crate::config::DEFAULT_API_BASE_URL;
use crate::error::Result;

use super::http::{bearer_headers, shared_client, status_to_error};
use super::model::{DeviceInfo, DeviceList, PlayTarget, PlayerStatus};

/// Raw outcome of a play request; the controller decides what a status means.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayResponse {
    pub status: u16,
    pub body: String,
}

impl PlayResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[derive(Debug, Clone)]
pub struct PlayerApi {
    client: reqwest::Client,
    base_url: String,
}

impl Default for PlayerApi {
    fn default() -> Self {
        Self::new(DEFAULT_API_BASE_URL)
    }
}

impl PlayerApi {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: shared_client().clone(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// `PUT /me/player` with `{device_ids:[id], play}`. Returns the raw status.
    pub async fn transfer(&self, token: &str, device_id: &str, play: bool) -> Result<u16> {
        debug!(device_id, play, "Transferring playback");
        let resp = self
            .client
            .put(self.url("/me/player"))
            .headers(bearer_headers(token))
            .json(&json!({ "device_ids": [device_id], "play": play }))
            .send()
            .await?;
        Ok(resp.status().as_u16())
    }

    /// `PUT /me/player/play?device_id=…` with a `uris` or `context_uri` body.
    pub async fn start_playback(
        &self,
        token: &str,
        device_id: &str,
        target: &PlayTarget,
    ) -> Result<PlayResponse> {
        debug!(device_id, ?target, "Starting playback");
        let resp = self
            .client
            .put(self.url("/me/player/play"))
            .query(&[("device_id", device_id)])
            .headers(bearer_headers(token))
            .json(&target.body())
            .send()
            .await?;
        let status = resp.status().as_u16();
        let body = resp.text().await.unwrap_or_default();
        Ok(PlayResponse { status, body })
    }

    /// `GET /me/player`; `None` when the provider answers 204 (no session).
    pub async fn current_playback(&self, token: &str) -> Result<Option<PlayerStatus>> {
        let resp = self
            .client
            .get(self.url("/me/player"))
            .headers(bearer_headers(token))
            .send()
            .await?;

        let status = resp.status().as_u16();
        if status == 204 {
            return Ok(None);
        }
        if !(200..300).contains(&status) {
            let body = resp.text().await.unwrap_or_default();
            return Err(status_to_error(status, &body));
        }

        let text = resp.text().await?;
        if text.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(serde_json::from_str(&text)?))
    }

    /// `GET /me/player/devices`.
    pub async fn devices(&self, token: &str) -> Result<Vec<DeviceInfo>> {
        let resp = self
            .client
            .get(self.url("/me/player/devices"))
            .headers(bearer_headers(token))
            .send()
            .await?;
        let status = resp.status().as_u16();
        if status != 200 {
            let body = resp.text().await.unwrap_or_default();
            return Err(status_to_error(status, &body));
        }
        let list: DeviceList = resp.json().await?;
        Ok(list.devices)
    }

    pub async fn pause(&self, token: &str, device_id: Option<&str>) -> Result<()> {
        self.command(Method::PUT, "/me/player/pause", token, device_id, &[])
            .await
    }

    /// Resume the current context (`PUT /me/player/play` without a body).
    pub async fn resume(&self, token: &str, device_id: Option<&str>) -> Result<()> {
        self.command(Method::PUT, "/me/player/play", token, device_id, &[])
            .await
    }

    pub async fn next(&self, token: &str, device_id: Option<&str>) -> Result<()> {
        self.command(Method::POST, "/me/player/next", token, device_id, &[])
            .await
    }

    pub async fn previous(&self, token: &str, device_id: Option<&str>) -> Result<()> {
        self.command(Method::POST, "/me/player/previous", token, device_id, &[])
            .await
    }

    pub async fn seek(&self, token: &str, position_ms: u64, device_id: Option<&str>) -> Result<()> {
        let position = position_ms.to_string();
        self.command(
            Method::PUT,
            "/me/player/seek",
            token,
            device_id,
            &[("position_ms", position.as_str())],
        )
        .await
    }

    /// `percent` is clamped to 0..=100.
    pub async fn set_volume(&self, token: &str, percent: u8, device_id: Option<&str>) -> Result<()> {
        let percent = percent.min(100).to_string();
        self.command(
            Method::PUT,
            "/me/player/volume",
            token,
            device_id,
            &[("volume_percent", percent.as_str())],
        )
        .await
    }

    async fn command(
        &self,
        method: Method,
        path: &str,
        token: &str,
        device_id: Option<&str>,
        params: &[(&str, &str)],
    ) -> Result<()> {
        let mut query: Vec<(&str, &str)> = params.to_vec();
        if let Some(id) = device_id {
            query.push(("device_id", id));
        }

        debug!(%method, path, "Player command");
        let resp = self
            .client
            .request(method, self.url(path))
            .query(&query)
            .headers(bearer_headers(token))
            .header(reqwest::header::CONTENT_LENGTH, "0")
            .send()
            .await?;

        let status = resp.status().as_u16();
        if !(200..300).contains(&status) {
            let body = resp.text().await.unwrap_or_default();
            return Err(status_to_error(status, &body));
        }
        Ok(())
    }
}

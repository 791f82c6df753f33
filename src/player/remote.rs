//! A [`PlaybackDevice`] that drives an existing Connect device through the
//! Web API.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::auth::TokenSource;
use crate::config::PlaydeckConfig;
use crate::error::{PlaydeckError, Result};
use crate::provider::PlayerApi;

use super::sdk::{PlaybackDevice, PlayerEvent};

/// Locates the device named in the configuration on `connect` and reports
/// it ready. Transport commands go to `/me/player/*` scoped to that device.
pub struct WebApiDevice {
    name: String,
    api: PlayerApi,
    tokens: Arc<dyn TokenSource>,
    initial_volume: f32,
    device_id: Mutex<Option<String>>,
    events: Mutex<Option<mpsc::Sender<PlayerEvent>>>,
}

impl std::fmt::Debug for WebApiDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebApiDevice")
            .field("name", &self.name)
            .field("api", &self.api.base_url())
            .field("device_id", &self.device_id())
            .finish()
    }
}

impl WebApiDevice {
    pub fn new(
        name: impl Into<String>,
        api: PlayerApi,
        tokens: Arc<dyn TokenSource>,
        initial_volume: f32,
    ) -> Self {
        Self {
            name: name.into(),
            api,
            tokens,
            initial_volume: initial_volume.clamp(0.0, 1.0),
            device_id: Mutex::new(None),
            events: Mutex::new(None),
        }
    }

    pub fn from_config(config: &PlaydeckConfig, tokens: impl TokenSource + 'static) -> Self {
        Self::new(
            config.device_name.clone(),
            PlayerApi::new(config.api_base_url.clone()),
            Arc::new(tokens),
            config.initial_volume,
        )
    }

    pub fn device_id(&self) -> Option<String> {
        self.device_id
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }

    async fn token(&self) -> Result<String> {
        self.tokens
            .bearer_token()
            .await
            .ok_or(PlaydeckError::AuthMissing)
    }

    async fn emit(events: &mpsc::Sender<PlayerEvent>, event: PlayerEvent) {
        if events.send(event).await.is_err() {
            debug!("Player event receiver dropped");
        }
    }
}

fn volume_percent(volume: f32) -> u8 {
    (volume.clamp(0.0, 1.0) * 100.0).round() as u8
}

#[async_trait]
impl PlaybackDevice for WebApiDevice {
    fn name(&self) -> &str {
        &self.name
    }

    async fn connect(&self, events: mpsc::Sender<PlayerEvent>) -> Result<bool> {
        let Some(token) = self.tokens.bearer_token().await else {
            return Ok(false);
        };

        let devices = match self.api.devices(&token).await {
            Ok(devices) => devices,
            Err(err) => {
                let event = match &err {
                    PlaydeckError::Authentication(message) => PlayerEvent::AuthenticationError {
                        message: message.clone(),
                    },
                    PlaydeckError::Api {
                        status: 403,
                        message,
                    } => PlayerEvent::AccountError {
                        message: message.clone(),
                    },
                    other => PlayerEvent::InitializationError {
                        message: other.to_string(),
                    },
                };
                Self::emit(&events, event).await;
                return Ok(false);
            }
        };

        let found = devices
            .iter()
            .find(|d| d.name.eq_ignore_ascii_case(&self.name))
            .and_then(|d| d.id.clone());
        let Some(device_id) = found else {
            warn!(name = %self.name, available = devices.len(), "Playback device not found");
            Self::emit(
                &events,
                PlayerEvent::InitializationError {
                    message: format!(
                        "device '{}' not found among {} available devices",
                        self.name,
                        devices.len()
                    ),
                },
            )
            .await;
            return Ok(false);
        };

        *self.device_id.lock().unwrap_or_else(|p| p.into_inner()) = Some(device_id.clone());
        *self.events.lock().unwrap_or_else(|p| p.into_inner()) = Some(events.clone());
        info!(name = %self.name, %device_id, "Connected to playback device");

        if let Err(e) = self
            .api
            .set_volume(&token, volume_percent(self.initial_volume), Some(&device_id))
            .await
        {
            warn!(error = %e, "Could not apply initial volume");
        }

        Self::emit(&events, PlayerEvent::Ready { device_id }).await;
        Ok(true)
    }

    async fn disconnect(&self) {
        let events = self.events.lock().unwrap_or_else(|p| p.into_inner()).take();
        let device_id = self.device_id();
        if let (Some(events), Some(device_id)) = (events, device_id) {
            Self::emit(&events, PlayerEvent::NotReady { device_id }).await;
        }
        debug!(name = %self.name, "Playback device disconnected");
    }

    async fn pause(&self) -> Result<()> {
        let token = self.token().await?;
        self.api.pause(&token, self.device_id().as_deref()).await
    }

    async fn resume(&self) -> Result<()> {
        let token = self.token().await?;
        self.api.resume(&token, self.device_id().as_deref()).await
    }

    async fn next_track(&self) -> Result<()> {
        let token = self.token().await?;
        self.api.next(&token, self.device_id().as_deref()).await
    }

    async fn previous_track(&self) -> Result<()> {
        let token = self.token().await?;
        self.api.previous(&token, self.device_id().as_deref()).await
    }

    async fn seek(&self, position_ms: u64) -> Result<()> {
        let token = self.token().await?;
        self.api
            .seek(&token, position_ms, self.device_id().as_deref())
            .await
    }

    async fn get_volume(&self) -> Result<f32> {
        let token = self.token().await?;
        let device = self
            .api
            .current_playback(&token)
            .await?
            .and_then(|status| status.device)
            .ok_or(PlaydeckError::DeviceMissing)?;
        Ok(device.volume_percent.unwrap_or(0) as f32 / 100.0)
    }

    async fn set_volume(&self, volume: f32) -> Result<()> {
        let token = self.token().await?;
        self.api
            .set_volume(&token, volume_percent(volume), self.device_id().as_deref())
            .await
    }
}

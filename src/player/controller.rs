//! Play requests with device-not-found recovery, plus transport commands.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::auth::TokenStore;
use crate::config::Timings;
use crate::error::{PlaydeckError, Result};
use crate::provider::{PlayTarget, PlayerApi, PlayerStatus};

use super::device::DeviceSession;
use super::sdk::PlaybackDevice;
use super::state::SharedState;

#[derive(Clone)]
pub struct PlaybackController {
    shared: SharedState,
    tokens: TokenStore,
    api: PlayerApi,
    device: DeviceSession,
    sdk: Arc<dyn PlaybackDevice>,
    timings: Timings,
}

impl std::fmt::Debug for PlaybackController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackController")
            .field("device", &self.sdk.name())
            .field("api", &self.api.base_url())
            .finish()
    }
}

impl PlaybackController {
    pub fn new(
        shared: SharedState,
        tokens: TokenStore,
        api: PlayerApi,
        device: DeviceSession,
        sdk: Arc<dyn PlaybackDevice>,
        timings: Timings,
    ) -> Self {
        Self {
            shared,
            tokens,
            api,
            device,
            sdk,
            timings,
        }
    }

    /// Start playing a track, album or playlist on the session's device.
    ///
    /// A 404 from the play endpoint is treated as "device not registered
    /// yet": the device is transferred again and the request repeated, at
    /// most `max_play_retries` times. The failure message is also recorded
    /// as the session error.
    pub async fn play(&self, uri: &str) -> Result<()> {
        let _gate = self.shared.gate().await;
        let result = self.play_chain(uri).await;
        match &result {
            Ok(()) => self.shared.clear_error(),
            Err(e) => {
                error!(uri, error = %e, "Error playing track");
                self.shared.set_error(play_error_message(e));
            }
        }
        result
    }

    async fn play_chain(&self, uri: &str) -> Result<()> {
        self.shared.update(|s| s.retry.reset());
        info!(uri, "Attempting to play URI");

        if !self.tokens.has_token() {
            return Err(PlaydeckError::AuthMissing);
        }
        let device_id = match (self.shared.device_id(), self.shared.is_ready()) {
            (Some(id), true) => id,
            _ => return Err(PlaydeckError::DeviceMissing),
        };

        let target = PlayTarget::classify(uri);
        let mut is_retry = false;
        loop {
            if self.tokens.has_refresh_token() {
                if let Err(e) = self.tokens.refresh().await {
                    warn!(error = %e, "Failed to refresh token before playback");
                }
            }

            if is_retry {
                self.device.transfer(Some(&device_id)).await;
                tokio::time::sleep(self.timings.transfer_settle()).await;
            }

            let token = self.tokens.access_token().ok_or(PlaydeckError::AuthMissing)?;
            let response = self.api.start_playback(&token, &device_id, &target).await?;

            if response.is_success() {
                info!(uri, %device_id, "Playback started");
                self.shared.update(|s| s.retry.reset());
                self.shared.update_playback(|p| p.is_playing = true);
                self.spawn_reconcile();
                return Ok(());
            }

            error!(status = response.status, body = %response.body, "Play request failed");
            let attempt = self.shared.update(|s| {
                (response.status == 404 && s.retry.can_retry()).then(|| {
                    s.retry.attempts += 1;
                    (s.retry.attempts, s.retry.max)
                })
            });
            let Some((attempt, max)) = attempt else {
                return Err(PlaydeckError::PlaybackRequestFailed {
                    status: response.status,
                    body: response.body,
                });
            };

            info!(attempt, max, "Retrying play after device transfer");
            self.device.transfer(Some(&device_id)).await;
            tokio::time::sleep(self.timings.retry_settle()).await;
            is_retry = true;
        }
    }

    /// `GET /me/player` with the current token.
    pub async fn fetch_status(&self) -> Result<Option<PlayerStatus>> {
        let token = self.tokens.access_token().ok_or(PlaydeckError::AuthMissing)?;
        self.api.current_playback(&token).await
    }

    /// Re-read the current track once the reconcile delay has passed.
    fn spawn_reconcile(&self) {
        let this = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(this.timings.reconcile_delay()).await;
            match this.fetch_status().await {
                Ok(Some(PlayerStatus {
                    item: Some(track), ..
                })) => {
                    debug!(track = %track.name, "Reconciled current track");
                    this.shared
                        .update_playback(|p| p.current_track = Some(track));
                }
                Ok(_) => {}
                Err(e) => warn!(error = %e, "Could not update track info after play"),
            }
        });
    }

    fn ensure_ready(&self, command: &str) -> bool {
        if self.shared.is_ready() {
            return true;
        }
        warn!(command, readiness = %self.shared.readiness(), "Player not ready for command");
        false
    }

    pub async fn pause(&self) -> bool {
        if !self.ensure_ready("pause") {
            return false;
        }
        match self.sdk.pause().await {
            Ok(()) => {
                self.shared.update_playback(|p| p.is_playing = false);
                true
            }
            Err(e) => {
                error!(error = %e, "Error pausing playback");
                false
            }
        }
    }

    pub async fn resume(&self) -> bool {
        if !self.ensure_ready("resume") {
            return false;
        }
        match self.sdk.resume().await {
            Ok(()) => {
                self.shared.update_playback(|p| p.is_playing = true);
                true
            }
            Err(e) => {
                error!(error = %e, "Error resuming playback");
                false
            }
        }
    }

    pub async fn toggle(&self) -> bool {
        if !self.ensure_ready("toggle") {
            return false;
        }
        if self.shared.is_playing() {
            self.pause().await
        } else {
            self.resume().await
        }
    }

    pub async fn next(&self) -> bool {
        if !self.ensure_ready("next") {
            return false;
        }
        match self.sdk.next_track().await {
            Ok(()) => {
                self.spawn_reconcile();
                true
            }
            Err(e) => {
                error!(error = %e, "Error skipping to next track");
                false
            }
        }
    }

    pub async fn previous(&self) -> bool {
        if !self.ensure_ready("previous") {
            return false;
        }
        match self.sdk.previous_track().await {
            Ok(()) => {
                self.spawn_reconcile();
                true
            }
            Err(e) => {
                error!(error = %e, "Error going to previous track");
                false
            }
        }
    }

    pub async fn seek(&self, position_ms: u64) -> bool {
        if !self.ensure_ready("seek") {
            return false;
        }
        self.sdk
            .seek(position_ms)
            .await
            .map_err(|e| error!(position_ms, error = %e, "Error seeking to position"))
            .is_ok()
    }

    /// Device volume, or 0.0 when not ready or the query fails.
    pub async fn get_volume(&self) -> f32 {
        if !self.ensure_ready("get_volume") {
            return 0.0;
        }
        self.sdk.get_volume().await.unwrap_or_else(|e| {
            error!(error = %e, "Error getting volume");
            0.0
        })
    }

    /// `volume` is clamped to 0.0..=1.0.
    pub async fn set_volume(&self, volume: f32) -> bool {
        if !self.ensure_ready("set_volume") {
            return false;
        }
        self.sdk
            .set_volume(volume.clamp(0.0, 1.0))
            .await
            .map_err(|e| error!(volume, error = %e, "Error setting volume"))
            .is_ok()
    }
}

/// Human-readable session error for a failed play request.
fn play_error_message(err: &PlaydeckError) -> String {
    match err {
        PlaydeckError::AuthMissing => err.to_string(),
        PlaydeckError::DeviceMissing => "Player not initialized properly".to_string(),
        PlaydeckError::PlaybackRequestFailed { status, body } => {
            format!("Could not play track: {status} {body}")
        }
        other => format!("Error playing: {other}"),
    }
}

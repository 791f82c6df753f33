//! Device identity, readiness and playback transfer.

use tracing::{debug, error, info, warn};

use crate::auth::TokenStore;
use crate::provider::PlayerApi;

use super::state::{Readiness, SharedState};

/// Tracks the one playback device a session drives.
#[derive(Debug, Clone)]
pub struct DeviceSession {
    shared: SharedState,
    tokens: TokenStore,
    api: PlayerApi,
}

impl DeviceSession {
    pub fn new(shared: SharedState, tokens: TokenStore, api: PlayerApi) -> Self {
        Self {
            shared,
            tokens,
            api,
        }
    }

    /// Device reported ready: store its id and reset the play retry counter.
    pub fn mark_ready(&self, device_id: impl Into<String>) {
        let device_id = device_id.into();
        info!(%device_id, "Playback device ready");
        self.shared.update(|s| {
            s.device.device_id = Some(device_id);
            s.device.ready = true;
            s.retry.reset();
        });
        self.shared.set_readiness(Readiness::Ready);
    }

    /// Device went away. Its id is kept for reconnection.
    pub fn mark_not_ready(&self) {
        info!(device_id = ?self.shared.device_id(), "Playback device not ready");
        self.shared.update(|s| s.device.ready = false);
        self.shared.set_readiness(Readiness::NotReady);
    }

    pub fn device_id(&self) -> Option<String> {
        self.shared.device_id()
    }

    pub fn is_ready(&self) -> bool {
        self.shared.is_ready()
    }

    /// Make `device_id` (or the last known device) the active one without
    /// starting playback.
    ///
    /// Returns `true` only when the provider answers 202 or 204. Every other
    /// outcome, including having no device id at all, is `false`.
    pub async fn transfer(&self, device_id: Option<&str>) -> bool {
        let Some(target) = device_id.map(str::to_string).or_else(|| self.device_id()) else {
            warn!("No device id available for transfer");
            return false;
        };

        if self.tokens.is_expired_now() {
            if let Err(e) = self.tokens.refresh().await {
                error!(error = %e, "Token refresh before transfer failed");
                return false;
            }
        }
        let Some(token) = self.tokens.access_token() else {
            warn!("No access token available for transfer");
            return false;
        };

        debug!(device_id = %target, "Transferring playback to device");
        match self.api.transfer(&token, &target, false).await {
            Ok(202 | 204) => {
                info!(device_id = %target, "Playback transferred");
                true
            }
            Ok(status) => {
                error!(device_id = %target, status, "Failed to transfer playback");
                false
            }
            Err(e) => {
                error!(device_id = %target, error = %e, "Error transferring playback");
                false
            }
        }
    }
}

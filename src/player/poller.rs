//! Periodic reconciliation against the provider status endpoint.

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::auth::TokenStore;
use crate::config::PollerPolicy;
use crate::error::Result;

use super::controller::PlaybackController;
use super::device::DeviceSession;
use super::state::{SessionEvent, SharedState};

/// Outcome of one poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollTick {
    /// Device not ready or no token; nothing was fetched.
    Skipped,
    Polled {
        transferred: bool,
        track_changed: bool,
    },
}

#[derive(Debug, Clone)]
pub struct StatusPoller {
    shared: SharedState,
    tokens: TokenStore,
    controller: PlaybackController,
    device: DeviceSession,
    policy: PollerPolicy,
}

impl StatusPoller {
    pub fn new(
        shared: SharedState,
        tokens: TokenStore,
        controller: PlaybackController,
        device: DeviceSession,
        policy: PollerPolicy,
    ) -> Self {
        Self {
            shared,
            tokens,
            controller,
            device,
            policy,
        }
    }

    /// Fetch status once and fold it into the session.
    ///
    /// With no active device and a known local device id, playback is
    /// transferred back to this device. A different track id replaces the
    /// cached track, and the playing flag is always mirrored.
    pub async fn tick(&self) -> Result<PollTick> {
        if !self.shared.is_ready() || !self.tokens.has_token() {
            return Ok(PollTick::Skipped);
        }

        let _gate = self.shared.gate().await;
        let status = self.controller.fetch_status().await?;

        let local_device = self.device.device_id();
        let no_active_device = status.as_ref().map_or(true, |s| s.device.is_none());
        let transferred = match (no_active_device, local_device.as_deref()) {
            (true, Some(id)) => {
                debug!(device_id = id, "No active device, reclaiming playback");
                self.device.transfer(Some(id)).await
            }
            _ => false,
        };

        let mut track_changed = false;
        if let Some(status) = status {
            self.shared.update_playback(|p| {
                if let Some(item) = status.item {
                    let cached_id = p.current_track.as_ref().map(|t| t.id.clone());
                    if cached_id != Some(item.id.clone()) {
                        track_changed = true;
                        p.current_track = Some(item);
                    }
                }
                p.is_playing = status.is_playing;
            });
        }

        Ok(PollTick::Polled {
            transferred,
            track_changed,
        })
    }

    /// Run [`tick`](Self::tick) on the policy interval until `cancel` fires.
    ///
    /// A failure that waiting alone will not fix (a rejected token) triggers
    /// a token refresh before the next tick.
    pub fn spawn(self, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut failures: u32 = 0;
            let mut degraded = false;
            loop {
                let delay = self.policy.next_delay(failures);
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(delay) => {}
                }

                match self.tick().await {
                    Ok(_) => {
                        if degraded {
                            info!("Status poller recovered");
                        }
                        failures = 0;
                        degraded = false;
                    }
                    Err(e) => {
                        failures = failures.saturating_add(1);
                        warn!(error = %e, consecutive_failures = failures, "Error refreshing player status");
                        if !e.is_retryable() && self.tokens.has_refresh_token() {
                            match self.tokens.refresh().await {
                                Ok(_) => debug!("Token refreshed after status failure"),
                                Err(e) => warn!(error = %e, "Token refresh after status failure failed"),
                            }
                        }
                        if let Some(threshold) = self.policy.failure_threshold {
                            if failures >= threshold && !degraded {
                                degraded = true;
                                self.shared.set_error(format!(
                                    "Player status unavailable after {failures} attempts: {e}"
                                ));
                                self.shared.publish(SessionEvent::PollerDegraded {
                                    consecutive_failures: failures,
                                });
                            }
                        }
                    }
                }
            }
            debug!("Status poller stopped");
        })
    }
}

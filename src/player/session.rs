//! One playback session: device, controller, poller and the SDK event loop.

use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::auth::TokenStore;
use crate::config::{PlaydeckConfig, PollerPolicy, Timings};
use crate::error::{PlaydeckError, Result, SdkErrorKind};
use crate::provider::{PlayerApi, SdkPlaybackState, Track};

use super::controller::PlaybackController;
use super::device::DeviceSession;
use super::poller::StatusPoller;
use super::sdk::{PlaybackDevice, PlayerEvent};
use super::state::{Readiness, SessionEvent, SharedState};

const EVENT_BUFFER: usize = 32;

#[derive(Debug, Default)]
struct Lifecycle {
    initialized: bool,
    cancel: CancellationToken,
    poller: Option<CancellationToken>,
    events: Option<mpsc::Sender<PlayerEvent>>,
}

/// An explicitly constructed playback session.
///
/// Clones are handles to the same session.
///
/// # Example
/// ```no_run
/// use std::sync::Arc;
/// use playdeck::auth::TokenStore;
/// use playdeck::config::PlaydeckConfig;
/// use playdeck::player::{PlayerSession, WebApiDevice};
///
/// # async fn example(tokens: TokenStore) -> playdeck::error::Result<()> {
/// let config = PlaydeckConfig::from_env();
/// let device = Arc::new(WebApiDevice::from_config(&config, tokens.clone()));
/// let session = PlayerSession::new(&config, tokens, device);
/// let mut events = session.subscribe();
/// session.initialize().await?;
/// while let Ok(event) = events.recv().await {
///     println!("{event:?}");
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct PlayerSession {
    shared: SharedState,
    tokens: TokenStore,
    device: DeviceSession,
    controller: PlaybackController,
    sdk: Arc<dyn PlaybackDevice>,
    timings: Timings,
    policy: PollerPolicy,
    lifecycle: Arc<Mutex<Lifecycle>>,
}

impl std::fmt::Debug for PlayerSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlayerSession")
            .field("device", &self.sdk.name())
            .field("readiness", &self.readiness())
            .field("device_id", &self.device_id())
            .finish()
    }
}

impl PlayerSession {
    pub fn new(config: &PlaydeckConfig, tokens: TokenStore, sdk: Arc<dyn PlaybackDevice>) -> Self {
        let api = PlayerApi::new(config.api_base_url.clone());
        let shared = SharedState::new(config.timings.max_play_retries);
        let device = DeviceSession::new(shared.clone(), tokens.clone(), api.clone());
        let controller = PlaybackController::new(
            shared.clone(),
            tokens.clone(),
            api,
            device.clone(),
            Arc::clone(&sdk),
            config.timings.clone(),
        );
        Self {
            shared,
            tokens,
            device,
            controller,
            sdk,
            timings: config.timings.clone(),
            policy: config.poller.clone(),
            lifecycle: Arc::new(Mutex::new(Lifecycle::default())),
        }
    }

    fn lifecycle(&self) -> MutexGuard<'_, Lifecycle> {
        self.lifecycle.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.shared.subscribe()
    }

    pub fn controller(&self) -> &PlaybackController {
        &self.controller
    }

    pub fn device(&self) -> &DeviceSession {
        &self.device
    }

    pub fn tokens(&self) -> &TokenStore {
        &self.tokens
    }

    pub fn poller(&self) -> StatusPoller {
        StatusPoller::new(
            self.shared.clone(),
            self.tokens.clone(),
            self.controller.clone(),
            self.device.clone(),
            self.policy.clone(),
        )
    }

    pub fn readiness(&self) -> Readiness {
        self.shared.readiness()
    }

    pub fn is_ready(&self) -> bool {
        self.shared.is_ready()
    }

    pub fn is_playing(&self) -> bool {
        self.shared.is_playing()
    }

    pub fn current_track(&self) -> Option<Track> {
        self.shared.current_track()
    }

    pub fn device_id(&self) -> Option<String> {
        self.shared.device_id()
    }

    pub fn last_error(&self) -> Option<String> {
        self.shared.last_error()
    }

    pub fn retry_attempts(&self) -> u32 {
        self.shared.retry_attempts()
    }

    pub async fn play(&self, uri: &str) -> Result<()> {
        self.controller.play(uri).await
    }

    /// Connect the playback device and start consuming its events.
    ///
    /// Calling this again on an initialized session does nothing.
    pub async fn initialize(&self) -> Result<()> {
        if !self.tokens.has_token() {
            self.shared
                .set_error("Playback device or access token not available");
            return Err(PlaydeckError::AuthMissing);
        }

        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let cancel = {
            let mut lifecycle = self.lifecycle();
            if lifecycle.initialized {
                debug!("Player already initialized");
                return Ok(());
            }
            lifecycle.initialized = true;
            lifecycle.cancel = CancellationToken::new();
            lifecycle.events = Some(tx.clone());
            lifecycle.cancel.clone()
        };

        if let Some(token) = self.tokens.current() {
            info!(device = self.sdk.name(), token = %token.redacted(), "Initializing player");
        }
        self.shared.set_readiness(Readiness::Connecting);
        self.spawn_event_loop(rx, cancel);

        let outcome = match self.sdk.connect(tx).await {
            Ok(true) => {
                info!(device = self.sdk.name(), "Player connected");
                Ok(())
            }
            Ok(false) => {
                self.shared.set_error("Failed to connect player");
                Err(PlaydeckError::SdkEvent {
                    kind: SdkErrorKind::Initialization,
                    message: "Failed to connect player".to_string(),
                })
            }
            Err(e) => {
                self.shared
                    .set_error(format!("Error initializing player: {e}"));
                Err(e)
            }
        };

        if outcome.is_err() {
            self.reset_lifecycle();
            self.shared.set_readiness(Readiness::Uninitialized);
        }
        outcome
    }

    fn spawn_event_loop(&self, mut rx: mpsc::Receiver<PlayerEvent>, cancel: CancellationToken) {
        let session = self.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    event = rx.recv() => match event {
                        Some(event) => session.handle_event(event).await,
                        None => break,
                    },
                }
            }
            debug!("Player event loop stopped");
        });
    }

    /// Apply one SDK event to the session.
    pub async fn handle_event(&self, event: PlayerEvent) {
        match event {
            PlayerEvent::Ready { device_id } => self.on_ready(device_id),
            PlayerEvent::NotReady { device_id } => {
                debug!(%device_id, "Device not ready for playback");
                self.device.mark_not_ready();
            }
            PlayerEvent::StateChanged(state) => self.on_state_changed(state),
            PlayerEvent::InitializationError { message } => {
                self.report_sdk_error(SdkErrorKind::Initialization, message);
            }
            PlayerEvent::AccountError { message } => {
                self.report_sdk_error(SdkErrorKind::Account, message);
            }
            PlayerEvent::AuthenticationError { message } => {
                self.report_sdk_error(SdkErrorKind::Authentication, message);
                if self.tokens.has_refresh_token() {
                    self.spawn_reconnect();
                }
            }
        }
    }

    fn on_ready(&self, device_id: String) {
        self.device.mark_ready(device_id.clone());
        self.start_poller();

        let device = self.device.clone();
        let delay = self.timings.ready_transfer_delay();
        let cancel = self.lifecycle().cancel.child_token();
        tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!(%device_id, "Session closed before ready transfer");
                }
                _ = tokio::time::sleep(delay) => {
                    device.transfer(Some(&device_id)).await;
                }
            }
        });
    }

    fn on_state_changed(&self, state: Option<SdkPlaybackState>) {
        match state {
            None => self.shared.update_playback(|p| p.is_playing = false),
            Some(state) => {
                debug!(playing = !state.paused, "Player state changed");
                self.shared.update_playback(|p| {
                    p.is_playing = !state.paused;
                    if let Some(track) = state.track_window.current_track {
                        p.current_track = Some(track);
                    }
                });
            }
        }
    }

    fn report_sdk_error(&self, kind: SdkErrorKind, message: String) {
        let err = PlaydeckError::SdkEvent { kind, message };
        error!(error = %err, "Playback device error");
        self.shared.set_error(err.to_string());
    }

    fn spawn_reconnect(&self) {
        let Some(events) = self.lifecycle().events.clone() else {
            return;
        };
        let tokens = self.tokens.clone();
        let sdk = Arc::clone(&self.sdk);
        tokio::spawn(async move {
            if let Err(e) = tokens.refresh().await {
                error!(error = %e, "Failed to refresh token after auth error");
                return;
            }
            match sdk.connect(events).await {
                Ok(true) => info!("Player reconnected after token refresh"),
                Ok(false) => warn!("Player refused to reconnect"),
                Err(e) => error!(error = %e, "Player reconnect failed"),
            }
        });
    }

    fn start_poller(&self) {
        let token = {
            let mut lifecycle = self.lifecycle();
            if let Some(previous) = lifecycle.poller.take() {
                previous.cancel();
            }
            let token = lifecycle.cancel.child_token();
            lifecycle.poller = Some(token.clone());
            token
        };
        self.poller().spawn(token);
    }

    fn reset_lifecycle(&self) {
        let mut lifecycle = self.lifecycle();
        lifecycle.cancel.cancel();
        lifecycle.initialized = false;
        lifecycle.poller = None;
        lifecycle.events = None;
    }

    /// Stop the poller and event loop, then disconnect the device.
    pub async fn shutdown(&self) {
        let was_initialized = self.lifecycle().initialized;
        self.reset_lifecycle();
        if was_initialized {
            self.sdk.disconnect().await;
            self.shared.update(|s| s.device.ready = false);
            self.shared.set_readiness(Readiness::Uninitialized);
            info!("Player session shut down");
        }
    }
}

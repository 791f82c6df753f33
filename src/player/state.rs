//! Session state shared by the device, controller, poller and event loop.

use std::sync::{Arc, Mutex, MutexGuard};

use strum::Display;
use tokio::sync::broadcast;

use crate::provider::Track;

/// Readiness of the playback device.
///
/// `Uninitialized -> Connecting -> Ready <-> NotReady`. Only `Ready` accepts
/// transport commands; `NotReady` keeps the device id so a later `Ready`
/// resumes without rebuilding the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display)]
#[strum(serialize_all = "snake_case")]
pub enum Readiness {
    #[default]
    Uninitialized,
    Connecting,
    Ready,
    NotReady,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceState {
    pub device_id: Option<String>,
    pub ready: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlaybackSnapshot {
    pub is_playing: bool,
    pub current_track: Option<Track>,
}

/// 404 retries spent by the current play request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryCounter {
    pub attempts: u32,
    pub max: u32,
}

impl RetryCounter {
    pub fn new(max: u32) -> Self {
        Self { attempts: 0, max }
    }

    pub fn reset(&mut self) {
        self.attempts = 0;
    }

    pub fn can_retry(&self) -> bool {
        self.attempts < self.max
    }
}

impl Default for RetryCounter {
    fn default() -> Self {
        Self::new(2)
    }
}

#[derive(Debug, Clone, Default)]
pub struct SessionState {
    pub device: DeviceState,
    pub readiness: Readiness,
    pub playback: PlaybackSnapshot,
    pub retry: RetryCounter,
    pub last_error: Option<String>,
}

/// State transitions published to subscribers.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    ReadinessChanged {
        readiness: Readiness,
        device_id: Option<String>,
    },
    PlaybackChanged(PlaybackSnapshot),
    Error(String),
    /// The poller failed this many ticks in a row.
    PollerDegraded { consecutive_failures: u32 },
}

const EVENT_CAPACITY: usize = 64;

/// Handle to the state of one session. Clones share everything.
#[derive(Debug, Clone)]
pub struct SharedState {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    state: Mutex<SessionState>,
    events: broadcast::Sender<SessionEvent>,
    gate: tokio::sync::Mutex<()>,
}

impl SharedState {
    pub fn new(max_retries: u32) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let state = SessionState {
            retry: RetryCounter::new(max_retries),
            ..SessionState::default()
        };
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(state),
                events,
                gate: tokio::sync::Mutex::new(()),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.inner.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Run `f` with the state locked. Keep it short; never await inside.
    pub fn update<R>(&self, f: impl FnOnce(&mut SessionState) -> R) -> R {
        f(&mut self.lock())
    }

    pub fn snapshot(&self) -> SessionState {
        self.lock().clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.events.subscribe()
    }

    /// Publish an event; having no subscribers is fine.
    pub fn publish(&self, event: SessionEvent) {
        let _ = self.inner.events.send(event);
    }

    /// Serializes play chains against poll ticks.
    pub async fn gate(&self) -> tokio::sync::MutexGuard<'_, ()> {
        self.inner.gate.lock().await
    }

    pub fn readiness(&self) -> Readiness {
        self.lock().readiness
    }

    pub fn set_readiness(&self, readiness: Readiness) {
        let device_id = self.update(|s| {
            s.readiness = readiness;
            s.device.device_id.clone()
        });
        self.publish(SessionEvent::ReadinessChanged {
            readiness,
            device_id,
        });
    }

    pub fn is_ready(&self) -> bool {
        self.lock().readiness == Readiness::Ready
    }

    pub fn device_id(&self) -> Option<String> {
        self.lock().device.device_id.clone()
    }

    pub fn is_playing(&self) -> bool {
        self.lock().playback.is_playing
    }

    pub fn current_track(&self) -> Option<Track> {
        self.lock().playback.current_track.clone()
    }

    pub fn retry_attempts(&self) -> u32 {
        self.lock().retry.attempts
    }

    pub fn last_error(&self) -> Option<String> {
        self.lock().last_error.clone()
    }

    pub fn set_error(&self, message: impl Into<String>) {
        let message = message.into();
        self.update(|s| s.last_error = Some(message.clone()));
        self.publish(SessionEvent::Error(message));
    }

    pub fn clear_error(&self) {
        self.update(|s| s.last_error = None);
    }

    /// Apply `f` to the playback snapshot and publish the result if it changed.
    pub fn update_playback(&self, f: impl FnOnce(&mut PlaybackSnapshot)) {
        let changed = self.update(|s| {
            let before = s.playback.clone();
            f(&mut s.playback);
            (before != s.playback).then(|| s.playback.clone())
        });
        if let Some(snapshot) = changed {
            self.publish(SessionEvent::PlaybackChanged(snapshot));
        }
    }
}

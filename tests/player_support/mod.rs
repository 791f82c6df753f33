#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use playdeck::auth::{Token, TokenExchange, TokenStore};
use playdeck::config::{PlaydeckConfig, PollerPolicy, Timings};
use playdeck::error::{PlaydeckError, Result};
use playdeck::player::{PlaybackDevice, PlayerEvent, PlayerSession};
use serde_json::{json, Value};
use tokio::sync::mpsc;
use wiremock::MockServer;

pub const DEVICE_ID: &str = "dev-1";

/// Config pointing both provider hosts at `server`, with millisecond delays.
/// Ready-transfer and poll intervals are long so background work never
/// reaches the mock server during a test.
pub fn config(server: &MockServer) -> PlaydeckConfig {
    PlaydeckConfig {
        client_id: "client-id".to_string(),
        client_secret: Some("client-secret".to_string()),
        accounts_base_url: server.uri(),
        api_base_url: format!("{}/v1", server.uri()),
        timings: Timings {
            transfer_settle_ms: 5,
            retry_settle_ms: 5,
            reconcile_delay_ms: 10,
            ready_transfer_delay_ms: 60_000,
            ..Timings::default()
        },
        poller: PollerPolicy {
            interval_ms: 60_000,
            ..PollerPolicy::default()
        },
        ..PlaydeckConfig::default()
    }
}

pub fn valid_token() -> Token {
    Token::new(
        "access-token",
        Some("refresh-token".to_string()),
        Utc::now() + Duration::hours(1),
    )
}

pub fn expired_token() -> Token {
    Token::new(
        "stale-token",
        Some("refresh-token".to_string()),
        Utc::now() - Duration::minutes(5),
    )
}

pub fn exchange(server: &MockServer) -> TokenExchange {
    TokenExchange::new("client-id", "client-secret")
        .with_token_url(format!("{}/api/token", server.uri()))
}

pub fn tokens(server: &MockServer, token: Token) -> TokenStore {
    TokenStore::new(exchange(server)).with_token(token)
}

pub fn token_response(access_token: &str) -> Value {
    json!({
        "access_token": access_token,
        "token_type": "Bearer",
        "expires_in": 3600,
        "scope": "streaming user-read-email"
    })
}

pub fn status_body(device: Option<&str>, is_playing: bool, track_id: Option<&str>) -> Value {
    json!({
        "device": device.map(|id| json!({ "id": id, "name": "playdeck", "is_active": true, "type": "Computer", "volume_percent": 50 })),
        "is_playing": is_playing,
        "progress_ms": 1000,
        "item": track_id.map(|id| json!({
            "uri": format!("spotify:track:{id}"),
            "id": id,
            "name": format!("Track {id}"),
            "artists": [{ "name": "Artist", "uri": "spotify:artist:a" }],
            "album": { "name": "Album", "uri": "spotify:album:x", "images": [] },
            "duration_ms": 200000
        })),
    })
}

/// In-process stand-in for the playback SDK.
#[derive(Default)]
pub struct MockDevice {
    pub calls: Mutex<Vec<String>>,
    pub on_connect: Mutex<Vec<PlayerEvent>>,
    pub refuse_connect: bool,
    pub fail_commands: bool,
    pub volume: Mutex<f32>,
}

impl MockDevice {
    pub fn new() -> Self {
        Self::default()
    }

    /// Emits `Ready { DEVICE_ID }` on every connect.
    pub fn ready() -> Self {
        let device = Self::default();
        device
            .on_connect
            .lock()
            .unwrap()
            .push(PlayerEvent::Ready {
                device_id: DEVICE_ID.to_string(),
            });
        device
    }

    pub fn failing() -> Self {
        Self {
            fail_commands: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: impl Into<String>) -> Result<()> {
        self.calls.lock().unwrap().push(call.into());
        if self.fail_commands {
            return Err(PlaydeckError::InvalidState("device unavailable".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl PlaybackDevice for MockDevice {
    fn name(&self) -> &str {
        "mock"
    }

    async fn connect(&self, events: mpsc::Sender<PlayerEvent>) -> Result<bool> {
        self.calls.lock().unwrap().push("connect".to_string());
        if self.refuse_connect {
            return Ok(false);
        }
        let queued = self.on_connect.lock().unwrap().clone();
        for event in queued {
            let _ = events.send(event).await;
        }
        Ok(true)
    }

    async fn disconnect(&self) {
        self.calls.lock().unwrap().push("disconnect".to_string());
    }

    async fn pause(&self) -> Result<()> {
        self.record("pause")
    }

    async fn resume(&self) -> Result<()> {
        self.record("resume")
    }

    async fn next_track(&self) -> Result<()> {
        self.record("next")
    }

    async fn previous_track(&self) -> Result<()> {
        self.record("previous")
    }

    async fn seek(&self, position_ms: u64) -> Result<()> {
        self.record(format!("seek:{position_ms}"))
    }

    async fn get_volume(&self) -> Result<f32> {
        self.record("get_volume")?;
        Ok(*self.volume.lock().unwrap())
    }

    async fn set_volume(&self, volume: f32) -> Result<()> {
        self.record(format!("set_volume:{volume}"))?;
        *self.volume.lock().unwrap() = volume;
        Ok(())
    }
}

/// A session whose device is already marked ready with [`DEVICE_ID`].
pub fn ready_session(server: &MockServer, tokens: TokenStore) -> (PlayerSession, Arc<MockDevice>) {
    let device = Arc::new(MockDevice::new());
    let session = PlayerSession::new(&config(server), tokens, device.clone());
    session.device().mark_ready(DEVICE_ID);
    (session, device)
}

/// Poll `check` until it holds or a second passes.
pub async fn eventually(mut check: impl FnMut() -> bool) -> bool {
    for _ in 0..100 {
        if check() {
            return true;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    check()
}

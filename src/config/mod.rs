//! Configuration system (layered: defaults < TOML file < environment).
//!
//! Credentials are never compiled in; they come from `SPOTIFY_CLIENT_ID` /
//! `SPOTIFY_CLIENT_SECRET` (a `.env` file is honoured) or a config file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{PlaydeckError, Result};

pub const DEFAULT_ACCOUNTS_BASE_URL: &str = "https://accounts.spotify.com";
pub const DEFAULT_API_BASE_URL: &str = "https://api.spotify.com/v1";
pub const DEFAULT_REDIRECT_URI: &str = "http://127.0.0.1:3000/callback";
pub const DEFAULT_DEVICE_NAME: &str = "playdeck";

const DEFAULT_SCOPES: &[&str] = &[
    "streaming",
    "user-read-email",
    "user-read-private",
    "user-read-playback-state",
    "user-modify-playback-state",
    "playlist-read-private",
    "playlist-modify-public",
    "playlist-modify-private",
];

/// Delays and limits used by the playback session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timings {
    /// Wait after a transfer issued on a retry attempt, before the play request.
    pub transfer_settle_ms: u64,
    /// Wait after the transfer that follows a 404 from the play endpoint.
    pub retry_settle_ms: u64,
    /// Delay before re-fetching status after play / next / previous.
    pub reconcile_delay_ms: u64,
    /// Delay between the `ready` event and the initial device transfer.
    pub ready_transfer_delay_ms: u64,
    /// Safety margin for token expiry checks.
    pub expiry_skew_ms: i64,
    /// Maximum number of 404 retries per play request.
    pub max_play_retries: u32,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            transfer_settle_ms: 1000,
            retry_settle_ms: 2000,
            reconcile_delay_ms: 500,
            ready_transfer_delay_ms: 1000,
            expiry_skew_ms: crate::auth::token::DEFAULT_EXPIRY_SKEW_MS,
            max_play_retries: 2,
        }
    }
}

impl Timings {
    pub fn transfer_settle(&self) -> Duration {
        Duration::from_millis(self.transfer_settle_ms)
    }

    pub fn retry_settle(&self) -> Duration {
        Duration::from_millis(self.retry_settle_ms)
    }

    pub fn reconcile_delay(&self) -> Duration {
        Duration::from_millis(self.reconcile_delay_ms)
    }

    pub fn ready_transfer_delay(&self) -> Duration {
        Duration::from_millis(self.ready_transfer_delay_ms)
    }

    pub fn expiry_skew(&self) -> chrono::Duration {
        chrono::Duration::milliseconds(self.expiry_skew_ms)
    }
}

/// Status polling cadence.
///
/// The defaults poll every five seconds forever. Setting
/// `backoff_multiplier` above 1.0 stretches the interval after consecutive
/// failures, and `failure_threshold` reports a degraded poller once that many
/// ticks in a row have failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollerPolicy {
    pub interval_ms: u64,
    pub backoff_multiplier: f64,
    pub max_interval_ms: u64,
    pub failure_threshold: Option<u32>,
}

impl Default for PollerPolicy {
    fn default() -> Self {
        Self {
            interval_ms: 5000,
            backoff_multiplier: 1.0,
            max_interval_ms: 60_000,
            failure_threshold: None,
        }
    }
}

impl PollerPolicy {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    /// Delay before the next tick given the number of consecutive failures.
    pub fn next_delay(&self, consecutive_failures: u32) -> Duration {
        if consecutive_failures == 0 || self.backoff_multiplier <= 1.0 {
            return self.interval();
        }
        let exponent = consecutive_failures.min(32) as i32;
        let scaled = self.interval_ms as f64 * self.backoff_multiplier.powi(exponent);
        let capped = scaled.min(self.max_interval_ms.max(self.interval_ms) as f64);
        Duration::from_millis(capped as u64)
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaydeckConfig {
    pub client_id: String,
    pub client_secret: Option<String>,
    pub redirect_uri: String,
    pub scopes: Vec<String>,
    pub accounts_base_url: String,
    pub api_base_url: String,
    /// Name of the Connect device the session drives.
    pub device_name: String,
    /// Volume applied once the device reports ready (0.0 to 1.0).
    pub initial_volume: f32,
    /// Directory for saved logins; defaults to the per-user config directory.
    pub credentials_dir: Option<PathBuf>,
    pub timings: Timings,
    pub poller: PollerPolicy,
}

impl Default for PlaydeckConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: None,
            redirect_uri: DEFAULT_REDIRECT_URI.to_string(),
            scopes: DEFAULT_SCOPES.iter().map(|s| s.to_string()).collect(),
            accounts_base_url: DEFAULT_ACCOUNTS_BASE_URL.to_string(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            device_name: DEFAULT_DEVICE_NAME.to_string(),
            initial_volume: 0.5,
            credentials_dir: None,
            timings: Timings::default(),
            poller: PollerPolicy::default(),
        }
    }
}

impl PlaydeckConfig {
    /// Defaults overridden by environment variables (and `.env`).
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();
        let mut config = Self::default();
        config.apply_vars(|key| std::env::var(key).ok());
        config
    }

    /// Parse a TOML config file. Missing keys fall back to defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self> {
        toml::from_str(raw).map_err(|e| PlaydeckError::Configuration(e.to_string()))
    }

    /// Full layering: defaults, then the optional file, then the environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let _ = dotenvy::dotenv();
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_vars(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Apply overrides from a variable lookup (the process environment in
    /// production, a map in tests).
    pub fn apply_vars(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let string_mappings: [(&str, &mut String); 5] = [
            ("SPOTIFY_CLIENT_ID", &mut self.client_id),
            ("SPOTIFY_REDIRECT_URI", &mut self.redirect_uri),
            ("SPOTIFY_ACCOUNTS_URL", &mut self.accounts_base_url),
            ("SPOTIFY_API_URL", &mut self.api_base_url),
            ("PLAYDECK_DEVICE_NAME", &mut self.device_name),
        ];
        for (key, slot) in string_mappings {
            if let Some(value) = lookup(key).filter(|v| !v.trim().is_empty()) {
                *slot = value;
            }
        }

        if let Some(secret) = lookup("SPOTIFY_CLIENT_SECRET").filter(|v| !v.trim().is_empty()) {
            self.client_secret = Some(secret);
        }
        if let Some(scopes) = lookup("SPOTIFY_SCOPES") {
            let parsed: Vec<String> = scopes
                .split(|c: char| c == ',' || c.is_whitespace())
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
            if !parsed.is_empty() {
                self.scopes = parsed;
            }
        }
        if let Some(volume) = lookup("PLAYDECK_VOLUME").and_then(|v| v.parse::<f32>().ok()) {
            self.initial_volume = volume.clamp(0.0, 1.0);
        }
        if let Some(dir) = lookup("PLAYDECK_CREDENTIALS_DIR") {
            self.credentials_dir = Some(PathBuf::from(dir));
        }
    }

    /// Check the values every provider call depends on.
    pub fn validate(&self) -> Result<()> {
        if self.client_id.trim().is_empty() {
            return Err(PlaydeckError::Configuration(
                "client id is not set (SPOTIFY_CLIENT_ID)".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.initial_volume) {
            return Err(PlaydeckError::Configuration(format!(
                "initial volume {} is outside 0.0..=1.0",
                self.initial_volume
            )));
        }
        Ok(())
    }

    pub fn token_url(&self) -> String {
        format!("{}/api/token", self.accounts_base_url.trim_end_matches('/'))
    }

    pub fn authorize_url(&self) -> String {
        format!("{}/authorize", self.accounts_base_url.trim_end_matches('/'))
    }
}

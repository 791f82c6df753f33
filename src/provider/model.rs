//! Wire types for the provider playback REST surface and SDK state payloads.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Artist {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub uri: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Image {
    pub url: String,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Album {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub uri: String,
    #[serde(default)]
    pub images: Vec<Image>,
}

/// A playable track as reported by the SDK or the status endpoint.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Track {
    #[serde(default)]
    pub uri: String,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub artists: Vec<Artist>,
    #[serde(default)]
    pub album: Album,
    #[serde(default)]
    pub duration_ms: u64,
}

impl Track {
    pub fn artist_names(&self) -> String {
        self.artists
            .iter()
            .map(|a| a.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// One entry of `GET /me/player/devices`, also embedded in the status body.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DeviceInfo {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub volume_percent: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct DeviceList {
    #[serde(default)]
    pub devices: Vec<DeviceInfo>,
}

/// Body of `GET /me/player`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PlayerStatus {
    #[serde(default)]
    pub device: Option<DeviceInfo>,
    #[serde(default)]
    pub is_playing: bool,
    #[serde(default)]
    pub progress_ms: Option<u64>,
    #[serde(default)]
    pub item: Option<Track>,
}

/// What a play request should start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayTarget {
    /// A single track, sent as a one-item `uris` list.
    Tracks(Vec<String>),
    /// An album or playlist, sent as `context_uri`.
    Context(String),
}

impl PlayTarget {
    /// Any URI containing `track` is treated as a single track.
    pub fn classify(uri: &str) -> Self {
        if uri.contains("track") {
            Self::Tracks(vec![uri.to_string()])
        } else {
            Self::Context(uri.to_string())
        }
    }

    pub fn body(&self) -> serde_json::Value {
        match self {
            Self::Tracks(uris) => serde_json::json!({ "uris": uris }),
            Self::Context(uri) => serde_json::json!({ "context_uri": uri }),
        }
    }
}

/// `player_state_changed` payload from the playback SDK.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SdkPlaybackState {
    #[serde(default)]
    pub paused: bool,
    #[serde(default)]
    pub position: u64,
    #[serde(default)]
    pub duration: u64,
    #[serde(default)]
    pub track_window: TrackWindow,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TrackWindow {
    #[serde(default)]
    pub current_track: Option<Track>,
}

//! The playback SDK seam.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::Result;
use crate::provider::SdkPlaybackState;

/// Notifications a playback device emits after `connect`.
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerEvent {
    Ready { device_id: String },
    NotReady { device_id: String },
    /// `None` when the SDK reports no playback state at all.
    StateChanged(Option<SdkPlaybackState>),
    InitializationError { message: String },
    AuthenticationError { message: String },
    AccountError { message: String },
}

/// A playback device instance (the browser SDK player or a stand-in).
///
/// Implementations report readiness and state over the channel passed to
/// [`connect`](PlaybackDevice::connect); every other method acts on the
/// device directly.
#[async_trait]
pub trait PlaybackDevice: Send + Sync {
    fn name(&self) -> &str;

    /// Start the device. `Ok(false)` means the connection was refused.
    async fn connect(&self, events: mpsc::Sender<PlayerEvent>) -> Result<bool>;

    async fn disconnect(&self);

    async fn pause(&self) -> Result<()>;

    async fn resume(&self) -> Result<()>;

    async fn next_track(&self) -> Result<()>;

    async fn previous_track(&self) -> Result<()>;

    async fn seek(&self, position_ms: u64) -> Result<()>;

    /// Volume in 0.0..=1.0.
    async fn get_volume(&self) -> Result<f32>;

    async fn set_volume(&self, volume: f32) -> Result<()>;
}

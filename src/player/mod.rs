//! Playback session coordination.
//!
//! [`PlayerSession`] owns a [`DeviceSession`], a [`PlaybackController`] and a
//! [`StatusPoller`] over one shared state, and consumes [`PlayerEvent`]s from
//! a [`PlaybackDevice`].

pub mod controller;
pub mod device;
pub mod poller;
pub mod remote;
pub mod sdk;
pub mod session;
pub mod state;

pub use controller::PlaybackController;
pub use device::DeviceSession;
pub use poller::{PollTick, StatusPoller};
pub use remote::WebApiDevice;
pub use sdk::{PlaybackDevice, PlayerEvent};
pub use session::PlayerSession;
pub use state::{
    DeviceState, PlaybackSnapshot, Readiness, RetryCounter, SessionEvent, SessionState,
    SharedState,
};

//! Convenience re-exports for common use.

pub use crate::auth::{AuthError, Token, TokenExchange, TokenSource, TokenStore};
pub use crate::config::{PlaydeckConfig, PollerPolicy, Timings};
pub use crate::error::{PlaydeckError, Result};
pub use crate::player::{
    PlaybackController, PlaybackDevice, PlayerEvent, PlayerSession, Readiness, SessionEvent,
    WebApiDevice,
};
pub use crate::provider::{PlayTarget, PlayerApi, PlayerStatus, Track};

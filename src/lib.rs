//! playdeck - Spotify token lifecycle and playback session coordination.
//!
//! Authenticates against the accounts service, keeps one access token fresh,
//! drives one playback device and reconciles local state with the provider's
//! view of playback.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use playdeck::prelude::*;
//!
//! # async fn example() -> playdeck::error::Result<()> {
//! let config = PlaydeckConfig::from_env();
//! let tokens = TokenStore::new(TokenExchange::from_config(&config)?)
//!     .with_token(Token::new("access", Some("refresh".into()), chrono::Utc::now()));
//! let device = Arc::new(WebApiDevice::from_config(&config, tokens.clone()));
//! let session = PlayerSession::new(&config, tokens, device);
//! session.initialize().await?;
//! session.play("spotify:track:4uLU6hMCjMI75M1A2tKUQC").await?;
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod config;
pub mod error;
pub mod player;
pub mod prelude;
pub mod provider;

#[cfg(feature = "proxy")]
pub mod proxy;

#[cfg(feature = "cli")]
pub mod cli;

#[cfg(feature = "cli")]
pub mod logging;

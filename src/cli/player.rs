//! CLI playback command handlers.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast::error::RecvError;

use crate::auth::{CredentialStore, FileCredentialStore, TokenExchange, TokenStore};
use crate::config::PlaydeckConfig;
use crate::player::{PlayerSession, Readiness, SessionEvent, WebApiDevice};

use super::Commands;

type CliResult = Result<(), Box<dyn std::error::Error>>;

const READY_TIMEOUT: Duration = Duration::from_secs(10);

/// Token store seeded from the saved profile; refreshable when a client
/// secret is configured.
fn load_tokens(config: &PlaydeckConfig, store: &FileCredentialStore, profile: &str) -> Result<TokenStore, Box<dyn std::error::Error>> {
    let Some(token) = store.load(profile)? else {
        return Err("not logged in; run `playdeck auth url` first".into());
    };
    let tokens = match TokenExchange::from_config(config) {
        Ok(exchange) => TokenStore::new(exchange),
        Err(_) => TokenStore::without_refresh(),
    };
    Ok(tokens
        .with_skew(config.timings.expiry_skew())
        .with_token(token))
}

async fn wait_until_ready(session: &PlayerSession) -> CliResult {
    let mut events = session.subscribe();
    let wait = async {
        loop {
            if session.is_ready() {
                return Ok(());
            }
            match events.recv().await {
                Ok(SessionEvent::ReadinessChanged {
                    readiness: Readiness::Ready,
                    ..
                }) => return Ok(()),
                Ok(SessionEvent::Error(message)) => return Err(message),
                Ok(_) | Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => return Err("session closed".to_string()),
            }
        }
    };
    match tokio::time::timeout(READY_TIMEOUT, wait).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(message)) => Err(message.into()),
        Err(_) => Err("timed out waiting for the playback device".into()),
    }
}

/// Open a session on the configured device, run `command`, then persist any
/// refreshed token and shut the session down.
pub async fn run(config: &PlaydeckConfig, profile: &str, command: Commands) -> CliResult {
    config.validate()?;
    let store = FileCredentialStore::in_dir(config.credentials_dir.clone());
    let tokens = load_tokens(config, &store, profile)?;
    let device = Arc::new(WebApiDevice::from_config(config, tokens.clone()));
    let session = PlayerSession::new(config, tokens.clone(), device);

    session.initialize().await?;
    wait_until_ready(&session).await?;

    let result = execute(&session, command).await;

    if let Some(token) = tokens.current() {
        if let Err(e) = store.save(profile, &token) {
            tracing::warn!(error = %e, "Could not persist token");
        }
    }
    session.shutdown().await;
    result
}

async fn execute(session: &PlayerSession, command: Commands) -> CliResult {
    let controller = session.controller();
    let ok = match command {
        Commands::Play(args) => {
            session.play(&args.uri).await?;
            println!("▶️  Playing {}", args.uri);
            true
        }
        Commands::Pause => controller.pause().await,
        Commands::Resume => controller.resume().await,
        Commands::Toggle => controller.toggle().await,
        Commands::Next => controller.next().await,
        Commands::Previous => controller.previous().await,
        Commands::Seek(args) => controller.seek(args.position_ms).await,
        Commands::Volume(args) => match args.level {
            Some(level) => controller.set_volume(level).await,
            None => {
                println!("🔊 {:.0}%", controller.get_volume().await * 100.0);
                true
            }
        },
        Commands::Status => {
            print_status(session).await?;
            true
        }
        Commands::Watch => {
            watch(session).await;
            true
        }
        Commands::Auth(_) | Commands::Serve(_) => {
            return Err("not a playback command".into());
        }
    };
    if ok {
        Ok(())
    } else {
        Err(session
            .last_error()
            .unwrap_or_else(|| "command failed".to_string())
            .into())
    }
}

async fn print_status(session: &PlayerSession) -> CliResult {
    match session.controller().fetch_status().await? {
        None => println!("⏹  No active playback session"),
        Some(status) => {
            let device = status
                .device
                .map(|d| d.name)
                .unwrap_or_else(|| "no active device".to_string());
            let state = if status.is_playing { "▶️  Playing" } else { "⏸  Paused" };
            println!("{state} on {device}");
            if let Some(track) = status.item {
                println!("   {} - {}", track.name, track.artist_names());
                println!("   {}", track.uri);
            }
        }
    }
    Ok(())
}

/// Print session events until Ctrl-C.
async fn watch(session: &PlayerSession) {
    let mut events = session.subscribe();
    println!("👀 Watching {} (Ctrl-C to stop)", session.device_id().unwrap_or_default());
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = events.recv() => match event {
                Ok(SessionEvent::PlaybackChanged(snapshot)) => {
                    let track = snapshot
                        .current_track
                        .map(|t| format!("{} - {}", t.name, t.artist_names()))
                        .unwrap_or_else(|| "-".to_string());
                    let state = if snapshot.is_playing { "▶️ " } else { "⏸ " };
                    println!("{state} {track}");
                }
                Ok(SessionEvent::ReadinessChanged { readiness, .. }) => println!("🔌 {readiness}"),
                Ok(SessionEvent::Error(message)) => eprintln!("⚠️  {message}"),
                Ok(SessionEvent::PollerDegraded { consecutive_failures }) => {
                    eprintln!("⚠️  Status polling failing ({consecutive_failures} in a row)")
                }
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            },
        }
    }
}

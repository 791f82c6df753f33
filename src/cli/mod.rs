//! CLI entry point for playdeck.

pub mod auth;
pub mod player;

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Control a Spotify Connect device from the terminal
#[derive(Parser, Debug)]
#[command(name = "playdeck", version, about = "playdeck - Spotify playback session CLI")]
pub struct Cli {
    /// TOML config file (environment variables still override it)
    #[arg(long, global = true, env = "PLAYDECK_CONFIG")]
    pub config: Option<PathBuf>,

    /// Credential profile to use
    #[arg(long, global = true, default_value = "default")]
    pub profile: String,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Authentication management
    Auth(AuthArgs),
    /// Play a track, album or playlist URI
    Play(PlayArgs),
    /// Pause playback
    Pause,
    /// Resume playback
    Resume,
    /// Toggle between playing and paused
    Toggle,
    /// Skip to the next track
    Next,
    /// Go back to the previous track
    Previous,
    /// Seek within the current track
    Seek(SeekArgs),
    /// Show or set the device volume
    Volume(VolumeArgs),
    /// Show the provider-side playback status
    Status,
    /// Keep the session open and print state changes
    Watch,
    /// Run the token proxy
    Serve(ServeArgs),
}

/// Arguments for the `auth` subcommand group.
#[derive(Parser, Debug)]
pub struct AuthArgs {
    #[command(subcommand)]
    pub command: AuthCommands,
}

#[derive(Subcommand, Debug)]
pub enum AuthCommands {
    /// Print the login URL
    Url(UrlArgs),
    /// Exchange an authorization code and save the token
    Exchange(ExchangeArgs),
    /// Save an access token obtained from the implicit-grant redirect
    Import(ImportArgs),
    /// Refresh the saved token
    Refresh,
    /// Fetch an app-only token (client credentials)
    ClientToken,
    /// Show the saved token
    Status,
    /// Delete the saved token
    Logout,
}

#[derive(Parser, Debug)]
pub struct UrlArgs {
    /// Request an authorization code instead of an implicit-grant token
    #[arg(long)]
    pub code: bool,

    /// Attach a random state parameter
    #[arg(long)]
    pub state: bool,
}

#[derive(Parser, Debug)]
pub struct ExchangeArgs {
    /// The `code` query parameter from the callback URL
    pub code: String,
}

#[derive(Parser, Debug)]
pub struct ImportArgs {
    /// The `access_token` fragment parameter from the callback URL
    pub access_token: String,

    /// The `expires_in` fragment parameter
    #[arg(long, default_value_t = 3600)]
    pub expires_in: i64,
}

#[derive(Parser, Debug)]
pub struct PlayArgs {
    /// Spotify URI, e.g. spotify:track:… or spotify:playlist:…
    pub uri: String,
}

#[derive(Parser, Debug)]
pub struct SeekArgs {
    /// Position in milliseconds
    pub position_ms: u64,
}

#[derive(Parser, Debug)]
pub struct VolumeArgs {
    /// New volume between 0.0 and 1.0; omit to print the current volume
    pub level: Option<f32>,
}

#[derive(Parser, Debug)]
pub struct ServeArgs {
    /// Address to listen on
    #[arg(long, default_value = "127.0.0.1:3000")]
    pub addr: SocketAddr,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn parse_play_uri() {
        let cli = Cli::try_parse_from(["playdeck", "play", "spotify:track:123"]).unwrap();
        match cli.command {
            Commands::Play(args) => assert_eq!(args.uri, "spotify:track:123"),
            other => panic!("expected Play, got {other:?}"),
        }
        assert_eq!(cli.profile, "default");
    }

    #[test]
    fn parse_auth_url_with_flags() {
        let cli = Cli::try_parse_from(["playdeck", "auth", "url", "--code", "--state"]).unwrap();
        match cli.command {
            Commands::Auth(auth) => match auth.command {
                AuthCommands::Url(args) => {
                    assert!(args.code);
                    assert!(args.state);
                }
                other => panic!("expected Url, got {other:?}"),
            },
            other => panic!("expected Auth, got {other:?}"),
        }
    }

    #[test]
    fn parse_auth_import_defaults_expiry() {
        let cli = Cli::try_parse_from(["playdeck", "auth", "import", "BQC123"]).unwrap();
        match cli.command {
            Commands::Auth(auth) => match auth.command {
                AuthCommands::Import(args) => {
                    assert_eq!(args.access_token, "BQC123");
                    assert_eq!(args.expires_in, 3600);
                }
                other => panic!("expected Import, got {other:?}"),
            },
            other => panic!("expected Auth, got {other:?}"),
        }
    }

    #[test]
    fn parse_global_profile_after_subcommand() {
        let cli = Cli::try_parse_from(["playdeck", "seek", "30000", "--profile", "work"]).unwrap();
        assert_eq!(cli.profile, "work");
        assert!(matches!(cli.command, Commands::Seek(SeekArgs { position_ms: 30000 })));
    }

    #[test]
    fn parse_volume_optional_level() {
        let cli = Cli::try_parse_from(["playdeck", "volume"]).unwrap();
        assert!(matches!(cli.command, Commands::Volume(VolumeArgs { level: None })));
        let cli = Cli::try_parse_from(["playdeck", "volume", "0.25"]).unwrap();
        match cli.command {
            Commands::Volume(VolumeArgs { level: Some(level) }) => {
                assert!((level - 0.25).abs() < f32::EPSILON)
            }
            other => panic!("expected Volume, got {other:?}"),
        }
    }

    #[test]
    fn parse_serve_default_addr() {
        let cli = Cli::try_parse_from(["playdeck", "serve"]).unwrap();
        match cli.command {
            Commands::Serve(args) => assert_eq!(args.addr.to_string(), "127.0.0.1:3000"),
            other => panic!("expected Serve, got {other:?}"),
        }
    }

    #[test]
    fn parse_missing_subcommand_is_error() {
        assert!(Cli::try_parse_from(["playdeck"]).is_err());
        assert!(Cli::try_parse_from(["playdeck", "seek"]).is_err());
    }
}

//! CLI auth command handlers.

use chrono::Utc;

use crate::auth::token::expiry_after;
use crate::auth::{
    AuthorizeRequest, CredentialStore, FileCredentialStore, ResponseType, Token, TokenExchange,
    TokenStore,
};
use crate::config::PlaydeckConfig;

use super::{ExchangeArgs, ImportArgs, UrlArgs};

type CliResult = Result<(), Box<dyn std::error::Error>>;

fn credential_store(config: &PlaydeckConfig) -> FileCredentialStore {
    FileCredentialStore::in_dir(config.credentials_dir.clone())
}

/// Handle `playdeck auth url`.
pub fn handle_url(config: &PlaydeckConfig, args: &UrlArgs) -> CliResult {
    config.validate()?;
    let mut request = AuthorizeRequest::from_config(config);
    if args.code {
        request = request.with_response_type(ResponseType::Code);
    }
    if args.state {
        request = request.with_random_state();
    }
    println!("🔗 Visit: {}", request.url());
    match request.response_type {
        ResponseType::Token => {
            println!("📋 Then run: playdeck auth import <access_token> --expires-in <expires_in>")
        }
        ResponseType::Code => println!("📋 Then run: playdeck auth exchange <code>"),
    }
    if let Some(state) = &request.state {
        println!("🔒 Expected state: {state}");
    }
    Ok(())
}

/// Handle `playdeck auth exchange <code>`.
pub async fn handle_exchange(config: &PlaydeckConfig, profile: &str, args: &ExchangeArgs) -> CliResult {
    let exchange = TokenExchange::from_config(config)?;
    let token = exchange.authorization_code(&args.code).await?;
    credential_store(config).save(profile, &token)?;
    println!(
        "✅ Logged in (token {}, expires {})",
        token.redacted(),
        token.expires_at.format("%Y-%m-%d %H:%M")
    );
    Ok(())
}

/// Handle `playdeck auth import <access_token>`.
pub fn handle_import(config: &PlaydeckConfig, profile: &str, args: &ImportArgs) -> CliResult {
    let Some(expires_at) = expiry_after(Utc::now(), args.expires_in) else {
        return Err(format!("--expires-in must be a positive number of seconds, got {}", args.expires_in).into());
    };
    let token = Token::new(args.access_token.clone(), None, expires_at);
    credential_store(config).save(profile, &token)?;
    println!("✅ Token saved ({}); it cannot be refreshed", token.redacted());
    Ok(())
}

/// Handle `playdeck auth refresh`.
pub async fn handle_refresh(config: &PlaydeckConfig, profile: &str) -> CliResult {
    let store = credential_store(config);
    let Some(token) = store.load(profile)? else {
        eprintln!("❌ Not logged in");
        std::process::exit(1);
    };
    let tokens = TokenStore::new(TokenExchange::from_config(config)?).with_token(token);
    let fresh = tokens.refresh().await?;
    store.save(profile, &fresh)?;
    println!(
        "✅ Token refreshed (expires {})",
        fresh.expires_at.format("%Y-%m-%d %H:%M")
    );
    Ok(())
}

/// Handle `playdeck auth client-token`.
pub async fn handle_client_token(config: &PlaydeckConfig) -> CliResult {
    let token = TokenExchange::from_config(config)?.client_credentials().await?;
    println!("{}", token.access_token);
    eprintln!("expires {}", token.expires_at.format("%Y-%m-%d %H:%M:%S"));
    Ok(())
}

/// Handle `playdeck auth status`.
pub fn handle_status(config: &PlaydeckConfig, profile: &str) -> CliResult {
    let store = credential_store(config);
    println!("🔐 Authentication Status ({profile})\n");

    match store.load(profile) {
        Ok(Some(token)) => {
            let status = if token.is_expired_at(Utc::now(), config.timings.expiry_skew()) {
                if token.refresh_token.is_some() {
                    "⚠️  Token expired (will refresh)".to_string()
                } else {
                    "⚠️  Token expired (log in again)".to_string()
                }
            } else {
                format!(
                    "✅ Logged in (expires {})",
                    token.expires_at.format("%Y-%m-%d %H:%M")
                )
            };
            println!("  Spotify: {status}");
            if let Some(scopes) = token.scopes.filter(|s| !s.is_empty()) {
                println!("  Scopes: {}", scopes.join(" "));
            }
        }
        Ok(None) => {
            println!("  Spotify: ❌ Not logged in");
            let others = store.profiles().unwrap_or_default();
            if !others.is_empty() {
                println!("  Saved profiles: {}", others.join(", "));
            }
        }
        Err(e) => println!("  Spotify: ⚠️  Error: {e}"),
    }

    println!("\n📌 Configuration:");
    for (name, set) in [
        ("SPOTIFY_CLIENT_ID", !config.client_id.is_empty()),
        ("SPOTIFY_CLIENT_SECRET", config.client_secret.is_some()),
    ] {
        println!("  {name}: {}", if set { "✅ Set" } else { "❌ Not set" });
    }
    println!("  Credentials: {}", store.base_dir().display());
    Ok(())
}

/// Handle `playdeck auth logout`.
pub fn handle_logout(config: &PlaydeckConfig, profile: &str) -> CliResult {
    credential_store(config).clear(profile)?;
    println!("✅ Logged out ({profile})");
    Ok(())
}

//! playdeck CLI binary entry point.

use clap::Parser;
use playdeck::auth::TokenExchange;
use playdeck::cli::{AuthCommands, Cli, Commands};
use playdeck::config::PlaydeckConfig;

#[tokio::main]
async fn main() {
    playdeck::logging::init();
    let cli = Cli::parse();

    let result = run(cli).await;
    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = PlaydeckConfig::load(cli.config.as_deref())?;
    let profile = cli.profile.as_str();

    match cli.command {
        Commands::Auth(auth_args) => match auth_args.command {
            AuthCommands::Url(args) => playdeck::cli::auth::handle_url(&config, &args),
            AuthCommands::Exchange(args) => {
                playdeck::cli::auth::handle_exchange(&config, profile, &args).await
            }
            AuthCommands::Import(args) => playdeck::cli::auth::handle_import(&config, profile, &args),
            AuthCommands::Refresh => playdeck::cli::auth::handle_refresh(&config, profile).await,
            AuthCommands::ClientToken => playdeck::cli::auth::handle_client_token(&config).await,
            AuthCommands::Status => playdeck::cli::auth::handle_status(&config, profile),
            AuthCommands::Logout => playdeck::cli::auth::handle_logout(&config, profile),
        },
        Commands::Serve(args) => {
            let exchange = TokenExchange::from_config(&config)?;
            playdeck::proxy::serve(exchange, args.addr).await?;
            Ok(())
        }
        command => playdeck::cli::player::run(&config, profile, command).await,
    }
}

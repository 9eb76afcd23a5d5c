use std::sync::Arc;

use eyre::Result;
use log::{debug, info};

mod cli;

use cli::Cli;
use transcript_api::api::{AppState, TRANSCRIPT_PATH, create_router};
use transcript_api::config::{Config, config_path};
use transcript_api::youtube::YouTubeFetcher;

fn build_after_help() -> String {
    format!("\nConfig file (optional): {}", config_path().display())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cmd = <Cli as clap::CommandFactory>::command().after_help(build_after_help());
    let matches = cmd.get_matches();
    let cli = <Cli as clap::FromArgMatches>::from_arg_matches(&matches)?;

    transcript_api::logging::init_stderr(cli.verbose);

    // Load config file (non-fatal if missing/invalid)
    let config = Config::load().unwrap_or_else(|e| {
        debug!("Ignoring config file: {e}");
        Config::default()
    });

    let host = config.resolve_host(cli.host);
    let port = config.resolve_port(cli.port);

    let fetcher = YouTubeFetcher::new(reqwest::Client::new());
    let app = create_router(AppState::new(Arc::new(fetcher)));

    let listener = tokio::net::TcpListener::bind((host.as_str(), port)).await?;
    info!("Transcript API listening on http://{}", listener.local_addr()?);
    info!("Endpoint: POST {TRANSCRIPT_PATH}");

    axum::serve(listener, app).await?;
    Ok(())
}

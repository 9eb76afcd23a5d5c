use std::process::ExitCode;

use clap::Parser;
use eyre::Result;

use transcript_api::command::{FetchCli, run};
use transcript_api::youtube::YouTubeFetcher;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = FetchCli::parse();

    if let Err(e) = transcript_api::logging::init_file("transcript-fetch") {
        eprintln!("Logging disabled: {e}");
    }

    let fetcher = YouTubeFetcher::new(reqwest::Client::new());
    let (line, code) = run(&fetcher, cli.video_id.as_deref()).await?;
    println!("{line}");
    Ok(code)
}

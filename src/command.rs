use std::process::ExitCode;

use clap::Parser;
use eyre::Result;

use crate::output::render_json_line;
use crate::retrieval::default_languages;
use crate::{RetrievalResult, TranscriptFetcher, retrieve};

pub const MISSING_VIDEO_ID: &str = "No video ID provided";

#[derive(Parser)]
#[command(
    name = "transcript-fetch",
    about = "Print a YouTube transcript as one JSON line",
    version = env!("GIT_DESCRIBE"),
)]
pub struct FetchCli {
    /// YouTube video ID (not a URL)
    #[arg(allow_hyphen_values = true)]
    pub video_id: Option<String>,

    /// Anything after the video ID is ignored
    #[arg(hide = true, trailing_var_arg = true, allow_hyphen_values = true)]
    pub ignored: Vec<String>,
}

/// Fetch one transcript and render the stdout line plus exit status.
///
/// Only a missing video ID fails the process; retrieval errors go in the JSON.
pub async fn run(fetcher: &dyn TranscriptFetcher, video_id: Option<&str>) -> Result<(String, ExitCode)> {
    let Some(video_id) = video_id else {
        let line = render_json_line(&RetrievalResult::failure(MISSING_VIDEO_ID))?;
        return Ok((line, ExitCode::FAILURE));
    };

    let result = retrieve(fetcher, video_id, &default_languages()).await;
    Ok((render_json_line(&result)?, ExitCode::SUCCESS))
}

use async_trait::async_trait;
use log::{debug, info, warn};
use serde::Serialize;
use serde::ser::{SerializeMap, Serializer};

use crate::output::transcript_preview;

/// Languages requested when the caller doesn't say otherwise
pub const DEFAULT_LANGUAGES: &[&str] = &["en"];

const DISABLED_MESSAGE: &str = "Transcripts are disabled for this video";

pub fn default_languages() -> Vec<String> {
    DEFAULT_LANGUAGES.iter().map(|l| l.to_string()).collect()
}

/// A caption cue as delivered by the transcript source
#[derive(Debug, Clone, PartialEq)]
pub struct Cue {
    pub text: String,
    pub start: f64,
    pub duration: f64,
}

/// A single timed segment of a transcript
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Segment {
    pub start: f64,
    pub duration: f64,
    pub end: f64,
    pub text: String,
}

impl Segment {
    pub fn from_cue(cue: Cue) -> Self {
        Segment {
            start: cue.start,
            duration: cue.duration,
            end: cue.start + cue.duration,
            text: cue.text,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("subtitles are disabled for this video")]
    TranscriptsDisabled,

    #[error("no transcript found for any of the requested language codes: {}", .languages.join(", "))]
    NoTranscriptFound { languages: Vec<String> },

    #[error("video is unavailable: {0}")]
    VideoUnavailable(String),

    #[error("YouTube is blocking requests from this IP (too many requests)")]
    TooManyRequests,

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("could not parse caption data: {0}")]
    Parse(String),

    #[error("{0}")]
    Other(String),
}

/// Source of caption cues for a video
#[async_trait]
pub trait TranscriptFetcher: Send + Sync {
    /// Fetch the cues of the first track matching `languages`, tried in order.
    async fn fetch(&self, video_id: &str, languages: &[String]) -> Result<Vec<Cue>, FetchError>;
}

/// Outcome of one retrieval; exactly one of segments or error
#[derive(Debug, Clone, PartialEq)]
pub enum RetrievalResult {
    Success(Vec<Segment>),
    Failure(String),
}

impl RetrievalResult {
    pub fn failure(message: impl Into<String>) -> Self {
        RetrievalResult::Failure(message.into())
    }
}

impl Serialize for RetrievalResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        match self {
            RetrievalResult::Success(segments) => {
                map.serialize_entry("success", &true)?;
                map.serialize_entry("segments", segments)?;
            }
            RetrievalResult::Failure(error) => {
                map.serialize_entry("success", &false)?;
                map.serialize_entry("error", error)?;
            }
        }
        map.end()
    }
}

/// Fetch a transcript once and reshape the outcome. Never retries.
pub async fn retrieve(fetcher: &dyn TranscriptFetcher, video_id: &str, languages: &[String]) -> RetrievalResult {
    debug!("Fetching transcript: video={video_id} languages={languages:?}");

    match fetcher.fetch(video_id, languages).await {
        Ok(cues) => {
            let segments: Vec<Segment> = cues.into_iter().map(Segment::from_cue).collect();
            info!("Fetched transcript for {video_id}: {} segments", segments.len());
            debug!("Transcript preview: {}", transcript_preview(&segments));
            RetrievalResult::Success(segments)
        }
        Err(e) => {
            warn!("Transcript fetch failed for {video_id}: {e}");
            RetrievalResult::Failure(describe_error(&e, languages))
        }
    }
}

/// Map a fetch error to the message reported to callers
pub fn describe_error(err: &FetchError, languages: &[String]) -> String {
    match err {
        FetchError::TranscriptsDisabled => DISABLED_MESSAGE.to_string(),
        FetchError::NoTranscriptFound { .. } => not_found_message(languages),
        other => classify_message(&other.to_string(), languages),
    }
}

/// Fallback for errors that only carry a message
pub fn classify_message(message: &str, languages: &[String]) -> String {
    let lower = message.to_lowercase();
    if lower.contains("disabled") {
        DISABLED_MESSAGE.to_string()
    } else if lower.contains("no transcript") {
        not_found_message(languages)
    } else {
        message.to_string()
    }
}

fn not_found_message(languages: &[String]) -> String {
    match languages {
        [lang] if lang == "en" => "No English transcript found for this video".to_string(),
        _ => format!("No transcript found for this video in: {}", languages.join(", ")),
    }
}

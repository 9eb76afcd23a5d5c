pub mod api;
pub mod command;
pub mod config;
pub mod logging;
pub mod output;
pub mod retrieval;
pub mod youtube;

pub use retrieval::{Cue, FetchError, RetrievalResult, Segment, TranscriptFetcher, retrieve};

const SHORT_LINK_MARKER: &str = "youtu.be/";
const WATCH_PAGE_MARKER: &str = "youtube.com/watch";

/// Input was empty, or a recognized URL carried no video ID
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid video URL")]
pub struct InvalidVideoUrl;

/// True when the input mentions a YouTube domain and should go through extraction
pub fn looks_like_url(input: &str) -> bool {
    input.contains("youtube.com") || input.contains("youtu.be")
}

/// Pull the video ID out of a youtu.be or youtube.com/watch URL.
///
/// Anything else is returned unchanged; the caption fetch rejects IDs that don't exist.
/// A watch URL without a `v` parameter yields an empty string.
pub fn parse_video_id(input: &str) -> String {
    if let Some(rest) = input.split(SHORT_LINK_MARKER).nth(1) {
        return rest
            .split('?')
            .next()
            .and_then(|s| s.split('&').next())
            .unwrap_or_default()
            .to_string();
    }

    if input.contains(WATCH_PAGE_MARKER) {
        let query = input
            .split_once('?')
            .map(|(_, q)| q.split('#').next().unwrap_or_default())
            .unwrap_or_default();
        return url::form_urlencoded::parse(query.as_bytes())
            .find(|(k, v)| k == "v" && !v.is_empty())
            .map(|(_, v)| v.into_owned())
            .unwrap_or_default();
    }

    input.to_string()
}

/// Extract a video ID, failing when nothing usable is left
pub fn extract_video_id(input: &str) -> Result<String, InvalidVideoUrl> {
    if input.is_empty() {
        return Err(InvalidVideoUrl);
    }
    let video_id = parse_video_id(input);
    if video_id.is_empty() {
        return Err(InvalidVideoUrl);
    }
    Ok(video_id)
}

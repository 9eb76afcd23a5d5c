use std::any::Any;
use std::sync::Arc;
use std::time::Instant;

use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, Request, State};
use axum::http::{HeaderValue, Method, StatusCode, header};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use log::{error, info};
use serde::Serialize;
use serde_json::Value;
use tower_http::catch_panic::CatchPanicLayer;

use crate::retrieval::default_languages;
use crate::{InvalidVideoUrl, RetrievalResult, Segment, TranscriptFetcher, extract_video_id, looks_like_url, retrieve};

pub const TRANSCRIPT_PATH: &str = "/api/transcript";
pub const SERVICE_NAME: &str = "transcript-api";

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Clone)]
pub struct AppState {
    pub fetcher: Arc<dyn TranscriptFetcher>,
    pub languages: Vec<String>,
}

impl AppState {
    pub fn new(fetcher: Arc<dyn TranscriptFetcher>) -> Self {
        Self {
            fetcher,
            languages: default_languages(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Invalid JSON in request body")]
    InvalidJson,

    #[error("Request body must be a JSON object")]
    NotAnObject,

    #[error("Missing videoId or url parameter")]
    MissingParameter,

    #[error(transparent)]
    InvalidVideoUrl(#[from] InvalidVideoUrl),

    #[error("Not found")]
    NotFound,

    #[error("Method not allowed")]
    MethodNotAllowed,

    #[error("{0}")]
    Retrieval(String),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::InvalidJson | ApiError::NotAnObject | ApiError::MissingParameter | ApiError::InvalidVideoUrl(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::Retrieval(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    success: bool,
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            success: false,
            error: self.to_string(),
        };
        (self.status_code(), Json(body)).into_response()
    }
}

/// Video metadata returned alongside a transcript.
///
/// Only `id` and the derived URLs are real; the rest are fixed placeholders.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoInfo {
    pub id: String,
    pub title: String,
    pub description: String,
    pub thumbnail_url: String,
    pub channel_name: String,
    pub duration: u64,
    pub url: String,
}

impl VideoInfo {
    pub fn placeholder(video_id: &str) -> Self {
        VideoInfo {
            id: video_id.to_string(),
            title: format!("Video {video_id}"),
            description: String::new(),
            thumbnail_url: format!("https://img.youtube.com/vi/{video_id}/maxresdefault.jpg"),
            channel_name: "Unknown".to_string(),
            duration: 0,
            url: format!("https://www.youtube.com/watch?v={video_id}"),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptResponse {
    pub success: bool,
    pub transcript: Vec<Segment>,
    pub video_info: VideoInfo,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub message: &'static str,
}

/// Create the API router: health check, transcript extraction, and CORS preflight.
///
/// Request bodies are read in full; there is no size cap.
pub fn create_router(state: AppState) -> Router {
    let transcript_routes = get(health)
        .post(fetch_transcript)
        .options(preflight)
        .fallback(method_not_allowed);

    Router::new()
        .route(TRANSCRIPT_PATH, transcript_routes.clone())
        .route("/api/transcript/", transcript_routes)
        .fallback(fallback)
        .layer(DefaultBodyLimit::disable())
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(middleware::from_fn(request_logging))
        .layer(middleware::from_fn(cors_headers))
        .with_state(state)
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        service: SERVICE_NAME,
        message: "Use POST to fetch transcripts",
    })
}

pub async fn fetch_transcript(State(state): State<AppState>, body: Bytes) -> ApiResult<Json<TranscriptResponse>> {
    let requested = requested_video(&body)?;
    let video_id = if looks_like_url(&requested) {
        extract_video_id(&requested)?
    } else {
        requested
    };

    match retrieve(state.fetcher.as_ref(), &video_id, &state.languages).await {
        RetrievalResult::Success(segments) => Ok(Json(TranscriptResponse {
            success: true,
            transcript: segments,
            video_info: VideoInfo::placeholder(&video_id),
        })),
        RetrievalResult::Failure(error) => Err(ApiError::Retrieval(error)),
    }
}

pub async fn preflight() -> StatusCode {
    StatusCode::OK
}

async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed
}

/// POST and OPTIONS are served on any path; other GETs are unknown
async fn fallback(state: State<AppState>, method: Method, body: Bytes) -> Response {
    match method {
        Method::POST => fetch_transcript(state, body).await.into_response(),
        Method::OPTIONS => preflight().await.into_response(),
        Method::GET | Method::HEAD => ApiError::NotFound.into_response(),
        _ => ApiError::MethodNotAllowed.into_response(),
    }
}

/// `videoId`, else `url`; an empty body counts as `{}`
fn requested_video(body: &[u8]) -> ApiResult<String> {
    let data: Value = if body.is_empty() {
        Value::Object(Default::default())
    } else {
        serde_json::from_slice(body).map_err(|_| ApiError::InvalidJson)?
    };
    let fields = data.as_object().ok_or(ApiError::NotAnObject)?;

    ["videoId", "url"]
        .iter()
        .filter_map(|key| fields.get(*key).and_then(Value::as_str))
        .find(|value| !value.is_empty())
        .map(str::to_string)
        .ok_or(ApiError::MissingParameter)
}

fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let message = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "Internal server error".to_string()
    };
    error!("Handler panicked: {message}");
    ApiError::Internal(message).into_response()
}

/// Permissive CORS headers on every response.
pub async fn cors_headers(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, POST, OPTIONS"),
    );
    headers.insert(header::ACCESS_CONTROL_ALLOW_HEADERS, HeaderValue::from_static("Content-Type"));
    response
}

/// Request logging middleware.
pub async fn request_logging(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = Instant::now();

    let response = next.run(request).await;

    info!(
        "{method} {uri} -> {} ({} ms)",
        response.status().as_u16(),
        start.elapsed().as_millis()
    );
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FetchError;
    use crate::retrieval::tests::{StubFetcher, sample_cues};
    use axum::body::Body;
    use axum::http::HeaderMap;
    use tower::ServiceExt;

    async fn call(fetcher: StubFetcher, request: axum::http::Request<Body>) -> (StatusCode, HeaderMap, Bytes) {
        let app = create_router(AppState::new(Arc::new(fetcher)));
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, headers, body)
    }

    fn request(method: Method, uri: &str, body: &str) -> axum::http::Request<Body> {
        axum::http::Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn post(fetcher: StubFetcher, body: &str) -> (StatusCode, Value) {
        let (status, headers, bytes) = call(fetcher, request(Method::POST, TRANSCRIPT_PATH, body)).await;
        assert_cors(&headers);
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn ok_fetcher() -> StubFetcher {
        StubFetcher::Cues(sample_cues())
    }

    fn assert_cors(headers: &HeaderMap) {
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_METHODS], "GET, POST, OPTIONS");
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_HEADERS], "Content-Type");
    }

    #[tokio::test]
    async fn test_health() {
        for path in [TRANSCRIPT_PATH, "/api/transcript/"] {
            let (status, headers, body) = call(ok_fetcher(), request(Method::GET, path, "")).await;
            assert_eq!(status, StatusCode::OK);
            assert_cors(&headers);
            assert_eq!(headers[header::CONTENT_TYPE], "application/json");
            let json: Value = serde_json::from_slice(&body).unwrap();
            assert_eq!(json["status"], "ok");
            assert_eq!(json["service"], "transcript-api");
            assert_eq!(json["message"], "Use POST to fetch transcripts");
        }
    }

    #[tokio::test]
    async fn test_health_ignores_query_string() {
        let (status, _, body) = call(ok_fetcher(), request(Method::GET, "/api/transcript?x=1", "")).await;
        assert_eq!(status, StatusCode::OK);
        let json: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "ok");
    }

    #[tokio::test]
    async fn test_get_unknown_path() {
        let (status, headers, body) = call(ok_fetcher(), request(Method::GET, "/elsewhere", "")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_cors(&headers);
        let json: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json, serde_json::json!({"success": false, "error": "Not found"}));
    }

    #[tokio::test]
    async fn test_preflight() {
        for path in [TRANSCRIPT_PATH, "/anything"] {
            let (status, headers, body) = call(ok_fetcher(), request(Method::OPTIONS, path, "")).await;
            assert_eq!(status, StatusCode::OK);
            assert_cors(&headers);
            assert!(body.is_empty());
        }
    }

    #[tokio::test]
    async fn test_other_method() {
        let (status, headers, _) = call(ok_fetcher(), request(Method::PUT, TRANSCRIPT_PATH, "{}")).await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
        assert_cors(&headers);
    }

    #[tokio::test]
    async fn test_post_video_id() {
        let (status, json) = post(ok_fetcher(), r#"{"videoId":"ABC123"}"#).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["success"], true);
        assert_eq!(json["videoInfo"]["id"], "ABC123");
        assert_eq!(
            json["videoInfo"]["thumbnailUrl"],
            "https://img.youtube.com/vi/ABC123/maxresdefault.jpg"
        );
        assert_eq!(json["videoInfo"]["url"], "https://www.youtube.com/watch?v=ABC123");
        assert_eq!(json["videoInfo"]["title"], "Video ABC123");
        assert_eq!(json["videoInfo"]["channelName"], "Unknown");
        assert_eq!(json["videoInfo"]["description"], "");
        assert_eq!(json["videoInfo"]["duration"], 0);

        let transcript = json["transcript"].as_array().unwrap();
        assert_eq!(transcript.len(), 2);
        assert_eq!(transcript[0]["text"], "Hello world");
        for seg in transcript {
            let start = seg["start"].as_f64().unwrap();
            let duration = seg["duration"].as_f64().unwrap();
            assert_eq!(seg["end"].as_f64().unwrap(), start + duration);
        }
    }

    #[tokio::test]
    async fn test_post_short_url() {
        let (status, json) = post(ok_fetcher(), r#"{"url":"https://youtu.be/ABC123?t=10"}"#).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["videoInfo"]["id"], "ABC123");
    }

    #[tokio::test]
    async fn test_post_empty_video_id_falls_back_to_url() {
        let body = r#"{"videoId":"","url":"https://www.youtube.com/watch?v=XYZ789&t=5"}"#;
        let (status, json) = post(ok_fetcher(), body).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["videoInfo"]["id"], "XYZ789");
    }

    #[tokio::test]
    async fn test_post_watch_url_without_v() {
        let (status, json) = post(ok_fetcher(), r#"{"url":"https://www.youtube.com/watch?t=5"}"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json, serde_json::json!({"success": false, "error": "Invalid video URL"}));
    }

    #[tokio::test]
    async fn test_post_missing_parameter() {
        for body in ["{}", ""] {
            let (status, json) = post(ok_fetcher(), body).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(json["error"], "Missing videoId or url parameter");
        }
    }

    #[tokio::test]
    async fn test_post_invalid_json() {
        let (status, json) = post(ok_fetcher(), "{not json").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["success"], false);
        assert_eq!(json["error"], "Invalid JSON in request body");
    }

    #[tokio::test]
    async fn test_post_non_object() {
        let (status, json) = post(ok_fetcher(), r#"["ABC123"]"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "Request body must be a JSON object");
    }

    #[tokio::test]
    async fn test_post_disabled() {
        let (status, json) = post(StubFetcher::Fails(|| FetchError::TranscriptsDisabled), r#"{"videoId":"ABC123"}"#).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            json,
            serde_json::json!({"success": false, "error": "Transcripts are disabled for this video"})
        );
    }

    #[tokio::test]
    async fn test_post_large_body() {
        let body = format!(r#"{{"videoId":"ABC123","pad":"{}"}}"#, "x".repeat(3 * 1024 * 1024));
        let (status, json) = post(ok_fetcher(), &body).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["videoInfo"]["id"], "ABC123");
    }

    #[tokio::test]
    async fn test_post_on_other_path() {
        let (status, _, body) = call(ok_fetcher(), request(Method::POST, "/", r#"{"videoId":"ABC123"}"#)).await;
        assert_eq!(status, StatusCode::OK);
        let json: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["videoInfo"]["id"], "ABC123");
    }

    #[tokio::test]
    async fn test_panic_becomes_500() {
        let (status, json) = post(StubFetcher::Panics("fetcher exploded"), r#"{"videoId":"ABC123"}"#).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json, serde_json::json!({"success": false, "error": "fetcher exploded"}));
    }

    #[test]
    fn test_video_info_placeholder() {
        let info = VideoInfo::placeholder("ABC123");
        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "id": "ABC123",
                "title": "Video ABC123",
                "description": "",
                "thumbnailUrl": "https://img.youtube.com/vi/ABC123/maxresdefault.jpg",
                "channelName": "Unknown",
                "duration": 0,
                "url": "https://www.youtube.com/watch?v=ABC123"
            })
        );
    }
}

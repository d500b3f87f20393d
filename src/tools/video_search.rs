//! Educational video lookup against the YouTube Data API.

use super::ToolResult;
use crate::config::VideoSettings;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Upper bound on `maxResults` accepted by the search endpoint.
const MAX_RESULTS_CAP: u32 = 10;

/// Arguments for `youtubeSearch`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoSearchArgs {
    pub query: String,
    #[serde(default = "default_max_results")]
    pub max_results: u32,
    /// Longest acceptable video, in minutes.
    #[serde(default)]
    pub max_duration: Option<f64>,
    #[serde(default = "default_language")]
    pub language: String,
}

fn default_max_results() -> u32 {
    5
}

fn default_language() -> String {
    "en".to_string()
}

/// One video suggestion.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Video {
    pub id: String,
    pub title: String,
    pub description: String,
    pub channel_title: String,
    pub thumbnail_url: String,
    /// Length in seconds.
    pub duration: u64,
    pub duration_formatted: String,
    pub view_count: u64,
    pub embed_url: String,
    pub watch_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoSearchResults {
    pub videos: Vec<Video>,
    pub query: String,
    pub total_results: usize,
}

#[derive(Deserialize)]
struct SearchList {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Deserialize)]
struct SearchItem {
    id: SearchItemId,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchItemId {
    video_id: Option<String>,
}

#[derive(Deserialize)]
struct VideoList {
    #[serde(default)]
    items: Vec<VideoItem>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoItem {
    id: String,
    #[serde(default)]
    snippet: VideoSnippet,
    #[serde(default)]
    content_details: ContentDetails,
    #[serde(default)]
    statistics: Statistics,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct VideoSnippet {
    title: String,
    description: String,
    channel_title: String,
    thumbnails: Thumbnails,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct Thumbnails {
    medium: Option<Thumbnail>,
    default: Option<Thumbnail>,
}

#[derive(Deserialize)]
struct Thumbnail {
    url: String,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct ContentDetails {
    duration: String,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct Statistics {
    /// The API encodes counts as decimal strings.
    view_count: Option<String>,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    error: ApiError,
}

#[derive(Deserialize)]
struct ApiError {
    message: String,
}

impl From<VideoItem> for Video {
    fn from(item: VideoItem) -> Self {
        let duration = parse_iso_duration(&item.content_details.duration);
        let thumbnail_url = item
            .snippet
            .thumbnails
            .medium
            .or(item.snippet.thumbnails.default)
            .map(|t| t.url)
            .unwrap_or_default();

        Self {
            title: item.snippet.title,
            description: item.snippet.description,
            channel_title: item.snippet.channel_title,
            thumbnail_url,
            duration,
            duration_formatted: format_duration(duration),
            view_count: item
                .statistics
                .view_count
                .and_then(|v| v.parse().ok())
                .unwrap_or(0),
            embed_url: format!("https://www.youtube.com/embed/{}", item.id),
            watch_url: format!("https://www.youtube.com/watch?v={}", item.id),
            id: item.id,
        }
    }
}

/// Video search executor.
pub struct VideoSearcher {
    client: reqwest::Client,
    settings: VideoSettings,
}

impl VideoSearcher {
    pub fn new(settings: VideoSettings) -> Self {
        Self {
            client: reqwest::Client::new(),
            settings,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.settings.api_key.as_deref().is_some_and(|k| !k.is_empty())
    }

    /// Search for embeddable videos. Never fails; failures are tagged results.
    pub async fn search(&self, args: &VideoSearchArgs) -> ToolResult {
        let Some(api_key) = self.settings.api_key.as_deref().filter(|k| !k.is_empty()) else {
            warn!("YOUTUBE_API_KEY not configured, skipping video search");
            return video_failure(
                "YouTube API key not configured. Set YOUTUBE_API_KEY to enable video search.",
            );
        };

        info!("Searching videos for '{}'", args.query);

        match self.lookup(api_key, args).await {
            Ok(results) => ToolResult::ok(&results),
            Err(e) => {
                warn!("Video search failed: {}", e);
                video_failure(e)
            }
        }
    }

    async fn lookup(&self, api_key: &str, args: &VideoSearchArgs) -> Result<VideoSearchResults, String> {
        let base = self.settings.api_base.trim_end_matches('/');
        let max_results = args.max_results.min(MAX_RESULTS_CAP).to_string();

        let mut params = vec![
            ("part", "snippet"),
            ("q", args.query.as_str()),
            ("type", "video"),
            ("maxResults", max_results.as_str()),
            ("videoEmbeddable", "true"),
            ("videoSyndicated", "true"),
            ("relevanceLanguage", args.language.as_str()),
            ("key", api_key),
        ];
        if let Some(bucket) = args.max_duration.and_then(duration_bucket) {
            params.push(("videoDuration", bucket));
        }

        let response = self
            .client
            .get(format!("{}/search", base))
            .query(&params)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        if !response.status().is_success() {
            let status = response.status();
            let message = response
                .json::<ApiErrorBody>()
                .await
                .map(|body| body.error.message)
                .unwrap_or_else(|_| format!("YouTube API returned {}", status));
            return Err(message);
        }

        let search: SearchList = response.json().await.map_err(|e| e.to_string())?;
        let ids: Vec<String> = search
            .items
            .into_iter()
            .filter_map(|item| item.id.video_id)
            .collect();

        if ids.is_empty() {
            return Ok(VideoSearchResults {
                videos: Vec::new(),
                query: args.query.clone(),
                total_results: 0,
            });
        }

        let id_list = ids.join(",");
        let response = self
            .client
            .get(format!("{}/videos", base))
            .query(&[
                ("part", "contentDetails,statistics,snippet"),
                ("id", id_list.as_str()),
                ("key", api_key),
            ])
            .send()
            .await
            .map_err(|e| e.to_string())?
            .error_for_status()
            .map_err(|e| e.to_string())?;

        let details: VideoList = response.json().await.map_err(|e| e.to_string())?;
        let videos: Vec<Video> = details.items.into_iter().map(Video::from).collect();

        Ok(VideoSearchResults {
            total_results: videos.len(),
            videos,
            query: args.query.clone(),
        })
    }
}

fn video_failure(error: impl Into<String>) -> ToolResult {
    let mut extra = Map::new();
    extra.insert("videos".to_string(), json!([]));
    ToolResult::failure_with(error, extra)
}

/// Map a maximum length in minutes to the API's duration filter.
pub fn duration_bucket(max_minutes: f64) -> Option<&'static str> {
    if max_minutes <= 4.0 {
        Some("short")
    } else if max_minutes <= 20.0 {
        Some("medium")
    } else {
        None
    }
}

fn iso_duration_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"PT(?:(\d+)H)?(?:(\d+)M)?(?:(\d+)S)?").expect("Invalid regex"))
}

/// Parse an ISO-8601 `PT#H#M#S` duration into seconds. Unparseable input is 0.
pub fn parse_iso_duration(value: &str) -> u64 {
    let Some(caps) = iso_duration_regex().captures(value) else {
        return 0;
    };
    let part = |i: usize| {
        caps.get(i)
            .and_then(|m| m.as_str().parse::<u64>().ok())
            .unwrap_or(0)
    };
    part(1) * 3600 + part(2) * 60 + part(3)
}

/// Format seconds as `H:MM:SS`, or `M:SS` under an hour.
pub fn format_duration(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{}:{:02}", minutes, secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{extract::Query, routing::get, Json, Router};
    use serde_json::Value;
    use std::collections::HashMap;

    #[test]
    fn test_parse_and_format_duration() {
        assert_eq!(parse_iso_duration("PT1H2M3S"), 3723);
        assert_eq!(format_duration(3723), "1:02:03");
        assert_eq!(parse_iso_duration("PT5M"), 300);
        assert_eq!(format_duration(300), "5:00");
        assert_eq!(parse_iso_duration("PT45S"), 45);
        assert_eq!(format_duration(45), "0:45");
        assert_eq!(parse_iso_duration("garbage"), 0);
    }

    #[test]
    fn test_duration_bucket() {
        assert_eq!(duration_bucket(4.0), Some("short"));
        assert_eq!(duration_bucket(10.0), Some("medium"));
        assert_eq!(duration_bucket(20.0), Some("medium"));
        assert_eq!(duration_bucket(60.0), None);
    }

    #[test]
    fn test_args_defaults() {
        let args: VideoSearchArgs = serde_json::from_value(json!({ "query": "css grid" })).unwrap();
        assert_eq!(args.max_results, 5);
        assert_eq!(args.language, "en");
        assert!(args.max_duration.is_none());
    }

    #[tokio::test]
    async fn test_missing_credential_returns_empty_videos() {
        let searcher = VideoSearcher::new(VideoSettings::default());
        let result = searcher
            .search(&VideoSearchArgs {
                query: "rust".to_string(),
                max_results: 5,
                max_duration: None,
                language: "en".to_string(),
            })
            .await;

        assert!(!result.success);
        assert_eq!(result.payload["videos"], json!([]));
        assert!(result.error().unwrap().contains("YOUTUBE_API_KEY"));
    }

    #[tokio::test]
    async fn test_two_step_lookup_against_fake_api() {
        async fn search(Query(q): Query<HashMap<String, String>>) -> Json<Value> {
            assert_eq!(q.get("maxResults").map(String::as_str), Some("10"));
            assert_eq!(q.get("videoDuration").map(String::as_str), Some("medium"));
            assert_eq!(q.get("videoEmbeddable").map(String::as_str), Some("true"));
            Json(json!({ "items": [{ "id": { "videoId": "abc" } }] }))
        }

        async fn videos(Query(q): Query<HashMap<String, String>>) -> Json<Value> {
            assert_eq!(q.get("id").map(String::as_str), Some("abc"));
            Json(json!({
                "items": [{
                    "id": "abc",
                    "snippet": {
                        "title": "Grid in 10 minutes",
                        "description": "Layouts",
                        "channelTitle": "CSS Channel",
                        "thumbnails": { "medium": { "url": "https://i.ytimg.com/abc.jpg" } }
                    },
                    "contentDetails": { "duration": "PT10M5S" },
                    "statistics": { "viewCount": "1234" }
                }]
            }))
        }

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let app = Router::new()
                .route("/search", get(search))
                .route("/videos", get(videos));
            axum::serve(listener, app).await.unwrap();
        });

        let searcher = VideoSearcher::new(VideoSettings {
            api_base: format!("http://{}", addr),
            api_key: Some("yt-test".to_string()),
        });

        let result = searcher
            .search(&VideoSearchArgs {
                query: "css grid".to_string(),
                max_results: 50,
                max_duration: Some(15.0),
                language: "en".to_string(),
            })
            .await;

        assert!(result.success, "{:?}", result.payload);
        assert_eq!(result.payload["totalResults"], json!(1));
        let video = &result.payload["videos"][0];
        assert_eq!(video["duration"], json!(605));
        assert_eq!(video["durationFormatted"], json!("10:05"));
        assert_eq!(video["viewCount"], json!(1234));
        assert_eq!(video["embedUrl"], json!("https://www.youtube.com/embed/abc"));
        assert_eq!(video["thumbnailUrl"], json!("https://i.ytimg.com/abc.jpg"));
    }
}

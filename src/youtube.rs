//! YouTube helpers: thumbnail CDN URLs (no API needed) and an optional Data API v3
//! client for titles, channels and view counts.
//!
//! NOTE: We never log the API key; request URLs are logged without the query string.

use std::time::Duration;

use reqwest::header::USER_AGENT;
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument};

/// Thumbnail resolutions, best first. The client steps down one tag per image-load error.
pub const THUMBNAIL_TAGS: [&str; 4] = ["maxresdefault", "hqdefault", "mqdefault", "default"];

pub fn thumbnail_url(video_id: &str, tag: &str) -> String {
  format!("https://img.youtube.com/vi/{}/{}.jpg", video_id, tag)
}

/// URL to try after `attempt` failed loads; stays on the lowest resolution once exhausted.
pub fn thumbnail_for_attempt(video_id: &str, attempt: usize) -> String {
  let tag = THUMBNAIL_TAGS[attempt.min(THUMBNAIL_TAGS.len() - 1)];
  thumbnail_url(video_id, tag)
}

pub fn thumbnail_candidates(video_id: &str) -> Vec<String> {
  THUMBNAIL_TAGS.iter().map(|t| thumbnail_url(video_id, t)).collect()
}

pub fn watch_url(video_id: &str) -> String {
  format!("https://www.youtube.com/watch?v={}", video_id)
}

/// Metadata for one video as reported by the Data API.
#[derive(Clone, Debug, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VideoInfo {
  pub title: String,
  pub channel_title: String,
  pub published_at: Option<String>,
  pub view_count: Option<u64>,
  pub thumbnail: String,
}

#[derive(Clone)]
pub struct YouTube {
  pub client: reqwest::Client,
  pub api_key: String,
  pub base_url: String,
}

#[derive(Deserialize)]
struct VideoListResponse {
  #[serde(default)]
  items: Vec<VideoItem>,
}

#[derive(Deserialize)]
struct VideoItem {
  snippet: Snippet,
  #[serde(default)]
  statistics: Option<Statistics>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Snippet {
  #[serde(default)] title: String,
  #[serde(default)] channel_title: String,
  #[serde(default)] published_at: Option<String>,
  #[serde(default)] thumbnails: Thumbnails,
}

#[derive(Deserialize, Default)]
struct Thumbnails {
  maxres: Option<Thumb>,
  high: Option<Thumb>,
  medium: Option<Thumb>,
  default: Option<Thumb>,
}

#[derive(Deserialize, Clone)]
struct Thumb {
  url: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Statistics {
  // The API encodes counts as strings.
  view_count: Option<String>,
}

impl YouTube {
  /// Construct the client if we find YOUTUBE_API_KEY; otherwise return None.
  pub fn from_env() -> Option<Self> {
    let api_key = std::env::var("YOUTUBE_API_KEY").ok().filter(|k| !k.is_empty())?;
    let base_url = std::env::var("YOUTUBE_API_BASE_URL")
      .unwrap_or_else(|_| "https://www.googleapis.com/youtube/v3".into());
    Self::new(api_key, base_url)
  }

  pub fn new(api_key: String, base_url: String) -> Option<Self> {
    let client = reqwest::Client::builder()
      .timeout(Duration::from_secs(10))
      .build()
      .ok()?;
    Some(Self { client, api_key, base_url })
  }

  /// Fetch title/channel/views for a video. `Ok(None)` when the API knows no such id.
  #[instrument(level = "info", skip(self))]
  pub async fn fetch_info(&self, video_id: &str) -> Result<Option<VideoInfo>, String> {
    let url = format!("{}/videos", self.base_url.trim_end_matches('/'));
    let res = self.client.get(&url)
      .header(USER_AGENT, "vocab-backend/0.1")
      .query(&[("id", video_id), ("key", self.api_key.as_str()), ("part", "snippet,statistics")])
      .send().await.map_err(|e| e.without_url().to_string())?;

    if !res.status().is_success() {
      let status = res.status();
      error!(target: "youtube", %url, %status, "YouTube Data API error");
      return Err(format!("YouTube Data API HTTP {}", status));
    }

    let body: VideoListResponse = res.json().await.map_err(|e| e.without_url().to_string())?;
    let Some(item) = body.items.into_iter().next() else {
      info!(target: "youtube", %video_id, "No video found with this id");
      return Ok(None);
    };

    let t = item.snippet.thumbnails;
    let thumbnail = t.maxres.or(t.high).or(t.medium).or(t.default).map(|t| t.url).unwrap_or_default();
    let view_count = item.statistics.and_then(|s| s.view_count).and_then(|v| v.parse::<u64>().ok());

    Ok(Some(VideoInfo {
      title: item.snippet.title,
      channel_title: item.snippet.channel_title,
      published_at: item.snippet.published_at,
      view_count,
      thumbnail,
    }))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use axum::{extract::Query, routing::get, Json, Router};
  use std::collections::HashMap;
  use std::net::SocketAddr;

  #[test]
  fn thumbnail_fallback_steps_down_and_saturates() {
    assert_eq!(thumbnail_for_attempt("abc", 0), "https://img.youtube.com/vi/abc/maxresdefault.jpg");
    assert_eq!(thumbnail_for_attempt("abc", 1), "https://img.youtube.com/vi/abc/hqdefault.jpg");
    assert_eq!(thumbnail_for_attempt("abc", 2), "https://img.youtube.com/vi/abc/mqdefault.jpg");
    assert_eq!(thumbnail_for_attempt("abc", 3), "https://img.youtube.com/vi/abc/default.jpg");
    assert_eq!(thumbnail_for_attempt("abc", 9), "https://img.youtube.com/vi/abc/default.jpg");
    assert_eq!(thumbnail_candidates("abc").len(), 4);
  }

  async fn stub_api() -> String {
    let app = Router::new().route("/videos", get(|Query(q): Query<HashMap<String, String>>| async move {
      if q.get("key").map(String::as_str) != Some("k") {
        return Json(serde_json::json!({ "items": [] }));
      }
      match q.get("id").map(String::as_str) {
        Some("abc") => Json(serde_json::json!({
          "items": [{
            "snippet": {
              "title": "Friends Vocabulary",
              "channelTitle": "Learn English",
              "publishedAt": "2023-03-01T00:00:00Z",
              "thumbnails": { "high": { "url": "https://i/high.jpg" }, "default": { "url": "https://i/d.jpg" } }
            },
            "statistics": { "viewCount": "12345" }
          }]
        })),
        _ => Json(serde_json::json!({ "items": [] })),
      }
    }));
    let listener = tokio::net::TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0))).await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
      let _ = axum::serve(listener, app).await;
    });
    format!("http://{}", addr)
  }

  #[tokio::test]
  async fn parses_snippet_and_statistics() {
    let base = stub_api().await;
    let yt = YouTube::new("k".into(), base).unwrap();

    let info = yt.fetch_info("abc").await.unwrap().unwrap();
    assert_eq!(info.title, "Friends Vocabulary");
    assert_eq!(info.channel_title, "Learn English");
    assert_eq!(info.view_count, Some(12345));
    assert_eq!(info.thumbnail, "https://i/high.jpg");

    assert_eq!(yt.fetch_info("missing").await.unwrap(), None);
  }
}

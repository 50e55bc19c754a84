//! Catalog Resolver: which videos can be studied, and in what order.
//!
//! The pre-built manifest is authoritative for both membership and display order.
//! Without a readable manifest, the configured fallback ids are probed through the
//! word loader's path resolution and only the ones with a word file are kept.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use serde::Deserialize;
use tracing::{debug, info, instrument, warn};

use crate::assets::{AssetError, AssetSource};
use crate::config::AppConfig;
use crate::domain::VideoRef;
use crate::manifest::Manifest;
use crate::words::resolve_words_path;
use crate::youtube::VideoInfo;

#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
  /// Manifest order (content modification time, newest first).
  #[default]
  Date,
  Alphabetical,
  Views,
  Title,
}

#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
  Asc,
  #[default]
  Desc,
}

/// First manifest candidate that can be fetched and parsed.
#[instrument(level = "debug", skip(assets))]
pub async fn read_manifest(assets: &dyn AssetSource, paths: &[String]) -> Option<Manifest> {
  for path in paths {
    match assets.fetch_text(path).await {
      Ok(text) => match serde_json::from_str::<Manifest>(&text) {
        Ok(m) => {
          debug!(target: "catalog", %path, videos = m.videos.len(), "Manifest loaded");
          return Some(m);
        }
        Err(e) => warn!(target: "catalog", %path, error = %e, "Manifest is malformed"),
      },
      Err(AssetError::NotFound(_)) => debug!(target: "catalog", %path, "Manifest not found"),
      Err(e) => warn!(target: "catalog", %path, error = %e, "Manifest fetch failed"),
    }
  }
  None
}

fn video_ref(cfg: &AppConfig, id: &str, source_order: usize) -> VideoRef {
  let known = cfg.known_video(id);
  VideoRef {
    id: id.to_string(),
    title: known.map(|v| v.title.clone()).unwrap_or_default(),
    channel_title: known.map(|v| v.channel_title.clone()).unwrap_or_default(),
    source_order,
  }
}

/// Available videos in display order. An empty result means "no videos", not an error.
#[instrument(level = "info", skip_all)]
pub async fn list_available_videos(assets: &dyn AssetSource, cfg: &AppConfig) -> Vec<VideoRef> {
  if let Some(manifest) = read_manifest(assets, &cfg.manifest_paths).await {
    let mut seen = HashSet::new();
    let videos: Vec<VideoRef> = manifest
      .videos
      .iter()
      .map(|e| e.id())
      .filter(|id| !id.is_empty() && seen.insert(id.to_string()))
      .enumerate()
      .map(|(i, id)| video_ref(cfg, id, i))
      .collect();
    info!(target: "catalog", count = videos.len(), source = "manifest", "Catalog resolved");
    return videos;
  }

  let mut videos = Vec::new();
  for candidate in &cfg.fallback_videos {
    if resolve_words_path(assets, &cfg.word_path_templates, &candidate.id).await.is_some() {
      let order = videos.len();
      videos.push(video_ref(cfg, &candidate.id, order));
    } else {
      debug!(target: "catalog", id = %candidate.id, "Fallback candidate has no word file");
    }
  }
  if videos.is_empty() {
    warn!(target: "catalog", "No videos available (no manifest, no fallback candidate resolved)");
  } else {
    info!(target: "catalog", count = videos.len(), source = "fallback_probe", "Catalog resolved");
  }
  videos
}

fn display_title<'a>(v: &'a VideoRef, info: &'a HashMap<String, VideoInfo>) -> &'a str {
  info.get(&v.id).map(|i| i.title.as_str()).filter(|t| !t.is_empty()).unwrap_or(&v.title)
}

fn views(v: &VideoRef, info: &HashMap<String, VideoInfo>) -> u64 {
  info.get(&v.id).and_then(|i| i.view_count).unwrap_or(0)
}

fn compare_text(a: &str, b: &str) -> Ordering {
  a.to_lowercase().cmp(&b.to_lowercase()).then_with(|| a.cmp(b))
}

/// Re-order the catalog on explicit request. `Date`/`Desc` keeps the source order untouched.
/// Sorts are stable, so ties stay in source order in both directions.
pub fn sort_videos(mut videos: Vec<VideoRef>, key: SortKey, direction: SortDirection, info: &HashMap<String, VideoInfo>) -> Vec<VideoRef> {
  let ordered = |o: Ordering| if direction == SortDirection::Desc { o.reverse() } else { o };
  match key {
    // Source order is already newest first.
    SortKey::Date => videos.sort_by(|a, b| ordered(b.source_order.cmp(&a.source_order))),
    SortKey::Alphabetical => videos.sort_by(|a, b| ordered(compare_text(&a.id, &b.id))),
    SortKey::Views => videos.sort_by(|a, b| ordered(views(a, info).cmp(&views(b, info)))),
    SortKey::Title => videos.sort_by(|a, b| ordered(compare_text(display_title(a, info), display_title(b, info)))),
  }
  videos
}

//! Word Store Loader: locate and parse a video's `<id>_words_with_meaning.json`.
//!
//! The same file can live under several site-relative paths depending on how the
//! site is deployed, so the configured path templates are probed in order and the
//! first one that answers a HEAD is fetched. Loading never fails outward; every
//! failure is logged and turns into an empty list.

use tracing::{debug, error, info, instrument, warn};

use crate::assets::{AssetError, AssetSource};
use crate::domain::WordEntry;
use crate::util::{fill_template, trunc_for_log};

#[derive(Debug)]
pub enum LoadError {
  NoCandidate(String),
  Asset(AssetError),
  Malformed(String),
}

impl std::fmt::Display for LoadError {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      LoadError::NoCandidate(id) => write!(f, "no word file found for video {}", id),
      LoadError::Asset(e) => write!(f, "{}", e),
      LoadError::Malformed(e) => write!(f, "invalid JSON format: {}", e),
    }
  }
}

impl std::error::Error for LoadError {}

/// YouTube ids only use `[A-Za-z0-9_-]`; anything else never reaches a path template.
pub fn is_valid_video_id(video_id: &str) -> bool {
  !video_id.is_empty() && video_id.len() <= 64 && video_id.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

/// Candidate paths for a video id, in probe order.
pub fn candidate_paths(templates: &[String], video_id: &str) -> Vec<String> {
  templates.iter().map(|t| fill_template(t, &[("video_id", video_id)])).collect()
}

/// First candidate path whose existence probe succeeds. Probes run one after another.
#[instrument(level = "debug", skip(assets, templates))]
pub async fn resolve_words_path(assets: &dyn AssetSource, templates: &[String], video_id: &str) -> Option<String> {
  if !is_valid_video_id(video_id) {
    warn!(target: "words", video_id = %trunc_for_log(video_id, 80), "Rejected malformed video id");
    return None;
  }
  for path in candidate_paths(templates, video_id) {
    if assets.exists(&path).await {
      debug!(target: "words", %video_id, %path, "Found word file");
      return Some(path);
    }
  }
  debug!(target: "words", %video_id, "No candidate path resolved");
  None
}

/// Same as `load_words`, but returns the failure reason instead of logging it.
#[instrument(level = "info", skip(assets, templates))]
pub async fn try_load_words(assets: &dyn AssetSource, templates: &[String], video_id: &str) -> Result<Vec<WordEntry>, LoadError> {
  let path = resolve_words_path(assets, templates, video_id)
    .await
    .ok_or_else(|| LoadError::NoCandidate(video_id.to_string()))?;

  let text = assets.fetch_text(&path).await.map_err(LoadError::Asset)?;
  let entries: Vec<serde_json::Value> = serde_json::from_str(&text).map_err(|e| {
    error!(target: "words", %video_id, %path, preview = %trunc_for_log(&text, 200), "Word file is not a JSON array");
    LoadError::Malformed(e.to_string())
  })?;

  // A bad entry costs that entry only.
  let total = entries.len();
  let words: Vec<WordEntry> = entries
    .into_iter()
    .enumerate()
    .filter_map(|(i, v)| match serde_json::from_value::<WordEntry>(v) {
      Ok(w) => Some(w),
      Err(e) => {
        warn!(target: "words", %video_id, index = i, error = %e, "Skipping invalid word entry");
        None
      }
    })
    .collect();

  info!(target: "words", %video_id, %path, count = words.len(), skipped = total - words.len(), "Loaded words");
  Ok(words)
}

/// Load a video's words; any failure is logged and yields an empty list.
pub async fn load_words(assets: &dyn AssetSource, templates: &[String], video_id: &str) -> Vec<WordEntry> {
  match try_load_words(assets, templates, video_id).await {
    Ok(words) => words,
    Err(e) => {
      warn!(target: "words", %video_id, error = %e, "Failed to load words; returning empty list");
      Vec::new()
    }
  }
}

#[cfg(test)]
pub(crate) mod tests {
  use super::*;
  use crate::assets::tests::serve_dir;
  use crate::assets::{DirAssets, HttpAssets};
  use crate::config::AppConfig;
  use crate::domain::Level;
  use std::path::Path;

  pub(crate) fn word_json(word: &str, level: &str) -> String {
    format!(r#"{{"word":"{}","level":"{}","meanings_ja":["意味 {}"],"example":"An example with {}."}}"#, word, level, word, word)
  }

  pub(crate) fn write_words(dir: &Path, rel: &str, entries: &[String]) {
    let path = dir.join(rel);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, format!("[{}]", entries.join(","))).unwrap();
  }

  #[test]
  fn candidate_paths_follow_template_order() {
    let cfg = AppConfig::default();
    let paths = candidate_paths(&cfg.word_path_templates, "abc");
    assert_eq!(paths, vec![
      "/abc_words_with_meaning.json",
      "./CaptionData/Youtube/abc_words_with_meaning.json",
      "/CaptionData/Youtube/abc_words_with_meaning.json",
    ]);
  }

  #[tokio::test]
  async fn loads_from_first_path_that_exists() {
    let tmp = tempfile::tempdir().unwrap();
    write_words(tmp.path(), "CaptionData/Youtube/abc_words_with_meaning.json", &[word_json("apple", "A1"), word_json("bargain", "B1")]);
    let assets = DirAssets::new(tmp.path());
    let cfg = AppConfig::default();

    let words = load_words(&assets, &cfg.word_path_templates, "abc").await;
    assert_eq!(words.len(), 2);
    assert_eq!(words[1].level, Level::B1);
  }

  #[tokio::test]
  async fn invalid_entries_are_skipped_not_fatal() {
    let tmp = tempfile::tempdir().unwrap();
    let entries = [word_json("apple", "a1"), word_json("mystery", "Z9"), r#"{"level":"B1"}"#.to_string(), word_json("harbor", "B2")];
    write_words(tmp.path(), "abc_words_with_meaning.json", &entries);
    let assets = DirAssets::new(tmp.path());

    let words = load_words(&assets, &AppConfig::default().word_path_templates, "abc").await;
    let names: Vec<&str> = words.iter().map(|w| w.word.as_str()).collect();
    assert_eq!(names, vec!["apple", "harbor"]);
    assert_eq!(words[0].level, Level::A1);
  }

  #[tokio::test]
  async fn missing_or_malformed_files_yield_empty_list() {
    let tmp = tempfile::tempdir().unwrap();
    std::fs::write(tmp.path().join("bad_words_with_meaning.json"), "{ not json").unwrap();
    let assets = DirAssets::new(tmp.path());
    let cfg = AppConfig::default();

    assert!(load_words(&assets, &cfg.word_path_templates, "nope").await.is_empty());
    assert!(load_words(&assets, &cfg.word_path_templates, "bad").await.is_empty());
    assert!(matches!(
      try_load_words(&assets, &cfg.word_path_templates, "bad").await,
      Err(LoadError::Malformed(_))
    ));
  }

  #[test]
  fn video_id_alphabet() {
    assert!(is_valid_video_id("pT87zqXPw4w"));
    assert!(is_valid_video_id("a-b_C9"));
    assert!(!is_valid_video_id(""));
    assert!(!is_valid_video_id("/evil.host/x"));
    assert!(!is_valid_video_id("../secret"));
    assert!(!is_valid_video_id("id?x=1"));
  }

  #[tokio::test]
  async fn ids_that_would_leave_the_site_load_nothing() {
    let site_dir = tempfile::tempdir().unwrap();
    let foreign_dir = tempfile::tempdir().unwrap();
    write_words(foreign_dir.path(), "x_words_with_meaning.json", &[word_json("secret", "A1")]);
    let site = serve_dir(site_dir.path(), "/VocabTest").await;
    let foreign = serve_dir(foreign_dir.path(), "/f").await;
    let foreign_id = format!("{}/f/x", foreign.trim_start_matches("http:"));

    let assets = HttpAssets::new(&format!("{}/VocabTest/", site)).unwrap();
    let cfg = AppConfig::default();
    assert_eq!(resolve_words_path(&assets, &cfg.word_path_templates, &foreign_id).await, None);
    assert!(load_words(&assets, &cfg.word_path_templates, &foreign_id).await.is_empty());
  }

  #[tokio::test]
  async fn probes_over_http_under_a_deployment_prefix() {
    let tmp = tempfile::tempdir().unwrap();
    write_words(tmp.path(), "CaptionData/Youtube/vid_words_with_meaning.json", &[word_json("harbor", "B2")]);
    let origin = serve_dir(tmp.path(), "/VocabTest").await;
    let assets = HttpAssets::new(&format!("{}/VocabTest/", origin)).unwrap();
    let cfg = AppConfig::default();

    // "/vid_..." and "/CaptionData/..." miss at the origin root; "./CaptionData/..." hits.
    let path = resolve_words_path(&assets, &cfg.word_path_templates, "vid").await;
    assert_eq!(path.as_deref(), Some("./CaptionData/Youtube/vid_words_with_meaning.json"));
    let words = load_words(&assets, &cfg.word_path_templates, "vid").await;
    assert_eq!(words.len(), 1);
    assert_eq!(words[0].word, "harbor");
  }
}

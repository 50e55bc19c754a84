//! Loading application configuration (asset locations, fallback catalog, selection options) from TOML.
//!
//! Every field has a default, so an empty file (or no file at all) yields a working setup.

use serde::Deserialize;
use tracing::{error, info};

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct AppConfig {
  /// Directory holding the static front-end, `video-list.json` and `CaptionData/`.
  pub static_dir: String,
  /// Manifest locations, tried in order.
  pub manifest_paths: Vec<String>,
  /// Word file locations, tried in order. `{video_id}` is substituted.
  pub word_path_templates: Vec<String>,
  /// Probed when the manifest is missing or malformed.
  pub fallback_videos: Vec<FallbackVideo>,
  pub word_count_options: Vec<usize>,
  pub default_word_count: usize,
  /// Sessions untouched for this long are dropped.
  pub session_idle_secs: u64,
  /// Upper bound on live sessions; the least recently used one makes room.
  pub max_sessions: usize,
}

/// Known video used when no manifest can be read.
#[derive(Clone, Debug, Deserialize)]
pub struct FallbackVideo {
  pub id: String,
  #[serde(default)] pub title: String,
  #[serde(default)] pub channel_title: String,
}

impl Default for AppConfig {
  fn default() -> Self {
    Self {
      static_dir: "./static".into(),
      manifest_paths: vec!["./video-list.json".into(), "/video-list.json".into()],
      word_path_templates: vec![
        "/{video_id}_words_with_meaning.json".into(),
        "./CaptionData/Youtube/{video_id}_words_with_meaning.json".into(),
        "/CaptionData/Youtube/{video_id}_words_with_meaning.json".into(),
      ],
      fallback_videos: vec![
        FallbackVideo {
          id: "pT87zqXPw4w".into(),
          title: "Learn English with TV Series: Friends - How to Speak English Like a Native".into(),
          channel_title: "Learn English With TV Series".into(),
        },
        FallbackVideo {
          id: "KypnjJSKi4o".into(),
          title: "Learn English with Movies: The Avengers - English Vocabulary & Phrases".into(),
          channel_title: "Learn English With Movies".into(),
        },
      ],
      word_count_options: vec![5, 10, 15, 20, 25, 30],
      default_word_count: 10,
      session_idle_secs: 30 * 60,
      max_sessions: 1000,
    }
  }
}

impl AppConfig {
  /// Title/channel known locally for a video id, if any.
  pub fn known_video(&self, id: &str) -> Option<&FallbackVideo> {
    self.fallback_videos.iter().find(|v| v.id == id)
  }
}

/// Load `AppConfig` from VOCAB_CONFIG_PATH. Missing variable or any IO/parse error yields defaults.
pub fn load_app_config_from_env() -> AppConfig {
  let Ok(path) = std::env::var("VOCAB_CONFIG_PATH") else {
    return AppConfig::default();
  };
  match std::fs::read_to_string(&path) {
    Ok(s) => match toml::from_str::<AppConfig>(&s) {
      Ok(cfg) => {
        info!(target: "vocab_backend", %path, "Loaded app config (TOML)");
        cfg
      }
      Err(e) => {
        error!(target: "vocab_backend", %path, error = %e, "Failed to parse TOML config; using defaults");
        AppConfig::default()
      }
    },
    Err(e) => {
      error!(target: "vocab_backend", %path, error = %e, "Failed to read TOML config file; using defaults");
      AppConfig::default()
    }
  }
}

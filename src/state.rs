//! Application state: configuration, asset source, profile store, YouTube client and
//! the in-memory caches/sessions shared by the handlers.
//!
//! This module owns:
//!   - the per-video word cache (non-empty lists only, so failures are retried)
//!   - the YouTube metadata cache, plus failed lookups held back for `INFO_RETRY_AFTER`
//!   - active flashcard sessions, keyed by session id, dropped after
//!     `session_idle_secs` without a request and capped at `max_sessions`

use std::{
  collections::HashMap,
  path::Path,
  sync::Arc,
  time::{Duration, Instant},
};

use anyhow::Context as _;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

use crate::assets::{AssetSource, DirAssets, HttpAssets};
use crate::config::{load_app_config_from_env, AppConfig};
use crate::domain::WordEntry;
use crate::session::FlashcardSession;
use crate::store::{JsonFileStore, MemoryStore, ProfileStore};
use crate::words::load_words;
use crate::youtube::{VideoInfo, YouTube};

/// A session plus the time of the last request that touched it.
pub struct LiveSession {
  pub session: FlashcardSession,
  pub last_seen: Instant,
}

impl LiveSession {
  pub fn new(session: FlashcardSession) -> Self {
    Self { session, last_seen: Instant::now() }
  }

  pub fn is_expired(&self, ttl: Duration) -> bool {
    self.last_seen.elapsed() >= ttl
  }
}

/// How long a failed or empty YouTube lookup is remembered before it is tried again.
pub const INFO_RETRY_AFTER: Duration = Duration::from_secs(5 * 60);

pub struct AppState {
  pub config: AppConfig,
  pub assets: Arc<dyn AssetSource>,
  pub store: Arc<dyn ProfileStore>,
  pub youtube: Option<YouTube>,
  pub words_by_video: RwLock<HashMap<String, Arc<Vec<WordEntry>>>>,
  pub video_info: RwLock<HashMap<String, VideoInfo>>,
  pub info_misses: RwLock<HashMap<String, Instant>>,
  pub sessions: RwLock<HashMap<String, LiveSession>>,
}

impl AppState {
  /// Build state from env: load config, pick asset source and store, init YouTube.
  #[instrument(level = "info", skip_all)]
  pub fn new() -> anyhow::Result<Self> {
    let config = load_app_config_from_env();

    let assets: Arc<dyn AssetSource> = match std::env::var("VOCAB_ASSET_BASE_URL") {
      Ok(base) if !base.is_empty() => {
        let http = HttpAssets::new(&base).context("VOCAB_ASSET_BASE_URL")?;
        info!(target: "vocab_backend", base = %http.base(), "Assets fetched over HTTP");
        Arc::new(http)
      }
      _ => {
        info!(target: "vocab_backend", dir = %config.static_dir, "Assets read from static directory");
        Arc::new(DirAssets::new(&config.static_dir))
      }
    };

    let store: Arc<dyn ProfileStore> = match std::env::var("VOCAB_STORE_PATH") {
      Ok(path) if !path.is_empty() => Arc::new(JsonFileStore::open(Path::new(&path)).context("open profile store")?),
      _ => {
        warn!(target: "vocab_backend", "VOCAB_STORE_PATH not set; profiles are kept in memory only");
        Arc::new(MemoryStore::new())
      }
    };

    let youtube = YouTube::from_env();
    if let Some(yt) = &youtube {
      info!(target: "vocab_backend", base_url = %yt.base_url, "YouTube Data API enabled.");
    } else {
      info!(target: "vocab_backend", "YouTube Data API disabled (no YOUTUBE_API_KEY). Using configured titles.");
    }

    Ok(Self::with_parts(config, assets, store, youtube))
  }

  pub fn with_parts(config: AppConfig, assets: Arc<dyn AssetSource>, store: Arc<dyn ProfileStore>, youtube: Option<YouTube>) -> Self {
    Self {
      config,
      assets,
      store,
      youtube,
      words_by_video: RwLock::new(HashMap::new()),
      video_info: RwLock::new(HashMap::new()),
      info_misses: RwLock::new(HashMap::new()),
      sessions: RwLock::new(HashMap::new()),
    }
  }

  /// Words for a video, from cache or the asset source. Empty when nothing could be loaded.
  #[instrument(level = "debug", skip(self))]
  pub async fn words_for(&self, video_id: &str) -> Arc<Vec<WordEntry>> {
    if let Some(words) = { self.words_by_video.read().await.get(video_id).cloned() } {
      debug!(target: "words", %video_id, "Word cache hit");
      return words;
    }
    let words = Arc::new(load_words(self.assets.as_ref(), &self.config.word_path_templates, video_id).await);
    if !words.is_empty() {
      self.words_by_video.write().await.insert(video_id.to_string(), words.clone());
    }
    words
  }

  /// YouTube metadata, cached; `None` when the API is disabled or the lookup failed.
  /// Misses are not retried for `INFO_RETRY_AFTER`.
  #[instrument(level = "debug", skip(self))]
  pub async fn info_for(&self, video_id: &str) -> Option<VideoInfo> {
    if let Some(info) = { self.video_info.read().await.get(video_id).cloned() } {
      return Some(info);
    }
    let yt = self.youtube.as_ref()?;
    if let Some(at) = { self.info_misses.read().await.get(video_id).copied() } {
      if at.elapsed() < INFO_RETRY_AFTER {
        debug!(target: "youtube", %video_id, "Recent lookup failed; not retrying yet");
        return None;
      }
    }
    match yt.fetch_info(video_id).await {
      Ok(Some(info)) => {
        self.info_misses.write().await.remove(video_id);
        self.video_info.write().await.insert(video_id.to_string(), info.clone());
        Some(info)
      }
      Ok(None) => {
        self.info_misses.write().await.insert(video_id.to_string(), Instant::now());
        None
      }
      Err(e) => {
        warn!(target: "youtube", %video_id, error = %e, "YouTube info lookup failed; using fallback title");
        self.info_misses.write().await.insert(video_id.to_string(), Instant::now());
        None
      }
    }
  }

  pub fn session_ttl(&self) -> Duration {
    Duration::from_secs(self.config.session_idle_secs)
  }

  /// Drop idle sessions; returns how many were removed.
  pub async fn sweep_sessions(&self) -> usize {
    let ttl = self.session_ttl();
    let mut sessions = self.sessions.write().await;
    let before = sessions.len();
    sessions.retain(|_, live| !live.is_expired(ttl));
    let removed = before - sessions.len();
    if removed > 0 {
      info!(target: "session", removed, live = sessions.len(), "Idle sessions dropped");
    }
    removed
  }

  /// Snapshot of the metadata cache for sorting.
  pub async fn info_snapshot(&self) -> HashMap<String, VideoInfo> {
    self.video_info.read().await.clone()
  }
}

//! Public protocol structs for the HTTP endpoints (serde ready).
//! Keep this small and stable to evolve backend and frontend independently.

use serde::{Deserialize, Serialize};

use crate::catalog::{SortDirection, SortKey};
use crate::domain::{CounterField, Level, LevelFilter, LevelStat, WordEntry};
use crate::session::{CardPhase, FlashcardSession, SessionProgress, SessionSummary};
use crate::store::StoreError;

#[derive(Serialize)]
pub struct HealthOut {
  pub ok: bool,
  pub store: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct CatalogQuery {
  #[serde(default)]
  pub sort: SortKey,
  #[serde(default)]
  pub direction: SortDirection,
}

/// Catalog entry enriched with YouTube metadata when available.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoOut {
  pub id: String,
  pub title: String,
  pub channel_title: String,
  pub source_order: usize,
  pub view_count: Option<u64>,
  pub published_at: Option<String>,
  /// CDN URLs, best resolution first; the client moves down the list on load errors.
  pub thumbnails: Vec<String>,
  pub watch_url: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WordsOut {
  pub video_id: String,
  pub total: usize,
  pub words: Vec<WordEntry>,
  pub stats: Vec<LevelStat>,
  pub word_count_options: Vec<usize>,
  /// Set when the word list could not be loaded; the list is then empty.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub notice: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ThumbnailQuery {
  #[serde(default)]
  pub attempt: usize,
}

#[derive(Serialize)]
pub struct ThumbnailOut {
  pub url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartSessionIn {
  pub video_id: String,
  #[serde(default)]
  pub video_title: Option<String>,
  #[serde(default)]
  pub level: LevelFilter,
  #[serde(default)]
  pub count: Option<usize>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CardOut {
  pub word: String,
  pub level: Level,
  /// Only present once the answer is revealed.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub answer: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub example: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionOut {
  pub session_id: String,
  pub video_id: String,
  pub video_title: String,
  pub level: LevelFilter,
  pub phase: CardPhase,
  pub progress: SessionProgress,
  pub can_go_back: bool,
  pub card: CardOut,
}

/// Convert the internal session into the public snapshot.
pub fn to_out(s: &FlashcardSession) -> SessionOut {
  let card = s.current();
  let shown = s.phase() == CardPhase::AnswerShown;
  SessionOut {
    session_id: s.id.clone(),
    video_id: s.video_id.clone(),
    video_title: s.video_title.clone(),
    level: s.level,
    phase: s.phase(),
    progress: s.progress(),
    can_go_back: s.can_go_back(),
    card: CardOut {
      word: card.word.clone(),
      level: card.level,
      answer: shown.then(|| card.answer.clone()),
      example: if shown { card.example.clone() } else { None },
    },
  }
}

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StepOut {
  Active { session: SessionOut },
  Completed { summary: SessionSummary },
}

#[derive(Debug, Deserialize)]
pub struct MarkUnknownIn {
  pub uid: String,
}

#[derive(Debug, Deserialize)]
pub struct CounterIn {
  pub field: CounterField,
  pub delta: i64,
}

#[derive(Serialize)]
pub struct CounterOut {
  /// `None` when the user has no profile and nothing was changed.
  pub value: Option<u64>,
}

/// Error body. `retryable` tells the client whether to offer a retry button.
#[derive(Debug, Serialize)]
pub struct ErrorOut {
  pub message: String,
  pub retryable: bool,
}

#[derive(Debug)]
pub enum ApiError {
  NotFound(String),
  /// Degenerate or malformed selection; nothing changed.
  Unprocessable(String),
  BadRequest(String),
  Unavailable(String),
}

impl ApiError {
  pub fn message(&self) -> &str {
    match self {
      ApiError::NotFound(m) | ApiError::Unprocessable(m) | ApiError::BadRequest(m) | ApiError::Unavailable(m) => m,
    }
  }
}

impl From<StoreError> for ApiError {
  fn from(e: StoreError) -> Self {
    match e {
      StoreError::NotFound(_) => ApiError::NotFound(e.to_string()),
      StoreError::Invalid(_) => ApiError::BadRequest(e.to_string()),
      StoreError::Unavailable(_) => ApiError::Unavailable(e.to_string()),
    }
  }
}

//! Core behaviors behind the HTTP handlers: catalog with metadata, word lists with
//! statistics, and the flashcard session lifecycle.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::catalog::{list_available_videos, sort_videos};
use crate::domain::{NewUnknownWord, SelectionCriteria};
use crate::profile::{self, AddOutcome};
use crate::protocol::{to_out, ApiError, CatalogQuery, SessionOut, StartSessionIn, StepOut, VideoOut, WordsOut};
use crate::selection::{build_deck, compute_level_stats, SelectionError};
use crate::session::{FlashcardSession, Step};
use crate::state::{AppState, LiveSession};
use crate::youtube::{thumbnail_candidates, watch_url};

#[instrument(level = "info", skip(state))]
pub async fn catalog(state: &AppState, q: &CatalogQuery) -> Vec<VideoOut> {
  let videos = list_available_videos(state.assets.as_ref(), &state.config).await;
  // One lookup at a time; results are cached after the first request.
  for v in &videos {
    state.info_for(&v.id).await;
  }
  let info = state.info_snapshot().await;
  let sorted = sort_videos(videos, q.sort, q.direction, &info);

  sorted
    .into_iter()
    .map(|v| {
      let meta = info.get(&v.id);
      VideoOut {
        title: meta.map(|m| m.title.clone()).filter(|t| !t.is_empty()).unwrap_or(v.title),
        channel_title: meta.map(|m| m.channel_title.clone()).filter(|t| !t.is_empty()).unwrap_or(v.channel_title),
        source_order: v.source_order,
        view_count: meta.and_then(|m| m.view_count),
        published_at: meta.and_then(|m| m.published_at.clone()),
        thumbnails: thumbnail_candidates(&v.id),
        watch_url: watch_url(&v.id),
        id: v.id,
      }
    })
    .collect()
}

const WORDS_UNAVAILABLE: &str = "単語データの読み込みに失敗しました";

/// Word list and level breakdown. Load failures come back as an empty list plus a notice.
#[instrument(level = "info", skip(state))]
pub async fn video_words(state: &AppState, video_id: &str) -> WordsOut {
  let words = state.words_for(video_id).await.as_ref().clone();
  let notice = if words.is_empty() {
    warn!(target: "words", %video_id, "Word list unavailable");
    Some(WORDS_UNAVAILABLE.to_string())
  } else {
    None
  };
  WordsOut {
    video_id: video_id.to_string(),
    total: words.len(),
    stats: compute_level_stats(&words),
    words,
    word_count_options: state.config.word_count_options.clone(),
    notice,
  }
}

async fn resolve_title(state: &AppState, video_id: &str, given: Option<String>) -> String {
  if let Some(t) = given.filter(|t| !t.trim().is_empty()) {
    return t;
  }
  if let Some(info) = state.info_for(video_id).await {
    if !info.title.is_empty() {
      return info.title;
    }
  }
  state.config.known_video(video_id).map(|v| v.title.clone()).unwrap_or_default()
}

/// Build a deck for the requested level/count and open a session on it.
#[instrument(level = "info", skip(state, req), fields(video_id = %req.video_id, level = %req.level))]
pub async fn start_session(state: &AppState, req: StartSessionIn) -> Result<SessionOut, ApiError> {
  let words = state.words_for(&req.video_id).await;
  if words.is_empty() {
    return Err(ApiError::NotFound(format!("{} ({})", WORDS_UNAVAILABLE, req.video_id)));
  }
  let criteria = SelectionCriteria { level: req.level, count: req.count.unwrap_or(state.config.default_word_count) };

  let cards = build_deck(&words, criteria).map_err(|e| match e {
    SelectionError::NoMatchingWords(_) => ApiError::Unprocessable(format!("選択したレベルに単語がありません ({})", e)),
    SelectionError::InvalidCount => ApiError::BadRequest(e.to_string()),
  })?;

  let title = resolve_title(state, &req.video_id, req.video_title).await;
  let session = FlashcardSession::new(Uuid::new_v4().to_string(), req.video_id, title, criteria.level, cards)
    .map_err(|e| ApiError::Unprocessable(e.to_string()))?;
  let out = to_out(&session);

  let ttl = state.session_ttl();
  let mut sessions = state.sessions.write().await;
  sessions.retain(|_, live| !live.is_expired(ttl));
  while !sessions.is_empty() && sessions.len() >= state.config.max_sessions {
    let Some(oldest) = sessions.iter().min_by_key(|(_, live)| live.last_seen).map(|(id, _)| id.clone()) else { break };
    sessions.remove(&oldest);
    warn!(target: "session", id = %oldest, limit = state.config.max_sessions, "Session limit reached; dropped least recently used");
  }
  info!(target: "session", id = %session.id, cards = out.progress.total, "Session started");
  sessions.insert(session.id.clone(), LiveSession::new(session));
  Ok(out)
}

fn missing(session_id: &str) -> ApiError {
  ApiError::NotFound(format!("unknown or finished session {}", session_id))
}

/// Live session for `session_id`, marked as used. An idle one is dropped and reported missing.
fn touch<'a>(sessions: &'a mut HashMap<String, LiveSession>, session_id: &str, ttl: Duration) -> Result<&'a mut FlashcardSession, ApiError> {
  let expired = sessions.get(session_id).ok_or_else(|| missing(session_id))?.is_expired(ttl);
  if expired {
    sessions.remove(session_id);
    info!(target: "session", id = %session_id, "Session expired");
    return Err(missing(session_id));
  }
  let live = sessions.get_mut(session_id).ok_or_else(|| missing(session_id))?;
  live.last_seen = Instant::now();
  Ok(&mut live.session)
}

pub async fn get_session(state: &AppState, session_id: &str) -> Result<SessionOut, ApiError> {
  let mut sessions = state.sessions.write().await;
  touch(&mut sessions, session_id, state.session_ttl()).map(|s| to_out(s))
}

pub async fn reveal(state: &AppState, session_id: &str) -> Result<SessionOut, ApiError> {
  let mut sessions = state.sessions.write().await;
  let s = touch(&mut sessions, session_id, state.session_ttl())?;
  s.reveal();
  Ok(to_out(s))
}

pub async fn previous(state: &AppState, session_id: &str) -> Result<SessionOut, ApiError> {
  let mut sessions = state.sessions.write().await;
  let s = touch(&mut sessions, session_id, state.session_ttl())?;
  s.previous();
  Ok(to_out(s))
}

/// Advance; on the last card the session is dropped and its summary returned.
#[instrument(level = "info", skip(state))]
pub async fn next(state: &AppState, session_id: &str) -> Result<StepOut, ApiError> {
  let mut sessions = state.sessions.write().await;
  touch(&mut sessions, session_id, state.session_ttl())?;
  let live = sessions.remove(session_id).ok_or_else(|| missing(session_id))?;
  match live.session.next() {
    (Some(s), Step::Advanced) => {
      let out = to_out(&s);
      sessions.insert(session_id.to_string(), LiveSession::new(s));
      Ok(StepOut::Active { session: out })
    }
    (_, Step::Completed(summary)) => {
      info!(target: "session", id = %session_id, total = summary.total_words, learned = summary.learned_words, "Session completed");
      Ok(StepOut::Completed { summary })
    }
    (None, Step::Advanced) => Err(missing(session_id)),
  }
}

/// Save the session's current card to the user's unknown-word list.
#[instrument(level = "info", skip(state))]
pub async fn mark_current_unknown(state: &AppState, session_id: &str, uid: &str) -> Result<AddOutcome, ApiError> {
  let word = {
    let mut sessions = state.sessions.write().await;
    let s = touch(&mut sessions, session_id, state.session_ttl())?;
    let card = s.current();
    NewUnknownWord {
      word: card.word.clone(),
      meaning: card.answer.clone(),
      level: card.level,
      video_title: Some(s.video_title.clone()).filter(|t| !t.is_empty()),
      video_id: Some(s.video_id.clone()),
    }
  };
  Ok(profile::add_unknown_word(state.store.as_ref(), uid, word).await?)
}

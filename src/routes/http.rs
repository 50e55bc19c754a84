//! HTTP endpoint handlers. These are thin wrappers that forward to core logic
//! or the profile client. Each handler is instrumented with its path parameters.

use std::sync::Arc;

use axum::{
  extract::{Path, Query, State},
  http::StatusCode,
  response::{IntoResponse, Response},
  Json,
};
use tracing::{info, instrument, warn};

use crate::domain::{Identity, NewUnknownWord, UnknownWordPatch};
use crate::logic;
use crate::profile;
use crate::protocol::*;
use crate::state::AppState;
use crate::youtube::thumbnail_for_attempt;

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, retryable) = match &self {
      ApiError::NotFound(_) => (StatusCode::NOT_FOUND, false),
      ApiError::Unprocessable(_) => (StatusCode::UNPROCESSABLE_ENTITY, false),
      ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, false),
      ApiError::Unavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, true),
    };
    if retryable {
      warn!(target: "vocab_backend", message = %self.message(), "Request failed; client may retry");
    }
    (status, Json(ErrorOut { message: self.message().to_string(), retryable })).into_response()
  }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

#[instrument(level = "info", skip(state))]
pub async fn http_health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  let store = state.store.ping().await.is_ok();
  Json(HealthOut { ok: true, store })
}

#[instrument(level = "info", skip(state))]
pub async fn http_list_videos(
  State(state): State<Arc<AppState>>,
  Query(q): Query<CatalogQuery>,
) -> impl IntoResponse {
  let videos = logic::catalog(&state, &q).await;
  info!(target: "catalog", count = videos.len(), "HTTP catalog served");
  Json(videos)
}

#[instrument(level = "info", skip(state))]
pub async fn http_video_words(
  State(state): State<Arc<AppState>>,
  Path(video_id): Path<String>,
) -> impl IntoResponse {
  Json(logic::video_words(&state, &video_id).await)
}

#[instrument(level = "debug")]
pub async fn http_thumbnail(Path(video_id): Path<String>, Query(q): Query<ThumbnailQuery>) -> impl IntoResponse {
  Json(ThumbnailOut { url: thumbnail_for_attempt(&video_id, q.attempt) })
}

#[instrument(level = "info", skip(state, body), fields(video_id = %body.video_id))]
pub async fn http_start_session(
  State(state): State<Arc<AppState>>,
  Json(body): Json<StartSessionIn>,
) -> Result<(StatusCode, Json<SessionOut>), ApiError> {
  let out = logic::start_session(&state, body).await?;
  Ok((StatusCode::CREATED, Json(out)))
}

#[instrument(level = "debug", skip(state))]
pub async fn http_get_session(State(state): State<Arc<AppState>>, Path(session_id): Path<String>) -> ApiResult<SessionOut> {
  Ok(Json(logic::get_session(&state, &session_id).await?))
}

#[instrument(level = "info", skip(state))]
pub async fn http_reveal(State(state): State<Arc<AppState>>, Path(session_id): Path<String>) -> ApiResult<SessionOut> {
  Ok(Json(logic::reveal(&state, &session_id).await?))
}

#[instrument(level = "info", skip(state))]
pub async fn http_next(State(state): State<Arc<AppState>>, Path(session_id): Path<String>) -> ApiResult<StepOut> {
  Ok(Json(logic::next(&state, &session_id).await?))
}

#[instrument(level = "info", skip(state))]
pub async fn http_previous(State(state): State<Arc<AppState>>, Path(session_id): Path<String>) -> ApiResult<SessionOut> {
  Ok(Json(logic::previous(&state, &session_id).await?))
}

#[instrument(level = "info", skip(state, body), fields(uid = %body.uid))]
pub async fn http_mark_unknown(
  State(state): State<Arc<AppState>>,
  Path(session_id): Path<String>,
  Json(body): Json<MarkUnknownIn>,
) -> Result<(StatusCode, Json<profile::AddOutcome>), ApiError> {
  let outcome = logic::mark_current_unknown(&state, &session_id, &body.uid).await?;
  Ok((StatusCode::CREATED, Json(outcome)))
}

#[instrument(level = "info", skip(state, identity), fields(uid = %identity.uid))]
pub async fn http_sign_in(State(state): State<Arc<AppState>>, Json(identity): Json<Identity>) -> ApiResult<crate::domain::UserProfile> {
  Ok(Json(profile::sign_in(state.store.as_ref(), &identity).await?))
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_profile(State(state): State<Arc<AppState>>, Path(uid): Path<String>) -> ApiResult<crate::domain::UserProfile> {
  profile::get_profile(state.store.as_ref(), &uid)
    .await?
    .map(Json)
    .ok_or_else(|| ApiError::NotFound(format!("no profile for {}", uid)))
}

#[instrument(level = "info", skip(state, body), fields(field = ?body.field, delta = body.delta))]
pub async fn http_increment_counter(
  State(state): State<Arc<AppState>>,
  Path(uid): Path<String>,
  Json(body): Json<CounterIn>,
) -> ApiResult<CounterOut> {
  let value = profile::increment_counter(state.store.as_ref(), &uid, body.field, body.delta).await?;
  Ok(Json(CounterOut { value }))
}

#[instrument(level = "info", skip(state))]
pub async fn http_recalculate(State(state): State<Arc<AppState>>, Path(uid): Path<String>) -> ApiResult<crate::domain::UserProfile> {
  Ok(Json(profile::recalculate_stats(state.store.as_ref(), &uid).await?))
}

#[instrument(level = "info", skip(state))]
pub async fn http_list_unknown_words(State(state): State<Arc<AppState>>, Path(uid): Path<String>) -> ApiResult<Vec<crate::domain::UnknownWordRecord>> {
  Ok(Json(profile::list_unknown_words(state.store.as_ref(), &uid).await?))
}

#[instrument(level = "info", skip(state, body), fields(word = %body.word))]
pub async fn http_add_unknown_word(
  State(state): State<Arc<AppState>>,
  Path(uid): Path<String>,
  Json(body): Json<NewUnknownWord>,
) -> Result<(StatusCode, Json<profile::AddOutcome>), ApiError> {
  let outcome = profile::add_unknown_word(state.store.as_ref(), &uid, body).await?;
  Ok((StatusCode::CREATED, Json(outcome)))
}

#[instrument(level = "info", skip(state, patch))]
pub async fn http_update_unknown_word(
  State(state): State<Arc<AppState>>,
  Path((uid, word_id)): Path<(String, String)>,
  Json(patch): Json<UnknownWordPatch>,
) -> ApiResult<crate::domain::UnknownWordRecord> {
  Ok(Json(profile::update_unknown_word(state.store.as_ref(), &uid, &word_id, patch).await?))
}

#[instrument(level = "info", skip(state))]
pub async fn http_delete_unknown_word(
  State(state): State<Arc<AppState>>,
  Path((uid, word_id)): Path<(String, String)>,
) -> ApiResult<profile::DeleteOutcome> {
  Ok(Json(profile::delete_unknown_word(state.store.as_ref(), &uid, &word_id).await?))
}

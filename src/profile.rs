//! Profile/Unknown-Word Client: user profiles, counters and the learner's
//! "words I didn't know" list on top of a `ProfileStore`.
//!
//! Every operation is a single pass through to the store; nothing here retries.
//! Counter updates are read-modify-write without a transaction, so a failure
//! between a record change and its counter update leaves the counter off by one.
//! `recalculate_stats` is the way to bring it back in line.

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::domain::{CounterField, Identity, NewUnknownWord, UnknownWordPatch, UnknownWordRecord, UserProfile};
use crate::store::{ProfileStore, StoreError};

fn require_uid(uid: &str) -> Result<(), StoreError> {
  if uid.trim().is_empty() {
    return Err(StoreError::Invalid("uid must not be empty".into()));
  }
  Ok(())
}

/// Create or merge the profile for a signed-in identity. New users start with
/// zero counters and a creation date; existing counters are never touched here.
#[instrument(level = "info", skip(store, identity), fields(uid = %identity.uid))]
pub async fn upsert_profile(store: &dyn ProfileStore, identity: &Identity) -> Result<UserProfile, StoreError> {
  require_uid(&identity.uid)?;
  let now = Utc::now();
  let mut profile = match store.get_user(&identity.uid).await? {
    Some(existing) => existing,
    None => {
      info!(target: "profile", uid = %identity.uid, "Creating new profile");
      UserProfile { uid: identity.uid.clone(), created_at: Some(now), ..Default::default() }
    }
  };
  profile.email = identity.email.clone().unwrap_or_default();
  profile.display_name = identity.display_name.clone().unwrap_or_default();
  profile.photo_url = identity.photo_url.clone().unwrap_or_default();
  profile.last_login_at = Some(now);

  store.put_user(profile.clone()).await?;
  Ok(profile)
}

/// Sign-in: the identity provider already authenticated the user; record the login.
pub async fn sign_in(store: &dyn ProfileStore, identity: &Identity) -> Result<UserProfile, StoreError> {
  let profile = upsert_profile(store, identity).await?;
  info!(target: "profile", uid = %profile.uid, "User signed in");
  Ok(profile)
}

pub async fn get_profile(store: &dyn ProfileStore, uid: &str) -> Result<Option<UserProfile>, StoreError> {
  require_uid(uid)?;
  store.get_user(uid).await
}

/// Add `delta` to a counter, clamped at zero. A missing profile is left alone (`Ok(None)`).
#[instrument(level = "info", skip(store))]
pub async fn increment_counter(store: &dyn ProfileStore, uid: &str, field: CounterField, delta: i64) -> Result<Option<u64>, StoreError> {
  require_uid(uid)?;
  let Some(mut profile) = store.get_user(uid).await? else {
    warn!(target: "profile", %uid, ?field, "Counter update skipped: no profile");
    return Ok(None);
  };
  let before = profile.counter(field);
  let counter = profile.counter_mut(field);
  *counter = counter.saturating_add_signed(delta);
  let value = *counter;
  store.put_user(profile).await?;
  debug!(target: "profile", %uid, ?field, before, after = value, "Counter updated");
  Ok(Some(value))
}

/// A stored unknown word plus whether the owner's counter followed.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AddOutcome {
  #[serde(flatten)]
  pub record: UnknownWordRecord,
  /// False when the record was saved but `totalUnknownWords` could not be incremented.
  pub counter_synced: bool,
}

/// Store a new unknown word, then bump the owner's `totalUnknownWords`.
/// Once the record is saved the call succeeds, so a retry never duplicates it.
#[instrument(level = "info", skip(store, word), fields(word = %word.word))]
pub async fn add_unknown_word(store: &dyn ProfileStore, uid: &str, word: NewUnknownWord) -> Result<AddOutcome, StoreError> {
  require_uid(uid)?;
  if word.word.trim().is_empty() {
    return Err(StoreError::Invalid("word must not be empty".into()));
  }
  let record = UnknownWordRecord {
    id: Uuid::new_v4().to_string(),
    uid: uid.to_string(),
    word: word.word,
    meaning: word.meaning,
    level: word.level,
    video_title: word.video_title,
    video_id: word.video_id,
    created_at: Utc::now(),
  };
  store.insert_unknown_word(record.clone()).await?;

  let counter_synced = match increment_counter(store, uid, CounterField::TotalUnknownWords, 1).await {
    Ok(_) => true,
    Err(e) => {
      error!(target: "profile", %uid, id = %record.id, error = %e, "Counter increment failed after add; recalculate to repair");
      false
    }
  };
  info!(target: "profile", %uid, id = %record.id, "Unknown word added");
  Ok(AddOutcome { record, counter_synced })
}

/// Record owned by `uid`; someone else's record is reported as missing.
async fn owned_record(store: &dyn ProfileStore, uid: &str, word_id: &str) -> Result<UnknownWordRecord, StoreError> {
  match store.get_unknown_word(word_id).await? {
    Some(r) if r.uid == uid => Ok(r),
    _ => Err(StoreError::NotFound(format!("unknown word {}", word_id))),
  }
}

#[instrument(level = "info", skip(store, patch))]
pub async fn update_unknown_word(store: &dyn ProfileStore, uid: &str, word_id: &str, patch: UnknownWordPatch) -> Result<UnknownWordRecord, StoreError> {
  require_uid(uid)?;
  let mut record = owned_record(store, uid, word_id).await?;
  if let Some(w) = patch.word {
    if w.trim().is_empty() {
      return Err(StoreError::Invalid("word must not be empty".into()));
    }
    record.word = w;
  }
  if let Some(m) = patch.meaning { record.meaning = m; }
  if let Some(l) = patch.level { record.level = l; }
  store.replace_unknown_word(record.clone()).await?;
  Ok(record)
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DeleteOutcome {
  pub id: String,
  /// False when the record is gone but the counter could not be decremented.
  pub counter_synced: bool,
}

/// Delete a record, then decrement the counter. The delete stands even if the decrement fails.
#[instrument(level = "info", skip(store))]
pub async fn delete_unknown_word(store: &dyn ProfileStore, uid: &str, word_id: &str) -> Result<DeleteOutcome, StoreError> {
  require_uid(uid)?;
  owned_record(store, uid, word_id).await?;
  store.remove_unknown_word(word_id).await?;

  let counter_synced = match increment_counter(store, uid, CounterField::TotalUnknownWords, -1).await {
    Ok(_) => true,
    Err(e) => {
      error!(target: "profile", %uid, %word_id, error = %e, "Counter decrement failed after delete; recalculate to repair");
      false
    }
  };
  Ok(DeleteOutcome { id: word_id.to_string(), counter_synced })
}

pub async fn list_unknown_words(store: &dyn ProfileStore, uid: &str) -> Result<Vec<UnknownWordRecord>, StoreError> {
  require_uid(uid)?;
  store.unknown_words_by_uid(uid).await
}

/// Reset `totalUnknownWords` to the number of records the user actually has.
#[instrument(level = "info", skip(store))]
pub async fn recalculate_stats(store: &dyn ProfileStore, uid: &str) -> Result<UserProfile, StoreError> {
  require_uid(uid)?;
  let actual = store.unknown_words_by_uid(uid).await?.len() as u64;
  let mut profile = store
    .get_user(uid)
    .await?
    .unwrap_or_else(|| UserProfile { uid: uid.to_string(), ..Default::default() });
  profile.total_unknown_words = actual;
  store.put_user(profile.clone()).await?;
  info!(target: "profile", %uid, unknown_words = actual, "Stats recalculated");
  Ok(profile)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::Level;
  use crate::store::MemoryStore;
  use async_trait::async_trait;
  use std::sync::atomic::{AtomicBool, Ordering};

  fn identity(uid: &str) -> Identity {
    Identity { uid: uid.into(), email: Some(format!("{}@example.com", uid)), display_name: Some("Learner".into()), photo_url: None }
  }

  fn new_word(word: &str) -> NewUnknownWord {
    NewUnknownWord { word: word.into(), meaning: "交渉".into(), level: Level::B2, video_title: Some("Friends".into()), video_id: Some("abc".into()) }
  }

  /// Wraps a store and can be told to fail profile writes.
  struct FlakyStore {
    inner: MemoryStore,
    fail_put_user: AtomicBool,
  }

  #[async_trait]
  impl ProfileStore for FlakyStore {
    async fn get_user(&self, uid: &str) -> Result<Option<UserProfile>, StoreError> { self.inner.get_user(uid).await }
    async fn put_user(&self, profile: UserProfile) -> Result<(), StoreError> {
      if self.fail_put_user.load(Ordering::SeqCst) {
        return Err(StoreError::Unavailable("injected".into()));
      }
      self.inner.put_user(profile).await
    }
    async fn insert_unknown_word(&self, r: UnknownWordRecord) -> Result<(), StoreError> { self.inner.insert_unknown_word(r).await }
    async fn get_unknown_word(&self, id: &str) -> Result<Option<UnknownWordRecord>, StoreError> { self.inner.get_unknown_word(id).await }
    async fn replace_unknown_word(&self, r: UnknownWordRecord) -> Result<(), StoreError> { self.inner.replace_unknown_word(r).await }
    async fn remove_unknown_word(&self, id: &str) -> Result<(), StoreError> { self.inner.remove_unknown_word(id).await }
    async fn unknown_words_by_uid(&self, uid: &str) -> Result<Vec<UnknownWordRecord>, StoreError> { self.inner.unknown_words_by_uid(uid).await }
    async fn ping(&self) -> Result<(), StoreError> { self.inner.ping().await }
  }

  #[tokio::test]
  async fn sign_in_creates_then_preserves_counters() {
    let store = MemoryStore::new();
    let first = sign_in(&store, &identity("u1")).await.unwrap();
    assert_eq!(first.total_unknown_words, 0);
    let created = first.created_at;
    assert!(created.is_some());

    increment_counter(&store, "u1", CounterField::TotalWordsLearned, 7).await.unwrap();
    let again = sign_in(&store, &identity("u1")).await.unwrap();
    assert_eq!(again.total_words_learned, 7);
    assert_eq!(again.created_at, created);
    assert!(sign_in(&store, &identity(" ")).await.is_err());
  }

  #[tokio::test]
  async fn counters_clamp_at_zero_and_skip_missing_profiles() {
    let store = MemoryStore::new();
    assert_eq!(increment_counter(&store, "ghost", CounterField::TotalUnknownWords, 1).await.unwrap(), None);

    upsert_profile(&store, &identity("u1")).await.unwrap();
    assert_eq!(increment_counter(&store, "u1", CounterField::TotalUnknownWords, -3).await.unwrap(), Some(0));
    assert_eq!(increment_counter(&store, "u1", CounterField::TotalUnknownWords, 2).await.unwrap(), Some(2));
  }

  #[tokio::test]
  async fn unknown_word_round_trip() {
    let store = MemoryStore::new();
    upsert_profile(&store, &identity("u1")).await.unwrap();

    let added = add_unknown_word(&store, "u1", new_word("negotiate")).await.unwrap();
    assert!(added.counter_synced);
    let listed = list_unknown_words(&store, "u1").await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!((listed[0].word.as_str(), listed[0].meaning.as_str(), listed[0].level), ("negotiate", "交渉", Level::B2));
    assert_eq!(get_profile(&store, "u1").await.unwrap().unwrap().total_unknown_words, 1);

    let updated = update_unknown_word(&store, "u1", &added.record.id, UnknownWordPatch { level: Some(Level::C1), ..Default::default() }).await.unwrap();
    assert_eq!(updated.level, Level::C1);
    assert_eq!(updated.word, "negotiate");

    let outcome = delete_unknown_word(&store, "u1", &added.record.id).await.unwrap();
    assert!(outcome.counter_synced);
    let listed = list_unknown_words(&store, "u1").await.unwrap();
    assert!(listed.iter().all(|r| r.id != added.record.id));

    let profile = recalculate_stats(&store, "u1").await.unwrap();
    assert_eq!(profile.total_unknown_words, listed.len() as u64);
  }

  #[tokio::test]
  async fn other_users_records_are_invisible() {
    let store = MemoryStore::new();
    let added = add_unknown_word(&store, "owner", new_word("lease")).await.unwrap().record;
    assert!(matches!(delete_unknown_word(&store, "intruder", &added.id).await, Err(StoreError::NotFound(_))));
    assert!(matches!(
      update_unknown_word(&store, "intruder", &added.id, UnknownWordPatch::default()).await,
      Err(StoreError::NotFound(_))
    ));
    assert_eq!(list_unknown_words(&store, "owner").await.unwrap().len(), 1);
  }

  #[tokio::test]
  async fn failed_decrement_is_reported_and_repaired_by_recalculation() {
    let store = FlakyStore { inner: MemoryStore::new(), fail_put_user: AtomicBool::new(false) };
    upsert_profile(&store, &identity("u1")).await.unwrap();
    let a = add_unknown_word(&store, "u1", new_word("a")).await.unwrap().record;
    add_unknown_word(&store, "u1", new_word("b")).await.unwrap();

    store.fail_put_user.store(true, Ordering::SeqCst);
    let outcome = delete_unknown_word(&store, "u1", &a.id).await.unwrap();
    assert!(!outcome.counter_synced);
    assert_eq!(get_profile(&store, "u1").await.unwrap().unwrap().total_unknown_words, 2);

    store.fail_put_user.store(false, Ordering::SeqCst);
    let repaired = recalculate_stats(&store, "u1").await.unwrap();
    assert_eq!(repaired.total_unknown_words, 1);
  }

  #[tokio::test]
  async fn add_with_failed_counter_is_saved_once_and_repairable() {
    let store = FlakyStore { inner: MemoryStore::new(), fail_put_user: AtomicBool::new(false) };
    upsert_profile(&store, &identity("u1")).await.unwrap();

    store.fail_put_user.store(true, Ordering::SeqCst);
    let outcome = add_unknown_word(&store, "u1", new_word("retry")).await.unwrap();
    assert!(!outcome.counter_synced);
    assert_eq!(list_unknown_words(&store, "u1").await.unwrap().len(), 1);
    assert_eq!(get_profile(&store, "u1").await.unwrap().unwrap().total_unknown_words, 0);

    store.fail_put_user.store(false, Ordering::SeqCst);
    assert_eq!(recalculate_stats(&store, "u1").await.unwrap().total_unknown_words, 1);
  }
}

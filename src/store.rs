//! Document store holding user profiles (`users`, keyed by uid) and unknown-word
//! records (`unknownWords`, queried by uid, newest first).
//!
//! The store only offers document primitives; counters, compensation and
//! reconciliation live in `profile`. No transactions: each call stands alone.

use std::collections::HashMap;
use std::fmt;
use std::io::{BufWriter, Write as _};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info, instrument};

use crate::domain::{UnknownWordRecord, UserProfile};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
  NotFound(String),
  Unavailable(String),
  Invalid(String),
}

impl fmt::Display for StoreError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      StoreError::NotFound(what) => write!(f, "not found: {}", what),
      StoreError::Unavailable(e) => write!(f, "store unavailable: {}", e),
      StoreError::Invalid(e) => write!(f, "invalid request: {}", e),
    }
  }
}

impl std::error::Error for StoreError {}

#[async_trait]
pub trait ProfileStore: Send + Sync {
  async fn get_user(&self, uid: &str) -> Result<Option<UserProfile>, StoreError>;
  /// Create or replace the whole profile document.
  async fn put_user(&self, profile: UserProfile) -> Result<(), StoreError>;

  async fn insert_unknown_word(&self, record: UnknownWordRecord) -> Result<(), StoreError>;
  async fn get_unknown_word(&self, id: &str) -> Result<Option<UnknownWordRecord>, StoreError>;
  /// Replace an existing record; `NotFound` if the id is unknown.
  async fn replace_unknown_word(&self, record: UnknownWordRecord) -> Result<(), StoreError>;
  async fn remove_unknown_word(&self, id: &str) -> Result<(), StoreError>;
  /// All records of `uid`, ordered by `created_at` descending.
  async fn unknown_words_by_uid(&self, uid: &str) -> Result<Vec<UnknownWordRecord>, StoreError>;

  /// Connectivity check.
  async fn ping(&self) -> Result<(), StoreError>;
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Documents {
  users: HashMap<String, UserProfile>,
  // Insertion order; ties on created_at resolve newest-inserted first.
  unknown_words: Vec<UnknownWordRecord>,
}

impl Documents {
  fn position(&self, id: &str) -> Option<usize> {
    self.unknown_words.iter().position(|r| r.id == id)
  }

  fn by_uid(&self, uid: &str) -> Vec<UnknownWordRecord> {
    let mut out: Vec<UnknownWordRecord> = self.unknown_words.iter().rev().filter(|r| r.uid == uid).cloned().collect();
    out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    out
  }

  fn insert(&mut self, record: UnknownWordRecord) -> Result<(), StoreError> {
    if self.position(&record.id).is_some() {
      return Err(StoreError::Invalid(format!("duplicate unknown word id {}", record.id)));
    }
    self.unknown_words.push(record);
    Ok(())
  }

  fn replace(&mut self, record: UnknownWordRecord) -> Result<(), StoreError> {
    let i = self.position(&record.id).ok_or_else(|| StoreError::NotFound(format!("unknown word {}", record.id)))?;
    self.unknown_words[i] = record;
    Ok(())
  }

  fn remove(&mut self, id: &str) -> Result<(), StoreError> {
    let i = self.position(id).ok_or_else(|| StoreError::NotFound(format!("unknown word {}", id)))?;
    self.unknown_words.remove(i);
    Ok(())
  }
}

/// Process-local store. Data is lost on restart.
#[derive(Default)]
pub struct MemoryStore {
  docs: RwLock<Documents>,
}

impl MemoryStore {
  pub fn new() -> Self { Self::default() }
}

#[async_trait]
impl ProfileStore for MemoryStore {
  async fn get_user(&self, uid: &str) -> Result<Option<UserProfile>, StoreError> {
    Ok(self.docs.read().await.users.get(uid).cloned())
  }

  async fn put_user(&self, profile: UserProfile) -> Result<(), StoreError> {
    self.docs.write().await.users.insert(profile.uid.clone(), profile);
    Ok(())
  }

  async fn insert_unknown_word(&self, record: UnknownWordRecord) -> Result<(), StoreError> {
    self.docs.write().await.insert(record)
  }

  async fn get_unknown_word(&self, id: &str) -> Result<Option<UnknownWordRecord>, StoreError> {
    let docs = self.docs.read().await;
    Ok(docs.position(id).map(|i| docs.unknown_words[i].clone()))
  }

  async fn replace_unknown_word(&self, record: UnknownWordRecord) -> Result<(), StoreError> {
    self.docs.write().await.replace(record)
  }

  async fn remove_unknown_word(&self, id: &str) -> Result<(), StoreError> {
    self.docs.write().await.remove(id)
  }

  async fn unknown_words_by_uid(&self, uid: &str) -> Result<Vec<UnknownWordRecord>, StoreError> {
    Ok(self.docs.read().await.by_uid(uid))
  }

  async fn ping(&self) -> Result<(), StoreError> { Ok(()) }
}

/// Store persisted as one JSON document, rewritten atomically after every change.
pub struct JsonFileStore {
  path: PathBuf,
  docs: RwLock<Documents>,
}

impl JsonFileStore {
  /// Open `path`, starting empty if the file does not exist yet.
  #[instrument(level = "info")]
  pub fn open(path: &Path) -> Result<Self, StoreError> {
    let docs = match std::fs::read_to_string(path) {
      Ok(text) => serde_json::from_str::<Documents>(&text)
        .map_err(|e| StoreError::Unavailable(format!("{}: {}", path.display(), e)))?,
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => Documents::default(),
      Err(e) => return Err(StoreError::Unavailable(format!("{}: {}", path.display(), e))),
    };
    info!(target: "profile", path = %path.display(), users = docs.users.len(), unknown_words = docs.unknown_words.len(), "Opened JSON store");
    Ok(Self { path: path.to_path_buf(), docs: RwLock::new(docs) })
  }

  /// Serialize, then write and rename on the blocking pool.
  async fn save(&self, docs: &Documents) -> Result<(), StoreError> {
    let bytes = serde_json::to_vec(docs).map_err(|e| StoreError::Unavailable(e.to_string()))?;
    let path = self.path.clone();
    tokio::task::spawn_blocking(move || write_atomic(&path, &bytes))
      .await
      .map_err(|e| StoreError::Unavailable(format!("store writer: {}", e)))??;
    debug!(target: "profile", path = %self.path.display(), "Store saved");
    Ok(())
  }

  /// Apply a change and persist it; the in-memory copy is only updated if the write succeeds.
  async fn mutate<F>(&self, f: F) -> Result<(), StoreError>
  where
    F: FnOnce(&mut Documents) -> Result<(), StoreError> + Send,
  {
    let mut guard = self.docs.write().await;
    let mut next = guard.clone();
    f(&mut next)?;
    // The write lock stays held so saves land in the same order as changes.
    self.save(&next).await?;
    *guard = next;
    Ok(())
  }
}

fn store_dir(path: &Path) -> &Path {
  path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or_else(|| Path::new("."))
}

/// Write to a temp file next to `path`, then rename it over `path`.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
  let unavailable = |e: std::io::Error| StoreError::Unavailable(format!("{}: {}", path.display(), e));
  let parent = store_dir(path);
  std::fs::create_dir_all(parent).map_err(unavailable)?;

  let tmp = tempfile::NamedTempFile::new_in(parent).map_err(unavailable)?;
  {
    let mut writer = BufWriter::new(tmp.as_file());
    writer.write_all(bytes).map_err(unavailable)?;
    writer.flush().map_err(unavailable)?;
  }
  tmp.persist(path).map_err(|e| unavailable(e.error))?;
  Ok(())
}

#[async_trait]
impl ProfileStore for JsonFileStore {
  async fn get_user(&self, uid: &str) -> Result<Option<UserProfile>, StoreError> {
    Ok(self.docs.read().await.users.get(uid).cloned())
  }

  async fn put_user(&self, profile: UserProfile) -> Result<(), StoreError> {
    self.mutate(move |d| {
      d.users.insert(profile.uid.clone(), profile);
      Ok(())
    }).await
  }

  async fn insert_unknown_word(&self, record: UnknownWordRecord) -> Result<(), StoreError> {
    self.mutate(move |d| d.insert(record)).await
  }

  async fn get_unknown_word(&self, id: &str) -> Result<Option<UnknownWordRecord>, StoreError> {
    let docs = self.docs.read().await;
    Ok(docs.position(id).map(|i| docs.unknown_words[i].clone()))
  }

  async fn replace_unknown_word(&self, record: UnknownWordRecord) -> Result<(), StoreError> {
    self.mutate(move |d| d.replace(record)).await
  }

  async fn remove_unknown_word(&self, id: &str) -> Result<(), StoreError> {
    self.mutate(|d| d.remove(id)).await
  }

  async fn unknown_words_by_uid(&self, uid: &str) -> Result<Vec<UnknownWordRecord>, StoreError> {
    Ok(self.docs.read().await.by_uid(uid))
  }

  async fn ping(&self) -> Result<(), StoreError> {
    let parent = store_dir(&self.path);
    if tokio::fs::metadata(parent).await.map(|m| m.is_dir()).unwrap_or(false) { Ok(()) } else { Err(StoreError::Unavailable(format!("{} is not a directory", parent.display()))) }
  }
}

#[cfg(test)]
pub(crate) mod tests {
  use super::*;
  use crate::domain::Level;
  use chrono::{Duration, Utc};

  pub(crate) fn record(id: &str, uid: &str, minutes_ago: i64) -> UnknownWordRecord {
    UnknownWordRecord {
      id: id.into(),
      uid: uid.into(),
      word: format!("word-{}", id),
      meaning: "意味".into(),
      level: Level::B1,
      video_title: None,
      video_id: None,
      created_at: Utc::now() - Duration::minutes(minutes_ago),
    }
  }

  #[tokio::test]
  async fn memory_store_queries_by_uid_newest_first() {
    let store = MemoryStore::new();
    store.insert_unknown_word(record("old", "u1", 10)).await.unwrap();
    store.insert_unknown_word(record("other", "u2", 5)).await.unwrap();
    store.insert_unknown_word(record("new", "u1", 1)).await.unwrap();

    let ids: Vec<String> = store.unknown_words_by_uid("u1").await.unwrap().into_iter().map(|r| r.id).collect();
    assert_eq!(ids, vec!["new", "old"]);
    assert!(matches!(store.insert_unknown_word(record("new", "u1", 0)).await, Err(StoreError::Invalid(_))));
    assert!(matches!(store.remove_unknown_word("missing").await, Err(StoreError::NotFound(_))));
  }

  #[tokio::test]
  async fn json_store_survives_reopen() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("store/db.json");

    let store = JsonFileStore::open(&path).unwrap();
    store.put_user(UserProfile { uid: "u1".into(), total_unknown_words: 2, ..Default::default() }).await.unwrap();
    store.insert_unknown_word(record("a", "u1", 3)).await.unwrap();
    store.insert_unknown_word(record("b", "u1", 2)).await.unwrap();
    store.remove_unknown_word("a").await.unwrap();
    store.ping().await.unwrap();
    drop(store);

    let reopened = JsonFileStore::open(&path).unwrap();
    let user = reopened.get_user("u1").await.unwrap().unwrap();
    assert_eq!(user.total_unknown_words, 2);
    let words = reopened.unknown_words_by_uid("u1").await.unwrap();
    assert_eq!(words.len(), 1);
    assert_eq!(words[0].id, "b");
  }

  #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
  async fn json_store_keeps_every_concurrent_write() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("db.json");
    let store = std::sync::Arc::new(JsonFileStore::open(&path).unwrap());

    let writers: Vec<_> = (0..10)
      .map(|i| {
        let store = store.clone();
        tokio::spawn(async move { store.insert_unknown_word(record(&format!("r{}", i), "u1", i)).await })
      })
      .collect();
    for w in writers {
      w.await.unwrap().unwrap();
    }
    drop(store);

    let reopened = JsonFileStore::open(&path).unwrap();
    assert_eq!(reopened.unknown_words_by_uid("u1").await.unwrap().len(), 10);
  }

  #[tokio::test]
  async fn json_store_rejects_corrupt_file() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("db.json");
    std::fs::write(&path, "{oops").unwrap();
    assert!(matches!(JsonFileStore::open(&path), Err(StoreError::Unavailable(_))));
  }
}

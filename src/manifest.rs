//! Video manifest format plus the offline steps that maintain the data directory:
//! stamping word files with an update date and regenerating `video-list.json`.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use anyhow::Context as _;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info, warn};

pub const WORD_FILE_SUFFIX: &str = "_words_with_meaning.json";

/// `video-list.json`. Only `videos` (and its order) matters at runtime.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub generated_at: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub total_videos: Option<usize>,
  pub videos: Vec<ManifestEntry>,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub details: Vec<ManifestDetail>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ManifestEntry {
  Id(String),
  Detailed {
    id: String,
    #[serde(default, rename = "createdAt")]
    created_at: Option<String>,
    #[serde(default, rename = "modifiedAt")]
    modified_at: Option<String>,
  },
}

impl ManifestEntry {
  pub fn id(&self) -> &str {
    match self {
      ManifestEntry::Id(id) => id,
      ManifestEntry::Detailed { id, .. } => id,
    }
  }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ManifestDetail {
  pub id: String,
  pub modified_at: String,
}

fn iso(ts: DateTime<Utc>) -> String {
  ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn word_files(dir: &Path) -> anyhow::Result<Vec<(String, PathBuf)>> {
  if !dir.is_dir() {
    anyhow::bail!("word data directory not found: {}", dir.display());
  }
  let mut out = Vec::new();
  for entry in std::fs::read_dir(dir).with_context(|| format!("read word data dir: {}", dir.display()))? {
    let path = entry?.path();
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else { continue };
    if let Some(id) = name.strip_suffix(WORD_FILE_SUFFIX) {
      if !id.is_empty() {
        out.push((id.to_string(), path.clone()));
      }
    }
  }
  out.sort();
  Ok(out)
}

/// `video_info.updated_at` of the first element, if the file carries one.
fn sidecar_updated_at(path: &Path) -> Option<DateTime<Utc>> {
  let text = std::fs::read_to_string(path).ok()?;
  let json: Value = serde_json::from_str(&text).ok()?;
  let ts = json.get(0)?.get("video_info")?.get("updated_at")?.as_str()?;
  DateTime::parse_from_rfc3339(ts).ok().map(|t| t.with_timezone(&Utc))
}

fn file_mtime(path: &Path) -> Option<DateTime<Utc>> {
  let mtime: SystemTime = std::fs::metadata(path).ok()?.modified().ok()?;
  Some(DateTime::<Utc>::from(mtime))
}

/// Scan `dir` for word files and build a manifest ordered newest first.
pub fn build_manifest(dir: &Path) -> anyhow::Result<Manifest> {
  let mut dated: Vec<(String, DateTime<Utc>)> = word_files(dir)?
    .into_iter()
    .map(|(id, path)| {
      let ts = sidecar_updated_at(&path).or_else(|| file_mtime(&path)).unwrap_or_default();
      (id, ts)
    })
    .collect();
  // Newest first; ties by id for a stable file.
  dated.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

  Ok(Manifest {
    generated_at: Some(iso(Utc::now())),
    total_videos: Some(dated.len()),
    videos: dated.iter().map(|(id, _)| ManifestEntry::Id(id.clone())).collect(),
    details: dated.into_iter().map(|(id, ts)| ManifestDetail { id, modified_at: iso(ts) }).collect(),
  })
}

/// `manifest` subcommand: write `video-list.json`.
pub fn run_generate(dir: &Path, out: &Path) -> anyhow::Result<Manifest> {
  let manifest = build_manifest(dir)?;
  for entry in &manifest.videos {
    info!(target: "vocab_backend", id = %entry.id(), "Found video file");
  }
  let json = serde_json::to_string_pretty(&manifest).context("serialize manifest")?;
  std::fs::write(out, json).with_context(|| format!("write manifest: {}", out.display()))?;
  info!(target: "vocab_backend", out = %out.display(), total = manifest.videos.len(), "Video list generated");
  Ok(manifest)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StampOutcome {
  Stamped,
  AlreadyStamped,
  NoVideoInfo,
}

fn stamp_file(path: &Path, now: DateTime<Utc>) -> anyhow::Result<StampOutcome> {
  let text = std::fs::read_to_string(path).context("read word file")?;
  let mut json: Value = serde_json::from_str(&text).context("parse word file")?;

  let Some(info) = json.get_mut(0).and_then(|first| first.get_mut("video_info")).and_then(Value::as_object_mut) else {
    return Ok(StampOutcome::NoVideoInfo);
  };
  if info.get("updated_at").is_some_and(|v| !v.is_null()) {
    return Ok(StampOutcome::AlreadyStamped);
  }
  info.insert("updated_at".into(), Value::String(iso(now)));

  let out = serde_json::to_string_pretty(&json).context("serialize word file")?;
  std::fs::write(path, out).context("write word file")?;
  Ok(StampOutcome::Stamped)
}

/// `stamp-dates` subcommand. Per-file failures are logged and skipped.
pub fn run_stamp_dates(dir: &Path) -> anyhow::Result<Vec<(String, StampOutcome)>> {
  let files = word_files(dir)?;
  info!(target: "vocab_backend", count = files.len(), "Adding update dates to word files");
  let now = Utc::now();
  let mut results = Vec::new();
  for (id, path) in files {
    match stamp_file(&path, now) {
      Ok(outcome) => {
        match outcome {
          StampOutcome::Stamped => info!(target: "vocab_backend", %id, "Added update date"),
          StampOutcome::AlreadyStamped => info!(target: "vocab_backend", %id, "Update date already exists"),
          StampOutcome::NoVideoInfo => warn!(target: "vocab_backend", %id, "No video_info found, skipping"),
        }
        results.push((id, outcome));
      }
      Err(e) => error!(target: "vocab_backend", %id, error = ?e, "Failed to stamp word file"),
    }
  }
  Ok(results)
}

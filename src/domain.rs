//! Domain models: CEFR levels, word entries, video references, user profiles
//! and unknown-word records.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// CEFR proficiency tier. Ordering follows the level string (A1 < A2 < ... < C2).
/// Parsed case-insensitively; written upper-case.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(try_from = "String")]
pub enum Level {
  A1,
  A2,
  B1,
  B2,
  C1,
  C2,
}

impl Level {
  pub const ALL: [Level; 6] = [Level::A1, Level::A2, Level::B1, Level::B2, Level::C1, Level::C2];

  pub fn as_str(&self) -> &'static str {
    match self {
      Level::A1 => "A1",
      Level::A2 => "A2",
      Level::B1 => "B1",
      Level::B2 => "B2",
      Level::C1 => "C1",
      Level::C2 => "C2",
    }
  }
}

impl fmt::Display for Level {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for Level {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Level::ALL
      .into_iter()
      .find(|l| l.as_str().eq_ignore_ascii_case(s.trim()))
      .ok_or_else(|| format!("unknown CEFR level '{}'", s))
  }
}

impl TryFrom<String> for Level {
  type Error = String;
  fn try_from(s: String) -> Result<Self, Self::Error> { s.parse() }
}

/// Level choice on the selection screen: every word, or exactly one level.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum LevelFilter {
  All,
  Only(Level),
}

impl LevelFilter {
  pub fn matches(&self, level: Level) -> bool {
    match self {
      LevelFilter::All => true,
      LevelFilter::Only(l) => *l == level,
    }
  }
}

impl Default for LevelFilter {
  fn default() -> Self { LevelFilter::All }
}

impl fmt::Display for LevelFilter {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      LevelFilter::All => f.write_str("all"),
      LevelFilter::Only(l) => f.write_str(l.as_str()),
    }
  }
}

impl FromStr for LevelFilter {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    if s.trim().eq_ignore_ascii_case("all") {
      Ok(LevelFilter::All)
    } else {
      s.parse().map(LevelFilter::Only)
    }
  }
}

impl TryFrom<String> for LevelFilter {
  type Error = String;
  fn try_from(s: String) -> Result<Self, Self::Error> { s.parse() }
}

impl From<LevelFilter> for String {
  fn from(f: LevelFilter) -> Self { f.to_string() }
}

/// One vocabulary item from a video's word file.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(from = "RawWordEntry")]
pub struct WordEntry {
  pub word: String,
  pub level: Level,
  pub meanings: Vec<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub example: Option<String>,
}

/// On-disk shape. Older files carry a single `definition_ja`/`definition_en`
/// instead of the `meanings_ja` array.
#[derive(Deserialize)]
struct RawWordEntry {
  word: String,
  level: Level,
  #[serde(default, alias = "meanings_ja")]
  meanings: Vec<String>,
  #[serde(default)]
  definition_ja: Option<String>,
  #[serde(default)]
  definition_en: Option<String>,
  #[serde(default)]
  example: Option<String>,
}

impl From<RawWordEntry> for WordEntry {
  fn from(raw: RawWordEntry) -> Self {
    let mut meanings: Vec<String> = raw.meanings.into_iter().filter(|m| !m.trim().is_empty()).collect();
    if meanings.is_empty() {
      if let Some(d) = raw.definition_ja.or(raw.definition_en).filter(|d| !d.trim().is_empty()) {
        meanings.push(d);
      }
    }
    let example = raw.example.filter(|e| !e.trim().is_empty());
    WordEntry { word: raw.word, level: raw.level, meanings, example }
  }
}

/// A video available for study. `source_order` is its position in the catalog source.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VideoRef {
  pub id: String,
  pub title: String,
  pub channel_title: String,
  pub source_order: usize,
}

/// What the learner asked for on the selection screen.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct SelectionCriteria {
  pub level: LevelFilter,
  pub count: usize,
}

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct LevelStat {
  pub level: Level,
  pub count: usize,
  pub percentage: u32,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct UserProfile {
  pub uid: String,
  pub email: String,
  pub display_name: String,
  pub photo_url: String,
  pub created_at: Option<DateTime<Utc>>,
  pub last_login_at: Option<DateTime<Utc>>,
  pub total_words_learned: u64,
  pub total_unknown_words: u64,
}

/// Profile counters that can be adjusted in place.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum CounterField {
  TotalWordsLearned,
  TotalUnknownWords,
}

impl UserProfile {
  pub fn counter(&self, field: CounterField) -> u64 {
    match field {
      CounterField::TotalWordsLearned => self.total_words_learned,
      CounterField::TotalUnknownWords => self.total_unknown_words,
    }
  }

  pub fn counter_mut(&mut self, field: CounterField) -> &mut u64 {
    match field {
      CounterField::TotalWordsLearned => &mut self.total_words_learned,
      CounterField::TotalUnknownWords => &mut self.total_unknown_words,
    }
  }
}

/// Identity handed over by the sign-in provider.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Identity {
  pub uid: String,
  pub email: Option<String>,
  pub display_name: Option<String>,
  pub photo_url: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UnknownWordRecord {
  pub id: String,
  pub uid: String,
  pub word: String,
  pub meaning: String,
  pub level: Level,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub video_title: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub video_id: Option<String>,
  pub created_at: DateTime<Utc>,
}

/// Fields supplied when a learner tags a word; id and timestamp are assigned on write.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUnknownWord {
  pub word: String,
  pub meaning: String,
  pub level: Level,
  #[serde(default)]
  pub video_title: Option<String>,
  #[serde(default)]
  pub video_id: Option<String>,
}

/// Partial update of an unknown word; absent fields are left untouched.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct UnknownWordPatch {
  pub word: Option<String>,
  pub meaning: Option<String>,
  pub level: Option<Level>,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn word_entry_accepts_current_and_legacy_shapes() {
    let current: WordEntry = serde_json::from_str(
      r#"{"word":"run","level":"A1","meanings_ja":["走る","運営する"],"example":"I run daily.","video_info":{"updated_at":"2024-01-01T00:00:00Z"}}"#,
    ).unwrap();
    assert_eq!(current.meanings, vec!["走る", "運営する"]);
    assert_eq!(current.example.as_deref(), Some("I run daily."));

    let legacy: WordEntry = serde_json::from_str(
      r#"{"word":"cat","level":"A2","definition_en":"a small animal","definition_ja":"猫"}"#,
    ).unwrap();
    assert_eq!(legacy.meanings, vec!["猫"]);
    assert_eq!(legacy.example, None);
  }

  #[test]
  fn word_levels_are_case_insensitive() {
    let w: WordEntry = serde_json::from_str(r#"{"word":"bargain","level":"b1","meanings_ja":["掘り出し物"]}"#).unwrap();
    assert_eq!(w.level, Level::B1);
    assert_eq!(serde_json::to_string(&w.level).unwrap(), "\"B1\"");
    assert!(serde_json::from_str::<WordEntry>(r#"{"word":"x","level":"N5"}"#).is_err());
  }

  #[test]
  fn level_filter_parses_all_and_levels() {
    assert_eq!("all".parse::<LevelFilter>().unwrap(), LevelFilter::All);
    assert_eq!("b2".parse::<LevelFilter>().unwrap(), LevelFilter::Only(Level::B2));
    assert!("D1".parse::<LevelFilter>().is_err());

    let json = serde_json::to_string(&LevelFilter::Only(Level::C1)).unwrap();
    assert_eq!(json, "\"C1\"");
  }

  #[test]
  fn profile_reads_missing_counters_as_zero() {
    let p: UserProfile = serde_json::from_str(r#"{"uid":"u1","email":"a@b.c"}"#).unwrap();
    assert_eq!(p.total_unknown_words, 0);
    assert_eq!(p.counter(CounterField::TotalWordsLearned), 0);
    assert!(p.created_at.is_none());
  }
}

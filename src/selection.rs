//! Level/Count Selector: level distribution, level filtering and random sampling,
//! plus turning a selection into a flashcard deck.

use std::collections::BTreeMap;
use std::fmt;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;

use crate::domain::{Level, LevelFilter, LevelStat, SelectionCriteria, WordEntry};
use crate::util::percent;

const NO_MEANING: &str = "意味が見つかりません";

/// Per-level counts sorted by level, each percentage rounded on its own.
pub fn compute_level_stats(words: &[WordEntry]) -> Vec<LevelStat> {
  let mut counts: BTreeMap<Level, usize> = BTreeMap::new();
  for w in words {
    *counts.entry(w.level).or_default() += 1;
  }
  counts
    .into_iter()
    .map(|(level, count)| LevelStat { level, count, percentage: percent(count, words.len()) })
    .collect()
}

pub fn filter_by_level(words: &[WordEntry], level: LevelFilter) -> Vec<WordEntry> {
  words.iter().filter(|w| level.matches(w.level)).cloned().collect()
}

/// Uniform sample without replacement of `min(n, len)` words, in shuffled order.
pub fn sample_words_with<R: Rng + ?Sized>(words: &[WordEntry], n: usize, rng: &mut R) -> Vec<WordEntry> {
  let mut picked: Vec<WordEntry> = words.choose_multiple(rng, n.min(words.len())).cloned().collect();
  picked.shuffle(rng);
  picked
}

pub fn sample_words(words: &[WordEntry], n: usize) -> Vec<WordEntry> {
  sample_words_with(words, n, &mut rand::thread_rng())
}

/// One card of a study deck.
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct Flashcard {
  pub word: String,
  pub answer: String,
  pub level: Level,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub example: Option<String>,
}

impl From<&WordEntry> for Flashcard {
  fn from(w: &WordEntry) -> Self {
    let answer = if w.meanings.is_empty() { NO_MEANING.to_string() } else { w.meanings.join("、") };
    Flashcard { word: w.word.clone(), answer, level: w.level, example: w.example.clone() }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionError {
  InvalidCount,
  NoMatchingWords(LevelFilter),
}

impl fmt::Display for SelectionError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      SelectionError::InvalidCount => f.write_str("word count must be at least 1"),
      SelectionError::NoMatchingWords(level) => write!(f, "no words available for level {}", level),
    }
  }
}

impl std::error::Error for SelectionError {}

/// Filter, sample and convert to cards. Rejects selections that would give an empty deck.
pub fn build_deck(words: &[WordEntry], criteria: SelectionCriteria) -> Result<Vec<Flashcard>, SelectionError> {
  if criteria.count == 0 {
    return Err(SelectionError::InvalidCount);
  }
  let filtered = filter_by_level(words, criteria.level);
  if filtered.is_empty() {
    return Err(SelectionError::NoMatchingWords(criteria.level));
  }
  Ok(sample_words(&filtered, criteria.count).iter().map(Flashcard::from).collect())
}

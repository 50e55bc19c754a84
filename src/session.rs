//! Flashcard Session: step through a deck, reveal answers, count what was learned.
//!
//! A card counts as learned when its answer was revealed before moving past it with
//! `next`. Each card counts at most once, so going back and revealing again does not
//! inflate the total.

use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;

use crate::domain::LevelFilter;
use crate::selection::Flashcard;
use crate::util::percent;
use crate::youtube::watch_url;

#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CardPhase {
  AwaitingReveal,
  AnswerShown,
}

#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Feedback {
  Excellent,
  Good,
  KeepGoing,
}

impl Feedback {
  fn for_rate(rate: u32) -> Self {
    if rate >= 80 { Feedback::Excellent } else if rate >= 60 { Feedback::Good } else { Feedback::KeepGoing }
  }
}

/// Emitted once when the last card is passed.
#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
  pub total_words: usize,
  pub learned_words: usize,
  pub completion_rate: u32,
  pub feedback: Feedback,
  pub video_id: String,
  pub video_title: String,
  pub level: LevelFilter,
  pub video_url: String,
}

#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SessionProgress {
  pub current_index: usize,
  pub learned_count: usize,
  pub total: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
  EmptyDeck,
}

impl fmt::Display for SessionError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      SessionError::EmptyDeck => f.write_str("cannot start a session without cards"),
    }
  }
}

impl std::error::Error for SessionError {}

/// Result of `next`.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
  Advanced,
  Completed(SessionSummary),
}

#[derive(Debug, Clone)]
pub struct FlashcardSession {
  pub id: String,
  pub video_id: String,
  pub video_title: String,
  pub level: LevelFilter,
  cards: Vec<Flashcard>,
  index: usize,
  phase: CardPhase,
  learned: BTreeSet<usize>,
}

impl FlashcardSession {
  pub fn new(id: String, video_id: String, video_title: String, level: LevelFilter, cards: Vec<Flashcard>) -> Result<Self, SessionError> {
    if cards.is_empty() {
      return Err(SessionError::EmptyDeck);
    }
    Ok(Self { id, video_id, video_title, level, cards, index: 0, phase: CardPhase::AwaitingReveal, learned: BTreeSet::new() })
  }

  pub fn current(&self) -> &Flashcard { &self.cards[self.index] }
  pub fn phase(&self) -> CardPhase { self.phase }
  pub fn can_go_back(&self) -> bool { self.index > 0 }

  pub fn progress(&self) -> SessionProgress {
    SessionProgress { current_index: self.index, learned_count: self.learned.len(), total: self.cards.len() }
  }

  pub fn reveal(&mut self) {
    self.phase = CardPhase::AnswerShown;
  }

  /// Move on. Consumes the session when the last card is passed.
  pub fn next(mut self) -> (Option<Self>, Step) {
    if self.phase == CardPhase::AnswerShown {
      self.learned.insert(self.index);
    }
    if self.index + 1 < self.cards.len() {
      self.index += 1;
      self.phase = CardPhase::AwaitingReveal;
      (Some(self), Step::Advanced)
    } else {
      let summary = self.summary();
      (None, Step::Completed(summary))
    }
  }

  /// Back one card; a no-op on the first card.
  pub fn previous(&mut self) {
    if self.can_go_back() {
      self.index -= 1;
      self.phase = CardPhase::AwaitingReveal;
    }
  }

  fn summary(&self) -> SessionSummary {
    let total = self.cards.len();
    let learned = self.learned.len();
    let rate = percent(learned, total);
    SessionSummary {
      total_words: total,
      learned_words: learned,
      completion_rate: rate,
      feedback: Feedback::for_rate(rate),
      video_id: self.video_id.clone(),
      video_title: self.video_title.clone(),
      level: self.level,
      video_url: watch_url(&self.video_id),
    }
  }
}

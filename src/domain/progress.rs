use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Mastery record for one (user, word) pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordProgress {
  pub user_id: i64,
  pub word_id: i64,
  /// 0..=100
  pub mastery_level: i64,
  pub review_count: i64,
  pub correct_count: i64,
  pub incorrect_count: i64,
  pub first_learned_at: DateTime<Utc>,
  pub last_reviewed: DateTime<Utc>,
}

/// Practice interaction used for a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PracticeMode {
  Flashcard,
  MultipleChoice,
  Typing,
  Listening,
  Test,
}

impl PracticeMode {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Flashcard => "flashcard",
      Self::MultipleChoice => "multiple_choice",
      Self::Typing => "typing",
      Self::Listening => "listening",
      Self::Test => "test",
    }
  }

  pub fn from_str(s: &str) -> Option<Self> {
    match s {
      "flashcard" => Some(Self::Flashcard),
      "multiple_choice" => Some(Self::MultipleChoice),
      "typing" => Some(Self::Typing),
      "listening" => Some(Self::Listening),
      "test" => Some(Self::Test),
      _ => None,
    }
  }
}

/// Streak counters after an update
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakState {
  pub current: i64,
  pub longest: i64,
  pub last_study_date: Option<NaiveDate>,
}

/// Result of recording a single answer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerOutcome {
  pub progress: WordProgress,
  pub streak: StreakState,
  pub xp_earned: i64,
  pub total_xp: i64,
  pub level: i64,
  pub leveled_up: bool,
  /// Streak milestone crossed by this update, if any
  pub streak_milestone: Option<i64>,
}

/// Result of saving a whole practice session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionOutcome {
  pub mode: PracticeMode,
  pub answered: usize,
  pub correct: usize,
  pub accuracy: f64,
  pub words: Vec<WordProgress>,
  pub streak: StreakState,
  pub xp_earned: i64,
  pub total_xp: i64,
  pub level: i64,
  pub leveled_up: bool,
  /// Streak milestone crossed by this update, if any
  pub streak_milestone: Option<i64>,
}

/// Overall learning summary for a user
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ProgressOverview {
  pub words_learned: i64,
  pub words_mastered: i64,
  pub total_reviews: i64,
  pub average_mastery: f64,
  pub due_for_review: i64,
  pub current_streak: i64,
  pub longest_streak: i64,
  pub xp: i64,
  pub level: i64,
}

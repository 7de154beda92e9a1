use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Counter a badge is evaluated against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BadgeCondition {
  Streak,
  WordsLearned,
  WordsMastered,
  Reviews,
  TestsCompleted,
  PerfectTests,
  Xp,
  Level,
  WordsCreated,
}

impl BadgeCondition {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Streak => "streak",
      Self::WordsLearned => "words_learned",
      Self::WordsMastered => "words_mastered",
      Self::Reviews => "reviews",
      Self::TestsCompleted => "tests_completed",
      Self::PerfectTests => "perfect_tests",
      Self::Xp => "xp",
      Self::Level => "level",
      Self::WordsCreated => "words_created",
    }
  }

  pub fn from_str(s: &str) -> Option<Self> {
    match s {
      "streak" => Some(Self::Streak),
      "words_learned" => Some(Self::WordsLearned),
      "words_mastered" => Some(Self::WordsMastered),
      "reviews" => Some(Self::Reviews),
      "tests_completed" => Some(Self::TestsCompleted),
      "perfect_tests" => Some(Self::PerfectTests),
      "xp" => Some(Self::Xp),
      "level" => Some(Self::Level),
      "words_created" => Some(Self::WordsCreated),
      _ => None,
    }
  }
}

/// Static reward definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Badge {
  pub id: String,
  pub name: String,
  pub description: String,
  pub icon: String,
  pub category: String,
  pub condition: BadgeCondition,
  pub threshold: i64,
  pub xp_reward: i64,
}

/// A user's earned instance of a badge
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Achievement {
  pub id: i64,
  pub user_id: i64,
  pub badge: Badge,
  pub earned_at: DateTime<Utc>,
}

/// Badge with the requesting user's status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BadgeStatus {
  #[serde(flatten)]
  pub badge: Badge,
  pub earned: bool,
  pub earned_at: Option<DateTime<Utc>>,
  pub current_value: i64,
  /// 0..=100
  pub progress: i64,
}

/// Snapshot of every counter a badge can refer to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UserCounters {
  pub streak: i64,
  pub words_learned: i64,
  pub words_mastered: i64,
  pub reviews: i64,
  pub tests_completed: i64,
  pub perfect_tests: i64,
  pub xp: i64,
  pub level: i64,
  pub words_created: i64,
}

impl UserCounters {
  pub fn value_for(&self, condition: BadgeCondition) -> i64 {
    match condition {
      BadgeCondition::Streak => self.streak,
      BadgeCondition::WordsLearned => self.words_learned,
      BadgeCondition::WordsMastered => self.words_mastered,
      BadgeCondition::Reviews => self.reviews,
      BadgeCondition::TestsCompleted => self.tests_completed,
      BadgeCondition::PerfectTests => self.perfect_tests,
      BadgeCondition::Xp => self.xp,
      BadgeCondition::Level => self.level,
      BadgeCondition::WordsCreated => self.words_created,
    }
  }
}

impl Badge {
  pub fn is_met_by(&self, counters: &UserCounters) -> bool {
    counters.value_for(self.condition) >= self.threshold
  }

  pub fn progress_percent(&self, counters: &UserCounters) -> i64 {
    if self.threshold <= 0 {
      return 100;
    }
    (counters.value_for(self.condition) * 100 / self.threshold).clamp(0, 100)
  }
}

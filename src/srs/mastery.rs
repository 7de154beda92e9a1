//! Step-function mastery tracking and the interval-based review queue.
//!
//! A correct answer moves mastery up by 10, a wrong one down by 5, always
//! inside `0..=100`. A word is due once the whole days elapsed since its last
//! review reach `mastery / 10`.

use chrono::{DateTime, Duration, Utc};

use crate::config::{MASTERY_CORRECT_STEP, MASTERY_INCORRECT_STEP, MASTERY_MAX, REVIEW_SESSION_CAP};
use crate::domain::WordProgress;

/// Mastery after one answer
pub fn next_mastery(current: i64, correct: bool) -> i64 {
  let current = current.clamp(0, MASTERY_MAX);
  if correct {
    (current + MASTERY_CORRECT_STEP).min(MASTERY_MAX)
  } else {
    (current - MASTERY_INCORRECT_STEP).max(0)
  }
}

/// Apply an answer to the existing record, or create the first one
pub fn apply_answer(
  previous: Option<&WordProgress>,
  user_id: i64,
  word_id: i64,
  correct: bool,
  now: DateTime<Utc>,
) -> WordProgress {
  match previous {
    Some(prev) => WordProgress {
      mastery_level: next_mastery(prev.mastery_level, correct),
      review_count: prev.review_count + 1,
      correct_count: prev.correct_count + i64::from(correct),
      incorrect_count: prev.incorrect_count + i64::from(!correct),
      last_reviewed: now,
      ..prev.clone()
    },
    None => WordProgress {
      user_id,
      word_id,
      mastery_level: if correct { MASTERY_CORRECT_STEP } else { 0 },
      review_count: 1,
      correct_count: i64::from(correct),
      incorrect_count: i64::from(!correct),
      first_learned_at: now,
      last_reviewed: now,
    },
  }
}

/// Whole days a word waits between reviews at the given mastery
pub fn review_interval_days(mastery_level: i64) -> i64 {
  mastery_level.clamp(0, MASTERY_MAX) / 10
}

/// Whole days since the last review (floored)
pub fn days_since_review(progress: &WordProgress, now: DateTime<Utc>) -> i64 {
  let elapsed = now.signed_duration_since(progress.last_reviewed);
  if elapsed < Duration::zero() {
    // Future timestamps (clock skew) count as reviewed just now
    return 0;
  }
  elapsed.num_days()
}

pub fn is_due(progress: &WordProgress, now: DateTime<Utc>) -> bool {
  days_since_review(progress, now) >= review_interval_days(progress.mastery_level)
}

/// Earliest instant at which the word becomes due
pub fn next_review_at(progress: &WordProgress) -> DateTime<Utc> {
  progress.last_reviewed + Duration::days(review_interval_days(progress.mastery_level))
}

/// Due words, oldest review first, capped at `limit` (never above the session cap)
pub fn select_review_candidates(
  progress: Vec<WordProgress>,
  now: DateTime<Utc>,
  limit: usize,
) -> Vec<WordProgress> {
  let limit = limit.min(REVIEW_SESSION_CAP);
  let mut due: Vec<WordProgress> = progress.into_iter().filter(|p| is_due(p, now)).collect();
  // Stable sort keeps insertion order for identical timestamps
  due.sort_by_key(|p| p.last_reviewed);
  due.truncate(limit);
  due
}

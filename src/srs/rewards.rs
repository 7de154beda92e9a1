//! XP and level arithmetic.

use crate::config::{STREAK_MILESTONES, XP_PER_CORRECT, XP_PER_INCORRECT, XP_PER_LEVEL};

pub fn xp_for_answer(correct: bool) -> i64 {
  if correct { XP_PER_CORRECT } else { XP_PER_INCORRECT }
}

/// Level 1 at 0 XP, one level per `XP_PER_LEVEL`
pub fn level_for_xp(xp: i64) -> i64 {
  1 + xp.max(0) / XP_PER_LEVEL
}

/// Milestone reached when the streak moved from `before` to `after`
pub fn streak_milestone(before: i64, after: i64) -> Option<i64> {
  STREAK_MILESTONES
    .iter()
    .copied()
    .find(|m| before < *m && after >= *m)
}

pub mod mastery;
pub mod rewards;
pub mod streak;

pub use mastery::{apply_answer, is_due, next_review_at, select_review_candidates};
pub use rewards::{level_for_xp, streak_milestone, xp_for_answer};
pub use streak::{advance_streak, effective_streak};

//! The single write path for study activity.
//!
//! Every answer, whether it comes from a practice session, a one-off review or a
//! submitted test, goes through [`apply_batch`]: mastery rows, the user's
//! streak/XP/level and the day's statistics are updated together inside one
//! transaction owned by the caller.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use super::{ServiceError, ServiceResult};
use crate::config::MAX_BULK_WORDS;
use crate::db::progress::{self, Gamification};
use crate::db::stats::{self, StatsDelta};
use crate::db::words;
use crate::domain::{
    AnswerOutcome, PracticeMode, ProgressOverview, SessionOutcome, StreakState, Word, WordProgress,
};
use crate::srs::{
    advance_streak, apply_answer, effective_streak, is_due, level_for_xp, next_review_at,
    select_review_candidates, streak_milestone, xp_for_answer,
};

/// One answered word
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerInput {
    pub word_id: i64,
    pub correct: bool,
}

/// A group of answers applied in one go
#[derive(Debug, Clone, Default)]
pub(crate) struct StudyBatch<'a> {
    pub answers: &'a [AnswerInput],
    /// XP on top of the per-answer rewards
    pub bonus_xp: i64,
    pub study_seconds: i64,
    pub tests_completed: i64,
}

#[derive(Debug, Clone)]
pub(crate) struct BatchOutcome {
    pub words: Vec<WordProgress>,
    pub streak: StreakState,
    pub xp_earned: i64,
    pub total_xp: i64,
    pub level: i64,
    pub leveled_up: bool,
    pub streak_milestone: Option<i64>,
}

/// Apply a batch of answers. The caller owns the transaction.
pub(crate) fn apply_batch(
    conn: &Connection,
    user_id: i64,
    batch: &StudyBatch,
    now: DateTime<Utc>,
) -> ServiceResult<BatchOutcome> {
    let before = progress::get_gamification(conn, user_id)?.ok_or(ServiceError::NotFound("User"))?;

    let mut words = Vec::with_capacity(batch.answers.len());
    let mut xp_earned = batch.bonus_xp;
    let mut correct = 0;
    for answer in batch.answers {
        let previous = progress::get_progress(conn, user_id, answer.word_id)?;
        let updated = apply_answer(previous.as_ref(), user_id, answer.word_id, answer.correct, now);
        progress::upsert_progress(conn, &updated)?;
        xp_earned += xp_for_answer(answer.correct);
        correct += i64::from(answer.correct);
        words.push(updated);
    }

    let streak = advance_streak(before.streak, now.date_naive());
    let total_xp = before.xp + xp_earned;
    let level = level_for_xp(total_xp);
    progress::save_gamification(
        conn,
        user_id,
        &Gamification {
            xp: total_xp,
            level,
            streak,
        },
    )?;

    let distinct: HashSet<i64> = batch.answers.iter().map(|a| a.word_id).collect();
    stats::record_daily(
        conn,
        user_id,
        now.date_naive(),
        &StatsDelta {
            words_studied: distinct.len() as i64,
            correct_answers: correct,
            incorrect_answers: batch.answers.len() as i64 - correct,
            xp_earned,
            tests_completed: batch.tests_completed,
            study_seconds: batch.study_seconds.max(0),
        },
    )?;

    Ok(BatchOutcome {
        words,
        streak,
        xp_earned,
        total_xp,
        level,
        leveled_up: level > before.level,
        streak_milestone: streak_milestone(before.streak.current, streak.current),
    })
}

/// Load a word the user is allowed to study
pub(crate) fn visible_word(conn: &Connection, user_id: i64, word_id: i64) -> ServiceResult<Word> {
    let word = words::get_word(conn, word_id)?.ok_or(ServiceError::NotFound("Word"))?;
    if word.owner_id != user_id && !word.is_public {
        return Err(ServiceError::Forbidden("You do not have access to this word".to_string()));
    }
    Ok(word)
}

/// Record one answer for one word
pub fn record_answer(
    conn: &Connection,
    user_id: i64,
    word_id: i64,
    correct: bool,
    now: DateTime<Utc>,
) -> ServiceResult<AnswerOutcome> {
    visible_word(conn, user_id, word_id)?;

    let answers = [AnswerInput { word_id, correct }];
    let tx = conn.unchecked_transaction()?;
    let outcome = apply_batch(
        &tx,
        user_id,
        &StudyBatch {
            answers: &answers,
            ..Default::default()
        },
        now,
    )?;
    tx.commit()?;

    let BatchOutcome {
        mut words,
        streak,
        xp_earned,
        total_xp,
        level,
        leveled_up,
        streak_milestone,
    } = outcome;
    let progress = words.pop().ok_or(ServiceError::NotFound("Progress"))?;

    Ok(AnswerOutcome {
        progress,
        streak,
        xp_earned,
        total_xp,
        level,
        leveled_up,
        streak_milestone,
    })
}

/// Save a completed practice session
pub fn save_practice_session(
    conn: &Connection,
    user_id: i64,
    mode: PracticeMode,
    answers: &[AnswerInput],
    duration_secs: i64,
    now: DateTime<Utc>,
) -> ServiceResult<SessionOutcome> {
    if mode == PracticeMode::Test {
        return Err(ServiceError::Invalid(
            "Tests are submitted through the tests endpoint".to_string(),
        ));
    }
    if answers.is_empty() {
        return Err(ServiceError::Invalid("A session needs at least one answer".to_string()));
    }
    if answers.len() > MAX_BULK_WORDS {
        return Err(ServiceError::Invalid(format!(
            "A session may hold at most {MAX_BULK_WORDS} answers"
        )));
    }
    let distinct: HashSet<i64> = answers.iter().map(|a| a.word_id).collect();
    for word_id in &distinct {
        visible_word(conn, user_id, *word_id)?;
    }

    let tx = conn.unchecked_transaction()?;
    let outcome = apply_batch(
        &tx,
        user_id,
        &StudyBatch {
            answers,
            study_seconds: duration_secs,
            ..Default::default()
        },
        now,
    )?;
    tx.commit()?;

    let correct = answers.iter().filter(|a| a.correct).count();
    tracing::debug!(
        user_id,
        mode = mode.as_str(),
        answered = answers.len(),
        correct,
        "Saved practice session"
    );

    Ok(SessionOutcome {
        mode,
        answered: answers.len(),
        correct,
        accuracy: correct as f64 * 100.0 / answers.len() as f64,
        words: outcome.words,
        streak: outcome.streak,
        xp_earned: outcome.xp_earned,
        total_xp: outcome.total_xp,
        level: outcome.level,
        leveled_up: outcome.leveled_up,
        streak_milestone: outcome.streak_milestone,
    })
}

/// A due word with its mastery record
#[derive(Debug, Clone, Serialize)]
pub struct ReviewItem {
    pub word: Word,
    pub progress: WordProgress,
    pub next_review_at: DateTime<Utc>,
}

/// Words due for review, oldest review first, capped per session
pub fn review_queue(
    conn: &Connection,
    user_id: i64,
    limit: usize,
    now: DateTime<Utc>,
) -> ServiceResult<Vec<ReviewItem>> {
    // Words deleted or made private by their owner never take a slot
    let visible = progress::list_visible_progress(conn, user_id)?;
    let candidates = select_review_candidates(visible, now, limit);
    let mut items = Vec::with_capacity(candidates.len());
    for p in candidates {
        let Some(word) = words::get_word(conn, p.word_id)? else {
            continue;
        };
        items.push(ReviewItem {
            next_review_at: next_review_at(&p),
            word,
            progress: p,
        });
    }
    Ok(items)
}

pub fn overview(conn: &Connection, user_id: i64, now: DateTime<Utc>) -> ServiceResult<ProgressOverview> {
    let state = progress::get_gamification(conn, user_id)?.ok_or(ServiceError::NotFound("User"))?;
    let totals = progress::progress_totals(conn, user_id)?;
    let due = progress::list_visible_progress(conn, user_id)?
        .iter()
        .filter(|p| is_due(p, now))
        .count();

    Ok(ProgressOverview {
        words_learned: totals.words_learned,
        words_mastered: totals.words_mastered,
        total_reviews: totals.total_reviews,
        average_mastery: totals.average_mastery,
        due_for_review: due as i64,
        current_streak: effective_streak(state.streak, now.date_naive()),
        longest_streak: state.streak.longest,
        xp: state.xp,
        level: state.level,
    })
}

/// Mastery detail for one word
#[derive(Debug, Clone, Serialize)]
pub struct WordProgressView {
    pub word_id: i64,
    pub progress: Option<WordProgress>,
    pub is_due: bool,
    pub next_review_at: Option<DateTime<Utc>>,
}

pub fn word_progress(
    conn: &Connection,
    user_id: i64,
    word_id: i64,
    now: DateTime<Utc>,
) -> ServiceResult<WordProgressView> {
    visible_word(conn, user_id, word_id)?;
    let progress = progress::get_progress(conn, user_id, word_id)?;
    Ok(WordProgressView {
        word_id,
        // Never-studied words are not part of the review queue
        is_due: progress.as_ref().is_some_and(|p| is_due(p, now)),
        next_review_at: progress.as_ref().map(next_review_at),
        progress,
    })
}

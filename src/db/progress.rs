//! Per-word mastery rows and the per-user XP/streak counters.
//!
//! `word_progress` is the only store of mastery and `users` the only store of
//! streak and XP; every write goes through `services::learning`.

use rusqlite::{params, Connection, OptionalExtension, Result, Row};

use super::{day, parse_day, parse_ts, ts};
use crate::config::{LEARNED_THRESHOLD, MASTERED_THRESHOLD};
use crate::domain::{StreakState, WordProgress};
use crate::srs::level_for_xp;

const PROGRESS_COLUMNS: &str = "user_id, word_id, mastery_level, review_count, correct_count, \
     incorrect_count, first_learned_at, last_reviewed";

fn row_to_progress(row: &Row) -> Result<WordProgress> {
    let first_learned_at: String = row.get(6)?;
    let last_reviewed: String = row.get(7)?;
    Ok(WordProgress {
        user_id: row.get(0)?,
        word_id: row.get(1)?,
        mastery_level: row.get(2)?,
        review_count: row.get(3)?,
        correct_count: row.get(4)?,
        incorrect_count: row.get(5)?,
        first_learned_at: parse_ts(&first_learned_at)?,
        last_reviewed: parse_ts(&last_reviewed)?,
    })
}

pub fn get_progress(conn: &Connection, user_id: i64, word_id: i64) -> Result<Option<WordProgress>> {
    conn.query_row(
        &format!("SELECT {PROGRESS_COLUMNS} FROM word_progress WHERE user_id = ?1 AND word_id = ?2"),
        params![user_id, word_id],
        row_to_progress,
    )
    .optional()
}

pub fn upsert_progress(conn: &Connection, progress: &WordProgress) -> Result<()> {
    conn.execute(
        "INSERT INTO word_progress (user_id, word_id, mastery_level, review_count, correct_count,
                                    incorrect_count, first_learned_at, last_reviewed)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
         ON CONFLICT(user_id, word_id) DO UPDATE SET
            mastery_level = excluded.mastery_level,
            review_count = excluded.review_count,
            correct_count = excluded.correct_count,
            incorrect_count = excluded.incorrect_count,
            last_reviewed = excluded.last_reviewed",
        params![
            progress.user_id,
            progress.word_id,
            progress.mastery_level,
            progress.review_count,
            progress.correct_count,
            progress.incorrect_count,
            ts(progress.first_learned_at),
            ts(progress.last_reviewed),
        ],
    )?;
    Ok(())
}

/// All progress rows of a user, oldest review first
pub fn list_progress(conn: &Connection, user_id: i64) -> Result<Vec<WordProgress>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {PROGRESS_COLUMNS} FROM word_progress WHERE user_id = ?1 ORDER BY last_reviewed, word_id"
    ))?;
    let rows = stmt
        .query_map(params![user_id], row_to_progress)?
        .collect::<Result<Vec<_>>>()?;
    Ok(rows)
}

/// Progress rows whose word still exists and is owned by the user or public
pub fn list_visible_progress(conn: &Connection, user_id: i64) -> Result<Vec<WordProgress>> {
    let mut stmt = conn.prepare(
        "SELECT p.user_id, p.word_id, p.mastery_level, p.review_count, p.correct_count,
                p.incorrect_count, p.first_learned_at, p.last_reviewed
         FROM word_progress p JOIN words w ON w.id = p.word_id
         WHERE p.user_id = ?1 AND (w.owner_id = ?1 OR w.is_public = 1)
         ORDER BY p.last_reviewed, p.word_id",
    )?;
    let rows = stmt
        .query_map(params![user_id], row_to_progress)?
        .collect::<Result<Vec<_>>>()?;
    Ok(rows)
}

/// Aggregate mastery numbers for one user
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ProgressTotals {
    pub words_learned: i64,
    pub words_mastered: i64,
    pub total_reviews: i64,
    pub average_mastery: f64,
}

pub fn progress_totals(conn: &Connection, user_id: i64) -> Result<ProgressTotals> {
    conn.query_row(
        "SELECT COALESCE(SUM(CASE WHEN mastery_level >= ?2 THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN mastery_level >= ?3 THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(review_count), 0),
                COALESCE(AVG(mastery_level), 0.0)
         FROM word_progress WHERE user_id = ?1",
        params![user_id, LEARNED_THRESHOLD, MASTERED_THRESHOLD],
        |row| {
            Ok(ProgressTotals {
                words_learned: row.get(0)?,
                words_mastered: row.get(1)?,
                total_reviews: row.get(2)?,
                average_mastery: row.get(3)?,
            })
        },
    )
}

// ==================== User counters ====================

/// XP, level and streak as stored on the user row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Gamification {
    pub xp: i64,
    pub level: i64,
    pub streak: StreakState,
}

pub fn get_gamification(conn: &Connection, user_id: i64) -> Result<Option<Gamification>> {
    conn.query_row(
        "SELECT xp, level, current_streak, longest_streak, last_study_date FROM users WHERE id = ?1",
        params![user_id],
        |row| {
            let last: Option<String> = row.get(4)?;
            Ok(Gamification {
                xp: row.get(0)?,
                level: row.get(1)?,
                streak: StreakState {
                    current: row.get(2)?,
                    longest: row.get(3)?,
                    last_study_date: last.as_deref().map(parse_day).transpose()?,
                },
            })
        },
    )
    .optional()
}

pub fn save_gamification(conn: &Connection, user_id: i64, state: &Gamification) -> Result<()> {
    conn.execute(
        "UPDATE users SET xp = ?1, level = ?2, current_streak = ?3, longest_streak = ?4,
                last_study_date = ?5
         WHERE id = ?6",
        params![
            state.xp,
            state.level,
            state.streak.current,
            state.streak.longest,
            state.streak.last_study_date.map(day),
            user_id,
        ],
    )?;
    Ok(())
}

/// Credit XP and recompute the level. Returns `(old_level, new_level, total_xp)`.
pub fn add_xp(conn: &Connection, user_id: i64, amount: i64) -> Result<(i64, i64, i64)> {
    let (xp, old_level): (i64, i64) = conn.query_row(
        "SELECT xp, level FROM users WHERE id = ?1",
        params![user_id],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;
    let xp = xp + amount;
    let new_level = level_for_xp(xp);
    conn.execute(
        "UPDATE users SET xp = ?1, level = ?2 WHERE id = ?3",
        params![xp, new_level, user_id],
    )?;
    Ok((old_level, new_level, xp))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::srs::apply_answer;
    use crate::testing::TestEnv;
    use chrono::{Duration, NaiveDate, Utc};

    #[test]
    fn test_upsert_preserves_first_learned() {
        let env = TestEnv::new().unwrap();
        let user = env.create_user("a@example.com").unwrap();
        let word = env.create_word(user, "水", "nước").unwrap();

        let t0 = Utc::now() - Duration::days(3);
        let first = apply_answer(None, user, word, true, t0);
        upsert_progress(&env.conn, &first).unwrap();

        let second = apply_answer(Some(&first), user, word, true, Utc::now());
        upsert_progress(&env.conn, &second).unwrap();

        let stored = get_progress(&env.conn, user, word).unwrap().unwrap();
        assert_eq!(stored.mastery_level, 20);
        assert_eq!(stored.review_count, 2);
        assert_eq!(stored.first_learned_at, first.first_learned_at);
        assert_eq!(stored, second);
    }

    #[test]
    fn test_totals() {
        let env = TestEnv::new().unwrap();
        let user = env.create_user("a@example.com").unwrap();
        assert_eq!(progress_totals(&env.conn, user).unwrap(), ProgressTotals::default());

        let a = env.create_word(user, "一", "một").unwrap();
        let b = env.create_word(user, "二", "hai").unwrap();
        upsert_progress(&env.conn, &apply_answer(None, user, a, true, Utc::now())).unwrap();
        upsert_progress(&env.conn, &apply_answer(None, user, b, false, Utc::now())).unwrap();

        let totals = progress_totals(&env.conn, user).unwrap();
        assert_eq!(totals.words_learned, 1);
        assert_eq!(totals.words_mastered, 0);
        assert_eq!(totals.total_reviews, 2);
        assert!((totals.average_mastery - 5.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_gamification_roundtrip() {
        let env = TestEnv::new().unwrap();
        let user = env.create_user("a@example.com").unwrap();
        let initial = get_gamification(&env.conn, user).unwrap().unwrap();
        assert_eq!(initial.xp, 0);
        assert_eq!(initial.level, 1);
        assert_eq!(initial.streak.last_study_date, None);

        let state = Gamification {
            xp: 150,
            level: 2,
            streak: StreakState {
                current: 3,
                longest: 5,
                last_study_date: NaiveDate::from_ymd_opt(2026, 5, 1),
            },
        };
        save_gamification(&env.conn, user, &state).unwrap();
        assert_eq!(get_gamification(&env.conn, user).unwrap().unwrap(), state);
    }

    #[test]
    fn test_add_xp_levels_up() {
        let env = TestEnv::new().unwrap();
        let user = env.create_user("a@example.com").unwrap();
        assert_eq!(add_xp(&env.conn, user, 90).unwrap(), (1, 1, 90));
        assert_eq!(add_xp(&env.conn, user, 20).unwrap(), (1, 2, 110));
    }

    #[test]
    fn test_visible_progress_skips_private_words_of_others() {
        let env = TestEnv::new().unwrap();
        let alice = env.create_user("a@example.com").unwrap();
        let bob = env.create_user("b@example.com").unwrap();
        let shared = env.create_word(alice, "山", "núi").unwrap();
        let own = env.create_word(bob, "水", "nước").unwrap();
        env.conn
            .execute("UPDATE words SET is_public = 1 WHERE id = ?1", params![shared])
            .unwrap();
        upsert_progress(&env.conn, &apply_answer(None, bob, shared, false, Utc::now())).unwrap();
        upsert_progress(&env.conn, &apply_answer(None, bob, own, false, Utc::now())).unwrap();
        assert_eq!(list_visible_progress(&env.conn, bob).unwrap().len(), 2);

        env.conn
            .execute("UPDATE words SET is_public = 0 WHERE id = ?1", params![shared])
            .unwrap();
        let visible = list_visible_progress(&env.conn, bob).unwrap();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].word_id, own);
        assert_eq!(list_progress(&env.conn, bob).unwrap().len(), 2);
    }
}

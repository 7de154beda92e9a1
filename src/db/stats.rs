//! Per-day study counters, leaderboard and system-wide totals.

use chrono::NaiveDate;
use rusqlite::{params, Connection, Result};
use serde::Serialize;

use super::{day, parse_day};
use crate::domain::DailyStats;

/// Increments applied to one day's counters
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct StatsDelta {
    pub words_studied: i64,
    pub correct_answers: i64,
    pub incorrect_answers: i64,
    pub xp_earned: i64,
    pub tests_completed: i64,
    pub study_seconds: i64,
}

/// Add `delta` to the row for (user, day), creating it if needed
pub fn record_daily(conn: &Connection, user_id: i64, on: NaiveDate, delta: &StatsDelta) -> Result<()> {
    conn.execute(
        "INSERT INTO daily_stats (user_id, day, words_studied, correct_answers, incorrect_answers,
                                  xp_earned, tests_completed, study_seconds)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
         ON CONFLICT(user_id, day) DO UPDATE SET
            words_studied = words_studied + excluded.words_studied,
            correct_answers = correct_answers + excluded.correct_answers,
            incorrect_answers = incorrect_answers + excluded.incorrect_answers,
            xp_earned = xp_earned + excluded.xp_earned,
            tests_completed = tests_completed + excluded.tests_completed,
            study_seconds = study_seconds + excluded.study_seconds",
        params![
            user_id,
            day(on),
            delta.words_studied,
            delta.correct_answers,
            delta.incorrect_answers,
            delta.xp_earned,
            delta.tests_completed,
            delta.study_seconds,
        ],
    )?;
    Ok(())
}

/// Days on or after `since`, oldest first
pub fn get_daily_stats(conn: &Connection, user_id: i64, since: NaiveDate) -> Result<Vec<DailyStats>> {
    let mut stmt = conn.prepare(
        "SELECT day, words_studied, correct_answers, incorrect_answers, xp_earned,
                tests_completed, study_seconds
         FROM daily_stats WHERE user_id = ?1 AND day >= ?2 ORDER BY day",
    )?;
    let rows = stmt
        .query_map(params![user_id, day(since)], |row| {
            let d: String = row.get(0)?;
            Ok(DailyStats {
                day: parse_day(&d)?,
                words_studied: row.get(1)?,
                correct_answers: row.get(2)?,
                incorrect_answers: row.get(3)?,
                xp_earned: row.get(4)?,
                tests_completed: row.get(5)?,
                study_seconds: row.get(6)?,
            })
        })?
        .collect::<Result<Vec<_>>>()?;
    Ok(rows)
}

/// Lifetime totals over every stored day
pub fn lifetime_totals(conn: &Connection, user_id: i64) -> Result<StatsDelta> {
    conn.query_row(
        "SELECT COALESCE(SUM(words_studied), 0), COALESCE(SUM(correct_answers), 0),
                COALESCE(SUM(incorrect_answers), 0), COALESCE(SUM(xp_earned), 0),
                COALESCE(SUM(tests_completed), 0), COALESCE(SUM(study_seconds), 0)
         FROM daily_stats WHERE user_id = ?1",
        params![user_id],
        |row| {
            Ok(StatsDelta {
                words_studied: row.get(0)?,
                correct_answers: row.get(1)?,
                incorrect_answers: row.get(2)?,
                xp_earned: row.get(3)?,
                tests_completed: row.get(4)?,
                study_seconds: row.get(5)?,
            })
        },
    )
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct LeaderboardEntry {
    pub rank: i64,
    pub user_id: i64,
    pub display_name: String,
    pub xp: i64,
    pub level: i64,
    pub current_streak: i64,
}

/// Users ordered by XP, ties broken by earliest registration
pub fn leaderboard(conn: &Connection, limit: i64) -> Result<Vec<LeaderboardEntry>> {
    let mut stmt = conn.prepare(
        "SELECT id, display_name, xp, level, current_streak FROM users
         ORDER BY xp DESC, created_at ASC, id ASC LIMIT ?1",
    )?;
    let rows = stmt
        .query_map(params![limit], |row| {
            Ok(LeaderboardEntry {
                rank: 0,
                user_id: row.get(0)?,
                display_name: row.get(1)?,
                xp: row.get(2)?,
                level: row.get(3)?,
                current_streak: row.get(4)?,
            })
        })?
        .collect::<Result<Vec<_>>>()?;

    Ok(rows
        .into_iter()
        .enumerate()
        .map(|(i, entry)| LeaderboardEntry {
            rank: i as i64 + 1,
            ..entry
        })
        .collect())
}

/// Whole-system counters for the admin dashboard
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct SystemStats {
    pub users: i64,
    pub admins: i64,
    pub words: i64,
    pub public_words: i64,
    pub categories: i64,
    pub word_sets: i64,
    pub tests_taken: i64,
    pub total_reviews: i64,
    pub active_today: i64,
}

pub fn system_stats(conn: &Connection, today: NaiveDate) -> Result<SystemStats> {
    let count = |sql: &str| -> Result<i64> { conn.query_row(sql, [], |row| row.get(0)) };
    Ok(SystemStats {
        users: count("SELECT COUNT(*) FROM users")?,
        admins: count("SELECT COUNT(*) FROM users WHERE role = 'admin'")?,
        words: count("SELECT COUNT(*) FROM words")?,
        public_words: count("SELECT COUNT(*) FROM words WHERE is_public = 1")?,
        categories: count("SELECT COUNT(*) FROM categories")?,
        word_sets: count("SELECT COUNT(*) FROM word_sets")?,
        tests_taken: count("SELECT COUNT(*) FROM quiz_results")?,
        total_reviews: count("SELECT COALESCE(SUM(review_count), 0) FROM word_progress")?,
        active_today: conn.query_row(
            "SELECT COUNT(*) FROM daily_stats WHERE day = ?1",
            params![day(today)],
            |row| row.get(0),
        )?,
    })
}

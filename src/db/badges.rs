//! Badge definitions and earned achievements.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Result, Row};

use super::{parse_ts, progress, quizzes, ts, words};
use crate::domain::{Achievement, Badge, BadgeCondition, UserCounters};

/// (id, name, description, icon, category, condition, threshold, xp_reward)
type BadgeSeed = (&'static str, &'static str, &'static str, &'static str, &'static str, BadgeCondition, i64, i64);

const DEFAULT_BADGES: &[BadgeSeed] = &[
    ("first_word", "Từ đầu tiên", "Learn your first word", "🌱", "learning", BadgeCondition::WordsLearned, 1, 10),
    ("words_50", "Người sưu tầm", "Learn 50 words", "📚", "learning", BadgeCondition::WordsLearned, 50, 50),
    ("words_500", "Kho từ vựng", "Learn 500 words", "🏛️", "learning", BadgeCondition::WordsLearned, 500, 200),
    ("mastered_10", "Thành thạo", "Master 10 words", "⭐", "mastery", BadgeCondition::WordsMastered, 10, 50),
    ("mastered_100", "Bậc thầy", "Master 100 words", "🌟", "mastery", BadgeCondition::WordsMastered, 100, 300),
    ("streak_3", "Khởi động", "Study 3 days in a row", "🔥", "streak", BadgeCondition::Streak, 3, 20),
    ("streak_7", "Một tuần", "Study 7 days in a row", "🔥", "streak", BadgeCondition::Streak, 7, 50),
    ("streak_30", "Kiên trì", "Study 30 days in a row", "🏆", "streak", BadgeCondition::Streak, 30, 300),
    ("reviews_100", "Chăm chỉ", "Answer 100 reviews", "🔁", "practice", BadgeCondition::Reviews, 100, 50),
    ("reviews_1000", "Không ngừng nghỉ", "Answer 1000 reviews", "♾️", "practice", BadgeCondition::Reviews, 1000, 300),
    ("first_test", "Bài kiểm tra đầu", "Complete your first test", "📝", "tests", BadgeCondition::TestsCompleted, 1, 20),
    ("tests_10", "Thí sinh", "Complete 10 tests", "🎓", "tests", BadgeCondition::TestsCompleted, 10, 100),
    ("perfect_test", "Hoàn hảo", "Score 100% on a test", "💯", "tests", BadgeCondition::PerfectTests, 1, 50),
    ("perfect_5", "Không sai sót", "Score 100% on 5 tests", "🎯", "tests", BadgeCondition::PerfectTests, 5, 150),
    ("xp_1000", "Tích lũy", "Earn 1000 XP", "💎", "xp", BadgeCondition::Xp, 1000, 0),
    ("level_5", "Cấp 5", "Reach level 5", "⬆️", "xp", BadgeCondition::Level, 5, 0),
    ("level_10", "Cấp 10", "Reach level 10", "🚀", "xp", BadgeCondition::Level, 10, 0),
    ("creator_10", "Người đóng góp", "Add 10 words of your own", "✍️", "community", BadgeCondition::WordsCreated, 10, 30),
];

/// Insert any missing default badges. Existing rows (possibly edited by an admin) are left alone.
pub fn seed_default_badges(conn: &Connection) -> Result<()> {
    let mut stmt = conn.prepare(
        "INSERT OR IGNORE INTO badges (id, name, description, icon, category, condition_type,
                                       threshold, xp_reward, sort_order)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
    )?;
    let mut inserted = 0;
    for (order, (id, name, description, icon, category, condition, threshold, xp)) in
        DEFAULT_BADGES.iter().enumerate()
    {
        inserted += stmt.execute(params![
            id,
            name,
            description,
            icon,
            category,
            condition.as_str(),
            threshold,
            xp,
            order as i64
        ])?;
    }
    if inserted > 0 {
        tracing::info!("Seeded {} badge definitions", inserted);
    }
    Ok(())
}

const BADGE_COLUMNS: &str = "b.id, b.name, b.description, b.icon, b.category, b.condition_type, b.threshold, b.xp_reward";

fn row_to_badge(row: &Row) -> Result<Badge> {
    let condition: String = row.get(5)?;
    let condition = BadgeCondition::from_str(&condition).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            5,
            rusqlite::types::Type::Text,
            format!("unknown badge condition '{condition}'").into(),
        )
    })?;
    Ok(Badge {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        icon: row.get(3)?,
        category: row.get(4)?,
        condition,
        threshold: row.get(6)?,
        xp_reward: row.get(7)?,
    })
}

pub fn list_badges(conn: &Connection) -> Result<Vec<Badge>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {BADGE_COLUMNS} FROM badges b ORDER BY b.sort_order, b.id"
    ))?;
    let badges = stmt.query_map([], row_to_badge)?.collect::<Result<Vec<_>>>()?;
    Ok(badges)
}

pub fn get_badge(conn: &Connection, badge_id: &str) -> Result<Option<Badge>> {
    conn.query_row(
        &format!("SELECT {BADGE_COLUMNS} FROM badges b WHERE b.id = ?1"),
        params![badge_id],
        row_to_badge,
    )
    .optional()
}

/// Overwrite the editable fields of a badge
pub fn update_badge(conn: &Connection, badge: &Badge) -> Result<bool> {
    let changed = conn.execute(
        "UPDATE badges SET name = ?1, description = ?2, icon = ?3, category = ?4,
                condition_type = ?5, threshold = ?6, xp_reward = ?7
         WHERE id = ?8",
        params![
            badge.name,
            badge.description,
            badge.icon,
            badge.category,
            badge.condition.as_str(),
            badge.threshold,
            badge.xp_reward,
            badge.id,
        ],
    )?;
    Ok(changed > 0)
}

/// Record a badge as earned. Returns false if the user already had it.
pub fn award_badge(conn: &Connection, user_id: i64, badge_id: &str, now: DateTime<Utc>) -> Result<bool> {
    let inserted = conn.execute(
        "INSERT OR IGNORE INTO achievements (user_id, badge_id, earned_at) VALUES (?1, ?2, ?3)",
        params![user_id, badge_id, ts(now)],
    )?;
    Ok(inserted > 0)
}

/// Earned achievements, most recent first
pub fn list_achievements(conn: &Connection, user_id: i64) -> Result<Vec<Achievement>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {BADGE_COLUMNS}, a.id, a.user_id, a.earned_at
         FROM achievements a JOIN badges b ON b.id = a.badge_id
         WHERE a.user_id = ?1
         ORDER BY a.earned_at DESC, a.id DESC"
    ))?;
    let achievements = stmt
        .query_map(params![user_id], |row| {
            let earned_at: String = row.get(10)?;
            Ok(Achievement {
                badge: row_to_badge(row)?,
                id: row.get(8)?,
                user_id: row.get(9)?,
                earned_at: parse_ts(&earned_at)?,
            })
        })?
        .collect::<Result<Vec<_>>>()?;
    Ok(achievements)
}

/// Snapshot of every counter a badge condition can refer to
pub fn user_counters(conn: &Connection, user_id: i64) -> Result<UserCounters> {
    let totals = progress::progress_totals(conn, user_id)?;
    let (tests_completed, perfect_tests) = quizzes::result_counts(conn, user_id)?;
    let state = progress::get_gamification(conn, user_id)?.ok_or(rusqlite::Error::QueryReturnedNoRows)?;

    Ok(UserCounters {
        streak: state.streak.current,
        words_learned: totals.words_learned,
        words_mastered: totals.words_mastered,
        reviews: totals.total_reviews,
        tests_completed,
        perfect_tests,
        xp: state.xp,
        level: state.level,
        words_created: words::count_words_by_owner(conn, user_id)?,
    })
}

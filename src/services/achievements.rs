//! Badge evaluation and awarding.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use serde_json::json;

use super::events::notify;
use super::ServiceResult;
use crate::db::{badges, progress};
use crate::domain::{Achievement, Badge, BadgeStatus, NewNotification, NotificationKind};

/// Award every badge the user now qualifies for.
///
/// XP rewards can unlock XP or level badges, so evaluation repeats until a
/// pass awards nothing. Each award creates an `achievement` notification and
/// a level change caused by rewards creates a `level_up` one.
pub fn check_and_award_achievements(
    conn: &Connection,
    user_id: i64,
    now: DateTime<Utc>,
    ttl_days: i64,
) -> ServiceResult<Vec<Achievement>> {
    let all = badges::list_badges(conn)?;
    let mut earned: HashSet<String> = badges::list_achievements(conn, user_id)?
        .into_iter()
        .map(|a| a.badge.id)
        .collect();
    let mut awarded_ids = Vec::new();

    loop {
        let counters = badges::user_counters(conn, user_id)?;
        let newly_met: Vec<_> = all
            .iter()
            .filter(|b| !earned.contains(&b.id) && b.is_met_by(&counters))
            .collect();
        if newly_met.is_empty() {
            break;
        }

        for badge in newly_met {
            earned.insert(badge.id.clone());
            if award_badge(conn, user_id, badge, now, ttl_days)? {
                awarded_ids.push(badge.id.clone());
            }
        }
    }

    let achievements = badges::list_achievements(conn, user_id)?
        .into_iter()
        .filter(|a| awarded_ids.contains(&a.badge.id))
        .collect();
    Ok(achievements)
}

/// Achievement row, reward XP and notifications commit together
fn award_badge(
    conn: &Connection,
    user_id: i64,
    badge: &Badge,
    now: DateTime<Utc>,
    ttl_days: i64,
) -> ServiceResult<bool> {
    let tx = conn.unchecked_transaction()?;
    if !badges::award_badge(&tx, user_id, &badge.id, now)? {
        return Ok(false);
    }

    notify(
        &tx,
        &NewNotification {
            user_id,
            kind: NotificationKind::Achievement,
            title: format!("{} {}", badge.icon, badge.name),
            message: badge.description.clone(),
            data: Some(json!({ "badge_id": badge.id, "xp_reward": badge.xp_reward })),
        },
        now,
        ttl_days,
    )?;

    if badge.xp_reward > 0 {
        let (old_level, new_level, _) = progress::add_xp(&tx, user_id, badge.xp_reward)?;
        if new_level > old_level {
            notify(&tx, &level_up_notification(user_id, new_level), now, ttl_days)?;
        }
    }

    tx.commit()?;
    tracing::info!(user_id, badge = %badge.id, "Badge awarded");
    Ok(true)
}

pub fn level_up_notification(user_id: i64, level: i64) -> NewNotification {
    NewNotification {
        user_id,
        kind: NotificationKind::LevelUp,
        title: format!("Level {level}!"),
        message: format!("You reached level {level}. Keep going!"),
        data: Some(json!({ "level": level })),
    }
}

/// Every badge with the user's progress towards it
pub fn badge_statuses(conn: &Connection, user_id: i64) -> ServiceResult<Vec<BadgeStatus>> {
    let counters = badges::user_counters(conn, user_id)?;
    let earned = badges::list_achievements(conn, user_id)?;

    let statuses = badges::list_badges(conn)?
        .into_iter()
        .map(|badge| {
            let earned_at = earned
                .iter()
                .find(|a| a.badge.id == badge.id)
                .map(|a| a.earned_at);
            BadgeStatus {
                earned: earned_at.is_some(),
                earned_at,
                current_value: counters.value_for(badge.condition),
                progress: if earned_at.is_some() {
                    100
                } else {
                    badge.progress_percent(&counters)
                },
                badge,
            }
        })
        .collect();
    Ok(statuses)
}

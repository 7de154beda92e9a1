//! User notifications with a per-row expiry.

use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, Connection, OptionalExtension, Result, Row};

use super::{parse_json, parse_ts, to_json, ts};
use crate::domain::{NewNotification, Notification, NotificationKind};

const NOTIFICATION_COLUMNS: &str =
    "id, user_id, kind, title, message, data, is_read, created_at, expires_at";

fn row_to_notification(row: &Row) -> Result<Notification> {
    let kind: String = row.get(2)?;
    let data: Option<String> = row.get(5)?;
    let created_at: String = row.get(7)?;
    let expires_at: String = row.get(8)?;
    Ok(Notification {
        id: row.get(0)?,
        user_id: row.get(1)?,
        kind: NotificationKind::from_str(&kind).unwrap_or(NotificationKind::System),
        title: row.get(3)?,
        message: row.get(4)?,
        data: data.as_deref().map(parse_json).transpose()?,
        is_read: row.get(6)?,
        created_at: parse_ts(&created_at)?,
        expires_at: parse_ts(&expires_at)?,
    })
}

pub fn create_notification(
    conn: &Connection,
    new: &NewNotification,
    now: DateTime<Utc>,
    ttl_days: i64,
) -> Result<Notification> {
    let data = new.data.as_ref().map(to_json).transpose()?;
    conn.execute(
        "INSERT INTO notifications (user_id, kind, title, message, data, created_at, expires_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            new.user_id,
            new.kind.as_str(),
            new.title,
            new.message,
            data,
            ts(now),
            ts(now + Duration::days(ttl_days)),
        ],
    )?;
    let id = conn.last_insert_rowid();
    conn.query_row(
        &format!("SELECT {NOTIFICATION_COLUMNS} FROM notifications WHERE id = ?1"),
        params![id],
        row_to_notification,
    )
}

/// Live (unexpired) notifications, newest first
pub fn list_notifications(
    conn: &Connection,
    user_id: i64,
    unread_only: bool,
    now: DateTime<Utc>,
) -> Result<Vec<Notification>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {NOTIFICATION_COLUMNS} FROM notifications
         WHERE user_id = ?1 AND expires_at > ?2 AND (?3 = 0 OR is_read = 0)
         ORDER BY created_at DESC, id DESC"
    ))?;
    let rows = stmt
        .query_map(params![user_id, ts(now), unread_only], row_to_notification)?
        .collect::<Result<Vec<_>>>()?;
    Ok(rows)
}

pub fn get_notification(conn: &Connection, notification_id: i64) -> Result<Option<Notification>> {
    conn.query_row(
        &format!("SELECT {NOTIFICATION_COLUMNS} FROM notifications WHERE id = ?1"),
        params![notification_id],
        row_to_notification,
    )
    .optional()
}

pub fn unread_count(conn: &Connection, user_id: i64, now: DateTime<Utc>) -> Result<i64> {
    conn.query_row(
        "SELECT COUNT(*) FROM notifications WHERE user_id = ?1 AND is_read = 0 AND expires_at > ?2",
        params![user_id, ts(now)],
        |row| row.get(0),
    )
}

/// Mark one of the user's notifications read. False if it is not theirs or missing.
pub fn mark_read(conn: &Connection, user_id: i64, notification_id: i64) -> Result<bool> {
    let changed = conn.execute(
        "UPDATE notifications SET is_read = 1 WHERE id = ?1 AND user_id = ?2",
        params![notification_id, user_id],
    )?;
    Ok(changed > 0)
}

pub fn mark_all_read(conn: &Connection, user_id: i64) -> Result<usize> {
    conn.execute(
        "UPDATE notifications SET is_read = 1 WHERE user_id = ?1 AND is_read = 0",
        params![user_id],
    )
}

pub fn delete_notification(conn: &Connection, user_id: i64, notification_id: i64) -> Result<bool> {
    let deleted = conn.execute(
        "DELETE FROM notifications WHERE id = ?1 AND user_id = ?2",
        params![notification_id, user_id],
    )?;
    Ok(deleted > 0)
}

/// Remove every notification whose expiry has passed
pub fn purge_expired(conn: &Connection, now: DateTime<Utc>) -> Result<usize> {
    conn.execute(
        "DELETE FROM notifications WHERE expires_at <= ?1",
        params![ts(now)],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestEnv;
    use serde_json::json;

    fn note(user_id: i64, title: &str) -> NewNotification {
        NewNotification {
            user_id,
            kind: NotificationKind::Achievement,
            title: title.to_string(),
            message: "msg".to_string(),
            data: Some(json!({"badge_id": "first_word"})),
        }
    }

    #[test]
    fn test_create_and_read_flow() {
        let env = TestEnv::new().unwrap();
        let user = env.create_user("a@example.com").unwrap();
        let now = Utc::now();
        let first = create_notification(&env.conn, &note(user, "one"), now, 30).unwrap();
        create_notification(&env.conn, &note(user, "two"), now, 30).unwrap();

        assert_eq!(first.data, Some(json!({"badge_id": "first_word"})));
        assert_eq!(unread_count(&env.conn, user, now).unwrap(), 2);

        assert!(mark_read(&env.conn, user, first.id).unwrap());
        assert_eq!(list_notifications(&env.conn, user, true, now).unwrap().len(), 1);
        assert_eq!(list_notifications(&env.conn, user, false, now).unwrap().len(), 2);

        assert_eq!(mark_all_read(&env.conn, user).unwrap(), 1);
        assert_eq!(unread_count(&env.conn, user, now).unwrap(), 0);
    }

    #[test]
    fn test_other_users_cannot_touch() {
        let env = TestEnv::new().unwrap();
        let alice = env.create_user("a@example.com").unwrap();
        let bob = env.create_user("b@example.com").unwrap();
        let n = create_notification(&env.conn, &note(alice, "x"), Utc::now(), 30).unwrap();

        assert!(!mark_read(&env.conn, bob, n.id).unwrap());
        assert!(!delete_notification(&env.conn, bob, n.id).unwrap());
        assert!(delete_notification(&env.conn, alice, n.id).unwrap());
        assert!(get_notification(&env.conn, n.id).unwrap().is_none());
    }

    #[test]
    fn test_expired_hidden_and_purged() {
        let env = TestEnv::new().unwrap();
        let user = env.create_user("a@example.com").unwrap();
        let past = Utc::now() - Duration::days(40);
        create_notification(&env.conn, &note(user, "old"), past, 30).unwrap();
        create_notification(&env.conn, &note(user, "new"), Utc::now(), 30).unwrap();

        let now = Utc::now();
        let live = list_notifications(&env.conn, user, false, now).unwrap();
        assert_eq!(live.len(), 1);
        assert_eq!(live[0].title, "new");

        assert_eq!(purge_expired(&env.conn, now).unwrap(), 1);
        assert_eq!(purge_expired(&env.conn, now).unwrap(), 0);
    }
}

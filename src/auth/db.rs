//! Account and session persistence (users, sessions tables).
//!
//! Bearer tokens are never stored: the sessions table is keyed by the
//! SHA-256 hex digest of the token.

use chrono::{Duration, Utc};
use rusqlite::{params, Connection, OptionalExtension, Result, Row};
use sha2::{Digest, Sha256};

use crate::db::{parse_day, parse_opt_ts, parse_ts, ts};
use crate::domain::{Preferences, Role, User};

const USER_COLUMNS: &str = "id, email, display_name, role, xp, level, current_streak, longest_streak, \
     last_study_date, preferences, created_at, last_login_at";

fn row_to_user(row: &Row) -> Result<User> {
    let role: String = row.get(3)?;
    let last_study_date: Option<String> = row.get(8)?;
    let preferences: String = row.get(9)?;
    let created_at: String = row.get(10)?;
    let last_login_at: Option<String> = row.get(11)?;
    Ok(User {
        id: row.get(0)?,
        email: row.get(1)?,
        display_name: row.get(2)?,
        role: Role::from_str(&role).unwrap_or_default(),
        xp: row.get(4)?,
        level: row.get(5)?,
        current_streak: row.get(6)?,
        longest_streak: row.get(7)?,
        last_study_date: last_study_date.as_deref().map(parse_day).transpose()?,
        // Unknown or partial JSON falls back to defaults field by field
        preferences: serde_json::from_str(&preferences).unwrap_or_default(),
        created_at: parse_ts(&created_at)?,
        last_login_at: parse_opt_ts(last_login_at)?,
    })
}

// ==================== Users ====================

/// Create a new user, returns the user ID
pub fn create_user(
    conn: &Connection,
    email: &str,
    password_hash: &str,
    display_name: &str,
    role: Role,
) -> Result<i64> {
    conn.execute(
        "INSERT INTO users (email, password_hash, display_name, role, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![email, password_hash, display_name, role.as_str(), ts(Utc::now())],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Get login credentials by email, returns (user_id, password_hash)
pub fn get_credentials_by_email(conn: &Connection, email: &str) -> Result<Option<(i64, String)>> {
    conn.query_row(
        "SELECT id, password_hash FROM users WHERE email = ?1",
        params![email],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )
    .optional()
}

pub fn get_password_hash(conn: &Connection, user_id: i64) -> Result<Option<String>> {
    conn.query_row(
        "SELECT password_hash FROM users WHERE id = ?1",
        params![user_id],
        |row| row.get(0),
    )
    .optional()
}

/// Check if email is taken (case-insensitive)
pub fn email_exists(conn: &Connection, email: &str) -> Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM users WHERE email = ?1",
        params![email],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

pub fn get_user(conn: &Connection, user_id: i64) -> Result<Option<User>> {
    conn.query_row(
        &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
        params![user_id],
        row_to_user,
    )
    .optional()
}

/// Users ordered by registration, for the admin listing
pub fn list_users(conn: &Connection, limit: i64, offset: i64) -> Result<Vec<User>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {USER_COLUMNS} FROM users ORDER BY id LIMIT ?1 OFFSET ?2"
    ))?;
    let users = stmt
        .query_map(params![limit, offset], row_to_user)?
        .collect::<Result<Vec<_>>>()?;
    Ok(users)
}

pub fn get_user_count(conn: &Connection) -> Result<i64> {
    conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))
}

pub fn update_profile(
    conn: &Connection,
    user_id: i64,
    display_name: &str,
    preferences: &Preferences,
) -> Result<()> {
    let preferences = crate::db::to_json(preferences)?;
    conn.execute(
        "UPDATE users SET display_name = ?1, preferences = ?2 WHERE id = ?3",
        params![display_name, preferences, user_id],
    )?;
    Ok(())
}

pub fn update_password_hash(conn: &Connection, user_id: i64, password_hash: &str) -> Result<()> {
    conn.execute(
        "UPDATE users SET password_hash = ?1 WHERE id = ?2",
        params![password_hash, user_id],
    )?;
    Ok(())
}

/// Set user role, returns false if the user does not exist
pub fn set_user_role(conn: &Connection, user_id: i64, role: Role) -> Result<bool> {
    let changed = conn.execute(
        "UPDATE users SET role = ?1 WHERE id = ?2",
        params![role.as_str(), user_id],
    )?;
    Ok(changed > 0)
}

/// Update user's last login timestamp
pub fn update_last_login(conn: &Connection, user_id: i64) -> Result<()> {
    conn.execute(
        "UPDATE users SET last_login_at = ?1 WHERE id = ?2",
        params![ts(Utc::now()), user_id],
    )?;
    Ok(())
}

// ==================== Sessions ====================

/// Storage key for a bearer token
pub fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// Create a new session for a freshly issued token
pub fn create_session(conn: &Connection, user_id: i64, token: &str, duration_hours: i64) -> Result<()> {
    let now = Utc::now();
    let expires = now + Duration::hours(duration_hours);
    conn.execute(
        "INSERT INTO sessions (token_hash, user_id, created_at, expires_at, last_access_at)
         VALUES (?1, ?2, ?3, ?4, ?3)",
        params![hash_token(token), user_id, ts(now), ts(expires)],
    )?;
    Ok(())
}

/// Validate a token and return its user id
pub fn get_session_user(conn: &Connection, token: &str) -> Result<Option<i64>> {
    let now = ts(Utc::now());
    let token_hash = hash_token(token);
    let user_id: Option<i64> = conn
        .query_row(
            "SELECT s.user_id FROM sessions s JOIN users u ON s.user_id = u.id
             WHERE s.token_hash = ?1 AND s.expires_at > ?2",
            params![token_hash, now],
            |row| row.get(0),
        )
        .optional()?;

    if user_id.is_some() {
        // Update last access time
        let _ = conn.execute(
            "UPDATE sessions SET last_access_at = ?1 WHERE token_hash = ?2",
            params![now, token_hash],
        );
    }
    Ok(user_id)
}

/// Delete a session (logout)
pub fn delete_session(conn: &Connection, token: &str) -> Result<()> {
    conn.execute(
        "DELETE FROM sessions WHERE token_hash = ?1",
        params![hash_token(token)],
    )?;
    Ok(())
}

/// Delete every other session of a user (after a password change)
pub fn delete_other_sessions(conn: &Connection, user_id: i64, keep_token: &str) -> Result<usize> {
    conn.execute(
        "DELETE FROM sessions WHERE user_id = ?1 AND token_hash != ?2",
        params![user_id, hash_token(keep_token)],
    )
}

/// Cleanup expired sessions, returns count of deleted sessions
pub fn cleanup_expired_sessions(conn: &Connection) -> Result<usize> {
    conn.execute(
        "DELETE FROM sessions WHERE expires_at < ?1",
        params![ts(Utc::now())],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestEnv;

    #[test]
    fn test_create_and_lookup_user() {
        let env = TestEnv::new().unwrap();
        let id = create_user(&env.conn, "lan@example.com", "hash", "Lan", Role::User).unwrap();

        assert!(email_exists(&env.conn, "LAN@example.com").unwrap());
        let (found, hash) = get_credentials_by_email(&env.conn, "lan@example.com").unwrap().unwrap();
        assert_eq!(found, id);
        assert_eq!(hash, "hash");

        let user = get_user(&env.conn, id).unwrap().unwrap();
        assert_eq!(user.display_name, "Lan");
        assert_eq!(user.level, 1);
        assert_eq!(user.preferences, Preferences::default());
        assert!(user.last_login_at.is_none());
    }

    #[test]
    fn test_duplicate_email_rejected() {
        let env = TestEnv::new().unwrap();
        create_user(&env.conn, "a@example.com", "h", "A", Role::User).unwrap();
        assert!(create_user(&env.conn, "A@EXAMPLE.COM", "h", "A", Role::User).is_err());
    }

    #[test]
    fn test_profile_and_role_updates() {
        let env = TestEnv::new().unwrap();
        let id = create_user(&env.conn, "a@example.com", "h", "A", Role::User).unwrap();
        let prefs = Preferences {
            daily_goal: 5,
            ..Default::default()
        };
        update_profile(&env.conn, id, "Anh", &prefs).unwrap();
        assert!(set_user_role(&env.conn, id, Role::Admin).unwrap());
        assert!(!set_user_role(&env.conn, 999, Role::Admin).unwrap());

        let user = get_user(&env.conn, id).unwrap().unwrap();
        assert_eq!(user.display_name, "Anh");
        assert_eq!(user.preferences.daily_goal, 5);
        assert!(user.is_admin());
    }

    #[test]
    fn test_session_lifecycle() {
        let env = TestEnv::new().unwrap();
        let id = create_user(&env.conn, "a@example.com", "h", "A", Role::User).unwrap();

        create_session(&env.conn, id, "token-1", 1).unwrap();
        create_session(&env.conn, id, "token-2", 1).unwrap();
        assert_eq!(get_session_user(&env.conn, "token-1").unwrap(), Some(id));
        assert_eq!(get_session_user(&env.conn, "unknown").unwrap(), None);

        // Only the hash is stored
        let stored: i64 = env
            .conn
            .query_row("SELECT COUNT(*) FROM sessions WHERE token_hash = 'token-1'", [], |r| r.get(0))
            .unwrap();
        assert_eq!(stored, 0);

        assert_eq!(delete_other_sessions(&env.conn, id, "token-1").unwrap(), 1);
        assert_eq!(get_session_user(&env.conn, "token-2").unwrap(), None);

        delete_session(&env.conn, "token-1").unwrap();
        assert_eq!(get_session_user(&env.conn, "token-1").unwrap(), None);
    }

    #[test]
    fn test_expired_sessions() {
        let env = TestEnv::new().unwrap();
        let id = create_user(&env.conn, "a@example.com", "h", "A", Role::User).unwrap();
        create_session(&env.conn, id, "old", -1).unwrap();
        assert_eq!(get_session_user(&env.conn, "old").unwrap(), None);
        assert_eq!(cleanup_expired_sessions(&env.conn).unwrap(), 1);
    }
}

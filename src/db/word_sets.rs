//! Named, ordered word collections.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Result, Row};

use super::{parse_ts, ts};
use crate::config::{LEARNED_THRESHOLD, MASTERED_THRESHOLD};
use crate::domain::{WordSet, WordSetStats};

const SET_SELECT: &str = "SELECT s.id, s.owner_id, s.name, s.description, s.is_public, s.created_at, s.updated_at,
            (SELECT COUNT(*) FROM word_set_items i WHERE i.set_id = s.id)
     FROM word_sets s";

fn row_to_set(row: &Row) -> Result<WordSet> {
    let created_at: String = row.get(5)?;
    let updated_at: String = row.get(6)?;
    Ok(WordSet {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        name: row.get(2)?,
        description: row.get(3)?,
        is_public: row.get(4)?,
        word_count: row.get(7)?,
        created_at: parse_ts(&created_at)?,
        updated_at: parse_ts(&updated_at)?,
    })
}

pub fn create_word_set(
    conn: &Connection,
    owner_id: i64,
    name: &str,
    description: Option<&str>,
    is_public: bool,
    now: DateTime<Utc>,
) -> Result<WordSet> {
    let now = ts(now);
    conn.execute(
        "INSERT INTO word_sets (owner_id, name, description, is_public, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
        params![owner_id, name, description, is_public, now],
    )?;
    let id = conn.last_insert_rowid();
    get_word_set(conn, id)?.ok_or(rusqlite::Error::QueryReturnedNoRows)
}

pub fn get_word_set(conn: &Connection, set_id: i64) -> Result<Option<WordSet>> {
    conn.query_row(&format!("{SET_SELECT} WHERE s.id = ?1"), params![set_id], row_to_set)
        .optional()
}

/// Own sets plus every public set
pub fn list_word_sets(conn: &Connection, user_id: i64) -> Result<Vec<WordSet>> {
    let mut stmt = conn.prepare(&format!(
        "{SET_SELECT} WHERE s.owner_id = ?1 OR s.is_public = 1 ORDER BY s.updated_at DESC, s.id DESC"
    ))?;
    let sets = stmt
        .query_map(params![user_id], row_to_set)?
        .collect::<Result<Vec<_>>>()?;
    Ok(sets)
}

pub fn update_word_set(
    conn: &Connection,
    set_id: i64,
    name: &str,
    description: Option<&str>,
    is_public: bool,
    now: DateTime<Utc>,
) -> Result<Option<WordSet>> {
    let changed = conn.execute(
        "UPDATE word_sets SET name = ?1, description = ?2, is_public = ?3, updated_at = ?4 WHERE id = ?5",
        params![name, description, is_public, ts(now), set_id],
    )?;
    if changed == 0 {
        return Ok(None);
    }
    get_word_set(conn, set_id)
}

pub fn delete_word_set(conn: &Connection, set_id: i64) -> Result<bool> {
    let tx = conn.unchecked_transaction()?;
    tx.execute("DELETE FROM word_set_items WHERE set_id = ?1", params![set_id])?;
    let deleted = tx.execute("DELETE FROM word_sets WHERE id = ?1", params![set_id])?;
    tx.commit()?;
    Ok(deleted > 0)
}

/// Append words to the end of a set, skipping ones already present.
/// Returns how many were added.
pub fn add_words(conn: &Connection, set_id: i64, word_ids: &[i64], now: DateTime<Utc>) -> Result<usize> {
    let tx = conn.unchecked_transaction()?;
    let mut position: i64 = tx.query_row(
        "SELECT COALESCE(MAX(position), -1) FROM word_set_items WHERE set_id = ?1",
        params![set_id],
        |row| row.get(0),
    )?;

    let now = ts(now);
    let mut added = 0;
    for word_id in word_ids {
        let inserted = tx.execute(
            "INSERT OR IGNORE INTO word_set_items (set_id, word_id, position, added_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![set_id, word_id, position + 1, now],
        )?;
        if inserted > 0 {
            position += 1;
            added += 1;
        }
    }
    tx.execute(
        "UPDATE word_sets SET updated_at = ?1 WHERE id = ?2",
        params![now, set_id],
    )?;
    tx.commit()?;
    Ok(added)
}

pub fn remove_word(conn: &Connection, set_id: i64, word_id: i64) -> Result<bool> {
    let removed = conn.execute(
        "DELETE FROM word_set_items WHERE set_id = ?1 AND word_id = ?2",
        params![set_id, word_id],
    )?;
    Ok(removed > 0)
}

/// Word ids of a set in their stored order
pub fn get_word_ids(conn: &Connection, set_id: i64) -> Result<Vec<i64>> {
    let mut stmt =
        conn.prepare("SELECT word_id FROM word_set_items WHERE set_id = ?1 ORDER BY position")?;
    let ids = stmt
        .query_map(params![set_id], |row| row.get(0))?
        .collect::<Result<Vec<i64>>>()?;
    Ok(ids)
}

/// Learning statistics of one user over the words of a set
pub fn set_stats(conn: &Connection, set_id: i64, user_id: i64) -> Result<WordSetStats> {
    conn.query_row(
        "SELECT COUNT(i.word_id),
                COALESCE(SUM(CASE WHEN p.mastery_level >= ?3 THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN p.mastery_level >= ?4 THEN 1 ELSE 0 END), 0),
                COALESCE(AVG(COALESCE(p.mastery_level, 0)), 0.0)
         FROM word_set_items i
         LEFT JOIN word_progress p ON p.word_id = i.word_id AND p.user_id = ?2
         WHERE i.set_id = ?1",
        params![set_id, user_id, LEARNED_THRESHOLD, MASTERED_THRESHOLD],
        |row| {
            Ok(WordSetStats {
                word_count: row.get(0)?,
                learned_count: row.get(1)?,
                mastered_count: row.get(2)?,
                average_mastery: row.get(3)?,
            })
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::progress::upsert_progress;
    use crate::domain::WordProgress;
    use crate::testing::TestEnv;

    #[test]
    fn test_add_words_keeps_order_and_skips_duplicates() {
        let env = TestEnv::new().unwrap();
        let user = env.create_user("a@example.com").unwrap();
        let a = env.create_word(user, "一", "một").unwrap();
        let b = env.create_word(user, "二", "hai").unwrap();
        let c = env.create_word(user, "三", "ba").unwrap();
        let set = create_word_set(&env.conn, user, "Numbers", None, false, Utc::now()).unwrap();

        assert_eq!(add_words(&env.conn, set.id, &[b, a], Utc::now()).unwrap(), 2);
        assert_eq!(add_words(&env.conn, set.id, &[a, c], Utc::now()).unwrap(), 1);
        assert_eq!(get_word_ids(&env.conn, set.id).unwrap(), vec![b, a, c]);
        assert_eq!(get_word_set(&env.conn, set.id).unwrap().unwrap().word_count, 3);

        assert!(remove_word(&env.conn, set.id, a).unwrap());
        assert!(!remove_word(&env.conn, set.id, a).unwrap());
        assert_eq!(get_word_ids(&env.conn, set.id).unwrap(), vec![b, c]);
    }

    #[test]
    fn test_list_includes_public_sets() {
        let env = TestEnv::new().unwrap();
        let alice = env.create_user("a@example.com").unwrap();
        let bob = env.create_user("b@example.com").unwrap();
        create_word_set(&env.conn, bob, "Shared", None, true, Utc::now()).unwrap();
        create_word_set(&env.conn, bob, "Private", None, false, Utc::now()).unwrap();
        create_word_set(&env.conn, alice, "Mine", None, false, Utc::now()).unwrap();

        let names: Vec<String> = list_word_sets(&env.conn, alice)
            .unwrap()
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(names.len(), 2);
        assert!(names.contains(&"Shared".to_string()));
        assert!(!names.contains(&"Private".to_string()));
    }

    #[test]
    fn test_set_stats() {
        let env = TestEnv::new().unwrap();
        let user = env.create_user("a@example.com").unwrap();
        let a = env.create_word(user, "一", "một").unwrap();
        let b = env.create_word(user, "二", "hai").unwrap();
        let set = create_word_set(&env.conn, user, "Numbers", None, false, Utc::now()).unwrap();
        add_words(&env.conn, set.id, &[a, b], Utc::now()).unwrap();

        let now = Utc::now();
        upsert_progress(
            &env.conn,
            &WordProgress {
                user_id: user,
                word_id: a,
                mastery_level: 90,
                review_count: 9,
                correct_count: 9,
                incorrect_count: 0,
                first_learned_at: now,
                last_reviewed: now,
            },
        )
        .unwrap();

        let stats = set_stats(&env.conn, set.id, user).unwrap();
        assert_eq!(stats.word_count, 2);
        assert_eq!(stats.learned_count, 1);
        assert_eq!(stats.mastered_count, 1);
        assert!((stats.average_mastery - 45.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_delete_set() {
        let env = TestEnv::new().unwrap();
        let user = env.create_user("a@example.com").unwrap();
        let set = create_word_set(&env.conn, user, "S", None, false, Utc::now()).unwrap();
        assert!(delete_word_set(&env.conn, set.id).unwrap());
        assert!(get_word_set(&env.conn, set.id).unwrap().is_none());
    }
}

//! Vocabulary entries.

use chrono::{DateTime, Utc};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Result, Row};

use super::{parse_ts, ts};
use crate::domain::{Difficulty, Word, WordInput};

const WORD_COLUMNS: &str = "w.id, w.owner_id, w.traditional, w.simplified, w.pinyin, w.zhuyin, \
     w.taiwanese, w.vietnamese, w.han_viet, w.example, w.example_translation, w.category_id, \
     w.difficulty, w.is_public, w.created_at, w.updated_at";

pub(crate) fn row_to_word(row: &Row) -> Result<Word> {
    let difficulty: String = row.get(12)?;
    let created_at: String = row.get(14)?;
    let updated_at: String = row.get(15)?;
    Ok(Word {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        traditional: row.get(2)?,
        simplified: row.get(3)?,
        pinyin: row.get(4)?,
        zhuyin: row.get(5)?,
        taiwanese: row.get(6)?,
        vietnamese: row.get(7)?,
        han_viet: row.get(8)?,
        example: row.get(9)?,
        example_translation: row.get(10)?,
        category_id: row.get(11)?,
        difficulty: Difficulty::from_str(&difficulty).unwrap_or_default(),
        is_public: row.get(13)?,
        created_at: parse_ts(&created_at)?,
        updated_at: parse_ts(&updated_at)?,
    })
}

/// Query options for listing words
#[derive(Debug, Clone, Default)]
pub struct WordFilter {
    pub category_id: Option<i64>,
    pub difficulty: Option<Difficulty>,
    /// Substring matched against every script and the meaning
    pub query: Option<String>,
    /// Only the caller's own words (otherwise own + public)
    pub mine: bool,
    pub limit: i64,
    pub offset: i64,
}

pub fn create_word(
    conn: &Connection,
    owner_id: i64,
    input: &WordInput,
    now: DateTime<Utc>,
) -> Result<Word> {
    let now = ts(now);
    conn.execute(
        "INSERT INTO words (owner_id, traditional, simplified, pinyin, zhuyin, taiwanese, vietnamese,
                            han_viet, example, example_translation, category_id, difficulty, is_public,
                            created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?14)",
        params![
            owner_id,
            input.traditional,
            input.simplified,
            input.pinyin,
            input.zhuyin,
            input.taiwanese,
            input.vietnamese,
            input.han_viet,
            input.example,
            input.example_translation,
            input.category_id,
            input.difficulty.as_str(),
            input.is_public,
            now,
        ],
    )?;
    let id = conn.last_insert_rowid();
    get_word(conn, id)?.ok_or(rusqlite::Error::QueryReturnedNoRows)
}

/// Insert many words in one transaction; all or nothing
pub fn create_words_bulk(
    conn: &Connection,
    owner_id: i64,
    inputs: &[WordInput],
    now: DateTime<Utc>,
) -> Result<Vec<Word>> {
    let tx = conn.unchecked_transaction()?;
    let mut created = Vec::with_capacity(inputs.len());
    for input in inputs {
        created.push(create_word(&tx, owner_id, input, now)?);
    }
    tx.commit()?;
    Ok(created)
}

pub fn get_word(conn: &Connection, word_id: i64) -> Result<Option<Word>> {
    conn.query_row(
        &format!("SELECT {WORD_COLUMNS} FROM words w WHERE w.id = ?1"),
        params![word_id],
        row_to_word,
    )
    .optional()
}

pub fn update_word(
    conn: &Connection,
    word_id: i64,
    input: &WordInput,
    now: DateTime<Utc>,
) -> Result<Option<Word>> {
    let changed = conn.execute(
        "UPDATE words SET traditional = ?1, simplified = ?2, pinyin = ?3, zhuyin = ?4, taiwanese = ?5,
                vietnamese = ?6, han_viet = ?7, example = ?8, example_translation = ?9,
                category_id = ?10, difficulty = ?11, is_public = ?12, updated_at = ?13
         WHERE id = ?14",
        params![
            input.traditional,
            input.simplified,
            input.pinyin,
            input.zhuyin,
            input.taiwanese,
            input.vietnamese,
            input.han_viet,
            input.example,
            input.example_translation,
            input.category_id,
            input.difficulty.as_str(),
            input.is_public,
            ts(now),
            word_id,
        ],
    )?;
    if changed == 0 {
        return Ok(None);
    }
    get_word(conn, word_id)
}

/// Delete a word together with its set memberships and progress rows
pub fn delete_word(conn: &Connection, word_id: i64) -> Result<bool> {
    let tx = conn.unchecked_transaction()?;
    tx.execute("DELETE FROM word_set_items WHERE word_id = ?1", params![word_id])?;
    tx.execute("DELETE FROM word_progress WHERE word_id = ?1", params![word_id])?;
    let deleted = tx.execute("DELETE FROM words WHERE id = ?1", params![word_id])?;
    tx.commit()?;
    Ok(deleted > 0)
}

/// Page of words visible to `user_id` plus the total matching count
pub fn list_words(conn: &Connection, user_id: i64, filter: &WordFilter) -> Result<(Vec<Word>, i64)> {
    let mut values: Vec<Value> = vec![Value::Integer(user_id)];
    let mut sql_where = if filter.mine {
        "w.owner_id = ?1".to_string()
    } else {
        "(w.owner_id = ?1 OR w.is_public = 1)".to_string()
    };

    // Placeholders are numbered by position in `values`
    if let Some(category_id) = filter.category_id {
        values.push(Value::Integer(category_id));
        sql_where.push_str(&format!(" AND w.category_id = ?{}", values.len()));
    }
    if let Some(difficulty) = filter.difficulty {
        values.push(Value::Text(difficulty.as_str().to_string()));
        sql_where.push_str(&format!(" AND w.difficulty = ?{}", values.len()));
    }
    if let Some(q) = filter.query.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
        values.push(Value::Text(format!("%{q}%")));
        let n = values.len();
        sql_where.push_str(&format!(
            " AND (w.traditional LIKE ?{n} OR w.simplified LIKE ?{n} OR w.pinyin LIKE ?{n} \
               OR w.vietnamese LIKE ?{n} OR w.han_viet LIKE ?{n})"
        ));
    }

    let total: i64 = conn.query_row(
        &format!("SELECT COUNT(*) FROM words w WHERE {sql_where}"),
        params_from_iter(values.iter()),
        |row| row.get(0),
    )?;

    values.push(Value::Integer(filter.limit));
    values.push(Value::Integer(filter.offset));
    let n = values.len();
    let mut stmt = conn.prepare(&format!(
        "SELECT {WORD_COLUMNS} FROM words w WHERE {sql_where}
         ORDER BY w.created_at DESC, w.id DESC LIMIT ?{} OFFSET ?{}",
        n - 1,
        n
    ))?;
    let words = stmt
        .query_map(params_from_iter(values.iter()), row_to_word)?
        .collect::<Result<Vec<_>>>()?;

    Ok((words, total))
}

/// Every word the user can see (own + public)
pub fn list_visible_words(conn: &Connection, user_id: i64) -> Result<Vec<Word>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {WORD_COLUMNS} FROM words w WHERE w.owner_id = ?1 OR w.is_public = 1 ORDER BY w.id"
    ))?;
    let words = stmt
        .query_map(params![user_id], row_to_word)?
        .collect::<Result<Vec<_>>>()?;
    Ok(words)
}

/// Words of one category, in insertion order
pub fn list_words_in_category(conn: &Connection, category_id: i64) -> Result<Vec<Word>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {WORD_COLUMNS} FROM words w WHERE w.category_id = ?1 ORDER BY w.id"
    ))?;
    let words = stmt
        .query_map(params![category_id], row_to_word)?
        .collect::<Result<Vec<_>>>()?;
    Ok(words)
}

/// Load words by id, skipping ids that no longer exist
pub fn get_words_by_ids(conn: &Connection, ids: &[i64]) -> Result<Vec<Word>> {
    let mut words = Vec::with_capacity(ids.len());
    for id in ids {
        if let Some(word) = get_word(conn, *id)? {
            words.push(word);
        }
    }
    Ok(words)
}

pub fn count_words_by_owner(conn: &Connection, owner_id: i64) -> Result<i64> {
    conn.query_row(
        "SELECT COUNT(*) FROM words WHERE owner_id = ?1",
        params![owner_id],
        |row| row.get(0),
    )
}

pub fn count_words(conn: &Connection) -> Result<i64> {
    conn.query_row("SELECT COUNT(*) FROM words", [], |row| row.get(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestEnv;

    fn input(traditional: &str, vietnamese: &str) -> WordInput {
        WordInput {
            traditional: Some(traditional.to_string()),
            vietnamese: vietnamese.to_string(),
            ..Default::default()
        }
    }

    fn filter() -> WordFilter {
        WordFilter {
            limit: 50,
            ..Default::default()
        }
    }

    #[test]
    fn test_create_and_get_word() {
        let env = TestEnv::new().unwrap();
        let user = env.create_user("a@example.com").unwrap();
        let mut word_input = input("水", "nước");
        word_input.pinyin = Some("shuǐ".to_string());
        word_input.difficulty = Difficulty::Easy;

        let word = create_word(&env.conn, user, &word_input, Utc::now()).unwrap();
        let loaded = get_word(&env.conn, word.id).unwrap().unwrap();
        assert_eq!(loaded.traditional.as_deref(), Some("水"));
        assert_eq!(loaded.pinyin.as_deref(), Some("shuǐ"));
        assert_eq!(loaded.difficulty, Difficulty::Easy);
        assert!(!loaded.is_public);
    }

    #[test]
    fn test_list_visibility() {
        let env = TestEnv::new().unwrap();
        let alice = env.create_user("alice@example.com").unwrap();
        let bob = env.create_user("bob@example.com").unwrap();

        create_word(&env.conn, alice, &input("水", "nước"), Utc::now()).unwrap();
        let mut public = input("火", "lửa");
        public.is_public = true;
        create_word(&env.conn, bob, &public, Utc::now()).unwrap();
        create_word(&env.conn, bob, &input("山", "núi"), Utc::now()).unwrap();

        let (words, total) = list_words(&env.conn, alice, &filter()).unwrap();
        assert_eq!(total, 2);
        assert_eq!(words.len(), 2);

        let mine = WordFilter {
            mine: true,
            ..filter()
        };
        let (words, total) = list_words(&env.conn, alice, &mine).unwrap();
        assert_eq!(total, 1);
        assert_eq!(words[0].vietnamese, "nước");
    }

    #[test]
    fn test_list_search_and_difficulty() {
        let env = TestEnv::new().unwrap();
        let user = env.create_user("a@example.com").unwrap();
        create_word(&env.conn, user, &input("水", "nước"), Utc::now()).unwrap();
        let mut hard = input("學習", "học tập");
        hard.difficulty = Difficulty::Hard;
        create_word(&env.conn, user, &hard, Utc::now()).unwrap();

        let search = WordFilter {
            query: Some("học".to_string()),
            ..filter()
        };
        let (words, _) = list_words(&env.conn, user, &search).unwrap();
        assert_eq!(words.len(), 1);
        assert_eq!(words[0].traditional.as_deref(), Some("學習"));

        let by_difficulty = WordFilter {
            difficulty: Some(Difficulty::Hard),
            query: Some("學".to_string()),
            ..filter()
        };
        let (words, total) = list_words(&env.conn, user, &by_difficulty).unwrap();
        assert_eq!(total, 1);
        assert_eq!(words.len(), 1);
    }

    #[test]
    fn test_pagination() {
        let env = TestEnv::new().unwrap();
        let user = env.create_user("a@example.com").unwrap();
        for i in 0..5 {
            create_word(&env.conn, user, &input(&format!("字{i}"), "chữ"), Utc::now()).unwrap();
        }
        let page = WordFilter {
            limit: 2,
            offset: 4,
            ..Default::default()
        };
        let (words, total) = list_words(&env.conn, user, &page).unwrap();
        assert_eq!(total, 5);
        assert_eq!(words.len(), 1);
    }

    #[test]
    fn test_bulk_create_and_delete() {
        let env = TestEnv::new().unwrap();
        let user = env.create_user("a@example.com").unwrap();
        let words = create_words_bulk(
            &env.conn,
            user,
            &[input("一", "một"), input("二", "hai")],
            Utc::now(),
        )
        .unwrap();
        assert_eq!(words.len(), 2);
        assert_eq!(count_words_by_owner(&env.conn, user).unwrap(), 2);

        assert!(delete_word(&env.conn, words[0].id).unwrap());
        assert!(!delete_word(&env.conn, words[0].id).unwrap());
        assert_eq!(count_words(&env.conn).unwrap(), 1);
    }

    #[test]
    fn test_update_missing_word() {
        let env = TestEnv::new().unwrap();
        assert!(update_word(&env.conn, 999, &input("水", "nước"), Utc::now())
            .unwrap()
            .is_none());
    }
}

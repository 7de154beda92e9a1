//! User-scoped categories. Slugs are unique per owner.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Result, Row};

use super::{parse_ts, ts};
use crate::domain::word::slugify;
use crate::domain::Category;

const CATEGORY_SELECT: &str = "SELECT c.id, c.owner_id, c.name, c.slug, c.description, c.color, c.created_at,
            (SELECT COUNT(*) FROM words w WHERE w.category_id = c.id)
     FROM categories c";

fn row_to_category(row: &Row) -> Result<Category> {
    let created_at: String = row.get(6)?;
    Ok(Category {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        name: row.get(2)?,
        slug: row.get(3)?,
        description: row.get(4)?,
        color: row.get(5)?,
        word_count: row.get(7)?,
        created_at: parse_ts(&created_at)?,
    })
}

/// Whether `owner_id` already has a category with this slug (other than `except_id`)
pub fn slug_taken(conn: &Connection, owner_id: i64, slug: &str, except_id: Option<i64>) -> Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM categories WHERE owner_id = ?1 AND slug = ?2 AND id != ?3",
        params![owner_id, slug, except_id.unwrap_or(-1)],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

pub fn create_category(
    conn: &Connection,
    owner_id: i64,
    name: &str,
    description: Option<&str>,
    color: Option<&str>,
    now: DateTime<Utc>,
) -> Result<Category> {
    conn.execute(
        "INSERT INTO categories (owner_id, name, slug, description, color, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![owner_id, name, slugify(name), description, color, ts(now)],
    )?;
    let id = conn.last_insert_rowid();
    get_category(conn, id)?.ok_or(rusqlite::Error::QueryReturnedNoRows)
}

pub fn get_category(conn: &Connection, category_id: i64) -> Result<Option<Category>> {
    conn.query_row(
        &format!("{CATEGORY_SELECT} WHERE c.id = ?1"),
        params![category_id],
        row_to_category,
    )
    .optional()
}

pub fn list_categories(conn: &Connection, owner_id: i64) -> Result<Vec<Category>> {
    let mut stmt = conn.prepare(&format!(
        "{CATEGORY_SELECT} WHERE c.owner_id = ?1 ORDER BY c.name COLLATE NOCASE"
    ))?;
    let categories = stmt
        .query_map(params![owner_id], row_to_category)?
        .collect::<Result<Vec<_>>>()?;
    Ok(categories)
}

pub fn update_category(
    conn: &Connection,
    category_id: i64,
    name: &str,
    description: Option<&str>,
    color: Option<&str>,
) -> Result<Option<Category>> {
    let changed = conn.execute(
        "UPDATE categories SET name = ?1, slug = ?2, description = ?3, color = ?4 WHERE id = ?5",
        params![name, slugify(name), description, color, category_id],
    )?;
    if changed == 0 {
        return Ok(None);
    }
    get_category(conn, category_id)
}

/// Delete a category and every word filed under it, including those words'
/// set memberships and progress, in one transaction.
///
/// Returns the number of words removed, or `None` if the category did not exist.
pub fn delete_category_cascade(conn: &Connection, category_id: i64) -> Result<Option<usize>> {
    let tx = conn.unchecked_transaction()?;

    let exists: i64 = tx.query_row(
        "SELECT COUNT(*) FROM categories WHERE id = ?1",
        params![category_id],
        |row| row.get(0),
    )?;
    if exists == 0 {
        return Ok(None);
    }

    tx.execute(
        "DELETE FROM word_set_items WHERE word_id IN (SELECT id FROM words WHERE category_id = ?1)",
        params![category_id],
    )?;
    tx.execute(
        "DELETE FROM word_progress WHERE word_id IN (SELECT id FROM words WHERE category_id = ?1)",
        params![category_id],
    )?;
    let words = tx.execute("DELETE FROM words WHERE category_id = ?1", params![category_id])?;
    tx.execute("DELETE FROM categories WHERE id = ?1", params![category_id])?;

    tx.commit()?;
    tracing::debug!("Deleted category {} with {} words", category_id, words);
    Ok(Some(words))
}

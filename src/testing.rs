//! Test utilities for database setup.
//!
//! Reuses the production open path so tests always run against the
//! authoritative migrations and seeded badges.

use chrono::Utc;
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

use crate::db::{self, DbPool};
use crate::domain::WordInput;

/// Migrated database in a temporary directory, removed on drop
pub struct TestEnv {
    /// Temporary directory (kept alive for database file persistence)
    pub temp: TempDir,
    pub conn: Connection,
}

impl TestEnv {
    pub fn new() -> rusqlite::Result<Self> {
        let temp =
            TempDir::new().map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
        let conn = db::open_connection(&temp.path().join("hoctu.db"))?;
        Ok(Self { temp, conn })
    }

    pub fn path(&self) -> &Path {
        self.temp.path()
    }

    /// Hand the connection over as a pool, keeping the directory alive
    pub fn into_pool(self) -> (TempDir, DbPool) {
        (self.temp, Arc::new(Mutex::new(self.conn)))
    }

    /// Insert a user with a placeholder password hash
    pub fn create_user(&self, email: &str) -> rusqlite::Result<i64> {
        let now = db::ts(Utc::now());
        self.conn.execute(
            "INSERT INTO users (email, password_hash, display_name, created_at) VALUES (?1, 'x', ?2, ?3)",
            params![email, email.split('@').next().unwrap_or(email), now],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Insert a private word for `owner_id`
    pub fn create_word(&self, owner_id: i64, traditional: &str, vietnamese: &str) -> rusqlite::Result<i64> {
        let input = WordInput {
            traditional: Some(traditional.to_string()),
            vietnamese: vietnamese.to_string(),
            ..Default::default()
        };
        let word = db::words::create_word(&self.conn, owner_id, &input, Utc::now())?;
        Ok(word.id)
    }
}

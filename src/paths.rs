//! Project path functions - single source of truth for on-disk locations.
//!
//! ## Environment Variables
//!
//! - `DATA_DIR`: Override the base data directory (default: "data")
//!
//! Running two isolated instances side by side:
//! ```bash
//! DATA_DIR=data/a PORT=3001 cargo run
//! DATA_DIR=data/b PORT=3002 cargo run
//! ```

use std::env;
use std::sync::OnceLock;

/// Lazily initialized data directory from DATA_DIR env var
static DATA_DIR_VALUE: OnceLock<String> = OnceLock::new();

/// Directory holding the pre-built frontend (served as-is)
pub const STATIC_DIR: &str = "static";

/// Get the base data directory (from DATA_DIR env var or default "data")
pub fn data_dir() -> &'static str {
    DATA_DIR_VALUE.get_or_init(|| env::var("DATA_DIR").unwrap_or_else(|_| "data".to_string()))
}

/// SQLite database path
pub fn db_path() -> String {
    format!("{}/hoctu.db", data_dir())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_dir_default() {
        // OnceLock means env override can't be exercised here
        let dir = data_dir();
        assert!(!dir.is_empty());
    }

    #[test]
    fn test_db_path_format() {
        assert!(db_path().ends_with("/hoctu.db"));
    }
}

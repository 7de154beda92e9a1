//! Application configuration.
//!
//! Runtime settings are loaded once at startup with priority
//! `config.toml` > environment (including `.env`) > defaults.
//! Gameplay tuning values are plain constants below.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::paths;

// ==================== Runtime Configuration ====================

/// Resolved runtime configuration shared through `AppState`
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_path: PathBuf,
    pub host: String,
    pub port: u16,
    /// Include internal error details in API error bodies
    pub dev_mode: bool,
    pub session_hours: i64,
    pub notification_ttl_days: i64,
    /// Accounts registered with this email get the admin role
    pub admin_email: Option<String>,
    pub static_dir: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from(paths::db_path()),
            host: SERVER_ADDR.to_string(),
            port: SERVER_PORT,
            dev_mode: false,
            session_hours: SESSION_DURATION_HOURS,
            notification_ttl_days: NOTIFICATION_TTL_DAYS,
            admin_email: None,
            static_dir: PathBuf::from(paths::STATIC_DIR),
        }
    }
}

/// Configuration file structure for config.toml
#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    database: Option<DatabaseSection>,
    server: Option<ServerSection>,
    auth: Option<AuthSection>,
    notifications: Option<NotificationSection>,
}

#[derive(Debug, Deserialize)]
struct DatabaseSection {
    path: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ServerSection {
    host: Option<String>,
    port: Option<u16>,
    dev_mode: Option<bool>,
    static_dir: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AuthSection {
    session_hours: Option<i64>,
    admin_email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NotificationSection {
    ttl_days: Option<i64>,
}

impl AppConfig {
    /// Load configuration from `config.toml` in the working directory, then env, then defaults
    pub fn load() -> Self {
        // Load .env file if present
        let _ = dotenvy::dotenv();
        Self::load_from(Path::new("config.toml"), |key| std::env::var(key).ok())
    }

    /// Load with an explicit config file path and env lookup (used by tests)
    pub fn load_from(config_file: &Path, env: impl Fn(&str) -> Option<String>) -> Self {
        let file = read_file_config(config_file);
        let mut config = Self::default();

        // Priority 1: config.toml
        if let Some(path) = file.database.and_then(|d| d.path) {
            tracing::info!("Using database from config.toml: {}", path);
            config.database_path = PathBuf::from(path);
        } else if let Some(path) = env("DATABASE_PATH") {
            // Priority 2: env
            tracing::info!("Using database from DATABASE_PATH env: {}", path);
            config.database_path = PathBuf::from(path);
        }

        let server = file.server;
        config.host = server
            .as_ref()
            .and_then(|s| s.host.clone())
            .or_else(|| env("HOST"))
            .unwrap_or(config.host);
        config.port = server
            .as_ref()
            .and_then(|s| s.port)
            .or_else(|| env("PORT").and_then(|p| p.parse().ok()))
            .unwrap_or(config.port);
        config.dev_mode = server
            .as_ref()
            .and_then(|s| s.dev_mode)
            .or_else(|| env("DEV_MODE").map(|v| parse_bool(&v)))
            .unwrap_or(config.dev_mode);
        config.static_dir = server
            .as_ref()
            .and_then(|s| s.static_dir.clone())
            .or_else(|| env("STATIC_DIR"))
            .map(PathBuf::from)
            .unwrap_or(config.static_dir);

        let auth = file.auth;
        config.session_hours = auth
            .as_ref()
            .and_then(|a| a.session_hours)
            .or_else(|| env("SESSION_HOURS").and_then(|h| h.parse().ok()))
            .filter(|h| *h > 0)
            .unwrap_or(config.session_hours);
        config.admin_email = auth
            .and_then(|a| a.admin_email)
            .or_else(|| env("ADMIN_EMAIL"))
            .map(|e| e.trim().to_lowercase())
            .filter(|e| !e.is_empty());

        config.notification_ttl_days = file
            .notifications
            .and_then(|n| n.ttl_days)
            .or_else(|| env("NOTIFICATION_TTL_DAYS").and_then(|d| d.parse().ok()))
            .filter(|d| *d > 0)
            .unwrap_or(config.notification_ttl_days);

        config
    }

    /// Get the full server bind address
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn read_file_config(path: &Path) -> FileConfig {
    let Ok(contents) = std::fs::read_to_string(path) else {
        return FileConfig::default();
    };
    match toml::from_str::<FileConfig>(&contents) {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!("Ignoring malformed {}: {}", path.display(), e);
            FileConfig::default()
        }
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

// ==================== Server Configuration ====================

/// Default address to bind to
pub const SERVER_ADDR: &str = "0.0.0.0";

/// Default port
pub const SERVER_PORT: u16 = 3000;

// ==================== Session Configuration ====================

/// Bearer token lifetime in hours (1 week)
pub const SESSION_DURATION_HOURS: i64 = 24 * 7;

/// Probability threshold for session cleanup (0-255, lower = more frequent)
/// Value of 25 means ~10% chance (25/256) on each token lookup
pub const SESSION_CLEANUP_THRESHOLD: u8 = 25;

// ==================== Mastery Configuration ====================

pub const MASTERY_MAX: i64 = 100;
pub const MASTERY_CORRECT_STEP: i64 = 10;
pub const MASTERY_INCORRECT_STEP: i64 = 5;

/// Mastery at or above which a word counts as mastered
pub const MASTERED_THRESHOLD: i64 = 80;

/// Mastery at or above which a word counts as learned
pub const LEARNED_THRESHOLD: i64 = 10;

/// Maximum number of words handed out per review session
pub const REVIEW_SESSION_CAP: usize = 20;

// ==================== Gamification ====================

pub const XP_PER_CORRECT: i64 = 10;
pub const XP_PER_INCORRECT: i64 = 2;
pub const XP_PER_TEST: i64 = 20;
pub const XP_PERFECT_TEST_BONUS: i64 = 30;

/// XP needed per level
pub const XP_PER_LEVEL: i64 = 100;

/// Streak lengths that trigger a notification
pub const STREAK_MILESTONES: [i64; 5] = [3, 7, 14, 30, 100];

/// Notification lifetime before purge
pub const NOTIFICATION_TTL_DAYS: i64 = 30;

/// Interval between expired-notification purges
pub const NOTIFICATION_PURGE_INTERVAL_SECS: u64 = 60 * 60;

/// Capacity of the side-effect event queue
pub const EVENT_QUEUE_CAPACITY: usize = 1024;

// ==================== Tests ====================

/// Number of distractor choices in multiple choice questions
pub const DISTRACTOR_COUNT: usize = 3;

pub const DEFAULT_TEST_QUESTIONS: usize = 10;
pub const MAX_TEST_QUESTIONS: usize = 50;

// ==================== Query Limits ====================

pub const DEFAULT_PAGE_SIZE: i64 = 50;
pub const MAX_PAGE_SIZE: i64 = 200;
pub const MAX_BULK_WORDS: usize = 500;

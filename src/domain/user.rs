use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Role {
  #[default]
  User,
  Admin,
}

impl Role {
  pub fn from_str(s: &str) -> Option<Self> {
    match s {
      "user" => Some(Self::User),
      "admin" => Some(Self::Admin),
      _ => None,
    }
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      Self::User => "user",
      Self::Admin => "admin",
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Script {
  #[default]
  Traditional,
  Simplified,
}

/// User preferences stored as JSON on the user row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
  /// Target number of words per day
  pub daily_goal: i64,
  pub notifications_enabled: bool,
  pub preferred_script: Script,
  pub show_pronunciation: bool,
}

impl Default for Preferences {
  fn default() -> Self {
    Self {
      daily_goal: 20,
      notifications_enabled: true,
      preferred_script: Script::Traditional,
      show_pronunciation: true,
    }
  }
}

/// Account plus gamification state. The password hash never leaves the db layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
  pub id: i64,
  pub email: String,
  pub display_name: String,
  pub role: Role,
  pub xp: i64,
  pub level: i64,
  pub current_streak: i64,
  pub longest_streak: i64,
  pub last_study_date: Option<NaiveDate>,
  pub preferences: Preferences,
  pub created_at: DateTime<Utc>,
  pub last_login_at: Option<DateTime<Utc>>,
}

impl User {
  pub fn is_admin(&self) -> bool {
    self.role == Role::Admin
  }
}

/// One row of the per-day statistics table
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DailyStats {
  pub day: NaiveDate,
  pub words_studied: i64,
  pub correct_answers: i64,
  pub incorrect_answers: i64,
  pub xp_earned: i64,
  pub tests_completed: i64,
  pub study_seconds: i64,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_role_roundtrip() {
    assert_eq!(Role::from_str("admin"), Some(Role::Admin));
    assert_eq!(Role::from_str(Role::User.as_str()), Some(Role::User));
    assert_eq!(Role::from_str("root"), None);
  }

  #[test]
  fn test_preferences_fill_missing_fields() {
    let prefs: Preferences = serde_json::from_str(r#"{"daily_goal": 5}"#).unwrap();
    assert_eq!(prefs.daily_goal, 5);
    assert!(prefs.notifications_enabled);
    assert_eq!(prefs.preferred_script, Script::Traditional);
  }
}

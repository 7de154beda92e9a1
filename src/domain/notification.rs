use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
  Achievement,
  LevelUp,
  Streak,
  Reminder,
  System,
}

impl NotificationKind {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Achievement => "achievement",
      Self::LevelUp => "level_up",
      Self::Streak => "streak",
      Self::Reminder => "reminder",
      Self::System => "system",
    }
  }

  pub fn from_str(s: &str) -> Option<Self> {
    match s {
      "achievement" => Some(Self::Achievement),
      "level_up" => Some(Self::LevelUp),
      "streak" => Some(Self::Streak),
      "reminder" => Some(Self::Reminder),
      "system" => Some(Self::System),
      _ => None,
    }
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
  pub id: i64,
  pub user_id: i64,
  pub kind: NotificationKind,
  pub title: String,
  pub message: String,
  pub data: Option<serde_json::Value>,
  pub is_read: bool,
  pub created_at: DateTime<Utc>,
  pub expires_at: DateTime<Utc>,
}

/// Content of a notification before it is stored
#[derive(Debug, Clone)]
pub struct NewNotification {
  pub user_id: i64,
  pub kind: NotificationKind,
  pub title: String,
  pub message: String,
  pub data: Option<serde_json::Value>,
}

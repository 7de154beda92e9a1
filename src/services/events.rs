//! Best-effort side channel for study side effects.
//!
//! Handlers publish [`LearningEvent`]s after their transaction commits. A
//! background worker drains the bounded queue, checks achievements and writes
//! notifications. Publishing never blocks: when the queue is full the event is
//! dropped with a warning, and worker failures are logged and never reach
//! the request that caused them.

use std::time::Duration as StdDuration;

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use serde_json::json;
use tokio::sync::mpsc;

use super::achievements::{check_and_award_achievements, level_up_notification};
use super::ServiceResult;
use crate::auth::db as auth_db;
use crate::db::{notifications, try_lock, DbPool, LogOnError};
use crate::domain::{NewNotification, Notification, NotificationKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LearningEvent {
    /// Counters a badge may depend on changed
    Activity { user_id: i64 },
    LevelUp { user_id: i64, level: i64 },
    StreakMilestone { user_id: i64, days: i64 },
}

impl LearningEvent {
    pub fn user_id(&self) -> i64 {
        match self {
            Self::Activity { user_id }
            | Self::LevelUp { user_id, .. }
            | Self::StreakMilestone { user_id, .. } => *user_id,
        }
    }
}

/// Events that follow from one committed study update
pub fn outcome_events(
    user_id: i64,
    leveled_up: bool,
    level: i64,
    streak_milestone: Option<i64>,
) -> Vec<LearningEvent> {
    let mut events = Vec::with_capacity(3);
    if leveled_up {
        events.push(LearningEvent::LevelUp { user_id, level });
    }
    if let Some(days) = streak_milestone {
        events.push(LearningEvent::StreakMilestone { user_id, days });
    }
    events.push(LearningEvent::Activity { user_id });
    events
}

/// Cloneable publishing half of the queue
#[derive(Debug, Clone)]
pub struct EventSender {
    tx: mpsc::Sender<LearningEvent>,
}

impl EventSender {
    /// Queue an event without waiting. Returns false if it was dropped.
    pub fn publish(&self, event: LearningEvent) -> bool {
        match self.tx.try_send(event) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(event)) => {
                tracing::warn!(user_id = event.user_id(), "Event queue full, dropping {:?}", event);
                false
            }
            Err(mpsc::error::TrySendError::Closed(event)) => {
                tracing::warn!("Event worker stopped, dropping {:?}", event);
                false
            }
        }
    }

    pub fn publish_all(&self, events: impl IntoIterator<Item = LearningEvent>) {
        for event in events {
            self.publish(event);
        }
    }
}

/// Create the bounded queue
pub fn channel(capacity: usize) -> (EventSender, mpsc::Receiver<LearningEvent>) {
    let (tx, rx) = mpsc::channel(capacity);
    (EventSender { tx }, rx)
}

/// Store a notification unless the user switched notifications off
pub fn notify(
    conn: &Connection,
    new: &NewNotification,
    now: DateTime<Utc>,
    ttl_days: i64,
) -> ServiceResult<Option<Notification>> {
    let enabled = auth_db::get_user(conn, new.user_id)?
        .map(|u| u.preferences.notifications_enabled)
        .unwrap_or(false);
    if !enabled {
        return Ok(None);
    }
    Ok(Some(notifications::create_notification(conn, new, now, ttl_days)?))
}

/// Apply one event's side effects
pub fn process_event(
    conn: &Connection,
    event: &LearningEvent,
    now: DateTime<Utc>,
    ttl_days: i64,
) -> ServiceResult<()> {
    match event {
        LearningEvent::Activity { user_id } => {
            check_and_award_achievements(conn, *user_id, now, ttl_days)?;
        }
        LearningEvent::LevelUp { user_id, level } => {
            notify(conn, &level_up_notification(*user_id, *level), now, ttl_days)?;
        }
        LearningEvent::StreakMilestone { user_id, days } => {
            notify(
                conn,
                &NewNotification {
                    user_id: *user_id,
                    kind: NotificationKind::Streak,
                    title: format!("🔥 {days}-day streak"),
                    message: format!("You have studied {days} days in a row."),
                    data: Some(json!({ "streak": days })),
                },
                now,
                ttl_days,
            )?;
        }
    }
    Ok(())
}

/// Drain the queue until every sender is gone
pub async fn run_worker(db: DbPool, ttl_days: i64, mut rx: mpsc::Receiver<LearningEvent>) {
    tracing::debug!("Event worker started");
    while let Some(event) = rx.recv().await {
        let Some(conn) = try_lock(&db).log_warn("Event worker could not lock database") else {
            continue;
        };
        process_event(&conn, &event, Utc::now(), ttl_days)
            .log_warn(&format!("Failed to process {:?}", event));
    }
    tracing::debug!("Event worker stopped");
}

/// Periodically delete expired notifications
pub async fn run_notification_purge(db: DbPool, interval_secs: u64) {
    let mut ticker = tokio::time::interval(StdDuration::from_secs(interval_secs));
    loop {
        ticker.tick().await;
        let Some(conn) = try_lock(&db).log_warn("Notification purge could not lock database") else {
            continue;
        };
        if let Some(purged) = notifications::purge_expired(&conn, Utc::now())
            .log_warn("Failed to purge expired notifications")
        {
            if purged > 0 {
                tracing::info!("Purged {} expired notifications", purged);
            }
        }
    }
}

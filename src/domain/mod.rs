pub mod badge;
pub mod notification;
pub mod progress;
pub mod quiz;
pub mod user;
pub mod word;

pub use badge::{Achievement, Badge, BadgeCondition, BadgeStatus, UserCounters};
pub use notification::{NewNotification, Notification, NotificationKind};
pub use progress::{
  AnswerOutcome, PracticeMode, ProgressOverview, SessionOutcome, StreakState, WordProgress,
};
pub use quiz::{GradedAnswer, Question, QuestionType, Quiz, QuizResult, QuizSource, QuizView};
pub use user::{DailyStats, Preferences, Role, Script, User};
pub use word::{Category, Difficulty, Word, WordInput, WordSet, WordSetStats};

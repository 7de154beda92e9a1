//! Generated tests and their submitted results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::validation::AnswerResult;

/// Where the words of a test come from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QuizSource {
  WordSet { id: i64 },
  Category { id: i64 },
  /// Words currently due for review
  Review,
  /// Every word the user can see
  All,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
  /// Chinese prompt, pick the Vietnamese meaning
  #[default]
  MultipleChoice,
  /// Vietnamese prompt, pick the Chinese word
  ReverseChoice,
  /// Chinese prompt, type the Vietnamese meaning
  Typing,
  /// Random mix of the above per question
  Mixed,
}

impl QuestionType {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::MultipleChoice => "multiple_choice",
      Self::ReverseChoice => "reverse_choice",
      Self::Typing => "typing",
      Self::Mixed => "mixed",
    }
  }

  pub fn from_str(s: &str) -> Option<Self> {
    match s {
      "multiple_choice" => Some(Self::MultipleChoice),
      "reverse_choice" => Some(Self::ReverseChoice),
      "typing" => Some(Self::Typing),
      "mixed" => Some(Self::Mixed),
      _ => None,
    }
  }
}

/// A stored question, including its expected answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
  pub index: usize,
  pub word_id: i64,
  pub kind: QuestionType,
  pub prompt: String,
  /// Reading hint shown with the prompt (pinyin for Chinese prompts)
  pub hint: Option<String>,
  pub choices: Vec<String>,
  pub answer: String,
}

/// What the client sees before submitting
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicQuestion {
  pub index: usize,
  pub word_id: i64,
  pub kind: QuestionType,
  pub prompt: String,
  pub hint: Option<String>,
  pub choices: Vec<String>,
}

impl Question {
  pub fn public(&self) -> PublicQuestion {
    PublicQuestion {
      index: self.index,
      word_id: self.word_id,
      kind: self.kind,
      prompt: self.prompt.clone(),
      hint: self.hint.clone(),
      choices: self.choices.clone(),
    }
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quiz {
  pub id: i64,
  pub owner_id: i64,
  pub title: String,
  pub source: QuizSource,
  pub question_type: QuestionType,
  pub questions: Vec<Question>,
  pub time_limit_secs: Option<i64>,
  pub created_at: DateTime<Utc>,
}

/// Quiz as returned to the client (answers withheld)
#[derive(Debug, Clone, Serialize)]
pub struct QuizView {
  pub id: i64,
  pub title: String,
  pub source: QuizSource,
  pub question_type: QuestionType,
  pub question_count: usize,
  pub questions: Vec<PublicQuestion>,
  pub time_limit_secs: Option<i64>,
  pub created_at: DateTime<Utc>,
}

impl From<&Quiz> for QuizView {
  fn from(quiz: &Quiz) -> Self {
    Self {
      id: quiz.id,
      title: quiz.title.clone(),
      source: quiz.source.clone(),
      question_type: quiz.question_type,
      question_count: quiz.questions.len(),
      questions: quiz.questions.iter().map(Question::public).collect(),
      time_limit_secs: quiz.time_limit_secs,
      created_at: quiz.created_at,
    }
  }
}

/// One graded answer inside a result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradedAnswer {
  pub question_index: usize,
  pub word_id: i64,
  pub given: Option<String>,
  pub expected: String,
  pub result: AnswerResult,
  pub correct: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizResult {
  pub id: i64,
  pub quiz_id: i64,
  pub user_id: i64,
  /// Percentage 0..=100
  pub score: i64,
  pub correct_count: i64,
  pub total_questions: i64,
  pub answers: Vec<GradedAnswer>,
  pub duration_secs: Option<i64>,
  pub xp_earned: i64,
  pub completed_at: DateTime<Utc>,
}

impl QuizResult {
  pub fn is_perfect(&self) -> bool {
    self.total_questions > 0 && self.correct_count == self.total_questions
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_source_tagging() {
    let source: QuizSource = serde_json::from_str(r#"{"type":"word_set","id":4}"#).unwrap();
    assert_eq!(source, QuizSource::WordSet { id: 4 });
    let source: QuizSource = serde_json::from_str(r#"{"type":"review"}"#).unwrap();
    assert_eq!(source, QuizSource::Review);
  }

  #[test]
  fn test_public_question_hides_answer() {
    let q = Question {
      index: 0,
      word_id: 9,
      kind: QuestionType::Typing,
      prompt: "水".to_string(),
      hint: Some("shuǐ".to_string()),
      choices: vec![],
      answer: "nước".to_string(),
    };
    let json = serde_json::to_value(q.public()).unwrap();
    assert!(json.get("answer").is_none());
    assert_eq!(json["prompt"], "水");
  }
}

//! Answer validation for typed and selected answers.
//!
//! Expected answers are the stored Vietnamese meaning (or a Chinese headword
//! for reverse questions) and may hold several accepted forms:
//! - `a, b` / `a; b` / `a / b` - synonyms (any is correct)
//! - `(note)` - usage note, ignored when matching
//!
//! Matching is Unicode aware: both sides are NFC-normalised, lowercased and
//! stripped of punctuation. A reply that only matches once Vietnamese tone
//! and vowel marks are removed is reported as [`AnswerResult::AccentMismatch`].

use serde::{Deserialize, Serialize};
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

// ============================================================================
// Result types
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerResult {
  Correct,
  /// Right word, wrong or missing diacritics ("nuoc" for "nước")
  AccentMismatch,
  Incorrect,
}

impl AnswerResult {
  /// Only exact matches count towards mastery
  pub fn is_correct(&self) -> bool {
    matches!(self, Self::Correct)
  }
}

// ============================================================================
// Normalization
// ============================================================================

/// NFC, lowercase, punctuation removed, whitespace collapsed
pub fn normalize_answer(input: &str) -> String {
  input
    .nfc()
    .flat_map(char::to_lowercase)
    .map(|c| if c.is_alphanumeric() || c.is_whitespace() { c } else { ' ' })
    .collect::<String>()
    .split_whitespace()
    .collect::<Vec<_>>()
    .join(" ")
}

/// Remove combining marks after canonical decomposition; `đ` folds to `d`
pub fn strip_diacritics(input: &str) -> String {
  input
    .nfd()
    .filter(|c| !is_combining_mark(*c))
    .map(|c| match c {
      'đ' => 'd',
      'Đ' => 'D',
      other => other,
    })
    .collect()
}

/// Drop parenthesised notes, handling nesting
fn remove_notes(input: &str) -> String {
  let mut depth = 0usize;
  let mut out = String::with_capacity(input.len());
  for c in input.chars() {
    match c {
      '(' | '（' => depth += 1,
      ')' | '）' if depth > 0 => depth -= 1,
      _ if depth == 0 => out.push(c),
      _ => {}
    }
  }
  out
}

// ============================================================================
// Variant extraction
// ============================================================================

/// Every accepted form of an expected answer, normalised and de-duplicated
pub fn accepted_answers(expected: &str) -> Vec<String> {
  let without_notes = remove_notes(expected);
  let mut answers: Vec<String> = Vec::new();

  let mut push = |candidate: &str| {
    let normalized = normalize_answer(candidate);
    if !normalized.is_empty() && !answers.contains(&normalized) {
      answers.push(normalized);
    }
  };

  push(&without_notes);
  for part in without_notes.split([',', ';', '/', '，', '；']) {
    push(part);
  }

  answers
}

// ============================================================================
// Matching
// ============================================================================

pub fn validate_answer(given: &str, expected: &str) -> AnswerResult {
  let given = normalize_answer(&remove_notes(given));
  if given.is_empty() {
    return AnswerResult::Incorrect;
  }

  let accepted = accepted_answers(expected);
  if accepted.iter().any(|a| *a == given) {
    return AnswerResult::Correct;
  }

  let given_bare = strip_diacritics(&given);
  if accepted.iter().any(|a| strip_diacritics(a) == given_bare) {
    return AnswerResult::AccentMismatch;
  }

  AnswerResult::Incorrect
}

/// Selected choices must equal the expected option exactly (after normalisation)
pub fn validate_choice(selected: &str, expected: &str) -> AnswerResult {
  if normalize_answer(selected) == normalize_answer(expected) && !expected.trim().is_empty() {
    AnswerResult::Correct
  } else {
    AnswerResult::Incorrect
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_exact_match() {
    assert_eq!(validate_answer("nước", "nước"), AnswerResult::Correct);
    assert_eq!(validate_answer("  Nước!  ", "nước"), AnswerResult::Correct);
  }

  #[test]
  fn test_synonyms() {
    let expected = "học, học tập; nghiên cứu";
    assert_eq!(validate_answer("học tập", expected), AnswerResult::Correct);
    assert_eq!(validate_answer("nghiên cứu", expected), AnswerResult::Correct);
    assert_eq!(validate_answer("học, học tập; nghiên cứu", expected), AnswerResult::Correct);
    assert_eq!(validate_answer("ăn", expected), AnswerResult::Incorrect);
  }

  #[test]
  fn test_notes_ignored() {
    assert_eq!(validate_answer("ăn", "ăn (động từ)"), AnswerResult::Correct);
    assert_eq!(validate_answer("ăn (verb)", "ăn"), AnswerResult::Correct);
  }

  #[test]
  fn test_accent_mismatch() {
    assert_eq!(validate_answer("nuoc", "nước"), AnswerResult::AccentMismatch);
    assert_eq!(validate_answer("duong", "đường"), AnswerResult::AccentMismatch);
    assert!(!AnswerResult::AccentMismatch.is_correct());
  }

  #[test]
  fn test_decomposed_input_matches_precomposed() {
    // "ế" typed as e + circumflex + acute combining marks
    let decomposed = "bie\u{0302}\u{0301}t";
    assert_eq!(validate_answer(decomposed, "biết"), AnswerResult::Correct);
  }

  #[test]
  fn test_empty_answer_is_incorrect() {
    assert_eq!(validate_answer("", "nước"), AnswerResult::Incorrect);
    assert_eq!(validate_answer("  ?! ", "nước"), AnswerResult::Incorrect);
  }

  #[test]
  fn test_han_answers() {
    assert_eq!(validate_answer("學習", "學習"), AnswerResult::Correct);
    assert_eq!(validate_answer("学习", "學習"), AnswerResult::Incorrect);
  }

  #[test]
  fn test_choice_requires_whole_option() {
    assert_eq!(validate_choice("học, học tập", "học, học tập"), AnswerResult::Correct);
    assert_eq!(validate_choice("học", "học, học tập"), AnswerResult::Incorrect);
  }

  #[test]
  fn test_strip_diacritics() {
    assert_eq!(strip_diacritics("Tiếng Việt"), "Tieng Viet");
    assert_eq!(strip_diacritics("Đà Nẵng"), "Da Nang");
  }
}

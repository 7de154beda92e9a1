//! Test generation and grading.
//!
//! A test is built from a word source, shuffled, and stored with its expected
//! answers. Submitting grades every question, feeds the graded answers through
//! the shared study path and stores the result, all in one transaction.

use chrono::{DateTime, Utc};
use rand::seq::{IndexedRandom, SliceRandom};
use rand::Rng;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use super::learning::{apply_batch, review_queue, AnswerInput, StudyBatch};
use super::{ServiceError, ServiceResult};
use crate::auth::db as auth_db;
use crate::config::{
    DEFAULT_TEST_QUESTIONS, DISTRACTOR_COUNT, MAX_TEST_QUESTIONS, REVIEW_SESSION_CAP,
    XP_PERFECT_TEST_BONUS, XP_PER_TEST,
};
use crate::db::quizzes::{self, NewResult};
use crate::db::{categories, word_sets, words};
use crate::domain::{GradedAnswer, Question, QuestionType, Quiz, QuizResult, QuizSource, Script, Word};
use crate::validation::{validate_answer, validate_choice, AnswerResult};

pub const MAX_TITLE_LEN: usize = 100;

#[derive(Debug, Clone, Deserialize)]
pub struct CreateQuizRequest {
    #[serde(default)]
    pub title: Option<String>,
    pub source: QuizSource,
    #[serde(default)]
    pub question_type: QuestionType,
    #[serde(default)]
    pub question_count: Option<usize>,
    #[serde(default)]
    pub time_limit_secs: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubmittedAnswer {
    pub question_index: usize,
    /// Missing or null counts as unanswered
    #[serde(default)]
    pub answer: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubmitQuizRequest {
    #[serde(default)]
    pub answers: Vec<SubmittedAnswer>,
    #[serde(default)]
    pub duration_secs: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubmitOutcome {
    pub result: QuizResult,
    pub total_xp: i64,
    pub level: i64,
    pub leveled_up: bool,
    pub streak_milestone: Option<i64>,
}

// ==================== Generation ====================

/// Generate and store a test for the user
pub fn create_quiz(
    conn: &Connection,
    user_id: i64,
    req: &CreateQuizRequest,
    now: DateTime<Utc>,
) -> ServiceResult<Quiz> {
    create_quiz_with(conn, user_id, req, now, &mut rand::rng())
}

pub(crate) fn create_quiz_with<R: Rng + ?Sized>(
    conn: &Connection,
    user_id: i64,
    req: &CreateQuizRequest,
    now: DateTime<Utc>,
    rng: &mut R,
) -> ServiceResult<Quiz> {
    let count = req.question_count.unwrap_or(DEFAULT_TEST_QUESTIONS);
    if !(1..=MAX_TEST_QUESTIONS).contains(&count) {
        return Err(ServiceError::Invalid(format!(
            "question_count must be between 1 and {MAX_TEST_QUESTIONS}"
        )));
    }
    if req.time_limit_secs.is_some_and(|t| t <= 0) {
        return Err(ServiceError::Invalid("time_limit_secs must be positive".to_string()));
    }
    let title = match req.title.as_deref().map(str::trim) {
        Some(t) if !t.is_empty() => t.to_string(),
        _ => default_title(&req.source).to_string(),
    };
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(ServiceError::Invalid(format!(
            "Title must be at most {MAX_TITLE_LEN} characters"
        )));
    }

    let mut pool = resolve_source(conn, user_id, &req.source, now)?;
    if pool.is_empty() {
        return Err(ServiceError::Invalid("No words available for this test".to_string()));
    }
    pool.shuffle(rng);
    let chosen = &pool[..count.min(pool.len())];

    // Distractors may come from any word the user can see
    let distractor_pool = words::list_visible_words(conn, user_id)?;
    let prefer_simplified = auth_db::get_user(conn, user_id)?
        .is_some_and(|u| u.preferences.preferred_script == Script::Simplified);

    let questions = build_questions(rng, chosen, &distractor_pool, req.question_type, prefer_simplified);
    let quiz = quizzes::create_quiz(
        conn,
        user_id,
        &title,
        &req.source,
        req.question_type,
        &questions,
        req.time_limit_secs,
        now,
    )?;
    tracing::debug!(user_id, quiz_id = quiz.id, questions = questions.len(), "Created test");
    Ok(quiz)
}

fn default_title(source: &QuizSource) -> &'static str {
    match source {
        QuizSource::WordSet { .. } => "Word set test",
        QuizSource::Category { .. } => "Category test",
        QuizSource::Review => "Review test",
        QuizSource::All => "Vocabulary test",
    }
}

/// Words a test may draw from, restricted to what the user can see
fn resolve_source(
    conn: &Connection,
    user_id: i64,
    source: &QuizSource,
    now: DateTime<Utc>,
) -> ServiceResult<Vec<Word>> {
    let visible = |w: &Word| w.owner_id == user_id || w.is_public;
    match source {
        QuizSource::WordSet { id } => {
            let set = word_sets::get_word_set(conn, *id)?.ok_or(ServiceError::NotFound("Word set"))?;
            if set.owner_id != user_id && !set.is_public {
                return Err(ServiceError::Forbidden("You do not have access to this word set".to_string()));
            }
            let ids = word_sets::get_word_ids(conn, *id)?;
            Ok(words::get_words_by_ids(conn, &ids)?.into_iter().filter(visible).collect())
        }
        QuizSource::Category { id } => {
            let category = categories::get_category(conn, *id)?.ok_or(ServiceError::NotFound("Category"))?;
            if category.owner_id != user_id {
                return Err(ServiceError::Forbidden("You do not have access to this category".to_string()));
            }
            Ok(words::list_words_in_category(conn, *id)?.into_iter().filter(visible).collect())
        }
        QuizSource::Review => Ok(review_queue(conn, user_id, REVIEW_SESSION_CAP, now)?
            .into_iter()
            .map(|item| item.word)
            .collect()),
        QuizSource::All => Ok(words::list_visible_words(conn, user_id)?),
    }
}

/// Build one question per word. Choice questions fall back to typing when no
/// distractor exists.
pub fn build_questions<R: Rng + ?Sized>(
    rng: &mut R,
    chosen: &[Word],
    pool: &[Word],
    question_type: QuestionType,
    prefer_simplified: bool,
) -> Vec<Question> {
    const CONCRETE: [QuestionType; 3] = [
        QuestionType::MultipleChoice,
        QuestionType::ReverseChoice,
        QuestionType::Typing,
    ];

    chosen
        .iter()
        .enumerate()
        .map(|(index, word)| {
            let mut kind = match question_type {
                QuestionType::Mixed => *CONCRETE.choose(rng).unwrap_or(&QuestionType::Typing),
                other => other,
            };

            let headword = word.headword(prefer_simplified).to_string();
            let (prompt, hint, answer) = match kind {
                QuestionType::ReverseChoice => (word.vietnamese.clone(), word.han_viet.clone(), headword),
                _ => (headword, word.pinyin.clone(), word.vietnamese.clone()),
            };

            let mut choices = Vec::new();
            if kind != QuestionType::Typing {
                let distractors = pick_distractors(rng, word, pool, kind, prefer_simplified, &answer);
                if distractors.is_empty() {
                    kind = QuestionType::Typing;
                } else {
                    choices.push(answer.clone());
                    choices.extend(distractors);
                    choices.shuffle(rng);
                }
            }

            // Reverse questions that degraded to typing still ask for the meaning
            let (prompt, hint, answer) = if kind == QuestionType::Typing && prompt == word.vietnamese {
                (answer, word.pinyin.clone(), word.vietnamese.clone())
            } else {
                (prompt, hint, answer)
            };

            Question {
                index,
                word_id: word.id,
                kind,
                prompt,
                hint,
                choices,
                answer,
            }
        })
        .collect()
}

/// Distractors from the same category first, then from any other word
fn pick_distractors<R: Rng + ?Sized>(
    rng: &mut R,
    word: &Word,
    pool: &[Word],
    kind: QuestionType,
    prefer_simplified: bool,
    correct: &str,
) -> Vec<String> {
    let option_of = |w: &Word| match kind {
        QuestionType::ReverseChoice => w.headword(prefer_simplified).to_string(),
        _ => w.vietnamese.clone(),
    };
    let candidates = |same_category: bool, taken: &[String]| {
        let mut options: Vec<String> = pool
            .iter()
            .filter(|w| w.id != word.id)
            .filter(|w| !same_category || (word.category_id.is_some() && w.category_id == word.category_id))
            .map(option_of)
            .filter(|o| !o.is_empty() && o != correct && !taken.contains(o))
            .collect();
        options.sort();
        options.dedup();
        options
    };

    let mut distractors = candidates(true, &[]);
    distractors.shuffle(rng);
    if distractors.len() < DISTRACTOR_COUNT {
        let mut rest = candidates(false, &distractors);
        rest.shuffle(rng);
        distractors.extend(rest);
    }
    distractors.truncate(DISTRACTOR_COUNT);
    distractors
}

// ==================== Access ====================

/// Load a test owned by the user
pub fn owned_quiz(conn: &Connection, user_id: i64, quiz_id: i64) -> ServiceResult<Quiz> {
    let quiz = quizzes::get_quiz(conn, quiz_id)?.ok_or(ServiceError::NotFound("Test"))?;
    if quiz.owner_id != user_id {
        return Err(ServiceError::Forbidden("You do not have access to this test".to_string()));
    }
    Ok(quiz)
}

pub fn owned_result(conn: &Connection, user_id: i64, result_id: i64) -> ServiceResult<QuizResult> {
    let result = quizzes::get_result(conn, result_id)?.ok_or(ServiceError::NotFound("Test result"))?;
    if result.user_id != user_id {
        return Err(ServiceError::Forbidden("You do not have access to this result".to_string()));
    }
    Ok(result)
}

// ==================== Grading ====================

/// Grade every question against the submitted answers. Unanswered questions are incorrect.
pub fn grade_answers(questions: &[Question], submitted: &[SubmittedAnswer]) -> Vec<GradedAnswer> {
    questions
        .iter()
        .map(|q| {
            let given = submitted
                .iter()
                .find(|a| a.question_index == q.index)
                .and_then(|a| a.answer.clone())
                .filter(|a| !a.trim().is_empty());
            let result = match (&given, q.kind) {
                (None, _) => AnswerResult::Incorrect,
                (Some(g), QuestionType::Typing) => validate_answer(g, &q.answer),
                (Some(g), _) => validate_choice(g, &q.answer),
            };
            GradedAnswer {
                question_index: q.index,
                word_id: q.word_id,
                given,
                expected: q.answer.clone(),
                correct: result.is_correct(),
                result,
            }
        })
        .collect()
}

/// Percentage of correct answers, rounded
pub fn score_percent(correct: usize, total: usize) -> i64 {
    if total == 0 {
        return 0;
    }
    ((correct as f64 * 100.0) / total as f64).round() as i64
}

/// Grade and store a submission, crediting progress and XP
pub fn submit_quiz(
    conn: &Connection,
    user_id: i64,
    quiz_id: i64,
    req: &SubmitQuizRequest,
    now: DateTime<Utc>,
) -> ServiceResult<SubmitOutcome> {
    let quiz = owned_quiz(conn, user_id, quiz_id)?;
    if req.duration_secs.is_some_and(|d| d < 0) {
        return Err(ServiceError::Invalid("duration_secs must not be negative".to_string()));
    }

    let graded = grade_answers(&quiz.questions, &req.answers);
    let correct_count = graded.iter().filter(|g| g.correct).count();
    let total = graded.len();
    let perfect = total > 0 && correct_count == total;

    // Words deleted since the test was generated are graded but not tracked
    let mut answers = Vec::with_capacity(total);
    for g in &graded {
        match words::get_word(conn, g.word_id)? {
            Some(w) if w.owner_id == user_id || w.is_public => answers.push(AnswerInput {
                word_id: g.word_id,
                correct: g.correct,
            }),
            _ => {}
        }
    }

    let bonus_xp = XP_PER_TEST + if perfect { XP_PERFECT_TEST_BONUS } else { 0 };
    let tx = conn.unchecked_transaction()?;
    let outcome = apply_batch(
        &tx,
        user_id,
        &StudyBatch {
            answers: &answers,
            bonus_xp,
            study_seconds: req.duration_secs.unwrap_or(0),
            tests_completed: 1,
        },
        now,
    )?;
    let result = quizzes::insert_result(
        &tx,
        &NewResult {
            quiz_id,
            user_id,
            score: score_percent(correct_count, total),
            correct_count: correct_count as i64,
            total_questions: total as i64,
            answers: &graded,
            duration_secs: req.duration_secs,
            xp_earned: outcome.xp_earned,
            completed_at: now,
        },
    )?;
    tx.commit()?;

    tracing::info!(user_id, quiz_id, score = result.score, "Test submitted");
    Ok(SubmitOutcome {
        result,
        total_xp: outcome.total_xp,
        level: outcome.level,
        leveled_up: outcome.leveled_up,
        streak_milestone: outcome.streak_milestone,
    })
}

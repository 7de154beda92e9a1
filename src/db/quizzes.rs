//! Stored tests and submitted results. Questions and graded answers are JSON columns.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Result, Row};

use super::{parse_json, parse_ts, to_json, ts};
use crate::domain::quiz::QuestionType;
use crate::domain::{GradedAnswer, Question, Quiz, QuizResult, QuizSource};

fn row_to_quiz(row: &Row) -> Result<Quiz> {
    let source: String = row.get(3)?;
    let question_type: String = row.get(4)?;
    let questions: String = row.get(5)?;
    let created_at: String = row.get(7)?;
    Ok(Quiz {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        title: row.get(2)?,
        source: parse_json(&source)?,
        question_type: QuestionType::from_str(&question_type).unwrap_or_default(),
        questions: parse_json(&questions)?,
        time_limit_secs: row.get(6)?,
        created_at: parse_ts(&created_at)?,
    })
}

fn row_to_result(row: &Row) -> Result<QuizResult> {
    let answers: String = row.get(6)?;
    let completed_at: String = row.get(9)?;
    Ok(QuizResult {
        id: row.get(0)?,
        quiz_id: row.get(1)?,
        user_id: row.get(2)?,
        score: row.get(3)?,
        correct_count: row.get(4)?,
        total_questions: row.get(5)?,
        answers: parse_json::<Vec<GradedAnswer>>(&answers)?,
        duration_secs: row.get(7)?,
        xp_earned: row.get(8)?,
        completed_at: parse_ts(&completed_at)?,
    })
}

const QUIZ_COLUMNS: &str =
    "id, owner_id, title, source, question_type, questions, time_limit_secs, created_at";
const RESULT_COLUMNS: &str = "id, quiz_id, user_id, score, correct_count, total_questions, answers, \
     duration_secs, xp_earned, completed_at";

#[allow(clippy::too_many_arguments)]
pub fn create_quiz(
    conn: &Connection,
    owner_id: i64,
    title: &str,
    source: &QuizSource,
    question_type: QuestionType,
    questions: &[Question],
    time_limit_secs: Option<i64>,
    now: DateTime<Utc>,
) -> Result<Quiz> {
    conn.execute(
        "INSERT INTO quizzes (owner_id, title, source, question_type, questions, time_limit_secs, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            owner_id,
            title,
            to_json(source)?,
            question_type.as_str(),
            to_json(&questions)?,
            time_limit_secs,
            ts(now),
        ],
    )?;
    let id = conn.last_insert_rowid();
    get_quiz(conn, id)?.ok_or(rusqlite::Error::QueryReturnedNoRows)
}

pub fn get_quiz(conn: &Connection, quiz_id: i64) -> Result<Option<Quiz>> {
    conn.query_row(
        &format!("SELECT {QUIZ_COLUMNS} FROM quizzes WHERE id = ?1"),
        params![quiz_id],
        row_to_quiz,
    )
    .optional()
}

/// Tests created by a user, newest first
pub fn list_quizzes(conn: &Connection, owner_id: i64) -> Result<Vec<Quiz>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {QUIZ_COLUMNS} FROM quizzes WHERE owner_id = ?1 ORDER BY created_at DESC, id DESC"
    ))?;
    let quizzes = stmt
        .query_map(params![owner_id], row_to_quiz)?
        .collect::<Result<Vec<_>>>()?;
    Ok(quizzes)
}

/// A graded submission before it is stored
#[derive(Debug, Clone)]
pub struct NewResult<'a> {
    pub quiz_id: i64,
    pub user_id: i64,
    pub score: i64,
    pub correct_count: i64,
    pub total_questions: i64,
    pub answers: &'a [GradedAnswer],
    pub duration_secs: Option<i64>,
    pub xp_earned: i64,
    pub completed_at: DateTime<Utc>,
}

pub fn insert_result(conn: &Connection, result: &NewResult) -> Result<QuizResult> {
    conn.execute(
        "INSERT INTO quiz_results (quiz_id, user_id, score, correct_count, total_questions, answers,
                                   duration_secs, xp_earned, completed_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            result.quiz_id,
            result.user_id,
            result.score,
            result.correct_count,
            result.total_questions,
            to_json(&result.answers)?,
            result.duration_secs,
            result.xp_earned,
            ts(result.completed_at),
        ],
    )?;
    let id = conn.last_insert_rowid();
    get_result(conn, id)?.ok_or(rusqlite::Error::QueryReturnedNoRows)
}

pub fn get_result(conn: &Connection, result_id: i64) -> Result<Option<QuizResult>> {
    conn.query_row(
        &format!("SELECT {RESULT_COLUMNS} FROM quiz_results WHERE id = ?1"),
        params![result_id],
        row_to_result,
    )
    .optional()
}

/// A user's results, newest first
pub fn list_results(conn: &Connection, user_id: i64, limit: i64) -> Result<Vec<QuizResult>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {RESULT_COLUMNS} FROM quiz_results WHERE user_id = ?1
         ORDER BY completed_at DESC, id DESC LIMIT ?2"
    ))?;
    let results = stmt
        .query_map(params![user_id, limit], row_to_result)?
        .collect::<Result<Vec<_>>>()?;
    Ok(results)
}

/// `(completed, perfect)` test counts for badge evaluation
pub fn result_counts(conn: &Connection, user_id: i64) -> Result<(i64, i64)> {
    conn.query_row(
        "SELECT COUNT(*),
                COALESCE(SUM(CASE WHEN total_questions > 0 AND correct_count = total_questions THEN 1 ELSE 0 END), 0)
         FROM quiz_results WHERE user_id = ?1",
        params![user_id],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )
}

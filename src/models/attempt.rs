// src/models/attempt.rs

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, types::Json};

use crate::config::PASSING_SCORE;
use crate::models::violation::ViolationEvent;

/// Selected option per question, keyed by the question's position in the
/// shuffled attempt order. Entries are overwritten, never removed.
pub type AttemptAnswers = BTreeMap<usize, usize>;

/// What ended the attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubmitReason {
    /// The student pressed submit.
    Manual,
    /// The countdown reached zero.
    Timeout,
    /// The violation threshold was reached.
    Lockout,
}

impl SubmitReason {
    pub fn is_forced(self) -> bool {
        matches!(self, SubmitReason::Lockout)
    }
}

/// The durable, append-only outcome of one attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamAttemptRecord {
    /// Client-generated id; makes a retried insert idempotent.
    pub attempt_id: String,
    pub exam_id: String,
    pub exam_title: String,
    pub student_id: String,
    pub student_name: String,
    pub student_class: String,
    /// 0-100.
    pub score: u8,
    pub violations: u32,
    pub violation_log: Vec<ViolationEvent>,
    pub is_forced: bool,
    pub reason: SubmitReason,
    pub submitted_at: chrono::DateTime<chrono::Utc>,
}

/// Represents a row of the 'exam_attempts' table.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptRow {
    pub attempt_id: String,
    pub exam_id: String,
    pub exam_title: String,
    pub student_id: String,
    pub student_name: String,
    pub student_class: String,
    pub score: i64,
    pub violations: i64,
    pub violation_log: Json<Vec<ViolationEvent>>,
    pub is_forced: bool,
    pub reason: SubmitReason,
    pub submitted_at: chrono::DateTime<chrono::Utc>,
}

/// Grade line shown to students and teachers.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeEntry {
    #[serde(flatten)]
    pub attempt: AttemptRow,
    pub passed: bool,
}

impl From<AttemptRow> for GradeEntry {
    fn from(attempt: AttemptRow) -> Self {
        let passed = attempt.score >= PASSING_SCORE;
        Self { attempt, passed }
    }
}

/// Aggregated grade view of a student.
#[derive(Debug, Serialize)]
pub struct GradeReport {
    /// Mean score rounded to one decimal, 0 when there are no attempts.
    pub average: f64,
    pub attempts: Vec<GradeEntry>,
}

impl GradeReport {
    pub fn new(rows: Vec<AttemptRow>) -> Self {
        let average = if rows.is_empty() {
            0.0
        } else {
            let total: i64 = rows.iter().map(|r| r.score).sum();
            let mean = total as f64 / rows.len() as f64;
            (mean * 10.0).round() / 10.0
        };

        Self {
            average,
            attempts: rows.into_iter().map(GradeEntry::from).collect(),
        }
    }
}

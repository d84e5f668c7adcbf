// src/models/violation.rs

use std::fmt;

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, types::Json};

/// One detected integrity breach.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViolationEvent {
    /// Local wall-clock time of detection, e.g. "14:03:27".
    pub timestamp: String,
    pub message: String,
}

impl ViolationEvent {
    pub fn now(message: impl Into<String>) -> Self {
        Self {
            timestamp: chrono::Local::now().format("%H:%M:%S").to_string(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ViolationEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.timestamp, self.message)
    }
}

/// Running violation state of one attempt.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViolationState {
    pub count: u32,
    pub log: Vec<ViolationEvent>,
    pub is_critical: bool,
}

/// Payload merged into the live alert record keyed by `(exam_id, student_id)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertUpdate {
    pub exam_id: String,
    pub student_id: String,
    pub student_name: String,
    pub exam_title: String,
    pub violation_count: u32,
    pub last_violation: String,
    pub violation_log: Vec<ViolationEvent>,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub is_critical: bool,
}

/// Represents the 'exam_alerts' table: the teacher-visible live mirror
/// of a student's violation state.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertRecord {
    pub exam_id: String,
    pub student_id: String,
    pub student_name: String,
    pub exam_title: String,
    pub violation_count: i64,
    pub last_violation: Option<String>,
    pub violation_log: Json<Vec<ViolationEvent>>,
    pub is_critical: bool,
    pub first_seen_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

// src/store/mod.rs

//! Document store seam used by proctored sessions.

pub mod sql;

use async_trait::async_trait;

use crate::{
    error::StoreError,
    models::{attempt::ExamAttemptRecord, exam::ExamPaper, violation::AlertUpdate},
};

pub use sql::SqlStore;

/// Remote persistence consumed and produced by a session.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Reads an exam paper. `Ok(None)` when no such exam exists.
    async fn fetch_exam(&self, exam_id: &str) -> Result<Option<ExamPaper>, StoreError>;

    /// Merges the update into the alert record keyed by `(exam_id, student_id)`.
    /// Fields the update does not carry are preserved.
    async fn upsert_alert(&self, alert: &AlertUpdate) -> Result<(), StoreError>;

    /// Inserts the attempt record. Inserting the same `attempt_id` twice
    /// leaves exactly one record.
    async fn insert_attempt(&self, record: &ExamAttemptRecord) -> Result<(), StoreError>;
}

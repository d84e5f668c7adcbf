// src/store/sql.rs

use async_trait::async_trait;
use sqlx::{SqlitePool, types::Json};

use crate::{
    error::StoreError,
    models::{
        attempt::{AttemptRow, ExamAttemptRecord},
        exam::{ExamPaper, ExamRow},
        violation::{AlertRecord, AlertUpdate},
    },
    store::DocumentStore,
};

/// `DocumentStore` backed by the SQLite schema in `migrations/`.
#[derive(Debug, Clone)]
pub struct SqlStore {
    pool: SqlitePool,
}

impl SqlStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Live alerts of an exam, critical first, most recently updated first.
    pub async fn list_alerts(&self, exam_id: &str) -> Result<Vec<AlertRecord>, StoreError> {
        let alerts = sqlx::query_as::<_, AlertRecord>(
            r#"
            SELECT exam_id, student_id, student_name, exam_title, violation_count,
                   last_violation, violation_log, is_critical, first_seen_at, updated_at
            FROM exam_alerts
            WHERE exam_id = ?
            ORDER BY is_critical DESC, updated_at DESC
            "#,
        )
        .bind(exam_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(alerts)
    }

    /// Attempt records, optionally narrowed to one exam and/or one student.
    pub async fn list_attempts(
        &self,
        exam_id: Option<&str>,
        student_id: Option<&str>,
    ) -> Result<Vec<AttemptRow>, StoreError> {
        let rows = sqlx::query_as::<_, AttemptRow>(
            r#"
            SELECT attempt_id, exam_id, exam_title, student_id, student_name, student_class,
                   score, violations, violation_log, is_forced, reason, submitted_at
            FROM exam_attempts
            WHERE (?1 IS NULL OR exam_id = ?1)
              AND (?2 IS NULL OR student_id = ?2)
            ORDER BY submitted_at DESC, id DESC
            "#,
        )
        .bind(exam_id)
        .bind(student_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}

#[async_trait]
impl DocumentStore for SqlStore {
    async fn fetch_exam(&self, exam_id: &str) -> Result<Option<ExamPaper>, StoreError> {
        let row = sqlx::query_as::<_, ExamRow>(
            r#"
            SELECT id, title, duration_minutes, questions, teacher_id, status, created_at
            FROM exams
            WHERE id = ?
            "#,
        )
        .bind(exam_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to fetch exam {}: {:?}", exam_id, e);
            StoreError::from(e)
        })?;

        Ok(row.map(ExamRow::into_paper))
    }

    async fn upsert_alert(&self, alert: &AlertUpdate) -> Result<(), StoreError> {
        // first_seen_at is only written by the insert branch.
        sqlx::query(
            r#"
            INSERT INTO exam_alerts (
                exam_id, student_id, student_name, exam_title, violation_count,
                last_violation, violation_log, is_critical, first_seen_at, updated_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)
            ON CONFLICT(exam_id, student_id) DO UPDATE SET
                student_name = excluded.student_name,
                exam_title = excluded.exam_title,
                violation_count = MAX(exam_alerts.violation_count, excluded.violation_count),
                last_violation = excluded.last_violation,
                violation_log = excluded.violation_log,
                is_critical = (exam_alerts.is_critical OR excluded.is_critical),
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&alert.exam_id)
        .bind(&alert.student_id)
        .bind(&alert.student_name)
        .bind(&alert.exam_title)
        .bind(i64::from(alert.violation_count))
        .bind(&alert.last_violation)
        .bind(Json(&alert.violation_log))
        .bind(alert.is_critical)
        .bind(alert.timestamp)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn insert_attempt(&self, record: &ExamAttemptRecord) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO exam_attempts (
                attempt_id, exam_id, exam_title, student_id, student_name, student_class,
                score, violations, violation_log, is_forced, reason, submitted_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(attempt_id) DO NOTHING
            "#,
        )
        .bind(&record.attempt_id)
        .bind(&record.exam_id)
        .bind(&record.exam_title)
        .bind(&record.student_id)
        .bind(&record.student_name)
        .bind(&record.student_class)
        .bind(i64::from(record.score))
        .bind(i64::from(record.violations))
        .bind(Json(&record.violation_log))
        .bind(record.is_forced)
        .bind(record.reason)
        .bind(record.submitted_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            tracing::info!(
                "Attempt {} was already recorded, insert skipped",
                record.attempt_id
            );
        }

        Ok(())
    }
}

// src/handlers/exams.rs

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use sqlx::{SqlitePool, types::Json as SqlJson};
use uuid::Uuid;
use validator::Validate;

use crate::{
    error::AppError,
    models::exam::{CreateExamRequest, ExamSummary, PublicPaper, Question},
    store::{DocumentStore, SqlStore},
    utils::html::clean_non_empty,
};

/// Sanitizes every teacher-authored string of the paper.
/// Fails if a field is left with no visible content.
fn sanitize_questions(payload: &CreateExamRequest) -> Result<Vec<Question>, AppError> {
    payload
        .questions
        .iter()
        .enumerate()
        .map(|(idx, q)| -> Result<Question, AppError> {
            let text = clean_non_empty(&q.text).ok_or_else(|| {
                AppError::BadRequest(format!("Question #{} has no text", idx + 1))
            })?;
            let options = q
                .options
                .iter()
                .map(|opt| {
                    clean_non_empty(opt).ok_or_else(|| {
                        AppError::BadRequest(format!("Question #{} has an empty option", idx + 1))
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;

            Ok(Question {
                text,
                options,
                correct_option_index: q.correct_option_index,
            })
        })
        .collect()
}

/// Publishes a new exam.
pub async fn create_exam(
    State(pool): State<SqlitePool>,
    Json(payload): Json<CreateExamRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }
    payload.check_answer_keys().map_err(AppError::BadRequest)?;

    let title = clean_non_empty(&payload.title)
        .ok_or_else(|| AppError::BadRequest("Title has no visible content".to_string()))?;
    let questions = sanitize_questions(&payload)?;
    let id = Uuid::new_v4().to_string();

    sqlx::query(
        r#"
        INSERT INTO exams (id, title, duration_minutes, questions, teacher_id, status, created_at)
        VALUES (?, ?, ?, ?, ?, 'ACTIVE', ?)
        "#,
    )
    .bind(&id)
    .bind(&title)
    .bind(i64::from(payload.duration))
    .bind(SqlJson(&questions))
    .bind(&payload.teacher_id)
    .bind(Utc::now())
    .execute(&pool)
    .await
    .map_err(|e| {
        if e.to_string().contains("UNIQUE constraint failed") {
            return AppError::Conflict(format!("Exam '{}' already exists", id));
        }
        tracing::error!("Failed to create exam: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    tracing::info!(
        "Exam {} published ({} questions, {} min)",
        id,
        questions.len(),
        payload.duration
    );

    Ok((StatusCode::CREATED, Json(serde_json::json!({ "id": id }))))
}

/// Lists all exams, newest first.
pub async fn list_exams(State(pool): State<SqlitePool>) -> Result<impl IntoResponse, AppError> {
    let exams = sqlx::query_as::<_, ExamSummary>(
        r#"
        SELECT id, title, duration_minutes, json_array_length(questions) AS question_count,
               status, teacher_id, created_at
        FROM exams
        ORDER BY created_at DESC
        "#,
    )
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to list exams: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(Json(exams))
}

/// Returns a paper without its answer key.
pub async fn get_exam(
    State(store): State<SqlStore>,
    Path(exam_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let paper = store
        .fetch_exam(&exam_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Exam '{}' not found", exam_id)))?;

    Ok(Json(PublicPaper::from(paper)))
}

// src/handlers/grades.rs

use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};

use crate::{
    error::AppError,
    models::attempt::{GradeEntry, GradeReport},
    store::SqlStore,
};

/// All attempts of one exam, newest first.
pub async fn list_exam_attempts(
    State(store): State<SqlStore>,
    Path(exam_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let rows = store.list_attempts(Some(&exam_id), None).await?;
    let entries: Vec<GradeEntry> = rows.into_iter().map(GradeEntry::from).collect();

    Ok(Json(entries))
}

/// A student's grade sheet: every attempt plus the average score.
pub async fn student_grades(
    State(store): State<SqlStore>,
    Path(student_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let rows = store.list_attempts(None, Some(&student_id)).await?;

    Ok(Json(GradeReport::new(rows)))
}

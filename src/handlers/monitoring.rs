// src/handlers/monitoring.rs

use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};

use crate::{error::AppError, store::SqlStore};

/// Live integrity alerts of an exam for the teacher's monitor view.
/// Critical (locked) students come first.
pub async fn list_alerts(
    State(store): State<SqlStore>,
    Path(exam_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let alerts = store.list_alerts(&exam_id).await.map_err(|e| {
        tracing::error!("Failed to list alerts of exam {}: {}", exam_id, e);
        AppError::from(e)
    })?;

    Ok(Json(alerts))
}

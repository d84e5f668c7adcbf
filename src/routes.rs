// src/routes.rs

use axum::{
    Router,
    http::{HeaderValue, Method},
    routing::get,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{exams, grades, monitoring},
    state::AppState,
};

/// Assembles the main application router.
///
/// * Merges all sub-routers (exams, students).
/// * Applies global middleware (Trace, CORS).
/// * Injects global state (the database pool).
pub fn create_router(state: AppState) -> Router {
    let origins = [
        HeaderValue::from_static("http://localhost:3000"),
        HeaderValue::from_static("http://127.0.0.1:3000"),
    ];

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([axum::http::header::CONTENT_TYPE]);

    let exam_routes = Router::new()
        .route("/", get(exams::list_exams).post(exams::create_exam))
        .route("/{exam_id}", get(exams::get_exam))
        // Teacher monitor and result views
        .route("/{exam_id}/alerts", get(monitoring::list_alerts))
        .route("/{exam_id}/attempts", get(grades::list_exam_attempts));

    let student_routes =
        Router::new().route("/{student_id}/grades", get(grades::student_grades));

    Router::new()
        .nest("/api/exams", exam_routes)
        .nest("/api/students", student_routes)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

// tests/store_tests.rs

mod common;

use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use common::{EXAM_ID, FakeCamera, harness_with, memory_pool, physics_paper, seed_exam};
use exam_proctor::{
    config::SessionSettings,
    error::StoreError,
    models::{
        attempt::{ExamAttemptRecord, SubmitReason},
        violation::{AlertUpdate, ViolationEvent},
    },
    session::{BrowserEvent, SessionPhase},
    store::{DocumentStore, SqlStore},
};

fn alert(student_id: &str, count: u32, critical: bool, minute: u32) -> AlertUpdate {
    let log: Vec<ViolationEvent> = (1..=count)
        .map(|i| ViolationEvent {
            timestamp: format!("09:{:02}:00", i),
            message: format!("violation {}", i),
        })
        .collect();
    AlertUpdate {
        exam_id: EXAM_ID.to_string(),
        student_id: student_id.to_string(),
        student_name: format!("Student {}", student_id),
        exam_title: "Physics Midterm".to_string(),
        violation_count: count,
        last_violation: log.last().map(|e| e.to_string()).unwrap_or_default(),
        violation_log: log,
        timestamp: Utc.with_ymd_and_hms(2025, 3, 1, 9, minute, 0).unwrap(),
        is_critical: critical,
    }
}

fn attempt(attempt_id: &str, student_id: &str, score: u8) -> ExamAttemptRecord {
    ExamAttemptRecord {
        attempt_id: attempt_id.to_string(),
        exam_id: EXAM_ID.to_string(),
        exam_title: "Physics Midterm".to_string(),
        student_id: student_id.to_string(),
        student_name: "Ayu Lestari".to_string(),
        student_class: "XII IPA 1".to_string(),
        score,
        violations: 0,
        violation_log: vec![],
        is_forced: false,
        reason: SubmitReason::Manual,
        submitted_at: Utc.with_ymd_and_hms(2025, 3, 1, 10, 0, 0).unwrap(),
    }
}

#[tokio::test]
async fn fetch_exam_round_trips_questions() {
    // Arrange
    let pool = memory_pool().await;
    let paper = physics_paper(45);
    seed_exam(&pool, &paper).await;
    let store = SqlStore::new(pool);

    // Act
    let fetched = store.fetch_exam(EXAM_ID).await.unwrap().unwrap();
    let missing = store.fetch_exam("nope").await.unwrap();

    // Assert
    assert_eq!(fetched.title, "Physics Midterm");
    assert_eq!(fetched.duration_seconds(), 45 * 60);
    assert_eq!(fetched.questions, paper.questions);
    assert!(missing.is_none());
}

#[tokio::test]
async fn corrupt_question_json_is_reported() {
    let pool = memory_pool().await;
    sqlx::query(
        "INSERT INTO exams (id, title, duration_minutes, questions, created_at) VALUES (?, 'Broken', 10, 'not json', ?)",
    )
    .bind("broken")
    .bind(Utc::now())
    .execute(&pool)
    .await
    .unwrap();

    let result = SqlStore::new(pool).fetch_exam("broken").await;

    assert!(matches!(result, Err(StoreError::Corrupt(_))));
}

#[tokio::test]
async fn alert_upsert_merges_and_keeps_first_seen() {
    // Arrange
    let store = SqlStore::new(memory_pool().await);

    // Act
    store.upsert_alert(&alert("s1", 1, false, 1)).await.unwrap();
    store.upsert_alert(&alert("s1", 2, false, 5)).await.unwrap();
    // A stale write arriving late never lowers the count.
    store.upsert_alert(&alert("s1", 1, false, 6)).await.unwrap();

    // Assert
    let alerts = store.list_alerts(EXAM_ID).await.unwrap();
    assert_eq!(alerts.len(), 1);
    let a = &alerts[0];
    assert_eq!(a.violation_count, 2);
    assert!(!a.is_critical);
    assert_eq!(a.first_seen_at, Utc.with_ymd_and_hms(2025, 3, 1, 9, 1, 0).unwrap());
    assert_eq!(a.updated_at, Utc.with_ymd_and_hms(2025, 3, 1, 9, 6, 0).unwrap());
}

#[tokio::test]
async fn critical_alerts_are_listed_first() {
    let store = SqlStore::new(memory_pool().await);
    store.upsert_alert(&alert("calm", 1, false, 9)).await.unwrap();
    store.upsert_alert(&alert("locked", 3, true, 2)).await.unwrap();
    store.upsert_alert(&alert("recent", 2, false, 20)).await.unwrap();

    let order: Vec<String> = store
        .list_alerts(EXAM_ID)
        .await
        .unwrap()
        .into_iter()
        .map(|a| a.student_id)
        .collect();

    assert_eq!(order, vec!["locked", "recent", "calm"]);
}

#[tokio::test]
async fn attempt_insert_is_idempotent_per_attempt_id() {
    // Arrange
    let store = SqlStore::new(memory_pool().await);
    let record = attempt("att-1", "s1", 80);

    // Act
    store.insert_attempt(&record).await.unwrap();
    store.insert_attempt(&record).await.unwrap();
    store.insert_attempt(&attempt("att-2", "s2", 40)).await.unwrap();

    // Assert
    let all = store.list_attempts(None, None).await.unwrap();
    assert_eq!(all.len(), 2);

    let mine = store.list_attempts(None, Some("s1")).await.unwrap();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].attempt_id, "att-1");
    assert_eq!(mine[0].score, 80);
    assert_eq!(mine[0].reason, SubmitReason::Manual);

    let exam = store.list_attempts(Some(EXAM_ID), None).await.unwrap();
    assert_eq!(exam.len(), 2);
    assert!(store.list_attempts(Some("other"), None).await.unwrap().is_empty());
}

#[tokio::test]
async fn session_runs_end_to_end_on_sqlite() {
    // Arrange: one minute of exam at one millisecond per tick.
    let pool = memory_pool().await;
    seed_exam(&pool, &physics_paper(1)).await;
    let store = Arc::new(SqlStore::new(pool));
    let settings = SessionSettings {
        tick: Duration::from_millis(1),
        ..SessionSettings::default()
    };
    let h = harness_with(store.clone(), FakeCamera::granting(), settings);

    // Act
    h.controller.start().await.unwrap();
    h.answer(4);
    h.hub.dispatch(BrowserEvent::VisibilityChange { hidden: true });

    let mut waited = 0;
    while h.controller.phase() != SessionPhase::Done && waited < 5_000 {
        tokio::time::sleep(Duration::from_millis(10)).await;
        waited += 10;
    }
    h.controller.flush_alerts().await;

    // Assert
    assert_eq!(h.controller.phase(), SessionPhase::Done);

    let attempts = store.list_attempts(Some(EXAM_ID), Some("stu-42")).await.unwrap();
    assert_eq!(attempts.len(), 1);
    assert_eq!(attempts[0].reason, SubmitReason::Timeout);
    assert_eq!(attempts[0].score, 100);
    assert_eq!(attempts[0].violations, 1);
    assert_eq!(attempts[0].violation_log.0.len(), 1);

    let alerts = store.list_alerts(EXAM_ID).await.unwrap();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].violation_count, 1);
    assert!(!alerts[0].is_critical);
    assert_eq!(alerts[0].student_name, "Ayu Lestari");
}

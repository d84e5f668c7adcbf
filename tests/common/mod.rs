// tests/common/mod.rs

//! Shared fixtures: in-memory SQLite, an in-memory document store with
//! failure switches, and fake camera/shell collaborators.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use exam_proctor::{
    config::SessionSettings,
    error::StoreError,
    models::{
        attempt::ExamAttemptRecord,
        exam::{ExamPaper, Question},
        student::StudentIdentity,
        violation::AlertUpdate,
    },
    session::{
        EventHub, Notice, PaperLoader, Route, SessionController, SessionDeps, SessionShell,
        ShellError,
        camera::{Camera, MediaStream, MediaTrack, VideoConstraints},
    },
    store::DocumentStore,
};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

pub const EXAM_ID: &str = "exam-physics";

/// A private in-memory database with the schema applied.
pub async fn memory_pool() -> SqlitePool {
    // One connection that never expires: each in-memory connection is its own database.
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to open in-memory SQLite");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to migrate database");

    pool
}

/// Inserts an exam row directly, bypassing the HTTP layer.
pub async fn seed_exam(pool: &SqlitePool, paper: &ExamPaper) {
    sqlx::query(
        r#"
        INSERT INTO exams (id, title, duration_minutes, questions, teacher_id, status, created_at)
        VALUES (?, ?, ?, ?, 'teacher-1', 'ACTIVE', ?)
        "#,
    )
    .bind(&paper.id)
    .bind(&paper.title)
    .bind(i64::from(paper.duration_minutes))
    .bind(sqlx::types::Json(&paper.questions))
    .bind(chrono::Utc::now())
    .execute(pool)
    .await
    .expect("Failed to seed exam");
}

/// Four questions whose correct options are 0, 1, 2 and 3.
pub fn physics_paper(duration_minutes: u32) -> ExamPaper {
    ExamPaper {
        id: EXAM_ID.to_string(),
        title: "Physics Midterm".to_string(),
        duration_minutes,
        questions: (0..4)
            .map(|i| Question {
                text: format!("Question {}", i + 1),
                options: vec!["A".into(), "B".into(), "C".into(), "D".into()],
                correct_option_index: i,
            })
            .collect(),
    }
}

pub fn student() -> StudentIdentity {
    StudentIdentity::new("stu-42", "Ayu Lestari").with_class("XII IPA 1")
}

// -----------------------------------------------------------------------------
// Document store
// -----------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct StoredAlert {
    pub update: AlertUpdate,
    pub first_seen_at: chrono::DateTime<chrono::Utc>,
}

/// `DocumentStore` held in memory, with switches to simulate outages.
#[derive(Default)]
pub struct MemoryStore {
    exams: Mutex<HashMap<String, ExamPaper>>,
    alerts: Mutex<HashMap<(String, String), StoredAlert>>,
    alert_writes: Mutex<Vec<AlertUpdate>>,
    attempts: Mutex<Vec<ExamAttemptRecord>>,
    insert_calls: AtomicUsize,
    fail_fetch: AtomicBool,
    fail_alerts: AtomicBool,
    fail_attempts: AtomicBool,
    lose_next_ack: AtomicBool,
}

impl MemoryStore {
    pub fn with_exam(paper: ExamPaper) -> Arc<Self> {
        let store = Self::default();
        store.exams.lock().unwrap().insert(paper.id.clone(), paper);
        Arc::new(store)
    }

    pub fn fail_fetch(&self, on: bool) {
        self.fail_fetch.store(on, Ordering::SeqCst);
    }

    pub fn fail_alerts(&self, on: bool) {
        self.fail_alerts.store(on, Ordering::SeqCst);
    }

    pub fn fail_attempts(&self, on: bool) {
        self.fail_attempts.store(on, Ordering::SeqCst);
    }

    /// The next insert is written but reported as failed.
    pub fn lose_next_ack(&self) {
        self.lose_next_ack.store(true, Ordering::SeqCst);
    }

    pub fn attempts(&self) -> Vec<ExamAttemptRecord> {
        self.attempts.lock().unwrap().clone()
    }

    pub fn insert_calls(&self) -> usize {
        self.insert_calls.load(Ordering::SeqCst)
    }

    pub fn alert(&self, exam_id: &str, student_id: &str) -> Option<StoredAlert> {
        self.alerts
            .lock()
            .unwrap()
            .get(&(exam_id.to_string(), student_id.to_string()))
            .cloned()
    }

    pub fn alert_writes(&self) -> Vec<AlertUpdate> {
        self.alert_writes.lock().unwrap().clone()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn fetch_exam(&self, exam_id: &str) -> Result<Option<ExamPaper>, StoreError> {
        if self.fail_fetch.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("network unreachable".to_string()));
        }
        Ok(self.exams.lock().unwrap().get(exam_id).cloned())
    }

    async fn upsert_alert(&self, alert: &AlertUpdate) -> Result<(), StoreError> {
        if self.fail_alerts.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("alert write rejected".to_string()));
        }
        self.alert_writes.lock().unwrap().push(alert.clone());
        let key = (alert.exam_id.clone(), alert.student_id.clone());
        let mut alerts = self.alerts.lock().unwrap();
        let first_seen_at = alerts
            .get(&key)
            .map(|a| a.first_seen_at)
            .unwrap_or(alert.timestamp);
        alerts.insert(
            key,
            StoredAlert {
                update: alert.clone(),
                first_seen_at,
            },
        );
        Ok(())
    }

    async fn insert_attempt(&self, record: &ExamAttemptRecord) -> Result<(), StoreError> {
        self.insert_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_attempts.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("write timed out".to_string()));
        }
        {
            let mut attempts = self.attempts.lock().unwrap();
            if !attempts.iter().any(|a| a.attempt_id == record.attempt_id) {
                attempts.push(record.clone());
            }
        }
        if self.lose_next_ack.swap(false, Ordering::SeqCst) {
            return Err(StoreError::Unavailable("connection reset".to_string()));
        }
        Ok(())
    }
}

// -----------------------------------------------------------------------------
// Camera and shell
// -----------------------------------------------------------------------------

/// Grants (or refuses) a one-track stream and remembers every stream issued.
pub struct FakeCamera {
    grant: bool,
    issued: Mutex<Vec<MediaStream>>,
}

impl FakeCamera {
    pub fn granting() -> Arc<Self> {
        Arc::new(Self {
            grant: true,
            issued: Mutex::new(Vec::new()),
        })
    }

    pub fn denying() -> Arc<Self> {
        Arc::new(Self {
            grant: false,
            issued: Mutex::new(Vec::new()),
        })
    }

    pub fn issued(&self) -> usize {
        self.issued.lock().unwrap().len()
    }

    /// Live tracks across every stream ever handed out.
    pub fn live_tracks(&self) -> usize {
        self.issued
            .lock()
            .unwrap()
            .iter()
            .map(|s| s.active_tracks())
            .sum()
    }
}

#[async_trait]
impl Camera for FakeCamera {
    async fn acquire(&self, constraints: &VideoConstraints) -> Option<MediaStream> {
        assert!(!constraints.audio, "proctoring never asks for audio");
        if !self.grant {
            return None;
        }
        let stream = MediaStream::new("cam-0", vec![MediaTrack::video("Integrated Webcam")]);
        self.issued.lock().unwrap().push(stream.clone());
        Some(stream)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCall {
    EnterFullscreen,
    ExitFullscreen,
    Navigate(Route),
    Notify(Notice),
}

#[derive(Default)]
pub struct RecordingShell {
    refuse_fullscreen: AtomicBool,
    calls: Mutex<Vec<ShellCall>>,
}

impl RecordingShell {
    pub fn refuse_fullscreen(&self, on: bool) {
        self.refuse_fullscreen.store(on, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<ShellCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                ShellCall::Notify(n) => Some(n),
                _ => None,
            })
            .collect()
    }

    pub fn routes(&self) -> Vec<Route> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                ShellCall::Navigate(r) => Some(r),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, call: &ShellCall) -> usize {
        self.calls().iter().filter(|c| *c == call).count()
    }
}

impl SessionShell for RecordingShell {
    fn enter_fullscreen(&self) -> Result<(), ShellError> {
        self.calls.lock().unwrap().push(ShellCall::EnterFullscreen);
        if self.refuse_fullscreen.load(Ordering::SeqCst) {
            return Err(ShellError("fullscreen request denied".to_string()));
        }
        Ok(())
    }

    fn exit_fullscreen(&self) {
        self.calls.lock().unwrap().push(ShellCall::ExitFullscreen);
    }

    fn navigate(&self, route: Route) {
        self.calls.lock().unwrap().push(ShellCall::Navigate(route));
    }

    fn notify(&self, notice: Notice) {
        self.calls.lock().unwrap().push(ShellCall::Notify(notice));
    }
}

// -----------------------------------------------------------------------------
// Session harness
// -----------------------------------------------------------------------------

pub struct Harness {
    pub controller: SessionController,
    pub hub: Arc<EventHub>,
    pub store: Arc<dyn DocumentStore>,
    pub camera: Arc<FakeCamera>,
    pub shell: Arc<RecordingShell>,
}

pub fn harness_with(
    store: Arc<dyn DocumentStore>,
    camera: Arc<FakeCamera>,
    settings: SessionSettings,
) -> Harness {
    let hub = Arc::new(EventHub::default());
    let shell = Arc::new(RecordingShell::default());
    let deps = SessionDeps {
        store: store.clone(),
        camera: camera.clone(),
        shell: shell.clone(),
        host: hub.clone(),
    };
    let loader = PaperLoader::with_seed(store.clone(), 2024);
    let controller =
        SessionController::with_loader(EXAM_ID, student(), deps, settings, loader);

    Harness {
        controller,
        hub,
        store,
        camera,
        shell,
    }
}

/// Default settings, a granting camera and the given in-memory store.
pub fn harness(store: Arc<MemoryStore>) -> Harness {
    harness_with(store, FakeCamera::granting(), SessionSettings::default())
}

impl Harness {
    /// Answers every question of the attempt-ordered paper; `correct` of them right.
    pub fn answer(&self, correct: usize) {
        let paper = self.controller.paper().expect("paper not loaded");
        for (idx, q) in paper.questions.iter().enumerate() {
            let option = if idx < correct {
                q.correct_option_index
            } else {
                (q.correct_option_index + 1) % q.options.len()
            };
            self.controller
                .select_answer(idx, option)
                .expect("answer rejected");
        }
    }
}

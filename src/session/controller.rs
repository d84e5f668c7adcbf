// src/session/controller.rs

//! Session lifecycle controller.
//!
//! Owns the one lock guarding all session state. Detector callbacks and the
//! countdown hold only a `Weak` reference and re-check the phase under the
//! lock before acting, so nothing fires into a finished or abandoned session.
//! Shell calls and detector teardown happen with the lock released. Detector
//! registration at start is the one host call made under the lock, which is
//! why [`HostWindow`] implementations must not hold their own locks while
//! running listeners.

use std::sync::{Arc, Mutex, MutexGuard};

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::{
    config::SessionSettings,
    error::SessionError,
    models::{
        attempt::{AttemptAnswers, ExamAttemptRecord, SubmitReason},
        student::StudentIdentity,
        violation::ViolationState,
    },
    session::{
        SessionPhase,
        camera::{Camera, CameraLease, VideoConstraints},
        clock::CountdownClock,
        host::HostWindow,
        ledger::{AlertContext, AlertSync, ViolationLedger},
        loader::{AttemptPaper, PaperLoader},
        monitor::{DetectorContext, DisposeHandle, IntegrityMonitor, ViolationSink},
        scoring::score_attempt,
        shell::{Notice, Route, SessionShell},
    },
    store::DocumentStore,
};

/// External collaborators of a session.
#[derive(Clone)]
pub struct SessionDeps {
    pub store: Arc<dyn DocumentStore>,
    pub camera: Arc<dyn Camera>,
    pub shell: Arc<dyn SessionShell>,
    pub host: Arc<dyn HostWindow>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// This call wrote the attempt record.
    Submitted(ExamAttemptRecord),
    /// Another trigger already owns the submission; this one was dropped.
    Collapsed,
}

struct SessionState {
    phase: SessionPhase,
    history: Vec<SessionPhase>,
    /// Set once the view is left. A detached session takes no more input.
    detached: bool,
    starting: bool,
    runtime: Option<Handle>,
    paper: Option<Arc<AttemptPaper>>,
    answers: AttemptAnswers,
    ledger: Option<ViolationLedger>,
    camera: CameraLease,
    clock: Option<CountdownClock>,
    monitor: IntegrityMonitor,
    alert_drain: Option<JoinHandle<()>>,
    in_flight: bool,
    /// Built once per attempt and reused verbatim by retries.
    pending: Option<ExamAttemptRecord>,
    record: Option<ExamAttemptRecord>,
}

impl SessionState {
    fn new(settings: &SessionSettings) -> Self {
        Self {
            phase: SessionPhase::NotStarted,
            history: vec![SessionPhase::NotStarted],
            detached: false,
            starting: false,
            runtime: None,
            paper: None,
            answers: AttemptAnswers::new(),
            ledger: None,
            camera: CameraLease::default(),
            clock: None,
            monitor: IntegrityMonitor::standard(settings),
            alert_drain: None,
            in_flight: false,
            pending: None,
            record: None,
        }
    }

    fn advance(&mut self, next: SessionPhase) {
        if !self.phase.can_advance_to(next) {
            tracing::error!("Refusing phase change {:?} -> {:?}", self.phase, next);
            return;
        }
        tracing::info!("Session phase {:?} -> {:?}", self.phase, next);
        self.phase = next;
        self.history.push(next);
    }

    fn ensure_attached(&self) -> Result<(), SessionError> {
        if self.detached {
            return Err(SessionError::Closed);
        }
        Ok(())
    }

    /// Stops countdown and camera, closes the alert queue and disarms the
    /// detectors. The returned handles still have to be disposed, after the
    /// session lock is released. Safe to call repeatedly.
    #[must_use]
    fn release_resources(&mut self) -> Vec<DisposeHandle> {
        let retired = self.monitor.take_handles();
        if let Some(clock) = self.clock.as_mut() {
            clock.stop();
        }
        self.camera.release();
        if let Some(ledger) = self.ledger.as_mut() {
            if let Some(worker) = ledger.close_sync() {
                self.alert_drain = Some(worker);
            }
        }
        retired
    }
}

/// A submission claimed under the lock, finished outside it.
struct Claim {
    record: ExamAttemptRecord,
    retired: Vec<DisposeHandle>,
}

fn dispose_all(handles: Vec<DisposeHandle>) {
    for mut handle in handles {
        handle.dispose();
    }
}

struct Inner {
    exam_id: String,
    student: StudentIdentity,
    settings: SessionSettings,
    loader: PaperLoader,
    deps: SessionDeps,
    state: Mutex<SessionState>,
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn is_running(&self) -> bool {
        let st = self.lock();
        st.phase == SessionPhase::Running && !st.detached
    }

    fn on_violation(self: &Arc<Self>, message: String) {
        let locked = {
            let mut st = self.lock();
            if st.detached || st.phase != SessionPhase::Running {
                tracing::debug!("Violation outside a running session ignored: {}", message);
                return;
            }
            let Some(ledger) = st.ledger.as_mut() else {
                return;
            };
            let state = ledger.record(message);
            if state.is_critical {
                st.advance(SessionPhase::Locked);
                let claim = self.begin_submission(&mut st, SubmitReason::Lockout);
                Some((state.count, claim, st.runtime.clone()))
            } else {
                None
            }
        };

        match locked {
            None => {
                // Best effort: a refusal here is not itself a violation.
                if let Err(e) = self.deps.shell.enter_fullscreen() {
                    tracing::warn!("Could not re-enter fullscreen: {}", e);
                }
            }
            Some((violations, claim, runtime)) => {
                tracing::warn!(
                    "Session locked for student {} in exam {} after {} violations",
                    self.student.id,
                    self.exam_id,
                    violations
                );
                let record = claim.map(|claim| {
                    dispose_all(claim.retired);
                    claim.record
                });
                self.deps.shell.notify(Notice::SessionLocked { violations });
                if let Some(record) = record {
                    self.spawn_persist(runtime, record);
                }
            }
        }
    }

    fn on_time_expired(self: &Arc<Self>) {
        let (claim, runtime) = {
            let mut st = self.lock();
            if st.detached || st.phase != SessionPhase::Running {
                return;
            }
            let claim = self.begin_submission(&mut st, SubmitReason::Timeout);
            (claim, st.runtime.clone())
        };
        if let Some(claim) = claim {
            dispose_all(claim.retired);
            tracing::info!("Time is up for student {} in exam {}", self.student.id, self.exam_id);
            self.spawn_persist(runtime, claim.record);
        }
    }

    /// Claims the submission, tears down live resources, scores the paper and
    /// moves to SUBMITTING. Returns `None` if a submission already exists.
    fn begin_submission(
        &self,
        st: &mut SessionState,
        reason: SubmitReason,
    ) -> Option<Claim> {
        if st.in_flight || st.pending.is_some() || st.record.is_some() {
            tracing::debug!("Submission already claimed, {:?} trigger collapsed", reason);
            return None;
        }
        let Some(paper) = st.paper.clone() else {
            tracing::error!("Submission requested without a loaded paper");
            return None;
        };

        st.in_flight = true;
        let retired = st.release_resources();

        let score = score_attempt(&paper.questions, &st.answers);
        let violations = st
            .ledger
            .as_ref()
            .map(|l| l.state().clone())
            .unwrap_or_default();

        let record = ExamAttemptRecord {
            attempt_id: Uuid::new_v4().to_string(),
            exam_id: paper.exam_id.clone(),
            exam_title: paper.title.clone(),
            student_id: self.student.id.clone(),
            student_name: self.student.name.clone(),
            student_class: self.student.class_or_default().to_string(),
            score: score.percent,
            violations: violations.count,
            violation_log: violations.log,
            is_forced: reason.is_forced(),
            reason,
            submitted_at: chrono::Utc::now(),
        };

        tracing::info!(
            "Attempt {} scored {}% ({}/{}) for student {}, reason {:?}",
            record.attempt_id,
            record.score,
            score.correct,
            score.total,
            record.student_id,
            reason
        );

        st.pending = Some(record.clone());
        st.advance(SessionPhase::Submitting);
        Some(Claim { record, retired })
    }

    fn spawn_persist(self: &Arc<Self>, runtime: Option<Handle>, record: ExamAttemptRecord) {
        let inner = self.clone();
        let task = async move {
            // Failures are logged and surfaced to the shell by `persist`.
            let _ = inner.persist(record).await;
        };
        match runtime {
            Some(rt) => {
                rt.spawn(task);
            }
            None => tracing::error!("No runtime available to persist the attempt"),
        }
    }

    async fn persist(&self, record: ExamAttemptRecord) -> Result<SubmitOutcome, SessionError> {
        match self.deps.store.insert_attempt(&record).await {
            Ok(()) => {
                let detached = {
                    let mut st = self.lock();
                    st.in_flight = false;
                    st.pending = None;
                    st.record = Some(record.clone());
                    st.advance(SessionPhase::Done);
                    st.detached
                };
                tracing::info!("Attempt {} saved", record.attempt_id);

                if !detached {
                    self.deps.shell.exit_fullscreen();
                    self.deps.shell.navigate(route_after(record.reason));
                }
                Ok(SubmitOutcome::Submitted(record))
            }
            Err(e) => {
                self.lock().in_flight = false;
                tracing::error!("Failed to save attempt {}: {}", record.attempt_id, e);
                self.deps.shell.notify(Notice::SubmissionFailed {
                    reason: e.to_string(),
                });
                Err(SessionError::Submission(e))
            }
        }
    }

    fn detach(&self) {
        let retired = {
            let mut st = self.lock();
            if st.detached {
                return;
            }
            st.detached = true;
            tracing::info!(
                "Session view for exam {} left in phase {:?}",
                self.exam_id,
                st.phase
            );
            st.release_resources()
        };
        dispose_all(retired);
    }
}

fn route_after(reason: SubmitReason) -> Route {
    match reason {
        SubmitReason::Lockout => Route::Dashboard,
        SubmitReason::Manual | SubmitReason::Timeout => Route::Grades,
    }
}

/// One student's proctored attempt at one exam.
///
/// Dropping the controller is the same as leaving the session view: every
/// listener, timer and camera track is released.
pub struct SessionController {
    inner: Arc<Inner>,
}

impl SessionController {
    pub fn new(
        exam_id: impl Into<String>,
        student: StudentIdentity,
        deps: SessionDeps,
        settings: SessionSettings,
    ) -> Self {
        let loader = PaperLoader::new(deps.store.clone());
        Self::with_loader(exam_id, student, deps, settings, loader)
    }

    pub fn with_loader(
        exam_id: impl Into<String>,
        student: StudentIdentity,
        deps: SessionDeps,
        settings: SessionSettings,
        loader: PaperLoader,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                exam_id: exam_id.into(),
                student,
                settings,
                loader,
                state: Mutex::new(SessionState::new(&settings)),
                deps,
            }),
        }
    }

    /// Fetches and shuffles the paper. The first successful load is kept for
    /// the whole attempt; later calls return it unchanged.
    pub async fn load(&self) -> Result<Arc<AttemptPaper>, SessionError> {
        {
            let st = self.inner.lock();
            st.ensure_attached()?;
            if let Some(paper) = &st.paper {
                return Ok(paper.clone());
            }
        }

        let loaded = match self.inner.loader.load(&self.inner.exam_id).await {
            Ok(paper) => paper,
            Err(e) => {
                tracing::error!("Failed to load exam {}: {}", self.inner.exam_id, e);
                self.inner.deps.shell.notify(Notice::ExamUnavailable {
                    reason: e.to_string(),
                });
                return Err(e.into());
            }
        };

        let mut st = self.inner.lock();
        st.ensure_attached()?;
        let paper = st.paper.get_or_insert_with(|| Arc::new(loaded)).clone();
        tracing::info!(
            "Loaded exam {} ({} questions, {}s)",
            paper.exam_id,
            paper.question_count(),
            paper.duration_seconds
        );
        Ok(paper)
    }

    /// Acquires the camera, enters fullscreen and starts proctoring.
    ///
    /// Both the camera and fullscreen are required; if either is refused the
    /// session stays NOT_STARTED and nothing is left running.
    pub async fn start(&self) -> Result<(), SessionError> {
        let paper = self.load().await?;
        {
            let mut st = self.inner.lock();
            st.ensure_attached()?;
            if st.phase != SessionPhase::NotStarted || st.starting {
                return Err(SessionError::InvalidPhase {
                    expected: SessionPhase::NotStarted,
                    actual: st.phase,
                });
            }
            st.starting = true;
        }

        let deps = &self.inner.deps;
        let Some(stream) = deps.camera.acquire(&VideoConstraints::default()).await else {
            self.inner.lock().starting = false;
            tracing::warn!("Camera refused for student {}", self.inner.student.id);
            deps.shell.notify(Notice::CameraRequired);
            return Err(SessionError::Precondition(
                "camera access is required for proctoring".to_string(),
            ));
        };

        if let Err(e) = deps.shell.enter_fullscreen() {
            stream.stop_all();
            self.inner.lock().starting = false;
            tracing::warn!("Fullscreen refused for student {}: {}", self.inner.student.id, e);
            deps.shell.notify(Notice::FullscreenRequired);
            return Err(SessionError::Precondition(e.to_string()));
        }

        let mut st = self.inner.lock();
        st.starting = false;
        // The view may have been left while the camera prompt was open.
        if st.detached {
            stream.stop_all();
            drop(st);
            deps.shell.exit_fullscreen();
            return Err(SessionError::Closed);
        }

        st.camera.hold(stream);
        let runtime = Handle::current();
        st.runtime = Some(runtime.clone());
        st.ledger = Some(ViolationLedger::new(
            AlertContext {
                exam_id: paper.exam_id.clone(),
                exam_title: paper.title.clone(),
                student_id: self.inner.student.id.clone(),
                student_name: self.inner.student.name.clone(),
            },
            self.inner.settings.lockout_threshold,
            AlertSync::spawn(deps.store.clone()),
        ));
        st.advance(SessionPhase::Running);

        let weak = Arc::downgrade(&self.inner);
        let emit: ViolationSink = Arc::new(move |message: String| {
            if let Some(inner) = weak.upgrade() {
                inner.on_violation(message);
            }
        });
        st.monitor.start(&DetectorContext {
            host: deps.host.clone(),
            emit,
            runtime,
        });

        let guard = Arc::downgrade(&self.inner);
        let expire = Arc::downgrade(&self.inner);
        st.clock = Some(CountdownClock::start(
            paper.duration_seconds,
            self.inner.settings.tick,
            move || guard.upgrade().is_some_and(|inner| inner.is_running()),
            move || {
                if let Some(inner) = expire.upgrade() {
                    inner.on_time_expired();
                }
            },
        ));

        tracing::info!(
            "Session started for student {} in exam {}",
            self.inner.student.id,
            self.inner.exam_id
        );
        Ok(())
    }

    /// Records the chosen option for a question of the attempt-ordered paper.
    pub fn select_answer(&self, question: usize, option: usize) -> Result<(), SessionError> {
        let mut st = self.inner.lock();
        st.ensure_attached()?;
        if st.phase != SessionPhase::Running {
            return Err(SessionError::InvalidPhase {
                expected: SessionPhase::Running,
                actual: st.phase,
            });
        }
        let valid = st
            .paper
            .as_ref()
            .and_then(|p| p.questions.get(question))
            .is_some_and(|q| option < q.options.len());
        if !valid {
            return Err(SessionError::InvalidAnswer { question, option });
        }
        st.answers.insert(question, option);
        Ok(())
    }

    /// Feeds a violation into the session as if a detector had reported it.
    pub fn report_violation(&self, message: impl Into<String>) {
        self.inner.on_violation(message.into());
    }

    /// Manual submission.
    pub async fn submit(&self) -> Result<SubmitOutcome, SessionError> {
        let claim = {
            let mut st = self.inner.lock();
            st.ensure_attached()?;
            let phase = st.phase;
            match phase {
                SessionPhase::Running => {
                    self.inner.begin_submission(&mut st, SubmitReason::Manual)
                }
                SessionPhase::NotStarted => {
                    return Err(SessionError::InvalidPhase {
                        expected: SessionPhase::Running,
                        actual: phase,
                    });
                }
                SessionPhase::Locked | SessionPhase::Submitting | SessionPhase::Done => None,
            }
        };

        match claim {
            Some(claim) => {
                dispose_all(claim.retired);
                self.inner.persist(claim.record).await
            }
            None => Ok(SubmitOutcome::Collapsed),
        }
    }

    /// Re-sends the record of a failed submission, unchanged.
    pub async fn retry_submission(&self) -> Result<SubmitOutcome, SessionError> {
        let record = {
            let mut st = self.inner.lock();
            if st.phase != SessionPhase::Submitting {
                return Err(SessionError::InvalidPhase {
                    expected: SessionPhase::Submitting,
                    actual: st.phase,
                });
            }
            if st.in_flight {
                return Ok(SubmitOutcome::Collapsed);
            }
            let Some(record) = st.pending.clone() else {
                return Ok(SubmitOutcome::Collapsed);
            };
            st.in_flight = true;
            record
        };

        tracing::info!("Retrying submission of attempt {}", record.attempt_id);
        self.inner.persist(record).await
    }

    /// Leaves the session view. Idempotent.
    pub fn dispose(&self) {
        self.inner.detach();
    }

    /// Waits until every queued alert update has been written.
    /// Returns immediately while the session is still running.
    pub async fn flush_alerts(&self) {
        let drain = self.inner.lock().alert_drain.take();
        if let Some(worker) = drain {
            if let Err(e) = worker.await {
                tracing::warn!("Alert sync worker ended abnormally: {}", e);
            }
        }
    }

    pub fn exam_id(&self) -> &str {
        &self.inner.exam_id
    }

    pub fn student(&self) -> &StudentIdentity {
        &self.inner.student
    }

    pub fn phase(&self) -> SessionPhase {
        self.inner.lock().phase
    }

    /// Every phase entered so far, oldest first.
    pub fn phase_history(&self) -> Vec<SessionPhase> {
        self.inner.lock().history.clone()
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.lock().detached
    }

    pub fn paper(&self) -> Option<Arc<AttemptPaper>> {
        self.inner.lock().paper.clone()
    }

    pub fn answers(&self) -> AttemptAnswers {
        self.inner.lock().answers.clone()
    }

    pub fn violations(&self) -> ViolationState {
        self.inner
            .lock()
            .ledger
            .as_ref()
            .map(|l| l.state().clone())
            .unwrap_or_default()
    }

    pub fn alert_sync_failures(&self) -> usize {
        self.inner
            .lock()
            .ledger
            .as_ref()
            .map_or(0, |l| l.sync().failed_writes())
    }

    /// `None` before the session starts.
    pub fn remaining_seconds(&self) -> Option<u64> {
        self.inner
            .lock()
            .clock
            .as_ref()
            .map(|c| c.remaining_seconds())
    }

    pub fn is_clock_running(&self) -> bool {
        self.inner
            .lock()
            .clock
            .as_ref()
            .is_some_and(|c| c.is_ticking())
    }

    pub fn is_monitoring(&self) -> bool {
        self.inner.lock().monitor.is_active()
    }

    pub fn is_camera_held(&self) -> bool {
        self.inner.lock().camera.is_held()
    }

    /// The record awaiting a retry after a failed submission.
    pub fn pending_record(&self) -> Option<ExamAttemptRecord> {
        self.inner.lock().pending.clone()
    }

    /// The saved attempt record, once DONE.
    pub fn record(&self) -> Option<ExamAttemptRecord> {
        self.inner.lock().record.clone()
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        self.inner.detach();
    }
}

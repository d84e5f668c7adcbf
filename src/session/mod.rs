// src/session/mod.rs

//! The proctored exam session: lifecycle controller plus the components it
//! orchestrates (camera, integrity monitor, violation ledger, countdown,
//! scoring).

pub mod camera;
pub mod clock;
pub mod controller;
pub mod host;
pub mod ledger;
pub mod loader;
pub mod monitor;
pub mod scoring;
pub mod shell;

use serde::Serialize;

pub use controller::{SessionController, SessionDeps, SubmitOutcome};
pub use host::{BrowserEvent, EventHub, HostWindow, KeyPress, WindowMetrics};
pub use loader::{AttemptPaper, PaperLoader};
pub use shell::{Notice, Route, SessionShell, ShellError};

/// Lifecycle phase of a session. Phases only move forward:
/// `NotStarted -> Running -> [Locked ->] Submitting -> Done`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionPhase {
    NotStarted,
    Running,
    Locked,
    Submitting,
    Done,
}

impl SessionPhase {
    /// Whether `next` is a legal successor of `self`.
    pub fn can_advance_to(self, next: SessionPhase) -> bool {
        use SessionPhase::*;
        matches!(
            (self, next),
            (NotStarted, Running)
                | (Running, Locked)
                | (Running, Submitting)
                | (Locked, Submitting)
                | (Submitting, Done)
        )
    }
}

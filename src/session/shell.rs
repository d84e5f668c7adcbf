// src/session/shell.rs

//! Presentation shell contract: fullscreen, navigation and blocking notices.

use std::fmt;

/// Where the shell goes once a session is over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Results view after a normal (manual or timed) submission.
    Grades,
    /// Landing page after a lockout.
    Dashboard,
}

impl Route {
    pub fn path(self) -> &'static str {
        match self {
            Route::Grades => "/grades",
            Route::Dashboard => "/",
        }
    }
}

/// Blocking messages shown to the test-taker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// The exam paper could not be loaded.
    ExamUnavailable { reason: String },
    /// Camera access is mandatory for proctoring.
    CameraRequired,
    /// The browser refused to enter fullscreen.
    FullscreenRequired,
    /// The session was terminated after repeated violations.
    SessionLocked { violations: u32 },
    /// The attempt could not be saved; the shell should offer a retry.
    SubmissionFailed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellError(pub String);

impl fmt::Display for ShellError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "shell error: {}", self.0)
    }
}

impl std::error::Error for ShellError {}

/// The view hosting the session. Exclusively driven by the controller.
pub trait SessionShell: Send + Sync {
    fn enter_fullscreen(&self) -> Result<(), ShellError>;

    fn exit_fullscreen(&self);

    fn navigate(&self, route: Route);

    fn notify(&self, notice: Notice);
}

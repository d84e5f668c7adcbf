// src/config.rs

use std::env;
use std::time::Duration;

use dotenvy::dotenv;

/// Number of integrity violations that locks a session.
pub const LOCKOUT_THRESHOLD: u32 = 3;

/// Delay before a window blur is re-checked against the current focus state.
pub const BLUR_DEBOUNCE_MS: u64 = 100;

/// Poll period of the devtools size heuristic.
pub const DEVTOOLS_POLL_MS: u64 = 3_000;

/// Outer/inner window gap (either axis) above which devtools are assumed open.
pub const DEVTOOLS_GAP_PX: u32 = 160;

/// Scores at or above this percentage are reported as passing in grade views.
pub const PASSING_SCORE: i64 = 75;

/// Class label used when the profile carries none.
pub const DEFAULT_STUDENT_CLASS: &str = "Regular Class";

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub rust_log: String,
    pub bind_addr: String,
    pub log_dir: String,
}

/// Tuning knobs of a proctored session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSettings {
    pub lockout_threshold: u32,
    pub blur_debounce: Duration,
    pub devtools_poll: Duration,
    pub devtools_gap_px: u32,
    /// Countdown resolution. Always one second outside of tests.
    pub tick: Duration,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            lockout_threshold: LOCKOUT_THRESHOLD,
            blur_debounce: Duration::from_millis(BLUR_DEBOUNCE_MS),
            devtools_poll: Duration::from_millis(DEVTOOLS_POLL_MS),
            devtools_gap_px: DEVTOOLS_GAP_PX,
            tick: Duration::from_secs(1),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_url =
            env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://proctor.db".to_string());

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());

        let log_dir = env::var("LOG_DIR").unwrap_or_else(|_| "logs".to_string());

        Self {
            database_url,
            rust_log,
            bind_addr,
            log_dir,
        }
    }
}

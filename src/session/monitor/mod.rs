// src/session/monitor/mod.rs

//! Integrity monitor: a set of independent detectors reporting through a
//! single violation callback, started and disposed together.

pub mod detectors;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::config::SessionSettings;
use crate::session::host::{HostWindow, ListenerId};

pub use detectors::{
    BlurDetector, ContextMenuGuard, DevToolsDetector, ShortcutDetector, VisibilityDetector,
};

/// Callback receiving the human-readable violation message.
pub type ViolationSink = Arc<dyn Fn(String) + Send + Sync>;

/// Everything a detector needs to wire itself up.
#[derive(Clone)]
pub struct DetectorContext {
    pub host: Arc<dyn HostWindow>,
    pub emit: ViolationSink,
    /// Runtime used for timers; listeners may fire on non-runtime threads.
    pub runtime: Handle,
}

/// A single cheating signal source.
pub trait Detector: Send + Sync {
    fn name(&self) -> &'static str;

    /// Registers listeners/timers and returns the handle that tears them down.
    fn start(&self, ctx: &DetectorContext) -> DisposeHandle;
}

/// Owns the listeners and timers of one started detector.
///
/// Disposing removes the listeners, aborts the timers and disarms any
/// deferred check still in flight. Dropping the handle disposes it.
pub struct DisposeHandle {
    host: Arc<dyn HostWindow>,
    listeners: Vec<ListenerId>,
    tasks: Vec<JoinHandle<()>>,
    armed: Arc<AtomicBool>,
    disposed: bool,
}

impl DisposeHandle {
    pub fn new(host: Arc<dyn HostWindow>) -> Self {
        Self {
            host,
            listeners: Vec::new(),
            tasks: Vec::new(),
            armed: Arc::new(AtomicBool::new(true)),
            disposed: false,
        }
    }

    pub fn with_listener(mut self, id: ListenerId) -> Self {
        self.listeners.push(id);
        self
    }

    pub fn with_task(mut self, task: JoinHandle<()>) -> Self {
        self.tasks.push(task);
        self
    }

    /// Flag shared with deferred callbacks; false once disposed.
    pub fn armed(&self) -> Arc<AtomicBool> {
        self.armed.clone()
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Stops deferred checks from reporting without touching the host.
    pub fn disarm(&self) {
        self.armed.store(false, Ordering::SeqCst);
    }

    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        self.armed.store(false, Ordering::SeqCst);
        for id in self.listeners.drain(..) {
            self.host.remove_listener(id);
        }
        for task in self.tasks.drain(..) {
            task.abort();
        }
    }
}

impl Drop for DisposeHandle {
    fn drop(&mut self) {
        self.dispose();
    }
}

pub struct IntegrityMonitor {
    detectors: Vec<Box<dyn Detector>>,
    handles: Vec<DisposeHandle>,
}

impl IntegrityMonitor {
    pub fn new(detectors: Vec<Box<dyn Detector>>) -> Self {
        Self {
            detectors,
            handles: Vec::new(),
        }
    }

    /// The five standard detectors: context-menu suppression, forbidden
    /// shortcuts, visibility change, debounced blur, devtools size heuristic.
    pub fn standard(settings: &SessionSettings) -> Self {
        Self::new(vec![
            Box::new(ContextMenuGuard),
            Box::new(ShortcutDetector),
            Box::new(VisibilityDetector),
            Box::new(BlurDetector::new(settings.blur_debounce)),
            Box::new(DevToolsDetector::new(
                settings.devtools_poll,
                settings.devtools_gap_px,
            )),
        ])
    }

    /// Starts every detector. Calling it while already active does nothing.
    pub fn start(&mut self, ctx: &DetectorContext) {
        if self.is_active() {
            return;
        }
        self.handles = self
            .detectors
            .iter()
            .map(|detector| {
                tracing::debug!("Starting detector {}", detector.name());
                detector.start(ctx)
            })
            .collect();
    }

    pub fn is_active(&self) -> bool {
        !self.handles.is_empty()
    }

    pub fn detector_names(&self) -> Vec<&'static str> {
        self.detectors.iter().map(|d| d.name()).collect()
    }

    /// Hands over the started handles, disarmed but still registered, so the
    /// caller can dispose them once its own locks are released.
    pub fn take_handles(&mut self) -> Vec<DisposeHandle> {
        for handle in &self.handles {
            handle.disarm();
        }
        std::mem::take(&mut self.handles)
    }

    /// Tears down all detectors. Idempotent.
    pub fn dispose(&mut self) {
        for handle in &mut self.handles {
            handle.dispose();
        }
        self.handles.clear();
    }
}

impl Drop for IntegrityMonitor {
    fn drop(&mut self) {
        self.dispose();
    }
}

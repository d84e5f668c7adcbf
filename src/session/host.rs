// src/session/host.rs

//! The window a session runs in, seen as an event target.
//!
//! A host bridge (webview glue, a wasm binding, or a test harness) owns an
//! [`EventHub`] and feeds it the raw browser events; detectors subscribe to
//! it through the [`HostWindow`] trait.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Raw window/document events relevant to integrity monitoring.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrowserEvent {
    ContextMenu,
    KeyDown(KeyPress),
    VisibilityChange { hidden: bool },
    Blur,
    Focus,
    Resize,
}

impl BrowserEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            BrowserEvent::ContextMenu => EventKind::ContextMenu,
            BrowserEvent::KeyDown(_) => EventKind::KeyDown,
            BrowserEvent::VisibilityChange { .. } => EventKind::VisibilityChange,
            BrowserEvent::Blur => EventKind::Blur,
            BrowserEvent::Focus => EventKind::Focus,
            BrowserEvent::Resize => EventKind::Resize,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EventKind {
    ContextMenu,
    KeyDown,
    VisibilityChange,
    Blur,
    Focus,
    Resize,
}

/// A key press with the modifiers that matter for shortcut detection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPress {
    /// DOM `KeyboardEvent.key` value, e.g. "F12", "c", "C".
    pub key: String,
    pub ctrl: bool,
    pub meta: bool,
}

impl KeyPress {
    pub fn plain(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ctrl: false,
            meta: false,
        }
    }

    pub fn ctrl(key: impl Into<String>) -> Self {
        Self {
            ctrl: true,
            ..Self::plain(key)
        }
    }

    pub fn meta(key: impl Into<String>) -> Self {
        Self {
            meta: true,
            ..Self::plain(key)
        }
    }
}

/// Outer (browser chrome included) and inner (viewport) window sizes in CSS px.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowMetrics {
    pub outer_width: u32,
    pub outer_height: u32,
    pub inner_width: u32,
    pub inner_height: u32,
}

impl WindowMetrics {
    /// A window whose viewport fills it completely.
    pub fn fullscreen(width: u32, height: u32) -> Self {
        Self {
            outer_width: width,
            outer_height: height,
            inner_width: width,
            inner_height: height,
        }
    }

    pub fn width_gap(&self) -> u32 {
        self.outer_width.saturating_sub(self.inner_width)
    }

    pub fn height_gap(&self) -> u32 {
        self.outer_height.saturating_sub(self.inner_height)
    }
}

/// What a listener asks the host to do with the event's default action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOutcome {
    Continue,
    PreventDefault,
}

pub type Listener = Arc<dyn Fn(&BrowserEvent) -> EventOutcome + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ListenerId(u64);

/// Capabilities of the host window that detectors rely on.
///
/// Listeners may call back into the session, and `add_listener` can be
/// called while the session holds its lock. Implementations must therefore
/// release any internal lock before invoking listeners, as [`EventHub`] does.
pub trait HostWindow: Send + Sync {
    fn add_listener(&self, kind: EventKind, listener: Listener) -> ListenerId;

    /// Removing an unknown or already removed id is a no-op.
    fn remove_listener(&self, id: ListenerId);

    fn has_focus(&self) -> bool;

    fn metrics(&self) -> WindowMetrics;
}

/// In-process event target implementing [`HostWindow`].
pub struct EventHub {
    next_id: AtomicU64,
    listeners: Mutex<BTreeMap<ListenerId, (EventKind, Listener)>>,
    focused: AtomicBool,
    metrics: Mutex<WindowMetrics>,
}

impl EventHub {
    pub fn new(metrics: WindowMetrics) -> Self {
        Self {
            next_id: AtomicU64::new(1),
            listeners: Mutex::new(BTreeMap::new()),
            focused: AtomicBool::new(true),
            metrics: Mutex::new(metrics),
        }
    }

    /// Delivers an event to every listener registered for its kind, in
    /// registration order. The default action is prevented if any listener
    /// asks for it.
    ///
    /// Listeners run without the hub's lock held, so they may add or remove
    /// listeners (including themselves).
    pub fn dispatch(&self, event: BrowserEvent) -> EventOutcome {
        match &event {
            BrowserEvent::Blur => self.focused.store(false, Ordering::SeqCst),
            BrowserEvent::Focus => self.focused.store(true, Ordering::SeqCst),
            _ => {}
        }

        let kind = event.kind();
        let targets: Vec<(ListenerId, Listener)> = self
            .lock_listeners()
            .iter()
            .filter(|(_, (k, _))| *k == kind)
            .map(|(id, (_, l))| (*id, l.clone()))
            .collect();

        let mut outcome = EventOutcome::Continue;
        for (id, listener) in targets {
            // Skip listeners removed by an earlier listener of this dispatch.
            if !self.lock_listeners().contains_key(&id) {
                continue;
            }
            if listener(&event) == EventOutcome::PreventDefault {
                outcome = EventOutcome::PreventDefault;
            }
        }
        outcome
    }

    /// Changes focus without emitting an event (e.g. focus moved to an
    /// internal popup and back).
    pub fn set_focus(&self, focused: bool) {
        self.focused.store(focused, Ordering::SeqCst);
    }

    pub fn set_metrics(&self, metrics: WindowMetrics) {
        *self.metrics.lock().unwrap_or_else(|e| e.into_inner()) = metrics;
    }

    pub fn listener_count(&self) -> usize {
        self.lock_listeners().len()
    }

    fn lock_listeners(
        &self,
    ) -> std::sync::MutexGuard<'_, BTreeMap<ListenerId, (EventKind, Listener)>> {
        self.listeners.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new(WindowMetrics::fullscreen(1280, 800))
    }
}

impl HostWindow for EventHub {
    fn add_listener(&self, kind: EventKind, listener: Listener) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::SeqCst));
        self.lock_listeners().insert(id, (kind, listener));
        id
    }

    fn remove_listener(&self, id: ListenerId) {
        self.lock_listeners().remove(&id);
    }

    fn has_focus(&self) -> bool {
        self.focused.load(Ordering::SeqCst)
    }

    fn metrics(&self) -> WindowMetrics {
        *self.metrics.lock().unwrap_or_else(|e| e.into_inner())
    }
}

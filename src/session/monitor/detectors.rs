// src/session/monitor/detectors.rs

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use tokio::time::{Instant, interval_at, sleep};

use crate::session::host::{BrowserEvent, EventKind, EventOutcome, KeyPress, WindowMetrics};
use crate::session::monitor::{Detector, DetectorContext, DisposeHandle};

/// Letters that are forbidden together with Ctrl/Cmd: view-source, inspect,
/// console, copy, paste, save, print, reload.
const FORBIDDEN_CHORD_KEYS: [&str; 8] = ["u", "i", "j", "c", "v", "s", "p", "r"];

/// Cancels the native context menu. Not a violation by itself.
pub struct ContextMenuGuard;

impl Detector for ContextMenuGuard {
    fn name(&self) -> &'static str {
        "context-menu"
    }

    fn start(&self, ctx: &DetectorContext) -> DisposeHandle {
        let id = ctx.host.add_listener(
            EventKind::ContextMenu,
            Arc::new(|_: &BrowserEvent| EventOutcome::PreventDefault),
        );
        DisposeHandle::new(ctx.host.clone()).with_listener(id)
    }
}

/// F12, or Ctrl/Cmd plus one of the forbidden letters.
pub struct ShortcutDetector;

impl ShortcutDetector {
    pub fn is_forbidden(press: &KeyPress) -> bool {
        if press.key == "F12" {
            return true;
        }
        if !(press.ctrl || press.meta) {
            return false;
        }
        let key = press.key.to_lowercase();
        FORBIDDEN_CHORD_KEYS.contains(&key.as_str())
    }
}

impl Detector for ShortcutDetector {
    fn name(&self) -> &'static str {
        "forbidden-shortcut"
    }

    fn start(&self, ctx: &DetectorContext) -> DisposeHandle {
        let emit = ctx.emit.clone();
        let id = ctx.host.add_listener(
            EventKind::KeyDown,
            Arc::new(move |event: &BrowserEvent| match event {
                BrowserEvent::KeyDown(press) if ShortcutDetector::is_forbidden(press) => {
                    emit(format!(
                        "Forbidden keyboard shortcut ({}) detected",
                        press.key
                    ));
                    EventOutcome::PreventDefault
                }
                _ => EventOutcome::Continue,
            }),
        );
        DisposeHandle::new(ctx.host.clone()).with_listener(id)
    }
}

/// Reports whenever the document becomes hidden (tab/app switch, minimize).
pub struct VisibilityDetector;

impl Detector for VisibilityDetector {
    fn name(&self) -> &'static str {
        "visibility-change"
    }

    fn start(&self, ctx: &DetectorContext) -> DisposeHandle {
        let emit = ctx.emit.clone();
        let id = ctx.host.add_listener(
            EventKind::VisibilityChange,
            Arc::new(move |event: &BrowserEvent| {
                if let BrowserEvent::VisibilityChange { hidden: true } = event {
                    emit("Left the exam page (tab switch detected)".to_string());
                }
                EventOutcome::Continue
            }),
        );
        DisposeHandle::new(ctx.host.clone()).with_listener(id)
    }
}

/// Reports focus loss that persists past a short debounce window, so that
/// transient internal focus shifts are ignored.
pub struct BlurDetector {
    debounce: Duration,
}

impl BlurDetector {
    pub fn new(debounce: Duration) -> Self {
        Self { debounce }
    }
}

impl Detector for BlurDetector {
    fn name(&self) -> &'static str {
        "window-blur"
    }

    fn start(&self, ctx: &DetectorContext) -> DisposeHandle {
        let handle = DisposeHandle::new(ctx.host.clone());
        let armed = handle.armed();
        let host = Arc::downgrade(&ctx.host);
        let emit = ctx.emit.clone();
        let runtime = ctx.runtime.clone();
        let debounce = self.debounce;

        let id = ctx.host.add_listener(
            EventKind::Blur,
            Arc::new(move |_: &BrowserEvent| {
                let armed = armed.clone();
                let host = host.clone();
                let emit = emit.clone();
                runtime.spawn(async move {
                    sleep(debounce).await;
                    if !armed.load(Ordering::SeqCst) {
                        return;
                    }
                    let Some(host) = host.upgrade() else {
                        return;
                    };
                    if !host.has_focus() {
                        emit("Window focus lost; do not interact with other applications"
                            .to_string());
                    }
                });
                EventOutcome::Continue
            }),
        );
        handle.with_listener(id)
    }
}

/// Heuristic: docked devtools shrink the viewport relative to the window.
/// Checked on every resize and on a fixed poll interval.
pub struct DevToolsDetector {
    poll: Duration,
    gap_px: u32,
}

impl DevToolsDetector {
    pub fn new(poll: Duration, gap_px: u32) -> Self {
        Self { poll, gap_px }
    }

    pub fn exceeds(metrics: &WindowMetrics, gap_px: u32) -> bool {
        metrics.width_gap() > gap_px || metrics.height_gap() > gap_px
    }
}

const DEVTOOLS_MESSAGE: &str = "Element inspection attempt detected (DevTools)";

impl Detector for DevToolsDetector {
    fn name(&self) -> &'static str {
        "devtools-size"
    }

    fn start(&self, ctx: &DetectorContext) -> DisposeHandle {
        let gap_px = self.gap_px;

        let emit = ctx.emit.clone();
        let host = Arc::downgrade(&ctx.host);
        let id = ctx.host.add_listener(
            EventKind::Resize,
            Arc::new(move |_: &BrowserEvent| {
                if let Some(host) = host.upgrade() {
                    if DevToolsDetector::exceeds(&host.metrics(), gap_px) {
                        emit(DEVTOOLS_MESSAGE.to_string());
                    }
                }
                EventOutcome::Continue
            }),
        );

        let emit = ctx.emit.clone();
        let host = Arc::downgrade(&ctx.host);
        let poll = self.poll;
        let task = ctx.runtime.spawn(async move {
            // First check one period after start, like setInterval.
            let mut ticker = interval_at(Instant::now() + poll, poll);
            loop {
                ticker.tick().await;
                let Some(host) = host.upgrade() else {
                    break;
                };
                if DevToolsDetector::exceeds(&host.metrics(), gap_px) {
                    emit(DEVTOOLS_MESSAGE.to_string());
                }
            }
        });

        DisposeHandle::new(ctx.host.clone())
            .with_listener(id)
            .with_task(task)
    }
}

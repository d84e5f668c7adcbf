// src/session/ledger.rs

//! Violation ledger: the single writer of a session's violation count and
//! audit log, mirrored to the live alert record on every event.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::{
    models::violation::{AlertUpdate, ViolationEvent, ViolationState},
    store::DocumentStore,
};

/// Fire-and-forget writer of alert updates.
///
/// Updates are queued without blocking and written in order by one
/// background task. A failed write is logged and counted, never retried and
/// never reported to the caller.
pub struct AlertSync {
    tx: Option<mpsc::UnboundedSender<AlertUpdate>>,
    failed: Arc<AtomicUsize>,
    worker: Option<JoinHandle<()>>,
}

impl AlertSync {
    /// Must be called from within a tokio runtime.
    pub fn spawn(store: Arc<dyn DocumentStore>) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<AlertUpdate>();
        let failed = Arc::new(AtomicUsize::new(0));
        let failures = failed.clone();

        let worker = tokio::spawn(async move {
            while let Some(update) = rx.recv().await {
                if let Err(e) = store.upsert_alert(&update).await {
                    failures.fetch_add(1, Ordering::SeqCst);
                    tracing::warn!(
                        "Integrity sync failed for exam {} / student {} (count {}): {}",
                        update.exam_id,
                        update.student_id,
                        update.violation_count,
                        e
                    );
                }
            }
        });

        Self {
            tx: Some(tx),
            failed,
            worker: Some(worker),
        }
    }

    pub fn push(&self, update: AlertUpdate) {
        match &self.tx {
            Some(tx) => {
                if tx.send(update).is_err() {
                    tracing::warn!("Alert sync worker is gone, update dropped");
                }
            }
            None => tracing::debug!("Alert sync closed, update dropped"),
        }
    }

    pub fn failed_writes(&self) -> usize {
        self.failed.load(Ordering::SeqCst)
    }

    /// Stops accepting updates. Already queued updates are still written;
    /// the returned handle completes once the queue is drained.
    pub fn close(&mut self) -> Option<JoinHandle<()>> {
        self.tx.take();
        self.worker.take()
    }
}

/// Identity under which the alert record is keyed and labelled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertContext {
    pub exam_id: String,
    pub exam_title: String,
    pub student_id: String,
    pub student_name: String,
}

pub struct ViolationLedger {
    context: AlertContext,
    threshold: u32,
    state: ViolationState,
    sync: AlertSync,
}

impl ViolationLedger {
    pub fn new(context: AlertContext, threshold: u32, sync: AlertSync) -> Self {
        Self {
            context,
            threshold,
            state: ViolationState::default(),
            sync,
        }
    }

    /// Appends a timestamped entry, bumps the count and queues the alert
    /// upsert. Once the threshold is reached the ledger is terminal and
    /// further records are ignored.
    pub fn record(&mut self, message: impl Into<String>) -> ViolationState {
        if self.state.is_critical {
            tracing::debug!("Ledger already critical, violation ignored");
            return self.state.clone();
        }

        let event = ViolationEvent::now(message);
        self.state.count += 1;
        self.state.log.push(event.clone());
        self.state.is_critical = self.state.count >= self.threshold;

        tracing::warn!(
            "Violation {}/{} for student {} in exam {}: {}",
            self.state.count,
            self.threshold,
            self.context.student_id,
            self.context.exam_id,
            event.message
        );

        self.sync.push(AlertUpdate {
            exam_id: self.context.exam_id.clone(),
            student_id: self.context.student_id.clone(),
            student_name: self.context.student_name.clone(),
            exam_title: self.context.exam_title.clone(),
            violation_count: self.state.count,
            last_violation: event.to_string(),
            violation_log: self.state.log.clone(),
            timestamp: chrono::Utc::now(),
            is_critical: self.state.is_critical,
        });

        self.state.clone()
    }

    pub fn state(&self) -> &ViolationState {
        &self.state
    }

    pub fn sync(&self) -> &AlertSync {
        &self.sync
    }

    /// See [`AlertSync::close`].
    pub fn close_sync(&mut self) -> Option<JoinHandle<()>> {
        self.sync.close()
    }
}

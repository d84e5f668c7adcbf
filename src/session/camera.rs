// src/session/camera.rs

//! Camera attestation: a live user-facing video stream is the precondition
//! for starting a session and lives exactly as long as the session.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;

/// Requested stream shape. Video only; proctoring needs no audio.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoConstraints {
    pub ideal_width: u32,
    pub ideal_height: u32,
    pub facing_user: bool,
    pub audio: bool,
}

impl Default for VideoConstraints {
    fn default() -> Self {
        Self {
            ideal_width: 640,
            ideal_height: 480,
            facing_user: true,
            audio: false,
        }
    }
}

/// One track of a media stream. Clones share the same live flag.
#[derive(Debug, Clone)]
pub struct MediaTrack {
    pub kind: &'static str,
    pub label: String,
    live: Arc<AtomicBool>,
}

impl MediaTrack {
    pub fn video(label: impl Into<String>) -> Self {
        Self {
            kind: "video",
            label: label.into(),
            live: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }

    /// Stops the track. Stopping twice is harmless.
    pub fn stop(&self) {
        self.live.store(false, Ordering::SeqCst);
    }
}

/// Handle to an acquired stream. Clones observe the same tracks.
#[derive(Debug, Clone)]
pub struct MediaStream {
    pub id: String,
    tracks: Vec<MediaTrack>,
}

impl MediaStream {
    pub fn new(id: impl Into<String>, tracks: Vec<MediaTrack>) -> Self {
        Self {
            id: id.into(),
            tracks,
        }
    }

    pub fn active_tracks(&self) -> usize {
        self.tracks.iter().filter(|t| t.is_live()).count()
    }

    pub fn stop_all(&self) {
        for track in &self.tracks {
            track.stop();
        }
    }
}

/// Source of the proctoring stream (getUserMedia in a browser host).
#[async_trait]
pub trait Camera: Send + Sync {
    /// `None` on permission denial or missing hardware.
    async fn acquire(&self, constraints: &VideoConstraints) -> Option<MediaStream>;
}

/// Owner slot for the session's stream; guarantees a single release.
#[derive(Debug, Default)]
pub struct CameraLease {
    stream: Option<MediaStream>,
}

impl CameraLease {
    pub fn hold(&mut self, stream: MediaStream) {
        // A replaced stream must not leak.
        self.release();
        self.stream = Some(stream);
    }

    pub fn is_held(&self) -> bool {
        self.stream.is_some()
    }

    /// Stops all tracks of the held stream. Idempotent.
    pub fn release(&mut self) {
        if let Some(stream) = self.stream.take() {
            tracing::debug!("Releasing camera stream {}", stream.id);
            stream.stop_all();
        }
    }
}

impl Drop for CameraLease {
    fn drop(&mut self) {
        self.release();
    }
}

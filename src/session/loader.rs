// src/session/loader.rs

use std::sync::{Arc, Mutex};

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use crate::{error::LoadError, models::exam::Question, store::DocumentStore};

/// The paper as seen by one attempt: questions in a fixed shuffled order.
///
/// Built once per attempt and shared behind an `Arc`, so the order used for
/// rendering is the order used for scoring.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptPaper {
    pub exam_id: String,
    pub title: String,
    pub duration_seconds: u64,
    pub questions: Vec<Question>,
}

impl AttemptPaper {
    pub fn question_count(&self) -> usize {
        self.questions.len()
    }
}

/// Fetches exam papers and shuffles their question order.
pub struct PaperLoader {
    store: Arc<dyn DocumentStore>,
    rng: Mutex<StdRng>,
}

impl PaperLoader {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Deterministic shuffles, for reproducible attempts.
    pub fn with_seed(store: Arc<dyn DocumentStore>, seed: u64) -> Self {
        Self {
            store,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    pub async fn load(&self, exam_id: &str) -> Result<AttemptPaper, LoadError> {
        let paper = self
            .store
            .fetch_exam(exam_id)
            .await?
            .ok_or_else(|| LoadError::NotFound(exam_id.to_string()))?;

        let duration_seconds = paper.duration_seconds();
        let mut questions = paper.questions;
        {
            let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
            questions.shuffle(&mut *rng);
        }

        tracing::info!(
            "Loaded exam {} ({} questions, {}s)",
            exam_id,
            questions.len(),
            duration_seconds
        );

        Ok(AttemptPaper {
            exam_id: paper.id,
            title: paper.title,
            duration_seconds,
            questions,
        })
    }
}

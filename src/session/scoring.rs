// src/session/scoring.rs

use crate::models::{attempt::AttemptAnswers, exam::Question};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Score {
    pub correct: usize,
    pub total: usize,
    /// round(100 * correct / total), half rounded up; 0 for an empty paper.
    pub percent: u8,
}

/// Scores answers against the attempt-ordered questions.
/// Unanswered questions count as incorrect.
pub fn score_attempt(questions: &[Question], answers: &AttemptAnswers) -> Score {
    let total = questions.len();
    let correct = questions
        .iter()
        .enumerate()
        .filter(|(idx, q)| answers.get(idx).is_some_and(|selected| q.is_correct(*selected)))
        .count();

    if total == 0 {
        return Score {
            correct: 0,
            total: 0,
            percent: 0,
        };
    }

    // Integer form of round-half-up(100 * c / n).
    let percent = (200 * correct + total) / (2 * total);

    Score {
        correct,
        total,
        percent: u8::try_from(percent).unwrap_or(100),
    }
}

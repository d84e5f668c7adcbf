// src/models/exam.rs

use serde::{Deserialize, Serialize};
use sqlx::{prelude::FromRow, types::Json};
use validator::Validate;

/// A multiple-choice question as authored by the teacher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub text: String,

    /// Answer options in display order (typically four: A-D).
    pub options: Vec<String>,

    /// Index into `options` of the correct answer.
    #[serde(alias = "correctOption")]
    pub correct_option_index: usize,
}

impl Question {
    pub fn is_correct(&self, selected: usize) -> bool {
        selected == self.correct_option_index
    }
}

/// An exam paper as stored in the `exams` table.
/// Read-only to a running session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamPaper {
    pub id: String,
    pub title: String,
    pub duration_minutes: u32,
    pub questions: Vec<Question>,
}

impl ExamPaper {
    pub fn duration_seconds(&self) -> u64 {
        u64::from(self.duration_minutes) * 60
    }
}

/// Represents a row of the 'exams' table.
#[derive(Debug, Clone, FromRow)]
pub struct ExamRow {
    pub id: String,
    pub title: String,
    pub duration_minutes: i64,
    pub questions: Json<Vec<Question>>,
    pub teacher_id: Option<String>,
    pub status: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl ExamRow {
    pub fn into_paper(self) -> ExamPaper {
        ExamPaper {
            id: self.id,
            title: self.title,
            duration_minutes: u32::try_from(self.duration_minutes).unwrap_or(0),
            questions: self.questions.0,
        }
    }
}

/// Catalogue entry for the exam list.
#[derive(Debug, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ExamSummary {
    pub id: String,
    pub title: String,
    pub duration_minutes: i64,
    pub question_count: i64,
    pub status: String,
    pub teacher_id: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// DTO for sending a question to the student (excludes the answer key).
#[derive(Debug, Serialize)]
pub struct PublicQuestion {
    pub text: String,
    pub options: Vec<String>,
}

/// DTO for sending a paper to the student.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicPaper {
    pub id: String,
    pub title: String,
    pub duration_minutes: u32,
    pub questions: Vec<PublicQuestion>,
}

impl From<ExamPaper> for PublicPaper {
    fn from(paper: ExamPaper) -> Self {
        Self {
            id: paper.id,
            title: paper.title,
            duration_minutes: paper.duration_minutes,
            questions: paper
                .questions
                .into_iter()
                .map(|q| PublicQuestion {
                    text: q.text,
                    options: q.options,
                })
                .collect(),
        }
    }
}

/// DTO for a question inside a create request.
#[derive(Debug, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateQuestionRequest {
    #[validate(length(min = 1, max = 1000))]
    pub text: String,
    #[validate(custom(function = validate_options))]
    pub options: Vec<String>,
    #[serde(alias = "correctOption")]
    pub correct_option_index: usize,
}

/// DTO for publishing a new exam.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateExamRequest {
    #[validate(length(min = 1, max = 200, message = "Title length must be between 1 and 200 characters."))]
    pub title: String,
    /// Duration in minutes.
    #[validate(range(min = 1, max = 600, message = "Duration must be between 1 and 600 minutes."))]
    pub duration: u32,
    #[validate(length(min = 1, max = 200), nested)]
    pub questions: Vec<CreateQuestionRequest>,
    pub teacher_id: Option<String>,
}

impl CreateExamRequest {
    /// Checks the cross-field rule the derive cannot express.
    pub fn check_answer_keys(&self) -> Result<(), String> {
        for (idx, q) in self.questions.iter().enumerate() {
            if q.correct_option_index >= q.options.len() {
                return Err(format!(
                    "Question #{} has correct option {} but only {} options",
                    idx + 1,
                    q.correct_option_index,
                    q.options.len()
                ));
            }
        }
        Ok(())
    }
}

fn validate_options(options: &[String]) -> Result<(), validator::ValidationError> {
    if options.len() < 2 || options.len() > 8 {
        return Err(validator::ValidationError::new("options_count_out_of_range"));
    }
    for opt in options {
        if opt.trim().is_empty() {
            return Err(validator::ValidationError::new("option_cannot_be_empty"));
        }
        if opt.len() > 500 {
            return Err(validator::ValidationError::new("option_too_long"));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(options: Vec<&str>, correct: usize) -> CreateExamRequest {
        CreateExamRequest {
            title: "Midterm".to_string(),
            duration: 60,
            questions: vec![CreateQuestionRequest {
                text: "2 + 2 = ?".to_string(),
                options: options.into_iter().map(String::from).collect(),
                correct_option_index: correct,
            }],
            teacher_id: None,
        }
    }

    #[test]
    fn test_valid_request_passes() {
        let req = request(vec!["3", "4", "5", "6"], 1);
        assert!(req.validate().is_ok());
        assert!(req.check_answer_keys().is_ok());
    }

    #[test]
    fn test_answer_key_out_of_range() {
        let req = request(vec!["3", "4"], 2);
        assert!(req.validate().is_ok());
        assert!(req.check_answer_keys().is_err());
    }

    #[test]
    fn test_single_option_rejected() {
        let req = request(vec!["4"], 0);
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_question_count_bounds() {
        let mut empty = request(vec!["3", "4"], 1);
        empty.questions.clear();
        assert!(empty.validate().is_err());

        let mut crowded = request(vec!["3", "4"], 1);
        let extra: Vec<CreateQuestionRequest> = (0..200)
            .map(|i| CreateQuestionRequest {
                text: format!("Q{}", i),
                options: vec!["a".to_string(), "b".to_string()],
                correct_option_index: 0,
            })
            .collect();
        crowded.questions.extend(extra);
        assert_eq!(crowded.questions.len(), 201);
        assert!(crowded.validate().is_err());
    }

    #[test]
    fn test_question_accepts_legacy_field_name() {
        let q: Question =
            serde_json::from_str(r#"{"text":"t","options":["a","b"],"correctOption":1}"#).unwrap();
        assert_eq!(q.correct_option_index, 1);
        assert!(q.is_correct(1));
    }

    #[test]
    fn test_duration_seconds() {
        let paper = ExamPaper {
            id: "e".to_string(),
            title: "t".to_string(),
            duration_minutes: 45,
            questions: vec![],
        };
        assert_eq!(paper.duration_seconds(), 2700);
    }
}

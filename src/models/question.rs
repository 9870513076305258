// src/models/question.rs

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

/// A single multiple-choice question owned by a quiz.
///
/// `correct_answer` is a 0-based index into `options`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: String,

    /// The prompt shown to the student.
    pub text: String,

    /// Answer options, conventionally four of them.
    pub options: Vec<String>,

    pub correct_answer: usize,
}

/// DTO for sending a question to a student (excludes the correct answer).
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PublicQuestion {
    pub id: String,
    pub text: String,
    pub options: Vec<String>,
}

impl From<&Question> for PublicQuestion {
    fn from(q: &Question) -> Self {
        Self {
            id: q.id.clone(),
            text: q.text.clone(),
            options: q.options.clone(),
        }
    }
}

/// DTO for authoring a question by hand.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateQuestionRequest {
    #[validate(length(min = 1, max = 1000))]
    pub text: String,
    #[validate(custom(function = validate_options))]
    pub options: Vec<String>,
    pub correct_answer: usize,
}

impl CreateQuestionRequest {
    /// Builds the stored question under a freshly issued id.
    ///
    /// Text is kept as written apart from surrounding whitespace; clients
    /// render it as plain text.
    pub fn into_question(self) -> Question {
        Question {
            id: format!("qn-{}", uuid::Uuid::new_v4()),
            text: self.text.trim().to_string(),
            options: self.options.iter().map(|o| o.trim().to_string()).collect(),
            correct_answer: self.correct_answer,
        }
    }
}

fn validate_options(options: &[String]) -> Result<(), validator::ValidationError> {
    if options.len() < 2 {
        return Err(validator::ValidationError::new("too_few_options"));
    }
    for opt in options {
        if opt.trim().is_empty() {
            return Err(validator::ValidationError::new("option_cannot_be_empty"));
        }
        if opt.chars().count() > crate::quiz::question_set::MAX_OPTION_CHARS {
            return Err(validator::ValidationError::new("option_too_long"));
        }
    }
    Ok(())
}

// src/models/quiz.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::models::question::{CreateQuestionRequest, PublicQuestion, Question};

/// A quiz together with the questions it owns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Quiz {
    pub id: String,
    pub title: String,
    pub description: String,

    /// Class / cohort tag the quiz targets, e.g. "1st Year".
    pub cohort: String,

    pub questions: Vec<Question>,
    pub duration_minutes: u32,
    pub max_attempts: u32,
    pub created_at: DateTime<Utc>,
}

/// Quiz as shown to students: answers hidden.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PublicQuiz {
    pub id: String,
    pub title: String,
    pub description: String,
    pub cohort: String,
    pub questions: Vec<PublicQuestion>,
    pub duration_minutes: u32,
    pub max_attempts: u32,
    pub created_at: DateTime<Utc>,
}

impl From<&Quiz> for PublicQuiz {
    fn from(q: &Quiz) -> Self {
        Self {
            id: q.id.clone(),
            title: q.title.clone(),
            description: q.description.clone(),
            cohort: q.cohort.clone(),
            questions: q.questions.iter().map(PublicQuestion::from).collect(),
            duration_minutes: q.duration_minutes,
            max_attempts: q.max_attempts,
            created_at: q.created_at,
        }
    }
}

/// A student's view of a quiz in the listing, with what is left of their
/// attempt budget.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StudentQuiz {
    #[serde(flatten)]
    pub quiz: PublicQuiz,
    pub attempts_left: u32,
}

/// Query string for listing quizzes.
#[derive(Debug, Default, Clone, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct QuizFilter {
    pub cohort: Option<String>,
}

/// DTO for authoring a quiz by hand.
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateQuizRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(max = 2000))]
    #[serde(default)]
    pub description: String,
    #[validate(length(min = 1, max = 50))]
    pub cohort: String,
    #[validate(range(min = 1, max = 600))]
    pub duration_minutes: u32,
    #[validate(range(min = 1, max = 100))]
    pub max_attempts: u32,
    #[validate(length(min = 1, message = "A quiz needs at least one question."), nested)]
    pub questions: Vec<CreateQuestionRequest>,
}

/// DTO for authoring a quiz through the AI generator.
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GenerateQuizRequest {
    /// Topic; also used as the quiz title.
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(min = 1, max = 2000))]
    pub description: String,
    #[validate(length(min = 1, max = 50))]
    pub cohort: String,
    #[validate(range(min = 1, max = 600))]
    pub duration_minutes: u32,
    #[validate(range(min = 1, max = 100))]
    pub max_attempts: u32,
    #[validate(range(min = 1, max = 100))]
    pub count: usize,
}

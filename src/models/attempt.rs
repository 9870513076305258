// src/models/attempt.rs

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// Chosen option per question id. A missing key means "unanswered",
/// which stays distinct from "answered option 0".
pub type AnswerMap = BTreeMap<String, usize>;

/// One completed pass through a quiz. Append-only once produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QuizAttempt {
    pub id: String,
    pub quiz_id: String,
    pub user_id: String,

    /// Display name captured at attempt time.
    pub user_name: String,

    pub score: u32,

    /// Question count snapshot at attempt time.
    pub total_questions: u32,

    /// Seconds between session start and completion.
    pub time_taken: u64,

    pub completed_at: DateTime<Utc>,

    #[schema(value_type = Object)]
    pub answers: AnswerMap,
}

/// Query string for listing attempts.
#[derive(Debug, Default, Clone, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct AttemptFilter {
    pub user_id: Option<String>,
    pub quiz_id: Option<String>,
}

impl AttemptFilter {
    pub fn matches(&self, attempt: &QuizAttempt) -> bool {
        self.user_id.as_ref().is_none_or(|u| *u == attempt.user_id)
            && self.quiz_id.as_ref().is_none_or(|q| *q == attempt.quiz_id)
    }
}

// src/models/session.rs

use serde::Deserialize;
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StartSessionRequest {
    #[validate(length(min = 1))]
    pub quiz_id: String,
}

/// Selects `option_index` for `question_id`; re-selecting overwrites.
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnswerRequest {
    #[validate(length(min = 1))]
    pub question_id: String,
    pub option_index: usize,
}

// src/generator.rs

//! AI question generation. Everything a model returns is treated as untrusted
//! input and goes through the same checks as hand-authored questions.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value as JsonValue, json};
use thiserror::Error;
use url::Url;

use crate::{
    models::question::Question,
    quiz::{QuizError, validate_question},
};

#[derive(Debug, Error)]
pub enum GeneratorError {
    #[error("AI question generation is not configured")]
    Disabled,

    #[error("AI request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("AI response was malformed: {0}")]
    Malformed(String),

    #[error("AI produced an invalid question: {0}")]
    Rejected(#[from] QuizError),
}

/// What the admin asked for.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub topic: String,
    pub description: String,
    pub count: usize,
    pub cohort: String,
}

#[async_trait]
pub trait QuestionGenerator: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> Result<Vec<Question>, GeneratorError>;
}

/// Used when no API key is configured.
pub struct DisabledGenerator;

#[async_trait]
impl QuestionGenerator for DisabledGenerator {
    async fn generate(&self, _request: &GenerationRequest) -> Result<Vec<Question>, GeneratorError> {
        Err(GeneratorError::Disabled)
    }
}

/// Question shape requested from the model.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawQuestion {
    text: String,
    options: Vec<String>,
    #[serde(alias = "correct_answer")]
    correct_answer: i64,
}

/// Client for the Gemini `generateContent` REST endpoint.
pub struct GeminiGenerator {
    client: Client,
    api_key: String,
    endpoint: Url,
}

impl GeminiGenerator {
    pub fn new(api_key: String, base_url: &Url, model: &str) -> Result<Self, GeneratorError> {
        let endpoint = base_url
            .join(&format!("models/{}:generateContent", model))
            .map_err(|e| GeneratorError::Malformed(format!("bad Gemini endpoint: {}", e)))?;
        let client = Client::builder().timeout(Duration::from_secs(60)).build()?;
        Ok(Self {
            client,
            api_key,
            endpoint,
        })
    }

    fn payload(request: &GenerationRequest) -> JsonValue {
        let prompt = format!(
            "Generate {} multiple choice questions about \"{}\" for {} students.\n\
             Context: {}.\n\
             Make questions appropriate for their academic level. Each question has exactly \
             four options and `correctAnswer` is the 0-based index of the right option; vary \
             that index across questions.",
            request.count, request.topic, request.cohort, request.description
        );

        json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": {
                    "type": "ARRAY",
                    "items": {
                        "type": "OBJECT",
                        "properties": {
                            "text": { "type": "STRING" },
                            "options": { "type": "ARRAY", "items": { "type": "STRING" } },
                            "correctAnswer": { "type": "INTEGER" }
                        },
                        "required": ["text", "options", "correctAnswer"]
                    }
                }
            }
        })
    }
}

#[async_trait]
impl QuestionGenerator for GeminiGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<Vec<Question>, GeneratorError> {
        tracing::info!(
            topic = %request.topic,
            count = request.count,
            "requesting questions from Gemini"
        );

        let response: JsonValue = self
            .client
            .post(self.endpoint.clone())
            .header("x-goog-api-key", &self.api_key)
            .json(&Self::payload(request))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let text = candidate_text(&response)?;
        let questions = accept_generated(text, request.count)?;
        tracing::info!("accepted {} generated questions", questions.len());
        Ok(questions)
    }
}

/// Pulls the first candidate's text out of a `generateContent` response.
fn candidate_text(response: &JsonValue) -> Result<&str, GeneratorError> {
    response
        .pointer("/candidates/0/content/parts/0/text")
        .and_then(JsonValue::as_str)
        .ok_or_else(|| GeneratorError::Malformed("response has no candidate text".to_string()))
}

/// Parses, trims and validates model output. Ids are always re-issued;
/// at most `limit` questions are kept.
pub fn accept_generated(raw_json: &str, limit: usize) -> Result<Vec<Question>, GeneratorError> {
    let raw: Vec<RawQuestion> = serde_json::from_str(raw_json.trim())
        .map_err(|e| GeneratorError::Malformed(e.to_string()))?;
    if raw.is_empty() {
        return Err(GeneratorError::Malformed("no questions returned".to_string()));
    }

    raw.into_iter()
        .take(limit)
        .map(|r| {
            let correct_answer = usize::try_from(r.correct_answer).map_err(|_| {
                QuizError::InvalidArgument(format!("negative answer index {}", r.correct_answer))
            })?;
            let question = Question {
                id: format!("ai-{}", uuid::Uuid::new_v4()),
                text: r.text.trim().to_string(),
                options: r.options.iter().map(|o| o.trim().to_string()).collect(),
                correct_answer,
            };
            validate_question(&question)?;
            Ok(question)
        })
        .collect()
}

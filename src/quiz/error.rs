// src/quiz/error.rs

use thiserror::Error;

/// Failures surfaced by the quiz-taking core.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuizError {
    /// Malformed input: unknown question id, out-of-range option index,
    /// invalid question definition.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Operation attempted in a state that does not allow it.
    #[error("precondition failed: {0}")]
    PreconditionFailed(String),
}

impl QuizError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        QuizError::InvalidArgument(msg.into())
    }

    pub(crate) fn precondition(msg: impl Into<String>) -> Self {
        QuizError::PreconditionFailed(msg.into())
    }
}

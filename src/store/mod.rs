// src/store/mod.rs

//! Persistence boundary. Handlers and the session registry only ever talk to
//! `dyn QuizStore`; the Postgres and in-memory backends are interchangeable.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{
    attempt::{AttemptFilter, QuizAttempt},
    quiz::{Quiz, QuizFilter},
    user::User,
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    /// A uniqueness rule was violated (duplicate id, register number, email).
    #[error("conflict: {0}")]
    Conflict(String),

    /// Anything else; opaque to callers.
    #[error("storage backend error: {0}")]
    Backend(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &err {
            if db.is_unique_violation() {
                return StoreError::Conflict(db.message().to_string());
            }
        }
        StoreError::Backend(err.to_string())
    }
}

#[async_trait]
pub trait QuizStore: Send + Sync {
    /// Appends a finished attempt. Never retried by the caller.
    async fn create_attempt(&self, attempt: &QuizAttempt) -> Result<(), StoreError>;

    /// Attempts matching the filter, oldest first.
    async fn list_attempts(&self, filter: &AttemptFilter) -> Result<Vec<QuizAttempt>, StoreError>;

    /// Stores a quiz with all of its questions atomically.
    async fn create_quiz(&self, quiz: &Quiz) -> Result<(), StoreError>;

    /// Quizzes matching the filter, newest first.
    async fn list_quizzes(&self, filter: &QuizFilter) -> Result<Vec<Quiz>, StoreError>;

    async fn get_quiz(&self, id: &str) -> Result<Option<Quiz>, StoreError>;

    /// Returns `false` when no quiz had that id.
    async fn delete_quiz(&self, id: &str) -> Result<bool, StoreError>;

    async fn create_user(&self, user: &User) -> Result<(), StoreError>;

    async fn list_users(&self) -> Result<Vec<User>, StoreError>;

    async fn get_user(&self, id: &str) -> Result<Option<User>, StoreError>;

    /// Looks a user up by register number or email.
    async fn find_user_by_login(&self, key: &str) -> Result<Option<User>, StoreError>;
}

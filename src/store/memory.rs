// src/store/memory.rs

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{
    models::{
        attempt::{AttemptFilter, QuizAttempt},
        quiz::{Quiz, QuizFilter},
        user::User,
    },
    store::{QuizStore, StoreError},
};

#[derive(Debug, Default)]
struct Tables {
    users: Vec<User>,
    quizzes: Vec<Quiz>,
    attempts: Vec<QuizAttempt>,
}

/// Process-local store for tests and `STORE=memory` development runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl QuizStore for MemoryStore {
    async fn create_attempt(&self, attempt: &QuizAttempt) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        if tables.attempts.iter().any(|a| a.id == attempt.id) {
            return Err(StoreError::Conflict(format!(
                "attempt '{}' already exists",
                attempt.id
            )));
        }
        tables.attempts.push(attempt.clone());
        Ok(())
    }

    async fn list_attempts(&self, filter: &AttemptFilter) -> Result<Vec<QuizAttempt>, StoreError> {
        let tables = self.tables.read().await;
        let mut attempts: Vec<QuizAttempt> = tables
            .attempts
            .iter()
            .filter(|a| filter.matches(a))
            .cloned()
            .collect();
        attempts.sort_by(|a, b| a.completed_at.cmp(&b.completed_at));
        Ok(attempts)
    }

    async fn create_quiz(&self, quiz: &Quiz) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        if tables.quizzes.iter().any(|q| q.id == quiz.id) {
            return Err(StoreError::Conflict(format!("quiz '{}' already exists", quiz.id)));
        }
        tables.quizzes.push(quiz.clone());
        Ok(())
    }

    async fn list_quizzes(&self, filter: &QuizFilter) -> Result<Vec<Quiz>, StoreError> {
        let tables = self.tables.read().await;
        let mut quizzes: Vec<Quiz> = tables
            .quizzes
            .iter()
            .filter(|q| filter.cohort.as_ref().is_none_or(|c| *c == q.cohort))
            .cloned()
            .collect();
        quizzes.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(quizzes)
    }

    async fn get_quiz(&self, id: &str) -> Result<Option<Quiz>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.quizzes.iter().find(|q| q.id == id).cloned())
    }

    async fn delete_quiz(&self, id: &str) -> Result<bool, StoreError> {
        let mut tables = self.tables.write().await;
        let before = tables.quizzes.len();
        tables.quizzes.retain(|q| q.id != id);
        Ok(tables.quizzes.len() != before)
    }

    async fn create_user(&self, user: &User) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        let clash = tables.users.iter().any(|u| {
            u.id == user.id
                || (user.register_number.is_some() && u.register_number == user.register_number)
                || (user.email.is_some() && u.email == user.email)
        });
        if clash {
            return Err(StoreError::Conflict("user already exists".to_string()));
        }
        tables.users.push(user.clone());
        Ok(())
    }

    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        Ok(self.tables.read().await.users.clone())
    }

    async fn get_user(&self, id: &str) -> Result<Option<User>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_user_by_login(&self, key: &str) -> Result<Option<User>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .iter()
            .find(|u| u.register_number.as_deref() == Some(key) || u.email.as_deref() == Some(key))
            .cloned())
    }
}

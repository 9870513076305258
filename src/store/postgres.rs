// src/store/postgres.rs

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder, types::Json};

use crate::{
    models::{
        attempt::{AnswerMap, AttemptFilter, QuizAttempt},
        question::Question,
        quiz::{Quiz, QuizFilter},
        user::User,
    },
    store::{QuizStore, StoreError},
};

/// Row of the 'users' table.
#[derive(FromRow)]
struct UserRow {
    id: String,
    name: String,
    email: Option<String>,
    register_number: Option<String>,
    password: String,
    role: String,
    cohort: Option<String>,
}

impl TryFrom<UserRow> for User {
    type Error = StoreError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(User {
            role: row.role.parse().map_err(StoreError::Backend)?,
            id: row.id,
            name: row.name,
            email: row.email,
            register_number: row.register_number,
            cohort: row.cohort,
            password: row.password,
        })
    }
}

#[derive(FromRow)]
struct QuizRow {
    id: String,
    title: String,
    description: String,
    cohort: String,
    duration_minutes: i32,
    max_attempts: i32,
    created_at: DateTime<Utc>,
}

#[derive(FromRow)]
struct QuestionRow {
    id: String,
    quiz_id: String,
    question_text: String,
    options: Json<Vec<String>>,
    correct_answer_index: i32,
}

#[derive(FromRow)]
struct AttemptRow {
    id: String,
    quiz_id: String,
    user_id: String,
    user_name: String,
    score: i32,
    total_questions: i32,
    time_taken_seconds: i64,
    completed_at: DateTime<Utc>,
    answers: Json<AnswerMap>,
}

impl From<AttemptRow> for QuizAttempt {
    fn from(row: AttemptRow) -> Self {
        QuizAttempt {
            id: row.id,
            quiz_id: row.quiz_id,
            user_id: row.user_id,
            user_name: row.user_name,
            score: row.score.max(0) as u32,
            total_questions: row.total_questions.max(0) as u32,
            time_taken: row.time_taken_seconds.max(0) as u64,
            completed_at: row.completed_at,
            answers: row.answers.0,
        }
    }
}

const USER_COLUMNS: &str = "id, name, email, register_number, password, role, cohort";
const QUIZ_COLUMNS: &str =
    "id, title, description, cohort, duration_minutes, max_attempts, created_at";
const ATTEMPT_COLUMNS: &str = "id, quiz_id, user_id, user_name, score, total_questions, \
     time_taken_seconds, completed_at, answers";

/// Postgres-backed store.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Loads the questions of the given quizzes and attaches them in order.
    async fn hydrate(&self, rows: Vec<QuizRow>) -> Result<Vec<Quiz>, StoreError> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<String> = rows.iter().map(|r| r.id.clone()).collect();

        let question_rows = sqlx::query_as::<_, QuestionRow>(
            r#"
            SELECT id, quiz_id, question_text, options, correct_answer_index
            FROM questions
            WHERE quiz_id = ANY($1)
            ORDER BY quiz_id, position
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to fetch questions: {:?}", e);
            StoreError::from(e)
        })?;

        let mut by_quiz: HashMap<String, Vec<Question>> = HashMap::new();
        for q in question_rows {
            by_quiz.entry(q.quiz_id).or_default().push(Question {
                id: q.id,
                text: q.question_text,
                options: q.options.0,
                correct_answer: q.correct_answer_index.max(0) as usize,
            });
        }

        Ok(rows
            .into_iter()
            .map(|r| Quiz {
                questions: by_quiz.remove(&r.id).unwrap_or_default(),
                id: r.id,
                title: r.title,
                description: r.description,
                cohort: r.cohort,
                duration_minutes: r.duration_minutes.max(0) as u32,
                max_attempts: r.max_attempts.max(0) as u32,
                created_at: r.created_at,
            })
            .collect())
    }
}

#[async_trait]
impl QuizStore for PgStore {
    async fn create_attempt(&self, attempt: &QuizAttempt) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO quiz_attempts
            (id, quiz_id, user_id, user_name, score, total_questions, time_taken_seconds, completed_at, answers)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(&attempt.id)
        .bind(&attempt.quiz_id)
        .bind(&attempt.user_id)
        .bind(&attempt.user_name)
        .bind(attempt.score as i32)
        .bind(attempt.total_questions as i32)
        .bind(attempt.time_taken as i64)
        .bind(attempt.completed_at)
        .bind(Json(&attempt.answers))
        .execute(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to insert attempt: {:?}", e);
            StoreError::from(e)
        })?;
        Ok(())
    }

    async fn list_attempts(&self, filter: &AttemptFilter) -> Result<Vec<QuizAttempt>, StoreError> {
        let mut query_builder = QueryBuilder::<Postgres>::new(format!(
            "SELECT {} FROM quiz_attempts WHERE TRUE",
            ATTEMPT_COLUMNS
        ));
        if let Some(user_id) = &filter.user_id {
            query_builder.push(" AND user_id = ").push_bind(user_id.clone());
        }
        if let Some(quiz_id) = &filter.quiz_id {
            query_builder.push(" AND quiz_id = ").push_bind(quiz_id.clone());
        }
        query_builder.push(" ORDER BY completed_at ASC");

        let rows: Vec<AttemptRow> = query_builder
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to list attempts: {:?}", e);
                StoreError::from(e)
            })?;

        Ok(rows.into_iter().map(QuizAttempt::from).collect())
    }

    async fn create_quiz(&self, quiz: &Quiz) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO quizzes
            (id, title, description, cohort, duration_minutes, max_attempts, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(&quiz.id)
        .bind(&quiz.title)
        .bind(&quiz.description)
        .bind(&quiz.cohort)
        .bind(quiz.duration_minutes as i32)
        .bind(quiz.max_attempts as i32)
        .bind(quiz.created_at)
        .execute(&mut *tx)
        .await?;

        for (position, q) in quiz.questions.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO questions
                (id, quiz_id, position, question_text, options, correct_answer_index)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(&q.id)
            .bind(&quiz.id)
            .bind(position as i32)
            .bind(&q.text)
            .bind(Json(&q.options))
            .bind(q.correct_answer as i32)
            .execute(&mut *tx)
            .await?;
        }

        // Dropping `tx` without commit rolls the whole quiz back.
        tx.commit().await?;
        Ok(())
    }

    async fn list_quizzes(&self, filter: &QuizFilter) -> Result<Vec<Quiz>, StoreError> {
        let mut query_builder =
            QueryBuilder::<Postgres>::new(format!("SELECT {} FROM quizzes", QUIZ_COLUMNS));
        if let Some(cohort) = &filter.cohort {
            query_builder.push(" WHERE cohort = ").push_bind(cohort.clone());
        }
        query_builder.push(" ORDER BY created_at DESC");

        let rows: Vec<QuizRow> = query_builder
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to list quizzes: {:?}", e);
                StoreError::from(e)
            })?;

        self.hydrate(rows).await
    }

    async fn get_quiz(&self, id: &str) -> Result<Option<Quiz>, StoreError> {
        let row = sqlx::query_as::<_, QuizRow>(&format!(
            "SELECT {} FROM quizzes WHERE id = $1",
            QUIZ_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(self.hydrate(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn delete_quiz(&self, id: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM quizzes WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn create_user(&self, user: &User) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO users (id, name, email, register_number, password, role, cohort)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(&user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.register_number)
        .bind(&user.password)
        .bind(user.role.as_str())
        .bind(&user.cohort)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users ORDER BY created_at DESC",
            USER_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list users: {:?}", e);
            StoreError::from(e)
        })?;

        rows.into_iter().map(User::try_from).collect()
    }

    async fn get_user(&self, id: &str) -> Result<Option<User>, StoreError> {
        sqlx::query_as::<_, UserRow>(&format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(User::try_from)
            .transpose()
    }

    async fn find_user_by_login(&self, key: &str) -> Result<Option<User>, StoreError> {
        sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users WHERE register_number = $1 OR email = $1 LIMIT 1",
            USER_COLUMNS
        ))
        .bind(key)
        .fetch_optional(&self.pool)
        .await?
        .map(User::try_from)
        .transpose()
    }
}

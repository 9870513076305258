// src/handlers/quiz.rs

use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use validator::Validate;

use crate::{
    config::Config,
    error::AppError,
    generator::{GenerationRequest, QuestionGenerator},
    models::{
        attempt::AttemptFilter,
        question::Question,
        quiz::{CreateQuizRequest, GenerateQuizRequest, PublicQuiz, Quiz, QuizFilter, StudentQuiz},
    },
    quiz::{QuestionSet, report::remaining_attempts},
    store::QuizStore,
    utils::jwt::Claims,
};

/// Lists quizzes. Students only ever see their own cohort, without answers,
/// along with how many attempts they have left on each.
#[utoipa::path(
    get,
    path = "/api/quizzes",
    tag = "Quizzes",
    params(QuizFilter),
    responses(
        (status = 200, description = "Quizzes (answers hidden for students)", body = Vec<StudentQuiz>),
        (status = 403, description = "Student asked for another cohort")
    ),
    security(("jwt" = []))
)]
pub async fn list_quizzes(
    State(store): State<Arc<dyn QuizStore>>,
    Extension(claims): Extension<Claims>,
    Query(filter): Query<QuizFilter>,
) -> Result<Response, AppError> {
    if claims.is_admin() {
        let quizzes = store.list_quizzes(&filter).await?;
        return Ok(Json(quizzes).into_response());
    }

    let own = claims
        .cohort
        .clone()
        .ok_or_else(|| AppError::Forbidden("Account has no class assigned".to_string()))?;
    if filter.cohort.as_ref().is_some_and(|c| *c != own) {
        return Err(AppError::Forbidden(
            "Students can only list quizzes for their own class".to_string(),
        ));
    }

    let quizzes = store
        .list_quizzes(&QuizFilter { cohort: Some(own) })
        .await?;
    let attempts = store
        .list_attempts(&AttemptFilter {
            user_id: Some(claims.sub.clone()),
            quiz_id: None,
        })
        .await?;
    let listed: Vec<StudentQuiz> = quizzes
        .iter()
        .map(|q| StudentQuiz {
            quiz: PublicQuiz::from(q),
            attempts_left: remaining_attempts(q, &attempts, &claims.sub),
        })
        .collect();

    Ok(Json(listed).into_response())
}

/// Validates the questions as a set and stores the quiz.
async fn store_quiz(store: &dyn QuizStore, quiz: Quiz) -> Result<Quiz, AppError> {
    QuestionSet::new(quiz.questions.clone())?;
    store.create_quiz(&quiz).await?;
    tracing::info!(
        quiz_id = %quiz.id,
        cohort = %quiz.cohort,
        questions = quiz.questions.len(),
        "quiz created"
    );
    Ok(quiz)
}

/// Creates a hand-authored quiz.
/// Admin only.
#[utoipa::path(
    post,
    path = "/api/quizzes",
    tag = "Quizzes",
    request_body = CreateQuizRequest,
    responses(
        (status = 201, description = "Quiz created", body = Quiz),
        (status = 400, description = "Invalid quiz")
    ),
    security(("jwt" = []))
)]
pub async fn create_quiz(
    State(store): State<Arc<dyn QuizStore>>,
    Json(payload): Json<CreateQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let quiz = Quiz {
        id: uuid::Uuid::new_v4().to_string(),
        title: payload.title.trim().to_string(),
        description: payload.description.trim().to_string(),
        cohort: payload.cohort.trim().to_string(),
        questions: payload
            .questions
            .into_iter()
            .map(|q| q.into_question())
            .collect(),
        duration_minutes: payload.duration_minutes,
        max_attempts: payload.max_attempts,
        created_at: Utc::now(),
    };

    let quiz = store_quiz(store.as_ref(), quiz).await?;
    Ok((StatusCode::CREATED, Json(quiz)))
}

/// Asks the AI generator for questions and stores the result as a quiz.
/// Admin only.
#[utoipa::path(
    post,
    path = "/api/quizzes/generate",
    tag = "Quizzes",
    request_body = GenerateQuizRequest,
    responses(
        (status = 201, description = "Quiz generated", body = Quiz),
        (status = 502, description = "AI output unusable"),
        (status = 503, description = "AI generation not configured")
    ),
    security(("jwt" = []))
)]
pub async fn generate_quiz(
    State(store): State<Arc<dyn QuizStore>>,
    State(config): State<Config>,
    State(generator): State<Arc<dyn QuestionGenerator>>,
    Json(payload): Json<GenerateQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    if payload.count > config.max_ai_questions {
        return Err(AppError::BadRequest(format!(
            "At most {} questions can be generated at once",
            config.max_ai_questions
        )));
    }

    let request = GenerationRequest {
        topic: payload.title.trim().to_string(),
        description: payload.description.trim().to_string(),
        count: payload.count,
        cohort: payload.cohort.trim().to_string(),
    };
    let questions: Vec<Question> = generator.generate(&request).await?;

    let quiz = Quiz {
        id: uuid::Uuid::new_v4().to_string(),
        title: request.topic.clone(),
        description: request.description.clone(),
        cohort: request.cohort,
        questions,
        duration_minutes: payload.duration_minutes,
        max_attempts: payload.max_attempts,
        created_at: Utc::now(),
    };

    let quiz = store_quiz(store.as_ref(), quiz).await?;
    Ok((StatusCode::CREATED, Json(quiz)))
}

/// Deletes a quiz and its questions. Recorded attempts are kept.
/// Admin only.
#[utoipa::path(
    delete,
    path = "/api/quizzes/{id}",
    tag = "Quizzes",
    params(("id" = String, Path, description = "Quiz id")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Quiz not found")
    ),
    security(("jwt" = []))
)]
pub async fn delete_quiz(
    State(store): State<Arc<dyn QuizStore>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    if !store.delete_quiz(&id).await? {
        return Err(AppError::NotFound("Quiz not found".to_string()));
    }

    tracing::info!(quiz_id = %id, "quiz deleted");
    Ok(StatusCode::NO_CONTENT)
}

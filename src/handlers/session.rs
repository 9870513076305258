// src/handlers/session.rs

//! Live quiz sessions. Every route acts on behalf of the session's owner.

use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use validator::Validate;

use crate::{
    error::AppError,
    models::session::{AnswerRequest, StartSessionRequest},
    quiz::{SessionRegistry, SessionView},
    store::QuizStore,
    utils::jwt::Claims,
};

/// Starts a session for a quiz in the student's own class.
#[utoipa::path(
    post,
    path = "/api/sessions",
    tag = "Sessions",
    request_body = StartSessionRequest,
    responses(
        (status = 201, description = "Session started", body = SessionView),
        (status = 403, description = "Quiz belongs to another class"),
        (status = 404, description = "Quiz not found"),
        (status = 409, description = "No attempts left")
    ),
    security(("jwt" = []))
)]
pub async fn start_session(
    State(store): State<Arc<dyn QuizStore>>,
    State(sessions): State<SessionRegistry>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<StartSessionRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    if claims.is_admin() {
        return Err(AppError::Forbidden(
            "Only students can take quizzes".to_string(),
        ));
    }

    let quiz = store
        .get_quiz(&payload.quiz_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Quiz not found".to_string()))?;

    let user = store
        .get_user(&claims.sub)
        .await?
        .ok_or_else(|| AppError::AuthError("Account no longer exists".to_string()))?;

    if user.cohort.as_deref() != Some(quiz.cohort.as_str()) {
        return Err(AppError::Forbidden(
            "This quiz is not assigned to your class".to_string(),
        ));
    }

    let view = sessions.start(quiz, user, Utc::now()).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

#[utoipa::path(
    get,
    path = "/api/sessions/{id}",
    tag = "Sessions",
    params(("id" = String, Path, description = "Session id")),
    responses(
        (status = 200, description = "Current session state", body = SessionView),
        (status = 404, description = "Unknown session")
    ),
    security(("jwt" = []))
)]
pub async fn get_session(
    State(sessions): State<SessionRegistry>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> Result<Json<SessionView>, AppError> {
    Ok(Json(sessions.view(&id, &claims.sub).await?))
}

#[utoipa::path(
    post,
    path = "/api/sessions/{id}/answer",
    tag = "Sessions",
    params(("id" = String, Path, description = "Session id")),
    request_body = AnswerRequest,
    responses(
        (status = 200, description = "Answer recorded", body = SessionView),
        (status = 400, description = "Unknown question or option"),
        (status = 409, description = "Session is not active")
    ),
    security(("jwt" = []))
)]
pub async fn select_answer(
    State(sessions): State<SessionRegistry>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
    Json(payload): Json<AnswerRequest>,
) -> Result<Json<SessionView>, AppError> {
    payload.validate()?;
    let view = sessions
        .select_answer(&id, &claims.sub, &payload.question_id, payload.option_index)
        .await?;
    Ok(Json(view))
}

/// Moves to the next question. The current one must be answered first.
#[utoipa::path(
    post,
    path = "/api/sessions/{id}/advance",
    tag = "Sessions",
    params(("id" = String, Path, description = "Session id")),
    responses(
        (status = 200, description = "Moved forward", body = SessionView),
        (status = 409, description = "Unanswered, last question, or not active")
    ),
    security(("jwt" = []))
)]
pub async fn advance(
    State(sessions): State<SessionRegistry>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> Result<Json<SessionView>, AppError> {
    Ok(Json(sessions.advance(&id, &claims.sub).await?))
}

#[utoipa::path(
    post,
    path = "/api/sessions/{id}/retreat",
    tag = "Sessions",
    params(("id" = String, Path, description = "Session id")),
    responses(
        (status = 200, description = "Moved back", body = SessionView),
        (status = 409, description = "First question, or not active")
    ),
    security(("jwt" = []))
)]
pub async fn retreat(
    State(sessions): State<SessionRegistry>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> Result<Json<SessionView>, AppError> {
    Ok(Json(sessions.retreat(&id, &claims.sub).await?))
}

/// Scores the session. A failed write still returns the score, flagged in
/// `persistence`.
#[utoipa::path(
    post,
    path = "/api/sessions/{id}/submit",
    tag = "Sessions",
    params(("id" = String, Path, description = "Session id")),
    responses(
        (status = 200, description = "Session completed", body = SessionView),
        (status = 409, description = "Session is not active")
    ),
    security(("jwt" = []))
)]
pub async fn submit(
    State(sessions): State<SessionRegistry>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> Result<Json<SessionView>, AppError> {
    Ok(Json(sessions.submit(&id, &claims.sub, Utc::now()).await?))
}

#[utoipa::path(
    post,
    path = "/api/sessions/{id}/abort",
    tag = "Sessions",
    params(("id" = String, Path, description = "Session id")),
    responses(
        (status = 200, description = "Session discarded", body = SessionView),
        (status = 409, description = "Session is not active")
    ),
    security(("jwt" = []))
)]
pub async fn abort(
    State(sessions): State<SessionRegistry>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> Result<Json<SessionView>, AppError> {
    Ok(Json(sessions.abort(&id, &claims.sub).await?))
}

/// Retries storing a completed session's attempt.
#[utoipa::path(
    post,
    path = "/api/sessions/{id}/persist",
    tag = "Sessions",
    params(("id" = String, Path, description = "Session id")),
    responses(
        (status = 200, description = "Persistence outcome", body = SessionView),
        (status = 409, description = "Session has not completed")
    ),
    security(("jwt" = []))
)]
pub async fn persist(
    State(sessions): State<SessionRegistry>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> Result<Json<SessionView>, AppError> {
    Ok(Json(sessions.persist(&id, &claims.sub).await?))
}

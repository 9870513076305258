// src/handlers/attempt.rs

use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Query, State},
};

use crate::{
    error::AppError,
    models::attempt::{AttemptFilter, QuizAttempt},
    quiz::report::student_history,
    store::QuizStore,
    utils::jwt::Claims,
};

/// Lists stored attempts, newest first. Students only see their own.
#[utoipa::path(
    get,
    path = "/api/attempts",
    tag = "Attempts",
    params(AttemptFilter),
    responses(
        (status = 200, description = "Attempts", body = Vec<QuizAttempt>),
        (status = 403, description = "Student asked for someone else's attempts")
    ),
    security(("jwt" = []))
)]
pub async fn list_attempts(
    State(store): State<Arc<dyn QuizStore>>,
    Extension(claims): Extension<Claims>,
    Query(mut filter): Query<AttemptFilter>,
) -> Result<Json<Vec<QuizAttempt>>, AppError> {
    if !claims.is_admin() {
        if filter.user_id.as_ref().is_some_and(|id| *id != claims.sub) {
            return Err(AppError::Forbidden(
                "Students can only view their own attempts".to_string(),
            ));
        }
        filter.user_id = Some(claims.sub.clone());
    }

    let mut attempts = store.list_attempts(&filter).await?;
    attempts.sort_by(|a, b| b.completed_at.cmp(&a.completed_at));

    Ok(Json(attempts))
}

/// Attempts of one user, newest first.
pub(crate) async fn history_of(
    store: &dyn QuizStore,
    user_id: &str,
) -> Result<Vec<QuizAttempt>, AppError> {
    let attempts = store
        .list_attempts(&AttemptFilter {
            user_id: Some(user_id.to_string()),
            quiz_id: None,
        })
        .await?;
    Ok(student_history(&attempts, user_id))
}

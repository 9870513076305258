// src/handlers/admin.rs

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::IntoResponse,
};
use chrono::Utc;
use serde::Deserialize;
use utoipa::IntoParams;

use crate::{
    error::AppError,
    export::render_report_xlsx,
    handlers::{attempt::history_of, auth::new_user},
    models::{
        attempt::{AttemptFilter, QuizAttempt},
        quiz::QuizFilter,
        user::{CreateUserRequest, Role, User},
    },
    quiz::{ReportRow, build_report},
    store::QuizStore,
};

/// Lists all users in the system.
/// Admin only.
#[utoipa::path(
    get,
    path = "/api/admin/users",
    tag = "Admin",
    responses((status = 200, description = "All users", body = Vec<User>)),
    security(("jwt" = []))
)]
pub async fn list_users(
    State(store): State<Arc<dyn QuizStore>>,
) -> Result<Json<Vec<User>>, AppError> {
    Ok(Json(store.list_users().await?))
}

/// Creates a user with an explicit role (defaults to STUDENT).
/// Admin only.
#[utoipa::path(
    post,
    path = "/api/admin/users",
    tag = "Admin",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created", body = User),
        (status = 409, description = "Register number or email already in use")
    ),
    security(("jwt" = []))
)]
pub async fn create_user(
    State(store): State<Arc<dyn QuizStore>>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    let role = payload.role.unwrap_or(Role::Student);
    let user = new_user(payload, role)?;
    store.create_user(&user).await?;

    tracing::info!(user_id = %user.id, role = %user.role, "user created by admin");
    Ok((StatusCode::CREATED, Json(user)))
}

/// A single student's attempt history, newest first.
/// Admin only.
#[utoipa::path(
    get,
    path = "/api/admin/users/{id}/attempts",
    tag = "Admin",
    params(("id" = String, Path, description = "User id")),
    responses(
        (status = 200, description = "Attempt history", body = Vec<QuizAttempt>),
        (status = 404, description = "User not found")
    ),
    security(("jwt" = []))
)]
pub async fn user_attempts(
    State(store): State<Arc<dyn QuizStore>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<QuizAttempt>>, AppError> {
    store
        .get_user(&id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    Ok(Json(history_of(store.as_ref(), &id).await?))
}

/// Query string for reports. An empty cohort or "All" means no filter.
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct ReportQuery {
    pub cohort: Option<String>,
}

impl ReportQuery {
    fn cohort(&self) -> Option<&str> {
        self.cohort
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty() && !c.eq_ignore_ascii_case("all"))
    }
}

async fn report_rows(store: &dyn QuizStore, query: &ReportQuery) -> Result<Vec<ReportRow>, AppError> {
    let attempts = store.list_attempts(&AttemptFilter::default()).await?;
    let users = store.list_users().await?;
    let quizzes = store.list_quizzes(&QuizFilter::default()).await?;

    Ok(build_report(&attempts, &users, &quizzes, query.cohort()))
}

/// Results joined with students and quizzes, optionally for one class.
/// Admin only.
#[utoipa::path(
    get,
    path = "/api/admin/reports",
    tag = "Admin",
    params(ReportQuery),
    responses((status = 200, description = "Report rows", body = Vec<ReportRow>)),
    security(("jwt" = []))
)]
pub async fn report(
    State(store): State<Arc<dyn QuizStore>>,
    Query(query): Query<ReportQuery>,
) -> Result<Json<Vec<ReportRow>>, AppError> {
    Ok(Json(report_rows(store.as_ref(), &query).await?))
}

/// Same rows as `report`, as an Excel download.
/// Admin only.
#[utoipa::path(
    get,
    path = "/api/admin/reports/export",
    tag = "Admin",
    params(ReportQuery),
    responses((status = 200, description = "XLSX workbook download")),
    security(("jwt" = []))
)]
pub async fn export_report(
    State(store): State<Arc<dyn QuizStore>>,
    Query(query): Query<ReportQuery>,
) -> Result<impl IntoResponse, AppError> {
    let rows = report_rows(store.as_ref(), &query).await?;
    let bytes = render_report_xlsx(&rows)?;

    let label: String = query
        .cohort()
        .unwrap_or("all")
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    let filename = format!(
        "quiz_results_{}_{}.xlsx",
        label,
        Utc::now().format("%Y-%m-%d")
    );
    tracing::info!(rows = rows.len(), %filename, "report exported");

    Ok((
        [
            (
                header::CONTENT_TYPE,
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet".to_string(),
            ),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        bytes,
    ))
}

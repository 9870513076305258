// src/handlers/auth.rs

use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde_json::json;
use validator::Validate;

use crate::{
    config::Config,
    error::AppError,
    models::user::{CreateUserRequest, LoginRequest, LoginResponse, Role, User},
    store::QuizStore,
    utils::{
        hash::{hash_password, verify_password},
        jwt::sign_jwt,
    },
};

/// Builds a user from a validated request. Students must carry a cohort.
pub(crate) fn new_user(payload: CreateUserRequest, role: Role) -> Result<User, AppError> {
    payload.validate()?;

    let cohort = payload
        .cohort
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty());
    if role == Role::Student && cohort.is_none() {
        return Err(AppError::BadRequest(
            "Class is required for student accounts.".to_string(),
        ));
    }

    Ok(User {
        id: uuid::Uuid::new_v4().to_string(),
        name: payload.name.trim().to_string(),
        email: payload.email.map(|e| e.trim().to_lowercase()),
        register_number: Some(payload.register_number.trim().to_string()),
        role,
        cohort,
        password: hash_password(&payload.password)?,
    })
}

/// Self-registration. Always creates a STUDENT; any requested role is ignored.
#[utoipa::path(
    post,
    path = "/api/auth/register",
    tag = "Auth",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "Student registered"),
        (status = 400, description = "Validation failed"),
        (status = 409, description = "Register number or email already in use")
    )
)]
pub async fn register(
    State(store): State<Arc<dyn QuizStore>>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = new_user(payload, Role::Student)?;
    store.create_user(&user).await?;

    tracing::info!(user_id = %user.id, cohort = ?user.cohort, "student registered");

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Registration successful",
            "id": user.id,
        })),
    ))
}

/// Authenticates by register number or email and returns the profile plus a JWT.
#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "Auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = LoginResponse),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn login(
    State(store): State<Arc<dyn QuizStore>>,
    State(config): State<Config>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let invalid = || AppError::AuthError("Invalid credentials".to_string());

    // Emails are stored lowercased.
    let key = payload.register_number.trim();
    let key = if key.contains('@') {
        key.to_lowercase()
    } else {
        key.to_string()
    };

    let user = store
        .find_user_by_login(&key)
        .await?
        .ok_or_else(invalid)?;

    if !verify_password(&payload.password, &user.password)? {
        tracing::warn!(user_id = %user.id, "login rejected: wrong password");
        return Err(invalid());
    }

    let token = sign_jwt(&user, &config.jwt_secret, config.jwt_expiration)?;

    Ok(Json(LoginResponse { user, token }))
}

// src/handlers/docs.rs

use axum::Json;
use utoipa::{
    Modify, OpenApi,
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
};

use crate::handlers::{admin, attempt, auth, quiz, session};

#[derive(OpenApi)]
#[openapi(
    info(title = "Quiz Administration API"),
    paths(
        auth::register,
        auth::login,
        quiz::list_quizzes,
        quiz::create_quiz,
        quiz::generate_quiz,
        quiz::delete_quiz,
        session::start_session,
        session::get_session,
        session::select_answer,
        session::advance,
        session::retreat,
        session::submit,
        session::abort,
        session::persist,
        attempt::list_attempts,
        admin::list_users,
        admin::create_user,
        admin::user_attempts,
        admin::report,
        admin::export_report,
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Registration and login"),
        (name = "Quizzes", description = "Quiz authoring and listing"),
        (name = "Sessions", description = "Taking a quiz"),
        (name = "Attempts", description = "Stored results"),
        (name = "Admin", description = "Users and reports")
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "jwt",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Serves the generated OpenAPI document.
pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

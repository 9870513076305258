// src/routes.rs

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{delete, get, post},
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{admin, attempt, auth, docs, quiz, session},
    state::AppState,
    utils::jwt::{admin_middleware, auth_middleware},
};

/// Assembles the main application router.
///
/// * Public: auth and the OpenAPI document.
/// * Authenticated: quiz listing, sessions, attempts.
/// * Admin: quiz authoring, users, reports.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin([
            HeaderValue::from_static("http://localhost:5173"),
            HeaderValue::from_static("http://127.0.0.1:5173"),
        ])
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .expose_headers([header::CONTENT_DISPOSITION]);

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login));

    let admin_only = || middleware::from_fn(admin_middleware);

    // Listing is open to every signed-in user; authoring is admin only.
    let quiz_routes = Router::new()
        .route(
            "/",
            get(quiz::list_quizzes).merge(post(quiz::create_quiz).layer(admin_only())),
        )
        .route("/generate", post(quiz::generate_quiz).layer(admin_only()))
        .route("/{id}", delete(quiz::delete_quiz).layer(admin_only()));

    let session_routes = Router::new()
        .route("/", post(session::start_session))
        .route("/{id}", get(session::get_session))
        .route("/{id}/answer", post(session::select_answer))
        .route("/{id}/advance", post(session::advance))
        .route("/{id}/retreat", post(session::retreat))
        .route("/{id}/submit", post(session::submit))
        .route("/{id}/abort", post(session::abort))
        .route("/{id}/persist", post(session::persist));

    let admin_routes = Router::new()
        .route("/users", get(admin::list_users).post(admin::create_user))
        .route("/users/{id}/attempts", get(admin::user_attempts))
        .route("/reports", get(admin::report))
        .route("/reports/export", get(admin::export_report))
        .layer(admin_only());

    // Auth first, then per-group role checks.
    let protected = Router::new()
        .nest("/quizzes", quiz_routes)
        .nest("/sessions", session_routes)
        .route("/attempts", get(attempt::list_attempts))
        .nest("/admin", admin_routes)
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    let api = Router::new()
        .nest("/auth", auth_routes)
        .route("/openapi.json", get(docs::openapi_json))
        .merge(protected);

    Router::new()
        .nest("/api", api)
        // Global Middleware (outermost first)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

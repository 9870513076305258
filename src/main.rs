// src/main.rs

use std::{error::Error, sync::Arc, time::Duration};

use quiz_backend::{
    config::{Config, StoreBackend},
    generator::{DisabledGenerator, GeminiGenerator, QuestionGenerator},
    models::user::{Role, User},
    routes,
    state::AppState,
    store::{MemoryStore, PgStore, QuizStore},
    utils::hash::hash_password,
};
use sqlx::{PgPool, postgres::PgPoolOptions};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Load configuration from environment (.env is read inside)
    let config = Config::from_env()?;

    let file_appender = tracing_appender::rolling::daily("logs", "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let env_filter = EnvFilter::new(&config.rust_log);
    let stdout_layer = fmt::layer().with_writer(std::io::stdout).with_target(false);
    let file_layer = fmt::layer().with_writer(non_blocking).with_ansi(false);

    // Initialize Tracing (Logging)
    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    let store: Arc<dyn QuizStore> = match config.store {
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory store; data is lost on restart.");
            Arc::new(MemoryStore::new())
        }
        StoreBackend::Postgres => {
            let database_url = config
                .database_url
                .as_deref()
                .ok_or("DATABASE_URL is required for the postgres store")?;
            let pool = connect_with_retry(database_url).await?;

            // Run Migrations Automatically
            tracing::info!("Running migrations...");
            sqlx::migrate!("./migrations").run(&pool).await?;
            tracing::info!("Migrations applied successfully.");

            Arc::new(PgStore::new(pool))
        }
    };

    if let Err(e) = seed_admin_user(store.as_ref(), &config).await {
        tracing::error!("Failed to seed admin user: {}", e);
    }

    let generator: Arc<dyn QuestionGenerator> = match &config.gemini_api_key {
        Some(key) => {
            tracing::info!(model = %config.gemini_model, "AI question generation enabled");
            Arc::new(GeminiGenerator::new(
                key.clone(),
                &config.gemini_base_url,
                &config.gemini_model,
            )?)
        }
        None => {
            tracing::info!("GEMINI_API_KEY not set; AI question generation disabled");
            Arc::new(DisabledGenerator)
        }
    };

    let addr = config.bind_addr;
    let state = AppState::new(store, config, generator);
    let _janitor = state.sessions.spawn_janitor();
    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Listening on {}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}

async fn connect_with_retry(database_url: &str) -> Result<PgPool, sqlx::Error> {
    let mut retry_count = 0;
    loop {
        match PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect(database_url)
            .await
        {
            Ok(pool) => {
                tracing::info!("Database connected.");
                return Ok(pool);
            }
            Err(e) if retry_count < 5 => {
                retry_count += 1;
                tracing::warn!(
                    "Database not ready, retrying in 2s... (Attempt {}): {}",
                    retry_count,
                    e
                );
                tokio::time::sleep(Duration::from_secs(2)).await;
            }
            Err(e) => return Err(e),
        }
    }
}

async fn seed_admin_user(store: &dyn QuizStore, config: &Config) -> Result<(), Box<dyn Error>> {
    let (Some(email), Some(password)) = (&config.admin_email, &config.admin_password) else {
        return Ok(());
    };
    let email = email.trim().to_lowercase();

    if store.find_user_by_login(&email).await?.is_some() {
        return Ok(());
    }

    tracing::info!("Seeding admin user: {}", email);
    store
        .create_user(&User {
            id: uuid::Uuid::new_v4().to_string(),
            name: "Administrator".to_string(),
            email: Some(email),
            register_number: None,
            role: Role::Admin,
            cohort: None,
            password: hash_password(password)?,
        })
        .await?;
    tracing::info!("Admin user created successfully.");
    Ok(())
}

// src/state.rs

use std::sync::Arc;

use axum::extract::FromRef;

use crate::{
    config::Config, generator::QuestionGenerator, quiz::SessionRegistry, store::QuizStore,
};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn QuizStore>,
    pub config: Config,
    pub sessions: SessionRegistry,
    pub generator: Arc<dyn QuestionGenerator>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn QuizStore>,
        config: Config,
        generator: Arc<dyn QuestionGenerator>,
    ) -> Self {
        Self {
            sessions: SessionRegistry::new(store.clone()),
            store,
            config,
            generator,
        }
    }
}

impl FromRef<AppState> for Arc<dyn QuizStore> {
    fn from_ref(state: &AppState) -> Self {
        state.store.clone()
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}

impl FromRef<AppState> for SessionRegistry {
    fn from_ref(state: &AppState) -> Self {
        state.sessions.clone()
    }
}

impl FromRef<AppState> for Arc<dyn QuestionGenerator> {
    fn from_ref(state: &AppState) -> Self {
        state.generator.clone()
    }
}

// src/quiz/registry.rs

use std::{
    collections::HashMap,
    ops::ControlFlow,
    sync::{Arc, Weak},
    time::Duration,
};

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tokio::{
    sync::{Mutex, RwLock},
    time::Instant,
};
use utoipa::ToSchema;

use crate::{
    models::{
        attempt::{AnswerMap, AttemptFilter, QuizAttempt},
        question::PublicQuestion,
        quiz::Quiz,
        user::User,
    },
    quiz::{
        error::QuizError,
        report::remaining_attempts,
        session::{SessionPhase, SessionState},
        timer::{TimerHandle, spawn_countdown},
    },
    store::{QuizStore, StoreError},
};

const TICK_PERIOD: Duration = Duration::from_secs(1);
const JANITOR_PERIOD: Duration = Duration::from_secs(60);

/// How long a completed, stored session stays readable.
pub const SETTLED_TTL: Duration = Duration::from_secs(10 * 60);

/// How long a completed session whose attempt could not be stored waits for
/// a retry before it is dropped.
pub const UNSAVED_TTL: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("session '{0}' not found")]
    NotFound(String),

    #[error("session belongs to another user")]
    NotOwner,

    #[error(transparent)]
    Quiz(#[from] QuizError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Durability of a completed session's attempt. Scoring is final locally
/// whatever this says.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PersistStatus {
    Pending,
    Saved,
    Failed { reason: String },
}

/// A running (or finished, not yet evicted) session.
pub struct LiveSession {
    id: String,
    state: SessionState,
    timer: Option<TimerHandle>,
    persist: PersistStatus,
    finished_at: Option<Instant>,
}

impl LiveSession {
    fn release_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.cancel();
        }
    }

    fn is_settled(&self) -> bool {
        self.state.phase().is_terminal() && self.persist == PersistStatus::Saved
    }

    /// Running sessions and completed-but-unsaved ones use up an attempt.
    fn holds_attempt(&self) -> bool {
        match self.state.phase() {
            SessionPhase::Active | SessionPhase::Submitting => true,
            SessionPhase::Completed => self.persist != PersistStatus::Saved,
            SessionPhase::Aborted => false,
        }
    }
}

/// What clients see of a session. Correct answers stay hidden until the
/// session completes.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub session_id: String,
    pub quiz_id: String,
    pub quiz_title: String,
    pub phase: SessionPhase,
    pub position: usize,
    pub total_questions: usize,
    pub answered: usize,
    pub questions: Vec<PublicQuestion>,
    pub current_question: Option<PublicQuestion>,
    #[schema(value_type = Object)]
    pub answers: AnswerMap,
    pub time_remaining: u64,
    pub started_at: DateTime<Utc>,
    pub attempt: Option<QuizAttempt>,
    pub persistence: PersistStatus,
}

impl From<&LiveSession> for SessionView {
    fn from(live: &LiveSession) -> Self {
        let state = &live.state;
        Self {
            session_id: live.id.clone(),
            quiz_id: state.quiz().id.clone(),
            quiz_title: state.quiz().title.clone(),
            phase: state.phase(),
            position: state.position(),
            total_questions: state.questions().len(),
            answered: state.answered_count(),
            questions: state.questions().iter().map(PublicQuestion::from).collect(),
            current_question: state.current_question().map(PublicQuestion::from),
            answers: state.answers().clone(),
            time_remaining: state.time_remaining(),
            started_at: state.started_at(),
            attempt: state.attempt().cloned(),
            persistence: live.persist.clone(),
        }
    }
}

struct Entry {
    user_id: String,
    quiz_id: String,
    session: Arc<Mutex<LiveSession>>,
}

type StartKey = (String, String);

/// Owns every live session. Each session sits behind its own mutex so
/// operations on one session are serialised while sessions stay independent.
///
/// The map lock is only held for lookups and edits, never across a session
/// lock or a store call. Starts for the same user and quiz queue on a
/// dedicated gate so the attempt budget is checked one start at a time.
#[derive(Clone)]
pub struct SessionRegistry {
    sessions: Arc<RwLock<HashMap<String, Entry>>>,
    starting: Arc<Mutex<HashMap<StartKey, Arc<Mutex<()>>>>>,
    store: Arc<dyn QuizStore>,
}

impl SessionRegistry {
    pub fn new(store: Arc<dyn QuizStore>) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            starting: Arc::new(Mutex::new(HashMap::new())),
            store,
        }
    }

    /// Starts a session once the attempt budget allows it and arms its countdown.
    pub async fn start(
        &self,
        quiz: Quiz,
        user: User,
        now: DateTime<Utc>,
    ) -> Result<SessionView, RegistryError> {
        let key = (user.id.clone(), quiz.id.clone());
        let gate = self
            .starting
            .lock()
            .await
            .entry(key.clone())
            .or_default()
            .clone();

        let result = {
            let _turn = gate.lock().await;
            self.start_gated(quiz, user, now).await
        };

        drop(gate);
        let mut starting = self.starting.lock().await;
        if starting.get(&key).is_some_and(|g| Arc::strong_count(g) == 1) {
            starting.remove(&key);
        }
        result
    }

    async fn start_gated(
        &self,
        quiz: Quiz,
        user: User,
        now: DateTime<Utc>,
    ) -> Result<SessionView, RegistryError> {
        let own: Vec<(String, bool, Arc<Mutex<LiveSession>>)> = self
            .sessions
            .read()
            .await
            .iter()
            .filter(|(_, e)| e.user_id == user.id)
            .map(|(id, e)| (id.clone(), e.quiz_id == quiz.id, e.session.clone()))
            .collect();

        let mut settled = Vec::new();
        let mut in_flight = 0usize;
        for (id, same_quiz, session) in own {
            let live = session.lock().await;
            if live.is_settled() {
                settled.push(id);
            } else if same_quiz && live.holds_attempt() {
                in_flight += 1;
            }
        }
        if !settled.is_empty() {
            let mut sessions = self.sessions.write().await;
            for id in &settled {
                sessions.remove(id);
            }
        }

        let stored = self
            .store
            .list_attempts(&AttemptFilter {
                user_id: Some(user.id.clone()),
                quiz_id: Some(quiz.id.clone()),
            })
            .await?;
        if remaining_attempts(&quiz, &stored, &user.id) as usize <= in_flight {
            return Err(QuizError::precondition(format!(
                "no attempts left for quiz '{}' (limit {})",
                quiz.id, quiz.max_attempts
            ))
            .into());
        }

        let state = {
            let mut rng = rand::thread_rng();
            SessionState::start(Arc::new(quiz), user, now, &mut rng)?
        };

        let id = uuid::Uuid::new_v4().to_string();
        let user_id = state.user().id.clone();
        let quiz_id = state.quiz().id.clone();
        let session = Arc::new(Mutex::new(LiveSession {
            id: id.clone(),
            state,
            timer: None,
            persist: PersistStatus::Pending,
            finished_at: None,
        }));

        let timer = self.arm_countdown(Arc::downgrade(&session));
        let view = {
            let mut live = session.lock().await;
            live.timer = Some(timer);
            SessionView::from(&*live)
        };

        self.sessions.write().await.insert(
            id.clone(),
            Entry {
                user_id: user_id.clone(),
                quiz_id: quiz_id.clone(),
                session,
            },
        );
        tracing::info!(session_id = %id, %user_id, %quiz_id, "session started");

        Ok(view)
    }

    fn arm_countdown(&self, session: Weak<Mutex<LiveSession>>) -> TimerHandle {
        let store = self.store.clone();
        spawn_countdown(TICK_PERIOD, move || {
            let session = session.clone();
            let store = store.clone();
            async move {
                let Some(session) = session.upgrade() else {
                    return ControlFlow::Break(());
                };
                let mut live = session.lock().await;
                match live.state.tick(TICK_PERIOD.as_secs()) {
                    Some(attempt) => {
                        // Stopping from inside the task: release without aborting ourselves.
                        if let Some(timer) = live.timer.take() {
                            timer.detach();
                        }
                        live.finished_at = Some(Instant::now());
                        live.persist = persist(store.as_ref(), &attempt).await;
                        ControlFlow::Break(())
                    }
                    None if live.state.phase().is_terminal() => ControlFlow::Break(()),
                    None => ControlFlow::Continue(()),
                }
            }
        })
    }

    async fn entry(&self, id: &str) -> Result<Arc<Mutex<LiveSession>>, RegistryError> {
        self.sessions
            .read()
            .await
            .get(id)
            .map(|e| e.session.clone())
            .ok_or_else(|| RegistryError::NotFound(id.to_string()))
    }

    /// Runs a synchronous state-machine operation on an owned session.
    async fn apply<F>(&self, id: &str, user_id: &str, op: F) -> Result<SessionView, RegistryError>
    where
        F: FnOnce(&mut SessionState) -> Result<(), QuizError>,
    {
        let session = self.entry(id).await?;
        let mut live = session.lock().await;
        if live.state.user().id != user_id {
            return Err(RegistryError::NotOwner);
        }
        op(&mut live.state)?;
        Ok(SessionView::from(&*live))
    }

    pub async fn view(&self, id: &str, user_id: &str) -> Result<SessionView, RegistryError> {
        self.apply(id, user_id, |_| Ok(())).await
    }

    pub async fn select_answer(
        &self,
        id: &str,
        user_id: &str,
        question_id: &str,
        option: usize,
    ) -> Result<SessionView, RegistryError> {
        self.apply(id, user_id, |s| s.select_answer(question_id, option))
            .await
    }

    pub async fn advance(&self, id: &str, user_id: &str) -> Result<SessionView, RegistryError> {
        self.apply(id, user_id, |s| s.advance().map(|_| ())).await
    }

    pub async fn retreat(&self, id: &str, user_id: &str) -> Result<SessionView, RegistryError> {
        self.apply(id, user_id, |s| s.retreat().map(|_| ())).await
    }

    /// Scores the session, stops its countdown and hands the attempt to the
    /// store once. A store failure is reported in the view, never as an error.
    pub async fn submit(
        &self,
        id: &str,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> Result<SessionView, RegistryError> {
        let session = self.entry(id).await?;
        let mut live = session.lock().await;
        if live.state.user().id != user_id {
            return Err(RegistryError::NotOwner);
        }

        let attempt = live.state.submit(now)?;
        live.release_timer();
        live.finished_at = Some(Instant::now());
        tracing::info!(session_id = %id, score = attempt.score, total = attempt.total_questions, "session submitted");

        live.persist = persist(self.store.as_ref(), &attempt).await;
        Ok(SessionView::from(&*live))
    }

    /// Discards the session without producing an attempt.
    pub async fn abort(&self, id: &str, user_id: &str) -> Result<SessionView, RegistryError> {
        let session = self.entry(id).await?;
        let view = {
            let mut live = session.lock().await;
            if live.state.user().id != user_id {
                return Err(RegistryError::NotOwner);
            }
            live.state.abort()?;
            live.release_timer();
            SessionView::from(&*live)
        };

        self.sessions.write().await.remove(id);
        tracing::info!(session_id = %id, "session aborted");
        Ok(view)
    }

    /// Retries storing the attempt of a completed session whose first write
    /// failed. Already-saved sessions are returned unchanged.
    pub async fn persist(&self, id: &str, user_id: &str) -> Result<SessionView, RegistryError> {
        let session = self.entry(id).await?;
        let mut live = session.lock().await;
        if live.state.user().id != user_id {
            return Err(RegistryError::NotOwner);
        }

        let attempt = match live.state.attempt() {
            Some(a) => a.clone(),
            None => {
                return Err(QuizError::precondition("session has not completed").into());
            }
        };
        if live.persist != PersistStatus::Saved {
            live.persist = persist(self.store.as_ref(), &attempt).await;
        }
        Ok(SessionView::from(&*live))
    }

    /// Drops completed sessions that have outlived their grace period:
    /// stored ones after [`SETTLED_TTL`], unstored ones after [`UNSAVED_TTL`].
    /// Sessions busy with another operation are left for the next pass.
    pub async fn prune(&self) -> usize {
        let now = Instant::now();
        let snapshot: Vec<(String, Arc<Mutex<LiveSession>>)> = self
            .sessions
            .read()
            .await
            .iter()
            .map(|(id, e)| (id.clone(), e.session.clone()))
            .collect();

        let mut expired = Vec::new();
        for (id, session) in snapshot {
            let Ok(live) = session.try_lock() else {
                continue;
            };
            let Some(finished_at) = live.finished_at else {
                continue;
            };
            let age = now.saturating_duration_since(finished_at);
            match &live.persist {
                PersistStatus::Saved if age >= SETTLED_TTL => expired.push(id),
                PersistStatus::Failed { reason } if age >= UNSAVED_TTL => {
                    tracing::error!(
                        session_id = %id,
                        attempt_id = live.state.attempt().map(|a| a.id.as_str()).unwrap_or_default(),
                        %reason,
                        "dropping session whose attempt was never stored"
                    );
                    expired.push(id);
                }
                _ => {}
            }
        }

        if !expired.is_empty() {
            let mut sessions = self.sessions.write().await;
            for id in &expired {
                sessions.remove(id);
            }
        }
        expired.len()
    }

    /// Runs [`prune`](Self::prune) once a minute until the handle is dropped.
    pub fn spawn_janitor(&self) -> TimerHandle {
        let registry = self.clone();
        spawn_countdown(JANITOR_PERIOD, move || {
            let registry = registry.clone();
            async move {
                let evicted = registry.prune().await;
                if evicted > 0 {
                    tracing::debug!(evicted, "finished sessions evicted");
                }
                ControlFlow::Continue(())
            }
        })
    }

    /// Number of sessions currently held in memory.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

async fn persist(store: &dyn QuizStore, attempt: &QuizAttempt) -> PersistStatus {
    match store.create_attempt(attempt).await {
        Ok(()) => {
            tracing::info!(attempt_id = %attempt.id, "attempt stored");
            PersistStatus::Saved
        }
        // Attempt ids are unique per session, so a conflict means an earlier write landed.
        Err(StoreError::Conflict(_)) => PersistStatus::Saved,
        Err(e) => {
            tracing::error!(attempt_id = %attempt.id, "failed to store attempt: {}", e);
            PersistStatus::Failed {
                reason: e.to_string(),
            }
        }
    }
}

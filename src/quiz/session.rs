// src/quiz/session.rs

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    models::{
        attempt::{AnswerMap, QuizAttempt},
        question::Question,
        quiz::Quiz,
        user::User,
    },
    quiz::{error::QuizError, question_set::QuestionSet, scorer},
};

/// Lifecycle of a quiz-taking session.
///
/// `Active -> Submitting -> Completed`, or `Active -> Aborted`.
/// `Completed` and `Aborted` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionPhase {
    Active,
    Submitting,
    Completed,
    Aborted,
}

impl SessionPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionPhase::Completed | SessionPhase::Aborted)
    }
}

/// One student's progress through one attempt of a quiz.
///
/// Operations must be applied sequentially; the owner serialises access.
#[derive(Debug, Clone)]
pub struct SessionState {
    quiz: Arc<Quiz>,
    user: User,
    questions: QuestionSet,
    position: usize,
    answers: AnswerMap,
    time_remaining: i64,
    elapsed: u64,
    started_at: DateTime<Utc>,
    phase: SessionPhase,
    attempt: Option<QuizAttempt>,
}

impl SessionState {
    /// Starts a session with a per-session shuffle of the quiz's questions.
    pub fn start<R: Rng + ?Sized>(
        quiz: Arc<Quiz>,
        user: User,
        started_at: DateTime<Utc>,
        rng: &mut R,
    ) -> Result<Self, QuizError> {
        if quiz.duration_minutes == 0 {
            return Err(QuizError::invalid("quiz duration must be positive"));
        }
        let questions = QuestionSet::new(quiz.questions.clone())?.shuffled(rng);
        let time_remaining = i64::from(quiz.duration_minutes) * 60;

        Ok(Self {
            quiz,
            user,
            questions,
            position: 0,
            answers: AnswerMap::new(),
            time_remaining,
            elapsed: 0,
            started_at,
            phase: SessionPhase::Active,
            attempt: None,
        })
    }

    fn ensure_active(&self, op: &str) -> Result<(), QuizError> {
        if self.phase != SessionPhase::Active {
            return Err(QuizError::precondition(format!(
                "cannot {} a session that is {:?}",
                op, self.phase
            )));
        }
        Ok(())
    }

    /// Records (or overwrites) the chosen option for a question.
    pub fn select_answer(&mut self, question_id: &str, option: usize) -> Result<(), QuizError> {
        self.ensure_active("answer in")?;
        let question = self
            .questions
            .find(question_id)
            .ok_or_else(|| QuizError::invalid(format!("unknown question '{}'", question_id)))?;
        if option >= question.options.len() {
            return Err(QuizError::invalid(format!(
                "option {} is out of range for question '{}' ({} options)",
                option,
                question_id,
                question.options.len()
            )));
        }
        self.answers.insert(question_id.to_string(), option);
        Ok(())
    }

    /// Moves to the next question. Forward navigation is blocked until the
    /// current question has an answer.
    pub fn advance(&mut self) -> Result<usize, QuizError> {
        self.ensure_active("advance")?;
        if self.is_last() {
            return Err(QuizError::precondition("already at the last question"));
        }
        let current = &self.questions.as_slice()[self.position];
        if !self.answers.contains_key(&current.id) {
            return Err(QuizError::precondition(format!(
                "question '{}' must be answered before moving on",
                current.id
            )));
        }
        self.position += 1;
        Ok(self.position)
    }

    /// Moves back one question regardless of answer state.
    pub fn retreat(&mut self) -> Result<usize, QuizError> {
        self.ensure_active("retreat in")?;
        if self.position == 0 {
            return Err(QuizError::precondition("already at the first question"));
        }
        self.position -= 1;
        Ok(self.position)
    }

    /// Counts down the timer. Returns the attempt only from the call that
    /// hit zero; sessions that already left `Active` ignore ticks.
    pub fn tick(&mut self, seconds: u64) -> Option<QuizAttempt> {
        if self.phase != SessionPhase::Active {
            return None;
        }
        self.elapsed = self.elapsed.saturating_add(seconds);
        self.time_remaining = self
            .time_remaining
            .saturating_sub(i64::try_from(seconds).unwrap_or(i64::MAX));

        if self.time_remaining > 0 {
            return None;
        }

        let limit = u64::from(self.quiz.duration_minutes) * 60;
        let ran_for = self.elapsed.min(limit);
        let completed_at = self.started_at + Duration::seconds(ran_for as i64);
        tracing::info!(
            quiz_id = %self.quiz.id,
            user_id = %self.user.id,
            "time expired, auto-submitting session"
        );
        Some(self.finish(completed_at))
    }

    /// Explicit submission, allowed from any position.
    pub fn submit(&mut self, completed_at: DateTime<Utc>) -> Result<QuizAttempt, QuizError> {
        self.ensure_active("submit")?;
        // A late submit never records more than the allotted time.
        let deadline = self.started_at + Duration::minutes(i64::from(self.quiz.duration_minutes));
        Ok(self.finish(completed_at.min(deadline)))
    }

    /// Discards the session. No attempt is produced.
    pub fn abort(&mut self) -> Result<(), QuizError> {
        self.ensure_active("abort")?;
        self.phase = SessionPhase::Aborted;
        Ok(())
    }

    fn finish(&mut self, completed_at: DateTime<Utc>) -> QuizAttempt {
        self.phase = SessionPhase::Submitting;
        let attempt = scorer::score(
            &self.questions,
            &self.answers,
            &self.user,
            &self.quiz,
            self.started_at,
            completed_at,
        );
        self.attempt = Some(attempt.clone());
        self.phase = SessionPhase::Completed;
        attempt
    }

    fn is_last(&self) -> bool {
        self.position + 1 >= self.questions.len()
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn current_question(&self) -> Option<&Question> {
        self.questions.get(self.position)
    }

    pub fn questions(&self) -> &QuestionSet {
        &self.questions
    }

    pub fn answer_for(&self, question_id: &str) -> Option<usize> {
        self.answers.get(question_id).copied()
    }

    /// Number of questions with a recorded answer.
    pub fn answered_count(&self) -> usize {
        self.answers.len()
    }

    pub fn answers(&self) -> &AnswerMap {
        &self.answers
    }

    /// Seconds left on the clock, never negative.
    pub fn time_remaining(&self) -> u64 {
        self.time_remaining.max(0) as u64
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn quiz(&self) -> &Quiz {
        &self.quiz
    }

    pub fn user(&self) -> &User {
        &self.user
    }

    /// The attempt produced on completion.
    pub fn attempt(&self) -> Option<&QuizAttempt> {
        self.attempt.as_ref()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::{models::user::Role, quiz::question_set::tests::question};
    use chrono::TimeZone;
    use rand::{SeedableRng, rngs::StdRng};

    pub(crate) fn quiz(correct: &[usize], duration_minutes: u32) -> Arc<Quiz> {
        Arc::new(Quiz {
            id: "quiz-1".into(),
            title: "Networks".into(),
            description: "Layers".into(),
            cohort: "2nd Year".into(),
            questions: correct
                .iter()
                .enumerate()
                .map(|(i, c)| question(&format!("q{}", i + 1), *c))
                .collect(),
            duration_minutes,
            max_attempts: 2,
            created_at: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
        })
    }

    pub(crate) fn student() -> User {
        User {
            id: "u-7".into(),
            name: "Ravi".into(),
            email: None,
            register_number: Some("22CS007".into()),
            role: Role::Student,
            cohort: Some("2nd Year".into()),
            password: String::new(),
        }
    }

    fn start(correct: &[usize], minutes: u32) -> SessionState {
        let mut rng = StdRng::seed_from_u64(3);
        let t0 = Utc.with_ymd_and_hms(2025, 5, 1, 10, 0, 0).unwrap();
        SessionState::start(quiz(correct, minutes), student(), t0, &mut rng).unwrap()
    }

    fn answer_current(s: &mut SessionState, option: usize) {
        let id = s.current_question().unwrap().id.clone();
        s.select_answer(&id, option).unwrap();
    }

    #[test]
    fn starts_active_with_full_clock() {
        let s = start(&[0, 1, 2], 5);
        assert_eq!(s.phase(), SessionPhase::Active);
        assert_eq!(s.position(), 0);
        assert!(s.answers().is_empty());
        assert_eq!(s.time_remaining(), 300);
        assert_eq!(s.questions().len(), 3);
    }

    #[test]
    fn advance_requires_answer_except_nothing_after_last() {
        let mut s = start(&[0, 1, 2], 5);
        assert!(matches!(s.advance(), Err(QuizError::PreconditionFailed(_))));

        answer_current(&mut s, 0);
        assert_eq!(s.advance().unwrap(), 1);

        // Retreat is free even though question 2 is unanswered.
        assert_eq!(s.retreat().unwrap(), 0);
        assert_eq!(s.advance().unwrap(), 1);
        answer_current(&mut s, 1);
        assert_eq!(s.advance().unwrap(), 2);

        // The last question needs no answer to submit, but there is no next one.
        assert!(matches!(s.advance(), Err(QuizError::PreconditionFailed(_))));
    }

    #[test]
    fn retreat_at_start_fails() {
        let mut s = start(&[0, 1], 5);
        assert!(matches!(s.retreat(), Err(QuizError::PreconditionFailed(_))));
    }

    #[test]
    fn select_answer_validates_arguments() {
        let mut s = start(&[0, 1], 5);
        assert!(matches!(
            s.select_answer("nope", 0),
            Err(QuizError::InvalidArgument(_))
        ));
        assert!(matches!(
            s.select_answer("q1", 4),
            Err(QuizError::InvalidArgument(_))
        ));
        s.select_answer("q1", 3).unwrap();
        s.select_answer("q1", 0).unwrap();
        assert_eq!(s.answer_for("q1"), Some(0));
        assert_eq!(s.answer_for("q2"), None);
    }

    #[test]
    fn explicit_submit_scores_and_locks_session() {
        let mut s = start(&[0, 1, 2], 5);
        s.select_answer("q1", 0).unwrap();
        s.select_answer("q2", 1).unwrap();
        s.select_answer("q3", 0).unwrap();

        let done_at = s.started_at() + Duration::seconds(42);
        let attempt = s.submit(done_at).unwrap();
        assert_eq!(attempt.score, 2);
        assert_eq!(attempt.total_questions, 3);
        assert_eq!(attempt.time_taken, 42);
        assert_eq!(s.phase(), SessionPhase::Completed);
        assert_eq!(s.attempt(), Some(&attempt));

        assert!(matches!(s.submit(done_at), Err(QuizError::PreconditionFailed(_))));
        assert!(matches!(s.select_answer("q1", 1), Err(QuizError::PreconditionFailed(_))));
        assert!(matches!(s.abort(), Err(QuizError::PreconditionFailed(_))));
        assert!(s.tick(1).is_none());
    }

    #[test]
    fn timeout_completes_exactly_once() {
        let mut s = start(&[0, 1, 2], 1);
        let mut produced = Vec::new();
        for _ in 0..60 {
            if let Some(a) = s.tick(1) {
                produced.push(a);
            }
        }
        assert_eq!(s.phase(), SessionPhase::Completed);
        assert_eq!(produced.len(), 1);
        assert_eq!(produced[0].time_taken, 60);

        for _ in 0..10 {
            assert!(s.tick(1).is_none());
        }
        assert_eq!(s.attempt().unwrap().id, produced[0].id);
        assert_eq!(s.time_remaining(), 0);
    }

    #[test]
    fn overshooting_tick_is_capped_at_duration() {
        let mut s = start(&[0], 1);
        s.tick(59);
        assert_eq!(s.phase(), SessionPhase::Active);
        let attempt = s.tick(30).unwrap();
        assert_eq!(attempt.time_taken, 60);
    }

    #[test]
    fn late_submit_is_capped_at_duration() {
        let mut s = start(&[0, 1], 1);
        let attempt = s.submit(s.started_at() + Duration::hours(2)).unwrap();
        assert_eq!(attempt.time_taken, 60);
        assert_eq!(attempt.completed_at, s.started_at() + Duration::seconds(60));
    }

    #[test]
    fn answered_count_tracks_distinct_questions() {
        let mut s = start(&[0, 1, 2], 5);
        assert_eq!(s.answered_count(), 0);
        answer_current(&mut s, 0);
        answer_current(&mut s, 2);
        assert_eq!(s.answered_count(), 1);
        s.advance().unwrap();
        answer_current(&mut s, 1);
        assert_eq!(s.answered_count(), 2);
    }

    #[test]
    fn abort_produces_no_attempt() {
        let mut s = start(&[0, 1], 5);
        answer_current(&mut s, 0);
        s.abort().unwrap();
        assert_eq!(s.phase(), SessionPhase::Aborted);
        assert!(s.attempt().is_none());
        assert!(s.tick(600).is_none());
        assert!(matches!(
            s.submit(Utc::now()),
            Err(QuizError::PreconditionFailed(_))
        ));
    }

    #[test]
    fn zero_duration_is_rejected() {
        let mut rng = StdRng::seed_from_u64(0);
        let err = SessionState::start(quiz(&[0], 0), student(), Utc::now(), &mut rng).unwrap_err();
        assert!(matches!(err, QuizError::InvalidArgument(_)));
    }
}

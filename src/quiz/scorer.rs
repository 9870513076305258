// src/quiz/scorer.rs

use chrono::{DateTime, Utc};

use crate::{
    models::{
        attempt::{AnswerMap, QuizAttempt},
        quiz::Quiz,
        user::User,
    },
    quiz::question_set::QuestionSet,
};

/// Number of questions whose recorded answer equals the correct option.
/// Unanswered questions never count.
pub fn count_correct(questions: &QuestionSet, answers: &AnswerMap) -> u32 {
    questions
        .iter()
        .filter(|q| answers.get(&q.id) == Some(&q.correct_answer))
        .count() as u32
}

/// Scores a finished session and builds its attempt record.
///
/// Pure: presentation order does not influence the result and nothing is
/// persisted here. Answers keyed by ids outside `questions` are dropped.
pub fn score(
    questions: &QuestionSet,
    answers: &AnswerMap,
    user: &User,
    quiz: &Quiz,
    started_at: DateTime<Utc>,
    completed_at: DateTime<Utc>,
) -> QuizAttempt {
    let time_taken = (completed_at - started_at).num_seconds().max(0) as u64;

    let recorded: AnswerMap = answers
        .iter()
        .filter(|(id, _)| questions.contains(id))
        .map(|(id, option)| (id.clone(), *option))
        .collect();

    QuizAttempt {
        id: format!("att-{}", uuid::Uuid::new_v4()),
        quiz_id: quiz.id.clone(),
        user_id: user.id.clone(),
        user_name: user.name.clone(),
        score: count_correct(questions, &recorded),
        total_questions: questions.len() as u32,
        time_taken,
        completed_at,
        answers: recorded,
    }
}

// src/quiz/report.rs

use std::collections::HashMap;

use serde::Serialize;
use utoipa::ToSchema;

use crate::models::{attempt::QuizAttempt, quiz::Quiz, user::User};

pub const UNKNOWN_QUIZ: &str = "Unknown Quiz";
pub const NOT_AVAILABLE: &str = "N/A";

/// One tabular result line handed to the export sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReportRow {
    pub student_name: String,
    pub register_number: String,
    pub cohort: String,
    pub quiz_title: String,
    pub score_fraction: String,
    pub time_taken_formatted: String,
    pub completed_at_formatted: String,
}

/// Joins attempts with their users and quizzes.
///
/// A missing user degrades the row to the attempt's own `user_name`; a
/// missing quiz becomes "Unknown Quiz". With a cohort filter, attempts whose
/// user cannot be resolved are left out since membership is unknown.
pub fn build_report(
    attempts: &[QuizAttempt],
    users: &[User],
    quizzes: &[Quiz],
    cohort: Option<&str>,
) -> Vec<ReportRow> {
    let users_by_id: HashMap<&str, &User> = users.iter().map(|u| (u.id.as_str(), u)).collect();
    let quizzes_by_id: HashMap<&str, &Quiz> =
        quizzes.iter().map(|q| (q.id.as_str(), q)).collect();

    attempts
        .iter()
        .filter_map(|attempt| {
            let user = users_by_id.get(attempt.user_id.as_str()).copied();
            if user.is_none() {
                tracing::debug!(attempt_id = %attempt.id, user_id = %attempt.user_id, "attempt references unknown user");
            }

            if let Some(wanted) = cohort {
                let member = user.and_then(|u| u.cohort.as_deref()) == Some(wanted);
                if !member {
                    return None;
                }
            }

            let quiz_title = match quizzes_by_id.get(attempt.quiz_id.as_str()) {
                Some(q) => q.title.clone(),
                None => {
                    tracing::debug!(attempt_id = %attempt.id, quiz_id = %attempt.quiz_id, "attempt references unknown quiz");
                    UNKNOWN_QUIZ.to_string()
                }
            };

            Some(ReportRow {
                student_name: user
                    .map(|u| u.name.clone())
                    .unwrap_or_else(|| attempt.user_name.clone()),
                register_number: user
                    .and_then(|u| u.register_number.clone())
                    .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
                cohort: user
                    .and_then(|u| u.cohort.clone())
                    .or_else(|| cohort.map(str::to_string))
                    .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
                quiz_title,
                score_fraction: format!("{} / {}", attempt.score, attempt.total_questions),
                time_taken_formatted: format_time_taken(attempt.time_taken),
                completed_at_formatted: attempt.completed_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            })
        })
        .collect()
}

/// `125` -> `"2m 5s"`.
pub fn format_time_taken(seconds: u64) -> String {
    format!("{}m {}s", seconds / 60, seconds % 60)
}

/// A student's attempts, newest first.
pub fn student_history(attempts: &[QuizAttempt], user_id: &str) -> Vec<QuizAttempt> {
    let mut history: Vec<QuizAttempt> = attempts
        .iter()
        .filter(|a| a.user_id == user_id)
        .cloned()
        .collect();
    history.sort_by(|a, b| b.completed_at.cmp(&a.completed_at));
    history
}

/// Attempts a user still has on a quiz, floored at zero.
pub fn remaining_attempts(quiz: &Quiz, attempts: &[QuizAttempt], user_id: &str) -> u32 {
    let used = attempts
        .iter()
        .filter(|a| a.quiz_id == quiz.id && a.user_id == user_id)
        .count() as u32;
    quiz.max_attempts.saturating_sub(used)
}

// src/quiz/question_set.rs

use std::{collections::HashSet, sync::Arc};

use rand::{Rng, seq::SliceRandom};

use crate::{models::question::Question, quiz::error::QuizError};

pub const MAX_QUESTION_CHARS: usize = 1000;
pub const MAX_OPTION_CHARS: usize = 500;

/// Checks a single question before it is accepted into a quiz.
///
/// Applied to manual input and to anything the AI generator hands back.
pub fn validate_question(q: &Question) -> Result<(), QuizError> {
    if q.id.trim().is_empty() {
        return Err(QuizError::invalid("question id must not be empty"));
    }
    if q.text.trim().is_empty() {
        return Err(QuizError::invalid(format!("question '{}' has no text", q.id)));
    }
    if q.text.chars().count() > MAX_QUESTION_CHARS {
        return Err(QuizError::invalid(format!(
            "question '{}' is longer than {} characters",
            q.id, MAX_QUESTION_CHARS
        )));
    }
    if q.options.len() < 2 {
        return Err(QuizError::invalid(format!(
            "question '{}' needs at least two options",
            q.id
        )));
    }
    if q.options.iter().any(|o| o.trim().is_empty()) {
        return Err(QuizError::invalid(format!(
            "question '{}' has a blank option",
            q.id
        )));
    }
    if q.options.iter().any(|o| o.chars().count() > MAX_OPTION_CHARS) {
        return Err(QuizError::invalid(format!(
            "question '{}' has an option longer than {} characters",
            q.id, MAX_OPTION_CHARS
        )));
    }
    let distinct: HashSet<&str> = q.options.iter().map(|o| o.trim()).collect();
    if distinct.len() != q.options.len() {
        return Err(QuizError::invalid(format!(
            "question '{}' has duplicate options",
            q.id
        )));
    }
    if q.correct_answer >= q.options.len() {
        return Err(QuizError::invalid(format!(
            "question '{}' marks option {} correct but only has {} options",
            q.id,
            q.correct_answer,
            q.options.len()
        )));
    }
    Ok(())
}

/// Ordered, validated, immutable collection of a quiz's questions.
///
/// Clones share the same backing storage.
#[derive(Debug, Clone, PartialEq)]
pub struct QuestionSet {
    questions: Arc<[Question]>,
}

impl QuestionSet {
    /// Validates every question and rejects empty sets and duplicate ids.
    pub fn new(questions: Vec<Question>) -> Result<Self, QuizError> {
        if questions.is_empty() {
            return Err(QuizError::invalid("a quiz needs at least one question"));
        }

        let mut seen = HashSet::with_capacity(questions.len());
        for q in &questions {
            validate_question(q)?;
            if !seen.insert(q.id.as_str()) {
                return Err(QuizError::invalid(format!("duplicate question id '{}'", q.id)));
            }
        }

        Ok(Self {
            questions: questions.into(),
        })
    }

    /// Returns a uniformly permuted copy (Fisher-Yates via `SliceRandom`).
    pub fn shuffled<R: Rng + ?Sized>(&self, rng: &mut R) -> Self {
        let mut order = self.questions.to_vec();
        order.shuffle(rng);
        Self {
            questions: order.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn get(&self, position: usize) -> Option<&Question> {
        self.questions.get(position)
    }

    pub fn find(&self, id: &str) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.find(id).is_some()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Question> {
        self.questions.iter()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.questions.iter().map(|q| q.id.as_str())
    }

    pub fn as_slice(&self) -> &[Question] {
        &self.questions
    }
}

impl<'a> IntoIterator for &'a QuestionSet {
    type Item = &'a Question;
    type IntoIter = std::slice::Iter<'a, Question>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use rand::{SeedableRng, rngs::StdRng};

    pub(crate) fn question(id: &str, correct: usize) -> Question {
        Question {
            id: id.to_string(),
            text: format!("Question {}", id),
            options: vec!["A".into(), "B".into(), "C".into(), "D".into()],
            correct_answer: correct,
        }
    }

    #[test]
    fn rejects_out_of_bounds_correct_answer() {
        let err = validate_question(&question("q1", 4)).unwrap_err();
        assert!(matches!(err, QuizError::InvalidArgument(_)));
    }

    #[test]
    fn rejects_empty_and_duplicate_sets() {
        assert!(QuestionSet::new(vec![]).is_err());
        assert!(QuestionSet::new(vec![question("q1", 0), question("q1", 1)]).is_err());
    }

    #[test]
    fn shuffle_keeps_every_question_once() {
        let set = QuestionSet::new((0..20).map(|i| question(&format!("q{}", i), i % 4)).collect())
            .unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        let shuffled = set.shuffled(&mut rng);

        assert_eq!(shuffled.len(), set.len());
        let mut a: Vec<_> = set.ids().collect();
        let mut b: Vec<_> = shuffled.ids().collect();
        a.sort();
        b.sort();
        assert_eq!(a, b);
        // The source set is left untouched.
        assert_eq!(set.get(0).unwrap().id, "q0");
    }

    #[test]
    fn shuffle_reaches_every_position() {
        let set = QuestionSet::new(vec![question("a", 0), question("b", 0), question("c", 0)])
            .unwrap();
        let mut rng = StdRng::seed_from_u64(42);
        let mut firsts = HashSet::new();
        for _ in 0..200 {
            firsts.insert(set.shuffled(&mut rng).get(0).unwrap().id.clone());
        }
        assert_eq!(firsts.len(), 3);
    }
}

//! Pure grading of submitted answers against a quiz's question set.
//!
//! No I/O here: the coordinator fetches questions and answers, this module
//! only compares them.

use crate::models::{AnswerValue, Question, QuestionKind, SessionAnswer};

/// Result of grading one question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionResult {
    pub question_id: String,
    pub correct: bool,
    pub points_awarded: i32,
}

/// Aggregate outcome of grading a full submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GradeOutcome {
    pub score: i32,
    pub max_score: i32,
    pub results: Vec<QuestionResult>,
}

/// Grades `answers` against `questions`.
///
/// Rules, per question kind:
/// - `single` / `boolean`: points iff the submitted string equals the first
///   entry of the correct-answer list.
/// - `multiple`: points iff the submitted list and the correct-answer list
///   are equal as sets after dropping empty strings; order does not matter.
/// - `open`: never auto-scored, always 0.
///
/// The first submitted answer referencing a question wins; questions with no
/// matching answer score 0. Max score sums every question's point value
/// regardless of what was answered.
pub fn grade(questions: &[Question], answers: &[SessionAnswer]) -> GradeOutcome {
    let mut score = 0;
    let mut max_score = 0;
    let mut results = Vec::with_capacity(questions.len());

    for question in questions {
        let points = question.effective_points();
        max_score += points;

        let submitted = answers
            .iter()
            .find(|entry| entry.question == question.id)
            .and_then(|entry| entry.answer.as_ref());

        let correct = match submitted {
            Some(value) => is_correct(question, value),
            None => false,
        };

        let awarded = if correct { points } else { 0 };
        score += awarded;
        results.push(QuestionResult {
            question_id: question.id.clone(),
            correct,
            points_awarded: awarded,
        });
    }

    GradeOutcome {
        score,
        max_score,
        results,
    }
}

fn is_correct(question: &Question, answer: &AnswerValue) -> bool {
    match (question.kind, answer) {
        (QuestionKind::Single | QuestionKind::Boolean, AnswerValue::Single(given)) => {
            question.correct_answers.first() == Some(given)
        }
        (QuestionKind::Multiple, AnswerValue::Multiple(given)) => {
            normalized(given) == normalized(&question.correct_answers)
        }
        // Open questions are reviewed by a human, never auto-scored. A value
        // of the wrong shape for the question kind scores 0.
        _ => false,
    }
}

/// Drops empty-string entries and sorts, so comparison is order-insensitive
/// set equality over the non-empty options.
fn normalized(values: &[String]) -> Vec<&str> {
    let mut cleaned: Vec<&str> = values
        .iter()
        .map(String::as_str)
        .filter(|value| !value.is_empty())
        .collect();
    cleaned.sort_unstable();
    cleaned
}

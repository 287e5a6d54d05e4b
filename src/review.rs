use std::collections::BTreeMap;

use crate::quiz::Quiz;

/// What the learner chose for a question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    Answered { index: usize, text: String },
    Unanswered,
}

impl Selection {
    pub fn text(&self) -> Option<&str> {
        match self {
            Selection::Answered { text, .. } => Some(text),
            Selection::Unanswered => None,
        }
    }
}

/// Post-submission feedback for one question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewEntry {
    pub index: usize,
    pub prompt: String,
    pub selected: Selection,
    pub correct_text: String,
    pub is_correct: bool,
}

/// Per-question correctness; an unanswered question never matches.
pub(crate) fn grade(quiz: &Quiz, answers: &BTreeMap<usize, usize>) -> Vec<bool> {
    quiz.questions
        .iter()
        .enumerate()
        .map(|(idx, q)| answers.get(&idx) == Some(&q.correct_answer))
        .collect()
}

pub(crate) fn build(
    quiz: &Quiz,
    answers: &BTreeMap<usize, usize>,
    graded: &[bool],
) -> Vec<ReviewEntry> {
    quiz.questions
        .iter()
        .zip(graded)
        .enumerate()
        .map(|(index, (q, &is_correct))| {
            let selected = match answers.get(&index) {
                Some(&opt) => Selection::Answered {
                    index: opt,
                    text: q.option(opt).unwrap_or_default().to_string(),
                },
                None => Selection::Unanswered,
            };
            ReviewEntry {
                index,
                prompt: q.question.clone(),
                selected,
                correct_text: q.correct_option().unwrap_or_default().to_string(),
                is_correct,
            }
        })
        .collect()
}

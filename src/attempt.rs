use std::collections::BTreeMap;

use crate::error::QuizError;
use crate::quiz::{Question, Quiz};
use crate::review::{self, ReviewEntry};
use crate::util::percentage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum Phase {
    InProgress,
    Finished,
    Completed,
    Cancelled,
}

/// Hand-off payload once the learner closes the review.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptResult {
    pub score: u8,
    pub answers: BTreeMap<usize, usize>,
    pub correct_count: usize,
    pub question_count: usize,
}

/// Outcome of a single engine operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// Still in progress.
    Continuing,
    /// Just submitted, by the learner or by the clock running out.
    Finished { score: u8 },
    /// Review closed; the caller persists the result.
    Completed(AttemptResult),
    /// Abandoned without a result.
    Cancelled,
    /// Not valid in the current phase; nothing changed.
    Rejected,
}

/// One learner's run through a quiz.
///
/// The attempt never performs I/O and never owns a timer: the caller drives
/// [`QuizAttempt::tick`] once per second while the phase is
/// [`Phase::InProgress`] and acts on the returned [`Transition`]s.
#[derive(Debug, Clone)]
pub struct QuizAttempt {
    quiz: Quiz,
    current: usize,
    answers: BTreeMap<usize, usize>,
    remaining_secs: u32,
    phase: Phase,
    graded: Vec<bool>,
    correct_count: usize,
    score: Option<u8>,
}

impl QuizAttempt {
    pub fn new(quiz: Quiz) -> Result<Self, QuizError> {
        if quiz.is_empty() {
            tracing::info!(quiz = %quiz.title, "refusing to start quiz without questions");
            return Err(QuizError::EmptyQuiz);
        }

        let remaining_secs = quiz.effective_time_limit();
        tracing::info!(
            quiz = %quiz.title,
            questions = quiz.question_count(),
            remaining_secs,
            "attempt started"
        );

        Ok(Self {
            quiz,
            current: 0,
            answers: BTreeMap::new(),
            remaining_secs,
            phase: Phase::InProgress,
            graded: Vec::new(),
            correct_count: 0,
            score: None,
        })
    }

    pub fn quiz(&self) -> &Quiz {
        &self.quiz
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_in_progress(&self) -> bool {
        self.phase == Phase::InProgress
    }

    pub fn question_count(&self) -> usize {
        self.quiz.question_count()
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn current_question(&self) -> &Question {
        &self.quiz.questions[self.current]
    }

    pub fn is_last_question(&self) -> bool {
        self.current + 1 == self.question_count()
    }

    pub fn answers(&self) -> &BTreeMap<usize, usize> {
        &self.answers
    }

    pub fn answer_for(&self, question: usize) -> Option<usize> {
        self.answers.get(&question).copied()
    }

    pub fn answered_count(&self) -> usize {
        self.answers.len()
    }

    pub fn remaining_secs(&self) -> u32 {
        self.remaining_secs
    }

    pub fn score(&self) -> Option<u8> {
        self.score
    }

    /// Defined once submitted.
    pub fn correct_count(&self) -> Option<usize> {
        self.score.map(|_| self.correct_count)
    }

    /// Position through the quiz, counting the current question as seen.
    pub fn progress_percent(&self) -> u8 {
        percentage(self.current + 1, self.question_count())
    }

    /// Records (or replaces) the learner's choice for a question.
    ///
    /// # Panics
    ///
    /// Panics if `question` or `option` is out of range; the front-end only
    /// ever offers valid indices.
    pub fn select_answer(&mut self, question: usize, option: usize) -> Transition {
        assert!(
            question < self.question_count(),
            "question index {question} out of range for {} questions",
            self.question_count()
        );
        let options = self.quiz.questions[question].options.len();
        assert!(
            option < options,
            "option index {option} out of range for question {question} with {options} options"
        );

        if self.phase != Phase::InProgress {
            return Transition::Rejected;
        }

        self.answers.insert(question, option);
        tracing::debug!(question, option, "answer selected");
        Transition::Continuing
    }

    /// Moves to `index`, clamped to the question range.
    pub fn go_to_question(&mut self, index: usize) -> Transition {
        if self.phase != Phase::InProgress {
            return Transition::Rejected;
        }
        self.current = index.min(self.question_count() - 1);
        Transition::Continuing
    }

    /// Does nothing on the last question; the caller submits instead.
    pub fn next(&mut self) -> Transition {
        if self.phase != Phase::InProgress {
            return Transition::Rejected;
        }
        if !self.is_last_question() {
            self.current += 1;
        }
        Transition::Continuing
    }

    pub fn previous(&mut self) -> Transition {
        if self.phase != Phase::InProgress {
            return Transition::Rejected;
        }
        self.current = self.current.saturating_sub(1);
        Transition::Continuing
    }

    /// One second of wall-clock time. Reaching zero submits the attempt.
    pub fn tick(&mut self) -> Transition {
        if self.phase != Phase::InProgress {
            return Transition::Rejected;
        }

        self.remaining_secs = self.remaining_secs.saturating_sub(1);
        if self.remaining_secs == 0 {
            tracing::info!(quiz = %self.quiz.title, "time is up, submitting");
            return self.submit();
        }
        Transition::Continuing
    }

    /// Grades the attempt. Only the first call has any effect.
    pub fn submit(&mut self) -> Transition {
        if self.phase != Phase::InProgress {
            return Transition::Rejected;
        }

        self.graded = review::grade(&self.quiz, &self.answers);
        self.correct_count = self.graded.iter().filter(|&&ok| ok).count();
        let score = percentage(self.correct_count, self.question_count());
        self.score = Some(score);
        self.phase = Phase::Finished;

        tracing::info!(
            quiz = %self.quiz.title,
            score,
            correct = self.correct_count,
            questions = self.question_count(),
            "attempt submitted"
        );
        Transition::Finished { score }
    }

    /// Closes the review and yields the result for persistence.
    pub fn finish(&mut self) -> Transition {
        if self.phase != Phase::Finished {
            return Transition::Rejected;
        }
        let Some(score) = self.score else {
            return Transition::Rejected;
        };

        self.phase = Phase::Completed;
        Transition::Completed(AttemptResult {
            score,
            answers: self.answers.clone(),
            correct_count: self.correct_count,
            question_count: self.question_count(),
        })
    }

    /// Abandons an in-progress attempt. Recorded answers are dropped.
    pub fn cancel(&mut self) -> Transition {
        if self.phase != Phase::InProgress {
            return Transition::Rejected;
        }
        self.answers.clear();
        self.phase = Phase::Cancelled;
        tracing::info!(quiz = %self.quiz.title, "attempt cancelled");
        Transition::Cancelled
    }

    /// Per-question feedback; empty until submitted.
    pub fn review(&self) -> Vec<ReviewEntry> {
        match self.phase {
            Phase::Finished | Phase::Completed => {
                review::build(&self.quiz, &self.answers, &self.graded)
            }
            Phase::InProgress | Phase::Cancelled => Vec::new(),
        }
    }
}

use include_dir::{include_dir, Dir};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::QuizError;

static DEMO_DIR: Dir = include_dir!("src/demo");

/// Time limit applied when a quiz has none (or zero) configured.
pub const DEFAULT_TIME_LIMIT_SECS: u32 = 300;

/// A single multiple-choice question.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    /// The prompt shown to the learner.
    pub question: String,
    pub options: Vec<String>,
    /// 0-based index into `options`.
    pub correct_answer: usize,
}

impl Question {
    pub fn new<S: Into<String>>(question: S, options: Vec<&str>, correct_answer: usize) -> Self {
        Self {
            question: question.into(),
            options: options.into_iter().map(String::from).collect(),
            correct_answer,
        }
    }

    pub fn option(&self, idx: usize) -> Option<&str> {
        self.options.get(idx).map(String::as_str)
    }

    pub fn correct_option(&self) -> Option<&str> {
        self.option(self.correct_answer)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Quiz {
    #[serde(default)]
    pub id: Option<String>,
    pub title: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub questions: Vec<Question>,
    #[serde(default)]
    pub time_limit: Option<u32>,
}

impl Quiz {
    pub fn new<S: Into<String>>(title: S, questions: Vec<Question>, time_limit: Option<u32>) -> Self {
        Self {
            id: None,
            title: title.into(),
            content: None,
            questions,
            time_limit,
        }
    }

    /// Seconds the learner gets; a missing or zero limit falls back to the default.
    pub fn effective_time_limit(&self) -> u32 {
        match self.time_limit {
            Some(secs) if secs > 0 => secs,
            _ => DEFAULT_TIME_LIMIT_SECS,
        }
    }

    pub fn question_count(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    /// Checks that every question can actually be answered.
    ///
    /// A quiz with no questions is valid here; it is rejected later when an
    /// attempt is started so the front-end can show a "no questions" view.
    pub fn validate(&self) -> Result<(), QuizError> {
        for (index, q) in self.questions.iter().enumerate() {
            let reason = if q.question.trim().is_empty() {
                Some("prompt is blank".to_string())
            } else if q.options.len() < 2 {
                Some(format!("needs at least 2 options, has {}", q.options.len()))
            } else if q.correct_answer >= q.options.len() {
                Some(format!(
                    "correct answer {} is out of range for {} options",
                    q.correct_answer,
                    q.options.len()
                ))
            } else {
                None
            };

            if let Some(reason) = reason {
                return Err(QuizError::InvalidQuestion {
                    quiz: self.title.clone(),
                    index,
                    reason,
                });
            }
        }
        Ok(())
    }
}

/// A meeting in the course; holds the quizzes published for it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    pub session_number: u32,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub quizzes: Vec<Quiz>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Catalog {
    pub sessions: Vec<Session>,
}

/// A quiz as listed in the picker, with the session it belongs to.
#[derive(Debug, Clone, Copy)]
pub struct QuizEntry<'a> {
    pub session: &'a Session,
    pub quiz: &'a Quiz,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogSummary {
    pub sessions: usize,
    pub quizzes: usize,
    pub questions: usize,
    pub empty_quizzes: usize,
}

// Files may hold a whole catalog or a single quiz.
#[derive(Deserialize)]
#[serde(untagged)]
enum CatalogFile {
    Catalog(Catalog),
    Quiz(Quiz),
}

impl Catalog {
    pub fn from_json_str(json: &str) -> Result<Self, QuizError> {
        let catalog = match serde_json::from_str::<CatalogFile>(json)? {
            CatalogFile::Catalog(catalog) => catalog,
            CatalogFile::Quiz(quiz) => Catalog {
                sessions: vec![Session {
                    id: "standalone".to_string(),
                    session_number: 1,
                    title: quiz.title.clone(),
                    description: None,
                    quizzes: vec![quiz],
                }],
            },
        };

        for quiz in catalog.sessions.iter().flat_map(|s| s.quizzes.iter()) {
            quiz.validate()?;
        }

        Ok(catalog)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, QuizError> {
        let raw = fs::read_to_string(path.as_ref())?;
        let catalog = Self::from_json_str(&raw)?;
        tracing::info!(
            path = %path.as_ref().display(),
            sessions = catalog.sessions.len(),
            "loaded catalog"
        );
        Ok(catalog)
    }

    /// The catalog bundled into the binary.
    pub fn demo() -> Result<Self, QuizError> {
        let raw = DEMO_DIR
            .get_file("catalog.json")
            .and_then(|f| f.contents_utf8())
            .unwrap_or_default();
        Self::from_json_str(raw)
    }

    /// Sessions ordered by their meeting number.
    pub fn list_sessions(&self) -> Vec<&Session> {
        self.sessions
            .iter()
            .sorted_by_key(|s| s.session_number)
            .collect()
    }

    pub fn quiz_entries(&self) -> Vec<QuizEntry<'_>> {
        self.list_sessions()
            .into_iter()
            .flat_map(|session| {
                session
                    .quizzes
                    .iter()
                    .map(move |quiz| QuizEntry { session, quiz })
            })
            .collect()
    }

    pub fn summary(&self) -> CatalogSummary {
        let quizzes = || self.sessions.iter().flat_map(|s| s.quizzes.iter());
        CatalogSummary {
            sessions: self.sessions.len(),
            quizzes: quizzes().count(),
            questions: quizzes().map(Quiz::question_count).sum(),
            empty_quizzes: quizzes().filter(|q| q.is_empty()).count(),
        }
    }

    /// Overrides the time limit of every quiz.
    pub fn apply_time_limit(&mut self, secs: u32) {
        for quiz in self.sessions.iter_mut().flat_map(|s| s.quizzes.iter_mut()) {
            quiz.time_limit = Some(secs);
        }
    }
}

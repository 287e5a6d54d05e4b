use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading quizzes or starting an attempt.
#[derive(Debug, Error)]
pub enum QuizError {
    /// The quiz has no questions, so no attempt can be started.
    #[error("quiz has no questions")]
    EmptyQuiz,

    /// A question is not answerable as authored.
    #[error("quiz \"{quiz}\", question {index}: {reason}")]
    InvalidQuestion {
        quiz: String,
        index: usize,
        reason: String,
    },

    #[error("failed to read catalog: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse catalog: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors surfaced by result store adapters.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors reading or writing the config file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file {} is unreadable: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("failed to encode config: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("config io error: {0}")]
    Io(#[from] std::io::Error),
}

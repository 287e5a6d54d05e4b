// Library surface for headless/integration tests and reuse.
// Keep this lean to avoid coupling to bin-only types in main.rs.
pub mod app_dirs;
pub mod attempt;
pub mod config;
pub mod error;
pub mod logging;
pub mod quiz;
pub mod review;
pub mod runtime;
pub mod store;
pub mod util;

pub use attempt::{AttemptResult, Phase, QuizAttempt, Transition};
pub use error::{ConfigError, QuizError, StoreError};
pub use quiz::{Catalog, Question, Quiz, Session};

use thiserror::Error;

use crate::dom::DomError;
use crate::llm_client::LlmError;
use crate::navigation::NavigationError;

/// Application-level error type.
///
/// Per-field problems never surface here — handlers report them through
/// `FillOutcome` and the dispatcher keeps going. Only failures that end the
/// whole session (navigation, I/O, the driver itself) become an `AppError`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Profile error: {0}")]
    Profile(String),

    #[error("DOM error: {0}")]
    Dom(#[from] DomError),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Navigation error: {0}")]
    Navigation(#[from] NavigationError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

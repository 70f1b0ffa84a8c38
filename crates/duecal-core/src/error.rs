use thiserror::Error;

use crate::task::TaskId;

/// Recoverable failures raised by the pure core.
///
/// Nothing here is fatal: callers surface the message and keep the
/// previous state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    #[error("invalid date {input:?}: {reason}")]
    InvalidDate { input: String, reason: String },

    #[error("{0}")]
    Validation(String),

    #[error("task not found: {0}")]
    NotFound(TaskId),
}

impl CoreError {
    pub fn invalid_date(input: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidDate {
            input: input.into(),
            reason: reason.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}

pub type CoreResult<T> = Result<T, CoreError>;

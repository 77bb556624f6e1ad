use thiserror::Error;

use crate::runner::ExecutionFailure;
use crate::schema::ParameterViolation;

#[derive(Debug, Error)]
pub enum SwitchboardError {
    #[error("not initialized: run 'switchboard init'")]
    NotInitialized,

    #[error("action not found: {0}")]
    ActionNotFound(String),

    #[error("action is disabled: {0}")]
    ActionDisabled(String),

    #[error("action is already running: {0}")]
    AlreadyRunning(String),

    #[error("invalid parameters for '{action}': {}", format_violations(.violations))]
    InvalidParameters {
        action: String,
        violations: Vec<ParameterViolation>,
    },

    #[error("no command defined for action: {0}")]
    CommandNotMapped(String),

    #[error("execution failed: {0}")]
    Execution(#[from] ExecutionFailure),

    #[error("invalid catalog: {0}")]
    InvalidCatalog(String),

    #[error("record store error: {0}")]
    Store(String),

    #[error("internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

fn format_violations(violations: &[ParameterViolation]) -> String {
    violations
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

impl SwitchboardError {
    /// True for errors caused by the caller's request rather than by
    /// execution or persistence.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            SwitchboardError::ActionNotFound(_)
                | SwitchboardError::ActionDisabled(_)
                | SwitchboardError::AlreadyRunning(_)
                | SwitchboardError::InvalidParameters { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, SwitchboardError>;

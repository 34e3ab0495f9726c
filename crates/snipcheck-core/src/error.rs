//! Error taxonomy for the snippet harness.

use std::path::PathBuf;

/// Errors produced by registration, capture, execution and configuration.
///
/// `Snippet` and `TimedOut` never escape a run: the engine converts them into
/// `Errored` / `TimedOut` outcomes. They exist so that the description stored
/// in a result is rendered the same way everywhere.
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    #[error("duplicate snippet: {id}")]
    DuplicateSnippet { id: String },

    #[error("capture already active on this output channel")]
    CaptureAlreadyActive,

    #[error("snippet error: {0}")]
    Snippet(String),

    #[error("snippet timed out after {limit_ms}ms")]
    TimedOut { limit_ms: u64 },

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("failed to read fixture {}: {source}", path.display())]
    Fixture {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("worker failed: {0}")]
    WorkerFailed(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl HarnessError {
    /// Process exit code for errors that abort a run before it produces a report.
    pub fn exit_code(&self) -> i32 {
        match self {
            HarnessError::Configuration(_) | HarnessError::DuplicateSnippet { .. } => 3,
            _ => 1,
        }
    }

    pub(crate) fn config(msg: impl Into<String>) -> Self {
        HarnessError::Configuration(msg.into())
    }
}

/// Result type for harness operations.
pub type Result<T> = std::result::Result<T, HarnessError>;

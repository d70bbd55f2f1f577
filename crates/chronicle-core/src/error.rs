use thiserror::Error;

/// A convenience `Result` alias using [`ChronicleError`].
pub type ChronicleResult<T> = Result<T, ChronicleError>;

/// Top-level error type for the Chronicle workspace.
///
/// Each variant corresponds to a subsystem that can produce errors.
#[derive(Error, Debug)]
pub enum ChronicleError {
    /// An error from the underlying storage engine (SQLite).
    #[error("Store error: {0}")]
    Store(String),

    /// An error while persisting or restoring session state.
    #[error("State error: {0}")]
    State(String),

    /// An error in configuration parsing or validation.
    #[error("Config error: {0}")]
    Config(String),

    /// A JSON serialization or deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A standard I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

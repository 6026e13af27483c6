//! Error types for sqldump

use thiserror::Error;

/// Core error type for dump operations
#[derive(Error, Debug)]
pub enum DumpError {
    /// Connecting or authenticating failed. Fatal: nothing has been written yet.
    #[error("Connection error: {0}")]
    Connection(String),

    /// A single statement failed. Phase-local: the orchestrator moves on.
    #[error("Query error: {0}")]
    Query(String),

    /// A result page failed after the stream had started.
    #[error("Stream page error: {0}")]
    StreamPage(String),

    /// A template name was looked up that was never registered.
    #[error("Template not registered: {0}")]
    TemplateMiss(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A page or lookup did not arrive in time. Phase-local.
    #[error("Timeout: {0}")]
    Timeout(String),
}

impl DumpError {
    /// Whether the error must abort the whole dump rather than a single phase.
    pub fn is_fatal(&self) -> bool {
        matches!(self, DumpError::Connection(_) | DumpError::Io(_))
    }
}

/// Result type alias for dump operations
pub type Result<T> = std::result::Result<T, DumpError>;

//! Error types for pgcapture

use thiserror::Error;

/// Result type alias for pgcapture operations
pub type CaptureResult<T> = Result<T, CaptureError>;

/// Error types for capturing, classifying and presenting statements
#[derive(Debug, Error)]
pub enum CaptureError {
    /// Query execution error reported by the wrapped client
    #[error("Query error: {0}")]
    Query(#[from] tokio_postgres::Error),

    /// Row not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// No presenter is registered under the configured name
    #[error("Presenter not found: '{name}' (available: {})", available.join(", "))]
    PresenterNotFound {
        name: String,
        available: Vec<String>,
    },

    /// A presenter did not provide a `render` implementation
    #[error("Presenter '{0}' does not implement render")]
    PresenterNotImplemented(String),

    /// An ignore pattern failed to compile
    #[error("Invalid ignore pattern '{pattern}': {source}")]
    IgnorePattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// Configuration could not be read or parsed
    #[error("Configuration error: {0}")]
    Config(String),

    /// A capture scope was entered while it was already active
    #[error("Capture scope is already active")]
    ScopeActive,

    /// Writing presenter output failed
    #[error("Output error: {0}")]
    Io(#[from] std::io::Error),

    /// Statements exceeded the configured thresholds
    #[error("Inefficient queries detected:{0}")]
    InefficientQueries(String),

    /// Other errors
    #[error("{0}")]
    Other(String),
}

impl CaptureError {
    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Check if this is a not found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Check if this is a presenter resolution error
    pub fn is_presenter_not_found(&self) -> bool {
        matches!(self, Self::PresenterNotFound { .. })
    }

    /// Check if this is a threshold assertion failure
    pub fn is_inefficient(&self) -> bool {
        matches!(self, Self::InefficientQueries(_))
    }
}

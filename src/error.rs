//! Error types for the grabber

use thiserror::Error;

/// Result type alias for grabber operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while listening for and downloading attachments
#[derive(Debug, Error)]
pub enum Error {
    /// Required configuration value is absent
    #[error("missing required configuration: {0}")]
    ConfigMissing(&'static str),

    /// Configuration value is present but unusable
    #[error("configuration error: {0}")]
    Config(String),

    /// Chat or transfer API error
    #[error("channel error: {0}")]
    Channel(String),

    /// Download gave up after the retry budget
    #[error("download failed after {attempts} attempt(s): {source}")]
    Download {
        /// Number of attempts made
        attempts: u32,
        /// Error raised by the final attempt
        #[source]
        source: Box<Error>,
    },

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Whether this error aborts startup rather than a single event
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::ConfigMissing(_) | Self::Config(_))
    }
}

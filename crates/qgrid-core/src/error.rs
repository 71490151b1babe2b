//! Unified error types for the qgrid workspace
//!
//! [`QgridError`] is the error every library crate returns at its public
//! boundary. Only configuration problems are meant to abort a simulation;
//! data-quality defects are repaired and reported through
//! [`crate::diagnostics::Diagnostics`] instead of being raised.
//!
//! # Example
//!
//! ```ignore
//! use qgrid_core::{QgridError, QgridResult};
//!
//! fn build(path: &str) -> QgridResult<NetworkModel> {
//!     let topology = CsvTopology::open(path)?;
//!     loader.load(&topology)?
//! }
//! ```

use thiserror::Error;

/// Unified error type for all qgrid operations.
#[derive(Error, Debug)]
pub enum QgridError {
    /// I/O errors (file access, missing directories, etc.)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Parsing/deserialization errors
    #[error("Parse error: {0}")]
    Parse(String),

    /// Data validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Configuration errors (unknown carrier, missing static table, ...).
    /// Always fatal.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Network structure errors
    #[error("Network error: {0}")]
    Network(String),

    /// Cache store errors
    #[error("Cache error: {0}")]
    Cache(String),

    /// External provider failures (production model, demand provider)
    #[error("Provider error: {0}")]
    Provider(String),

    /// Generic errors (for wrapping external errors)
    #[error("{0}")]
    Other(String),
}

impl QgridError {
    /// True for errors that must abort construction before dispatch.
    pub fn is_fatal(&self) -> bool {
        matches!(self, QgridError::Config(_) | QgridError::Network(_))
    }
}

/// Convenience type alias for Results using QgridError.
pub type QgridResult<T> = Result<T, QgridError>;

impl From<anyhow::Error> for QgridError {
    fn from(err: anyhow::Error) -> Self {
        QgridError::Other(err.to_string())
    }
}

impl From<String> for QgridError {
    fn from(s: String) -> Self {
        QgridError::Other(s)
    }
}

impl From<&str> for QgridError {
    fn from(s: &str) -> Self {
        QgridError::Other(s.to_string())
    }
}

impl From<serde_json::Error> for QgridError {
    fn from(err: serde_json::Error) -> Self {
        QgridError::Parse(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = QgridError::Config("unknown carrier 'coal'".into());
        assert!(err.to_string().contains("Configuration error"));
        assert!(err.to_string().contains("coal"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: QgridError = io_err.into();
        assert!(matches!(err, QgridError::Io(_)));
    }

    #[test]
    fn test_fatal_classification() {
        assert!(QgridError::Config("x".into()).is_fatal());
        assert!(!QgridError::Provider("x".into()).is_fatal());
        assert!(!QgridError::Cache("x".into()).is_fatal());
    }

    #[test]
    fn test_question_mark_operator() {
        fn inner() -> QgridResult<()> {
            Err(QgridError::Validation("negative demand".into()))
        }

        fn outer() -> QgridResult<()> {
            inner()?;
            Ok(())
        }

        assert!(outer().is_err());
    }
}

//! Error types for Trellis operations.
//!
//! Malformed graph input is never an error: the builder drops or repairs it and
//! logs a warning. [`TrellisError`] covers the conditions a caller has to react
//! to.

use std::io;

use thiserror::Error;

/// The main error type for Trellis operations.
#[derive(Debug, Error)]
pub enum TrellisError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Layout error: {0}")]
    Layout(String),

    #[error("Layout cancelled")]
    Cancelled,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "layout.toml");
        let err: TrellisError = io_err.into();

        assert!(matches!(err, TrellisError::Io(_)));
        assert_eq!(err.to_string(), "I/O error: layout.toml");
    }

    #[test]
    fn test_messages() {
        assert_eq!(
            TrellisError::Config("bad gap".to_string()).to_string(),
            "Configuration error: bad gap"
        );
        assert_eq!(TrellisError::Cancelled.to_string(), "Layout cancelled");
    }
}

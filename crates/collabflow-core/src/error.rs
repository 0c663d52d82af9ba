//! Error types and result aliases shared across CollabFlow crates.
//!
//! This module defines the small set of errors that are not specific to
//! the orchestration domain. Domain errors (cycle detection, dispatch
//! failures, state transitions) live in `collabflow-orch`.

/// The result type used throughout collabflow-core.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in core operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An invalid identifier was provided.
    #[error("invalid identifier: {message}")]
    InvalidId {
        /// Description of what made the ID invalid.
        message: String,
    },

    /// Invalid configuration was provided.
    #[error("invalid configuration: {message}")]
    Config {
        /// Description of the configuration problem.
        message: String,
    },

    /// An internal error occurred that should not happen in normal operation.
    #[error("internal error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
    },
}

impl Error {
    /// Creates a new configuration error with the given message.
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a new internal error with the given message.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_display() {
        let err = Error::config("missing base URL");
        assert!(err.to_string().contains("invalid configuration"));
        assert!(err.to_string().contains("missing base URL"));
    }

    #[test]
    fn invalid_id_display() {
        let err = Error::InvalidId {
            message: "bad ulid".to_string(),
        };
        assert!(err.to_string().contains("invalid identifier"));
    }
}

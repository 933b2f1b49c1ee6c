//! Error types for configuration handling

use thiserror::Error;

/// Errors raised while validating or resolving configuration
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A configuration value was malformed or out of range
    #[error("invalid argument {argument}: {reason}")]
    InvalidArgument {
        /// Name of the offending option
        argument: String,
        /// Why the value was rejected
        reason: String,
    },
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

impl ConfigError {
    /// Create an invalid-argument error
    pub fn invalid_argument<A: Into<String>, R: Into<String>>(argument: A, reason: R) -> Self {
        Self::InvalidArgument {
            argument: argument.into(),
            reason: reason.into(),
        }
    }

    /// Name of the option that failed validation
    pub fn argument(&self) -> &str {
        match self {
            Self::InvalidArgument { argument, .. } => argument,
        }
    }
}

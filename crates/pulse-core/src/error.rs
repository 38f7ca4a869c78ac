//! Error types for Pulse.
//!
//! Functions that can fail return `Result<T, PulseError>`. Crates higher
//! in the stack (cache, sampler, sources, server) define their own error
//! enums and convert from this one where a domain rule is violated.
//!
//! # Example
//!
//! ```
//! use pulse_core::{CacheKey, PulseError};
//!
//! let error = CacheKey::new("   ").unwrap_err();
//! assert!(error.is_invalid_key());
//! ```

use thiserror::Error;

/// Main error type for Pulse domain operations.
#[derive(Debug, Error)]
pub enum PulseError {
    /// A cache key was empty or otherwise unusable.
    #[error("Invalid cache key '{key}': {reason}")]
    InvalidKey {
        /// The key that was provided
        key: String,
        /// Why it's invalid
        reason: String,
    },

    /// A chart timeframe could not be parsed.
    #[error("Invalid timeframe '{value}': expected one of 24h, 7d, 30d, 90d")]
    InvalidTimeframe {
        /// The value that was provided
        value: String,
    },

    /// Validation error for a configuration or payload value.
    #[error("Validation error for field '{field}': {message}")]
    ValidationError {
        /// Field that failed validation
        field: String,
        /// Description of the validation failure
        message: String,
    },

    /// Generic internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PulseError {
    /// Creates an InvalidKey error.
    pub fn invalid_key(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidKey {
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// Creates an InvalidTimeframe error.
    pub fn invalid_timeframe(value: impl Into<String>) -> Self {
        Self::InvalidTimeframe {
            value: value.into(),
        }
    }

    /// Creates a ValidationError.
    pub fn validation_error(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ValidationError {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Creates an Internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Returns true if this error is about a cache key.
    pub fn is_invalid_key(&self) -> bool {
        matches!(self, Self::InvalidKey { .. })
    }

    /// Returns true if this error is about a timeframe.
    pub fn is_invalid_timeframe(&self) -> bool {
        matches!(self, Self::InvalidTimeframe { .. })
    }

    /// Returns true if this is a validation error.
    pub fn is_validation_error(&self) -> bool {
        matches!(self, Self::ValidationError { .. })
    }
}

/// Type alias for Results with PulseError.
pub type Result<T> = std::result::Result<T, PulseError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_key_display() {
        let error = PulseError::invalid_key("", "cannot be empty");
        let msg = format!("{}", error);

        assert!(msg.contains("cannot be empty"));
        assert!(error.is_invalid_key());
    }

    #[test]
    fn test_invalid_timeframe_display() {
        let error = PulseError::invalid_timeframe("1y");

        assert!(error.to_string().contains("1y"));
        assert!(error.is_invalid_timeframe());
        assert!(!error.is_invalid_key());
    }

    #[test]
    fn test_is_validation_error() {
        let validation = PulseError::validation_error("ttl", "must be positive");
        let internal = PulseError::internal("boom");

        assert!(validation.is_validation_error());
        assert!(!internal.is_validation_error());
    }

    #[test]
    fn test_result_with_question_mark() {
        fn inner() -> Result<()> {
            Err(PulseError::internal("test"))
        }

        fn outer() -> Result<String> {
            inner()?;
            Ok("success".into())
        }

        assert!(outer().is_err());
    }
}

//! Core error types for Quarry.

use thiserror::Error;

/// Result type alias using `QueryError`.
pub type QueryResult<T> = std::result::Result<T, QueryError>;

/// Generic boxed error for provider-native failures.
pub type GenericError = Box<dyn std::error::Error + Send + Sync>;

/// Core error type for query operations.
///
/// The first six variants are the classified outcomes of an operator call.
/// `Provider` carries a backing store's own diagnostic untouched.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum QueryError {
    /// A required argument was absent or invalid.
    #[error("ArgumentError: {parameter}")]
    Argument {
        /// Name of the offending parameter.
        parameter: &'static str,
    },

    /// The cancellation token was (or became) cancelled.
    #[error("OperationCanceled")]
    OperationCanceled,

    /// No execution path is eligible under the active capability policy.
    #[error("PolicyViolation: {operator}: {reason}")]
    PolicyViolation {
        /// Operator identity.
        operator: &'static str,
        /// Why neither path was eligible.
        reason: String,
    },

    /// The provider could not execute the translated query.
    #[error("TranslationFailure: {operator}: {reason}")]
    TranslationFailure {
        /// Operator identity.
        operator: &'static str,
        /// Provider or rewriter reason.
        reason: String,
    },

    /// A single-element operator found no qualifying element.
    #[error("SequenceHasNoElements")]
    SequenceHasNoElements,

    /// An exactly-one operator found more than one qualifying element.
    #[error("SequenceHasMultipleElements")]
    SequenceHasMultipleElements,

    /// Provider-native error, passed through unchanged.
    #[error("ProviderError: {0}")]
    Provider(GenericError),

    /// Configuration could not be interpreted.
    #[error("InvalidConfiguration: {0}")]
    InvalidConfiguration(String),

    /// IO error.
    #[error("IoError: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("SerdeJsonError: {0}")]
    SerdeJson(#[from] serde_json::Error),

    /// Internal error (bug in Quarry).
    #[error("InternalError: {0}")]
    Internal(String),
}

impl QueryError {
    /// Create an `Argument` error for the named parameter.
    pub fn argument(parameter: &'static str) -> Self {
        Self::Argument { parameter }
    }

    /// Create a `PolicyViolation`.
    pub fn policy_violation<S: Into<String>>(operator: &'static str, reason: S) -> Self {
        Self::PolicyViolation {
            operator,
            reason: reason.into(),
        }
    }

    /// Create a `TranslationFailure`.
    pub fn translation<S: Into<String>>(operator: &'static str, reason: S) -> Self {
        Self::TranslationFailure {
            operator,
            reason: reason.into(),
        }
    }

    /// Wrap a provider-native error.
    pub fn provider<E>(err: E) -> Self
    where
        E: Into<GenericError>,
    {
        Self::Provider(err.into())
    }

    /// Create an `InvalidConfiguration` error.
    pub fn invalid_configuration<S: Into<String>>(msg: S) -> Self {
        Self::InvalidConfiguration(msg.into())
    }

    /// Create an `Internal` error.
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Self::Internal(msg.into())
    }

    /// Whether this error reports cancellation rather than a failure.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::OperationCanceled)
    }

    /// Name of the parameter for `Argument` errors.
    pub fn parameter(&self) -> Option<&'static str> {
        match self {
            Self::Argument { parameter } => Some(parameter),
            _ => None,
        }
    }
}

/// Return early with an `Argument` error when the condition fails.
#[macro_export]
macro_rules! ensure_argument {
    ($cond:expr, $parameter:expr) => {
        if !$cond {
            return Err($crate::QueryError::argument($parameter));
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = QueryError::argument("source");
        assert_eq!(err.to_string(), "ArgumentError: source");

        let err = QueryError::policy_violation("distinct", "emulation disallowed");
        assert_eq!(
            err.to_string(),
            "PolicyViolation: distinct: emulation disallowed"
        );
    }

    #[test]
    fn test_cancellation_classification() {
        assert!(QueryError::OperationCanceled.is_cancellation());
        assert!(!QueryError::SequenceHasNoElements.is_cancellation());
    }

    #[test]
    fn test_provider_error_keeps_message() {
        let err = QueryError::provider("disk on fire");
        assert_eq!(err.to_string(), "ProviderError: disk on fire");
    }

    #[test]
    fn test_ensure_argument() {
        fn check(present: bool) -> QueryResult<()> {
            ensure_argument!(present, "callback");
            Ok(())
        }

        assert!(check(true).is_ok());
        assert_eq!(check(false).unwrap_err().parameter(), Some("callback"));
    }
}

//! Error types for record store access.
//!
//! A store call fails for one of two reasons: the store cannot serve the
//! request, or the request names a filter expression the store never compiled.
//! Both carry an [`ErrorContext`] naming the failed operation. The engine
//! passes them through unchanged and never retries.

use std::fmt;

use crate::api::FilterExpressionId;

/// Result type for record store operations
pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Which store call failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorContext {
    /// Store operation, e.g. "fetch_answers"
    pub operation: String,
}

impl ErrorContext {
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[operation={}]", self.operation)
    }
}

/// Failure reported by the record store.
#[derive(Debug, thiserror::Error)]
#[allow(clippy::result_large_err)]
pub enum RepositoryError {
    /// The store cannot be reached.
    #[error("Connection error: {message} {context}")]
    ConnectionError {
        message: String,
        context: ErrorContext,
    },

    /// The scope names a filter expression the store does not know.
    #[error("Unknown filter expression: {expression} {context}")]
    UnknownExpression {
        expression: FilterExpressionId,
        context: ErrorContext,
    },
}

impl RepositoryError {
    pub fn connection(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConnectionError {
            message: message.into(),
            context: ErrorContext::new(operation),
        }
    }

    pub fn unknown_expression(operation: impl Into<String>, expression: &FilterExpressionId) -> Self {
        Self::UnknownExpression {
            expression: expression.clone(),
            context: ErrorContext::new(operation),
        }
    }

    /// True when the store could not serve the request at all.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::ConnectionError { .. })
    }

    pub fn context(&self) -> &ErrorContext {
        match self {
            Self::ConnectionError { context, .. } | Self::UnknownExpression { context, .. } => context,
        }
    }
}

//! Engine-level errors.

use crate::db::repository::RepositoryError;

/// Result type for engine entry points.
pub type EngineResult<T> = Result<T, ReportError>;

#[derive(Debug, thiserror::Error)]
#[allow(clippy::result_large_err)]
pub enum ReportError {
    /// No report variant answers to this name.
    #[error("Unknown report variant: {0}")]
    InvalidVariant(String),

    /// The variant cannot be compared across filter expressions.
    #[error("Report variant does not support benchmarks: {0}")]
    NotBenchmarkable(String),

    /// A benchmark slot key that is not `<prefix>_<n>` with n in `1..=max_slots`.
    #[error("Invalid benchmark slot: {0}")]
    InvalidBenchmarkSlot(String),

    /// Record store failure, passed through unchanged.
    #[error(transparent)]
    Store(#[from] RepositoryError),

    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The blocking wrappers could not start their runtime.
    #[error("Runtime error: {0}")]
    Runtime(String),
}

impl ReportError {
    /// The store error behind this failure, if any.
    pub fn store_error(&self) -> Option<&RepositoryError> {
        match self {
            ReportError::Store(err) => Some(err),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_errors_keep_their_message() {
        let err: ReportError = RepositoryError::connection("count_feedbacks", "store down").into();
        assert!(err.to_string().starts_with("Connection error: store down"));
        assert!(err.store_error().is_some_and(|e| e.is_unavailable()));
    }

    #[test]
    fn test_invalid_variant_message() {
        let err = ReportError::InvalidVariant("pie".into());
        assert_eq!(err.to_string(), "Unknown report variant: pie");
        assert!(err.store_error().is_none());
    }
}

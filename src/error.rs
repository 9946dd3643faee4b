//! Crate-wide error taxonomy.
//!
//! One variant per error kind in the design's error table: `InvalidInput`,
//! `AlreadyExists`, `NotFound`, `StoreError`, `Timeout`, `InvalidRule`.
//! Collaborator traits (`AssetService`, `LineageStore`, `RelationalStore`)
//! all return `Result<_, CoreError>` so callers can match on kind regardless
//! of which collaborator produced it.

use std::time::Duration;
use thiserror::Error;

/// Error surfaced by any core operation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    /// Malformed event, unparseable query, or missing required rule field.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Asset create with a duplicate MRN.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// MRN/edge/asset lookup miss.
    #[error("not found: {0}")]
    NotFound(String),

    /// Backend failure, transient or permanent.
    #[error("store error: {0}")]
    StoreError(String),

    /// Rule evaluation exceeded its deadline.
    #[error("timeout after {elapsed:?} (limit {limit:?})")]
    Timeout {
        limit: Duration,
        elapsed: Duration,
    },

    /// Regex failed to compile, or a required rule field is missing.
    #[error("invalid rule: {0}")]
    InvalidRule(String),
}

impl CoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, CoreError::NotFound(_))
    }

    pub fn is_already_exists(&self) -> bool {
        matches!(self, CoreError::AlreadyExists(_))
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, CoreError::Timeout { .. })
    }
}

pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages_include_context() {
        let err = CoreError::NotFound("mrn://table/bigquery/x.y".to_string());
        assert_eq!(err.to_string(), "not found: mrn://table/bigquery/x.y");
    }

    #[test]
    fn timeout_carries_durations() {
        let err = CoreError::Timeout {
            limit: Duration::from_secs(5),
            elapsed: Duration::from_millis(5200),
        };
        assert!(err.is_timeout());
        assert!(!err.is_not_found());
    }

    #[test]
    fn predicate_helpers() {
        assert!(CoreError::AlreadyExists("x".into()).is_already_exists());
        assert!(!CoreError::InvalidInput("x".into()).is_already_exists());
    }
}

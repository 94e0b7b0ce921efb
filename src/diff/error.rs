//! Error types for comparison operations.

use std::fmt;
use thiserror::Error;

/// Which side of a comparison a problem was found on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Old,
    New,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Old => write!(f, "old"),
            Side::New => write!(f, "new"),
        }
    }
}

/// DiffError represents a failure during comparison.
///
/// Absent values are never errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiffError {
    #[error("{path}: type mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        path: String,
        expected: String,
        actual: String,
    },

    #[error("{path}: cannot read field: {message}")]
    FieldAccess { path: String, message: String },

    #[error("configuration error: {message}")]
    Configuration { message: String },

    #[error("duplicate key {key} in {side} collection")]
    DuplicateKey { side: Side, key: String },
}

impl DiffError {
    /// Creates a type mismatch error.
    pub fn type_mismatch(
        path: impl fmt::Display,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        DiffError::TypeMismatch {
            path: display_path(path),
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Creates a field access error.
    pub fn field_access(path: impl fmt::Display, message: impl Into<String>) -> Self {
        DiffError::FieldAccess {
            path: display_path(path),
            message: message.into(),
        }
    }

    /// Creates a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        DiffError::Configuration {
            message: message.into(),
        }
    }

    /// Creates a duplicate key error.
    pub fn duplicate_key(side: Side, key: impl fmt::Display) -> Self {
        DiffError::DuplicateKey {
            side,
            key: key.to_string(),
        }
    }

    /// Returns true for errors caused by how the comparison was configured.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            DiffError::Configuration { .. } | DiffError::DuplicateKey { .. }
        )
    }
}

fn display_path(path: impl fmt::Display) -> String {
    let path = path.to_string();
    if path.is_empty() {
        "<root>".to_string()
    } else {
        path
    }
}

/// Convenience alias for comparison results.
pub type DiffResult<T> = Result<T, DiffError>;

//! Mirror subsystem error handling
//!
//! Every error here is a contract violation detected synchronously, before any
//! state is mutated. Nothing is retried or recovered internally.

use crate::layout::FieldType;
use thiserror::Error;

/// Errors raised by layout calculation, typed tables and mirrored buffers
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MirrorError {
    #[error("Unknown field '{name}'")]
    UnknownField { name: String },

    #[error("Type mismatch for field '{field}': declared {expected}, accessed as {found}")]
    TypeMismatch {
        field: String,
        expected: FieldType,
        found: FieldType,
    },

    #[error("Index {index} out of range for length {len}")]
    IndexOutOfRange { index: isize, len: usize },

    #[error("Invalid field '{name}': {reason}")]
    InvalidField { name: String, reason: String },

    #[error("Table schema already registered")]
    AlreadyInitialized,

    #[error("{resource} has no device resource yet (flush first)")]
    NotYetAllocated { resource: &'static str },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to parse configuration: {0}")]
    ConfigParse(String),

    #[error("Device operation '{operation}' failed: {error}")]
    Device { operation: String, error: String },
}

/// Type alias for mirror operation results
pub type MirrorResult<T> = Result<T, MirrorError>;

/// Helper trait for attaching a device-operation context to foreign errors
pub trait MirrorErrorContext<T> {
    fn mirror_context(self, operation: &str) -> MirrorResult<T>;
}

impl<T, E> MirrorErrorContext<T> for Result<T, E>
where
    E: std::fmt::Display,
{
    fn mirror_context(self, operation: &str) -> MirrorResult<T> {
        self.map_err(|e| device_error(operation, e))
    }
}

/// Create a device operation error
pub fn device_error(operation: &str, error: impl std::fmt::Display) -> MirrorError {
    MirrorError::Device {
        operation: operation.to_string(),
        error: error.to_string(),
    }
}

/// Create an invalid field error
pub fn invalid_field(name: &str, reason: impl std::fmt::Display) -> MirrorError {
    MirrorError::InvalidField {
        name: name.to_string(),
        reason: reason.to_string(),
    }
}

//! Typed failures raised by domain services.
//!
//! Services return `anyhow::Result`; these errors travel inside it so the
//! REST layer can recover them with `downcast_ref` and pick a status code.

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum DomainError {
    #[error("{0} not found")]
    NotFound(String),
    #[error("Permission denied: {0}")]
    PermissionDenied(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl DomainError {
    pub fn not_found(what: impl Into<String>) -> Self {
        DomainError::NotFound(what.into())
    }

    pub fn permission_denied(reason: impl Into<String>) -> Self {
        DomainError::PermissionDenied(reason.into())
    }

    pub fn invalid_input(reason: impl Into<String>) -> Self {
        DomainError::InvalidInput(reason.into())
    }
}

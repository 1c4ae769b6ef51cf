//! Translation of service errors into HTTP responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use log::{error, warn};

use crate::domain::{AuthError, DomainError, FormValidationError};

/// Status code for an error returned by a domain service
pub fn status_for(e: &anyhow::Error) -> StatusCode {
    if e.downcast_ref::<FormValidationError>().is_some() {
        return StatusCode::UNPROCESSABLE_ENTITY;
    }
    if let Some(domain_error) = e.downcast_ref::<DomainError>() {
        return match domain_error {
            DomainError::NotFound(_) => StatusCode::NOT_FOUND,
            DomainError::PermissionDenied(_) => StatusCode::FORBIDDEN,
            DomainError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        };
    }
    if let Some(auth_error) = e.downcast_ref::<AuthError>() {
        return match auth_error {
            AuthError::InvalidCredentials | AuthError::NotSignedIn => StatusCode::UNAUTHORIZED,
            AuthError::EmailTaken => StatusCode::CONFLICT,
            AuthError::InvalidEmail | AuthError::WeakPassword => StatusCode::BAD_REQUEST,
        };
    }
    StatusCode::INTERNAL_SERVER_ERROR
}

/// Log the failure and respond with its status and message
pub fn error_response(action: &str, e: anyhow::Error) -> Response {
    let status = status_for(&e);
    if status.is_server_error() {
        error!("Failed to {}: {:#}", action, e);
    } else {
        warn!("Failed to {}: {}", action, e);
    }
    (status, e.to_string()).into_response()
}

pub fn bad_request(message: impl Into<String>) -> Response {
    (StatusCode::BAD_REQUEST, message.into()).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            status_for(&FormValidationError::EmptyGrowth.into()),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(status_for(&DomainError::not_found("Baby x").into()), StatusCode::NOT_FOUND);
        assert_eq!(status_for(&DomainError::permission_denied("no").into()), StatusCode::FORBIDDEN);
        assert_eq!(status_for(&AuthError::EmailTaken.into()), StatusCode::CONFLICT);
        assert_eq!(
            status_for(&anyhow::anyhow!("disk on fire")),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        // Context layers keep the original error reachable
        let wrapped = anyhow::Error::from(DomainError::invalid_input("bad")).context("while saving");
        assert_eq!(status_for(&wrapped), StatusCode::BAD_REQUEST);
    }
}

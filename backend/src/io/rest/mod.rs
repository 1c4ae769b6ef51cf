//! # REST API Interface Layer
//!
//! JSON endpoints over the domain services. Handlers only translate: they
//! resolve the signed-in user, call one service operation and map its error
//! to a status code.

pub mod auth_apis;
pub mod baby_apis;
pub mod errors;
pub mod event_apis;
pub mod family_apis;
pub mod settings_apis;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Router,
};
use shared::UserAccount;

use crate::AppState;

/// All API routes, relative to `/api`
pub fn router() -> Router<AppState> {
    Router::new()
        .merge(auth_apis::router())
        .merge(baby_apis::router())
        .merge(event_apis::router())
        .merge(family_apis::router())
        .merge(settings_apis::router())
}

/// The signed-in user, or a 401 response
pub(crate) async fn require_user(state: &AppState) -> Result<UserAccount, Response> {
    state
        .auth
        .current_user()
        .await
        .ok_or_else(|| (StatusCode::UNAUTHORIZED, "Not signed in").into_response())
}

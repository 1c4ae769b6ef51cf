//! # REST API for Authentication

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use log::info;
use shared::{CredentialsRequest, SessionResponse};

use super::errors::error_response;
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth/sign-up", post(sign_up))
        .route("/auth/sign-in", post(sign_in))
        .route("/auth/sign-out", post(sign_out))
        .route("/auth/session", get(current_session))
}

async fn sign_up(State(state): State<AppState>, Json(request): Json<CredentialsRequest>) -> impl IntoResponse {
    info!("POST /api/auth/sign-up");
    match state.auth.sign_up(&request.email, &request.password).await {
        Ok(user) => (StatusCode::CREATED, Json(SessionResponse { user: Some(user) })).into_response(),
        Err(e) => error_response("sign up", e),
    }
}

async fn sign_in(State(state): State<AppState>, Json(request): Json<CredentialsRequest>) -> impl IntoResponse {
    info!("POST /api/auth/sign-in");
    match state.auth.sign_in(&request.email, &request.password).await {
        Ok(user) => (StatusCode::OK, Json(SessionResponse { user: Some(user) })).into_response(),
        Err(e) => error_response("sign in", e),
    }
}

async fn sign_out(State(state): State<AppState>) -> impl IntoResponse {
    info!("POST /api/auth/sign-out");
    state.auth.sign_out().await;
    StatusCode::NO_CONTENT
}

async fn current_session(State(state): State<AppState>) -> impl IntoResponse {
    let user = state.auth.current_user().await;
    Json(SessionResponse { user })
}

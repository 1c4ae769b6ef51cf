//! # REST API for Admin Settings

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use log::info;

use super::errors::error_response;
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/settings/admin", get(get_admin_settings))
        .route("/settings/admin/refresh", post(refresh_admin_settings))
}

async fn get_admin_settings(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.settings_service.current())
}

async fn refresh_admin_settings(State(state): State<AppState>) -> impl IntoResponse {
    info!("POST /api/settings/admin/refresh");
    match state.settings_service.refresh().await {
        Ok(applied) => {
            info!("Admin settings refresh applied: {}", applied);
            (StatusCode::OK, Json(state.settings_service.current())).into_response()
        }
        Err(e) => error_response("refresh admin settings", e),
    }
}

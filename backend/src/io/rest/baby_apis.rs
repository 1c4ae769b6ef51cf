//! # REST API for Baby Profiles
//!
//! Endpoints for creating, retrieving, updating and deleting babies and for
//! their profile photo.

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use chrono::Utc;
use log::info;
use shared::{BabyListResponse, BabyResponse, CreateBabyRequest, UpdateBabyRequest};

use super::errors::{bad_request, error_response};
use super::require_user;
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/babies", get(list_babies).post(create_baby))
        .route("/babies/:baby_id", get(get_baby).put(update_baby).delete(delete_baby))
        .route("/babies/:baby_id/photo", axum::routing::put(upload_photo).delete(remove_photo))
}

async fn create_baby(
    State(state): State<AppState>,
    Json(request): Json<CreateBabyRequest>,
) -> impl IntoResponse {
    info!("POST /api/babies - name: {}", request.name);
    let user = match require_user(&state).await {
        Ok(user) => user,
        Err(response) => return response,
    };

    match state.baby_service.create_baby(&user.id, request, Utc::now()).await {
        Ok(baby) => {
            let response = BabyResponse {
                success_message: format!("{} was added", baby.name),
                baby,
            };
            (StatusCode::CREATED, Json(response)).into_response()
        }
        Err(e) => error_response("create baby", e),
    }
}

async fn list_babies(State(state): State<AppState>) -> impl IntoResponse {
    info!("GET /api/babies");
    let user = match require_user(&state).await {
        Ok(user) => user,
        Err(response) => return response,
    };

    match state.baby_service.list_babies(&user.id).await {
        Ok(babies) => (StatusCode::OK, Json(BabyListResponse { babies })).into_response(),
        Err(e) => error_response("list babies", e),
    }
}

async fn get_baby(State(state): State<AppState>, Path(baby_id): Path<String>) -> impl IntoResponse {
    info!("GET /api/babies/{}", baby_id);
    let user = match require_user(&state).await {
        Ok(user) => user,
        Err(response) => return response,
    };

    match state.baby_service.get_baby(&user.id, &baby_id).await {
        Ok(baby) => (StatusCode::OK, Json(baby)).into_response(),
        Err(e) => error_response("get baby", e),
    }
}

async fn update_baby(
    State(state): State<AppState>,
    Path(baby_id): Path<String>,
    Json(request): Json<UpdateBabyRequest>,
) -> impl IntoResponse {
    info!("PUT /api/babies/{} - request: {:?}", baby_id, request);
    let user = match require_user(&state).await {
        Ok(user) => user,
        Err(response) => return response,
    };

    match state.baby_service.update_baby(&user.id, &baby_id, request, Utc::now()).await {
        Ok(baby) => {
            let response = BabyResponse {
                success_message: format!("{} was updated", baby.name),
                baby,
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => error_response("update baby", e),
    }
}

async fn delete_baby(State(state): State<AppState>, Path(baby_id): Path<String>) -> impl IntoResponse {
    info!("DELETE /api/babies/{}", baby_id);
    let user = match require_user(&state).await {
        Ok(user) => user,
        Err(response) => return response,
    };

    match state.baby_service.delete_baby(&user.id, &baby_id, Utc::now()).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => error_response("delete baby", e),
    }
}

async fn upload_photo(
    State(state): State<AppState>,
    Path(baby_id): Path<String>,
    body: Bytes,
) -> impl IntoResponse {
    info!("PUT /api/babies/{}/photo - {} bytes", baby_id, body.len());
    let user = match require_user(&state).await {
        Ok(user) => user,
        Err(response) => return response,
    };
    if body.is_empty() {
        return bad_request("Photo body is empty");
    }

    match state.baby_service.upload_photo(&user.id, &baby_id, &body, Utc::now()).await {
        Ok(baby) => (StatusCode::OK, Json(baby)).into_response(),
        Err(e) => error_response("upload baby photo", e),
    }
}

async fn remove_photo(State(state): State<AppState>, Path(baby_id): Path<String>) -> impl IntoResponse {
    info!("DELETE /api/babies/{}/photo", baby_id);
    let user = match require_user(&state).await {
        Ok(user) => user,
        Err(response) => return response,
    };

    match state.baby_service.remove_photo(&user.id, &baby_id, Utc::now()).await {
        Ok(baby) => (StatusCode::OK, Json(baby)).into_response(),
        Err(e) => error_response("remove baby photo", e),
    }
}

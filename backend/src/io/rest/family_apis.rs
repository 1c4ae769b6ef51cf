//! # REST API for Families
//!
//! Family creation, invite codes, membership, shared babies and family
//! settings.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{delete, get, post, put},
    Router,
};
use chrono::Utc;
use log::info;
use shared::{
    AddCustomDrugTypeRequest, CreateFamilyRequest, Family, FamilyBabyRequest, FamilyListResponse,
    FamilyResponse, JoinFamilyRequest, UpdateFamilySettingsRequest,
};

use super::errors::error_response;
use super::require_user;
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/families", get(list_families).post(create_family))
        .route("/invites/join", post(join_family))
        .route("/drug-types", get(list_drug_types))
        .route("/families/:family_id", get(get_family))
        .route("/families/:family_id/leave", post(leave_family))
        .route("/families/:family_id/invite-code", post(regenerate_invite_code))
        .route("/families/:family_id/members/:member_id", delete(remove_member))
        .route("/families/:family_id/babies", post(add_baby))
        .route("/families/:family_id/babies/:baby_id", delete(remove_baby))
        .route("/families/:family_id/settings", put(update_settings))
        .route("/families/:family_id/drug-types", post(add_custom_drug_type))
}

fn family_response(family: Family, message: &str) -> FamilyResponse {
    FamilyResponse {
        success_message: message.to_string(),
        family,
    }
}

async fn create_family(
    State(state): State<AppState>,
    Json(request): Json<CreateFamilyRequest>,
) -> impl IntoResponse {
    info!("POST /api/families - name: {}", request.name);
    let user = match require_user(&state).await {
        Ok(user) => user,
        Err(response) => return response,
    };

    match state.family_service.create_family(&user.id, &request.name, Utc::now()).await {
        Ok(family) => (StatusCode::CREATED, Json(family_response(family, "Family created"))).into_response(),
        Err(e) => error_response("create family", e),
    }
}

async fn list_families(State(state): State<AppState>) -> impl IntoResponse {
    info!("GET /api/families");
    let user = match require_user(&state).await {
        Ok(user) => user,
        Err(response) => return response,
    };

    match state.family_service.list_families(&user.id).await {
        Ok(families) => (StatusCode::OK, Json(FamilyListResponse { families })).into_response(),
        Err(e) => error_response("list families", e),
    }
}

async fn get_family(State(state): State<AppState>, Path(family_id): Path<String>) -> impl IntoResponse {
    info!("GET /api/families/{}", family_id);
    let user = match require_user(&state).await {
        Ok(user) => user,
        Err(response) => return response,
    };

    match state.family_service.get_family(&user.id, &family_id).await {
        Ok(family) => (StatusCode::OK, Json(family)).into_response(),
        Err(e) => error_response("get family", e),
    }
}

async fn join_family(
    State(state): State<AppState>,
    Json(request): Json<JoinFamilyRequest>,
) -> impl IntoResponse {
    info!("POST /api/invites/join");
    let user = match require_user(&state).await {
        Ok(user) => user,
        Err(response) => return response,
    };

    match state.family_service.join_family(&user.id, &request.invite_code, Utc::now()).await {
        Ok(family) => (StatusCode::OK, Json(family_response(family, "Joined family"))).into_response(),
        Err(e) => error_response("join family", e),
    }
}

async fn leave_family(State(state): State<AppState>, Path(family_id): Path<String>) -> impl IntoResponse {
    info!("POST /api/families/{}/leave", family_id);
    let user = match require_user(&state).await {
        Ok(user) => user,
        Err(response) => return response,
    };

    match state.family_service.leave_family(&user.id, &family_id, Utc::now()).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => error_response("leave family", e),
    }
}

async fn regenerate_invite_code(State(state): State<AppState>, Path(family_id): Path<String>) -> impl IntoResponse {
    info!("POST /api/families/{}/invite-code", family_id);
    let user = match require_user(&state).await {
        Ok(user) => user,
        Err(response) => return response,
    };

    match state
        .family_service
        .regenerate_invite_code(&user.id, &family_id, Utc::now())
        .await
    {
        Ok(family) => (StatusCode::OK, Json(family_response(family, "Invite code regenerated"))).into_response(),
        Err(e) => error_response("regenerate invite code", e),
    }
}

async fn remove_member(
    State(state): State<AppState>,
    Path((family_id, member_id)): Path<(String, String)>,
) -> impl IntoResponse {
    info!("DELETE /api/families/{}/members/{}", family_id, member_id);
    let user = match require_user(&state).await {
        Ok(user) => user,
        Err(response) => return response,
    };

    match state
        .family_service
        .remove_member(&user.id, &family_id, &member_id, Utc::now())
        .await
    {
        Ok(family) => (StatusCode::OK, Json(family_response(family, "Member removed"))).into_response(),
        Err(e) => error_response("remove family member", e),
    }
}

async fn add_baby(
    State(state): State<AppState>,
    Path(family_id): Path<String>,
    Json(request): Json<FamilyBabyRequest>,
) -> impl IntoResponse {
    info!("POST /api/families/{}/babies - baby: {}", family_id, request.baby_id);
    let user = match require_user(&state).await {
        Ok(user) => user,
        Err(response) => return response,
    };

    match state
        .family_service
        .add_baby(&user.id, &family_id, &request.baby_id, Utc::now())
        .await
    {
        Ok(family) => (StatusCode::OK, Json(family_response(family, "Baby shared with family"))).into_response(),
        Err(e) => error_response("add baby to family", e),
    }
}

async fn remove_baby(
    State(state): State<AppState>,
    Path((family_id, baby_id)): Path<(String, String)>,
) -> impl IntoResponse {
    info!("DELETE /api/families/{}/babies/{}", family_id, baby_id);
    let user = match require_user(&state).await {
        Ok(user) => user,
        Err(response) => return response,
    };

    match state
        .family_service
        .remove_baby(&user.id, &family_id, &baby_id, Utc::now())
        .await
    {
        Ok(family) => (StatusCode::OK, Json(family_response(family, "Baby removed from family"))).into_response(),
        Err(e) => error_response("remove baby from family", e),
    }
}

async fn update_settings(
    State(state): State<AppState>,
    Path(family_id): Path<String>,
    Json(request): Json<UpdateFamilySettingsRequest>,
) -> impl IntoResponse {
    info!("PUT /api/families/{}/settings - {:?}", family_id, request.settings);
    let user = match require_user(&state).await {
        Ok(user) => user,
        Err(response) => return response,
    };

    match state
        .family_service
        .update_settings(&user.id, &family_id, request.settings, Utc::now())
        .await
    {
        Ok(family) => (StatusCode::OK, Json(family_response(family, "Settings updated"))).into_response(),
        Err(e) => error_response("update family settings", e),
    }
}

async fn add_custom_drug_type(
    State(state): State<AppState>,
    Path(family_id): Path<String>,
    Json(request): Json<AddCustomDrugTypeRequest>,
) -> impl IntoResponse {
    info!("POST /api/families/{}/drug-types - {}", family_id, request.name);
    let user = match require_user(&state).await {
        Ok(user) => user,
        Err(response) => return response,
    };

    match state
        .family_service
        .add_custom_drug_type(&user.id, &family_id, &request.name, Utc::now())
        .await
    {
        Ok(family) => (StatusCode::OK, Json(family_response(family, "Drug type added"))).into_response(),
        Err(e) => error_response("add custom drug type", e),
    }
}

async fn list_drug_types(State(state): State<AppState>) -> impl IntoResponse {
    info!("GET /api/drug-types");
    let user = match require_user(&state).await {
        Ok(user) => user,
        Err(response) => return response,
    };

    match state.family_service.drug_types_for(&user.id).await {
        Ok(drug_types) => (StatusCode::OK, Json(drug_types)).into_response(),
        Err(e) => error_response("list drug types", e),
    }
}

//! # REST API for Events
//!
//! Saving and querying a baby's events, the day and month calendar views,
//! amount presets and event photos.

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, put},
    Router,
};
use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use log::info;
use serde::Deserialize;
use shared::{
    DayEventsResponse, EventKind, EventListResponse, FeedType, SaveEventRequest, SaveEventResponse,
};

use super::errors::{bad_request, error_response};
use super::require_user;
use crate::domain::EventQuery;
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/babies/:baby_id/events", get(list_events).post(save_event))
        .route("/babies/:baby_id/events/day", get(get_day_events))
        .route("/babies/:baby_id/calendar", get(get_calendar_month))
        .route("/babies/:baby_id/presets/feeding", get(get_feeding_presets))
        .route("/babies/:baby_id/presets/pumping", get(get_pumping_presets))
        .route("/events/:event_id", get(get_event).delete(delete_event))
        .route("/events/:event_id/form", get(get_edit_form))
        .route("/events/:event_id/photo", put(attach_photo).delete(remove_photo))
}

#[derive(Debug, Deserialize)]
pub struct EventListQuery {
    /// Comma separated event kinds, e.g. `FEEDING,SLEEP`
    pub kinds: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct DayQuery {
    pub date: NaiveDate,
    /// Offset of the viewer's local time from UTC
    #[serde(default)]
    pub tz_offset_minutes: i32,
}

#[derive(Debug, Deserialize)]
pub struct CalendarMonthQuery {
    pub month: u32,
    pub year: i32,
    #[serde(default)]
    pub tz_offset_minutes: i32,
}

#[derive(Debug, Deserialize)]
pub struct FeedingPresetQuery {
    pub feed_type: Option<FeedType>,
}

fn parse_kinds(kinds: Option<&str>) -> Result<Vec<EventKind>, Response> {
    let Some(kinds) = kinds else {
        return Ok(Vec::new());
    };
    kinds
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(|name| EventKind::parse(name).ok_or_else(|| bad_request(format!("Unknown event kind {}", name))))
        .collect()
}

fn parse_offset(minutes: i32) -> Result<FixedOffset, Response> {
    minutes
        .checked_mul(60)
        .and_then(FixedOffset::east_opt)
        .ok_or_else(|| bad_request("Invalid tz_offset_minutes"))
}

async fn save_event(
    State(state): State<AppState>,
    Path(baby_id): Path<String>,
    Json(request): Json<SaveEventRequest>,
) -> impl IntoResponse {
    info!("POST /api/babies/{}/events - {} form", baby_id, request.form.kind());
    let user = match require_user(&state).await {
        Ok(user) => user,
        Err(response) => return response,
    };

    let editing = request.form.is_editing();
    match state
        .event_service
        .save_event(&user.id, &baby_id, &request.form, Utc::now())
        .await
    {
        Ok(event) => {
            let status = if editing { StatusCode::OK } else { StatusCode::CREATED };
            let response = SaveEventResponse {
                success_message: format!("{} event saved", event.kind()),
                event,
            };
            (status, Json(response)).into_response()
        }
        Err(e) => error_response("save event", e),
    }
}

async fn list_events(
    State(state): State<AppState>,
    Path(baby_id): Path<String>,
    Query(query): Query<EventListQuery>,
) -> impl IntoResponse {
    info!("GET /api/babies/{}/events - query: {:?}", baby_id, query);
    let user = match require_user(&state).await {
        Ok(user) => user,
        Err(response) => return response,
    };
    let kinds = match parse_kinds(query.kinds.as_deref()) {
        Ok(kinds) => kinds,
        Err(response) => return response,
    };

    let event_query = EventQuery {
        kinds,
        from: query.from,
        to: query.to,
        limit: query.limit,
    };
    match state.event_service.list_events(&user.id, &baby_id, &event_query).await {
        Ok(events) => (StatusCode::OK, Json(EventListResponse { events })).into_response(),
        Err(e) => error_response("list events", e),
    }
}

async fn get_day_events(
    State(state): State<AppState>,
    Path(baby_id): Path<String>,
    Query(query): Query<DayQuery>,
) -> impl IntoResponse {
    info!("GET /api/babies/{}/events/day - query: {:?}", baby_id, query);
    let user = match require_user(&state).await {
        Ok(user) => user,
        Err(response) => return response,
    };
    let offset = match parse_offset(query.tz_offset_minutes) {
        Ok(offset) => offset,
        Err(response) => return response,
    };

    match state
        .event_service
        .events_for_day(&user.id, &baby_id, query.date, &offset)
        .await
    {
        Ok(events) => (StatusCode::OK, Json(DayEventsResponse { date: query.date, events })).into_response(),
        Err(e) => error_response("get day events", e),
    }
}

async fn get_calendar_month(
    State(state): State<AppState>,
    Path(baby_id): Path<String>,
    Query(query): Query<CalendarMonthQuery>,
) -> impl IntoResponse {
    info!("GET /api/babies/{}/calendar - query: {:?}", baby_id, query);
    let user = match require_user(&state).await {
        Ok(user) => user,
        Err(response) => return response,
    };
    let offset = match parse_offset(query.tz_offset_minutes) {
        Ok(offset) => offset,
        Err(response) => return response,
    };

    match state
        .event_service
        .calendar_month(&user.id, &baby_id, query.month, query.year, &offset)
        .await
    {
        Ok(month) => (StatusCode::OK, Json(month)).into_response(),
        Err(e) => error_response("get calendar month", e),
    }
}

async fn get_feeding_presets(
    State(state): State<AppState>,
    Path(baby_id): Path<String>,
    Query(query): Query<FeedingPresetQuery>,
) -> impl IntoResponse {
    info!("GET /api/babies/{}/presets/feeding - query: {:?}", baby_id, query);
    let user = match require_user(&state).await {
        Ok(user) => user,
        Err(response) => return response,
    };

    match state
        .event_service
        .feeding_presets(&user.id, &baby_id, query.feed_type, Utc::now())
        .await
    {
        Ok(presets) => (StatusCode::OK, Json(presets)).into_response(),
        Err(e) => error_response("get feeding presets", e),
    }
}

async fn get_pumping_presets(State(state): State<AppState>, Path(baby_id): Path<String>) -> impl IntoResponse {
    info!("GET /api/babies/{}/presets/pumping", baby_id);
    let user = match require_user(&state).await {
        Ok(user) => user,
        Err(response) => return response,
    };

    match state.event_service.pumping_presets(&user.id, &baby_id, Utc::now()).await {
        Ok(presets) => (StatusCode::OK, Json(presets)).into_response(),
        Err(e) => error_response("get pumping presets", e),
    }
}

async fn get_event(State(state): State<AppState>, Path(event_id): Path<String>) -> impl IntoResponse {
    info!("GET /api/events/{}", event_id);
    let user = match require_user(&state).await {
        Ok(user) => user,
        Err(response) => return response,
    };

    match state.event_service.get_event(&user.id, &event_id).await {
        Ok(event) => (StatusCode::OK, Json(event)).into_response(),
        Err(e) => error_response("get event", e),
    }
}

async fn get_edit_form(State(state): State<AppState>, Path(event_id): Path<String>) -> impl IntoResponse {
    info!("GET /api/events/{}/form", event_id);
    let user = match require_user(&state).await {
        Ok(user) => user,
        Err(response) => return response,
    };

    match state.event_service.edit_form(&user.id, &event_id).await {
        Ok(form) => (StatusCode::OK, Json(form)).into_response(),
        Err(e) => error_response("build edit form", e),
    }
}

async fn delete_event(State(state): State<AppState>, Path(event_id): Path<String>) -> impl IntoResponse {
    info!("DELETE /api/events/{}", event_id);
    let user = match require_user(&state).await {
        Ok(user) => user,
        Err(response) => return response,
    };

    match state.event_service.delete_event(&user.id, &event_id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => error_response("delete event", e),
    }
}

async fn attach_photo(
    State(state): State<AppState>,
    Path(event_id): Path<String>,
    body: Bytes,
) -> impl IntoResponse {
    info!("PUT /api/events/{}/photo - {} bytes", event_id, body.len());
    let user = match require_user(&state).await {
        Ok(user) => user,
        Err(response) => return response,
    };
    if body.is_empty() {
        return bad_request("Photo body is empty");
    }

    match state.event_service.attach_photo(&user.id, &event_id, &body).await {
        Ok(event) => (StatusCode::OK, Json(event)).into_response(),
        Err(e) => error_response("attach event photo", e),
    }
}

async fn remove_photo(State(state): State<AppState>, Path(event_id): Path<String>) -> impl IntoResponse {
    info!("DELETE /api/events/{}/photo", event_id);
    let user = match require_user(&state).await {
        Ok(user) => user,
        Err(response) => return response,
    };

    match state.event_service.remove_photo(&user.id, &event_id).await {
        Ok(event) => (StatusCode::OK, Json(event)).into_response(),
        Err(e) => error_response("remove event photo", e),
    }
}

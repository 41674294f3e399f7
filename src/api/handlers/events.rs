use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    api::{middleware::auth::CurrentUser, state::AppState},
    domain::{
        Attendee, CreateEventRequest, Event, EventPayment, TicketType, UpdateEventRequest,
    },
    error::{AppError, Result},
    service::RecordEventPaymentRequest,
};

#[derive(Debug, Deserialize)]
pub struct ListParams {
    #[serde(default = "default_limit")]
    limit: i64,
    #[serde(default)]
    offset: i64,
}

fn default_limit() -> i64 {
    50
}

pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<Event>>> {
    let events = state
        .service_context
        .event_repo
        .list(params.limit, params.offset)
        .await?;
    Ok(Json(events))
}

#[derive(Debug, Serialize)]
pub struct EventDetail {
    #[serde(flatten)]
    pub event: Event,
    pub ticket_types: Vec<TicketType>,
}

pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<EventDetail>> {
    let event = state
        .service_context
        .event_repo
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Event not found".to_string()))?;

    let ticket_types = state.service_context.event_repo.ticket_types(id).await?;

    Ok(Json(EventDetail {
        event,
        ticket_types,
    }))
}

pub async fn create(
    State(state): State<AppState>,
    Extension(_user): Extension<CurrentUser>,
    Json(request): Json<CreateEventRequest>,
) -> Result<(StatusCode, Json<Event>)> {
    if request.title.trim().is_empty() {
        return Err(AppError::Validation("Event title is required".to_string()));
    }

    let event = state.service_context.event_repo.create(request).await?;
    Ok((StatusCode::CREATED, Json(event)))
}

pub async fn update(
    State(state): State<AppState>,
    Extension(_user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateEventRequest>,
) -> Result<Json<Event>> {
    let event = state.service_context.event_repo.update(id, request).await?;
    Ok(Json(event))
}

pub async fn delete(
    State(state): State<AppState>,
    Extension(_user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    state.service_context.event_repo.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub member_id: Uuid,
}

pub async fn register(
    State(state): State<AppState>,
    Extension(_user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>)> {
    let ctx = &state.service_context;

    ctx.event_repo
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Event not found".to_string()))?;
    ctx.member_repo
        .find_by_id(req.member_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Member not found".to_string()))?;

    ctx.event_repo.register_attendee(id, req.member_id).await?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "message": "Member registered" })),
    ))
}

pub async fn attendees(
    State(state): State<AppState>,
    Extension(_user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<Attendee>>> {
    state
        .service_context
        .event_repo
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Event not found".to_string()))?;

    let attendees = state.service_context.event_repo.list_attendees(id).await?;
    Ok(Json(attendees))
}

#[derive(Debug, Deserialize)]
pub struct SetAttendedRequest {
    pub attended: bool,
}

pub async fn set_attended(
    State(state): State<AppState>,
    Extension(_user): Extension<CurrentUser>,
    Path((id, member_id)): Path<(Uuid, Uuid)>,
    Json(req): Json<SetAttendedRequest>,
) -> Result<Json<serde_json::Value>> {
    state
        .service_context
        .event_repo
        .set_attended(id, member_id, req.attended)
        .await?;

    Ok(Json(serde_json::json!({ "message": "Attendance updated" })))
}

pub async fn record_payment(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    Json(request): Json<RecordEventPaymentRequest>,
) -> Result<(StatusCode, Json<EventPayment>)> {
    let payment = state
        .service_context
        .lifecycle
        .record_event_payment(id, request, Some(current.user.id))
        .await?;

    Ok((StatusCode::CREATED, Json(payment)))
}

pub async fn payments(
    State(state): State<AppState>,
    Extension(_user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<EventPayment>>> {
    state
        .service_context
        .event_repo
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Event not found".to_string()))?;

    let payments = state.service_context.payment_repo.list_by_event(id).await?;
    Ok(Json(payments))
}

use axum::{
    extract::{Extension, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    api::{middleware::auth::CurrentUser, state::AppState},
    domain::{Attendance, AttendanceStatus},
    error::{AppError, Result},
};

#[derive(Debug, Deserialize)]
pub struct RecordAttendanceRequest {
    pub member_id: Uuid,
    pub event_id: Uuid,
    pub status: AttendanceStatus,
}

/// Marks a member present (or absent/excused) at an event. One record per
/// (member, event) pair; a second attempt answers Conflict.
pub async fn record(
    State(state): State<AppState>,
    Extension(_user): Extension<CurrentUser>,
    Json(req): Json<RecordAttendanceRequest>,
) -> Result<(StatusCode, Json<Attendance>)> {
    let ctx = &state.service_context;

    ctx.member_repo
        .find_by_id(req.member_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Member not found".to_string()))?;
    ctx.event_repo
        .find_by_id(req.event_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Event not found".to_string()))?;

    let attendance = ctx
        .member_repo
        .record_attendance(req.member_id, req.event_id, req.status, Utc::now())
        .await?;

    Ok((StatusCode::CREATED, Json(attendance)))
}

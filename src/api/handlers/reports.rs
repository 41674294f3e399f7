use axum::{
    extract::{Extension, Path, State},
    Json,
};
use uuid::Uuid;

use crate::{
    api::{middleware::auth::CurrentUser, state::AppState},
    error::{AppError, Result},
    service::reports::{EventAttendanceReport, EventSummary, MemberAttendanceReport},
};

pub async fn member_attendance(
    State(state): State<AppState>,
    Extension(_user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<MemberAttendanceReport>> {
    state
        .service_context
        .member_repo
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Member not found".to_string()))?;

    let report = state.service_context.report_service.member_attendance(id).await?;
    Ok(Json(report))
}

pub async fn event_attendance(
    State(state): State<AppState>,
    Extension(_user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<EventAttendanceReport>> {
    state
        .service_context
        .event_repo
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Event not found".to_string()))?;

    let report = state.service_context.report_service.event_attendance(id).await?;
    Ok(Json(report))
}

pub async fn attendance_summary(
    State(state): State<AppState>,
    Extension(_user): Extension<CurrentUser>,
) -> Result<Json<Vec<EventSummary>>> {
    let summary = state.service_context.report_service.attendance_summary().await?;
    Ok(Json(summary))
}

use axum::{
    extract::{Extension, Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    api::{middleware::auth::CurrentUser, state::AppState},
    domain::{
        Attendance, CreateMemberRequest, Member, MemberFilter, MemberStatus, MembershipType,
        ReceiptRecord, RenewalRecord, UpdateMemberRequest, Zone,
    },
    error::{AppError, Result},
    qr,
    service::RenewMemberRequest,
};

#[derive(Debug, Deserialize)]
pub struct ListParams {
    #[serde(default = "default_limit")]
    limit: i64,
    #[serde(default)]
    offset: i64,
    zone: Option<Zone>,
    status: Option<MemberStatus>,
    membership_type: Option<MembershipType>,
}

fn default_limit() -> i64 {
    50
}

#[derive(Debug, Serialize)]
pub struct ListResponse {
    members: Vec<Member>,
    total: usize,
}

pub async fn list(
    State(state): State<AppState>,
    Extension(_user): Extension<CurrentUser>,
    Query(params): Query<ListParams>,
) -> Result<Json<ListResponse>> {
    let has_filter =
        params.zone.is_some() || params.status.is_some() || params.membership_type.is_some();

    let members = if has_filter {
        state
            .service_context
            .member_repo
            .filter(MemberFilter {
                zone: params.zone,
                status: params.status,
                membership_type: params.membership_type,
            })
            .await?
    } else {
        state
            .service_context
            .member_repo
            .list(params.limit, params.offset)
            .await?
    };

    let total = members.len();
    Ok(Json(ListResponse { members, total }))
}

pub async fn get(
    State(state): State<AppState>,
    Extension(_user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<Member>> {
    let member = state
        .service_context
        .member_repo
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Member not found".to_string()))?;

    Ok(Json(member))
}

pub async fn create(
    State(state): State<AppState>,
    Extension(_user): Extension<CurrentUser>,
    Json(request): Json<CreateMemberRequest>,
) -> Result<(StatusCode, Json<Member>)> {
    if request.email.trim().is_empty() || !request.email.contains('@') {
        return Err(AppError::Validation("A valid email is required".to_string()));
    }
    if request.first_name.trim().is_empty() || request.last_name.trim().is_empty() {
        return Err(AppError::Validation("First and last name are required".to_string()));
    }

    // Badge generation is part of creating a member, not a storage hook.
    let member_id = Uuid::new_v4();
    let qr_code = qr::member_badge_svg(member_id)?;

    let member = state
        .service_context
        .member_repo
        .create(member_id, request, qr_code)
        .await?;

    Ok((StatusCode::CREATED, Json(member)))
}

pub async fn update(
    State(state): State<AppState>,
    Extension(_user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateMemberRequest>,
) -> Result<Json<Member>> {
    let member = state.service_context.member_repo.update(id, request).await?;
    Ok(Json(member))
}

/// Members are never hard-deleted; this deactivates the record so history
/// and receipts stay intact.
pub async fn delete(
    State(state): State<AppState>,
    Extension(_user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<Member>> {
    let member = state.service_context.member_repo.deactivate(id).await?;
    Ok(Json(member))
}

pub async fn renew(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    Json(request): Json<RenewMemberRequest>,
) -> Result<Json<Member>> {
    let member = state
        .service_context
        .lifecycle
        .renew(id, request, Some(current.user.id))
        .await?;
    Ok(Json(member))
}

pub async fn renewals(
    State(state): State<AppState>,
    Extension(_user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<RenewalRecord>>> {
    let history = state.service_context.lifecycle.renewal_history(id).await?;
    Ok(Json(history))
}

pub async fn receipts(
    State(state): State<AppState>,
    Extension(_user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<ReceiptRecord>>> {
    state
        .service_context
        .member_repo
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Member not found".to_string()))?;

    let receipts = state.service_context.member_repo.receipts(id).await?;
    Ok(Json(receipts))
}

pub async fn attendance(
    State(state): State<AppState>,
    Extension(_user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<Attendance>>> {
    state
        .service_context
        .member_repo
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Member not found".to_string()))?;

    let attendances = state.service_context.member_repo.attendances(id).await?;
    Ok(Json(attendances))
}

/// Serves the stored badge as an SVG image.
pub async fn qr_badge(
    State(state): State<AppState>,
    Extension(_user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let member = state
        .service_context
        .member_repo
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Member not found".to_string()))?;

    Ok((
        [(header::CONTENT_TYPE, "image/svg+xml")],
        member.qr_code,
    ))
}

use axum::{
    extract::{Extension, Path, State},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    api::{middleware::auth::CurrentUser, state::AppState},
    domain::{EventPayment, PaymentStatus},
    error::{AppError, Result},
};

pub async fn get(
    State(state): State<AppState>,
    Extension(_user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<EventPayment>> {
    let payment = state
        .service_context
        .payment_repo
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Payment not found".to_string()))?;

    Ok(Json(payment))
}

pub async fn list_by_member(
    State(state): State<AppState>,
    Extension(_user): Extension<CurrentUser>,
    Path(member_id): Path<Uuid>,
) -> Result<Json<Vec<EventPayment>>> {
    state
        .service_context
        .member_repo
        .find_by_id(member_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Member not found".to_string()))?;

    let payments = state
        .service_context
        .payment_repo
        .list_by_member(member_id)
        .await?;
    Ok(Json(payments))
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: PaymentStatus,
}

/// Moves a payment along its status transitions; anything else answers
/// Conflict. Confirming a cash payment is the main use.
pub async fn update_status(
    State(state): State<AppState>,
    Extension(_user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateStatusRequest>,
) -> Result<Json<EventPayment>> {
    let payment = state
        .service_context
        .payment_repo
        .update_status(id, req.status)
        .await?;

    Ok(Json(payment))
}

use axum::{
    extract::{Extension, State},
    Json,
};

use crate::{
    api::{middleware::auth::CurrentUser, state::AppState},
    error::Result,
    service::RunReport,
};

/// Manual trigger for the monthly auto-renewal job. Same code path the
/// scheduler runs; handy after fixing a member's payment details.
pub async fn run_auto_renewals(
    State(state): State<AppState>,
    Extension(_user): Extension<CurrentUser>,
) -> Result<Json<RunReport>> {
    let report = state.service_context.lifecycle.run_auto_renewals().await?;
    Ok(Json(report))
}

pub async fn run_expiry_sweep(
    State(state): State<AppState>,
    Extension(_user): Extension<CurrentUser>,
) -> Result<Json<RunReport>> {
    let report = state.service_context.lifecycle.expire_overdue().await?;
    Ok(Json(report))
}

pub async fn run_renewal_reminders(
    State(state): State<AppState>,
    Extension(_user): Extension<CurrentUser>,
) -> Result<Json<RunReport>> {
    let report = state.service_context.lifecycle.send_renewal_reminders().await?;
    Ok(Json(report))
}

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};

use crate::{
    api::state::AppState,
    domain::{Role, User},
    error::AppError,
};

/// The authenticated user, resolved once per request and stashed in the
/// request extensions for handlers to pick up.
#[derive(Clone)]
pub struct CurrentUser {
    pub user: User,
}

async fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<User, AppError> {
    let header = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(AppError::Unauthorized)?;

    let token = header
        .strip_prefix("Bearer ")
        .ok_or(AppError::Unauthorized)?;

    let claims = state
        .service_context
        .auth_service
        .issuer()
        .verify_access(token)?;

    // Claims carry enough to serve the request, but re-resolving the user
    // lets a deleted account fail fast instead of riding out its token.
    state
        .service_context
        .user_repo
        .find_by_id(claims.sub)
        .await?
        .ok_or(AppError::Unauthorized)
}

pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let user = authenticate(&state, request.headers()).await?;
    request.extensions_mut().insert(CurrentUser { user });
    Ok(next.run(request).await)
}

pub async fn require_admin(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let user = authenticate(&state, request.headers()).await?;

    if user.role != Role::Admin {
        return Err(AppError::Forbidden);
    }

    request.extensions_mut().insert(CurrentUser { user });
    Ok(next.run(request).await)
}

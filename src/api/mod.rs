pub mod handlers;
pub mod middleware;
pub mod state;

use axum::{
    routing::{delete, get, patch, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

use crate::{config::Settings, service::ServiceContext};
use state::AppState;

pub fn create_app(service_context: Arc<ServiceContext>, settings: Arc<Settings>) -> Router {
    let app_state = AppState::new(service_context, settings);

    Router::new()
        // Root and health endpoints
        .route("/", get(handlers::root::root))
        .route("/health", get(handlers::root::health_check))
        // Auth routes
        .nest("/auth", auth_routes(app_state.clone()))
        // API routes
        .nest("/api", api_routes(app_state.clone()))
        // Admin routes
        .nest("/admin", admin_routes(app_state.clone()))
        .with_state(app_state)
        // Middleware
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive()) // Configure properly for production
        .layer(TraceLayer::new_for_http())
}

fn auth_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/register", post(handlers::auth::register))
        .route("/login", post(handlers::auth::login))
        .route("/refresh", post(handlers::auth::refresh))
        .route("/logout", post(handlers::auth::logout))
        .route("/forgot-password", post(handlers::auth::forgot_password))
        .route("/reset-password", post(handlers::auth::reset_password))
        .route("/verify-email", get(handlers::auth::verify_email))
        .route(
            "/resend-verification",
            post(handlers::auth::resend_verification),
        )
        .route(
            "/me",
            get(handlers::auth::me).route_layer(axum::middleware::from_fn_with_state(
                state,
                middleware::auth::require_auth,
            )),
        )
}

fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .nest("/members", member_routes(state.clone()))
        .nest("/events", event_routes(state.clone()))
        .nest("/payments", payment_routes(state.clone()))
        .nest("/attendance", attendance_routes(state.clone()))
        .nest("/reports", report_routes(state))
}

fn member_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::members::list))
        .route("/", post(handlers::members::create))
        .route("/:id", get(handlers::members::get))
        .route("/:id", put(handlers::members::update))
        .route("/:id", delete(handlers::members::delete))
        .route("/:id/renew", post(handlers::members::renew))
        .route("/:id/renewals", get(handlers::members::renewals))
        .route("/:id/receipts", get(handlers::members::receipts))
        .route("/:id/attendance", get(handlers::members::attendance))
        .route("/:id/qr", get(handlers::members::qr_badge))
        .route_layer(axum::middleware::from_fn_with_state(
            state,
            middleware::auth::require_auth,
        ))
}

fn event_routes(state: AppState) -> Router<AppState> {
    Router::new()
        // Public routes (no auth required for viewing)
        .route("/", get(handlers::events::list))
        .route("/:id", get(handlers::events::get))
        // Protected routes - merged in with their own auth layer
        .merge(
            Router::new()
                .route("/", post(handlers::events::create))
                .route("/:id", put(handlers::events::update))
                .route("/:id", delete(handlers::events::delete))
                .route("/:id/register", post(handlers::events::register))
                .route("/:id/attendees", get(handlers::events::attendees))
                .route(
                    "/:id/attendees/:member_id",
                    patch(handlers::events::set_attended),
                )
                .route("/:id/payments", post(handlers::events::record_payment))
                .route("/:id/payments", get(handlers::events::payments))
                .route_layer(axum::middleware::from_fn_with_state(
                    state,
                    middleware::auth::require_auth,
                )),
        )
}

fn payment_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/:id", get(handlers::payments::get))
        .route("/:id/status", patch(handlers::payments::update_status))
        .route(
            "/member/:member_id",
            get(handlers::payments::list_by_member),
        )
        .route_layer(axum::middleware::from_fn_with_state(
            state,
            middleware::auth::require_auth,
        ))
}

fn attendance_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", post(handlers::attendance::record))
        .route_layer(axum::middleware::from_fn_with_state(
            state,
            middleware::auth::require_auth,
        ))
}

fn report_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/members/:id/attendance",
            get(handlers::reports::member_attendance),
        )
        .route(
            "/events/:id/attendance",
            get(handlers::reports::event_attendance),
        )
        .route(
            "/attendance/summary",
            get(handlers::reports::attendance_summary),
        )
        .route_layer(axum::middleware::from_fn_with_state(
            state,
            middleware::auth::require_auth,
        ))
}

fn admin_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/jobs/auto-renewals", post(handlers::admin::run_auto_renewals))
        .route("/jobs/expiry-sweep", post(handlers::admin::run_expiry_sweep))
        .route(
            "/jobs/renewal-reminders",
            post(handlers::admin::run_renewal_reminders),
        )
        .route_layer(axum::middleware::from_fn_with_state(
            state,
            middleware::auth::require_admin,
        ))
}

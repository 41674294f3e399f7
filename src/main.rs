use std::sync::Arc;

use sqlx::sqlite::SqlitePoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rollbook::{
    api,
    auth::{AuthService, LockoutPolicy, TokenIssuer},
    config::Settings,
    notify::{NoopNotifier, Notifier, SmtpNotifier},
    payments::{DisabledGateway, PaymentGateway, RazorpayClient},
    repository,
    scheduler,
    service::{clock::SystemClock, MembershipLifecycle, ServiceContext},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Environment first so config can pick up ROLLBOOK__* variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rollbook=debug,tower_http=debug,axum=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let settings = Settings::new().unwrap_or_else(|e| {
        tracing::warn!("Failed to load config: {}. Using defaults.", e);
        Settings::default()
    });

    tracing::info!(
        "Starting Rollbook server on {}:{}",
        settings.server.host,
        settings.server.port
    );

    // Initialize database
    let db_pool = SqlitePoolOptions::new()
        .max_connections(settings.database.max_connections)
        .connect(&settings.database.url)
        .await?;

    // Run migrations
    sqlx::migrate!("./migrations").run(&db_pool).await?;

    // Initialize repositories
    let member_repo = Arc::new(repository::SqliteMemberRepository::new(db_pool.clone()));
    let user_repo = Arc::new(repository::SqliteUserRepository::new(db_pool.clone()));
    let event_repo = Arc::new(repository::SqliteEventRepository::new(db_pool.clone()));
    let payment_repo = Arc::new(repository::SqlitePaymentRepository::new(db_pool.clone()));

    // Auth stack
    let clock = Arc::new(SystemClock);
    let issuer = Arc::new(TokenIssuer::new(&settings.auth, clock.clone()));
    let auth_service = Arc::new(AuthService::new(
        user_repo.clone(),
        issuer,
        LockoutPolicy::from_config(&settings.auth),
        clock.clone(),
        settings.auth.skip_email_verification,
    ));

    // Payment gateway
    let gateway: Arc<dyn PaymentGateway> = match RazorpayClient::new(&settings.razorpay) {
        Some(client) => {
            tracing::info!("Razorpay payment processing enabled");
            Arc::new(client)
        }
        None => {
            tracing::info!("Razorpay payment processing disabled");
            Arc::new(DisabledGateway)
        }
    };

    // Email delivery
    let notifier: Arc<dyn Notifier> = match SmtpNotifier::new(&settings.email) {
        Some(mailer) => {
            tracing::info!("SMTP email delivery enabled");
            Arc::new(mailer)
        }
        None => {
            tracing::info!("Email delivery disabled");
            Arc::new(NoopNotifier)
        }
    };

    let lifecycle = Arc::new(MembershipLifecycle::new(
        member_repo.clone(),
        event_repo.clone(),
        payment_repo.clone(),
        gateway,
        notifier.clone(),
        clock,
        settings.membership.clone(),
    ));

    // Create service context
    let service_context = Arc::new(ServiceContext::new(
        member_repo,
        user_repo,
        event_repo,
        payment_repo,
        auth_service,
        lifecycle.clone(),
        notifier,
        db_pool,
    ));

    // Background jobs: daily reminders + expiry sweep, monthly auto-renew.
    // Held for the life of the process; dropping it would stop the jobs.
    let _scheduler = scheduler::start(lifecycle).await?;

    let app = api::create_app(service_context, Arc::new(settings.clone()));

    let listener = tokio::net::TcpListener::bind(format!(
        "{}:{}",
        settings.server.host, settings.server.port
    ))
    .await?;

    tracing::info!(
        "Server listening on http://{}:{}",
        settings.server.host,
        settings.server.port
    );

    axum::serve(listener, app).await?;

    Ok(())
}

pub mod clock;
pub mod lifecycle;
pub mod reports;

use sqlx::SqlitePool;
use std::sync::Arc;

use crate::auth::AuthService;
use crate::notify::Notifier;
use crate::repository::*;

pub use clock::{Clock, SystemClock};
pub use lifecycle::{MembershipLifecycle, RecordEventPaymentRequest, RenewMemberRequest, RunReport};
pub use reports::ReportService;

#[cfg(any(test, feature = "test-utils"))]
pub use clock::FixedClock;

pub struct ServiceContext {
    pub member_repo: Arc<dyn MemberRepository>,
    pub user_repo: Arc<dyn UserRepository>,
    pub event_repo: Arc<dyn EventRepository>,
    pub payment_repo: Arc<dyn PaymentRepository>,
    pub auth_service: Arc<AuthService>,
    pub lifecycle: Arc<MembershipLifecycle>,
    pub report_service: Arc<ReportService>,
    pub notifier: Arc<dyn Notifier>,
    pub db_pool: SqlitePool,
}

impl ServiceContext {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        member_repo: Arc<dyn MemberRepository>,
        user_repo: Arc<dyn UserRepository>,
        event_repo: Arc<dyn EventRepository>,
        payment_repo: Arc<dyn PaymentRepository>,
        auth_service: Arc<AuthService>,
        lifecycle: Arc<MembershipLifecycle>,
        notifier: Arc<dyn Notifier>,
        db_pool: SqlitePool,
    ) -> Self {
        let report_service = Arc::new(ReportService::new(db_pool.clone()));

        Self {
            member_repo,
            user_repo,
            event_repo,
            payment_repo,
            auth_service,
            lifecycle,
            report_service,
            notifier,
            db_pool,
        }
    }
}

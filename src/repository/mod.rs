use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::*;
use crate::error::Result;

pub mod event_repository;
pub mod member_repository;
pub mod payment_repository;
pub mod user_repository;

pub use event_repository::SqliteEventRepository;
pub use member_repository::SqliteMemberRepository;
pub use payment_repository::SqlitePaymentRepository;
pub use user_repository::SqliteUserRepository;

#[async_trait]
pub trait MemberRepository: Send + Sync {
    /// The caller picks the id and generates the QR badge as an explicit
    /// creation step, not a persistence hook (the badge encodes the id).
    async fn create(&self, id: Uuid, request: CreateMemberRequest, qr_code: String)
        -> Result<Member>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Member>>;
    async fn find_by_email(&self, email: &str) -> Result<Option<Member>>;
    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<Member>>;
    async fn filter(&self, filter: MemberFilter) -> Result<Vec<Member>>;
    async fn update(&self, id: Uuid, update: UpdateMemberRequest) -> Result<Member>;
    /// Soft delete: members are deactivated, never removed.
    async fn deactivate(&self, id: Uuid) -> Result<Member>;

    /// Applies a renewal atomically: new expiry + Active status + appended
    /// renewal record (+ receipt, when a charge backs the renewal) in one
    /// transaction.
    async fn apply_renewal(
        &self,
        id: Uuid,
        new_expiry: DateTime<Utc>,
        renewed_by: Option<Uuid>,
        notes: Option<String>,
        receipt: Option<NewReceipt>,
        now: DateTime<Utc>,
    ) -> Result<Member>;

    async fn renewal_history(&self, id: Uuid) -> Result<Vec<RenewalRecord>>;
    async fn receipts(&self, id: Uuid) -> Result<Vec<ReceiptRecord>>;

    /// Members with auto-renew enabled whose expiry falls on or before the
    /// cutoff.
    async fn list_due_for_auto_renewal(&self, cutoff: DateTime<Utc>) -> Result<Vec<Member>>;
    /// Members whose expiry has passed and who are not yet Inactive.
    async fn list_overdue(&self, now: DateTime<Utc>) -> Result<Vec<Member>>;
    /// Members expiring inside the (start, end] reminder window.
    async fn list_expiring_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Member>>;
    async fn mark_inactive(&self, id: Uuid, now: DateTime<Utc>) -> Result<Member>;

    /// Duplicate (member, event) pairs are rejected with Conflict.
    async fn record_attendance(
        &self,
        member_id: Uuid,
        event_id: Uuid,
        status: AttendanceStatus,
        now: DateTime<Utc>,
    ) -> Result<Attendance>;
    async fn attendances(&self, member_id: Uuid) -> Result<Vec<Attendance>>;
}

/// Fields of a receipt row created inside another repository transaction.
#[derive(Debug, Clone)]
pub struct NewReceipt {
    pub amount_minor: i64,
    pub payment_method: PaymentMethod,
    pub transaction_id: Option<String>,
    pub recorded_by: Option<Uuid>,
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, request: CreateUserRequest) -> Result<User>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;
    async fn find_by_member(&self, member_id: Uuid) -> Result<Option<User>>;

    /// Conditional increment: bumps `login_attempts` and sets `lock_until`
    /// only when the incremented count reaches `max_attempts`, and only if
    /// the account is not currently locked. Single UPDATE, no
    /// read-modify-write.
    async fn record_failed_attempt(
        &self,
        id: Uuid,
        max_attempts: i64,
        lock_until: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<()>;
    /// Resets the attempt counter, clears any lock, stamps `last_login`.
    async fn record_success(&self, id: Uuid, now: DateTime<Utc>) -> Result<()>;

    /// Replaces the password hash and clears lockout state and any pending
    /// reset token.
    async fn set_password(&self, id: Uuid, password_hash: String, now: DateTime<Utc>)
        -> Result<()>;

    async fn set_reset_token(
        &self,
        id: Uuid,
        token_hash: String,
        expires: DateTime<Utc>,
    ) -> Result<()>;
    async fn find_by_reset_token(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<User>>;

    async fn set_verify_token(
        &self,
        id: Uuid,
        token_hash: String,
        expires: DateTime<Utc>,
    ) -> Result<()>;
    async fn find_by_verify_token(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<User>>;
    async fn mark_verified(&self, id: Uuid, now: DateTime<Utc>) -> Result<()>;
}

#[async_trait]
pub trait EventRepository: Send + Sync {
    async fn create(&self, request: CreateEventRequest) -> Result<Event>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Event>>;
    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<Event>>;
    async fn update(&self, id: Uuid, update: UpdateEventRequest) -> Result<Event>;
    async fn delete(&self, id: Uuid) -> Result<()>;

    async fn register_attendee(&self, event_id: Uuid, member_id: Uuid) -> Result<()>;
    async fn find_attendee(&self, event_id: Uuid, member_id: Uuid) -> Result<Option<Attendee>>;
    async fn list_attendees(&self, event_id: Uuid) -> Result<Vec<Attendee>>;
    /// Conditional update; NotFound when the member is not registered.
    async fn set_attended(&self, event_id: Uuid, member_id: Uuid, attended: bool) -> Result<()>;

    async fn ticket_types(&self, event_id: Uuid) -> Result<Vec<TicketType>>;
}

#[async_trait]
pub trait PaymentRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<EventPayment>>;
    async fn list_by_event(&self, event_id: Uuid) -> Result<Vec<EventPayment>>;
    async fn list_by_member(&self, member_id: Uuid) -> Result<Vec<EventPayment>>;

    /// Writes the payment, flips the attendee's payment status to Paid,
    /// bumps the event's revenue and appends the member's receipt record in
    /// one transaction. A failure in any step rolls back all of them.
    async fn record_event_payment(
        &self,
        payment: EventPayment,
        receipt: NewReceipt,
    ) -> Result<EventPayment>;

    /// Guarded status move: the UPDATE is conditional on the current status
    /// so concurrent updates cannot produce an illegal transition.
    async fn update_status(&self, id: Uuid, status: PaymentStatus) -> Result<EventPayment>;
}

use std::sync::Arc;

use chrono::{DateTime, Duration, Months, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    config::MembershipConfig,
    domain::{EventPayment, Member, PaymentMethod, PaymentStatus, RenewalRecord},
    error::{AppError, Result},
    notify::{EmailMessage, Notifier},
    payments::PaymentGateway,
    repository::{EventRepository, MemberRepository, NewReceipt, PaymentRepository},
    service::clock::Clock,
};

/// Months granted by every automatic renewal.
const AUTO_RENEW_MONTHS: u32 = 12;

/// How far ahead the auto-renewal job looks for expiring memberships.
const AUTO_RENEW_LOOKAHEAD_DAYS: i64 = 7;

/// Renewing always extends from whichever is later: today, or the current
/// expiry when it is still in the future. Renewing early never shortens a
/// membership, and renewing late never backdates one.
pub fn extend_expiry(
    current: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    months: u32,
) -> Result<DateTime<Utc>> {
    let base = match current {
        Some(expiry) if expiry > now => expiry,
        _ => now,
    };

    base.checked_add_months(Months::new(months))
        .ok_or_else(|| AppError::Internal("Expiry date out of range".to_string()))
}

#[derive(Debug, Clone, Deserialize)]
pub struct RenewMemberRequest {
    #[serde(default = "default_renewal_months")]
    pub months: u32,
    pub payment_method: Option<PaymentMethod>,
    pub transaction_id: Option<String>,
    /// Overrides the fee derived from the configured annual rate.
    pub amount_minor: Option<i64>,
    pub notes: Option<String>,
}

fn default_renewal_months() -> u32 {
    12
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecordEventPaymentRequest {
    pub member_id: Uuid,
    pub amount_minor: i64,
    pub payment_method: PaymentMethod,
    pub ticket_type: Option<String>,
    pub transaction_id: Option<String>,
}

/// Outcome of one scheduled pass. Failures are per-member; one bad record
/// never aborts the run.
#[derive(Debug, Clone, Serialize, Default)]
pub struct RunReport {
    pub processed: usize,
    pub succeeded: usize,
    pub failures: Vec<RunFailure>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunFailure {
    pub member_id: Uuid,
    pub email: String,
    pub reason: String,
}

impl RunReport {
    fn success(&mut self) {
        self.processed += 1;
        self.succeeded += 1;
    }

    fn failure(&mut self, member: &Member, error: &AppError) {
        self.processed += 1;
        self.failures.push(RunFailure {
            member_id: member.id,
            email: member.email.clone(),
            reason: error.to_string(),
        });
    }
}

/// Membership renewals, expiry sweeps and event payments. Owns the rules
/// for when a membership lapses and what a renewal costs; persistence and
/// delivery are injected.
pub struct MembershipLifecycle {
    members: Arc<dyn MemberRepository>,
    events: Arc<dyn EventRepository>,
    payments: Arc<dyn PaymentRepository>,
    gateway: Arc<dyn PaymentGateway>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    config: MembershipConfig,
}

impl MembershipLifecycle {
    pub fn new(
        members: Arc<dyn MemberRepository>,
        events: Arc<dyn EventRepository>,
        payments: Arc<dyn PaymentRepository>,
        gateway: Arc<dyn PaymentGateway>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
        config: MembershipConfig,
    ) -> Self {
        Self {
            members,
            events,
            payments,
            gateway,
            notifier,
            clock,
            config,
        }
    }

    fn fee_for(&self, months: u32) -> i64 {
        self.config.annual_fee_minor * i64::from(months) / 12
    }

    /// Manual renewal by an admin or by the member themselves. Extends the
    /// expiry, reactivates the membership and appends the renewal record;
    /// when a payment method is given a receipt is written in the same
    /// transaction.
    pub async fn renew(
        &self,
        member_id: Uuid,
        request: RenewMemberRequest,
        renewed_by: Option<Uuid>,
    ) -> Result<Member> {
        if request.months == 0 {
            return Err(AppError::Validation(
                "Renewal must cover at least one month".to_string(),
            ));
        }

        let member = self
            .members
            .find_by_id(member_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Member not found".to_string()))?;

        let now = self.clock.now();
        let new_expiry = extend_expiry(member.expiry_date, now, request.months)?;

        let receipt = request.payment_method.map(|method| NewReceipt {
            amount_minor: request
                .amount_minor
                .unwrap_or_else(|| self.fee_for(request.months)),
            payment_method: method,
            transaction_id: request.transaction_id.clone(),
            recorded_by: renewed_by,
        });

        let renewed = self
            .members
            .apply_renewal(member_id, new_expiry, renewed_by, request.notes, receipt, now)
            .await?;

        if let Err(e) = self
            .notifier
            .send(renewal_confirmation_email(&renewed, new_expiry))
            .await
        {
            tracing::warn!(member_id = %member_id, "Renewal confirmation email failed: {}", e);
        }

        Ok(renewed)
    }

    pub async fn renewal_history(&self, member_id: Uuid) -> Result<Vec<RenewalRecord>> {
        self.members
            .find_by_id(member_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Member not found".to_string()))?;
        self.members.renewal_history(member_id).await
    }

    /// Records a payment for an event attendee. For gateway-backed methods
    /// the order is created first; the local write only happens once the
    /// gateway accepted the charge. Cash payments stay Pending until an
    /// admin confirms them.
    pub async fn record_event_payment(
        &self,
        event_id: Uuid,
        request: RecordEventPaymentRequest,
        recorded_by: Option<Uuid>,
    ) -> Result<EventPayment> {
        if request.amount_minor <= 0 {
            return Err(AppError::Validation(
                "Payment amount must be positive".to_string(),
            ));
        }

        self.events
            .find_by_id(event_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Event not found".to_string()))?;

        self.events
            .find_attendee(event_id, request.member_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound("Member not registered for this event".to_string())
            })?;

        let now = self.clock.now();
        let payment_id = Uuid::new_v4();

        let transaction_id = match request.payment_method {
            PaymentMethod::Razorpay => {
                let order = self
                    .gateway
                    .create_order(
                        request.amount_minor,
                        &self.config.currency,
                        &payment_id.to_string(),
                    )
                    .await?;
                Some(order.order_id)
            }
            _ => request.transaction_id.clone(),
        };

        let status = match request.payment_method {
            PaymentMethod::Cash => PaymentStatus::Pending,
            _ => PaymentStatus::Paid,
        };

        let payment = EventPayment {
            id: payment_id,
            event_id: Some(event_id),
            member_id: request.member_id,
            amount_minor: request.amount_minor,
            payment_method: request.payment_method,
            ticket_type: request.ticket_type,
            transaction_id: transaction_id.clone(),
            status,
            paid_at: now,
            created_at: now,
            updated_at: now,
        };

        let receipt = NewReceipt {
            amount_minor: request.amount_minor,
            payment_method: request.payment_method,
            transaction_id,
            recorded_by,
        };

        self.payments.record_event_payment(payment, receipt).await
    }

    /// Charges and renews every auto-renew member expiring within the next
    /// week. Each member is processed independently; a gateway decline or a
    /// write failure is reported and the run moves on.
    pub async fn run_auto_renewals(&self) -> Result<RunReport> {
        let now = self.clock.now();
        let cutoff = now + Duration::days(AUTO_RENEW_LOOKAHEAD_DAYS);
        let due = self.members.list_due_for_auto_renewal(cutoff).await?;

        let mut report = RunReport::default();
        for member in due {
            match self.auto_renew_one(&member, now).await {
                Ok(new_expiry) => {
                    report.success();
                    tracing::info!(member_id = %member.id, %new_expiry, "Auto-renewed membership");
                }
                Err(e) => {
                    tracing::warn!(member_id = %member.id, "Auto-renewal failed: {}", e);
                    if let Err(send_err) = self
                        .notifier
                        .send(renewal_failure_email(&member, &e))
                        .await
                    {
                        tracing::warn!(member_id = %member.id, "Failure notice email failed: {}", send_err);
                    }
                    report.failure(&member, &e);
                }
            }
        }

        tracing::info!(
            processed = report.processed,
            succeeded = report.succeeded,
            failed = report.failures.len(),
            "Auto-renewal run complete"
        );
        Ok(report)
    }

    async fn auto_renew_one(&self, member: &Member, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
        let amount = self.fee_for(AUTO_RENEW_MONTHS);

        let transaction_id = match member.default_payment_method {
            Some(PaymentMethod::Razorpay) | None => {
                let order = self
                    .gateway
                    .create_order(amount, &self.config.currency, &member.id.to_string())
                    .await?;
                Some(order.order_id)
            }
            Some(_) => None,
        };

        let new_expiry = extend_expiry(member.expiry_date, now, AUTO_RENEW_MONTHS)?;
        let receipt = NewReceipt {
            amount_minor: amount,
            payment_method: member.default_payment_method.unwrap_or(PaymentMethod::Razorpay),
            transaction_id,
            recorded_by: None,
        };

        let renewed = self
            .members
            .apply_renewal(
                member.id,
                new_expiry,
                None,
                Some("Automatic renewal".to_string()),
                Some(receipt),
                now,
            )
            .await?;

        if let Err(e) = self
            .notifier
            .send(renewal_confirmation_email(&renewed, new_expiry))
            .await
        {
            tracing::warn!(member_id = %member.id, "Renewal confirmation email failed: {}", e);
        }

        Ok(new_expiry)
    }

    /// Deactivates every member whose expiry has passed and lets them know.
    pub async fn expire_overdue(&self) -> Result<RunReport> {
        let now = self.clock.now();
        let overdue = self.members.list_overdue(now).await?;

        let mut report = RunReport::default();
        for member in overdue {
            match self.members.mark_inactive(member.id, now).await {
                Ok(_) => {
                    report.success();
                    if let Err(e) = self.notifier.send(membership_expired_email(&member)).await {
                        tracing::warn!(member_id = %member.id, "Expiry notice email failed: {}", e);
                    }
                }
                Err(e) => {
                    tracing::warn!(member_id = %member.id, "Failed to deactivate member: {}", e);
                    report.failure(&member, &e);
                }
            }
        }

        if report.processed > 0 {
            tracing::info!(
                expired = report.succeeded,
                failed = report.failures.len(),
                "Expiry sweep complete"
            );
        }
        Ok(report)
    }

    /// Reminds members whose membership lapses in roughly 30 days. The
    /// window is one day wide so a daily run sends each reminder once.
    pub async fn send_renewal_reminders(&self) -> Result<RunReport> {
        let now = self.clock.now();
        let start = now + Duration::days(29);
        let end = now + Duration::days(30);
        let expiring = self.members.list_expiring_between(start, end).await?;

        let mut report = RunReport::default();
        for member in expiring {
            let Some(expiry) = member.expiry_date else {
                continue;
            };
            match self.notifier.send(renewal_reminder_email(&member, expiry)).await {
                Ok(()) => report.success(),
                Err(e) => {
                    tracing::warn!(member_id = %member.id, "Reminder email failed: {}", e);
                    report.failure(&member, &e);
                }
            }
        }

        Ok(report)
    }
}

fn renewal_confirmation_email(member: &Member, new_expiry: DateTime<Utc>) -> EmailMessage {
    EmailMessage {
        to: member.email.clone(),
        subject: "Membership renewed".to_string(),
        html: format!(
            "<p>Hi {},</p>\
             <p>Your membership has been renewed. It is now valid until \
             <strong>{}</strong>.</p>",
            member.first_name,
            new_expiry.format("%Y-%m-%d"),
        ),
    }
}

fn renewal_failure_email(member: &Member, error: &AppError) -> EmailMessage {
    EmailMessage {
        to: member.email.clone(),
        subject: "Membership renewal failed".to_string(),
        html: format!(
            "<p>Hi {},</p>\
             <p>We could not renew your membership automatically: {}.</p>\
             <p>Please update your payment details or renew manually.</p>",
            member.first_name, error,
        ),
    }
}

fn membership_expired_email(member: &Member) -> EmailMessage {
    EmailMessage {
        to: member.email.clone(),
        subject: "Membership expired".to_string(),
        html: format!(
            "<p>Hi {},</p>\
             <p>Your membership has expired and your account is now inactive. \
             Renew at any time to restore access.</p>",
            member.first_name,
        ),
    }
}

fn renewal_reminder_email(member: &Member, expiry: DateTime<Utc>) -> EmailMessage {
    EmailMessage {
        to: member.email.clone(),
        subject: "Membership expiring soon".to_string(),
        html: format!(
            "<p>Hi {},</p>\
             <p>Your membership expires on <strong>{}</strong>. Renew now to \
             keep your access uninterrupted.</p>",
            member.first_name,
            expiry.format("%Y-%m-%d"),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn date(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    #[test]
    fn lapsed_membership_extends_from_today() {
        // Expired in January, renewed in June: the new year starts now,
        // not from the lapsed date.
        let expiry = extend_expiry(Some(date(2024, 1, 1)), date(2024, 6, 1), 12).unwrap();
        assert_eq!(expiry, date(2025, 6, 1));
    }

    #[test]
    fn active_membership_extends_from_current_expiry() {
        let expiry = extend_expiry(Some(date(2025, 1, 1)), date(2024, 6, 1), 12).unwrap();
        assert_eq!(expiry, date(2026, 1, 1));
    }

    #[test]
    fn first_renewal_starts_now() {
        let expiry = extend_expiry(None, date(2024, 6, 1), 6).unwrap();
        assert_eq!(expiry, date(2024, 12, 1));
    }

    #[test]
    fn expiry_exactly_now_extends_from_now() {
        let now = date(2024, 6, 1);
        let expiry = extend_expiry(Some(now), now, 12).unwrap();
        assert_eq!(expiry, date(2025, 6, 1));
    }
}

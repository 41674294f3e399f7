use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;

use crate::{
    domain::{AttendeePaymentStatus, EventPayment, PaymentMethod, PaymentStatus},
    error::{AppError, Result},
    repository::{NewReceipt, PaymentRepository},
};

#[derive(FromRow)]
struct PaymentRow {
    id: String,
    event_id: Option<String>,
    member_id: String,
    amount_minor: i64,
    payment_method: String,
    ticket_type: Option<String>,
    transaction_id: Option<String>,
    status: String,
    paid_at: NaiveDateTime,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

const PAYMENT_COLUMNS: &str = "id, event_id, member_id, amount_minor, payment_method, \
     ticket_type, transaction_id, status, paid_at, created_at, updated_at";

pub struct SqlitePaymentRepository {
    pool: SqlitePool,
}

impl SqlitePaymentRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_payment(row: PaymentRow) -> Result<EventPayment> {
        Ok(EventPayment {
            id: parse_uuid(&row.id)?,
            event_id: row.event_id.as_deref().map(parse_uuid).transpose()?,
            member_id: parse_uuid(&row.member_id)?,
            amount_minor: row.amount_minor,
            payment_method: PaymentMethod::parse(&row.payment_method)?,
            ticket_type: row.ticket_type,
            transaction_id: row.transaction_id,
            status: PaymentStatus::parse(&row.status)?,
            paid_at: to_utc(row.paid_at),
            created_at: to_utc(row.created_at),
            updated_at: to_utc(row.updated_at),
        })
    }
}

fn parse_uuid(s: &str) -> Result<Uuid> {
    Uuid::parse_str(s).map_err(|e| AppError::Database(e.to_string()))
}

fn to_utc(naive: NaiveDateTime) -> DateTime<Utc> {
    DateTime::from_naive_utc_and_offset(naive, Utc)
}

#[async_trait]
impl PaymentRepository for SqlitePaymentRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<EventPayment>> {
        let row = sqlx::query_as::<_, PaymentRow>(&format!(
            "SELECT {} FROM event_payments WHERE id = ?",
            PAYMENT_COLUMNS
        ))
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_payment).transpose()
    }

    async fn list_by_event(&self, event_id: Uuid) -> Result<Vec<EventPayment>> {
        let rows = sqlx::query_as::<_, PaymentRow>(&format!(
            "SELECT {} FROM event_payments WHERE event_id = ? ORDER BY created_at DESC",
            PAYMENT_COLUMNS
        ))
        .bind(event_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_payment).collect()
    }

    async fn list_by_member(&self, member_id: Uuid) -> Result<Vec<EventPayment>> {
        let rows = sqlx::query_as::<_, PaymentRow>(&format!(
            "SELECT {} FROM event_payments WHERE member_id = ? ORDER BY created_at DESC",
            PAYMENT_COLUMNS
        ))
        .bind(member_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_payment).collect()
    }

    async fn record_event_payment(
        &self,
        payment: EventPayment,
        receipt: NewReceipt,
    ) -> Result<EventPayment> {
        let event_id = payment
            .event_id
            .ok_or_else(|| AppError::BadRequest("Payment has no event".to_string()))?;

        let mut tx = self.pool.begin().await?;

        // The member must be registered before money moves.
        let attendee = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM event_attendees WHERE event_id = ? AND member_id = ?",
        )
        .bind(event_id.to_string())
        .bind(payment.member_id.to_string())
        .fetch_one(&mut *tx)
        .await?;

        if attendee == 0 {
            return Err(AppError::NotFound(
                "Member not registered for this event".to_string(),
            ));
        }

        sqlx::query(
            r#"
            INSERT INTO event_payments (
                id, event_id, member_id, amount_minor, payment_method, ticket_type,
                transaction_id, status, paid_at, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(payment.id.to_string())
        .bind(event_id.to_string())
        .bind(payment.member_id.to_string())
        .bind(payment.amount_minor)
        .bind(payment.payment_method.as_str())
        .bind(&payment.ticket_type)
        .bind(&payment.transaction_id)
        .bind(payment.status.as_str())
        .bind(payment.paid_at.naive_utc())
        .bind(payment.created_at.naive_utc())
        .bind(payment.updated_at.naive_utc())
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "UPDATE event_attendees SET payment_status = ? WHERE event_id = ? AND member_id = ?",
        )
        .bind(AttendeePaymentStatus::Paid.as_str())
        .bind(event_id.to_string())
        .bind(payment.member_id.to_string())
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "UPDATE events SET total_revenue_minor = total_revenue_minor + ?, updated_at = ? WHERE id = ?",
        )
        .bind(payment.amount_minor)
        .bind(payment.updated_at.naive_utc())
        .bind(event_id.to_string())
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO receipt_records (
                id, member_id, amount_minor, payment_method, transaction_id,
                recorded_by, paid_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(payment.member_id.to_string())
        .bind(receipt.amount_minor)
        .bind(receipt.payment_method.as_str())
        .bind(&receipt.transaction_id)
        .bind(receipt.recorded_by.map(|u| u.to_string()))
        .bind(payment.paid_at.naive_utc())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(payment)
    }

    async fn update_status(&self, id: Uuid, status: PaymentStatus) -> Result<EventPayment> {
        let current = self
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Payment not found".to_string()))?;

        if !current.status.can_transition_to(status) {
            return Err(AppError::Conflict(format!(
                "Cannot move payment from {} to {}",
                current.status.as_str(),
                status.as_str()
            )));
        }

        // Conditional on the status we just checked, so a concurrent
        // update loses cleanly instead of producing an illegal transition.
        let result = sqlx::query(
            "UPDATE event_payments SET status = ?, updated_at = ? WHERE id = ? AND status = ?",
        )
        .bind(status.as_str())
        .bind(Utc::now().naive_utc())
        .bind(id.to_string())
        .bind(current.status.as_str())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::Conflict(
                "Payment status changed concurrently".to_string(),
            ));
        }

        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::Database("Failed to retrieve updated payment".to_string()))
    }
}

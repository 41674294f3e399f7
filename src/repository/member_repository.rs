use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;

use crate::{
    domain::{
        Attendance, AttendanceStatus, CreateMemberRequest, Member, MemberFilter, MemberStatus,
        MembershipType, PaymentMethod, ReceiptRecord, RenewalRecord, UpdateMemberRequest, Zone,
    },
    error::{AppError, Result},
    repository::{MemberRepository, NewReceipt},
};

// Database row struct that matches the SQLite schema
#[derive(FromRow)]
struct MemberRow {
    id: String,
    first_name: String,
    last_name: String,
    email: String,
    phone: Option<String>,
    zone: String,
    membership_type: String,
    status: String,
    join_date: NaiveDateTime,
    expiry_date: Option<NaiveDateTime>,
    qr_code: String,
    auto_renew: i32,
    default_payment_method: Option<String>,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

const MEMBER_COLUMNS: &str = "id, first_name, last_name, email, phone, zone, membership_type, \
     status, join_date, expiry_date, qr_code, auto_renew, default_payment_method, \
     created_at, updated_at";

pub struct SqliteMemberRepository {
    pool: SqlitePool,
}

impl SqliteMemberRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_member(row: MemberRow) -> Result<Member> {
        Ok(Member {
            id: parse_uuid(&row.id)?,
            first_name: row.first_name,
            last_name: row.last_name,
            email: row.email,
            phone: row.phone,
            zone: Zone::parse(&row.zone)?,
            membership_type: MembershipType::parse(&row.membership_type)?,
            status: MemberStatus::parse(&row.status)?,
            join_date: to_utc(row.join_date),
            expiry_date: row.expiry_date.map(to_utc),
            qr_code: row.qr_code,
            auto_renew: row.auto_renew != 0,
            default_payment_method: row
                .default_payment_method
                .as_deref()
                .map(PaymentMethod::parse)
                .transpose()?,
            created_at: to_utc(row.created_at),
            updated_at: to_utc(row.updated_at),
        })
    }

    async fn fetch_required(&self, id: Uuid) -> Result<Member> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Member not found".to_string()))
    }
}

fn parse_uuid(s: &str) -> Result<Uuid> {
    Uuid::parse_str(s).map_err(|e| AppError::Database(e.to_string()))
}

fn to_utc(naive: NaiveDateTime) -> DateTime<Utc> {
    DateTime::from_naive_utc_and_offset(naive, Utc)
}

#[async_trait]
impl MemberRepository for SqliteMemberRepository {
    async fn create(
        &self,
        id: Uuid,
        request: CreateMemberRequest,
        qr_code: String,
    ) -> Result<Member> {
        let now = Utc::now().naive_utc();

        sqlx::query(
            r#"
            INSERT INTO members (
                id, first_name, last_name, email, phone, zone, membership_type,
                status, join_date, qr_code, auto_renew, default_payment_method,
                created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(id.to_string())
        .bind(&request.first_name)
        .bind(&request.last_name)
        .bind(&request.email)
        .bind(&request.phone)
        .bind(request.zone.as_str())
        .bind(request.membership_type.as_str())
        .bind(MemberStatus::Pending.as_str())
        .bind(now)
        .bind(&qr_code)
        .bind(request.auto_renew as i32)
        .bind(request.default_payment_method.map(|m| m.as_str()))
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                AppError::Conflict("Email already exists".to_string())
            }
            _ => AppError::Database(e.to_string()),
        })?;

        self.fetch_required(id).await
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Member>> {
        let row = sqlx::query_as::<_, MemberRow>(&format!(
            "SELECT {} FROM members WHERE id = ?",
            MEMBER_COLUMNS
        ))
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_member).transpose()
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Member>> {
        let row = sqlx::query_as::<_, MemberRow>(&format!(
            "SELECT {} FROM members WHERE email = ?",
            MEMBER_COLUMNS
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_member).transpose()
    }

    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<Member>> {
        let rows = sqlx::query_as::<_, MemberRow>(&format!(
            "SELECT {} FROM members ORDER BY created_at DESC LIMIT ? OFFSET ?",
            MEMBER_COLUMNS
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_member).collect()
    }

    async fn filter(&self, filter: MemberFilter) -> Result<Vec<Member>> {
        let rows = sqlx::query_as::<_, MemberRow>(&format!(
            r#"
            SELECT {} FROM members
            WHERE (? IS NULL OR zone = ?)
              AND (? IS NULL OR status = ?)
              AND (? IS NULL OR membership_type = ?)
            ORDER BY last_name, first_name
            "#,
            MEMBER_COLUMNS
        ))
        .bind(filter.zone.map(|z| z.as_str()))
        .bind(filter.zone.map(|z| z.as_str()))
        .bind(filter.status.map(|s| s.as_str()))
        .bind(filter.status.map(|s| s.as_str()))
        .bind(filter.membership_type.map(|t| t.as_str()))
        .bind(filter.membership_type.map(|t| t.as_str()))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_member).collect()
    }

    async fn update(&self, id: Uuid, update: UpdateMemberRequest) -> Result<Member> {
        let existing = self.fetch_required(id).await?;
        let now = Utc::now().naive_utc();

        sqlx::query(
            r#"
            UPDATE members
            SET first_name = COALESCE(?, first_name),
                last_name = COALESCE(?, last_name),
                phone = COALESCE(?, phone),
                zone = ?,
                membership_type = ?,
                status = ?,
                expiry_date = COALESCE(?, expiry_date),
                auto_renew = COALESCE(?, auto_renew),
                default_payment_method = COALESCE(?, default_payment_method),
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&update.first_name)
        .bind(&update.last_name)
        .bind(&update.phone)
        .bind(update.zone.unwrap_or(existing.zone).as_str())
        .bind(
            update
                .membership_type
                .unwrap_or(existing.membership_type)
                .as_str(),
        )
        .bind(update.status.unwrap_or(existing.status).as_str())
        .bind(update.expiry_date.map(|dt| dt.naive_utc()))
        .bind(update.auto_renew.map(|b| b as i32))
        .bind(update.default_payment_method.map(|m| m.as_str()))
        .bind(now)
        .bind(id.to_string())
        .execute(&self.pool)
        .await?;

        self.fetch_required(id).await
    }

    async fn deactivate(&self, id: Uuid) -> Result<Member> {
        let result = sqlx::query("UPDATE members SET status = ?, updated_at = ? WHERE id = ?")
            .bind(MemberStatus::Inactive.as_str())
            .bind(Utc::now().naive_utc())
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Member not found".to_string()));
        }

        self.fetch_required(id).await
    }

    async fn apply_renewal(
        &self,
        id: Uuid,
        new_expiry: DateTime<Utc>,
        renewed_by: Option<Uuid>,
        notes: Option<String>,
        receipt: Option<NewReceipt>,
        now: DateTime<Utc>,
    ) -> Result<Member> {
        let mut tx = self.pool.begin().await?;
        let now_naive = now.naive_utc();

        let result = sqlx::query(
            "UPDATE members SET expiry_date = ?, status = ?, updated_at = ? WHERE id = ?",
        )
        .bind(new_expiry.naive_utc())
        .bind(MemberStatus::Active.as_str())
        .bind(now_naive)
        .bind(id.to_string())
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Member not found".to_string()));
        }

        sqlx::query(
            "INSERT INTO renewal_history (id, member_id, date, renewed_by, notes) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(id.to_string())
        .bind(now_naive)
        .bind(renewed_by.map(|u| u.to_string()))
        .bind(&notes)
        .execute(&mut *tx)
        .await?;

        if let Some(receipt) = receipt {
            sqlx::query(
                r#"
                INSERT INTO receipt_records (
                    id, member_id, amount_minor, payment_method, transaction_id,
                    recorded_by, paid_at
                ) VALUES (?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(Uuid::new_v4().to_string())
            .bind(id.to_string())
            .bind(receipt.amount_minor)
            .bind(receipt.payment_method.as_str())
            .bind(&receipt.transaction_id)
            .bind(receipt.recorded_by.map(|u| u.to_string()))
            .bind(now_naive)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        self.fetch_required(id).await
    }

    async fn renewal_history(&self, id: Uuid) -> Result<Vec<RenewalRecord>> {
        #[derive(FromRow)]
        struct Row {
            id: String,
            member_id: String,
            date: NaiveDateTime,
            renewed_by: Option<String>,
            notes: Option<String>,
        }

        let rows = sqlx::query_as::<_, Row>(
            "SELECT id, member_id, date, renewed_by, notes FROM renewal_history WHERE member_id = ? ORDER BY date",
        )
        .bind(id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|r| {
                Ok(RenewalRecord {
                    id: parse_uuid(&r.id)?,
                    member_id: parse_uuid(&r.member_id)?,
                    date: to_utc(r.date),
                    renewed_by: r.renewed_by.as_deref().map(parse_uuid).transpose()?,
                    notes: r.notes,
                })
            })
            .collect()
    }

    async fn receipts(&self, id: Uuid) -> Result<Vec<ReceiptRecord>> {
        #[derive(FromRow)]
        struct Row {
            id: String,
            member_id: String,
            amount_minor: i64,
            payment_method: String,
            transaction_id: Option<String>,
            recorded_by: Option<String>,
            paid_at: NaiveDateTime,
        }

        let rows = sqlx::query_as::<_, Row>(
            r#"
            SELECT id, member_id, amount_minor, payment_method, transaction_id,
                   recorded_by, paid_at
            FROM receipt_records WHERE member_id = ? ORDER BY paid_at
            "#,
        )
        .bind(id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|r| {
                Ok(ReceiptRecord {
                    id: parse_uuid(&r.id)?,
                    member_id: parse_uuid(&r.member_id)?,
                    amount_minor: r.amount_minor,
                    payment_method: PaymentMethod::parse(&r.payment_method)?,
                    transaction_id: r.transaction_id,
                    recorded_by: r.recorded_by.as_deref().map(parse_uuid).transpose()?,
                    paid_at: to_utc(r.paid_at),
                })
            })
            .collect()
    }

    async fn list_due_for_auto_renewal(&self, cutoff: DateTime<Utc>) -> Result<Vec<Member>> {
        let rows = sqlx::query_as::<_, MemberRow>(&format!(
            r#"
            SELECT {} FROM members
            WHERE auto_renew = 1 AND expiry_date IS NOT NULL AND expiry_date <= ?
            ORDER BY expiry_date
            "#,
            MEMBER_COLUMNS
        ))
        .bind(cutoff.naive_utc())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_member).collect()
    }

    async fn list_overdue(&self, now: DateTime<Utc>) -> Result<Vec<Member>> {
        let rows = sqlx::query_as::<_, MemberRow>(&format!(
            r#"
            SELECT {} FROM members
            WHERE expiry_date IS NOT NULL AND expiry_date <= ? AND status != ?
            ORDER BY expiry_date
            "#,
            MEMBER_COLUMNS
        ))
        .bind(now.naive_utc())
        .bind(MemberStatus::Inactive.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_member).collect()
    }

    async fn list_expiring_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Member>> {
        let rows = sqlx::query_as::<_, MemberRow>(&format!(
            r#"
            SELECT {} FROM members
            WHERE expiry_date IS NOT NULL AND expiry_date > ? AND expiry_date <= ?
            ORDER BY expiry_date
            "#,
            MEMBER_COLUMNS
        ))
        .bind(start.naive_utc())
        .bind(end.naive_utc())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_member).collect()
    }

    async fn mark_inactive(&self, id: Uuid, now: DateTime<Utc>) -> Result<Member> {
        let result = sqlx::query("UPDATE members SET status = ?, updated_at = ? WHERE id = ?")
            .bind(MemberStatus::Inactive.as_str())
            .bind(now.naive_utc())
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Member not found".to_string()));
        }

        self.fetch_required(id).await
    }

    async fn record_attendance(
        &self,
        member_id: Uuid,
        event_id: Uuid,
        status: AttendanceStatus,
        now: DateTime<Utc>,
    ) -> Result<Attendance> {
        let id = Uuid::new_v4();

        sqlx::query(
            "INSERT INTO attendances (id, member_id, event_id, date, status) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(id.to_string())
        .bind(member_id.to_string())
        .bind(event_id.to_string())
        .bind(now.naive_utc())
        .bind(status.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                AppError::Conflict("Attendance already recorded for this event".to_string())
            }
            _ => AppError::Database(e.to_string()),
        })?;

        Ok(Attendance {
            id,
            member_id,
            event_id,
            date: now,
            status,
        })
    }

    async fn attendances(&self, member_id: Uuid) -> Result<Vec<Attendance>> {
        #[derive(FromRow)]
        struct Row {
            id: String,
            member_id: String,
            event_id: String,
            date: NaiveDateTime,
            status: String,
        }

        let rows = sqlx::query_as::<_, Row>(
            "SELECT id, member_id, event_id, date, status FROM attendances WHERE member_id = ? ORDER BY date",
        )
        .bind(member_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|r| {
                Ok(Attendance {
                    id: parse_uuid(&r.id)?,
                    member_id: parse_uuid(&r.member_id)?,
                    event_id: parse_uuid(&r.event_id)?,
                    date: to_utc(r.date),
                    status: AttendanceStatus::parse(&r.status)?,
                })
            })
            .collect()
    }
}

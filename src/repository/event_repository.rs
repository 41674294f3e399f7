use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;

use crate::{
    domain::{
        Attendee, AttendeePaymentStatus, CreateEventRequest, Event, EventStatus, TicketType,
        UpdateEventRequest,
    },
    error::{AppError, Result},
    repository::EventRepository,
};

#[derive(FromRow)]
struct EventRow {
    id: String,
    title: String,
    description: Option<String>,
    start_date: NaiveDateTime,
    end_date: Option<NaiveDateTime>,
    location: Option<String>,
    max_attendees: Option<i64>,
    fee_minor: Option<i64>,
    organizer_id: Option<String>,
    status: String,
    total_revenue_minor: i64,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

#[derive(FromRow)]
struct AttendeeRow {
    event_id: String,
    member_id: String,
    attended: i32,
    payment_status: String,
}

const EVENT_COLUMNS: &str = "id, title, description, start_date, end_date, location, \
     max_attendees, fee_minor, organizer_id, status, total_revenue_minor, \
     created_at, updated_at";

pub struct SqliteEventRepository {
    pool: SqlitePool,
}

impl SqliteEventRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_event(row: EventRow) -> Result<Event> {
        Ok(Event {
            id: parse_uuid(&row.id)?,
            title: row.title,
            description: row.description,
            start_date: to_utc(row.start_date),
            end_date: row.end_date.map(to_utc),
            location: row.location,
            max_attendees: row.max_attendees,
            fee_minor: row.fee_minor,
            organizer_id: row.organizer_id.as_deref().map(parse_uuid).transpose()?,
            status: EventStatus::parse(&row.status)?,
            total_revenue_minor: row.total_revenue_minor,
            created_at: to_utc(row.created_at),
            updated_at: to_utc(row.updated_at),
        })
    }

    fn row_to_attendee(row: AttendeeRow) -> Result<Attendee> {
        Ok(Attendee {
            event_id: parse_uuid(&row.event_id)?,
            member_id: parse_uuid(&row.member_id)?,
            attended: row.attended != 0,
            payment_status: AttendeePaymentStatus::parse(&row.payment_status)?,
        })
    }

    async fn fetch_required(&self, id: Uuid) -> Result<Event> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Event not found".to_string()))
    }
}

fn parse_uuid(s: &str) -> Result<Uuid> {
    Uuid::parse_str(s).map_err(|e| AppError::Database(e.to_string()))
}

fn to_utc(naive: NaiveDateTime) -> DateTime<Utc> {
    DateTime::from_naive_utc_and_offset(naive, Utc)
}

#[async_trait]
impl EventRepository for SqliteEventRepository {
    async fn create(&self, request: CreateEventRequest) -> Result<Event> {
        let id = Uuid::new_v4();
        let now = Utc::now().naive_utc();
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO events (
                id, title, description, start_date, end_date, location,
                max_attendees, fee_minor, organizer_id, status,
                total_revenue_minor, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 0, ?, ?)
            "#,
        )
        .bind(id.to_string())
        .bind(&request.title)
        .bind(&request.description)
        .bind(request.start_date.naive_utc())
        .bind(request.end_date.map(|dt| dt.naive_utc()))
        .bind(&request.location)
        .bind(request.max_attendees)
        .bind(request.fee_minor)
        .bind(request.organizer_id.map(|u| u.to_string()))
        .bind(EventStatus::Upcoming.as_str())
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        for ticket in &request.ticket_types {
            sqlx::query(
                r#"
                INSERT INTO ticket_types (id, event_id, name, price_minor, quantity_available)
                VALUES (?, ?, ?, ?, ?)
                "#,
            )
            .bind(Uuid::new_v4().to_string())
            .bind(id.to_string())
            .bind(&ticket.name)
            .bind(ticket.price_minor)
            .bind(ticket.quantity_available)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        self.fetch_required(id).await
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Event>> {
        let row = sqlx::query_as::<_, EventRow>(&format!(
            "SELECT {} FROM events WHERE id = ?",
            EVENT_COLUMNS
        ))
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_event).transpose()
    }

    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<Event>> {
        let rows = sqlx::query_as::<_, EventRow>(&format!(
            "SELECT {} FROM events ORDER BY start_date DESC LIMIT ? OFFSET ?",
            EVENT_COLUMNS
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_event).collect()
    }

    async fn update(&self, id: Uuid, update: UpdateEventRequest) -> Result<Event> {
        let existing = self.fetch_required(id).await?;
        let now = Utc::now().naive_utc();

        sqlx::query(
            r#"
            UPDATE events
            SET title = COALESCE(?, title),
                description = COALESCE(?, description),
                start_date = COALESCE(?, start_date),
                end_date = COALESCE(?, end_date),
                location = COALESCE(?, location),
                max_attendees = COALESCE(?, max_attendees),
                fee_minor = COALESCE(?, fee_minor),
                status = ?,
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&update.title)
        .bind(&update.description)
        .bind(update.start_date.map(|dt| dt.naive_utc()))
        .bind(update.end_date.map(|dt| dt.naive_utc()))
        .bind(&update.location)
        .bind(update.max_attendees)
        .bind(update.fee_minor)
        .bind(update.status.unwrap_or(existing.status).as_str())
        .bind(now)
        .bind(id.to_string())
        .execute(&self.pool)
        .await?;

        self.fetch_required(id).await
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM events WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Event not found".to_string()));
        }

        Ok(())
    }

    async fn register_attendee(&self, event_id: Uuid, member_id: Uuid) -> Result<()> {
        sqlx::query(
            "INSERT INTO event_attendees (event_id, member_id, attended, payment_status) VALUES (?, ?, 0, ?)",
        )
        .bind(event_id.to_string())
        .bind(member_id.to_string())
        .bind(AttendeePaymentStatus::Unpaid.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                AppError::Conflict("Member already registered for this event".to_string())
            }
            _ => AppError::Database(e.to_string()),
        })?;

        Ok(())
    }

    async fn find_attendee(&self, event_id: Uuid, member_id: Uuid) -> Result<Option<Attendee>> {
        let row = sqlx::query_as::<_, AttendeeRow>(
            "SELECT event_id, member_id, attended, payment_status FROM event_attendees WHERE event_id = ? AND member_id = ?",
        )
        .bind(event_id.to_string())
        .bind(member_id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_attendee).transpose()
    }

    async fn list_attendees(&self, event_id: Uuid) -> Result<Vec<Attendee>> {
        let rows = sqlx::query_as::<_, AttendeeRow>(
            "SELECT event_id, member_id, attended, payment_status FROM event_attendees WHERE event_id = ?",
        )
        .bind(event_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_attendee).collect()
    }

    async fn set_attended(&self, event_id: Uuid, member_id: Uuid, attended: bool) -> Result<()> {
        let result = sqlx::query(
            "UPDATE event_attendees SET attended = ? WHERE event_id = ? AND member_id = ?",
        )
        .bind(attended as i32)
        .bind(event_id.to_string())
        .bind(member_id.to_string())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(
                "Member not registered for this event".to_string(),
            ));
        }

        Ok(())
    }

    async fn ticket_types(&self, event_id: Uuid) -> Result<Vec<TicketType>> {
        #[derive(FromRow)]
        struct Row {
            id: String,
            event_id: String,
            name: String,
            price_minor: i64,
            quantity_available: Option<i64>,
        }

        let rows = sqlx::query_as::<_, Row>(
            "SELECT id, event_id, name, price_minor, quantity_available FROM ticket_types WHERE event_id = ?",
        )
        .bind(event_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|r| {
                Ok(TicketType {
                    id: parse_uuid(&r.id)?,
                    event_id: parse_uuid(&r.event_id)?,
                    name: r.name,
                    price_minor: r.price_minor,
                    quantity_available: r.quantity_available,
                })
            })
            .collect()
    }
}

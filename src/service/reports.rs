use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;

use crate::{
    domain::AttendanceStatus,
    error::{AppError, Result},
};

#[derive(FromRow)]
struct MemberAttendanceRow {
    event_id: String,
    event_title: String,
    date: NaiveDateTime,
    status: String,
}

#[derive(FromRow)]
struct EventAttendanceRow {
    member_id: String,
    first_name: String,
    last_name: String,
    email: String,
    attended: bool,
    payment_status: String,
}

#[derive(FromRow)]
struct SummaryRow {
    event_id: String,
    title: String,
    registered: i64,
    attended: i64,
}

#[derive(Debug, Serialize)]
pub struct MemberAttendanceEntry {
    pub event_id: Uuid,
    pub event_title: String,
    pub date: DateTime<Utc>,
    pub status: AttendanceStatus,
}

#[derive(Debug, Serialize)]
pub struct MemberAttendanceReport {
    pub member_id: Uuid,
    pub total_events: usize,
    pub attended: usize,
    pub entries: Vec<MemberAttendanceEntry>,
}

#[derive(Debug, Serialize)]
pub struct EventAttendanceEntry {
    pub member_id: Uuid,
    pub name: String,
    pub email: String,
    pub attended: bool,
    pub payment_status: String,
}

#[derive(Debug, Serialize)]
pub struct EventAttendanceReport {
    pub event_id: Uuid,
    pub registered: usize,
    pub attended: usize,
    pub entries: Vec<EventAttendanceEntry>,
}

#[derive(Debug, Serialize)]
pub struct EventSummary {
    pub event_id: Uuid,
    pub title: String,
    pub registered: i64,
    pub attended: i64,
    pub attendance_rate: f64,
}

/// Read-only aggregations over attendance data. Queries the pool directly;
/// reports have no invariants of their own to protect.
pub struct ReportService {
    pool: SqlitePool,
}

impl ReportService {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Every event a member was marked present, absent or excused at.
    pub async fn member_attendance(&self, member_id: Uuid) -> Result<MemberAttendanceReport> {
        let rows = sqlx::query_as::<_, MemberAttendanceRow>(
            r#"
            SELECT a.event_id, e.title AS event_title, a.date, a.status
            FROM attendances a
            JOIN events e ON e.id = a.event_id
            WHERE a.member_id = ?
            ORDER BY a.date DESC
            "#,
        )
        .bind(member_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        let mut entries = Vec::with_capacity(rows.len());
        for row in rows {
            entries.push(MemberAttendanceEntry {
                event_id: parse_uuid(&row.event_id)?,
                event_title: row.event_title,
                date: DateTime::from_naive_utc_and_offset(row.date, Utc),
                status: AttendanceStatus::parse(&row.status)?,
            });
        }

        let attended = entries
            .iter()
            .filter(|e| e.status == AttendanceStatus::Present)
            .count();

        Ok(MemberAttendanceReport {
            member_id,
            total_events: entries.len(),
            attended,
            entries,
        })
    }

    /// Who registered for an event, and who actually showed up.
    pub async fn event_attendance(&self, event_id: Uuid) -> Result<EventAttendanceReport> {
        let rows = sqlx::query_as::<_, EventAttendanceRow>(
            r#"
            SELECT ea.member_id, m.first_name, m.last_name, m.email,
                   ea.attended, ea.payment_status
            FROM event_attendees ea
            JOIN members m ON m.id = ea.member_id
            WHERE ea.event_id = ?
            ORDER BY m.last_name, m.first_name
            "#,
        )
        .bind(event_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        let mut entries = Vec::with_capacity(rows.len());
        for row in rows {
            entries.push(EventAttendanceEntry {
                member_id: parse_uuid(&row.member_id)?,
                name: format!("{} {}", row.first_name, row.last_name),
                email: row.email,
                attended: row.attended,
                payment_status: row.payment_status,
            });
        }

        let attended = entries.iter().filter(|e| e.attended).count();

        Ok(EventAttendanceReport {
            event_id,
            registered: entries.len(),
            attended,
            entries,
        })
    }

    /// Per-event registration and turnout rates, newest events first.
    pub async fn attendance_summary(&self) -> Result<Vec<EventSummary>> {
        let rows = sqlx::query_as::<_, SummaryRow>(
            r#"
            SELECT e.id AS event_id, e.title,
                   COUNT(ea.member_id) AS registered,
                   COALESCE(SUM(CASE WHEN ea.attended THEN 1 ELSE 0 END), 0) AS attended
            FROM events e
            LEFT JOIN event_attendees ea ON ea.event_id = e.id
            GROUP BY e.id, e.title
            ORDER BY e.start_date DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                let rate = if row.registered > 0 {
                    row.attended as f64 / row.registered as f64
                } else {
                    0.0
                };
                Ok(EventSummary {
                    event_id: parse_uuid(&row.event_id)?,
                    title: row.title,
                    registered: row.registered,
                    attended: row.attended,
                    attendance_rate: rate,
                })
            })
            .collect()
    }
}

fn parse_uuid(s: &str) -> Result<Uuid> {
    Uuid::parse_str(s).map_err(|e| AppError::Database(format!("Invalid UUID in database: {}", e)))
}

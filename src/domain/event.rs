use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub location: Option<String>,
    pub max_attendees: Option<i64>,
    pub fee_minor: Option<i64>,
    pub organizer_id: Option<Uuid>,
    pub status: EventStatus,
    pub total_revenue_minor: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum EventStatus {
    Upcoming,
    Ongoing,
    Completed,
    Cancelled,
}

impl EventStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventStatus::Upcoming => "Upcoming",
            EventStatus::Ongoing => "Ongoing",
            EventStatus::Completed => "Completed",
            EventStatus::Cancelled => "Cancelled",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "Upcoming" => Ok(EventStatus::Upcoming),
            "Ongoing" => Ok(EventStatus::Ongoing),
            "Completed" => Ok(EventStatus::Completed),
            "Cancelled" => Ok(EventStatus::Cancelled),
            _ => Err(AppError::Database(format!("Invalid event status: {}", s))),
        }
    }
}

/// A member's registration entry on an event, carrying its own attendance
/// and payment sub-status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attendee {
    pub event_id: Uuid,
    pub member_id: Uuid,
    pub attended: bool,
    pub payment_status: AttendeePaymentStatus,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum AttendeePaymentStatus {
    Paid,
    Unpaid,
    Free,
}

impl AttendeePaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttendeePaymentStatus::Paid => "Paid",
            AttendeePaymentStatus::Unpaid => "Unpaid",
            AttendeePaymentStatus::Free => "Free",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "Paid" => Ok(AttendeePaymentStatus::Paid),
            "Unpaid" => Ok(AttendeePaymentStatus::Unpaid),
            "Free" => Ok(AttendeePaymentStatus::Free),
            _ => Err(AppError::Database(format!(
                "Invalid attendee payment status: {}",
                s
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketType {
    pub id: Uuid,
    pub event_id: Uuid,
    pub name: String,
    pub price_minor: i64,
    pub quantity_available: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateEventRequest {
    pub title: String,
    pub description: Option<String>,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub location: Option<String>,
    pub max_attendees: Option<i64>,
    pub fee_minor: Option<i64>,
    pub organizer_id: Option<Uuid>,
    #[serde(default)]
    pub ticket_types: Vec<CreateTicketType>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateTicketType {
    pub name: String,
    pub price_minor: i64,
    pub quantity_available: Option<i64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct UpdateEventRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub location: Option<String>,
    pub max_attendees: Option<i64>,
    pub fee_minor: Option<i64>,
    pub status: Option<EventStatus>,
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::member::PaymentMethod;
use crate::error::{AppError, Result};

/// A single payment attempt. Created once; only `status` moves afterwards,
/// and only along the legal transitions (see [`PaymentStatus::can_transition_to`]).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventPayment {
    pub id: Uuid,
    pub event_id: Option<Uuid>,
    pub member_id: Uuid,
    pub amount_minor: i64,
    pub payment_method: PaymentMethod,
    pub ticket_type: Option<String>,
    pub transaction_id: Option<String>,
    pub status: PaymentStatus,
    pub paid_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PaymentStatus {
    Pending,
    Paid,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "Pending",
            PaymentStatus::Paid => "Paid",
            PaymentStatus::Refunded => "Refunded",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "Pending" => Ok(PaymentStatus::Pending),
            "Paid" => Ok(PaymentStatus::Paid),
            "Refunded" => Ok(PaymentStatus::Refunded),
            _ => Err(AppError::Database(format!("Invalid payment status: {}", s))),
        }
    }

    /// Pending moves forward to Paid or Refunded; Paid can only be
    /// refunded; Refunded is terminal. A paid payment never goes back
    /// to pending.
    pub fn can_transition_to(&self, next: PaymentStatus) -> bool {
        matches!(
            (self, next),
            (PaymentStatus::Pending, PaymentStatus::Paid)
                | (PaymentStatus::Pending, PaymentStatus::Refunded)
                | (PaymentStatus::Paid, PaymentStatus::Refunded)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paid_never_reverts_to_pending() {
        assert!(!PaymentStatus::Paid.can_transition_to(PaymentStatus::Pending));
        assert!(!PaymentStatus::Refunded.can_transition_to(PaymentStatus::Pending));
        assert!(!PaymentStatus::Refunded.can_transition_to(PaymentStatus::Paid));
    }

    #[test]
    fn pending_moves_forward() {
        assert!(PaymentStatus::Pending.can_transition_to(PaymentStatus::Paid));
        assert!(PaymentStatus::Pending.can_transition_to(PaymentStatus::Refunded));
        assert!(PaymentStatus::Paid.can_transition_to(PaymentStatus::Refunded));
    }
}

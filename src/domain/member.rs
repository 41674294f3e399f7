use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Member {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub zone: Zone,
    pub membership_type: MembershipType,
    pub status: MemberStatus,
    pub join_date: DateTime<Utc>,
    pub expiry_date: Option<DateTime<Utc>>,
    /// SVG badge encoding the member id, generated at creation.
    #[serde(skip_serializing)]
    pub qr_code: String,
    pub auto_renew: bool,
    pub default_payment_method: Option<PaymentMethod>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Member {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Zone {
    North,
    South,
    East,
    West,
    Central,
}

impl Zone {
    pub fn as_str(&self) -> &'static str {
        match self {
            Zone::North => "North",
            Zone::South => "South",
            Zone::East => "East",
            Zone::West => "West",
            Zone::Central => "Central",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "North" => Ok(Zone::North),
            "South" => Ok(Zone::South),
            "East" => Ok(Zone::East),
            "West" => Ok(Zone::West),
            "Central" => Ok(Zone::Central),
            _ => Err(AppError::Validation(format!("Invalid zone: {}", s))),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum MembershipType {
    Regular,
    Premium,
    Vip,
    Student,
}

impl MembershipType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MembershipType::Regular => "Regular",
            MembershipType::Premium => "Premium",
            MembershipType::Vip => "Vip",
            MembershipType::Student => "Student",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "Regular" => Ok(MembershipType::Regular),
            "Premium" => Ok(MembershipType::Premium),
            "Vip" => Ok(MembershipType::Vip),
            "Student" => Ok(MembershipType::Student),
            _ => Err(AppError::Validation(format!(
                "Invalid membership type: {}",
                s
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum MemberStatus {
    Active,
    Inactive,
    Pending,
    Suspended,
}

impl MemberStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MemberStatus::Active => "Active",
            MemberStatus::Inactive => "Inactive",
            MemberStatus::Pending => "Pending",
            MemberStatus::Suspended => "Suspended",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "Active" => Ok(MemberStatus::Active),
            "Inactive" => Ok(MemberStatus::Inactive),
            "Pending" => Ok(MemberStatus::Pending),
            "Suspended" => Ok(MemberStatus::Suspended),
            _ => Err(AppError::Database(format!("Invalid member status: {}", s))),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PaymentMethod {
    Razorpay,
    Cash,
    BankTransfer,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Razorpay => "razorpay",
            PaymentMethod::Cash => "cash",
            PaymentMethod::BankTransfer => "bank_transfer",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "razorpay" => Ok(PaymentMethod::Razorpay),
            "cash" => Ok(PaymentMethod::Cash),
            "bank_transfer" => Ok(PaymentMethod::BankTransfer),
            _ => Err(AppError::Validation(format!(
                "Invalid payment method: {}",
                s
            ))),
        }
    }
}

/// One entry in a member's append-only renewal trail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenewalRecord {
    pub id: Uuid,
    pub member_id: Uuid,
    pub date: DateTime<Utc>,
    pub renewed_by: Option<Uuid>,
    pub notes: Option<String>,
}

/// Structured receipt metadata for a completed payment. Distinct from an
/// uploaded receipt file, which this system does not store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiptRecord {
    pub id: Uuid,
    pub member_id: Uuid,
    pub amount_minor: i64,
    pub payment_method: PaymentMethod,
    pub transaction_id: Option<String>,
    pub recorded_by: Option<Uuid>,
    pub paid_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attendance {
    pub id: Uuid,
    pub member_id: Uuid,
    pub event_id: Uuid,
    pub date: DateTime<Utc>,
    pub status: AttendanceStatus,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum AttendanceStatus {
    Present,
    Absent,
    Excused,
}

impl AttendanceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttendanceStatus::Present => "Present",
            AttendanceStatus::Absent => "Absent",
            AttendanceStatus::Excused => "Excused",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "Present" => Ok(AttendanceStatus::Present),
            "Absent" => Ok(AttendanceStatus::Absent),
            "Excused" => Ok(AttendanceStatus::Excused),
            _ => Err(AppError::Validation(format!(
                "Invalid attendance status: {}",
                s
            ))),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateMemberRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub zone: Zone,
    pub membership_type: MembershipType,
    #[serde(default)]
    pub auto_renew: bool,
    pub default_payment_method: Option<PaymentMethod>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct UpdateMemberRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub zone: Option<Zone>,
    pub membership_type: Option<MembershipType>,
    pub status: Option<MemberStatus>,
    pub expiry_date: Option<DateTime<Utc>>,
    pub auto_renew: Option<bool>,
    pub default_payment_method: Option<PaymentMethod>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MemberFilter {
    pub zone: Option<Zone>,
    pub status: Option<MemberStatus>,
    pub membership_type: Option<MembershipType>,
}

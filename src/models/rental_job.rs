use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Lifecycle of a renter's request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RentalJobStatus {
    Open,
    InNegotiation,
    PartiallyAccepted,
    Accepted,
    Completed,
    Cancelled,
}

impl RentalJobStatus {
    /// Convert from database string
    pub fn from_str(s: &str) -> Result<Self, String> {
        match s.to_lowercase().as_str() {
            "open" => Ok(RentalJobStatus::Open),
            "in_negotiation" => Ok(RentalJobStatus::InNegotiation),
            "partially_accepted" => Ok(RentalJobStatus::PartiallyAccepted),
            "accepted" => Ok(RentalJobStatus::Accepted),
            "completed" => Ok(RentalJobStatus::Completed),
            "cancelled" => Ok(RentalJobStatus::Cancelled),
            _ => Err(format!("Invalid rental job status: {}", s)),
        }
    }

    /// Convert to database string
    pub fn as_str(&self) -> &'static str {
        match self {
            RentalJobStatus::Open => "open",
            RentalJobStatus::InNegotiation => "in_negotiation",
            RentalJobStatus::PartiallyAccepted => "partially_accepted",
            RentalJobStatus::Accepted => "accepted",
            RentalJobStatus::Completed => "completed",
            RentalJobStatus::Cancelled => "cancelled",
        }
    }

    /// Completed and cancelled requests never change again
    pub fn is_terminal(&self) -> bool {
        matches!(self, RentalJobStatus::Completed | RentalJobStatus::Cancelled)
    }
}

impl From<RentalJobStatus> for String {
    fn from(status: RentalJobStatus) -> Self {
        status.as_str().to_string()
    }
}

/// A renter's equipment request spanning a date range
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RentalJob {
    pub id: Uuid,
    pub renter_company_id: Uuid,
    pub title: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub delivery_address: Option<String>,
    pub notes: Option<String>,
    pub status: String, // Stored as TEXT, use RentalJobStatus enum for type safety
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl RentalJob {
    /// Get status as an enum
    pub fn status_enum(&self) -> RentalJobStatus {
        RentalJobStatus::from_str(&self.status).unwrap_or(RentalJobStatus::Open)
    }

    /// Number of rental days, both ends inclusive
    pub fn rental_days(&self) -> i64 {
        (self.end_date - self.start_date).num_days() + 1
    }
}

/// Requested line item of a rental job
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RentalJobProduct {
    pub id: Uuid,
    pub rental_job_id: Uuid,
    pub product_id: Option<Uuid>,
    pub name: String,
    pub requested_quantity: i32,
    pub fulfilled_quantity: i32,
}

impl RentalJobProduct {
    /// Quantity still waiting for a supplier
    pub fn remaining(&self) -> i32 {
        (self.requested_quantity - self.fulfilled_quantity).max(0)
    }

    pub fn is_fulfilled(&self) -> bool {
        self.remaining() == 0
    }
}

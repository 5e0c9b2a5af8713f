use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// State of a single price proposal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OfferStatus {
    /// Waiting for the receiver
    Pending,
    /// Superseded by a newer version
    Countered,
    Accepted,
    Cancelled,
}

impl OfferStatus {
    /// Convert from database string
    pub fn from_str(s: &str) -> Result<Self, String> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(OfferStatus::Pending),
            "countered" => Ok(OfferStatus::Countered),
            "accepted" => Ok(OfferStatus::Accepted),
            "cancelled" => Ok(OfferStatus::Cancelled),
            _ => Err(format!("Invalid offer status: {}", s)),
        }
    }

    /// Convert to database string
    pub fn as_str(&self) -> &'static str {
        match self {
            OfferStatus::Pending => "pending",
            OfferStatus::Countered => "countered",
            OfferStatus::Accepted => "accepted",
            OfferStatus::Cancelled => "cancelled",
        }
    }
}

/// Versioned price proposal exchanged between renter and provider
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct JobOffer {
    pub id: Uuid,
    pub rental_job_id: Uuid,
    pub supply_job_id: Uuid,
    pub sender_company_id: Uuid,
    pub receiver_company_id: Uuid,
    pub version: i32,
    pub price: Decimal, // NUMERIC(12, 2) in database
    pub notes: Option<String>,
    pub status: String, // Stored as TEXT, use OfferStatus enum for type safety
    pub created_at: NaiveDateTime,
}

impl JobOffer {
    /// Get status as an enum
    pub fn status_enum(&self) -> OfferStatus {
        OfferStatus::from_str(&self.status).unwrap_or(OfferStatus::Pending)
    }

    pub fn is_pending(&self) -> bool {
        self.status_enum() == OfferStatus::Pending
    }
}

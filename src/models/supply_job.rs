use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Lifecycle of one provider's track on a rental job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SupplyJobStatus {
    Pending,
    Negotiating,
    Accepted,
    InProgress,
    Completed,
    Cancelled,
}

impl SupplyJobStatus {
    /// Convert from database string
    pub fn from_str(s: &str) -> Result<Self, String> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(SupplyJobStatus::Pending),
            "negotiating" => Ok(SupplyJobStatus::Negotiating),
            "accepted" => Ok(SupplyJobStatus::Accepted),
            "in_progress" => Ok(SupplyJobStatus::InProgress),
            "completed" => Ok(SupplyJobStatus::Completed),
            "cancelled" => Ok(SupplyJobStatus::Cancelled),
            _ => Err(format!("Invalid supply job status: {}", s)),
        }
    }

    /// Convert to database string
    pub fn as_str(&self) -> &'static str {
        match self {
            SupplyJobStatus::Pending => "pending",
            SupplyJobStatus::Negotiating => "negotiating",
            SupplyJobStatus::Accepted => "accepted",
            SupplyJobStatus::InProgress => "in_progress",
            SupplyJobStatus::Completed => "completed",
            SupplyJobStatus::Cancelled => "cancelled",
        }
    }

    /// Still open for offers
    pub fn is_negotiable(&self) -> bool {
        matches!(self, SupplyJobStatus::Pending | SupplyJobStatus::Negotiating)
    }

    /// Handshake happened, whatever came after
    pub fn is_agreed(&self) -> bool {
        matches!(
            self,
            SupplyJobStatus::Accepted | SupplyJobStatus::InProgress | SupplyJobStatus::Completed
        )
    }
}

impl From<SupplyJobStatus> for String {
    fn from(status: SupplyJobStatus) -> Self {
        status.as_str().to_string()
    }
}

/// Outcome of the mutual acceptance step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HandshakeStatus {
    Pending,
    Accepted,
    Cancelled,
}

impl HandshakeStatus {
    /// Convert from database string
    pub fn from_str(s: &str) -> Result<Self, String> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(HandshakeStatus::Pending),
            "accepted" => Ok(HandshakeStatus::Accepted),
            "cancelled" => Ok(HandshakeStatus::Cancelled),
            _ => Err(format!("Invalid handshake status: {}", s)),
        }
    }

    /// Convert to database string
    pub fn as_str(&self) -> &'static str {
        match self {
            HandshakeStatus::Pending => "pending",
            HandshakeStatus::Accepted => "accepted",
            HandshakeStatus::Cancelled => "cancelled",
        }
    }
}

/// One provider company's response/fulfillment track against a rental job
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SupplyJob {
    pub id: Uuid,
    pub rental_job_id: Uuid,
    pub provider_company_id: Uuid,
    pub status: String, // Stored as TEXT, use SupplyJobStatus enum for type safety
    pub handshake_status: String,
    pub accepted_price: Option<Decimal>,
    pub cancel_reason: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl SupplyJob {
    /// Get status as an enum
    pub fn status_enum(&self) -> SupplyJobStatus {
        SupplyJobStatus::from_str(&self.status).unwrap_or(SupplyJobStatus::Pending)
    }

    /// Get handshake status as an enum
    pub fn handshake_enum(&self) -> HandshakeStatus {
        HandshakeStatus::from_str(&self.handshake_status).unwrap_or(HandshakeStatus::Pending)
    }
}

/// Line item a provider offers against a requested line
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SupplyJobProduct {
    pub id: Uuid,
    pub supply_job_id: Uuid,
    pub rental_job_product_id: Uuid,
    pub offered_quantity: i32,
    pub fulfilled_quantity: i32,
}

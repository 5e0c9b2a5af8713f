//! Subscription and payment records mirrored from Stripe

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Subscription {
    pub id: Uuid,
    pub company_id: Uuid,
    pub stripe_subscription_id: String,
    pub plan: Option<String>,
    pub status: String, // Stripe's own status string (active, past_due, canceled, ...)
    pub current_period_end: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Subscription {
    pub fn is_active(&self) -> bool {
        matches!(self.status.as_str(), "active" | "trialing")
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Payment {
    pub id: Uuid,
    pub company_id: Uuid,
    pub stripe_invoice_id: String,
    pub amount: Decimal,
    pub currency: String,
    pub status: String,
    pub created_at: NaiveDateTime,
}

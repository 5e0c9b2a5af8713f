use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Post-completion rating, one per supply job
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct JobRating {
    pub id: Uuid,
    pub supply_job_id: Uuid,
    pub rater_company_id: Uuid,
    pub rated_company_id: Uuid,
    pub score: i16,
    pub comment: Option<String>,
    pub created_at: NaiveDateTime,
}

/// Aggregated ratings of a company
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RatingSummary {
    pub company_id: Uuid,
    pub average_score: Option<Decimal>,
    pub rating_count: i64,
}

pub const MIN_SCORE: i16 = 1;
pub const MAX_SCORE: i16 = 5;

pub fn validate_score(score: i16) -> Result<(), String> {
    if !(MIN_SCORE..=MAX_SCORE).contains(&score) {
        return Err(format!(
            "Score must be between {} and {}",
            MIN_SCORE, MAX_SCORE
        ));
    }
    Ok(())
}

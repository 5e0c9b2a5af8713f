use crate::auth::Claims;
use crate::error::{AppError, AppResult, RepositoryError};
use crate::models::job_rating::validate_score;
use crate::models::{JobRating, RatingSummary, SupplyJobStatus};
use crate::negotiation::NegotiationError;
use crate::repositories::{JobRatingRepository, RentalJobRepository, SupplyJobRepository};
use crate::services::AuditTrailService;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

const RECENT_RATINGS: i64 = 20;

#[derive(Debug, Clone, Deserialize)]
pub struct RatingRequest {
    pub score: i16,
    #[serde(default)]
    pub comment: Option<String>,
}

/// Summary plus the latest ratings, as shown on a company profile
#[derive(Debug, Clone, Serialize)]
pub struct CompanyRatings {
    #[serde(flatten)]
    pub summary: RatingSummary,
    pub recent: Vec<JobRating>,
}

/// Service for post-completion ratings
pub struct RatingService {
    rating_repo: Arc<JobRatingRepository>,
    supply_repo: Arc<SupplyJobRepository>,
    rental_repo: Arc<RentalJobRepository>,
    audit: Arc<AuditTrailService>,
}

impl RatingService {
    pub fn new(
        rating_repo: Arc<JobRatingRepository>,
        supply_repo: Arc<SupplyJobRepository>,
        rental_repo: Arc<RentalJobRepository>,
        audit: Arc<AuditTrailService>,
    ) -> Self {
        Self {
            rating_repo,
            supply_repo,
            rental_repo,
            audit,
        }
    }

    /// The renter rates the provider of a completed supply job, once
    pub async fn rate_supply_job(
        &self,
        actor: &Claims,
        supply_job_id: Uuid,
        req: RatingRequest,
    ) -> AppResult<JobRating> {
        validate_score(req.score).map_err(AppError::Validation)?;

        let supply_job = self
            .supply_repo
            .find_by_id(supply_job_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Supply job {} not found", supply_job_id)))?;
        let rental_job = self
            .rental_repo
            .find_by_id(supply_job.rental_job_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("Rental job {} not found", supply_job.rental_job_id))
            })?;

        if rental_job.renter_company_id != actor.company_id {
            return Err(NegotiationError::RenterOnly(rental_job.id).into());
        }
        if supply_job.status_enum() != SupplyJobStatus::Completed {
            return Err(AppError::BusinessLogic(format!(
                "Supply job {} is {}; only completed jobs can be rated",
                supply_job.id, supply_job.status
            )));
        }

        let comment = req
            .comment
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty());

        let rating = self
            .rating_repo
            .create(
                supply_job.id,
                actor.company_id,
                supply_job.provider_company_id,
                req.score,
                comment,
            )
            .await
            .map_err(|e| match RepositoryError::from(e) {
                RepositoryError::Duplicate(_) => AppError::Conflict(format!(
                    "Supply job {} has already been rated",
                    supply_job.id
                )),
                other => other.into(),
            })?;

        info!(
            "Supply job {} rated {} by company {}",
            supply_job.id, rating.score, actor.company_id
        );
        if let Err(e) = self.audit.log_rating(&rating).await {
            warn!("Failed to audit rating {}: {}", rating.id, e);
        }

        Ok(rating)
    }

    pub async fn company_rating_summary(&self, company_id: Uuid) -> AppResult<CompanyRatings> {
        let summary = self.rating_repo.summary(company_id).await?;
        let recent = self
            .rating_repo
            .find_for_company(company_id, RECENT_RATINGS)
            .await?;
        Ok(CompanyRatings { summary, recent })
    }

    pub async fn rating_for_supply_job(&self, supply_job_id: Uuid) -> AppResult<Option<JobRating>> {
        Ok(self.rating_repo.find_by_supply_job(supply_job_id).await?)
    }
}

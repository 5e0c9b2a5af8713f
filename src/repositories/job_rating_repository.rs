use crate::models::{JobRating, RatingSummary};
use sqlx::{PgPool, Result as SqlxResult};
use uuid::Uuid;

/// Repository for post-completion ratings
pub struct JobRatingRepository {
    pool: PgPool,
}

impl JobRatingRepository {
    /// Create a new JobRatingRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a rating; a second rating for the same supply job hits the unique key
    pub async fn create(
        &self,
        supply_job_id: Uuid,
        rater_company_id: Uuid,
        rated_company_id: Uuid,
        score: i16,
        comment: Option<&str>,
    ) -> SqlxResult<JobRating> {
        sqlx::query_as::<_, JobRating>(
            r#"
            INSERT INTO job_ratings (supply_job_id, rater_company_id, rated_company_id, score, comment)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, supply_job_id, rater_company_id, rated_company_id, score, comment, created_at
            "#,
        )
        .bind(supply_job_id)
        .bind(rater_company_id)
        .bind(rated_company_id)
        .bind(score)
        .bind(comment)
        .fetch_one(&self.pool)
        .await
    }

    pub async fn find_by_supply_job(&self, supply_job_id: Uuid) -> SqlxResult<Option<JobRating>> {
        sqlx::query_as::<_, JobRating>(
            r#"
            SELECT id, supply_job_id, rater_company_id, rated_company_id, score, comment, created_at
            FROM job_ratings
            WHERE supply_job_id = $1
            "#,
        )
        .bind(supply_job_id)
        .fetch_optional(&self.pool)
        .await
    }

    /// Ratings received by a company, newest first
    pub async fn find_for_company(&self, company_id: Uuid, limit: i64) -> SqlxResult<Vec<JobRating>> {
        sqlx::query_as::<_, JobRating>(
            r#"
            SELECT id, supply_job_id, rater_company_id, rated_company_id, score, comment, created_at
            FROM job_ratings
            WHERE rated_company_id = $1
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        )
        .bind(company_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
    }

    /// Average score (two decimals) and count; the average is NULL without ratings
    pub async fn summary(&self, company_id: Uuid) -> SqlxResult<RatingSummary> {
        sqlx::query_as::<_, RatingSummary>(
            r#"
            SELECT $1::uuid AS company_id,
                   ROUND(AVG(score)::numeric, 2) AS average_score,
                   COUNT(*) AS rating_count
            FROM job_ratings
            WHERE rated_company_id = $1
            "#,
        )
        .bind(company_id)
        .fetch_one(&self.pool)
        .await
    }
}

use crate::models::{JobOffer, OfferStatus};
use rust_decimal::Decimal;
use sqlx::{PgExecutor, PgPool, Result as SqlxResult};
use uuid::Uuid;

/// Fields of a new offer version
#[derive(Debug, Clone)]
pub struct NewOffer<'a> {
    pub rental_job_id: Uuid,
    pub supply_job_id: Uuid,
    pub sender_company_id: Uuid,
    pub receiver_company_id: Uuid,
    pub version: i32,
    pub price: Decimal,
    pub notes: Option<&'a str>,
}

/// Repository for offer history
pub struct JobOfferRepository {
    pool: PgPool,
}

impl JobOfferRepository {
    /// Create a new JobOfferRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Append a pending offer; the unique (rental, supply, version) key rejects races
    pub async fn create<'e, E>(&self, executor: E, offer: &NewOffer<'_>) -> SqlxResult<JobOffer>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, JobOffer>(
            r#"
            INSERT INTO job_offers (rental_job_id, supply_job_id, sender_company_id,
                                    receiver_company_id, version, price, notes, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, 'pending')
            RETURNING id, rental_job_id, supply_job_id, sender_company_id, receiver_company_id,
                      version, price, notes, status, created_at
            "#,
        )
        .bind(offer.rental_job_id)
        .bind(offer.supply_job_id)
        .bind(offer.sender_company_id)
        .bind(offer.receiver_company_id)
        .bind(offer.version)
        .bind(offer.price)
        .bind(offer.notes)
        .fetch_one(executor)
        .await
    }

    /// Highest version on a supply job
    pub async fn latest<'e, E>(&self, executor: E, supply_job_id: Uuid) -> SqlxResult<Option<JobOffer>>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, JobOffer>(
            r#"
            SELECT id, rental_job_id, supply_job_id, sender_company_id, receiver_company_id,
                   version, price, notes, status, created_at
            FROM job_offers
            WHERE supply_job_id = $1
            ORDER BY version DESC
            LIMIT 1
            "#,
        )
        .bind(supply_job_id)
        .fetch_optional(executor)
        .await
    }

    /// Update offer status
    pub async fn set_status<'e, E>(&self, executor: E, id: Uuid, status: OfferStatus) -> SqlxResult<()>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query(
            r#"
            UPDATE job_offers
            SET status = $2
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(status.as_str())
        .execute(executor)
        .await?;

        Ok(())
    }

    /// Cancel whatever is still pending on a supply job
    pub async fn cancel_pending<'e, E>(&self, executor: E, supply_job_id: Uuid) -> SqlxResult<u64>
    where
        E: PgExecutor<'e>,
    {
        let rows_affected = sqlx::query(
            r#"
            UPDATE job_offers
            SET status = 'cancelled'
            WHERE supply_job_id = $1 AND status = 'pending'
            "#,
        )
        .bind(supply_job_id)
        .execute(executor)
        .await?
        .rows_affected();

        Ok(rows_affected)
    }

    /// Full offer history of a supply job, oldest version first
    pub async fn history(&self, supply_job_id: Uuid) -> SqlxResult<Vec<JobOffer>> {
        sqlx::query_as::<_, JobOffer>(
            r#"
            SELECT id, rental_job_id, supply_job_id, sender_company_id, receiver_company_id,
                   version, price, notes, status, created_at
            FROM job_offers
            WHERE supply_job_id = $1
            ORDER BY version ASC
            "#,
        )
        .bind(supply_job_id)
        .fetch_all(&self.pool)
        .await
    }
}

use crate::models::{HandshakeStatus, SupplyJob, SupplyJobProduct, SupplyJobStatus};
use rust_decimal::Decimal;
use sqlx::{PgExecutor, PgPool, Result as SqlxResult};
use uuid::Uuid;

/// Repository for supply job data access
pub struct SupplyJobRepository {
    pool: PgPool,
}

impl SupplyJobRepository {
    /// Create a new SupplyJobRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a supply job for one provider
    pub async fn create<'e, E>(
        &self,
        executor: E,
        rental_job_id: Uuid,
        provider_company_id: Uuid,
    ) -> SqlxResult<SupplyJob>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, SupplyJob>(
            r#"
            INSERT INTO supply_jobs (rental_job_id, provider_company_id, status, handshake_status)
            VALUES ($1, $2, 'pending', 'pending')
            RETURNING id, rental_job_id, provider_company_id, status, handshake_status,
                      accepted_price, cancel_reason, created_at, updated_at
            "#,
        )
        .bind(rental_job_id)
        .bind(provider_company_id)
        .fetch_one(executor)
        .await
    }

    /// Insert an offered line
    pub async fn add_line<'e, E>(
        &self,
        executor: E,
        supply_job_id: Uuid,
        rental_job_product_id: Uuid,
        offered_quantity: i32,
    ) -> SqlxResult<SupplyJobProduct>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, SupplyJobProduct>(
            r#"
            INSERT INTO supply_job_products (supply_job_id, rental_job_product_id, offered_quantity)
            VALUES ($1, $2, $3)
            RETURNING id, supply_job_id, rental_job_product_id, offered_quantity, fulfilled_quantity
            "#,
        )
        .bind(supply_job_id)
        .bind(rental_job_product_id)
        .bind(offered_quantity)
        .fetch_one(executor)
        .await
    }

    /// Find a supply job by UUID
    pub async fn find_by_id(&self, id: Uuid) -> SqlxResult<Option<SupplyJob>> {
        sqlx::query_as::<_, SupplyJob>(
            r#"
            SELECT id, rental_job_id, provider_company_id, status, handshake_status,
                   accepted_price, cancel_reason, created_at, updated_at
            FROM supply_jobs
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    /// Load a supply job under a row lock. Callers lock the parent rental job first.
    pub async fn lock<'e, E>(&self, executor: E, id: Uuid) -> SqlxResult<Option<SupplyJob>>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, SupplyJob>(
            r#"
            SELECT id, rental_job_id, provider_company_id, status, handshake_status,
                   accepted_price, cancel_reason, created_at, updated_at
            FROM supply_jobs
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(id)
        .fetch_optional(executor)
        .await
    }

    /// Supply jobs of a rental job, in creation order
    pub async fn find_by_rental_job<'e, E>(&self, executor: E, rental_job_id: Uuid) -> SqlxResult<Vec<SupplyJob>>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, SupplyJob>(
            r#"
            SELECT id, rental_job_id, provider_company_id, status, handshake_status,
                   accepted_price, cancel_reason, created_at, updated_at
            FROM supply_jobs
            WHERE rental_job_id = $1
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(rental_job_id)
        .fetch_all(executor)
        .await
    }

    /// Supply jobs addressed to a provider, newest first
    pub async fn find_by_provider(
        &self,
        provider_company_id: Uuid,
        status: Option<SupplyJobStatus>,
    ) -> SqlxResult<Vec<SupplyJob>> {
        sqlx::query_as::<_, SupplyJob>(
            r#"
            SELECT id, rental_job_id, provider_company_id, status, handshake_status,
                   accepted_price, cancel_reason, created_at, updated_at
            FROM supply_jobs
            WHERE provider_company_id = $1
              AND ($2::text IS NULL OR status = $2)
            ORDER BY created_at DESC
            "#,
        )
        .bind(provider_company_id)
        .bind(status.map(|s| s.as_str()))
        .fetch_all(&self.pool)
        .await
    }

    /// Offered lines of a supply job
    pub async fn lines<'e, E>(&self, executor: E, supply_job_id: Uuid) -> SqlxResult<Vec<SupplyJobProduct>>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, SupplyJobProduct>(
            r#"
            SELECT id, supply_job_id, rental_job_product_id, offered_quantity, fulfilled_quantity
            FROM supply_job_products
            WHERE supply_job_id = $1
            ORDER BY id ASC
            "#,
        )
        .bind(supply_job_id)
        .fetch_all(executor)
        .await
    }

    /// Revise the quantity offered against a requested line, inserting the line if new
    pub async fn set_offered_quantity<'e, E>(
        &self,
        executor: E,
        supply_job_id: Uuid,
        rental_job_product_id: Uuid,
        offered_quantity: i32,
    ) -> SqlxResult<SupplyJobProduct>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, SupplyJobProduct>(
            r#"
            INSERT INTO supply_job_products (supply_job_id, rental_job_product_id, offered_quantity)
            VALUES ($1, $2, $3)
            ON CONFLICT (supply_job_id, rental_job_product_id)
            DO UPDATE SET offered_quantity = EXCLUDED.offered_quantity
            RETURNING id, supply_job_id, rental_job_product_id, offered_quantity, fulfilled_quantity
            "#,
        )
        .bind(supply_job_id)
        .bind(rental_job_product_id)
        .bind(offered_quantity)
        .fetch_one(executor)
        .await
    }

    /// Record how much of an offered line was actually committed
    pub async fn set_line_fulfilled<'e, E>(&self, executor: E, line_id: Uuid, quantity: i32) -> SqlxResult<()>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query(
            r#"
            UPDATE supply_job_products
            SET fulfilled_quantity = $2
            WHERE id = $1
            "#,
        )
        .bind(line_id)
        .bind(quantity)
        .execute(executor)
        .await?;

        Ok(())
    }

    /// Move a supply job to a new status without touching the handshake
    pub async fn update_status<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        status: SupplyJobStatus,
    ) -> SqlxResult<SupplyJob>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, SupplyJob>(
            r#"
            UPDATE supply_jobs
            SET status = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING id, rental_job_id, provider_company_id, status, handshake_status,
                      accepted_price, cancel_reason, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(status.as_str())
        .fetch_one(executor)
        .await
    }

    /// Seal the handshake at the agreed price
    pub async fn mark_accepted<'e, E>(&self, executor: E, id: Uuid, price: Decimal) -> SqlxResult<SupplyJob>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, SupplyJob>(
            r#"
            UPDATE supply_jobs
            SET status = 'accepted', handshake_status = $2, accepted_price = $3, updated_at = NOW()
            WHERE id = $1
            RETURNING id, rental_job_id, provider_company_id, status, handshake_status,
                      accepted_price, cancel_reason, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(HandshakeStatus::Accepted.as_str())
        .bind(price)
        .fetch_one(executor)
        .await
    }

    /// Cancel a supply job and record why
    pub async fn mark_cancelled<'e, E>(&self, executor: E, id: Uuid, reason: Option<&str>) -> SqlxResult<SupplyJob>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, SupplyJob>(
            r#"
            UPDATE supply_jobs
            SET status = 'cancelled', handshake_status = $2, cancel_reason = $3, updated_at = NOW()
            WHERE id = $1
            RETURNING id, rental_job_id, provider_company_id, status, handshake_status,
                      accepted_price, cancel_reason, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(HandshakeStatus::Cancelled.as_str())
        .bind(reason)
        .fetch_one(executor)
        .await
    }
}

use crate::models::{RentalJob, RentalJobProduct, RentalJobStatus};
use chrono::NaiveDate;
use sqlx::{PgExecutor, PgPool, Result as SqlxResult};
use uuid::Uuid;

/// Fields of a new rental request
#[derive(Debug, Clone)]
pub struct NewRentalJob<'a> {
    pub renter_company_id: Uuid,
    pub title: &'a str,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub delivery_address: Option<&'a str>,
    pub notes: Option<&'a str>,
}

/// Repository for rental job data access
pub struct RentalJobRepository {
    pool: PgPool,
}

impl RentalJobRepository {
    /// Create a new RentalJobRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a new rental job in the `open` state
    pub async fn create<'e, E>(&self, executor: E, job: &NewRentalJob<'_>) -> SqlxResult<RentalJob>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, RentalJob>(
            r#"
            INSERT INTO rental_jobs (renter_company_id, title, start_date, end_date,
                                     delivery_address, notes, status)
            VALUES ($1, $2, $3, $4, $5, $6, 'open')
            RETURNING id, renter_company_id, title, start_date, end_date, delivery_address,
                      notes, status, created_at, updated_at
            "#,
        )
        .bind(job.renter_company_id)
        .bind(job.title)
        .bind(job.start_date)
        .bind(job.end_date)
        .bind(job.delivery_address)
        .bind(job.notes)
        .fetch_one(executor)
        .await
    }

    /// Insert a requested line item
    pub async fn add_line<'e, E>(
        &self,
        executor: E,
        rental_job_id: Uuid,
        product_id: Option<Uuid>,
        name: &str,
        requested_quantity: i32,
    ) -> SqlxResult<RentalJobProduct>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, RentalJobProduct>(
            r#"
            INSERT INTO rental_job_products (rental_job_id, product_id, name, requested_quantity)
            VALUES ($1, $2, $3, $4)
            RETURNING id, rental_job_id, product_id, name, requested_quantity, fulfilled_quantity
            "#,
        )
        .bind(rental_job_id)
        .bind(product_id)
        .bind(name)
        .bind(requested_quantity)
        .fetch_one(executor)
        .await
    }

    /// Find a rental job by UUID
    pub async fn find_by_id(&self, id: Uuid) -> SqlxResult<Option<RentalJob>> {
        sqlx::query_as::<_, RentalJob>(
            r#"
            SELECT id, renter_company_id, title, start_date, end_date, delivery_address,
                   notes, status, created_at, updated_at
            FROM rental_jobs
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    /// Load a rental job and hold its row lock until the transaction ends.
    ///
    /// Every negotiation mutation goes through this lock first, which
    /// serializes concurrent offers and handshakes on the same request.
    pub async fn lock<'e, E>(&self, executor: E, id: Uuid) -> SqlxResult<Option<RentalJob>>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, RentalJob>(
            r#"
            SELECT id, renter_company_id, title, start_date, end_date, delivery_address,
                   notes, status, created_at, updated_at
            FROM rental_jobs
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(id)
        .fetch_optional(executor)
        .await
    }

    /// Requested lines of a rental job
    pub async fn lines<'e, E>(&self, executor: E, rental_job_id: Uuid) -> SqlxResult<Vec<RentalJobProduct>>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, RentalJobProduct>(
            r#"
            SELECT id, rental_job_id, product_id, name, requested_quantity, fulfilled_quantity
            FROM rental_job_products
            WHERE rental_job_id = $1
            ORDER BY name ASC, id ASC
            "#,
        )
        .bind(rental_job_id)
        .fetch_all(executor)
        .await
    }

    /// Add to a line's fulfilled quantity; `None` if it would overshoot
    pub async fn add_fulfilled<'e, E>(
        &self,
        executor: E,
        line_id: Uuid,
        quantity: i32,
    ) -> SqlxResult<Option<RentalJobProduct>>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, RentalJobProduct>(
            r#"
            UPDATE rental_job_products
            SET fulfilled_quantity = fulfilled_quantity + $2
            WHERE id = $1 AND fulfilled_quantity + $2 <= requested_quantity
            RETURNING id, rental_job_id, product_id, name, requested_quantity, fulfilled_quantity
            "#,
        )
        .bind(line_id)
        .bind(quantity)
        .fetch_optional(executor)
        .await
    }

    /// Update rental job status
    pub async fn update_status<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        status: RentalJobStatus,
    ) -> SqlxResult<RentalJob>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, RentalJob>(
            r#"
            UPDATE rental_jobs
            SET status = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING id, renter_company_id, title, start_date, end_date, delivery_address,
                      notes, status, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(status.as_str())
        .fetch_one(executor)
        .await
    }

    /// Rental jobs posted by a renter, newest first
    pub async fn find_by_renter(
        &self,
        renter_company_id: Uuid,
        status: Option<RentalJobStatus>,
    ) -> SqlxResult<Vec<RentalJob>> {
        sqlx::query_as::<_, RentalJob>(
            r#"
            SELECT id, renter_company_id, title, start_date, end_date, delivery_address,
                   notes, status, created_at, updated_at
            FROM rental_jobs
            WHERE renter_company_id = $1
              AND ($2::text IS NULL OR status = $2)
            ORDER BY created_at DESC
            "#,
        )
        .bind(renter_company_id)
        .bind(status.map(|s| s.as_str()))
        .fetch_all(&self.pool)
        .await
    }

    /// Platform-wide listing for administrators
    pub async fn list(
        &self,
        status: Option<RentalJobStatus>,
        limit: i64,
        offset: i64,
    ) -> SqlxResult<Vec<RentalJob>> {
        sqlx::query_as::<_, RentalJob>(
            r#"
            SELECT id, renter_company_id, title, start_date, end_date, delivery_address,
                   notes, status, created_at, updated_at
            FROM rental_jobs
            WHERE ($1::text IS NULL OR status = $1)
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(status.map(|s| s.as_str()))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
    }
}

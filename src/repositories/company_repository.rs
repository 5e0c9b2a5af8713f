use crate::models::{AccountType, Company};
use sqlx::{PgExecutor, PgPool, Result as SqlxResult};
use uuid::Uuid;

/// Repository for company data access
pub struct CompanyRepository {
    pool: PgPool,
}

impl CompanyRepository {
    /// Create a new CompanyRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a new company
    pub async fn create<'e, E>(
        &self,
        executor: E,
        name: &str,
        account_type: AccountType,
        email: &str,
        phone: Option<&str>,
        address: Option<&str>,
    ) -> SqlxResult<Company>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Company>(
            r#"
            INSERT INTO companies (name, account_type, email, phone, address)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, name, account_type, email, phone, address, is_active,
                      stripe_customer_id, created_at
            "#,
        )
        .bind(name)
        .bind(account_type.as_str())
        .bind(email)
        .bind(phone)
        .bind(address)
        .fetch_one(executor)
        .await
    }

    /// Find a company by UUID
    pub async fn find_by_id(&self, id: Uuid) -> SqlxResult<Option<Company>> {
        sqlx::query_as::<_, Company>(
            r#"
            SELECT id, name, account_type, email, phone, address, is_active,
                   stripe_customer_id, created_at
            FROM companies
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    /// Find several companies at once; unknown ids are simply absent
    pub async fn find_by_ids<'e, E>(&self, executor: E, ids: &[Uuid]) -> SqlxResult<Vec<Company>>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Company>(
            r#"
            SELECT id, name, account_type, email, phone, address, is_active,
                   stripe_customer_id, created_at
            FROM companies
            WHERE id = ANY($1)
            "#,
        )
        .bind(ids)
        .fetch_all(executor)
        .await
    }

    /// Find the company a Stripe customer belongs to
    pub async fn find_by_stripe_customer(&self, customer_id: &str) -> SqlxResult<Option<Company>> {
        sqlx::query_as::<_, Company>(
            r#"
            SELECT id, name, account_type, email, phone, address, is_active,
                   stripe_customer_id, created_at
            FROM companies
            WHERE stripe_customer_id = $1
            "#,
        )
        .bind(customer_id)
        .fetch_optional(&self.pool)
        .await
    }

    /// Page through companies, optionally by account type
    pub async fn list(
        &self,
        account_type: Option<AccountType>,
        limit: i64,
        offset: i64,
    ) -> SqlxResult<Vec<Company>> {
        sqlx::query_as::<_, Company>(
            r#"
            SELECT id, name, account_type, email, phone, address, is_active,
                   stripe_customer_id, created_at
            FROM companies
            WHERE ($1::text IS NULL OR account_type = $1)
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(account_type.map(|t| t.as_str()))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
    }

    /// Active provider companies, alphabetically
    pub async fn list_active_providers(&self) -> SqlxResult<Vec<Company>> {
        sqlx::query_as::<_, Company>(
            r#"
            SELECT id, name, account_type, email, phone, address, is_active,
                   stripe_customer_id, created_at
            FROM companies
            WHERE account_type = 'provider' AND is_active
            ORDER BY name ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
    }

    /// Activate or deactivate a company
    pub async fn set_active(&self, id: Uuid, is_active: bool) -> SqlxResult<Option<Company>> {
        sqlx::query_as::<_, Company>(
            r#"
            UPDATE companies
            SET is_active = $2
            WHERE id = $1
            RETURNING id, name, account_type, email, phone, address, is_active,
                      stripe_customer_id, created_at
            "#,
        )
        .bind(id)
        .bind(is_active)
        .fetch_optional(&self.pool)
        .await
    }

    /// Link a Stripe customer to a company
    pub async fn set_stripe_customer(&self, id: Uuid, customer_id: &str) -> SqlxResult<bool> {
        let rows_affected = sqlx::query(
            r#"
            UPDATE companies
            SET stripe_customer_id = $2
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(customer_id)
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(rows_affected > 0)
    }
}

use crate::models::{Product, ProductInput, ProductListing};
use sqlx::{PgExecutor, PgPool, Result as SqlxResult};
use uuid::Uuid;

/// Filters for the public catalog search
#[derive(Debug, Clone, Default)]
pub struct ProductSearch {
    pub query: Option<String>,
    pub category: Option<String>,
    pub company_id: Option<Uuid>,
    pub limit: i64,
    pub offset: i64,
}

/// Repository for catalog data access
pub struct ProductRepository {
    pool: PgPool,
}

impl ProductRepository {
    /// Create a new ProductRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a new product
    pub async fn create<'e, E>(
        &self,
        executor: E,
        company_id: Uuid,
        input: &ProductInput,
    ) -> SqlxResult<Product>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Product>(
            r#"
            INSERT INTO products (company_id, name, category, description, quantity, daily_price)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, company_id, name, category, description, quantity, daily_price,
                      is_active, created_at, updated_at
            "#,
        )
        .bind(company_id)
        .bind(input.name.trim())
        .bind(input.category.as_deref())
        .bind(input.description.as_deref())
        .bind(input.quantity)
        .bind(input.daily_price)
        .fetch_one(executor)
        .await
    }

    /// Overwrite a product owned by `company_id`; `None` when it isn't theirs
    pub async fn update<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        company_id: Uuid,
        input: &ProductInput,
    ) -> SqlxResult<Option<Product>>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Product>(
            r#"
            UPDATE products
            SET name = $3, category = $4, description = $5, quantity = $6,
                daily_price = $7, is_active = TRUE, updated_at = NOW()
            WHERE id = $1 AND company_id = $2
            RETURNING id, company_id, name, category, description, quantity, daily_price,
                      is_active, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(company_id)
        .bind(input.name.trim())
        .bind(input.category.as_deref())
        .bind(input.description.as_deref())
        .bind(input.quantity)
        .bind(input.daily_price)
        .fetch_optional(executor)
        .await
    }

    /// Hide a product from the catalog, keeping it for old rental lines
    pub async fn deactivate(&self, id: Uuid, company_id: Uuid) -> SqlxResult<bool> {
        let rows_affected = sqlx::query(
            r#"
            UPDATE products
            SET is_active = FALSE, updated_at = NOW()
            WHERE id = $1 AND company_id = $2 AND is_active
            "#,
        )
        .bind(id)
        .bind(company_id)
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(rows_affected > 0)
    }

    /// Find a product by UUID
    pub async fn find_by_id(&self, id: Uuid) -> SqlxResult<Option<Product>> {
        sqlx::query_as::<_, Product>(
            r#"
            SELECT id, company_id, name, category, description, quantity, daily_price,
                   is_active, created_at, updated_at
            FROM products
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    /// Every product of a company, locked for the duration of an import
    pub async fn lock_by_company<'e, E>(&self, executor: E, company_id: Uuid) -> SqlxResult<Vec<Product>>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Product>(
            r#"
            SELECT id, company_id, name, category, description, quantity, daily_price,
                   is_active, created_at, updated_at
            FROM products
            WHERE company_id = $1
            ORDER BY created_at ASC
            FOR UPDATE
            "#,
        )
        .bind(company_id)
        .fetch_all(executor)
        .await
    }

    /// Products of a company, newest first
    pub async fn find_by_company(&self, company_id: Uuid) -> SqlxResult<Vec<Product>> {
        sqlx::query_as::<_, Product>(
            r#"
            SELECT id, company_id, name, category, description, quantity, daily_price,
                   is_active, created_at, updated_at
            FROM products
            WHERE company_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(company_id)
        .fetch_all(&self.pool)
        .await
    }

    /// Active products of active providers matching the filters
    pub async fn search(&self, search: &ProductSearch) -> SqlxResult<Vec<ProductListing>> {
        sqlx::query_as::<_, ProductListing>(
            r#"
            SELECT p.id, p.company_id, c.name AS company_name, p.name, p.category,
                   p.description, p.quantity, p.daily_price
            FROM products p
            JOIN companies c ON c.id = p.company_id
            WHERE p.is_active AND c.is_active
              AND ($1::text IS NULL
                   OR p.name ILIKE '%' || $1 || '%'
                   OR p.description ILIKE '%' || $1 || '%')
              AND ($2::text IS NULL OR lower(p.category) = lower($2))
              AND ($3::uuid IS NULL OR p.company_id = $3)
            ORDER BY p.name ASC, p.id ASC
            LIMIT $4 OFFSET $5
            "#,
        )
        .bind(search.query.as_deref())
        .bind(search.category.as_deref())
        .bind(search.company_id)
        .bind(search.limit)
        .bind(search.offset)
        .fetch_all(&self.pool)
        .await
    }

    /// Total rows for the same filters, for pagination
    pub async fn count_search(&self, search: &ProductSearch) -> SqlxResult<i64> {
        let (count,): (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*)
            FROM products p
            JOIN companies c ON c.id = p.company_id
            WHERE p.is_active AND c.is_active
              AND ($1::text IS NULL
                   OR p.name ILIKE '%' || $1 || '%'
                   OR p.description ILIKE '%' || $1 || '%')
              AND ($2::text IS NULL OR lower(p.category) = lower($2))
              AND ($3::uuid IS NULL OR p.company_id = $3)
            "#,
        )
        .bind(search.query.as_deref())
        .bind(search.category.as_deref())
        .bind(search.company_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }
}

use crate::models::{User, UserRole};
use sqlx::{PgExecutor, PgPool, Result as SqlxResult};
use uuid::Uuid;

/// Repository for user data access
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    /// Create a new UserRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a new user; the email is stored lowercased
    pub async fn create<'e, E>(
        &self,
        executor: E,
        company_id: Uuid,
        name: &str,
        email: &str,
        password_hash: &str,
        role: UserRole,
    ) -> SqlxResult<User>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (company_id, name, email, password_hash, role)
            VALUES ($1, $2, lower($3), $4, $5)
            RETURNING id, company_id, name, email, password_hash, role, created_at
            "#,
        )
        .bind(company_id)
        .bind(name)
        .bind(email)
        .bind(password_hash)
        .bind(role.as_str())
        .fetch_one(executor)
        .await
    }

    /// Find a user by UUID
    pub async fn find_by_id(&self, id: Uuid) -> SqlxResult<Option<User>> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, company_id, name, email, password_hash, role, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    /// Find a user by email, case-insensitively
    pub async fn find_by_email(&self, email: &str) -> SqlxResult<Option<User>> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, company_id, name, email, password_hash, role, created_at
            FROM users
            WHERE email = lower($1)
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
    }

    /// All users of a company, oldest first
    pub async fn find_by_company(&self, company_id: Uuid) -> SqlxResult<Vec<User>> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, company_id, name, email, password_hash, role, created_at
            FROM users
            WHERE company_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(company_id)
        .fetch_all(&self.pool)
        .await
    }
}

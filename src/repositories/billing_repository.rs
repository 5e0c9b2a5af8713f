use crate::models::{Payment, Subscription};
use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use sqlx::{PgPool, Result as SqlxResult};
use uuid::Uuid;

/// Subscription state as reported by a Stripe event
#[derive(Debug, Clone)]
pub struct SubscriptionUpsert<'a> {
    pub company_id: Uuid,
    pub stripe_subscription_id: &'a str,
    pub plan: Option<&'a str>,
    pub status: &'a str,
    pub current_period_end: Option<NaiveDateTime>,
}

/// Repository for subscription and payment mirrors
pub struct BillingRepository {
    pool: PgPool,
}

impl BillingRepository {
    /// Create a new BillingRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert or refresh a subscription keyed by its Stripe id.
    ///
    /// Stripe redelivers events, so this must be idempotent.
    pub async fn upsert_subscription(&self, sub: &SubscriptionUpsert<'_>) -> SqlxResult<Subscription> {
        sqlx::query_as::<_, Subscription>(
            r#"
            INSERT INTO subscriptions (company_id, stripe_subscription_id, plan, status, current_period_end)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (stripe_subscription_id) DO UPDATE
            SET plan = COALESCE(EXCLUDED.plan, subscriptions.plan),
                status = EXCLUDED.status,
                current_period_end = COALESCE(EXCLUDED.current_period_end, subscriptions.current_period_end),
                updated_at = NOW()
            RETURNING id, company_id, stripe_subscription_id, plan, status, current_period_end,
                      created_at, updated_at
            "#,
        )
        .bind(sub.company_id)
        .bind(sub.stripe_subscription_id)
        .bind(sub.plan)
        .bind(sub.status)
        .bind(sub.current_period_end)
        .fetch_one(&self.pool)
        .await
    }

    /// Most recently updated subscription of a company
    pub async fn current_subscription(&self, company_id: Uuid) -> SqlxResult<Option<Subscription>> {
        sqlx::query_as::<_, Subscription>(
            r#"
            SELECT id, company_id, stripe_subscription_id, plan, status, current_period_end,
                   created_at, updated_at
            FROM subscriptions
            WHERE company_id = $1
            ORDER BY updated_at DESC
            LIMIT 1
            "#,
        )
        .bind(company_id)
        .fetch_optional(&self.pool)
        .await
    }

    /// Record an invoice outcome keyed by the Stripe invoice id
    pub async fn upsert_payment(
        &self,
        company_id: Uuid,
        stripe_invoice_id: &str,
        amount: Decimal,
        currency: &str,
        status: &str,
    ) -> SqlxResult<Payment> {
        sqlx::query_as::<_, Payment>(
            r#"
            INSERT INTO payments (company_id, stripe_invoice_id, amount, currency, status)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (stripe_invoice_id) DO UPDATE
            SET status = EXCLUDED.status, amount = EXCLUDED.amount
            RETURNING id, company_id, stripe_invoice_id, amount, currency, status, created_at
            "#,
        )
        .bind(company_id)
        .bind(stripe_invoice_id)
        .bind(amount)
        .bind(currency)
        .bind(status)
        .fetch_one(&self.pool)
        .await
    }

    /// Payments of a company, newest first
    pub async fn payments(&self, company_id: Uuid, limit: i64) -> SqlxResult<Vec<Payment>> {
        sqlx::query_as::<_, Payment>(
            r#"
            SELECT id, company_id, stripe_invoice_id, amount, currency, status, created_at
            FROM payments
            WHERE company_id = $1
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        )
        .bind(company_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
    }
}

//! Stripe webhook intake.
//!
//! Stripe is the source of truth for subscriptions and invoices; this
//! service only verifies the signed events and mirrors them locally.

use crate::error::{AppError, AppResult};
use crate::models::{Payment, Subscription};
use crate::repositories::{BillingRepository, CompanyRepository, SubscriptionUpsert};
use hmac::{Hmac, Mac};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::sync::Arc;
use subtle::ConstantTimeEq;
use tracing::{info, warn};
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

/// Maximum age of a signed event, in seconds
pub const SIGNATURE_TOLERANCE_SECS: i64 = 300;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureHeader {
    pub timestamp: i64,
    pub signatures: Vec<String>,
}

/// Parse `t=...,v1=...[,v1=...]`; other schemes are ignored
pub fn parse_signature_header(header: &str) -> AppResult<SignatureHeader> {
    let mut timestamp = None;
    let mut signatures = Vec::new();

    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => {
                timestamp = value.parse::<i64>().ok();
            }
            Some(("v1", value)) => signatures.push(value.to_string()),
            _ => {}
        }
    }

    match timestamp {
        Some(timestamp) if !signatures.is_empty() => Ok(SignatureHeader {
            timestamp,
            signatures,
        }),
        _ => Err(AppError::Validation(
            "Malformed Stripe-Signature header".to_string(),
        )),
    }
}

fn compute_signature(secret: &str, timestamp: i64, payload: &[u8]) -> AppResult<Vec<u8>> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| AppError::Config(format!("Invalid webhook secret: {}", e)))?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    Ok(mac.finalize().into_bytes().to_vec())
}

/// Check an event against its `Stripe-Signature` header at time `now`
pub fn verify_signature(secret: &str, header: &str, payload: &[u8], now: i64) -> AppResult<()> {
    let parsed = parse_signature_header(header)?;

    let within_tolerance = now
        .checked_sub(parsed.timestamp)
        .map(i64::unsigned_abs)
        .map_or(false, |age| age <= SIGNATURE_TOLERANCE_SECS.unsigned_abs());
    if !within_tolerance {
        return Err(AppError::Validation(
            "Stripe signature timestamp outside tolerance".to_string(),
        ));
    }

    let expected = compute_signature(secret, parsed.timestamp, payload)?;
    let matched = parsed.signatures.iter().any(|candidate| {
        match hex::decode(candidate) {
            Ok(actual) if actual.len() == expected.len() => expected.ct_eq(actual.as_slice()).into(),
            _ => false,
        }
    });

    if !matched {
        return Err(AppError::Validation(
            "Stripe signature mismatch".to_string(),
        ));
    }
    Ok(())
}

#[derive(Debug, Deserialize)]
pub struct StripeEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: StripeEventData,
}

#[derive(Debug, Deserialize)]
pub struct StripeEventData {
    pub object: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct StripeSubscription {
    id: String,
    customer: String,
    status: String,
    #[serde(default)]
    current_period_end: Option<i64>,
    #[serde(default)]
    items: Option<StripeList<StripeSubscriptionItem>>,
    #[serde(default)]
    metadata: std::collections::HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct StripeList<T> {
    data: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct StripeSubscriptionItem {
    price: StripePrice,
}

#[derive(Debug, Deserialize)]
struct StripePrice {
    id: String,
    #[serde(default)]
    nickname: Option<String>,
    #[serde(default)]
    lookup_key: Option<String>,
}

impl StripeSubscription {
    /// Human plan name: nickname, then lookup key, then price id
    fn plan(&self) -> Option<String> {
        let price = &self.items.as_ref()?.data.first()?.price;
        Some(
            price
                .nickname
                .clone()
                .or_else(|| price.lookup_key.clone())
                .unwrap_or_else(|| price.id.clone()),
        )
    }
}

#[derive(Debug, Deserialize)]
struct StripeInvoice {
    id: String,
    customer: String,
    #[serde(default)]
    amount_paid: i64,
    #[serde(default)]
    amount_due: i64,
    currency: String,
}

/// What happened to a delivered event
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "id", rename_all = "snake_case")]
pub enum WebhookOutcome {
    Subscription(Uuid),
    Payment(Uuid),
    Ignored(String),
}

/// Service for subscription and payment mirrors
pub struct BillingService {
    billing_repo: Arc<BillingRepository>,
    company_repo: Arc<CompanyRepository>,
    webhook_secret: Option<String>,
}

impl BillingService {
    pub fn new(
        billing_repo: Arc<BillingRepository>,
        company_repo: Arc<CompanyRepository>,
        webhook_secret: Option<String>,
    ) -> Self {
        Self {
            billing_repo,
            company_repo,
            webhook_secret,
        }
    }

    /// Verify and apply one webhook delivery
    pub async fn handle_webhook(&self, signature: Option<&str>, payload: &[u8]) -> AppResult<WebhookOutcome> {
        let secret = self
            .webhook_secret
            .as_deref()
            .ok_or_else(|| AppError::Config("STRIPE_WEBHOOK_SECRET is not configured".to_string()))?;
        let signature = signature.ok_or_else(|| {
            AppError::Validation("Missing Stripe-Signature header".to_string())
        })?;
        verify_signature(secret, signature, payload, chrono::Utc::now().timestamp())?;

        let event: StripeEvent = serde_json::from_slice(payload)
            .map_err(|e| AppError::Validation(format!("Invalid event payload: {}", e)))?;

        info!("Stripe event {} ({})", event.id, event.event_type);
        self.apply_event(event).await
    }

    async fn apply_event(&self, event: StripeEvent) -> AppResult<WebhookOutcome> {
        match event.event_type.as_str() {
            "customer.subscription.created"
            | "customer.subscription.updated"
            | "customer.subscription.deleted" => {
                let sub: StripeSubscription = serde_json::from_value(event.data.object)
                    .map_err(|e| AppError::Validation(format!("Invalid subscription object: {}", e)))?;
                self.apply_subscription(&event.event_type, sub).await
            }
            "invoice.payment_succeeded" | "invoice.payment_failed" => {
                let invoice: StripeInvoice = serde_json::from_value(event.data.object)
                    .map_err(|e| AppError::Validation(format!("Invalid invoice object: {}", e)))?;
                let succeeded = event.event_type == "invoice.payment_succeeded";
                self.apply_invoice(invoice, succeeded).await
            }
            other => Ok(WebhookOutcome::Ignored(other.to_string())),
        }
    }

    async fn apply_subscription(
        &self,
        event_type: &str,
        sub: StripeSubscription,
    ) -> AppResult<WebhookOutcome> {
        let company_id = match self.company_for_customer(&sub.customer).await? {
            Some(id) => id,
            None => {
                // Checkout passes our company id along the first time
                let linked = sub
                    .metadata
                    .get("company_id")
                    .and_then(|raw| Uuid::parse_str(raw).ok());
                let linked = match linked {
                    Some(id) => self
                        .company_repo
                        .set_stripe_customer(id, &sub.customer)
                        .await?
                        .then_some(id),
                    None => None,
                };
                match linked {
                    Some(id) => {
                        info!("Linked Stripe customer {} to company {}", sub.customer, id);
                        id
                    }
                    None => {
                        warn!("No company for Stripe customer {}", sub.customer);
                        return Ok(WebhookOutcome::Ignored(format!(
                            "unknown customer {}",
                            sub.customer
                        )));
                    }
                }
            }
        };

        let status = if event_type == "customer.subscription.deleted" {
            "canceled".to_string()
        } else {
            sub.status.clone()
        };
        let plan = sub.plan();
        let current_period_end = sub
            .current_period_end
            .and_then(|ts| chrono::DateTime::from_timestamp(ts, 0))
            .map(|dt| dt.naive_utc());

        let subscription = self
            .billing_repo
            .upsert_subscription(&SubscriptionUpsert {
                company_id,
                stripe_subscription_id: &sub.id,
                plan: plan.as_deref(),
                status: &status,
                current_period_end,
            })
            .await?;

        info!(
            "Subscription {} of company {} is {}",
            subscription.stripe_subscription_id, company_id, subscription.status
        );
        Ok(WebhookOutcome::Subscription(subscription.id))
    }

    async fn apply_invoice(&self, invoice: StripeInvoice, succeeded: bool) -> AppResult<WebhookOutcome> {
        let company_id = match self.company_for_customer(&invoice.customer).await? {
            Some(id) => id,
            None => {
                warn!("No company for Stripe customer {}", invoice.customer);
                return Ok(WebhookOutcome::Ignored(format!(
                    "unknown customer {}",
                    invoice.customer
                )));
            }
        };

        // Stripe amounts are in the currency's minor unit
        let (cents, status) = if succeeded {
            (invoice.amount_paid, "paid")
        } else {
            (invoice.amount_due, "failed")
        };
        let payment = self
            .billing_repo
            .upsert_payment(
                company_id,
                &invoice.id,
                Decimal::new(cents, 2),
                &invoice.currency.to_lowercase(),
                status,
            )
            .await?;

        info!("Invoice {} for company {} {}", invoice.id, company_id, status);
        Ok(WebhookOutcome::Payment(payment.id))
    }

    async fn company_for_customer(&self, customer_id: &str) -> AppResult<Option<Uuid>> {
        Ok(self
            .company_repo
            .find_by_stripe_customer(customer_id)
            .await?
            .map(|c| c.id))
    }

    pub async fn current_subscription(&self, company_id: Uuid) -> AppResult<Option<Subscription>> {
        Ok(self.billing_repo.current_subscription(company_id).await?)
    }

    pub async fn payments(&self, company_id: Uuid, limit: i64) -> AppResult<Vec<Payment>> {
        Ok(self.billing_repo.payments(company_id, limit).await?)
    }
}

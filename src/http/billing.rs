use super::extract::AuthContext;
use super::response::ApiResponse;
use crate::error::AppResult;
use crate::models::{Payment, Subscription};
use crate::services::billing_service::WebhookOutcome;
use crate::SharedState;
use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use serde::Deserialize;
use tracing::info;

const STRIPE_SIGNATURE: &str = "stripe-signature";

#[derive(Debug, Deserialize)]
pub struct PaymentsQuery {
    pub limit: Option<i64>,
}

pub async fn subscription(
    State(state): State<SharedState>,
    AuthContext(claims): AuthContext,
) -> AppResult<ApiResponse<Option<Subscription>>> {
    Ok(ApiResponse::ok(
        state.billing.current_subscription(claims.company_id).await?,
    ))
}

pub async fn payments(
    State(state): State<SharedState>,
    AuthContext(claims): AuthContext,
    Query(query): Query<PaymentsQuery>,
) -> AppResult<ApiResponse<Vec<Payment>>> {
    let limit = query.limit.unwrap_or(50).clamp(1, 200);
    Ok(ApiResponse::ok(
        state.billing.payments(claims.company_id, limit).await?,
    ))
}

/// Signed event delivery; the raw body is needed for the signature
pub async fn stripe_webhook(
    State(state): State<SharedState>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<ApiResponse<WebhookOutcome>> {
    let signature = headers
        .get(STRIPE_SIGNATURE)
        .and_then(|value| value.to_str().ok());

    let outcome = state.billing.handle_webhook(signature, &body).await?;
    if let WebhookOutcome::Ignored(reason) = &outcome {
        info!("Stripe event acknowledged without changes: {}", reason);
    }
    Ok(ApiResponse::ok(outcome))
}

//! HTTP surface: JSON API under `/api`, administration under `/admin`.

pub mod admin;
pub mod auth;
pub mod billing;
pub mod catalog;
pub mod extract;
pub mod jobs;
pub mod response;

pub use extract::{AuthContext, PlatformAdmin};
pub use response::ApiResponse;

use crate::error::{AppError, AppResult};
use crate::SharedState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use serde::Deserialize;
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::warn;

/// `?status=` filter shared by the listing endpoints
#[derive(Debug, Default, Deserialize)]
pub struct StatusQuery {
    pub status: Option<String>,
}

/// Parse an optional enum filter; blank means no filter
pub(crate) fn parse_status<T>(
    raw: Option<&str>,
    parse: fn(&str) -> Result<T, String>,
) -> AppResult<Option<T>> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        Some(value) => parse(value).map(Some).map_err(AppError::Validation),
        None => Ok(None),
    }
}

async fn health(State(state): State<SharedState>) -> Response {
    match state.database.ping().await {
        Ok(()) => ApiResponse::ok(json!({"status": "ok", "database": "up"})).into_response(),
        Err(e) => {
            warn!("Health check failed: {}", e);
            let body = json!({
                "success": false,
                "data": {"status": "degraded", "database": "down"},
            });
            (StatusCode::SERVICE_UNAVAILABLE, axum::Json(body)).into_response()
        }
    }
}

fn api_routes() -> Router<SharedState> {
    Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/me", get(auth::me))
        .route("/company/members", get(auth::members).post(auth::add_member))
        .route("/products", get(catalog::search).post(catalog::create))
        .route("/products/mine", get(catalog::mine))
        .route("/products/import", post(catalog::import))
        .route(
            "/products/:id",
            get(catalog::get).put(catalog::update).delete(catalog::delete),
        )
        .route("/providers", get(catalog::providers))
        .route(
            "/rental-jobs",
            get(jobs::list_rental_jobs).post(jobs::create_rental_job),
        )
        .route("/rental-jobs/:id", get(jobs::rental_job_detail))
        .route("/rental-jobs/:id/cancel", post(jobs::cancel_rental_job))
        .route("/supply-jobs", get(jobs::list_supply_jobs))
        .route("/supply-jobs/:id", get(jobs::supply_job_detail))
        .route("/supply-jobs/:id/offers", post(jobs::send_offer))
        .route("/supply-jobs/:id/handshake", post(jobs::handshake))
        .route("/supply-jobs/:id/cancel", post(jobs::cancel_negotiation))
        .route("/supply-jobs/:id/start", post(jobs::start_supply_job))
        .route("/supply-jobs/:id/complete", post(jobs::complete_supply_job))
        .route(
            "/supply-jobs/:id/rating",
            get(jobs::supply_job_rating).post(jobs::rate_supply_job),
        )
        .route("/companies/:id/ratings", get(jobs::company_ratings))
        .route("/subscription", get(billing::subscription))
        .route("/payments", get(billing::payments))
        .route("/webhooks/stripe", post(billing::stripe_webhook))
}

fn admin_routes() -> Router<SharedState> {
    Router::new()
        .route("/companies", get(admin::companies))
        .route("/companies/:id/active", post(admin::set_company_active))
        .route("/rental-jobs", get(admin::rental_jobs))
}

/// Build the application router
pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/api", api_routes())
        .nest("/admin", admin_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

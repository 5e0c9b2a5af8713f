//! Subrent Backend Library
//!
//! Equipment sub-rental marketplace: renters post rental requests, providers
//! negotiate supply jobs against them, and handshakes commit stock.
//! This module exposes the components for use by the binary and by tests.

pub mod auth;
pub mod catalog;
pub mod config;
pub mod database;
pub mod error;
pub mod http;
pub mod models;
pub mod negotiation;
pub mod repositories;
pub mod services;
pub mod templates;

// Re-export commonly used types
pub use config::AppConfig;
pub use error::{AppError, AppResult};
pub use http::router;

use database::Database;
use repositories::*;
use services::{
    AuditTrailService, AuthService, BillingService, CatalogService, NegotiationService, Notifier,
    RatingService,
};
use std::sync::Arc;

/// Application state containing all repositories and services
pub struct AppState {
    pub database: Database,
    pub config: AppConfig,
    pub company_repo: Arc<CompanyRepository>,
    pub auth: Arc<AuthService>,
    pub catalog: Arc<CatalogService>,
    pub negotiation: Arc<NegotiationService>,
    pub ratings: Arc<RatingService>,
    pub billing: Arc<BillingService>,
    pub notifier: Arc<Notifier>,
    pub audit: Arc<AuditTrailService>,
}

/// State handed to every axum handler
pub type SharedState = Arc<AppState>;

impl AppState {
    /// Wire repositories and services, mailing through the configured outbox
    pub fn new(pool: sqlx::PgPool, config: AppConfig) -> AppResult<Self> {
        let notifier = Arc::new(Notifier::from_config(&config.mail));
        Self::with_notifier(pool, config, notifier)
    }

    /// Same as [`AppState::new`] with a caller-supplied notifier
    pub fn with_notifier(
        pool: sqlx::PgPool,
        config: AppConfig,
        notifier: Arc<Notifier>,
    ) -> AppResult<Self> {
        let database = Database::new(pool.clone());
        let audit = Arc::new(AuditTrailService::new(config.audit_log_dir.clone())?);

        let company_repo = Arc::new(CompanyRepository::new(pool.clone()));
        let user_repo = Arc::new(UserRepository::new(pool.clone()));
        let product_repo = Arc::new(ProductRepository::new(pool.clone()));
        let rental_repo = Arc::new(RentalJobRepository::new(pool.clone()));
        let supply_repo = Arc::new(SupplyJobRepository::new(pool.clone()));
        let offer_repo = Arc::new(JobOfferRepository::new(pool.clone()));
        let rating_repo = Arc::new(JobRatingRepository::new(pool.clone()));
        let billing_repo = Arc::new(BillingRepository::new(pool.clone()));

        let auth = Arc::new(AuthService::new(
            pool.clone(),
            company_repo.clone(),
            user_repo,
            config.auth.clone(),
        ));
        let catalog = Arc::new(CatalogService::new(
            pool.clone(),
            product_repo.clone(),
            company_repo.clone(),
            audit.clone(),
            config.import_match_threshold,
        ));
        let negotiation = Arc::new(NegotiationService::new(
            pool,
            rental_repo.clone(),
            supply_repo.clone(),
            offer_repo,
            company_repo.clone(),
            product_repo,
            notifier.clone(),
            audit.clone(),
        ));
        let ratings = Arc::new(RatingService::new(
            rating_repo,
            supply_repo,
            rental_repo,
            audit.clone(),
        ));
        let billing = Arc::new(BillingService::new(
            billing_repo,
            company_repo.clone(),
            config.stripe_webhook_secret.clone(),
        ));

        Ok(Self {
            database,
            config,
            company_repo,
            auth,
            catalog,
            negotiation,
            ratings,
            billing,
            notifier,
            audit,
        })
    }
}

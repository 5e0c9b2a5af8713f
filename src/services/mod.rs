pub mod audit;
pub mod auth_service;
pub mod billing_service;
pub mod catalog_service;
pub mod negotiation_service;
pub mod notifier;
pub mod rating_service;

pub use audit::AuditTrailService;
pub use auth_service::AuthService;
pub use billing_service::BillingService;
pub use catalog_service::CatalogService;
pub use negotiation_service::NegotiationService;
pub use notifier::{MailTransport, Notifier, OutboxTransport};
pub use rating_service::RatingService;

pub mod billing_repository;
pub mod company_repository;
pub mod job_offer_repository;
pub mod job_rating_repository;
pub mod product_repository;
pub mod rental_job_repository;
pub mod supply_job_repository;
pub mod user_repository;

// Re-export all repositories for convenient access
pub use billing_repository::{BillingRepository, SubscriptionUpsert};
pub use company_repository::CompanyRepository;
pub use job_offer_repository::{JobOfferRepository, NewOffer};
pub use job_rating_repository::JobRatingRepository;
pub use product_repository::{ProductRepository, ProductSearch};
pub use rental_job_repository::{NewRentalJob, RentalJobRepository};
pub use supply_job_repository::SupplyJobRepository;
pub use user_repository::UserRepository;

//! Domain models for the Subrent backend.
//!
//! This module contains all database-backed models representing
//! the core entities of the sub-rental marketplace.

pub mod billing;
pub mod company;
pub mod job_offer;
pub mod job_rating;
pub mod money;
pub mod product;
pub mod rental_job;
pub mod supply_job;
pub mod user;

// Re-export all models for convenient access
pub use billing::{Payment, Subscription};
pub use company::{AccountType, Company};
pub use job_offer::{JobOffer, OfferStatus};
pub use job_rating::{JobRating, RatingSummary};
pub use money::{check_amount, AmountError};
pub use product::{Product, ProductInput, ProductListing};
pub use rental_job::{RentalJob, RentalJobProduct, RentalJobStatus};
pub use supply_job::{HandshakeStatus, SupplyJob, SupplyJobProduct, SupplyJobStatus};
pub use user::{User, UserRole};

//! Rental requests, offers, handshakes and fulfillment.
//!
//! Every mutation follows the same shape: open a transaction, lock the
//! rental job row, then the supply job row, read the latest offer, ask
//! `negotiation::rules` what is allowed, write, and recompute the rental
//! job status before committing. Mail and audit entries go out after the
//! commit and never fail the call.

use crate::auth::Claims;
use crate::error::{AppError, AppResult, RepositoryError};
use crate::models::{
    AccountType, Company, JobOffer, OfferStatus, RentalJob, RentalJobProduct, RentalJobStatus,
    SupplyJob, SupplyJobProduct, SupplyJobStatus,
};
use crate::negotiation::{
    apportion_fulfillment, derive_rental_status, ensure_can_cancel, ensure_can_handshake,
    ensure_can_send_offer, ensure_supply_transition, next_offer_version, rules,
    validate_offered_quantity, validate_price, Allocation, FulfillmentLine, NegotiationError,
};
use crate::repositories::{
    CompanyRepository, JobOfferRepository, NewOffer, NewRentalJob, ProductRepository,
    RentalJobRepository, SupplyJobRepository,
};
use crate::services::{AuditTrailService, Notifier};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

pub const FULLY_SUPPLIED_REASON: &str = "request fully supplied";
pub const RENTAL_CANCELLED_REASON: &str = "rental request cancelled by renter";

/// One requested item: either a catalog product or a free-text name
#[derive(Debug, Clone, Deserialize)]
pub struct RentalLineRequest {
    #[serde(default)]
    pub product_id: Option<Uuid>,
    #[serde(default)]
    pub name: Option<String>,
    pub quantity: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateRentalRequest {
    pub title: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub delivery_address: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    pub lines: Vec<RentalLineRequest>,
    pub provider_ids: Vec<Uuid>,
    /// Opening price sent to every provider as offer v1
    #[serde(default)]
    pub initial_price: Option<Decimal>,
}

/// New offered quantity for one requested line
#[derive(Debug, Clone, Deserialize)]
pub struct QuantityChange {
    pub rental_job_product_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OfferRequest {
    pub price: Decimal,
    #[serde(default)]
    pub quantities: Vec<QuantityChange>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CancelRequest {
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SupplyJobView {
    pub supply_job: SupplyJob,
    pub lines: Vec<SupplyJobProduct>,
    pub latest_offer: Option<JobOffer>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RentalJobDetail {
    pub rental_job: RentalJob,
    pub lines: Vec<RentalJobProduct>,
    pub supply_jobs: Vec<SupplyJobView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SupplyJobDetail {
    pub supply_job: SupplyJob,
    pub rental_job: RentalJob,
    pub rental_lines: Vec<RentalJobProduct>,
    pub lines: Vec<SupplyJobProduct>,
    pub offers: Vec<JobOffer>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommittedLine {
    pub rental_job_product_id: Uuid,
    pub name: String,
    pub quantity: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct HandshakeOutcome {
    pub supply_job: SupplyJob,
    pub rental_job: RentalJob,
    pub committed: Vec<CommittedLine>,
    /// Other supply jobs closed because nothing was left to supply
    pub auto_cancelled: Vec<Uuid>,
}

fn not_found(what: &str, id: Uuid) -> AppError {
    AppError::NotFound(format!("{} {} not found", what, id))
}

fn ensure_account(actor: &Claims, expected: AccountType, message: &str) -> AppResult<()> {
    if AccountType::from_str(&actor.account_type).ok() != Some(expected) {
        return Err(AppError::Forbidden(message.to_string()));
    }
    Ok(())
}

/// Shape checks on a new request that need no database
fn validate_request(actor_company: Uuid, req: &CreateRentalRequest) -> AppResult<Vec<Uuid>> {
    if req.title.trim().is_empty() {
        return Err(AppError::Validation("Title is required".to_string()));
    }
    if req.start_date > req.end_date {
        return Err(AppError::Validation(
            "Start date must not be after end date".to_string(),
        ));
    }
    if req.lines.is_empty() {
        return Err(AppError::Validation(
            "At least one line item is required".to_string(),
        ));
    }
    for (idx, line) in req.lines.iter().enumerate() {
        if line.quantity <= 0 {
            return Err(AppError::Validation(format!(
                "Line {}: quantity must be greater than 0",
                idx + 1
            )));
        }
        let has_name = line.name.as_deref().map_or(false, |n| !n.trim().is_empty());
        if line.product_id.is_none() && !has_name {
            return Err(AppError::Validation(format!(
                "Line {}: a product or a name is required",
                idx + 1
            )));
        }
    }
    if let Some(price) = req.initial_price {
        validate_price(price)?;
    }

    let mut providers: Vec<Uuid> = Vec::new();
    for id in &req.provider_ids {
        if *id == actor_company {
            return Err(AppError::Validation(
                "A company can't supply its own request".to_string(),
            ));
        }
        if !providers.contains(id) {
            providers.push(*id);
        }
    }
    if providers.is_empty() {
        return Err(AppError::Validation(
            "At least one provider is required".to_string(),
        ));
    }
    Ok(providers)
}

/// Service driving the rental negotiation state machine
pub struct NegotiationService {
    pool: PgPool,
    rental_repo: Arc<RentalJobRepository>,
    supply_repo: Arc<SupplyJobRepository>,
    offer_repo: Arc<JobOfferRepository>,
    company_repo: Arc<CompanyRepository>,
    product_repo: Arc<ProductRepository>,
    notifier: Arc<Notifier>,
    audit: Arc<AuditTrailService>,
}

impl NegotiationService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        pool: PgPool,
        rental_repo: Arc<RentalJobRepository>,
        supply_repo: Arc<SupplyJobRepository>,
        offer_repo: Arc<JobOfferRepository>,
        company_repo: Arc<CompanyRepository>,
        product_repo: Arc<ProductRepository>,
        notifier: Arc<Notifier>,
        audit: Arc<AuditTrailService>,
    ) -> Self {
        Self {
            pool,
            rental_repo,
            supply_repo,
            offer_repo,
            company_repo,
            product_repo,
            notifier,
            audit,
        }
    }

    /// Post a rental request to one or more providers
    pub async fn create_rental_request(
        &self,
        actor: &Claims,
        req: CreateRentalRequest,
    ) -> AppResult<RentalJobDetail> {
        ensure_account(actor, AccountType::User, "Only renter accounts can post rental requests")?;
        let provider_ids = validate_request(actor.company_id, &req)?;

        let companies = self.companies(&provider_ids).await?;
        for id in &provider_ids {
            let provider = companies.get(id).ok_or_else(|| not_found("Provider", *id))?;
            if !provider.is_provider() || !provider.is_active {
                return Err(AppError::Validation(format!(
                    "Company {} is not an active provider",
                    provider.name
                )));
            }
        }

        // Resolve line names from the catalog where a product is referenced
        let mut resolved: Vec<(Option<Uuid>, String, i32)> = Vec::with_capacity(req.lines.len());
        for line in &req.lines {
            let name = match line.product_id {
                Some(product_id) => {
                    let product = self
                        .product_repo
                        .find_by_id(product_id)
                        .await?
                        .filter(|p| p.is_active)
                        .ok_or_else(|| not_found("Product", product_id))?;
                    line.name
                        .as_deref()
                        .map(str::trim)
                        .filter(|n| !n.is_empty())
                        .map(str::to_string)
                        .unwrap_or(product.name)
                }
                None => line.name.as_deref().unwrap_or_default().trim().to_string(),
            };
            resolved.push((line.product_id, name, line.quantity));
        }

        let mut tx = self.pool.begin().await?;

        let rental_job = self
            .rental_repo
            .create(
                &mut *tx,
                &NewRentalJob {
                    renter_company_id: actor.company_id,
                    title: req.title.trim(),
                    start_date: req.start_date,
                    end_date: req.end_date,
                    delivery_address: req.delivery_address.as_deref(),
                    notes: req.notes.as_deref(),
                },
            )
            .await
            .map_err(RepositoryError::from)?;

        let mut lines = Vec::with_capacity(resolved.len());
        for (product_id, name, quantity) in &resolved {
            let line = self
                .rental_repo
                .add_line(&mut *tx, rental_job.id, *product_id, name, *quantity)
                .await
                .map_err(RepositoryError::from)?;
            lines.push(line);
        }

        let mut supply_jobs = Vec::with_capacity(provider_ids.len());
        let mut opening_offers = Vec::new();
        for provider_id in &provider_ids {
            let supply_job = self
                .supply_repo
                .create(&mut *tx, rental_job.id, *provider_id)
                .await
                .map_err(RepositoryError::from)?;

            let mut supply_lines = Vec::with_capacity(lines.len());
            for line in &lines {
                let supply_line = self
                    .supply_repo
                    .add_line(&mut *tx, supply_job.id, line.id, line.requested_quantity)
                    .await
                    .map_err(RepositoryError::from)?;
                supply_lines.push(supply_line);
            }

            let latest_offer = match req.initial_price {
                Some(price) => {
                    let offer = self
                        .offer_repo
                        .create(
                            &mut *tx,
                            &NewOffer {
                                rental_job_id: rental_job.id,
                                supply_job_id: supply_job.id,
                                sender_company_id: actor.company_id,
                                receiver_company_id: *provider_id,
                                version: next_offer_version(None),
                                price,
                                notes: req.notes.as_deref(),
                            },
                        )
                        .await
                        .map_err(RepositoryError::from)?;
                    opening_offers.push(offer.clone());
                    Some(offer)
                }
                None => None,
            };

            supply_jobs.push(SupplyJobView {
                supply_job,
                lines: supply_lines,
                latest_offer,
            });
        }

        tx.commit().await?;

        info!(
            "Rental job {} created by company {} for {} provider(s)",
            rental_job.id,
            actor.company_id,
            provider_ids.len()
        );

        for offer in &opening_offers {
            if let Err(e) = self.audit.log_offer_sent(offer).await {
                warn!("Failed to audit offer {}: {}", offer.id, e);
            }
        }
        if let Some(renter) = self.company(actor.company_id).await {
            for provider_id in &provider_ids {
                if let Some(provider) = companies.get(provider_id) {
                    self.notifier
                        .rental_request_received(provider, &renter, &rental_job, &lines, req.initial_price)
                        .await;
                }
            }
        }

        Ok(RentalJobDetail {
            rental_job,
            lines,
            supply_jobs,
        })
    }

    /// Send the next offer version on a supply job
    pub async fn send_offer(
        &self,
        actor: &Claims,
        supply_job_id: Uuid,
        req: OfferRequest,
    ) -> AppResult<JobOffer> {
        let mut tx = self.pool.begin().await?;
        let (rental_job, supply_job) = self.lock_pair(&mut tx, supply_job_id).await?;
        let latest = self.offer_repo.latest(&mut *tx, supply_job.id).await?;

        let party = ensure_can_send_offer(
            actor.company_id,
            &rental_job,
            &supply_job,
            latest.as_ref(),
            req.price,
        )?;

        if !req.quantities.is_empty() {
            let rental_lines = self.rental_repo.lines(&mut *tx, rental_job.id).await?;
            for change in &req.quantities {
                let line = rental_lines
                    .iter()
                    .find(|l| l.id == change.rental_job_product_id)
                    .ok_or(NegotiationError::UnknownLine(change.rental_job_product_id))?;
                validate_offered_quantity(line, change.quantity)?;
                self.supply_repo
                    .set_offered_quantity(&mut *tx, supply_job.id, line.id, change.quantity)
                    .await
                    .map_err(RepositoryError::from)?;
            }
        }

        if let Some(previous) = latest.as_ref().filter(|o| o.is_pending()) {
            self.offer_repo
                .set_status(&mut *tx, previous.id, OfferStatus::Countered)
                .await?;
        }

        let offer = self
            .offer_repo
            .create(
                &mut *tx,
                &NewOffer {
                    rental_job_id: rental_job.id,
                    supply_job_id: supply_job.id,
                    sender_company_id: actor.company_id,
                    receiver_company_id: rules::counterparty(party, &rental_job, &supply_job),
                    version: next_offer_version(latest.as_ref().map(|o| o.version)),
                    price: req.price,
                    notes: req.notes.as_deref(),
                },
            )
            .await
            .map_err(RepositoryError::from)?;

        let status = supply_job.status_enum();
        if status != SupplyJobStatus::Negotiating {
            ensure_supply_transition(status, SupplyJobStatus::Negotiating)?;
            self.supply_repo
                .update_status(&mut *tx, supply_job.id, SupplyJobStatus::Negotiating)
                .await?;
        }

        self.refresh_rental_status(&mut tx, &rental_job).await?;
        tx.commit().await?;

        info!(
            "Offer v{} on supply job {} sent by company {} ({})",
            offer.version, supply_job.id, actor.company_id, offer.price
        );

        if let Err(e) = self.audit.log_offer_sent(&offer).await {
            warn!("Failed to audit offer {}: {}", offer.id, e);
        }
        let companies = self
            .companies(&[offer.sender_company_id, offer.receiver_company_id])
            .await
            .unwrap_or_default();
        if let (Some(sender), Some(receiver)) = (
            companies.get(&offer.sender_company_id),
            companies.get(&offer.receiver_company_id),
        ) {
            self.notifier
                .offer_received(receiver, sender, &rental_job, &offer)
                .await;
        }

        Ok(offer)
    }

    /// Accept the pending offer, locking in price and quantities
    pub async fn handshake(&self, actor: &Claims, supply_job_id: Uuid) -> AppResult<HandshakeOutcome> {
        let mut tx = self.pool.begin().await?;
        let (rental_job, supply_job) = self.lock_pair(&mut tx, supply_job_id).await?;
        let latest = self.offer_repo.latest(&mut *tx, supply_job.id).await?;

        let offer = ensure_can_handshake(actor.company_id, &rental_job, &supply_job, latest.as_ref())?
            .clone();
        ensure_supply_transition(supply_job.status_enum(), SupplyJobStatus::Accepted)?;

        let rental_lines = self.rental_repo.lines(&mut *tx, rental_job.id).await?;
        let supply_lines = self.supply_repo.lines(&mut *tx, supply_job.id).await?;

        let fulfillment: Vec<FulfillmentLine> = supply_lines
            .iter()
            .filter_map(|sl| {
                rental_lines
                    .iter()
                    .find(|rl| rl.id == sl.rental_job_product_id)
                    .map(|rl| FulfillmentLine {
                        supply_line_id: sl.id,
                        rental_line_id: rl.id,
                        offered: sl.offered_quantity,
                        requested: rl.requested_quantity,
                        fulfilled: rl.fulfilled_quantity,
                    })
            })
            .collect();
        let allocations: Vec<Allocation> = apportion_fulfillment(&fulfillment)?;

        let mut committed = Vec::new();
        for allocation in &allocations {
            self.supply_repo
                .set_line_fulfilled(&mut *tx, allocation.supply_line_id, allocation.take)
                .await?;
            if allocation.take == 0 {
                continue;
            }
            let line = self
                .rental_repo
                .add_fulfilled(&mut *tx, allocation.rental_line_id, allocation.take)
                .await?
                .ok_or_else(|| {
                    AppError::Conflict(format!(
                        "Line {} no longer has {} unit(s) open",
                        allocation.rental_line_id, allocation.take
                    ))
                })?;
            committed.push(CommittedLine {
                rental_job_product_id: line.id,
                name: line.name,
                quantity: allocation.take,
            });
        }

        self.offer_repo
            .set_status(&mut *tx, offer.id, OfferStatus::Accepted)
            .await?;
        let supply_job = self
            .supply_repo
            .mark_accepted(&mut *tx, supply_job.id, offer.price)
            .await?;

        let fully_fulfilled = self
            .rental_repo
            .lines(&mut *tx, rental_job.id)
            .await?
            .iter()
            .all(|l| l.is_fulfilled());

        let mut auto_cancelled = Vec::new();
        if fully_fulfilled {
            let siblings = self.supply_repo.find_by_rental_job(&mut *tx, rental_job.id).await?;
            for sibling in siblings
                .iter()
                .filter(|s| s.id != supply_job.id && s.status_enum().is_negotiable())
            {
                self.offer_repo.cancel_pending(&mut *tx, sibling.id).await?;
                self.supply_repo
                    .mark_cancelled(&mut *tx, sibling.id, Some(FULLY_SUPPLIED_REASON))
                    .await?;
                auto_cancelled.push(sibling.clone());
            }
        }

        let rental_job = self.refresh_rental_status(&mut tx, &rental_job).await?;
        tx.commit().await?;

        info!(
            "Handshake on supply job {} at {}; rental job {} is now {}",
            supply_job.id, offer.price, rental_job.id, rental_job.status
        );

        if let Err(e) = self
            .audit
            .log_handshake(&supply_job, &offer, actor.company_id, &allocations)
            .await
        {
            warn!("Failed to audit handshake on {}: {}", supply_job.id, e);
        }

        let mut ids = vec![rental_job.renter_company_id, supply_job.provider_company_id];
        ids.extend(auto_cancelled.iter().map(|s| s.provider_company_id));
        let companies = self.companies(&ids).await.unwrap_or_default();
        if let (Some(renter), Some(provider)) = (
            companies.get(&rental_job.renter_company_id),
            companies.get(&supply_job.provider_company_id),
        ) {
            let lines: Vec<(String, i32)> = committed
                .iter()
                .map(|c| (c.name.clone(), c.quantity))
                .collect();
            self.notifier
                .handshake_confirmed(renter, provider, &rental_job, offer.price, &lines)
                .await;
            for sibling in &auto_cancelled {
                if let Some(other) = companies.get(&sibling.provider_company_id) {
                    self.notifier
                        .negotiation_cancelled(other, renter, &rental_job, Some(FULLY_SUPPLIED_REASON))
                        .await;
                }
            }
        }

        Ok(HandshakeOutcome {
            supply_job,
            rental_job,
            committed,
            auto_cancelled: auto_cancelled.iter().map(|s| s.id).collect(),
        })
    }

    /// Walk away from a supply job before a handshake
    pub async fn cancel_negotiation(
        &self,
        actor: &Claims,
        supply_job_id: Uuid,
        reason: Option<String>,
    ) -> AppResult<SupplyJob> {
        let reason = reason.map(|r| r.trim().to_string()).filter(|r| !r.is_empty());

        let mut tx = self.pool.begin().await?;
        let (rental_job, supply_job) = self.lock_pair(&mut tx, supply_job_id).await?;
        let latest = self.offer_repo.latest(&mut *tx, supply_job.id).await?;

        let party = ensure_can_cancel(actor.company_id, &rental_job, &supply_job, latest.as_ref())?;
        ensure_supply_transition(supply_job.status_enum(), SupplyJobStatus::Cancelled)?;

        self.offer_repo.cancel_pending(&mut *tx, supply_job.id).await?;
        let supply_job = self
            .supply_repo
            .mark_cancelled(&mut *tx, supply_job.id, reason.as_deref())
            .await?;
        let rental_job = self.refresh_rental_status(&mut tx, &rental_job).await?;
        tx.commit().await?;

        info!(
            "Supply job {} cancelled by company {}; rental job {} is now {}",
            supply_job.id, actor.company_id, rental_job.id, rental_job.status
        );

        if let Err(e) = self
            .audit
            .log_negotiation_cancelled(&supply_job, actor.company_id, reason.as_deref())
            .await
        {
            warn!("Failed to audit cancellation of {}: {}", supply_job.id, e);
        }

        let other = rules::counterparty(party, &rental_job, &supply_job);
        let companies = self
            .companies(&[actor.company_id, other])
            .await
            .unwrap_or_default();
        if let (Some(by), Some(recipient)) = (companies.get(&actor.company_id), companies.get(&other)) {
            self.notifier
                .negotiation_cancelled(recipient, by, &rental_job, reason.as_deref())
                .await;
        }

        Ok(supply_job)
    }

    /// Renter withdraws a whole request; only possible before any handshake
    pub async fn cancel_rental_job(&self, actor: &Claims, rental_job_id: Uuid) -> AppResult<RentalJob> {
        let mut tx = self.pool.begin().await?;
        let rental_job = self
            .rental_repo
            .lock(&mut *tx, rental_job_id)
            .await?
            .ok_or_else(|| not_found("Rental job", rental_job_id))?;

        if rental_job.renter_company_id != actor.company_id {
            return Err(NegotiationError::RenterOnly(rental_job.id).into());
        }
        let status = rental_job.status_enum();
        if !matches!(status, RentalJobStatus::Open | RentalJobStatus::InNegotiation) {
            return Err(
                NegotiationError::RentalJobClosed(rental_job.id, status.as_str().to_string()).into(),
            );
        }

        let supply_jobs = self.supply_repo.find_by_rental_job(&mut *tx, rental_job.id).await?;
        if let Some(agreed) = supply_jobs.iter().find(|s| s.status_enum().is_agreed()) {
            return Err(AppError::Conflict(format!(
                "Supply job {} was already accepted",
                agreed.id
            )));
        }

        let mut cancelled = Vec::new();
        for supply_job in supply_jobs.iter().filter(|s| s.status_enum().is_negotiable()) {
            self.offer_repo.cancel_pending(&mut *tx, supply_job.id).await?;
            self.supply_repo
                .mark_cancelled(&mut *tx, supply_job.id, Some(RENTAL_CANCELLED_REASON))
                .await?;
            cancelled.push(supply_job.provider_company_id);
        }
        let rental_job = self
            .rental_repo
            .update_status(&mut *tx, rental_job.id, RentalJobStatus::Cancelled)
            .await?;
        tx.commit().await?;

        info!("Rental job {} cancelled by renter", rental_job.id);
        if let Err(e) = self
            .audit
            .log_rental_job_cancelled(rental_job.id, actor.company_id)
            .await
        {
            warn!("Failed to audit cancellation of {}: {}", rental_job.id, e);
        }

        let mut ids = cancelled.clone();
        ids.push(actor.company_id);
        let companies = self.companies(&ids).await.unwrap_or_default();
        if let Some(renter) = companies.get(&actor.company_id) {
            for provider_id in &cancelled {
                if let Some(provider) = companies.get(provider_id) {
                    self.notifier
                        .negotiation_cancelled(provider, renter, &rental_job, Some(RENTAL_CANCELLED_REASON))
                        .await;
                }
            }
        }

        Ok(rental_job)
    }

    /// Provider dispatched the equipment
    pub async fn start_supply_job(&self, actor: &Claims, supply_job_id: Uuid) -> AppResult<SupplyJob> {
        let mut tx = self.pool.begin().await?;
        let (_, supply_job) = self.lock_pair(&mut tx, supply_job_id).await?;

        if supply_job.provider_company_id != actor.company_id {
            return Err(NegotiationError::ProviderOnly(supply_job.id).into());
        }
        ensure_supply_transition(supply_job.status_enum(), SupplyJobStatus::InProgress)?;

        let supply_job = self
            .supply_repo
            .update_status(&mut *tx, supply_job.id, SupplyJobStatus::InProgress)
            .await?;
        tx.commit().await?;

        info!("Supply job {} in progress", supply_job.id);
        if let Err(e) = self.audit.log_supply_job_status(&supply_job, actor.company_id).await {
            warn!("Failed to audit supply job {}: {}", supply_job.id, e);
        }
        Ok(supply_job)
    }

    /// Renter confirms the job is done
    pub async fn complete_supply_job(&self, actor: &Claims, supply_job_id: Uuid) -> AppResult<SupplyJob> {
        let mut tx = self.pool.begin().await?;
        let (rental_job, supply_job) = self.lock_pair(&mut tx, supply_job_id).await?;

        if rental_job.renter_company_id != actor.company_id {
            return Err(NegotiationError::RenterOnly(rental_job.id).into());
        }
        ensure_supply_transition(supply_job.status_enum(), SupplyJobStatus::Completed)?;

        let supply_job = self
            .supply_repo
            .update_status(&mut *tx, supply_job.id, SupplyJobStatus::Completed)
            .await?;
        let rental_job = self.refresh_rental_status(&mut tx, &rental_job).await?;
        tx.commit().await?;

        info!(
            "Supply job {} completed; rental job {} is now {}",
            supply_job.id, rental_job.id, rental_job.status
        );
        if let Err(e) = self.audit.log_supply_job_status(&supply_job, actor.company_id).await {
            warn!("Failed to audit supply job {}: {}", supply_job.id, e);
        }

        let companies = self
            .companies(&[rental_job.renter_company_id, supply_job.provider_company_id])
            .await
            .unwrap_or_default();
        if let (Some(renter), Some(provider)) = (
            companies.get(&rental_job.renter_company_id),
            companies.get(&supply_job.provider_company_id),
        ) {
            self.notifier.job_completed(provider, renter, &rental_job).await;
        }

        Ok(supply_job)
    }

    /// Renter sees every supply job; a provider only its own
    pub async fn rental_job_detail(&self, actor: &Claims, rental_job_id: Uuid) -> AppResult<RentalJobDetail> {
        let rental_job = self
            .rental_repo
            .find_by_id(rental_job_id)
            .await?
            .ok_or_else(|| not_found("Rental job", rental_job_id))?;
        let is_renter = rental_job.renter_company_id == actor.company_id;

        let supply_jobs: Vec<SupplyJob> = self
            .supply_repo
            .find_by_rental_job(&self.pool, rental_job.id)
            .await?
            .into_iter()
            .filter(|s| is_renter || s.provider_company_id == actor.company_id)
            .collect();
        if !is_renter && supply_jobs.is_empty() {
            return Err(AppError::Forbidden(format!(
                "Company {} is not part of rental job {}",
                actor.company_id, rental_job.id
            )));
        }

        let lines = self.rental_repo.lines(&self.pool, rental_job.id).await?;
        let mut views = Vec::with_capacity(supply_jobs.len());
        for supply_job in supply_jobs {
            let lines = self.supply_repo.lines(&self.pool, supply_job.id).await?;
            let latest_offer = self.offer_repo.latest(&self.pool, supply_job.id).await?;
            views.push(SupplyJobView {
                supply_job,
                lines,
                latest_offer,
            });
        }

        Ok(RentalJobDetail {
            rental_job,
            lines,
            supply_jobs: views,
        })
    }

    /// Supply job with its full offer history, for either party
    pub async fn supply_job_detail(&self, actor: &Claims, supply_job_id: Uuid) -> AppResult<SupplyJobDetail> {
        let supply_job = self
            .supply_repo
            .find_by_id(supply_job_id)
            .await?
            .ok_or_else(|| not_found("Supply job", supply_job_id))?;
        let rental_job = self
            .rental_repo
            .find_by_id(supply_job.rental_job_id)
            .await?
            .ok_or_else(|| not_found("Rental job", supply_job.rental_job_id))?;
        rules::party_of(actor.company_id, &rental_job, &supply_job)?;

        let rental_lines = self.rental_repo.lines(&self.pool, rental_job.id).await?;
        let lines = self.supply_repo.lines(&self.pool, supply_job.id).await?;
        let offers = self.offer_repo.history(supply_job.id).await?;

        Ok(SupplyJobDetail {
            supply_job,
            rental_job,
            rental_lines,
            lines,
            offers,
        })
    }

    /// Requests posted by the caller's company
    pub async fn list_rental_jobs(
        &self,
        actor: &Claims,
        status: Option<RentalJobStatus>,
    ) -> AppResult<Vec<RentalJob>> {
        Ok(self.rental_repo.find_by_renter(actor.company_id, status).await?)
    }

    /// Supply jobs addressed to the caller's company
    pub async fn list_supply_jobs(
        &self,
        actor: &Claims,
        status: Option<SupplyJobStatus>,
    ) -> AppResult<Vec<SupplyJob>> {
        Ok(self.supply_repo.find_by_provider(actor.company_id, status).await?)
    }

    /// Platform-wide listing for administrators
    pub async fn admin_list_rental_jobs(
        &self,
        status: Option<RentalJobStatus>,
        limit: i64,
        offset: i64,
    ) -> AppResult<Vec<RentalJob>> {
        Ok(self.rental_repo.list(status, limit, offset).await?)
    }

    /// Lock the rental job, then the supply job, always in that order
    async fn lock_pair(
        &self,
        conn: &mut PgConnection,
        supply_job_id: Uuid,
    ) -> AppResult<(RentalJob, SupplyJob)> {
        let rental_job_id = self
            .supply_repo
            .find_by_id(supply_job_id)
            .await?
            .ok_or_else(|| not_found("Supply job", supply_job_id))?
            .rental_job_id;

        let rental_job = self
            .rental_repo
            .lock(&mut *conn, rental_job_id)
            .await?
            .ok_or_else(|| not_found("Rental job", rental_job_id))?;
        let supply_job = self
            .supply_repo
            .lock(&mut *conn, supply_job_id)
            .await?
            .ok_or_else(|| not_found("Supply job", supply_job_id))?;

        Ok((rental_job, supply_job))
    }

    async fn refresh_rental_status(
        &self,
        conn: &mut PgConnection,
        rental_job: &RentalJob,
    ) -> AppResult<RentalJob> {
        let statuses: Vec<SupplyJobStatus> = self
            .supply_repo
            .find_by_rental_job(&mut *conn, rental_job.id)
            .await?
            .iter()
            .map(|s| s.status_enum())
            .collect();
        let fully_fulfilled = self
            .rental_repo
            .lines(&mut *conn, rental_job.id)
            .await?
            .iter()
            .all(|l| l.is_fulfilled());

        let current = rental_job.status_enum();
        let next = derive_rental_status(current, &statuses, fully_fulfilled);
        if next == current {
            return Ok(rental_job.clone());
        }

        debug!(
            "Rental job {}: {} -> {}",
            rental_job.id,
            current.as_str(),
            next.as_str()
        );
        Ok(self
            .rental_repo
            .update_status(&mut *conn, rental_job.id, next)
            .await?)
    }

    async fn companies(&self, ids: &[Uuid]) -> AppResult<HashMap<Uuid, Company>> {
        let companies = self.company_repo.find_by_ids(&self.pool, ids).await?;
        Ok(companies.into_iter().map(|c| (c.id, c)).collect())
    }

    async fn company(&self, id: Uuid) -> Option<Company> {
        match self.company_repo.find_by_id(id).await {
            Ok(company) => company,
            Err(e) => {
                warn!("Failed to load company {}: {}", id, e);
                None
            }
        }
    }
}

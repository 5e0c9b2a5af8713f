//! Offer, handshake and fulfillment rules.
//!
//! Everything here is pure: the service loads rows under a lock, asks these
//! functions what is allowed, then writes the result. Keeping the rules free
//! of I/O lets the whole state machine be tested without a database.

use super::error::NegotiationError;
use crate::models::{
    check_amount, AmountError, JobOffer, RentalJob, RentalJobProduct, RentalJobStatus, SupplyJob, SupplyJobStatus,
};
use rust_decimal::Decimal;
use uuid::Uuid;

/// Which side of a supply job a company is on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Party {
    Renter,
    Provider,
}

/// Resolve the acting company's side, rejecting outsiders
pub fn party_of(
    actor: Uuid,
    rental_job: &RentalJob,
    supply_job: &SupplyJob,
) -> Result<Party, NegotiationError> {
    if actor == rental_job.renter_company_id {
        Ok(Party::Renter)
    } else if actor == supply_job.provider_company_id {
        Ok(Party::Provider)
    } else {
        Err(NegotiationError::NotAParty(actor, supply_job.id))
    }
}

/// Company on the other side of `party`
pub fn counterparty(party: Party, rental_job: &RentalJob, supply_job: &SupplyJob) -> Uuid {
    match party {
        Party::Renter => supply_job.provider_company_id,
        Party::Provider => rental_job.renter_company_id,
    }
}

/// Versions start at 1 and grow by one per (rental job, supply job) pair
pub fn next_offer_version(latest: Option<i32>) -> i32 {
    latest.map_or(1, |v| v + 1)
}

fn ensure_rental_open(rental_job: &RentalJob) -> Result<(), NegotiationError> {
    let status = rental_job.status_enum();
    if status.is_terminal() || status == RentalJobStatus::Accepted {
        return Err(NegotiationError::RentalJobClosed(
            rental_job.id,
            status.as_str().to_string(),
        ));
    }
    Ok(())
}

fn ensure_supply_negotiable(supply_job: &SupplyJob) -> Result<(), NegotiationError> {
    let status = supply_job.status_enum();
    if !status.is_negotiable() {
        return Err(NegotiationError::SupplyJobClosed(
            supply_job.id,
            status.as_str().to_string(),
        ));
    }
    Ok(())
}

/// Prices must fit the `NUMERIC(12, 2)` offer column unchanged
pub fn validate_price(price: Decimal) -> Result<(), NegotiationError> {
    check_amount(price).map_err(|e| match e {
        AmountError::Negative => NegotiationError::NegativePrice,
        AmountError::TooPrecise => NegotiationError::PriceTooPrecise(price),
        AmountError::TooLarge => NegotiationError::PriceTooLarge(price),
    })
}

/// Offers alternate: the sender of a still-pending offer has to wait.
pub fn ensure_can_send_offer(
    actor: Uuid,
    rental_job: &RentalJob,
    supply_job: &SupplyJob,
    latest: Option<&JobOffer>,
    price: Decimal,
) -> Result<Party, NegotiationError> {
    let party = party_of(actor, rental_job, supply_job)?;
    ensure_rental_open(rental_job)?;
    ensure_supply_negotiable(supply_job)?;

    validate_price(price)?;

    if let Some(offer) = latest.filter(|o| o.is_pending()) {
        if offer.sender_company_id == actor {
            return Err(NegotiationError::AwaitingCounterparty(offer.version));
        }
    }

    Ok(party)
}

/// Only the receiver of the pending latest offer may shake hands on it.
pub fn ensure_can_handshake<'a>(
    actor: Uuid,
    rental_job: &RentalJob,
    supply_job: &SupplyJob,
    latest: Option<&'a JobOffer>,
) -> Result<&'a JobOffer, NegotiationError> {
    party_of(actor, rental_job, supply_job)?;
    ensure_rental_open(rental_job)?;
    ensure_supply_negotiable(supply_job)?;

    let offer = latest
        .filter(|o| o.is_pending())
        .ok_or(NegotiationError::NoPendingOffer(supply_job.id))?;

    if offer.sender_company_id == actor {
        return Err(NegotiationError::OwnOffer(offer.version));
    }

    Ok(offer)
}

/// Either party may walk away before any offer; once an offer is pending,
/// only its receiver may.
pub fn ensure_can_cancel(
    actor: Uuid,
    rental_job: &RentalJob,
    supply_job: &SupplyJob,
    latest: Option<&JobOffer>,
) -> Result<Party, NegotiationError> {
    let party = party_of(actor, rental_job, supply_job)?;
    ensure_supply_negotiable(supply_job)?;

    if let Some(offer) = latest.filter(|o| o.is_pending()) {
        if offer.sender_company_id == actor {
            return Err(NegotiationError::OwnOffer(offer.version));
        }
    }

    Ok(party)
}

/// An offered quantity may not exceed what the line still needs
pub fn validate_offered_quantity(
    line: &RentalJobProduct,
    offered: i32,
) -> Result<(), NegotiationError> {
    let remaining = line.remaining();
    if offered < 0 || offered > remaining {
        return Err(NegotiationError::InvalidQuantity {
            line: line.id,
            offered,
            remaining,
        });
    }
    Ok(())
}

/// Supply-job line paired with the requested line it answers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FulfillmentLine {
    pub supply_line_id: Uuid,
    pub rental_line_id: Uuid,
    pub offered: i32,
    pub requested: i32,
    pub fulfilled: i32,
}

/// Quantity a handshake locks in for one line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Allocation {
    pub supply_line_id: Uuid,
    pub rental_line_id: Uuid,
    pub take: i32,
}

/// Greedy apportioning: each line takes `min(offered, requested - fulfilled)`.
///
/// Lines may repeat a rental line id; earlier entries consume first, so the
/// running fulfilled total can never pass the requested quantity.
pub fn apportion_fulfillment(
    lines: &[FulfillmentLine],
) -> Result<Vec<Allocation>, NegotiationError> {
    let mut consumed: Vec<(Uuid, i32)> = Vec::new();
    let mut allocations = Vec::with_capacity(lines.len());

    for line in lines {
        let already = consumed
            .iter()
            .find(|(id, _)| *id == line.rental_line_id)
            .map_or(0, |(_, taken)| *taken);
        let remaining = (line.requested - line.fulfilled - already).max(0);
        let take = line.offered.max(0).min(remaining);

        match consumed.iter_mut().find(|(id, _)| *id == line.rental_line_id) {
            Some((_, taken)) => *taken += take,
            None => consumed.push((line.rental_line_id, take)),
        }

        allocations.push(Allocation {
            supply_line_id: line.supply_line_id,
            rental_line_id: line.rental_line_id,
            take,
        });
    }

    if allocations.iter().all(|a| a.take == 0) {
        return Err(NegotiationError::NothingToFulfil);
    }

    Ok(allocations)
}

/// Allowed supply job moves
pub fn ensure_supply_transition(
    from: SupplyJobStatus,
    to: SupplyJobStatus,
) -> Result<(), NegotiationError> {
    use SupplyJobStatus::*;

    let allowed = matches!(
        (from, to),
        (Pending, Negotiating)
            | (Negotiating, Negotiating)
            | (Pending, Accepted)
            | (Negotiating, Accepted)
            | (Pending, Cancelled)
            | (Negotiating, Cancelled)
            | (Accepted, InProgress)
            | (Accepted, Completed)
            | (InProgress, Completed)
    );

    if allowed {
        Ok(())
    } else {
        Err(NegotiationError::InvalidTransition {
            from: from.as_str().to_string(),
            to: to.as_str().to_string(),
        })
    }
}

/// Fold the supply job states of a rental job into its own status.
///
/// `fully_fulfilled` is true when every requested line is covered.
pub fn derive_rental_status(
    current: RentalJobStatus,
    supply_statuses: &[SupplyJobStatus],
    fully_fulfilled: bool,
) -> RentalJobStatus {
    if current.is_terminal() {
        return current;
    }

    let active: Vec<SupplyJobStatus> = supply_statuses
        .iter()
        .copied()
        .filter(|s| *s != SupplyJobStatus::Cancelled)
        .collect();

    if active.is_empty() {
        return RentalJobStatus::Cancelled;
    }

    if active.iter().all(|s| *s == SupplyJobStatus::Completed) {
        return RentalJobStatus::Completed;
    }

    if active.iter().any(|s| s.is_agreed()) {
        return if fully_fulfilled {
            RentalJobStatus::Accepted
        } else {
            RentalJobStatus::PartiallyAccepted
        };
    }

    if active.contains(&SupplyJobStatus::Negotiating) {
        return RentalJobStatus::InNegotiation;
    }

    // Only pending tracks are left; don't fall back once talks have started
    if current == RentalJobStatus::InNegotiation {
        RentalJobStatus::InNegotiation
    } else {
        RentalJobStatus::Open
    }
}

use axum::http::StatusCode;
use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

/// Violations of the offer/handshake rules
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NegotiationError {
    #[error("Company [{0}] is not a party to supply job [{1}].")]
    NotAParty(Uuid, Uuid),
    #[error("Only the renter of rental job [{0}] may do this.")]
    RenterOnly(Uuid),
    #[error("Only the provider of supply job [{0}] may do this.")]
    ProviderOnly(Uuid),
    #[error("Rental job [{0}] is {1} and no longer accepts changes.")]
    RentalJobClosed(Uuid, String),
    #[error("Supply job [{0}] is {1} and can't be negotiated.")]
    SupplyJobClosed(Uuid, String),
    #[error("Offer v{0} is still waiting for the other company's answer.")]
    AwaitingCounterparty(i32),
    #[error("Supply job [{0}] has no pending offer to accept.")]
    NoPendingOffer(Uuid),
    #[error("Offer v{0} was sent by your company. Only its receiver may accept or cancel it.")]
    OwnOffer(i32),
    #[error("Line [{line}]: offered quantity {offered} must be between 0 and the {remaining} still needed.")]
    InvalidQuantity {
        line: Uuid,
        offered: i32,
        remaining: i32,
    },
    #[error("Line [{0}] doesn't belong to this rental job.")]
    UnknownLine(Uuid),
    #[error("Nothing left to fulfil: every offered line is already covered.")]
    NothingToFulfil,
    #[error("Supply job can't move from {from} to {to}.")]
    InvalidTransition { from: String, to: String },
    #[error("Offer price must not be negative.")]
    NegativePrice,
    #[error("Offer price {0} has more than 2 decimal places.")]
    PriceTooPrecise(Decimal),
    #[error("Offer price {0} is larger than 9999999999.99.")]
    PriceTooLarge(Decimal),
}

impl NegotiationError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            NegotiationError::NotAParty(..)
            | NegotiationError::RenterOnly(_)
            | NegotiationError::ProviderOnly(_)
            | NegotiationError::OwnOffer(_) => StatusCode::FORBIDDEN,
            NegotiationError::InvalidQuantity { .. }
            | NegotiationError::UnknownLine(_)
            | NegotiationError::NegativePrice
            | NegotiationError::PriceTooPrecise(_)
            | NegotiationError::PriceTooLarge(_) => StatusCode::BAD_REQUEST,
            NegotiationError::RentalJobClosed(..)
            | NegotiationError::SupplyJobClosed(..)
            | NegotiationError::AwaitingCounterparty(_)
            | NegotiationError::NoPendingOffer(_)
            | NegotiationError::NothingToFulfil
            | NegotiationError::InvalidTransition { .. } => StatusCode::CONFLICT,
        }
    }
}

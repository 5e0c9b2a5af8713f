//! Rental negotiation state machine.

pub mod error;
pub mod rules;

pub use error::NegotiationError;
pub use rules::{
    apportion_fulfillment, derive_rental_status, ensure_can_cancel, ensure_can_handshake,
    ensure_can_send_offer, ensure_supply_transition, next_offer_version,
    validate_offered_quantity, validate_price, Allocation, FulfillmentLine, Party,
};

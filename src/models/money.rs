//! Amounts stored in `NUMERIC(12, 2)` columns.

use rust_decimal::Decimal;
use thiserror::Error;

/// Decimal places kept by the database
pub const AMOUNT_SCALE: u32 = 2;

/// Largest value a `NUMERIC(12, 2)` column holds
pub fn max_amount() -> Decimal {
    Decimal::new(999_999_999_999, AMOUNT_SCALE)
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmountError {
    #[error("must not be negative")]
    Negative,
    #[error("must have at most 2 decimal places")]
    TooPrecise,
    #[error("must not exceed 9999999999.99")]
    TooLarge,
}

/// Reject amounts the column would round or refuse
pub fn check_amount(amount: Decimal) -> Result<(), AmountError> {
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(AmountError::Negative);
    }
    if amount.normalize().scale() > AMOUNT_SCALE {
        return Err(AmountError::TooPrecise);
    }
    if amount > max_amount() {
        return Err(AmountError::TooLarge);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_amount() {
        assert_eq!(check_amount(Decimal::ZERO), Ok(()));
        assert_eq!(check_amount(Decimal::new(12_500, 3)), Ok(()));
        assert_eq!(check_amount(max_amount()), Ok(()));

        assert_eq!(check_amount(Decimal::new(-1, 2)), Err(AmountError::Negative));
        assert_eq!(check_amount(Decimal::new(12_345, 3)), Err(AmountError::TooPrecise));
        assert_eq!(
            check_amount(max_amount() + Decimal::new(1, 2)),
            Err(AmountError::TooLarge)
        );
    }
}

//! Money arithmetic for purchase totals. Prices are stored as decimal text;
//! line totals stay exact and only the integer totals are rounded.

use rust_decimal::{Decimal, RoundingStrategy};
use std::str::FromStr;

use crate::errors::ServiceError;

/// Parses a stored catalog price. A malformed or negative price is a data
/// fault, not a caller error.
pub fn parse_price(product_id: i32, raw: &str) -> Result<Decimal, ServiceError> {
    let price = Decimal::from_str(raw.trim()).map_err(|e| {
        ServiceError::InternalError(format!(
            "product {} has malformed price '{}': {}",
            product_id, raw, e
        ))
    })?;
    if price.is_sign_negative() {
        return Err(ServiceError::InternalError(format!(
            "product {} has negative price '{}'",
            product_id, raw
        )));
    }
    Ok(price)
}

/// Exact `price * qty`.
pub fn line_total(price: Decimal, qty: i32) -> Result<Decimal, ServiceError> {
    price
        .checked_mul(Decimal::from(qty))
        .ok_or_else(|| ServiceError::InternalError(format!("line total overflow: {} x {}", price, qty)))
}

/// Rounds half away from zero to a whole amount.
pub fn to_whole_amount(amount: Decimal) -> Result<i64, ServiceError> {
    let rounded = amount.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
    i64::try_from(rounded)
        .map_err(|_| ServiceError::InternalError(format!("amount {} does not fit", amount)))
}

pub fn checked_sum(acc: i64, amount: i64) -> Result<i64, ServiceError> {
    acc.checked_add(amount)
        .ok_or_else(|| ServiceError::InternalError("purchase total overflow".into()))
}

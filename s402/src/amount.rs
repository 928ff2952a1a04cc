//! Conversion between display-denominated prices and base-unit amounts.
//!
//! Prices are quoted in an asset's display unit (e.g., `0.1` SUI) and paid
//! in its smallest unit (e.g., `100000000` MIST). Conversion always rounds
//! up so a merchant is never underpaid.

use std::str::FromStr;

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

use crate::error::PriceError;

/// Parses a display-unit price such as `"0.25"` or `"$1.50"`.
///
/// # Errors
///
/// Returns [`PriceError::InvalidPrice`] if the text is not a non-negative
/// decimal number.
pub fn parse_display_amount(text: &str) -> Result<Decimal, PriceError> {
    let trimmed = text.trim();
    let trimmed = trimmed.strip_prefix('$').unwrap_or(trimmed).trim();
    let value = Decimal::from_str(trimmed)
        .or_else(|_| Decimal::from_scientific(trimmed))
        .map_err(|e| PriceError::InvalidPrice(format!("{text:?}: {e}")))?;
    ensure_non_negative(value)
}

/// Converts a floating-point display-unit price into a [`Decimal`].
///
/// # Errors
///
/// Returns [`PriceError::InvalidPrice`] for negative, NaN, or infinite input.
pub fn decimal_from_f64(value: f64) -> Result<Decimal, PriceError> {
    if !value.is_finite() {
        return Err(PriceError::InvalidPrice(format!("{value} is not finite")));
    }
    let decimal = Decimal::try_from(value)
        .map_err(|e| PriceError::InvalidPrice(format!("{value}: {e}")))?;
    ensure_non_negative(decimal)
}

/// Scales a display-unit value by `10^decimals`, rounding up.
///
/// # Errors
///
/// Returns [`PriceError::InvalidPrice`] if the value is negative or the
/// result does not fit the base-unit range.
pub fn to_base_units(value: Decimal, decimals: u32) -> Result<u128, PriceError> {
    let value = ensure_non_negative(value)?;
    let scale = 10u64
        .checked_pow(decimals)
        .map(Decimal::from)
        .ok_or_else(|| PriceError::InvalidPrice(format!("unsupported decimals {decimals}")))?;
    value
        .checked_mul(scale)
        .map(|scaled| scaled.ceil())
        .and_then(|scaled| scaled.to_u128())
        .ok_or_else(|| PriceError::InvalidPrice(format!("{value} overflows base units")))
}

fn ensure_non_negative(value: Decimal) -> Result<Decimal, PriceError> {
    if value.is_sign_negative() && !value.is_zero() {
        Err(PriceError::InvalidPrice(format!("{value} is negative")))
    } else {
        Ok(value)
    }
}

//! Shared numeric helpers for estimate calculations.
//!
//! The cascade itself never rounds between stages; `round_display` exists
//! for the presentation boundary only.

use rust_decimal::Decimal;

/// Rounds a monetary value to two decimal places, half-up away from zero.
///
/// Call this when rendering a total, never inside the cascade.
///
/// # Examples
///
/// ```
/// use rust_decimal_macros::dec;
/// use estimate_core::calculations::common::round_display;
///
/// assert_eq!(round_display(dec!(35.39025)), dec!(35.39));
/// assert_eq!(round_display(dec!(2.205)), dec!(2.21));
/// assert_eq!(round_display(dec!(-2.205)), dec!(-2.21)); // away from zero
/// ```
pub fn round_display(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, rust_decimal::RoundingStrategy::MidpointAwayFromZero)
}

/// Rounds a purchase quantity up to the next whole unit.
///
/// Partial packages and coverage lots must be bought in full; this is a
/// business rule, not a precision concern.
///
/// # Examples
///
/// ```
/// use rust_decimal_macros::dec;
/// use estimate_core::calculations::common::ceil_units;
///
/// assert_eq!(ceil_units(dec!(7.01)), dec!(8));
/// assert_eq!(ceil_units(dec!(8)), dec!(8));
/// ```
pub fn ceil_units(value: Decimal) -> Decimal {
    value.ceil()
}

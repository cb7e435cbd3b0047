//! Money helpers
//!
//! Amounts are fixed-point decimals in the group's currency. The epsilon
//! threshold marks amounts that are economically meaningless.

use rust_decimal::Decimal;

/// Default "effectively settled" threshold: 0.01 of the currency unit
pub const DEFAULT_EPSILON: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// Whether `amount` is within `epsilon` of zero (strictly below it)
pub fn is_negligible(amount: Decimal, epsilon: Decimal) -> bool {
    amount.abs() < epsilon
}

/// Sum of the positive amounts in `amounts`
pub fn sum_positive(amounts: impl IntoIterator<Item = Decimal>) -> Decimal {
    amounts
        .into_iter()
        .filter(|a| *a > Decimal::ZERO)
        .sum()
}

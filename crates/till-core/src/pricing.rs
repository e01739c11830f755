//! # Pricing Module
//!
//! Derives a product's sale price from its unit cost and markup rule.
//!
//! ## When Prices Are Derived
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  Purchase committed (create / update)                                   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  product.purchase_price = purchase.unit_cost                            │
//! │  product.sale_price     = derive_sale_price(unit_cost, rule)            │
//! │                                                                         │
//! │  Editing increment_type / increment_value directly does NOT re-derive; │
//! │  the new rule takes effect at the next purchase.                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::types::IncrementType;

/// A markup rule: kind plus value.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct IncrementRule {
    #[serde(rename = "type")]
    pub kind: IncrementType,
    #[ts(type = "string")]
    pub value: Decimal,
}

impl IncrementRule {
    #[inline]
    pub const fn new(kind: IncrementType, value: Decimal) -> Self {
        IncrementRule { kind, value }
    }

    pub fn percentage(value: Decimal) -> Self {
        IncrementRule::new(IncrementType::Percentage, value)
    }

    pub fn fixed(value: Decimal) -> Self {
        IncrementRule::new(IncrementType::Fixed, value)
    }
}

/// Computes the sale price for `unit_cost` under `rule`.
///
/// ## Rules
/// - percentage: `unit_cost × (1 + value / 100)`
/// - fixed: `unit_cost + value` (value in major currency units)
/// - unknown: `unit_cost`
///
/// The result is rounded to cents, half away from zero.
///
/// ## Example
/// ```rust
/// use till_core::money::Money;
/// use till_core::pricing::{derive_sale_price, IncrementRule};
/// use rust_decimal::Decimal;
///
/// let cost = Money::from_cents(1000);
/// let price = derive_sale_price(cost, &IncrementRule::percentage(Decimal::from(20)));
/// assert_eq!(price.cents(), 1200);
/// ```
pub fn derive_sale_price(unit_cost: Money, rule: &IncrementRule) -> Money {
    match rule.kind {
        IncrementType::Percentage => unit_cost.apply_markup_percent(rule.value),
        IncrementType::Fixed => unit_cost + Money::from_decimal(rule.value),
        IncrementType::Unknown => unit_cost,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_percentage_markup() {
        let price = derive_sale_price(Money::from_cents(1000), &IncrementRule::percentage(dec!(20)));
        assert_eq!(price.cents(), 1200);
    }

    #[test]
    fn test_fractional_percentage_rounds() {
        // 3.33 × 1.125 = 3.74625
        let price = derive_sale_price(Money::from_cents(333), &IncrementRule::percentage(dec!(12.5)));
        assert_eq!(price.cents(), 375);
    }

    #[test]
    fn test_fixed_markup() {
        let price = derive_sale_price(Money::from_cents(1000), &IncrementRule::fixed(dec!(2.5)));
        assert_eq!(price.cents(), 1250);
    }

    #[test]
    fn test_unknown_kind_keeps_cost() {
        let rule = IncrementRule::new(IncrementType::Unknown, dec!(99));
        assert_eq!(derive_sale_price(Money::from_cents(740), &rule).cents(), 740);
    }

    #[test]
    fn test_zero_markup() {
        let price = derive_sale_price(Money::from_cents(500), &IncrementRule::percentage(dec!(0)));
        assert_eq!(price.cents(), 500);
    }

    #[test]
    fn test_largest_accepted_inputs_stay_in_range() {
        let cost = crate::validation::MAX_AMOUNT;
        let top = Decimal::from(crate::validation::MAX_INCREMENT_UNITS);

        let percent = derive_sale_price(cost, &IncrementRule::percentage(top));
        assert_eq!(percent.cents(), cost.cents() * 10_001);

        let fixed = derive_sale_price(cost, &IncrementRule::fixed(top));
        assert_eq!(fixed.cents(), cost.cents() + 100_000_000);
    }

    #[test]
    fn test_unvalidated_huge_rule_saturates() {
        let price = derive_sale_price(Money::from_cents(1000), &IncrementRule::fixed(Decimal::MAX));
        assert_eq!(price.cents(), i64::MAX);
    }

    #[test]
    fn test_rule_serde_shape() {
        let rule: IncrementRule = serde_json::from_str(r#"{"type":"peso","value":"15"}"#).unwrap();
        assert_eq!(rule, IncrementRule::fixed(dec!(15)));
    }
}

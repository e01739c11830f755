//! # Money Module
//!
//! Provides the `Money` type for monetary values and the `Quantity` type
//! for stock and sold amounts.
//!
//! ## Why Two Numeric Types?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In floating point:                                                     │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │    1.25 kg × $3.99/kg accumulates noise in every total                 │
//! │                                                                         │
//! │  OUR SOLUTION:                                                          │
//! │    Money     → integer cents (i64)                                      │
//! │    Quantity  → exact decimal (rust_decimal), units or kilograms         │
//! │                                                                         │
//! │    Money × Quantity is computed exactly, then rounded ONCE to cents    │
//! │    (half away from zero).                                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Overflow
//! Validation caps every amount and quantity that enters the system (see
//! [`crate::validation::MAX_AMOUNT`]), so ordinary arithmetic stays far from
//! the i64 range. The operators saturate instead of panicking; folds over
//! caller-supplied lists use [`Money::checked_add`] and [`Money::checked_sum`]
//! and turn `None` into `InvalidAmount`.
//!
//! ## Usage
//! ```rust
//! use till_core::money::{Money, Quantity};
//! use rust_decimal::Decimal;
//!
//! let price_per_kg = Money::from_cents(399); // $3.99
//! let weight = Quantity::new(Decimal::new(125, 2)); // 1.25 kg
//!
//! // 3.99 × 1.25 = 4.9875 → $4.99
//! assert_eq!(price_per_kg.multiply_quantity(weight).cents(), 499);
//! ```

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;

// =============================================================================
// Money Type
// =============================================================================

/// Represents a monetary value in the smallest currency unit (cents).
///
/// ## Design Decisions
/// - **i64 (signed)**: Differences and adjustments can be negative
/// - **Single field tuple struct**: Zero-cost abstraction over i64
/// - **Derives**: Full serde support for JSON serialization
///
/// ## Where Money Flows
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │                                                                         │
/// │  Purchase.unit_cost ──► derive_sale_price ──► Product.sale_price        │
/// │                                                                         │
/// │  Product.sale_price ──► LineItem total ──► Sale.amount ──► Session      │
/// │                                                                         │
/// │  Session.opening + cash sales + incomes − expenses = expected_total     │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents (the smallest currency unit).
    ///
    /// ## Example
    /// ```rust
    /// use till_core::money::Money;
    ///
    /// let price = Money::from_cents(1099); // Represents $10.99
    /// assert_eq!(price.cents(), 1099);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Creates a Money value from major and minor units.
    ///
    /// ## Note
    /// For negative amounts, only the major unit should be negative.
    /// `from_major_minor(-5, 50)` = -$5.50, not -$4.50
    #[inline]
    pub const fn from_major_minor(major: i64, minor: i64) -> Self {
        if major < 0 {
            Money(major * 100 - minor)
        } else {
            Money(major * 100 + minor)
        }
    }

    /// Converts an exact decimal amount to Money, rounding to the nearest
    /// cent with ties away from zero.
    ///
    /// Values outside the i64 cent range saturate.
    ///
    /// ## Example
    /// ```rust
    /// use till_core::money::Money;
    /// use rust_decimal::Decimal;
    ///
    /// assert_eq!(Money::from_decimal(Decimal::new(12345, 3)).cents(), 1235); // 12.345
    /// assert_eq!(Money::from_decimal(Decimal::new(-12345, 3)).cents(), -1235);
    /// ```
    pub fn from_decimal(value: Decimal) -> Self {
        let Some(cents) = value.checked_mul(Decimal::ONE_HUNDRED) else {
            return Money::saturated(value.is_sign_negative());
        };
        let cents = cents.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
        match cents.to_i64() {
            Some(c) => Money(c),
            None => Money::saturated(cents.is_sign_negative()),
        }
    }

    #[inline]
    const fn saturated(negative: bool) -> Self {
        if negative {
            Money(i64::MIN)
        } else {
            Money(i64::MAX)
        }
    }

    /// Returns the exact decimal value (two decimal places).
    #[inline]
    pub fn to_decimal(&self) -> Decimal {
        Decimal::new(self.0, 2)
    }

    /// Returns the value in cents (smallest currency unit).
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the major unit portion.
    #[inline]
    pub const fn dollars(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the minor unit portion (always 0-99).
    #[inline]
    pub const fn cents_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is positive (greater than zero).
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Returns the absolute value.
    #[inline]
    pub const fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    /// Multiplies money by an exact quantity, rounding the product once.
    ///
    /// ## Example
    /// ```rust
    /// use till_core::money::{Money, Quantity};
    ///
    /// let unit_price = Money::from_cents(299); // $2.99
    /// let line_total = unit_price.multiply_quantity(Quantity::from_units(3));
    /// assert_eq!(line_total.cents(), 897); // $8.97
    /// ```
    ///
    /// ## User Workflow
    /// ```text
    /// Product: Cheese $12.00/kg
    /// Weight: 0.350 kg
    ///      │
    ///      ▼
    /// multiply_quantity(0.350) ← THIS FUNCTION
    ///      │
    ///      ▼
    /// Line Total: $4.20
    /// ```
    pub fn multiply_quantity(&self, qty: Quantity) -> Money {
        self.checked_multiply_quantity(qty)
            .unwrap_or_else(|| Money::saturated(self.is_negative() != qty.is_negative()))
    }

    /// Like [`Money::multiply_quantity`] but `None` when the product leaves
    /// the i64 cent range.
    pub fn checked_multiply_quantity(&self, qty: Quantity) -> Option<Money> {
        let product = self.to_decimal().checked_mul(qty.value())?;
        let money = Money::from_decimal(product);
        (money.0 != i64::MIN && money.0 != i64::MAX).then_some(money)
    }

    /// Scales the amount by `(1 + percent / 100)`.
    ///
    /// ## Example
    /// ```rust
    /// use till_core::money::Money;
    /// use rust_decimal::Decimal;
    ///
    /// let cost = Money::from_cents(10_000);
    /// assert_eq!(cost.apply_markup_percent(Decimal::from(30)).cents(), 13_000);
    /// ```
    pub fn apply_markup_percent(&self, percent: Decimal) -> Money {
        let factor = (percent / Decimal::ONE_HUNDRED).saturating_add(Decimal::ONE);
        Money::from_decimal(self.to_decimal().saturating_mul(factor))
    }

    /// `None` on i64 overflow.
    #[inline]
    pub const fn checked_add(self, other: Money) -> Option<Money> {
        match self.0.checked_add(other.0) {
            Some(c) => Some(Money(c)),
            None => None,
        }
    }

    /// `None` on i64 overflow.
    #[inline]
    pub const fn checked_sub(self, other: Money) -> Option<Money> {
        match self.0.checked_sub(other.0) {
            Some(c) => Some(Money(c)),
            None => None,
        }
    }

    /// Sums the amounts, or `None` if any partial sum overflows.
    ///
    /// ## Example
    /// ```rust
    /// use till_core::money::Money;
    ///
    /// let amounts = [Money::from_cents(100), Money::from_cents(250)];
    /// assert_eq!(Money::checked_sum(amounts), Some(Money::from_cents(350)));
    /// assert_eq!(Money::checked_sum([Money::from_cents(i64::MAX), Money::from_cents(1)]), None);
    /// ```
    pub fn checked_sum<I: IntoIterator<Item = Money>>(amounts: I) -> Option<Money> {
        amounts
            .into_iter()
            .try_fold(Money::zero(), |acc, amount| acc.checked_add(amount))
    }

    /// Divides evenly by a count, rounding half away from zero.
    ///
    /// Returns zero when `count` is zero.
    pub fn divide_by_count(&self, count: u64) -> Money {
        if count == 0 {
            return Money::zero();
        }
        Money::from_decimal(self.to_decimal() / Decimal::from(count))
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Display implementation shows money in a human-readable format.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(
            f,
            "{}${}.{:02}",
            sign,
            self.dollars().abs(),
            self.cents_part()
        )
    }
}

/// Parses a decimal string such as `"12.50"` or `"-3"`.
impl FromStr for Money {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = Decimal::from_str(s.trim()).map_err(|e| ValidationError::InvalidFormat {
            field: "amount".to_string(),
            reason: e.to_string(),
        })?;
        Ok(Money::from_decimal(value))
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

/// Saturating, like every operator below.
impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0.saturating_add(other.0))
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        *self = *self + other;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0.saturating_sub(other.0))
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        *self = *self - other;
    }
}

impl Neg for Money {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Money(self.0.saturating_neg())
    }
}

/// Multiplication by an integer count.
impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0.saturating_mul(qty))
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), Add::add)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

// =============================================================================
// Quantity Type
// =============================================================================

/// An exact, non-floating quantity: whole units or kilograms.
///
/// Serialized as a decimal string (`"1.250"`) so no precision is lost
/// between the service and the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize, TS)]
#[serde(transparent)]
#[ts(export)]
pub struct Quantity(#[ts(type = "string")] Decimal);

impl Quantity {
    #[inline]
    pub const fn new(value: Decimal) -> Self {
        Quantity(value)
    }

    /// A whole number of units.
    #[inline]
    pub fn from_units(units: i64) -> Self {
        Quantity(Decimal::from(units))
    }

    #[inline]
    pub const fn zero() -> Self {
        Quantity(Decimal::ZERO)
    }

    #[inline]
    pub const fn value(&self) -> Decimal {
        self.0
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    #[inline]
    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    #[inline]
    pub fn is_negative(&self) -> bool {
        self.0 < Decimal::ZERO
    }

    /// `None` when the sum leaves the decimal range.
    #[inline]
    pub fn checked_add(self, other: Quantity) -> Option<Quantity> {
        self.0.checked_add(other.0).map(Quantity)
    }

    #[inline]
    pub fn checked_sub(self, other: Quantity) -> Option<Quantity> {
        self.0.checked_sub(other.0).map(Quantity)
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.normalize())
    }
}

impl FromStr for Quantity {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Decimal::from_str(s.trim())
            .map(Quantity)
            .map_err(|e| ValidationError::InvalidFormat {
                field: "quantity".to_string(),
                reason: e.to_string(),
            })
    }
}

impl From<Decimal> for Quantity {
    fn from(value: Decimal) -> Self {
        Quantity(value)
    }
}

impl Add for Quantity {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Quantity(self.0.saturating_add(other.0))
    }
}

impl AddAssign for Quantity {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        *self = *self + other;
    }
}

impl Sub for Quantity {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Quantity(self.0.saturating_sub(other.0))
    }
}

impl SubAssign for Quantity {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        *self = *self - other;
    }
}

impl Neg for Quantity {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Quantity(-self.0)
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
    fn test_from_cents() {
        let money = Money::from_cents(1099);
        assert_eq!(money.cents(), 1099);
        assert_eq!(money.dollars(), 10);
        assert_eq!(money.cents_part(), 99);
    }

    #[test]
    fn test_from_major_minor() {
        assert_eq!(Money::from_major_minor(10, 99).cents(), 1099);
        assert_eq!(Money::from_major_minor(-5, 50).cents(), -550);
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", Money::from_cents(1099)), "$10.99");
        assert_eq!(format!("{}", Money::from_cents(500)), "$5.00");
        assert_eq!(format!("{}", Money::from_cents(-550)), "-$5.50");
        assert_eq!(format!("{}", Money::from_cents(0)), "$0.00");
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_cents(1000);
        let b = Money::from_cents(500);

        assert_eq!((a + b).cents(), 1500);
        assert_eq!((a - b).cents(), 500);
        assert_eq!((-b).cents(), -500);
        let result: Money = a * 3;
        assert_eq!(result.cents(), 3000);
    }

    #[test]
    fn test_sum() {
        let amounts = [Money::from_cents(100), Money::from_cents(250), Money::from_cents(-50)];
        let total: Money = amounts.iter().sum();
        assert_eq!(total.cents(), 300);
    }

    #[test]
    fn test_from_decimal_rounds_half_away_from_zero() {
        assert_eq!(Money::from_decimal(dec!(0.005)).cents(), 1);
        assert_eq!(Money::from_decimal(dec!(0.004)).cents(), 0);
        assert_eq!(Money::from_decimal(dec!(-0.005)).cents(), -1);
        assert_eq!(Money::from_decimal(dec!(2.675)).cents(), 268);
    }

    #[test]
    fn test_multiply_by_weight() {
        // 3.99 × 1.25 = 4.9875
        let total = Money::from_cents(399).multiply_quantity(Quantity::new(dec!(1.25)));
        assert_eq!(total.cents(), 499);

        // 12.00 × 0.350 = 4.20
        let total = Money::from_cents(1200).multiply_quantity(Quantity::new(dec!(0.350)));
        assert_eq!(total.cents(), 420);
    }

    #[test]
    fn test_multiply_by_units() {
        let total = Money::from_cents(299).multiply_quantity(Quantity::from_units(3));
        assert_eq!(total.cents(), 897);
    }

    #[test]
    fn test_markup_percent() {
        assert_eq!(Money::from_cents(10_000).apply_markup_percent(dec!(30)).cents(), 13_000);
        // 0.99 × 1.15 = 1.1385
        assert_eq!(Money::from_cents(99).apply_markup_percent(dec!(15)).cents(), 114);
        assert_eq!(Money::from_cents(500).apply_markup_percent(dec!(0)).cents(), 500);
    }

    #[test]
    fn test_divide_by_count() {
        assert_eq!(Money::from_cents(1000).divide_by_count(3).cents(), 333);
        assert_eq!(Money::from_cents(1001).divide_by_count(2).cents(), 501);
        assert_eq!(Money::from_cents(1000).divide_by_count(0).cents(), 0);
    }

    #[test]
    fn test_parse_money() {
        assert_eq!("12.50".parse::<Money>().unwrap().cents(), 1250);
        assert_eq!(" 7 ".parse::<Money>().unwrap().cents(), 700);
        assert!("abc".parse::<Money>().is_err());
    }

    #[test]
    fn test_zero_and_checks() {
        let zero = Money::zero();
        assert!(zero.is_zero());
        assert!(!zero.is_positive());
        assert!(!zero.is_negative());

        let negative = Money::from_cents(-100);
        assert!(negative.is_negative());
        assert_eq!(negative.abs().cents(), 100);
    }

    #[test]
    fn test_quantity_arithmetic() {
        let mut stock = Quantity::from_units(10);
        stock -= Quantity::new(dec!(2.5));
        assert_eq!(stock, Quantity::new(dec!(7.5)));
        stock += Quantity::from_units(1);
        assert_eq!(stock.value(), dec!(8.5));
        assert!((Quantity::zero() - stock).is_negative());
    }

    #[test]
    fn test_checked_arithmetic_reports_overflow() {
        let max = Money::from_cents(i64::MAX);
        assert_eq!(max.checked_add(Money::from_cents(1)), None);
        assert_eq!(Money::from_cents(i64::MIN).checked_sub(Money::from_cents(1)), None);
        assert_eq!(
            Money::from_cents(100).checked_add(Money::from_cents(50)),
            Some(Money::from_cents(150))
        );
        assert_eq!(Money::checked_sum([max, Money::from_cents(1)]), None);
        assert_eq!(Money::checked_sum(Vec::new()), Some(Money::zero()));
    }

    #[test]
    fn test_operators_saturate_instead_of_panicking() {
        let max = Money::from_cents(i64::MAX);
        assert_eq!(max + Money::from_cents(1), max);
        assert_eq!(Money::from_cents(i64::MIN) - Money::from_cents(1), Money::from_cents(i64::MIN));
        assert_eq!(max * 2, max);

        let huge = Quantity::new(Decimal::MAX);
        assert_eq!(huge + Quantity::from_units(1), huge);
        assert_eq!(huge.checked_add(Quantity::from_units(1)), None);
    }

    #[test]
    fn test_huge_products_do_not_panic() {
        let qty = Quantity::new(dec!(70000000000000000000000000000));
        assert_eq!(Money::from_cents(1_000).checked_multiply_quantity(qty), None);
        assert_eq!(Money::from_cents(1_000).multiply_quantity(qty), Money::from_cents(i64::MAX));
        assert_eq!(Money::from_decimal(Decimal::MAX).cents(), i64::MAX);
        assert_eq!(Money::from_cents(1_000).apply_markup_percent(Decimal::MAX).cents(), i64::MAX);
    }

    #[test]
    fn test_quantity_display_and_parse() {
        assert_eq!(Quantity::new(dec!(1.250)).to_string(), "1.25");
        assert_eq!("0.350".parse::<Quantity>().unwrap().value(), dec!(0.350));
        assert!("kg".parse::<Quantity>().is_err());
    }

    #[test]
    fn test_quantity_serializes_as_string() {
        let json = serde_json::to_string(&Quantity::new(dec!(1.5))).unwrap();
        assert_eq!(json, "\"1.5\"");
    }
}

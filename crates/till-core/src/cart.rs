//! # Cart Module
//!
//! Line items selected at the counter and the settlement of what the
//! customer handed over.
//!
//! ## Checkout Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  Scan / pick product ──► LineItem::from_product(product, qty)          │
//! │                            price captured NOW, never re-read            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Cart.total() = Σ line totals                                           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Cart::checkout(cash_given, transfer_given)                             │
//! │       ├── settle_tender() → booked cash / transfer, change              │
//! │       └── Sale { description: "A, B, C", amount, cash, transfer }      │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::{Money, Quantity};
use crate::types::{Product, Sale, UnitType};
use crate::validation;
use crate::SALE_DESCRIPTION_SEPARATOR;

// =============================================================================
// Line Item
// =============================================================================

/// How a line is measured and priced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(tag = "unitType", rename_all = "lowercase")]
#[ts(export)]
pub enum LineMeasure {
    /// Whole units at a per-unit price.
    #[serde(rename_all = "camelCase")]
    Unit { quantity: Quantity, unit_price: Money },
    /// A weight at a per-kilogram price.
    #[serde(rename_all = "camelCase")]
    Kg { weight_kg: Quantity, price_per_kg: Money },
}

impl LineMeasure {
    /// The measured amount (units or kg).
    pub fn amount(&self) -> Quantity {
        match self {
            LineMeasure::Unit { quantity, .. } => *quantity,
            LineMeasure::Kg { weight_kg, .. } => *weight_kg,
        }
    }

    /// The captured price per unit or per kg.
    pub fn price(&self) -> Money {
        match self {
            LineMeasure::Unit { unit_price, .. } => *unit_price,
            LineMeasure::Kg { price_per_kg, .. } => *price_per_kg,
        }
    }

    pub fn unit_type(&self) -> UnitType {
        match self {
            LineMeasure::Unit { .. } => UnitType::Unit,
            LineMeasure::Kg { .. } => UnitType::Kg,
        }
    }
}

/// One line of a sale.
///
/// ## Design Notes
/// - `product_id`: Reference to the catalog product, `None` for ad-hoc lines
/// - `name` and the price inside `measure` are frozen when the line is
///   created. If the product price changes in the catalog afterward, this
///   line keeps the original price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct LineItem {
    pub product_id: Option<String>,
    pub name: String,
    pub measure: LineMeasure,
    #[ts(as = "String")]
    pub added_at: DateTime<Utc>,
}

impl LineItem {
    /// Creates a line from a catalog product.
    ///
    /// `amount` is units for unit products and kilograms for kg products.
    pub fn from_product(product: &Product, amount: Quantity) -> Self {
        let measure = match product.unit_type {
            UnitType::Unit => LineMeasure::Unit {
                quantity: amount,
                unit_price: product.sale_price,
            },
            UnitType::Kg => LineMeasure::Kg {
                weight_kg: amount,
                price_per_kg: product.sale_price,
            },
        };

        LineItem {
            product_id: Some(product.id.clone()),
            name: product.name.clone(),
            measure,
            added_at: Utc::now(),
        }
    }

    /// A line not backed by the catalog.
    pub fn ad_hoc(name: impl Into<String>, measure: LineMeasure) -> Self {
        LineItem {
            product_id: None,
            name: name.into(),
            measure,
            added_at: Utc::now(),
        }
    }

    /// `quantity × unit_price` or `weight_kg × price_per_kg`, rounded once.
    pub fn line_total(&self) -> Money {
        self.measure.price().multiply_quantity(self.measure.amount())
    }

    fn validate(&self) -> CoreResult<()> {
        validation::validate_positive_quantity("quantity", self.measure.amount())?;
        validation::validate_non_negative_amount("price", self.measure.price())?;
        Ok(())
    }
}

// =============================================================================
// Cart
// =============================================================================

/// The lines of a sale being assembled.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Cart {
    pub items: Vec<LineItem>,
}

impl Cart {
    pub fn new() -> Self {
        Cart::default()
    }

    pub fn from_items(items: Vec<LineItem>) -> Self {
        Cart { items }
    }

    /// Appends a line after checking its quantity and the cart size.
    pub fn add(&mut self, item: LineItem) -> CoreResult<()> {
        item.validate()?;
        validation::validate_cart_size(self.items.len() + 1)?;
        self.items.push(item);
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Σ line totals.
    ///
    /// ## Returns
    /// * `Err(InvalidAmount)` - The sum leaves the i64 cent range
    pub fn total(&self) -> CoreResult<Money> {
        Money::checked_sum(self.items.iter().map(LineItem::line_total))
            .ok_or_else(|| CoreError::invalid_amount("total", "cart total is out of range"))
    }

    /// Item names joined with ", ".
    pub fn description(&self) -> String {
        self.items
            .iter()
            .map(|item| item.name.as_str())
            .collect::<Vec<_>>()
            .join(SALE_DESCRIPTION_SEPARATOR)
    }

    /// Checks the cart can become a sale.
    pub fn validate(&self) -> CoreResult<()> {
        if self.items.is_empty() {
            return Err(CoreError::missing("items"));
        }
        validation::validate_cart_size(self.items.len())?;
        for item in &self.items {
            item.validate()?;
        }
        Ok(())
    }

    /// Builds the sale for this cart and the settled tender.
    ///
    /// ## Arguments
    /// * `cash_given` - Cash handed over by the customer
    /// * `transfer_given` - Amount paid by bank transfer
    ///
    /// ## Returns
    /// * `Ok((Sale, Tender))` - Non-canceled sale with the booked split
    /// * `Err(MissingRequiredField)` - Cart is empty
    /// * `Err(InvalidAmount)` - Negative payment or non-positive line quantity
    pub fn checkout(&self, cash_given: Money, transfer_given: Money) -> CoreResult<(Sale, Tender)> {
        self.validate()?;
        let amount = self.total()?;
        let tender = settle_tender(amount, cash_given, transfer_given)?;
        let sale = Sale::new(self.description(), amount, tender.cash, tender.transfer);
        Ok((sale, tender))
    }
}

// =============================================================================
// Tender
// =============================================================================

/// The booked payment split for a sale plus the change owed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Tender {
    /// Cash booked against the sale.
    pub cash: Money,
    /// Transfer booked against the sale.
    pub transfer: Money,
    /// `cash_given + transfer_given − amount`. Negative when underpaid.
    pub change: Money,
}

/// Settles what the customer handed over against the sale amount.
///
/// ## Rules
/// ```text
/// paid > amount:
///     cash ≥ amount  → cash = amount, transfer = 0
///     otherwise      → transfer = amount − cash
/// cash = 0 and transfer = 0 → cash = amount
/// change = cash_given + transfer_given − amount   (from the inputs)
/// ```
///
/// ## Example
/// ```rust
/// use till_core::cart::settle_tender;
/// use till_core::money::Money;
///
/// let tender = settle_tender(
///     Money::from_cents(4_500),
///     Money::from_cents(5_000),
///     Money::zero(),
/// ).unwrap();
/// assert_eq!(tender.cash.cents(), 4_500);
/// assert_eq!(tender.change.cents(), 500);
/// ```
pub fn settle_tender(amount: Money, cash_given: Money, transfer_given: Money) -> CoreResult<Tender> {
    validation::validate_non_negative_amount("cash", cash_given)?;
    validation::validate_non_negative_amount("transfer", transfer_given)?;

    let paid = cash_given
        .checked_add(transfer_given)
        .ok_or_else(|| CoreError::invalid_amount("payment", "cash + transfer is out of range"))?;
    let change = paid
        .checked_sub(amount)
        .ok_or_else(|| CoreError::invalid_amount("change", "out of range"))?;
    let mut cash = cash_given;
    let mut transfer = transfer_given;

    if paid > amount {
        if cash >= amount {
            cash = amount;
            transfer = Money::zero();
        } else {
            transfer = amount - cash;
        }
    }

    if cash.is_zero() && transfer.is_zero() {
        cash = amount;
    }

    Ok(Tender {
        cash,
        transfer,
        change,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

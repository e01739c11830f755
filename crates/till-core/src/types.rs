//! # Domain Types
//!
//! Core domain types used throughout Till POS.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │    Purchase     │   │      Sale       │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │◄──┤  product_id     │   │  id (UUID)      │       │
//! │  │  barcode        │   │  supplier_id ───┼─┐ │  description    │       │
//! │  │  purchase_price │   │  quantity       │ │ │  amount         │       │
//! │  │  increment rule │   │  unit_cost      │ │ │  cash/transfer  │       │
//! │  │  sale_price     │   │  total          │ │ │  canceled       │       │
//! │  │  stock (signed) │   └─────────────────┘ │ └─────────────────┘       │
//! │  └─────────────────┘                       │                           │
//! │                        ┌─────────────────┐ │ ┌─────────────────┐       │
//! │                        │    Supplier     │◄┘ │   CashEntry     │       │
//! │                        │  name, contact  │   │  income/expense │       │
//! │                        └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Input Types
//! Every record that the presentation layer creates has a matching input
//! type (`ProductInput`, `SupplierInput`, `PurchaseInput`). Inputs carry
//! `Option`s where the form may leave a field blank; `validate()` turns them
//! into fully-typed values or a [`CoreError`].

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::{Money, Quantity};
use crate::pricing::{derive_sale_price, IncrementRule};
use crate::reports::DateRange;
use crate::validation;

// =============================================================================
// Unit Type
// =============================================================================

/// How a product is measured at the counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum UnitType {
    /// Sold by whole units.
    #[default]
    Unit,
    /// Sold by weight, in kilograms.
    Kg,
}

impl UnitType {
    pub const fn as_str(&self) -> &'static str {
        match self {
            UnitType::Unit => "unit",
            UnitType::Kg => "kg",
        }
    }
}

impl fmt::Display for UnitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Increment Type
// =============================================================================

/// The kind of markup applied on top of the purchase price.
///
/// Stored as text. Anything other than `percentage` or `fixed` reads back as
/// [`IncrementType::Unknown`], which derives a sale price equal to cost.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum IncrementType {
    /// `value` is percent points over cost.
    #[default]
    Percentage,
    /// `value` is a flat amount in major currency units over cost.
    #[serde(alias = "peso")]
    Fixed,
    #[serde(other)]
    Unknown,
}

impl IncrementType {
    pub const fn as_str(&self) -> &'static str {
        match self {
            IncrementType::Percentage => "percentage",
            IncrementType::Fixed => "fixed",
            IncrementType::Unknown => "unknown",
        }
    }

    /// Lenient parse used when reading stored rows.
    pub fn from_stored(raw: &str) -> Self {
        raw.parse().unwrap_or(IncrementType::Unknown)
    }
}

impl FromStr for IncrementType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "percentage" => Ok(IncrementType::Percentage),
            "fixed" | "peso" => Ok(IncrementType::Fixed),
            "unknown" => Ok(IncrementType::Unknown),
            other => Err(CoreError::Validation(ValidationError::InvalidFormat {
                field: "increment_type".to_string(),
                reason: format!("unrecognized increment type '{}'", other),
            })),
        }
    }
}

impl fmt::Display for IncrementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Product
// =============================================================================

/// A product in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Barcode scanned at the counter.
    pub barcode: Option<String>,

    /// Display name shown to cashier and joined into sale descriptions.
    pub name: String,

    pub description: Option<String>,

    /// Unit cost from the last purchase (or manual entry).
    pub purchase_price: Money,

    pub increment_type: IncrementType,

    /// Percent points or flat major units, depending on `increment_type`.
    #[ts(type = "string")]
    pub increment_value: Decimal,

    /// Price charged at the counter (per unit or per kg).
    pub sale_price: Money,

    /// Current stock. May be negative.
    pub stock: Quantity,

    pub unit_type: UnitType,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// The markup rule currently configured on this product.
    #[inline]
    pub fn increment_rule(&self) -> IncrementRule {
        IncrementRule::new(self.increment_type, self.increment_value)
    }
}

/// Product fields as entered in the catalog form.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase", default)]
#[ts(export)]
pub struct ProductInput {
    pub barcode: Option<String>,
    pub name: String,
    pub description: Option<String>,
    pub purchase_price: Money,
    pub increment_type: IncrementType,
    #[ts(type = "string")]
    pub increment_value: Decimal,
    /// Explicit sale price. When absent on create, the price is derived
    /// from `purchase_price` and the increment rule; on update the stored
    /// price is kept.
    pub sale_price: Option<Money>,
    pub stock: Quantity,
    pub unit_type: UnitType,
}

impl ProductInput {
    /// Validates the form and normalizes blank optional text to `None`.
    pub fn validate(mut self) -> CoreResult<Self> {
        validation::validate_product_name(&self.name)?;
        self.name = self.name.trim().to_string();

        self.barcode = validation::normalize_optional(self.barcode);
        if let Some(barcode) = &self.barcode {
            validation::validate_barcode(barcode)?;
        }

        self.description = validation::normalize_optional(self.description);
        if let Some(description) = &self.description {
            validation::validate_max_len("description", description, validation::MAX_DESCRIPTION_LEN)?;
        }

        validation::validate_non_negative_amount("purchase_price", self.purchase_price)?;
        validation::validate_increment_value(self.increment_value)?;
        if let Some(price) = self.sale_price {
            validation::validate_non_negative_amount("sale_price", price)?;
        }
        validation::validate_stock_level(self.stock)?;

        Ok(self)
    }

    /// The sale price a brand new product starts with.
    pub fn initial_sale_price(&self) -> Money {
        self.sale_price.unwrap_or_else(|| {
            derive_sale_price(
                self.purchase_price,
                &IncrementRule::new(self.increment_type, self.increment_value),
            )
        })
    }

    /// Builds a new catalog entry with a fresh id.
    pub fn into_product(self) -> Product {
        let now = Utc::now();
        let sale_price = self.initial_sale_price();
        Product {
            id: uuid::Uuid::new_v4().to_string(),
            barcode: self.barcode,
            name: self.name,
            description: self.description,
            purchase_price: self.purchase_price,
            increment_type: self.increment_type,
            increment_value: self.increment_value,
            sale_price,
            stock: self.stock,
            unit_type: self.unit_type,
            created_at: now,
            updated_at: now,
        }
    }

    /// Overwrites `product`'s editable fields. The stored sale price is kept
    /// unless one was entered.
    pub fn apply_to(self, product: &mut Product) {
        product.barcode = self.barcode;
        product.name = self.name;
        product.description = self.description;
        product.purchase_price = self.purchase_price;
        product.increment_type = self.increment_type;
        product.increment_value = self.increment_value;
        if let Some(price) = self.sale_price {
            product.sale_price = price;
        }
        product.stock = self.stock;
        product.unit_type = self.unit_type;
        product.updated_at = Utc::now();
    }
}

// =============================================================================
// Supplier
// =============================================================================

/// A supplier of stock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Supplier {
    pub id: String,
    pub name: String,
    pub contact: Option<String>,
    pub address: Option<String>,
    pub info: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// Supplier fields as entered in the registry form.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase", default)]
#[ts(export)]
pub struct SupplierInput {
    pub name: String,
    pub contact: Option<String>,
    pub address: Option<String>,
    pub info: Option<String>,
}

impl SupplierInput {
    pub fn validate(mut self) -> CoreResult<Self> {
        validation::validate_supplier_name(&self.name)?;
        self.name = self.name.trim().to_string();

        self.contact = validation::normalize_optional(self.contact);
        if let Some(contact) = &self.contact {
            validation::validate_contact(contact)?;
        }

        self.address = validation::normalize_optional(self.address);
        if let Some(address) = &self.address {
            validation::validate_max_len("address", address, validation::MAX_ADDRESS_LEN)?;
        }

        self.info = validation::normalize_optional(self.info);
        if let Some(info) = &self.info {
            validation::validate_max_len("info", info, validation::MAX_DESCRIPTION_LEN)?;
        }

        Ok(self)
    }
}

// =============================================================================
// Purchase
// =============================================================================

/// An incoming stock event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Purchase {
    pub id: String,
    pub product_id: String,
    pub supplier_id: String,
    pub quantity: Quantity,
    pub unit_cost: Money,
    /// `quantity × unit_cost`, rounded to cents.
    pub total: Money,
    pub unit_type: UnitType,
    /// Informational payment split; need not equal `total`.
    pub cash: Money,
    pub transfer: Money,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// A purchase joined with the names of its product and supplier.
///
/// Names are `None` when the referenced record has since been deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PurchaseView {
    #[serde(flatten)]
    pub purchase: Purchase,
    pub product_name: Option<String>,
    pub supplier_name: Option<String>,
}

/// Purchase fields as entered in the intake form.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase", default)]
#[ts(export)]
pub struct PurchaseInput {
    pub product_id: Option<String>,
    pub supplier_id: Option<String>,
    pub quantity: Option<Quantity>,
    pub unit_cost: Option<Money>,
    /// Overrides the product's unit type when present.
    pub unit_type: Option<UnitType>,
    pub cash: Money,
    pub transfer: Money,
    /// Overrides the product's markup rule for this purchase's price
    /// recompute. The product's stored rule is left as is.
    pub increment_override: Option<IncrementRule>,
}

/// A purchase input that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidPurchase {
    pub product_id: String,
    pub supplier_id: String,
    pub quantity: Quantity,
    pub unit_cost: Money,
    pub total: Money,
    pub unit_type: Option<UnitType>,
    pub cash: Money,
    pub transfer: Money,
    pub increment_override: Option<IncrementRule>,
}

impl PurchaseInput {
    /// Checks presence first, then amounts.
    ///
    /// ## Returns
    /// * `Ok(ValidPurchase)` - All required fields present, total computed
    /// * `Err(MissingRequiredField)` - product, supplier, quantity or cost absent
    /// * `Err(InvalidAmount)` - quantity or cost ≤ 0, cash or transfer < 0
    pub fn validate(self) -> CoreResult<ValidPurchase> {
        let product_id = validation::require_text("product_id", self.product_id)?;
        let supplier_id = validation::require_text("supplier_id", self.supplier_id)?;
        let quantity = validation::require("quantity", self.quantity)?;
        let unit_cost = validation::require("unit_cost", self.unit_cost)?;

        validation::validate_positive_quantity("quantity", quantity)?;
        validation::validate_positive_amount("unit_cost", unit_cost)?;
        validation::validate_non_negative_amount("cash", self.cash)?;
        validation::validate_non_negative_amount("transfer", self.transfer)?;
        if let Some(rule) = &self.increment_override {
            validation::validate_increment_value(rule.value)?;
        }
        let total = unit_cost
            .checked_multiply_quantity(quantity)
            .ok_or_else(|| CoreError::invalid_amount("total", "quantity × unit_cost is out of range"))?;

        Ok(ValidPurchase {
            product_id,
            supplier_id,
            quantity,
            unit_cost,
            total,
            unit_type: self.unit_type,
            cash: self.cash,
            transfer: self.transfer,
            increment_override: self.increment_override,
        })
    }
}

impl ValidPurchase {
    /// The sale price this purchase sets on `product`.
    pub fn derived_sale_price(&self, product: &Product) -> Money {
        let rule = self
            .increment_override
            .clone()
            .unwrap_or_else(|| product.increment_rule());
        derive_sale_price(self.unit_cost, &rule)
    }

    /// The unit type this purchase sets on `product`.
    pub fn resolved_unit_type(&self, product: &Product) -> UnitType {
        self.unit_type.unwrap_or(product.unit_type)
    }
}

/// Calendar filter for the purchase list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase", default)]
#[ts(export)]
pub struct PurchaseFilter {
    pub year: Option<i32>,
    /// 1-12. Only applied together with `year`.
    pub month: Option<u32>,
}

impl PurchaseFilter {
    /// The time window this filter selects, `None` for everything.
    pub fn window(&self) -> CoreResult<Option<DateRange>> {
        match (self.year, self.month) {
            (Some(year), Some(month)) => DateRange::calendar_month(year, month).map(Some),
            (Some(year), None) => DateRange::calendar_year(year).map(Some),
            (None, _) => Ok(None),
        }
    }
}

// =============================================================================
// Sale
// =============================================================================

/// A completed sale.
///
/// Money fields are fixed at creation. Canceling flips `canceled` only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Sale {
    pub id: String,
    /// Item names joined with ", ".
    pub description: String,
    pub amount: Money,
    pub cash: Money,
    pub transfer: Money,
    pub canceled: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Sale {
    /// Creates a new, non-canceled sale stamped now.
    pub fn new(description: impl Into<String>, amount: Money, cash: Money, transfer: Money) -> Self {
        Sale {
            id: uuid::Uuid::new_v4().to_string(),
            description: description.into(),
            amount,
            cash,
            transfer,
            canceled: false,
            created_at: Utc::now(),
        }
    }

    /// Whether the sale counts toward aggregates.
    #[inline]
    pub fn is_active(&self) -> bool {
        !self.canceled
    }
}

// =============================================================================
// Cash Entry
// =============================================================================

/// A manual income or expense recorded against the cashbox.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CashEntry {
    pub id: String,
    pub amount: Money,
    pub description: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl CashEntry {
    pub fn new(amount: Money, description: impl Into<String>) -> Self {
        CashEntry {
            id: uuid::Uuid::new_v4().to_string(),
            amount,
            description: description.into(),
            created_at: Utc::now(),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

//! # Domain Types
//!
//! Entities of the fulfillment core.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │──►│    Variant      │   │     Review      │       │
//! │  │  prices (map)   │   │  color + size   │   │  rating 1..=5   │       │
//! │  │  average_rating │   │  stock ≥ 0      │   │  1 per customer │       │
//! │  │  rating_count   │   └─────────────────┘   └─────────────────┘       │
//! │  └─────────────────┘                                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │     Order       │──►│   OrderItem     │   │  OfflineSale    │       │
//! │  │  status         │   │  (snapshot,     │   │  ≤ 1 per order  │       │
//! │  │  total_amount   │   │   immutable)    │   │  staff_id       │       │
//! │  │  total_ngn      │   └─────────────────┘   └─────────────────┘       │
//! │  └─────────────────┘                                                    │
//! │                                                                         │
//! │  Customer ──► WishlistItem        Staff (job_roles × access)           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! All IDs are UUID v4 strings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use ts_rs::TS;

use crate::money::{Currency, Money};

// =============================================================================
// Price Table
// =============================================================================

/// Per-currency list prices of a product, in minor units.
///
/// Absence of a currency means the product is not sold in that currency
/// directly; orders in that currency convert from the NGN price instead.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PriceTable(BTreeMap<Currency, i64>);

impl PriceTable {
    /// Creates an empty price table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`PriceTable::set`].
    pub fn with(mut self, price: Money) -> Self {
        self.set(price.currency(), Some(price));
        self
    }

    /// Price in a currency, if listed.
    pub fn get(&self, currency: Currency) -> Option<Money> {
        self.0
            .get(&currency)
            .map(|minor| Money::from_minor(*minor, currency))
    }

    /// Sets or clears the price in a currency.
    pub fn set(&mut self, currency: Currency, price: Option<Money>) {
        match price {
            Some(p) => {
                self.0.insert(currency, p.minor());
            }
            None => {
                self.0.remove(&currency);
            }
        }
    }

    /// Iterates listed prices in currency order.
    pub fn iter(&self) -> impl Iterator<Item = Money> + '_ {
        self.0
            .iter()
            .map(|(currency, minor)| Money::from_minor(*minor, *currency))
    }
}

// =============================================================================
// Product
// =============================================================================

/// A catalog product. Stock is tracked on its variants, not here.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Display name, copied into order items at purchase time.
    pub name: String,

    pub category: String,

    /// Primary image URL, copied into order items at purchase time.
    pub image: Option<String>,

    /// List prices per currency.
    pub prices: PriceTable,

    /// Mean review rating. Maintained by the rating aggregator only.
    pub average_rating: f64,

    /// Number of reviews. Maintained by the rating aggregator only.
    pub rating_count: i64,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Variant
// =============================================================================

/// A color/size combination of a product, the unit of stock tracking.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Variant {
    pub id: String,
    pub product_id: String,
    pub color: String,
    pub size: String,
    /// Units on hand. Never negative.
    pub stock: i64,
    /// Shipping weight in kilograms.
    pub weight: Option<f64>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Order Status
// =============================================================================

/// Fulfillment status of an order. See [`crate::status`] for transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Order placed, stock reserved.
    #[default]
    Processing,
    /// Handed to a carrier.
    Shipped,
    /// In the customer's hands. Terminal.
    Delivered,
}

impl OrderStatus {
    /// Lowercase name as stored in the database.
    pub const fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Processing => "processing",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Payment Method
// =============================================================================

#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Online card payment.
    Card,
    /// Direct bank transfer.
    BankTransfer,
    /// Cash at the counter.
    Cash,
    /// Card on an in-store POS terminal.
    PosTerminal,
}

// =============================================================================
// Order
// =============================================================================

/// A placed order. Only `status` changes after creation.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Order {
    pub id: String,
    pub customer_id: String,
    /// Staff member who rang up the order, for in-person sales.
    pub staff_id: Option<String>,
    pub status: OrderStatus,
    /// Display currency the customer was charged in.
    pub currency: Currency,
    /// Sum of line totals, in minor units of `currency`.
    pub total_amount_minor: i64,
    /// The same total in whole naira.
    pub total_ngn: i64,
    pub payment_method: PaymentMethod,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Total in the display currency.
    #[inline]
    pub fn total_amount(&self) -> Money {
        Money::from_minor(self.total_amount_minor, self.currency)
    }

    /// Total in the canonical currency.
    #[inline]
    pub fn total_in_ngn(&self) -> Money {
        Money::from_minor(self.total_ngn, Currency::Ngn)
    }
}

// =============================================================================
// Order Item
// =============================================================================

/// A line item in an order.
/// Uses snapshot pattern to freeze product/variant data at time of purchase.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct OrderItem {
    pub id: String,
    pub order_id: String,
    pub product_id: String,
    pub variant_id: String,
    /// Product name at time of purchase (frozen).
    pub name: String,
    /// Product image at time of purchase (frozen).
    pub image: Option<String>,
    /// Product category at time of purchase (frozen).
    pub category: String,
    /// Variant color at time of purchase (frozen).
    pub color: String,
    /// Variant size at time of purchase (frozen).
    pub size: String,
    pub quantity: i64,
    pub currency: Currency,
    /// Quantity × unit price, in minor units of `currency`.
    pub line_total_minor: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl OrderItem {
    /// Freezes the product and variant attributes into a new line item.
    pub fn snapshot(
        id: String,
        order_id: &str,
        product: &Product,
        variant: &Variant,
        quantity: i64,
        line_total: Money,
        created_at: DateTime<Utc>,
    ) -> Self {
        OrderItem {
            id,
            order_id: order_id.to_string(),
            product_id: product.id.clone(),
            variant_id: variant.id.clone(),
            name: product.name.clone(),
            image: product.image.clone(),
            category: product.category.clone(),
            color: variant.color.clone(),
            size: variant.size.clone(),
            quantity,
            currency: line_total.currency(),
            line_total_minor: line_total.minor(),
            created_at,
        }
    }

    /// Returns the line total as Money.
    #[inline]
    pub fn line_total(&self) -> Money {
        Money::from_minor(self.line_total_minor, self.currency)
    }
}

// =============================================================================
// Offline Sale
// =============================================================================

/// Marks an order as rung up in person by a staff member.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct OfflineSale {
    pub id: String,
    pub order_id: String,
    pub staff_id: String,
    #[ts(as = "String")]
    pub timestamp: DateTime<Utc>,
}

// =============================================================================
// Review
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Review {
    pub id: String,
    pub product_id: String,
    pub customer_id: String,
    /// Star rating, 1 through 5.
    pub rating: i64,
    pub comment: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// People
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Customer {
    pub id: String,
    pub name: String,
    pub email: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// Fine-grained duties a staff member performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum JobRole {
    SalesAssociate,
    Cashier,
    StockKeeper,
    CustomerService,
    StoreManager,
}

/// Coarse system privilege tier, independent of job roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum AccessLevel {
    #[default]
    Staff,
    Manager,
    Admin,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Staff {
    pub id: String,
    pub name: String,
    pub email: String,
    pub job_roles: Vec<JobRole>,
    pub access: AccessLevel,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Staff {
    /// Whether the staff member holds a given duty.
    pub fn has_role(&self, role: JobRole) -> bool {
        self.job_roles.contains(&role)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct WishlistItem {
    pub id: String,
    pub customer_id: String,
    pub product_id: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Order Requests
// =============================================================================

/// One requested line of an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OrderLine {
    pub variant_id: String,
    pub quantity: i64,
}

impl OrderLine {
    pub fn new(variant_id: impl Into<String>, quantity: i64) -> Self {
        OrderLine {
            variant_id: variant_id.into(),
            quantity,
        }
    }
}

/// Everything the order assembler needs to place an order.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PlaceOrder {
    pub customer_id: String,
    /// Set when a staff member places the order for a walk-in customer.
    /// The caller still records the settlement separately.
    pub staff_id: Option<String>,
    pub currency: Currency,
    pub lines: Vec<OrderLine>,
    pub payment_method: PaymentMethod,
}

// =============================================================================
// Unit Tests
// =============================================================================

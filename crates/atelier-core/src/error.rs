//! # Error Types
//!
//! Domain-specific error types for atelier-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  atelier-core errors (this file)                                       │
//! │  ├── CoreError        - Fulfillment, inventory and rating failures     │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  atelier-db errors (separate crate)                                    │
//! │  └── DbError          - Storage failures, embeds CoreError             │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → API layer (external)    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Every variant names the entity it failed on (variant ID, order ID, ...)
//! 3. Errors are enum variants, never String
//! 4. Retryability is a property of the variant, see [`CoreError::is_retryable`]

use thiserror::Error;

use crate::money::Currency;
use crate::types::OrderStatus;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Not enough stock on a variant to satisfy a reservation.
    ///
    /// ## User Workflow
    /// ```text
    /// place_order (variant V, qty: 3)
    ///      │
    ///      ▼
    /// Ledger check: available=2
    ///      │
    ///      ▼
    /// InsufficientStock { variant_id: V, requested: 3, available: 2 }
    ///      │
    ///      ▼
    /// Checkout shows: "Only 2 left in this size"
    /// ```
    #[error("Insufficient stock for variant {variant_id}: requested {requested}, available {available}")]
    InsufficientStock {
        variant_id: String,
        requested: i64,
        available: i64,
    },

    /// The rate table has no quote for a currency needed by a conversion.
    #[error("No exchange rate from {from} to {to}")]
    MissingRate { from: Currency, to: Currency },

    /// Variant ID doesn't exist. Usually a stale client cache.
    #[error("Unknown variant: {0}")]
    UnknownVariant(String),

    /// Product ID doesn't exist.
    #[error("Unknown product: {0}")]
    UnknownProduct(String),

    /// Customer ID doesn't exist.
    #[error("Unknown customer: {0}")]
    UnknownCustomer(String),

    /// Staff ID doesn't exist.
    #[error("Unknown staff member: {0}")]
    UnknownStaff(String),

    /// Order ID doesn't exist.
    #[error("Unknown order: {0}")]
    UnknownOrder(String),

    /// Review ID doesn't exist.
    #[error("Unknown review: {0}")]
    UnknownReview(String),

    /// The order already carries an offline sale.
    #[error("Order {0} already has an offline settlement")]
    DuplicateSettlement(String),

    /// The customer already reviewed this product.
    #[error("Customer {customer_id} has already reviewed product {product_id}")]
    DuplicateReview {
        product_id: String,
        customer_id: String,
    },

    /// A concurrent writer changed the row between read and write.
    ///
    /// ## When This Occurs
    /// - Rating aggregate version moved underneath us
    /// - Order status changed by another request
    /// - SQLite reported the database as locked/busy
    #[error("Concurrent modification of {entity} {id}, retry the operation")]
    ConcurrentModification { entity: String, id: String },

    /// Requested status change is not in the allowed transition table.
    #[error("Order {order_id} cannot move from {from} to {to}")]
    InvalidStatusTransition {
        order_id: String,
        from: OrderStatus,
        to: OrderStatus,
    },

    /// The product has neither a price in the requested currency nor an NGN
    /// price to convert from.
    #[error("Product {product_id} has no price in {currency} or NGN")]
    PriceUnavailable {
        product_id: String,
        currency: Currency,
    },

    /// A monetary value no longer fits in 64-bit minor units.
    #[error("Monetary amount overflowed")]
    AmountOverflow,

    /// Arithmetic between two amounts in different currencies.
    #[error("Currency mismatch: expected {expected}, found {found}")]
    CurrencyMismatch { expected: Currency, found: Currency },

    /// Tried to remove a rating from an aggregate that has none.
    #[error("Rating aggregate is already empty")]
    RatingAggregateEmpty,

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Whether the caller may retry the same operation.
    ///
    /// ```text
    /// InsufficientStock       → retry with adjusted quantities
    /// MissingRate             → retry after the rate table refreshes
    /// ConcurrentModification  → retry the whole operation
    /// everything else         → fix the request first
    /// ```
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            CoreError::InsufficientStock { .. }
                | CoreError::MissingRate { .. }
                | CoreError::ConcurrentModification { .. }
        )
    }

    /// Creates a ConcurrentModification error.
    pub fn conflict(entity: impl Into<String>, id: impl Into<String>) -> Self {
        CoreError::ConcurrentModification {
            entity: entity.into(),
            id: id.into(),
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when caller input doesn't meet requirements.
/// Used for early validation before any row is touched.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// Invalid format (e.g., invalid UUID).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Duplicate value (e.g., the same variant twice in one order).
    #[error("{field} '{value}' appears more than once")]
    Duplicate { field: String, value: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

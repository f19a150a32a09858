//! # atelier-core: Pure Fulfillment Logic
//!
//! Domain types and rules for order fulfillment, multi-currency pricing and
//! inventory, with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Atelier Architecture                             │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │              API / storefront / back-office (external)          │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 atelier-db (Database Layer)                     │   │
//! │  │   inventory ledger, order assembler, settlement recorder,       │   │
//! │  │   rating aggregator writes, status transitions                  │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │              ★ atelier-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │  ┌─────────┐ ┌──────────┐ ┌─────────┐ ┌────────┐ ┌──────────┐  │   │
//! │  │  │  money  │ │ currency │ │ pricing │ │ rating │ │  status  │  │   │
//! │  │  │ Money   │ │ RateTable│ │ lines   │ │ avg/n  │ │ P→S→D    │  │   │
//! │  │  └─────────┘ └──────────┘ └─────────┘ └────────┘ └──────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`money`] - `Currency` and integer minor-unit `Money`
//! - [`currency`] - Rate table and conversion through NGN
//! - [`types`] - Entities (Product, Variant, Order, OrderItem, ...)
//! - [`pricing`] - Line normalisation, line pricing, order totals
//! - [`rating`] - Rating aggregate arithmetic
//! - [`status`] - Order status transition table
//! - [`validation`] - Input rules
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use atelier_core::currency::RateTable;
//! use atelier_core::money::{Currency, Money};
//! use atelier_core::pricing::order_totals;
//! use rust_decimal::Decimal;
//!
//! let rates = RateTable::new().with_rate(Currency::Usd, Decimal::new(65, 5)).unwrap();
//! let lines = [Money::from_minor(130, Currency::Usd)];
//! let totals = order_totals(&lines, Currency::Usd, &rates).unwrap();
//! assert_eq!(totals.total_ngn.minor(), 2000);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod currency;
pub mod error;
pub mod money;
pub mod pricing;
pub mod rating;
pub mod status;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use currency::{convert, RateTable};
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::{Currency, Money};
pub use pricing::DuplicateLinePolicy;
pub use rating::RatingSummary;
pub use status::TransitionPolicy;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum lines in a single order request.
pub const MAX_ORDER_LINES: usize = 100;

/// Maximum quantity of one variant in an order, after merging duplicates.
///
/// Catches typing 1000 instead of 10 at checkout.
pub const MAX_ITEM_QUANTITY: i64 = 999;

/// Maximum length of product, customer and staff names.
pub const MAX_NAME_LENGTH: usize = 200;

/// Maximum length of a review comment.
pub const MAX_COMMENT_LENGTH: usize = 2000;

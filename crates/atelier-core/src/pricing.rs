//! # Order Pricing
//!
//! Pure steps of order assembly: normalising requested lines, pricing each
//! line in the display currency, and totalling.
//!
//! ## Pipeline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  lines ──► normalize_lines ──► (stock reserved by the ledger)          │
//! │                                        │                                │
//! │                                        ▼                                │
//! │                 price_line (per line, display currency)                │
//! │                   ├── product lists a price in currency → price × qty  │
//! │                   └── else NGN price × qty → convert → round once      │
//! │                                        │                                │
//! │                                        ▼                                │
//! │                 order_totals                                            │
//! │                   ├── total_amount = Σ line totals                     │
//! │                   └── total_ngn    = convert(total_amount → NGN)       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::currency::{convert_money, RateTable};
use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::{Currency, Money};
use crate::types::{OrderLine, Product};
use crate::validation::{validate_line_count, validate_quantity};

// =============================================================================
// Duplicate Lines
// =============================================================================

/// What to do when one order names the same variant on several lines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateLinePolicy {
    /// Sum the quantities into the first occurrence.
    #[default]
    Merge,
    /// Fail with `ValidationError::Duplicate`.
    Reject,
}

impl fmt::Display for DuplicateLinePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DuplicateLinePolicy::Merge => f.write_str("merge"),
            DuplicateLinePolicy::Reject => f.write_str("reject"),
        }
    }
}

impl FromStr for DuplicateLinePolicy {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "merge" => Ok(DuplicateLinePolicy::Merge),
            "reject" => Ok(DuplicateLinePolicy::Reject),
            other => Err(ValidationError::InvalidFormat {
                field: "duplicate_lines".to_string(),
                reason: format!("expected 'merge' or 'reject', got '{}'", other),
            }),
        }
    }
}

/// Validates an order's lines and collapses duplicate variants.
///
/// Output keeps first-seen order. Every resulting quantity is within
/// `1..=MAX_ITEM_QUANTITY`, merged ones included.
///
/// ## Example
/// ```rust
/// use atelier_core::pricing::{normalize_lines, DuplicateLinePolicy};
/// use atelier_core::types::OrderLine;
///
/// let lines = vec![OrderLine::new("a", 1), OrderLine::new("b", 2), OrderLine::new("a", 3)];
/// let merged = normalize_lines(&lines, DuplicateLinePolicy::Merge).unwrap();
/// assert_eq!(merged, vec![OrderLine::new("a", 4), OrderLine::new("b", 2)]);
///
/// assert!(normalize_lines(&lines, DuplicateLinePolicy::Reject).is_err());
/// ```
pub fn normalize_lines(lines: &[OrderLine], policy: DuplicateLinePolicy) -> CoreResult<Vec<OrderLine>> {
    validate_line_count(lines.len())?;

    let mut out: Vec<OrderLine> = Vec::with_capacity(lines.len());
    let mut seen: HashMap<&str, usize> = HashMap::with_capacity(lines.len());

    for line in lines {
        if line.variant_id.trim().is_empty() {
            return Err(ValidationError::Required {
                field: "variant_id".to_string(),
            }
            .into());
        }
        validate_quantity(line.quantity)?;

        match seen.get(line.variant_id.as_str()) {
            Some(&index) => match policy {
                DuplicateLinePolicy::Reject => {
                    return Err(ValidationError::Duplicate {
                        field: "variant_id".to_string(),
                        value: line.variant_id.clone(),
                    }
                    .into());
                }
                DuplicateLinePolicy::Merge => {
                    let merged = out[index].quantity + line.quantity;
                    validate_quantity(merged)?;
                    out[index].quantity = merged;
                }
            },
            None => {
                seen.insert(line.variant_id.as_str(), out.len());
                out.push(line.clone());
            }
        }
    }

    Ok(out)
}

// =============================================================================
// Line Pricing
// =============================================================================

/// Prices `qty` units of a product in `currency`.
///
/// A listed price in the currency wins. Otherwise the NGN line total is
/// converted, so rounding happens once per line rather than per unit.
pub fn price_line(product: &Product, qty: i64, currency: Currency, rates: &RateTable) -> CoreResult<Money> {
    if let Some(unit) = product.prices.get(currency) {
        return unit.multiply_quantity(qty);
    }

    let ngn_unit = product
        .prices
        .get(Currency::Ngn)
        .ok_or_else(|| CoreError::PriceUnavailable {
            product_id: product.id.clone(),
            currency,
        })?;

    let ngn_total = ngn_unit.multiply_quantity(qty)?;
    convert_money(ngn_total, currency, rates)
}

// =============================================================================
// Totals
// =============================================================================

/// Order totals in the display and canonical currencies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderTotals {
    pub total_amount: Money,
    pub total_ngn: Money,
}

/// Sums line totals in `currency` and converts the sum to NGN.
pub fn order_totals(line_totals: &[Money], currency: Currency, rates: &RateTable) -> CoreResult<OrderTotals> {
    let total_amount = Money::sum(currency, line_totals)?;
    let total_ngn = convert_money(total_amount, Currency::Ngn, rates)?;
    Ok(OrderTotals {
        total_amount,
        total_ngn,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

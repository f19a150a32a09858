//! # Currency Conversion
//!
//! Converts amounts between NGN and the display currencies through a rate table.
//!
//! ## Rate Model
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Every quote is "units of <currency> per 1 NGN"                         │
//! │                                                                         │
//! │     NGN  = 1            (implicit, never stored)                        │
//! │     USD  = 0.00065                                                      │
//! │     EUR  = 0.00060                                                      │
//! │     GBP  = 0.00051                                                      │
//! │                                                                         │
//! │  amount_to = amount_from / quote[from] * quote[to]                      │
//! │                                                                         │
//! │  Every pair goes through the NGN base, so N currencies need N-1 quotes  │
//! │  instead of N² pair rates.                                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The result is rounded once, half to even, to the target currency's minor
//! unit. Converting into the same currency returns the input untouched.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::{Currency, Money};

// =============================================================================
// Rate Table
// =============================================================================

/// Exchange quotes against the canonical currency.
///
/// ## Example
/// ```rust
/// use atelier_core::currency::RateTable;
/// use atelier_core::money::Currency;
/// use rust_decimal::Decimal;
///
/// let rates = RateTable::new().with_rate(Currency::Usd, Decimal::new(65, 5)).unwrap();
/// assert_eq!(rates.quote(Currency::Usd), Some(Decimal::new(65, 5)));
/// assert_eq!(rates.quote(Currency::Ngn), Some(Decimal::ONE));
/// assert_eq!(rates.quote(Currency::Eur), None);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RateTable {
    quotes: BTreeMap<Currency, Decimal>,
}

impl RateTable {
    /// Creates an empty table. Only NGN ↔ NGN converts until quotes are added.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`RateTable::set_rate`].
    pub fn with_rate(mut self, currency: Currency, per_ngn: Decimal) -> CoreResult<Self> {
        self.set_rate(currency, per_ngn)?;
        Ok(self)
    }

    /// Sets how many units of `currency` one NGN buys.
    ///
    /// Quotes must be strictly positive. Setting NGN itself is accepted only
    /// as exactly 1.
    pub fn set_rate(&mut self, currency: Currency, per_ngn: Decimal) -> CoreResult<()> {
        if per_ngn <= Decimal::ZERO {
            return Err(ValidationError::MustBePositive {
                field: format!("rate for {}", currency),
            }
            .into());
        }
        if currency.is_canonical() {
            if per_ngn != Decimal::ONE {
                return Err(ValidationError::InvalidFormat {
                    field: "rate for NGN".to_string(),
                    reason: "the canonical currency always quotes at 1".to_string(),
                }
                .into());
            }
            return Ok(());
        }
        self.quotes.insert(currency, per_ngn);
        Ok(())
    }

    /// Quote for a currency, NGN always being 1.
    pub fn quote(&self, currency: Currency) -> Option<Decimal> {
        if currency.is_canonical() {
            return Some(Decimal::ONE);
        }
        self.quotes.get(&currency).copied()
    }

    /// Currencies that currently have a quote (NGN included).
    pub fn currencies(&self) -> Vec<Currency> {
        Currency::ALL
            .into_iter()
            .filter(|c| self.quote(*c).is_some())
            .collect()
    }

    /// Re-checks every stored quote, used after deserializing a config file.
    pub fn validate(&self) -> CoreResult<()> {
        for (currency, quote) in &self.quotes {
            RateTable::new().set_rate(*currency, *quote)?;
        }
        Ok(())
    }
}

// =============================================================================
// Conversion
// =============================================================================

/// Converts a major-unit amount between currencies.
///
/// ## Contract
/// - `amount` must be ≥ 0
/// - same currency → identity (no rounding)
/// - otherwise `amount / quote[from] * quote[to]`, rounded half-to-even to
///   `to`'s minor unit
/// - a missing quote on either side fails with `MissingRate { from, to }`
///
/// ## Example
/// ```rust
/// use atelier_core::currency::{convert, RateTable};
/// use atelier_core::money::Currency;
/// use rust_decimal::Decimal;
///
/// let rates = RateTable::new().with_rate(Currency::Usd, Decimal::new(65, 5)).unwrap();
/// let usd = convert(Decimal::from(2000), Currency::Ngn, Currency::Usd, &rates).unwrap();
/// assert_eq!(usd, Decimal::new(130, 2)); // 2000 × 0.00065 = 1.30
/// ```
pub fn convert(amount: Decimal, from: Currency, to: Currency, rates: &RateTable) -> CoreResult<Decimal> {
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(ValidationError::MustNotBeNegative {
            field: "amount".to_string(),
        }
        .into());
    }

    if from == to {
        return Ok(amount);
    }

    let (from_quote, to_quote) = match (rates.quote(from), rates.quote(to)) {
        (Some(f), Some(t)) => (f, t),
        _ => return Err(CoreError::MissingRate { from, to }),
    };

    let converted = amount
        .checked_div(from_quote)
        .and_then(|base| base.checked_mul(to_quote))
        .ok_or(CoreError::AmountOverflow)?;

    Ok(Money::from_decimal(converted, to)?.to_decimal())
}

/// Converts a [`Money`] value into another currency.
pub fn convert_money(amount: Money, to: Currency, rates: &RateTable) -> CoreResult<Money> {
    if amount.currency() == to {
        return Ok(amount);
    }
    let converted = convert(amount.to_decimal(), amount.currency(), to, rates)?;
    Money::from_decimal(converted, to)
}

// =============================================================================
// Unit Tests
// =============================================================================

//! # Money Module
//!
//! Provides the `Currency` and `Money` types for handling monetary values safely.
//!
//! ## Why Integer Minor Units?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In JavaScript/floating point:                                          │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  OUR SOLUTION: Integer minor units per currency                         │
//! │    USD/EUR/GBP  → cents/pence (exponent 2)                              │
//! │    NGN          → whole naira (exponent 0, no kobo in this model)       │
//! │                                                                         │
//! │  Conversions between currencies go through rust_decimal and are        │
//! │  rounded back to minor units exactly once (see `currency` module).     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use atelier_core::money::{Currency, Money};
//!
//! let price = Money::from_minor(1099, Currency::Usd); // $10.99
//! let line = price.multiply_quantity(2).unwrap();      // $21.98
//! assert_eq!(line.minor(), 2198);
//!
//! let naira = Money::from_minor(2000, Currency::Ngn);
//! assert_eq!(naira.to_string(), "₦2000");
//! ```

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};

// =============================================================================
// Currency
// =============================================================================

/// Currencies an order can be priced and displayed in.
///
/// NGN is the canonical ledger currency: every order total is also recorded
/// in NGN so orders in different display currencies stay comparable.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "UPPERCASE"))]
#[serde(rename_all = "UPPERCASE")]
#[ts(export)]
pub enum Currency {
    /// Nigerian naira (canonical).
    Ngn,
    /// US dollar.
    Usd,
    /// Euro.
    Eur,
    /// Pound sterling.
    Gbp,
}

impl Currency {
    /// Every supported currency, canonical first.
    pub const ALL: [Currency; 4] = [Currency::Ngn, Currency::Usd, Currency::Eur, Currency::Gbp];

    /// Number of decimal places in the currency's minor unit.
    pub const fn exponent(&self) -> u32 {
        match self {
            Currency::Ngn => 0,
            Currency::Usd | Currency::Eur | Currency::Gbp => 2,
        }
    }

    /// ISO 4217 code.
    pub const fn code(&self) -> &'static str {
        match self {
            Currency::Ngn => "NGN",
            Currency::Usd => "USD",
            Currency::Eur => "EUR",
            Currency::Gbp => "GBP",
        }
    }

    /// Display symbol.
    pub const fn symbol(&self) -> &'static str {
        match self {
            Currency::Ngn => "₦",
            Currency::Usd => "$",
            Currency::Eur => "€",
            Currency::Gbp => "£",
        }
    }

    /// True for the canonical ledger currency.
    #[inline]
    pub const fn is_canonical(&self) -> bool {
        matches!(self, Currency::Ngn)
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Currency {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "NGN" => Ok(Currency::Ngn),
            "USD" => Ok(Currency::Usd),
            "EUR" => Ok(Currency::Eur),
            "GBP" => Ok(Currency::Gbp),
            other => Err(ValidationError::InvalidFormat {
                field: "currency".to_string(),
                reason: format!("unsupported currency '{}'", other),
            }),
        }
    }
}

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest unit of its currency.
///
/// ## Where Money is Used
/// ```text
/// Product price (per currency) ──► OrderItem.line_total ──► Order.total_amount
///                                                      └──► Order.total_ngn
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money {
    minor: i64,
    currency: Currency,
}

impl Money {
    /// Creates a Money value from minor units (cents, pence, naira).
    #[inline]
    pub const fn from_minor(minor: i64, currency: Currency) -> Self {
        Money { minor, currency }
    }

    /// Zero in the given currency.
    #[inline]
    pub const fn zero(currency: Currency) -> Self {
        Money { minor: 0, currency }
    }

    /// Returns the value in minor units.
    #[inline]
    pub const fn minor(&self) -> i64 {
        self.minor
    }

    /// Returns the currency.
    #[inline]
    pub const fn currency(&self) -> Currency {
        self.currency
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.minor == 0
    }

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.minor < 0
    }

    /// Multiplies by a line quantity.
    ///
    /// ## Example
    /// ```rust
    /// use atelier_core::money::{Currency, Money};
    ///
    /// let unit = Money::from_minor(299, Currency::Gbp);
    /// assert_eq!(unit.multiply_quantity(3).unwrap().minor(), 897);
    /// ```
    pub fn multiply_quantity(&self, qty: i64) -> CoreResult<Money> {
        self.minor
            .checked_mul(qty)
            .map(|minor| Money::from_minor(minor, self.currency))
            .ok_or(CoreError::AmountOverflow)
    }

    /// Adds two amounts of the same currency.
    pub fn checked_add(&self, other: Money) -> CoreResult<Money> {
        if self.currency != other.currency {
            return Err(CoreError::CurrencyMismatch {
                expected: self.currency,
                found: other.currency,
            });
        }
        self.minor
            .checked_add(other.minor)
            .map(|minor| Money::from_minor(minor, self.currency))
            .ok_or(CoreError::AmountOverflow)
    }

    /// Sums amounts that must all be in `currency`.
    pub fn sum<'a>(currency: Currency, amounts: impl IntoIterator<Item = &'a Money>) -> CoreResult<Money> {
        amounts
            .into_iter()
            .try_fold(Money::zero(currency), |acc, m| acc.checked_add(*m))
    }

    /// The value in major units as an exact decimal (1099 USD cents → 10.99).
    pub fn to_decimal(&self) -> Decimal {
        Decimal::new(self.minor, self.currency.exponent())
    }

    /// Builds Money from a major-unit decimal, rounding half to even to the
    /// currency's minor unit.
    ///
    /// ## Bankers Rounding
    /// ```text
    /// 0.125 USD → 0.12   (2 is even)
    /// 0.135 USD → 0.14   (4 is even)
    /// 2.5 NGN   → 2
    /// ```
    /// Ties alternate direction, so repeated conversions carry no systematic bias.
    pub fn from_decimal(amount: Decimal, currency: Currency) -> CoreResult<Money> {
        let exponent = currency.exponent();
        let rounded = amount.round_dp_with_strategy(exponent, RoundingStrategy::MidpointNearestEven);
        let scale = Decimal::from(10i64.pow(exponent));
        let minor = rounded
            .checked_mul(scale)
            .and_then(|scaled| scaled.to_i64())
            .ok_or(CoreError::AmountOverflow)?;
        Ok(Money::from_minor(minor, currency))
    }
}

/// Human-readable form, e.g. `$10.99`, `₦2000`, `-£5.50`.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.minor < 0 { "-" } else { "" };
        let exponent = self.currency.exponent();
        let abs = self.minor.unsigned_abs();
        if exponent == 0 {
            return write!(f, "{}{}{}", sign, self.currency.symbol(), abs);
        }
        let divisor = 10u64.pow(exponent);
        write!(
            f,
            "{}{}{}.{:0width$}",
            sign,
            self.currency.symbol(),
            abs / divisor,
            abs % divisor,
            width = exponent as usize
        )
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

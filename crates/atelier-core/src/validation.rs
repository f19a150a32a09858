//! # Validation Module
//!
//! Input checks applied before any row is touched.
//!
//! ## Validation Layers
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Layer 1: THIS MODULE                                                   │
//! │  ├── Quantities, ratings, IDs, text lengths                            │
//! │  └── Fails fast with ValidationError                                   │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Database (SQLite)                                            │
//! │  ├── CHECK (stock >= 0), CHECK (rating BETWEEN 1 AND 5)                │
//! │  ├── UNIQUE (order_id) on offline_sales, (product_id, customer_id)     │
//! │  │   on reviews, (product_id, color, size) on variants                 │
//! │  └── Triggers keeping order_items append-only                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use atelier_core::validation::{validate_quantity, validate_rating};
//!
//! validate_quantity(3).unwrap();
//! validate_rating(5).unwrap();
//! assert!(validate_rating(6).is_err());
//! ```

use crate::error::ValidationError;
use crate::{MAX_COMMENT_LENGTH, MAX_ITEM_QUANTITY, MAX_NAME_LENGTH, MAX_ORDER_LINES};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a display name (product, customer, staff).
///
/// ## Rules
/// - Must not be empty after trimming
/// - At most 200 characters
pub fn validate_name(field: &str, name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_NAME_LENGTH,
        });
    }

    Ok(())
}

/// Validates an email address loosely: one `@` with text on both sides.
pub fn validate_email(email: &str) -> ValidationResult<()> {
    let email = email.trim();
    if email.is_empty() {
        return Err(ValidationError::Required {
            field: "email".to_string(),
        });
    }

    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') && !domain.contains('@') => Ok(()),
        _ => Err(ValidationError::InvalidFormat {
            field: "email".to_string(),
            reason: "must look like name@domain.tld".to_string(),
        }),
    }
}

/// Validates an optional review comment. Empty comments are allowed.
pub fn validate_comment(comment: Option<&str>) -> ValidationResult<()> {
    if let Some(text) = comment {
        if text.chars().count() > MAX_COMMENT_LENGTH {
            return Err(ValidationError::TooLong {
                field: "comment".to_string(),
                max: MAX_COMMENT_LENGTH,
            });
        }
    }
    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates an order line quantity.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_ITEM_QUANTITY (999)
///
/// ## Where It Runs
/// ```text
/// place_order(lines)
///      │
///      ├── validate_order_lines (count, then each quantity) ← THIS
///      │
///      ├── normalize_lines (merge / reject duplicates)
///      │       └── merged quantity re-checked here too
///      ▼
/// reserve stock
/// ```
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a stock movement (restock / release). Only positivity is
/// required, stock receipts are not capped.
pub fn validate_stock_delta(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }
    Ok(())
}

/// Validates initial stock for a new variant.
pub fn validate_initial_stock(stock: i64) -> ValidationResult<()> {
    if stock < 0 {
        return Err(ValidationError::MustNotBeNegative {
            field: "stock".to_string(),
        });
    }
    Ok(())
}

/// Validates a list price in minor units. Zero is allowed (free items).
///
/// ## Example
/// ```rust
/// use atelier_core::validation::validate_price_minor;
///
/// assert!(validate_price_minor(1099).is_ok());
/// assert!(validate_price_minor(0).is_ok());
/// assert!(validate_price_minor(-100).is_err());
/// ```
pub fn validate_price_minor(minor: i64) -> ValidationResult<()> {
    if minor < 0 {
        return Err(ValidationError::MustNotBeNegative {
            field: "price".to_string(),
        });
    }
    Ok(())
}

/// Validates a star rating: 1 through 5 inclusive.
pub fn validate_rating(rating: i64) -> ValidationResult<()> {
    if !(1..=5).contains(&rating) {
        return Err(ValidationError::OutOfRange {
            field: "rating".to_string(),
            min: 1,
            max: 5,
        });
    }
    Ok(())
}

// =============================================================================
// Collection Validators
// =============================================================================

/// Validates the number of lines in an order request.
///
/// ## Rules
/// - At least one line
/// - At most MAX_ORDER_LINES (100)
pub fn validate_line_count(count: usize) -> ValidationResult<()> {
    if count == 0 {
        return Err(ValidationError::Required {
            field: "lines".to_string(),
        });
    }

    if count > MAX_ORDER_LINES {
        return Err(ValidationError::OutOfRange {
            field: "lines".to_string(),
            min: 1,
            max: MAX_ORDER_LINES as i64,
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_name() {
        assert!(validate_name("name", "Linen Shirt").is_ok());
        assert!(validate_name("name", "").is_err());
        assert!(validate_name("name", "   ").is_err());
        assert!(validate_name("name", &"A".repeat(300)).is_err());
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("ada@atelier.ng").is_ok());
        assert!(validate_email("").is_err());
        assert!(validate_email("ada").is_err());
        assert!(validate_email("@atelier.ng").is_err());
        assert!(validate_email("ada@localhost").is_err());
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(999).is_ok());

        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-1).is_err());
        assert!(validate_quantity(1000).is_err());
    }

    #[test]
    fn test_stock_movements() {
        assert!(validate_stock_delta(5000).is_ok());
        assert!(validate_stock_delta(0).is_err());
        assert!(validate_stock_delta(-3).is_err());
        assert!(validate_initial_stock(0).is_ok());
        assert!(validate_initial_stock(-1).is_err());
    }

    #[test]
    fn test_validate_rating() {
        for r in 1..=5 {
            assert!(validate_rating(r).is_ok());
        }
        assert!(validate_rating(0).is_err());
        assert!(validate_rating(6).is_err());
    }

    #[test]
    fn test_validate_line_count() {
        assert!(matches!(
            validate_line_count(0),
            Err(ValidationError::Required { .. })
        ));
        assert!(validate_line_count(1).is_ok());
        assert!(validate_line_count(MAX_ORDER_LINES).is_ok());
        assert!(validate_line_count(MAX_ORDER_LINES + 1).is_err());
    }

    #[test]
    fn test_validate_comment() {
        assert!(validate_comment(None).is_ok());
        assert!(validate_comment(Some("")).is_ok());
        assert!(validate_comment(Some(&"x".repeat(MAX_COMMENT_LENGTH + 1))).is_err());
    }
}

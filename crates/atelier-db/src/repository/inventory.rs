//! # Inventory Ledger
//!
//! Owns `variants.stock`. Nothing else in the crate writes that column.
//!
//! ## Reservation Protocol
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  reserve(V, qty)                                                        │
//! │                                                                         │
//! │   UPDATE variants SET stock = stock - qty                               │
//! │   WHERE id = V AND stock >= qty          ← check and decrement are one │
//! │   RETURNING stock                          statement (compare-and-swap)│
//! │        │                                                                │
//! │        ├── row returned  → Ok(remaining)                               │
//! │        └── no row        → SELECT stock FROM variants WHERE id = V     │
//! │                              ├── none  → UnknownVariant(V)             │
//! │                              └── n     → InsufficientStock(V, qty, n)  │
//! │                                                                         │
//! │  Commit is implicit: inside place_order the decrement lives or dies    │
//! │  with the order transaction.                                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! SQLite has one writer at a time, so two transactions reserving the same
//! variant queue on the write lock; the second one evaluates `stock >= qty`
//! against the first one's committed result, never a stale read.

use atelier_core::validation::validate_stock_delta;
use atelier_core::CoreError;
use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};

use crate::error::{DbError, DbResult};

// =============================================================================
// Connection-level operations
// =============================================================================

/// Decrements stock by `qty` if at least `qty` is available.
/// Returns the remaining stock.
pub(crate) async fn reserve_in(conn: &mut SqliteConnection, variant_id: &str, qty: i64) -> DbResult<i64> {
    validate_stock_delta(qty)?;

    let remaining: Option<i64> = sqlx::query_scalar(
        r#"
        UPDATE variants
        SET stock = stock - ?2, updated_at = ?3
        WHERE id = ?1 AND stock >= ?2
        RETURNING stock
        "#,
    )
    .bind(variant_id)
    .bind(qty)
    .bind(Utc::now())
    .fetch_optional(&mut *conn)
    .await
    .map_err(|e| DbError::from(e).for_entity("variant", variant_id))?;

    if let Some(remaining) = remaining {
        debug!(variant_id = %variant_id, qty = qty, remaining = remaining, "Stock reserved");
        return Ok(remaining);
    }

    match current_stock(conn, variant_id).await? {
        None => Err(CoreError::UnknownVariant(variant_id.to_string()).into()),
        Some(available) => {
            warn!(
                variant_id = %variant_id,
                requested = qty,
                available = available,
                "Insufficient stock"
            );
            Err(CoreError::InsufficientStock {
                variant_id: variant_id.to_string(),
                requested: qty,
                available,
            }
            .into())
        }
    }
}

/// Increments stock by `qty`. Returns the new stock.
pub(crate) async fn release_in(conn: &mut SqliteConnection, variant_id: &str, qty: i64) -> DbResult<i64> {
    validate_stock_delta(qty)?;

    // The bound keeps SQLite from promoting an overflowing sum to REAL
    let stock: Option<i64> = sqlx::query_scalar(
        r#"
        UPDATE variants
        SET stock = stock + ?2, updated_at = ?3
        WHERE id = ?1 AND stock <= 9223372036854775807 - ?2
        RETURNING stock
        "#,
    )
    .bind(variant_id)
    .bind(qty)
    .bind(Utc::now())
    .fetch_optional(&mut *conn)
    .await
    .map_err(|e| DbError::from(e).for_entity("variant", variant_id))?;

    if let Some(stock) = stock {
        return Ok(stock);
    }

    match current_stock(conn, variant_id).await? {
        None => Err(CoreError::UnknownVariant(variant_id.to_string()).into()),
        Some(current) => {
            warn!(variant_id = %variant_id, qty = qty, stock = current, "Stock increment would overflow");
            Err(CoreError::AmountOverflow.into())
        }
    }
}

async fn current_stock(conn: &mut SqliteConnection, variant_id: &str) -> DbResult<Option<i64>> {
    let stock: Option<i64> = sqlx::query_scalar("SELECT stock FROM variants WHERE id = ?1")
        .bind(variant_id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(stock)
}

// =============================================================================
// Inventory Ledger
// =============================================================================

/// Per-variant stock operations, each its own atomic statement.
#[derive(Debug, Clone)]
pub struct InventoryLedger {
    pool: SqlitePool,
}

impl InventoryLedger {
    /// Creates a new InventoryLedger.
    pub fn new(pool: SqlitePool) -> Self {
        InventoryLedger { pool }
    }

    /// Current stock of a variant.
    pub async fn stock(&self, variant_id: &str) -> DbResult<i64> {
        let mut conn = self.pool.acquire().await?;
        current_stock(&mut conn, variant_id)
            .await?
            .ok_or_else(|| CoreError::UnknownVariant(variant_id.to_string()).into())
    }

    /// Reserves stock outside an order. All-or-nothing: on failure the stock
    /// is untouched.
    pub async fn reserve(&self, variant_id: &str, qty: i64) -> DbResult<i64> {
        let mut conn = self.pool.acquire().await?;
        reserve_in(&mut conn, variant_id, qty).await
    }

    /// Puts reserved units back, e.g. when a cancellation layer voids an order.
    pub async fn release(&self, variant_id: &str, qty: i64) -> DbResult<i64> {
        let mut conn = self.pool.acquire().await?;
        let stock = release_in(&mut conn, variant_id, qty).await?;
        debug!(variant_id = %variant_id, qty = qty, stock = stock, "Stock released");
        Ok(stock)
    }

    /// Books a goods receipt from the back office.
    pub async fn restock(&self, variant_id: &str, qty: i64) -> DbResult<i64> {
        let mut conn = self.pool.acquire().await?;
        let stock = release_in(&mut conn, variant_id, qty).await?;
        info!(variant_id = %variant_id, qty = qty, stock = stock, "Variant restocked");
        Ok(stock)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

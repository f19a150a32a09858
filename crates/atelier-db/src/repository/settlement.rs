//! # Settlement Recorder
//!
//! Attaches at most one `OfflineSale` to an order.
//!
//! ```text
//! Online checkout ─────► Order ──(later, pickup at the counter)──► OfflineSale
//! Walk-in (staff_id) ──► Order ──(same visit)────────────────────► OfflineSale
//!
//! Either way: UNIQUE (offline_sales.order_id). The second attempt fails with
//! DuplicateSettlement and the first row is left untouched.
//! ```

use atelier_core::{CoreError, OfflineSale, ValidationError};
use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::repository::order::load_order;
use crate::repository::people::staff_exists;

pub(crate) async fn has_offline_sale(conn: &mut SqliteConnection, order_id: &str) -> DbResult<bool> {
    let found: Option<i64> = sqlx::query_scalar("SELECT 1 FROM offline_sales WHERE order_id = ?1")
        .bind(order_id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(found.is_some())
}

/// Records in-person settlements.
#[derive(Debug, Clone)]
pub struct SettlementRecorder {
    pool: SqlitePool,
}

impl SettlementRecorder {
    /// Creates a new SettlementRecorder.
    pub fn new(pool: SqlitePool) -> Self {
        SettlementRecorder { pool }
    }

    /// Marks an order as rung up in person by `staff_id`.
    ///
    /// `timestamp` defaults to now. Works whether the order was placed online
    /// or by the same staff member at the counter.
    pub async fn record_offline_sale(
        &self,
        order_id: &str,
        staff_id: &str,
        timestamp: Option<DateTime<Utc>>,
    ) -> DbResult<OfflineSale> {
        if order_id.trim().is_empty() {
            return Err(ValidationError::Required {
                field: "order_id".to_string(),
            }
            .into());
        }
        if staff_id.trim().is_empty() {
            return Err(ValidationError::Required {
                field: "staff_id".to_string(),
            }
            .into());
        }

        let sale = OfflineSale {
            id: Uuid::new_v4().to_string(),
            order_id: order_id.to_string(),
            staff_id: staff_id.to_string(),
            timestamp: timestamp.unwrap_or_else(Utc::now),
        };

        let inserted = sqlx::query(
            "INSERT INTO offline_sales (id, order_id, staff_id, timestamp) VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(&sale.id)
        .bind(&sale.order_id)
        .bind(&sale.staff_id)
        .bind(sale.timestamp)
        .execute(&self.pool)
        .await;

        if let Err(e) = inserted {
            let err = match DbError::from(e).for_entity("order", order_id) {
                err if err.is_unique_on("offline_sales") => {
                    warn!(order_id = %order_id, staff_id = %staff_id, "Order already settled");
                    DbError::Core(CoreError::DuplicateSettlement(order_id.to_string()))
                }
                DbError::ForeignKeyViolation { .. } => self.missing_reference(order_id, staff_id).await?,
                err => err,
            };
            return Err(err);
        }

        info!(
            order_id = %order_id,
            staff_id = %staff_id,
            settlement_id = %sale.id,
            "Offline sale recorded"
        );
        Ok(sale)
    }

    /// Works out which side of a failed foreign key is missing.
    async fn missing_reference(&self, order_id: &str, staff_id: &str) -> DbResult<DbError> {
        let mut conn = self.pool.acquire().await?;
        if load_order(&mut conn, order_id).await?.is_none() {
            return Ok(CoreError::UnknownOrder(order_id.to_string()).into());
        }
        if !staff_exists(&mut conn, staff_id).await? {
            return Ok(CoreError::UnknownStaff(staff_id.to_string()).into());
        }
        Ok(DbError::ForeignKeyViolation {
            message: format!("offline sale for order {}", order_id),
        })
    }

    /// The settlement of an order, if any.
    pub async fn settlement_for_order(&self, order_id: &str) -> DbResult<Option<OfflineSale>> {
        let sale = sqlx::query_as::<_, OfflineSale>(
            "SELECT id, order_id, staff_id, timestamp FROM offline_sales WHERE order_id = ?1",
        )
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(sale)
    }

    /// Everything a staff member rang up, oldest first.
    pub async fn settlements_by_staff(&self, staff_id: &str) -> DbResult<Vec<OfflineSale>> {
        let sales = sqlx::query_as::<_, OfflineSale>(
            r#"
            SELECT id, order_id, staff_id, timestamp
            FROM offline_sales
            WHERE staff_id = ?1
            ORDER BY timestamp, rowid
            "#,
        )
        .bind(staff_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(sales)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

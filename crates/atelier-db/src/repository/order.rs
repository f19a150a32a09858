//! # Orders
//!
//! Atomic order placement and order status transitions.
//!
//! ## place_order
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  normalize_lines (merge/reject duplicates, validate qty)   no I/O      │
//! │       │                                                                 │
//! │  BEGIN ────────────────────────────────────────────────────────────┐   │
//! │  │  for each line: reserve_in(variant, qty)     ← writes first, so  │   │
//! │  │       └── fails? return → tx dropped → ROLLBACK   the write lock │   │
//! │  │                                                   is taken up    │   │
//! │  │  customer / staff exist?                           front         │   │
//! │  │  for each line: load variant + product, price_line, snapshot     │   │
//! │  │  order_totals → total_amount, total_ngn                          │   │
//! │  │  INSERT orders, INSERT order_items                               │   │
//! │  COMMIT ───────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! If the caller drops the future mid-flight, sqlx rolls the transaction
//! back when it is dropped, so a half-reserved order is never visible.

use atelier_core::pricing::{normalize_lines, order_totals, price_line};
use atelier_core::status::{check_transition, TransitionPolicy};
use atelier_core::{
    CoreError, DuplicateLinePolicy, Order, OrderItem, OrderStatus, PlaceOrder, RateTable,
    ValidationError,
};
use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::repository::catalog::{load_product, load_variant};
use crate::repository::inventory::reserve_in;
use crate::repository::people::{customer_exists, staff_exists};
use crate::repository::settlement::has_offline_sale;

const ORDER_COLUMNS: &str = "id, customer_id, staff_id, status, currency, total_amount_minor, \
                             total_ngn, payment_method, created_at, updated_at";

const ITEM_COLUMNS: &str = "id, order_id, product_id, variant_id, name, image, category, color, \
                            size, quantity, currency, line_total_minor, created_at";

/// An order together with its line items.
#[derive(Debug, Clone)]
pub struct PlacedOrder {
    pub order: Order,
    pub items: Vec<OrderItem>,
}

pub(crate) async fn load_order(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Order>> {
    let order = sqlx::query_as::<_, Order>(&format!("SELECT {} FROM orders WHERE id = ?1", ORDER_COLUMNS))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(order)
}

// =============================================================================
// Order Assembler
// =============================================================================

/// Builds orders from requested lines in a single transaction.
#[derive(Debug, Clone)]
pub struct OrderAssembler {
    pool: SqlitePool,
    rates: RateTable,
    duplicate_lines: DuplicateLinePolicy,
}

impl OrderAssembler {
    pub fn new(pool: SqlitePool, rates: RateTable, duplicate_lines: DuplicateLinePolicy) -> Self {
        OrderAssembler {
            pool,
            rates,
            duplicate_lines,
        }
    }

    /// Reserves stock, prices every line and persists the order, all or
    /// nothing.
    ///
    /// ## Errors
    /// - `InsufficientStock` naming the first line that cannot be reserved
    /// - `UnknownVariant` / `UnknownProduct` / `UnknownCustomer` / `UnknownStaff`
    /// - `MissingRate` / `PriceUnavailable` when a line cannot be priced
    /// - `Validation` for empty, oversized or duplicate (under `Reject`) lines
    ///
    /// A `staff_id` only attributes the order. Recording the in-person
    /// settlement is a separate [`crate::SettlementRecorder`] call.
    pub async fn place_order(&self, request: &PlaceOrder) -> DbResult<PlacedOrder> {
        if request.customer_id.trim().is_empty() {
            return Err(ValidationError::Required {
                field: "customer_id".to_string(),
            }
            .into());
        }
        let lines = normalize_lines(&request.lines, self.duplicate_lines)?;

        let order_id = Uuid::new_v4().to_string();
        debug!(
            order_id = %order_id,
            customer_id = %request.customer_id,
            currency = %request.currency,
            lines = lines.len(),
            "Placing order"
        );

        let mut tx = self.pool.begin().await?;

        for line in &lines {
            reserve_in(&mut tx, &line.variant_id, line.quantity)
                .await
                .inspect_err(|e| {
                    warn!(
                        order_id = %order_id,
                        variant_id = %line.variant_id,
                        error = %e,
                        "Reservation failed, rolling back order"
                    )
                })?;
        }

        if !customer_exists(&mut tx, &request.customer_id).await? {
            return Err(CoreError::UnknownCustomer(request.customer_id.clone()).into());
        }
        if let Some(staff_id) = &request.staff_id {
            if !staff_exists(&mut tx, staff_id).await? {
                return Err(CoreError::UnknownStaff(staff_id.clone()).into());
            }
        }

        let now = Utc::now();
        let mut items = Vec::with_capacity(lines.len());
        for line in &lines {
            let variant = load_variant(&mut tx, &line.variant_id)
                .await?
                .ok_or_else(|| CoreError::UnknownVariant(line.variant_id.clone()))?;
            let product = load_product(&mut tx, &variant.product_id)
                .await?
                .ok_or_else(|| CoreError::UnknownProduct(variant.product_id.clone()))?;

            let line_total = price_line(&product, line.quantity, request.currency, &self.rates)?;
            items.push(OrderItem::snapshot(
                Uuid::new_v4().to_string(),
                &order_id,
                &product,
                &variant,
                line.quantity,
                line_total,
                now,
            ));
        }

        let line_totals: Vec<_> = items.iter().map(OrderItem::line_total).collect();
        let totals = order_totals(&line_totals, request.currency, &self.rates)?;

        let order = Order {
            id: order_id.clone(),
            customer_id: request.customer_id.clone(),
            staff_id: request.staff_id.clone(),
            status: OrderStatus::Processing,
            currency: request.currency,
            total_amount_minor: totals.total_amount.minor(),
            total_ngn: totals.total_ngn.minor(),
            payment_method: request.payment_method,
            created_at: now,
            updated_at: now,
        };

        insert_order(&mut tx, &order).await?;
        for item in &items {
            insert_item(&mut tx, item).await?;
        }

        tx.commit().await?;

        info!(
            order_id = %order.id,
            currency = %order.currency,
            total = %order.total_amount(),
            total_ngn = order.total_ngn,
            items = items.len(),
            "Order placed"
        );

        Ok(PlacedOrder { order, items })
    }
}

async fn insert_order(conn: &mut SqliteConnection, order: &Order) -> DbResult<()> {
    sqlx::query(&format!(
        "INSERT INTO orders ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        ORDER_COLUMNS
    ))
    .bind(&order.id)
    .bind(&order.customer_id)
    .bind(&order.staff_id)
    .bind(order.status)
    .bind(order.currency)
    .bind(order.total_amount_minor)
    .bind(order.total_ngn)
    .bind(order.payment_method)
    .bind(order.created_at)
    .bind(order.updated_at)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

async fn insert_item(conn: &mut SqliteConnection, item: &OrderItem) -> DbResult<()> {
    sqlx::query(&format!(
        "INSERT INTO order_items ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
        ITEM_COLUMNS
    ))
    .bind(&item.id)
    .bind(&item.order_id)
    .bind(&item.product_id)
    .bind(&item.variant_id)
    .bind(&item.name)
    .bind(&item.image)
    .bind(&item.category)
    .bind(&item.color)
    .bind(&item.size)
    .bind(item.quantity)
    .bind(item.currency)
    .bind(item.line_total_minor)
    .bind(item.created_at)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

// =============================================================================
// Order Repository
// =============================================================================

/// Order reads and status changes.
#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
}

impl OrderRepository {
    /// Creates a new OrderRepository.
    pub fn new(pool: SqlitePool) -> Self {
        OrderRepository { pool }
    }

    /// Gets an order by ID.
    pub async fn get_order(&self, id: &str) -> DbResult<Option<Order>> {
        let mut conn = self.pool.acquire().await?;
        load_order(&mut conn, id).await
    }

    /// Line items of an order, in insertion order.
    pub async fn get_items(&self, order_id: &str) -> DbResult<Vec<OrderItem>> {
        let items = sqlx::query_as::<_, OrderItem>(&format!(
            "SELECT {} FROM order_items WHERE order_id = ?1 ORDER BY rowid",
            ITEM_COLUMNS
        ))
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(items)
    }

    /// A customer's orders, newest first.
    pub async fn orders_for_customer(&self, customer_id: &str) -> DbResult<Vec<Order>> {
        let orders = sqlx::query_as::<_, Order>(&format!(
            "SELECT {} FROM orders WHERE customer_id = ?1 ORDER BY created_at DESC, rowid DESC",
            ORDER_COLUMNS
        ))
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(orders)
    }

    /// Moves an order to `to` if the transition table allows it.
    ///
    /// The write is a compare-and-swap on the status read just before, so a
    /// concurrent transition of the same order surfaces as
    /// `ConcurrentModification` instead of being overwritten.
    pub async fn advance_status(&self, order_id: &str, to: OrderStatus, policy: TransitionPolicy) -> DbResult<Order> {
        let mut conn = self.pool.acquire().await?;

        let mut order = load_order(&mut conn, order_id)
            .await?
            .ok_or_else(|| CoreError::UnknownOrder(order_id.to_string()))?;
        let offline = has_offline_sale(&mut conn, order_id).await?;
        drop(conn);

        check_transition(order_id, order.status, to, offline, policy)?;

        let now = self.compare_and_set_status(order_id, order.status, to).await?;

        info!(order_id = %order_id, from = %order.status, to = %to, "Order status changed");
        order.status = to;
        order.updated_at = now;
        Ok(order)
    }

    async fn compare_and_set_status(
        &self,
        order_id: &str,
        expected: OrderStatus,
        to: OrderStatus,
    ) -> DbResult<chrono::DateTime<Utc>> {
        let now = Utc::now();
        let result = sqlx::query("UPDATE orders SET status = ?3, updated_at = ?4 WHERE id = ?1 AND status = ?2")
            .bind(order_id)
            .bind(expected)
            .bind(to)
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(|e| DbError::from(e).for_entity("order", order_id))?;

        if result.rows_affected() == 0 {
            warn!(order_id = %order_id, expected = %expected, "Order status changed concurrently");
            return Err(DbError::Core(CoreError::conflict("order", order_id)));
        }
        Ok(now)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{self, Fixture};
    use atelier_core::currency::convert_money;
    use atelier_core::{Currency, Money, OrderLine, PaymentMethod};

    fn request(customer_id: &str, currency: Currency, lines: Vec<OrderLine>) -> PlaceOrder {
        PlaceOrder {
            customer_id: customer_id.to_string(),
            staff_id: None,
            currency,
            lines,
            payment_method: PaymentMethod::Card,
        }
    }

    #[tokio::test]
    async fn test_usd_order_converted_from_ngn_price() {
        let fx = Fixture::new().await;
        let customer = fx.customer().await;
        let product = fx.product(&[Money::from_minor(1000, Currency::Ngn)]).await;
        let v = fx.variant(&product, "Indigo", "M", 5).await;

        let placed = fx
            .assembler()
            .place_order(&request(&customer.id, Currency::Usd, vec![OrderLine::new(&v.id, 2)]))
            .await
            .unwrap();

        assert_eq!(placed.order.status, OrderStatus::Processing);
        assert_eq!(placed.order.currency, Currency::Usd);
        assert_eq!(placed.order.total_amount(), Money::from_minor(130, Currency::Usd));
        assert_eq!(placed.order.total_ngn, 2000);

        assert_eq!(placed.items.len(), 1);
        let item = &placed.items[0];
        assert_eq!(item.line_total(), Money::from_minor(130, Currency::Usd));
        assert_eq!(item.name, product.name);
        assert_eq!(item.color, "Indigo");
        assert_eq!(item.size, "M");
        assert_eq!(item.quantity, 2);

        assert_eq!(fx.db.inventory().stock(&v.id).await.unwrap(), 3);

        let stored = fx.db.orders().get_order(&placed.order.id).await.unwrap().unwrap();
        assert_eq!(stored.total_amount_minor, 130);
        assert_eq!(stored.payment_method, PaymentMethod::Card);
        let items = fx.db.orders().get_items(&placed.order.id).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].variant_id, v.id);
    }

    #[tokio::test]
    async fn test_totals_consistent_across_currencies() {
        let fx = Fixture::new().await;
        let customer = fx.customer().await;
        let a = fx
            .product(&[
                Money::from_minor(12_345, Currency::Ngn),
                Money::from_minor(799, Currency::Eur),
            ])
            .await;
        let b = fx.product(&[Money::from_minor(3_333, Currency::Ngn)]).await;
        let va = fx.variant(&a, "Gold", "S", 50).await;
        let vb = fx.variant(&b, "Teal", "XL", 50).await;
        let rates = testing::rates();

        for currency in [Currency::Ngn, Currency::Usd, Currency::Eur] {
            let placed = fx
                .assembler()
                .place_order(&request(
                    &customer.id,
                    currency,
                    vec![OrderLine::new(&va.id, 3), OrderLine::new(&vb.id, 7)],
                ))
                .await
                .unwrap();

            let items = fx.db.orders().get_items(&placed.order.id).await.unwrap();
            let sum: i64 = items.iter().map(|i| i.line_total_minor).sum();
            assert_eq!(sum, placed.order.total_amount_minor);
            assert!(items.iter().all(|i| i.currency == currency));

            let ngn_sum: i64 = items
                .iter()
                .map(|i| convert_money(i.line_total(), Currency::Ngn, &rates).unwrap().minor())
                .sum();
            assert!((ngn_sum - placed.order.total_ngn).abs() <= items.len() as i64);
        }
    }

    #[tokio::test]
    async fn test_listed_price_still_needs_rate_for_ngn_total() {
        let fx = Fixture::new().await;
        let customer = fx.customer().await;
        let product = fx
            .product(&[
                Money::from_minor(1000, Currency::Ngn),
                Money::from_minor(250, Currency::Gbp),
            ])
            .await;
        let v = fx.variant(&product, "Red", "M", 5).await;

        // GBP line prices from the list, but totalNGN needs a GBP rate
        let err = fx
            .assembler()
            .place_order(&request(&customer.id, Currency::Gbp, vec![OrderLine::new(&v.id, 2)]))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::MissingRate { .. })));
        assert_eq!(fx.db.inventory().stock(&v.id).await.unwrap(), 5);
    }

    #[tokio::test]
    async fn test_failure_on_last_line_rolls_back_everything() {
        let fx = Fixture::new().await;
        let customer = fx.customer().await;
        let product = fx.product(&[Money::from_minor(1000, Currency::Ngn)]).await;
        let v1 = fx.variant(&product, "Red", "S", 5).await;
        let v2 = fx.variant(&product, "Red", "M", 5).await;
        let v3 = fx.variant(&product, "Red", "L", 1).await;

        let err = fx
            .assembler()
            .place_order(&request(
                &customer.id,
                Currency::Ngn,
                vec![
                    OrderLine::new(&v1.id, 2),
                    OrderLine::new(&v2.id, 3),
                    OrderLine::new(&v3.id, 2),
                ],
            ))
            .await
            .unwrap_err();

        match err {
            DbError::Core(CoreError::InsufficientStock {
                variant_id,
                requested,
                available,
            }) => {
                assert_eq!(variant_id, v3.id);
                assert_eq!(requested, 2);
                assert_eq!(available, 1);
            }
            other => panic!("unexpected error: {other:?}"),
        }

        let ledger = fx.db.inventory();
        assert_eq!(ledger.stock(&v1.id).await.unwrap(), 5);
        assert_eq!(ledger.stock(&v2.id).await.unwrap(), 5);
        assert_eq!(ledger.stock(&v3.id).await.unwrap(), 1);
        assert!(fx.db.orders().orders_for_customer(&customer.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_variant_and_customer() {
        let fx = Fixture::new().await;
        let customer = fx.customer().await;
        let product = fx.product(&[Money::from_minor(1000, Currency::Ngn)]).await;
        let v = fx.variant(&product, "Red", "S", 5).await;

        let err = fx
            .assembler()
            .place_order(&request(
                &customer.id,
                Currency::Ngn,
                vec![OrderLine::new(&v.id, 1), OrderLine::new("ghost", 1)],
            ))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::UnknownVariant(ref id)) if id == "ghost"));

        let err = fx
            .assembler()
            .place_order(&request("nobody", Currency::Ngn, vec![OrderLine::new(&v.id, 1)]))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::UnknownCustomer(_))));

        assert_eq!(fx.db.inventory().stock(&v.id).await.unwrap(), 5);
    }

    #[tokio::test]
    async fn test_unknown_staff_rolls_back() {
        let fx = Fixture::new().await;
        let customer = fx.customer().await;
        let product = fx.product(&[Money::from_minor(1000, Currency::Ngn)]).await;
        let v = fx.variant(&product, "Red", "S", 5).await;

        let mut req = request(&customer.id, Currency::Ngn, vec![OrderLine::new(&v.id, 1)]);
        req.staff_id = Some("not-staff".to_string());
        let err = fx.assembler().place_order(&req).await.unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::UnknownStaff(_))));
        assert_eq!(fx.db.inventory().stock(&v.id).await.unwrap(), 5);
    }

    #[tokio::test]
    async fn test_duplicate_lines_merge_by_default() {
        let fx = Fixture::new().await;
        let customer = fx.customer().await;
        let product = fx.product(&[Money::from_minor(1500, Currency::Ngn)]).await;
        let v = fx.variant(&product, "Red", "S", 10).await;

        let placed = fx
            .assembler()
            .place_order(&request(
                &customer.id,
                Currency::Ngn,
                vec![OrderLine::new(&v.id, 1), OrderLine::new(&v.id, 2)],
            ))
            .await
            .unwrap();

        assert_eq!(placed.items.len(), 1);
        assert_eq!(placed.items[0].quantity, 3);
        assert_eq!(placed.order.total_amount_minor, 4500);
        assert_eq!(fx.db.inventory().stock(&v.id).await.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_duplicate_lines_rejected_under_reject_policy() {
        let fx = Fixture::new().await;
        let customer = fx.customer().await;
        let product = fx.product(&[Money::from_minor(1500, Currency::Ngn)]).await;
        let v = fx.variant(&product, "Red", "S", 10).await;

        let assembler = fx.db.assembler(testing::rates(), DuplicateLinePolicy::Reject);
        let err = assembler
            .place_order(&request(
                &customer.id,
                Currency::Ngn,
                vec![OrderLine::new(&v.id, 1), OrderLine::new(&v.id, 2)],
            ))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            DbError::Core(CoreError::Validation(ValidationError::Duplicate { .. }))
        ));
        assert_eq!(fx.db.inventory().stock(&v.id).await.unwrap(), 10);
    }

    #[tokio::test]
    async fn test_empty_order_rejected() {
        let fx = Fixture::new().await;
        let customer = fx.customer().await;
        let err = fx
            .assembler()
            .place_order(&request(&customer.id, Currency::Ngn, vec![]))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::Validation(_))));
    }

    #[tokio::test]
    async fn test_order_items_are_append_only() {
        let fx = Fixture::new().await;
        let customer = fx.customer().await;
        let product = fx.product(&[Money::from_minor(1000, Currency::Ngn)]).await;
        let v = fx.variant(&product, "Red", "S", 5).await;
        let placed = fx
            .assembler()
            .place_order(&request(&customer.id, Currency::Ngn, vec![OrderLine::new(&v.id, 1)]))
            .await
            .unwrap();

        let update = sqlx::query("UPDATE order_items SET quantity = 99 WHERE order_id = ?1")
            .bind(&placed.order.id)
            .execute(fx.db.pool())
            .await
            .map_err(DbError::from);
        assert!(matches!(update, Err(DbError::ConstraintViolation(_))));

        let delete = sqlx::query("DELETE FROM order_items WHERE order_id = ?1")
            .bind(&placed.order.id)
            .execute(fx.db.pool())
            .await;
        assert!(delete.is_err());

        let items = fx.db.orders().get_items(&placed.order.id).await.unwrap();
        assert_eq!(items[0].quantity, 1);
    }

    #[tokio::test]
    async fn test_catalog_edits_leave_placed_order_untouched() {
        let fx = Fixture::new().await;
        let customer = fx.customer().await;
        let product = fx.product(&[Money::from_minor(1000, Currency::Ngn)]).await;
        let v = fx.variant(&product, "Red", "S", 5).await;
        let placed = fx
            .assembler()
            .place_order(&request(&customer.id, Currency::Ngn, vec![OrderLine::new(&v.id, 2)]))
            .await
            .unwrap();

        fx.db.catalog().set_price(&product.id, Currency::Ngn, Some(4500)).await.unwrap();
        sqlx::query("UPDATE products SET name = ?2 WHERE id = ?1")
            .bind(&product.id)
            .bind("Aso Oke Kaftan")
            .execute(fx.db.pool())
            .await
            .unwrap();

        let items = fx.db.orders().get_items(&placed.order.id).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].name, "Adire Wrap Dress");
        assert_eq!(items[0].line_total_minor, 2000);

        let order = fx.db.orders().get_order(&placed.order.id).await.unwrap().unwrap();
        assert_eq!(order.total_amount_minor, 2000);
        assert_eq!(order.total_ngn, 2000);
    }

    #[tokio::test]
    async fn test_status_transitions() {
        let fx = Fixture::new().await;
        let customer = fx.customer().await;
        let product = fx.product(&[Money::from_minor(1000, Currency::Ngn)]).await;
        let v = fx.variant(&product, "Red", "S", 5).await;
        let placed = fx
            .assembler()
            .place_order(&request(&customer.id, Currency::Ngn, vec![OrderLine::new(&v.id, 1)]))
            .await
            .unwrap();
        let orders = fx.db.orders();
        let id = &placed.order.id;

        let err = orders
            .advance_status(id, OrderStatus::Delivered, TransitionPolicy::STRICT)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::InvalidStatusTransition { .. })));

        let shipped = orders
            .advance_status(id, OrderStatus::Shipped, TransitionPolicy::STRICT)
            .await
            .unwrap();
        assert_eq!(shipped.status, OrderStatus::Shipped);

        let delivered = orders
            .advance_status(id, OrderStatus::Delivered, TransitionPolicy::STRICT)
            .await
            .unwrap();
        assert_eq!(delivered.status, OrderStatus::Delivered);

        assert!(orders
            .advance_status(id, OrderStatus::Shipped, TransitionPolicy::STRICT)
            .await
            .is_err());
        assert!(matches!(
            orders.advance_status("missing", OrderStatus::Shipped, TransitionPolicy::STRICT).await,
            Err(DbError::Core(CoreError::UnknownOrder(_)))
        ));
    }

    #[tokio::test]
    async fn test_direct_fulfillment_for_offline_sale() {
        let fx = Fixture::new().await;
        let customer = fx.customer().await;
        let staff = fx.staff().await;
        let product = fx.product(&[Money::from_minor(1000, Currency::Ngn)]).await;
        let v = fx.variant(&product, "Red", "S", 5).await;

        let mut req = request(&customer.id, Currency::Ngn, vec![OrderLine::new(&v.id, 1)]);
        req.staff_id = Some(staff.id.clone());
        req.payment_method = PaymentMethod::Cash;
        let placed = fx.assembler().place_order(&req).await.unwrap();
        let orders = fx.db.orders();

        // Policy on, but no settlement yet
        assert!(orders
            .advance_status(&placed.order.id, OrderStatus::Delivered, TransitionPolicy::DIRECT_FULFILLMENT)
            .await
            .is_err());

        fx.db
            .settlements()
            .record_offline_sale(&placed.order.id, &staff.id, None)
            .await
            .unwrap();

        let delivered = orders
            .advance_status(&placed.order.id, OrderStatus::Delivered, TransitionPolicy::DIRECT_FULFILLMENT)
            .await
            .unwrap();
        assert_eq!(delivered.status, OrderStatus::Delivered);
    }

    #[tokio::test]
    async fn test_stale_status_write_is_a_conflict() {
        let fx = Fixture::new().await;
        let customer = fx.customer().await;
        let product = fx.product(&[Money::from_minor(1000, Currency::Ngn)]).await;
        let v = fx.variant(&product, "Red", "S", 5).await;
        let placed = fx
            .assembler()
            .place_order(&request(&customer.id, Currency::Ngn, vec![OrderLine::new(&v.id, 1)]))
            .await
            .unwrap();
        let orders = fx.db.orders();

        orders
            .advance_status(&placed.order.id, OrderStatus::Shipped, TransitionPolicy::STRICT)
            .await
            .unwrap();

        // A writer that still believes the order is Processing loses
        let err = orders
            .compare_and_set_status(&placed.order.id, OrderStatus::Processing, OrderStatus::Shipped)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::ConcurrentModification { .. })));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_orders_for_customer() {
        let fx = Fixture::new().await;
        let alice = fx.customer().await;
        let bola = fx.customer().await;
        let product = fx.product(&[Money::from_minor(1000, Currency::Ngn)]).await;
        let v = fx.variant(&product, "Red", "S", 10).await;

        for _ in 0..2 {
            fx.assembler()
                .place_order(&request(&alice.id, Currency::Ngn, vec![OrderLine::new(&v.id, 1)]))
                .await
                .unwrap();
        }
        fx.assembler()
            .place_order(&request(&bola.id, Currency::Usd, vec![OrderLine::new(&v.id, 1)]))
            .await
            .unwrap();

        assert_eq!(fx.db.orders().orders_for_customer(&alice.id).await.unwrap().len(), 2);
        let bolas = fx.db.orders().orders_for_customer(&bola.id).await.unwrap();
        assert_eq!(bolas.len(), 1);
        assert_eq!(bolas[0].currency, Currency::Usd);
    }

    #[tokio::test]
    async fn test_concurrent_orders_on_same_variant() {
        let fx = Fixture::on_disk().await;
        let customer = fx.customer().await;
        let product = fx.product(&[Money::from_minor(1000, Currency::Ngn)]).await;
        let v = fx.variant(&product, "Red", "S", 5).await;

        let req = request(&customer.id, Currency::Ngn, vec![OrderLine::new(&v.id, 3)]);
        let first = fx.assembler();
        let second = fx.assembler();
        let (a, b) = tokio::join!(first.place_order(&req), second.place_order(&req));

        let err = match (a, b) {
            (Ok(_), Err(e)) | (Err(e), Ok(_)) => e,
            other => panic!("expected exactly one order to succeed: {other:?}"),
        };
        match err {
            DbError::Core(CoreError::InsufficientStock {
                variant_id,
                requested,
                available,
            }) => {
                assert_eq!(variant_id, v.id);
                assert_eq!(requested, 3);
                assert_eq!(available, 2);
            }
            other => panic!("unexpected error: {other:?}"),
        }

        assert_eq!(fx.db.inventory().stock(&v.id).await.unwrap(), 2);
        assert_eq!(fx.db.orders().orders_for_customer(&customer.id).await.unwrap().len(), 1);
        fx.cleanup().await;
    }
}

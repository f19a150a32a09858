//! # Catalog Repository
//!
//! Products, their per-currency prices and their variants.
//!
//! ## Price Storage
//! ```text
//! products                      product_prices
//! ┌──────┬───────────┐          ┌──────┬──────────┬──────────────┐
//! │ id   │ name ...  │ 1 ─── n  │ p_id │ currency │ amount_minor │
//! ├──────┼───────────┤          ├──────┼──────────┼──────────────┤
//! │ P1   │ Agbada    │          │ P1   │ NGN      │ 45000        │
//! └──────┴───────────┘          │ P1   │ USD      │ 2999         │
//!                               └──────┴──────────┴──────────────┘
//! No EUR row → P1 sold in EUR by converting the NGN price.
//! ```
//!
//! Rating columns are never written here; see the rating aggregator.

use atelier_core::validation::{validate_initial_stock, validate_name, validate_price_minor};
use atelier_core::{CoreError, Currency, Money, PriceTable, Product, Variant};
use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};

/// Columns of `products` without the price map.
#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: String,
    name: String,
    category: String,
    image: Option<String>,
    average_rating: f64,
    rating_count: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ProductRow {
    fn into_product(self, prices: PriceTable) -> Product {
        Product {
            id: self.id,
            name: self.name,
            category: self.category,
            image: self.image,
            prices,
            average_rating: self.average_rating,
            rating_count: self.rating_count,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

const VARIANT_COLUMNS: &str = "id, product_id, color, size, stock, weight, created_at, updated_at";

// =============================================================================
// Connection-level helpers (usable inside a transaction)
// =============================================================================

/// Loads a product with its prices.
pub(crate) async fn load_product(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Product>> {
    let row = sqlx::query_as::<_, ProductRow>(
        r#"
        SELECT id, name, category, image, average_rating, rating_count, created_at, updated_at
        FROM products
        WHERE id = ?1
        "#,
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let prices: Vec<(Currency, i64)> =
        sqlx::query_as("SELECT currency, amount_minor FROM product_prices WHERE product_id = ?1")
            .bind(id)
            .fetch_all(&mut *conn)
            .await?;

    let mut table = PriceTable::new();
    for (currency, minor) in prices {
        table.set(currency, Some(Money::from_minor(minor, currency)));
    }

    Ok(Some(row.into_product(table)))
}

/// Loads a variant.
pub(crate) async fn load_variant(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Variant>> {
    let variant = sqlx::query_as::<_, Variant>(&format!(
        "SELECT {} FROM variants WHERE id = ?1",
        VARIANT_COLUMNS
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(variant)
}

/// True when a product row exists.
pub(crate) async fn product_exists(conn: &mut SqliteConnection, id: &str) -> DbResult<bool> {
    let found: Option<i64> = sqlx::query_scalar("SELECT 1 FROM products WHERE id = ?1")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(found.is_some())
}

// =============================================================================
// Catalog Repository
// =============================================================================

/// Repository for products, prices and variants.
#[derive(Debug, Clone)]
pub struct CatalogRepository {
    pool: SqlitePool,
}

impl CatalogRepository {
    /// Creates a new CatalogRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CatalogRepository { pool }
    }

    /// Inserts a product and its listed prices in one transaction.
    ///
    /// The rating fields of `product` are ignored: a new product always
    /// starts with an empty aggregate.
    pub async fn insert_product(&self, product: &Product) -> DbResult<()> {
        validate_name("name", &product.name)?;
        validate_name("category", &product.category)?;
        for price in product.prices.iter() {
            validate_price_minor(price.minor())?;
        }

        debug!(id = %product.id, name = %product.name, "Inserting product");

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO products (
                id, name, category, image,
                average_rating, rating_count, rating_version,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, 0, 0, 0, ?5, ?6)
            "#,
        )
        .bind(&product.id)
        .bind(&product.name)
        .bind(&product.category)
        .bind(&product.image)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| match DbError::from(e) {
            err if err.is_unique_on("products") => DbError::duplicate("product id", &product.id),
            err => err,
        })?;

        for price in product.prices.iter() {
            sqlx::query(
                "INSERT INTO product_prices (product_id, currency, amount_minor) VALUES (?1, ?2, ?3)",
            )
            .bind(&product.id)
            .bind(price.currency())
            .bind(price.minor())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        info!(id = %product.id, prices = product.prices.iter().count(), "Product created");
        Ok(())
    }

    /// Gets a product with its prices.
    pub async fn get_product(&self, id: &str) -> DbResult<Option<Product>> {
        let mut conn = self.pool.acquire().await?;
        load_product(&mut conn, id).await
    }

    /// Sets (`Some`) or clears (`None`) a product's price in one currency.
    pub async fn set_price(&self, product_id: &str, currency: Currency, amount_minor: Option<i64>) -> DbResult<()> {
        if let Some(minor) = amount_minor {
            validate_price_minor(minor)?;
        }

        let mut tx = self.pool.begin().await?;

        let touched = sqlx::query("UPDATE products SET updated_at = ?2 WHERE id = ?1")
            .bind(product_id)
            .bind(Utc::now())
            .execute(&mut *tx)
            .await
            .map_err(|e| DbError::from(e).for_entity("product", product_id))?;
        if touched.rows_affected() == 0 {
            return Err(CoreError::UnknownProduct(product_id.to_string()).into());
        }

        match amount_minor {
            Some(minor) => {
                sqlx::query(
                    r#"
                    INSERT INTO product_prices (product_id, currency, amount_minor)
                    VALUES (?1, ?2, ?3)
                    ON CONFLICT (product_id, currency) DO UPDATE SET amount_minor = excluded.amount_minor
                    "#,
                )
                .bind(product_id)
                .bind(currency)
                .bind(minor)
                .execute(&mut *tx)
                .await?;
            }
            None => {
                sqlx::query("DELETE FROM product_prices WHERE product_id = ?1 AND currency = ?2")
                    .bind(product_id)
                    .bind(currency)
                    .execute(&mut *tx)
                    .await?;
            }
        }

        tx.commit().await?;

        debug!(product_id = %product_id, %currency, amount_minor = ?amount_minor, "Price updated");
        Ok(())
    }

    /// Inserts a variant. `(product_id, color, size)` must be unique.
    pub async fn insert_variant(&self, variant: &Variant) -> DbResult<()> {
        validate_name("color", &variant.color)?;
        validate_name("size", &variant.size)?;
        validate_initial_stock(variant.stock)?;

        debug!(
            id = %variant.id,
            product_id = %variant.product_id,
            color = %variant.color,
            size = %variant.size,
            stock = variant.stock,
            "Inserting variant"
        );

        sqlx::query(&format!(
            "INSERT INTO variants ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            VARIANT_COLUMNS
        ))
        .bind(&variant.id)
        .bind(&variant.product_id)
        .bind(&variant.color)
        .bind(&variant.size)
        .bind(variant.stock)
        .bind(variant.weight)
        .bind(variant.created_at)
        .bind(variant.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::ForeignKeyViolation { .. } => {
                DbError::Core(CoreError::UnknownProduct(variant.product_id.clone()))
            }
            err if err.is_unique_on("variants") => DbError::duplicate(
                "variant",
                format!("{}/{}/{}", variant.product_id, variant.color, variant.size),
            ),
            err => err,
        })?;

        Ok(())
    }

    /// Gets a variant by ID.
    pub async fn get_variant(&self, id: &str) -> DbResult<Option<Variant>> {
        let mut conn = self.pool.acquire().await?;
        load_variant(&mut conn, id).await
    }

    /// All variants of a product, by color then size.
    pub async fn variants_for(&self, product_id: &str) -> DbResult<Vec<Variant>> {
        let variants = sqlx::query_as::<_, Variant>(&format!(
            "SELECT {} FROM variants WHERE product_id = ?1 ORDER BY color, size",
            VARIANT_COLUMNS
        ))
        .bind(product_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(variants)
    }

    /// Counts products.
    pub async fn count_products(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use crate::testing::{self, Fixture};
    use atelier_core::{CoreError, Currency, Money};

    use crate::error::DbError;

    #[tokio::test]
    async fn test_product_round_trip_with_prices() {
        let fx = Fixture::new().await;
        let product = fx
            .product(&[
                Money::from_minor(45000, Currency::Ngn),
                Money::from_minor(2999, Currency::Usd),
            ])
            .await;

        let loaded = fx.db.catalog().get_product(&product.id).await.unwrap().unwrap();
        assert_eq!(loaded.name, product.name);
        assert_eq!(loaded.prices.get(Currency::Ngn), Some(Money::from_minor(45000, Currency::Ngn)));
        assert_eq!(loaded.prices.get(Currency::Usd), Some(Money::from_minor(2999, Currency::Usd)));
        assert_eq!(loaded.prices.get(Currency::Eur), None);
        assert_eq!(loaded.rating_count, 0);
        assert_eq!(loaded.average_rating, 0.0);
    }

    #[tokio::test]
    async fn test_set_and_clear_price() {
        let fx = Fixture::new().await;
        let product = fx.product(&[Money::from_minor(1000, Currency::Ngn)]).await;
        let catalog = fx.db.catalog();

        catalog.set_price(&product.id, Currency::Gbp, Some(150)).await.unwrap();
        catalog.set_price(&product.id, Currency::Gbp, Some(175)).await.unwrap();
        let loaded = catalog.get_product(&product.id).await.unwrap().unwrap();
        assert_eq!(loaded.prices.get(Currency::Gbp), Some(Money::from_minor(175, Currency::Gbp)));

        catalog.set_price(&product.id, Currency::Gbp, None).await.unwrap();
        let loaded = catalog.get_product(&product.id).await.unwrap().unwrap();
        assert_eq!(loaded.prices.get(Currency::Gbp), None);
    }

    #[tokio::test]
    async fn test_set_price_unknown_product() {
        let fx = Fixture::new().await;
        let err = fx
            .db
            .catalog()
            .set_price("missing", Currency::Usd, Some(100))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::UnknownProduct(_))));
    }

    #[tokio::test]
    async fn test_variant_uniqueness_and_listing() {
        let fx = Fixture::new().await;
        let product = fx.product(&[Money::from_minor(1000, Currency::Ngn)]).await;
        fx.variant(&product, "Red", "M", 3).await;
        fx.variant(&product, "Blue", "M", 1).await;

        let dup = testing::variant_record(&product.id, "Red", "M", 9);
        let err = fx.db.catalog().insert_variant(&dup).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));

        let variants = fx.db.catalog().variants_for(&product.id).await.unwrap();
        let colors: Vec<_> = variants.iter().map(|v| v.color.as_str()).collect();
        assert_eq!(colors, vec!["Blue", "Red"]);
    }

    #[tokio::test]
    async fn test_variant_for_unknown_product() {
        let fx = Fixture::new().await;
        let orphan = testing::variant_record("missing", "Red", "M", 1);
        let err = fx.db.catalog().insert_variant(&orphan).await.unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::UnknownProduct(_))));
    }

    #[tokio::test]
    async fn test_negative_initial_stock_rejected() {
        let fx = Fixture::new().await;
        let product = fx.product(&[Money::from_minor(1000, Currency::Ngn)]).await;
        let bad = testing::variant_record(&product.id, "Red", "M", -1);
        assert!(fx.db.catalog().insert_variant(&bad).await.is_err());
    }

    #[tokio::test]
    async fn test_count_products() {
        let fx = Fixture::new().await;
        assert_eq!(fx.db.catalog().count_products().await.unwrap(), 0);
        fx.product(&[Money::from_minor(1000, Currency::Ngn)]).await;
        fx.product(&[]).await;
        assert_eq!(fx.db.catalog().count_products().await.unwrap(), 2);
    }
}

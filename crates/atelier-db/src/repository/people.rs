//! # People Repository
//!
//! Customers, staff and customer wishlists.
//!
//! Staff carry two independent authorization dimensions: `job_roles`
//! (multi-valued duties, stored as a JSON array) and `access` (one coarse
//! privilege tier).

use atelier_core::validation::{validate_email, validate_name};
use atelier_core::{AccessLevel, CoreError, Customer, JobRole, Staff, WishlistItem};
use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::repository::catalog::product_exists;

pub(crate) async fn customer_exists(conn: &mut SqliteConnection, id: &str) -> DbResult<bool> {
    let found: Option<i64> = sqlx::query_scalar("SELECT 1 FROM customers WHERE id = ?1")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(found.is_some())
}

pub(crate) async fn staff_exists(conn: &mut SqliteConnection, id: &str) -> DbResult<bool> {
    let found: Option<i64> = sqlx::query_scalar("SELECT 1 FROM staff WHERE id = ?1")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(found.is_some())
}

#[derive(Debug, sqlx::FromRow)]
struct StaffRow {
    id: String,
    name: String,
    email: String,
    job_roles: String,
    access: AccessLevel,
    created_at: DateTime<Utc>,
}

impl TryFrom<StaffRow> for Staff {
    type Error = DbError;

    fn try_from(row: StaffRow) -> Result<Self, Self::Error> {
        let job_roles: Vec<JobRole> =
            serde_json::from_str(&row.job_roles).map_err(|e| DbError::decode("staff.job_roles", e))?;
        Ok(Staff {
            id: row.id,
            name: row.name,
            email: row.email,
            job_roles,
            access: row.access,
            created_at: row.created_at,
        })
    }
}

/// Repository for customers, staff and wishlists.
#[derive(Debug, Clone)]
pub struct PeopleRepository {
    pool: SqlitePool,
}

impl PeopleRepository {
    /// Creates a new PeopleRepository.
    pub fn new(pool: SqlitePool) -> Self {
        PeopleRepository { pool }
    }

    // =========================================================================
    // Customers
    // =========================================================================

    pub async fn insert_customer(&self, customer: &Customer) -> DbResult<()> {
        validate_name("name", &customer.name)?;
        validate_email(&customer.email)?;

        debug!(id = %customer.id, "Inserting customer");

        sqlx::query("INSERT INTO customers (id, name, email, created_at) VALUES (?1, ?2, ?3, ?4)")
            .bind(&customer.id)
            .bind(&customer.name)
            .bind(&customer.email)
            .bind(customer.created_at)
            .execute(&self.pool)
            .await
            .map_err(|e| match DbError::from(e) {
                err if err.is_unique_on("customers") => DbError::duplicate("email", &customer.email),
                err => err,
            })?;

        Ok(())
    }

    pub async fn get_customer(&self, id: &str) -> DbResult<Option<Customer>> {
        let customer = sqlx::query_as::<_, Customer>(
            "SELECT id, name, email, created_at FROM customers WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(customer)
    }

    // =========================================================================
    // Staff
    // =========================================================================

    pub async fn insert_staff(&self, staff: &Staff) -> DbResult<()> {
        validate_name("name", &staff.name)?;
        validate_email(&staff.email)?;

        let job_roles = serde_json::to_string(&staff.job_roles).map_err(|e| DbError::Internal(e.to_string()))?;

        debug!(id = %staff.id, access = ?staff.access, roles = %job_roles, "Inserting staff member");

        sqlx::query(
            r#"
            INSERT INTO staff (id, name, email, job_roles, access, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&staff.id)
        .bind(&staff.name)
        .bind(&staff.email)
        .bind(&job_roles)
        .bind(staff.access)
        .bind(staff.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            err if err.is_unique_on("staff") => DbError::duplicate("email", &staff.email),
            err => err,
        })?;

        Ok(())
    }

    pub async fn get_staff(&self, id: &str) -> DbResult<Option<Staff>> {
        let row = sqlx::query_as::<_, StaffRow>(
            "SELECT id, name, email, job_roles, access, created_at FROM staff WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Staff::try_from).transpose()
    }

    // =========================================================================
    // Wishlist
    // =========================================================================

    /// Adds a product to a customer's wishlist. Adding twice returns the
    /// existing entry.
    pub async fn add_to_wishlist(&self, customer_id: &str, product_id: &str) -> DbResult<WishlistItem> {
        let inserted = sqlx::query(
            r#"
            INSERT INTO wishlist_items (id, customer_id, product_id, created_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT (customer_id, product_id) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(customer_id)
        .bind(product_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await;

        match inserted.map_err(DbError::from) {
            Ok(result) if result.rows_affected() == 1 => {
                info!(customer_id = %customer_id, product_id = %product_id, "Added to wishlist");
            }
            Ok(_) => {}
            Err(DbError::ForeignKeyViolation { .. }) => {
                let mut conn = self.pool.acquire().await?;
                if !customer_exists(&mut conn, customer_id).await? {
                    return Err(CoreError::UnknownCustomer(customer_id.to_string()).into());
                }
                if !product_exists(&mut conn, product_id).await? {
                    return Err(CoreError::UnknownProduct(product_id.to_string()).into());
                }
                return Err(DbError::ForeignKeyViolation {
                    message: "wishlist item".to_string(),
                });
            }
            Err(err) => return Err(err),
        }

        let item = sqlx::query_as::<_, WishlistItem>(
            r#"
            SELECT id, customer_id, product_id, created_at
            FROM wishlist_items
            WHERE customer_id = ?1 AND product_id = ?2
            "#,
        )
        .bind(customer_id)
        .bind(product_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(item)
    }

    /// Removes a product from a wishlist. Returns whether it was there.
    pub async fn remove_from_wishlist(&self, customer_id: &str, product_id: &str) -> DbResult<bool> {
        let result = sqlx::query("DELETE FROM wishlist_items WHERE customer_id = ?1 AND product_id = ?2")
            .bind(customer_id)
            .bind(product_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// A customer's wishlist, oldest entry first.
    pub async fn wishlist(&self, customer_id: &str) -> DbResult<Vec<WishlistItem>> {
        let items = sqlx::query_as::<_, WishlistItem>(
            r#"
            SELECT id, customer_id, product_id, created_at
            FROM wishlist_items
            WHERE customer_id = ?1
            ORDER BY created_at, rowid
            "#,
        )
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(items)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use crate::error::DbError;
    use crate::testing::{self, Fixture};
    use atelier_core::{AccessLevel, CoreError, Currency, JobRole, Money};

    #[tokio::test]
    async fn test_customer_round_trip_and_unique_email() {
        let fx = Fixture::new().await;
        let customer = fx.customer().await;
        let loaded = fx.db.people().get_customer(&customer.id).await.unwrap().unwrap();
        assert_eq!(loaded.email, customer.email);

        let mut twin = testing::customer_record("Twin");
        twin.email = customer.email.clone();
        let err = fx.db.people().insert_customer(&twin).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));

        assert!(fx.db.people().get_customer("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_invalid_customer_rejected() {
        let fx = Fixture::new().await;
        let mut bad = testing::customer_record("Ada");
        bad.email = "not-an-email".to_string();
        assert!(matches!(
            fx.db.people().insert_customer(&bad).await,
            Err(DbError::Core(CoreError::Validation(_)))
        ));
    }

    #[tokio::test]
    async fn test_staff_roles_and_access_round_trip() {
        let fx = Fixture::new().await;
        let mut staff = testing::staff_record("Chidi");
        staff.job_roles = vec![JobRole::Cashier, JobRole::StockKeeper];
        staff.access = AccessLevel::Manager;
        fx.db.people().insert_staff(&staff).await.unwrap();

        let loaded = fx.db.people().get_staff(&staff.id).await.unwrap().unwrap();
        assert_eq!(loaded.job_roles, vec![JobRole::Cashier, JobRole::StockKeeper]);
        assert_eq!(loaded.access, AccessLevel::Manager);
        assert!(loaded.has_role(JobRole::Cashier));
        assert!(!loaded.has_role(JobRole::StoreManager));
    }

    #[tokio::test]
    async fn test_wishlist_is_idempotent() {
        let fx = Fixture::new().await;
        let customer = fx.customer().await;
        let a = fx.product(&[Money::from_minor(1000, Currency::Ngn)]).await;
        let b = fx.product(&[Money::from_minor(2000, Currency::Ngn)]).await;
        let people = fx.db.people();

        let first = people.add_to_wishlist(&customer.id, &a.id).await.unwrap();
        let again = people.add_to_wishlist(&customer.id, &a.id).await.unwrap();
        assert_eq!(first.id, again.id);
        people.add_to_wishlist(&customer.id, &b.id).await.unwrap();

        let list = people.wishlist(&customer.id).await.unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].product_id, a.id);

        assert!(people.remove_from_wishlist(&customer.id, &a.id).await.unwrap());
        assert!(!people.remove_from_wishlist(&customer.id, &a.id).await.unwrap());
        assert_eq!(people.wishlist(&customer.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_wishlist_unknown_references() {
        let fx = Fixture::new().await;
        let customer = fx.customer().await;
        let product = fx.product(&[]).await;
        let people = fx.db.people();

        assert!(matches!(
            people.add_to_wishlist("ghost", &product.id).await,
            Err(DbError::Core(CoreError::UnknownCustomer(_)))
        ));
        assert!(matches!(
            people.add_to_wishlist(&customer.id, "ghost").await,
            Err(DbError::Core(CoreError::UnknownProduct(_)))
        ));
    }
}

//! # Rating Aggregator
//!
//! Review writes and the product rating aggregate they drive.
//!
//! ## Transaction Shape
//! ```text
//! BEGIN
//!   1. write the review row          (INSERT / UPDATE ... RETURNING / DELETE ... RETURNING)
//!                                    first statement is a write, so the
//!                                    transaction holds the database write lock
//!   2. SELECT average_rating, rating_count, rating_version FROM products
//!   3. RatingSummary::with_created / with_updated / with_deleted
//!   4. UPDATE products SET ..., rating_version = version + 1
//!      WHERE id = ? AND rating_version = version
//!        └── 0 rows → ConcurrentModification("product")
//! COMMIT
//! ```
//!
//! The review row and the aggregate commit together or not at all.

use atelier_core::rating::RatingSummary;
use atelier_core::validation::{validate_comment, validate_rating};
use atelier_core::{CoreError, CoreResult, Review, ValidationError};
use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::repository::catalog::product_exists;
use crate::repository::people::customer_exists;

const REVIEW_COLUMNS: &str = "id, product_id, customer_id, rating, comment, created_at, updated_at";

/// Input for a new review.
#[derive(Debug, Clone)]
pub struct NewReview {
    pub product_id: String,
    pub customer_id: String,
    pub rating: i64,
    pub comment: Option<String>,
}

#[derive(Debug, sqlx::FromRow)]
struct AggregateRow {
    average_rating: f64,
    rating_count: i64,
    rating_version: i64,
}

/// Reads a product's aggregate, applies `change` and writes it back guarded
/// by `rating_version`.
async fn apply_to_product<F>(conn: &mut SqliteConnection, product_id: &str, change: F) -> DbResult<RatingSummary>
where
    F: FnOnce(RatingSummary) -> CoreResult<RatingSummary>,
{
    let row = sqlx::query_as::<_, AggregateRow>(
        "SELECT average_rating, rating_count, rating_version FROM products WHERE id = ?1",
    )
    .bind(product_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| CoreError::UnknownProduct(product_id.to_string()))?;

    let next = change(RatingSummary::new(row.average_rating, row.rating_count))?;
    write_summary(conn, product_id, next, row.rating_version).await?;
    Ok(next)
}

async fn write_summary(
    conn: &mut SqliteConnection,
    product_id: &str,
    summary: RatingSummary,
    expected_version: i64,
) -> DbResult<()> {
    let result = sqlx::query(
        r#"
        UPDATE products
        SET average_rating = ?2,
            rating_count = ?3,
            rating_version = rating_version + 1,
            updated_at = ?4
        WHERE id = ?1 AND rating_version = ?5
        "#,
    )
    .bind(product_id)
    .bind(summary.average)
    .bind(summary.count)
    .bind(Utc::now())
    .bind(expected_version)
    .execute(&mut *conn)
    .await
    .map_err(|e| DbError::from(e).for_entity("product", product_id))?;

    if result.rows_affected() == 0 {
        warn!(product_id = %product_id, expected_version, "Rating aggregate changed underneath us");
        return Err(CoreError::conflict("product", product_id).into());
    }

    debug!(
        product_id = %product_id,
        average = summary.average,
        count = summary.count,
        "Rating aggregate written"
    );
    Ok(())
}

/// Review writes with transactional rating maintenance.
#[derive(Debug, Clone)]
pub struct RatingAggregator {
    pool: SqlitePool,
}

impl RatingAggregator {
    /// Creates a new RatingAggregator.
    pub fn new(pool: SqlitePool) -> Self {
        RatingAggregator { pool }
    }

    /// Creates a review and folds its rating into the product aggregate.
    ///
    /// A customer may review a product once; the second attempt fails with
    /// `DuplicateReview` and changes nothing.
    pub async fn create_review(&self, input: &NewReview) -> DbResult<Review> {
        validate_rating(input.rating)?;
        validate_comment(input.comment.as_deref())?;

        let now = Utc::now();
        let review = Review {
            id: Uuid::new_v4().to_string(),
            product_id: input.product_id.clone(),
            customer_id: input.customer_id.clone(),
            rating: input.rating,
            comment: input.comment.clone(),
            created_at: now,
            updated_at: now,
        };

        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query(&format!(
            "INSERT INTO reviews ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            REVIEW_COLUMNS
        ))
        .bind(&review.id)
        .bind(&review.product_id)
        .bind(&review.customer_id)
        .bind(review.rating)
        .bind(&review.comment)
        .bind(review.created_at)
        .bind(review.updated_at)
        .execute(&mut *tx)
        .await;

        if let Err(e) = inserted {
            return Err(match DbError::from(e).for_entity("product", &review.product_id) {
                err if err.is_unique_on("reviews") => DbError::Core(CoreError::DuplicateReview {
                    product_id: review.product_id.clone(),
                    customer_id: review.customer_id.clone(),
                }),
                DbError::ForeignKeyViolation { message } => {
                    if !product_exists(&mut tx, &review.product_id).await? {
                        CoreError::UnknownProduct(review.product_id.clone()).into()
                    } else if !customer_exists(&mut tx, &review.customer_id).await? {
                        CoreError::UnknownCustomer(review.customer_id.clone()).into()
                    } else {
                        DbError::ForeignKeyViolation { message }
                    }
                }
                err => err,
            });
        }

        let summary = apply_to_product(&mut tx, &review.product_id, |s| s.with_created(review.rating)).await?;

        tx.commit().await?;

        info!(
            review_id = %review.id,
            product_id = %review.product_id,
            rating = review.rating,
            average = summary.average,
            count = summary.count,
            "Review created"
        );
        Ok(review)
    }

    /// Changes a review's rating and comment.
    pub async fn update_review(&self, review_id: &str, rating: i64, comment: Option<&str>) -> DbResult<Review> {
        validate_rating(rating)?;
        validate_comment(comment)?;

        let mut tx = self.pool.begin().await?;

        // Touch first: takes the write lock and hands back the old rating
        let (product_id, old_rating): (String, i64) = sqlx::query_as(
            "UPDATE reviews SET updated_at = ?2 WHERE id = ?1 RETURNING product_id, rating",
        )
        .bind(review_id)
        .bind(Utc::now())
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| DbError::from(e).for_entity("review", review_id))?
        .ok_or_else(|| CoreError::UnknownReview(review_id.to_string()))?;

        let review = sqlx::query_as::<_, Review>(&format!(
            "UPDATE reviews SET rating = ?2, comment = ?3 WHERE id = ?1 RETURNING {}",
            REVIEW_COLUMNS
        ))
        .bind(review_id)
        .bind(rating)
        .bind(comment)
        .fetch_one(&mut *tx)
        .await?;

        let summary = apply_to_product(&mut tx, &product_id, |s| s.with_updated(old_rating, rating)).await?;

        tx.commit().await?;

        info!(
            review_id = %review_id,
            product_id = %product_id,
            old_rating,
            new_rating = rating,
            average = summary.average,
            "Review updated"
        );
        Ok(review)
    }

    /// Deletes a review and takes its rating out of the aggregate.
    pub async fn delete_review(&self, review_id: &str) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;

        let (product_id, rating): (String, i64) =
            sqlx::query_as("DELETE FROM reviews WHERE id = ?1 RETURNING product_id, rating")
                .bind(review_id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(|e| DbError::from(e).for_entity("review", review_id))?
                .ok_or_else(|| CoreError::UnknownReview(review_id.to_string()))?;

        let summary = apply_to_product(&mut tx, &product_id, |s| s.with_deleted(rating)).await?;

        tx.commit().await?;

        info!(
            review_id = %review_id,
            product_id = %product_id,
            average = summary.average,
            count = summary.count,
            "Review deleted"
        );
        Ok(())
    }

    /// Rebuilds a product's aggregate from its review rows.
    pub async fn recompute_rating(&self, product_id: &str) -> DbResult<RatingSummary> {
        let mut tx = self.pool.begin().await?;

        let version: i64 = sqlx::query_scalar(
            "UPDATE products SET updated_at = ?2 WHERE id = ?1 RETURNING rating_version",
        )
        .bind(product_id)
        .bind(Utc::now())
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| DbError::from(e).for_entity("product", product_id))?
        .ok_or_else(|| CoreError::UnknownProduct(product_id.to_string()))?;

        let ratings: Vec<i64> = sqlx::query_scalar("SELECT rating FROM reviews WHERE product_id = ?1")
            .bind(product_id)
            .fetch_all(&mut *tx)
            .await?;

        let summary = RatingSummary::from_ratings(ratings)?;
        write_summary(&mut tx, product_id, summary, version).await?;

        tx.commit().await?;

        info!(product_id = %product_id, average = summary.average, count = summary.count, "Rating recomputed");
        Ok(summary)
    }

    /// The stored aggregate of a product.
    pub async fn summary_for(&self, product_id: &str) -> DbResult<RatingSummary> {
        let (average, count): (f64, i64) =
            sqlx::query_as("SELECT average_rating, rating_count FROM products WHERE id = ?1")
                .bind(product_id)
                .fetch_optional(&self.pool)
                .await?
                .ok_or_else(|| CoreError::UnknownProduct(product_id.to_string()))?;
        Ok(RatingSummary::new(average, count))
    }

    /// Gets a review by ID.
    pub async fn get_review(&self, id: &str) -> DbResult<Option<Review>> {
        let review = sqlx::query_as::<_, Review>(&format!("SELECT {} FROM reviews WHERE id = ?1", REVIEW_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(review)
    }

    /// Reviews of a product, oldest first.
    pub async fn reviews_for(&self, product_id: &str) -> DbResult<Vec<Review>> {
        if product_id.trim().is_empty() {
            return Err(ValidationError::Required {
                field: "product_id".to_string(),
            }
            .into());
        }

        let reviews = sqlx::query_as::<_, Review>(&format!(
            "SELECT {} FROM reviews WHERE product_id = ?1 ORDER BY created_at, rowid",
            REVIEW_COLUMNS
        ))
        .bind(product_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(reviews)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

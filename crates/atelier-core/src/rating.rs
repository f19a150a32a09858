//! # Rating Aggregate
//!
//! Running average and count of a product's reviews.
//!
//! ## Update Rules
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  create(r):  count + 1,  avg = (avg·count + r) / (count + 1)            │
//! │  update(o→n): count,     avg = avg + (n - o) / count                    │
//! │  delete(r):  count - 1,  avg = (avg·count - r) / (count - 1)            │
//! │              count 0 →   avg = 0.0                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Ratings are integers 1..=5, so `avg·count` is always a whole number. Every
//! rule first rebuilds that integer sum and divides once, which keeps a
//! create followed by a delete bit-exact instead of accumulating float error.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::validation::validate_rating;

/// Average and count of a product's ratings.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct RatingSummary {
    pub average: f64,
    pub count: i64,
}

impl RatingSummary {
    /// The neutral aggregate of a product with no reviews.
    pub const EMPTY: RatingSummary = RatingSummary {
        average: 0.0,
        count: 0,
    };

    pub fn new(average: f64, count: i64) -> Self {
        RatingSummary { average, count }
    }

    /// Builds the aggregate straight from a list of ratings.
    ///
    /// ```rust
    /// use atelier_core::rating::RatingSummary;
    ///
    /// let summary = RatingSummary::from_ratings([4, 2, 3]).unwrap();
    /// assert_eq!(summary.count, 3);
    /// assert_eq!(summary.average, 3.0);
    /// ```
    pub fn from_ratings(ratings: impl IntoIterator<Item = i64>) -> CoreResult<Self> {
        let mut sum = 0i64;
        let mut count = 0i64;
        for rating in ratings {
            validate_rating(rating)?;
            sum += rating;
            count += 1;
        }
        Ok(Self::from_sum(sum, count))
    }

    /// Aggregate after a new review.
    pub fn with_created(&self, rating: i64) -> CoreResult<Self> {
        validate_rating(rating)?;
        Ok(Self::from_sum(self.sum() + rating, self.count + 1))
    }

    /// Aggregate after a review changed its rating.
    pub fn with_updated(&self, old_rating: i64, new_rating: i64) -> CoreResult<Self> {
        validate_rating(old_rating)?;
        validate_rating(new_rating)?;
        if self.count == 0 {
            return Err(CoreError::RatingAggregateEmpty);
        }
        Ok(Self::from_sum(self.sum() - old_rating + new_rating, self.count))
    }

    /// Aggregate after a review was removed.
    pub fn with_deleted(&self, rating: i64) -> CoreResult<Self> {
        validate_rating(rating)?;
        if self.count == 0 {
            return Err(CoreError::RatingAggregateEmpty);
        }
        Ok(Self::from_sum(self.sum() - rating, self.count - 1))
    }

    fn sum(&self) -> i64 {
        (self.average * self.count as f64).round() as i64
    }

    fn from_sum(sum: i64, count: i64) -> Self {
        if count == 0 {
            return Self::EMPTY;
        }
        RatingSummary {
            average: sum as f64 / count as f64,
            count,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

//! # atelier-db: Persistence for the Atelier Back Office
//!
//! SQLite storage (via sqlx) for the catalog, stock, orders, settlements and
//! reviews. Every multi-row write in the system is one transaction in here.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Atelier Data Flow                                │
//! │                                                                         │
//! │  Storefront / POS / back office (external)                             │
//! │       │  PlaceOrder, record_offline_sale, create_review, ...           │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    atelier-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌──────────────────┐   ┌──────────────┐ │   │
//! │  │   │   Database    │    │   Repositories   │   │  Migrations  │ │   │
//! │  │   │   (pool.rs)   │    │                  │   │  (embedded)  │ │   │
//! │  │   │               │    │ InventoryLedger  │   │              │ │   │
//! │  │   │ SqlitePool    │◄───│ OrderAssembler   │   │ 001_initial  │ │   │
//! │  │   │ WAL, FKs on   │    │ SettlementRec.   │   │   _schema    │ │   │
//! │  │   │ busy_timeout  │    │ RatingAggregator │   │              │ │   │
//! │  │   └───────────────┘    └────────┬─────────┘   └──────────────┘ │   │
//! │  │                                 │ pure rules                   │   │
//! │  │                                 ▼                              │   │
//! │  │                 atelier-core (money, rates, status, ratings)   │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite database file (atelier.db)                                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`config`] - `atelier.toml` plus environment overrides
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Catalog, inventory, orders, settlements, reviews, people
//!
//! ## Usage
//!
//! ```rust,ignore
//! use atelier_db::{AtelierConfig, Database};
//!
//! let config = AtelierConfig::load(None)?;
//! let db = Database::new(config.db_config()).await?;
//!
//! let placed = db
//!     .assembler(config.rates().clone(), config.orders.duplicate_lines)
//!     .place_order(&request)
//!     .await?;
//! db.settlements().record_offline_sale(&placed.order.id, &staff_id, None).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

#[cfg(test)]
mod testing;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::AtelierConfig;
pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

pub use repository::{
    CatalogRepository, InventoryLedger, NewReview, OrderAssembler, OrderRepository, PeopleRepository, PlacedOrder,
    RatingAggregator, SettlementRecorder,
};

//! # Repository Module
//!
//! One repository per entity group, each owning its SQL.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repositories and Transactions                        │
//! │                                                                         │
//! │  Caller                                                                │
//! │       │  db.assembler(rates, policy).place_order(request)              │
//! │       ▼                                                                 │
//! │  OrderAssembler ──── one sqlx Transaction ─────────────────────────┐   │
//! │  │  ├── inventory::reserve_in(tx, ...)   (CAS UPDATE on stock)     │   │
//! │  │  ├── catalog::load_product(tx, ...)                              │   │
//! │  │  ├── pricing::price_line / order_totals   (atelier-core, pure)  │   │
//! │  │  └── INSERT orders + order_items                                 │   │
//! │  └── commit ─── or drop → rollback ────────────────────────────────┘   │
//! │                                                                         │
//! │  The `*_in` helpers take `&mut SqliteConnection` so the same SQL runs  │
//! │  standalone (pool connection) or inside a caller's transaction.        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`CatalogRepository`] - Products, per-currency prices, variants
//! - [`InventoryLedger`] - Stock reserve / release / restock
//! - [`OrderAssembler`] - Atomic order placement
//! - [`OrderRepository`] - Order reads and status transitions
//! - [`SettlementRecorder`] - Offline (in-person) sales
//! - [`RatingAggregator`] - Review writes and product rating aggregates
//! - [`PeopleRepository`] - Customers, staff, wishlists

pub mod catalog;
pub mod inventory;
pub mod order;
pub mod people;
pub mod review;
pub mod settlement;

pub use catalog::CatalogRepository;
pub use inventory::InventoryLedger;
pub use order::{OrderAssembler, OrderRepository, PlacedOrder};
pub use people::PeopleRepository;
pub use review::{NewReview, RatingAggregator};
pub use settlement::SettlementRecorder;

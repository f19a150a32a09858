//! # Database Error Types
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  SQLite Error (sqlx::Error)          Domain failure (CoreError)        │
//! │       │                                     │                           │
//! │       ▼                                     ▼                           │
//! │  DbError (this module) ◄──────── DbError::Core(#[from])                │
//! │       │   busy / locked → Core(ConcurrentModification)                 │
//! │       ▼                                                                 │
//! │  API layer (external) maps InsufficientStock to a checkout message     │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use atelier_core::CoreError;
use thiserror::Error;

/// Placeholder id of a lock timeout not yet attributed to an entity.
const UNKNOWN_ID: &str = "unknown";

/// Database operation errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// A domain failure, identity of the failing entity intact.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Entity not found in database.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Unique constraint violation.
    ///
    /// ## When This Occurs
    /// - Second variant with the same product/color/size
    /// - Duplicate customer or staff email
    /// - Any UNIQUE index the repositories don't translate themselves
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    /// Foreign key constraint violation.
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// A CHECK constraint or trigger rejected the write.
    ///
    /// ## When This Occurs
    /// - Stock would go negative outside the ledger
    /// - Rating outside 1..=5
    /// - Attempt to update or delete an order item
    #[error("Constraint violated: {0}")]
    ConstraintViolation(String),

    /// Database connection failed.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Migration failed.
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Query execution failed.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// A stored value could not be decoded into a domain type.
    #[error("Corrupt {column} value: {reason}")]
    Decode { column: String, reason: String },

    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Pool exhausted (all connections in use).
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// Internal database error.
    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    /// Creates a UniqueViolation error.
    pub fn duplicate(field: impl Into<String>, value: impl Into<String>) -> Self {
        DbError::UniqueViolation {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Creates a Decode error.
    pub fn decode(column: impl Into<String>, reason: impl ToString) -> Self {
        DbError::Decode {
            column: column.into(),
            reason: reason.to_string(),
        }
    }

    /// The domain error, when this is one.
    pub fn as_core(&self) -> Option<&CoreError> {
        match self {
            DbError::Core(err) => Some(err),
            _ => None,
        }
    }

    /// Whether the caller may retry the same operation.
    pub fn is_retryable(&self) -> bool {
        match self {
            DbError::Core(err) => err.is_retryable(),
            DbError::PoolExhausted => true,
            _ => false,
        }
    }

    /// Names the entity behind a lock timeout.
    ///
    /// SQLite's busy error carries no row identity, so the call site that
    /// knows which entity it was writing fills it in. Any other error is
    /// returned unchanged.
    pub(crate) fn for_entity(self, entity: &str, entity_id: &str) -> Self {
        match self {
            DbError::Core(CoreError::ConcurrentModification { ref id, .. }) if id == UNKNOWN_ID => {
                DbError::Core(CoreError::conflict(entity, entity_id))
            }
            other => other,
        }
    }

    /// True for a UNIQUE violation on the given table.
    pub(crate) fn is_unique_on(&self, table: &str) -> bool {
        matches!(self, DbError::UniqueViolation { field, .. } if field.split(", ").any(|f| f.starts_with(&format!("{}.", table))))
    }
}

/// Convert sqlx errors to DbError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::RowNotFound     → DbError::NotFound
/// sqlx::Error::Database        → constraint kind from the SQLite message,
///                                busy/locked → Core(ConcurrentModification)
/// sqlx::Error::PoolTimedOut    → DbError::PoolExhausted
/// Other                        → DbError::Internal
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::NotFound {
                entity: "Record".to_string(),
                id: "unknown".to_string(),
            },

            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();

                // SQLite messages:
                //   "UNIQUE constraint failed: <table>.<column>[, <table>.<column>]"
                //   "FOREIGN KEY constraint failed"
                //   "CHECK constraint failed: <name>"
                //   "database is locked" (SQLITE_BUSY)
                if let Some(field) = msg.strip_prefix("UNIQUE constraint failed: ") {
                    DbError::UniqueViolation {
                        field: field.to_string(),
                        value: "unknown".to_string(),
                    }
                } else if msg.contains("FOREIGN KEY constraint failed") {
                    DbError::ForeignKeyViolation {
                        message: msg.to_string(),
                    }
                } else if msg.contains("CHECK constraint failed") || msg.starts_with("order_items") {
                    DbError::ConstraintViolation(msg.to_string())
                } else if msg.contains("database is locked") || msg.contains("database table is locked") {
                    DbError::Core(CoreError::conflict("record", UNKNOWN_ID))
                } else {
                    DbError::QueryFailed(msg.to_string())
                }
            }

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,

            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),

            _ => DbError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

impl From<atelier_core::ValidationError> for DbError {
    fn from(err: atelier_core::ValidationError) -> Self {
        DbError::Core(err.into())
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

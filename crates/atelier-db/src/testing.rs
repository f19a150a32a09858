//! Shared fixtures for repository tests.

use std::path::PathBuf;
use std::time::Duration;

use atelier_core::{
    AccessLevel, Currency, Customer, DuplicateLinePolicy, JobRole, Money, PriceTable, Product, RateTable, Staff,
    Variant,
};
use chrono::Utc;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::pool::{Database, DbConfig};
use crate::repository::OrderAssembler;

/// NGN base, USD at 0.00065 and EUR at 0.0006 per naira. No GBP quote.
pub(crate) fn rates() -> RateTable {
    let mut rates = RateTable::new();
    rates.set_rate(Currency::Usd, Decimal::new(65, 5)).unwrap();
    rates.set_rate(Currency::Eur, Decimal::new(6, 4)).unwrap();
    rates
}

pub(crate) fn product_record(name: &str, prices: &[Money]) -> Product {
    let now = Utc::now();
    Product {
        id: Uuid::new_v4().to_string(),
        name: name.to_string(),
        category: "Womenswear".to_string(),
        image: Some(format!("https://cdn.example.test/{}.jpg", name.to_lowercase().replace(' ', "-"))),
        prices: prices.iter().fold(PriceTable::new(), |table, price| table.with(*price)),
        average_rating: 0.0,
        rating_count: 0,
        created_at: now,
        updated_at: now,
    }
}

pub(crate) fn variant_record(product_id: &str, color: &str, size: &str, stock: i64) -> Variant {
    let now = Utc::now();
    Variant {
        id: Uuid::new_v4().to_string(),
        product_id: product_id.to_string(),
        color: color.to_string(),
        size: size.to_string(),
        stock,
        weight: Some(0.4),
        created_at: now,
        updated_at: now,
    }
}

pub(crate) fn customer_record(name: &str) -> Customer {
    let id = Uuid::new_v4().to_string();
    Customer {
        email: format!("{}+{}@example.test", name.to_lowercase(), &id[..8]),
        id,
        name: name.to_string(),
        created_at: Utc::now(),
    }
}

pub(crate) fn staff_record(name: &str) -> Staff {
    let id = Uuid::new_v4().to_string();
    Staff {
        email: format!("{}+{}@atelier.test", name.to_lowercase(), &id[..8]),
        id,
        name: name.to_string(),
        job_roles: vec![JobRole::SalesAssociate, JobRole::Cashier],
        access: AccessLevel::Staff,
        created_at: Utc::now(),
    }
}

/// A migrated database plus helpers that insert ready-made rows.
pub(crate) struct Fixture {
    pub db: Database,
    path: Option<PathBuf>,
}

impl Fixture {
    /// Single-connection in-memory database.
    pub async fn new() -> Self {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        Fixture { db, path: None }
    }

    /// WAL database in the temp dir with several pooled connections, for
    /// tests that need real concurrent writers. Call [`Fixture::cleanup`].
    pub async fn on_disk() -> Self {
        Self::on_disk_with_busy_timeout(Duration::from_secs(5)).await
    }

    /// [`Fixture::on_disk`] with a custom wait on the write lock.
    pub async fn on_disk_with_busy_timeout(busy_timeout: Duration) -> Self {
        let path = std::env::temp_dir().join(format!("atelier-test-{}.db", Uuid::new_v4()));
        let config = DbConfig::new(&path).max_connections(4).busy_timeout(busy_timeout);
        let db = Database::new(config).await.unwrap();
        Fixture { db, path: Some(path) }
    }

    pub async fn cleanup(self) {
        self.db.close().await;
        if let Some(path) = self.path {
            for suffix in ["", "-wal", "-shm"] {
                let mut file = path.clone().into_os_string();
                file.push(suffix);
                let _ = std::fs::remove_file(PathBuf::from(file));
            }
        }
    }

    pub async fn product(&self, prices: &[Money]) -> Product {
        let product = product_record("Adire Wrap Dress", prices);
        self.db.catalog().insert_product(&product).await.unwrap();
        product
    }

    pub async fn variant(&self, product: &Product, color: &str, size: &str, stock: i64) -> Variant {
        let variant = variant_record(&product.id, color, size, stock);
        self.db.catalog().insert_variant(&variant).await.unwrap();
        variant
    }

    pub async fn customer(&self) -> Customer {
        let customer = customer_record("Amaka");
        self.db.people().insert_customer(&customer).await.unwrap();
        customer
    }

    pub async fn staff(&self) -> Staff {
        let staff = staff_record("Tunde");
        self.db.people().insert_staff(&staff).await.unwrap();
        staff
    }

    /// Assembler over [`rates`] with merged duplicate lines.
    pub fn assembler(&self) -> OrderAssembler {
        self.db.assembler(rates(), DuplicateLinePolicy::Merge)
    }
}

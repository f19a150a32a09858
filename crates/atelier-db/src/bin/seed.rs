//! # Seed Data Generator
//!
//! Populates a database with a development catalog, customers and staff.
//!
//! ## Usage
//! ```bash
//! # 60 products (default) into the configured database
//! cargo run -p atelier-db --bin seed
//!
//! # Custom amount and path
//! cargo run -p atelier-db --bin seed -- --products 500 --db ./data/atelier.db
//!
//! # More logging
//! RUST_LOG=debug cargo run -p atelier-db --bin seed
//! ```
//!
//! ## Generated Data
//! - Products across a few categories, each priced in NGN. Every third one
//!   also carries a listed USD price, every fifth EUR and every seventh GBP;
//!   the rest are sold abroad by conversion.
//! - Colour/size variants with stock between 0 and 40
//! - A handful of customers and staff with mixed job roles

use std::env;
use std::path::PathBuf;

use atelier_core::{
    AccessLevel, Currency, Customer, JobRole, Money, PriceTable, Product, Staff, Variant,
};
use atelier_db::{AtelierConfig, Database};
use chrono::Utc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

const CATEGORIES: &[(&str, &[&str])] = &[
    (
        "Dresses",
        &[
            "Adire Wrap Dress",
            "Ankara Maxi Dress",
            "Aso Oke Shift",
            "Linen Slip Dress",
            "Kaftan Dress",
        ],
    ),
    (
        "Menswear",
        &[
            "Agbada Set",
            "Kaftan Shirt",
            "Dashiki Tunic",
            "Linen Trousers",
            "Senator Suit",
        ],
    ),
    (
        "Accessories",
        &[
            "Gele Headwrap",
            "Beaded Necklace",
            "Woven Tote",
            "Leather Sandals",
            "Silk Scarf",
        ],
    ),
    (
        "Outerwear",
        &["Quilted Jacket", "Wax Print Blazer", "Cotton Kimono"],
    ),
];

const COLORS: &[&str] = &["Indigo", "Ochre", "Ivory", "Emerald", "Black"];
const SIZES: &[&str] = &["XS", "S", "M", "L", "XL"];

const CUSTOMERS: &[&str] = &["Amaka", "Bayo", "Chioma", "Dayo", "Efe", "Funmi"];

const STAFF: &[(&str, &[JobRole], AccessLevel)] = &[
    ("Ngozi", &[JobRole::StoreManager], AccessLevel::Admin),
    ("Tunde", &[JobRole::SalesAssociate, JobRole::Cashier], AccessLevel::Staff),
    ("Kemi", &[JobRole::Cashier], AccessLevel::Staff),
    ("Segun", &[JobRole::StockKeeper, JobRole::CustomerService], AccessLevel::Manager),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,atelier=debug,sqlx=warn")),
        )
        .init();

    let args: Vec<String> = env::args().collect();

    let mut count: usize = 60;
    let mut db_path: Option<PathBuf> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--products" | "-p" => {
                if i + 1 < args.len() {
                    count = args[i + 1].parse().unwrap_or(60);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Atelier Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -p, --products <N>  Number of products to generate (default: 60)");
                println!("  -d, --db <PATH>     Database file path (default: from atelier.toml)");
                println!("  -h, --help          Show this help message");
                return Ok(());
            }
            other => warn!(arg = %other, "Ignoring unknown argument"),
        }
        i += 1;
    }

    let mut config = AtelierConfig::load(None)?;
    if let Some(path) = db_path {
        config.database.path = path;
    }

    info!(path = %config.database.path.display(), products = count, "Seeding database");

    let db = Database::new(config.db_config()).await?;

    let existing = db.catalog().count_products().await?;
    if existing > 0 {
        warn!(existing, "Database already has products, skipping seed. Delete the file to regenerate.");
        return Ok(());
    }

    let start = std::time::Instant::now();

    for name in CUSTOMERS {
        db.people().insert_customer(&customer(name)).await?;
    }
    for (name, roles, access) in STAFF {
        db.people().insert_staff(&staff(name, roles, *access)).await?;
    }
    info!(customers = CUSTOMERS.len(), staff = STAFF.len(), "People created");

    let mut generated = 0;
    let mut variants = 0;
    'outer: for round in 0.. {
        for (category, names) in CATEGORIES {
            for name in names.iter() {
                if generated >= count {
                    break 'outer;
                }

                let product = generate_product(category, name, round, generated);
                db.catalog().insert_product(&product).await?;

                for variant in generate_variants(&product.id, generated) {
                    db.catalog().insert_variant(&variant).await?;
                    variants += 1;
                }

                generated += 1;
                if generated % 50 == 0 {
                    info!(generated, "Progress");
                }
            }
        }
    }

    let elapsed = start.elapsed();
    info!(
        products = generated,
        variants,
        elapsed_ms = elapsed.as_millis() as u64,
        "Seed complete"
    );

    db.close().await;
    Ok(())
}

fn customer(name: &str) -> Customer {
    Customer {
        id: Uuid::new_v4().to_string(),
        name: name.to_string(),
        email: format!("{}@customers.atelier.ng", name.to_lowercase()),
        created_at: Utc::now(),
    }
}

fn staff(name: &str, roles: &[JobRole], access: AccessLevel) -> Staff {
    Staff {
        id: Uuid::new_v4().to_string(),
        name: name.to_string(),
        email: format!("{}@atelier.ng", name.to_lowercase()),
        job_roles: roles.to_vec(),
        access,
        created_at: Utc::now(),
    }
}

/// Builds one product. Prices are deterministic in `seed`.
fn generate_product(category: &str, name: &str, round: usize, seed: usize) -> Product {
    let now = Utc::now();

    let full_name = if round == 0 {
        name.to_string()
    } else {
        format!("{} No. {}", name, round + 1)
    };

    // ₦8,000 - ₦95,000 in steps of 500
    let ngn = 8_000 + ((seed * 3_700) % 87_500) as i64 / 500 * 500;

    let mut prices = PriceTable::new().with(Money::from_minor(ngn, Currency::Ngn));
    if seed % 3 == 0 {
        prices.set(Currency::Usd, Some(Money::from_minor(ngn * 65 / 1_000 + 99, Currency::Usd)));
    }
    if seed % 5 == 0 {
        prices.set(Currency::Eur, Some(Money::from_minor(ngn * 60 / 1_000 + 50, Currency::Eur)));
    }
    if seed % 7 == 0 {
        prices.set(Currency::Gbp, Some(Money::from_minor(ngn * 51 / 1_000 + 49, Currency::Gbp)));
    }

    Product {
        id: Uuid::new_v4().to_string(),
        name: full_name,
        category: category.to_string(),
        image: Some(format!(
            "https://cdn.atelier.ng/products/{}-{}.jpg",
            name.to_lowercase().replace(' ', "-"),
            seed
        )),
        prices,
        average_rating: 0.0,
        rating_count: 0,
        created_at: now,
        updated_at: now,
    }
}

/// Two or three colours, each in a run of sizes.
fn generate_variants(product_id: &str, seed: usize) -> Vec<Variant> {
    let now = Utc::now();
    let colors = 2 + seed % 2;
    let mut variants = Vec::new();

    for c in 0..colors {
        let color = COLORS[(seed + c) % COLORS.len()];
        for (s, size) in SIZES.iter().enumerate().skip(seed % 2) {
            variants.push(Variant {
                id: Uuid::new_v4().to_string(),
                product_id: product_id.to_string(),
                color: color.to_string(),
                size: size.to_string(),
                stock: ((seed * 7 + c * 13 + s * 5) % 41) as i64,
                weight: Some(0.3 + s as f64 * 0.1),
                created_at: now,
                updated_at: now,
            });
        }
    }

    variants
}

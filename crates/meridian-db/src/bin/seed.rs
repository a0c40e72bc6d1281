//! # Seed Data Generator
//!
//! Populates a development database with branches, products, stock and a
//! few credit customers.
//!
//! ## Usage
//! ```bash
//! # Three branches, 200 products (default)
//! cargo run -p meridian-db --bin seed
//!
//! # Custom amounts
//! cargo run -p meridian-db --bin seed -- --branches 5 --products 1000
//!
//! # Specify database path (otherwise $MERIDIAN_DB_PATH or ./meridian.db)
//! cargo run -p meridian-db --bin seed -- --db ./data/meridian.db
//! ```
//!
//! ## Generated Data
//! - Branches `BR01`, `BR02`, ... with the first one named "Head Office"
//! - Products with SKU `{CATEGORY}-{NAME}-{INDEX}` and a price of $0.99 - $19.99
//! - One inventory record per branch and product, 0 - 120 units on hand
//! - Customers with no opening debt

use meridian_core::{NewBranch, NewCustomer, NewInventoryRecord, NewProduct};
use meridian_db::{Database, DbConfig};
use std::env;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Product categories for realistic test data
const CATEGORIES: &[(&str, &[&str])] = &[
    (
        "BEV",
        &[
            "Cola", "Lemon Soda", "Mineral Water", "Orange Juice", "Iced Tea", "Energy Drink",
            "Ground Coffee", "Green Tea",
        ],
    ),
    (
        "SNK",
        &[
            "Potato Chips", "Tortilla Chips", "Salted Peanuts", "Chocolate Bar", "Gummy Bears",
            "Butter Cookies", "Pretzels", "Popcorn",
        ],
    ),
    (
        "DRY",
        &[
            "Whole Milk", "Oat Milk", "Cheddar", "Mozzarella", "Butter", "Greek Yogurt",
            "Cream Cheese", "Eggs Dozen",
        ],
    ),
    (
        "GRO",
        &[
            "White Bread", "Spaghetti", "White Rice", "Canned Beans", "Canned Tomatoes",
            "Oatmeal", "Peanut Butter", "Honey",
        ],
    ),
    (
        "HHD",
        &[
            "Dish Soap", "Laundry Powder", "Paper Towels", "Trash Bags", "Sponges",
            "Light Bulb", "AA Batteries", "Matches",
        ],
    ),
];

const CUSTOMERS: &[&str] = &["Ana Lima", "Bruno Costa", "Carla Mendes", "Diego Rocha"];

/// Size variants and their price addon in cents
const SIZES: &[(&str, i64)] = &[("Small", 0), ("Regular", 100), ("Large", 250), ("Family", 500)];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let args: Vec<String> = env::args().collect();

    let mut branch_count: usize = 3;
    let mut product_count: usize = 200;
    let mut config = DbConfig::from_env();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--branches" | "-b" => {
                if i + 1 < args.len() {
                    branch_count = args[i + 1].parse().unwrap_or(3);
                    i += 1;
                }
            }
            "--products" | "-p" => {
                if i + 1 < args.len() {
                    product_count = args[i + 1].parse().unwrap_or(200);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    config = DbConfig::new(&args[i + 1]);
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Meridian POS Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -b, --branches <N>  Number of branches (default: 3)");
                println!("  -p, --products <N>  Number of products (default: 200)");
                println!("  -d, --db <PATH>     Database file path (default: $MERIDIAN_DB_PATH)");
                println!("  -h, --help          Show this help message");
                return Ok(());
            }
            other => warn!(argument = %other, "Ignoring unknown argument"),
        }
        i += 1;
    }

    info!(
        database = %config.database_path.display(),
        branches = branch_count,
        products = product_count,
        "Seeding database"
    );

    let db = Database::new(config).await?;

    let existing = db.products().count().await?;
    if existing > 0 {
        warn!(existing, "Database already has products, skipping seed");
        return Ok(());
    }

    let start = std::time::Instant::now();

    // Branches
    let mut branches = Vec::with_capacity(branch_count);
    for index in 1..=branch_count {
        let name = if index == 1 {
            "Head Office".to_string()
        } else {
            format!("Branch {index}")
        };
        let branch = db
            .branches()
            .insert(&NewBranch {
                code: format!("BR{index:02}"),
                name,
                address: None,
            })
            .await?;
        branches.push(branch);
    }

    // Products and stock
    let mut generated = 0;
    'outer: for (category_idx, (category_code, names)) in CATEGORIES.iter().enumerate() {
        for (name_idx, name) in names.iter().enumerate() {
            for (size_idx, (size_name, price_addon)) in SIZES.iter().enumerate() {
                if generated >= product_count {
                    break 'outer;
                }

                let seed = category_idx * 1000 + name_idx * 20 + size_idx;
                let product = match db
                    .products()
                    .insert(&generate_product(category_code, name, size_name, *price_addon, seed))
                    .await
                {
                    Ok(product) => product,
                    Err(e) => {
                        warn!(seed, error = %e, "Failed to insert product");
                        continue;
                    }
                };

                for (branch_idx, branch) in branches.iter().enumerate() {
                    db.inventory()
                        .create_record(&NewInventoryRecord {
                            branch_id: branch.id.clone(),
                            product_id: product.id.clone(),
                            quantity: ((seed + branch_idx * 37) % 121) as i64,
                            min_stock_level: 10,
                            max_stock_level: Some(200),
                        })
                        .await?;
                }

                generated += 1;
                if generated % 50 == 0 {
                    info!(generated, "Products generated");
                }
            }
        }
    }

    // Customers
    for name in CUSTOMERS {
        db.customers()
            .insert(&NewCustomer {
                name: name.to_string(),
                phone: None,
                email: None,
            })
            .await?;
    }

    info!(
        branches = branches.len(),
        products = generated,
        customers = CUSTOMERS.len(),
        elapsed = ?start.elapsed(),
        "Seed complete"
    );

    db.close().await;
    Ok(())
}

/// Initializes the tracing subscriber.
///
/// `RUST_LOG` overrides the default filter.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,meridian=debug,sqlx=warn"));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Builds a product with deterministic pseudo-random pricing.
fn generate_product(
    category: &str,
    name: &str,
    size: &str,
    price_addon: i64,
    seed: usize,
) -> NewProduct {
    let short: String = name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .take(3)
        .collect::<String>()
        .to_uppercase();
    let sku = format!("{category}-{short}-{seed:04}");

    let barcode = Some(format!("789{seed:010}"));

    // $0.99 - $14.99 base, plus size addon
    let price_cents = 99 + ((seed * 17) % 1400) as i64 + price_addon;

    // 55-75% of price
    let cost_cents = Some(price_cents * (55 + (seed % 20) as i64) / 100);

    NewProduct {
        sku,
        barcode,
        name: format!("{name} {size}"),
        description: None,
        price_cents,
        cost_cents,
    }
}

//! # Seed Data Generator
//!
//! Populates the database with test products for development.
//!
//! ## Usage
//! ```bash
//! # Generate 200 products (default)
//! cargo run -p tilly-db --bin seed
//!
//! # Generate custom amount
//! cargo run -p tilly-db --bin seed -- --count 500
//!
//! # Specify database path
//! cargo run -p tilly-db --bin seed -- --db ./data/tilly.db
//! ```
//!
//! Each product gets a unique SKU (`{CATEGORY}-{INDEX}`), a price between
//! $0.99 and $9.99, stock between 0 and 100, and a reorder level of 5.

use std::env;

use tilly_core::Product;
use tilly_db::{Database, DbConfig};

/// Product categories for realistic test data.
const CATEGORIES: &[(&str, &[&str])] = &[
    (
        "BEV",
        &[
            "Coca-Cola",
            "Pepsi",
            "Sprite",
            "Red Bull",
            "Orange Juice",
            "Apple Juice",
            "Iced Tea",
            "Lemonade",
            "Coffee",
            "Mineral Water",
        ],
    ),
    (
        "SNK",
        &[
            "Lays Classic",
            "Doritos Nacho",
            "Pringles",
            "Snickers",
            "Kit Kat",
            "Oreos",
            "Pretzels",
            "Gummy Bears",
            "Goldfish",
            "Granola Bar",
        ],
    ),
    (
        "DRY",
        &[
            "Whole Milk",
            "Skim Milk",
            "Cheddar Cheese",
            "Butter",
            "Greek Yogurt",
            "Sour Cream",
            "Eggs Dozen",
            "Cream Cheese",
            "Mozzarella",
            "Heavy Cream",
        ],
    ),
    (
        "GRO",
        &[
            "White Bread",
            "Pasta Spaghetti",
            "Rice White",
            "Canned Beans",
            "Canned Soup",
            "Oatmeal",
            "Peanut Butter",
            "Honey",
            "Flour",
            "Sugar",
        ],
    ),
];

/// Size variants and their price addons in cents.
const SIZES: &[(&str, i64)] = &[
    ("Small", 0),
    ("Medium", 100),
    ("Large", 200),
    ("6-Pack", 300),
    ("12-Pack", 500),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args: Vec<String> = env::args().collect();

    let mut count: usize = 200;
    let mut db_path = String::from("./tilly_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                if i + 1 < args.len() {
                    count = args[i + 1].parse().unwrap_or(200);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Tilly Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>    Number of products to generate (default: 200)");
                println!("  -d, --db <PATH>    Database file path (default: ./tilly_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Tilly Seed Data Generator");
    println!("============================");
    println!("Database: {}", db_path);
    println!("Products: {}", count);
    println!();

    let config = DbConfig::new(&db_path);
    let db = Database::new(config).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.products().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} products", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    println!();
    println!("Generating products...");

    let mut generated = 0;
    let start = std::time::Instant::now();

    'outer: for (category_idx, (category_code, names)) in CATEGORIES.iter().enumerate() {
        for (name_idx, name) in names.iter().enumerate() {
            for (size_idx, (size, price_addon)) in SIZES.iter().enumerate() {
                if generated >= count {
                    break 'outer;
                }

                let seed = category_idx * 1000 + name_idx * 10 + size_idx;
                let product =
                    generate_product(category_code, name, size, *price_addon, seed)?;

                if let Err(e) = db.products().insert(&product).await {
                    eprintln!("Failed to insert {}: {}", product.sku, e);
                    continue;
                }

                generated += 1;

                if generated % 50 == 0 {
                    println!("  Generated {} products...", generated);
                }
            }
        }
    }

    let elapsed = start.elapsed();
    println!();
    println!("✓ Generated {} products in {:?}", generated, elapsed);

    let low_stock = db.products().list_low_stock().await?;
    println!("  {} products start at or below reorder level", low_stock.len());

    println!();
    println!("✓ Seed complete!");

    Ok(())
}

/// Generates a single product with realistic data.
fn generate_product(
    category: &str,
    name: &str,
    size: &str,
    price_addon: i64,
    seed: usize,
) -> Result<Product, Box<dyn std::error::Error>> {
    let sku = format!("{}-{:04}", category, seed);

    // Base $0.99-$8.99 plus the size addon
    let price_cents = 99 + ((seed * 17) % 800) as i64 + price_addon;

    let quantity = (seed % 101) as i64;

    let mut product = Product::new(sku, format!("{} {}", name, size), quantity, price_cents, 5)?;
    product.category_name = Some(category.to_string());

    Ok(product)
}

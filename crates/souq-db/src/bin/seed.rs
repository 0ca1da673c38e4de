//! # Seed Data Generator
//!
//! Populates a development database with exchange rates, a small catalog
//! and home page banners.
//!
//! ## Usage
//! ```bash
//! cargo run -p souq-db --bin seed
//! cargo run -p souq-db --bin seed -- --db ./data/souq.db
//! ```

use souq_core::ExchangeRateSet;
use souq_db::{Database, DbConfig, NewAdvertisement, NewProduct};
use std::env;

/// (title, category, price cents, reseller price cents, discount bps, colors, stock)
const CATALOG: &[(&str, &str, i64, Option<i64>, Option<i64>, &[&str], i64)] = &[
    ("Brass Desk Lamp", "home", 4_500, Some(3_600), Some(1_000), &["gold", "black"], 40),
    ("Woven Prayer Rug", "home", 3_200, Some(2_500), None, &["red", "green", "blue"], 60),
    ("Copper Dallah", "kitchen", 5_800, Some(4_700), Some(1_500), &[], 25),
    ("Cardamom Coffee 500g", "grocery", 1_200, Some(950), None, &[], 200),
    ("Medjool Dates 1kg", "grocery", 1_800, Some(1_450), Some(500), &[], 150),
    ("Cotton Thobe", "clothing", 2_900, Some(2_200), None, &["white", "beige", "grey"], 80),
    ("Silk Shemagh", "clothing", 2_400, Some(1_900), Some(2_000), &["red", "black"], 70),
    ("Oud Perfume 50ml", "beauty", 7_500, Some(6_000), None, &[], 30),
    ("Ceramic Tea Set", "kitchen", 3_900, None, Some(1_000), &["white", "turquoise"], 20),
    ("Leather Wallet", "accessories", 2_100, Some(1_650), None, &["brown", "black"], 90),
];

const BANNERS: &[(&str, &str, Option<&str>)] = &[
    ("Ramadan Collection", "/banners/ramadan.png", Some("/catalog?category=home")),
    ("Free delivery in Baghdad", "/banners/delivery.png", None),
    ("Resellers: wholesale prices", "/banners/resellers.png", Some("/reseller")),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut db_path = String::from("./souq_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Souq Storefront Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: ./souq_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Souq Storefront Seed Data Generator");
    println!("======================================");
    println!("Database: {}", db_path);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    if db.currency_rates().get().await?.is_none() {
        db.currency_rates()
            .upsert(&ExchangeRateSet::default(), None)
            .await?;
        println!("✓ Saved default exchange rates");
    } else {
        println!("• Exchange rates already set");
    }

    let existing = db.products().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} products", existing);
        println!("  Skipping catalog and banners to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    for (title, category, price, reseller_price, discount, colors, stock) in CATALOG {
        let input = NewProduct {
            title: title.to_string(),
            description: Some(format!("{title} from the Souq catalog")),
            price_cents: *price,
            reseller_price_cents: *reseller_price,
            discount_bps: *discount,
            image_url: format!("/products/{}.png", title.to_lowercase().replace(' ', "-")),
            colors: colors.iter().map(|c| c.to_string()).collect(),
            category: category.to_string(),
            stock: *stock,
            is_active: true,
        };

        if let Err(e) = db.products().create(&input).await {
            eprintln!("Failed to insert {}: {}", title, e);
        }
    }
    println!("✓ Inserted {} products", db.products().count().await?);

    for (position, (title, image_url, link_url)) in BANNERS.iter().enumerate() {
        db.advertisements()
            .create(&NewAdvertisement {
                title: title.to_string(),
                image_url: image_url.to_string(),
                link_url: link_url.map(str::to_string),
                position: position as i64,
                is_active: true,
            })
            .await?;
    }
    println!("✓ Inserted {} banners", BANNERS.len());

    println!();
    println!("✓ Seed complete!");

    Ok(())
}

//! # Seed Data Generator
//!
//! Populates a ledger database with one demo tenant for development.
//!
//! ## Usage
//! ```bash
//! # Seed the database named by ledger.toml / LEDGER_DATABASE_PATH
//! cargo run -p ledger-db --bin seed
//!
//! # Specify database path
//! cargo run -p ledger-db --bin seed -- --db ./data/ledger.db
//! ```
//!
//! ## Generated Data
//! - Tenant "Demo Retail" with a general warehouse
//! - Two stores, each with its store warehouse
//! - A USD/LRD rate of 200.00
//! - Products in USD and LRD, with variants and two lots each
//! - Stock allocated to the first store and one paid sale

use chrono::{Days, Utc};
use std::env;
use tracing::info;
use tracing_subscriber::EnvFilter;

use ledger_core::{
    AttributeInput, CreateLotRequest, CreateProductRequest, CreateVariantRequest, Currency,
    InventoryItemRequest, Money, PaymentMethod, PaymentRequest, ProcessSaleRequest,
    SaleLineRequest,
};
use ledger_db::{Database, DbError, LedgerConfig};

const TENANT_NAME: &str = "Demo Retail";

/// `(name, category, currency, retail price in minor units, variant values)`
const PRODUCTS: &[(&str, &str, Currency, i64, &[&str])] = &[
    ("Parboiled Rice 25kg", "Grocery", Currency::Usd, 2250, &["Golden", "Mama's Pride"]),
    ("Palm Oil 1L", "Grocery", Currency::Lrd, 45000, &["Red", "Refined"]),
    ("Bottled Water 500ml", "Beverages", Currency::Lrd, 5000, &["Still"]),
    ("Flip Flops", "Footwear", Currency::Usd, 350, &["Size 40", "Size 42", "Size 44"]),
];

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,ledger_db=debug,sqlx=warn"));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn lot(lot_number: String, quantity: i64, days_ago: u64, retail_cents: i64) -> CreateLotRequest {
    let purchase_date = Utc::now()
        .date_naive()
        .checked_sub_days(Days::new(days_ago))
        .unwrap_or_else(|| Utc::now().date_naive());
    CreateLotRequest {
        lot_number,
        quantity,
        expired_date: None,
        purchase_price: Money::from_cents(retail_cents * 7 / 10),
        wholesale_quantity: 10,
        wholesale_price: Money::from_cents(retail_cents * 9 / 10),
        retail_price: Money::from_cents(retail_cents),
        purchase_date,
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let args: Vec<String> = env::args().collect();
    let mut db_path: Option<String> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = Some(args[i + 1].clone());
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Ledger Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: from ledger.toml)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    let mut config = LedgerConfig::load()?;
    if let Some(path) = db_path {
        config.database_path = path;
    }

    println!("🌱 Ledger Seed Data Generator");
    println!("=============================");
    println!("Database: {}", config.database_path);
    println!();

    let db = Database::new(config.db_config()).await?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let tenant = match db.tenants().create_tenant(TENANT_NAME).await {
        Ok(tenant) => tenant,
        Err(DbError::UniqueViolation { .. }) => {
            println!("⚠ Tenant '{}' already exists", TENANT_NAME);
            println!("  Skipping seed to avoid duplicates.");
            println!("  Delete the database file to regenerate.");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    let general = db
        .warehouses()
        .get_or_create_general_warehouse(tenant.id, "Central Warehouse", Some("Monrovia"))
        .await?;
    println!("✓ General warehouse {}", general.warehouse_code);

    db.exchange_rates()
        .add_rate(tenant.id, 20000, Utc::now().date_naive())
        .await?;
    println!("✓ Exchange rate 1 USD = 200.00 LRD");

    let (broad, _) = db
        .tenants()
        .create_store(tenant.id, "Broad Street", "BRD", Some("Broad Street, Monrovia"))
        .await?;
    let (red_light, _) = db
        .tenants()
        .create_store(tenant.id, "Red Light Market", "RLM", Some("Paynesville"))
        .await?;
    println!("✓ Stores {} and {}", broad.name, red_light.name);

    let mut allocations = Vec::new();
    let mut sale_lines = Vec::new();
    for (name, category, currency, retail, values) in PRODUCTS {
        let variants = values
            .iter()
            .enumerate()
            .map(|(idx, value)| CreateVariantRequest {
                attributes: vec![AttributeInput::new("Kind", *value)],
                lots: vec![
                    lot(format!("{}-A{}", category, idx), 40, 60, *retail),
                    lot(format!("{}-B{}", category, idx), 25, 10, *retail),
                ],
            })
            .collect();

        let tree = db
            .catalog()
            .create_product(
                tenant.id,
                &CreateProductRequest {
                    name: name.to_string(),
                    category: category.to_string(),
                    unit: Some("pcs".to_string()),
                    threshold_value: 15,
                    currency: *currency,
                    variants,
                },
            )
            .await?;

        for variant in &tree.variants {
            allocations.push(InventoryItemRequest {
                product_id: tree.product.id,
                variant_id: variant.variant.id,
                lot_id: None,
                quantity: 45,
            });
        }
        sale_lines.push(SaleLineRequest {
            product_id: tree.product.id,
            quantity: 2,
        });
        println!("  + {} ({} variants)", tree.product.name, tree.variants.len());
    }

    let movements = db
        .inventory()
        .add_inventory(tenant.id, broad.id, &allocations)
        .await?;
    println!("✓ Allocated {} lot movements to {}", movements.len(), broad.name);

    let sale = db
        .sales()
        .process_sale(
            tenant.id,
            &ProcessSaleRequest {
                store_id: broad.id,
                cashier_id: "seed".to_string(),
                currency: Currency::Usd,
                lines: sale_lines,
                payments: Vec::new(),
                sale_date: None,
            },
        )
        .await?;
    let (_, sale) = db
        .sales()
        .add_payment(
            tenant.id,
            sale.sale.id,
            &PaymentRequest::new(PaymentMethod::Cash, sale.sale.grand_total(), Currency::Usd),
        )
        .await?;
    println!(
        "✓ Sale {} for {} USD ({})",
        sale.receipt_number,
        sale.grand_total(),
        sale.payment_status.as_str()
    );

    info!(tenant_id = tenant.id, "Seed complete");
    println!();
    println!("✓ Seed complete!");

    Ok(())
}

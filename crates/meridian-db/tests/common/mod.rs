//! Shared fixtures for file-backed integration tests.

#![allow(dead_code)]

use meridian_core::{
    Branch, Customer, NewBranch, NewCustomer, NewInventoryRecord, NewProduct, NewSale,
    NewSaleLine, PaymentMethod, Product,
};
use meridian_db::{Database, DbConfig};
use tempfile::TempDir;

pub const CASHIER: &str = "cashier-1";

/// A database in a temp directory with a real multi-connection pool.
///
/// Keep the `TempDir` alive for as long as the database is used.
pub async fn file_database() -> (TempDir, Database) {
    let dir = tempfile::tempdir().unwrap();
    let config = DbConfig::new(dir.path().join("meridian.db")).max_connections(8);
    let db = Database::new(config).await.unwrap();
    (dir, db)
}

pub async fn branch(db: &Database, code: &str) -> Branch {
    db.branches()
        .insert(&NewBranch {
            code: code.to_string(),
            name: format!("Branch {code}"),
            address: None,
        })
        .await
        .unwrap()
}

pub async fn product(db: &Database, sku: &str, price_cents: i64) -> Product {
    db.products()
        .insert(&NewProduct {
            sku: sku.to_string(),
            barcode: None,
            name: format!("Product {sku}"),
            description: None,
            price_cents,
            cost_cents: None,
        })
        .await
        .unwrap()
}

pub async fn customer(db: &Database, name: &str) -> Customer {
    db.customers()
        .insert(&NewCustomer {
            name: name.to_string(),
            phone: None,
            email: None,
        })
        .await
        .unwrap()
}

pub async fn stock(db: &Database, branch_id: &str, product_id: &str, quantity: i64) {
    db.inventory()
        .create_record(&NewInventoryRecord {
            branch_id: branch_id.to_string(),
            product_id: product_id.to_string(),
            quantity,
            min_stock_level: 0,
            max_stock_level: None,
        })
        .await
        .unwrap();
}

pub async fn on_hand(db: &Database, branch_id: &str, product_id: &str) -> Option<i64> {
    db.inventory()
        .get(branch_id, product_id)
        .await
        .unwrap()
        .map(|r| r.quantity)
}

pub fn sale(branch_id: &str, method: PaymentMethod, lines: Vec<NewSaleLine>) -> NewSale {
    NewSale {
        branch_id: branch_id.to_string(),
        customer_id: None,
        payment_method: method,
        items: lines,
        discount_cents: 0,
        paid_amount_cents: None,
        notes: None,
    }
}

//! # Repository Module
//!
//! Database repositories for Meridian POS.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repositories and the write path                      │
//! │                                                                         │
//! │  Boundary handler                                                      │
//! │       │  db.sales().create_sale(&req, user_id)                          │
//! │       ▼                                                                 │
//! │  SaleRepository ── begin_write() ──► BEGIN IMMEDIATE                   │
//! │       │                                                                 │
//! │       ├── branch / customer / product lookups      (&mut *tx)          │
//! │       ├── sale_number allocation                   (&mut *tx)          │
//! │       ├── inventory::apply_delta_in                (&mut *tx)          │
//! │       ├── customer_ledger::insert_entry_in         (&mut *tx)          │
//! │       └── cash_register::insert_entry_in           (&mut *tx)          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  tx.commit()  (any `?` before this point rolls everything back)        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The `*_in` helpers take `&mut SqliteConnection` so workflows can compose
//! them inside one transaction. Inside a transaction nothing touches the pool.
//!
//! ## Available Repositories
//!
//! - [`BranchRepository`], [`ProductRepository`], [`CustomerRepository`] - catalog
//! - [`InventoryRepository`] - snapshots and the stock mutation path
//! - [`SaleRepository`] - sale creation, refunds
//! - [`TransferRepository`] - inter-branch transfers
//! - [`AdjustmentRepository`] - manual stock corrections
//! - [`CustomerLedgerRepository`] - customer debt
//! - [`CashRegisterRepository`] - branch cash register

pub mod adjustment;
pub mod branch;
pub mod cash_register;
pub mod customer;
pub mod customer_ledger;
pub mod inventory;
pub mod product;
pub mod sale;
pub mod transfer;

pub use adjustment::AdjustmentRepository;
pub use branch::BranchRepository;
pub use cash_register::CashRegisterRepository;
pub use customer::CustomerRepository;
pub use customer_ledger::CustomerLedgerRepository;
pub use inventory::InventoryRepository;
pub use product::ProductRepository;
pub use sale::SaleRepository;
pub use transfer::TransferRepository;

use uuid::Uuid;

/// Generates a new entity ID.
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Default page size for list queries.
pub const DEFAULT_LIST_LIMIT: i64 = 100;

// =============================================================================
// Test Support
// =============================================================================

#[cfg(test)]
pub(crate) mod test_support {
    use meridian_core::{Branch, Customer, NewBranch, NewCustomer, NewInventoryRecord, NewProduct, Product};

    use crate::{Database, DbConfig};

    pub const USER: &str = "user-1";

    pub async fn database() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
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

    pub async fn quantity(db: &Database, branch_id: &str, product_id: &str) -> i64 {
        db.inventory()
            .get(branch_id, product_id)
            .await
            .unwrap()
            .map(|r| r.quantity)
            .unwrap_or(-1)
    }
}

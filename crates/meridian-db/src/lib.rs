//! # meridian-db: Database Layer for Meridian POS
//!
//! SQLite persistence for the multi-branch stock and ledger engine, built on
//! sqlx. Every workflow that touches more than one row runs in a single
//! write transaction.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Meridian POS Data Flow                           │
//! │                                                                         │
//! │  Boundary handler (create sale, complete transfer, record payment)     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    meridian-db (THIS CRATE)                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │               │    │  (embedded)  │  │   │
//! │  │   │               │    │ SaleRepo      │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│ TransferRepo  │    │ 001_init.sql │  │   │
//! │  │   │ begin_write() │    │ InventoryRepo │    │ 002_idx.sql  │  │   │
//! │  │   │               │    │ Ledger repos  │    │              │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  │                               │                                 │   │
//! │  │                               ▼                                 │   │
//! │  │                  meridian-core (rules, pricing, refunds)        │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 SQLite Database (WAL, $MERIDIAN_DB_PATH)        │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation, configuration, write transactions
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations
//!
//! ## Usage
//!
//! ```rust,ignore
//! use meridian_db::{Database, DbConfig};
//! use meridian_core::{NewSale, NewSaleLine, PaymentMethod};
//!
//! let db = Database::new(DbConfig::from_env()).await?;
//!
//! let detail = db
//!     .sales()
//!     .create_sale(
//!         &NewSale {
//!             branch_id: branch.id.clone(),
//!             customer_id: None,
//!             payment_method: PaymentMethod::Cash,
//!             items: vec![NewSaleLine::new(product.id.clone(), 2)],
//!             discount_cents: 0,
//!             paid_amount_cents: Some(2000),
//!             notes: None,
//!         },
//!         "cashier-7",
//!     )
//!     .await?;
//!
//! let register = db.cash_register().balance(&branch.id, None).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::{
    AdjustmentRepository, BranchRepository, CashRegisterRepository, CustomerLedgerRepository,
    CustomerRepository, InventoryRepository, ProductRepository, SaleRepository,
    TransferRepository,
};
pub use repository::cash_register::CashEntry;
pub use repository::customer_ledger::CustomerEntry;

//! # meridian-core: Pure Business Logic for Meridian POS
//!
//! Domain types and every stock and money rule of the multi-branch engine,
//! as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Meridian POS Architecture                         │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │              Boundary (HTTP handlers, auth, DTOs)               │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ requests + acting user id              │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │             ★ meridian-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐  │   │
//! │  │   │  types  │ │ pricing │ │ refund  │ │ ledger  │ │validation│ │   │
//! │  │   │  Sale   │ │ totals  │ │  plan   │ │  fold   │ │  rules  │  │   │
//! │  │   │Transfer │ │ payment │ │ amounts │ │ balance │ │ checks  │  │   │
//! │  │   └─────────┘ └─────────┘ └─────────┘ └─────────┘ └─────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 meridian-db (Database Layer)                    │   │
//! │  │     SQLite transactions, inventory mutation, repositories       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain entities (Sale, StockTransfer, ledgers, ...)
//! - [`requests`] - Input accepted by the engine
//! - [`money`] - Money type with integer arithmetic
//! - [`pricing`] - Sale line pricing and payment settlement
//! - [`refund`] - Refund planning against earlier refunds
//! - [`ledger`] - Balance folds over customer and cash entries
//! - [`sale_number`] - `SAL-YYYYMMDD-NNNNN` formatting
//! - [`error`] - Domain error types
//! - [`validation`] - Input validation
//!
//! ## Example Usage
//!
//! ```rust
//! use meridian_core::money::Money;
//! use meridian_core::pricing::{price_line, settle};
//! use meridian_core::requests::NewSaleLine;
//! use meridian_core::types::PaymentMethod;
//!
//! let line = price_line(&NewSaleLine::new("p1", 2), Money::from_cents(500)).unwrap();
//! let totals = settle(&[line], 0, PaymentMethod::Cash, Some(2000), false).unwrap();
//!
//! assert_eq!(totals.total.cents(), 1000);
//! assert_eq!(totals.change.cents(), 1000);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod ledger;
pub mod money;
pub mod pricing;
pub mod refund;
pub mod requests;
pub mod sale_number;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ErrorKind, ValidationError};
pub use ledger::LedgerBalance;
pub use money::Money;
pub use requests::*;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum lines on a single sale or transfer.
pub const MAX_LINES_PER_DOCUMENT: usize = 200;

/// Maximum quantity on a single line or adjustment.
///
/// Transfers move whole cartons between branches, so this is far above a
/// till's typical line quantity.
pub const MAX_LINE_QUANTITY: i64 = 100_000;

/// Maximum unit price, in cents.
pub const MAX_PRICE_CENTS: i64 = 1_000_000_000;

/// Largest amount a sale total, payment or ledger entry may carry, in cents.
///
/// A full document at the maximum price and quantity still fits in an `i64`.
pub const MAX_AMOUNT_CENTS: i64 =
    MAX_PRICE_CENTS * MAX_LINE_QUANTITY * MAX_LINES_PER_DOCUMENT as i64;

/// Maximum length of notes and reasons.
pub const MAX_NOTES_LENGTH: usize = 500;

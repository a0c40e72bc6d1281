//! # Error Types
//!
//! Domain-specific error types for meridian-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  meridian-core errors (this file)                                      │
//! │  ├── CoreError        - Business rule violations, missing entities     │
//! │  ├── ValidationError  - Malformed input                                │
//! │  └── ErrorKind        - Stable category the boundary layer maps        │
//! │                                                                         │
//! │  meridian-db errors (separate crate)                                   │
//! │  └── DbError          - Storage failures, wraps CoreError              │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → boundary (HTTP status)  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::Serialize;
use thiserror::Error;
use ts_rs::TS;

use crate::types::{PaymentMethod, SaleStatus, TransferStatus};

// =============================================================================
// Error Kind
// =============================================================================

/// Stable error category exposed to the boundary layer.
///
/// ```text
/// NOT_FOUND      → 404
/// BUSINESS_RULE  → 400
/// VALIDATION     → 400
/// INTERNAL       → 500
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    NotFound,
    BusinessRule,
    Validation,
    Internal,
}

impl ErrorKind {
    /// HTTP status code the boundary layer should answer with.
    pub const fn http_status(&self) -> u16 {
        match self {
            ErrorKind::NotFound => 404,
            ErrorKind::BusinessRule | ErrorKind::Validation => 400,
            ErrorKind::Internal => 500,
        }
    }
}

// =============================================================================
// Core Error
// =============================================================================

/// Business rule violations and missing-entity failures.
///
/// Every variant aborts the unit of work it was raised in. Nothing in the
/// engine swallows these.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Branch not found: {0}")]
    BranchNotFound(String),

    #[error("Product not found: {0}")]
    ProductNotFound(String),

    #[error("Customer not found: {0}")]
    CustomerNotFound(String),

    #[error("Sale not found: {0}")]
    SaleNotFound(String),

    #[error("Sale item {item_id} does not belong to sale {sale_id}")]
    SaleItemNotFound { sale_id: String, item_id: String },

    #[error("Stock transfer not found: {0}")]
    TransferNotFound(String),

    /// No snapshot exists for the pair. Records are never created implicitly
    /// by a mutation.
    #[error("No inventory record for product {product_id} at branch {branch_id}")]
    InventoryRecordNotFound {
        branch_id: String,
        product_id: String,
    },

    #[error("Product {0} is inactive and cannot be sold")]
    ProductInactive(String),

    /// Applying the change would drive the snapshot below zero.
    ///
    /// ## When This Occurs
    /// ```text
    /// Sale line (qty: 5)          Transfer completion (qty: 5)
    ///      │                             │
    ///      ▼                             ▼
    /// snapshot quantity = 3 ◄──── re-validated at apply time
    ///      │
    ///      ▼
    /// InsufficientStock { available: 3, requested: 5 }
    /// ```
    #[error(
        "Insufficient stock for product {product_id} at branch {branch_id}: \
         available {available}, requested {requested}"
    )]
    InsufficientStock {
        branch_id: String,
        product_id: String,
        available: i64,
        requested: i64,
    },

    #[error("Insufficient payment: total {total_cents}, paid {paid_cents}")]
    InsufficientPayment { total_cents: i64, paid_cents: i64 },

    #[error("Sale has no items")]
    EmptySale,

    #[error("Stock transfer has no items")]
    EmptyTransfer,

    #[error("Sale {0} is already fully refunded")]
    AlreadyRefunded(String),

    #[error("Sale {sale_id} is {status:?}, cannot perform operation")]
    InvalidSaleState { sale_id: String, status: SaleStatus },

    #[error(
        "Refund of {requested} exceeds refundable quantity {refundable} for sale item {sale_item_id}"
    )]
    RefundExceedsQuantity {
        sale_item_id: String,
        refundable: i64,
        requested: i64,
    },

    #[error("Stock transfer {transfer_id} is {status:?}, expected Pending")]
    InvalidTransferState {
        transfer_id: String,
        status: TransferStatus,
    },

    #[error("Source and destination branch are the same: {0}")]
    SameSourceAndDestination(String),

    /// Debt can only be posted against a known customer.
    #[error("Payment method {payment_method:?} requires a customer")]
    CustomerRequired { payment_method: PaymentMethod },

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Returns the stable category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::BranchNotFound(_)
            | CoreError::ProductNotFound(_)
            | CoreError::CustomerNotFound(_)
            | CoreError::SaleNotFound(_)
            | CoreError::SaleItemNotFound { .. }
            | CoreError::TransferNotFound(_)
            | CoreError::InventoryRecordNotFound { .. } => ErrorKind::NotFound,
            CoreError::Validation(_) => ErrorKind::Validation,
            _ => ErrorKind::BusinessRule,
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised before any write happens.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be zero (signed deltas).
    #[error("{field} must not be zero")]
    MustBeNonZero { field: String },

    /// Invalid format (e.g., invalid UUID, malformed sale number).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Duplicate value (e.g., duplicate SKU).
    #[error("{field} '{value}' already exists")]
    Duplicate { field: String, value: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

//! # Domain Types
//!
//! Entities persisted by the stock & ledger engine.
//!
//! ## Type Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  Catalog (collaborators)     Snapshot              Event logs           │
//! │  ─────────────────────       ────────              ──────────           │
//! │  Branch                      InventoryRecord       Sale + SaleItem      │
//! │  Product                     (branch, product)     SaleRefund + items   │
//! │  Customer                    quantity ≥ 0          StockTransfer + items│
//! │                                                    StockAdjustment      │
//! │                                                                         │
//! │  Ledgers (append-only, balance is a fold)                              │
//! │  ─────────────────────────────────────────                             │
//! │  CustomerTransaction   SALE (+)  PAYMENT (−)                           │
//! │  CashRegisterTransaction  *_IN (+)  *_OUT (−)                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Identity
//! Every entity has a UUID v4 `id`. Business identifiers (sku, branch code,
//! sale number) are unique but separate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;

// =============================================================================
// Catalog Collaborators
// =============================================================================

/// A store location holding its own stock and cash register.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Branch {
    pub id: String,
    /// Short unique business code, e.g. `DOWNTOWN`.
    pub code: String,
    pub name: String,
    pub address: Option<String>,
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// A sellable product with its catalog price.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Product {
    pub id: String,
    /// Stock Keeping Unit - unique business identifier.
    pub sku: String,
    pub barcode: Option<String>,
    pub name: String,
    pub description: Option<String>,
    /// Catalog price in cents. Sale lines may override it.
    pub price_cents: i64,
    pub cost_cents: Option<i64>,
    /// Inactive products stay referenced by history but cannot be sold.
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }
}

/// A customer who may buy on credit.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Customer {
    pub id: String,
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Inventory Snapshot
// =============================================================================

/// Current quantity of one product at one branch.
///
/// At most one record per (branch_id, product_id). `quantity` never goes
/// negative and changes only through the inventory mutation path.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct InventoryRecord {
    pub id: String,
    pub branch_id: String,
    pub product_id: String,
    pub quantity: i64,
    pub min_stock_level: i64,
    pub max_stock_level: Option<i64>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl InventoryRecord {
    /// True when stock has fallen to or below the reorder level.
    pub fn is_low_stock(&self) -> bool {
        self.quantity <= self.min_stock_level
    }
}

// =============================================================================
// Sale Status
// =============================================================================

/// The status of a sale.
///
/// ```text
/// COMPLETED ──refund (partial)──► PARTIALLY_REFUNDED ──refund (rest)──► REFUNDED
///     │                                                                  ▲
///     └──────────────────────refund (everything)─────────────────────────┘
///
/// CANCELLED is only reachable before completion; creation is atomic so the
/// engine never produces it, but it is honoured when present.
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SaleStatus {
    Completed,
    PartiallyRefunded,
    Refunded,
    Cancelled,
}

impl SaleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SaleStatus::Completed => "COMPLETED",
            SaleStatus::PartiallyRefunded => "PARTIALLY_REFUNDED",
            SaleStatus::Refunded => "REFUNDED",
            SaleStatus::Cancelled => "CANCELLED",
        }
    }
}

// =============================================================================
// Payment Method
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    /// Physical cash.
    Cash,
    /// Card on an external terminal.
    Card,
    /// Whole total posted to the customer's debt.
    Credit,
    /// Part paid now, remainder posted to the customer's debt.
    Mixed,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "CASH",
            PaymentMethod::Card => "CARD",
            PaymentMethod::Credit => "CREDIT",
            PaymentMethod::Mixed => "MIXED",
        }
    }
}

// =============================================================================
// Sale
// =============================================================================

/// A completed sale. Created atomically with its items.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Sale {
    pub id: String,
    /// `SAL-YYYYMMDD-NNNNN`, unique, strictly increasing within a day.
    pub sale_number: String,
    pub branch_id: String,
    pub customer_id: Option<String>,
    pub cashier_id: String,
    pub subtotal_cents: i64,
    pub discount_cents: i64,
    pub tax_cents: i64,
    pub total_cents: i64,
    pub paid_amount_cents: i64,
    pub change_amount_cents: i64,
    pub payment_method: PaymentMethod,
    pub status: SaleStatus,
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Sale {
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }

    #[inline]
    pub fn subtotal(&self) -> Money {
        Money::from_cents(self.subtotal_cents)
    }
}

/// A line of a sale. Immutable once written; refunds reference it.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct SaleItem {
    pub id: String,
    pub sale_id: String,
    /// 1-based position within the sale.
    pub line_number: i64,
    pub product_id: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
    pub discount_cents: i64,
    /// unit_price × quantity − discount
    pub total_cents: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl SaleItem {
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }
}

/// A sale with its ordered items.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaleDetail {
    pub sale: Sale,
    pub items: Vec<SaleItem>,
}

/// One refund event against a sale.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct SaleRefund {
    pub id: String,
    pub sale_id: String,
    pub amount_cents: i64,
    pub reason: Option<String>,
    pub created_by: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// Quantity and amount refunded for one sale line within a refund event.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct SaleRefundItem {
    pub id: String,
    pub refund_id: String,
    pub sale_item_id: String,
    pub quantity: i64,
    pub amount_cents: i64,
}

/// Result of a refund: the updated sale and what was refunded.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct RefundOutcome {
    pub sale: Sale,
    pub refund: SaleRefund,
    pub items: Vec<SaleRefundItem>,
}

// =============================================================================
// Stock Transfer
// =============================================================================

/// Lifecycle of a stock transfer.
///
/// ```text
/// PENDING ──complete──► COMPLETED   (stock moved, terminal)
///    │
///    └────cancel──────► CANCELLED   (nothing ever moved, terminal)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransferStatus {
    Pending,
    Completed,
    Cancelled,
}

impl TransferStatus {
    /// Only PENDING transfers may move to another state.
    pub fn can_transition_to(&self, next: TransferStatus) -> bool {
        matches!(
            (self, next),
            (TransferStatus::Pending, TransferStatus::Completed)
                | (TransferStatus::Pending, TransferStatus::Cancelled)
        )
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, TransferStatus::Pending)
    }
}

/// Movement of stock between two branches.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct StockTransfer {
    pub id: String,
    pub from_branch_id: String,
    pub to_branch_id: String,
    pub status: TransferStatus,
    pub notes: Option<String>,
    pub created_by: String,
    pub completed_by: Option<String>,
    pub cancelled_by: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub completed_at: Option<DateTime<Utc>>,
    #[ts(as = "Option<String>")]
    pub cancelled_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct StockTransferItem {
    pub id: String,
    pub transfer_id: String,
    pub line_number: i64,
    pub product_id: String,
    pub quantity: i64,
}

/// A transfer with its ordered items.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TransferDetail {
    pub transfer: StockTransfer,
    pub items: Vec<StockTransferItem>,
}

// =============================================================================
// Stock Adjustment
// =============================================================================

/// Audit row for a manual stock correction (shrinkage, recount, damage).
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct StockAdjustment {
    pub id: String,
    pub branch_id: String,
    pub product_id: String,
    /// Signed change applied to the snapshot.
    pub quantity_delta: i64,
    /// Snapshot quantity right after the change.
    pub quantity_after: i64,
    pub reason: String,
    pub notes: Option<String>,
    pub created_by: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Customer Ledger
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CustomerTransactionType {
    /// Credit sale: increases debt.
    Sale,
    /// Customer paid: decreases debt.
    Payment,
}

/// Append-only customer debt entry.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct CustomerTransaction {
    pub id: String,
    pub customer_id: String,
    pub transaction_type: CustomerTransactionType,
    /// Always > 0; the type carries the sign.
    pub amount_cents: i64,
    pub sale_id: Option<String>,
    pub notes: Option<String>,
    pub created_by: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Cash Register Ledger
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CashTransactionType {
    SaleIn,
    RefundOut,
    CancelOut,
    ManualIn,
    ManualOut,
}

impl CashTransactionType {
    /// Manual entries are the only types a cashier may post directly.
    pub fn is_manual(&self) -> bool {
        matches!(self, CashTransactionType::ManualIn | CashTransactionType::ManualOut)
    }
}

/// Append-only cash register entry for a branch.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct CashRegisterTransaction {
    pub id: String,
    pub branch_id: String,
    pub transaction_type: CashTransactionType,
    /// Always > 0; the type carries the sign.
    pub amount_cents: i64,
    pub sale_id: Option<String>,
    pub payment_method: Option<PaymentMethod>,
    pub notes: Option<String>,
    pub created_by: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transfer_transitions() {
        assert!(TransferStatus::Pending.can_transition_to(TransferStatus::Completed));
        assert!(TransferStatus::Pending.can_transition_to(TransferStatus::Cancelled));
        assert!(!TransferStatus::Completed.can_transition_to(TransferStatus::Cancelled));
        assert!(!TransferStatus::Cancelled.can_transition_to(TransferStatus::Completed));
        assert!(!TransferStatus::Pending.can_transition_to(TransferStatus::Pending));
        assert!(TransferStatus::Completed.is_terminal());
        assert!(!TransferStatus::Pending.is_terminal());
    }

    #[test]
    fn test_enum_wire_format() {
        assert_eq!(
            serde_json::to_string(&SaleStatus::PartiallyRefunded).unwrap(),
            "\"PARTIALLY_REFUNDED\""
        );
        assert_eq!(
            serde_json::to_string(&CashTransactionType::RefundOut).unwrap(),
            "\"REFUND_OUT\""
        );
        let method: PaymentMethod = serde_json::from_str("\"MIXED\"").unwrap();
        assert_eq!(method, PaymentMethod::Mixed);
        assert_eq!(SaleStatus::PartiallyRefunded.as_str(), "PARTIALLY_REFUNDED");
    }

    #[test]
    fn test_manual_cash_types() {
        assert!(CashTransactionType::ManualIn.is_manual());
        assert!(CashTransactionType::ManualOut.is_manual());
        assert!(!CashTransactionType::SaleIn.is_manual());
        assert!(!CashTransactionType::RefundOut.is_manual());
    }
}

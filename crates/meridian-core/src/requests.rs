//! # Request Types
//!
//! Validated input handed to the engine by the boundary layer. Each request
//! is paired with an acting-user id at the call site.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::types::{CashTransactionType, PaymentMethod};

// =============================================================================
// Catalog
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewBranch {
    pub code: String,
    pub name: String,
    pub address: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewProduct {
    pub sku: String,
    pub barcode: Option<String>,
    pub name: String,
    pub description: Option<String>,
    pub price_cents: i64,
    pub cost_cents: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewCustomer {
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
}

// =============================================================================
// Inventory
// =============================================================================

/// First stock assignment for a branch/product pair.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewInventoryRecord {
    pub branch_id: String,
    pub product_id: String,
    pub quantity: i64,
    #[serde(default)]
    pub min_stock_level: i64,
    pub max_stock_level: Option<i64>,
}

// =============================================================================
// Sale
// =============================================================================

/// One requested sale line.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewSaleLine {
    pub product_id: String,
    pub quantity: i64,
    /// Overrides the catalog price when present.
    pub unit_price_cents: Option<i64>,
    #[serde(default)]
    pub discount_cents: i64,
}

impl NewSaleLine {
    /// A line at catalog price with no discount.
    pub fn new(product_id: impl Into<String>, quantity: i64) -> Self {
        NewSaleLine {
            product_id: product_id.into(),
            quantity,
            unit_price_cents: None,
            discount_cents: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewSale {
    pub branch_id: String,
    pub customer_id: Option<String>,
    pub payment_method: PaymentMethod,
    pub items: Vec<NewSaleLine>,
    /// Discount on the whole sale, applied after line discounts.
    #[serde(default)]
    pub discount_cents: i64,
    /// Amount handed over. Defaults to the exact total for CASH/CARD and to
    /// zero for CREDIT/MIXED.
    pub paid_amount_cents: Option<i64>,
    pub notes: Option<String>,
}

/// Quantity to refund for one sale line.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct RefundLine {
    pub sale_item_id: String,
    pub quantity: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct RefundRequest {
    /// `None` refunds everything still refundable on every line.
    pub lines: Option<Vec<RefundLine>>,
    pub reason: Option<String>,
}

// =============================================================================
// Transfer & Adjustment
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewTransferItem {
    pub product_id: String,
    pub quantity: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewTransfer {
    pub from_branch_id: String,
    pub to_branch_id: String,
    pub items: Vec<NewTransferItem>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewAdjustment {
    pub branch_id: String,
    pub product_id: String,
    /// Signed, non-zero.
    pub quantity_delta: i64,
    pub reason: String,
    pub notes: Option<String>,
}

// =============================================================================
// Ledgers
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewCustomerPayment {
    pub customer_id: String,
    pub amount_cents: i64,
    pub notes: Option<String>,
}

/// Manual cash movement (float top-up, petty cash, bank drop).
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewCashEntry {
    pub branch_id: String,
    pub transaction_type: CashTransactionType,
    pub amount_cents: i64,
    pub notes: Option<String>,
}

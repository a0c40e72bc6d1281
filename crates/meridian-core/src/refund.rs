//! # Refund Planning
//!
//! Decides what a refund request returns, line by line, before any write.
//!
//! ## Rules
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  refundable(line) = line.quantity − Σ earlier refunds of that line      │
//! │                                                                         │
//! │  requested > refundable          → RefundExceedsQuantity               │
//! │  sale REFUNDED                   → AlreadyRefunded                     │
//! │  sale CANCELLED                  → InvalidSaleState                    │
//! │                                                                         │
//! │  line amount = line total × qty / line qty × sale total / subtotal      │
//! │  (sale-level discount is spread proportionally)                         │
//! │                                                                         │
//! │  every line fully refunded  → REFUNDED, amount closes out the total    │
//! │  otherwise                  → PARTIALLY_REFUNDED                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashMap;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::requests::RefundLine;
use crate::types::{Sale, SaleItem, SaleStatus};
use crate::validation::validate_quantity;

/// One sale line to return.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedRefundLine {
    pub sale_item_id: String,
    pub product_id: String,
    pub quantity: i64,
    pub amount: Money,
}

/// Everything a refund will write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefundPlan {
    pub lines: Vec<PlannedRefundLine>,
    pub amount: Money,
    pub resulting_status: SaleStatus,
}

/// Builds a refund plan.
///
/// `already_refunded` maps sale item id to the quantity returned by earlier
/// refunds; `refunded_so_far` is the money already given back. With
/// `requested == None` every line is refunded in full.
pub fn plan_refund(
    sale: &Sale,
    items: &[SaleItem],
    already_refunded: &HashMap<String, i64>,
    refunded_so_far: Money,
    requested: Option<&[RefundLine]>,
) -> CoreResult<RefundPlan> {
    match sale.status {
        SaleStatus::Refunded => return Err(CoreError::AlreadyRefunded(sale.id.clone())),
        SaleStatus::Cancelled => {
            return Err(CoreError::InvalidSaleState {
                sale_id: sale.id.clone(),
                status: sale.status,
            })
        }
        SaleStatus::Completed | SaleStatus::PartiallyRefunded => {}
    }

    let refundable = |item: &SaleItem| {
        item.quantity - already_refunded.get(&item.id).copied().unwrap_or(0)
    };

    // Quantity per sale item, in sale line order.
    let mut wanted: Vec<(&SaleItem, i64)> = Vec::new();
    match requested {
        None => {
            for item in items {
                let remaining = refundable(item);
                if remaining > 0 {
                    wanted.push((item, remaining));
                }
            }
        }
        Some([]) => {
            return Err(ValidationError::Required {
                field: "lines".to_string(),
            }
            .into())
        }
        Some(lines) => {
            let mut per_item: HashMap<&str, i64> = HashMap::new();
            for line in lines {
                validate_quantity(line.quantity)?;
                if !items.iter().any(|i| i.id == line.sale_item_id) {
                    return Err(CoreError::SaleItemNotFound {
                        sale_id: sale.id.clone(),
                        item_id: line.sale_item_id.clone(),
                    });
                }
                *per_item.entry(line.sale_item_id.as_str()).or_insert(0) += line.quantity;
            }
            for item in items {
                if let Some(&qty) = per_item.get(item.id.as_str()) {
                    let remaining = refundable(item);
                    if qty > remaining {
                        return Err(CoreError::RefundExceedsQuantity {
                            sale_item_id: item.id.clone(),
                            refundable: remaining,
                            requested: qty,
                        });
                    }
                    wanted.push((item, qty));
                }
            }
        }
    }

    if wanted.is_empty() {
        return Err(CoreError::AlreadyRefunded(sale.id.clone()));
    }

    let subtotal = sale.subtotal();
    let total = sale.total();
    let mut lines: Vec<PlannedRefundLine> = wanted
        .iter()
        .map(|(item, qty)| {
            let gross = item.total().prorate(*qty, item.quantity);
            let amount = if subtotal.is_zero() {
                Money::zero()
            } else {
                gross.prorate(total.cents(), subtotal.cents())
            };
            PlannedRefundLine {
                sale_item_id: item.id.clone(),
                product_id: item.product_id.clone(),
                quantity: *qty,
                amount,
            }
        })
        .collect();

    let completes = items.iter().all(|item| {
        let planned = wanted
            .iter()
            .find(|(w, _)| w.id == item.id)
            .map(|(_, q)| *q)
            .unwrap_or(0);
        refundable(item) - planned == 0
    });

    let mut amount: Money = lines.iter().map(|l| l.amount).sum();
    let resulting_status = if completes {
        // Absorb rounding so the sale is returned to the cent.
        let target = (total - refunded_so_far).clamp_to_zero();
        if let Some(last) = lines.last_mut() {
            last.amount = (last.amount + (target - amount)).clamp_to_zero();
        }
        amount = lines.iter().map(|l| l.amount).sum();
        SaleStatus::Refunded
    } else {
        SaleStatus::PartiallyRefunded
    };

    Ok(RefundPlan {
        lines,
        amount,
        resulting_status,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

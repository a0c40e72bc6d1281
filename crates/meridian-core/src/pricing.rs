//! # Sale Pricing
//!
//! Turns requested sale lines into priced lines and settles the payment.
//!
//! ## Settlement
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  line total  = unit price × quantity − line discount                    │
//! │  subtotal    = Σ line totals                                            │
//! │  total       = subtotal − sale discount + tax (always 0)                │
//! │  change      = max(0, paid − total)                                     │
//! │                                                                         │
//! │  Method   must cover total?        debt posted        cash drawer       │
//! │  ──────   ─────────────────        ───────────        ───────────       │
//! │  CASH     yes                      0                  total             │
//! │  CARD     yes                      0                  total             │
//! │  CREDIT   no (customer required)   total              0                 │
//! │  MIXED    only without customer    total − paid       min(paid, total)  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! MIXED treats the whole paid amount as cash; there are no split fields.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::requests::NewSaleLine;
use crate::types::PaymentMethod;
use crate::validation::{validate_price_cents, validate_quantity};
use crate::MAX_AMOUNT_CENTS;

/// A sale line with its final price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricedLine {
    pub product_id: String,
    pub quantity: i64,
    pub unit_price: Money,
    pub discount: Money,
    pub total: Money,
}

/// Money breakdown of a settled sale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleTotals {
    pub subtotal: Money,
    pub discount: Money,
    pub tax: Money,
    pub total: Money,
    pub paid: Money,
    pub change: Money,
    /// Portion posted to the customer's debt.
    pub credit_portion: Money,
    /// Portion that lands in the branch cash register.
    pub register_portion: Money,
}

/// Prices one line against the catalog price.
///
/// ```rust
/// use meridian_core::money::Money;
/// use meridian_core::pricing::price_line;
/// use meridian_core::requests::NewSaleLine;
///
/// let mut line = NewSaleLine::new("p1", 3);
/// line.discount_cents = 100;
/// let priced = price_line(&line, Money::from_cents(500)).unwrap();
/// assert_eq!(priced.total.cents(), 1400);
/// ```
pub fn price_line(line: &NewSaleLine, catalog_price: Money) -> CoreResult<PricedLine> {
    validate_quantity(line.quantity)?;

    let unit_price = match line.unit_price_cents {
        Some(cents) => {
            validate_price_cents(cents)?;
            Money::from_cents(cents)
        }
        None => catalog_price,
    };

    let gross = unit_price.multiply_quantity(line.quantity);
    if line.discount_cents < 0 || line.discount_cents > gross.cents() {
        return Err(ValidationError::OutOfRange {
            field: "line discount".to_string(),
            min: 0,
            max: gross.cents(),
        }
        .into());
    }
    let discount = Money::from_cents(line.discount_cents);

    Ok(PricedLine {
        product_id: line.product_id.clone(),
        quantity: line.quantity,
        unit_price,
        discount,
        total: gross - discount,
    })
}

/// Computes totals and validates the payment for a set of priced lines.
///
/// ## Errors
/// - `EmptySale` when there are no lines
/// - `CustomerRequired` for CREDIT without a customer
/// - `InsufficientPayment` when the paid amount must cover the total and
///   does not
pub fn settle(
    lines: &[PricedLine],
    sale_discount_cents: i64,
    method: PaymentMethod,
    paid_amount_cents: Option<i64>,
    has_customer: bool,
) -> CoreResult<SaleTotals> {
    if lines.is_empty() {
        return Err(CoreError::EmptySale);
    }

    let subtotal: Money = lines.iter().map(|l| l.total).sum();

    if sale_discount_cents < 0 || sale_discount_cents > subtotal.cents() {
        return Err(ValidationError::OutOfRange {
            field: "discount".to_string(),
            min: 0,
            max: subtotal.cents(),
        }
        .into());
    }
    let discount = Money::from_cents(sale_discount_cents);
    let tax = Money::zero();
    let total = subtotal - discount + tax;

    if method == PaymentMethod::Credit && !has_customer {
        return Err(CoreError::CustomerRequired {
            payment_method: method,
        });
    }

    let paid = match paid_amount_cents {
        Some(cents) => {
            if !(0..=MAX_AMOUNT_CENTS).contains(&cents) {
                return Err(ValidationError::OutOfRange {
                    field: "paid amount".to_string(),
                    min: 0,
                    max: MAX_AMOUNT_CENTS,
                }
                .into());
            }
            Money::from_cents(cents)
        }
        None => match method {
            PaymentMethod::Cash | PaymentMethod::Card => total,
            PaymentMethod::Credit | PaymentMethod::Mixed => Money::zero(),
        },
    };

    let debt_allowed = match method {
        PaymentMethod::Credit => true,
        PaymentMethod::Mixed => has_customer,
        PaymentMethod::Cash | PaymentMethod::Card => false,
    };
    if !debt_allowed && paid < total {
        return Err(CoreError::InsufficientPayment {
            total_cents: total.cents(),
            paid_cents: paid.cents(),
        });
    }

    let (credit_portion, register_portion) = match method {
        PaymentMethod::Cash | PaymentMethod::Card => (Money::zero(), total),
        PaymentMethod::Credit => (total, Money::zero()),
        PaymentMethod::Mixed => {
            let credit = if has_customer {
                (total - paid).clamp_to_zero()
            } else {
                Money::zero()
            };
            (credit, paid.min(total))
        }
    };

    Ok(SaleTotals {
        subtotal,
        discount,
        tax,
        total,
        paid,
        change: (paid - total).clamp_to_zero(),
        credit_portion,
        register_portion,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MAX_LINES_PER_DOCUMENT, MAX_LINE_QUANTITY, MAX_PRICE_CENTS};

    fn line(product: &str, qty: i64, price: i64) -> PricedLine {
        price_line(&NewSaleLine::new(product, qty), Money::from_cents(price)).unwrap()
    }

    #[test]
    fn test_price_line_uses_override() {
        let mut req = NewSaleLine::new("p1", 2);
        req.unit_price_cents = Some(250);
        let priced = price_line(&req, Money::from_cents(999)).unwrap();
        assert_eq!(priced.unit_price.cents(), 250);
        assert_eq!(priced.total.cents(), 500);
    }

    #[test]
    fn test_price_line_rejects_bad_input() {
        assert!(price_line(&NewSaleLine::new("p1", 0), Money::from_cents(100)).is_err());

        let mut req = NewSaleLine::new("p1", 1);
        req.discount_cents = 101;
        assert!(price_line(&req, Money::from_cents(100)).is_err());

        let mut req = NewSaleLine::new("p1", 1);
        req.unit_price_cents = Some(-1);
        assert!(price_line(&req, Money::from_cents(100)).is_err());
    }

    #[test]
    fn test_settle_cash_with_change() {
        let lines = vec![line("a", 2, 500), line("b", 1, 250)];
        let totals = settle(&lines, 250, PaymentMethod::Cash, Some(1000), false).unwrap();

        assert_eq!(totals.subtotal.cents(), 1250);
        assert_eq!(totals.total.cents(), 1000);
        assert_eq!(totals.change.cents(), 0);
        assert_eq!(totals.register_portion.cents(), 1000);
        assert_eq!(totals.credit_portion, Money::zero());

        let totals = settle(&lines, 0, PaymentMethod::Cash, Some(2000), false).unwrap();
        assert_eq!(totals.change.cents(), 750);
        assert_eq!(totals.register_portion.cents(), 1250);
    }

    #[test]
    fn test_settle_defaults_exact_payment() {
        let lines = vec![line("a", 1, 700)];
        let totals = settle(&lines, 0, PaymentMethod::Card, None, false).unwrap();
        assert_eq!(totals.paid.cents(), 700);
        assert_eq!(totals.change, Money::zero());
    }

    #[test]
    fn test_settle_insufficient_payment() {
        let lines = vec![line("a", 1, 700)];
        let err = settle(&lines, 0, PaymentMethod::Cash, Some(699), false).unwrap_err();
        assert!(matches!(
            err,
            CoreError::InsufficientPayment {
                total_cents: 700,
                paid_cents: 699
            }
        ));

        let err = settle(&lines, 0, PaymentMethod::Mixed, Some(100), false).unwrap_err();
        assert!(matches!(err, CoreError::InsufficientPayment { .. }));
    }

    #[test]
    fn test_settle_credit() {
        let lines = vec![line("a", 1, 10000)];
        let totals = settle(&lines, 0, PaymentMethod::Credit, None, true).unwrap();
        assert_eq!(totals.credit_portion.cents(), 10000);
        assert_eq!(totals.register_portion, Money::zero());

        let err = settle(&lines, 0, PaymentMethod::Credit, None, false).unwrap_err();
        assert!(matches!(err, CoreError::CustomerRequired { .. }));
    }

    #[test]
    fn test_settle_mixed_with_customer() {
        let lines = vec![line("a", 1, 10000)];
        let totals = settle(&lines, 0, PaymentMethod::Mixed, Some(3000), true).unwrap();
        assert_eq!(totals.credit_portion.cents(), 7000);
        assert_eq!(totals.register_portion.cents(), 3000);

        let totals = settle(&lines, 0, PaymentMethod::Mixed, Some(12000), true).unwrap();
        assert_eq!(totals.credit_portion, Money::zero());
        assert_eq!(totals.register_portion.cents(), 10000);
        assert_eq!(totals.change.cents(), 2000);
    }

    #[test]
    fn test_settle_empty_and_discount_bounds() {
        assert!(matches!(
            settle(&[], 0, PaymentMethod::Cash, None, false),
            Err(CoreError::EmptySale)
        ));

        let lines = vec![line("a", 1, 500)];
        assert!(settle(&lines, 501, PaymentMethod::Cash, None, false).is_err());
        assert!(settle(&lines, -1, PaymentMethod::Cash, None, false).is_err());
    }

    #[test]
    fn test_extreme_prices_rejected_without_overflow() {
        let mut huge = NewSaleLine::new("a", 2);
        huge.unit_price_cents = Some(i64::MAX);
        assert!(matches!(
            price_line(&huge, Money::zero()),
            Err(CoreError::Validation(ValidationError::OutOfRange { .. }))
        ));

        // The largest accepted document still totals inside i64.
        let mut top = NewSaleLine::new("a", MAX_LINE_QUANTITY);
        top.unit_price_cents = Some(MAX_PRICE_CENTS);
        let priced = price_line(&top, Money::zero()).unwrap();
        let lines = vec![priced; MAX_LINES_PER_DOCUMENT];
        let totals = settle(&lines, 0, PaymentMethod::Card, None, false).unwrap();
        assert_eq!(totals.total.cents(), MAX_AMOUNT_CENTS);

        let lines = vec![line("a", 1, 500)];
        assert!(matches!(
            settle(&lines, 0, PaymentMethod::Cash, Some(i64::MAX), false),
            Err(CoreError::Validation(ValidationError::OutOfRange { .. }))
        ));
    }
}

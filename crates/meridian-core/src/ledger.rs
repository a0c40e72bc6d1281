//! # Ledgers
//!
//! Customer debt and cash register balances are never stored. They are
//! folds over append-only entries.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Customer:  balance = Σ SALE − Σ PAYMENT        (> 0 means owes us)     │
//! │  Register:  balance = Σ *_IN − Σ *_OUT                                  │
//! │                                                                         │
//! │  Entry amounts are always > 0; the entry type carries the direction.    │
//! │  Folding the same entries twice yields the same balance.                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::types::{
    CashRegisterTransaction, CashTransactionType, CustomerTransaction, CustomerTransactionType,
};

/// Which way an entry moves the balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Increase,
    Decrease,
}

impl CustomerTransactionType {
    pub fn direction(&self) -> Direction {
        match self {
            CustomerTransactionType::Sale => Direction::Increase,
            CustomerTransactionType::Payment => Direction::Decrease,
        }
    }
}

impl CashTransactionType {
    pub fn direction(&self) -> Direction {
        match self {
            CashTransactionType::SaleIn | CashTransactionType::ManualIn => Direction::Increase,
            CashTransactionType::RefundOut
            | CashTransactionType::CancelOut
            | CashTransactionType::ManualOut => Direction::Decrease,
        }
    }
}

/// An entry that can be folded into a balance.
pub trait LedgerEntry {
    fn direction(&self) -> Direction;
    fn amount(&self) -> Money;
    fn recorded_at(&self) -> DateTime<Utc>;
}

impl LedgerEntry for CustomerTransaction {
    fn direction(&self) -> Direction {
        self.transaction_type.direction()
    }

    fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }

    fn recorded_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl LedgerEntry for CashRegisterTransaction {
    fn direction(&self) -> Direction {
        self.transaction_type.direction()
    }

    fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }

    fn recorded_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Summed view of a ledger up to a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LedgerBalance {
    pub increases_cents: i64,
    pub decreases_cents: i64,
    pub balance_cents: i64,
    pub entry_count: i64,
}

impl LedgerBalance {
    #[inline]
    pub fn balance(&self) -> Money {
        Money::from_cents(self.balance_cents)
    }
}

/// Folds entries into a balance, ignoring entries after `as_of`.
///
/// ```rust
/// use meridian_core::ledger::{fold_balance, LedgerBalance};
/// use meridian_core::types::CustomerTransaction;
///
/// let empty: Vec<CustomerTransaction> = Vec::new();
/// assert_eq!(fold_balance(&empty, None), LedgerBalance::default());
/// ```
pub fn fold_balance<'a, E, I>(entries: I, as_of: Option<DateTime<Utc>>) -> LedgerBalance
where
    E: LedgerEntry + 'a,
    I: IntoIterator<Item = &'a E>,
{
    // Summed in i128; a long history of large entries can exceed i64.
    let mut increases: i128 = 0;
    let mut decreases: i128 = 0;
    let mut count = 0;

    for entry in entries {
        if as_of.is_some_and(|cutoff| entry.recorded_at() > cutoff) {
            continue;
        }
        let amount = entry.amount().cents() as i128;
        match entry.direction() {
            Direction::Increase => increases += amount,
            Direction::Decrease => decreases += amount,
        }
        count += 1;
    }

    LedgerBalance {
        increases_cents: saturate(increases),
        decreases_cents: saturate(decreases),
        balance_cents: saturate(increases - decreases),
        entry_count: count,
    }
}

fn saturate(cents: i128) -> i64 {
    cents.clamp(i64::MIN as i128, i64::MAX as i128) as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn customer_tx(kind: CustomerTransactionType, cents: i64, at: DateTime<Utc>) -> CustomerTransaction {
        CustomerTransaction {
            id: uuid::Uuid::new_v4().to_string(),
            customer_id: "c1".into(),
            transaction_type: kind,
            amount_cents: cents,
            sale_id: None,
            notes: None,
            created_by: "u1".into(),
            created_at: at,
        }
    }

    #[test]
    fn test_credit_then_payment() {
        let t0 = Utc::now();
        let entries = vec![
            customer_tx(CustomerTransactionType::Sale, 10000, t0),
            customer_tx(CustomerTransactionType::Payment, 4000, t0 + Duration::minutes(5)),
        ];

        let balance = fold_balance(&entries, None);
        assert_eq!(balance.balance_cents, 6000);
        assert_eq!(balance.entry_count, 2);

        // before the payment
        let earlier = fold_balance(&entries, Some(t0 + Duration::minutes(1)));
        assert_eq!(earlier.balance_cents, 10000);

        // folding twice gives the same answer
        assert_eq!(fold_balance(&entries, None), balance);
    }

    #[test]
    fn test_cash_directions() {
        assert_eq!(CashTransactionType::SaleIn.direction(), Direction::Increase);
        assert_eq!(CashTransactionType::ManualIn.direction(), Direction::Increase);
        assert_eq!(CashTransactionType::RefundOut.direction(), Direction::Decrease);
        assert_eq!(CashTransactionType::CancelOut.direction(), Direction::Decrease);
        assert_eq!(CashTransactionType::ManualOut.direction(), Direction::Decrease);
    }

    #[test]
    fn test_large_histories_do_not_overflow() {
        let t0 = Utc::now();
        let entries = vec![
            customer_tx(CustomerTransactionType::Sale, i64::MAX, t0),
            customer_tx(CustomerTransactionType::Sale, i64::MAX, t0),
            customer_tx(CustomerTransactionType::Payment, i64::MAX, t0),
        ];

        let balance = fold_balance(&entries, None);
        assert_eq!(balance.increases_cents, i64::MAX);
        assert_eq!(balance.balance_cents, i64::MAX);
        assert_eq!(balance.entry_count, 3);

        let settled = fold_balance(&entries[1..], None);
        assert_eq!(settled.balance_cents, 0);
    }
}

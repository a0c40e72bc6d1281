//! # Cash Register Repository
//!
//! Append-only cash movements per branch.
//!
//! ```text
//! SALE_IN     (+)  cash/card portion of a sale
//! MANUAL_IN   (+)  float top-up
//! REFUND_OUT  (−)  money returned on a refund
//! CANCEL_OUT  (−)  reversal of a cancelled sale
//! MANUAL_OUT  (−)  petty cash, bank drop
//!
//! balance = Σ *_IN − Σ *_OUT
//! ```

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use crate::error::DbResult;
use crate::pool::begin_write;
use crate::repository::branch::fetch_branch;
use crate::repository::new_id;
use meridian_core::ledger::{fold_balance, LedgerBalance};
use meridian_core::validation::{validate_amount_cents, validate_notes};
use meridian_core::{
    CashRegisterTransaction, CashTransactionType, NewCashEntry, PaymentMethod, ValidationError,
};

const CASH_TX_COLUMNS: &str = "id, branch_id, transaction_type, amount_cents, sale_id, \
                               payment_method, notes, created_by, created_at";

/// One entry to append to a branch register.
#[derive(Debug, Clone)]
pub struct CashEntry<'a> {
    pub branch_id: &'a str,
    pub transaction_type: CashTransactionType,
    pub amount_cents: i64,
    pub sale_id: Option<&'a str>,
    pub payment_method: Option<PaymentMethod>,
    pub notes: Option<&'a str>,
}

/// Repository for cash register entries.
#[derive(Debug, Clone)]
pub struct CashRegisterRepository {
    pool: SqlitePool,
}

impl CashRegisterRepository {
    /// Creates a new CashRegisterRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CashRegisterRepository { pool }
    }

    /// Appends an entry of any type. The branch must exist.
    pub async fn record_entry(
        &self,
        entry: &CashEntry<'_>,
        created_by: &str,
    ) -> DbResult<CashRegisterTransaction> {
        validate_amount_cents(entry.amount_cents)?;
        validate_notes(entry.notes)?;

        let mut tx = begin_write(&self.pool).await?;
        fetch_branch(&mut tx, entry.branch_id).await?;
        let recorded = insert_entry_in(&mut tx, entry, created_by).await?;
        tx.commit().await?;

        Ok(recorded)
    }

    /// Records a manual cash movement (MANUAL_IN or MANUAL_OUT only).
    pub async fn record_manual(
        &self,
        entry: &NewCashEntry,
        created_by: &str,
    ) -> DbResult<CashRegisterTransaction> {
        if !entry.transaction_type.is_manual() {
            return Err(ValidationError::InvalidFormat {
                field: "transaction_type".to_string(),
                reason: "must be MANUAL_IN or MANUAL_OUT".to_string(),
            }
            .into());
        }

        let recorded = self
            .record_entry(
                &CashEntry {
                    branch_id: &entry.branch_id,
                    transaction_type: entry.transaction_type,
                    amount_cents: entry.amount_cents,
                    sale_id: None,
                    payment_method: None,
                    notes: entry.notes.as_deref(),
                },
                created_by,
            )
            .await?;

        info!(
            branch_id = %entry.branch_id,
            transaction_type = ?entry.transaction_type,
            amount_cents = entry.amount_cents,
            "Manual cash entry recorded"
        );

        Ok(recorded)
    }

    /// All entries for a branch register, oldest first.
    pub async fn history(&self, branch_id: &str) -> DbResult<Vec<CashRegisterTransaction>> {
        let entries = sqlx::query_as::<_, CashRegisterTransaction>(&format!(
            "SELECT {CASH_TX_COLUMNS} FROM cash_register_transactions \
             WHERE branch_id = ?1 \
             ORDER BY created_at, rowid"
        ))
        .bind(branch_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    /// Entries written for one sale (its SALE_IN and any REFUND_OUT).
    pub async fn entries_for_sale(&self, sale_id: &str) -> DbResult<Vec<CashRegisterTransaction>> {
        let entries = sqlx::query_as::<_, CashRegisterTransaction>(&format!(
            "SELECT {CASH_TX_COLUMNS} FROM cash_register_transactions \
             WHERE sale_id = ?1 \
             ORDER BY created_at, rowid"
        ))
        .bind(sale_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    /// Register balance as of `as_of` (inclusive), or now.
    pub async fn balance(
        &self,
        branch_id: &str,
        as_of: Option<DateTime<Utc>>,
    ) -> DbResult<LedgerBalance> {
        let mut conn = self.pool.acquire().await?;
        fetch_branch(&mut conn, branch_id).await?;
        drop(conn);

        let entries = self.history(branch_id).await?;
        Ok(fold_balance(&entries, as_of))
    }
}

/// Appends an entry inside the caller's transaction.
pub(crate) async fn insert_entry_in(
    conn: &mut SqliteConnection,
    entry: &CashEntry<'_>,
    created_by: &str,
) -> DbResult<CashRegisterTransaction> {
    let recorded = CashRegisterTransaction {
        id: new_id(),
        branch_id: entry.branch_id.to_string(),
        transaction_type: entry.transaction_type,
        amount_cents: entry.amount_cents,
        sale_id: entry.sale_id.map(str::to_string),
        payment_method: entry.payment_method,
        notes: entry.notes.map(str::to_string),
        created_by: created_by.to_string(),
        created_at: Utc::now(),
    };

    debug!(
        branch_id = %recorded.branch_id,
        transaction_type = ?recorded.transaction_type,
        amount_cents = recorded.amount_cents,
        "Appending cash register entry"
    );

    sqlx::query(
        "INSERT INTO cash_register_transactions (\
            id, branch_id, transaction_type, amount_cents, sale_id, \
            payment_method, notes, created_by, created_at\
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
    )
    .bind(&recorded.id)
    .bind(&recorded.branch_id)
    .bind(recorded.transaction_type)
    .bind(recorded.amount_cents)
    .bind(&recorded.sale_id)
    .bind(recorded.payment_method)
    .bind(&recorded.notes)
    .bind(&recorded.created_by)
    .bind(recorded.created_at)
    .execute(&mut *conn)
    .await?;

    Ok(recorded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::*;
    use meridian_core::{CoreError, MAX_AMOUNT_CENTS};

    fn manual(branch_id: &str, kind: CashTransactionType, cents: i64) -> NewCashEntry {
        NewCashEntry {
            branch_id: branch_id.to_string(),
            transaction_type: kind,
            amount_cents: cents,
            notes: None,
        }
    }

    #[tokio::test]
    async fn test_manual_entries_fold() {
        let db = database().await;
        let b = branch(&db, "MAIN").await;
        let register = db.cash_register();

        register
            .record_manual(&manual(&b.id, CashTransactionType::ManualIn, 20000), USER)
            .await
            .unwrap();
        register
            .record_manual(&manual(&b.id, CashTransactionType::ManualOut, 5000), USER)
            .await
            .unwrap();

        let balance = register.balance(&b.id, None).await.unwrap();
        assert_eq!(balance.increases_cents, 20000);
        assert_eq!(balance.decreases_cents, 5000);
        assert_eq!(balance.balance_cents, 15000);

        let history = register.history(&b.id).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].transaction_type, CashTransactionType::ManualIn);
    }

    #[tokio::test]
    async fn test_manual_rejects_system_types() {
        let db = database().await;
        let b = branch(&db, "MAIN").await;

        let err = db
            .cash_register()
            .record_manual(&manual(&b.id, CashTransactionType::SaleIn, 100), USER)
            .await
            .unwrap_err();
        assert!(matches!(err.as_domain(), Some(CoreError::Validation(_))));

        let err = db
            .cash_register()
            .record_manual(&manual("ghost", CashTransactionType::ManualIn, 100), USER)
            .await
            .unwrap_err();
        assert!(matches!(err.as_domain(), Some(CoreError::BranchNotFound(_))));
    }

    #[tokio::test]
    async fn test_balance_as_of() {
        let db = database().await;
        let b = branch(&db, "MAIN").await;

        db.cash_register()
            .record_manual(&manual(&b.id, CashTransactionType::ManualIn, 1000), USER)
            .await
            .unwrap();
        let cutoff = Utc::now();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        db.cash_register()
            .record_manual(&manual(&b.id, CashTransactionType::ManualIn, 700), USER)
            .await
            .unwrap();

        let then = db.cash_register().balance(&b.id, Some(cutoff)).await.unwrap();
        assert_eq!(then.balance_cents, 1000);
        let now = db.cash_register().balance(&b.id, None).await.unwrap();
        assert_eq!(now.balance_cents, 1700);
    }

    #[tokio::test]
    async fn test_oversized_amounts_rejected_and_balance_stays_readable() {
        let db = database().await;
        let b = branch(&db, "MAIN").await;
        let register = db.cash_register();

        let err = register
            .record_manual(&manual(&b.id, CashTransactionType::ManualIn, i64::MAX), USER)
            .await
            .unwrap_err();
        assert!(matches!(err.as_domain(), Some(CoreError::Validation(_))));

        for _ in 0..2 {
            register
                .record_manual(
                    &manual(&b.id, CashTransactionType::ManualIn, MAX_AMOUNT_CENTS),
                    USER,
                )
                .await
                .unwrap();
        }

        let first = register.balance(&b.id, None).await.unwrap();
        assert_eq!(first.balance_cents, 2 * MAX_AMOUNT_CENTS);
        assert_eq!(register.balance(&b.id, None).await.unwrap(), first);
    }
}

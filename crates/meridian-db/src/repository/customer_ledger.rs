//! # Customer Ledger Repository
//!
//! Append-only record of what each customer owes.
//!
//! ```text
//! SALE     (+)  written by credit and mixed sales, inside the sale transaction
//! PAYMENT  (−)  written when the customer pays down their debt
//!
//! balance = Σ SALE − Σ PAYMENT      (negative means store credit)
//! ```
//!
//! Entries are never updated or deleted, and no balance column exists.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use crate::error::DbResult;
use crate::pool::begin_write;
use crate::repository::customer::fetch_customer;
use crate::repository::new_id;
use meridian_core::ledger::{fold_balance, LedgerBalance};
use meridian_core::validation::{validate_amount_cents, validate_notes};
use meridian_core::{CustomerTransaction, CustomerTransactionType, NewCustomerPayment};

const CUSTOMER_TX_COLUMNS: &str =
    "id, customer_id, transaction_type, amount_cents, sale_id, notes, created_by, created_at";

/// One entry to append to a customer's ledger.
#[derive(Debug, Clone)]
pub struct CustomerEntry<'a> {
    pub customer_id: &'a str,
    pub transaction_type: CustomerTransactionType,
    pub amount_cents: i64,
    pub sale_id: Option<&'a str>,
    pub notes: Option<&'a str>,
}

/// Repository for customer debt entries.
#[derive(Debug, Clone)]
pub struct CustomerLedgerRepository {
    pool: SqlitePool,
}

impl CustomerLedgerRepository {
    /// Creates a new CustomerLedgerRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CustomerLedgerRepository { pool }
    }

    /// Appends an entry. The customer must exist and the amount must be > 0.
    pub async fn record_entry(
        &self,
        entry: &CustomerEntry<'_>,
        created_by: &str,
    ) -> DbResult<CustomerTransaction> {
        validate_amount_cents(entry.amount_cents)?;
        validate_notes(entry.notes)?;

        let mut tx = begin_write(&self.pool).await?;
        fetch_customer(&mut tx, entry.customer_id).await?;
        let recorded = insert_entry_in(&mut tx, entry, created_by).await?;
        tx.commit().await?;

        Ok(recorded)
    }

    /// Records a payment against a customer's debt.
    ///
    /// Payments larger than the debt are accepted; the balance goes negative.
    pub async fn record_payment(
        &self,
        payment: &NewCustomerPayment,
        created_by: &str,
    ) -> DbResult<CustomerTransaction> {
        let recorded = self
            .record_entry(
                &CustomerEntry {
                    customer_id: &payment.customer_id,
                    transaction_type: CustomerTransactionType::Payment,
                    amount_cents: payment.amount_cents,
                    sale_id: None,
                    notes: payment.notes.as_deref(),
                },
                created_by,
            )
            .await?;

        info!(
            customer_id = %payment.customer_id,
            amount_cents = payment.amount_cents,
            "Customer payment recorded"
        );

        Ok(recorded)
    }

    /// All entries for a customer, oldest first.
    pub async fn history(&self, customer_id: &str) -> DbResult<Vec<CustomerTransaction>> {
        let entries = sqlx::query_as::<_, CustomerTransaction>(&format!(
            "SELECT {CUSTOMER_TX_COLUMNS} FROM customer_transactions \
             WHERE customer_id = ?1 \
             ORDER BY created_at, rowid"
        ))
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    /// Debt as of `as_of` (inclusive), or now.
    ///
    /// Read-only; calling it twice without writes in between returns the same
    /// value.
    pub async fn balance(
        &self,
        customer_id: &str,
        as_of: Option<DateTime<Utc>>,
    ) -> DbResult<LedgerBalance> {
        let mut conn = self.pool.acquire().await?;
        fetch_customer(&mut conn, customer_id).await?;
        drop(conn);

        let entries = self.history(customer_id).await?;
        Ok(fold_balance(&entries, as_of))
    }
}

/// Appends an entry inside the caller's transaction.
pub(crate) async fn insert_entry_in(
    conn: &mut SqliteConnection,
    entry: &CustomerEntry<'_>,
    created_by: &str,
) -> DbResult<CustomerTransaction> {
    let recorded = CustomerTransaction {
        id: new_id(),
        customer_id: entry.customer_id.to_string(),
        transaction_type: entry.transaction_type,
        amount_cents: entry.amount_cents,
        sale_id: entry.sale_id.map(str::to_string),
        notes: entry.notes.map(str::to_string),
        created_by: created_by.to_string(),
        created_at: Utc::now(),
    };

    debug!(
        customer_id = %recorded.customer_id,
        transaction_type = ?recorded.transaction_type,
        amount_cents = recorded.amount_cents,
        "Appending customer ledger entry"
    );

    sqlx::query(
        "INSERT INTO customer_transactions (\
            id, customer_id, transaction_type, amount_cents, sale_id, notes, created_by, created_at\
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
    )
    .bind(&recorded.id)
    .bind(&recorded.customer_id)
    .bind(recorded.transaction_type)
    .bind(recorded.amount_cents)
    .bind(&recorded.sale_id)
    .bind(&recorded.notes)
    .bind(&recorded.created_by)
    .bind(recorded.created_at)
    .execute(&mut *conn)
    .await?;

    Ok(recorded)
}

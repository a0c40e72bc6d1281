//! # Transfer Repository
//!
//! Stock movements between branches.
//!
//! ```text
//! create_transfer ──► PENDING ──complete──► COMPLETED
//!                        │                  source −q, destination +q
//!                        └────cancel─────► CANCELLED
//! ```
//!
//! Creation checks that the source holds enough stock but moves nothing.
//! Completion re-checks at apply time since stock may have been sold in
//! between. Both status changes are conditional on the row still being
//! PENDING, so two racing completions cannot both move stock.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use std::collections::HashMap;
use tracing::{debug, info, warn};

use crate::error::{DbError, DbResult};
use crate::pool::begin_write;
use crate::repository::branch::fetch_branch;
use crate::repository::inventory::{apply_delta_in, ensure_record_in, require_available};
use crate::repository::new_id;
use crate::repository::product::fetch_product;
use meridian_core::validation::{validate_line_count, validate_notes, validate_quantity};
use meridian_core::{
    CoreError, NewTransfer, StockTransfer, StockTransferItem, TransferDetail, TransferStatus,
};

const TRANSFER_COLUMNS: &str = "id, from_branch_id, to_branch_id, status, notes, created_by, \
                                completed_by, cancelled_by, created_at, updated_at, \
                                completed_at, cancelled_at";

const TRANSFER_ITEM_COLUMNS: &str = "id, transfer_id, line_number, product_id, quantity";

/// Repository for stock transfers.
#[derive(Debug, Clone)]
pub struct TransferRepository {
    pool: SqlitePool,
}

impl TransferRepository {
    /// Creates a new TransferRepository.
    pub fn new(pool: SqlitePool) -> Self {
        TransferRepository { pool }
    }

    /// Creates a PENDING transfer.
    ///
    /// ## Errors
    /// - `SameSourceAndDestination`, `EmptyTransfer`
    /// - `BranchNotFound`, `ProductNotFound`
    /// - `InsufficientStock` at the source, summed per product
    pub async fn create_transfer(
        &self,
        new: &NewTransfer,
        created_by: &str,
    ) -> DbResult<TransferDetail> {
        if new.from_branch_id == new.to_branch_id {
            return Err(CoreError::SameSourceAndDestination(new.from_branch_id.clone()).into());
        }
        if new.items.is_empty() {
            return Err(CoreError::EmptyTransfer.into());
        }
        validate_line_count("items", new.items.len())?;
        validate_notes(new.notes.as_deref())?;
        for item in &new.items {
            validate_quantity(item.quantity)?;
        }

        let mut tx = begin_write(&self.pool).await?;

        fetch_branch(&mut tx, &new.from_branch_id).await?;
        fetch_branch(&mut tx, &new.to_branch_id).await?;

        let mut per_product: HashMap<&str, i64> = HashMap::new();
        for item in &new.items {
            fetch_product(&mut tx, &item.product_id).await?;
            *per_product.entry(item.product_id.as_str()).or_insert(0) += item.quantity;
        }
        for (product_id, quantity) in &per_product {
            require_available(&mut tx, &new.from_branch_id, product_id, *quantity).await?;
        }

        let now = Utc::now();
        let transfer = StockTransfer {
            id: new_id(),
            from_branch_id: new.from_branch_id.clone(),
            to_branch_id: new.to_branch_id.clone(),
            status: TransferStatus::Pending,
            notes: new.notes.clone(),
            created_by: created_by.to_string(),
            completed_by: None,
            cancelled_by: None,
            created_at: now,
            updated_at: now,
            completed_at: None,
            cancelled_at: None,
        };

        sqlx::query(
            "INSERT INTO stock_transfers (\
                id, from_branch_id, to_branch_id, status, notes, created_by, created_at, updated_at\
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )
        .bind(&transfer.id)
        .bind(&transfer.from_branch_id)
        .bind(&transfer.to_branch_id)
        .bind(transfer.status)
        .bind(&transfer.notes)
        .bind(&transfer.created_by)
        .bind(transfer.created_at)
        .bind(transfer.updated_at)
        .execute(&mut *tx)
        .await?;

        let mut items = Vec::with_capacity(new.items.len());
        for (index, line) in new.items.iter().enumerate() {
            let item = StockTransferItem {
                id: new_id(),
                transfer_id: transfer.id.clone(),
                line_number: index as i64 + 1,
                product_id: line.product_id.clone(),
                quantity: line.quantity,
            };

            sqlx::query(
                "INSERT INTO stock_transfer_items (id, transfer_id, line_number, product_id, quantity) \
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )
            .bind(&item.id)
            .bind(&item.transfer_id)
            .bind(item.line_number)
            .bind(&item.product_id)
            .bind(item.quantity)
            .execute(&mut *tx)
            .await?;

            items.push(item);
        }

        tx.commit().await?;

        info!(
            transfer_id = %transfer.id,
            from = %transfer.from_branch_id,
            to = %transfer.to_branch_id,
            items = items.len(),
            "Stock transfer created"
        );

        Ok(TransferDetail { transfer, items })
    }

    /// Moves the stock of a PENDING transfer and marks it COMPLETED.
    ///
    /// A destination with no snapshot for a product gets one created at zero.
    ///
    /// ## Errors
    /// - `TransferNotFound`
    /// - `InvalidTransferState` if the transfer is not PENDING
    /// - `InsufficientStock` if the source no longer holds enough
    pub async fn complete_transfer(&self, id: &str, completed_by: &str) -> DbResult<TransferDetail> {
        let mut tx = begin_write(&self.pool).await?;

        let transfer = fetch_transfer_in(&mut tx, id).await?;
        require_pending(&transfer, TransferStatus::Completed)?;
        let items = items_in(&mut tx, id).await?;

        for item in &items {
            apply_delta_in(&mut tx, &transfer.from_branch_id, &item.product_id, -item.quantity)
                .await?;
            ensure_record_in(&mut tx, &transfer.to_branch_id, &item.product_id).await?;
            apply_delta_in(&mut tx, &transfer.to_branch_id, &item.product_id, item.quantity)
                .await?;
        }

        let now = Utc::now();
        let result = sqlx::query(
            "UPDATE stock_transfers \
             SET status = ?2, completed_by = ?3, completed_at = ?4, updated_at = ?4 \
             WHERE id = ?1 AND status = ?5",
        )
        .bind(id)
        .bind(TransferStatus::Completed)
        .bind(completed_by)
        .bind(now)
        .bind(TransferStatus::Pending)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(state_error(&mut tx, id).await);
        }

        let transfer = fetch_transfer_in(&mut tx, id).await?;
        tx.commit().await?;

        info!(
            transfer_id = %transfer.id,
            from = %transfer.from_branch_id,
            to = %transfer.to_branch_id,
            "Stock transfer completed"
        );

        Ok(TransferDetail { transfer, items })
    }

    /// Cancels a PENDING transfer. No stock moves.
    ///
    /// ## Errors
    /// - `TransferNotFound`
    /// - `InvalidTransferState` if the transfer is not PENDING
    pub async fn cancel_transfer(&self, id: &str, cancelled_by: &str) -> DbResult<StockTransfer> {
        let mut tx = begin_write(&self.pool).await?;

        let now = Utc::now();
        let result = sqlx::query(
            "UPDATE stock_transfers \
             SET status = ?2, cancelled_by = ?3, cancelled_at = ?4, updated_at = ?4 \
             WHERE id = ?1 AND status = ?5",
        )
        .bind(id)
        .bind(TransferStatus::Cancelled)
        .bind(cancelled_by)
        .bind(now)
        .bind(TransferStatus::Pending)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(state_error(&mut tx, id).await);
        }

        let transfer = fetch_transfer_in(&mut tx, id).await?;
        tx.commit().await?;

        info!(transfer_id = %transfer.id, "Stock transfer cancelled");
        Ok(transfer)
    }

    pub async fn get_transfer(&self, id: &str) -> DbResult<Option<StockTransfer>> {
        let transfer = sqlx::query_as::<_, StockTransfer>(&format!(
            "SELECT {TRANSFER_COLUMNS} FROM stock_transfers WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(transfer)
    }

    /// Gets a transfer with its items in line order.
    pub async fn get_transfer_detail(&self, id: &str) -> DbResult<Option<TransferDetail>> {
        let mut conn = self.pool.acquire().await?;

        let transfer = match sqlx::query_as::<_, StockTransfer>(&format!(
            "SELECT {TRANSFER_COLUMNS} FROM stock_transfers WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        {
            Some(transfer) => transfer,
            None => return Ok(None),
        };

        let items = items_in(&mut conn, id).await?;
        Ok(Some(TransferDetail { transfer, items }))
    }

    /// Transfers where the branch is source or destination, newest first.
    pub async fn list_for_branch(
        &self,
        branch_id: &str,
        status: Option<TransferStatus>,
    ) -> DbResult<Vec<StockTransfer>> {
        let transfers = sqlx::query_as::<_, StockTransfer>(&format!(
            "SELECT {TRANSFER_COLUMNS} FROM stock_transfers \
             WHERE (from_branch_id = ?1 OR to_branch_id = ?1) \
               AND (?2 IS NULL OR status = ?2) \
             ORDER BY created_at DESC, rowid DESC"
        ))
        .bind(branch_id)
        .bind(status)
        .fetch_all(&self.pool)
        .await?;

        Ok(transfers)
    }
}

fn require_pending(transfer: &StockTransfer, next: TransferStatus) -> DbResult<()> {
    if transfer.status.can_transition_to(next) {
        return Ok(());
    }

    warn!(
        transfer_id = %transfer.id,
        status = ?transfer.status,
        next = ?next,
        "Rejected transfer state change"
    );
    Err(CoreError::InvalidTransferState {
        transfer_id: transfer.id.clone(),
        status: transfer.status,
    }
    .into())
}

/// Explains why a conditional status update matched no row.
async fn state_error(conn: &mut SqliteConnection, id: &str) -> DbError {
    match fetch_transfer_in(conn, id).await {
        Ok(transfer) => CoreError::InvalidTransferState {
            transfer_id: transfer.id,
            status: transfer.status,
        }
        .into(),
        Err(err) => err,
    }
}

async fn fetch_transfer_in(conn: &mut SqliteConnection, id: &str) -> DbResult<StockTransfer> {
    sqlx::query_as::<_, StockTransfer>(&format!(
        "SELECT {TRANSFER_COLUMNS} FROM stock_transfers WHERE id = ?1"
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| CoreError::TransferNotFound(id.to_string()).into())
}

async fn items_in(
    conn: &mut SqliteConnection,
    transfer_id: &str,
) -> DbResult<Vec<StockTransferItem>> {
    debug!(transfer_id = %transfer_id, "Loading transfer items");

    let items = sqlx::query_as::<_, StockTransferItem>(&format!(
        "SELECT {TRANSFER_ITEM_COLUMNS} FROM stock_transfer_items \
         WHERE transfer_id = ?1 ORDER BY line_number"
    ))
    .bind(transfer_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(items)
}

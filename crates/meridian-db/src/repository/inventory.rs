//! # Inventory Repository
//!
//! Inventory snapshots and the single path through which stock changes.
//!
//! ## Stock Mutation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  apply_delta(branch, product, delta)                                   │
//! │                                                                         │
//! │  UPDATE inventory                                                      │
//! │     SET quantity = quantity + :delta                                   │
//! │   WHERE branch_id = :branch AND product_id = :product                  │
//! │     AND quantity + :delta >= 0          ◄── guard, same statement      │
//! │  RETURNING quantity                                                    │
//! │       │                                                                 │
//! │       ├── 1 row  → new quantity                                        │
//! │       └── 0 rows → read the row (same transaction)                     │
//! │                    ├── missing → InventoryRecordNotFound               │
//! │                    └── present → InsufficientStock { available }       │
//! │                                                                         │
//! │  Callers: sale (−), refund (+), transfer completion (− / +),           │
//! │           adjustment (±). Nothing else writes `quantity`.              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The check and the write are one statement, so two sales of the last unit
//! cannot both succeed. The table also carries `CHECK (quantity >= 0)`.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::pool::begin_write;
use crate::repository::branch::fetch_branch;
use crate::repository::new_id;
use crate::repository::product::fetch_product;
use meridian_core::validation::{validate_quantity_delta, validate_stock_level};
use meridian_core::{CoreError, InventoryRecord, NewInventoryRecord};

const INVENTORY_COLUMNS: &str =
    "id, branch_id, product_id, quantity, min_stock_level, max_stock_level, created_at, updated_at";

/// Repository for inventory snapshots.
#[derive(Debug, Clone)]
pub struct InventoryRepository {
    pool: SqlitePool,
}

impl InventoryRepository {
    /// Creates a new InventoryRepository.
    pub fn new(pool: SqlitePool) -> Self {
        InventoryRepository { pool }
    }

    /// Creates the snapshot for a branch/product pair with its initial stock.
    ///
    /// ## Errors
    /// - `BranchNotFound` / `ProductNotFound`
    /// - `UniqueViolation` if the pair already has a record
    pub async fn create_record(&self, new: &NewInventoryRecord) -> DbResult<InventoryRecord> {
        validate_stock_level("quantity", new.quantity)?;
        validate_stock_level("min_stock_level", new.min_stock_level)?;
        if let Some(max) = new.max_stock_level {
            validate_stock_level("max_stock_level", max)?;
        }

        let mut tx = begin_write(&self.pool).await?;

        fetch_branch(&mut tx, &new.branch_id).await?;
        fetch_product(&mut tx, &new.product_id).await?;

        let now = Utc::now();
        let record = InventoryRecord {
            id: new_id(),
            branch_id: new.branch_id.clone(),
            product_id: new.product_id.clone(),
            quantity: new.quantity,
            min_stock_level: new.min_stock_level,
            max_stock_level: new.max_stock_level,
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            "INSERT INTO inventory (\
                id, branch_id, product_id, quantity, \
                min_stock_level, max_stock_level, created_at, updated_at\
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )
        .bind(&record.id)
        .bind(&record.branch_id)
        .bind(&record.product_id)
        .bind(record.quantity)
        .bind(record.min_stock_level)
        .bind(record.max_stock_level)
        .bind(record.created_at)
        .bind(record.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { .. } => DbError::duplicate(
                "inventory record",
                format!("{}/{}", record.branch_id, record.product_id),
            ),
            other => other,
        })?;

        tx.commit().await?;

        info!(
            branch_id = %record.branch_id,
            product_id = %record.product_id,
            quantity = record.quantity,
            "Inventory record created"
        );

        Ok(record)
    }

    /// Gets the snapshot for a branch/product pair.
    pub async fn get(&self, branch_id: &str, product_id: &str) -> DbResult<Option<InventoryRecord>> {
        let record = sqlx::query_as::<_, InventoryRecord>(&format!(
            "SELECT {INVENTORY_COLUMNS} FROM inventory WHERE branch_id = ?1 AND product_id = ?2"
        ))
        .bind(branch_id)
        .bind(product_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    /// Lists every snapshot held by a branch.
    pub async fn list_for_branch(&self, branch_id: &str) -> DbResult<Vec<InventoryRecord>> {
        let records = sqlx::query_as::<_, InventoryRecord>(&format!(
            "SELECT {INVENTORY_COLUMNS} FROM inventory WHERE branch_id = ?1 ORDER BY product_id"
        ))
        .bind(branch_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    /// Lists snapshots at or below their reorder level.
    pub async fn list_low_stock(&self, branch_id: &str) -> DbResult<Vec<InventoryRecord>> {
        let records = sqlx::query_as::<_, InventoryRecord>(&format!(
            "SELECT {INVENTORY_COLUMNS} FROM inventory \
             WHERE branch_id = ?1 AND quantity <= min_stock_level \
             ORDER BY quantity, product_id"
        ))
        .bind(branch_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    /// Updates reorder levels. Never touches the quantity.
    pub async fn set_levels(
        &self,
        branch_id: &str,
        product_id: &str,
        min_stock_level: i64,
        max_stock_level: Option<i64>,
    ) -> DbResult<InventoryRecord> {
        validate_stock_level("min_stock_level", min_stock_level)?;
        if let Some(max) = max_stock_level {
            validate_stock_level("max_stock_level", max)?;
        }

        let record = sqlx::query_as::<_, InventoryRecord>(&format!(
            "UPDATE inventory SET min_stock_level = ?3, max_stock_level = ?4, updated_at = ?5 \
             WHERE branch_id = ?1 AND product_id = ?2 \
             RETURNING {INVENTORY_COLUMNS}"
        ))
        .bind(branch_id)
        .bind(product_id)
        .bind(min_stock_level)
        .bind(max_stock_level)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;

        record.ok_or_else(|| {
            CoreError::InventoryRecordNotFound {
                branch_id: branch_id.to_string(),
                product_id: product_id.to_string(),
            }
            .into()
        })
    }

    /// Applies a signed delta in its own write transaction and returns the
    /// new quantity.
    ///
    /// Workflows that change several rows use [`apply_delta_in`] inside their
    /// own transaction instead.
    pub async fn apply_delta(&self, branch_id: &str, product_id: &str, delta: i64) -> DbResult<i64> {
        validate_quantity_delta(delta)?;

        let mut tx = begin_write(&self.pool).await?;
        let quantity = apply_delta_in(&mut tx, branch_id, product_id, delta).await?;
        tx.commit().await?;
        Ok(quantity)
    }
}

// =============================================================================
// Transaction-Scoped Operations
// =============================================================================

/// Applies a signed delta to a snapshot, refusing to go below zero.
///
/// ## Errors
/// - `InventoryRecordNotFound` if the pair has no snapshot
/// - `InsufficientStock` if `quantity + delta < 0`
pub(crate) async fn apply_delta_in(
    conn: &mut SqliteConnection,
    branch_id: &str,
    product_id: &str,
    delta: i64,
) -> DbResult<i64> {
    debug!(branch_id = %branch_id, product_id = %product_id, delta, "Applying stock delta");

    let updated: Option<i64> = sqlx::query_scalar(
        "UPDATE inventory SET quantity = quantity + ?1, updated_at = ?2 \
         WHERE branch_id = ?3 AND product_id = ?4 AND quantity + ?1 >= 0 \
         RETURNING quantity",
    )
    .bind(delta)
    .bind(Utc::now())
    .bind(branch_id)
    .bind(product_id)
    .fetch_optional(&mut *conn)
    .await?;

    if let Some(quantity) = updated {
        return Ok(quantity);
    }

    match quantity_in(conn, branch_id, product_id).await? {
        None => Err(CoreError::InventoryRecordNotFound {
            branch_id: branch_id.to_string(),
            product_id: product_id.to_string(),
        }
        .into()),
        Some(available) => Err(CoreError::InsufficientStock {
            branch_id: branch_id.to_string(),
            product_id: product_id.to_string(),
            available,
            requested: delta.saturating_neg(),
        }
        .into()),
    }
}

/// Current quantity of a snapshot, `None` if the pair has none.
pub(crate) async fn quantity_in(
    conn: &mut SqliteConnection,
    branch_id: &str,
    product_id: &str,
) -> DbResult<Option<i64>> {
    let quantity: Option<i64> = sqlx::query_scalar(
        "SELECT quantity FROM inventory WHERE branch_id = ?1 AND product_id = ?2",
    )
    .bind(branch_id)
    .bind(product_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(quantity)
}

/// Fails with `InsufficientStock` unless the branch holds `requested` units.
/// A missing snapshot counts as zero on hand.
pub(crate) async fn require_available(
    conn: &mut SqliteConnection,
    branch_id: &str,
    product_id: &str,
    requested: i64,
) -> DbResult<()> {
    let available = quantity_in(conn, branch_id, product_id).await?.unwrap_or(0);
    if available < requested {
        return Err(CoreError::InsufficientStock {
            branch_id: branch_id.to_string(),
            product_id: product_id.to_string(),
            available,
            requested,
        }
        .into());
    }
    Ok(())
}

/// Creates a zero-quantity snapshot for the pair if none exists.
pub(crate) async fn ensure_record_in(
    conn: &mut SqliteConnection,
    branch_id: &str,
    product_id: &str,
) -> DbResult<()> {
    let now = Utc::now();

    let result = sqlx::query(
        "INSERT INTO inventory (\
            id, branch_id, product_id, quantity, min_stock_level, max_stock_level, created_at, updated_at\
         ) VALUES (?1, ?2, ?3, 0, 0, NULL, ?4, ?4) \
         ON CONFLICT (branch_id, product_id) DO NOTHING",
    )
    .bind(new_id())
    .bind(branch_id)
    .bind(product_id)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() > 0 {
        debug!(branch_id = %branch_id, product_id = %product_id, "Created empty inventory record");
    }

    Ok(())
}

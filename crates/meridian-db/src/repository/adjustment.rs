//! # Adjustment Repository
//!
//! Manual stock corrections: counts, damage, shrinkage, found stock.
//! Each adjustment applies its delta through the same guarded mutation as
//! sales and records the resulting quantity next to the reason.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::info;

use crate::error::DbResult;
use crate::pool::begin_write;
use crate::repository::branch::fetch_branch;
use crate::repository::inventory::apply_delta_in;
use crate::repository::new_id;
use crate::repository::product::fetch_product;
use meridian_core::validation::{validate_notes, validate_quantity_delta, validate_reason};
use meridian_core::{NewAdjustment, StockAdjustment};

const ADJUSTMENT_COLUMNS: &str = "id, branch_id, product_id, quantity_delta, quantity_after, \
                                  reason, notes, created_by, created_at";

/// Repository for stock adjustments.
#[derive(Debug, Clone)]
pub struct AdjustmentRepository {
    pool: SqlitePool,
}

impl AdjustmentRepository {
    /// Creates a new AdjustmentRepository.
    pub fn new(pool: SqlitePool) -> Self {
        AdjustmentRepository { pool }
    }

    /// Applies a signed correction to a snapshot and records it.
    ///
    /// ## Errors
    /// - Validation errors for a zero delta or a blank reason
    /// - `BranchNotFound`, `ProductNotFound`, `InventoryRecordNotFound`
    /// - `InsufficientStock` if the correction would go below zero
    pub async fn record_adjustment(
        &self,
        new: &NewAdjustment,
        created_by: &str,
    ) -> DbResult<StockAdjustment> {
        validate_quantity_delta(new.quantity_delta)?;
        validate_reason(&new.reason)?;
        validate_notes(new.notes.as_deref())?;

        let mut tx = begin_write(&self.pool).await?;

        fetch_branch(&mut tx, &new.branch_id).await?;
        fetch_product(&mut tx, &new.product_id).await?;

        let quantity_after =
            apply_delta_in(&mut tx, &new.branch_id, &new.product_id, new.quantity_delta).await?;

        let adjustment = StockAdjustment {
            id: new_id(),
            branch_id: new.branch_id.clone(),
            product_id: new.product_id.clone(),
            quantity_delta: new.quantity_delta,
            quantity_after,
            reason: new.reason.trim().to_string(),
            notes: new.notes.clone(),
            created_by: created_by.to_string(),
            created_at: Utc::now(),
        };

        sqlx::query(
            "INSERT INTO stock_adjustments (\
                id, branch_id, product_id, quantity_delta, quantity_after, \
                reason, notes, created_by, created_at\
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        )
        .bind(&adjustment.id)
        .bind(&adjustment.branch_id)
        .bind(&adjustment.product_id)
        .bind(adjustment.quantity_delta)
        .bind(adjustment.quantity_after)
        .bind(&adjustment.reason)
        .bind(&adjustment.notes)
        .bind(&adjustment.created_by)
        .bind(adjustment.created_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(
            branch_id = %adjustment.branch_id,
            product_id = %adjustment.product_id,
            delta = adjustment.quantity_delta,
            quantity_after = adjustment.quantity_after,
            reason = %adjustment.reason,
            "Stock adjusted"
        );

        Ok(adjustment)
    }

    /// Adjustments at a branch, newest first.
    pub async fn list_for_branch(&self, branch_id: &str, limit: i64) -> DbResult<Vec<StockAdjustment>> {
        let adjustments = sqlx::query_as::<_, StockAdjustment>(&format!(
            "SELECT {ADJUSTMENT_COLUMNS} FROM stock_adjustments \
             WHERE branch_id = ?1 \
             ORDER BY created_at DESC, rowid DESC \
             LIMIT ?2"
        ))
        .bind(branch_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(adjustments)
    }

    /// Adjustments of one product across branches, newest first.
    pub async fn list_for_product(
        &self,
        product_id: &str,
        limit: i64,
    ) -> DbResult<Vec<StockAdjustment>> {
        let adjustments = sqlx::query_as::<_, StockAdjustment>(&format!(
            "SELECT {ADJUSTMENT_COLUMNS} FROM stock_adjustments \
             WHERE product_id = ?1 \
             ORDER BY created_at DESC, rowid DESC \
             LIMIT ?2"
        ))
        .bind(product_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(adjustments)
    }
}

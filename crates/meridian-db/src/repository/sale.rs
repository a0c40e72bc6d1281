//! # Sale Repository
//!
//! Sale creation and refunds. Each is one failure-atomic write transaction.
//!
//! ## Sale Creation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  create_sale(NewSale, cashier)            BEGIN IMMEDIATE               │
//! │                                                                         │
//! │  1. branch exists, customer exists (if given)                          │
//! │  2. per line: product exists + active, branch holds enough, price      │
//! │  3. settle: totals, payment rule, change, credit / register portions   │
//! │  4. next sale number for today (upsert on sale_sequences)              │
//! │  5. INSERT sales (COMPLETED) + sale_items                              │
//! │  6. per line: inventory −qty (guarded)                                 │
//! │  7. credit portion > 0 → customer ledger SALE                          │
//! │  8. register portion > 0 → cash register SALE_IN                       │
//! │                                                  COMMIT                 │
//! │  Any failure before COMMIT leaves no sale, no stock change, no entry.  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Refund
//! ```text
//! refund_sale(sale_id, RefundRequest, user)       BEGIN IMMEDIATE
//!   plan against earlier refunds ─► INSERT sale_refunds + items
//!   ─► inventory +qty per line ─► REFUND_OUT ─► status update   COMMIT
//! ```

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use std::collections::HashMap;
use tracing::{debug, info, warn};

use crate::error::{DbError, DbResult};
use crate::pool::begin_write;
use crate::repository::branch::fetch_branch;
use crate::repository::cash_register::{self, CashEntry};
use crate::repository::customer::fetch_customer;
use crate::repository::customer_ledger::{self, CustomerEntry};
use crate::repository::inventory::{apply_delta_in, require_available};
use crate::repository::new_id;
use crate::repository::product::fetch_product;
use meridian_core::pricing::{price_line, settle, PricedLine};
use meridian_core::refund::plan_refund;
use meridian_core::sale_number::{day_key, format_sale_number};
use meridian_core::validation::{validate_line_count, validate_notes};
use meridian_core::{
    CashTransactionType, CoreError, CustomerTransactionType, Money, NewSale, RefundOutcome,
    RefundRequest, Sale, SaleDetail, SaleItem, SaleRefund, SaleRefundItem, SaleStatus,
};

const SALE_COLUMNS: &str = "id, sale_number, branch_id, customer_id, cashier_id, \
                            subtotal_cents, discount_cents, tax_cents, total_cents, \
                            paid_amount_cents, change_amount_cents, payment_method, status, \
                            notes, created_at, updated_at";

const SALE_ITEM_COLUMNS: &str = "id, sale_id, line_number, product_id, quantity, \
                                 unit_price_cents, discount_cents, total_cents, created_at";

/// Repository for sale database operations.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    /// Creates a new SaleRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    // =========================================================================
    // Sale Creation
    // =========================================================================

    /// Creates a completed sale, depletes stock, and posts ledger entries.
    ///
    /// ## Errors
    /// - `BranchNotFound`, `CustomerNotFound`, `ProductNotFound`
    /// - `ProductInactive`, `InsufficientStock`
    /// - `EmptySale`, `InsufficientPayment`, `CustomerRequired`
    /// - Validation errors for quantities, prices, discounts
    pub async fn create_sale(&self, new: &NewSale, cashier_id: &str) -> DbResult<SaleDetail> {
        validate_line_count("items", new.items.len())?;
        validate_notes(new.notes.as_deref())?;

        let mut tx = begin_write(&self.pool).await?;

        fetch_branch(&mut tx, &new.branch_id).await?;
        if let Some(customer_id) = &new.customer_id {
            fetch_customer(&mut tx, customer_id).await?;
        }

        // Running total per product so repeated lines are checked together.
        let mut requested: HashMap<&str, i64> = HashMap::new();
        let mut priced: Vec<PricedLine> = Vec::with_capacity(new.items.len());
        for line in &new.items {
            let product = fetch_product(&mut tx, &line.product_id).await?;
            if !product.is_active {
                return Err(CoreError::ProductInactive(product.id).into());
            }

            let priced_line = price_line(line, product.price())?;

            let wanted = requested.entry(line.product_id.as_str()).or_insert(0);
            *wanted += priced_line.quantity;
            require_available(&mut tx, &new.branch_id, &line.product_id, *wanted).await?;

            priced.push(priced_line);
        }

        let totals = settle(
            &priced,
            new.discount_cents,
            new.payment_method,
            new.paid_amount_cents,
            new.customer_id.is_some(),
        )?;

        let now = Utc::now();
        let sale_number = next_sale_number(&mut tx, now).await?;

        let sale = Sale {
            id: new_id(),
            sale_number,
            branch_id: new.branch_id.clone(),
            customer_id: new.customer_id.clone(),
            cashier_id: cashier_id.to_string(),
            subtotal_cents: totals.subtotal.cents(),
            discount_cents: totals.discount.cents(),
            tax_cents: totals.tax.cents(),
            total_cents: totals.total.cents(),
            paid_amount_cents: totals.paid.cents(),
            change_amount_cents: totals.change.cents(),
            payment_method: new.payment_method,
            status: SaleStatus::Completed,
            notes: new.notes.clone(),
            created_at: now,
            updated_at: now,
        };

        debug!(id = %sale.id, sale_number = %sale.sale_number, "Inserting sale");
        insert_sale_in(&mut tx, &sale).await?;

        let mut items = Vec::with_capacity(priced.len());
        for (index, line) in priced.iter().enumerate() {
            let item = SaleItem {
                id: new_id(),
                sale_id: sale.id.clone(),
                line_number: index as i64 + 1,
                product_id: line.product_id.clone(),
                quantity: line.quantity,
                unit_price_cents: line.unit_price.cents(),
                discount_cents: line.discount.cents(),
                total_cents: line.total.cents(),
                created_at: now,
            };
            insert_item_in(&mut tx, &item).await?;
            apply_delta_in(&mut tx, &sale.branch_id, &item.product_id, -item.quantity).await?;
            items.push(item);
        }

        if let (Some(customer_id), true) = (&sale.customer_id, totals.credit_portion.is_positive()) {
            customer_ledger::insert_entry_in(
                &mut tx,
                &CustomerEntry {
                    customer_id,
                    transaction_type: CustomerTransactionType::Sale,
                    amount_cents: totals.credit_portion.cents(),
                    sale_id: Some(&sale.id),
                    notes: None,
                },
                cashier_id,
            )
            .await?;
        }

        if totals.register_portion.is_positive() {
            cash_register::insert_entry_in(
                &mut tx,
                &CashEntry {
                    branch_id: &sale.branch_id,
                    transaction_type: CashTransactionType::SaleIn,
                    amount_cents: totals.register_portion.cents(),
                    sale_id: Some(&sale.id),
                    payment_method: Some(sale.payment_method),
                    notes: None,
                },
                cashier_id,
            )
            .await?;
        }

        tx.commit().await?;

        info!(
            sale_id = %sale.id,
            sale_number = %sale.sale_number,
            branch_id = %sale.branch_id,
            payment_method = sale.payment_method.as_str(),
            total = %totals.total,
            items = items.len(),
            "Sale completed"
        );

        Ok(SaleDetail { sale, items })
    }

    // =========================================================================
    // Refunds
    // =========================================================================

    /// Refunds all or part of a sale.
    ///
    /// Stock comes back to the sale's branch, the refunded amount leaves its
    /// cash register as REFUND_OUT, and the sale moves to PARTIALLY_REFUNDED
    /// or REFUNDED depending on what remains.
    ///
    /// ## Errors
    /// - `SaleNotFound`, `SaleItemNotFound`
    /// - `AlreadyRefunded`, `InvalidSaleState`, `RefundExceedsQuantity`
    pub async fn refund_sale(
        &self,
        sale_id: &str,
        request: &RefundRequest,
        user_id: &str,
    ) -> DbResult<RefundOutcome> {
        validate_notes(request.reason.as_deref())?;

        let mut tx = begin_write(&self.pool).await?;

        let sale = fetch_sale_in(&mut tx, sale_id).await?;
        let items = items_in(&mut tx, sale_id).await?;
        let already = refunded_quantities_in(&mut tx, sale_id).await?;
        let refunded_so_far = refunded_amount_in(&mut tx, sale_id).await?;

        let plan = match plan_refund(
            &sale,
            &items,
            &already,
            refunded_so_far,
            request.lines.as_deref(),
        ) {
            Ok(plan) => plan,
            Err(err) => {
                warn!(sale_id = %sale_id, error = %err, "Refund rejected");
                return Err(err.into());
            }
        };

        let now = Utc::now();
        let refund = SaleRefund {
            id: new_id(),
            sale_id: sale.id.clone(),
            amount_cents: plan.amount.cents(),
            reason: request.reason.clone(),
            created_by: user_id.to_string(),
            created_at: now,
        };

        sqlx::query(
            "INSERT INTO sale_refunds (id, sale_id, amount_cents, reason, created_by, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )
        .bind(&refund.id)
        .bind(&refund.sale_id)
        .bind(refund.amount_cents)
        .bind(&refund.reason)
        .bind(&refund.created_by)
        .bind(refund.created_at)
        .execute(&mut *tx)
        .await?;

        let mut refund_items = Vec::with_capacity(plan.lines.len());
        for line in &plan.lines {
            let refund_item = SaleRefundItem {
                id: new_id(),
                refund_id: refund.id.clone(),
                sale_item_id: line.sale_item_id.clone(),
                quantity: line.quantity,
                amount_cents: line.amount.cents(),
            };

            sqlx::query(
                "INSERT INTO sale_refund_items (id, refund_id, sale_item_id, quantity, amount_cents) \
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )
            .bind(&refund_item.id)
            .bind(&refund_item.refund_id)
            .bind(&refund_item.sale_item_id)
            .bind(refund_item.quantity)
            .bind(refund_item.amount_cents)
            .execute(&mut *tx)
            .await?;

            apply_delta_in(&mut tx, &sale.branch_id, &line.product_id, line.quantity).await?;
            refund_items.push(refund_item);
        }

        if plan.amount.is_positive() {
            cash_register::insert_entry_in(
                &mut tx,
                &CashEntry {
                    branch_id: &sale.branch_id,
                    transaction_type: CashTransactionType::RefundOut,
                    amount_cents: plan.amount.cents(),
                    sale_id: Some(&sale.id),
                    payment_method: Some(sale.payment_method),
                    notes: request.reason.as_deref(),
                },
                user_id,
            )
            .await?;
        }

        let result = sqlx::query(
            "UPDATE sales SET status = ?2, updated_at = ?3 WHERE id = ?1 AND status = ?4",
        )
        .bind(&sale.id)
        .bind(plan.resulting_status)
        .bind(now)
        .bind(sale.status)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::TransactionFailed(format!(
                "sale {} changed during refund",
                sale.id
            )));
        }

        let sale = fetch_sale_in(&mut tx, &sale.id).await?;
        tx.commit().await?;

        info!(
            sale_id = %sale.id,
            sale_number = %sale.sale_number,
            refund_id = %refund.id,
            amount = %plan.amount,
            status = sale.status.as_str(),
            "Sale refunded"
        );

        Ok(RefundOutcome {
            sale,
            refund,
            items: refund_items,
        })
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Gets a sale by ID.
    pub async fn get_sale(&self, id: &str) -> DbResult<Option<Sale>> {
        let sale = sqlx::query_as::<_, Sale>(&format!(
            "SELECT {SALE_COLUMNS} FROM sales WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(sale)
    }

    /// Gets a sale by its `SAL-YYYYMMDD-NNNNN` number.
    pub async fn get_by_number(&self, sale_number: &str) -> DbResult<Option<Sale>> {
        let sale = sqlx::query_as::<_, Sale>(&format!(
            "SELECT {SALE_COLUMNS} FROM sales WHERE sale_number = ?1"
        ))
        .bind(sale_number)
        .fetch_optional(&self.pool)
        .await?;

        Ok(sale)
    }

    /// Gets a sale with its items in line order.
    pub async fn get_sale_detail(&self, id: &str) -> DbResult<Option<SaleDetail>> {
        let mut conn = self.pool.acquire().await?;

        let sale = match sqlx::query_as::<_, Sale>(&format!(
            "SELECT {SALE_COLUMNS} FROM sales WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        {
            Some(sale) => sale,
            None => return Ok(None),
        };

        let items = items_in(&mut conn, id).await?;
        Ok(Some(SaleDetail { sale, items }))
    }

    /// Lists a branch's sales, newest first.
    pub async fn list_for_branch(&self, branch_id: &str, limit: i64) -> DbResult<Vec<Sale>> {
        let sales = sqlx::query_as::<_, Sale>(&format!(
            "SELECT {SALE_COLUMNS} FROM sales \
             WHERE branch_id = ?1 \
             ORDER BY created_at DESC, sale_number DESC \
             LIMIT ?2"
        ))
        .bind(branch_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(sales)
    }

    /// Quantity already refunded per sale item.
    pub async fn refunded_quantities(&self, sale_id: &str) -> DbResult<HashMap<String, i64>> {
        let mut conn = self.pool.acquire().await?;
        refunded_quantities_in(&mut conn, sale_id).await
    }

    /// Refund events for a sale, oldest first.
    pub async fn list_refunds(&self, sale_id: &str) -> DbResult<Vec<SaleRefund>> {
        let refunds = sqlx::query_as::<_, SaleRefund>(
            "SELECT id, sale_id, amount_cents, reason, created_by, created_at \
             FROM sale_refunds WHERE sale_id = ?1 ORDER BY created_at, rowid",
        )
        .bind(sale_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(refunds)
    }

    /// Lines of one refund event.
    pub async fn list_refund_items(&self, refund_id: &str) -> DbResult<Vec<SaleRefundItem>> {
        let items = sqlx::query_as::<_, SaleRefundItem>(
            "SELECT id, refund_id, sale_item_id, quantity, amount_cents \
             FROM sale_refund_items WHERE refund_id = ?1 ORDER BY rowid",
        )
        .bind(refund_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }
}

// =============================================================================
// Transaction-Scoped Helpers
// =============================================================================

/// Allocates the next sale number for the day of `now`.
///
/// The upsert increments the day's counter row under the write lock held by
/// the surrounding transaction, so numbers are unique and increasing. A
/// rolled-back sale gives its number back.
async fn next_sale_number(conn: &mut SqliteConnection, now: DateTime<Utc>) -> DbResult<String> {
    let day = now.date_naive();

    let sequence: i64 = sqlx::query_scalar(
        "INSERT INTO sale_sequences (day, last_value) VALUES (?1, 1) \
         ON CONFLICT (day) DO UPDATE SET last_value = last_value + 1 \
         RETURNING last_value",
    )
    .bind(day_key(day))
    .fetch_one(&mut *conn)
    .await?;

    Ok(format_sale_number(day, sequence)?)
}

async fn insert_sale_in(conn: &mut SqliteConnection, sale: &Sale) -> DbResult<()> {
    sqlx::query(
        "INSERT INTO sales (\
            id, sale_number, branch_id, customer_id, cashier_id, \
            subtotal_cents, discount_cents, tax_cents, total_cents, \
            paid_amount_cents, change_amount_cents, payment_method, status, \
            notes, created_at, updated_at\
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
    )
    .bind(&sale.id)
    .bind(&sale.sale_number)
    .bind(&sale.branch_id)
    .bind(&sale.customer_id)
    .bind(&sale.cashier_id)
    .bind(sale.subtotal_cents)
    .bind(sale.discount_cents)
    .bind(sale.tax_cents)
    .bind(sale.total_cents)
    .bind(sale.paid_amount_cents)
    .bind(sale.change_amount_cents)
    .bind(sale.payment_method)
    .bind(sale.status)
    .bind(&sale.notes)
    .bind(sale.created_at)
    .bind(sale.updated_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

async fn insert_item_in(conn: &mut SqliteConnection, item: &SaleItem) -> DbResult<()> {
    sqlx::query(
        "INSERT INTO sale_items (\
            id, sale_id, line_number, product_id, quantity, \
            unit_price_cents, discount_cents, total_cents, created_at\
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
    )
    .bind(&item.id)
    .bind(&item.sale_id)
    .bind(item.line_number)
    .bind(&item.product_id)
    .bind(item.quantity)
    .bind(item.unit_price_cents)
    .bind(item.discount_cents)
    .bind(item.total_cents)
    .bind(item.created_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

async fn fetch_sale_in(conn: &mut SqliteConnection, id: &str) -> DbResult<Sale> {
    sqlx::query_as::<_, Sale>(&format!("SELECT {SALE_COLUMNS} FROM sales WHERE id = ?1"))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| CoreError::SaleNotFound(id.to_string()).into())
}

async fn items_in(conn: &mut SqliteConnection, sale_id: &str) -> DbResult<Vec<SaleItem>> {
    let items = sqlx::query_as::<_, SaleItem>(&format!(
        "SELECT {SALE_ITEM_COLUMNS} FROM sale_items WHERE sale_id = ?1 ORDER BY line_number"
    ))
    .bind(sale_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(items)
}

async fn refunded_quantities_in(
    conn: &mut SqliteConnection,
    sale_id: &str,
) -> DbResult<HashMap<String, i64>> {
    let rows: Vec<(String, i64)> = sqlx::query_as(
        "SELECT ri.sale_item_id, SUM(ri.quantity) \
         FROM sale_refund_items ri \
         JOIN sale_refunds r ON r.id = ri.refund_id \
         WHERE r.sale_id = ?1 \
         GROUP BY ri.sale_item_id",
    )
    .bind(sale_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows.into_iter().collect())
}

async fn refunded_amount_in(conn: &mut SqliteConnection, sale_id: &str) -> DbResult<Money> {
    let cents: i64 = sqlx::query_scalar(
        "SELECT COALESCE(SUM(amount_cents), 0) FROM sale_refunds WHERE sale_id = ?1",
    )
    .bind(sale_id)
    .fetch_one(&mut *conn)
    .await?;

    Ok(Money::from_cents(cents))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::*;
    use meridian_core::{ErrorKind, NewSaleLine, PaymentMethod, RefundLine};

    fn cash_sale(branch_id: &str, lines: Vec<NewSaleLine>) -> NewSale {
        NewSale {
            branch_id: branch_id.to_string(),
            customer_id: None,
            payment_method: PaymentMethod::Cash,
            items: lines,
            discount_cents: 0,
            paid_amount_cents: None,
            notes: None,
        }
    }

    #[tokio::test]
    async fn test_cash_sale_depletes_and_posts_register() {
        let db = database().await;
        let b = branch(&db, "MAIN").await;
        let p = product(&db, "P1", 250).await;
        stock(&db, &b.id, &p.id, 10).await;

        let mut req = cash_sale(&b.id, vec![NewSaleLine::new(p.id.clone(), 4)]);
        req.paid_amount_cents = Some(1500);

        let detail = db.sales().create_sale(&req, USER).await.unwrap();

        assert_eq!(detail.sale.status, SaleStatus::Completed);
        assert_eq!(detail.sale.total_cents, 1000);
        assert_eq!(detail.sale.change_amount_cents, 500);
        assert!(detail.sale.sale_number.starts_with("SAL-"));
        assert!(detail.sale.sale_number.ends_with("-00001"));
        assert_eq!(detail.items.len(), 1);
        assert_eq!(quantity(&db, &b.id, &p.id).await, 6);

        let register = db.cash_register().balance(&b.id, None).await.unwrap();
        assert_eq!(register.balance_cents, 1000);

        let stored = db.sales().get_sale_detail(&detail.sale.id).await.unwrap().unwrap();
        assert_eq!(stored.items[0].total_cents, 1000);
    }

    #[tokio::test]
    async fn test_failed_sale_writes_nothing() {
        let db = database().await;
        let b = branch(&db, "MAIN").await;
        let p1 = product(&db, "P1", 100).await;
        let p2 = product(&db, "P2", 100).await;
        stock(&db, &b.id, &p1.id, 10).await;
        stock(&db, &b.id, &p2.id, 1).await;

        let req = cash_sale(
            &b.id,
            vec![NewSaleLine::new(p1.id.clone(), 2), NewSaleLine::new(p2.id.clone(), 2)],
        );
        let err = db.sales().create_sale(&req, USER).await.unwrap_err();
        assert!(matches!(
            err.as_domain(),
            Some(CoreError::InsufficientStock { available: 1, requested: 2, .. })
        ));

        assert_eq!(quantity(&db, &b.id, &p1.id).await, 10);
        assert!(db.sales().list_for_branch(&b.id, 10).await.unwrap().is_empty());
        assert!(db.cash_register().history(&b.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_repeated_product_lines_checked_together() {
        let db = database().await;
        let b = branch(&db, "MAIN").await;
        let p = product(&db, "P1", 100).await;
        stock(&db, &b.id, &p.id, 3).await;

        let req = cash_sale(
            &b.id,
            vec![NewSaleLine::new(p.id.clone(), 2), NewSaleLine::new(p.id.clone(), 2)],
        );
        let err = db.sales().create_sale(&req, USER).await.unwrap_err();
        assert!(matches!(
            err.as_domain(),
            Some(CoreError::InsufficientStock { requested: 4, .. })
        ));
        assert_eq!(quantity(&db, &b.id, &p.id).await, 3);
    }

    #[tokio::test]
    async fn test_sale_rejections() {
        let db = database().await;
        let b = branch(&db, "MAIN").await;
        let p = product(&db, "P1", 100).await;
        stock(&db, &b.id, &p.id, 3).await;

        let err = db.sales().create_sale(&cash_sale(&b.id, vec![]), USER).await.unwrap_err();
        assert!(matches!(err.as_domain(), Some(CoreError::EmptySale)));

        let err = db
            .sales()
            .create_sale(&cash_sale("ghost", vec![NewSaleLine::new(p.id.clone(), 1)]), USER)
            .await
            .unwrap_err();
        assert!(matches!(err.as_domain(), Some(CoreError::BranchNotFound(_))));

        let err = db
            .sales()
            .create_sale(&cash_sale(&b.id, vec![NewSaleLine::new("ghost", 1)]), USER)
            .await
            .unwrap_err();
        assert!(matches!(err.as_domain(), Some(CoreError::ProductNotFound(_))));

        let mut req = cash_sale(&b.id, vec![NewSaleLine::new(p.id.clone(), 1)]);
        req.paid_amount_cents = Some(50);
        let err = db.sales().create_sale(&req, USER).await.unwrap_err();
        assert!(matches!(err.as_domain(), Some(CoreError::InsufficientPayment { .. })));

        let mut req = cash_sale(&b.id, vec![NewSaleLine::new(p.id.clone(), 1)]);
        req.payment_method = PaymentMethod::Credit;
        let err = db.sales().create_sale(&req, USER).await.unwrap_err();
        assert!(matches!(err.as_domain(), Some(CoreError::CustomerRequired { .. })));

        db.products().deactivate(&p.id).await.unwrap();
        let err = db
            .sales()
            .create_sale(&cash_sale(&b.id, vec![NewSaleLine::new(p.id.clone(), 1)]), USER)
            .await
            .unwrap_err();
        assert!(matches!(err.as_domain(), Some(CoreError::ProductInactive(_))));

        assert_eq!(quantity(&db, &b.id, &p.id).await, 3);
    }

    #[tokio::test]
    async fn test_mixed_sale_splits_cash_and_debt() {
        let db = database().await;
        let b = branch(&db, "MAIN").await;
        let p = product(&db, "P1", 10000).await;
        let c = customer(&db, "Ana").await;
        stock(&db, &b.id, &p.id, 1).await;

        let mut req = cash_sale(&b.id, vec![NewSaleLine::new(p.id.clone(), 1)]);
        req.customer_id = Some(c.id.clone());
        req.payment_method = PaymentMethod::Mixed;
        req.paid_amount_cents = Some(3000);

        let detail = db.sales().create_sale(&req, USER).await.unwrap();
        assert_eq!(detail.sale.change_amount_cents, 0);

        let debt = db.customer_ledger().balance(&c.id, None).await.unwrap();
        assert_eq!(debt.balance_cents, 7000);
        let cash = db.cash_register().entries_for_sale(&detail.sale.id).await.unwrap();
        assert_eq!(cash.len(), 1);
        assert_eq!(cash[0].amount_cents, 3000);
        assert_eq!(cash[0].payment_method, Some(PaymentMethod::Mixed));
    }

    #[tokio::test]
    async fn test_sale_numbers_increase() {
        let db = database().await;
        let b = branch(&db, "MAIN").await;
        let p = product(&db, "P1", 100).await;
        stock(&db, &b.id, &p.id, 10).await;

        let req = cash_sale(&b.id, vec![NewSaleLine::new(p.id.clone(), 1)]);
        let first = db.sales().create_sale(&req, USER).await.unwrap().sale;
        let second = db.sales().create_sale(&req, USER).await.unwrap().sale;

        assert!(first.sale_number < second.sale_number);
        let found = db.sales().get_by_number(&second.sale_number).await.unwrap().unwrap();
        assert_eq!(found.id, second.id);
    }

    #[tokio::test]
    async fn test_refund_boundary() {
        let db = database().await;
        let b = branch(&db, "MAIN").await;
        let p = product(&db, "P1", 100).await;
        stock(&db, &b.id, &p.id, 5).await;

        let req = cash_sale(&b.id, vec![NewSaleLine::new(p.id.clone(), 5)]);
        let detail = db.sales().create_sale(&req, USER).await.unwrap();
        let item_id = detail.items[0].id.clone();
        assert_eq!(quantity(&db, &b.id, &p.id).await, 0);

        let partial = RefundRequest {
            lines: Some(vec![RefundLine {
                sale_item_id: item_id.clone(),
                quantity: 2,
            }]),
            reason: Some("damaged".into()),
        };
        let outcome = db.sales().refund_sale(&detail.sale.id, &partial, USER).await.unwrap();
        assert_eq!(outcome.sale.status, SaleStatus::PartiallyRefunded);
        assert_eq!(outcome.refund.amount_cents, 200);
        assert_eq!(quantity(&db, &b.id, &p.id).await, 2);

        let empty = RefundRequest {
            lines: Some(Vec::new()),
            reason: None,
        };
        let err = db.sales().refund_sale(&detail.sale.id, &empty, USER).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(quantity(&db, &b.id, &p.id).await, 2);

        let too_many = RefundRequest {
            lines: Some(vec![RefundLine {
                sale_item_id: item_id.clone(),
                quantity: 4,
            }]),
            reason: None,
        };
        let err = db.sales().refund_sale(&detail.sale.id, &too_many, USER).await.unwrap_err();
        assert!(matches!(
            err.as_domain(),
            Some(CoreError::RefundExceedsQuantity { refundable: 3, requested: 4, .. })
        ));

        let rest = db
            .sales()
            .refund_sale(&detail.sale.id, &RefundRequest::default(), USER)
            .await
            .unwrap();
        assert_eq!(rest.sale.status, SaleStatus::Refunded);
        assert_eq!(rest.items[0].quantity, 3);
        assert_eq!(quantity(&db, &b.id, &p.id).await, 5);

        let err = db
            .sales()
            .refund_sale(&detail.sale.id, &RefundRequest::default(), USER)
            .await
            .unwrap_err();
        assert!(matches!(err.as_domain(), Some(CoreError::AlreadyRefunded(_))));

        let register = db.cash_register().balance(&b.id, None).await.unwrap();
        assert_eq!(register.balance_cents, 0);
        assert_eq!(db.sales().list_refunds(&detail.sale.id).await.unwrap().len(), 2);
        let refunded = db.sales().refunded_quantities(&detail.sale.id).await.unwrap();
        assert_eq!(refunded.get(&item_id), Some(&5));
    }

    #[tokio::test]
    async fn test_full_refund_in_one_go() {
        let db = database().await;
        let b = branch(&db, "MAIN").await;
        let p = product(&db, "P1", 100).await;
        stock(&db, &b.id, &p.id, 5).await;

        let detail = db
            .sales()
            .create_sale(&cash_sale(&b.id, vec![NewSaleLine::new(p.id.clone(), 5)]), USER)
            .await
            .unwrap();

        let outcome = db
            .sales()
            .refund_sale(&detail.sale.id, &RefundRequest::default(), USER)
            .await
            .unwrap();
        assert_eq!(outcome.sale.status, SaleStatus::Refunded);
        assert_eq!(outcome.refund.amount_cents, 500);

        let items = db.sales().list_refund_items(&outcome.refund.id).await.unwrap();
        assert_eq!(items.len(), 1);

        let err = db
            .sales()
            .refund_sale("ghost", &RefundRequest::default(), USER)
            .await
            .unwrap_err();
        assert!(matches!(err.as_domain(), Some(CoreError::SaleNotFound(_))));
    }
}

//! # Product Repository
//!
//! Database operations for the product catalog.
//!
//! Products carry no stock themselves; quantities live per branch in the
//! `inventory` table. Deactivated products stay referenced by sales and
//! transfers but can no longer be sold.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::new_id;
use meridian_core::validation::{validate_name, validate_price_cents, validate_sku};
use meridian_core::{CoreError, NewProduct, Product};

const PRODUCT_COLUMNS: &str =
    "id, sku, barcode, name, description, price_cents, cost_cents, is_active, created_at, updated_at";

/// Repository for product database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = db.products();
/// let product = repo.get_by_sku("COKE-330").await?;
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Inserts a new product.
    ///
    /// ## Errors
    /// - Validation errors for malformed SKU, name, or negative prices
    /// - `UniqueViolation` if the SKU already exists
    pub async fn insert(&self, new: &NewProduct) -> DbResult<Product> {
        validate_sku(&new.sku)?;
        validate_name(&new.name)?;
        validate_price_cents(new.price_cents)?;
        if let Some(cost) = new.cost_cents {
            validate_price_cents(cost)?;
        }

        let now = Utc::now();
        let product = Product {
            id: new_id(),
            sku: new.sku.trim().to_string(),
            barcode: new.barcode.clone(),
            name: new.name.trim().to_string(),
            description: new.description.clone(),
            price_cents: new.price_cents,
            cost_cents: new.cost_cents,
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        debug!(id = %product.id, sku = %product.sku, "Inserting product");

        sqlx::query(
            "INSERT INTO products (\
                id, sku, barcode, name, description, \
                price_cents, cost_cents, is_active, created_at, updated_at\
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        )
        .bind(&product.id)
        .bind(&product.sku)
        .bind(&product.barcode)
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price_cents)
        .bind(product.cost_cents)
        .bind(product.is_active)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { .. } => DbError::duplicate("sku", &product.sku),
            other => other,
        })?;

        Ok(product)
    }

    /// Gets a product by ID (active or not).
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    /// Gets a product by SKU (exact match).
    pub async fn get_by_sku(&self, sku: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE sku = ?1"
        ))
        .bind(sku)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    /// Lists active products ordered by name.
    pub async fn list_active(&self, limit: i64) -> DbResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products \
             WHERE is_active = 1 \
             ORDER BY name \
             LIMIT ?1"
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    /// Soft-deletes a product by setting is_active = false.
    ///
    /// Sales and transfers still reference it, so the row is kept.
    pub async fn deactivate(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deactivating product");

        let result = sqlx::query("UPDATE products SET is_active = 0, updated_at = ?2 WHERE id = ?1")
            .bind(id)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::ProductNotFound(id.to_string()).into());
        }

        Ok(())
    }

    /// Counts active products (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE is_active = 1")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

/// Loads a product inside a transaction, failing with `ProductNotFound`.
pub(crate) async fn fetch_product(conn: &mut SqliteConnection, id: &str) -> DbResult<Product> {
    sqlx::query_as::<_, Product>(&format!(
        "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1"
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| CoreError::ProductNotFound(id.to_string()).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::*;

    #[tokio::test]
    async fn test_insert_and_get() {
        let db = database().await;
        let created = product(&db, "COKE-330", 150).await;

        let found = db.products().get_by_sku("COKE-330").await.unwrap().unwrap();
        assert_eq!(found.id, created.id);
        assert_eq!(found.price().cents(), 150);
        assert!(found.is_active);
        assert_eq!(db.products().count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_rejects_invalid_and_duplicate() {
        let db = database().await;
        product(&db, "COKE-330", 150).await;

        let mut new = NewProduct {
            sku: "COKE-330".into(),
            barcode: None,
            name: "Again".into(),
            description: None,
            price_cents: 100,
            cost_cents: None,
        };
        assert!(db.products().insert(&new).await.unwrap_err().is_unique_violation());

        new.sku = "NEW-1".into();
        new.price_cents = -1;
        let err = db.products().insert(&new).await.unwrap_err();
        assert!(matches!(err.as_domain(), Some(CoreError::Validation(_))));
    }

    #[tokio::test]
    async fn test_deactivate() {
        let db = database().await;
        let p = product(&db, "A", 100).await;
        product(&db, "B", 100).await;

        db.products().deactivate(&p.id).await.unwrap();

        let listed = db.products().list_active(10).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert!(!db.products().get_by_id(&p.id).await.unwrap().unwrap().is_active);
    }
}

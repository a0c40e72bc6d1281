//! # Customer Repository
//!
//! Customers who can buy on credit. Their debt lives in the customer ledger.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use crate::repository::new_id;
use meridian_core::validation::validate_name;
use meridian_core::{CoreError, Customer, NewCustomer};

const CUSTOMER_COLUMNS: &str = "id, name, phone, email, is_active, created_at, updated_at";

/// Repository for customer database operations.
#[derive(Debug, Clone)]
pub struct CustomerRepository {
    pool: SqlitePool,
}

impl CustomerRepository {
    /// Creates a new CustomerRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CustomerRepository { pool }
    }

    pub async fn insert(&self, new: &NewCustomer) -> DbResult<Customer> {
        validate_name(&new.name)?;

        let now = Utc::now();
        let customer = Customer {
            id: new_id(),
            name: new.name.trim().to_string(),
            phone: new.phone.clone(),
            email: new.email.clone(),
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        debug!(id = %customer.id, "Inserting customer");

        sqlx::query(
            "INSERT INTO customers (id, name, phone, email, is_active, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )
        .bind(&customer.id)
        .bind(&customer.name)
        .bind(&customer.phone)
        .bind(&customer.email)
        .bind(customer.is_active)
        .bind(customer.created_at)
        .bind(customer.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(customer)
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Customer>> {
        let customer = sqlx::query_as::<_, Customer>(&format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customers WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(customer)
    }

    /// Lists active customers ordered by name.
    pub async fn list(&self, limit: i64) -> DbResult<Vec<Customer>> {
        let customers = sqlx::query_as::<_, Customer>(&format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customers \
             WHERE is_active = 1 \
             ORDER BY name \
             LIMIT ?1"
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(customers)
    }

    /// Marks a customer inactive. Their ledger is kept.
    pub async fn deactivate(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deactivating customer");

        let result =
            sqlx::query("UPDATE customers SET is_active = 0, updated_at = ?2 WHERE id = ?1")
                .bind(id)
                .bind(Utc::now())
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::CustomerNotFound(id.to_string()).into());
        }

        Ok(())
    }
}

/// Loads a customer inside a transaction, failing with `CustomerNotFound`.
pub(crate) async fn fetch_customer(conn: &mut SqliteConnection, id: &str) -> DbResult<Customer> {
    sqlx::query_as::<_, Customer>(&format!(
        "SELECT {CUSTOMER_COLUMNS} FROM customers WHERE id = ?1"
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| CoreError::CustomerNotFound(id.to_string()).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::*;

    #[tokio::test]
    async fn test_insert_list_deactivate() {
        let db = database().await;
        let ana = customer(&db, "Ana").await;
        customer(&db, "Bo").await;

        assert_eq!(db.customers().list(10).await.unwrap().len(), 2);

        db.customers().deactivate(&ana.id).await.unwrap();
        let listed = db.customers().list(10).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].name, "Bo");

        let kept = db.customers().get_by_id(&ana.id).await.unwrap().unwrap();
        assert!(!kept.is_active);
    }

    #[tokio::test]
    async fn test_blank_name_rejected() {
        let db = database().await;
        let err = db
            .customers()
            .insert(&NewCustomer {
                name: "  ".into(),
                phone: None,
                email: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err.as_domain(), Some(CoreError::Validation(_))));
    }
}

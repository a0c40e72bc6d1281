//! # Branch Repository
//!
//! Store locations. Each branch owns its inventory snapshots and its cash
//! register ledger.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::new_id;
use meridian_core::validation::{validate_branch_code, validate_name};
use meridian_core::{Branch, CoreError, NewBranch};

const BRANCH_COLUMNS: &str = "id, code, name, address, is_active, created_at, updated_at";

/// Repository for branch database operations.
#[derive(Debug, Clone)]
pub struct BranchRepository {
    pool: SqlitePool,
}

impl BranchRepository {
    /// Creates a new BranchRepository.
    pub fn new(pool: SqlitePool) -> Self {
        BranchRepository { pool }
    }

    /// Inserts a branch. Codes are unique.
    pub async fn insert(&self, new: &NewBranch) -> DbResult<Branch> {
        validate_branch_code(&new.code)?;
        validate_name(&new.name)?;

        let now = Utc::now();
        let branch = Branch {
            id: new_id(),
            code: new.code.trim().to_string(),
            name: new.name.trim().to_string(),
            address: new.address.clone(),
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        debug!(id = %branch.id, code = %branch.code, "Inserting branch");

        sqlx::query(
            "INSERT INTO branches (id, code, name, address, is_active, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )
        .bind(&branch.id)
        .bind(&branch.code)
        .bind(&branch.name)
        .bind(&branch.address)
        .bind(branch.is_active)
        .bind(branch.created_at)
        .bind(branch.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { .. } => DbError::duplicate("code", &branch.code),
            other => other,
        })?;

        Ok(branch)
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Branch>> {
        let branch = sqlx::query_as::<_, Branch>(&format!(
            "SELECT {BRANCH_COLUMNS} FROM branches WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(branch)
    }

    pub async fn get_by_code(&self, code: &str) -> DbResult<Option<Branch>> {
        let branch = sqlx::query_as::<_, Branch>(&format!(
            "SELECT {BRANCH_COLUMNS} FROM branches WHERE code = ?1"
        ))
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;

        Ok(branch)
    }

    /// Lists branches ordered by code.
    pub async fn list(&self, include_inactive: bool) -> DbResult<Vec<Branch>> {
        let branches = sqlx::query_as::<_, Branch>(&format!(
            "SELECT {BRANCH_COLUMNS} FROM branches \
             WHERE is_active = 1 OR ?1 \
             ORDER BY code"
        ))
        .bind(include_inactive)
        .fetch_all(&self.pool)
        .await?;

        Ok(branches)
    }

    /// Marks a branch inactive. History stays attached to it.
    pub async fn deactivate(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deactivating branch");

        let result = sqlx::query("UPDATE branches SET is_active = 0, updated_at = ?2 WHERE id = ?1")
            .bind(id)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::BranchNotFound(id.to_string()).into());
        }

        Ok(())
    }
}

/// Loads a branch inside a transaction, failing with `BranchNotFound`.
pub(crate) async fn fetch_branch(conn: &mut SqliteConnection, id: &str) -> DbResult<Branch> {
    sqlx::query_as::<_, Branch>(&format!(
        "SELECT {BRANCH_COLUMNS} FROM branches WHERE id = ?1"
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| CoreError::BranchNotFound(id.to_string()).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::*;

    #[tokio::test]
    async fn test_insert_and_lookup() {
        let db = database().await;
        let created = branch(&db, "NORTH").await;

        let by_id = db.branches().get_by_id(&created.id).await.unwrap().unwrap();
        assert_eq!(by_id.code, "NORTH");
        let by_code = db.branches().get_by_code("NORTH").await.unwrap().unwrap();
        assert_eq!(by_code.id, created.id);
    }

    #[tokio::test]
    async fn test_duplicate_code() {
        let db = database().await;
        branch(&db, "NORTH").await;

        let err = db
            .branches()
            .insert(&NewBranch {
                code: "NORTH".into(),
                name: "Again".into(),
                address: None,
            })
            .await
            .unwrap_err();
        assert!(err.is_unique_violation());
    }

    #[tokio::test]
    async fn test_deactivate_hides_from_list() {
        let db = database().await;
        let a = branch(&db, "A").await;
        branch(&db, "B").await;

        db.branches().deactivate(&a.id).await.unwrap();

        assert_eq!(db.branches().list(false).await.unwrap().len(), 1);
        assert_eq!(db.branches().list(true).await.unwrap().len(), 2);

        let err = db.branches().deactivate("missing").await.unwrap_err();
        assert!(matches!(err.as_domain(), Some(CoreError::BranchNotFound(_))));
    }
}

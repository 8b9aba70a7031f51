//! Admin repository implementation.

use chrono::Utc;
use sqlx::SqlitePool;

use securedrop_core::error::{AppError, ErrorKind};
use securedrop_core::result::AppResult;
use securedrop_entity::admin::{Admin, CreateAdmin};

use crate::connection::map_db_error;

/// Repository for administrator accounts.
#[derive(Debug, Clone)]
pub struct AdminRepository {
    pool: SqlitePool,
}

impl AdminRepository {
    /// Create a new admin repository.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Find an admin by primary key.
    pub async fn find_by_id(&self, id: i64) -> AppResult<Option<Admin>> {
        sqlx::query_as::<_, Admin>("SELECT * FROM admins WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find admin by id", e))
    }

    /// Find an admin by username (case-insensitive).
    pub async fn find_by_username(&self, username: &str) -> AppResult<Option<Admin>> {
        sqlx::query_as::<_, Admin>("SELECT * FROM admins WHERE LOWER(username) = LOWER(?)")
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to find admin by username", e)
            })
    }

    /// List all admins ordered by username.
    pub async fn find_all(&self) -> AppResult<Vec<Admin>> {
        sqlx::query_as::<_, Admin>("SELECT * FROM admins ORDER BY username")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list admins", e))
    }

    /// Create a new admin.
    pub async fn create(&self, data: &CreateAdmin) -> AppResult<Admin> {
        sqlx::query_as::<_, Admin>(
            "INSERT INTO admins (username, password_hash, created_at) VALUES (?, ?, ?) RETURNING *",
        )
        .bind(&data.username)
        .bind(&data.password_hash)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_db_error("Failed to create admin", e))
    }

    /// Replace an admin's password hash.
    pub async fn update_password(&self, id: i64, password_hash: &str) -> AppResult<()> {
        let result = sqlx::query("UPDATE admins SET password_hash = ? WHERE id = ?")
            .bind(password_hash)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to update admin password", e)
            })?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(format!("Admin {id} not found")));
        }
        Ok(())
    }

    /// Count admins.
    pub async fn count(&self) -> AppResult<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM admins")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to count admins", e))
    }
}

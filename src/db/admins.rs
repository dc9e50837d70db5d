//! Admin user operations backing the admin table gate.

use sqlx::Row;

use super::repository::{now_rfc3339, unique_conflict};
use super::Repository;
use crate::errors::AppError;
use crate::models::{AdminRole, AdminUser, CreateAdminRequest};

impl Repository {
    /// Look up an admin by identity provider user id.
    pub async fn get_admin(&self, id: &str) -> Result<Option<AdminUser>, AppError> {
        let row = sqlx::query(
            "SELECT id, email, full_name, role, last_login_at, created_at FROM admin_users WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(admin_from_row))
    }

    /// List all admins, oldest first.
    pub async fn list_admins(&self) -> Result<Vec<AdminUser>, AppError> {
        let rows = sqlx::query(
            "SELECT id, email, full_name, role, last_login_at, created_at FROM admin_users ORDER BY created_at, email",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(admin_from_row).collect())
    }

    /// Grant admin access.
    pub async fn create_admin(&self, request: &CreateAdminRequest) -> Result<AdminUser, AppError> {
        let now = now_rfc3339();
        let email = request.email.trim().to_lowercase();

        sqlx::query(
            "INSERT INTO admin_users (id, email, full_name, role, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&request.id)
        .bind(&email)
        .bind(&request.full_name)
        .bind(request.role.as_str())
        .bind(&now)
        .execute(&self.pool)
        .await
        .map_err(|e| unique_conflict(e, "An admin with this id or email already exists"))?;

        Ok(AdminUser {
            id: request.id.clone(),
            email,
            full_name: request.full_name.clone(),
            role: request.role,
            last_login_at: None,
            created_at: now,
        })
    }

    /// Revoke admin access. The profile goes with it.
    pub async fn delete_admin(&self, id: &str) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM admin_users WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Admin {} not found", id)));
        }
        Ok(())
    }

    /// Stamp `last_login_at` and return the refreshed row.
    pub async fn record_admin_login(&self, id: &str) -> Result<AdminUser, AppError> {
        let result = sqlx::query("UPDATE admin_users SET last_login_at = ? WHERE id = ?")
            .bind(now_rfc3339())
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Admin {} not found", id)));
        }

        self.get_admin(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Admin {} not found", id)))
    }

    /// Insert the first super admin when the table is empty. Returns whether a row was added.
    pub async fn bootstrap_admin(&self, id: &str, email: &str) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"INSERT INTO admin_users (id, email, role, created_at)
               SELECT ?, ?, 'super_admin', ?
               WHERE NOT EXISTS (SELECT 1 FROM admin_users)"#,
        )
        .bind(id)
        .bind(email.trim().to_lowercase())
        .bind(now_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

fn admin_from_row(row: &sqlx::sqlite::SqliteRow) -> AdminUser {
    let role: String = row.get("role");
    AdminUser {
        id: row.get("id"),
        email: row.get("email"),
        full_name: row.get("full_name"),
        role: AdminRole::from_str(&role).unwrap_or_default(),
        last_login_at: row.get("last_login_at"),
        created_at: row.get("created_at"),
    }
}

//! Contact submission operations.

use sqlx::Row;

use super::repository::now_rfc3339;
use super::Repository;
use crate::errors::AppError;
use crate::models::{ContactStats, ContactStatus, ContactSubmission, CreateContactRequest, Locale};

impl Repository {
    /// Store a new submission with status `pending`.
    pub async fn create_contact(
        &self,
        request: &CreateContactRequest,
    ) -> Result<ContactSubmission, AppError> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = now_rfc3339();
        let name = request.name.trim().to_string();
        let email = request.email.trim().to_string();
        let subject = request.subject.trim().to_string();

        sqlx::query(
            "INSERT INTO contact_submissions (id, name, email, subject, message, locale, status, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, 'pending', ?, ?)",
        )
        .bind(&id)
        .bind(&name)
        .bind(&email)
        .bind(&subject)
        .bind(&request.message)
        .bind(request.locale.as_str())
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(ContactSubmission {
            id,
            name,
            email,
            subject,
            message: request.message.clone(),
            locale: request.locale,
            status: ContactStatus::Pending,
            created_at: now.clone(),
            updated_at: now,
        })
    }

    /// List submissions newest first, optionally filtered by status.
    pub async fn list_contacts(
        &self,
        status: Option<ContactStatus>,
    ) -> Result<Vec<ContactSubmission>, AppError> {
        let rows = match status {
            Some(status) => {
                sqlx::query(
                    "SELECT id, name, email, subject, message, locale, status, created_at, updated_at FROM contact_submissions WHERE status = ? ORDER BY created_at DESC, rowid DESC",
                )
                .bind(status.as_str())
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query(
                    "SELECT id, name, email, subject, message, locale, status, created_at, updated_at FROM contact_submissions ORDER BY created_at DESC, rowid DESC",
                )
                .fetch_all(&self.pool)
                .await?
            }
        };

        Ok(rows.iter().map(contact_from_row).collect())
    }

    /// Get a submission by ID.
    pub async fn get_contact(&self, id: &str) -> Result<Option<ContactSubmission>, AppError> {
        let row = sqlx::query(
            "SELECT id, name, email, subject, message, locale, status, created_at, updated_at FROM contact_submissions WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(contact_from_row))
    }

    /// Move a submission to another status.
    pub async fn update_contact_status(
        &self,
        id: &str,
        status: ContactStatus,
    ) -> Result<ContactSubmission, AppError> {
        let result =
            sqlx::query("UPDATE contact_submissions SET status = ?, updated_at = ? WHERE id = ?")
                .bind(status.as_str())
                .bind(now_rfc3339())
                .bind(id)
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "Contact submission {} not found",
                id
            )));
        }

        self.get_contact(id).await?.ok_or_else(|| {
            AppError::NotFound(format!("Contact submission {} not found", id))
        })
    }

    /// Delete a submission.
    pub async fn delete_contact(&self, id: &str) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM contact_submissions WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "Contact submission {} not found",
                id
            )));
        }
        Ok(())
    }

    /// Count submissions per status.
    pub async fn contact_stats(&self) -> Result<ContactStats, AppError> {
        let rows =
            sqlx::query("SELECT status, COUNT(*) AS n FROM contact_submissions GROUP BY status")
                .fetch_all(&self.pool)
                .await?;

        let mut stats = ContactStats::default();
        for row in rows {
            let status: String = row.get("status");
            let n: i64 = row.get("n");
            stats.total += n;
            match ContactStatus::from_str(&status) {
                Some(ContactStatus::Pending) => stats.pending = n,
                Some(ContactStatus::Read) => stats.read = n,
                Some(ContactStatus::Replied) => stats.replied = n,
                Some(ContactStatus::Archived) => stats.archived = n,
                None => {}
            }
        }
        Ok(stats)
    }
}

fn contact_from_row(row: &sqlx::sqlite::SqliteRow) -> ContactSubmission {
    let locale: String = row.get("locale");
    let status: String = row.get("status");
    ContactSubmission {
        id: row.get("id"),
        name: row.get("name"),
        email: row.get("email"),
        subject: row.get("subject"),
        message: row.get("message"),
        locale: Locale::from_str(&locale),
        status: ContactStatus::from_str(&status).unwrap_or(ContactStatus::Pending),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

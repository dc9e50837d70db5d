//! Newsletter subscriber operations and the token lifecycle.
//!
//! `pending -> active` consumes the single-use verification token and
//! `* -> unsubscribed` uses the permanent unsubscribe token. Each transition
//! is one conditional `UPDATE ... RETURNING`, so a token can only win once.

use rand::distr::{Alphanumeric, SampleString};
use sqlx::Row;

use super::repository::now_rfc3339;
use super::Repository;
use crate::errors::{codes, AppError};
use crate::models::{Locale, NewsletterStats, Subscriber, SubscriberStatus};

const SUBSCRIBER_COLUMNS: &str = "id, email, locale, status, verification_token, unsubscribe_token, verified_at, unsubscribed_at, created_at, updated_at";

/// Length of generated verification and unsubscribe tokens.
const TOKEN_LENGTH: usize = 48;

/// What a subscribe request did to the subscriber row.
#[derive(Debug, Clone)]
pub enum SubscribeOutcome {
    /// New row in `pending`
    Created(Subscriber),
    /// Still pending; a fresh verification token was issued
    Resent(Subscriber),
    /// Previously unsubscribed or inactive; back to `pending`
    Resubscribed(Subscriber),
}

impl SubscribeOutcome {
    pub fn subscriber(&self) -> &Subscriber {
        match self {
            SubscribeOutcome::Created(s)
            | SubscribeOutcome::Resent(s)
            | SubscribeOutcome::Resubscribed(s) => s,
        }
    }

    pub fn into_subscriber(self) -> Subscriber {
        match self {
            SubscribeOutcome::Created(s)
            | SubscribeOutcome::Resent(s)
            | SubscribeOutcome::Resubscribed(s) => s,
        }
    }
}

/// Random URL-safe token for email links.
pub fn generate_token() -> String {
    Alphanumeric.sample_string(&mut rand::rng(), TOKEN_LENGTH)
}

impl Repository {
    /// Get a subscriber by (normalized) email.
    pub async fn get_subscriber_by_email(&self, email: &str) -> Result<Option<Subscriber>, AppError> {
        let sql = format!(
            "SELECT {} FROM newsletter_subscribers WHERE email = ?",
            SUBSCRIBER_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(normalize_email(email))
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(subscriber_from_row))
    }

    /// Get a subscriber by ID.
    pub async fn get_subscriber(&self, id: &str) -> Result<Option<Subscriber>, AppError> {
        let sql = format!(
            "SELECT {} FROM newsletter_subscribers WHERE id = ?",
            SUBSCRIBER_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(subscriber_from_row))
    }

    /// Start or restart a subscription. Active subscribers are a conflict.
    pub async fn subscribe(&self, email: &str, locale: Locale) -> Result<SubscribeOutcome, AppError> {
        let email = normalize_email(email);

        // A concurrent insert for the same email loses on the unique index;
        // the second pass then sees the row it lost to.
        for _ in 0..2 {
            let existing = self.get_subscriber_by_email(&email).await?;

            let Some(existing) = existing else {
                match self.insert_subscriber(&email, locale).await {
                    Ok(subscriber) => return Ok(SubscribeOutcome::Created(subscriber)),
                    Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => continue,
                    Err(e) => return Err(e.into()),
                }
            };

            let now = now_rfc3339();
            let token = generate_token();

            return match existing.status {
                SubscriberStatus::Active => Err(AppError::Conflict {
                    code: codes::ALREADY_SUBSCRIBED,
                    message: "This email is already subscribed".to_string(),
                }),
                SubscriberStatus::Pending => {
                    let sql = format!(
                        "UPDATE newsletter_subscribers SET verification_token = ?, locale = ?, updated_at = ? WHERE id = ? AND status = 'pending' RETURNING {}",
                        SUBSCRIBER_COLUMNS
                    );
                    let row = sqlx::query(&sql)
                        .bind(&token)
                        .bind(locale.as_str())
                        .bind(&now)
                        .bind(&existing.id)
                        .fetch_optional(&self.pool)
                        .await?;
                    row.as_ref()
                        .map(|r| SubscribeOutcome::Resent(subscriber_from_row(r)))
                        .ok_or_else(|| AppError::conflict("Subscription changed concurrently, please retry"))
                }
                SubscriberStatus::Inactive | SubscriberStatus::Unsubscribed => {
                    let sql = format!(
                        "UPDATE newsletter_subscribers SET status = 'pending', verification_token = ?, locale = ?, unsubscribed_at = NULL, updated_at = ? WHERE id = ? AND status IN ('inactive', 'unsubscribed') RETURNING {}",
                        SUBSCRIBER_COLUMNS
                    );
                    let row = sqlx::query(&sql)
                        .bind(&token)
                        .bind(locale.as_str())
                        .bind(&now)
                        .bind(&existing.id)
                        .fetch_optional(&self.pool)
                        .await?;
                    row.as_ref()
                        .map(|r| SubscribeOutcome::Resubscribed(subscriber_from_row(r)))
                        .ok_or_else(|| AppError::conflict("Subscription changed concurrently, please retry"))
                }
            };
        }

        Err(AppError::conflict("Subscription changed concurrently, please retry"))
    }

    async fn insert_subscriber(&self, email: &str, locale: Locale) -> Result<Subscriber, sqlx::Error> {
        let sql = format!(
            "INSERT INTO newsletter_subscribers (id, email, locale, status, verification_token, unsubscribe_token, created_at, updated_at) VALUES (?, ?, ?, 'pending', ?, ?, ?, ?) RETURNING {}",
            SUBSCRIBER_COLUMNS
        );
        let now = now_rfc3339();
        let row = sqlx::query(&sql)
            .bind(uuid::Uuid::new_v4().to_string())
            .bind(email)
            .bind(locale.as_str())
            .bind(generate_token())
            .bind(generate_token())
            .bind(&now)
            .bind(&now)
            .fetch_one(&self.pool)
            .await?;

        Ok(subscriber_from_row(&row))
    }

    /// Consume a verification token. `None` when the token is unknown or already used.
    pub async fn verify_subscriber(&self, token: &str) -> Result<Option<Subscriber>, AppError> {
        let now = now_rfc3339();
        let sql = format!(
            "UPDATE newsletter_subscribers SET status = 'active', verified_at = ?, verification_token = NULL, updated_at = ? WHERE verification_token = ? AND status = 'pending' RETURNING {}",
            SUBSCRIBER_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(&now)
            .bind(&now)
            .bind(token)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(subscriber_from_row))
    }

    /// Unsubscribe by permanent token.
    pub async fn unsubscribe(&self, token: &str) -> Result<Subscriber, AppError> {
        let now = now_rfc3339();
        let sql = format!(
            "UPDATE newsletter_subscribers SET status = 'unsubscribed', unsubscribed_at = ?, verification_token = NULL, updated_at = ? WHERE unsubscribe_token = ? AND status != 'unsubscribed' RETURNING {}",
            SUBSCRIBER_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(&now)
            .bind(&now)
            .bind(token)
            .fetch_optional(&self.pool)
            .await?;

        if let Some(row) = row {
            return Ok(subscriber_from_row(&row));
        }

        let known = sqlx::query("SELECT 1 FROM newsletter_subscribers WHERE unsubscribe_token = ?")
            .bind(token)
            .fetch_optional(&self.pool)
            .await?
            .is_some();

        if known {
            Err(AppError::Conflict {
                code: codes::ALREADY_UNSUBSCRIBED,
                message: "This email is already unsubscribed".to_string(),
            })
        } else {
            Err(AppError::NotFound(
                "Invalid or expired unsubscribe link".to_string(),
            ))
        }
    }

    /// List subscribers newest first, optionally filtered by status.
    pub async fn list_subscribers(
        &self,
        status: Option<SubscriberStatus>,
    ) -> Result<Vec<Subscriber>, AppError> {
        let rows = match status {
            Some(status) => {
                let sql = format!(
                    "SELECT {} FROM newsletter_subscribers WHERE status = ? ORDER BY created_at DESC, rowid DESC",
                    SUBSCRIBER_COLUMNS
                );
                sqlx::query(&sql)
                    .bind(status.as_str())
                    .fetch_all(&self.pool)
                    .await?
            }
            None => {
                let sql = format!(
                    "SELECT {} FROM newsletter_subscribers ORDER BY created_at DESC, rowid DESC",
                    SUBSCRIBER_COLUMNS
                );
                sqlx::query(&sql).fetch_all(&self.pool).await?
            }
        };

        Ok(rows.iter().map(subscriber_from_row).collect())
    }

    /// Admin override of a subscriber's status. Only `active` and `inactive` are allowed.
    pub async fn set_subscriber_status(
        &self,
        id: &str,
        status: SubscriberStatus,
    ) -> Result<Subscriber, AppError> {
        let now = now_rfc3339();
        let sql = match status {
            SubscriberStatus::Active => format!(
                "UPDATE newsletter_subscribers SET status = 'active', verification_token = NULL, verified_at = COALESCE(verified_at, ?1), updated_at = ?1 WHERE id = ?2 RETURNING {}",
                SUBSCRIBER_COLUMNS
            ),
            SubscriberStatus::Inactive => format!(
                "UPDATE newsletter_subscribers SET status = 'inactive', updated_at = ?1 WHERE id = ?2 RETURNING {}",
                SUBSCRIBER_COLUMNS
            ),
            other => {
                return Err(AppError::field_validation(
                    "Status can only be set to active or inactive",
                    "status",
                    format!("'{}' cannot be set by an admin", other.as_str()),
                ))
            }
        };

        let row = sqlx::query(&sql)
            .bind(&now)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref()
            .map(subscriber_from_row)
            .ok_or_else(|| AppError::NotFound(format!("Subscriber {} not found", id)))
    }

    /// Delete a subscriber.
    pub async fn delete_subscriber(&self, id: &str) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM newsletter_subscribers WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Subscriber {} not found", id)));
        }
        Ok(())
    }

    /// Count subscribers per status.
    pub async fn newsletter_stats(&self) -> Result<NewsletterStats, AppError> {
        let rows =
            sqlx::query("SELECT status, COUNT(*) AS n FROM newsletter_subscribers GROUP BY status")
                .fetch_all(&self.pool)
                .await?;

        let mut stats = NewsletterStats::default();
        for row in rows {
            let status: String = row.get("status");
            let n: i64 = row.get("n");
            stats.total += n;
            match SubscriberStatus::from_str(&status) {
                Some(SubscriberStatus::Pending) => stats.pending = n,
                Some(SubscriberStatus::Active) => stats.active = n,
                Some(SubscriberStatus::Inactive) => stats.inactive = n,
                Some(SubscriberStatus::Unsubscribed) => stats.unsubscribed = n,
                None => {}
            }
        }
        Ok(stats)
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn subscriber_from_row(row: &sqlx::sqlite::SqliteRow) -> Subscriber {
    let locale: String = row.get("locale");
    let status: String = row.get("status");
    Subscriber {
        id: row.get("id"),
        email: row.get("email"),
        locale: Locale::from_str(&locale),
        status: SubscriberStatus::from_str(&status).unwrap_or(SubscriberStatus::Pending),
        verification_token: row.get("verification_token"),
        unsubscribe_token: row.get("unsubscribe_token"),
        verified_at: row.get("verified_at"),
        unsubscribed_at: row.get("unsubscribed_at"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

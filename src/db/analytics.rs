//! Analytics session and page view operations.

use chrono::{Duration, SecondsFormat, Utc};
use sqlx::Row;

use super::repository::now_rfc3339;
use super::Repository;
use crate::errors::AppError;
use crate::models::{AnalyticsSummary, Locale, PathCount};

impl Repository {
    /// Create or refresh the session for a fingerprint and return its id.
    ///
    /// Single statement, so two first requests from the same visitor
    /// cannot create two sessions.
    pub async fn upsert_session(
        &self,
        fingerprint: &str,
        ip: Option<&str>,
        user_agent: Option<&str>,
    ) -> Result<String, AppError> {
        let now = now_rfc3339();
        let row = sqlx::query(
            r#"INSERT INTO analytics_sessions (id, fingerprint, ip, user_agent, first_seen_at, last_seen_at)
               VALUES (?, ?, ?, ?, ?, ?)
               ON CONFLICT(fingerprint) DO UPDATE SET
                   last_seen_at = excluded.last_seen_at,
                   ip = COALESCE(excluded.ip, analytics_sessions.ip),
                   user_agent = COALESCE(excluded.user_agent, analytics_sessions.user_agent)
               RETURNING id"#,
        )
        .bind(uuid::Uuid::new_v4().to_string())
        .bind(fingerprint)
        .bind(ip)
        .bind(user_agent)
        .bind(&now)
        .bind(&now)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.get("id"))
    }

    /// Record a page view entered now.
    pub async fn record_page_view(
        &self,
        session_id: &str,
        path: &str,
        referrer: Option<&str>,
        locale: Option<Locale>,
    ) -> Result<String, AppError> {
        let id = uuid::Uuid::new_v4().to_string();
        sqlx::query(
            "INSERT INTO page_views (id, session_id, path, referrer, locale, entered_at) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(session_id)
        .bind(path)
        .bind(referrer)
        .bind(locale.map(|l| l.as_str()))
        .bind(now_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(id)
    }

    /// Close a page view of this session. Returns the duration in seconds,
    /// or `None` when the view is unknown, foreign, or already closed.
    pub async fn record_exit(
        &self,
        session_id: &str,
        page_view_id: &str,
    ) -> Result<Option<i64>, AppError> {
        let row = sqlx::query(
            r#"UPDATE page_views SET
                   exited_at = ?1,
                   duration_seconds = MAX(0, CAST(ROUND((julianday(?1) - julianday(entered_at)) * 86400) AS INTEGER))
               WHERE id = ?2 AND session_id = ?3 AND exited_at IS NULL
               RETURNING duration_seconds"#,
        )
        .bind(now_rfc3339())
        .bind(page_view_id)
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.get("duration_seconds")))
    }

    /// Aggregate traffic over the last `days` days.
    pub async fn analytics_summary(&self, days: i64) -> Result<AnalyticsSummary, AppError> {
        let cutoff = (Utc::now() - Duration::days(days)).to_rfc3339_opts(SecondsFormat::Millis, true);

        let sessions: i64 =
            sqlx::query("SELECT COUNT(*) AS n FROM analytics_sessions WHERE last_seen_at >= ?")
                .bind(&cutoff)
                .fetch_one(&self.pool)
                .await?
                .get("n");

        let totals = sqlx::query(
            r#"SELECT COUNT(*) AS views,
                      COUNT(DISTINCT path) AS paths,
                      AVG(duration_seconds) AS avg_duration
               FROM page_views WHERE entered_at >= ?"#,
        )
        .bind(&cutoff)
        .fetch_one(&self.pool)
        .await?;

        let top = sqlx::query(
            r#"SELECT path, COUNT(*) AS views FROM page_views
               WHERE entered_at >= ?
               GROUP BY path
               ORDER BY views DESC, path ASC
               LIMIT 10"#,
        )
        .bind(&cutoff)
        .fetch_all(&self.pool)
        .await?;

        Ok(AnalyticsSummary {
            days,
            sessions,
            page_views: totals.get("views"),
            unique_paths: totals.get("paths"),
            avg_duration_seconds: totals.get("avg_duration"),
            top_paths: top
                .iter()
                .map(|row| PathCount {
                    path: row.get("path"),
                    views: row.get("views"),
                })
                .collect(),
        })
    }
}

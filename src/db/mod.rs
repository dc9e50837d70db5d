//! Database module for SQLite persistence.
//!
//! SQLite is the source of truth for all application data.

mod admins;
mod analytics;
mod categories;
mod contact;
mod newsletter;
mod profiles;
mod projects;
mod repository;

pub use newsletter::SubscribeOutcome;
pub use repository::*;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;

/// Initialize the database connection pool and run migrations.
pub async fn init_database(db_path: &Path) -> Result<SqlitePool, sqlx::Error> {
    // Ensure the parent directory exists
    if let Some(parent) = db_path.parent() {
        tokio::fs::create_dir_all(parent).await.ok();
    }

    let db_url = format!("sqlite:{}?mode=rwc", db_path.display());

    let options = SqliteConnectOptions::from_str(&db_url)?
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
        .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
        .busy_timeout(std::time::Duration::from_secs(30));

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    // Run embedded migrations
    run_migrations(&pool).await?;

    Ok(pool)
}

/// Run database migrations.
async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS admin_users (
            id TEXT PRIMARY KEY,
            email TEXT NOT NULL UNIQUE,
            full_name TEXT,
            role TEXT NOT NULL DEFAULT 'admin' CHECK (role IN ('admin', 'super_admin')),
            last_login_at TEXT,
            created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS user_profiles (
            admin_id TEXT PRIMARY KEY REFERENCES admin_users(id) ON DELETE CASCADE,
            bio TEXT,
            headline TEXT,
            company TEXT,
            location TEXT,
            website TEXT,
            avatar_url TEXT,
            urls TEXT NOT NULL DEFAULT '[]',
            roles TEXT NOT NULL DEFAULT '[]',
            phone_numbers TEXT NOT NULL DEFAULT '[]',
            emails TEXT NOT NULL DEFAULT '[]',
            skills TEXT NOT NULL DEFAULT '[]',
            languages TEXT NOT NULL DEFAULT '[]',
            addresses TEXT NOT NULL DEFAULT '[]',
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS categories (
            id TEXT PRIMARY KEY,
            slug TEXT NOT NULL UNIQUE,
            name_es TEXT NOT NULL,
            name_en TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS projects (
            id TEXT PRIMARY KEY,
            slug TEXT NOT NULL UNIQUE,
            title_es TEXT NOT NULL,
            title_en TEXT NOT NULL,
            description_es TEXT NOT NULL,
            description_en TEXT NOT NULL,
            about_es TEXT,
            about_en TEXT,
            image TEXT,
            gallery TEXT NOT NULL DEFAULT '[]',
            tags TEXT NOT NULL DEFAULT '[]',
            urls TEXT NOT NULL DEFAULT '[]',
            is_active INTEGER NOT NULL DEFAULT 1,
            display_order INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS project_categories (
            project_id TEXT NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
            category_id TEXT NOT NULL REFERENCES categories(id) ON DELETE CASCADE,
            PRIMARY KEY (project_id, category_id)
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS contact_submissions (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            email TEXT NOT NULL,
            subject TEXT NOT NULL,
            message TEXT NOT NULL,
            locale TEXT NOT NULL DEFAULT 'es',
            status TEXT NOT NULL DEFAULT 'pending',
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS newsletter_subscribers (
            id TEXT PRIMARY KEY,
            email TEXT NOT NULL UNIQUE,
            locale TEXT NOT NULL DEFAULT 'es',
            status TEXT NOT NULL DEFAULT 'pending',
            verification_token TEXT UNIQUE,
            unsubscribe_token TEXT NOT NULL UNIQUE,
            verified_at TEXT,
            unsubscribed_at TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS analytics_sessions (
            id TEXT PRIMARY KEY,
            fingerprint TEXT NOT NULL UNIQUE,
            ip TEXT,
            user_agent TEXT,
            first_seen_at TEXT NOT NULL,
            last_seen_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS page_views (
            id TEXT PRIMARY KEY,
            session_id TEXT NOT NULL REFERENCES analytics_sessions(id) ON DELETE CASCADE,
            path TEXT NOT NULL,
            referrer TEXT,
            locale TEXT,
            entered_at TEXT NOT NULL,
            exited_at TEXT,
            duration_seconds INTEGER
        );
        "#,
    )
    .execute(pool)
    .await?;

    // Create indexes for common queries
    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_projects_order ON projects(display_order, created_at);
        CREATE INDEX IF NOT EXISTS idx_project_categories_category ON project_categories(category_id);
        CREATE INDEX IF NOT EXISTS idx_contact_status ON contact_submissions(status);
        CREATE INDEX IF NOT EXISTS idx_contact_created_at ON contact_submissions(created_at);
        CREATE INDEX IF NOT EXISTS idx_subscribers_status ON newsletter_subscribers(status);
        CREATE INDEX IF NOT EXISTS idx_page_views_session ON page_views(session_id);
        CREATE INDEX IF NOT EXISTS idx_page_views_entered_at ON page_views(entered_at);
        CREATE INDEX IF NOT EXISTS idx_sessions_last_seen ON analytics_sessions(last_seen_at);
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

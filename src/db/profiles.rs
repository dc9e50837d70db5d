//! Admin profile operations.

use sqlx::Row;

use super::repository::{now_rfc3339, to_json_column};
use super::Repository;
use crate::errors::AppError;
use crate::models::{parse_json_column, ProfileData, ProfileField, UserProfile};

const PROFILE_COLUMNS: &str = "admin_id, bio, headline, company, location, website, avatar_url, urls, roles, phone_numbers, emails, skills, languages, addresses, created_at, updated_at";

impl Repository {
    /// Get the profile of an admin, if one was ever stored.
    pub async fn get_profile(&self, admin_id: &str) -> Result<Option<UserProfile>, AppError> {
        let sql = format!(
            "SELECT {} FROM user_profiles WHERE admin_id = ?",
            PROFILE_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(admin_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(profile_from_row))
    }

    /// Get the profile of an admin, creating an empty one on first access.
    pub async fn get_or_create_profile(&self, admin_id: &str) -> Result<UserProfile, AppError> {
        let now = now_rfc3339();
        sqlx::query(
            "INSERT OR IGNORE INTO user_profiles (admin_id, created_at, updated_at) VALUES (?, ?, ?)",
        )
        .bind(admin_id)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        self.get_profile(admin_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Profile {} not found", admin_id)))
    }

    /// Replace the whole profile of an admin.
    pub async fn upsert_profile(
        &self,
        admin_id: &str,
        data: &ProfileData,
    ) -> Result<UserProfile, AppError> {
        let now = now_rfc3339();

        sqlx::query(
            r#"INSERT INTO user_profiles (
                admin_id, bio, headline, company, location, website, avatar_url,
                urls, roles, phone_numbers, emails, skills, languages, addresses,
                created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(admin_id) DO UPDATE SET
                bio = excluded.bio,
                headline = excluded.headline,
                company = excluded.company,
                location = excluded.location,
                website = excluded.website,
                avatar_url = excluded.avatar_url,
                urls = excluded.urls,
                roles = excluded.roles,
                phone_numbers = excluded.phone_numbers,
                emails = excluded.emails,
                skills = excluded.skills,
                languages = excluded.languages,
                addresses = excluded.addresses,
                updated_at = excluded.updated_at"#,
        )
        .bind(admin_id)
        .bind(field_column(&data.bio))
        .bind(field_column(&data.headline))
        .bind(field_column(&data.company))
        .bind(field_column(&data.location))
        .bind(field_column(&data.website))
        .bind(field_column(&data.avatar_url))
        .bind(to_json_column(&data.urls))
        .bind(to_json_column(&data.roles))
        .bind(to_json_column(&data.phone_numbers))
        .bind(to_json_column(&data.emails))
        .bind(to_json_column(&data.skills))
        .bind(to_json_column(&data.languages))
        .bind(to_json_column(&data.addresses))
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        self.get_profile(admin_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Profile {} not found", admin_id)))
    }
}

fn field_column(field: &Option<ProfileField>) -> Option<String> {
    field.as_ref().and_then(|f| serde_json::to_string(f).ok())
}

fn profile_from_row(row: &sqlx::sqlite::SqliteRow) -> UserProfile {
    UserProfile {
        admin_id: row.get("admin_id"),
        data: ProfileData {
            bio: parse_json_column(row.get("bio")),
            headline: parse_json_column(row.get("headline")),
            company: parse_json_column(row.get("company")),
            location: parse_json_column(row.get("location")),
            website: parse_json_column(row.get("website")),
            avatar_url: parse_json_column(row.get("avatar_url")),
            urls: parse_json_column(row.get("urls")),
            roles: parse_json_column(row.get("roles")),
            phone_numbers: parse_json_column(row.get("phone_numbers")),
            emails: parse_json_column(row.get("emails")),
            skills: parse_json_column(row.get("skills")),
            languages: parse_json_column(row.get("languages")),
            addresses: parse_json_column(row.get("addresses")),
        },
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

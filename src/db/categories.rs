//! Category operations.

use sqlx::Row;

use super::repository::{now_rfc3339, unique_conflict};
use super::Repository;
use crate::errors::AppError;
use crate::models::{Category, CreateCategoryRequest, UpdateCategoryRequest};

const SLUG_TAKEN: &str = "A category with this slug already exists";

impl Repository {
    /// List all categories with their project counts, ordered by Spanish name.
    pub async fn list_categories(&self) -> Result<Vec<Category>, AppError> {
        let rows = sqlx::query(
            r#"SELECT c.id, c.slug, c.name_es, c.name_en, c.created_at, c.updated_at,
                      COUNT(pc.project_id) AS project_count
               FROM categories c
               LEFT JOIN project_categories pc ON pc.category_id = c.id
               GROUP BY c.id
               ORDER BY c.name_es"#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(category_from_row).collect())
    }

    /// Get a category by ID.
    pub async fn get_category(&self, id: &str) -> Result<Option<Category>, AppError> {
        let row = sqlx::query(
            r#"SELECT c.id, c.slug, c.name_es, c.name_en, c.created_at, c.updated_at,
                      (SELECT COUNT(*) FROM project_categories pc WHERE pc.category_id = c.id) AS project_count
               FROM categories c WHERE c.id = ?"#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(category_from_row))
    }

    /// Create a new category.
    pub async fn create_category(
        &self,
        request: &CreateCategoryRequest,
    ) -> Result<Category, AppError> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = now_rfc3339();

        sqlx::query(
            "INSERT INTO categories (id, slug, name_es, name_en, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(&request.slug)
        .bind(&request.name_es)
        .bind(&request.name_en)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await
        .map_err(|e| unique_conflict(e, SLUG_TAKEN))?;

        Ok(Category {
            id,
            slug: request.slug.clone(),
            name_es: request.name_es.clone(),
            name_en: request.name_en.clone(),
            project_count: 0,
            created_at: now.clone(),
            updated_at: now,
        })
    }

    /// Update a category.
    pub async fn update_category(
        &self,
        id: &str,
        request: &UpdateCategoryRequest,
    ) -> Result<Category, AppError> {
        let existing = self
            .get_category(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Category {} not found", id)))?;

        let now = now_rfc3339();
        let slug = request.slug.clone().unwrap_or(existing.slug);
        let name_es = request.name_es.clone().unwrap_or(existing.name_es);
        let name_en = request.name_en.clone().unwrap_or(existing.name_en);

        sqlx::query(
            "UPDATE categories SET slug = ?, name_es = ?, name_en = ?, updated_at = ? WHERE id = ?",
        )
        .bind(&slug)
        .bind(&name_es)
        .bind(&name_en)
        .bind(&now)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| unique_conflict(e, SLUG_TAKEN))?;

        Ok(Category {
            id: id.to_string(),
            slug,
            name_es,
            name_en,
            project_count: existing.project_count,
            created_at: existing.created_at,
            updated_at: now,
        })
    }

    /// Delete a category. Refused while any project references it.
    pub async fn delete_category(&self, id: &str) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        let project_count: i64 =
            sqlx::query("SELECT COUNT(*) AS n FROM project_categories WHERE category_id = ?")
                .bind(id)
                .fetch_one(&mut *tx)
                .await?
                .get("n");

        if project_count > 0 {
            return Err(AppError::CategoryInUse { project_count });
        }

        let result = sqlx::query("DELETE FROM categories WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Category {} not found", id)));
        }

        tx.commit().await?;
        Ok(())
    }
}

fn category_from_row(row: &sqlx::sqlite::SqliteRow) -> Category {
    Category {
        id: row.get("id"),
        slug: row.get("slug"),
        name_es: row.get("name_es"),
        name_en: row.get("name_en"),
        project_count: row.get("project_count"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

//! Project and project/category association operations.

use std::collections::HashMap;

use sqlx::{QueryBuilder, Row, Sqlite, Transaction};

use super::repository::{now_rfc3339, patch_optional, to_json_column, unique_conflict};
use super::Repository;
use crate::errors::AppError;
use crate::models::{
    parse_json_column, CategoryRef, CreateProjectRequest, Project, ReorderItem,
    UpdateProjectRequest,
};

/// Ids per `IN (...)` lookup, well under the SQLite bind limit.
const CATEGORY_LOOKUP_CHUNK: usize = 500;

const PROJECT_COLUMNS: &str = "p.id, p.slug, p.title_es, p.title_en, p.description_es, p.description_en, p.about_es, p.about_en, p.image, p.gallery, p.tags, p.urls, p.is_active, p.display_order, p.created_at, p.updated_at";

const SLUG_TAKEN: &str = "A project with this slug already exists";

impl Repository {
    /// List projects ordered for display, optionally only active ones in one category.
    pub async fn list_projects(
        &self,
        active_only: bool,
        category_slug: Option<&str>,
    ) -> Result<Vec<Project>, AppError> {
        let mut sql = format!("SELECT {} FROM projects p", PROJECT_COLUMNS);
        let mut clauses = Vec::new();
        if category_slug.is_some() {
            sql.push_str(
                " JOIN project_categories pc ON pc.project_id = p.id JOIN categories c ON c.id = pc.category_id",
            );
            clauses.push("c.slug = ?");
        }
        if active_only {
            clauses.push("p.is_active = 1");
        }
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(" ORDER BY p.display_order ASC, p.created_at DESC");

        let mut query = sqlx::query(&sql);
        if let Some(slug) = category_slug {
            query = query.bind(slug);
        }
        let rows = query.fetch_all(&self.pool).await?;

        let mut projects: Vec<Project> = rows.iter().map(project_from_row).collect();
        self.attach_categories(&mut projects).await?;
        Ok(projects)
    }

    /// Get a project by ID, active or not.
    pub async fn get_project(&self, id: &str) -> Result<Option<Project>, AppError> {
        let sql = format!("SELECT {} FROM projects p WHERE p.id = ?", PROJECT_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        self.with_categories(row.as_ref().map(project_from_row))
            .await
    }

    /// Get an active project by slug.
    pub async fn get_active_project_by_slug(&self, slug: &str) -> Result<Option<Project>, AppError> {
        let sql = format!(
            "SELECT {} FROM projects p WHERE p.slug = ? AND p.is_active = 1",
            PROJECT_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?;
        self.with_categories(row.as_ref().map(project_from_row))
            .await
    }

    /// Create a project together with its category associations.
    pub async fn create_project(&self, request: &CreateProjectRequest) -> Result<Project, AppError> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = now_rfc3339();

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"INSERT INTO projects (
                id, slug, title_es, title_en, description_es, description_en,
                about_es, about_en, image, gallery, tags, urls,
                is_active, display_order, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(&id)
        .bind(&request.slug)
        .bind(&request.title_es)
        .bind(&request.title_en)
        .bind(&request.description_es)
        .bind(&request.description_en)
        .bind(patch_optional(&request.about_es, &None))
        .bind(patch_optional(&request.about_en, &None))
        .bind(patch_optional(&request.image, &None))
        .bind(to_json_column(&request.gallery))
        .bind(to_json_column(&request.tags))
        .bind(to_json_column(&request.urls))
        .bind(request.is_active as i32)
        .bind(request.display_order)
        .bind(&now)
        .bind(&now)
        .execute(&mut *tx)
        .await
        .map_err(|e| unique_conflict(e, SLUG_TAKEN))?;

        replace_categories(&mut tx, &id, &request.category_ids).await?;

        tx.commit().await?;

        self.get_project(&id)
            .await?
            .ok_or_else(|| AppError::Internal(format!("Project {} vanished after insert", id)))
    }

    /// Apply a partial update. `categoryIds`, when present, replaces every association.
    pub async fn update_project(
        &self,
        id: &str,
        request: &UpdateProjectRequest,
    ) -> Result<Project, AppError> {
        let existing = self
            .get_project(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Project {} not found", id)))?;

        let now = now_rfc3339();
        let slug = request.slug.as_ref().unwrap_or(&existing.slug);
        let title_es = request.title_es.as_ref().unwrap_or(&existing.title_es);
        let title_en = request.title_en.as_ref().unwrap_or(&existing.title_en);
        let description_es = request
            .description_es
            .as_ref()
            .unwrap_or(&existing.description_es);
        let description_en = request
            .description_en
            .as_ref()
            .unwrap_or(&existing.description_en);
        let about_es = patch_optional(&request.about_es, &existing.about_es);
        let about_en = patch_optional(&request.about_en, &existing.about_en);
        let image = patch_optional(&request.image, &existing.image);
        let gallery = request.gallery.as_ref().unwrap_or(&existing.gallery);
        let tags = request.tags.as_ref().unwrap_or(&existing.tags);
        let urls = request.urls.as_ref().unwrap_or(&existing.urls);
        let is_active = request.is_active.unwrap_or(existing.is_active);
        let display_order = request.display_order.unwrap_or(existing.display_order);

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"UPDATE projects SET
                slug = ?, title_es = ?, title_en = ?, description_es = ?, description_en = ?,
                about_es = ?, about_en = ?, image = ?, gallery = ?, tags = ?, urls = ?,
                is_active = ?, display_order = ?, updated_at = ?
            WHERE id = ?"#,
        )
        .bind(slug)
        .bind(title_es)
        .bind(title_en)
        .bind(description_es)
        .bind(description_en)
        .bind(&about_es)
        .bind(&about_en)
        .bind(&image)
        .bind(to_json_column(gallery))
        .bind(to_json_column(tags))
        .bind(to_json_column(urls))
        .bind(is_active as i32)
        .bind(display_order)
        .bind(&now)
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(|e| unique_conflict(e, SLUG_TAKEN))?;

        if let Some(category_ids) = &request.category_ids {
            replace_categories(&mut tx, id, category_ids).await?;
        }

        tx.commit().await?;

        self.get_project(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Project {} not found", id)))
    }

    /// Delete a project and return it, so callers can clean up its media.
    pub async fn delete_project(&self, id: &str) -> Result<Project, AppError> {
        let existing = self
            .get_project(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Project {} not found", id)))?;

        let result = sqlx::query("DELETE FROM projects WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Project {} not found", id)));
        }

        Ok(existing)
    }

    /// Set display positions for several projects at once. Nothing changes if any id is unknown.
    pub async fn reorder_projects(&self, items: &[ReorderItem]) -> Result<(), AppError> {
        let now = now_rfc3339();
        let mut tx = self.pool.begin().await?;

        for item in items {
            let result =
                sqlx::query("UPDATE projects SET display_order = ?, updated_at = ? WHERE id = ?")
                    .bind(item.display_order)
                    .bind(&now)
                    .bind(&item.id)
                    .execute(&mut *tx)
                    .await?;

            if result.rows_affected() == 0 {
                // Dropping the transaction rolls back earlier updates
                return Err(AppError::NotFound(format!("Project {} not found", item.id)));
            }
        }

        tx.commit().await?;
        Ok(())
    }

    async fn with_categories(&self, project: Option<Project>) -> Result<Option<Project>, AppError> {
        match project {
            Some(project) => {
                let mut list = vec![project];
                self.attach_categories(&mut list).await?;
                Ok(list.pop())
            }
            None => Ok(None),
        }
    }

    /// Fill `categories` on the given projects, one query per chunk of ids.
    async fn attach_categories(&self, projects: &mut [Project]) -> Result<(), AppError> {
        let mut by_project: HashMap<String, Vec<CategoryRef>> = HashMap::new();

        for chunk in projects.chunks(CATEGORY_LOOKUP_CHUNK) {
            let mut query = QueryBuilder::<Sqlite>::new(
                r#"SELECT pc.project_id, c.id, c.slug, c.name_es, c.name_en
                   FROM project_categories pc
                   JOIN categories c ON c.id = pc.category_id
                   WHERE pc.project_id IN ("#,
            );
            let mut ids = query.separated(", ");
            for project in chunk {
                ids.push_bind(project.id.clone());
            }
            ids.push_unseparated(") ORDER BY c.name_es");

            let rows = query.build().fetch_all(&self.pool).await?;
            for row in rows {
                by_project
                    .entry(row.get("project_id"))
                    .or_default()
                    .push(CategoryRef {
                        id: row.get("id"),
                        slug: row.get("slug"),
                        name_es: row.get("name_es"),
                        name_en: row.get("name_en"),
                    });
            }
        }

        for project in projects.iter_mut() {
            project.categories = by_project.remove(&project.id).unwrap_or_default();
        }
        Ok(())
    }
}

/// Delete-then-insert the category set of a project inside `tx`.
async fn replace_categories(
    tx: &mut Transaction<'_, Sqlite>,
    project_id: &str,
    category_ids: &[String],
) -> Result<(), AppError> {
    sqlx::query("DELETE FROM project_categories WHERE project_id = ?")
        .bind(project_id)
        .execute(&mut **tx)
        .await?;

    for category_id in category_ids {
        let exists = sqlx::query("SELECT 1 FROM categories WHERE id = ?")
            .bind(category_id)
            .fetch_optional(&mut **tx)
            .await?
            .is_some();
        if !exists {
            return Err(AppError::field_validation(
                format!("Unknown category: {}", category_id),
                "categoryIds",
                format!("Category {} does not exist", category_id),
            ));
        }

        sqlx::query(
            "INSERT OR IGNORE INTO project_categories (project_id, category_id) VALUES (?, ?)",
        )
        .bind(project_id)
        .bind(category_id)
        .execute(&mut **tx)
        .await?;
    }

    Ok(())
}

fn project_from_row(row: &sqlx::sqlite::SqliteRow) -> Project {
    Project {
        id: row.get("id"),
        slug: row.get("slug"),
        title_es: row.get("title_es"),
        title_en: row.get("title_en"),
        description_es: row.get("description_es"),
        description_en: row.get("description_en"),
        about_es: row.get("about_es"),
        about_en: row.get("about_en"),
        image: row.get("image"),
        gallery: parse_json_column(row.get("gallery")),
        tags: parse_json_column(row.get("tags")),
        urls: parse_json_column(row.get("urls")),
        is_active: row.get::<i32, _>("is_active") != 0,
        display_order: row.get("display_order"),
        categories: Vec::new(),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

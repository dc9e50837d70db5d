//! Project category model.

use serde::{Deserialize, Serialize};
use validator::Validate;

use super::SLUG_RE;

/// A category grouping portfolio projects.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: String,
    pub slug: String,
    pub name_es: String,
    pub name_en: String,
    /// Number of projects referencing this category
    #[serde(default)]
    pub project_count: i64,
    pub created_at: String,
    pub updated_at: String,
}

/// Request body for creating a new category.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateCategoryRequest {
    #[validate(
        length(min = 1, max = 80),
        regex(path = *SLUG_RE, message = "Slug must contain only lowercase letters, numbers, and hyphens")
    )]
    pub slug: String,
    #[validate(length(min = 1, max = 100))]
    pub name_es: String,
    #[validate(length(min = 1, max = 100))]
    pub name_en: String,
}

/// Request body for updating an existing category.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCategoryRequest {
    #[serde(default)]
    #[validate(
        length(min = 1, max = 80),
        regex(path = *SLUG_RE, message = "Slug must contain only lowercase letters, numbers, and hyphens")
    )]
    pub slug: Option<String>,
    #[serde(default)]
    #[validate(length(min = 1, max = 100))]
    pub name_es: Option<String>,
    #[serde(default)]
    #[validate(length(min = 1, max = 100))]
    pub name_en: Option<String>,
}

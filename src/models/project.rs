//! Portfolio project model.

use serde::{Deserialize, Serialize};
use validator::Validate;

use super::{Locale, SLUG_RE};

/// External link attached to a project (live site, repository, press).
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProjectLink {
    #[validate(length(min = 1, max = 100))]
    pub label: String,
    #[validate(url)]
    pub url: String,
}

/// Category summary embedded in a project.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CategoryRef {
    pub id: String,
    pub slug: String,
    pub name_es: String,
    pub name_en: String,
}

/// A portfolio project with bilingual copy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub slug: String,
    pub title_es: String,
    pub title_en: String,
    pub description_es: String,
    pub description_en: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub about_es: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub about_en: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default)]
    pub gallery: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub urls: Vec<ProjectLink>,
    pub is_active: bool,
    pub display_order: i64,
    #[serde(default)]
    pub categories: Vec<CategoryRef>,
    pub created_at: String,
    pub updated_at: String,
}

impl Project {
    /// Attach single-language copy for the requested locale.
    pub fn localized(self, locale: Locale) -> LocalizedProject {
        let title = locale.pick(&self.title_es, &self.title_en).to_string();
        let description = locale
            .pick(&self.description_es, &self.description_en)
            .to_string();
        let about = match locale {
            Locale::Es => self.about_es.clone(),
            Locale::En => self.about_en.clone(),
        };
        LocalizedProject {
            project: self,
            locale,
            title,
            description,
            about,
        }
    }

    /// Keys of every stored object referenced by this project.
    pub fn media(&self) -> Vec<String> {
        self.image
            .iter()
            .chain(self.gallery.iter())
            .cloned()
            .collect()
    }
}

/// Project with the copy for one locale lifted to the top level.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalizedProject {
    #[serde(flatten)]
    pub project: Project,
    pub locale: Locale,
    pub title: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub about: Option<String>,
}

fn default_active() -> bool {
    true
}

/// Request body for creating a new project.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateProjectRequest {
    #[validate(
        length(min = 1, max = 120),
        regex(path = *SLUG_RE, message = "Slug must contain only lowercase letters, numbers, and hyphens")
    )]
    pub slug: String,
    #[validate(length(min = 1, max = 200))]
    pub title_es: String,
    #[validate(length(min = 1, max = 200))]
    pub title_en: String,
    #[validate(length(min = 1, max = 5000))]
    pub description_es: String,
    #[validate(length(min = 1, max = 5000))]
    pub description_en: String,
    #[serde(default)]
    #[validate(length(max = 20000))]
    pub about_es: Option<String>,
    #[serde(default)]
    #[validate(length(max = 20000))]
    pub about_en: Option<String>,
    #[serde(default)]
    #[validate(length(max = 2048))]
    pub image: Option<String>,
    #[serde(default)]
    #[validate(length(max = 30))]
    pub gallery: Vec<String>,
    #[serde(default)]
    #[validate(length(max = 20))]
    pub tags: Vec<String>,
    #[serde(default)]
    #[validate(length(max = 10), nested)]
    pub urls: Vec<ProjectLink>,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    #[validate(range(min = 0, max = 100000))]
    pub display_order: i64,
    #[serde(default)]
    pub category_ids: Vec<String>,
}

/// Request body for updating an existing project. Absent fields are kept;
/// an empty string clears `image`, `aboutEs` and `aboutEn`.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProjectRequest {
    #[serde(default)]
    #[validate(
        length(min = 1, max = 120),
        regex(path = *SLUG_RE, message = "Slug must contain only lowercase letters, numbers, and hyphens")
    )]
    pub slug: Option<String>,
    #[serde(default)]
    #[validate(length(min = 1, max = 200))]
    pub title_es: Option<String>,
    #[serde(default)]
    #[validate(length(min = 1, max = 200))]
    pub title_en: Option<String>,
    #[serde(default)]
    #[validate(length(min = 1, max = 5000))]
    pub description_es: Option<String>,
    #[serde(default)]
    #[validate(length(min = 1, max = 5000))]
    pub description_en: Option<String>,
    #[serde(default)]
    #[validate(length(max = 20000))]
    pub about_es: Option<String>,
    #[serde(default)]
    #[validate(length(max = 20000))]
    pub about_en: Option<String>,
    #[serde(default)]
    #[validate(length(max = 2048))]
    pub image: Option<String>,
    #[serde(default)]
    #[validate(length(max = 30))]
    pub gallery: Option<Vec<String>>,
    #[serde(default)]
    #[validate(length(max = 20))]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    #[validate(length(max = 10), nested)]
    pub urls: Option<Vec<ProjectLink>>,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default)]
    #[validate(range(min = 0, max = 100000))]
    pub display_order: Option<i64>,
    /// Replaces every category association when present
    #[serde(default)]
    pub category_ids: Option<Vec<String>>,
}

/// Query parameters for the public project list.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProjectListQuery {
    /// Category slug filter
    pub category: Option<String>,
    pub locale: Option<Locale>,
}

/// Query parameters for the public project detail.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LocaleQuery {
    pub locale: Option<Locale>,
}

/// Single position change in a reorder request.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ReorderItem {
    #[validate(length(min = 1))]
    pub id: String,
    #[validate(range(min = 0, max = 100000))]
    pub display_order: i64,
}

/// Request body for reordering projects in one go.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ReorderProjectsRequest {
    #[validate(length(min = 1, max = 500), nested)]
    pub items: Vec<ReorderItem>,
}

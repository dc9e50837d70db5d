//! Category API endpoints.

use axum::extract::{Path, State};

use super::{created, success, ApiResponse, ApiResult, ValidatedJson};
use crate::auth::AdminCaller;
use crate::models::{Category, CreateCategoryRequest, UpdateCategoryRequest};
use crate::AppState;

/// GET /api/categories - All categories with project counts.
pub async fn list_categories(State(state): State<AppState>) -> ApiResult<Vec<Category>> {
    success(state.repo.list_categories().await?)
}

/// POST /api/admin/categories
pub async fn create_category(
    State(state): State<AppState>,
    admin: AdminCaller,
    ValidatedJson(request): ValidatedJson<CreateCategoryRequest>,
) -> ApiResult<Category> {
    let category = state.repo.create_category(&request).await?;
    tracing::info!("Admin {} created category {}", admin.id(), category.slug);
    created(category)
}

/// PATCH /api/admin/categories/{id}
pub async fn update_category(
    State(state): State<AppState>,
    admin: AdminCaller,
    Path(id): Path<String>,
    ValidatedJson(request): ValidatedJson<UpdateCategoryRequest>,
) -> ApiResult<Category> {
    let category = state.repo.update_category(&id, &request).await?;
    tracing::info!("Admin {} updated category {}", admin.id(), category.slug);

    // Category names are part of every linked project's search document
    if request.name_es.is_some() || request.name_en.is_some() {
        match state.repo.list_projects(false, None).await {
            Ok(projects) => {
                if let Err(e) = state.search.rebuild(&projects).await {
                    tracing::error!("Failed to rebuild search index: {}", e);
                }
            }
            Err(e) => tracing::error!("Failed to load projects for reindex: {}", e),
        }
    }

    success(category)
}

/// DELETE /api/admin/categories/{id} - Refused while projects use it.
pub async fn delete_category(
    State(state): State<AppState>,
    admin: AdminCaller,
    Path(id): Path<String>,
) -> ApiResult<()> {
    state.repo.delete_category(&id).await?;
    tracing::info!("Admin {} deleted category {}", admin.id(), id);
    Ok(ApiResponse::new(()).with_message("Category deleted"))
}

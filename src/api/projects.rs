//! Project API endpoints, public and admin.

use axum::extract::{Path, State};
use serde::Serialize;

use super::{created, error, success, ApiResponse, ApiResult, ValidatedJson, ValidatedQuery};
use crate::auth::AdminCaller;
use crate::errors::AppError;
use crate::models::{
    CreateProjectRequest, LocaleQuery, LocalizedProject, Project, ProjectListQuery,
    ReorderProjectsRequest, UpdateProjectRequest,
};
use crate::AppState;

/// Project list, with localized copy when a locale was requested.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum ProjectList {
    Plain(Vec<Project>),
    Localized(Vec<LocalizedProject>),
}

/// Single project, with localized copy when a locale was requested.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum ProjectView {
    Plain(Box<Project>),
    Localized(Box<LocalizedProject>),
}

/// GET /api/projects - Active projects in display order.
pub async fn list_projects(
    State(state): State<AppState>,
    ValidatedQuery(params): ValidatedQuery<ProjectListQuery>,
) -> ApiResult<ProjectList> {
    let projects = state
        .repo
        .list_projects(true, params.category.as_deref())
        .await?;

    match params.locale {
        Some(locale) => success(ProjectList::Localized(
            projects.into_iter().map(|p| p.localized(locale)).collect(),
        )),
        None => success(ProjectList::Plain(projects)),
    }
}

/// GET /api/projects/{slug} - A single active project.
pub async fn get_project_by_slug(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    ValidatedQuery(params): ValidatedQuery<LocaleQuery>,
) -> ApiResult<ProjectView> {
    match state.repo.get_active_project_by_slug(&slug).await {
        Ok(Some(project)) => match params.locale {
            Some(locale) => success(ProjectView::Localized(Box::new(project.localized(locale)))),
            None => success(ProjectView::Plain(Box::new(project))),
        },
        Ok(None) => error(AppError::NotFound(format!("Project {} not found", slug))),
        Err(e) => error(e),
    }
}

/// GET /api/admin/projects - All projects including inactive ones.
pub async fn admin_list_projects(
    State(state): State<AppState>,
    _admin: AdminCaller,
) -> ApiResult<Vec<Project>> {
    success(state.repo.list_projects(false, None).await?)
}

/// GET /api/admin/projects/{id}
pub async fn admin_get_project(
    State(state): State<AppState>,
    _admin: AdminCaller,
    Path(id): Path<String>,
) -> ApiResult<Project> {
    match state.repo.get_project(&id).await {
        Ok(Some(project)) => success(project),
        Ok(None) => error(AppError::NotFound(format!("Project {} not found", id))),
        Err(e) => error(e),
    }
}

/// POST /api/admin/projects
pub async fn create_project(
    State(state): State<AppState>,
    admin: AdminCaller,
    ValidatedJson(request): ValidatedJson<CreateProjectRequest>,
) -> ApiResult<Project> {
    let project = state.repo.create_project(&request).await?;
    tracing::info!("Admin {} created project {}", admin.id(), project.slug);

    reindex(&state, &project).await;
    created(project)
}

/// PATCH /api/admin/projects/{id}
pub async fn update_project(
    State(state): State<AppState>,
    admin: AdminCaller,
    Path(id): Path<String>,
    ValidatedJson(request): ValidatedJson<UpdateProjectRequest>,
) -> ApiResult<Project> {
    let project = state.repo.update_project(&id, &request).await?;
    tracing::info!("Admin {} updated project {}", admin.id(), project.slug);

    reindex(&state, &project).await;
    success(project)
}

/// DELETE /api/admin/projects/{id} - Also removes the project's stored images.
pub async fn delete_project(
    State(state): State<AppState>,
    admin: AdminCaller,
    Path(id): Path<String>,
) -> ApiResult<()> {
    let project = state.repo.delete_project(&id).await?;
    tracing::info!("Admin {} deleted project {}", admin.id(), project.slug);

    if let Err(e) = state.search.remove_project(&id).await {
        tracing::error!("Failed to remove project {} from index: {}", id, e);
    }
    state.storage.delete_all_best_effort(&project.media()).await;

    Ok(ApiResponse::new(()).with_message("Project deleted"))
}

/// PUT /api/admin/projects/reorder - Apply new display positions atomically.
pub async fn reorder_projects(
    State(state): State<AppState>,
    admin: AdminCaller,
    ValidatedJson(request): ValidatedJson<ReorderProjectsRequest>,
) -> ApiResult<Vec<Project>> {
    state.repo.reorder_projects(&request.items).await?;
    tracing::info!(
        "Admin {} reordered {} projects",
        admin.id(),
        request.items.len()
    );

    let projects = state.repo.list_projects(false, None).await?;
    Ok(ApiResponse::new(projects).with_message("Projects reordered"))
}

/// Index failures do not fail the write; the next rebuild repairs them.
async fn reindex(state: &AppState, project: &Project) {
    if let Err(e) = state.search.index_project(project).await {
        tracing::error!("Failed to index project {}: {}", project.id, e);
    }
}

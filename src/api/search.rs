//! Search API endpoints.

use axum::extract::State;
use serde::{Deserialize, Serialize};

use super::{error, success, ApiResult, ValidatedQuery};
use crate::models::Project;
use crate::AppState;

/// Search query parameters.
#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    /// Search query string.
    #[serde(default)]
    pub q: String,
    /// Maximum number of results (default: 20).
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    20
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub results: Vec<SearchResultItem>,
    pub total: usize,
    pub limit: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResultItem {
    pub project: Project,
    pub score: f32,
}

/// Maximum number of search results allowed.
const MAX_SEARCH_LIMIT: usize = 50;

/// GET /api/projects/search - Full-text search over active projects.
pub async fn search_projects(
    State(state): State<AppState>,
    ValidatedQuery(params): ValidatedQuery<SearchQuery>,
) -> ApiResult<SearchResponse> {
    let limit = params.limit.min(MAX_SEARCH_LIMIT);

    let hits = match state.search.search(&params.q, limit) {
        Ok(hits) => hits,
        Err(e) => return error(e),
    };

    // The index can briefly lag behind the database
    let mut results = Vec::new();
    for hit in hits {
        if let Ok(Some(project)) = state.repo.get_project(&hit.project_id).await {
            if project.is_active {
                results.push(SearchResultItem {
                    project,
                    score: hit.score,
                });
            }
        }
    }

    let total = results.len();
    success(SearchResponse {
        results,
        total,
        limit,
    })
}

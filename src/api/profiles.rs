//! Profile API endpoints.

use axum::extract::{Path, State};

use super::{error, success, ApiResult, ValidatedJson};
use crate::auth::AdminCaller;
use crate::errors::AppError;
use crate::models::{ProfileData, PublicProfile, UserProfile};
use crate::AppState;

/// GET /api/admin/profile - The caller's full profile.
pub async fn get_my_profile(
    State(state): State<AppState>,
    admin: AdminCaller,
) -> ApiResult<UserProfile> {
    success(state.repo.get_or_create_profile(admin.id()).await?)
}

/// PUT /api/admin/profile - Replace the caller's profile.
pub async fn put_my_profile(
    State(state): State<AppState>,
    admin: AdminCaller,
    ValidatedJson(data): ValidatedJson<ProfileData>,
) -> ApiResult<UserProfile> {
    let profile = state.repo.upsert_profile(admin.id(), &data).await?;
    tracing::info!("Admin {} updated their profile", admin.id());
    success(profile)
}

/// GET /api/profiles/{adminId} - Public fields only.
pub async fn get_public_profile(
    State(state): State<AppState>,
    Path(admin_id): Path<String>,
) -> ApiResult<PublicProfile> {
    let profile = match state.repo.get_profile(&admin_id).await {
        Ok(Some(profile)) => profile,
        Ok(None) => return error(AppError::NotFound("Profile not found".to_string())),
        Err(e) => return error(e),
    };

    let full_name = state
        .repo
        .get_admin(&admin_id)
        .await?
        .and_then(|a| a.full_name);

    success(PublicProfile {
        admin_id: profile.admin_id,
        full_name,
        data: profile.data.public_view(),
    })
}

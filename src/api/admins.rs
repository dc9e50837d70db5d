//! Admin user API endpoints.

use axum::extract::{Path, State};

use super::{created, success, ApiResponse, ApiResult, ValidatedJson};
use crate::auth::AdminCaller;
use crate::errors::AppError;
use crate::models::{AdminUser, CreateAdminRequest};
use crate::AppState;

/// GET /api/admin/me - The caller's admin row.
pub async fn get_me(admin: AdminCaller) -> ApiResult<AdminUser> {
    success(admin.admin)
}

/// POST /api/admin/me/login - Record a successful admin sign-in.
pub async fn record_login(
    State(state): State<AppState>,
    admin: AdminCaller,
) -> ApiResult<AdminUser> {
    let updated = state.repo.record_admin_login(admin.id()).await?;
    tracing::info!("Admin {} signed in", updated.email);
    success(updated)
}

/// GET /api/admin/users (super admin)
pub async fn list_admins(
    State(state): State<AppState>,
    admin: AdminCaller,
) -> ApiResult<Vec<AdminUser>> {
    admin.require_super_admin()?;
    success(state.repo.list_admins().await?)
}

/// POST /api/admin/users (super admin)
pub async fn create_admin(
    State(state): State<AppState>,
    admin: AdminCaller,
    ValidatedJson(request): ValidatedJson<CreateAdminRequest>,
) -> ApiResult<AdminUser> {
    admin.require_super_admin()?;
    let created_admin = state.repo.create_admin(&request).await?;
    tracing::info!(
        "Admin {} granted {} access to {}",
        admin.id(),
        created_admin.role.as_str(),
        created_admin.email
    );
    created(created_admin)
}

/// DELETE /api/admin/users/{id} (super admin, not self)
pub async fn delete_admin(
    State(state): State<AppState>,
    admin: AdminCaller,
    Path(id): Path<String>,
) -> ApiResult<()> {
    admin.require_super_admin()?;
    if id == admin.id() {
        return Err(AppError::BadRequest(
            "You cannot remove your own admin access".to_string(),
        ));
    }
    state.repo.delete_admin(&id).await?;
    tracing::info!("Admin {} revoked admin access of {}", admin.id(), id);
    Ok(ApiResponse::new(()).with_message("Admin removed"))
}

//! Contact form endpoints.

use axum::{
    extract::{Path, State},
    http::StatusCode,
};

use super::{
    error, success, ApiResponse, ApiResult, ClientIp, Notified, ValidatedJson, ValidatedQuery,
};
use crate::auth::AdminCaller;
use crate::errors::AppError;
use crate::models::{
    ContactListQuery, ContactStats, ContactSubmission, CreateContactRequest,
    UpdateContactStatusRequest,
};
use crate::AppState;

/// POST /api/contact - Store a message and notify both sides.
pub async fn submit_contact(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    ValidatedJson(request): ValidatedJson<CreateContactRequest>,
) -> ApiResult<ContactSubmission> {
    state.limits.contact.enforce(&ip)?;

    let submission = state.repo.create_contact(&request).await?;
    tracing::info!("Contact submission {} received", submission.id);

    let delivery = state.notifier.contact_received(&submission).await;
    let message = submission.locale.pick(
        "Mensaje enviado. Te responderemos pronto.",
        "Message sent. We will get back to you soon.",
    );
    Notified::new(submission, delivery).respond(StatusCode::CREATED, message)
}

/// GET /api/admin/contact-submissions - Newest first.
pub async fn list_contacts(
    State(state): State<AppState>,
    _admin: AdminCaller,
    ValidatedQuery(params): ValidatedQuery<ContactListQuery>,
) -> ApiResult<Vec<ContactSubmission>> {
    success(state.repo.list_contacts(params.status).await?)
}

/// GET /api/admin/contact-submissions/stats
pub async fn contact_stats(
    State(state): State<AppState>,
    _admin: AdminCaller,
) -> ApiResult<ContactStats> {
    success(state.repo.contact_stats().await?)
}

/// GET /api/admin/contact-submissions/{id}
pub async fn get_contact(
    State(state): State<AppState>,
    _admin: AdminCaller,
    Path(id): Path<String>,
) -> ApiResult<ContactSubmission> {
    match state.repo.get_contact(&id).await {
        Ok(Some(submission)) => success(submission),
        Ok(None) => error(AppError::NotFound(format!(
            "Contact submission {} not found",
            id
        ))),
        Err(e) => error(e),
    }
}

/// PATCH /api/admin/contact-submissions/{id}
pub async fn update_contact_status(
    State(state): State<AppState>,
    admin: AdminCaller,
    Path(id): Path<String>,
    ValidatedJson(request): ValidatedJson<UpdateContactStatusRequest>,
) -> ApiResult<ContactSubmission> {
    let submission = state.repo.update_contact_status(&id, request.status).await?;
    tracing::info!(
        "Admin {} marked contact submission {} as {}",
        admin.id(),
        id,
        submission.status.as_str()
    );
    success(submission)
}

/// DELETE /api/admin/contact-submissions/{id}
pub async fn delete_contact(
    State(state): State<AppState>,
    admin: AdminCaller,
    Path(id): Path<String>,
) -> ApiResult<()> {
    state.repo.delete_contact(&id).await?;
    tracing::info!("Admin {} deleted contact submission {}", admin.id(), id);
    Ok(ApiResponse::new(()).with_message("Contact submission deleted"))
}

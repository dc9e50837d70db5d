//! Newsletter endpoints: public token lifecycle and admin management.

use axum::{
    extract::{Path, State},
    http::StatusCode,
};

use super::{
    error, success, ApiResponse, ApiResult, ClientIp, Notified, ValidatedJson, ValidatedQuery,
};
use crate::auth::AdminCaller;
use crate::db::SubscribeOutcome;
use crate::errors::AppError;
use crate::models::{
    NewsletterStats, SubscribeRequest, Subscriber, SubscriberListQuery,
    UpdateSubscriberStatusRequest,
};
use crate::AppState;

/// POST /api/newsletter/subscribe
///
/// New emails answer 201; re-sends and re-subscriptions answer 200.
pub async fn subscribe(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    ValidatedJson(request): ValidatedJson<SubscribeRequest>,
) -> ApiResult<Subscriber> {
    state.limits.newsletter.enforce(&ip)?;

    let outcome = state.repo.subscribe(&request.email, request.locale).await?;
    let status = match &outcome {
        SubscribeOutcome::Created(s) => {
            tracing::info!("New newsletter subscriber {}", s.id);
            StatusCode::CREATED
        }
        SubscribeOutcome::Resent(s) => {
            tracing::info!("Re-sent verification to subscriber {}", s.id);
            StatusCode::OK
        }
        SubscribeOutcome::Resubscribed(s) => {
            tracing::info!("Subscriber {} re-subscribed", s.id);
            StatusCode::OK
        }
    };

    let subscriber = outcome.into_subscriber();
    let delivery = state.notifier.newsletter_verification(&subscriber).await;
    let message = subscriber.locale.pick(
        "Revisa tu correo para confirmar la suscripción.",
        "Check your inbox to confirm your subscription.",
    );
    Notified::new(subscriber, delivery).respond(status, message)
}

/// GET /api/newsletter/verify/{token} - Consume the verification token.
pub async fn verify_subscription(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> ApiResult<Subscriber> {
    let subscriber = match state.repo.verify_subscriber(&token).await {
        Ok(Some(subscriber)) => subscriber,
        Ok(None) => {
            return error(AppError::NotFound(
                "Invalid or expired verification link".to_string(),
            ))
        }
        Err(e) => return error(e),
    };
    tracing::info!("Subscriber {} verified", subscriber.id);

    let delivery = state.notifier.newsletter_welcome(&subscriber).await;
    let message = subscriber
        .locale
        .pick("¡Suscripción confirmada!", "Subscription confirmed!");
    Notified::new(subscriber, delivery).respond(StatusCode::OK, message)
}

/// POST|GET /api/newsletter/unsubscribe/{token}
pub async fn unsubscribe(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> ApiResult<Subscriber> {
    let subscriber = state.repo.unsubscribe(&token).await?;
    tracing::info!("Subscriber {} unsubscribed", subscriber.id);

    let delivery = state.notifier.newsletter_goodbye(&subscriber).await;
    let message = subscriber.locale.pick(
        "Te has dado de baja del boletín.",
        "You have been unsubscribed.",
    );
    Notified::new(subscriber, delivery).respond(StatusCode::OK, message)
}

/// GET /api/admin/newsletter/subscribers
pub async fn list_subscribers(
    State(state): State<AppState>,
    _admin: AdminCaller,
    ValidatedQuery(params): ValidatedQuery<SubscriberListQuery>,
) -> ApiResult<Vec<Subscriber>> {
    success(state.repo.list_subscribers(params.status).await?)
}

/// PATCH /api/admin/newsletter/subscribers/{id} - `active` or `inactive` only.
pub async fn update_subscriber_status(
    State(state): State<AppState>,
    admin: AdminCaller,
    Path(id): Path<String>,
    ValidatedJson(request): ValidatedJson<UpdateSubscriberStatusRequest>,
) -> ApiResult<Subscriber> {
    let subscriber = state.repo.set_subscriber_status(&id, request.status).await?;
    tracing::info!(
        "Admin {} set subscriber {} to {}",
        admin.id(),
        id,
        subscriber.status.as_str()
    );
    success(subscriber)
}

/// DELETE /api/admin/newsletter/subscribers/{id}
pub async fn delete_subscriber(
    State(state): State<AppState>,
    admin: AdminCaller,
    Path(id): Path<String>,
) -> ApiResult<()> {
    state.repo.delete_subscriber(&id).await?;
    tracing::info!("Admin {} deleted subscriber {}", admin.id(), id);
    Ok(ApiResponse::new(()).with_message("Subscriber deleted"))
}

/// GET /api/admin/newsletter/stats
pub async fn newsletter_stats(
    State(state): State<AppState>,
    _admin: AdminCaller,
) -> ApiResult<NewsletterStats> {
    success(state.repo.newsletter_stats().await?)
}

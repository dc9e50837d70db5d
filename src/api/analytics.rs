//! Analytics tracking and summary endpoints.

use axum::{
    extract::State,
    http::{header, HeaderMap},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use time::Duration;

use super::{success, ApiResponse, ApiResult, ClientIp, ValidatedJson, ValidatedQuery};
use crate::auth::AdminCaller;
use crate::errors::AppError;
use crate::models::{AnalyticsSummary, SummaryQuery, TrackRequest, TrackResponse};
use crate::AppState;

/// Cookie carrying the anonymous session fingerprint.
pub const SESSION_COOKIE: &str = "estudio_sid";

const DEFAULT_SUMMARY_DAYS: i64 = 30;
const MAX_SUMMARY_DAYS: i64 = 365;

fn session_cookie(value: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, value))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(Duration::days(365))
        .build()
}

/// POST /api/track - Record a page view or close one.
pub async fn track(
    State(state): State<AppState>,
    jar: CookieJar,
    ClientIp(ip): ClientIp,
    headers: HeaderMap,
    ValidatedJson(request): ValidatedJson<TrackRequest>,
) -> Result<(CookieJar, ApiResponse<TrackResponse>), AppError> {
    state.limits.track.enforce(&ip)?;

    let existing = jar.get(SESSION_COOKIE).map(|c| c.value().to_string());
    let (jar, fingerprint) = match existing {
        Some(fingerprint) if !fingerprint.is_empty() => (jar, fingerprint),
        _ => {
            let fingerprint = uuid::Uuid::new_v4().to_string();
            (jar.add(session_cookie(fingerprint.clone())), fingerprint)
        }
    };

    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok());
    let session_id = state
        .repo
        .upsert_session(&fingerprint, Some(&ip), user_agent)
        .await?;

    let response = match request {
        TrackRequest::Pageview {
            path,
            referrer,
            locale,
        } => {
            let page_view_id = state
                .repo
                .record_page_view(&session_id, &path, referrer.as_deref(), locale)
                .await?;
            TrackResponse {
                page_view_id,
                session_id,
                duration_seconds: None,
            }
        }
        TrackRequest::Exit { page_view_id } => {
            let duration = state
                .repo
                .record_exit(&session_id, &page_view_id)
                .await?
                .ok_or_else(|| {
                    AppError::NotFound(format!("Open page view {} not found", page_view_id))
                })?;
            TrackResponse {
                page_view_id,
                session_id,
                duration_seconds: Some(duration),
            }
        }
    };

    Ok((jar, ApiResponse::new(response)))
}

/// GET /api/admin/analytics/summary?days=
pub async fn analytics_summary(
    State(state): State<AppState>,
    _admin: AdminCaller,
    ValidatedQuery(params): ValidatedQuery<SummaryQuery>,
) -> ApiResult<AnalyticsSummary> {
    let days = params.days.unwrap_or(DEFAULT_SUMMARY_DAYS);
    if !(1..=MAX_SUMMARY_DAYS).contains(&days) {
        return Err(AppError::field_validation(
            "Invalid summary window",
            "days",
            format!("Days must be between 1 and {}", MAX_SUMMARY_DAYS),
        ));
    }

    success(state.repo.analytics_summary(days).await?)
}

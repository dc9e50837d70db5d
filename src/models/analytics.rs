//! Analytics session and page view models.

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError, ValidationErrors};

use super::Locale;

/// Event posted by the site's tracking script.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum TrackRequest {
    Pageview {
        path: String,
        #[serde(default)]
        referrer: Option<String>,
        #[serde(default)]
        locale: Option<Locale>,
    },
    #[serde(rename_all = "camelCase")]
    Exit { page_view_id: String },
}

impl Validate for TrackRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        match self {
            TrackRequest::Pageview { path, referrer, .. } => {
                if path.is_empty() || path.len() > 2048 || !path.starts_with('/') {
                    let mut err = ValidationError::new("path");
                    err.message = Some("Path must start with '/' and be at most 2048 characters".into());
                    errors.add("path", err);
                }
                if referrer.as_ref().is_some_and(|r| r.len() > 2048) {
                    errors.add("referrer", ValidationError::new("length"));
                }
            }
            TrackRequest::Exit { page_view_id } => {
                if page_view_id.is_empty() {
                    errors.add("pageViewId", ValidationError::new("required"));
                }
            }
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Result of a tracked event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackResponse {
    pub page_view_id: String,
    pub session_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SummaryQuery {
    pub days: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PathCount {
    pub path: String,
    pub views: i64,
}

/// Aggregated traffic over the last `days` days.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsSummary {
    pub days: i64,
    pub sessions: i64,
    pub page_views: i64,
    pub unique_paths: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_duration_seconds: Option<f64>,
    pub top_paths: Vec<PathCount>,
}

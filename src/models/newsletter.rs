//! Newsletter subscriber model.

use serde::{Deserialize, Serialize};
use validator::Validate;

use super::Locale;

/// Lifecycle status of a subscriber.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SubscriberStatus {
    Pending,
    Active,
    Inactive,
    Unsubscribed,
}

impl SubscriberStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriberStatus::Pending => "pending",
            SubscriberStatus::Active => "active",
            SubscriberStatus::Inactive => "inactive",
            SubscriberStatus::Unsubscribed => "unsubscribed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(SubscriberStatus::Pending),
            "active" => Some(SubscriberStatus::Active),
            "inactive" => Some(SubscriberStatus::Inactive),
            "unsubscribed" => Some(SubscriberStatus::Unsubscribed),
            _ => None,
        }
    }
}

/// A newsletter subscriber. Tokens never leave the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscriber {
    pub id: String,
    pub email: String,
    pub locale: Locale,
    pub status: SubscriberStatus,
    #[serde(skip)]
    pub verification_token: Option<String>,
    #[serde(skip)]
    pub unsubscribe_token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verified_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unsubscribed_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SubscribeRequest {
    #[validate(email, length(max = 254))]
    pub email: String,
    #[serde(default)]
    pub locale: Locale,
}

/// Admin status override. Only `active` and `inactive` are accepted.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateSubscriberStatusRequest {
    pub status: SubscriberStatus,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubscriberListQuery {
    pub status: Option<SubscriberStatus>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NewsletterStats {
    pub total: i64,
    pub pending: i64,
    pub active: i64,
    pub inactive: i64,
    pub unsubscribed: i64,
}

//! Admin user profile with per-field visibility.
//!
//! Scalar fields are stored as `{value, isPublic}` pairs. List fields hold
//! items that each carry their own `isPublic` flag. The public projection
//! drops private scalars and private list items.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Scalar profile value with its own visibility flag.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProfileField {
    #[validate(length(max = 2000))]
    pub value: String,
    #[serde(default)]
    pub is_public: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUrl {
    #[validate(length(min = 1, max = 60))]
    pub label: String,
    #[validate(url)]
    pub url: String,
    #[serde(default)]
    pub is_public: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProfileRole {
    #[validate(length(min = 1, max = 120))]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 120))]
    pub organization: Option<String>,
    #[serde(default)]
    pub is_public: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProfilePhone {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 60))]
    pub label: Option<String>,
    #[validate(length(min = 3, max = 40))]
    pub number: String,
    #[serde(default)]
    pub is_public: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProfileEmail {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 60))]
    pub label: Option<String>,
    #[validate(email)]
    pub email: String,
    #[serde(default)]
    pub is_public: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProfileSkill {
    #[validate(length(min = 1, max = 80))]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 40))]
    pub level: Option<String>,
    #[serde(default)]
    pub is_public: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProfileLanguage {
    #[validate(length(min = 1, max = 60))]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 40))]
    pub proficiency: Option<String>,
    #[serde(default)]
    pub is_public: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProfileAddress {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 60))]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 200))]
    pub street: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub city: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 100))]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 20))]
    pub postal_code: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub country: String,
    #[serde(default)]
    pub is_public: bool,
}

/// Editable profile content. Also the body of `PUT /api/admin/profile`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProfileData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(nested)]
    pub bio: Option<ProfileField>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(nested)]
    pub headline: Option<ProfileField>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(nested)]
    pub company: Option<ProfileField>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(nested)]
    pub location: Option<ProfileField>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(nested)]
    pub website: Option<ProfileField>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(nested)]
    pub avatar_url: Option<ProfileField>,
    #[serde(default)]
    #[validate(length(max = 20), nested)]
    pub urls: Vec<ProfileUrl>,
    #[serde(default)]
    #[validate(length(max = 20), nested)]
    pub roles: Vec<ProfileRole>,
    #[serde(default)]
    #[validate(length(max = 10), nested)]
    pub phone_numbers: Vec<ProfilePhone>,
    #[serde(default)]
    #[validate(length(max = 10), nested)]
    pub emails: Vec<ProfileEmail>,
    #[serde(default)]
    #[validate(length(max = 50), nested)]
    pub skills: Vec<ProfileSkill>,
    #[serde(default)]
    #[validate(length(max = 20), nested)]
    pub languages: Vec<ProfileLanguage>,
    #[serde(default)]
    #[validate(length(max = 10), nested)]
    pub addresses: Vec<ProfileAddress>,
}

impl ProfileData {
    /// Copy of this profile with every private field and item removed.
    pub fn public_view(&self) -> ProfileData {
        fn scalar(field: &Option<ProfileField>) -> Option<ProfileField> {
            field.as_ref().filter(|f| f.is_public).cloned()
        }
        fn items<T: Clone>(list: &[T], is_public: impl Fn(&T) -> bool) -> Vec<T> {
            list.iter().filter(|item| is_public(item)).cloned().collect()
        }

        ProfileData {
            bio: scalar(&self.bio),
            headline: scalar(&self.headline),
            company: scalar(&self.company),
            location: scalar(&self.location),
            website: scalar(&self.website),
            avatar_url: scalar(&self.avatar_url),
            urls: items(&self.urls, |i| i.is_public),
            roles: items(&self.roles, |i| i.is_public),
            phone_numbers: items(&self.phone_numbers, |i| i.is_public),
            emails: items(&self.emails, |i| i.is_public),
            skills: items(&self.skills, |i| i.is_public),
            languages: items(&self.languages, |i| i.is_public),
            addresses: items(&self.addresses, |i| i.is_public),
        }
    }
}

/// Stored profile of one admin user.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub admin_id: String,
    #[serde(flatten)]
    pub data: ProfileData,
    pub created_at: String,
    pub updated_at: String,
}

/// Profile as shown to anonymous visitors.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicProfile {
    pub admin_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(flatten)]
    pub data: ProfileData,
}

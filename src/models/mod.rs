//! Data models for the site backend.
//!
//! Wire names are camelCase to match the site frontend.

mod admin;
mod analytics;
mod category;
mod contact;
mod newsletter;
mod profile;
mod project;

pub use admin::*;
pub use analytics::*;
pub use category::*;
pub use contact::*;
pub use newsletter::*;
pub use profile::*;
pub use project::*;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};

/// Valid slug pattern: lowercase letters, numbers, and single hyphens.
pub static SLUG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9]+(?:-[a-z0-9]+)*$").expect("slug pattern compiles"));

/// Site language. Anything that is not English falls back to Spanish.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    Es,
    En,
}

impl Locale {
    pub fn as_str(&self) -> &'static str {
        match self {
            Locale::Es => "es",
            Locale::En => "en",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "en" => Locale::En,
            _ => Locale::Es,
        }
    }

    /// Pick the value for this locale.
    pub fn pick<'a>(&self, es: &'a str, en: &'a str) -> &'a str {
        match self {
            Locale::Es => es,
            Locale::En => en,
        }
    }
}

impl<'de> Deserialize<'de> for Locale {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Locale::from_str(raw.trim()))
    }
}

/// Decode a JSON text column, falling back to the type's default on bad data.
pub(crate) fn parse_json_column<T>(raw: Option<String>) -> T
where
    T: serde::de::DeserializeOwned + Default,
{
    raw.and_then(|s| serde_json::from_str(&s).ok())
        .unwrap_or_default()
}

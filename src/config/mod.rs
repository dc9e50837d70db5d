//! Configuration module for the site backend.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Error raised when an environment variable holds a value that cannot be parsed.
#[derive(Debug)]
pub struct ConfigError {
    pub var: &'static str,
    pub value: String,
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Invalid value for {}: {:?}", self.var, self.value)
    }
}

impl std::error::Error for ConfigError {}

/// Limit for one rate-limited route family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LimitConfig {
    pub max_requests: u32,
    pub window: Duration,
}

/// Outbound email provider settings.
#[derive(Debug, Clone)]
pub struct EmailConfig {
    /// Provider endpoint accepting `{from, to, subject, html}`
    pub api_url: String,
    /// Provider API key; emails are skipped when unset
    pub api_key: Option<String>,
    /// Sender address
    pub from: String,
    /// Where contact form notifications are delivered
    pub contact_notify: Option<String>,
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to SQLite database file
    pub db_path: PathBuf,
    /// Path to Tantivy search index directory
    pub index_path: PathBuf,
    /// Directory backing the object store
    pub storage_dir: PathBuf,
    /// URL prefix under which stored objects are served
    pub storage_public_url: String,
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Emit JSON log lines instead of the human format
    pub log_json: bool,
    /// Public site URL, used to build links in emails
    pub site_url: String,
    /// HS256 secret of the identity provider; admin routes are closed without it
    pub jwt_secret: Option<String>,
    /// Expected `aud` claim, if any
    pub jwt_audience: Option<String>,
    pub email: EmailConfig,
    /// Allowed CORS origins (empty means any)
    pub allowed_origins: Vec<String>,
    pub contact_limit: LimitConfig,
    pub newsletter_limit: LimitConfig,
    pub track_limit: LimitConfig,
    /// Admin inserted at startup when the admin table is empty: (id, email)
    pub bootstrap_admin: Option<(String, String)>,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let db_path = env::var("ESTUDIO_DB_PATH")
            .unwrap_or_else(|_| "./data/estudio.sqlite".to_string())
            .into();

        let index_path = env::var("ESTUDIO_INDEX_PATH")
            .unwrap_or_else(|_| "./data/index".to_string())
            .into();

        let storage_dir = env::var("ESTUDIO_STORAGE_DIR")
            .unwrap_or_else(|_| "./data/storage".to_string())
            .into();

        let storage_public_url = env::var("ESTUDIO_STORAGE_PUBLIC_URL")
            .unwrap_or_else(|_| "/storage".to_string())
            .trim_end_matches('/')
            .to_string();

        let bind_raw =
            env::var("ESTUDIO_BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".to_string());
        let bind_addr = bind_raw.parse().map_err(|_| ConfigError {
            var: "ESTUDIO_BIND_ADDR",
            value: bind_raw.clone(),
        })?;

        let log_level = env::var("ESTUDIO_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        let log_json = env::var("ESTUDIO_LOG_FORMAT")
            .map(|v| v.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        let site_url = env::var("ESTUDIO_SITE_URL")
            .unwrap_or_else(|_| "http://localhost:3000".to_string())
            .trim_end_matches('/')
            .to_string();

        let jwt_secret = non_empty("ESTUDIO_JWT_SECRET");
        let jwt_audience = match env::var("ESTUDIO_JWT_AUDIENCE") {
            Ok(aud) if aud.trim().is_empty() => None,
            Ok(aud) => Some(aud),
            Err(_) => Some("authenticated".to_string()),
        };

        let email = EmailConfig {
            api_url: env::var("ESTUDIO_EMAIL_API_URL")
                .unwrap_or_else(|_| "https://api.resend.com/emails".to_string()),
            api_key: non_empty("ESTUDIO_EMAIL_API_KEY"),
            from: env::var("ESTUDIO_EMAIL_FROM")
                .unwrap_or_else(|_| "Estudio <hola@estudio.local>".to_string()),
            contact_notify: non_empty("ESTUDIO_CONTACT_NOTIFY_EMAIL"),
        };

        let allowed_origins = env::var("ESTUDIO_ALLOWED_ORIGINS")
            .map(|s| {
                s.split(',')
                    .map(|o| o.trim().to_string())
                    .filter(|o| !o.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let contact_limit = limit("ESTUDIO_CONTACT_LIMIT", "ESTUDIO_CONTACT_WINDOW_SECS", 5, 3600)?;
        let newsletter_limit = limit(
            "ESTUDIO_NEWSLETTER_LIMIT",
            "ESTUDIO_NEWSLETTER_WINDOW_SECS",
            5,
            900,
        )?;
        let track_limit = limit("ESTUDIO_TRACK_LIMIT", "ESTUDIO_TRACK_WINDOW_SECS", 120, 60)?;

        let bootstrap_admin = match (
            non_empty("ESTUDIO_BOOTSTRAP_ADMIN_ID"),
            non_empty("ESTUDIO_BOOTSTRAP_ADMIN_EMAIL"),
        ) {
            (Some(id), Some(email)) => Some((id, email)),
            _ => None,
        };

        Ok(Self {
            db_path,
            index_path,
            storage_dir,
            storage_public_url,
            bind_addr,
            log_level,
            log_json,
            site_url,
            jwt_secret,
            jwt_audience,
            email,
            allowed_origins,
            contact_limit,
            newsletter_limit,
            track_limit,
            bootstrap_admin,
        })
    }
}

fn non_empty(var: &str) -> Option<String> {
    env::var(var).ok().filter(|v| !v.trim().is_empty())
}

fn parse_or<T: std::str::FromStr>(var: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(var) {
        Ok(raw) => raw.trim().parse().map_err(|_| ConfigError { var, value: raw }),
        Err(_) => Ok(default),
    }
}

fn limit(
    max_var: &'static str,
    window_var: &'static str,
    max_default: u32,
    window_default: u64,
) -> Result<LimitConfig, ConfigError> {
    Ok(LimitConfig {
        max_requests: parse_or(max_var, max_default)?,
        window: Duration::from_secs(parse_or(window_var, window_default)?),
    })
}

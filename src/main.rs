//! Estudio Site Backend
//!
//! REST backend for the bilingual portfolio site: projects, categories,
//! profiles, contact form, newsletter and first-party analytics. SQLite
//! persistence with Tantivy full-text search over projects.

mod api;
mod auth;
mod config;
mod db;
mod errors;
mod mail;
mod models;
mod ratelimit;
mod search;
mod storage;

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{DefaultBodyLimit, State},
    http::{header, HeaderValue, Method, StatusCode},
    routing::{delete, get, patch, post, put},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use auth::JwtVerifier;
use config::Config;
use db::Repository;
use mail::{Mailer, Notifier};
use ratelimit::RateLimits;
use search::SearchIndex;
use storage::{ObjectStore, MAX_IMAGE_SIZE};

/// Room for multipart framing around a maximum-size image.
const UPLOAD_BODY_LIMIT: usize = MAX_IMAGE_SIZE + 1024 * 1024;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
    pub search: Arc<SearchIndex>,
    pub jwt: Arc<JwtVerifier>,
    pub notifier: Arc<Notifier>,
    pub storage: Arc<ObjectStore>,
    pub limits: Arc<RateLimits>,
    pub config: Arc<Config>,
}

impl AppState {
    /// Open every backing store, seed the bootstrap admin and build the
    /// search index.
    pub async fn initialize(
        config: Config,
        mailer: Arc<dyn Mailer>,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let pool = db::init_database(&config.db_path).await?;
        let repo = Arc::new(Repository::new(pool));

        if let Some((id, email)) = &config.bootstrap_admin {
            if repo.bootstrap_admin(id, email).await? {
                tracing::info!("Bootstrapped super admin {}", email);
            }
        }

        let search = Arc::new(SearchIndex::open(&config.index_path)?);
        tracing::info!("Building search index...");
        let projects = repo.list_projects(false, None).await?;
        search.rebuild(&projects).await?;
        tracing::info!("Search index built from {} projects", projects.len());

        let storage = Arc::new(ObjectStore::open(
            &config.storage_dir,
            &config.storage_public_url,
        )?);

        Ok(Self {
            repo,
            search,
            jwt: Arc::new(JwtVerifier::new(
                config.jwt_secret.as_deref(),
                config.jwt_audience.as_deref(),
            )),
            notifier: Arc::new(Notifier::new(mailer, &config)),
            storage,
            limits: Arc::new(RateLimits::from_config(&config)),
            config: Arc::new(config),
        })
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    if config.log_json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    tracing::info!("Starting Estudio Site Backend");
    tracing::info!("Database path: {:?}", config.db_path);
    tracing::info!("Index path: {:?}", config.index_path);
    tracing::info!("Storage directory: {:?}", config.storage_dir);
    tracing::info!("Bind address: {}", config.bind_addr);

    if config.jwt_secret.is_none() {
        tracing::warn!("No JWT secret configured (ESTUDIO_JWT_SECRET). Admin routes are closed!");
    }

    let mailer = mail::mailer_from_config(&config.email)?;
    let bind_addr = config.bind_addr;
    let state = AppState::initialize(config, mailer).await?;

    // Build router
    let app = create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    tracing::info!("Server listening on {}", bind_addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Server stopped");
    Ok(())
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let methods = [
        Method::GET,
        Method::POST,
        Method::PUT,
        Method::PATCH,
        Method::DELETE,
        Method::OPTIONS,
    ];
    let headers = [header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT];

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin {:?}", origin);
                None
            }
        })
        .collect();

    if origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(methods)
            .allow_headers(headers)
            .max_age(Duration::from_secs(3600))
    } else {
        // Explicit origins may send the analytics session cookie
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(methods)
            .allow_headers(headers)
            .allow_credentials(true)
            .max_age(Duration::from_secs(3600))
    }
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.allowed_origins);

    // Public routes
    let public_routes = Router::new()
        .route("/projects", get(api::list_projects))
        .route("/projects/search", get(api::search_projects))
        .route("/projects/{slug}", get(api::get_project_by_slug))
        .route("/categories", get(api::list_categories))
        .route("/profiles/{admin_id}", get(api::get_public_profile))
        .route("/contact", post(api::submit_contact))
        .route("/newsletter/subscribe", post(api::subscribe))
        .route("/newsletter/verify/{token}", get(api::verify_subscription))
        .route(
            "/newsletter/unsubscribe/{token}",
            post(api::unsubscribe).get(api::unsubscribe),
        )
        .route("/track", post(api::track));

    // Admin routes; every handler takes an `AdminCaller`
    let admin_routes = Router::new()
        // Projects
        .route(
            "/projects",
            get(api::admin_list_projects).post(api::create_project),
        )
        .route("/projects/reorder", put(api::reorder_projects))
        .route(
            "/projects/{id}",
            get(api::admin_get_project)
                .patch(api::update_project)
                .delete(api::delete_project),
        )
        // Categories
        .route("/categories", post(api::create_category))
        .route(
            "/categories/{id}",
            patch(api::update_category).delete(api::delete_category),
        )
        // Admin users
        .route("/me", get(api::get_me))
        .route("/me/login", post(api::record_login))
        .route("/users", get(api::list_admins).post(api::create_admin))
        .route("/users/{id}", delete(api::delete_admin))
        // Profile
        .route(
            "/profile",
            get(api::get_my_profile).put(api::put_my_profile),
        )
        // Contact
        .route("/contact-submissions", get(api::list_contacts))
        .route("/contact-submissions/stats", get(api::contact_stats))
        .route(
            "/contact-submissions/{id}",
            get(api::get_contact)
                .patch(api::update_contact_status)
                .delete(api::delete_contact),
        )
        // Newsletter
        .route("/newsletter/subscribers", get(api::list_subscribers))
        .route(
            "/newsletter/subscribers/{id}",
            patch(api::update_subscriber_status).delete(api::delete_subscriber),
        )
        .route("/newsletter/stats", get(api::newsletter_stats))
        // Analytics
        .route("/analytics/summary", get(api::analytics_summary))
        // Uploads
        .route(
            "/uploads",
            post(api::upload_image)
                .delete(api::delete_upload)
                .layer::<_, Infallible>(DefaultBodyLimit::disable())
                .layer::<_, Infallible>(RequestBodyLimitLayer::new(UPLOAD_BODY_LIMIT)),
        );

    // Health check
    let health_routes = Router::new().route("/health", get(health_check));

    let mut router = Router::new()
        .nest("/api", public_routes)
        .nest("/api/admin", admin_routes)
        .merge(health_routes);

    let public_url = state.config.storage_public_url.as_str();
    if public_url.starts_with('/') && public_url.len() > 1 {
        router = router.nest_service(public_url, ServeDir::new(state.storage.root()));
    } else {
        tracing::info!("Stored objects are served externally at {}", public_url);
    }

    router
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint. Fails while the database is unreachable.
async fn health_check(State(state): State<AppState>) -> (StatusCode, &'static str) {
    match state.repo.ping().await {
        Ok(()) => (StatusCode::OK, "OK"),
        Err(e) => {
            tracing::error!("Health check failed: {}", e);
            (StatusCode::SERVICE_UNAVAILABLE, "UNAVAILABLE")
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}

#[cfg(test)]
mod tests;

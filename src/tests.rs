//! Integration tests for the site backend.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use tempfile::TempDir;

use crate::config::{Config, EmailConfig, LimitConfig};
use crate::db::Repository;
use crate::mail::{Delivery, EmailMessage, MailError, Mailer};
use crate::{create_router, AppState};

const JWT_SECRET: &str = "test-jwt-secret";
const JWT_AUDIENCE: &str = "authenticated";
const SUPER_ADMIN: &str = "admin-1";

/// Smallest byte string that sniffs as PNG.
const PNG: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 13];

/// Mailer that keeps every message instead of sending it.
#[derive(Default)]
struct RecordingMailer {
    sent: Mutex<Vec<EmailMessage>>,
    fail: bool,
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, message: &EmailMessage) -> Result<Delivery, MailError> {
        if self.fail {
            return Err(MailError::Rejected {
                status: 503,
                body: "provider down".to_string(),
            });
        }
        self.sent.lock().unwrap().push(message.clone());
        Ok(Delivery::Sent)
    }
}

impl RecordingMailer {
    fn sent_to(&self, to: &str) -> Vec<EmailMessage> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.to == to)
            .cloned()
            .collect()
    }
}

/// Test fixture for integration tests.
struct TestFixture {
    client: Client,
    base_url: String,
    repo: Arc<Repository>,
    mailer: Arc<RecordingMailer>,
    _temp_dir: TempDir,
}

fn test_config(temp_dir: &TempDir) -> Config {
    Config {
        db_path: temp_dir.path().join("test.sqlite"),
        index_path: temp_dir.path().join("index"),
        storage_dir: temp_dir.path().join("storage"),
        storage_public_url: "/storage".to_string(),
        bind_addr: "127.0.0.1:0".parse().unwrap(),
        log_level: "warn".to_string(),
        log_json: false,
        site_url: "https://estudio.test".to_string(),
        jwt_secret: Some(JWT_SECRET.to_string()),
        jwt_audience: Some(JWT_AUDIENCE.to_string()),
        email: EmailConfig {
            api_url: "http://127.0.0.1:1/emails".to_string(),
            api_key: None,
            from: "Estudio <hola@estudio.test>".to_string(),
            contact_notify: Some("owner@estudio.test".to_string()),
        },
        allowed_origins: Vec::new(),
        contact_limit: LimitConfig {
            max_requests: 3,
            window: Duration::from_secs(3600),
        },
        newsletter_limit: LimitConfig {
            max_requests: 20,
            window: Duration::from_secs(3600),
        },
        track_limit: LimitConfig {
            max_requests: 100,
            window: Duration::from_secs(60),
        },
        bootstrap_admin: Some((SUPER_ADMIN.to_string(), "admin@estudio.test".to_string())),
    }
}

impl TestFixture {
    async fn new() -> Self {
        Self::with_mailer(RecordingMailer::default()).await
    }

    async fn with_mailer(mailer: RecordingMailer) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config = test_config(&temp_dir);
        let mailer = Arc::new(mailer);

        let state = AppState::initialize(config, mailer.clone())
            .await
            .expect("Failed to initialize state");
        let repo = state.repo.clone();

        let app = create_router(state);

        // Bind to random port
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind");
        let addr = listener.local_addr().expect("Failed to get addr");
        let base_url = format!("http://{}", addr);

        // Spawn server
        tokio::spawn(async move {
            axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await
            .unwrap();
        });

        // Wait for server to start
        tokio::time::sleep(Duration::from_millis(100)).await;

        TestFixture {
            client: Client::builder().cookie_store(true).build().unwrap(),
            base_url,
            repo,
            mailer,
            _temp_dir: temp_dir,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn token(&self, sub: &str) -> String {
        let exp = chrono::Utc::now().timestamp() + 3600;
        let claims = json!({ "sub": sub, "aud": JWT_AUDIENCE, "exp": exp });
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
        )
        .unwrap()
    }

    fn admin(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, self.url(path))
            .bearer_auth(self.token(SUPER_ADMIN))
    }

    async fn create_category(&self, slug: &str, name_es: &str) -> Value {
        let resp = self
            .admin(reqwest::Method::POST, "/api/admin/categories")
            .json(&json!({ "slug": slug, "nameEs": name_es, "nameEn": name_es }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body: Value = resp.json().await.unwrap();
        body["data"].clone()
    }

    async fn create_project(&self, body: Value) -> reqwest::Response {
        self.admin(reqwest::Method::POST, "/api/admin/projects")
            .json(&body)
            .send()
            .await
            .unwrap()
    }

    async fn verification_token(&self, email: &str) -> Option<String> {
        self.repo
            .get_subscriber_by_email(email)
            .await
            .unwrap()
            .and_then(|s| s.verification_token)
    }

    async fn unsubscribe_token(&self, email: &str) -> String {
        self.repo
            .get_subscriber_by_email(email)
            .await
            .unwrap()
            .expect("subscriber exists")
            .unsubscribe_token
    }
}

fn project_body(slug: &str, title: &str) -> Value {
    json!({
        "slug": slug,
        "titleEs": format!("{} (es)", title),
        "titleEn": title,
        "descriptionEs": "Descripción del proyecto",
        "descriptionEn": "Project description",
        "tags": ["rust", "web"],
    })
}

#[tokio::test]
async fn test_health_check() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .get(fixture.url("/health"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), "OK");
}

#[tokio::test]
async fn test_admin_routes_require_admin_row() {
    let fixture = TestFixture::new().await;

    // No token
    let resp = fixture
        .client
        .get(fixture.url("/api/admin/projects"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");

    // Garbage token
    let resp = fixture
        .client
        .get(fixture.url("/api/admin/projects"))
        .bearer_auth("not-a-jwt")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);

    // Valid identity, not an admin
    let resp = fixture
        .client
        .get(fixture.url("/api/admin/projects"))
        .bearer_auth(fixture.token("visitor-7"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "FORBIDDEN");

    // Bootstrapped admin
    let resp = fixture
        .admin(reqwest::Method::GET, "/api/admin/me")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["id"], SUPER_ADMIN);
    assert_eq!(body["data"]["role"], "super_admin");
}

#[tokio::test]
async fn test_admin_user_management() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .admin(reqwest::Method::POST, "/api/admin/users")
        .json(&json!({ "id": "editor-1", "email": "editor@estudio.test", "fullName": "Editor" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["role"], "admin");

    // Duplicate grant
    let resp = fixture
        .admin(reqwest::Method::POST, "/api/admin/users")
        .json(&json!({ "id": "editor-1", "email": "editor@estudio.test" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 409);

    // Plain admins cannot manage users
    let resp = fixture
        .client
        .get(fixture.url("/api/admin/users"))
        .bearer_auth(fixture.token("editor-1"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);

    // Login is recorded
    let resp = fixture
        .client
        .post(fixture.url("/api/admin/me/login"))
        .bearer_auth(fixture.token("editor-1"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert!(body["data"]["lastLoginAt"].is_string());

    // Super admin cannot remove themselves
    let resp = fixture
        .admin(reqwest::Method::DELETE, &format!("/api/admin/users/{}", SUPER_ADMIN))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    let resp = fixture
        .admin(reqwest::Method::DELETE, "/api/admin/users/editor-1")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let resp = fixture
        .client
        .get(fixture.url("/api/admin/me"))
        .bearer_auth(fixture.token("editor-1"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);
}

#[tokio::test]
async fn test_project_crud_and_public_views() {
    let fixture = TestFixture::new().await;
    let category = fixture.create_category("branding", "Marca").await;
    let category_id = category["id"].as_str().unwrap().to_string();

    let mut body = project_body("casa-azul", "Blue House");
    body["categoryIds"] = json!([category_id]);
    body["aboutEs"] = json!("Sobre la casa");
    let resp = fixture.create_project(body).await;
    assert_eq!(resp.status(), 201);
    let created: Value = resp.json().await.unwrap();
    let id = created["data"]["id"].as_str().unwrap().to_string();
    assert_eq!(created["data"]["isActive"], true);
    assert_eq!(created["data"]["categories"][0]["slug"], "branding");

    // Duplicate slug
    let resp = fixture.create_project(project_body("casa-azul", "Other")).await;
    assert_eq!(resp.status(), 409);
    let err: Value = resp.json().await.unwrap();
    assert_eq!(err["error"]["message"], "A project with this slug already exists");

    // Unknown category
    let mut body = project_body("casa-roja", "Red House");
    body["categoryIds"] = json!(["missing"]);
    let resp = fixture.create_project(body).await;
    assert_eq!(resp.status(), 400);
    let err: Value = resp.json().await.unwrap();
    assert_eq!(err["error"]["code"], "VALIDATION_ERROR");
    assert!(err["error"]["details"]["categoryIds"].is_array());

    // Invalid slug
    let resp = fixture.create_project(project_body("Casa Azul!", "Bad")).await;
    assert_eq!(resp.status(), 400);

    // Public detail, localized
    let resp = fixture
        .client
        .get(fixture.url("/api/projects/casa-azul?locale=es"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let detail: Value = resp.json().await.unwrap();
    assert_eq!(detail["data"]["title"], "Blue House (es)");
    assert_eq!(detail["data"]["about"], "Sobre la casa");
    assert_eq!(detail["data"]["locale"], "es");

    // Category filter
    let resp = fixture
        .client
        .get(fixture.url("/api/projects?category=branding"))
        .send()
        .await
        .unwrap();
    let list: Value = resp.json().await.unwrap();
    assert_eq!(list["data"].as_array().unwrap().len(), 1);

    // Deactivate: gone from public views, still visible to admins
    let resp = fixture
        .admin(reqwest::Method::PATCH, &format!("/api/admin/projects/{}", id))
        .json(&json!({ "isActive": false, "categoryIds": [] }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let updated: Value = resp.json().await.unwrap();
    assert_eq!(updated["data"]["categories"], json!([]));

    let resp = fixture
        .client
        .get(fixture.url("/api/projects/casa-azul"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);

    let resp = fixture
        .admin(reqwest::Method::GET, "/api/admin/projects")
        .send()
        .await
        .unwrap();
    let all: Value = resp.json().await.unwrap();
    assert_eq!(all["data"].as_array().unwrap().len(), 1);

    // Delete
    let resp = fixture
        .admin(reqwest::Method::DELETE, &format!("/api/admin/projects/{}", id))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let resp = fixture
        .admin(reqwest::Method::GET, &format!("/api/admin/projects/{}", id))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn test_reorder_projects_is_atomic() {
    let fixture = TestFixture::new().await;

    let mut ids = Vec::new();
    for (slug, title) in [("uno", "One"), ("dos", "Two")] {
        let resp = fixture.create_project(project_body(slug, title)).await;
        let body: Value = resp.json().await.unwrap();
        ids.push(body["data"]["id"].as_str().unwrap().to_string());
    }

    // Unknown id rolls back every change
    let resp = fixture
        .admin(reqwest::Method::PUT, "/api/admin/projects/reorder")
        .json(&json!({ "items": [
            { "id": ids[0], "displayOrder": 5 },
            { "id": "missing", "displayOrder": 1 },
        ] }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);

    let resp = fixture
        .admin(reqwest::Method::GET, &format!("/api/admin/projects/{}", ids[0]))
        .send()
        .await
        .unwrap();
    let project: Value = resp.json().await.unwrap();
    assert_eq!(project["data"]["displayOrder"], 0);

    // Swap the order
    let resp = fixture
        .admin(reqwest::Method::PUT, "/api/admin/projects/reorder")
        .json(&json!({ "items": [
            { "id": ids[0], "displayOrder": 2 },
            { "id": ids[1], "displayOrder": 1 },
        ] }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let resp = fixture
        .client
        .get(fixture.url("/api/projects"))
        .send()
        .await
        .unwrap();
    let list: Value = resp.json().await.unwrap();
    let slugs: Vec<&str> = list["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["slug"].as_str().unwrap())
        .collect();
    assert_eq!(slugs, vec!["dos", "uno"]);
}

#[tokio::test]
async fn test_project_search() {
    let fixture = TestFixture::new().await;

    let mut body = project_body("faro-norte", "Northern Lighthouse");
    body["tags"] = json!(["arquitectura"]);
    fixture.create_project(body).await;
    fixture
        .create_project(project_body("jardin", "Secret Garden"))
        .await;

    let resp = fixture
        .client
        .get(fixture.url("/api/projects/search?q=lighthouse"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["total"], 1);
    assert_eq!(body["data"]["results"][0]["project"]["slug"], "faro-norte");

    let resp = fixture
        .client
        .get(fixture.url("/api/projects/search?q=arquitectura"))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["total"], 1);
}

#[tokio::test]
async fn test_category_delete_refused_while_in_use() {
    let fixture = TestFixture::new().await;
    let category = fixture.create_category("interiores", "Interiores").await;
    let category_id = category["id"].as_str().unwrap().to_string();

    // Duplicate slug
    let resp = fixture
        .admin(reqwest::Method::POST, "/api/admin/categories")
        .json(&json!({ "slug": "interiores", "nameEs": "Otra", "nameEn": "Other" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 409);

    let mut body = project_body("loft", "Loft");
    body["categoryIds"] = json!([category_id]);
    fixture.create_project(body).await;

    let resp = fixture
        .client
        .get(fixture.url("/api/categories"))
        .send()
        .await
        .unwrap();
    let list: Value = resp.json().await.unwrap();
    assert_eq!(list["data"][0]["projectCount"], 1);

    let resp = fixture
        .admin(
            reqwest::Method::DELETE,
            &format!("/api/admin/categories/{}", category_id),
        )
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let err: Value = resp.json().await.unwrap();
    assert_eq!(err["error"]["details"]["projectCount"], 1);
}

#[tokio::test]
async fn test_newsletter_lifecycle() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .post(fixture.url("/api/newsletter/subscribe"))
        .json(&json!({ "email": "Lector@Example.com", "locale": "en" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["status"], "pending");
    assert_eq!(body["data"]["email"], "lector@example.com");
    assert_eq!(body["notification"], "sent");
    assert!(body["data"].get("verificationToken").is_none());
    assert!(body["data"].get("unsubscribeToken").is_none());

    let email = "lector@example.com";
    let first_token = fixture.verification_token(email).await.unwrap();

    // Pending again: new token, 200
    let resp = fixture
        .client
        .post(fixture.url("/api/newsletter/subscribe"))
        .json(&json!({ "email": email, "locale": "en" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let token = fixture.verification_token(email).await.unwrap();
    assert_ne!(token, first_token);

    let verification = fixture.mailer.sent_to(email);
    assert_eq!(verification.len(), 2);
    assert!(verification[1].html.contains(&token));

    // The replaced token no longer verifies
    let resp = fixture
        .client
        .get(fixture.url(&format!("/api/newsletter/verify/{}", first_token)))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);

    let resp = fixture
        .client
        .get(fixture.url(&format!("/api/newsletter/verify/{}", token)))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["status"], "active");
    assert!(body["data"]["verifiedAt"].is_string());

    // Single use
    let resp = fixture
        .client
        .get(fixture.url(&format!("/api/newsletter/verify/{}", token)))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);

    // Already active
    let resp = fixture
        .client
        .post(fixture.url("/api/newsletter/subscribe"))
        .json(&json!({ "email": email }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 409);
    let err: Value = resp.json().await.unwrap();
    assert_eq!(err["error"]["code"], "ALREADY_SUBSCRIBED");

    // Unsubscribe twice
    let unsubscribe = fixture.unsubscribe_token(email).await;
    let resp = fixture
        .client
        .post(fixture.url(&format!("/api/newsletter/unsubscribe/{}", unsubscribe)))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["status"], "unsubscribed");

    let resp = fixture
        .client
        .get(fixture.url(&format!("/api/newsletter/unsubscribe/{}", unsubscribe)))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 409);
    let err: Value = resp.json().await.unwrap();
    assert_eq!(err["error"]["code"], "ALREADY_UNSUBSCRIBED");

    let resp = fixture
        .client
        .post(fixture.url("/api/newsletter/unsubscribe/unknown-token"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);

    // Coming back keeps the unsubscribe token
    let resp = fixture
        .client
        .post(fixture.url("/api/newsletter/subscribe"))
        .json(&json!({ "email": email }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["status"], "pending");
    assert_eq!(fixture.unsubscribe_token(email).await, unsubscribe);

    // Stats
    let resp = fixture
        .admin(reqwest::Method::GET, "/api/admin/newsletter/stats")
        .send()
        .await
        .unwrap();
    let stats: Value = resp.json().await.unwrap();
    assert_eq!(stats["data"]["total"], 1);
    assert_eq!(stats["data"]["pending"], 1);
}

#[tokio::test]
async fn test_newsletter_admin_status_override() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .post(fixture.url("/api/newsletter/subscribe"))
        .json(&json!({ "email": "ana@example.com" }))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    let id = body["data"]["id"].as_str().unwrap().to_string();

    let resp = fixture
        .admin(
            reqwest::Method::PATCH,
            &format!("/api/admin/newsletter/subscribers/{}", id),
        )
        .json(&json!({ "status": "unsubscribed" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    let resp = fixture
        .admin(
            reqwest::Method::PATCH,
            &format!("/api/admin/newsletter/subscribers/{}", id),
        )
        .json(&json!({ "status": "inactive" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let resp = fixture
        .admin(
            reqwest::Method::GET,
            "/api/admin/newsletter/subscribers?status=inactive",
        )
        .send()
        .await
        .unwrap();
    let list: Value = resp.json().await.unwrap();
    assert_eq!(list["data"].as_array().unwrap().len(), 1);

    let resp = fixture
        .admin(
            reqwest::Method::DELETE,
            &format!("/api/admin/newsletter/subscribers/{}", id),
        )
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
}

#[tokio::test]
async fn test_contact_submission_and_rate_limit() {
    let fixture = TestFixture::new().await;
    let submission = json!({
        "name": "Lucía",
        "email": "lucia@example.com",
        "subject": "Nuevo proyecto",
        "message": "Hola, me gustaría hablar de <b>un proyecto</b>.",
        "locale": "es",
    });

    // Rejected bodies are not counted against the limit
    let resp = fixture
        .client
        .post(fixture.url("/api/contact"))
        .json(&json!({ "name": "", "email": "nope", "subject": "x", "message": "short" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let err: Value = resp.json().await.unwrap();
    assert!(err["error"]["details"]["email"].is_array());

    for _ in 0..3 {
        let resp = fixture
            .client
            .post(fixture.url("/api/contact"))
            .json(&submission)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 201);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["data"]["status"], "pending");
        assert_eq!(body["notification"], "sent");
    }

    let resp = fixture
        .client
        .post(fixture.url("/api/contact"))
        .json(&submission)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 429);
    assert!(resp.headers().contains_key("retry-after"));
    let err: Value = resp.json().await.unwrap();
    assert_eq!(err["error"]["code"], "RATE_LIMITED");

    // Owner notification escapes user input; sender gets an acknowledgement
    let owner = fixture.mailer.sent_to("owner@estudio.test");
    assert_eq!(owner.len(), 3);
    assert!(owner[0].html.contains("&lt;b&gt;un proyecto&lt;/b&gt;"));
    assert_eq!(fixture.mailer.sent_to("lucia@example.com").len(), 3);

    // Admin side
    let resp = fixture
        .admin(reqwest::Method::GET, "/api/admin/contact-submissions")
        .send()
        .await
        .unwrap();
    let list: Value = resp.json().await.unwrap();
    let id = list["data"][0]["id"].as_str().unwrap().to_string();

    let resp = fixture
        .admin(
            reqwest::Method::PATCH,
            &format!("/api/admin/contact-submissions/{}", id),
        )
        .json(&json!({ "status": "replied" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let resp = fixture
        .admin(reqwest::Method::GET, "/api/admin/contact-submissions/stats")
        .send()
        .await
        .unwrap();
    let stats: Value = resp.json().await.unwrap();
    assert_eq!(stats["data"]["total"], 3);
    assert_eq!(stats["data"]["pending"], 2);
    assert_eq!(stats["data"]["replied"], 1);

    let resp = fixture
        .admin(
            reqwest::Method::DELETE,
            &format!("/api/admin/contact-submissions/{}", id),
        )
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let resp = fixture
        .admin(
            reqwest::Method::GET,
            &format!("/api/admin/contact-submissions/{}", id),
        )
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn test_email_failure_keeps_the_write() {
    let fixture = TestFixture::with_mailer(RecordingMailer {
        fail: true,
        ..Default::default()
    })
    .await;

    let resp = fixture
        .client
        .post(fixture.url("/api/newsletter/subscribe"))
        .json(&json!({ "email": "ana@example.com" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["notification"], "failed");

    assert!(fixture.verification_token("ana@example.com").await.is_some());
}

#[tokio::test]
async fn test_track_pageview_and_exit() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .post(fixture.url("/api/track"))
        .header("user-agent", "estudio-tests")
        .json(&json!({ "event": "pageview", "path": "/es/proyectos", "locale": "es" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let set_cookie = resp
        .headers()
        .get("set-cookie")
        .and_then(|v| v.to_str().ok())
        .unwrap()
        .to_string();
    assert!(set_cookie.starts_with("estudio_sid="));
    assert!(set_cookie.contains("HttpOnly"));
    let body: Value = resp.json().await.unwrap();
    let page_view_id = body["data"]["pageViewId"].as_str().unwrap().to_string();
    let session_id = body["data"]["sessionId"].as_str().unwrap().to_string();

    // Same cookie, same session
    let resp = fixture
        .client
        .post(fixture.url("/api/track"))
        .json(&json!({ "event": "pageview", "path": "/es/contacto" }))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["sessionId"], session_id.as_str());

    // Another visitor cannot close this view
    let resp = Client::new()
        .post(fixture.url("/api/track"))
        .json(&json!({ "event": "exit", "pageViewId": page_view_id }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);

    let resp = fixture
        .client
        .post(fixture.url("/api/track"))
        .json(&json!({ "event": "exit", "pageViewId": page_view_id }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert!(body["data"]["durationSeconds"].as_i64().unwrap() >= 0);

    // Already closed
    let resp = fixture
        .client
        .post(fixture.url("/api/track"))
        .json(&json!({ "event": "exit", "pageViewId": page_view_id }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);

    // Bad path
    let resp = fixture
        .client
        .post(fixture.url("/api/track"))
        .json(&json!({ "event": "pageview", "path": "no-slash" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    let resp = fixture
        .admin(reqwest::Method::GET, "/api/admin/analytics/summary")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let summary: Value = resp.json().await.unwrap();
    assert_eq!(summary["data"]["days"], 30);
    assert_eq!(summary["data"]["sessions"], 2);
    assert_eq!(summary["data"]["pageViews"], 2);
    assert_eq!(summary["data"]["uniquePaths"], 2);

    let resp = fixture
        .admin(reqwest::Method::GET, "/api/admin/analytics/summary?days=0")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn test_profile_public_projection() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .get(fixture.url(&format!("/api/profiles/{}", SUPER_ADMIN)))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);

    // Created empty on first read
    let resp = fixture
        .admin(reqwest::Method::GET, "/api/admin/profile")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["adminId"], SUPER_ADMIN);
    assert_eq!(body["data"]["urls"], json!([]));

    let resp = fixture
        .admin(reqwest::Method::PUT, "/api/admin/profile")
        .json(&json!({
            "bio": { "value": "Diseñadora", "isPublic": true },
            "location": { "value": "Madrid", "isPublic": false },
            "emails": [
                { "email": "public@estudio.test", "isPublic": true },
                { "email": "private@estudio.test", "isPublic": false },
            ],
            "skills": [{ "name": "Tipografía", "isPublic": true }],
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    // Invalid nested item
    let resp = fixture
        .admin(reqwest::Method::PUT, "/api/admin/profile")
        .json(&json!({ "emails": [{ "email": "not-an-email", "isPublic": true }] }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    let resp = fixture
        .client
        .get(fixture.url(&format!("/api/profiles/{}", SUPER_ADMIN)))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["bio"]["value"], "Diseñadora");
    assert!(body["data"].get("location").is_none());
    assert_eq!(body["data"]["emails"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"]["emails"][0]["email"], "public@estudio.test");
    assert_eq!(body["data"]["skills"][0]["name"], "Tipografía");
}

#[tokio::test]
async fn test_upload_and_delete_image() {
    let fixture = TestFixture::new().await;

    let form = reqwest::multipart::Form::new()
        .text("folder", "gallery")
        .part(
            "file",
            reqwest::multipart::Part::bytes(PNG.to_vec()).file_name("tiny.png"),
        );
    let resp = fixture
        .admin(reqwest::Method::POST, "/api/admin/uploads")
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);
    let body: Value = resp.json().await.unwrap();
    let key = body["data"]["key"].as_str().unwrap().to_string();
    let url = body["data"]["url"].as_str().unwrap().to_string();
    assert!(key.starts_with("gallery/") && key.ends_with(".png"));
    assert_eq!(body["data"]["mimeType"], "image/png");

    // Served back from the public prefix
    let resp = fixture.client.get(fixture.url(&url)).send().await.unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.bytes().await.unwrap().as_ref(), PNG);

    // Not an image
    let form = reqwest::multipart::Form::new().part(
        "file",
        reqwest::multipart::Part::bytes(b"plain text".to_vec()).file_name("notes.txt"),
    );
    let resp = fixture
        .admin(reqwest::Method::POST, "/api/admin/uploads")
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    // Traversal
    let resp = fixture
        .admin(reqwest::Method::DELETE, "/api/admin/uploads")
        .json(&json!({ "key": "../test.sqlite" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    let resp = fixture
        .admin(reqwest::Method::DELETE, "/api/admin/uploads")
        .json(&json!({ "key": key }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let resp = fixture
        .admin(reqwest::Method::DELETE, "/api/admin/uploads")
        .json(&json!({ "key": key }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn test_project_delete_cleans_up_images() {
    let fixture = TestFixture::new().await;

    let form = reqwest::multipart::Form::new().part(
        "file",
        reqwest::multipart::Part::bytes(PNG.to_vec()).file_name("cover.png"),
    );
    let resp = fixture
        .admin(reqwest::Method::POST, "/api/admin/uploads")
        .multipart(form)
        .send()
        .await
        .unwrap();
    let upload: Value = resp.json().await.unwrap();
    let url = upload["data"]["url"].as_str().unwrap().to_string();
    let key = upload["data"]["key"].as_str().unwrap().to_string();
    assert!(key.starts_with("projects/"));

    let mut body = project_body("con-imagen", "With Image");
    body["image"] = json!(url);
    let resp = fixture.create_project(body).await;
    let project: Value = resp.json().await.unwrap();
    let id = project["data"]["id"].as_str().unwrap().to_string();

    fixture
        .admin(reqwest::Method::DELETE, &format!("/api/admin/projects/{}", id))
        .send()
        .await
        .unwrap();

    let resp = fixture.client.get(fixture.url(&url)).send().await.unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn test_every_admin_route_is_gated() {
    use reqwest::Method;

    let fixture = TestFixture::new().await;
    let routes = [
        (Method::GET, "/api/admin/projects"),
        (Method::POST, "/api/admin/projects"),
        (Method::PUT, "/api/admin/projects/reorder"),
        (Method::GET, "/api/admin/projects/p-1"),
        (Method::PATCH, "/api/admin/projects/p-1"),
        (Method::DELETE, "/api/admin/projects/p-1"),
        (Method::POST, "/api/admin/categories"),
        (Method::PATCH, "/api/admin/categories/c-1"),
        (Method::DELETE, "/api/admin/categories/c-1"),
        (Method::GET, "/api/admin/me"),
        (Method::POST, "/api/admin/me/login"),
        (Method::GET, "/api/admin/users"),
        (Method::POST, "/api/admin/users"),
        (Method::DELETE, "/api/admin/users/u-1"),
        (Method::GET, "/api/admin/profile"),
        (Method::PUT, "/api/admin/profile"),
        (Method::GET, "/api/admin/contact-submissions"),
        (Method::GET, "/api/admin/contact-submissions/stats"),
        (Method::GET, "/api/admin/contact-submissions/s-1"),
        (Method::PATCH, "/api/admin/contact-submissions/s-1"),
        (Method::DELETE, "/api/admin/contact-submissions/s-1"),
        (Method::GET, "/api/admin/newsletter/subscribers"),
        (Method::PATCH, "/api/admin/newsletter/subscribers/n-1"),
        (Method::DELETE, "/api/admin/newsletter/subscribers/n-1"),
        (Method::GET, "/api/admin/newsletter/stats"),
        (Method::GET, "/api/admin/analytics/summary"),
        (Method::POST, "/api/admin/uploads"),
        (Method::DELETE, "/api/admin/uploads"),
    ];
    let visitor = fixture.token("visitor-7");

    let mut mismatches = Vec::new();
    for (method, path) in routes.iter() {
        let anonymous = fixture
            .client
            .request(method.clone(), fixture.url(path))
            .send()
            .await
            .unwrap();
        let anonymous_status = anonymous.status();
        let anonymous_body: Value = anonymous.json().await.unwrap_or(Value::Null);

        let non_admin = fixture
            .client
            .request(method.clone(), fixture.url(path))
            .bearer_auth(&visitor)
            .send()
            .await
            .unwrap();
        let non_admin_status = non_admin.status();
        let non_admin_body: Value = non_admin.json().await.unwrap_or(Value::Null);

        if anonymous_status != StatusCode::UNAUTHORIZED
            || anonymous_body["error"]["code"] != "UNAUTHORIZED"
            || non_admin_status != StatusCode::FORBIDDEN
            || non_admin_body["error"]["code"] != "FORBIDDEN"
        {
            mismatches.push(format!(
                "{} {}: anonymous {}, non-admin {}",
                method, path, anonymous_status, non_admin_status
            ));
        }
    }

    assert!(mismatches.is_empty(), "ungated admin routes: {:?}", mismatches);
}

#[tokio::test]
async fn test_malformed_input_uses_error_envelope() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .post(fixture.url("/api/contact"))
        .json(&json!({
            "name": "Marta",
            "email": "marta@example.com",
            "subject": "Consulta",
            "message": "Quisiera más información.",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);
    let body: Value = resp.json().await.unwrap();
    let contact_id = body["data"]["id"].as_str().unwrap().to_string();

    let resp = fixture
        .client
        .post(fixture.url("/api/newsletter/subscribe"))
        .json(&json!({ "email": "marta@example.com" }))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    let subscriber_id = body["data"]["id"].as_str().unwrap().to_string();

    let bad_bodies = [
        format!("/api/admin/contact-submissions/{}", contact_id),
        format!("/api/admin/newsletter/subscribers/{}", subscriber_id),
    ];
    for path in bad_bodies.iter() {
        let resp = fixture
            .admin(reqwest::Method::PATCH, path)
            .json(&json!({ "status": "bogus" }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 400, "PATCH {}", path);
        let err: Value = resp.json().await.unwrap();
        assert_eq!(err["success"], false);
        assert_eq!(err["error"]["code"], "BAD_REQUEST");
    }

    let bad_queries = [
        "/api/admin/analytics/summary?days=abc",
        "/api/admin/contact-submissions?status=bogus",
        "/api/admin/newsletter/subscribers?status=bogus",
    ];
    for path in bad_queries.iter() {
        let resp = fixture
            .admin(reqwest::Method::GET, path)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 400, "GET {}", path);
        let err: Value = resp.json().await.unwrap();
        assert_eq!(err["success"], false);
        assert_eq!(err["error"]["code"], "BAD_REQUEST");
    }

    // Unchanged by the rejected patch
    let resp = fixture
        .admin(
            reqwest::Method::GET,
            &format!("/api/admin/contact-submissions/{}", contact_id),
        )
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["status"], "pending");
}

#[tokio::test]
async fn test_project_lookup_carries_only_its_categories() {
    let fixture = TestFixture::new().await;
    let branding = fixture.create_category("branding", "Marca").await;
    let interior = fixture.create_category("interiorismo", "Interiorismo").await;

    let mut body = project_body("casa-azul", "Blue House");
    body["categoryIds"] = json!([branding["id"]]);
    assert_eq!(fixture.create_project(body).await.status(), 201);

    let mut body = project_body("casa-roja", "Red House");
    body["categoryIds"] = json!([interior["id"]]);
    let resp = fixture.create_project(body).await;
    assert_eq!(resp.status(), 201);
    let created: Value = resp.json().await.unwrap();
    let red_id = created["data"]["id"].as_str().unwrap().to_string();

    let resp = fixture
        .client
        .get(fixture.url("/api/projects/casa-azul"))
        .send()
        .await
        .unwrap();
    let detail: Value = resp.json().await.unwrap();
    let categories = detail["data"]["categories"].as_array().unwrap();
    assert_eq!(categories.len(), 1);
    assert_eq!(categories[0]["slug"], "branding");

    let resp = fixture
        .admin(reqwest::Method::GET, &format!("/api/admin/projects/{}", red_id))
        .send()
        .await
        .unwrap();
    let detail: Value = resp.json().await.unwrap();
    let categories = detail["data"]["categories"].as_array().unwrap();
    assert_eq!(categories.len(), 1);
    assert_eq!(categories[0]["slug"], "interiorismo");

    let resp = fixture
        .client
        .get(fixture.url("/api/projects"))
        .send()
        .await
        .unwrap();
    let list: Value = resp.json().await.unwrap();
    for project in list["data"].as_array().unwrap() {
        assert_eq!(project["categories"].as_array().unwrap().len(), 1);
    }
}

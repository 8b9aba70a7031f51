//! Shared test helpers for integration tests.

use std::path::{Path, PathBuf};

use axum::Router;
use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode};
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::ServiceExt;

use securedrop_api::{AppState, build_app, build_state};
use securedrop_core::config::AppConfig;
use securedrop_database::DatabasePool;

/// Administrator seeded by [`TestApp::admin_token`].
pub const ADMIN_USERNAME: &str = "admin";
/// Password of the seeded administrator.
pub const ADMIN_PASSWORD: &str = "correct-horse-battery";

const BOUNDARY: &str = "securedrop-test-boundary";

/// Test application context
pub struct TestApp {
    /// The Axum router for making test requests
    pub router: Router,
    /// Services, for arranging state behind the API
    pub state: AppState,
    /// Holds the database file and the storage root
    _dir: TempDir,
}

impl TestApp {
    /// Create a new test application
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    /// Create a test application after adjusting the default configuration
    pub async fn with_config(adjust: impl FnOnce(&mut AppConfig)) -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");

        let mut config = AppConfig::default();
        config.database.url = format!("sqlite://{}", dir.path().join("test.db").display());
        config.storage.root_path = dir.path().join("storage").display().to_string();
        config.auth.jwt_secret = "integration-test-secret".to_string();
        config.storage.max_upload_size_bytes = 8 * 1024 * 1024;
        adjust(&mut config);

        let db = DatabasePool::connect(&config.database)
            .await
            .expect("Failed to open test database");
        securedrop_database::migration::run_migrations(db.pool())
            .await
            .expect("Failed to run migrations");

        let state = build_state(config, db)
            .await
            .expect("Failed to build application state");

        Self {
            router: build_app(state.clone()),
            state,
            _dir: dir,
        }
    }

    /// Root of the guarded file store
    pub fn storage_root(&self) -> PathBuf {
        PathBuf::from(&self.state.config.storage.root_path)
    }

    /// Place a file under the storage root
    pub fn write_file(&self, relative: &str, contents: &[u8]) -> PathBuf {
        let path = self.storage_root().join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent dir");
        }
        std::fs::write(&path, contents).expect("Failed to write file");
        path
    }

    /// Read a file under the storage root
    pub fn read_file(&self, relative: &str) -> Vec<u8> {
        std::fs::read(self.storage_root().join(relative)).expect("Failed to read file")
    }

    /// Seed the administrator and return a bearer credential
    pub async fn admin_token(&self) -> String {
        self.state
            .admin_auth
            .create_admin(ADMIN_USERNAME, ADMIN_PASSWORD)
            .await
            .expect("Failed to create admin");

        let response = self.admin_login(ADMIN_USERNAME, ADMIN_PASSWORD).await;
        assert_eq!(response.status, StatusCode::OK, "{:?}", response.body);
        response.body["access_token"]
            .as_str()
            .expect("access_token missing")
            .to_string()
    }

    /// POST the admin login form
    pub async fn admin_login(&self, username: &str, password: &str) -> TestResponse {
        let req = Request::builder()
            .method("POST")
            .uri("/api/auth/admin/login")
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(Body::from(format!("username={username}&password={password}")))
            .expect("Failed to build request");
        self.send(req).await
    }

    /// Create a token through the API and return its JSON
    pub async fn create_token(&self, admin: &str, body: Value) -> Value {
        let response = self
            .request("POST", "/api/admin/tokens", Some(body), Some(admin))
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{:?}", response.body);
        response.body
    }

    /// Exchange a token string for a session credential
    pub async fn guest_login(&self, token_string: &str) -> TestResponse {
        self.request(
            "POST",
            "/api/guest/login",
            Some(json!({ "token_string": token_string })),
            None,
        )
        .await
    }

    /// Log in and return the session credential, panicking on failure
    pub async fn guest_session(&self, token: &Value) -> String {
        let token_string = token["token_string"].as_str().expect("token_string missing");
        let response = self.guest_login(token_string).await;
        assert_eq!(response.status, StatusCode::OK, "{:?}", response.body);
        response.body["session_token"]
            .as_str()
            .expect("session_token missing")
            .to_string()
    }

    /// Upload one file as multipart field `file`
    pub async fn upload(&self, session: &str, filename: &str, contents: &[u8]) -> TestResponse {
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(contents);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

        let req = Request::builder()
            .method("POST")
            .uri("/api/guest/upload")
            .header(
                "Content-Type",
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .header("Authorization", format!("Bearer {session}"))
            .body(Body::from(body))
            .expect("Failed to build request");
        self.send(req).await
    }

    /// GET or HEAD a download, optionally with a Range header
    pub async fn download(
        &self,
        method: &str,
        session: &str,
        filename: &str,
        range: Option<&str>,
    ) -> TestResponse {
        let mut req = Request::builder()
            .method(method)
            .uri(format!("/api/guest/download/{filename}"))
            .header("Authorization", format!("Bearer {session}"));
        if let Some(range) = range {
            req = req.header("Range", range);
        }
        self.send(req.body(Body::empty()).expect("Failed to build request"))
            .await
    }

    /// Fetch a token as the admin sees it
    pub async fn get_token(&self, admin: &str, id: i64) -> TestResponse {
        self.request("GET", &format!("/api/admin/tokens/{id}"), None, Some(admin))
            .await
    }

    /// Make a JSON request to the test app
    pub async fn request(
        &self,
        method: &str,
        path: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> TestResponse {
        let body_str = body
            .map(|b| serde_json::to_string(&b).expect("Failed to serialize body"))
            .unwrap_or_default();

        let mut req = Request::builder()
            .method(method)
            .uri(path)
            .header("Content-Type", "application/json");

        if let Some(token) = token {
            req = req.header("Authorization", format!("Bearer {token}"));
        }

        let req = req
            .body(Body::from(body_str))
            .expect("Failed to build request");

        self.send(req).await
    }

    /// Send a prepared request
    pub async fn send(&self, req: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(req)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Failed to read body")
            .to_vec();
        let body: Value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

        TestResponse {
            status,
            headers,
            body,
            bytes,
        }
    }
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    /// HTTP status code
    pub status: StatusCode,
    /// Response headers
    pub headers: HeaderMap,
    /// Parsed JSON body, `Null` when the body is not JSON
    pub body: Value,
    /// Raw body
    pub bytes: Vec<u8>,
}

impl TestResponse {
    /// A header as a string
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// The machine-readable error code
    pub fn error_code(&self) -> Option<&str> {
        self.body["error"].as_str()
    }
}

/// Whether `path` exists, without following a final symlink
pub fn exists(path: &Path) -> bool {
    std::fs::symlink_metadata(path).is_ok()
}

#![allow(dead_code)]

use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use siga_api::auth::Registration;
use siga_api::config::CompletionPolicy;
use siga_api::database::MemoryStore;
use siga_api::types::Role;
use siga_api::{app, AppState};

pub const PASSWORD: &str = "correct-horse-battery";

/// Router over a fresh in-memory store, driven with `oneshot`
pub struct TestApp {
    pub state: AppState,
    router: Router,
}

/// A logged-in account
#[derive(Clone)]
pub struct Account {
    pub id: Uuid,
    pub email: String,
    pub token: String,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_policy(CompletionPolicy::Marked)
    }

    pub fn with_policy(policy: CompletionPolicy) -> Self {
        let state = AppState::new(Arc::new(MemoryStore::new()), policy);
        Self {
            router: app(state.clone()),
            state,
        }
    }

    pub async fn request(
        &self,
        method: Method,
        path: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(path);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("valid request");

        let response = self.router.clone().oneshot(request).await.expect("infallible router");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("readable body");
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        (status, value)
    }

    pub async fn get(&self, path: &str, token: &str) -> (StatusCode, Value) {
        self.request(Method::GET, path, Some(token), None).await
    }

    pub async fn post(&self, path: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, path, Some(token), Some(body)).await
    }

    pub async fn put(&self, path: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::PUT, path, Some(token), Some(body)).await
    }

    pub async fn delete(&self, path: &str, token: &str) -> (StatusCode, Value) {
        self.request(Method::DELETE, path, Some(token), None).await
    }

    /// Creates an account directly in the store and logs in over HTTP
    pub async fn account(&self, name: &str, role: Role) -> Account {
        let email = format!("{}@siga.test", name);
        let user = self
            .state
            .authenticator
            .register(
                Registration {
                    email: email.clone(),
                    password: PASSWORD.to_string(),
                    first_name: name.to_string(),
                    last_name: "Test".to_string(),
                },
                role,
            )
            .await
            .expect("register account");
        let token = self.login(&email, PASSWORD).await;
        Account {
            id: user.id,
            email,
            token,
        }
    }

    pub async fn login(&self, email: &str, password: &str) -> String {
        let (status, body) = self
            .request(
                Method::POST,
                "/auth/login",
                None,
                Some(json!({ "email": email, "password": password })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "login failed: {}", body);
        body["data"]["token"].as_str().expect("token").to_string()
    }

    /// Creates a course as `admin` and returns its id
    pub async fn course(&self, admin: &Account, title: &str) -> Uuid {
        let (status, body) = self
            .post("/api/courses", &admin.token, json!({ "title": title }))
            .await;
        assert_eq!(status, StatusCode::CREATED, "create course failed: {}", body);
        id_of(&body["data"])
    }

    pub async fn require(&self, admin: &Account, course: Uuid, prereq: Uuid) {
        let (status, body) = self
            .post(
                &format!("/api/courses/{}/prerequisites", course),
                &admin.token,
                json!({ "prereqId": prereq }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "add prerequisite failed: {}", body);
    }
}

pub fn id_of(value: &Value) -> Uuid {
    value["id"]
        .as_str()
        .and_then(|s| s.parse().ok())
        .unwrap_or_else(|| panic!("no id in {}", value))
}

/// The real server binary on a free port, killed on drop
pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    child: Child,
}

impl TestServer {
    pub async fn start() -> Result<Self> {
        let server = Self::spawn()?;
        server.wait_ready(Duration::from_secs(10)).await?;
        Ok(server)
    }

    fn spawn() -> Result<Self> {
        // Pick an unused port for isolation
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);

        let child = Command::new(env!("CARGO_BIN_EXE_siga-api"))
            .env("SIGA_API_PORT", port.to_string())
            .env("APP_ENV", "development")
            .env("STORAGE_BACKEND", "memory")
            .env("BOOTSTRAP_ADMIN_EMAIL", "root@siga.test")
            .env("BOOTSTRAP_ADMIN_PASSWORD", PASSWORD)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .spawn()
            .context("failed to spawn server binary")?;

        Ok(Self { port, base_url, child })
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let client = reqwest::Client::new();
        let deadline = Instant::now() + timeout;
        let url = format!("{}/health", self.base_url);
        while Instant::now() < deadline {
            if let Ok(resp) = client.get(&url).send().await {
                if resp.status() == reqwest::StatusCode::OK {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(150)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

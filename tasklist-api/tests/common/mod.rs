//! Common test utilities for integration tests
//!
//! Every test gets its own router over a fresh `MemoryStore`, a regular user,
//! and an admin, with tokens for both. Requests go through
//! `tower::ServiceExt::oneshot`; no socket is opened.

#![allow(dead_code)]

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use std::sync::Arc;
use tasklist_api::app::{build_router, AppState};
use tasklist_api::config::Config;
use tasklist_shared::auth::jwt::issue_token;
use tasklist_shared::models::user::{CreateUser, User, UserRole};
use tasklist_shared::store::{MemoryStore, Store, UserStore};
use tower::ServiceExt;
use uuid::Uuid;

pub const SECRET: &str = "integration-test-secret-at-least-32-bytes";

/// Test context containing all necessary resources
pub struct TestContext {
    pub store: Arc<MemoryStore>,
    pub app: Router,
    pub config: Config,
    pub user: User,
    pub admin: User,
    pub user_token: String,
    pub admin_token: String,
}

async fn seed_user(store: &MemoryStore, username: &str, role: UserRole) -> User {
    store
        .insert_user(CreateUser {
            username: username.to_string(),
            email: format!("{}@example.com", username),
            password_hash: "unused".to_string(),
            role,
        })
        .await
        .expect("Failed to seed user")
}

impl TestContext {
    pub async fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let config = Config::for_tests(SECRET);

        let user = seed_user(&store, "member", UserRole::User).await;
        let admin = seed_user(&store, "boss", UserRole::Admin).await;

        let user_token = issue_token(user.id, config.jwt.expires_in, SECRET).unwrap();
        let admin_token = issue_token(admin.id, config.jwt.expires_in, SECRET).unwrap();

        let dyn_store: Arc<dyn Store> = store.clone();
        let app = build_router(AppState::new(dyn_store, config.clone()));

        Self {
            store,
            app,
            config,
            user,
            admin,
            user_token,
            admin_token,
        }
    }

    /// Sends a request and returns the status and parsed JSON body
    ///
    /// Empty bodies come back as `Value::Null`.
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }

        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();

        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };

        (status, json)
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Method::GET, uri, Some(&self.user_token), None).await
    }

    pub async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send(Method::POST, uri, Some(&self.user_token), Some(body)).await
    }

    pub async fn put(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send(Method::PUT, uri, Some(&self.user_token), Some(body)).await
    }

    pub async fn delete(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Method::DELETE, uri, Some(&self.user_token), None).await
    }

    /// Creates a project through the API and returns its id
    pub async fn create_project(&self, name: &str) -> Uuid {
        let (status, body) = self
            .post(
                "/api/projects",
                serde_json::json!({
                    "name": name,
                    "description": format!("{} description", name),
                    "endDate": "2030-12-31T00:00:00Z"
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        id_of(&body["project"])
    }

    /// Creates a task through the API and returns its id
    pub async fn create_task(&self, title: &str, project_ids: &[Uuid]) -> Uuid {
        let (status, body) = self
            .post(
                "/api/tasks",
                serde_json::json!({ "title": title, "projectIds": project_ids }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        id_of(&body["task"])
    }

    /// Task ids a project lists, read back through `GET /api/projects`
    pub async fn project_task_ids(&self, project_id: Uuid) -> Vec<Uuid> {
        let (status, body) = self.get("/api/projects").await;
        assert_eq!(status, StatusCode::OK);

        body.as_array()
            .unwrap()
            .iter()
            .find(|p| id_of(p) == project_id)
            .map(|p| p["tasks"].as_array().unwrap().iter().map(id_of).collect())
            .unwrap_or_default()
    }

    /// Issues found by the admin consistency endpoint
    pub async fn link_issues(&self) -> Vec<Value> {
        let (status, body) = self
            .send(Method::GET, "/api/admin/consistency", Some(&self.admin_token), None)
            .await;
        assert_eq!(status, StatusCode::OK, "{}", body);
        body["issues"].as_array().unwrap().clone()
    }
}

pub fn id_of(value: &Value) -> Uuid {
    value["id"]
        .as_str()
        .and_then(|s| Uuid::parse_str(s).ok())
        .unwrap_or_else(|| panic!("no id in {}", value))
}

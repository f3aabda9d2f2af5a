//! Shared harness: an in-memory database behind the full router.

#![allow(dead_code)]

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use voiceup_server::{
    config::{Config, SeedConfig},
    db::{models::Role, Database},
    routes::auth::create_token,
    AppState,
};

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
}

pub fn test_config() -> Config {
    Config {
        port: 0,
        // One connection: every pooled connection to :memory: is its own database
        database_url: "sqlite::memory:".to_string(),
        database_max_connections: 1,
        jwt_secret: "test-secret".to_string(),
        token_ttl_days: 1,
        body_limit_bytes: 1024 * 1024,
        static_dir: "does-not-exist".to_string(),
        seed: SeedConfig {
            admin_email: "admin@test.local".to_string(),
            admin_password: "admin-pass".to_string(),
            citizen_email: "citizen@test.local".to_string(),
            citizen_password: "citizen-pass".to_string(),
        },
    }
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_config(test_config()).await
    }

    pub async fn with_config(config: Config) -> Self {
        let db = Database::connect(&config.database_url, config.database_max_connections)
            .await
            .expect("connect");
        db.run_migrations().await.expect("migrations");

        let state = AppState { db, config };
        Self {
            router: voiceup_server::app(state.clone()),
            state,
        }
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        self.send(request).await
    }

    /// Sends a prepared request and parses the body as JSON (`Null` if it is not).
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let (status, bytes) = self.send_raw(request).await;
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    pub async fn send_raw(&self, request: Request<Body>) -> (StatusCode, Vec<u8>) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, bytes.to_vec())
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.request(Method::GET, uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, token, Some(body)).await
    }

    pub async fn put(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.request(Method::PUT, uri, token, Some(body)).await
    }

    /// Registers a citizen, returning `(token, user_id)`.
    pub async fn register(&self, email: &str) -> (String, String) {
        let (status, body) = self
            .post(
                "/api/auth/register",
                None,
                json!({ "email": email, "password": "correct horse" }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "register failed: {body}");
        (
            body["token"].as_str().unwrap().to_string(),
            body["user"]["id"].as_str().unwrap().to_string(),
        )
    }

    /// Registers a user and promotes them to admin directly in the database.
    pub async fn admin(&self, email: &str) -> (String, String) {
        let (token, id) = self.register(email).await;
        sqlx::query("UPDATE users SET role = 'ADMIN' WHERE id = ?")
            .bind(&id)
            .execute(&self.state.db.pool)
            .await
            .unwrap();
        (token, id)
    }

    /// Inserts a citizen directly and signs a token for them, skipping password hashing.
    pub async fn citizen_with_token(&self, email: &str) -> (String, String) {
        let id = uuid::Uuid::new_v4().to_string();
        sqlx::query(
            "INSERT INTO users (id, email, password_hash, role, is_banned, created_at) VALUES (?, ?, 'x', 'CITIZEN', 0, ?)",
        )
        .bind(&id)
        .bind(email)
        .bind(voiceup_server::db::now())
        .execute(&self.state.db.pool)
        .await
        .unwrap();
        let token = create_token(&id, Role::Citizen, &self.state.config.jwt_secret, 1).unwrap();
        (token, id)
    }

    pub async fn create_report(&self, token: Option<&str>, body: Value) -> Value {
        let (status, report) = self.post("/api/reports/create", token, body).await;
        assert_eq!(status, StatusCode::CREATED, "create failed: {report}");
        report
    }
}

pub fn report_body(title: &str, category: &str) -> Value {
    json!({
        "title": title,
        "description": format!("{title} needs attention"),
        "category": category,
        "lat": 40.7589,
        "lng": -73.9851,
        "address": "Main St",
    })
}

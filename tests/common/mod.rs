#![allow(dead_code)]

use std::sync::Arc;

use anyhow::{Context, Result};
use reqwest::StatusCode;
use serde_json::{json, Value};

use storefront_api::config::AppConfig;
use storefront_api::database::{Database, MemoryDatabase};
use storefront_api::observer::MemorySink;
use storefront_api::AppState;

pub const EMAIL: &str = "user@example.com";
pub const PASSWORD: &str = "secret";

/// A server running in-process on its own port, backed by in-memory storage
pub struct TestApp {
    pub base_url: String,
    pub state: AppState,
    pub sink: Arc<MemorySink>,
    pub client: reqwest::Client,
}

pub async fn spawn_app() -> Result<TestApp> {
    // Pick an unused port for isolation
    let port = portpicker::pick_unused_port().context("failed to pick free port")?;
    let base_url = format!("http://127.0.0.1:{}", port);

    let mut config = AppConfig::development();
    config.api.enable_request_logging = false;
    config.security.password_hash_cost = 4;

    let sink = Arc::new(MemorySink::new());
    let db: Arc<dyn Database> = Arc::new(MemoryDatabase::new());
    let state = AppState::new(config, db, sink.clone());

    let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
        .await
        .context("failed to bind test port")?;
    let app = storefront_api::app(state.clone());
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    Ok(TestApp {
        base_url,
        state,
        sink,
        client: reqwest::Client::new(),
    })
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Wait until every deferred task queued so far has run
    pub async fn settle(&self) {
        self.state.tasks.wait_idle().await;
    }

    pub async fn register(&self, email: &str, password: &str) -> Result<reqwest::Response> {
        Ok(self
            .client
            .post(self.url("/users/"))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?)
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<reqwest::Response> {
        Ok(self
            .client
            .post(self.url("/token/"))
            .form(&[("username", email), ("password", password)])
            .send()
            .await?)
    }

    /// Register the default account and return a bearer token for it
    pub async fn token(&self) -> Result<String> {
        let res = self.register(EMAIL, PASSWORD).await?;
        anyhow::ensure!(res.status() == StatusCode::CREATED, "register failed: {}", res.status());

        let body: Value = self.login(EMAIL, PASSWORD).await?.json().await?;
        body["access_token"]
            .as_str()
            .map(str::to_string)
            .context("no access_token in token response")
    }

    /// Token for a second account; reads made with it never count as views
    pub async fn reader_token(&self) -> Result<String> {
        let email = "reader@example.com";
        // Already registered on repeat calls; the 409 is fine
        self.register(email, PASSWORD).await?;

        let body: Value = self.login(email, PASSWORD).await?.json().await?;
        body["access_token"]
            .as_str()
            .map(str::to_string)
            .context("no access_token in token response")
    }

    pub async fn create_brand(&self, token: &str, name: &str) -> Result<Value> {
        let res = self
            .client
            .post(self.url("/brands/"))
            .bearer_auth(token)
            .json(&json!({ "name": name }))
            .send()
            .await?;
        anyhow::ensure!(res.status() == StatusCode::CREATED, "create brand failed: {}", res.status());
        let body: Value = res.json().await?;
        Ok(body["data"].clone())
    }

    pub async fn create_product(&self, token: &str, payload: Value) -> Result<Value> {
        let res = self
            .client
            .post(self.url("/products/"))
            .bearer_auth(token)
            .json(&payload)
            .send()
            .await?;
        anyhow::ensure!(res.status() == StatusCode::CREATED, "create product failed: {}", res.status());
        let body: Value = res.json().await?;
        Ok(body["data"].clone())
    }
}

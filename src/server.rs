use anyhow::Context;
use axum::{
    http::HeaderValue,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config::{AppConfig, Environment};
use crate::database;
use crate::handlers::{protected, public};
use crate::observer::LogSink;
use crate::state::AppState;

/// How long shutdown waits for deferred tasks to drain
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

pub fn app(state: AppState) -> Router {
    let config = state.config.clone();

    let mut router = Router::new()
        // Public
        .route("/", get(public::root))
        .route("/health", get(public::health))
        .route("/token/", post(public::token_post))
        // Resources
        .merge(user_routes())
        .merge(brand_routes())
        .merge(product_routes())
        .with_state(state);

    if config.security.enable_cors {
        router = router.layer(cors_layer(&config));
    }
    if config.api.enable_request_logging {
        router = router.layer(TraceLayer::new_for_http());
    }
    router
}

fn user_routes() -> Router<AppState> {
    use protected::users;

    Router::new()
        .route("/users/", get(users::list).post(public::register_post))
        .route(
            "/users/:id/",
            get(users::get).patch(users::patch).delete(users::delete),
        )
}

fn brand_routes() -> Router<AppState> {
    use protected::brands;

    Router::new()
        .route("/brands/", get(brands::list).post(brands::post))
        .route(
            "/brands/:id/",
            get(brands::get).patch(brands::patch).delete(brands::delete),
        )
}

fn product_routes() -> Router<AppState> {
    use protected::products;

    Router::new()
        .route("/products/", get(products::list).post(products::post))
        .route(
            "/products/:id/",
            get(products::get)
                .patch(products::patch)
                .delete(products::delete),
        )
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    if config.environment == Environment::Development {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = config
        .security
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Connect storage, bind and serve until ctrl-c, then let deferred tasks drain
pub async fn serve(config: AppConfig) -> anyhow::Result<()> {
    let db = database::connect(&config.database)
        .await
        .context("failed to open storage")?;

    let bind_addr = format!("{}:{}", config.api.host, config.api.port);
    let environment = config.environment;
    let state = AppState::new(config, db, Arc::new(LogSink));
    let tasks = state.tasks.clone();

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    tracing::info!(
        "Storefront API listening on http://{} ({:?} mode)",
        bind_addr,
        environment
    );

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    if tokio::time::timeout(DRAIN_TIMEOUT, tasks.wait_idle()).await.is_err() {
        tracing::warn!("{} deferred tasks abandoned at shutdown", tasks.pending());
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemoryDatabase;
    use crate::observer::MemorySink;
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
    };
    use serde_json::Value;
    use tower::ServiceExt;

    fn test_app() -> Router {
        let mut config = AppConfig::development();
        config.api.enable_request_logging = false;
        let state = AppState::new(
            config,
            Arc::new(MemoryDatabase::new()),
            Arc::new(MemorySink::new()),
        );
        app(state)
    }

    async fn get(uri: &str) -> (StatusCode, Value) {
        let response = test_app()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    #[tokio::test]
    async fn health_is_public() {
        let (status, body) = get("/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["status"], "ok");
    }

    #[tokio::test]
    async fn product_listing_is_public() {
        let (status, body) = get("/products/").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn brand_listing_requires_token() {
        let response = test_app()
            .oneshot(Request::builder().uri("/brands/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(response.headers()[header::WWW_AUTHENTICATE], "Bearer");
    }

    #[tokio::test]
    async fn unknown_sort_column_is_bad_request() {
        let (status, body) = get("/products/?order_by=secret").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "BAD_REQUEST");
    }
}

use std::sync::Arc;

use axum::body::Body;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{Method, Request, Response};
use axum::Router;
use sqlx::PgPool;
use uuid::Uuid;

use ciq_api::auth::jwt::{generate_access_token, JwtConfig};
use ciq_api::config::ServerConfig;
use ciq_api::router::build_app_router;
use ciq_api::state::AppState;
use ciq_core::servicenow_config::ServiceNowConfig;
use ciq_core::vault::CredentialVault;

/// Signing secret shared by the test token mint and the test app.
pub const TEST_JWT_SECRET: &str = "test-secret-that-is-long-enough-for-hmac";

/// Vault secret for the test app.
pub const TEST_ENCRYPTION_KEY: &str = "test-encryption-key-for-api-tests";

fn test_jwt_config() -> JwtConfig {
    JwtConfig {
        secret: TEST_JWT_SECRET.to_string(),
        access_token_expiry_mins: 15,
    }
}

/// ServiceNow settings for tests: mock mode pointing at a missing payload
/// file, with a short remote timeout so unreachable-host tests fail fast.
pub fn test_servicenow_config() -> ServiceNowConfig {
    ServiceNowConfig {
        timeout_secs: 2,
        use_mock: true,
        mock_payload_path: "/nonexistent/mock_servicenow_payload.json".to_string(),
        ..ServiceNowConfig::default()
    }
}

/// Build a test `ServerConfig` around the given ServiceNow settings.
pub fn test_config(servicenow: ServiceNowConfig) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        jwt: test_jwt_config(),
        servicenow,
        encryption_key: TEST_ENCRYPTION_KEY.to_string(),
    }
}

/// Build the full application router with all middleware layers, using
/// the given database pool and ServiceNow settings.
///
/// This mirrors the router construction in `main.rs` so integration tests
/// exercise the same middleware stack that production uses.
pub fn build_test_app_with(pool: PgPool, servicenow: ServiceNowConfig) -> Router {
    let config = test_config(servicenow);
    let vault = CredentialVault::new(&config.encryption_key).unwrap();

    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        vault: Arc::new(vault),
    };

    build_app_router(state, &config)
}

pub fn build_test_app(pool: PgPool) -> Router {
    build_test_app_with(pool, test_servicenow_config())
}

/// Mint a Bearer token scoped to an organization.
pub fn token_for(org_id: Uuid) -> String {
    generate_access_token(Uuid::new_v4(), org_id, &test_jwt_config()).unwrap()
}

async fn send(
    app: Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<serde_json::Value>,
) -> Response<Body> {
    use tower::ServiceExt;

    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(json) => builder
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string())),
        None => builder.body(Body::empty()),
    }
    .unwrap();

    app.oneshot(request).await.unwrap()
}

pub async fn get(app: Router, uri: &str, token: &str) -> Response<Body> {
    send(app, Method::GET, uri, Some(token), None).await
}

pub async fn get_unauthenticated(app: Router, uri: &str) -> Response<Body> {
    send(app, Method::GET, uri, None, None).await
}

pub async fn post(app: Router, uri: &str, token: &str) -> Response<Body> {
    send(app, Method::POST, uri, Some(token), None).await
}

pub async fn post_json(
    app: Router,
    uri: &str,
    token: &str,
    body: serde_json::Value,
) -> Response<Body> {
    send(app, Method::POST, uri, Some(token), Some(body)).await
}

pub async fn put_json(
    app: Router,
    uri: &str,
    token: &str,
    body: serde_json::Value,
) -> Response<Body> {
    send(app, Method::PUT, uri, Some(token), Some(body)).await
}

pub async fn delete(app: Router, uri: &str, token: &str) -> Response<Body> {
    send(app, Method::DELETE, uri, Some(token), None).await
}

/// Collect a response body into JSON.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    use http_body_util::BodyExt;

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

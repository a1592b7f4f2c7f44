/// End-to-end credential lifecycle tests against the full router
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::sync::Arc;
use tower::ServiceExt;

use sakan::account::{AccountManager, CredentialStore};
use sakan::config::{
    AuthConfig, LoggingConfig, RateLimitConfig, ServerConfig, ServiceConfig, StorageConfig,
    VerificationConfig,
};
use sakan::context::AppContext;
use sakan::rate_limit::RateGovernor;
use sakan::server::build_router;
use sakan::verification::VerificationGateway;

fn test_config() -> ServerConfig {
    ServerConfig {
        service: ServiceConfig {
            hostname: "localhost".to_string(),
            port: 0,
            version: "0.1.0".to_string(),
        },
        storage: StorageConfig {
            data_directory: PathBuf::from("./data"),
            account_db: PathBuf::from(":memory:"),
        },
        authentication: AuthConfig {
            jwt_secret: "integration-test-secret-0123456789abcdef".to_string(),
            jwt_issuer: "sakan".to_string(),
            jwt_audience: "sakan-clients".to_string(),
            access_token_ttl: 3600,
            refresh_token_ttl: 604800,
        },
        // Unreachable endpoint so registration exercises the local fallback
        verification: VerificationConfig {
            base_url: "http://127.0.0.1:1/api".to_string(),
            api_key: "test".to_string(),
            timeout_secs: 1,
        },
        rate_limit: RateLimitConfig {
            enabled: true,
            max_requests: 1000,
            window_secs: 60,
        },
        logging: LoggingConfig {
            level: "info".to_string(),
        },
    }
}

async fn test_app(config: ServerConfig) -> Router {
    let db = SqlitePool::connect(":memory:").await.unwrap();
    sakan::db::run_migrations(&db).await.unwrap();

    let config = Arc::new(config);
    let store = CredentialStore::new(db.clone());
    let verification = VerificationGateway::new(&config.verification).unwrap();
    let account_manager = Arc::new(AccountManager::new(
        store,
        verification,
        Arc::clone(&config),
    ));
    let rate_governor = Arc::new(RateGovernor::from_config(&config.rate_limit));

    build_router(AppContext {
        config,
        db,
        account_manager,
        rate_governor,
    })
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    bearer: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = bearer {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }

    let request = match body {
        Some(json_body) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_string(&json_body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };

    (status, value)
}

fn register_body(email: &str, national_id: &str, role: &str) -> Value {
    json!({
        "email": email,
        "password": "Str0ngPassw0rd!",
        "fullName": "Test User",
        "nationalId": national_id,
        "role": role,
    })
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = test_app(test_config()).await;

    let (status, body) = send(&app, "GET", "/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_register_issues_credentials() {
    let app = test_app(test_config()).await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(register_body("a@x.com", "29001010112345", "Tenant")),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(!body["accessToken"].as_str().unwrap().is_empty());
    assert!(!body["refreshToken"].as_str().unwrap().is_empty());
    assert_eq!(body["user"]["email"], "a@x.com");
    assert_eq!(body["user"]["role"], "Tenant");
    assert_eq!(body["user"]["isVerified"], false);
}

#[tokio::test]
async fn test_register_duplicate_email_conflicts() {
    let app = test_app(test_config()).await;

    let (status, _) = send(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(register_body("a@x.com", "29001010112345", "Tenant")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(register_body("a@x.com", "29001020112345", "Tenant")),
    )
    .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Conflict");
}

#[tokio::test]
async fn test_register_rejects_malformed_requests() {
    let app = test_app(test_config()).await;

    // Bad email
    let (status, body) = send(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(register_body("not-an-email", "29001010112345", "Tenant")),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "InvalidRequest");

    // National id with the wrong length
    let (status, _) = send(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(register_body("b@x.com", "12345", "Tenant")),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Structurally invalid national id (bad century digit)
    let (status, _) = send(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(register_body("c@x.com", "99001010112345", "Tenant")),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_login_supersedes_previous_session() {
    let app = test_app(test_config()).await;

    let (_, registered) = send(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(register_body("a@x.com", "29001010112345", "Tenant")),
    )
    .await;
    let first_refresh = registered["refreshToken"].as_str().unwrap().to_string();

    // Wrong password is rejected
    let (status, body) = send(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({"email": "a@x.com", "password": "wrong-password"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "AuthenticationRequired");

    // Correct password issues a fresh pair
    let (status, login) = send(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({"email": "a@x.com", "password": "Str0ngPassw0rd!"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let new_refresh = login["refreshToken"].as_str().unwrap().to_string();
    assert_ne!(first_refresh, new_refresh);

    // The pre-login refresh token no longer works
    let (status, _) = send(
        &app,
        "POST",
        "/api/auth/refresh",
        None,
        Some(json!({"refreshToken": first_refresh})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // The freshly issued one does
    let (status, _) = send(
        &app,
        "POST",
        "/api/auth/refresh",
        None,
        Some(json!({"refreshToken": new_refresh})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_refresh_tokens_are_single_use() {
    let app = test_app(test_config()).await;

    let (_, registered) = send(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(register_body("a@x.com", "29001010112345", "Tenant")),
    )
    .await;
    let refresh = registered["refreshToken"].as_str().unwrap().to_string();

    let (status, rotated) = send(
        &app,
        "POST",
        "/api/auth/refresh",
        None,
        Some(json!({"refreshToken": refresh})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_ne!(rotated["refreshToken"].as_str().unwrap(), refresh);

    // Replaying the consumed token fails
    let (status, body) = send(
        &app,
        "POST",
        "/api/auth/refresh",
        None,
        Some(json!({"refreshToken": refresh})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "AuthenticationRequired");
}

#[tokio::test]
async fn test_revoke_requires_auth_and_is_idempotent() {
    let app = test_app(test_config()).await;

    let (_, registered) = send(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(register_body("a@x.com", "29001010112345", "Tenant")),
    )
    .await;
    let access = registered["accessToken"].as_str().unwrap().to_string();
    let refresh = registered["refreshToken"].as_str().unwrap().to_string();

    // Unauthenticated revoke is rejected
    let (status, _) = send(
        &app,
        "POST",
        "/api/auth/revoke",
        None,
        Some(json!({"refreshToken": refresh})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send(
        &app,
        "POST",
        "/api/auth/revoke",
        Some(&access),
        Some(json!({"refreshToken": refresh})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    // Second revoke of the same token reports no-op, not an error
    let (status, body) = send(
        &app,
        "POST",
        "/api/auth/revoke",
        Some(&access),
        Some(json!({"refreshToken": refresh})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], false);

    // A revoked token cannot be rotated
    let (status, _) = send(
        &app,
        "POST",
        "/api/auth/refresh",
        None,
        Some(json!({"refreshToken": refresh})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_admin_verify_endpoint() {
    let app = test_app(test_config()).await;

    let (_, admin) = send(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(register_body("admin@x.com", "29001010112345", "Admin")),
    )
    .await;
    let admin_token = admin["accessToken"].as_str().unwrap().to_string();
    assert_eq!(admin["user"]["isVerified"], true);

    let (_, tenant) = send(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(register_body("tenant@x.com", "29001020112345", "Tenant")),
    )
    .await;
    let tenant_id = tenant["user"]["id"].as_str().unwrap().to_string();
    let tenant_token = tenant["accessToken"].as_str().unwrap().to_string();

    // A tenant cannot reach the admin endpoint
    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/auth/verify/{}", tenant_id),
        Some(&tenant_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Forbidden");

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/auth/verify/{}", tenant_id),
        Some(&admin_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    // Unknown account reports failure without erroring
    let (status, body) = send(
        &app,
        "POST",
        "/api/auth/verify/no-such-account",
        Some(&admin_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_profile_reflects_token_claims() {
    let app = test_app(test_config()).await;

    let (_, registered) = send(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(register_body("a@x.com", "29001010112345", "Owner")),
    )
    .await;
    let access = registered["accessToken"].as_str().unwrap().to_string();

    let (status, _) = send(&app, "GET", "/api/auth/profile", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, profile) = send(&app, "GET", "/api/auth/profile", Some(&access), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(profile["email"], "a@x.com");
    assert_eq!(profile["role"], "Owner");
    assert_eq!(profile["id"], registered["user"]["id"]);
}

#[tokio::test]
async fn test_rate_limit_returns_429() {
    let mut config = test_config();
    config.rate_limit.max_requests = 3;
    let app = test_app(config).await;

    // No peer address and no token, so all requests share one bucket
    for _ in 0..3 {
        let (status, _) = send(&app, "GET", "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
    }

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    // Throttled responses carry the window length as a Retry-After hint
    assert_eq!(
        response
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok()),
        Some("60")
    );

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["error"], "RateLimitExceeded");
}

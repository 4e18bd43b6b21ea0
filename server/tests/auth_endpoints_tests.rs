use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use rolodex_server::config::Config;
use rolodex_server::entities::password_reset_request;
use rolodex_server::web::build_router;
use sea_orm::{DatabaseConnection, EntityTrait};
use testcontainers_modules::{postgres, testcontainers};
use tower::ServiceExt;

mod common;

pub struct TestContext {
    #[allow(dead_code)] // container is kept to ensure it's not dropped
    pub container: testcontainers::ContainerAsync<postgres::Postgres>,
    pub db: DatabaseConnection,
}

async fn setup() -> anyhow::Result<TestContext> {
    let _ = tracing_subscriber::fmt().try_init();
    let container = common::setup_container().await?;
    let db = common::setup_db(&container).await?;
    Ok(TestContext { db, container })
}

fn test_config() -> Config {
    Config {
        db_url: "".to_string(),
        port: 8080,
        jwt_secret: "test_secret".to_string(),
        site_url: "http://localhost:3000".to_string(),
        allowed_origins: "http://localhost:3000".to_string(),
        billing_api_key: "test_key".to_string(),
        billing_api_url: "http://localhost:9".to_string(),
        billing_store_id: 1,
        billing_variant_id: 1,
        rate_limit_per_second: 50,
        rate_limit_burst: 100,
    }
}

async fn create_test_app() -> (axum::Router, TestContext) {
    let state = setup().await.expect("Failed to setup test context");
    let app = build_router(&test_config(), state.db.clone());
    (app, state)
}

fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// Registers and logs in, returning the session cookie pair.
async fn login(app: &axum::Router, email: &str) -> String {
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/v1/users/register",
            serde_json::json!({ "email": email, "password": "password123" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/v1/users/login",
            serde_json::json!({ "email": email, "password": "password123" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .expect("Login did not set a cookie")
        .to_str()
        .unwrap();
    set_cookie.split(';').next().unwrap().to_string()
}

#[tokio::test]
async fn can_answer_healthcheck() {
    let (app, _state) = create_test_app().await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/healthcheck")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn can_register_new_user() {
    let (app, _state) = create_test_app().await;

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/v1/users/register",
            serde_json::json!({ "email": "ada@example.com", "password": "password123" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert_eq!(body["email"], "ada@example.com");
    assert!(body["id"].is_string());
}

#[tokio::test]
async fn can_reject_duplicate_email() {
    let (app, _state) = create_test_app().await;

    let register = || {
        json_request(
            "POST",
            "/api/v1/users/register",
            serde_json::json!({ "email": "ada@example.com", "password": "password123" }),
        )
    };
    let first = app.clone().oneshot(register()).await.unwrap();
    assert_eq!(first.status(), StatusCode::CREATED);

    let second = app.oneshot(register()).await.unwrap();
    assert_eq!(second.status(), StatusCode::BAD_REQUEST);
    let body = body_json(second).await;
    assert_eq!(body["error"], "EMAIL_TAKEN");
}

#[tokio::test]
async fn can_reject_short_password() {
    let (app, _state) = create_test_app().await;

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/v1/users/register",
            serde_json::json!({ "email": "ada@example.com", "password": "short" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"], "INVALID_PASSWORD");
}

#[tokio::test]
async fn can_reject_invalid_credentials() {
    let (app, _state) = create_test_app().await;
    login(&app, "ada@example.com").await;

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/v1/users/login",
            serde_json::json!({ "email": "ada@example.com", "password": "wrong password" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["error"], "INVALID_CREDENTIALS");
}

#[tokio::test]
async fn can_require_session_for_protected_routes() {
    let (app, _state) = create_test_app().await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/contacts")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["error"], "UNAUTHORIZED");
}

#[tokio::test]
async fn can_access_protected_routes_with_session_cookie() {
    let (app, _state) = create_test_app().await;
    let cookie = login(&app, "ada@example.com").await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/contacts")
                .header(header::COOKIE, cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body, serde_json::json!([]));
}

#[tokio::test]
async fn can_echo_authenticated_user() {
    let (app, _state) = create_test_app().await;
    let cookie = login(&app, "ada@example.com").await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/users")
                .header(header::COOKIE, cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["email"], "ada@example.com");
}

#[tokio::test]
async fn can_clear_session_cookie_on_logout() {
    let (app, _state) = create_test_app().await;
    let cookie = login(&app, "ada@example.com").await;

    let response = app
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/api/v1/users/logout")
                .header(header::COOKIE, cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .expect("Logout did not clear the cookie")
        .to_str()
        .unwrap();
    assert!(set_cookie.starts_with("access_token="));
    assert!(set_cookie.contains("Max-Age=0"));
}

#[tokio::test]
async fn can_answer_reset_request_for_unknown_email_without_storing_a_row() {
    let (app, state) = create_test_app().await;

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/v1/users/password-reset",
            serde_json::json!({ "email": "nobody@example.com" }),
        ))
        .await
        .unwrap();

    // Same status and body as for a registered email, so the endpoint
    // cannot be used to enumerate accounts.
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["message"], "Password reset requested");

    let rows = password_reset_request::Entity::find()
        .all(&state.db)
        .await
        .unwrap();
    assert!(rows.is_empty());
}

#[tokio::test]
async fn can_store_reset_request_and_clear_session_for_known_email() {
    let (app, state) = create_test_app().await;
    login(&app, "ada@example.com").await;

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/v1/users/password-reset",
            serde_json::json!({ "email": "ada@example.com" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .expect("Reset request did not clear the session cookie")
        .to_str()
        .unwrap()
        .to_string();
    assert!(set_cookie.starts_with("access_token="));
    assert!(set_cookie.contains("Max-Age=0"));
    let body = body_json(response).await;
    assert_eq!(body["message"], "Password reset requested");

    let rows = password_reset_request::Entity::find()
        .all(&state.db)
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert!(!rows[0].token.is_empty());
}

#[tokio::test]
async fn can_reset_password_with_issued_token() {
    let (app, state) = create_test_app().await;
    login(&app, "ada@example.com").await;

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/v1/users/password-reset",
            serde_json::json!({ "email": "ada@example.com" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let rows = password_reset_request::Entity::find()
        .all(&state.db)
        .await
        .unwrap();
    let token = rows[0].token.clone();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("PATCH")
                .uri("/api/v1/users/password-reset")
                .header(header::CONTENT_TYPE, "application/json")
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .body(Body::from(
                    serde_json::json!({ "password": "a brand new password" }).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["message"], "Password reset successful");

    // Outstanding reset requests are consumed by a successful reset.
    let rows = password_reset_request::Entity::find()
        .all(&state.db)
        .await
        .unwrap();
    assert!(rows.is_empty());

    let old_password = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/v1/users/login",
            serde_json::json!({ "email": "ada@example.com", "password": "password123" }),
        ))
        .await
        .unwrap();
    assert_eq!(old_password.status(), StatusCode::UNAUTHORIZED);

    let new_password = app
        .oneshot(json_request(
            "POST",
            "/api/v1/users/login",
            serde_json::json!({ "email": "ada@example.com", "password": "a brand new password" }),
        ))
        .await
        .unwrap();
    assert_eq!(new_password.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn can_reject_reset_with_invalid_token() {
    let (app, _state) = create_test_app().await;
    login(&app, "ada@example.com").await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("PATCH")
                .uri("/api/v1/users/password-reset")
                .header(header::CONTENT_TYPE, "application/json")
                .header(header::AUTHORIZATION, "Bearer not-a-real-token")
                .body(Body::from(
                    serde_json::json!({ "password": "a brand new password" }).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // No Authorization header at all is rejected the same way.
    let response = app
        .oneshot(json_request(
            "PATCH",
            "/api/v1/users/password-reset",
            serde_json::json!({ "password": "a brand new password" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

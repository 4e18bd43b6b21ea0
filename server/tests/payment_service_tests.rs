use rolodex_server::payment::{PaymentService, PaymentServiceError, WebhookPayload};
use sea_orm::DatabaseConnection;
use testcontainers_modules::{postgres, testcontainers};
use uuid::Uuid;

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

fn webhook(event_name: &str, user_id: Option<Uuid>, status: &str) -> WebhookPayload {
    let mut meta = serde_json::json!({ "event_name": event_name });
    if let Some(user_id) = user_id {
        meta["custom_data"] = serde_json::json!({ "user_id": user_id });
    }
    serde_json::from_value(serde_json::json!({
        "meta": meta,
        "data": {
            "id": "555001",
            "attributes": {
                "status": status,
                "customer_id": 42,
                "order_id": 99,
                "product_name": "Pro Plan",
                "user_email": "ada@example.com",
                "renews_at": "2026-09-26T00:00:00Z",
                "ends_at": null,
                "trial_ends_at": null
            }
        }
    }))
    .expect("Failed to build webhook payload")
}

#[tokio::test]
async fn can_upsert_subscription_idempotently() {
    let state = setup().await.expect("Failed to setup test context");
    let user = common::create_user(&state.db, "ada@example.com")
        .await
        .expect("Failed to create user");
    let service = PaymentService::new(&state.db);

    let created = service
        .apply_webhook(webhook("subscription_created", Some(user.id), "on_trial"))
        .await
        .expect("Failed to apply created webhook");
    assert_eq!(created.provider_id, 555001);
    assert_eq!(created.status, "on_trial");
    assert_eq!(created.user_id, user.id);

    // A later update for the same provider id must not create a second row.
    let updated = service
        .apply_webhook(webhook("subscription_updated", Some(user.id), "active"))
        .await
        .expect("Failed to apply updated webhook");
    assert_eq!(updated.id, created.id);
    assert_eq!(updated.status, "active");

    let all = service
        .list_subscriptions(user.id)
        .await
        .expect("Failed to list subscriptions");
    assert_eq!(all.len(), 1);
}

#[tokio::test]
async fn can_mark_subscription_cancelled() {
    let state = setup().await.expect("Failed to setup test context");
    let user = common::create_user(&state.db, "ada@example.com")
        .await
        .expect("Failed to create user");
    let service = PaymentService::new(&state.db);

    service
        .apply_webhook(webhook("subscription_created", Some(user.id), "active"))
        .await
        .expect("Failed to apply created webhook");

    let cancelled = service
        .apply_webhook(webhook("subscription_cancelled", None, "cancelled"))
        .await
        .expect("Failed to apply cancelled webhook");
    assert_eq!(cancelled.status, "cancelled");
    assert!(cancelled.ends_at.is_some());

    let active = service
        .find_active_subscription(user.id)
        .await
        .expect("Failed to query active subscription");
    assert!(active.is_none());
}

#[tokio::test]
async fn can_reject_unsupported_webhook_events() {
    let state = setup().await.expect("Failed to setup test context");
    let service = PaymentService::new(&state.db);

    let result = service
        .apply_webhook(webhook("order_refunded", None, "refunded"))
        .await;
    assert!(matches!(
        result,
        Err(PaymentServiceError::UnsupportedEvent(_))
    ));
}

#[tokio::test]
async fn can_reject_first_sighting_without_user_id() {
    let state = setup().await.expect("Failed to setup test context");
    let service = PaymentService::new(&state.db);

    let result = service
        .apply_webhook(webhook("subscription_created", None, "active"))
        .await;
    assert!(matches!(result, Err(PaymentServiceError::MissingUserId)));
}

#[tokio::test]
async fn can_reject_checkout_while_subscription_active() {
    let state = setup().await.expect("Failed to setup test context");
    let user = common::create_user(&state.db, "ada@example.com")
        .await
        .expect("Failed to create user");
    let service = PaymentService::new(&state.db);

    service
        .apply_webhook(webhook("subscription_created", Some(user.id), "active"))
        .await
        .expect("Failed to apply created webhook");

    let billing = rolodex_server::payment::BillingClient::new(&test_billing_config());
    let result = service.checkout(&billing, user.id, &user.email).await;
    assert!(matches!(result, Err(PaymentServiceError::AlreadySubscribed)));
}

#[tokio::test]
async fn can_reject_cancel_without_active_subscription() {
    let state = setup().await.expect("Failed to setup test context");
    let user = common::create_user(&state.db, "ada@example.com")
        .await
        .expect("Failed to create user");
    let service = PaymentService::new(&state.db);

    let billing = rolodex_server::payment::BillingClient::new(&test_billing_config());
    let result = service.cancel(&billing, user.id).await;
    assert!(matches!(
        result,
        Err(PaymentServiceError::NoActiveSubscription)
    ));
}

fn test_billing_config() -> rolodex_server::config::Config {
    rolodex_server::config::Config {
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

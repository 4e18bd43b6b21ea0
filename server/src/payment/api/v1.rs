use crate::auth::CurrentUser;
use crate::entities::subscription;
use crate::payment::{PaymentService, PaymentServiceError, PaymentState, WebhookPayload};
use crate::web::api::ErrorResponse;
use axum::{
    Json, Router,
    extract::{Extension, State},
    http::StatusCode,
    routing::{get, post},
};
use chrono::{DateTime, FixedOffset};
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

/// JSON representation of a subscription.
#[derive(Debug, Serialize, ToSchema)]
pub struct SubscriptionJson {
    pub id: Uuid,
    pub name: String,
    pub status: String,
    pub renews_at: Option<DateTime<FixedOffset>>,
    pub ends_at: Option<DateTime<FixedOffset>>,
    pub trial_ends_at: Option<DateTime<FixedOffset>>,
}

impl From<subscription::Model> for SubscriptionJson {
    fn from(model: subscription::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            status: model.status,
            renews_at: model.renews_at,
            ends_at: model.ends_at,
            trial_ends_at: model.trial_ends_at,
        }
    }
}

/// JSON response carrying a hosted checkout URL.
#[derive(Debug, Serialize, ToSchema)]
pub struct CheckoutResponse {
    pub url: String,
}

/// Generic message body for the webhook endpoint.
#[derive(Debug, Serialize, ToSchema)]
pub struct WebhookResponse {
    pub message: String,
}

/// Creates the public payment router. The webhook is called by the billing
/// provider, not by a logged-in browser.
pub fn create_public_router(state: Arc<PaymentState>) -> Router {
    Router::new()
        .route("/payments/webhook", post(webhook_handler))
        .with_state(state)
}

/// Creates the session-protected payment router.
pub fn create_protected_router(state: Arc<PaymentState>) -> Router {
    Router::new()
        .route("/payments", get(list_payments_handler))
        .route("/payments/checkout", post(checkout_handler))
        .route("/payments/cancel", post(cancel_handler))
        .with_state(state)
}

/// Maps a payment service error onto a JSON error response.
fn payment_error_response(err: PaymentServiceError) -> (StatusCode, Json<ErrorResponse>) {
    match err {
        PaymentServiceError::AlreadySubscribed => (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new(
                "ALREADY_SUBSCRIBED",
                "An active subscription already exists",
            )),
        ),
        PaymentServiceError::NoActiveSubscription => (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new(
                "NO_ACTIVE_SUBSCRIPTION",
                "No active subscription to cancel",
            )),
        ),
        err => {
            tracing::error!("Payment operation failed: {}", err);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::new(
                    "INTERNAL_ERROR",
                    "An unexpected error occurred while processing your request. Please try again later.",
                )),
            )
        }
    }
}

/// Handler for POST /api/v1/payments/webhook. Provider lifecycle events land
/// here; any processing failure is reported as a 500 without detail.
#[tracing::instrument(skip(state, payload))]
#[utoipa::path(
    post,
    path = "/api/v1/payments/webhook",
    responses(
        (status = 200, description = "Webhook applied", body = WebhookResponse),
        (status = 500, description = "Webhook could not be processed", body = ErrorResponse)
    ),
    tag = "Payments"
)]
pub async fn webhook_handler(
    State(state): State<Arc<PaymentState>>,
    Json(payload): Json<WebhookPayload>,
) -> Result<Json<WebhookResponse>, (StatusCode, Json<ErrorResponse>)> {
    let service = PaymentService::new(&state.db);
    service.apply_webhook(payload).await.map_err(|err| {
        tracing::error!("Webhook processing failed: {}", err);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse::new(
                "WEBHOOK_ERROR",
                "Error processing webhook",
            )),
        )
    })?;

    Ok(Json(WebhookResponse {
        message: "Webhook received".to_string(),
    }))
}

/// Handler for GET /api/v1/payments.
#[tracing::instrument(skip(state, current_user))]
#[utoipa::path(
    get,
    path = "/api/v1/payments",
    responses(
        (status = 200, description = "The caller's subscriptions", body = [SubscriptionJson]),
        (status = 401, description = "No valid session", body = ErrorResponse)
    ),
    tag = "Payments"
)]
pub async fn list_payments_handler(
    State(state): State<Arc<PaymentState>>,
    Extension(current_user): Extension<CurrentUser>,
) -> Result<Json<Vec<SubscriptionJson>>, (StatusCode, Json<ErrorResponse>)> {
    let service = PaymentService::new(&state.db);
    let subscriptions = service
        .list_subscriptions(current_user.id)
        .await
        .map_err(payment_error_response)?;
    Ok(Json(
        subscriptions.into_iter().map(SubscriptionJson::from).collect(),
    ))
}

/// Handler for POST /api/v1/payments/checkout.
#[tracing::instrument(skip(state, current_user))]
#[utoipa::path(
    post,
    path = "/api/v1/payments/checkout",
    responses(
        (status = 200, description = "Hosted checkout created", body = CheckoutResponse),
        (status = 400, description = "An active subscription already exists", body = ErrorResponse)
    ),
    tag = "Payments"
)]
pub async fn checkout_handler(
    State(state): State<Arc<PaymentState>>,
    Extension(current_user): Extension<CurrentUser>,
) -> Result<Json<CheckoutResponse>, (StatusCode, Json<ErrorResponse>)> {
    let service = PaymentService::new(&state.db);
    let url = service
        .checkout(&state.billing, current_user.id, &current_user.email)
        .await
        .map_err(payment_error_response)?;
    Ok(Json(CheckoutResponse { url }))
}

/// Handler for POST /api/v1/payments/cancel.
#[tracing::instrument(skip(state, current_user))]
#[utoipa::path(
    post,
    path = "/api/v1/payments/cancel",
    responses(
        (status = 200, description = "Subscription cancelled", body = SubscriptionJson),
        (status = 400, description = "No active subscription", body = ErrorResponse)
    ),
    tag = "Payments"
)]
pub async fn cancel_handler(
    State(state): State<Arc<PaymentState>>,
    Extension(current_user): Extension<CurrentUser>,
) -> Result<Json<SubscriptionJson>, (StatusCode, Json<ErrorResponse>)> {
    let service = PaymentService::new(&state.db);
    let subscription = service
        .cancel(&state.billing, current_user.id)
        .await
        .map_err(payment_error_response)?;
    Ok(Json(SubscriptionJson::from(subscription)))
}

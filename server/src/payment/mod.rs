use crate::config::Config;
use crate::entities::*;
use chrono::{DateTime, FixedOffset, Utc};
use sea_orm::*;
use serde::Deserialize;
use utoipa::ToSchema;
use std::sync::Arc;
use uuid::Uuid;

pub mod api;

/// Subscription statuses that grant access. Anything else (cancelled,
/// expired, unpaid) counts as inactive.
const ACTIVE_STATUSES: [&str; 2] = ["active", "on_trial"];

/// Shared state for payment routers.
#[derive(Clone)]
pub struct PaymentState {
    pub db: Arc<sea_orm::DatabaseConnection>,
    pub billing: BillingClient,
}

impl PaymentState {
    pub fn new(db: Arc<sea_orm::DatabaseConnection>, config: &Config) -> Self {
        Self {
            db,
            billing: BillingClient::new(config),
        }
    }
}

/// Error type for calls against the billing provider's API.
#[derive(Debug, thiserror::Error)]
pub enum BillingError {
    /// Represents a transport-level failure talking to the provider.
    #[error("Billing API request failed: {0}")]
    Request(#[from] reqwest::Error),
    /// Represents a non-success status from the provider.
    #[error("Billing API returned status {0}")]
    Api(reqwest::StatusCode),
    /// Represents a checkout response without the expected URL.
    #[error("Billing API response carried no checkout URL")]
    MissingCheckoutUrl,
}

/// Thin client for the billing provider's JSON:API. Only the two calls the
/// server needs: creating a hosted checkout and cancelling a subscription.
#[derive(Clone)]
pub struct BillingClient {
    http: reqwest::Client,
    api_url: String,
    api_key: String,
    store_id: i64,
    variant_id: i64,
    site_url: String,
}

impl BillingClient {
    pub fn new(config: &Config) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_url: config.billing_api_url.clone(),
            api_key: config.billing_api_key.clone(),
            store_id: config.billing_store_id,
            variant_id: config.billing_variant_id,
            site_url: config.site_url.clone(),
        }
    }

    /// Creates a hosted checkout for the configured store and variant,
    /// embedding the user id as custom data so the webhook can attribute the
    /// resulting subscription. Returns the checkout URL.
    #[tracing::instrument(skip(self))]
    pub async fn create_checkout(
        &self,
        user_id: Uuid,
        email: &str,
    ) -> Result<String, BillingError> {
        let body = serde_json::json!({
            "data": {
                "type": "checkouts",
                "attributes": {
                    "checkout_data": {
                        "email": email,
                        "custom": { "user_id": user_id.to_string() }
                    },
                    "product_options": {
                        "redirect_url": self.site_url,
                        "receipt_button_text": "Go back",
                        "receipt_thank_you_note": "Thank you for signing up!"
                    }
                },
                "relationships": {
                    "store": {
                        "data": { "type": "stores", "id": self.store_id.to_string() }
                    },
                    "variant": {
                        "data": { "type": "variants", "id": self.variant_id.to_string() }
                    }
                }
            }
        });

        let response = self
            .http
            .post(format!("{}/checkouts", self.api_url))
            .header("Accept", "application/vnd.api+json")
            .header("Content-Type", "application/vnd.api+json")
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(BillingError::Api(response.status()));
        }

        let json: serde_json::Value = response.json().await?;
        json.pointer("/data/attributes/url")
            .and_then(|url| url.as_str())
            .map(str::to_string)
            .ok_or(BillingError::MissingCheckoutUrl)
    }

    /// Cancels a subscription on the provider side by its provider id.
    #[tracing::instrument(skip(self))]
    pub async fn cancel_subscription(&self, provider_id: i64) -> Result<(), BillingError> {
        let response = self
            .http
            .delete(format!("{}/subscriptions/{}", self.api_url, provider_id))
            .header("Accept", "application/vnd.api+json")
            .bearer_auth(&self.api_key)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(BillingError::Api(response.status()));
        }
        Ok(())
    }
}

/// Webhook envelope sent by the billing provider.
#[derive(Debug, Deserialize, ToSchema)]
pub struct WebhookPayload {
    pub meta: WebhookMeta,
    pub data: WebhookData,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct WebhookMeta {
    pub event_name: String,
    pub custom_data: Option<WebhookCustomData>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct WebhookCustomData {
    pub user_id: Uuid,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct WebhookData {
    /// Provider subscription id, serialized as a string in the envelope.
    pub id: String,
    pub attributes: WebhookAttributes,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct WebhookAttributes {
    pub status: String,
    pub customer_id: i64,
    pub order_id: i64,
    pub product_name: Option<String>,
    pub user_email: Option<String>,
    pub renews_at: Option<DateTime<FixedOffset>>,
    pub ends_at: Option<DateTime<FixedOffset>>,
    pub trial_ends_at: Option<DateTime<FixedOffset>>,
}

/// Error type for PaymentService operations.
#[derive(Debug, thiserror::Error)]
pub enum PaymentServiceError {
    /// Represents a checkout attempt while a subscription is already active.
    #[error("An active subscription already exists")]
    AlreadySubscribed,
    /// Represents a cancel attempt without an active subscription.
    #[error("No active subscription")]
    NoActiveSubscription,
    /// Represents a webhook for a subscription that was never recorded.
    #[error("Subscription with provider ID {0} not found")]
    SubscriptionNotFound(i64),
    /// Represents a webhook event this server does not handle.
    #[error("Unsupported webhook event '{0}'")]
    UnsupportedEvent(String),
    /// Represents a webhook whose subscription id is not numeric.
    #[error("Invalid provider subscription ID '{0}'")]
    InvalidProviderId(String),
    /// Represents a webhook without the user id custom data.
    #[error("Webhook carried no user ID")]
    MissingUserId,
    /// Represents a failure talking to the billing provider.
    #[error(transparent)]
    Billing(#[from] BillingError),
    /// Represents a database error.
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),
}

pub struct PaymentService<'a> {
    db: &'a sea_orm::DatabaseConnection,
}

impl PaymentService<'_> {
    pub fn new(db: &sea_orm::DatabaseConnection) -> PaymentService {
        PaymentService { db }
    }

    /// Retrieves all subscriptions recorded for the user, newest renewal first.
    #[tracing::instrument(skip(self))]
    pub async fn list_subscriptions(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<subscription::Model>, PaymentServiceError> {
        let subscriptions = subscription::Entity::find()
            .filter(subscription::Column::UserId.eq(user_id))
            .order_by_desc(subscription::Column::RenewsAt)
            .all(self.db)
            .await?;
        Ok(subscriptions)
    }

    /// Retrieves the user's active subscription, if any.
    #[tracing::instrument(skip(self))]
    pub async fn find_active_subscription(
        &self,
        user_id: Uuid,
    ) -> Result<Option<subscription::Model>, PaymentServiceError> {
        let subscription = subscription::Entity::find()
            .filter(subscription::Column::UserId.eq(user_id))
            .filter(subscription::Column::Status.is_in(ACTIVE_STATUSES))
            .one(self.db)
            .await?;
        Ok(subscription)
    }

    /// Starts a checkout for the user. Rejected when an active subscription
    /// already exists; otherwise returns the provider's checkout URL.
    #[tracing::instrument(skip(self, billing))]
    pub async fn checkout(
        &self,
        billing: &BillingClient,
        user_id: Uuid,
        email: &str,
    ) -> Result<String, PaymentServiceError> {
        if self.find_active_subscription(user_id).await?.is_some() {
            return Err(PaymentServiceError::AlreadySubscribed);
        }
        let url = billing.create_checkout(user_id, email).await?;
        Ok(url)
    }

    /// Cancels the user's active subscription on the provider side and marks
    /// the local row cancelled with ends_at = now.
    #[tracing::instrument(skip(self, billing))]
    pub async fn cancel(
        &self,
        billing: &BillingClient,
        user_id: Uuid,
    ) -> Result<subscription::Model, PaymentServiceError> {
        let subscription = self
            .find_active_subscription(user_id)
            .await?
            .ok_or(PaymentServiceError::NoActiveSubscription)?;

        billing.cancel_subscription(subscription.provider_id).await?;

        let mut active_model: subscription::ActiveModel = subscription.into();
        active_model.status = ActiveValue::Set("cancelled".to_string());
        active_model.ends_at = ActiveValue::Set(Some(Utc::now().into()));
        let updated = active_model.update(self.db).await?;
        Ok(updated)
    }

    /// Applies a provider lifecycle event. Created/updated events upsert the
    /// subscription row keyed on the provider id; cancelled marks it
    /// cancelled; anything else is rejected.
    #[tracing::instrument(skip(self, payload), fields(event = %payload.meta.event_name))]
    pub async fn apply_webhook(
        &self,
        payload: WebhookPayload,
    ) -> Result<subscription::Model, PaymentServiceError> {
        let provider_id: i64 = payload
            .data
            .id
            .parse()
            .map_err(|_| PaymentServiceError::InvalidProviderId(payload.data.id.clone()))?;

        match payload.meta.event_name.as_str() {
            "subscription_created" | "subscription_updated" => {
                self.upsert_subscription(provider_id, &payload).await
            }
            "subscription_cancelled" => self.mark_cancelled(provider_id).await,
            other => Err(PaymentServiceError::UnsupportedEvent(other.to_string())),
        }
    }

    async fn upsert_subscription(
        &self,
        provider_id: i64,
        payload: &WebhookPayload,
    ) -> Result<subscription::Model, PaymentServiceError> {
        let attributes = &payload.data.attributes;
        let existing = subscription::Entity::find()
            .filter(subscription::Column::ProviderId.eq(provider_id))
            .one(self.db)
            .await?;

        let subscription = match existing {
            Some(subscription) => {
                let mut active_model: subscription::ActiveModel = subscription.into();
                active_model.status = ActiveValue::Set(attributes.status.clone());
                active_model.renews_at = ActiveValue::Set(attributes.renews_at);
                active_model.ends_at = ActiveValue::Set(attributes.ends_at);
                active_model.trial_ends_at = ActiveValue::Set(attributes.trial_ends_at);
                active_model.update(self.db).await?
            }
            None => {
                let user_id = payload
                    .meta
                    .custom_data
                    .as_ref()
                    .map(|custom| custom.user_id)
                    .ok_or(PaymentServiceError::MissingUserId)?;
                subscription::ActiveModel {
                    id: ActiveValue::Set(Uuid::new_v4()),
                    provider_id: ActiveValue::Set(provider_id),
                    customer_id: ActiveValue::Set(attributes.customer_id),
                    order_id: ActiveValue::Set(attributes.order_id),
                    name: ActiveValue::Set(
                        attributes.product_name.clone().unwrap_or_default(),
                    ),
                    email: ActiveValue::Set(
                        attributes.user_email.clone().unwrap_or_default(),
                    ),
                    status: ActiveValue::Set(attributes.status.clone()),
                    renews_at: ActiveValue::Set(attributes.renews_at),
                    ends_at: ActiveValue::Set(attributes.ends_at),
                    trial_ends_at: ActiveValue::Set(attributes.trial_ends_at),
                    user_id: ActiveValue::Set(user_id),
                }
                .insert(self.db)
                .await?
            }
        };
        Ok(subscription)
    }

    async fn mark_cancelled(
        &self,
        provider_id: i64,
    ) -> Result<subscription::Model, PaymentServiceError> {
        let subscription = subscription::Entity::find()
            .filter(subscription::Column::ProviderId.eq(provider_id))
            .one(self.db)
            .await?
            .ok_or(PaymentServiceError::SubscriptionNotFound(provider_id))?;

        let mut active_model: subscription::ActiveModel = subscription.into();
        active_model.status = ActiveValue::Set("cancelled".to_string());
        active_model.ends_at = ActiveValue::Set(Some(Utc::now().into()));
        let updated = active_model.update(self.db).await?;
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn can_parse_webhook_envelope() {
        let payload: WebhookPayload = serde_json::from_str(
            r#"{
                "meta": {
                    "event_name": "subscription_created",
                    "custom_data": { "user_id": "8f14e45f-ceea-4e07-8c6c-0d6f9fb7b001" }
                },
                "data": {
                    "id": "123456",
                    "attributes": {
                        "status": "on_trial",
                        "customer_id": 42,
                        "order_id": 99,
                        "product_name": "Pro Plan",
                        "user_email": "user@example.com",
                        "renews_at": "2026-09-01T00:00:00Z",
                        "ends_at": null,
                        "trial_ends_at": "2026-08-15T00:00:00Z"
                    }
                }
            }"#,
        )
        .unwrap();

        assert_eq!(payload.meta.event_name, "subscription_created");
        assert_eq!(payload.data.id, "123456");
        assert_eq!(payload.data.attributes.status, "on_trial");
        assert_eq!(payload.data.attributes.customer_id, 42);
        assert!(payload.data.attributes.renews_at.is_some());
        assert!(payload.data.attributes.ends_at.is_none());
    }

    #[test]
    fn can_parse_webhook_without_custom_data() {
        let payload: WebhookPayload = serde_json::from_str(
            r#"{
                "meta": { "event_name": "subscription_cancelled" },
                "data": {
                    "id": "123456",
                    "attributes": {
                        "status": "cancelled",
                        "customer_id": 42,
                        "order_id": 99,
                        "product_name": null,
                        "user_email": null,
                        "renews_at": null,
                        "ends_at": "2026-08-26T00:00:00Z",
                        "trial_ends_at": null
                    }
                }
            }"#,
        )
        .unwrap();

        assert!(payload.meta.custom_data.is_none());
        assert_eq!(payload.meta.event_name, "subscription_cancelled");
    }
}

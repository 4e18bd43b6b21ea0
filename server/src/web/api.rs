use std::sync::Arc;

use crate::{
    auth::{self, AuthState, auth_user_middleware},
    contact::{self, ContactState},
    group::{self, GroupState},
    payment::{self, PaymentState},
    profile::{self, ProfileState},
};

use axum::{
    Router,
    middleware::{from_fn, from_fn_with_state},
};
use serde::{Deserialize, Serialize};
use tower::ServiceBuilder;
use utoipa::{OpenApi, ToSchema};

/// JSON body returned for every API error: a stable machine-readable code
/// and a human-readable message.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(error: &str, message: &str) -> Self {
        Self {
            error: error.to_string(),
            message: message.to_string(),
        }
    }
}

/// Creates the API routes for JSON API endpoints. Public routes are the
/// credential endpoints and the billing webhook; everything else requires a
/// session.
pub fn create_api_router(
    auth_state: Arc<AuthState>,
    contact_state: Arc<ContactState>,
    group_state: Arc<GroupState>,
    profile_state: Arc<ProfileState>,
    payment_state: Arc<PaymentState>,
) -> Router {
    let public_routes = Router::new()
        .merge(auth::api::v1::create_public_router(auth_state.clone()))
        .merge(payment::api::v1::create_public_router(payment_state.clone()));

    let protected_routes = Router::new()
        .merge(auth::api::v1::create_protected_router(auth_state.clone()))
        .merge(contact::api::v1::create_contact_router(contact_state))
        .merge(group::api::v1::create_group_router(group_state))
        .merge(profile::api::v1::create_profile_router(profile_state))
        .merge(payment::api::v1::create_protected_router(payment_state))
        .layer(
            ServiceBuilder::new().layer(from_fn(auth::api::v1::require_auth_middleware)),
        );

    let api_routes = public_routes.merge(protected_routes);
    Router::new()
        .nest("/api/v1", api_routes)
        .layer(ServiceBuilder::new().layer(from_fn_with_state(auth_state, auth_user_middleware)))
}

#[derive(OpenApi)]
#[openapi(
    paths(
        auth::api::v1::register_handler,
        auth::api::v1::login_handler,
        auth::api::v1::logout_handler,
        auth::api::v1::me_handler,
        auth::api::v1::request_password_reset_handler,
        auth::api::v1::reset_password_handler,
        contact::api::v1::list_contacts_handler,
        contact::api::v1::get_contact_handler,
        contact::api::v1::create_contact_handler,
        contact::api::v1::update_contact_handler,
        contact::api::v1::create_note_handler,
        contact::api::v1::create_task_handler,
        contact::api::v1::update_task_handler,
        contact::api::v1::add_groups_handler,
        contact::api::v1::remove_group_handler,
        group::api::v1::list_groups_handler,
        group::api::v1::create_group_handler,
        profile::api::v1::get_profile_handler,
        profile::api::v1::update_profile_handler,
        payment::api::v1::webhook_handler,
        payment::api::v1::list_payments_handler,
        payment::api::v1::checkout_handler,
        payment::api::v1::cancel_handler,
    ),
    components(schemas(
        ErrorResponse,
        auth::api::v1::UserJson,
        auth::api::v1::RegisterRequest,
        auth::api::v1::LoginRequest,
        auth::api::v1::LoginResponse,
        auth::api::v1::PasswordResetRequestBody,
        auth::api::v1::ResetPasswordRequest,
        auth::api::v1::MessageResponse,
        contact::api::v1::ContactJson,
        contact::api::v1::ContactDetailJson,
        contact::api::v1::GroupRefJson,
        contact::api::v1::TaskJson,
        contact::api::v1::HistoryEventJson,
        contact::api::v1::CreateContactRequest,
        contact::api::v1::UpdateContactRequest,
        contact::api::v1::CreateNoteRequest,
        contact::api::v1::CreateTaskRequest,
        contact::api::v1::UpdateTaskRequest,
        contact::api::v1::AddGroupsRequest,
        group::api::v1::GroupJson,
        group::api::v1::CreateGroupRequest,
        profile::api::v1::ProfileJson,
        profile::api::v1::UpdateProfileRequest,
        payment::api::v1::SubscriptionJson,
        payment::api::v1::CheckoutResponse,
        payment::api::v1::WebhookResponse,
        crate::entities::contact_task::TaskStatus,
        crate::entities::contact_history_event::ContactHistoryEventType,
    )),
    tags(
        (name = "Users", description = "Registration, login, and sessions"),
        (name = "Contacts", description = "Contacts with tasks, notes, groups, and history"),
        (name = "Groups", description = "Contact groups"),
        (name = "Profiles", description = "User profiles"),
        (name = "Payments", description = "Subscriptions and billing")
    )
)]
pub struct ApiDoc;

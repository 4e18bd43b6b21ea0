use crate::auth::{
    AuthState, CurrentUser, UserService, UserServiceError, decode_jwt, encode_jwt,
    expired_session_cookie, session_cookie,
};
use crate::entities::user;
use crate::web::api::ErrorResponse;
use axum::{
    Json, Router,
    extract::{Extension, Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
};
use axum_extra::extract::CookieJar;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

/// Minimum accepted password length for registration and resets.
const MIN_PASSWORD_LENGTH: usize = 8;

/// JSON representation of a user for API responses.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UserJson {
    /// Unique identifier of the user
    pub id: Uuid,
    /// Email address the user registered with
    pub email: String,
}

impl From<user::Model> for UserJson {
    fn from(model: user::Model) -> Self {
        Self {
            id: model.id,
            email: model.email,
        }
    }
}

/// JSON request payload for registration.
#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
}

/// JSON request payload for login.
#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// JSON response for a successful login.
#[derive(Debug, Serialize, ToSchema)]
pub struct LoginResponse {
    pub user: UserJson,
    pub access_token: String,
}

/// JSON request payload for requesting a password reset.
#[derive(Debug, Deserialize, ToSchema)]
pub struct PasswordResetRequestBody {
    pub email: String,
}

/// JSON request payload for completing a password reset.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ResetPasswordRequest {
    pub password: String,
}

/// Generic message body for endpoints without a richer response.
#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: &str) -> Self {
        Self {
            message: message.to_string(),
        }
    }
}

/// Creates the public authentication router (no session required).
pub fn create_public_router(state: Arc<AuthState>) -> Router {
    Router::new()
        .route("/users/register", post(register_handler))
        .route("/users/login", post(login_handler))
        .route(
            "/users/password-reset",
            post(request_password_reset_handler).patch(reset_password_handler),
        )
        .with_state(state)
}

/// Creates the session-protected user router.
pub fn create_protected_router(state: Arc<AuthState>) -> Router {
    Router::new()
        .route("/users", get(me_handler))
        .route("/users/logout", delete(logout_handler))
        .with_state(state)
}

/// Middleware that ensures the current user is authenticated.
/// Returns UNAUTHORIZED if the CurrentUser extension is not found in the request.
/// This middleware should be applied after auth_user_middleware.
pub async fn require_auth_middleware(request: Request, next: Next) -> Response {
    let is_authenticated = request.extensions().get::<CurrentUser>().is_some();

    if !is_authenticated {
        let error_response = ErrorResponse::new(
            "UNAUTHORIZED",
            "Authentication required to access this resource",
        );
        return (StatusCode::UNAUTHORIZED, Json(error_response)).into_response();
    }

    next.run(request).await
}

/// Maps a user service error onto a JSON error response.
fn user_error_response(err: UserServiceError) -> (StatusCode, Json<ErrorResponse>) {
    match err {
        UserServiceError::EmailTaken(_) => (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new("EMAIL_TAKEN", "Couldn't create user")),
        ),
        UserServiceError::InvalidCredentials => (
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse::new(
                "INVALID_CREDENTIALS",
                "Invalid email or password",
            )),
        ),
        UserServiceError::UserNotFound => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse::new("USER_NOT_FOUND", "User not found")),
        ),
        err => {
            tracing::error!("User operation failed: {}", err);
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

/// Handler for POST /api/v1/users/register.
#[tracing::instrument(skip(state, payload))]
#[utoipa::path(
    post,
    path = "/api/v1/users/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User created", body = UserJson),
        (status = 400, description = "Email taken or password too short", body = ErrorResponse)
    ),
    tag = "Users"
)]
pub async fn register_handler(
    State(state): State<Arc<AuthState>>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<UserJson>), (StatusCode, Json<ErrorResponse>)> {
    if payload.password.len() < MIN_PASSWORD_LENGTH {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new(
                "INVALID_PASSWORD",
                "Password must be at least 8 characters",
            )),
        ));
    }

    let service = UserService::new(&state.db);
    let user = service
        .register(&payload.email, &payload.password)
        .await
        .map_err(user_error_response)?;

    Ok((StatusCode::CREATED, Json(UserJson::from(user))))
}

/// Handler for POST /api/v1/users/login. Sets the session cookie on success.
#[tracing::instrument(skip(state, jar, payload))]
#[utoipa::path(
    post,
    path = "/api/v1/users/login",
    request_body = LoginRequest,
    responses(
        (status = 201, description = "Logged in, session cookie set", body = LoginResponse),
        (status = 401, description = "Invalid credentials", body = ErrorResponse)
    ),
    tag = "Users"
)]
pub async fn login_handler(
    State(state): State<Arc<AuthState>>,
    jar: CookieJar,
    Json(payload): Json<LoginRequest>,
) -> Result<(StatusCode, CookieJar, Json<LoginResponse>), (StatusCode, Json<ErrorResponse>)> {
    let service = UserService::new(&state.db);
    let user = service
        .verify_credentials(&payload.email, &payload.password)
        .await
        .map_err(user_error_response)?;

    let token = encode_jwt(user.id, &user.email, &state.jwt_secret, chrono::Duration::days(7))
        .await
        .map_err(|err| {
            tracing::error!("Failed to issue session token: {}", err);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::new(
                    "JWT_ERROR",
                    "Failed to generate authentication token",
                )),
            )
        })?;

    let updated_jar = jar.add(session_cookie(token.clone()));
    Ok((
        StatusCode::CREATED,
        updated_jar,
        Json(LoginResponse {
            user: UserJson::from(user),
            access_token: token,
        }),
    ))
}

/// Handler for DELETE /api/v1/users/logout. Clears the session cookie.
#[tracing::instrument(skip(jar))]
#[utoipa::path(
    delete,
    path = "/api/v1/users/logout",
    responses((status = 204, description = "Session cookie cleared")),
    tag = "Users"
)]
pub async fn logout_handler(jar: CookieJar) -> (StatusCode, CookieJar) {
    (StatusCode::NO_CONTENT, jar.add(expired_session_cookie()))
}

/// Handler for GET /api/v1/users. Echoes the authenticated user.
#[tracing::instrument(skip(current_user))]
#[utoipa::path(
    get,
    path = "/api/v1/users",
    responses(
        (status = 200, description = "The authenticated user", body = UserJson),
        (status = 401, description = "No valid session", body = ErrorResponse)
    ),
    tag = "Users"
)]
pub async fn me_handler(Extension(current_user): Extension<CurrentUser>) -> Json<UserJson> {
    Json(UserJson {
        id: current_user.id,
        email: current_user.email,
    })
}

/// Handler for POST /api/v1/users/password-reset.
/// Always answers with the same message so the endpoint cannot be used to
/// probe which emails are registered.
#[tracing::instrument(skip(state, jar, payload))]
#[utoipa::path(
    post,
    path = "/api/v1/users/password-reset",
    request_body = PasswordResetRequestBody,
    responses(
        (status = 200, description = "Reset requested; same body whether or not the email is registered", body = MessageResponse)
    ),
    tag = "Users"
)]
pub async fn request_password_reset_handler(
    State(state): State<Arc<AuthState>>,
    jar: CookieJar,
    Json(payload): Json<PasswordResetRequestBody>,
) -> Result<(CookieJar, Json<MessageResponse>), (StatusCode, Json<ErrorResponse>)> {
    let service = UserService::new(&state.db);
    let user = service
        .find_by_email(&payload.email)
        .await
        .map_err(user_error_response)?;

    let Some(user) = user else {
        tracing::info!("Password reset requested for unknown email");
        return Ok((jar, Json(MessageResponse::new("Password reset requested"))));
    };

    let token = encode_jwt(user.id, &user.email, &state.jwt_secret, chrono::Duration::hours(1))
        .await
        .map_err(|err| {
            tracing::error!("Failed to issue reset token: {}", err);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::new(
                    "JWT_ERROR",
                    "Failed to generate reset token",
                )),
            )
        })?;

    service
        .create_password_reset(user.id, token)
        .await
        .map_err(user_error_response)?;

    let updated_jar = jar.add(expired_session_cookie());
    Ok((
        updated_jar,
        Json(MessageResponse::new("Password reset requested")),
    ))
}

/// Handler for PATCH /api/v1/users/password-reset. The reset token is carried
/// as an Authorization Bearer header.
#[tracing::instrument(skip(state, headers, jar, payload))]
#[utoipa::path(
    patch,
    path = "/api/v1/users/password-reset",
    request_body = ResetPasswordRequest,
    responses(
        (status = 200, description = "Password replaced, reset requests cleared", body = MessageResponse),
        (status = 400, description = "Password too short", body = ErrorResponse),
        (status = 401, description = "Missing or invalid reset token", body = ErrorResponse)
    ),
    tag = "Users"
)]
pub async fn reset_password_handler(
    State(state): State<Arc<AuthState>>,
    headers: HeaderMap,
    jar: CookieJar,
    Json(payload): Json<ResetPasswordRequest>,
) -> Result<(CookieJar, Json<MessageResponse>), (StatusCode, Json<ErrorResponse>)> {
    let token = headers
        .get("authorization")
        .and_then(|header| header.to_str().ok())
        .and_then(|header| header.strip_prefix("Bearer "))
        .ok_or_else(|| {
            (
                StatusCode::UNAUTHORIZED,
                Json(ErrorResponse::new(
                    "UNAUTHORIZED",
                    "Authorization Required",
                )),
            )
        })?;

    let claims = decode_jwt(token, &state.jwt_secret).await.map_err(|_| {
        (
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse::new("UNAUTHORIZED", "Invalid reset token")),
        )
    })?;

    if payload.password.len() < MIN_PASSWORD_LENGTH {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new(
                "INVALID_PASSWORD",
                "Password must be at least 8 characters",
            )),
        ));
    }

    let service = UserService::new(&state.db);
    service
        .reset_password(&claims.email, &payload.password)
        .await
        .map_err(user_error_response)?;

    let updated_jar = jar.add(expired_session_cookie());
    Ok((
        updated_jar,
        Json(MessageResponse::new("Password reset successful")),
    ))
}

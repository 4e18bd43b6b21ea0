use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng};
use argon2::Argon2;
use axum::extract::{MatchedPath, Request, State};
use axum::middleware::Next;
use axum::response::Response;
use axum_extra::extract::CookieJar;
use axum_extra::extract::cookie::{Cookie, SameSite};
use jsonwebtoken::encode;
use sea_orm::*;
use std::sync::Arc;
use tower_http::trace::MakeSpan;
use tracing::Span;
use uuid::Uuid;

use crate::config::Config;
use crate::entities::*;

pub mod api;

/// Name of the cookie carrying the session JWT.
pub const ACCESS_TOKEN_COOKIE: &str = "access_token";

/// Represents the currently authenticated user.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: Uuid,
    pub email: String,
}

impl CurrentUser {
    /// Creates a new CurrentUser instance.
    pub fn new(id: Uuid, email: String) -> Self {
        Self { id, email }
    }
}

/// Authentication state containing the database handle and JWT secret.
#[derive(Clone)]
pub struct AuthState {
    pub db: Arc<sea_orm::DatabaseConnection>,
    pub jwt_secret: String,
}

impl AuthState {
    /// Creates a new AuthState from the application config.
    pub fn new(db: Arc<sea_orm::DatabaseConnection>, config: &Config) -> Self {
        Self {
            db,
            jwt_secret: config.jwt_secret.clone(),
        }
    }
}

#[derive(serde::Serialize, serde::Deserialize, Debug)]
pub struct Claims {
    pub exp: usize,    // Expiry time of the token
    pub iat: usize,    // Issued at time of the token
    pub sub: String,   // User ID of the authenticated user
    pub email: String, // Email of the authenticated user
}

/// Authentication middleware that checks for a valid JWT in the session cookie
/// and sets the CurrentUser extension. It does not reject requests on its own.
pub async fn auth_user_middleware(
    State(state): State<Arc<AuthState>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    if let Some(token_cookie) = jar.get(ACCESS_TOKEN_COOKIE) {
        if let Ok(claims) = decode_jwt(token_cookie.value(), &state.jwt_secret).await {
            if let Ok(id) = Uuid::parse_str(&claims.sub) {
                request
                    .extensions_mut()
                    .insert(CurrentUser::new(id, claims.email));
            }
        }
    }

    next.run(request).await
}

pub async fn encode_jwt(
    user_id: Uuid,
    email: &str,
    jwt_secret: &str,
    ttl: chrono::Duration,
) -> anyhow::Result<String> {
    let now = chrono::Utc::now();
    let exp = (now + ttl).timestamp() as usize;
    let iat = now.timestamp() as usize;
    let claims = Claims {
        exp,
        iat,
        sub: user_id.to_string(),
        email: email.to_string(),
    };
    let jwt = encode(
        &jsonwebtoken::Header::default(),
        &claims,
        &jsonwebtoken::EncodingKey::from_secret(jwt_secret.as_bytes()),
    )?;
    Ok(jwt)
}

pub async fn decode_jwt(token: &str, jwt_secret: &str) -> anyhow::Result<Claims> {
    let token_data = jsonwebtoken::decode(
        token,
        &jsonwebtoken::DecodingKey::from_secret(jwt_secret.as_bytes()),
        &jsonwebtoken::Validation::default(),
    )?;
    Ok(token_data.claims)
}

/// Builds the session cookie carrying a freshly issued JWT.
pub fn session_cookie(token: String) -> Cookie<'static> {
    Cookie::build((ACCESS_TOKEN_COOKIE, token))
        .http_only(true)
        .secure(false) // Set to true in production with HTTPS
        .same_site(SameSite::Lax)
        .max_age(time::Duration::days(7))
        .path("/")
        .build()
}

/// Builds an expired session cookie so the client drops its copy.
pub fn expired_session_cookie() -> Cookie<'static> {
    Cookie::build((ACCESS_TOKEN_COOKIE, ""))
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::ZERO)
        .path("/")
        .build()
}

/// Error type for UserService operations.
#[derive(Debug, thiserror::Error)]
pub enum UserServiceError {
    /// Represents a registration attempt with an email that is already taken.
    #[error("A user with email '{0}' already exists")]
    EmailTaken(String),
    /// Represents a failed credential check. Deliberately does not say which part failed.
    #[error("Invalid email or password")]
    InvalidCredentials,
    /// Represents a user lookup that found nothing.
    #[error("User not found")]
    UserNotFound,
    /// Represents a failure in the password hashing backend.
    #[error("Password hashing failed")]
    PasswordHash,
    /// Represents a database error.
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),
}

pub struct UserService<'a> {
    db: &'a sea_orm::DatabaseConnection,
}

impl UserService<'_> {
    pub fn new(db: &sea_orm::DatabaseConnection) -> UserService {
        UserService { db }
    }

    /// Registers a new user and its empty profile row.
    ///
    /// # Returns
    ///
    /// A `Result` containing the created user model, or `EmailTaken` when the
    /// email is already registered.
    #[tracing::instrument(skip(self, password))]
    pub async fn register(
        &self,
        email: &str,
        password: &str,
    ) -> Result<user::Model, UserServiceError> {
        if self.find_by_email(email).await?.is_some() {
            return Err(UserServiceError::EmailTaken(email.to_string()));
        }

        let hashed = hash_password(password)?;
        let created_user = user::ActiveModel {
            id: ActiveValue::Set(Uuid::new_v4()),
            email: ActiveValue::Set(email.to_string()),
            password: ActiveValue::Set(hashed),
            ..Default::default()
        }
        .insert(self.db)
        .await?;

        user_profile::ActiveModel {
            id: ActiveValue::Set(Uuid::new_v4()),
            user_id: ActiveValue::Set(created_user.id),
            ..Default::default()
        }
        .insert(self.db)
        .await?;

        Ok(created_user)
    }

    /// Checks a login attempt against the stored argon2 hash.
    #[tracing::instrument(skip(self, password))]
    pub async fn verify_credentials(
        &self,
        email: &str,
        password: &str,
    ) -> Result<user::Model, UserServiceError> {
        let user = self
            .find_by_email(email)
            .await?
            .ok_or(UserServiceError::InvalidCredentials)?;

        if !verify_password(&user.password, password) {
            return Err(UserServiceError::InvalidCredentials);
        }

        Ok(user)
    }

    #[tracing::instrument(skip(self))]
    pub async fn find_by_email(&self, email: &str) -> Result<Option<user::Model>, UserServiceError> {
        let user = user::Entity::find()
            .filter(user::Column::Email.eq(email))
            .one(self.db)
            .await?;
        Ok(user)
    }

    /// Stores a password reset request for the given user.
    #[tracing::instrument(skip(self, token))]
    pub async fn create_password_reset(
        &self,
        user_id: Uuid,
        token: String,
    ) -> Result<password_reset_request::Model, UserServiceError> {
        let request = password_reset_request::ActiveModel {
            id: ActiveValue::Set(Uuid::new_v4()),
            token: ActiveValue::Set(token),
            user_id: ActiveValue::Set(user_id),
            ..Default::default()
        }
        .insert(self.db)
        .await?;
        Ok(request)
    }

    /// Replaces the user's password hash and clears any outstanding reset requests.
    #[tracing::instrument(skip(self, new_password))]
    pub async fn reset_password(
        &self,
        email: &str,
        new_password: &str,
    ) -> Result<user::Model, UserServiceError> {
        let user = self
            .find_by_email(email)
            .await?
            .ok_or(UserServiceError::UserNotFound)?;

        let mut active_model: user::ActiveModel = user.into();
        active_model.password = ActiveValue::Set(hash_password(new_password)?);
        let updated_user = active_model.update(self.db).await?;

        password_reset_request::Entity::delete_many()
            .filter(password_reset_request::Column::UserId.eq(updated_user.id))
            .exec(self.db)
            .await?;

        Ok(updated_user)
    }
}

/// Hashes a password with argon2 and a fresh random salt.
pub fn hash_password(password: &str) -> Result<String, UserServiceError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|_| UserServiceError::PasswordHash)?;
    Ok(hash.to_string())
}

/// Verifies a password against a stored argon2 PHC string.
pub fn verify_password(stored_hash: &str, password: &str) -> bool {
    PasswordHash::new(stored_hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

/// Custom span maker that filters sensitive data from credential-bearing requests.
/// This implementation avoids logging request bodies and cookies for those routes.
#[derive(Clone, Debug)]
pub struct FilteredMakeSpan;

const SENSITIVE_PATHS: [&str; 3] = [
    "/api/v1/users/login",
    "/api/v1/users/register",
    "/api/v1/users/password-reset",
];

impl<B> MakeSpan<B> for FilteredMakeSpan {
    fn make_span(&mut self, request: &axum::http::Request<B>) -> Span {
        let uri = request.uri();
        let method = request.method();
        let matched_path = request
            .extensions()
            .get::<MatchedPath>()
            .map(MatchedPath::as_str);

        // For credential routes, create a span without sensitive data
        if SENSITIVE_PATHS.contains(&uri.path()) {
            tracing::info_span!(
                "request",
                method = %method,
                uri = %uri,
                matched_path,
                sensitive_route = true,
                // Explicitly omit headers, cookies, and body for these requests
            )
        } else {
            tracing::info_span!(
                "request",
                method = %method,
                uri = %uri,
                matched_path,
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn can_round_trip_jwt_claims() {
        let user_id = Uuid::new_v4();
        let token = encode_jwt(user_id, "user@example.com", "test_secret", chrono::Duration::days(7))
            .await
            .unwrap();

        let claims = decode_jwt(&token, "test_secret").await.unwrap();
        assert_eq!(claims.sub, user_id.to_string());
        assert_eq!(claims.email, "user@example.com");
        assert!(claims.exp > claims.iat);
    }

    #[tokio::test]
    async fn can_reject_jwt_with_wrong_secret() {
        let token = encode_jwt(
            Uuid::new_v4(),
            "user@example.com",
            "test_secret",
            chrono::Duration::days(7),
        )
        .await
        .unwrap();

        assert!(decode_jwt(&token, "other_secret").await.is_err());
    }

    #[test]
    fn can_verify_hashed_password() {
        let hash = hash_password("correct horse battery staple").unwrap();
        assert!(verify_password(&hash, "correct horse battery staple"));
        assert!(!verify_password(&hash, "wrong password"));
    }

    #[test]
    fn can_reject_malformed_stored_hash() {
        assert!(!verify_password("not-a-phc-string", "anything"));
    }

    #[test]
    fn session_cookie_is_http_only_and_scoped_to_root() {
        let cookie = session_cookie("token".to_string());
        assert_eq!(cookie.name(), ACCESS_TOKEN_COOKIE);
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.max_age(), Some(time::Duration::days(7)));
    }

    #[test]
    fn expired_session_cookie_has_zero_max_age() {
        let cookie = expired_session_cookie();
        assert_eq!(cookie.max_age(), Some(time::Duration::ZERO));
    }
}

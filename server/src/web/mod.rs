use axum::Json;
use axum::http::{HeaderValue, Method, header};
use axum::middleware::from_fn_with_state;
use axum::routing::get;
use migration::MigratorTrait;
use sea_orm::Database;
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::sensitive_headers::SetSensitiveRequestHeadersLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::auth::{AuthState, FilteredMakeSpan};
use crate::config::{self, Config};
use crate::contact::ContactState;
use crate::group::GroupState;
use crate::payment::PaymentState;
use crate::profile::ProfileState;

pub mod api;
pub mod rate_limit;

/// Binds the listener, connects the database, runs migrations, and serves
/// the app until shutdown.
#[tracing::instrument(skip(config))]
pub async fn start_web_server(config: config::Config) -> anyhow::Result<()> {
    let server_address = format!("0.0.0.0:{}", &config.port);
    let listener = tokio::net::TcpListener::bind(&server_address).await?;
    tracing::info!("Web server running on http://{}", server_address);

    let db = Database::connect(&config.db_url).await?;
    migration::Migrator::up(&db, None).await?;
    tracing::info!("Database migrations applied successfully");

    let app = build_router(&config, db);
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;
    Ok(())
}

/// Assembles the full application router: the JSON API, the healthcheck,
/// Swagger UI, and the outer middleware stack.
pub fn build_router(config: &Config, db: sea_orm::DatabaseConnection) -> axum::Router {
    let db = Arc::new(db);
    let auth_state = Arc::new(AuthState::new(db.clone(), config));
    let contact_state = Arc::new(ContactState { db: db.clone() });
    let group_state = Arc::new(GroupState { db: db.clone() });
    let profile_state = Arc::new(ProfileState { db: db.clone() });
    let payment_state = Arc::new(PaymentState::new(db, config));
    let rate_limit_state = Arc::new(rate_limit::RateLimitState::new(
        config.rate_limit_per_second,
        config.rate_limit_burst,
    ));

    axum::Router::new()
        .route("/healthcheck", get(healthcheck_handler))
        .merge(api::create_api_router(
            auth_state,
            contact_state,
            group_state,
            profile_state,
            payment_state,
        ))
        .merge(
            SwaggerUi::new("/swagger-ui")
                .url("/api-docs/openapi.json", api::ApiDoc::openapi()),
        )
        .layer(
            ServiceBuilder::new()
                .layer(from_fn_with_state(
                    rate_limit_state,
                    rate_limit::rate_limit_middleware,
                ))
                .layer(TraceLayer::new_for_http().make_span_with(FilteredMakeSpan))
                .layer(SetSensitiveRequestHeadersLayer::new([
                    header::COOKIE,
                    header::AUTHORIZATION,
                ]))
                .layer(cors_layer(config)),
        )
}

/// CORS restricted to the configured origins, with credentials allowed so the
/// session cookie survives cross-origin requests from the frontend.
fn cors_layer(config: &Config) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .origins()
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true)
}

#[tracing::instrument]
pub async fn healthcheck_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

use rolodex_server::profile::{ProfileService, ProfileServiceError};
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

#[tokio::test]
async fn can_find_empty_profile_created_on_registration() {
    let state = setup().await.expect("Failed to setup test context");
    let user = common::create_user(&state.db, "ada@example.com")
        .await
        .expect("Failed to create user");
    let service = ProfileService::new(&state.db);

    let profile = service
        .get_profile(user.id)
        .await
        .expect("Failed to get profile");
    assert_eq!(profile.user_id, user.id);
    assert!(profile.name.is_none());
    assert!(profile.bio.is_none());
}

#[tokio::test]
async fn can_patch_only_provided_profile_fields() {
    let state = setup().await.expect("Failed to setup test context");
    let user = common::create_user(&state.db, "ada@example.com")
        .await
        .expect("Failed to create user");
    let service = ProfileService::new(&state.db);

    service
        .update_profile(user.id, Some("Ada".to_string()), Some("Analyst".to_string()))
        .await
        .expect("Failed to update profile");

    // Patching only the bio leaves the name alone.
    let profile = service
        .update_profile(user.id, None, Some("Mathematician".to_string()))
        .await
        .expect("Failed to update profile");
    assert_eq!(profile.name.as_deref(), Some("Ada"));
    assert_eq!(profile.bio.as_deref(), Some("Mathematician"));
}

#[tokio::test]
async fn can_handle_missing_profile() {
    let state = setup().await.expect("Failed to setup test context");
    let service = ProfileService::new(&state.db);

    let result = service.get_profile(Uuid::new_v4()).await;
    assert!(matches!(result, Err(ProfileServiceError::ProfileNotFound)));
}

use rolodex_server::group::GroupService;
use sea_orm::DatabaseConnection;
use testcontainers_modules::{postgres, testcontainers};

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
async fn can_list_groups_ordered_by_name() {
    let state = setup().await.expect("Failed to setup test context");
    let user = common::create_user(&state.db, "ada@example.com")
        .await
        .expect("Failed to create user");
    let service = GroupService::new(&state.db);

    for name in ["Work", "Family", "Friends"] {
        service
            .create_group(user.id, name.to_string())
            .await
            .expect("Failed to create group");
    }

    let groups = service
        .list_groups(user.id)
        .await
        .expect("Failed to list groups");
    let names: Vec<&str> = groups.iter().map(|group| group.name.as_str()).collect();
    assert_eq!(names, vec!["Family", "Friends", "Work"]);
}

#[tokio::test]
async fn can_scope_groups_to_their_owner() {
    let state = setup().await.expect("Failed to setup test context");
    let owner = common::create_user(&state.db, "ada@example.com")
        .await
        .expect("Failed to create user");
    let stranger = common::create_user(&state.db, "grace@example.com")
        .await
        .expect("Failed to create user");
    let service = GroupService::new(&state.db);

    service
        .create_group(owner.id, "Friends".to_string())
        .await
        .expect("Failed to create group");

    let groups = service
        .list_groups(stranger.id)
        .await
        .expect("Failed to list groups");
    assert!(groups.is_empty());
}

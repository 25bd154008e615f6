mod common;

use common::DatabaseTestWrapper;
use sqlx::Row as _;

#[tokio::test]
async fn sqlite_pool_bootstraps_schema() {
    let mut wrapper = DatabaseTestWrapper::new().await;

    let row = sqlx::query("SELECT COUNT(*) AS count FROM pending_event")
        .fetch_one(&mut *wrapper.connection)
        .await
        .expect("pending_event table should exist after bootstrap");

    let count: i64 = row.get("count");
    assert_eq!(count, 0);
}

#[tokio::test]
async fn sqlite_pool_bootstrap_is_idempotent() {
    let mut first = DatabaseTestWrapper::new().await;
    let mut second = DatabaseTestWrapper::new().await;

    for wrapper in [&mut first, &mut second] {
        sqlx::query("INSERT INTO entity (entity_id, record_count, relation_count, modified_at) VALUES (1, 0, 0, '2024-01-01T00:00:00Z')")
            .execute(&mut *wrapper.connection)
            .await
            .expect("insert should succeed against a freshly bootstrapped schema");
    }
}

use std::collections::BTreeSet;

use mart_engine::scope::{SourceScope, SourceScopeMode};
use mart_store::{DatabaseConnectionInfo, DatabasePoolConfig, DatabaseType, SqliteStorePool, StorePool};
use sqlx::Row as _;
use tempfile::NamedTempFile;

async fn fresh_pool() -> (NamedTempFile, SqliteStorePool) {
    let db_file = NamedTempFile::new().expect("scratch db");
    let info = DatabaseConnectionInfo::new(
        DatabaseType::Sqlite,
        String::new(),
        String::new(),
        String::new(),
        0,
        db_file.path().display().to_string(),
    );
    let pool = SqliteStorePool::new(&info, &DatabasePoolConfig::default())
        .await
        .expect("open scratch db");
    (db_file, pool)
}

#[tokio::test]
async fn materialize_inserts_zero_rows_for_a_configured_but_empty_source() {
    let (_db, pool) = fresh_pool().await;
    let scope = SourceScope::new(pool.as_pool().clone());

    let configured: BTreeSet<String> = ["FOO", "BAR"].into_iter().map(ToOwned::to_owned).collect();
    let materialized = scope
        .materialize(SourceScopeMode::AllWithDefault, &configured, &BTreeSet::new())
        .await
        .unwrap();
    assert_eq!(materialized, 6, "3 DSS statistics x 2 sources");

    let mut conn = pool.as_pool().acquire().await.unwrap();
    let row = sqlx::query(
        "SELECT entity_count, record_count, relation_count FROM report_counter \
         WHERE report_key = 'DSS:ENTITY_COUNT:FOO'",
    )
    .fetch_one(&mut *conn)
    .await
    .unwrap();
    assert_eq!(row.get::<i64, _>("entity_count"), 0);
    assert_eq!(row.get::<i64, _>("record_count"), 0);
    assert_eq!(row.get::<i64, _>("relation_count"), 0);
}

#[tokio::test]
async fn materialize_never_clobbers_an_existing_counter() {
    let (_db, pool) = fresh_pool().await;
    let mut conn = pool.as_pool().acquire().await.unwrap();
    sqlx::query(
        "INSERT INTO report_counter (report_key, entity_count, record_count, relation_count) \
         VALUES ('DSS:ENTITY_COUNT:FOO', 7, 3, 0)",
    )
    .execute(&mut *conn)
    .await
    .unwrap();
    drop(conn);

    let scope = SourceScope::new(pool.as_pool().clone());
    let configured: BTreeSet<String> = ["FOO"].into_iter().map(ToOwned::to_owned).collect();
    scope
        .materialize(SourceScopeMode::AllWithDefault, &configured, &BTreeSet::new())
        .await
        .unwrap();

    let mut conn = pool.as_pool().acquire().await.unwrap();
    let row = sqlx::query("SELECT entity_count FROM report_counter WHERE report_key = 'DSS:ENTITY_COUNT:FOO'")
        .fetch_one(&mut *conn)
        .await
        .unwrap();
    assert_eq!(row.get::<i64, _>("entity_count"), 7, "an existing row must not be overwritten");
}

#[tokio::test]
async fn all_but_default_excludes_template_defaults() {
    let (_db, pool) = fresh_pool().await;
    let scope = SourceScope::new(pool.as_pool().clone());

    let configured: BTreeSet<String> = ["FOO", "TEST", "SEARCH"].into_iter().map(ToOwned::to_owned).collect();
    let resolved = scope
        .resolve(SourceScopeMode::AllButDefault, &configured, &BTreeSet::new())
        .await
        .unwrap();
    assert_eq!(resolved, BTreeSet::from(["FOO".to_owned()]));
}

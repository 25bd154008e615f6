use std::collections::BTreeMap;

use mart_engine::{StaticErEngineClient};
use mart_store::{DatabaseConnectionInfo, DatabasePoolConfig, DatabaseType, SqliteStorePool, StorePool};
use mart_types::{EntityCore, MatchType, Record, RecordKey, RelatedEntity, ResolvedEntity};
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

fn entity(id: i64, records: &[(&str, &str, Option<&str>, Option<&str>)]) -> ResolvedEntity {
    let records = records
        .iter()
        .map(|(ds, rid, mk, p)| Record::new(RecordKey::new((*ds).to_owned(), (*rid).to_owned()), *mk, *p))
        .collect();
    ResolvedEntity::new(EntityCore::new(id, None, records), Vec::new()).unwrap()
}

async fn record_count(pool: &SqliteStorePool, entity_id: i64) -> i64 {
    let mut conn = pool.as_pool().acquire().await.unwrap();
    sqlx::query("SELECT COUNT(*) AS c FROM record WHERE entity_id = ?")
        .bind(entity_id)
        .fetch_one(&mut *conn)
        .await
        .unwrap()
        .get::<i64, _>("c")
}

#[tokio::test]
async fn scenario_a_single_record_sets_unmatched_and_entity_count() {
    let (_db, pool) = fresh_pool().await;
    let client = StaticErEngineClient::new(BTreeMap::from([(
        1,
        entity(1, &[("FOO", "1", Some("NAME+DOB"), Some("CNAME_CFF_EXACT"))]),
    )]));

    let updates = mart_engine::diff::refresh(&pool.as_pool().clone(), &client, 1)
        .await
        .unwrap();

    assert_eq!(record_count(&pool, 1).await, 1);
    assert!(updates
        .iter()
        .any(|u| u.report_key.format().starts_with("DSS:ENTITY_COUNT") && u.entity_delta == 1));
    assert!(updates
        .iter()
        .any(|u| u.report_key.format().starts_with("DSS:UNMATCHED_COUNT") && u.entity_delta == 1));
}

#[tokio::test]
async fn scenario_b_merge_clears_unmatched_and_sets_matched() {
    let (_db, pool) = fresh_pool().await;
    let client = StaticErEngineClient::new(BTreeMap::from([(
        1,
        entity(1, &[("FOO", "1", None, None)]),
    )]));
    mart_engine::diff::refresh(&pool.as_pool().clone(), &client, 1).await.unwrap();

    client.set(entity(1, &[("FOO", "1", None, None), ("FOO", "2", None, None)]));
    let updates = mart_engine::diff::refresh(&pool.as_pool().clone(), &client, 1)
        .await
        .unwrap();

    assert_eq!(record_count(&pool, 1).await, 2);
    assert!(updates
        .iter()
        .any(|u| u.report_key.format().starts_with("DSS:UNMATCHED_COUNT") && u.entity_delta == -1));
    assert!(updates
        .iter()
        .any(|u| u.report_key.format().starts_with("CSS:MATCHED_COUNT") && u.entity_delta == 1));
}

#[tokio::test]
async fn scenario_e_duplicate_delivery_is_idempotent() {
    let (_db, pool) = fresh_pool().await;
    let client = StaticErEngineClient::new(BTreeMap::from([(
        1,
        entity(1, &[("FOO", "1", None, None)]),
    )]));

    mart_engine::diff::refresh(&pool.as_pool().clone(), &client, 1).await.unwrap();
    let second = mart_engine::diff::refresh(&pool.as_pool().clone(), &client, 1)
        .await
        .unwrap();

    assert!(second.is_empty(), "replaying the same state should emit no deltas");
    assert_eq!(record_count(&pool, 1).await, 1);
}

#[tokio::test]
async fn scenario_c_relationship_written_once_regardless_of_arrival_order() {
    let (_db, pool) = fresh_pool().await;

    let related_to_2 = RelatedEntity {
        entity: entity(2, &[("BAR", "1", None, None)]).entity,
        match_type: MatchType::PossibleRelation,
        match_key: "PHONE".to_owned(),
        principle: "SF1".to_owned(),
    };
    let entity_1 = ResolvedEntity::new(
        entity(1, &[("FOO", "1", None, None)]).entity,
        vec![related_to_2],
    )
    .unwrap();

    let related_to_1 = RelatedEntity {
        entity: entity(1, &[("FOO", "1", None, None)]).entity,
        match_type: MatchType::PossibleRelation,
        match_key: "PHONE".to_owned(),
        principle: "SF1".to_owned(),
    };
    let entity_2 = ResolvedEntity::new(
        entity(2, &[("BAR", "1", None, None)]).entity,
        vec![related_to_1],
    )
    .unwrap();

    let client = StaticErEngineClient::new(BTreeMap::from([(1, entity_1), (2, entity_2)]));

    let updates_from_lo = mart_engine::diff::refresh(&pool.as_pool().clone(), &client, 1)
        .await
        .unwrap();
    let updates_from_hi = mart_engine::diff::refresh(&pool.as_pool().clone(), &client, 2)
        .await
        .unwrap();

    let mut conn = pool.as_pool().acquire().await.unwrap();
    let row = sqlx::query("SELECT COUNT(*) AS c FROM relationship WHERE lo_entity_id = 1 AND hi_entity_id = 2")
        .fetch_one(&mut *conn)
        .await
        .unwrap();
    assert_eq!(row.get::<i64, _>("c"), 1);

    // Only the hi-side (entity 2) refresh should have contributed the
    // relationship-level counter deltas; the lo-side refresh must not emit a
    // second copy, or the journal fold would double-count the pair.
    assert!(
        !updates_from_lo
            .iter()
            .any(|u| u.report_key.format().starts_with("CSS:POSSIBLE_RELATION_COUNT")),
        "lo-side refresh must not emit relationship-level counter deltas"
    );
    let unqualified: Vec<_> = updates_from_hi
        .iter()
        .filter(|u| u.report_key.format() == "CSS:POSSIBLE_RELATION_COUNT:FOO:BAR")
        .collect();
    assert_eq!(unqualified.len(), 1, "the pair must be counted exactly once");
    assert_eq!(unqualified[0].relation_delta, 1);

    mart_engine::journal::apply_batch(&pool.as_pool().clone(), 100)
        .await
        .unwrap();
    let counter = sqlx::query(
        "SELECT relation_count FROM report_counter WHERE report_key = 'CSS:POSSIBLE_RELATION_COUNT:FOO:BAR'",
    )
    .fetch_one(&mut *conn)
    .await
    .unwrap();
    assert_eq!(counter.get::<i64, _>("relation_count"), 1);
}

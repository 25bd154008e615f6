use mart_pagination::{BoundType, PaginationEngine};
use mart_store::{DatabaseConnectionInfo, DatabasePoolConfig, DatabaseType, SqliteStorePool, StorePool};
use mart_types::{BaseStatistic, ReportCode, ReportKey, ReportStatistic};
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

fn entity_count_key() -> ReportKey {
    ReportKey::new(
        ReportCode::Dss,
        ReportStatistic::new(BaseStatistic::EntityCount, None, None),
        Some("FOO".to_owned()),
        None,
    )
    .unwrap()
}

async fn seed_entities(pool: &SqliteStorePool, report_key: &str, entity_ids: impl Iterator<Item = i64>) {
    let mut conn = pool.as_pool().acquire().await.unwrap();
    for id in entity_ids {
        sqlx::query("INSERT INTO report_detail (report_key, entity_id, related_id) VALUES (?, ?, NULL)")
            .bind(report_key)
            .bind(id)
            .execute(&mut *conn)
            .await
            .unwrap();
    }
}

#[tokio::test]
async fn scenario_f_pagination_covers_the_full_set_exactly_once() {
    let (_db, pool) = fresh_pool().await;
    let key = entity_count_key();
    seed_entities(&pool, &key.format(), 1..=17).await;

    let engine = PaginationEngine::new(pool.as_pool().clone());

    let first = engine
        .entity_page(&key, Some("0"), BoundType::InclusiveLower, Some(5), None)
        .await
        .unwrap();
    assert_eq!(first.items, vec![1, 2, 3, 4, 5]);
    assert_eq!(first.before_page_count, 0);
    assert_eq!(first.after_page_count, 12);
    assert_eq!(first.total_count, 17);
    assert_eq!(first.page_min, Some(1));
    assert_eq!(first.page_max, Some(5));

    let mut seen = first.items.clone();
    let mut bound = first.page_max.unwrap() + 1;
    loop {
        let page = engine
            .entity_page(&key, Some(&bound.to_string()), BoundType::InclusiveLower, Some(5), None)
            .await
            .unwrap();
        if page.items.is_empty() {
            break;
        }
        seen.extend(page.items.iter().copied());
        bound = page.page_max.unwrap() + 1;
    }

    seen.sort_unstable();
    assert_eq!(seen, (1..=17).collect::<Vec<_>>());
}

#[tokio::test]
async fn upper_bound_scan_returns_ascending_order_closest_to_bound_last() {
    let (_db, pool) = fresh_pool().await;
    let key = entity_count_key();
    seed_entities(&pool, &key.format(), 1..=10).await;

    let engine = PaginationEngine::new(pool.as_pool().clone());
    let page = engine
        .entity_page(&key, Some("7"), BoundType::InclusiveUpper, Some(3), None)
        .await
        .unwrap();

    assert_eq!(page.items, vec![5, 6, 7]);
    assert_eq!(page.before_page_count, 4);
    assert_eq!(page.after_page_count, 3);
}

#[tokio::test]
async fn sample_size_must_be_smaller_than_page_size() {
    let (_db, pool) = fresh_pool().await;
    let key = entity_count_key();
    let engine = PaginationEngine::new(pool.as_pool().clone());

    let err = engine
        .entity_page(&key, None, BoundType::InclusiveLower, Some(5), Some(5))
        .await
        .unwrap_err();
    assert!(matches!(err.current_context(), mart_pagination::PaginationError::MalformedInput(_)));
}

#[tokio::test]
async fn sampled_page_draws_from_the_unsampled_window() {
    let (_db, pool) = fresh_pool().await;
    let key = entity_count_key();
    seed_entities(&pool, &key.format(), 1..=20).await;

    let engine = PaginationEngine::new(pool.as_pool().clone());
    let page = engine
        .entity_page(&key, Some("0"), BoundType::InclusiveLower, Some(10), Some(3))
        .await
        .unwrap();

    assert_eq!(page.items.len(), 3);
    assert!(page.items.iter().all(|id| (1..=10).contains(id)));
    assert!(page.overall_min.is_none());
    assert!(page.overall_max.is_none());
}

#[tokio::test]
async fn non_integer_bound_is_rejected() {
    let (_db, pool) = fresh_pool().await;
    let key = entity_count_key();
    let engine = PaginationEngine::new(pool.as_pool().clone());

    let err = engine
        .entity_page(&key, Some("not-a-number"), BoundType::InclusiveLower, None, None)
        .await
        .unwrap_err();
    assert!(matches!(err.current_context(), mart_pagination::PaginationError::MalformedInput(_)));
}

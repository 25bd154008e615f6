use std::time::Duration as StdDuration;

use chrono::Duration;
use mart_queue::EventQueue;
use mart_store::{DatabaseConnectionInfo, DatabasePoolConfig, DatabaseType, SqliteStorePool};
use tempfile::NamedTempFile;

async fn fresh_queue() -> (NamedTempFile, EventQueue<SqliteStorePool>) {
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
    (db_file, EventQueue::new(pool))
}

#[tokio::test]
async fn enqueue_then_lease_returns_payload() {
    let (_db, queue) = fresh_queue().await;

    let id = queue.enqueue("{\"dataSource\":\"SF1\"}").await.unwrap();
    assert!(id > 0);

    let leased = queue.lease_batch(10, Duration::seconds(30)).await.unwrap();
    assert_eq!(leased.len(), 1);
    assert_eq!(leased[0].id, id);
    assert_eq!(leased[0].payload, "{\"dataSource\":\"SF1\"}");
}

#[tokio::test]
async fn leased_row_is_not_leased_again_until_expiry() {
    let (_db, queue) = fresh_queue().await;
    queue.enqueue("a").await.unwrap();

    let first = queue.lease_batch(10, Duration::seconds(30)).await.unwrap();
    assert_eq!(first.len(), 1);

    let second = queue.lease_batch(10, Duration::seconds(30)).await.unwrap();
    assert!(second.is_empty());
}

#[tokio::test]
async fn ack_with_correct_lease_removes_row() {
    let (_db, queue) = fresh_queue().await;
    queue.enqueue("a").await.unwrap();
    let leased = queue.lease_batch(10, Duration::seconds(30)).await.unwrap();

    let acked = queue.ack(leased[0].id, &leased[0].lease_id).await.unwrap();
    assert!(acked);

    let relaunched = queue.lease_batch(10, Duration::seconds(30)).await.unwrap();
    assert!(relaunched.is_empty());
}

#[tokio::test]
async fn ack_with_stale_lease_is_a_no_op() {
    let (_db, queue) = fresh_queue().await;
    queue.enqueue("a").await.unwrap();
    let leased = queue.lease_batch(10, Duration::seconds(30)).await.unwrap();

    let acked = queue.ack(leased[0].id, "not-the-real-lease").await.unwrap();
    assert!(!acked);
}

#[tokio::test]
async fn expired_lease_is_reclaimed_and_eligible_again() {
    let (_db, queue) = fresh_queue().await;
    queue.enqueue("a").await.unwrap();

    let first = queue
        .lease_batch(10, Duration::milliseconds(-1))
        .await
        .unwrap();
    assert_eq!(first.len(), 1);

    tokio::time::sleep(StdDuration::from_millis(5)).await;

    let second = queue.lease_batch(10, Duration::seconds(30)).await.unwrap();
    assert_eq!(second.len(), 1, "an already-expired lease should be reclaimed and re-leased");
}

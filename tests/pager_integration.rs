//! Pager completeness and failure behaviour against a scripted store and SQLite

mod common;

use common::{manual_clock, sqlite_storage, visit, FakeStorage};
use footfall::analytics::Pager;
use footfall::clock::Clock;
use footfall::models::VisitFilter;
use footfall::storage::{Storage, StorageError};
use std::sync::Arc;

const PAGE_SIZE: i64 = 10;

#[tokio::test]
async fn test_pager_returns_every_record_across_pages() {
    let clock = manual_clock();
    let store = Arc::new(FakeStorage::new(clock.clone()));
    store.seed("/a", (2 * PAGE_SIZE + 7) as usize);

    let pager = Pager::new(store.clone(), PAGE_SIZE);
    let records = pager.fetch_all(&VisitFilter::all()).await.unwrap();

    assert_eq!(records.len(), 27);
    assert_eq!(store.fetch_calls(), 3);
    assert_eq!(store.page_sizes(), vec![10, 10, 7]);

    // Insertion order is preserved across page boundaries
    let ids: Vec<i64> = records.iter().map(|r| r.id).collect();
    assert_eq!(ids, (1..=27).collect::<Vec<_>>());
}

#[tokio::test]
async fn test_pager_exact_multiple_needs_trailing_empty_page() {
    let clock = manual_clock();
    let store = Arc::new(FakeStorage::new(clock.clone()));
    store.seed("/a", 20);

    let records = Pager::new(store.clone(), PAGE_SIZE)
        .fetch_all(&VisitFilter::all())
        .await
        .unwrap();

    assert_eq!(records.len(), 20);
    assert_eq!(store.page_sizes(), vec![10, 10, 0]);
}

#[tokio::test]
async fn test_pager_empty_store() {
    let clock = manual_clock();
    let store = Arc::new(FakeStorage::new(clock.clone()));

    let records = Pager::new(store.clone(), PAGE_SIZE)
        .fetch_all(&VisitFilter::all())
        .await
        .unwrap();

    assert!(records.is_empty());
    assert_eq!(store.fetch_calls(), 1);
}

#[tokio::test]
async fn test_pager_aborts_when_second_page_fails() {
    let clock = manual_clock();
    let store = Arc::new(FakeStorage::new(clock.clone()).failing_on_fetch(2));
    store.seed("/a", 25);

    let result = Pager::new(store.clone(), PAGE_SIZE)
        .fetch_all(&VisitFilter::all())
        .await;

    assert!(matches!(result, Err(StorageError::Other(_))));
    // No third fetch after the failure
    assert_eq!(store.fetch_calls(), 2);
}

#[tokio::test]
async fn test_pager_applies_filter() {
    let clock = manual_clock();
    let store = Arc::new(FakeStorage::new(clock.clone()));
    store.seed("/a", 15);
    store.seed("/b", 4);
    store.seed("/a", 3);

    let records = Pager::new(store.clone(), PAGE_SIZE)
        .fetch_all(&VisitFilter::for_path("/a"))
        .await
        .unwrap();

    assert_eq!(records.len(), 18);
    assert!(records.iter().all(|r| r.path == "/a"));
}

#[tokio::test]
async fn test_pager_over_sqlite() {
    let clock = manual_clock();
    let storage = sqlite_storage(clock.clone() as Arc<dyn Clock>).await;

    for i in 0..(2 * PAGE_SIZE + 7) {
        let path = if i % 3 == 0 { "/even" } else { "/odd" };
        storage
            .append(&visit(path, &format!("v{i}")))
            .await
            .unwrap();
    }

    let pager = Pager::new(storage.clone(), PAGE_SIZE);
    let all = pager.fetch_all(&VisitFilter::all()).await.unwrap();
    assert_eq!(all.len(), 27);
    assert!(all.windows(2).all(|w| w[0].id < w[1].id));

    let even = pager.fetch_all(&VisitFilter::for_path("/even")).await.unwrap();
    assert_eq!(even.len(), 9);
}

#[tokio::test]
async fn test_pager_clamps_page_size_to_one() {
    let clock = manual_clock();
    let store = Arc::new(FakeStorage::new(clock.clone()));
    store.seed("/a", 2);

    let pager = Pager::new(store.clone(), 0);
    assert_eq!(pager.page_size(), 1);

    let records = pager.fetch_all(&VisitFilter::all()).await.unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(store.page_sizes(), vec![1, 1, 0]);
}

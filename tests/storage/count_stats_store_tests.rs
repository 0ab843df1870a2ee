//! CountStatsStore interface tests.
//!
//! These tests verify the contract of the CountStatsStore trait.
//! Each storage implementation should run these tests. Reference ids are
//! prefixed per test so one store instance can run them all.

use inkpost::domain::{CountStats, CountStatsType};
use inkpost::storage::{CountStatsStore, StorageError};

fn ids(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

async fn count_of<S: CountStatsStore>(
    store: &S,
    stats_type: CountStatsType,
    id: &str,
) -> Option<i64> {
    store
        .get_by_reference_ids_and_type(&ids(&[id]), stats_type)
        .await
        .expect("read should succeed")
        .first()
        .map(|row| row.count)
}

// =============================================================================
// create
// =============================================================================

pub async fn test_create_and_read<S: CountStatsStore>(store: &S) {
    store
        .create(&CountStats::new(CountStatsType::PostCountInCategory, "create_a"))
        .await
        .expect("create should succeed");

    assert_eq!(
        count_of(store, CountStatsType::PostCountInCategory, "create_a").await,
        Some(0)
    );
    assert_eq!(
        count_of(store, CountStatsType::PostCountInTag, "create_a").await,
        None,
        "rows are keyed by type as well as reference id"
    );
}

pub async fn test_create_duplicate<S: CountStatsStore>(store: &S) {
    let row = CountStats::new(CountStatsType::PostCountInTag, "dup_a");
    store.create(&row).await.unwrap();

    let err = store.create(&row).await.expect_err("duplicate should fail");
    assert!(matches!(err, StorageError::Duplicate { .. }), "got {err:?}");
}

// =============================================================================
// adjust
// =============================================================================

pub async fn test_bulk_increase_and_decrease<S: CountStatsStore>(store: &S) {
    for id in ["bulk_a", "bulk_b"] {
        store
            .create(&CountStats::new(CountStatsType::PostCountInTag, id))
            .await
            .unwrap();
    }

    let touched = store
        .increase_by_reference_ids(&ids(&["bulk_a", "bulk_b"]), CountStatsType::PostCountInTag, 1)
        .await
        .unwrap();
    assert_eq!(touched, 2);

    store
        .decrease_by_reference_ids(&ids(&["bulk_a"]), CountStatsType::PostCountInTag, 1)
        .await
        .unwrap();

    assert_eq!(count_of(store, CountStatsType::PostCountInTag, "bulk_a").await, Some(0));
    assert_eq!(count_of(store, CountStatsType::PostCountInTag, "bulk_b").await, Some(1));
}

pub async fn test_adjust_never_creates_rows<S: CountStatsStore>(store: &S) {
    let touched = store
        .increase_by_reference_ids(&ids(&["ghost_a"]), CountStatsType::PostCountInCategory, 1)
        .await
        .unwrap();

    assert_eq!(touched, 0);
    assert_eq!(
        count_of(store, CountStatsType::PostCountInCategory, "ghost_a").await,
        None
    );
}

pub async fn test_decrease_by_count<S: CountStatsStore>(store: &S) {
    let row = CountStats {
        count: 10,
        ..CountStats::new(CountStatsType::PostCountInCategory, "by_count_a")
    };
    store.create(&row).await.unwrap();

    store
        .decrease_by_reference_ids(&ids(&["by_count_a"]), CountStatsType::PostCountInCategory, 4)
        .await
        .unwrap();

    assert_eq!(
        count_of(store, CountStatsType::PostCountInCategory, "by_count_a").await,
        Some(6)
    );
}

// =============================================================================
// website rows
// =============================================================================

pub async fn test_get_by_types<S: CountStatsStore>(store: &S) {
    store
        .create(&CountStats::website(CountStatsType::LikeCount))
        .await
        .unwrap();
    store
        .increase_by_reference_ids(&ids(&["LikeCount"]), CountStatsType::LikeCount, 3)
        .await
        .unwrap();

    let rows = store
        .get_by_types(&[CountStatsType::LikeCount, CountStatsType::WebsiteViewCount])
        .await
        .unwrap();

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].reference_id, "LikeCount");
    assert_eq!(rows[0].count, 3);
}

// =============================================================================
// delete
// =============================================================================

pub async fn test_delete_by_reference_id<S: CountStatsStore>(store: &S) {
    store
        .create(&CountStats::new(CountStatsType::PostCountInTag, "del_a"))
        .await
        .unwrap();
    store
        .create(&CountStats::new(CountStatsType::PostCountInCategory, "del_a"))
        .await
        .unwrap();

    let removed = store
        .delete_by_reference_id("del_a", CountStatsType::PostCountInTag)
        .await
        .unwrap();

    assert_eq!(removed, 1);
    assert_eq!(count_of(store, CountStatsType::PostCountInTag, "del_a").await, None);
    assert_eq!(
        count_of(store, CountStatsType::PostCountInCategory, "del_a").await,
        Some(0)
    );
    assert_eq!(
        store
            .delete_by_reference_id("del_a", CountStatsType::PostCountInTag)
            .await
            .unwrap(),
        0
    );
}

// =============================================================================
// Test runner macro
// =============================================================================

/// Run all CountStatsStore interface tests against a store implementation.
#[macro_export]
macro_rules! run_count_stats_store_tests {
    ($store:expr) => {
        use $crate::storage::count_stats_store_tests::*;

        test_create_and_read($store).await;
        println!("  test_create_and_read: PASSED");

        test_create_duplicate($store).await;
        println!("  test_create_duplicate: PASSED");

        test_bulk_increase_and_decrease($store).await;
        println!("  test_bulk_increase_and_decrease: PASSED");

        test_adjust_never_creates_rows($store).await;
        println!("  test_adjust_never_creates_rows: PASSED");

        test_decrease_by_count($store).await;
        println!("  test_decrease_by_count: PASSED");

        test_get_by_types($store).await;
        println!("  test_get_by_types: PASSED");

        test_delete_by_reference_id($store).await;
        println!("  test_delete_by_reference_id: PASSED");
    };
}

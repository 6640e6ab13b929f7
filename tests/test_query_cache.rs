//! Integration tests for the query cache:
//! staleness windows, request coalescing, scope resets, LRU bounds and the
//! background refetcher.

use dex_state_sdk::query_cache::{QueryCache, QueryCacheConfig, QueryState};
use dex_state_sdk::query_key::{KeyPart, QueryKey};
use dex_state_sdk::FetchError;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn key(label: &str) -> QueryKey {
    QueryKey::new(vec![KeyPart::str(label), KeyPart::Chain(1)])
}

fn config(stale_ms: u64, max_entries: usize) -> QueryCacheConfig {
    QueryCacheConfig {
        stale_time: Duration::from_millis(stale_ms),
        refetch_interval: None,
        max_entries,
    }
}

#[tokio::test]
async fn fresh_entries_are_served_without_refetching() {
    let cache = QueryCache::<u64>::new("test", config(10_000, 16));
    let calls = Arc::new(AtomicUsize::new(0));
    let k = key("balance");

    for _ in 0..3 {
        let calls = Arc::clone(&calls);
        let state = cache
            .fetch(&k, move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(7)
            })
            .await;
        assert_eq!(state, QueryState::Ready(7));
    }

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(cache.fetched_at(&k).is_some());
}

#[tokio::test]
async fn stale_entries_are_refetched() {
    let cache = QueryCache::<u64>::new("test", config(30, 16));
    let calls = Arc::new(AtomicUsize::new(0));
    let k = key("balance");

    for _ in 0..2 {
        let calls = Arc::clone(&calls);
        cache
            .fetch(&k, move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(7)
            })
            .await;
        tokio::time::sleep(Duration::from_millis(60)).await;
    }

    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn concurrent_identical_requests_share_one_call() {
    let cache = Arc::new(QueryCache::<u64>::new("test", config(10_000, 16)));
    let calls = Arc::new(AtomicUsize::new(0));
    let k = key("escrow");

    let mut handles = Vec::new();
    for _ in 0..8 {
        let cache = Arc::clone(&cache);
        let calls = Arc::clone(&calls);
        let k = k.clone();
        handles.push(tokio::spawn(async move {
            cache
                .fetch(&k, move || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    Ok(42)
                })
                .await
        }));
    }

    for handle in handles {
        assert_eq!(handle.await.unwrap(), QueryState::Ready(42));
    }
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn failures_are_recorded_and_retried_on_next_request() {
    let cache = QueryCache::<u64>::new("test", config(10_000, 16));
    let k = key("apy");

    let state = cache
        .fetch(&k, || async { Err(FetchError::Sdk("boom".to_string())) })
        .await;
    assert_eq!(state, QueryState::Failed(FetchError::Sdk("boom".to_string())));
    assert_eq!(
        cache.state(&k),
        QueryState::Failed(FetchError::Sdk("boom".to_string()))
    );

    // A failed entry is never fresh; the next request runs the fetcher.
    let state = cache.fetch(&k, || async { Ok(9) }).await;
    assert_eq!(state, QueryState::Ready(9));
    assert_eq!(cache.state(&k), QueryState::Ready(9));
}

#[tokio::test]
async fn reset_discards_results_resolved_under_a_stale_scope() {
    let _ = env_logger::builder().is_test(true).try_init();
    let cache = Arc::new(QueryCache::<u64>::new("test", config(10_000, 16)));
    let k = key("balance");

    let handle = {
        let cache = Arc::clone(&cache);
        let k = k.clone();
        tokio::spawn(async move {
            cache
                .fetch(&k, || async {
                    tokio::time::sleep(Duration::from_millis(80)).await;
                    Ok(1)
                })
                .await
        })
    };

    tokio::time::sleep(Duration::from_millis(20)).await;
    cache.reset();

    // The caller still receives its result, but nothing is written back.
    assert_eq!(handle.await.unwrap(), QueryState::Ready(1));
    assert_eq!(cache.state(&k), QueryState::Idle);
    assert!(cache.is_empty());
}

#[tokio::test]
async fn cancelled_initiator_does_not_wedge_the_key() {
    let cache = Arc::new(QueryCache::<u64>::new("test", config(30, 16)));
    let calls = Arc::new(AtomicUsize::new(0));
    let k = key("balance");

    let initiator = {
        let cache = Arc::clone(&cache);
        let calls = Arc::clone(&calls);
        let k = k.clone();
        tokio::spawn(async move {
            cache
                .fetch(&k, move || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(60)).await;
                    Ok(7)
                })
                .await
        })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;
    initiator.abort();
    assert!(initiator.await.unwrap_err().is_cancelled());

    // A later request joins the orphaned fetch, drives it to completion,
    // and the result is deregistered and written back as usual.
    let state = cache.fetch(&k, || async { Ok(99) }).await;
    assert_eq!(state, QueryState::Ready(7));
    assert_eq!(cache.state(&k), QueryState::Ready(7));
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    // Once the entry goes stale the key refetches normally again.
    tokio::time::sleep(Duration::from_millis(40)).await;
    let state = cache.fetch(&k, || async { Ok(99) }).await;
    assert_eq!(state, QueryState::Ready(99));
    assert_eq!(cache.state(&k), QueryState::Ready(99));
}

#[tokio::test]
async fn old_scope_completion_does_not_unhook_a_new_scope_fetch() {
    let cache = Arc::new(QueryCache::<u64>::new("test", config(10_000, 16)));
    let k = key("balance");

    // Old-scope fetch, still in flight when the reset happens.
    let old = {
        let cache = Arc::clone(&cache);
        let k = k.clone();
        tokio::spawn(async move {
            cache
                .fetch(&k, || async {
                    tokio::time::sleep(Duration::from_millis(100)).await;
                    Ok(1)
                })
                .await
        })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    cache.reset();

    // Same key, fetched again under the new scope while the old call runs.
    let new = {
        let cache = Arc::clone(&cache);
        let k = k.clone();
        tokio::spawn(async move {
            cache
                .fetch(&k, || async {
                    tokio::time::sleep(Duration::from_millis(150)).await;
                    Ok(2)
                })
                .await
        })
    };

    // By now the old call has finished; the new one is still in flight and
    // must still be registered, so this request coalesces with it instead
    // of starting a third call.
    tokio::time::sleep(Duration::from_millis(110)).await;
    let calls = Arc::new(AtomicUsize::new(0));
    let state = {
        let calls = Arc::clone(&calls);
        cache
            .fetch(&k, move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(99)
            })
            .await
    };

    assert_eq!(old.await.unwrap(), QueryState::Ready(1));
    assert_eq!(new.await.unwrap(), QueryState::Ready(2));
    assert_eq!(state, QueryState::Ready(2));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(cache.state(&k), QueryState::Ready(2));
}

#[tokio::test]
async fn entries_are_lru_bounded() {
    let cache = QueryCache::<u64>::new("test", config(10_000, 2));

    for (i, label) in ["a", "b", "c"].iter().enumerate() {
        cache
            .fetch(&key(label), move || async move { Ok(i as u64) })
            .await;
    }

    assert_eq!(cache.len(), 2);
    assert_eq!(cache.state(&key("a")), QueryState::Idle);
    assert_eq!(cache.state(&key("b")), QueryState::Ready(1));
    assert_eq!(cache.state(&key("c")), QueryState::Ready(2));
}

#[tokio::test]
async fn background_refetcher_refreshes_at_interval() {
    let cache = Arc::new(QueryCache::<u64>::new(
        "test",
        QueryCacheConfig {
            stale_time: Duration::from_secs(10),
            refetch_interval: Some(Duration::from_millis(25)),
            max_entries: 16,
        },
    ));
    let calls = Arc::new(AtomicUsize::new(0));
    let k = key("snapshot");

    let handle = {
        let calls = Arc::clone(&calls);
        cache
            .spawn_refetcher(k.clone(), move || {
                let calls = Arc::clone(&calls);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(5)
                }
            })
            .expect("refetch interval is configured")
    };

    tokio::time::sleep(Duration::from_millis(120)).await;
    handle.abort();

    assert!(calls.load(Ordering::SeqCst) >= 2);
    assert_eq!(cache.state(&k), QueryState::Ready(5));
}

#[tokio::test]
async fn refetcher_is_not_spawned_without_an_interval() {
    let cache = Arc::new(QueryCache::<u64>::new("test", config(10_000, 16)));
    assert!(cache
        .spawn_refetcher(key("snapshot"), || async { Ok(5) })
        .is_none());
}

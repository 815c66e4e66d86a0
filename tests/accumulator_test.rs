/*!
 * Accumulator and Barrier Integration Tests
 *
 * Concurrent appends from threads and tasks, snapshot consistency and
 * barrier release
 */

use probe_race::core::sync::{Accumulator, CompletionBarrier};
use proptest::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

#[test]
fn test_concurrent_thread_appends() {
    let acc = Accumulator::new();

    let handles: Vec<_> = (0..8)
        .map(|t| {
            let acc = acc.clone();
            thread::spawn(move || {
                for i in 0..100 {
                    acc.append(t * 1000 + i);
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    let mut snapshot = acc.snapshot();
    assert_eq!(snapshot.len(), 800);
    snapshot.sort();
    snapshot.dedup();
    assert_eq!(snapshot.len(), 800, "every append lands exactly once");
}

#[test]
fn test_snapshot_during_writes_is_a_prefix() {
    let acc = Accumulator::new();
    let writer = {
        let acc = acc.clone();
        thread::spawn(move || {
            for i in 0..2_000u32 {
                acc.append(i);
            }
        })
    };

    // A single writer appends in order, so every snapshot is a prefix of 0..n
    for _ in 0..50 {
        let snapshot = acc.snapshot();
        assert!(snapshot.iter().enumerate().all(|(i, v)| *v == i as u32));
    }

    writer.join().unwrap();
    assert_eq!(acc.len(), 2_000);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_barrier_releases_after_task_appends() {
    let acc = Accumulator::new();
    let barrier = CompletionBarrier::new();

    for i in 0..16 {
        let token = barrier.register();
        let acc = acc.clone();
        tokio::spawn(async move {
            let _token = token;
            tokio::time::sleep(Duration::from_millis(5 + (i % 4) as u64)).await;
            acc.append(i);
        });
    }

    barrier.wait().await;
    assert_eq!(barrier.outstanding(), 0);
    assert_eq!(acc.len(), 16);
}

#[tokio::test]
async fn test_barrier_with_no_tokens_is_open() {
    let barrier = CompletionBarrier::new();
    tokio::time::timeout(Duration::from_millis(100), barrier.wait())
        .await
        .expect("an empty barrier never blocks");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_barrier_survives_panicking_task() {
    let barrier = CompletionBarrier::new();
    let finished = Arc::new(AtomicUsize::new(0));

    for i in 0..4 {
        let token = barrier.register();
        let finished = finished.clone();
        tokio::spawn(async move {
            let _token = token;
            if i == 1 {
                panic!("task {i} failed");
            }
            finished.fetch_add(1, Ordering::SeqCst);
        });
    }

    tokio::time::timeout(Duration::from_secs(1), barrier.wait())
        .await
        .expect("dropped tokens still release the barrier");
    assert_eq!(finished.load(Ordering::SeqCst), 3);
}

proptest! {
    #[test]
    fn prop_len_matches_appends(values in prop::collection::vec(any::<i64>(), 0..200)) {
        let acc = Accumulator::new();
        for v in &values {
            acc.append(*v);
        }
        prop_assert_eq!(acc.len(), values.len());
        prop_assert_eq!(acc.snapshot(), values);
    }

    #[test]
    fn prop_snapshot_is_idempotent(values in prop::collection::vec(".{0,8}", 0..50)) {
        let acc = Accumulator::new();
        for v in values {
            acc.append(v);
        }
        prop_assert_eq!(acc.snapshot(), acc.snapshot());
    }

    #[test]
    fn prop_threaded_appends_form_same_multiset(
        chunks in prop::collection::vec(prop::collection::vec(0u16..1000, 0..20), 1..6)
    ) {
        let acc = Accumulator::new();
        let handles: Vec<_> = chunks
            .iter()
            .cloned()
            .map(|chunk| {
                let acc = acc.clone();
                thread::spawn(move || {
                    for v in chunk {
                        acc.append(v);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let mut expected: Vec<u16> = chunks.into_iter().flatten().collect();
        let mut actual = acc.snapshot();
        expected.sort();
        actual.sort();
        prop_assert_eq!(actual, expected);
    }
}

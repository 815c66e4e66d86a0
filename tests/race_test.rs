/*!
 * Race Integration Tests
 *
 * Winner selection, loser cancellation, deadlines and event reporting
 */

use probe_race::core::errors::{CheckError, RaceError};
use probe_race::monitoring::{MemorySink, Payload};
use probe_race::probe::{ProbeConfig, ProbeGroup, ProbeState, StreamCapacity};
use probe_race::race::Race;
use probe_race::TimeoutPolicy;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

const POLL: Duration = Duration::from_millis(50);

fn group(label: &str, price: f64, threshold: f64, sites: usize) -> ProbeGroup {
    ProbeGroup::new(label).with_probes((0..sites).map(|i| {
        ProbeConfig::new(format!("{label}-site-{i}"), threshold, move |_| Ok(price))
            .with_poll_interval(POLL)
    }))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_immediate_group_wins_within_one_poll() {
    let sink = MemorySink::new();
    let start = Instant::now();

    let outcome = Race::new(sink.shared())
        .with_group(group("a", 1.0, 5.0, 4))
        .with_group(group("b", 29.0, 5.0, 4))
        .run()
        .await
        .unwrap();

    assert_eq!(outcome.winner.group, "a");
    assert_eq!(outcome.winner.attempts, 1);
    assert!(
        start.elapsed() < POLL * 2,
        "race took {:?}",
        start.elapsed()
    );
}

#[tokio::test]
async fn test_winner_comes_from_an_input_group() {
    let labels: HashSet<&str> = ["chicken", "beef", "lamb"].into_iter().collect();
    let sink = MemorySink::new();

    let outcome = Race::new(sink.shared())
        .with_group(group("chicken", 3.0, 5.0, 2))
        .with_group(group("beef", 8.0, 10.0, 2))
        .with_group(group("lamb", 12.0, 15.0, 2))
        .run()
        .await
        .unwrap();

    assert!(labels.contains(outcome.winner.group.as_str()));
    assert_eq!(outcome.settled.len(), 3);
}

#[tokio::test]
async fn test_no_probe_survives_the_race() {
    let sink = MemorySink::new();
    let polls = Arc::new(AtomicU32::new(0));
    let counter = polls.clone();

    let never = ProbeGroup::new("never").with_probes((0..3).map(|i| {
        let counter = counter.clone();
        ProbeConfig::new(format!("never-{i}"), 5.0, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(100.0)
        })
        .with_poll_interval(Duration::from_millis(5))
    }));
    let soon = group("soon", 1.0, 5.0, 1);

    let outcome = Race::new(sink.shared())
        .with_group(never)
        .with_group(soon)
        .run()
        .await
        .unwrap();

    assert_eq!(outcome.winner.group, "soon");
    assert_eq!(outcome.cancelled(), 3);

    // Polling stopped when the race was decided
    let after_race = polls.load(Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(polls.load(Ordering::SeqCst), after_race);
}

#[tokio::test]
async fn test_rendezvous_losers_blocked_in_send_are_cancelled() {
    let sink = MemorySink::new();

    let fast = ProbeGroup::new("fast")
        .with_capacity(StreamCapacity::Rendezvous)
        .with_probes((0..4).map(|i| {
            ProbeConfig::new(format!("fast-{i}"), 5.0, |_| Ok(1.0))
                .with_poll_interval(Duration::from_millis(20))
        }));
    let slow = ProbeGroup::new("slow")
        .with_capacity(StreamCapacity::Rendezvous)
        .with_probes((0..4).map(|i| {
            ProbeConfig::new(format!("slow-{i}"), 5.0, |_| Ok(1.0))
                .with_poll_interval(Duration::from_millis(500))
        }));

    let outcome = Race::new(sink.shared())
        .with_group(fast)
        .with_group(slow)
        .run()
        .await
        .unwrap();

    assert_eq!(outcome.winner.group, "fast");

    let emitted = outcome
        .settled
        .iter()
        .flat_map(|g| g.states.iter())
        .filter(|s| **s == ProbeState::Emitted)
        .count();
    assert_eq!(emitted, 1, "only the winner's send completes");
    assert_eq!(outcome.cancelled(), 7);
}

#[tokio::test]
async fn test_deadline_elapses() {
    let sink = MemorySink::new();

    let err = Race::new(sink.shared())
        .with_group(group("a", 29.0, 5.0, 1))
        .with_group(group("b", 29.0, 5.0, 1))
        .with_deadline(TimeoutPolicy::Race(Duration::from_millis(120)))
        .run()
        .await
        .unwrap_err();

    assert!(matches!(err, RaceError::Timeout { .. }));
    assert_eq!(
        sink.count(|p| matches!(p, Payload::RaceLost { .. })),
        1
    );
    assert_eq!(
        sink.count(|p| matches!(p, Payload::ProbeCancelled { .. })),
        2
    );
}

#[tokio::test]
async fn test_errored_group_loses_to_late_success() {
    let sink = MemorySink::new();
    let broken = ProbeGroup::new("broken").with_probe(
        ProbeConfig::new("broken-0", 5.0, |_| Err(CheckError::Unavailable("503".into())))
            .with_poll_interval(Duration::from_millis(5)),
    );
    let late = ProbeGroup::new("late").with_probe(
        ProbeConfig::new("late-0", 5.0, |_| Ok(2.0)).with_poll_interval(Duration::from_millis(60)),
    );

    let outcome = Race::new(sink.shared())
        .with_group(broken)
        .with_group(late)
        .run()
        .await
        .unwrap();

    assert_eq!(outcome.winner.group, "late");
    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(outcome.failures[0].source_label(), "broken-0");
}

#[tokio::test]
async fn test_bounded_probes_time_out_into_exhaustion() {
    let sink = MemorySink::new();
    let bounded = |label: &str| {
        ProbeGroup::new(label).with_probe(
            ProbeConfig::new(format!("{label}-0"), 5.0, |_| Ok(29.0))
                .with_poll_interval(Duration::from_millis(5))
                .with_max_attempts(Some(3)),
        )
    };

    let err = Race::new(sink.shared())
        .with_group(bounded("a"))
        .with_group(bounded("b"))
        .run()
        .await
        .unwrap_err();

    match err {
        RaceError::Exhausted { failures } => assert_eq!(failures.len(), 2),
        other => panic!("expected exhaustion, got {:?}", other),
    }
    assert_eq!(
        sink.count(|p| matches!(p, Payload::ProbeTimedOut { .. })),
        2
    );
}

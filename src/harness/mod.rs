/*!
 * Sync/Async Harness
 *
 * Runs the same list of work items twice against one shared accumulator:
 *
 * 1. **Sequential**: one item at a time, in order. Elapsed time is the sum
 *    of the item latencies.
 * 2. **Concurrent**: one task per item behind a completion barrier. Elapsed
 *    time approaches the slowest single item.
 *
 * Each successful item is appended exactly once per phase. A failing,
 * timed-out or panicking item is reported and never blocks the others.
 */

mod worker;

pub use worker::{WorkOutput, Worker};

use crate::core::errors::HarnessError;
use crate::core::sync::{Accumulator, CompletionBarrier};
use crate::core::timeout::TimeoutPolicy;
use crate::core::types::{ExecutionMode, WorkItem};
use crate::monitoring::{generate_run_id, Category, Event, Payload, Severity, SharedSink};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, info_span, Instrument};

/// Outcome of one execution phase
#[derive(Debug, Clone, Serialize)]
pub struct PhaseReport {
    pub mode: ExecutionMode,
    /// Accumulator snapshot at the end of the phase
    pub entries: Vec<String>,
    pub elapsed: Duration,
    pub failures: Vec<HarnessError>,
}

impl PhaseReport {
    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed.as_millis() as u64
    }

    /// Entries sorted, for order-insensitive comparison between phases
    pub fn sorted_entries(&self) -> Vec<String> {
        let mut entries = self.entries.clone();
        entries.sort();
        entries
    }
}

/// Both phases of one harness run
#[derive(Debug, Clone, Serialize)]
pub struct HarnessReport {
    pub sequential: PhaseReport,
    pub concurrent: PhaseReport,
}

impl HarnessReport {
    /// Sequential time over concurrent time
    pub fn speedup(&self) -> f64 {
        let concurrent = self.concurrent.elapsed.as_secs_f64();
        if concurrent == 0.0 {
            return f64::INFINITY;
        }
        self.sequential.elapsed.as_secs_f64() / concurrent
    }
}

/// Sequential vs concurrent execution harness
pub struct Harness<P> {
    items: Vec<WorkItem<P>>,
    worker: Arc<dyn Worker<P>>,
    accumulator: Accumulator<String>,
    item_timeout: TimeoutPolicy,
    sink: SharedSink,
}

impl<P> Harness<P>
where
    P: Clone + Send + Sync + 'static,
{
    pub fn new<W>(items: Vec<WorkItem<P>>, worker: W, sink: SharedSink) -> Self
    where
        W: Worker<P>,
    {
        let accumulator = Accumulator::with_capacity(items.len());
        Self {
            items,
            worker: Arc::new(worker),
            accumulator,
            item_timeout: TimeoutPolicy::None,
            sink,
        }
    }

    pub fn with_item_timeout(mut self, item_timeout: TimeoutPolicy) -> Self {
        self.item_timeout = item_timeout;
        self
    }

    pub fn items(&self) -> &[WorkItem<P>] {
        &self.items
    }

    /// The accumulator shared by both phases
    pub fn accumulator(&self) -> &Accumulator<String> {
        &self.accumulator
    }

    /// Run both phases back to back
    pub async fn run(&self) -> HarnessReport {
        let sequential = self.run_sequential().await;
        let concurrent = self.run_concurrent().await;

        let report = HarnessReport {
            sequential,
            concurrent,
        };
        info!(
            sequential_ms = report.sequential.elapsed_ms(),
            concurrent_ms = report.concurrent.elapsed_ms(),
            speedup = format!("{:.2}", report.speedup()),
            "Harness run complete"
        );
        report
    }

    /// Execute items one at a time, in order
    pub async fn run_sequential(&self) -> PhaseReport {
        let run_id = generate_run_id();
        let span = info_span!("harness", mode = "sequential", run_id = %run_id);

        async {
            self.accumulator.clear();
            let start = Instant::now();
            let mut failures = Vec::new();

            for item in self.items.iter().cloned() {
                let index = item.index;
                match execute(self.worker.as_ref(), item, self.item_timeout).await {
                    Ok(output) => record(
                        &self.accumulator,
                        &self.sink,
                        &run_id,
                        ExecutionMode::Sequential,
                        index,
                        output,
                    ),
                    Err(e) => failures.push(e),
                }
            }

            self.finish(ExecutionMode::Sequential, &run_id, start.elapsed(), failures)
        }
        .instrument(span)
        .await
    }

    /// Execute every item at once and wait on the completion barrier
    pub async fn run_concurrent(&self) -> PhaseReport {
        let run_id = generate_run_id();
        let span = info_span!("harness", mode = "concurrent", run_id = %run_id);

        async {
            self.accumulator.clear();
            let barrier = CompletionBarrier::new();
            let start = Instant::now();

            let mut handles = Vec::with_capacity(self.items.len());
            for item in self.items.iter().cloned() {
                let token = barrier.register();
                let index = item.index;
                let worker = Arc::clone(&self.worker);
                let accumulator = self.accumulator.clone();
                let sink = Arc::clone(&self.sink);
                let run_id = run_id.clone();
                let item_timeout = self.item_timeout;

                let handle = tokio::spawn(
                    async move {
                        let _token = token;
                        let output = execute(worker.as_ref(), item, item_timeout).await?;
                        record(
                            &accumulator,
                            &sink,
                            &run_id,
                            ExecutionMode::Concurrent,
                            index,
                            output,
                        );
                        Ok::<(), HarnessError>(())
                    }
                    .in_current_span(),
                );
                handles.push((index, handle));
            }

            barrier.wait().await;
            let elapsed = start.elapsed();

            let mut failures = Vec::new();
            for (index, handle) in handles {
                match handle.await {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => failures.push(e),
                    Err(e) => failures.push(HarnessError::ItemPanicked {
                        index,
                        reason: e.to_string(),
                    }),
                }
            }

            self.finish(ExecutionMode::Concurrent, &run_id, elapsed, failures)
        }
        .instrument(span)
        .await
    }

    fn finish(
        &self,
        mode: ExecutionMode,
        run_id: &str,
        elapsed: Duration,
        failures: Vec<HarnessError>,
    ) -> PhaseReport {
        for failure in &failures {
            emit(
                &self.sink,
                run_id,
                Severity::Warn,
                Payload::ItemFailed {
                    mode,
                    index: failure.index(),
                    reason: failure.to_string(),
                },
            );
        }

        let entries = self.accumulator.snapshot();
        emit(
            &self.sink,
            run_id,
            Severity::Info,
            Payload::PhaseCompleted {
                mode,
                entries: entries.len(),
                failures: failures.len(),
                elapsed_ms: elapsed.as_millis() as u64,
            },
        );

        PhaseReport {
            mode,
            entries,
            elapsed,
            failures,
        }
    }
}

/// Run the worker on one item under the item timeout
async fn execute<P: 'static>(
    worker: &dyn Worker<P>,
    item: WorkItem<P>,
    item_timeout: TimeoutPolicy,
) -> Result<String, HarnessError> {
    let index = item.index;
    match item_timeout.apply(worker.run(item)).await {
        Ok(Ok(output)) => Ok(output),
        Ok(Err(e)) => Err(HarnessError::ItemFailed {
            index,
            reason: e.to_string(),
        }),
        Err(elapsed) => Err(HarnessError::ItemTimeout {
            index,
            timeout_ms: item_timeout
                .duration()
                .unwrap_or(elapsed)
                .as_millis() as u64,
        }),
    }
}

/// Append one output and publish the accumulated state
fn record(
    accumulator: &Accumulator<String>,
    sink: &SharedSink,
    run_id: &str,
    mode: ExecutionMode,
    index: usize,
    output: String,
) {
    let accumulated = accumulator.append_and_snapshot(output);
    emit(
        sink,
        run_id,
        Severity::Info,
        Payload::ItemCompleted {
            mode,
            index,
            accumulated,
        },
    );
}

fn emit(sink: &SharedSink, run_id: &str, severity: Severity, payload: Payload) {
    sink.emit(Event::new(severity, Category::Harness, payload).with_run_id(Some(run_id)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::errors::WorkError;
    use crate::monitoring::MemorySink;
    use pretty_assertions::assert_eq;

    fn items() -> Vec<WorkItem<String>> {
        WorkItem::enumerate(["data1", "data2", "data3"].map(String::from))
    }

    fn echo(latency: Duration) -> impl Worker<String> {
        move |item: WorkItem<String>| async move {
            tokio::time::sleep(latency).await;
            Ok::<_, WorkError>(item.payload)
        }
    }

    #[tokio::test]
    async fn test_sequential_preserves_item_order() {
        let sink = MemorySink::new();
        let harness = Harness::new(items(), echo(Duration::from_millis(5)), sink.shared());

        let report = harness.run_sequential().await;

        assert_eq!(report.mode, ExecutionMode::Sequential);
        assert_eq!(report.entries, vec!["data1", "data2", "data3"]);
        assert!(report.failures.is_empty());
        assert_eq!(
            sink.count(|p| matches!(p, Payload::ItemCompleted { .. })),
            3
        );
    }

    #[tokio::test]
    async fn test_phases_share_one_accumulator() {
        let sink = MemorySink::new();
        let harness = Harness::new(items(), echo(Duration::from_millis(5)), sink.shared());

        let report = harness.run().await;

        assert_eq!(report.sequential.sorted_entries(), report.concurrent.sorted_entries());
        // Cleared between phases, so only the concurrent results remain
        assert_eq!(harness.accumulator().len(), 3);
    }

    #[tokio::test]
    async fn test_failed_item_does_not_stop_others() {
        let sink = MemorySink::new();
        let worker = |item: WorkItem<String>| async move {
            if item.index == 1 {
                Err(WorkError::from("connection reset"))
            } else {
                Ok(item.payload)
            }
        };
        let harness = Harness::new(items(), worker, sink.shared());

        let report = harness.run_concurrent().await;

        assert_eq!(report.sorted_entries(), vec!["data1", "data3"]);
        assert_eq!(
            report.failures,
            vec![HarnessError::ItemFailed {
                index: 1,
                reason: "connection reset".into()
            }]
        );
        assert_eq!(sink.count(|p| matches!(p, Payload::ItemFailed { .. })), 1);
    }

    #[tokio::test]
    async fn test_item_timeout_is_reported() {
        let sink = MemorySink::new();
        let worker = |item: WorkItem<String>| async move {
            let latency = if item.index == 0 { 500 } else { 1 };
            tokio::time::sleep(Duration::from_millis(latency)).await;
            Ok::<_, WorkError>(item.payload)
        };
        let harness = Harness::new(items(), worker, sink.shared())
            .with_item_timeout(TimeoutPolicy::Item(Duration::from_millis(50)));

        let report = harness.run_sequential().await;

        assert_eq!(report.entries, vec!["data2", "data3"]);
        assert_eq!(
            report.failures,
            vec![HarnessError::ItemTimeout {
                index: 0,
                timeout_ms: 50
            }]
        );
    }

    #[tokio::test]
    async fn test_panicking_item_is_reported() {
        let sink = MemorySink::new();
        let worker = |item: WorkItem<String>| async move {
            if item.index == 2 {
                panic!("worker bug");
            }
            Ok::<_, WorkError>(item.payload)
        };
        let harness = Harness::new(items(), worker, sink.shared());

        let report = harness.run_concurrent().await;

        assert_eq!(report.entries.len(), 2);
        assert!(matches!(
            report.failures.as_slice(),
            [HarnessError::ItemPanicked { index: 2, .. }]
        ));
    }

    #[test]
    fn test_speedup() {
        let phase = |mode, ms| PhaseReport {
            mode,
            entries: Vec::new(),
            elapsed: Duration::from_millis(ms),
            failures: Vec::new(),
        };
        let report = HarnessReport {
            sequential: phase(ExecutionMode::Sequential, 1250),
            concurrent: phase(ExecutionMode::Concurrent, 250),
        };
        assert!((report.speedup() - 5.0).abs() < 1e-9);
    }
}

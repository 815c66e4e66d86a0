/*!
 * Races
 *
 * Fan out several probe groups, keep the first qualifying result and stop
 * everything else.
 *
 * A race owns a root cancellation token; each group runs under a child of
 * it. The selector cancels the root the moment the race is decided, and the
 * race then joins every group so no losing probe is left running.
 */

mod selector;

pub use selector::{RaceSelector, Selection};

use crate::core::errors::{ProbeError, RaceError};
use crate::core::timeout::TimeoutPolicy;
use crate::core::types::ProbeResult;
use crate::monitoring::{generate_run_id, Category, Event, Payload, Severity, SharedSink};
use crate::probe::{FanOutDispatcher, ProbeGroup, ProbeState};
use serde::Serialize;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{info, info_span, Instrument};

/// Final state of every probe of one group
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SettledGroup {
    pub label: String,
    pub states: Vec<ProbeState>,
}

/// Result of a decided race
#[derive(Debug, Clone, Serialize)]
pub struct RaceOutcome {
    pub winner: ProbeResult,
    pub elapsed: Duration,
    /// Failure outcomes consumed before the winner arrived
    pub failures: Vec<ProbeError>,
    pub settled: Vec<SettledGroup>,
}

impl RaceOutcome {
    /// Probes stopped by the race decision
    pub fn cancelled(&self) -> usize {
        self.settled
            .iter()
            .flat_map(|g| g.states.iter())
            .filter(|s| **s == ProbeState::Cancelled)
            .count()
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed.as_millis() as u64
    }
}

/// Race of two or more probe groups
pub struct Race {
    groups: Vec<ProbeGroup>,
    deadline: TimeoutPolicy,
    sink: SharedSink,
}

impl Race {
    pub fn new(sink: SharedSink) -> Self {
        Self {
            groups: Vec::new(),
            deadline: TimeoutPolicy::default_race(),
            sink,
        }
    }

    pub fn with_group(mut self, group: ProbeGroup) -> Self {
        self.groups.push(group);
        self
    }

    pub fn with_deadline(mut self, deadline: TimeoutPolicy) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn groups(&self) -> &[ProbeGroup] {
        &self.groups
    }

    /// Launch every group, return the first qualifying result
    pub async fn run(self) -> Result<RaceOutcome, RaceError> {
        let run_id = generate_run_id();
        let span = info_span!("race", run_id = %run_id, groups = self.groups.len());
        self.run_inner(run_id).instrument(span).await
    }

    async fn run_inner(self, run_id: String) -> Result<RaceOutcome, RaceError> {
        if self.groups.len() < 2 {
            return Err(RaceError::TooFewStreams {
                found: self.groups.len(),
            });
        }

        let root = CancellationToken::new();
        let dispatcher = FanOutDispatcher::new(self.sink.clone()).with_run_id(&run_id);

        let start = Instant::now();
        let mut handles = Vec::with_capacity(self.groups.len());
        let mut streams = Vec::with_capacity(self.groups.len());
        for group in &self.groups {
            let (tx, rx) = group.stream();
            handles.push(dispatcher.launch(group, tx, root.child_token()));
            streams.push(rx);
        }

        let decision = RaceSelector::new(streams)?
            .with_deadline(self.deadline)
            .cancel_on_decision(root.clone())
            .select()
            .await;
        let elapsed = start.elapsed();

        let mut settled = Vec::with_capacity(handles.len());
        for handle in handles {
            let label = handle.label().to_string();
            settled.push(SettledGroup {
                label,
                states: handle.join().await,
            });
        }

        match decision {
            Ok(selection) => {
                let winner = selection.result;
                info!(
                    group = %winner.group,
                    source = %winner.source_label,
                    value = winner.value,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Race decided"
                );
                self.emit(
                    &run_id,
                    Severity::Info,
                    Payload::RaceWon {
                        group: winner.group.clone(),
                        source_label: winner.source_label.clone(),
                        value: winner.value,
                        message: winner.message.clone(),
                        elapsed_ms: elapsed.as_millis() as u64,
                    },
                );
                Ok(RaceOutcome {
                    winner,
                    elapsed,
                    failures: selection.failures,
                    settled,
                })
            }
            Err(e) => {
                self.emit(
                    &run_id,
                    Severity::Warn,
                    Payload::RaceLost {
                        reason: e.to_string(),
                        elapsed_ms: elapsed.as_millis() as u64,
                    },
                );
                Err(e)
            }
        }
    }

    fn emit(&self, run_id: &str, severity: Severity, payload: Payload) {
        self.sink
            .emit(Event::new(severity, Category::Race, payload).with_run_id(Some(run_id)));
    }
}

/*!
 * Event System
 * Strongly-typed observability events for probes, races and the harness
 */

use crate::core::types::{Attempt, ExecutionMode};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Instant;

/// Event severity for filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum Severity {
    Trace = 0,
    Debug = 1,
    Info = 2,
    Warn = 3,
    Error = 4,
}

/// Event category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Category {
    Probe,
    Race,
    Harness,
}

/// Unified event type - everything observable flows through this
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Monotonic timestamp (nanoseconds since first event)
    pub timestamp_ns: u64,
    pub severity: Severity,
    pub category: Category,
    /// Correlates events of one race or harness run
    pub run_id: Option<String>,
    pub payload: Payload,
}

/// Event payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Payload {
    // Probe lifecycle
    ProbeStarted {
        group: String,
        source_label: String,
    },
    ProbeSampled {
        group: String,
        source_label: String,
        attempt: Attempt,
        value: f64,
        satisfied: bool,
    },
    ProbeEmitted {
        group: String,
        source_label: String,
        value: f64,
        attempts: Attempt,
    },
    ProbeErrored {
        group: String,
        source_label: String,
        reason: String,
    },
    ProbeTimedOut {
        group: String,
        source_label: String,
        attempts: Attempt,
    },
    ProbeCancelled {
        group: String,
        source_label: String,
        attempts: Attempt,
    },

    // Race decisions
    RaceWon {
        group: String,
        source_label: String,
        value: f64,
        message: String,
        elapsed_ms: u64,
    },
    RaceLost {
        reason: String,
        elapsed_ms: u64,
    },

    // Harness progress
    ItemCompleted {
        mode: ExecutionMode,
        index: usize,
        accumulated: Vec<String>,
    },
    ItemFailed {
        mode: ExecutionMode,
        index: usize,
        reason: String,
    },
    PhaseCompleted {
        mode: ExecutionMode,
        entries: usize,
        failures: usize,
        elapsed_ms: u64,
    },
}

impl fmt::Display for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ProbeStarted {
                group,
                source_label,
            } => write!(f, "{group} probe started on {source_label}"),
            Self::ProbeSampled {
                group,
                source_label,
                attempt,
                value,
                satisfied,
            } => write!(
                f,
                "{group} probe on {source_label} sampled {value:.2} (attempt {attempt}, satisfied: {satisfied})"
            ),
            Self::ProbeEmitted {
                group,
                source_label,
                value,
                attempts,
            } => write!(
                f,
                "{group} probe on {source_label} found {value:.2} after {attempts} attempts"
            ),
            Self::ProbeErrored {
                group,
                source_label,
                reason,
            } => write!(f, "{group} probe on {source_label} errored: {reason}"),
            Self::ProbeTimedOut {
                group,
                source_label,
                attempts,
            } => write!(
                f,
                "{group} probe on {source_label} gave up after {attempts} attempts"
            ),
            Self::ProbeCancelled {
                group,
                source_label,
                attempts,
            } => write!(
                f,
                "{group} probe on {source_label} cancelled after {attempts} attempts"
            ),
            Self::RaceWon {
                group, message, ..
            } => write!(f, "Found a deal on {group}! {message}"),
            Self::RaceLost { reason, .. } => write!(f, "Race ended without a winner: {reason}"),
            Self::ItemCompleted { accumulated, .. } => {
                write!(f, "The current results are: {accumulated:?}")
            }
            Self::ItemFailed {
                mode,
                index,
                reason,
            } => write!(f, "{mode} item {index} failed: {reason}"),
            Self::PhaseCompleted {
                mode, elapsed_ms, ..
            } => write!(f, "Time taken for {mode} calls: {elapsed_ms}ms"),
        }
    }
}

impl Event {
    /// Create a new event with current timestamp
    #[inline]
    pub fn new(severity: Severity, category: Category, payload: Payload) -> Self {
        Self {
            timestamp_ns: Self::now_ns(),
            severity,
            category,
            run_id: None,
            payload,
        }
    }

    /// Attach the run this event belongs to
    #[inline]
    pub fn with_run_id(mut self, run_id: Option<&str>) -> Self {
        self.run_id = run_id.map(str::to_string);
        self
    }

    #[inline]
    fn now_ns() -> u64 {
        static START: std::sync::OnceLock<Instant> = std::sync::OnceLock::new();
        let start = START.get_or_init(Instant::now);
        start.elapsed().as_nanos() as u64
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.payload.fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization() {
        let event = Event::new(
            Severity::Info,
            Category::Harness,
            Payload::PhaseCompleted {
                mode: ExecutionMode::Sequential,
                entries: 5,
                failures: 0,
                elapsed_ms: 1250,
            },
        )
        .with_run_id(Some("run-1"));

        let json = serde_json::to_string(&event).unwrap();
        let back: Event = serde_json::from_str(&json).unwrap();
        assert_eq!(back.payload, event.payload);
        assert_eq!(back.run_id.as_deref(), Some("run-1"));
    }

    #[test]
    fn test_race_won_display() {
        let payload = Payload::RaceWon {
            group: "beef".into(),
            source_label: "iga.com.au".into(),
            value: 7.5,
            message: "The price of beef is $7.50 at iga.com.au".into(),
            elapsed_ms: 500,
        };
        assert_eq!(
            payload.to_string(),
            "Found a deal on beef! The price of beef is $7.50 at iga.com.au"
        );
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Warn > Severity::Info);
        assert!(Severity::Trace < Severity::Debug);
    }
}

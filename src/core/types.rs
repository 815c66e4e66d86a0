/*!
 * Core Types
 * Values that flow between probes, selectors and the harness
 */

use serde::{Deserialize, Serialize};
use std::fmt;

/// Probe attempt counter
pub type Attempt = u32;

/// Successful probe reading
///
/// Produced exactly once by the probe that observed it and never mutated
/// afterwards. Ownership moves to whichever consumer receives it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeResult {
    /// Group the emitting probe belongs to (e.g. "chicken")
    pub group: String,
    /// Source the probe watched (e.g. "aldi.com.au")
    pub source_label: String,
    /// Sample that satisfied the predicate
    pub value: f64,
    /// Human-readable summary
    pub message: String,
    /// Number of polls it took
    pub attempts: Attempt,
}

impl fmt::Display for ProbeResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Unit of work fed to the harness
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkItem<P = String> {
    pub index: usize,
    pub payload: P,
}

impl<P> WorkItem<P> {
    pub fn new(index: usize, payload: P) -> Self {
        Self { index, payload }
    }

    /// Number a list of payloads in order
    pub fn enumerate<I>(payloads: I) -> Vec<Self>
    where
        I: IntoIterator<Item = P>,
    {
        payloads
            .into_iter()
            .enumerate()
            .map(|(index, payload)| Self { index, payload })
            .collect()
    }
}

/// How the harness drives its work items
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// One item at a time, in order
    Sequential,
    /// All items at once behind a completion barrier
    Concurrent,
}

impl ExecutionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sequential => "sequential",
            Self::Concurrent => "concurrent",
        }
    }
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

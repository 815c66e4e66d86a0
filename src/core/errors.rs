/*!
 * Error Types
 * Centralized error handling with thiserror, miette, and serde support
 */

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure reported by a caller-supplied check function
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum CheckError {
    #[error("Source unavailable: {0}")]
    #[diagnostic(
        code(check::unavailable),
        help("The probed source could not be reached. It may recover on a later poll.")
    )]
    Unavailable(String),

    #[error("Invalid sample: {0}")]
    #[diagnostic(
        code(check::invalid_sample),
        help("The source returned a value that cannot be compared against a threshold.")
    )]
    InvalidSample(String),
}

/// Terminal failure of a single probe, delivered on its result stream
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum ProbeError {
    #[error("Check failed for {source_label}: {reason}")]
    #[diagnostic(
        code(probe::check_failed),
        help("The check function returned an error. The probe stopped instead of retrying.")
    )]
    Check {
        source_label: String,
        reason: String,
    },

    #[error("Probe for {source_label} gave up after {attempts} attempts")]
    #[diagnostic(
        code(probe::timeout),
        help("The success predicate never held. Raise max_attempts or relax the threshold.")
    )]
    Timeout { source_label: String, attempts: u32 },
}

impl ProbeError {
    /// Label of the source the failing probe was watching
    pub fn source_label(&self) -> &str {
        match self {
            Self::Check { source_label, .. }
            | Self::Timeout { source_label, .. } => source_label,
        }
    }
}

/// Race selection errors
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum RaceError {
    #[error("A race needs at least two result streams, got {found}")]
    #[diagnostic(
        code(race::too_few_streams),
        help("Add another probe group before running the race.")
    )]
    TooFewStreams { found: usize },

    #[error("Every result stream closed without a qualifying result ({} failures)", failures.len())]
    #[diagnostic(
        code(race::exhausted),
        help("All probes errored or timed out. Inspect the collected failures.")
    )]
    Exhausted { failures: Vec<ProbeError> },

    #[error("No result arrived within {elapsed_ms}ms")]
    #[diagnostic(
        code(race::timeout),
        help("Race deadline elapsed. Increase RACE_DEADLINE_MS or check probe thresholds.")
    )]
    Timeout { elapsed_ms: u64 },
}

/// Failure returned by a harness worker function
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[error("{0}")]
pub struct WorkError(pub String);

impl From<String> for WorkError {
    fn from(msg: String) -> Self {
        WorkError(msg)
    }
}

impl From<&str> for WorkError {
    fn from(msg: &str) -> Self {
        WorkError(msg.to_string())
    }
}

/// Per-item harness failures
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum HarnessError {
    #[error("Work item {index} failed: {reason}")]
    #[diagnostic(code(harness::item_failed))]
    ItemFailed { index: usize, reason: String },

    #[error("Work item {index} exceeded {timeout_ms}ms")]
    #[diagnostic(
        code(harness::item_timeout),
        help("The worker did not finish in time. Raise HARNESS_ITEM_TIMEOUT_MS.")
    )]
    ItemTimeout { index: usize, timeout_ms: u64 },

    #[error("Work item {index} panicked: {reason}")]
    #[diagnostic(
        code(harness::item_panicked),
        help("The worker panicked. Other items were not affected.")
    )]
    ItemPanicked { index: usize, reason: String },
}

impl HarnessError {
    /// Index of the work item that failed
    pub fn index(&self) -> usize {
        match self {
            Self::ItemFailed { index, .. }
            | Self::ItemTimeout { index, .. }
            | Self::ItemPanicked { index, .. } => *index,
        }
    }
}

/// Unified error type with miette diagnostics
#[derive(Error, Debug, Diagnostic)]
pub enum CoreError {
    #[error("Check error: {0}")]
    #[diagnostic(transparent)]
    Check(#[from] CheckError),

    #[error("Probe error: {0}")]
    #[diagnostic(transparent)]
    Probe(#[from] ProbeError),

    #[error("Race error: {0}")]
    #[diagnostic(transparent)]
    Race(#[from] RaceError),

    #[error("Harness error: {0}")]
    #[diagnostic(transparent)]
    Harness(#[from] HarnessError),

    #[error("Configuration error: {0}")]
    #[diagnostic(
        code(core::configuration_error),
        help("Invalid configuration. Review the PROBE_*, RACE_* and HARNESS_* variables.")
    )]
    Configuration(String),
}

/// Result type for core operations
pub type Result<T> = std::result::Result<T, CoreError>;

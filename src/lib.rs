/*!
 * Probe Race Library
 * Concurrent probing, first-result races and a sync/async execution harness
 */

pub mod config;
pub mod core;
pub mod harness;
pub mod monitoring;
pub mod probe;
pub mod race;
pub mod scenarios;

// Re-exports
pub use crate::config::RuntimeConfig;
pub use crate::core::errors::*;
pub use crate::core::sync::{Accumulator, CompletionBarrier, CompletionToken};
pub use crate::core::timeout::TimeoutPolicy;
pub use crate::core::types::{Attempt, ExecutionMode, ProbeResult, WorkItem};
pub use harness::{Harness, HarnessReport, PhaseReport, WorkOutput, Worker};
pub use monitoring::{
    generate_run_id, init_tracing, Category, Event, EventSink, MemorySink, NullSink, Payload,
    Severity, SharedSink, TracingSink,
};
pub use probe::{
    result_stream, CheckFn, Comparison, DispatchHandle, FanOutDispatcher, MessageFn, Probe,
    ProbeConfig, ProbeGroup, ProbeOutcome, ProbeState, ResultReceiver, ResultSender,
    StreamCapacity,
};
pub use race::{Race, RaceOutcome, RaceSelector, Selection, SettledGroup};

/*!
 * Monitoring
 * Typed events, injectable sinks and tracing setup
 */

mod events;
mod sink;
mod tracer;

pub use events::{Category, Event, Payload, Severity};
pub use sink::{EventSink, MemorySink, NullSink, SharedSink, TracingSink};
pub use tracer::{generate_run_id, init_tracing};

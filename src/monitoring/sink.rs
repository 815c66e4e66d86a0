/*!
 * Event Sinks
 *
 * Where probes, races and the harness send their observable events.
 * Production code logs through `tracing`; tests inject a `MemorySink` and
 * assert on the captured events instead of scraping console output.
 */

use super::events::{Event, Payload, Severity};
use crate::core::sync::Accumulator;
use std::sync::Arc;
use tracing::{debug, error, info, trace, warn};

/// Receiver of observable events
pub trait EventSink: Send + Sync {
    fn emit(&self, event: Event);
}

/// Shared, type-erased sink handed to every component
pub type SharedSink = Arc<dyn EventSink>;

impl<S: EventSink + ?Sized> EventSink for Arc<S> {
    #[inline]
    fn emit(&self, event: Event) {
        (**self).emit(event)
    }
}

/// Forwards events to the `tracing` subscriber
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl TracingSink {
    pub fn shared() -> SharedSink {
        Arc::new(Self)
    }
}

impl EventSink for TracingSink {
    fn emit(&self, event: Event) {
        let category = event.category;
        let run_id = event.run_id.as_deref().unwrap_or("-");
        match event.severity {
            Severity::Trace => trace!(?category, run_id, "{}", event.payload),
            Severity::Debug => debug!(?category, run_id, "{}", event.payload),
            Severity::Info => info!(?category, run_id, "{}", event.payload),
            Severity::Warn => warn!(?category, run_id, "{}", event.payload),
            Severity::Error => error!(?category, run_id, "{}", event.payload),
        }
    }
}

/// Discards everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    #[inline]
    fn emit(&self, _event: Event) {}
}

/// Captures events in memory
///
/// Clones share the same buffer, so a test can keep one handle and pass
/// another into the component under test.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    events: Accumulator<Event>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Convenience for passing a clone as a `SharedSink`
    pub fn shared(&self) -> SharedSink {
        Arc::new(self.clone())
    }

    /// Everything captured so far, in arrival order
    pub fn events(&self) -> Vec<Event> {
        self.events.snapshot()
    }

    /// Payloads only
    pub fn payloads(&self) -> Vec<Payload> {
        self.events().into_iter().map(|e| e.payload).collect()
    }

    /// Count payloads matching `predicate`
    pub fn count<F>(&self, predicate: F) -> usize
    where
        F: Fn(&Payload) -> bool,
    {
        self.events()
            .iter()
            .filter(|e| predicate(&e.payload))
            .count()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn clear(&self) {
        self.events.clear();
    }
}

impl EventSink for MemorySink {
    fn emit(&self, event: Event) {
        self.events.append(event);
    }
}

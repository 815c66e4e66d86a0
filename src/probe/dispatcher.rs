/*!
 * Fan-Out Dispatcher
 *
 * Launches one probe task per source of a group, all writing to a single
 * result stream. Launching never blocks and never reads the stream; the
 * returned `DispatchHandle` owns the task lifetimes.
 */

use super::{result_stream, Probe, ProbeConfig, ProbeState, ResultReceiver, ResultSender, StreamCapacity};
use crate::monitoring::SharedSink;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, debug_span, warn, Instrument};

/// Named set of probes sharing one result stream
#[derive(Debug, Clone)]
pub struct ProbeGroup {
    label: String,
    probes: Vec<ProbeConfig>,
    capacity: StreamCapacity,
}

impl ProbeGroup {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            probes: Vec::new(),
            capacity: StreamCapacity::default(),
        }
    }

    pub fn with_probe(mut self, probe: ProbeConfig) -> Self {
        self.probes.push(probe);
        self
    }

    pub fn with_probes<I>(mut self, probes: I) -> Self
    where
        I: IntoIterator<Item = ProbeConfig>,
    {
        self.probes.extend(probes);
        self
    }

    pub fn with_capacity(mut self, capacity: StreamCapacity) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn probes(&self) -> &[ProbeConfig] {
        &self.probes
    }

    pub fn capacity(&self) -> StreamCapacity {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.probes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.probes.is_empty()
    }

    /// Create a stream sized for this group
    pub fn stream(&self) -> (ResultSender, ResultReceiver) {
        result_stream(self.capacity, self.probes.len())
    }
}

/// Launcher for probe groups
#[derive(Clone)]
pub struct FanOutDispatcher {
    sink: SharedSink,
    run_id: Option<Arc<str>>,
}

impl FanOutDispatcher {
    pub fn new(sink: SharedSink) -> Self {
        Self { sink, run_id: None }
    }

    /// Tag every probe event with the run this launch belongs to
    pub fn with_run_id(mut self, run_id: &str) -> Self {
        self.run_id = Some(Arc::from(run_id));
        self
    }

    /// Start one probe per source of `group`, all writing to `tx`
    ///
    /// Must be called from within a tokio runtime. Returns immediately.
    /// The stream disconnects once every probe has finished, since the
    /// probes hold the only remaining senders.
    pub fn launch(
        &self,
        group: &ProbeGroup,
        tx: ResultSender,
        cancel: CancellationToken,
    ) -> DispatchHandle {
        let label: Arc<str> = Arc::from(group.label());
        let handles = group
            .probes()
            .iter()
            .cloned()
            .map(|config| {
                let span = debug_span!("probe", group = %label, source = %config.source);
                let probe = Probe::new(Arc::clone(&label), config, Arc::clone(&self.sink))
                    .with_run_id(self.run_id.clone());
                tokio::spawn(probe.run(tx.clone(), cancel.clone()).instrument(span))
            })
            .collect::<Vec<_>>();

        debug!(group = %label, probes = handles.len(), "Probe group launched");

        DispatchHandle {
            label: group.label().to_string(),
            handles,
            cancel,
            auto_cancel: true,
        }
    }
}

/// Owner of a launched group's probe tasks
///
/// Cancels the group on drop unless `no_auto_cancel` was called, so a
/// forgotten handle does not leave probes polling forever.
pub struct DispatchHandle {
    label: String,
    handles: Vec<JoinHandle<ProbeState>>,
    cancel: CancellationToken,
    auto_cancel: bool,
}

impl DispatchHandle {
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    pub fn is_finished(&self) -> bool {
        self.handles.iter().all(JoinHandle::is_finished)
    }

    /// Ask every probe of the group to stop
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Let the probes outlive this handle
    pub fn no_auto_cancel(mut self) -> Self {
        self.auto_cancel = false;
        self
    }

    /// Wait for every probe and collect its terminal state, in launch order
    ///
    /// A probe task that panicked is reported as `Errored`.
    pub async fn join(mut self) -> Vec<ProbeState> {
        let handles = std::mem::take(&mut self.handles);
        let mut states = Vec::with_capacity(handles.len());
        for handle in handles {
            let state = match handle.await {
                Ok(state) => state,
                Err(e) => {
                    warn!(group = %self.label, error = %e, "Probe task failed");
                    ProbeState::Errored
                }
            };
            states.push(state);
        }
        states
    }
}

impl Drop for DispatchHandle {
    fn drop(&mut self) {
        if self.auto_cancel && !self.is_finished() {
            self.cancel.cancel();
            debug!(group = %self.label, "Dispatch handle dropped, probes cancelled");
        }
    }
}

/*!
 * Result Streams
 *
 * Probes hand their single outcome to consumers over `flume` channels.
 * A rendezvous stream (capacity 0) makes the sender wait for a receiver;
 * a bounded stream lets producers finish without meeting the consumer.
 */

use crate::core::errors::ProbeError;
use crate::core::types::ProbeResult;

/// What a probe puts on its stream: a qualifying reading or a terminal failure
pub type ProbeOutcome = Result<ProbeResult, ProbeError>;

pub type ResultSender = flume::Sender<ProbeOutcome>;
pub type ResultReceiver = flume::Receiver<ProbeOutcome>;

/// Buffering of a result stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StreamCapacity {
    /// Unbuffered: each send waits for a receiver
    Rendezvous,
    /// Fixed buffer (at least one slot)
    Bounded(usize),
    /// One slot per probe in the group, so no producer ever waits
    #[default]
    GroupSize,
}

impl StreamCapacity {
    /// Concrete channel capacity for a group of `group_size` probes
    pub fn slots(&self, group_size: usize) -> usize {
        match self {
            Self::Rendezvous => 0,
            Self::Bounded(n) => (*n).max(1),
            Self::GroupSize => group_size.max(1),
        }
    }
}

/// Create a result stream for a group of `group_size` probes
pub fn result_stream(capacity: StreamCapacity, group_size: usize) -> (ResultSender, ResultReceiver) {
    flume::bounded(capacity.slots(group_size))
}

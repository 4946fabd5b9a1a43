//! Event queue with deterministic ordering.

use std::cmp::Ordering;

use bytes::Bytes;
use trafgen_common::SimTime;
use trafgen_source::TimerKind;

use crate::NodeIndex;

/// Something that happens to a node at a point in virtual time.
#[derive(Debug, Clone)]
pub(crate) enum Event {
    /// A traffic source timer. Ignored if its generation is stale.
    Timer { kind: TimerKind, generation: u64 },
    /// An encoded unit reaching the node.
    Arrival { wire: Bytes },
    /// The node comes up.
    NodeUp,
    /// The node goes down.
    NodeDown,
}

/// Key for ordering events in the queue.
///
/// Events are ordered by time first and by sequence number second, so events scheduled for the
/// same time are processed in the order they were scheduled.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub(crate) struct EventKey {
    /// When this event should be processed.
    pub(crate) time: SimTime,
    /// Sequence number for deterministic FIFO ordering.
    pub(crate) sequence: u64,
    /// Which node receives this event.
    pub(crate) node: NodeIndex,
}

impl Ord for EventKey {
    fn cmp(&self, other: &Self) -> Ordering {
        match self.time.cmp(&other.time) {
            Ordering::Equal => {}
            ord => return ord,
        }

        // Sequence numbers are unique, so the node index never decides.
        self.sequence.cmp(&other.sequence).then(self.node.cmp(&other.node))
    }
}

impl PartialOrd for EventKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

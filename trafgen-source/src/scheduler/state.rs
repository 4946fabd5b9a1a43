use trafgen_common::SimTime;

use crate::TimerKind;

/// The timer state of a [`TrafficScheduler`](super::TrafficScheduler).
///
/// Holding at most one `Armed` value is what guarantees that at most one timer is ever armed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TimerState {
    /// Nothing armed yet, or the last timer just fired.
    #[default]
    Idle,
    /// Waiting for a fire.
    Armed {
        /// The kind of the pending fire.
        kind: TimerKind,
        /// When the pending fire is due.
        at: SimTime,
    },
    /// Nothing armed: the packet limit is exhausted, the window has closed, or the node is down.
    Disabled,
}

impl TimerState {
    /// Returns `true` if a timer is armed.
    #[inline]
    pub fn is_armed(&self) -> bool {
        matches!(self, Self::Armed { .. })
    }

    /// Returns `true` if the scheduler stopped arming timers.
    #[inline]
    pub fn is_disabled(&self) -> bool {
        matches!(self, Self::Disabled)
    }

    /// Returns the kind and due time of the armed timer, if any.
    #[inline]
    pub fn armed(&self) -> Option<(TimerKind, SimTime)> {
        match *self {
            Self::Armed { kind, at } => Some((kind, at)),
            _ => None,
        }
    }
}

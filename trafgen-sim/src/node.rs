use trafgen_common::SimTime;
use trafgen_source::{Direction, Host, TimerKind, TrafficScheduler};
use trafgen_wire::{Address, Unit};

use crate::{names::NameTable, NodeIndex};

/// The up/down state of a simulated node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeStatus {
    Up,
    Down,
}

/// What a traffic source asked of its host while handling one event.
#[derive(Debug)]
pub(crate) enum Action {
    ArmTimer { at: SimTime, kind: TimerKind },
    CancelTimer,
    Send(Unit),
    Notify { direction: Direction, seq: u32, destination: Address, len: usize },
}

/// The [`Host`] view a traffic source gets of the simulation. Requests are buffered as
/// [`Action`]s and applied by the runner once the handler returns.
#[derive(Debug)]
pub(crate) struct NodeContext {
    pub(crate) now: SimTime,
    pub(crate) status: NodeStatus,
    pub(crate) actions: Vec<Action>,
}

impl Host for NodeContext {
    fn now(&self) -> SimTime {
        self.now
    }

    fn is_operational(&self) -> bool {
        self.status == NodeStatus::Up
    }

    fn arm_timer(&mut self, at: SimTime, kind: TimerKind) {
        self.actions.push(Action::ArmTimer { at, kind });
    }

    fn cancel_timer(&mut self) {
        self.actions.push(Action::CancelTimer);
    }

    fn send_unit(&mut self, unit: Unit) {
        self.actions.push(Action::Send(unit));
    }

    fn notify(&mut self, direction: Direction, unit: &Unit) {
        self.actions.push(Action::Notify {
            direction,
            seq: unit.seq(),
            destination: unit.destination(),
            len: unit.payload_len(),
        });
    }
}

/// A simulated node running one traffic source.
#[derive(Debug)]
pub(crate) struct Node {
    pub(crate) index: NodeIndex,
    pub(crate) name: String,
    pub(crate) address: Address,
    pub(crate) source: TrafficScheduler<NameTable>,
    pub(crate) ctx: NodeContext,
    /// Bumped on every cancel. Queued timer events from older generations are never delivered.
    pub(crate) timer_generation: u64,
    /// Units dropped on arrival because they could not be decoded.
    pub(crate) malformed: u64,
}

impl Node {
    /// Runs `f` against the traffic source at virtual time `now` and returns what it requested.
    pub(crate) fn handle<T>(
        &mut self,
        now: SimTime,
        f: impl FnOnce(&mut TrafficScheduler<NameTable>, &mut NodeContext) -> T,
    ) -> (T, Vec<Action>) {
        self.ctx.now = now;
        let output = f(&mut self.source, &mut self.ctx);
        (output, std::mem::take(&mut self.ctx.actions))
    }
}

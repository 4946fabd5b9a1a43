use trafgen_common::SimTime;
use trafgen_wire::{Address, Unit};

use crate::TimerKind;

/// Whether a unit was sent or received, as reported to [`Host::notify`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Sent,
    Received,
}

/// The environment a [`TrafficScheduler`](crate::TrafficScheduler) runs in.
///
/// The host owns the virtual clock, delivers timer fires back to the scheduler, and carries
/// sent units onward. All calls are synchronous: arming a timer only registers it.
pub trait Host {
    /// Returns the current virtual time.
    fn now(&self) -> SimTime;

    /// Returns whether the owning node is up. Only queried when the scheduler initializes;
    /// later changes are delivered through `start` and `stop`.
    fn is_operational(&self) -> bool {
        true
    }

    /// Registers a fire of kind `kind` at virtual time `at`, replacing nothing: the scheduler
    /// guarantees it never has more than one timer armed.
    fn arm_timer(&mut self, at: SimTime, kind: TimerKind);

    /// Cancels the armed timer. A cancelled timer must never fire.
    fn cancel_timer(&mut self);

    /// Hands a unit to the transport layer below. No acknowledgment is expected.
    fn send_unit(&mut self, unit: Unit);

    /// Accounting hook, called once for every unit sent or received.
    fn notify(&mut self, direction: Direction, unit: &Unit);
}

/// Turns textual destination names into addresses.
pub trait AddressResolver {
    /// Resolves `name`, returning `None` if it does not name a known address.
    fn resolve(&self, name: &str) -> Option<Address>;
}

impl<F> AddressResolver for F
where
    F: Fn(&str) -> Option<Address>,
{
    fn resolve(&self, name: &str) -> Option<Address> {
        self(name)
    }
}

/// Resolves literal IPv4, IPv6 and hardware addresses only.
#[derive(Debug, Clone, Copy, Default)]
pub struct LiteralResolver;

impl AddressResolver for LiteralResolver {
    fn resolve(&self, name: &str) -> Option<Address> {
        name.parse().ok()
    }
}

//! A lifecycle-aware periodic traffic source.
//!
//! A [`TrafficScheduler`] emits synthetic [`Unit`]s to one of several destinations on a
//! schedule driven by a host-owned virtual clock. It honours an absolute start/stop window, an
//! optional packet limit and the up/down state of the node it runs on.
//!
//! The scheduler never blocks and owns no clock of its own. Every handler takes the [`Host`] it
//! runs in, registers at most one timer there, and returns.

mod config;
pub use config::{ConfigError, TrafGenConfig, TrafGenOptions};

mod host;
pub use host::{AddressResolver, Direction, Host, LiteralResolver};

mod scheduler;
pub use scheduler::{TimerState, TrafGenError, TrafficScheduler};

mod stats;
pub use stats::Stats;

pub mod supplier;
pub use supplier::ValueSupplier;

pub use trafgen_common::SimTime;
pub use trafgen_wire::{Address, ProtocolId, Unit};

/// Tags the single timer a [`TrafficScheduler`] may have armed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    /// The first fire of an active window. Re-resolves the destination list.
    Initial,
    /// A periodic fire.
    Subsequent,
}

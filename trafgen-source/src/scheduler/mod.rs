use rand::{rngs::StdRng, Rng, SeedableRng};
use thiserror::Error;
use tracing::{debug, error, trace, warn};

use trafgen_common::SimTime;
use trafgen_wire::{unit, Address, Unit};

use crate::{
    config::{ConfigError, TrafGenConfig, TrafGenOptions},
    host::{AddressResolver, Direction, Host, LiteralResolver},
    stats::Stats,
    TimerKind,
};

mod state;
pub use state::TimerState;

#[derive(Debug, Error)]
pub enum TrafGenError {
    #[error("Application is not running")]
    NotRunning,
    #[error("Unexpected {0:?} timer fire")]
    UnexpectedTimer(TimerKind),
    #[error("No destination to send to")]
    NoDestination,
    #[error("Packet limit of {0} units reached")]
    LimitReached(u64),
    #[error("Sending window closed at {0}")]
    WindowClosed(SimTime),
    #[error("Wire protocol error: {0:?}")]
    Wire(#[from] unit::Error),
}

/// A periodic traffic source bound to the lifecycle of its node.
///
/// # Lifecycle
/// - [`initialize`](Self::initialize) queries the host for the node status and starts the
///   scheduler if the node is up.
/// - [`start`](Self::start) and [`stop`](Self::stop) follow the node going up and down.
/// - [`on_timer`](Self::on_timer) is called by the host when the armed timer fires.
/// - [`teardown`](Self::teardown) releases the pending timer, if any.
///
/// While active, the first fire of every window (kind [`TimerKind::Initial`]) re-resolves the
/// destination list; every fire sends one unit to a random destination if there is one, and
/// rearms one interval later for as long as the packet limit and the stop time allow.
#[derive(Debug)]
pub struct TrafficScheduler<R = LiteralResolver> {
    config: TrafGenConfig,
    resolver: R,
    /// Destination chooser.
    rng: StdRng,
    /// Resolved at the start of every active window. May be empty.
    destinations: Vec<Address>,
    stats: Stats,
    /// Mirror of the node status.
    operational: bool,
    timer: TimerState,
}

impl TrafficScheduler<LiteralResolver> {
    /// Creates a scheduler whose destinations are literal addresses.
    pub fn new(config: TrafGenConfig) -> Self {
        Self::with_resolver(config, LiteralResolver)
    }
}

impl<R: AddressResolver> TrafficScheduler<R> {
    /// Creates a scheduler resolving destination names with `resolver`.
    pub fn with_resolver(config: TrafGenConfig, resolver: R) -> Self {
        Self {
            rng: StdRng::seed_from_u64(config.seed()),
            config,
            resolver,
            destinations: Vec::new(),
            stats: Stats::default(),
            operational: false,
            timer: TimerState::Idle,
        }
    }

    /// Validates `options` and creates a scheduler from them.
    ///
    /// ## Errors
    /// Fails if the options are invalid; see [`TrafGenOptions::build`].
    pub fn from_options(options: TrafGenOptions, resolver: R) -> Result<Self, ConfigError> {
        Ok(Self::with_resolver(options.build()?, resolver))
    }

    #[inline]
    pub fn config(&self) -> &TrafGenConfig {
        &self.config
    }

    #[inline]
    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    #[inline]
    pub fn sent(&self) -> u64 {
        self.stats.sent()
    }

    #[inline]
    pub fn received(&self) -> u64 {
        self.stats.received()
    }

    /// The destinations resolved at the start of the current window.
    #[inline]
    pub fn destinations(&self) -> &[Address] {
        &self.destinations
    }

    #[inline]
    pub fn timer(&self) -> TimerState {
        self.timer
    }

    #[inline]
    pub fn is_operational(&self) -> bool {
        self.operational
    }

    /// Returns `true` while the packet limit, if any, has not been reached.
    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.config.packet_limit().map_or(true, |limit| self.stats.sent() < limit)
    }

    /// Picks up the node status from the host and starts if the node is up.
    pub fn initialize<H: Host>(&mut self, host: &mut H) {
        self.operational = host.is_operational();
        debug!(operational = self.operational, "initialized traffic source");

        if self.operational {
            self.start(host);
        }
    }

    /// Called when the node comes up. Arms the initial timer at the later of the start time
    /// and now, unless the packet limit is exhausted or the window has already closed.
    pub fn start<H: Host>(&mut self, host: &mut H) {
        self.operational = true;

        // Restarting while armed must not leave a second timer behind.
        if self.timer.is_armed() {
            host.cancel_timer();
            self.timer = TimerState::Idle;
        }

        if self.is_enabled() {
            self.schedule_next(host, None);
        } else {
            debug!(sent = self.stats.sent(), "packet limit reached, not starting");
            self.timer = TimerState::Disabled;
        }
    }

    /// Called when the node goes down or crashes. Cancels the pending timer, if any.
    pub fn stop<H: Host>(&mut self, host: &mut H) {
        self.operational = false;

        if self.timer.is_armed() {
            debug!(timer = ?self.timer, "cancelling pending timer");
            host.cancel_timer();
        }

        self.timer = TimerState::Disabled;
    }

    /// Stops the scheduler for good, releasing the pending timer.
    pub fn teardown<H: Host>(mut self, host: &mut H) {
        self.stop(host);
        debug!(sent = self.stats.sent(), received = self.stats.received(), "torn down");
    }

    /// Handles a fire of the armed timer.
    ///
    /// Sends at most one unit, then rearms if still enabled. A failed emission does not stop
    /// the schedule: the timer is rearmed before the error is returned.
    ///
    /// ## Errors
    /// - [`TrafGenError::NotRunning`] if the node is down.
    /// - [`TrafGenError::UnexpectedTimer`] if no timer of kind `kind` is armed.
    /// - Any error of [`emit_unit`](Self::emit_unit).
    pub fn on_timer<H: Host>(&mut self, host: &mut H, kind: TimerKind) -> Result<(), TrafGenError> {
        if !self.operational {
            return Err(TrafGenError::NotRunning);
        }

        match self.timer.armed() {
            Some((armed, _)) if armed == kind => self.timer = TimerState::Idle,
            _ => return Err(TrafGenError::UnexpectedTimer(kind)),
        }

        let now = host.now();
        trace!(?kind, %now, "timer fired");

        if kind == TimerKind::Initial {
            self.resolve_destinations();
        }

        let mut result = Ok(());
        if !self.destinations.is_empty() {
            if let Err(e) = self.emit_unit(host) {
                error!(err = ?e, "failed to emit unit");
                result = Err(e);
            }
        }

        if self.is_enabled() {
            self.schedule_next(host, Some(now));
        } else {
            debug!(sent = self.stats.sent(), "packet limit reached");
            self.timer = TimerState::Disabled;
        }

        result
    }

    /// Sends one unit to a random destination.
    ///
    /// ## Errors
    /// Nothing is sent and nothing is counted on any error.
    /// - [`TrafGenError::NotRunning`] if the node is down.
    /// - [`TrafGenError::LimitReached`] if the packet limit is exhausted.
    /// - [`TrafGenError::WindowClosed`] if the host clock is at or past the stop time.
    /// - [`TrafGenError::NoDestination`] if the destination list is empty.
    /// - [`TrafGenError::Wire`] if the drawn payload does not fit in a unit.
    pub fn emit_unit<H: Host>(&mut self, host: &mut H) -> Result<(), TrafGenError> {
        if !self.operational {
            return Err(TrafGenError::NotRunning);
        }
        if let Some(limit) = self.config.packet_limit().filter(|_| !self.is_enabled()) {
            return Err(TrafGenError::LimitReached(limit));
        }
        if let Some(stop) = self.config.stop_time().filter(|stop| host.now() >= *stop) {
            return Err(TrafGenError::WindowClosed(stop));
        }
        if self.destinations.is_empty() {
            return Err(TrafGenError::NoDestination);
        }

        let payload_len = self.config.payload_len.next_value();
        if payload_len > unit::MAX_PAYLOAD_LEN {
            return Err(unit::Error::PayloadTooLarge(payload_len).into());
        }

        let destination = self.destinations[self.rng.gen_range(0..self.destinations.len())];

        // Sequence numbers wrap on the wire.
        let seq = self.stats.sent() as u32;
        let unit = Unit::new(seq, self.config.protocol(), destination, payload_len);

        debug!(
            name = unit.name(),
            len = payload_len,
            %destination,
            protocol = %self.config.protocol(),
            "sending unit"
        );

        self.stats.increment_tx(payload_len);
        host.notify(Direction::Sent, &unit);
        host.send_unit(unit);

        Ok(())
    }

    /// Accounts for and discards a unit addressed to this node.
    pub fn on_unit_arrived<H: Host>(&mut self, host: &mut H, unit: Unit) {
        if !self.operational {
            warn!(name = unit.name(), "node is down, dropping unit");
            return;
        }

        debug!(
            name = unit.name(),
            len = unit.payload_len(),
            src = ?unit.source(),
            dest = %unit.destination(),
            "received unit"
        );

        host.notify(Direction::Received, &unit);
        self.stats.increment_rx(unit.payload_len());
    }

    /// Rebuilds the destination list from the configured names. Unresolvable names are skipped.
    fn resolve_destinations(&mut self) {
        self.destinations.clear();

        for name in self.config.destination_names() {
            match self.resolver.resolve(name) {
                Some(address) => self.destinations.push(address),
                None => error!(name, "cannot resolve destination address"),
            }
        }

        debug!(destinations = ?self.destinations, "resolved destinations");
    }

    /// Arms the next timer. Without a `previous` fire this is the initial timer of a window.
    /// Nothing is armed if the fire time is at or past the stop time.
    fn schedule_next<H: Host>(&mut self, host: &mut H, previous: Option<SimTime>) {
        let (at, kind) = match previous {
            None => (self.config.start_time().max(host.now()), TimerKind::Initial),
            Some(previous) => {
                (previous + self.config.send_interval.next_value(), TimerKind::Subsequent)
            }
        };

        if self.config.before_stop(at) {
            trace!(?kind, %at, "arming timer");
            host.arm_timer(at, kind);
            self.timer = TimerState::Armed { kind, at };
        } else {
            debug!(%at, stop = ?self.config.stop_time(), "window closed, not rearming");
            self.timer = TimerState::Disabled;
        }
    }
}

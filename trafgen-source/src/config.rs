use std::{fmt, time::Duration};

use thiserror::Error;
use trafgen_common::SimTime;
use trafgen_wire::ProtocolId;

use crate::supplier::{Constant, ValueSupplier};

/// The default payload length of an emitted unit, in bytes.
const DEFAULT_PAYLOAD_LEN: usize = 56;

/// The default time between two units.
const DEFAULT_SEND_INTERVAL: Duration = Duration::from_millis(10);

/// The default start of the active window.
const DEFAULT_START_TIME: SimTime = SimTime::from_secs(1);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid startTime/stopTime: stop {stop} is before start {start}")]
    InvalidWindow { start: SimTime, stop: SimTime },
}

/// Options for a [`TrafficScheduler`](crate::TrafficScheduler).
///
/// Validated once by [`TrafGenOptions::build`].
pub struct TrafGenOptions {
    protocol: ProtocolId,
    /// `None` means no limit.
    packet_limit: Option<u64>,
    start_time: SimTime,
    /// `None` means the window never closes.
    stop_time: Option<SimTime>,
    payload_len: Box<dyn ValueSupplier<usize>>,
    send_interval: Box<dyn ValueSupplier<Duration>>,
    /// Whitespace- or comma-separated destination names.
    destinations: String,
    /// Seed for the destination chooser.
    seed: u64,
}

impl Default for TrafGenOptions {
    fn default() -> Self {
        Self {
            protocol: ProtocolId::EXPERIMENTAL,
            packet_limit: None,
            start_time: DEFAULT_START_TIME,
            stop_time: None,
            payload_len: Box::new(Constant(DEFAULT_PAYLOAD_LEN)),
            send_interval: Box::new(Constant(DEFAULT_SEND_INTERVAL)),
            destinations: String::new(),
            seed: 0,
        }
    }
}

impl fmt::Debug for TrafGenOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrafGenOptions")
            .field("protocol", &self.protocol)
            .field("packet_limit", &self.packet_limit)
            .field("start_time", &self.start_time)
            .field("stop_time", &self.stop_time)
            .field("destinations", &self.destinations)
            .field("seed", &self.seed)
            .finish_non_exhaustive()
    }
}

impl TrafGenOptions {
    /// Sets the protocol emitted units are tagged with.
    pub fn protocol(mut self, protocol: ProtocolId) -> Self {
        self.protocol = protocol;
        self
    }

    /// Sets the maximum number of units to send over the lifetime of the scheduler.
    pub fn packet_limit(mut self, limit: u64) -> Self {
        self.packet_limit = Some(limit);
        self
    }

    /// Sets the virtual time at which the first unit may be sent.
    pub fn start_time(mut self, start: SimTime) -> Self {
        self.start_time = start;
        self
    }

    /// Sets the virtual time at which sending ends. No unit is sent at or after `stop`.
    pub fn stop_time(mut self, stop: SimTime) -> Self {
        self.stop_time = Some(stop);
        self
    }

    /// Sets the supplier queried for the payload length of every unit.
    pub fn payload_len(mut self, supplier: impl ValueSupplier<usize> + 'static) -> Self {
        self.payload_len = Box::new(supplier);
        self
    }

    /// Sets the supplier queried for the time between two units.
    pub fn send_interval(mut self, supplier: impl ValueSupplier<Duration> + 'static) -> Self {
        self.send_interval = Box::new(supplier);
        self
    }

    /// Sets the destination names. The list is re-resolved at the start of every active window.
    pub fn destinations(mut self, names: impl Into<String>) -> Self {
        self.destinations = names.into();
        self
    }

    /// Sets the seed of the random destination chooser.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Validates the options.
    ///
    /// ## Errors
    /// - [`ConfigError::InvalidWindow`] if a stop time is set and lies before the start time.
    pub fn build(self) -> Result<TrafGenConfig, ConfigError> {
        if let Some(stop) = self.stop_time {
            if stop < self.start_time {
                return Err(ConfigError::InvalidWindow { start: self.start_time, stop });
            }
        }

        Ok(TrafGenConfig {
            protocol: self.protocol,
            packet_limit: self.packet_limit,
            start_time: self.start_time,
            stop_time: self.stop_time,
            payload_len: self.payload_len,
            send_interval: self.send_interval,
            destinations: self.destinations,
            seed: self.seed,
        })
    }
}

/// Validated scheduler configuration. Built with [`TrafGenOptions::build`].
pub struct TrafGenConfig {
    protocol: ProtocolId,
    packet_limit: Option<u64>,
    start_time: SimTime,
    stop_time: Option<SimTime>,
    pub(crate) payload_len: Box<dyn ValueSupplier<usize>>,
    pub(crate) send_interval: Box<dyn ValueSupplier<Duration>>,
    destinations: String,
    seed: u64,
}

impl fmt::Debug for TrafGenConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrafGenConfig")
            .field("protocol", &self.protocol)
            .field("packet_limit", &self.packet_limit)
            .field("start_time", &self.start_time)
            .field("stop_time", &self.stop_time)
            .field("destinations", &self.destinations)
            .field("seed", &self.seed)
            .finish_non_exhaustive()
    }
}

impl TrafGenConfig {
    #[inline]
    pub fn protocol(&self) -> ProtocolId {
        self.protocol
    }

    #[inline]
    pub fn packet_limit(&self) -> Option<u64> {
        self.packet_limit
    }

    #[inline]
    pub fn start_time(&self) -> SimTime {
        self.start_time
    }

    #[inline]
    pub fn stop_time(&self) -> Option<SimTime> {
        self.stop_time
    }

    #[inline]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Returns whether `at` lies before the stop time, if any.
    #[inline]
    pub fn before_stop(&self, at: SimTime) -> bool {
        self.stop_time.map_or(true, |stop| at < stop)
    }

    /// Iterates over the configured destination names, in order.
    pub fn destination_names(&self) -> impl Iterator<Item = &str> {
        self.destinations.split(|c: char| c.is_whitespace() || c == ',').filter(|s| !s.is_empty())
    }
}

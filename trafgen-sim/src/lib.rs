//! Deterministic discrete-event host for trafgen traffic sources.
//!
//! A [`Simulation`] owns the virtual clock and one [`TrafficScheduler`] per node. Timer
//! requests, node status changes and unit deliveries are queued as events ordered by
//! (time, schedule order) and processed one at a time, so a run is fully reproducible.
//!
//! ```text
//!   event queue (BTreeMap<EventKey, Event>)
//!        │  pop earliest
//!        ▼
//!   node.source.on_timer / start / stop / on_unit_arrived
//!        │  buffered host requests
//!        ▼
//!   actions → new events (timers, arrivals), records
//! ```
//!
//! Sent units get the sender's address as their source, are encoded with
//! [`unit::Codec`](trafgen_wire::unit::Codec), and are delivered after the configured link
//! latency to the node owning the destination address.

use std::{collections::BTreeMap, time::Duration};

use bytes::BytesMut;
use rustc_hash::FxHashMap;
use thiserror::Error;
use tokio_util::codec::{Decoder, Encoder};
use tracing::{debug, debug_span, trace, warn};

use trafgen_common::SimTime;
use trafgen_source::{ConfigError, Direction, Stats, TrafGenError, TrafGenOptions, TrafficScheduler};
use trafgen_wire::{unit, Address, Unit};

mod event_queue;
use event_queue::{Event, EventKey};

mod names;
pub use names::NameTable;

mod node;
use node::{Action, Node, NodeContext};
pub use node::NodeStatus;

/// Index of a node in a [`Simulation`], in order of creation.
pub type NodeIndex = usize;

#[derive(Debug, Error)]
pub enum SimError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Name already registered: {0}")]
    DuplicateName(String),
    #[error("Address already in use: {0}")]
    DuplicateAddress(Address),
    #[error("Unknown node: {0}")]
    UnknownNode(NodeIndex),
}

/// One accounting event reported by a traffic source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub time: SimTime,
    pub node: NodeIndex,
    pub direction: Direction,
    pub seq: u32,
    pub destination: Address,
    /// Payload length in bytes.
    pub len: usize,
}

/// Simulation-wide counters.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SimulationStats {
    pub events_processed: u64,
    /// Units handed to a destination node.
    pub units_delivered: u64,
    /// Units addressed to no known node, or that failed to encode.
    pub units_dropped: u64,
    /// Timer events discarded because their timer was cancelled.
    pub stale_timers: u64,
}

/// A deterministic discrete-event simulation of traffic sources.
#[derive(Debug, Default)]
pub struct Simulation {
    now: SimTime,
    /// Monotonic counter giving events at the same time a FIFO order.
    sequence: u64,
    event_queue: BTreeMap<EventKey, Event>,
    /// Torn-down nodes leave a hole, so indices stay stable.
    nodes: Vec<Option<Node>>,
    by_address: FxHashMap<Address, NodeIndex>,
    names: NameTable,
    /// One-way delay of every link.
    latency: Duration,
    records: Vec<Record>,
    errors: Vec<(SimTime, NodeIndex, TrafGenError)>,
    stats: SimulationStats,
}

impl Simulation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the one-way delay between any two nodes.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    #[inline]
    pub fn now(&self) -> SimTime {
        self.now
    }

    /// The name table shared by every traffic source in this simulation.
    #[inline]
    pub fn names(&self) -> &NameTable {
        &self.names
    }

    /// Every accounting event so far, in order.
    #[inline]
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Every error returned by a traffic source so far.
    #[inline]
    pub fn errors(&self) -> &[(SimTime, NodeIndex, TrafGenError)] {
        &self.errors
    }

    #[inline]
    pub fn stats(&self) -> &SimulationStats {
        &self.stats
    }

    /// Returns the number of queued events.
    #[inline]
    pub fn pending_events(&self) -> usize {
        self.event_queue.len()
    }

    /// Returns the traffic source of `node`, unless it was torn down.
    pub fn source(&self, node: NodeIndex) -> Option<&TrafficScheduler<NameTable>> {
        self.node(node).map(|node| &node.source)
    }

    pub fn status(&self, node: NodeIndex) -> Option<NodeStatus> {
        self.node(node).map(|node| node.ctx.status)
    }

    pub fn name(&self, node: NodeIndex) -> Option<&str> {
        self.node(node).map(|node| node.name.as_str())
    }

    /// Looks up a node by name.
    pub fn find(&self, name: &str) -> Option<NodeIndex> {
        self.nodes.iter().flatten().find(|node| node.name == name).map(|node| node.index)
    }

    /// Returns the number of queued, live (not cancelled) timer events of `node`.
    pub fn pending_timers(&self, node: NodeIndex) -> usize {
        let Some(generation) = self.node(node).map(|n| n.timer_generation) else {
            return 0;
        };

        self.event_queue
            .iter()
            .filter(|(key, event)| {
                key.node == node &&
                    matches!(event, Event::Timer { generation: g, .. } if *g == generation)
            })
            .count()
    }

    /// Returns the number of units `node` dropped because they could not be decoded.
    pub fn malformed(&self, node: NodeIndex) -> u64 {
        self.node(node).map_or(0, |node| node.malformed)
    }

    /// Adds a node that is up, and initializes its traffic source at the current time.
    pub fn add_node(
        &mut self,
        name: impl Into<String>,
        address: impl Into<Address>,
        options: TrafGenOptions,
    ) -> Result<NodeIndex, SimError> {
        self.add_node_with_status(name, address, options, NodeStatus::Up)
    }

    /// Adds a node with the given initial status, and initializes its traffic source at the
    /// current time. A node that starts down sends nothing until it is brought up.
    pub fn add_node_with_status(
        &mut self,
        name: impl Into<String>,
        address: impl Into<Address>,
        options: TrafGenOptions,
        status: NodeStatus,
    ) -> Result<NodeIndex, SimError> {
        let name = name.into();
        let address = address.into();

        if self.names.contains(&name) {
            return Err(SimError::DuplicateName(name));
        }
        if self.by_address.contains_key(&address) {
            return Err(SimError::DuplicateAddress(address));
        }

        let source = TrafficScheduler::from_options(options, self.names.clone())?;
        let index = self.nodes.len();

        debug!(index, %name, %address, ?status, "adding node");

        self.names.insert(name.clone(), address);
        self.by_address.insert(address, index);
        self.nodes.push(Some(Node {
            index,
            name,
            address,
            source,
            ctx: NodeContext { now: self.now, status, actions: Vec::new() },
            timer_generation: 0,
            malformed: 0,
        }));

        let now = self.now;
        if let Some(node) = self.node_mut(index) {
            let ((), actions) = node.handle(now, |source, ctx| source.initialize(ctx));
            self.apply_actions(index, actions);
        }

        Ok(index)
    }

    /// Schedules `node` to change status at `at`.
    pub fn schedule_status(
        &mut self,
        node: NodeIndex,
        at: SimTime,
        status: NodeStatus,
    ) -> Result<(), SimError> {
        if self.node(node).is_none() {
            return Err(SimError::UnknownNode(node));
        }

        let event = match status {
            NodeStatus::Up => Event::NodeUp,
            NodeStatus::Down => Event::NodeDown,
        };
        self.schedule_event(node, at.max(self.now), event);

        Ok(())
    }

    /// Removes `node` from the simulation, releasing its pending timer. Returns the final
    /// counters of its traffic source.
    pub fn teardown(&mut self, node: NodeIndex) -> Result<Stats, SimError> {
        let mut removed = self
            .nodes
            .get_mut(node)
            .and_then(Option::take)
            .ok_or(SimError::UnknownNode(node))?;

        self.names.remove(&removed.name);
        self.by_address.remove(&removed.address);

        removed.ctx.now = self.now;
        let stats = *removed.source.stats();
        removed.source.teardown(&mut removed.ctx);

        // Only a cancel can come out of a teardown; the node is gone, so queued events for it
        // are skipped on delivery.
        debug!(name = %removed.name, actions = removed.ctx.actions.len(), "node torn down");

        Ok(stats)
    }

    /// Processes every event due at or before `end`, then advances the clock to `end`.
    /// Returns the number of events processed.
    pub fn run_until(&mut self, end: SimTime) -> u64 {
        let mut processed = 0;

        while self.event_queue.first_key_value().is_some_and(|(key, _)| key.time <= end) {
            let Some((key, event)) = self.event_queue.pop_first() else { break };
            self.process(key, event);
            processed += 1;
        }

        if self.now < end {
            self.now = end;
        }

        processed
    }

    /// Processes events until the queue is empty.
    ///
    /// Only returns once every source has hit its packet limit or stop time, or every node is
    /// down. A source whose destinations all fail to resolve keeps rearming, so with such a
    /// source, or any source without a limit or stop time, use [`run_until`](Self::run_until).
    pub fn run(&mut self) -> u64 {
        let mut processed = 0;

        while let Some((key, event)) = self.event_queue.pop_first() {
            self.process(key, event);
            processed += 1;
        }

        processed
    }

    /// Runs the simulation for `duration` of virtual time.
    pub fn run_for(&mut self, duration: Duration) -> u64 {
        self.run_until(self.now + duration)
    }

    fn node(&self, index: NodeIndex) -> Option<&Node> {
        self.nodes.get(index).and_then(Option::as_ref)
    }

    fn node_mut(&mut self, index: NodeIndex) -> Option<&mut Node> {
        self.nodes.get_mut(index).and_then(Option::as_mut)
    }

    fn schedule_event(&mut self, node: NodeIndex, time: SimTime, event: Event) {
        self.sequence += 1;
        self.event_queue.insert(EventKey { time, sequence: self.sequence, node }, event);
    }

    fn process(&mut self, key: EventKey, event: Event) {
        self.now = key.time;
        trace!(time = %self.now, node = key.node, ?event, "processing event");

        self.dispatch(key.node, event);
        self.stats.events_processed += 1;
    }

    fn dispatch(&mut self, index: NodeIndex, event: Event) {
        let now = self.now;
        let Some(node) = self.nodes.get_mut(index).and_then(Option::as_mut) else {
            trace!(index, "dropping event for removed node");
            return;
        };

        let _span = debug_span!("node", name = %node.name).entered();

        let (result, actions) = match event {
            Event::Timer { kind, generation } => {
                if generation != node.timer_generation {
                    trace!(?kind, "skipping cancelled timer");
                    self.stats.stale_timers += 1;
                    return;
                }

                node.handle(now, |source, ctx| source.on_timer(ctx, kind))
            }
            Event::Arrival { wire } => {
                let mut src = BytesMut::from(&wire[..]);
                match unit::Codec::new().decode(&mut src) {
                    Ok(Some(unit)) => node.handle(now, |source, ctx| {
                        source.on_unit_arrived(ctx, unit);
                        Ok(())
                    }),
                    Ok(None) => {
                        warn!(len = wire.len(), "truncated unit, dropping");
                        node.malformed += 1;
                        return;
                    }
                    Err(e) => {
                        warn!(err = ?e, "malformed unit, dropping");
                        node.malformed += 1;
                        return;
                    }
                }
            }
            Event::NodeUp => {
                if node.ctx.status == NodeStatus::Up {
                    return;
                }
                debug!("node up");
                node.ctx.status = NodeStatus::Up;
                node.handle(now, |source, ctx| {
                    source.start(ctx);
                    Ok(())
                })
            }
            Event::NodeDown => {
                if node.ctx.status == NodeStatus::Down {
                    return;
                }
                debug!("node down");
                node.ctx.status = NodeStatus::Down;
                node.handle(now, |source, ctx| {
                    source.stop(ctx);
                    Ok(())
                })
            }
        };

        self.apply_actions(index, actions);

        if let Err(e) = result {
            warn!(err = ?e, "traffic source error");
            self.errors.push((now, index, e));
        }
    }

    fn apply_actions(&mut self, from: NodeIndex, actions: Vec<Action>) {
        for action in actions {
            match action {
                Action::ArmTimer { at, kind } => {
                    let Some(generation) = self.node(from).map(|node| node.timer_generation) else {
                        continue;
                    };
                    self.schedule_event(from, at, Event::Timer { kind, generation });
                }
                Action::CancelTimer => {
                    if let Some(node) = self.node_mut(from) {
                        node.timer_generation += 1;
                    }
                }
                Action::Send(unit) => self.route(from, unit),
                Action::Notify { direction, seq, destination, len } => {
                    self.records.push(Record {
                        time: self.now,
                        node: from,
                        direction,
                        seq,
                        destination,
                        len,
                    });
                }
            }
        }
    }

    /// Stamps the sender's address on `unit`, encodes it and schedules its arrival.
    fn route(&mut self, from: NodeIndex, unit: Unit) {
        let Some(source) = self.node(from).map(|node| node.address) else {
            return;
        };

        let destination = unit.destination();
        let Some(&to) = self.by_address.get(&destination) else {
            debug!(%destination, "no node at destination, dropping unit");
            self.stats.units_dropped += 1;
            return;
        };

        let mut wire = BytesMut::new();
        if let Err(e) = unit::Codec::new().encode(unit.with_source(source), &mut wire) {
            warn!(err = ?e, "failed to encode unit, dropping");
            self.stats.units_dropped += 1;
            return;
        }

        self.stats.units_delivered += 1;
        let at = self.now + self.latency;
        self.schedule_event(to, at, Event::Arrival { wire: wire.freeze() });
    }
}

use std::{net::Ipv4Addr, time::Duration};

use trafgen_sim::{NodeStatus, Record, Simulation};
use trafgen_source::{
    supplier::{Constant, Exponential, Uniform},
    Address, Direction, SimTime, TrafGenOptions,
};

fn addr(last: u8) -> Address {
    Address::Ipv4(Ipv4Addr::new(10, 0, 0, last))
}

fn sink() -> TrafGenOptions {
    TrafGenOptions::default().packet_limit(0)
}

/// Three sources sending to each other with random sizes, intervals and destinations.
fn mesh(seed: u64) -> Simulation {
    let mut sim = Simulation::new().with_latency(Duration::from_micros(250));

    for i in 0..3u8 {
        let destinations = (0..3u8)
            .filter(|j| *j != i)
            .map(|j| format!("host[{j}]"))
            .collect::<Vec<_>>()
            .join(" ");

        sim.add_node(
            format!("host[{i}]"),
            addr(i + 1),
            TrafGenOptions::default()
                .packet_limit(50)
                .payload_len(Uniform::new_inclusive(1usize, 1500, seed + u64::from(i)))
                .send_interval(Exponential::new(Duration::from_millis(20), seed + 10))
                .destinations(destinations)
                .seed(seed + u64::from(i)),
        )
        .unwrap();
    }

    sim
}

#[test]
fn units_reach_their_destination() {
    let _ = tracing_subscriber::fmt::try_init();

    let mut sim = mesh(42);
    sim.run_until(SimTime::from_secs(60));

    let mut bytes_tx = 0;
    let mut bytes_rx = 0;
    for node in 0..3 {
        let stats = *sim.source(node).unwrap().stats();
        assert_eq!(stats.sent(), 50);
        bytes_tx += stats.bytes_tx();
        bytes_rx += stats.bytes_rx();
    }

    let received = (0..3).map(|node| sim.source(node).unwrap().received()).sum::<u64>();
    assert_eq!(received, 150);
    assert_eq!(bytes_tx, bytes_rx);

    // Every received unit was sent to the node that got it, and never to its sender.
    for record in sim.records().iter().filter(|r| r.direction == Direction::Received) {
        assert_eq!(record.destination, addr(record.node as u8 + 1));
    }
    for record in sim.records().iter().filter(|r| r.direction == Direction::Sent) {
        assert_ne!(record.destination, addr(record.node as u8 + 1));
    }

    assert_eq!(sim.stats().units_dropped, 0);
    assert!(sim.errors().is_empty());
}

#[test]
fn runs_are_reproducible() {
    let run = |seed| {
        let mut sim = mesh(seed);
        sim.run_until(SimTime::from_secs(60));
        sim.records().to_vec()
    };

    let first: Vec<Record> = run(7);
    assert_eq!(first, run(7));
    assert_ne!(first, run(8));
}

#[test]
fn sequence_numbers_count_emissions() {
    let mut sim = Simulation::new();
    let source = sim
        .add_node(
            "source",
            addr(1),
            TrafGenOptions::default().packet_limit(5).destinations("10.0.0.9"),
        )
        .unwrap();

    sim.run_until(SimTime::from_secs(2));

    let seqs = sim
        .records()
        .iter()
        .filter(|r| r.node == source)
        .map(|r| r.seq)
        .collect::<Vec<_>>();
    assert_eq!(seqs, vec![0, 1, 2, 3, 4]);
}

#[test]
fn late_names_are_picked_up_by_the_next_window() {
    let _ = tracing_subscriber::fmt::try_init();

    let mut sim = Simulation::new();
    let source = sim
        .add_node(
            "source",
            addr(1),
            TrafGenOptions::default()
                .start_time(SimTime::from_secs(1))
                .send_interval(Constant(Duration::from_secs(1)))
                .destinations("sink"),
        )
        .unwrap();

    // Nothing named "sink" yet: the window starts with no destinations.
    sim.run_until(SimTime::from_millis(3500));
    assert_eq!(sim.source(source).unwrap().sent(), 0);
    assert!(sim.source(source).unwrap().destinations().is_empty());
    assert_eq!(sim.pending_timers(source), 1);

    let sink = sim.add_node("sink", addr(2), sink()).unwrap();

    // Still the same window, so the new name is not resolved yet.
    sim.run_until(SimTime::from_millis(4500));
    assert_eq!(sim.source(source).unwrap().sent(), 0);

    sim.schedule_status(source, SimTime::from_secs(5), NodeStatus::Down).unwrap();
    sim.schedule_status(source, SimTime::from_secs(6), NodeStatus::Up).unwrap();
    sim.run_until(SimTime::from_millis(8500));

    // New window at 6 resolves "sink": sends at 6, 7 and 8.
    assert_eq!(sim.source(source).unwrap().destinations(), &[addr(2)]);
    assert_eq!(sim.source(source).unwrap().sent(), 3);
    assert_eq!(sim.source(sink).unwrap().received(), 3);
}

#[test]
fn mixed_destination_list_skips_unknown_names() {
    let mut sim = Simulation::new();
    let sink = sim.add_node("sink", addr(2), sink()).unwrap();
    let source = sim
        .add_node(
            "source",
            addr(1),
            TrafGenOptions::default().packet_limit(20).destinations("nowhere, sink  also-nowhere"),
        )
        .unwrap();

    sim.run_until(SimTime::from_secs(2));

    assert_eq!(sim.source(source).unwrap().destinations(), &[addr(2)]);
    assert_eq!(sim.source(sink).unwrap().received(), 20);
}

#[test]
fn hardware_destinations_are_routed() {
    let mac: Address = "0A:AA:00:00:00:02".parse().unwrap();

    let mut sim = Simulation::new();
    let sink = sim.add_node("sink", mac, sink()).unwrap();
    sim.add_node(
        "source",
        addr(1),
        TrafGenOptions::default().packet_limit(3).destinations("0a-aa-00-00-00-02"),
    )
    .unwrap();

    sim.run_until(SimTime::from_secs(2));

    assert_eq!(sim.source(sink).unwrap().received(), 3);
    assert_eq!(sim.malformed(sink), 0);
}

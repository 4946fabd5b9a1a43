use std::{net::Ipv4Addr, time::Duration};

use trafgen_sim::{NodeStatus, Simulation};
use trafgen_source::{supplier::Constant, Address, Direction, SimTime, TimerState, TrafGenOptions};

fn addr(last: u8) -> Address {
    Address::Ipv4(Ipv4Addr::new(10, 0, 0, last))
}

fn sent_times(sim: &Simulation, node: usize) -> Vec<SimTime> {
    sim.records()
        .iter()
        .filter(|r| r.node == node && r.direction == Direction::Sent)
        .map(|r| r.time)
        .collect()
}

#[test]
fn packet_limit_bounds_emissions() {
    let _ = tracing_subscriber::fmt::try_init();

    let mut sim = Simulation::new();
    let sink = sim.add_node("sink", addr(2), TrafGenOptions::default().packet_limit(0)).unwrap();
    let source = sim
        .add_node(
            "source",
            addr(1),
            TrafGenOptions::default()
                .start_time(SimTime::from_secs(5))
                .packet_limit(3)
                .send_interval(Constant(Duration::from_secs(2)))
                .destinations("sink"),
        )
        .unwrap();

    sim.run_until(SimTime::from_secs(60));

    assert_eq!(
        sent_times(&sim, source),
        vec![SimTime::from_secs(5), SimTime::from_secs(7), SimTime::from_secs(9)]
    );
    assert_eq!(sim.source(source).unwrap().timer(), TimerState::Disabled);
    assert_eq!(sim.pending_timers(source), 0);
    assert_eq!(sim.source(sink).unwrap().received(), 3);
    assert!(sim.errors().is_empty());
}

#[test]
fn down_node_resumes_from_now() {
    let _ = tracing_subscriber::fmt::try_init();

    let mut sim = Simulation::new();
    sim.add_node("sink", addr(2), TrafGenOptions::default().packet_limit(0)).unwrap();
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

    sim.schedule_status(source, SimTime::from_millis(2500), NodeStatus::Down).unwrap();
    sim.schedule_status(source, SimTime::from_millis(4500), NodeStatus::Up).unwrap();
    sim.run_until(SimTime::from_millis(6000));

    // Fires at 1 and 2, nothing while down, a new window at 4.5.
    assert_eq!(
        sent_times(&sim, source),
        vec![
            SimTime::from_secs(1),
            SimTime::from_secs(2),
            SimTime::from_millis(4500),
            SimTime::from_millis(5500),
        ]
    );
    assert_eq!(sim.pending_timers(source), 1);
}

#[test]
fn node_starting_down_waits_for_up() {
    let mut sim = Simulation::new();
    let source = sim
        .add_node_with_status(
            "source",
            addr(1),
            TrafGenOptions::default().start_time(SimTime::from_secs(1)).destinations("10.0.0.2"),
            NodeStatus::Down,
        )
        .unwrap();

    assert_eq!(sim.pending_timers(source), 0);
    assert!(!sim.source(source).unwrap().is_operational());

    sim.schedule_status(source, SimTime::from_secs(3), NodeStatus::Up).unwrap();
    sim.run_until(SimTime::from_secs(3));

    assert_eq!(sent_times(&sim, source), vec![SimTime::from_secs(3)]);
}

#[test]
fn stop_time_closes_the_window() {
    let mut sim = Simulation::new();
    let source = sim
        .add_node(
            "source",
            addr(1),
            TrafGenOptions::default()
                .start_time(SimTime::from_secs(1))
                .stop_time(SimTime::from_secs(2))
                .send_interval(Constant(Duration::from_millis(300)))
                .destinations("10.0.0.2"),
        )
        .unwrap();

    sim.run_until(SimTime::from_secs(10));

    // 1.0, 1.3, 1.6, 1.9; 2.2 is past the stop time.
    assert_eq!(sim.source(source).unwrap().sent(), 4);
    assert_eq!(sim.source(source).unwrap().timer(), TimerState::Disabled);

    // Restarting after the window closed arms nothing.
    sim.schedule_status(source, SimTime::from_secs(11), NodeStatus::Down).unwrap();
    sim.schedule_status(source, SimTime::from_secs(12), NodeStatus::Up).unwrap();
    sim.run_until(SimTime::from_secs(20));

    assert_eq!(sim.source(source).unwrap().sent(), 4);
    assert_eq!(sim.pending_timers(source), 0);
}

#[test]
fn arrivals_while_down_are_dropped() {
    let mut sim = Simulation::new().with_latency(Duration::from_millis(10));
    let sink = sim.add_node("sink", addr(2), TrafGenOptions::default().packet_limit(0)).unwrap();
    sim.add_node(
        "source",
        addr(1),
        TrafGenOptions::default()
            .start_time(SimTime::from_secs(1))
            .send_interval(Constant(Duration::from_secs(1)))
            .packet_limit(4)
            .destinations("sink"),
    )
    .unwrap();

    sim.schedule_status(sink, SimTime::from_millis(1500), NodeStatus::Down).unwrap();
    sim.schedule_status(sink, SimTime::from_millis(3500), NodeStatus::Up).unwrap();
    sim.run_until(SimTime::from_secs(10));

    // Units arriving at 2.01 and 3.01 find the sink down.
    assert_eq!(sim.stats().units_delivered, 4);
    assert_eq!(sim.source(sink).unwrap().received(), 2);
}

#[test]
fn teardown_releases_the_timer() {
    let mut sim = Simulation::new();
    let source = sim
        .add_node(
            "source",
            addr(1),
            TrafGenOptions::default()
                .start_time(SimTime::from_secs(1))
                .send_interval(Constant(Duration::from_secs(1)))
                .destinations("10.0.0.2"),
        )
        .unwrap();

    sim.run_until(SimTime::from_millis(2500));
    let stats = sim.teardown(source).unwrap();
    sim.run_until(SimTime::from_secs(10));

    assert_eq!(stats.sent(), 2);
    assert_eq!(sent_times(&sim, source).len(), 2);
    assert!(sim.source(source).is_none());
}

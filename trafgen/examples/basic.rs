use std::time::Duration;

use trafgen::{
    sim::Simulation,
    supplier::{Constant, Uniform},
    Address, Direction, SimTime, TrafGenOptions,
};

fn main() {
    let _ = tracing_subscriber::fmt::try_init();

    let client_addr: Address = "10.0.0.1".parse().unwrap();
    let server_addr: Address = "10.0.0.2".parse().unwrap();

    let mut sim = Simulation::new().with_latency(Duration::from_millis(1));

    // A sink that only counts what it receives.
    let sink = sim
        .add_node("server", server_addr, TrafGenOptions::default().packet_limit(0))
        .unwrap();

    // A client sending 10 units of 64-1500 bytes every 100ms, starting at 1s.
    let client = sim
        .add_node(
            "client",
            client_addr,
            TrafGenOptions::default()
                .packet_limit(10)
                .payload_len(Uniform::new_inclusive(64usize, 1500, 1))
                .send_interval(Constant(Duration::from_millis(100)))
                .destinations("server"),
        )
        .unwrap();

    sim.run_until(SimTime::from_secs(5));

    for record in sim.records() {
        let arrow = match record.direction {
            Direction::Sent => "->",
            Direction::Received => "<-",
        };
        println!(
            "{} {} {arrow} {} appData-{} ({} bytes)",
            record.time,
            sim.name(record.node).unwrap_or("?"),
            record.destination,
            record.seq,
            record.len,
        );
    }

    let client = sim.source(client).unwrap().stats();
    let server = sim.source(sink).unwrap().stats();
    println!("client: sent {} ({} bytes)", client.sent(), client.bytes_tx());
    println!("server: received {} ({} bytes)", server.received(), server.bytes_rx());
}

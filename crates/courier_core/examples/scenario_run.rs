//! Run a seeded 20x20 scenario with automatic orders and print deliveries.
//!
//! Run with: cargo run -p courier_core --example scenario_run

use bevy_ecs::prelude::World;
use courier_core::runner::{run_ticks, simulation_schedule};
use courier_core::scenario::{build_scenario, ScenarioParams};

fn main() {
    const NUM_RIDERS: usize = 4;
    const NUM_HOTELS: usize = 3;
    const NUM_HOMES: usize = 12;
    const TICKS: u64 = 4_000;

    let mut world = World::new();
    build_scenario(
        &mut world,
        ScenarioParams::default()
            .with_seed(123)
            .with_counts(NUM_RIDERS, NUM_HOTELS, NUM_HOMES)
            .with_auto_orders(40),
    )
    .expect("scenario parameters are valid");

    let mut schedule = simulation_schedule();
    run_ticks(&mut world, &mut schedule, TICKS);

    let telemetry = world.resource::<courier_core::telemetry::SimTelemetry>();
    let delivered = telemetry.deliveries.len();
    let clock = world.resource::<courier_core::clock::SimulationClock>();

    println!(
        "--- Scenario run ({} riders, {} hotels, {} homes, seed 123) ---",
        NUM_RIDERS, NUM_HOTELS, NUM_HOMES
    );
    println!("Ticks executed: {}", clock.tick());
    println!("Simulation time: {:.1} s", clock.now_ms() as f64 / 1000.0);
    println!("Delivered orders: {}", delivered);

    if delivered > 0 {
        println!("\nSample deliveries (first 20):");
        const SAMPLE: usize = 20;
        for (i, d) in telemetry.deliveries.iter().take(SAMPLE).enumerate() {
            println!(
                "  {}  order=#{} rider={:?}  ride_time={} ms  total={} ms  distance={} cells  fare={:.2}",
                i + 1,
                d.order_seq,
                d.rider,
                d.ride_time_ms().unwrap_or(0),
                d.duration_ms,
                d.distance_cells,
                d.fare,
            );
        }
        if delivered > SAMPLE {
            println!("  ... and {} more", delivered - SAMPLE);
        }
    } else {
        println!("\nNo deliveries. (Walls are random; a rider may be boxed in away from every hotel.)");
    }
}

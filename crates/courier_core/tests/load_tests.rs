//! Load tests for courier_core: tick throughput on a large, busy grid.

use bevy_ecs::prelude::World;
use courier_core::runner::{run_ticks, simulation_schedule};
use courier_core::scenario::{build_scenario, ScenarioParams};
use courier_core::telemetry::SimTelemetry;
use std::time::Instant;

fn large_params() -> ScenarioParams {
    ScenarioParams::default()
        .with_seed(42)
        .with_grid(60, 60)
        .with_wall_density(0.15)
        .with_counts(40, 10, 120)
        .with_rider_speed(1.0)
        .with_auto_orders(2)
}

#[test]
#[ignore] // Only run explicitly: cargo test --package courier_core --test load_tests -- --ignored
fn test_sustained_load() {
    let mut world = World::new();
    build_scenario(&mut world, large_params()).expect("scenario");

    let ticks = 5_000;
    let start = Instant::now();
    let mut schedule = simulation_schedule();
    run_ticks(&mut world, &mut schedule, ticks);
    let duration = start.elapsed();

    let ticks_per_sec = ticks as f64 / duration.as_secs_f64();
    let delivered = world.resource::<SimTelemetry>().deliveries.len();
    println!(
        "Sustained load test: {} ticks in {:.2}s ({:.0} ticks/sec), {} deliveries",
        ticks,
        duration.as_secs_f64(),
        ticks_per_sec,
        delivered
    );

    assert!(delivered > 0, "no deliveries under load");
    assert!(
        ticks_per_sec > 200.0,
        "Should process >200 ticks/sec, got {:.0}",
        ticks_per_sec
    );
}

#[test]
#[ignore]
fn test_order_spike() {
    // Every tick places an order for a small fleet: saturation path.
    let mut world = World::new();
    let params = large_params().with_counts(5, 4, 80).with_auto_orders(1);
    build_scenario(&mut world, params).expect("scenario");

    let start = Instant::now();
    let mut schedule = simulation_schedule();
    run_ticks(&mut world, &mut schedule, 2_000);
    let duration = start.elapsed();

    let telemetry = world.resource::<SimTelemetry>();
    println!(
        "Order spike: {:.2}s, {} deliveries, {} routing failures",
        duration.as_secs_f64(),
        telemetry.deliveries.len(),
        telemetry.routing_failures
    );
    assert!(duration.as_secs_f64() < 60.0, "spike run took {:?}", duration);
}

//! Subcommand implementations.

use anyhow::{bail, Context, Result};
use bevy_ecs::prelude::World;
use courier_core::compare::compare_algorithms;
use courier_core::grid::{Grid, GridPos};
use courier_core::route_optimizer::{plan_route, RouteMode};
use courier_core::routing::SearchRouteProvider;
use courier_core::runner::{run_realtime, run_ticks_with_hook, run_until_settled, simulation_schedule};
use courier_core::scenario::build_scenario;
use courier_core::telemetry::{capture_snapshot, SimTelemetry, WorldSnapshot};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::info;

use crate::scenarios::load_params;
use crate::{CompareArgs, RouteArgs, RouteModeArg, RunArgs, ScenarioArgs};

pub fn run(args: RunArgs) -> Result<()> {
    let params = load_params(&args.scenario)?;
    let mut world = World::new();
    let layout = build_scenario(&mut world, params.clone()).context("building scenario")?;
    info!(
        riders = layout.riders.len(),
        hotels = layout.hotels.len(),
        homes = layout.homes.len(),
        seed = ?params.seed,
        "starting run"
    );

    let mut schedule = simulation_schedule();
    let every = args.snapshot_every.filter(|n| *n > 0);
    let emit = |world: &World| -> Result<()> {
        let snapshot = capture_snapshot(world);
        if every.is_some_and(|n| snapshot.tick % n == 0) {
            println!("{}", serde_json::to_string(&snapshot)?);
        }
        Ok(())
    };

    let executed = if args.until_settled {
        run_until_settled(&mut world, &mut schedule, args.ticks)
    } else if args.realtime {
        let mut failure = None;
        let executed = run_realtime(&mut world, &mut schedule, args.ticks, |world| {
            match emit(world) {
                Ok(()) => true,
                Err(err) => {
                    failure = Some(err);
                    false
                }
            }
        });
        if let Some(err) = failure {
            return Err(err);
        }
        executed
    } else {
        let mut failure = None;
        run_ticks_with_hook(&mut world, &mut schedule, args.ticks, |world| {
            if failure.is_none() {
                failure = emit(world).err();
            }
        });
        if let Some(err) = failure {
            return Err(err);
        }
        args.ticks
    };

    let snapshot = capture_snapshot(&world);
    if args.json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    } else {
        print_summary(&snapshot, world.resource::<SimTelemetry>(), executed);
    }
    Ok(())
}

fn print_summary(snapshot: &WorldSnapshot, telemetry: &SimTelemetry, ticks: u64) {
    let counts = &snapshot.counts;
    println!(
        "--- Run ({}x{} grid, {} walls, {} riders) ---",
        snapshot.rows,
        snapshot.cols,
        snapshot.walls.len(),
        counts.riders()
    );
    println!("Ticks executed: {ticks}");
    println!(
        "Simulation time: {} ms ({:.1} s)",
        snapshot.time_ms,
        snapshot.time_ms as f64 / 1000.0
    );
    println!(
        "Orders: {} total, {} cooking, {} ready, {} delivered, {} unassigned",
        counts.orders(),
        counts.orders_cooking,
        counts.orders_ready,
        counts.orders_delivered,
        counts.orders_unassigned
    );
    match telemetry.average_delivery_ms() {
        Some(avg) => println!("Average delivery time: {avg:.0} ms"),
        None => println!("Average delivery time: n/a"),
    }
    println!(
        "Distance ridden on deliveries: {} cells",
        telemetry.total_distance_cells()
    );
    println!(
        "Routing failures: {}, re-queued orders: {}",
        telemetry.routing_failures, telemetry.requeued_orders
    );

    println!("\nRiders:");
    for rider in &snapshot.riders {
        println!(
            "  {:<10} {:<16} at {:<8} deliveries={:<4} earnings={:>8.2} distance={}",
            rider.label,
            format!("{:?}", rider.status),
            rider.pos.to_string(),
            rider.deliveries_completed,
            rider.earnings,
            rider.distance_traveled
        );
    }
}

fn grid_from_args(rows: i32, cols: i32, walls: &[GridPos]) -> Result<Grid> {
    Grid::with_walls(rows, cols, walls.iter().copied()).context("building grid")
}

pub fn compare(args: CompareArgs) -> Result<()> {
    if !(0.0..1.0).contains(&args.wall_density) {
        bail!("wall density must be within 0.0..1.0");
    }
    let mut grid = grid_from_args(args.rows, args.cols, &args.walls)?;
    let end = args
        .end
        .unwrap_or_else(|| GridPos::new(args.rows - 1, args.cols - 1));

    if args.wall_density > 0.0 {
        let mut rng = StdRng::seed_from_u64(args.seed);
        let keep_open: Vec<GridPos> = [args.start, end]
            .into_iter()
            .chain(args.waypoints.iter().copied())
            .collect();
        let candidates: Vec<GridPos> = grid
            .passable_cells()
            .filter(|cell| !keep_open.contains(cell))
            .collect();
        for cell in candidates {
            if rng.gen_bool(args.wall_density) {
                grid.set_wall(cell, true)?;
            }
        }
    }

    let results = compare_algorithms(&grid, args.start, end, &args.waypoints);
    if args.json {
        println!("{}", serde_json::to_string_pretty(&results)?);
        return Ok(());
    }

    println!(
        "--- Compare ({}x{} grid, {} walls, {} -> {} via {} waypoints) ---",
        grid.rows(),
        grid.cols(),
        grid.wall_count(),
        args.start,
        end,
        args.waypoints.len()
    );
    for result in &results {
        let hops = result
            .hop_count()
            .map_or_else(|| "unreachable".to_string(), |h| h.to_string());
        println!(
            "  {:<9} hops={:<12} visited={:<6} time={:?}",
            result.strategy.name(),
            hops,
            result.visited_count,
            result.execution_time
        );
    }
    Ok(())
}

pub fn route(args: RouteArgs) -> Result<()> {
    let grid = grid_from_args(args.rows, args.cols, &args.walls)?;
    let mode = match args.mode {
        RouteModeArg::NearestNeighbor => RouteMode::NearestNeighbor,
        RouteModeArg::Exact => RouteMode::Exact,
    };
    let router = SearchRouteProvider::new(args.strategy);
    let planned = plan_route(mode, &router, &grid, args.start, &args.targets);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&planned)?);
        return Ok(());
    }

    println!(
        "--- Route ({:?}, {} targets, tour cost {}, {} cells) ---",
        mode,
        args.targets.len(),
        planned.tour_cost,
        planned.path.len()
    );
    for (stop, &idx) in planned.visit_order.iter().enumerate() {
        println!(
            "  {}. {} after {} cells",
            stop + 1,
            args.targets[idx],
            planned.arrivals[stop]
        );
    }
    for &idx in &planned.skipped {
        println!("  unreachable: {}", args.targets[idx]);
    }
    Ok(())
}

pub fn scenario(args: ScenarioArgs) -> Result<()> {
    let params = load_params(&args.scenario)?;
    if !args.build {
        println!("{}", serde_json::to_string_pretty(&params)?);
        return Ok(());
    }
    let mut world = World::new();
    build_scenario(&mut world, params).context("building scenario")?;
    println!("{}", serde_json::to_string_pretty(&capture_snapshot(&world))?);
    Ok(())
}

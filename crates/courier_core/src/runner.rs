//! Simulation runner: runs the tick schedule and advances the clock.
//!
//! Clock progression happens here, outside systems. Systems observe
//! `now_ms` for the tick being processed; the clock moves forward once the
//! whole schedule has completed.

use std::thread;
use std::time::{Duration, Instant};

use bevy_ecs::prelude::{Schedule, World};
use bevy_ecs::schedule::IntoSystemConfigs;

use crate::clock::SimulationClock;
use crate::dispatch::pending_dispatch_system;
use crate::ecs::{Order, Rider};
use crate::grid::Grid;
use crate::systems::{
    cooking::cooking_timer_system, order_commit::commit_order_updates_system,
    order_spawner::auto_order_system, rider_tick::rider_tick_system,
};

/// One tick: cooking timers, rider movement and transitions, order commit,
/// retry of unassigned orders, then automatic order generation.
pub fn simulation_schedule() -> Schedule {
    let mut schedule = Schedule::default();
    schedule.add_systems(
        (
            cooking_timer_system,
            rider_tick_system,
            commit_order_updates_system,
            pending_dispatch_system,
            auto_order_system,
        )
            .chain(),
    );
    schedule
}

pub fn run_tick(world: &mut World, schedule: &mut Schedule) {
    schedule.run(world);
    if let Some(mut clock) = world.get_resource_mut::<SimulationClock>() {
        clock.advance();
    }
}

pub fn run_ticks(world: &mut World, schedule: &mut Schedule, ticks: u64) {
    for _ in 0..ticks {
        run_tick(world, schedule);
    }
}

/// Runs `ticks` ticks and invokes `hook` after each one.
pub fn run_ticks_with_hook<F>(world: &mut World, schedule: &mut Schedule, ticks: u64, mut hook: F)
where
    F: FnMut(&World),
{
    for _ in 0..ticks {
        run_tick(world, schedule);
        hook(world);
    }
}

/// Every order delivered (or parked until the walls change) and every rider
/// idle.
pub fn is_settled(world: &mut World) -> bool {
    let revision = world.get_resource::<Grid>().map_or(0, Grid::revision);
    let mut orders = world.query::<&Order>();
    if orders
        .iter(world)
        .any(|order| !order.is_delivered() && !order.is_parked(revision))
    {
        return false;
    }
    let mut riders = world.query::<&Rider>();
    let settled = riders.iter(world).all(Rider::is_idle);
    settled
}

/// Run until [`is_settled`] or `max_ticks`. Returns the ticks executed.
pub fn run_until_settled(world: &mut World, schedule: &mut Schedule, max_ticks: u64) -> u64 {
    let mut ticks = 0;
    while ticks < max_ticks && !is_settled(world) {
        run_tick(world, schedule);
        ticks += 1;
    }
    ticks
}

/// Run `ticks` ticks paced to the clock's period in wall time. `hook` sees the
/// world after each tick and may stop the loop by returning `false`.
pub fn run_realtime<F>(world: &mut World, schedule: &mut Schedule, ticks: u64, mut hook: F) -> u64
where
    F: FnMut(&World) -> bool,
{
    let period = Duration::from_millis(
        world
            .get_resource::<SimulationClock>()
            .map_or(crate::clock::DEFAULT_TICK_MS, SimulationClock::tick_ms),
    );
    let mut executed = 0;
    let mut next_deadline = Instant::now();
    while executed < ticks {
        run_tick(world, schedule);
        executed += 1;
        if !hook(world) {
            break;
        }
        next_deadline += period;
        let now = Instant::now();
        if next_deadline > now {
            thread::sleep(next_deadline - now);
        } else {
            next_deadline = now;
        }
    }
    executed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::{init_world, ScenarioParams};

    #[test]
    fn ticks_advance_the_clock() {
        let mut world = World::new();
        init_world(&mut world, &ScenarioParams::default()).expect("init");
        let mut schedule = simulation_schedule();
        run_ticks(&mut world, &mut schedule, 4);
        let clock = world.resource::<SimulationClock>();
        assert_eq!(clock.tick(), 4);
        assert_eq!(clock.now_ms(), 200);
    }

    #[test]
    fn empty_world_is_settled() {
        let mut world = World::new();
        init_world(&mut world, &ScenarioParams::default()).expect("init");
        let mut schedule = simulation_schedule();
        assert_eq!(run_until_settled(&mut world, &mut schedule, 10), 0);
    }
}

#![allow(dead_code)]

use bevy_ecs::prelude::World;
use bevy_ecs::schedule::Schedule;
use courier_core::runner::{run_tick, run_ticks, run_until_settled, simulation_schedule};

/// Helper that owns a reusable `Schedule` so tests can step or settle the world.
pub struct ScheduleRunner {
    schedule: Schedule,
}

impl Default for ScheduleRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl ScheduleRunner {
    /// Create a runner with the default simulation schedule.
    pub fn new() -> Self {
        Self {
            schedule: simulation_schedule(),
        }
    }

    /// Run a single tick.
    pub fn run_one(&mut self, world: &mut World) {
        run_tick(world, &mut self.schedule);
    }

    pub fn run_ticks(&mut self, world: &mut World, ticks: u64) {
        run_ticks(world, &mut self.schedule, ticks);
    }

    /// Tick until every order is delivered and every rider idle, returning
    /// the ticks executed. Panics if the world does not settle in `max_ticks`.
    pub fn settle(&mut self, world: &mut World, max_ticks: u64) -> u64 {
        let ticks = run_until_settled(world, &mut self.schedule, max_ticks);
        assert!(ticks < max_ticks, "world did not settle within {max_ticks} ticks");
        ticks
    }
}

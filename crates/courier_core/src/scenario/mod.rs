//! Scenario setup: world resources from [`ScenarioParams`] plus a seeded
//! random layout of walls, riders, hotels and homes.

mod build;
mod params;

pub use build::{build_scenario, init_world, ScenarioError, ScenarioLayout, MAX_WALL_DENSITY};
pub use params::ScenarioParams;

//! Test helpers for common test setup and utilities.
//!
//! Shared by unit tests, the integration suites and the benches.

use bevy_ecs::prelude::{Entity, World};

use crate::grid::GridPos;
use crate::placement::{spawn_home, spawn_hotel, spawn_rider};
use crate::scenario::{init_world, ScenarioParams};

/// Cooking time short enough that food is ready within two default ticks.
pub const TEST_COOKING_MS: u64 = 100;

/// Create a world with every simulation resource on an empty `rows x cols`
/// grid. No entities are placed.
///
/// # Panics
///
/// Panics if the dimensions are invalid.
pub fn create_test_world(rows: i32, cols: i32) -> World {
    create_test_world_with(ScenarioParams::default().with_grid(rows, cols))
}

/// Like [`create_test_world`] with explicit parameters.
///
/// # Panics
///
/// Panics if `params` fail validation.
pub fn create_test_world_with(params: ScenarioParams) -> World {
    let mut world = World::new();
    init_world(&mut world, &params).expect("test scenario params should be valid");
    world
}

/// One rider, one hotel and one home.
#[derive(Debug, Clone, Copy)]
pub struct DeliveryFixture {
    pub rider: Entity,
    pub hotel: Entity,
    pub home: Entity,
}

/// Spawn a [`DeliveryFixture`] at the given cells.
///
/// # Panics
///
/// Panics if any cell is out of bounds, walled or already taken.
pub fn spawn_delivery_fixture(
    world: &mut World,
    rider: GridPos,
    hotel: GridPos,
    home: GridPos,
    speed: f64,
) -> DeliveryFixture {
    DeliveryFixture {
        rider: spawn_rider(world, rider, speed).expect("rider cell should be free"),
        hotel: spawn_hotel(world, hotel).expect("hotel cell should be free"),
        home: spawn_home(world, home).expect("home cell should be free"),
    }
}

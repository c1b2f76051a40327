#![allow(dead_code)]

use bevy_ecs::prelude::{Entity, World};
use courier_core::dispatch::{DispatchConfig, DispatchMode};
use courier_core::grid::{Grid, GridPos};
use courier_core::placement::{spawn_home, spawn_hotel, spawn_rider};
use courier_core::scenario::{init_world, ScenarioParams};
use courier_core::search::SearchStrategy;

/// Builder configuration for reproducible test worlds.
#[derive(Clone, Debug)]
pub struct TestWorldConfig {
    pub rows: i32,
    pub cols: i32,
    pub walls: Vec<GridPos>,
    pub cooking_time_ms: u64,
    pub dispatch: DispatchConfig,
    pub path_strategy: SearchStrategy,
}

impl Default for TestWorldConfig {
    fn default() -> Self {
        Self {
            rows: 10,
            cols: 10,
            walls: Vec::new(),
            cooking_time_ms: 100,
            dispatch: DispatchConfig::default(),
            path_strategy: SearchStrategy::AStar,
        }
    }
}

/// Helper that populates the ECS world with every resource the tick schedule
/// reads, on an empty grid with optional walls.
#[derive(Debug, Default)]
pub struct TestWorldBuilder {
    config: TestWorldConfig,
}

impl TestWorldBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_grid(mut self, rows: i32, cols: i32) -> Self {
        self.config.rows = rows;
        self.config.cols = cols;
        self
    }

    pub fn with_walls(mut self, walls: impl IntoIterator<Item = GridPos>) -> Self {
        self.config.walls.extend(walls);
        self
    }

    pub fn with_cooking_time_ms(mut self, cooking_time_ms: u64) -> Self {
        self.config.cooking_time_ms = cooking_time_ms;
        self
    }

    pub fn with_dispatch_mode(mut self, mode: DispatchMode) -> Self {
        self.config.dispatch.mode = mode;
        self
    }

    pub fn with_batch_radius(mut self, radius: u32) -> Self {
        self.config.dispatch.batch_radius = radius;
        self
    }

    pub fn with_max_batch_size(mut self, size: usize) -> Self {
        self.config.dispatch.max_batch_size = size;
        self
    }

    pub fn with_path_strategy(mut self, strategy: SearchStrategy) -> Self {
        self.config.path_strategy = strategy;
        self
    }

    pub fn build(self) -> World {
        let params = ScenarioParams::default()
            .with_grid(self.config.rows, self.config.cols)
            .with_cooking_time_ms(self.config.cooking_time_ms)
            .with_dispatch_config(self.config.dispatch)
            .with_path_strategy(self.config.path_strategy);
        let mut world = World::new();
        init_world(&mut world, &params).expect("test world params");
        {
            let mut grid = world.resource_mut::<Grid>();
            for wall in self.config.walls {
                grid.set_wall(wall, true).expect("wall in bounds");
            }
        }
        world
    }
}

pub fn rider_at(world: &mut World, row: i32, col: i32) -> Entity {
    spawn_rider(world, GridPos::new(row, col), 1.0).expect("rider")
}

pub fn hotel_at(world: &mut World, row: i32, col: i32) -> Entity {
    spawn_hotel(world, GridPos::new(row, col)).expect("hotel")
}

pub fn home_at(world: &mut World, row: i32, col: i32) -> Entity {
    spawn_home(world, GridPos::new(row, col)).expect("home")
}

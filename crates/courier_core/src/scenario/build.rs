use bevy_ecs::prelude::{Entity, World};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use thiserror::Error;
use tracing::info;

use super::params::ScenarioParams;
use crate::clock::SimulationClock;
use crate::grid::{Grid, GridError, GridPos};
use crate::orders::{OrderConfig, OrderSequence};
use crate::placement::{spawn_home, spawn_hotel, spawn_rider, EntityCounters, PlacementError};
use crate::routing::{build_route_provider, RouteProviderResource};
use crate::systems::order_commit::PendingOrderUpdates;
use crate::systems::order_spawner::OrderSpawner;
use crate::telemetry::{PathTrail, SimTelemetry};

/// Largest wall density the builder accepts.
pub const MAX_WALL_DENSITY: f64 = 0.9;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScenarioError {
    #[error(transparent)]
    Grid(#[from] GridError),
    #[error(transparent)]
    Placement(#[from] PlacementError),
    #[error("rider speed must be positive and finite (got {0})")]
    InvalidSpeed(f64),
    #[error("wall density must be within 0.0..=0.9 (got {0})")]
    InvalidWallDensity(f64),
    #[error("tick period must be at least 1 ms")]
    InvalidTickPeriod,
    #[error("max batch size must be at least 1")]
    InvalidBatchSize,
    #[error("{needed} entities do not fit on a grid with {available} cells")]
    NotEnoughSpace { needed: usize, available: usize },
}

/// Entities placed by [`build_scenario`], in spawn order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScenarioLayout {
    pub riders: Vec<Entity>,
    pub hotels: Vec<Entity>,
    pub homes: Vec<Entity>,
}

impl ScenarioParams {
    pub fn validate(&self) -> Result<(), ScenarioError> {
        Grid::new(self.rows, self.cols)?;
        if !self.rider_speed.is_finite() || self.rider_speed <= 0.0 {
            return Err(ScenarioError::InvalidSpeed(self.rider_speed));
        }
        if !(0.0..=MAX_WALL_DENSITY).contains(&self.wall_density) {
            return Err(ScenarioError::InvalidWallDensity(self.wall_density));
        }
        if self.tick_ms == 0 {
            return Err(ScenarioError::InvalidTickPeriod);
        }
        if self.dispatch.max_batch_size == 0 {
            return Err(ScenarioError::InvalidBatchSize);
        }
        Ok(())
    }

    fn entity_count(&self) -> usize {
        self.num_riders + self.num_hotels + self.num_homes
    }
}

/// Install every resource the tick schedule needs, with an empty grid of the
/// configured size. Entities are left to the caller.
pub fn init_world(world: &mut World, params: &ScenarioParams) -> Result<(), ScenarioError> {
    params.validate()?;
    let seed = params.seed.unwrap_or(0);

    world.insert_resource(Grid::new(params.rows, params.cols)?);
    world.insert_resource(SimulationClock::new(params.tick_ms));
    world.insert_resource(RouteProviderResource(build_route_provider(
        params.path_strategy,
        params.path_cache_capacity,
    )));
    world.insert_resource(params.dispatch);
    world.insert_resource(OrderConfig {
        cooking_time_ms: params.cooking_time_ms,
    });
    world.insert_resource(params.pricing);
    world.insert_resource(PathTrail::new(params.trail_length));
    world.insert_resource(SimTelemetry::with_activity_capacity(params.activity_capacity));
    world.insert_resource(PendingOrderUpdates::default());
    world.insert_resource(EntityCounters::default());
    world.insert_resource(OrderSequence::default());
    if params.auto_order_interval_ticks > 0 {
        world.insert_resource(OrderSpawner::new(
            seed.wrapping_add(0x0dde_5eed),
            params.auto_order_interval_ticks,
        ));
    } else {
        world.remove_resource::<OrderSpawner>();
    }
    Ok(())
}

/// Build a random scenario: resources, seeded walls, and riders, hotels and
/// homes on distinct free cells.
pub fn build_scenario(
    world: &mut World,
    params: ScenarioParams,
) -> Result<ScenarioLayout, ScenarioError> {
    init_world(world, &params)?;
    let needed = params.entity_count();
    let available = params.rows as usize * params.cols as usize;
    if needed > available {
        return Err(ScenarioError::NotEnoughSpace { needed, available });
    }
    let mut rng = StdRng::seed_from_u64(params.seed.unwrap_or(0));

    let mut cells: Vec<GridPos> = (0..params.rows)
        .flat_map(|row| (0..params.cols).map(move |col| GridPos::new(row, col)))
        .collect();
    cells.shuffle(&mut rng);

    let (occupied, free) = cells.split_at(needed);

    let wall_count = (free.len() as f64 * params.wall_density).round() as usize;
    if let Some(mut grid) = world.get_resource_mut::<Grid>() {
        for wall in free.iter().take(wall_count) {
            grid.set_wall(*wall, true)?;
        }
    }

    let mut layout = ScenarioLayout::default();
    let mut slots = occupied.iter().copied();
    for pos in slots.by_ref().take(params.num_hotels) {
        layout.hotels.push(spawn_hotel(world, pos)?);
    }
    for pos in slots.by_ref().take(params.num_homes) {
        layout.homes.push(spawn_home(world, pos)?);
    }
    for pos in slots.by_ref().take(params.num_riders) {
        layout.riders.push(spawn_rider(world, pos, params.rider_speed)?);
    }

    info!(
        rows = params.rows,
        cols = params.cols,
        walls = wall_count,
        riders = layout.riders.len(),
        hotels = layout.hotels.len(),
        homes = layout.homes.len(),
        "scenario built"
    );
    Ok(layout)
}

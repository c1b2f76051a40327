//! Entity placement and grid editing, called between ticks.
//!
//! Labels are sequential per kind ("Rider 1", "Hotel 2", ...). Hotels and
//! homes may not share a cell with another hotel or home; riders may stand
//! anywhere passable.

use bevy_ecs::prelude::{Entity, Resource, World};
use thiserror::Error;
use tracing::{info, warn};

use crate::clock::SimulationClock;
use crate::ecs::{EntityKind, Home, Hotel, Label, Order, Position, Rider};
use crate::grid::{Grid, GridError, GridPos};
use crate::telemetry::{ActivityKind, SimTelemetry};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlacementError {
    #[error("world has no grid resource")]
    MissingGrid,
    #[error("position {0} is outside the grid")]
    OutOfBounds(GridPos),
    #[error("position {0} is a wall")]
    OnWall(GridPos),
    #[error("position {pos} is already occupied by {label}")]
    Occupied { pos: GridPos, label: String },
    #[error("rider speed must be positive and finite (got {0})")]
    InvalidSpeed(f64),
    #[error("entity {0:?} is not a placed rider, hotel or home")]
    UnknownEntity(Entity),
    #[error(transparent)]
    Grid(#[from] GridError),
}

/// Per-kind label counters. Never reused after removal.
#[derive(Debug, Clone, Copy, Default, Resource)]
pub struct EntityCounters {
    pub riders: u32,
    pub hotels: u32,
    pub homes: u32,
}

impl EntityCounters {
    fn next_label(&mut self, kind: EntityKind) -> String {
        let counter = match kind {
            EntityKind::Rider => &mut self.riders,
            EntityKind::Hotel => &mut self.hotels,
            EntityKind::Home => &mut self.homes,
        };
        *counter += 1;
        format!("{} {}", kind.name(), counter)
    }
}

fn validate_cell(world: &World, pos: GridPos) -> Result<(), PlacementError> {
    let grid = world
        .get_resource::<Grid>()
        .ok_or(PlacementError::MissingGrid)?;
    if !grid.in_bounds(pos) {
        return Err(PlacementError::OutOfBounds(pos));
    }
    if grid.is_wall(pos) {
        return Err(PlacementError::OnWall(pos));
    }
    Ok(())
}

/// Hotel or home standing on `pos`, if any.
pub fn place_at(world: &World, pos: GridPos) -> Option<Entity> {
    world.iter_entities().find_map(|entity_ref| {
        let kind = entity_ref.get::<EntityKind>()?;
        let at = entity_ref.get::<Position>()?;
        (matches!(kind, EntityKind::Hotel | EntityKind::Home) && at.0 == pos)
            .then(|| entity_ref.id())
    })
}

fn rider_at(world: &World, pos: GridPos) -> Option<Entity> {
    world.iter_entities().find_map(|entity_ref| {
        let at = entity_ref.get::<Position>()?;
        (entity_ref.contains::<Rider>() && at.0 == pos).then(|| entity_ref.id())
    })
}

fn ensure_unoccupied(world: &World, pos: GridPos) -> Result<(), PlacementError> {
    match place_at(world, pos) {
        Some(existing) => Err(PlacementError::Occupied {
            pos,
            label: label_of(world, existing),
        }),
        None => Ok(()),
    }
}

fn next_label(world: &mut World, kind: EntityKind) -> String {
    world
        .get_resource_or_insert_with(EntityCounters::default)
        .next_label(kind)
}

/// Display label of a placed entity, or its debug id.
pub fn label_of(world: &World, entity: Entity) -> String {
    world
        .get::<Label>(entity)
        .map_or_else(|| format!("{entity:?}"), |label| label.0.clone())
}

pub fn spawn_rider(world: &mut World, pos: GridPos, speed: f64) -> Result<Entity, PlacementError> {
    if !speed.is_finite() || speed <= 0.0 {
        return Err(PlacementError::InvalidSpeed(speed));
    }
    validate_cell(world, pos)?;
    let label = next_label(world, EntityKind::Rider);
    let entity = world
        .spawn((
            EntityKind::Rider,
            Position(pos),
            Label(label),
            Rider::new(speed),
        ))
        .id();
    Ok(entity)
}

pub fn spawn_hotel(world: &mut World, pos: GridPos) -> Result<Entity, PlacementError> {
    validate_cell(world, pos)?;
    ensure_unoccupied(world, pos)?;
    let label = next_label(world, EntityKind::Hotel);
    Ok(world
        .spawn((EntityKind::Hotel, Position(pos), Label(label), Hotel))
        .id())
}

pub fn spawn_home(world: &mut World, pos: GridPos) -> Result<Entity, PlacementError> {
    validate_cell(world, pos)?;
    ensure_unoccupied(world, pos)?;
    let label = next_label(world, EntityKind::Home);
    Ok(world
        .spawn((EntityKind::Home, Position(pos), Label(label), Home))
        .id())
}

/// Despawn a placed entity. A removed rider's undelivered orders go back to
/// the dispatch queue; orders pointing at a removed hotel or home stay as
/// lookup misses.
pub fn remove_entity(world: &mut World, entity: Entity) -> Result<EntityKind, PlacementError> {
    let kind = world
        .get::<EntityKind>(entity)
        .copied()
        .ok_or(PlacementError::UnknownEntity(entity))?;

    if kind == EntityKind::Rider {
        let orders = world
            .get::<Rider>(entity)
            .map(|rider| rider.assigned_orders.clone())
            .unwrap_or_default();
        let now_ms = world
            .get_resource::<SimulationClock>()
            .map_or(0, SimulationClock::now_ms);
        for order_entity in orders {
            let Some(mut order) = world.get_mut::<Order>(order_entity) else {
                continue;
            };
            if order.is_delivered() || order.rider != Some(entity) {
                continue;
            }
            order.release();
            let seq = order.seq;
            warn!(order = seq, rider = ?entity, "rider removed, order re-queued");
            if let Some(mut telemetry) = world.get_resource_mut::<SimTelemetry>() {
                telemetry.requeued_orders += 1;
                telemetry.record_activity(
                    now_ms,
                    ActivityKind::Requeued,
                    Some(seq),
                    "assigned rider was removed",
                );
            }
        }
    }

    let label = label_of(world, entity);
    world.despawn(entity);
    info!(entity = ?entity, %label, "entity removed");
    Ok(kind)
}

/// Flip a wall. Hotels, homes and standing riders pin their cell open.
pub fn toggle_wall(world: &mut World, pos: GridPos) -> Result<bool, PlacementError> {
    ensure_unoccupied(world, pos)?;
    if let Some(rider) = rider_at(world, pos) {
        return Err(PlacementError::Occupied {
            pos,
            label: label_of(world, rider),
        });
    }
    let mut grid = world
        .get_resource_mut::<Grid>()
        .ok_or(PlacementError::MissingGrid)?;
    Ok(grid.toggle_wall(pos)?)
}

pub fn is_wall(world: &World, pos: GridPos) -> bool {
    world
        .get_resource::<Grid>()
        .is_some_and(|grid| grid.is_wall(pos))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn world() -> World {
        let mut world = World::new();
        world.insert_resource(Grid::new(5, 5).expect("grid"));
        world
    }

    #[test]
    fn labels_are_sequential_per_kind() {
        let mut world = world();
        let r1 = spawn_rider(&mut world, GridPos::new(0, 0), 1.0).expect("rider");
        let h1 = spawn_hotel(&mut world, GridPos::new(1, 1)).expect("hotel");
        let r2 = spawn_rider(&mut world, GridPos::new(0, 0), 1.0).expect("rider");
        assert_eq!(label_of(&world, r1), "Rider 1");
        assert_eq!(label_of(&world, r2), "Rider 2");
        assert_eq!(label_of(&world, h1), "Hotel 1");
    }

    #[test]
    fn rejects_walls_bounds_and_bad_speed() {
        let mut world = world();
        toggle_wall(&mut world, GridPos::new(2, 2)).expect("wall");
        assert_eq!(
            spawn_home(&mut world, GridPos::new(2, 2)),
            Err(PlacementError::OnWall(GridPos::new(2, 2)))
        );
        assert_eq!(
            spawn_hotel(&mut world, GridPos::new(5, 0)),
            Err(PlacementError::OutOfBounds(GridPos::new(5, 0)))
        );
        assert!(matches!(
            spawn_rider(&mut world, GridPos::new(0, 0), 0.0),
            Err(PlacementError::InvalidSpeed(_))
        ));
    }

    #[test]
    fn places_do_not_stack_and_pin_walls_open() {
        let mut world = world();
        spawn_hotel(&mut world, GridPos::new(1, 1)).expect("hotel");
        assert!(matches!(
            spawn_home(&mut world, GridPos::new(1, 1)),
            Err(PlacementError::Occupied { .. })
        ));
        assert!(toggle_wall(&mut world, GridPos::new(1, 1)).is_err());
        assert!(!is_wall(&world, GridPos::new(1, 1)));
    }

    #[test]
    fn standing_rider_pins_its_cell_open() {
        let mut world = world();
        spawn_rider(&mut world, GridPos::new(2, 2), 1.0).expect("rider");
        assert!(matches!(
            toggle_wall(&mut world, GridPos::new(2, 2)),
            Err(PlacementError::Occupied { label, .. }) if label == "Rider 1"
        ));
        assert!(!is_wall(&world, GridPos::new(2, 2)));
        assert_eq!(toggle_wall(&mut world, GridPos::new(2, 3)), Ok(true));
    }

    #[test]
    fn removing_unknown_entity_fails() {
        let mut world = world();
        let stray = world.spawn_empty().id();
        assert_eq!(
            remove_entity(&mut world, stray),
            Err(PlacementError::UnknownEntity(stray))
        );
    }
}

//! Order lifecycle: creation, cooking countdown and ETA queries.
//!
//! Status only ever moves forward (Cooking → Ready → Delivered). Cooking is
//! advanced by [`crate::systems::cooking::cooking_timer_system`]; delivery is
//! committed by the order commit system after the rider tick.

use bevy_ecs::prelude::{Entity, Resource, World};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::clock::SimulationClock;
use crate::dispatch::{dispatch_order, DispatchOutcome};
use crate::ecs::{Home, Hotel, Order, OrderStatus, Position, Rider, RiderStatus};
use crate::grid::GridPos;
use crate::placement::label_of;
use crate::telemetry::{ActivityKind, SimTelemetry};

/// Default cooking time in milliseconds.
pub const DEFAULT_COOKING_TIME_MS: u64 = 3_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum OrderError {
    #[error("entity {0:?} is not a home")]
    UnknownHome(Entity),
    #[error("entity {0:?} is not a hotel")]
    UnknownHotel(Entity),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Resource)]
#[serde(default)]
pub struct OrderConfig {
    pub cooking_time_ms: u64,
}

impl Default for OrderConfig {
    fn default() -> Self {
        Self {
            cooking_time_ms: DEFAULT_COOKING_TIME_MS,
        }
    }
}

/// Next order sequence number (starts at 1).
#[derive(Debug, Clone, Copy, Default, Resource)]
pub struct OrderSequence {
    last: u64,
}

impl OrderSequence {
    pub fn issue(&mut self) -> u64 {
        self.last += 1;
        self.last
    }

    pub fn issued(&self) -> u64 {
        self.last
    }
}

/// Result of placing an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderPlacement {
    pub order: Entity,
    pub outcome: DispatchOutcome,
}

/// Create an order with the configured cooking time and dispatch it.
pub fn create_order(
    world: &mut World,
    home: Entity,
    hotel: Entity,
) -> Result<OrderPlacement, OrderError> {
    let cooking_time_ms = world
        .get_resource::<OrderConfig>()
        .copied()
        .unwrap_or_default()
        .cooking_time_ms;
    create_order_with_cooking_time(world, home, hotel, cooking_time_ms)
}

pub fn create_order_with_cooking_time(
    world: &mut World,
    home: Entity,
    hotel: Entity,
    cooking_time_ms: u64,
) -> Result<OrderPlacement, OrderError> {
    if world.get::<Home>(home).is_none() || world.get::<Position>(home).is_none() {
        return Err(OrderError::UnknownHome(home));
    }
    if world.get::<Hotel>(hotel).is_none() || world.get::<Position>(hotel).is_none() {
        return Err(OrderError::UnknownHotel(hotel));
    }

    let now_ms = world
        .get_resource::<SimulationClock>()
        .map_or(0, SimulationClock::now_ms);
    let seq = world
        .get_resource_or_insert_with(OrderSequence::default)
        .issue();
    let order = world
        .spawn(Order::new(seq, home, hotel, cooking_time_ms, now_ms))
        .id();

    let detail = format!(
        "{} -> {} (cooking {} ms)",
        label_of(world, hotel),
        label_of(world, home),
        cooking_time_ms
    );
    info!(order = seq, %detail, "order created");
    if let Some(mut telemetry) = world.get_resource_mut::<SimTelemetry>() {
        telemetry.record_activity(now_ms, ActivityKind::OrderCreated, Some(seq), detail);
    }

    let outcome = dispatch_order(world, order);
    Ok(OrderPlacement { order, outcome })
}

/// Count down one tick of cooking. Returns `true` when the order just became
/// ready.
pub fn tick_cooking(order: &mut Order, elapsed_ms: u64) -> bool {
    if order.status() != OrderStatus::Cooking {
        return false;
    }
    order.cooking_time_remaining_ms = order.cooking_time_remaining_ms.saturating_sub(elapsed_ms);
    order.cooking_time_remaining_ms == 0 && order.advance_status(OrderStatus::Ready)
}

fn ticks_for(cells: u64, speed: f64) -> u64 {
    if cells == 0 {
        return 0;
    }
    (cells as f64 / speed).ceil() as u64
}

/// Estimated ms until the order is delivered.
///
/// `None` while the order is unassigned or any referenced entity is gone;
/// `Some(0)` once delivered.
pub fn order_eta_ms(world: &World, order_entity: Entity) -> Option<u64> {
    let order = world.get::<Order>(order_entity)?;
    if order.is_delivered() {
        return Some(0);
    }
    let rider_entity = order.rider?;
    let rider = world.get::<Rider>(rider_entity)?;
    let rider_pos = world.get::<Position>(rider_entity)?.0;
    let home_pos = world.get::<Position>(order.home)?.0;
    let hotel_pos = world.get::<Position>(order.hotel)?.0;
    let tick_ms = world
        .get_resource::<SimulationClock>()
        .copied()
        .unwrap_or_default()
        .tick_ms();
    let speed = rider.speed.max(f64::EPSILON);

    let eta_ms = match rider.status {
        RiderStatus::MovingToHotel | RiderStatus::WaitingForFood => {
            let to_hotel = ticks_for(rider.path_queue.len() as u64, speed) * tick_ms;
            let to_home = ticks_for(u64::from(hotel_pos.manhattan(home_pos)), speed) * tick_ms;
            to_hotel.max(order.cooking_time_remaining_ms) + to_home
        }
        _ => ticks_for(cells_until(rider, rider_pos, home_pos), speed) * tick_ms,
    };
    Some(eta_ms)
}

/// Queued cells until the rider first reaches `home`, or the Manhattan
/// distance when `home` is not on its queued path.
fn cells_until(rider: &Rider, rider_pos: GridPos, home: GridPos) -> u64 {
    if rider_pos == home {
        return 0;
    }
    rider
        .path_queue
        .iter()
        .position(|cell| *cell == home)
        .map_or(u64::from(rider_pos.manhattan(home)), |idx| idx as u64 + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Grid;
    use crate::placement::{spawn_home, spawn_hotel, spawn_rider};

    fn world() -> World {
        let mut world = World::new();
        world.insert_resource(Grid::new(1, 12).expect("grid"));
        world.insert_resource(SimulationClock::new(50));
        world.insert_resource(SimTelemetry::default());
        world
    }

    #[test]
    fn cooking_counts_down_and_clamps() {
        let mut world = World::new();
        let home = world.spawn_empty().id();
        let hotel = world.spawn_empty().id();
        let mut order = Order::new(1, home, hotel, 120, 0);
        assert!(!tick_cooking(&mut order, 50));
        assert_eq!(order.cooking_time_remaining_ms, 70);
        assert!(!tick_cooking(&mut order, 50));
        assert!(tick_cooking(&mut order, 50));
        assert_eq!(order.cooking_time_remaining_ms, 0);
        assert!(order.is_ready());
        assert!(!tick_cooking(&mut order, 50));
    }

    #[test]
    fn create_order_rejects_wrong_kinds() {
        let mut world = world();
        let hotel = spawn_hotel(&mut world, GridPos::new(0, 5)).expect("hotel");
        let home = spawn_home(&mut world, GridPos::new(0, 10)).expect("home");
        assert_eq!(
            create_order(&mut world, hotel, hotel),
            Err(OrderError::UnknownHome(hotel))
        );
        assert_eq!(
            create_order(&mut world, home, home),
            Err(OrderError::UnknownHotel(home))
        );
    }

    #[test]
    fn unassigned_order_has_no_eta() {
        let mut world = world();
        let hotel = spawn_hotel(&mut world, GridPos::new(0, 5)).expect("hotel");
        let home = spawn_home(&mut world, GridPos::new(0, 10)).expect("home");
        let placed = create_order(&mut world, home, hotel).expect("order");
        assert_eq!(placed.outcome, DispatchOutcome::Queued);
        assert_eq!(order_eta_ms(&world, placed.order), None);
    }

    #[test]
    fn eta_covers_pickup_cooking_and_drop() {
        let mut world = world();
        spawn_rider(&mut world, GridPos::new(0, 0), 1.0).expect("rider");
        let hotel = spawn_hotel(&mut world, GridPos::new(0, 5)).expect("hotel");
        let home = spawn_home(&mut world, GridPos::new(0, 10)).expect("home");
        let placed = create_order_with_cooking_time(&mut world, home, hotel, 100).expect("order");
        assert!(placed.outcome.is_assigned());
        // 5 cells to the hotel dominate 100 ms of cooking, then 5 cells to the home.
        assert_eq!(order_eta_ms(&world, placed.order), Some(250 + 250));
    }
}

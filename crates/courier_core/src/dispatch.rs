//! Order dispatch: batching onto en-route riders, sending idle riders, forced
//! batching under saturation, and the per-tick retry sweep for unassigned
//! orders.
//!
//! Policy, first match wins:
//!
//! 1. **Batch**: a rider moving to (or waiting at) the order's hotel whose
//!    batch is below `max_batch_size` and already holds a home within
//!    `batch_radius` (Manhattan) of the new home. Closest such home wins.
//! 2. **Idle rider**: nearest idle rider to the hotel (efficiency), or the
//!    assignment solver's pick over distance plus an earnings penalty
//!    (fairness). Only the chosen rider is routed; no route means the order
//!    stays unassigned.
//! 3. **Forced batch**: with no idle rider at all, any rider en route to the
//!    hotel takes the order regardless of distance or batch size.
//! 4. **Queue**: the order waits for the sweep.

use std::fmt;
use std::str::FromStr;

use bevy_ecs::prelude::{Entity, Resource, World};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::assignment::solve_assignment_costs;
use crate::clock::SimulationClock;
use crate::ecs::{Hotel, Order, Position, Rider, RiderStatus};
use crate::grid::{Grid, GridPos};
use crate::placement::label_of;
use crate::routing::route_in_world;
use crate::telemetry::{ActivityKind, SimTelemetry};

/// Default batching radius in cells.
pub const DEFAULT_BATCH_RADIUS: u32 = 8;

/// Default cap on orders per rider for distance-based batching.
pub const DEFAULT_MAX_BATCH_SIZE: usize = 5;

/// Integer scale applied to fairness costs before solving.
const COST_SCALE: f64 = 1_000.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchMode {
    /// Nearest idle rider wins.
    #[default]
    Efficiency,
    /// Favour riders with lower cumulative earnings.
    Fairness,
}

impl fmt::Display for DispatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DispatchMode::Efficiency => "efficiency",
            DispatchMode::Fairness => "fairness",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown dispatch mode '{0}' (expected efficiency or fairness)")]
pub struct ParseDispatchModeError(pub String);

impl FromStr for DispatchMode {
    type Err = ParseDispatchModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "efficiency" | "nearest" => Ok(DispatchMode::Efficiency),
            "fairness" | "fair" => Ok(DispatchMode::Fairness),
            _ => Err(ParseDispatchModeError(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Resource)]
#[serde(default)]
pub struct DispatchConfig {
    pub mode: DispatchMode,
    pub batch_radius: u32,
    pub max_batch_size: usize,
    /// Cells of detour one unit of earnings advantage is worth (fairness mode).
    pub fairness_weight: f64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            mode: DispatchMode::Efficiency,
            batch_radius: DEFAULT_BATCH_RADIUS,
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
            fairness_weight: 1.0,
        }
    }
}

/// What happened to one dispatch attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Appended to an en-route rider whose batch has a nearby home.
    Batched { rider: Entity, home_distance: u32 },
    /// An idle rider was routed to the hotel.
    Dispatched { rider: Entity, path_len: usize },
    /// No idle rider; appended to a rider already heading to the hotel.
    ForcedBatch { rider: Entity },
    /// No capacity; retried by the sweep.
    Queued,
    /// The chosen idle rider has no route to the hotel.
    Unroutable { rider: Entity },
    /// Hotel or home no longer exists.
    MissingPlace,
    /// Order is gone, delivered, or already has a rider.
    NotPending,
}

impl DispatchOutcome {
    pub fn rider(&self) -> Option<Entity> {
        match self {
            DispatchOutcome::Batched { rider, .. }
            | DispatchOutcome::Dispatched { rider, .. }
            | DispatchOutcome::ForcedBatch { rider } => Some(*rider),
            _ => None,
        }
    }

    pub fn is_assigned(&self) -> bool {
        self.rider().is_some()
    }

    fn activity_kind(&self) -> Option<ActivityKind> {
        match self {
            DispatchOutcome::Batched { .. } => Some(ActivityKind::Batched),
            DispatchOutcome::Dispatched { .. } => Some(ActivityKind::Dispatched),
            DispatchOutcome::ForcedBatch { .. } => Some(ActivityKind::ForcedBatch),
            DispatchOutcome::Queued => Some(ActivityKind::Queued),
            DispatchOutcome::Unroutable { .. } => Some(ActivityKind::Unroutable),
            DispatchOutcome::MissingPlace | DispatchOutcome::NotPending => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DispatchSource {
    Creation,
    Sweep,
}

#[derive(Debug, Clone, Copy)]
struct PendingOrder {
    entity: Entity,
    seq: u64,
    hotel: Entity,
    hotel_pos: GridPos,
    home_pos: GridPos,
}

#[derive(Debug, Clone)]
struct RiderView {
    entity: Entity,
    pos: GridPos,
    status: RiderStatus,
    target: Option<Entity>,
    order_count: usize,
    earnings: f64,
    batch_homes: Vec<GridPos>,
}

impl RiderView {
    fn is_en_route_to(&self, hotel: Entity) -> bool {
        matches!(
            self.status,
            RiderStatus::MovingToHotel | RiderStatus::WaitingForFood
        ) && self.target == Some(hotel)
    }
}

fn dispatch_config(world: &World) -> DispatchConfig {
    world
        .get_resource::<DispatchConfig>()
        .copied()
        .unwrap_or_default()
}

fn now_ms(world: &World) -> u64 {
    world
        .get_resource::<SimulationClock>()
        .map_or(0, SimulationClock::now_ms)
}

/// Resolve an order that still needs a rider. `Err` carries the outcome to
/// report instead.
fn pending_order(world: &World, entity: Entity) -> Result<PendingOrder, DispatchOutcome> {
    let order = world
        .get::<Order>(entity)
        .ok_or(DispatchOutcome::NotPending)?;
    if !order.is_unassigned() {
        return Err(DispatchOutcome::NotPending);
    }
    let hotel_pos = world
        .get::<Hotel>(order.hotel)
        .and(world.get::<Position>(order.hotel))
        .ok_or(DispatchOutcome::MissingPlace)?
        .0;
    let home_pos = world
        .get::<Position>(order.home)
        .ok_or(DispatchOutcome::MissingPlace)?
        .0;
    Ok(PendingOrder {
        entity,
        seq: order.seq,
        hotel: order.hotel,
        hotel_pos,
        home_pos,
    })
}

fn rider_views(world: &mut World) -> Vec<RiderView> {
    let mut query = world.query::<(Entity, &Rider, &Position)>();
    let world_ref: &World = world;
    let mut views: Vec<RiderView> = query
        .iter(world_ref)
        .map(|(entity, rider, position)| RiderView {
            entity,
            pos: position.0,
            status: rider.status,
            target: rider.target,
            order_count: rider.assigned_orders.len(),
            earnings: rider.earnings,
            batch_homes: rider
                .assigned_orders
                .iter()
                .filter_map(|order| world_ref.get::<Order>(*order))
                .filter(|order| !order.is_delivered())
                .filter_map(|order| world_ref.get::<Position>(order.home))
                .map(|position| position.0)
                .collect(),
        })
        .collect();
    views.sort_by_key(|view| view.entity);
    views
}

/// Dispatch one freshly created order.
pub fn dispatch_order(world: &mut World, order: Entity) -> DispatchOutcome {
    dispatch(world, order, DispatchSource::Creation)
}

fn dispatch(world: &mut World, order: Entity, source: DispatchSource) -> DispatchOutcome {
    let pending = match pending_order(world, order) {
        Ok(pending) => pending,
        Err(outcome) => return outcome,
    };
    let config = dispatch_config(world);
    let riders = rider_views(world);

    let outcome = if let Some((rider, home_distance)) = batch_candidate(&riders, &pending, &config)
    {
        attach_order(world, pending.entity, rider);
        DispatchOutcome::Batched {
            rider,
            home_distance,
        }
    } else if let Some(rider) = pick_idle_rider(&riders, &pending, &config) {
        assign_idle_rider(world, &pending, rider)
    } else if let Some(rider) = forced_batch_candidate(&riders, &pending) {
        attach_order(world, pending.entity, rider);
        DispatchOutcome::ForcedBatch { rider }
    } else {
        DispatchOutcome::Queued
    };

    report(world, &pending, outcome, source);
    outcome
}

/// Policy step 1.
fn batch_candidate(
    riders: &[RiderView],
    order: &PendingOrder,
    config: &DispatchConfig,
) -> Option<(Entity, u32)> {
    riders
        .iter()
        .filter(|rider| {
            rider.is_en_route_to(order.hotel) && rider.order_count < config.max_batch_size
        })
        .filter_map(|rider| {
            rider
                .batch_homes
                .iter()
                .map(|home| home.manhattan(order.home_pos))
                .min()
                .filter(|distance| *distance <= config.batch_radius)
                .map(|distance| (rider.entity, distance))
        })
        .min_by_key(|(entity, distance)| (*distance, *entity))
}

/// Policy step 2 selection.
fn pick_idle_rider(
    riders: &[RiderView],
    order: &PendingOrder,
    config: &DispatchConfig,
) -> Option<Entity> {
    let idle: Vec<&RiderView> = riders
        .iter()
        .filter(|rider| rider.status == RiderStatus::Idle)
        .collect();
    if idle.is_empty() {
        return None;
    }
    match config.mode {
        DispatchMode::Efficiency => idle
            .iter()
            .min_by_key(|rider| (rider.pos.manhattan(order.hotel_pos), rider.entity))
            .map(|rider| rider.entity),
        DispatchMode::Fairness => {
            let costs = fairness_costs(&idle, &[order.hotel_pos], config.fairness_weight);
            solve_assignment_costs(&costs)
                .first()
                .map(|assignment| idle[assignment.rider_index].entity)
        }
    }
}

/// Rows are riders, columns are hotels. Cost is Manhattan distance plus
/// `weight` per unit of earnings above the poorest rider in the pool.
fn fairness_costs(riders: &[&RiderView], hotels: &[GridPos], weight: f64) -> Vec<Vec<i64>> {
    let min_earnings = riders
        .iter()
        .map(|rider| rider.earnings)
        .fold(f64::INFINITY, f64::min);
    riders
        .iter()
        .map(|rider| {
            let penalty = weight.max(0.0) * (rider.earnings - min_earnings).max(0.0);
            hotels
                .iter()
                .map(|hotel| {
                    let cost = f64::from(rider.pos.manhattan(*hotel)) + penalty;
                    (cost * COST_SCALE).round() as i64
                })
                .collect()
        })
        .collect()
}

/// Policy step 3. Fewest orders, then closest to the hotel, then lowest id.
fn forced_batch_candidate(riders: &[RiderView], order: &PendingOrder) -> Option<Entity> {
    if riders.iter().any(|rider| rider.status == RiderStatus::Idle) {
        return None;
    }
    riders
        .iter()
        .filter(|rider| rider.is_en_route_to(order.hotel))
        .min_by_key(|rider| {
            (
                rider.order_count,
                rider.pos.manhattan(order.hotel_pos),
                rider.entity,
            )
        })
        .map(|rider| rider.entity)
}

/// Route an idle rider to the order's hotel and attach the order.
fn assign_idle_rider(world: &mut World, order: &PendingOrder, rider: Entity) -> DispatchOutcome {
    let Some(rider_pos) = world.get::<Position>(rider).map(|p| p.0) else {
        return DispatchOutcome::Queued;
    };
    let Some(path) = route_in_world(world, rider_pos, order.hotel_pos) else {
        if let Some(mut telemetry) = world.get_resource_mut::<SimTelemetry>() {
            telemetry.routing_failures += 1;
        }
        return DispatchOutcome::Unroutable { rider };
    };
    let path_len = path.len().saturating_sub(1);

    if let Some(mut state) = world.get_mut::<Rider>(rider) {
        state.status = RiderStatus::MovingToHotel;
        state.target = Some(order.hotel);
        state.base_hotel = Some(order.hotel);
        state.path_queue = path.into_iter().skip(1).collect();
        state.delivery_queue.clear();
    }
    attach_order(world, order.entity, rider);
    DispatchOutcome::Dispatched { rider, path_len }
}

/// Link order and rider both ways and stamp the assignment.
fn attach_order(world: &mut World, order: Entity, rider: Entity) {
    let now_ms = now_ms(world);
    let Some(mut state) = world.get_mut::<Rider>(rider) else {
        return;
    };
    if !state.assigned_orders.contains(&order) {
        state.assigned_orders.push(order);
    }
    let odometer = state.distance_traveled;
    if let Some(mut order) = world.get_mut::<Order>(order) {
        order.rider = Some(rider);
        order.assigned_at_ms = Some(now_ms);
        order.odometer_at_assignment = odometer;
        order.parked_at_revision = None;
    }
}

fn report(world: &mut World, order: &PendingOrder, outcome: DispatchOutcome, source: DispatchSource) {
    let rider_label = outcome.rider().map(|rider| label_of(world, rider));
    let detail = match (&outcome, rider_label.as_deref()) {
        (DispatchOutcome::Batched { home_distance, .. }, Some(label)) => {
            format!("batched onto {label} (home {home_distance} cells from batch)")
        }
        (DispatchOutcome::Dispatched { path_len, .. }, Some(label)) => {
            format!("{label} dispatched, {path_len} cells to hotel")
        }
        (DispatchOutcome::ForcedBatch { .. }, Some(label)) => {
            format!("no idle rider, forced onto {label}")
        }
        (DispatchOutcome::Unroutable { rider }, _) => {
            format!("{} cannot reach the hotel", label_of(world, *rider))
        }
        _ => "waiting for a rider".to_string(),
    };

    match outcome {
        DispatchOutcome::Unroutable { rider } => match source {
            DispatchSource::Creation => warn!(order = order.seq, rider = ?rider, "no route to hotel"),
            DispatchSource::Sweep => debug!(order = order.seq, rider = ?rider, "no route to hotel"),
        },
        DispatchOutcome::Queued => debug!(order = order.seq, "order queued"),
        _ => info!(order = order.seq, rider = ?outcome.rider(), %detail, "order dispatched"),
    }

    // Sweep retries that change nothing would flood the log.
    let quiet = source == DispatchSource::Sweep && !outcome.is_assigned();
    if quiet {
        return;
    }
    let now_ms = now_ms(world);
    if let (Some(kind), Some(mut telemetry)) = (
        outcome.activity_kind(),
        world.get_resource_mut::<SimTelemetry>(),
    ) {
        telemetry.record_activity(now_ms, kind, Some(order.seq), detail);
    }
}

/// Unassigned, undelivered orders in creation order. Orders parked at the
/// current grid revision are left out.
pub fn unassigned_orders(world: &mut World) -> Vec<Entity> {
    let revision = world.get_resource::<Grid>().map_or(0, Grid::revision);
    let mut query = world.query::<(Entity, &Order)>();
    let mut orders: Vec<(u64, Entity)> = query
        .iter(world)
        .filter(|(_, order)| order.is_unassigned() && !order.is_parked(revision))
        .map(|(entity, order)| (order.seq, entity))
        .collect();
    orders.sort_unstable();
    orders.into_iter().map(|(_, entity)| entity).collect()
}

/// Retry every unassigned order, in creation order.
///
/// Efficiency mode dispatches order by order. Fairness mode batches what it
/// can, then solves the remaining orders against all idle riders jointly and
/// sends out the oldest matched order; batching is rechecked before every
/// further pick. Orders left once the idle riders run out go through the
/// normal policy.
pub fn pending_dispatch_system(world: &mut World) {
    let orders = unassigned_orders(world);
    if orders.is_empty() {
        return;
    }
    let config = dispatch_config(world);
    match config.mode {
        DispatchMode::Efficiency => {
            for order in orders {
                dispatch(world, order, DispatchSource::Sweep);
            }
        }
        DispatchMode::Fairness => fairness_sweep(world, orders, &config),
    }
}

fn fairness_sweep(world: &mut World, orders: Vec<Entity>, config: &DispatchConfig) {
    let mut remaining: Vec<PendingOrder> = orders
        .into_iter()
        .filter_map(|order| pending_order(world, order).ok())
        .collect();

    loop {
        remaining.retain(|pending| !try_batch(world, pending, config));
        if remaining.is_empty() {
            return;
        }
        let riders = rider_views(world);
        let idle: Vec<&RiderView> = riders
            .iter()
            .filter(|rider| rider.status == RiderStatus::Idle)
            .collect();
        if idle.is_empty() {
            break;
        }
        let hotels: Vec<GridPos> = remaining.iter().map(|pending| pending.hotel_pos).collect();
        let costs = fairness_costs(&idle, &hotels, config.fairness_weight);
        // Commit only the oldest matched order so the rest get another
        // batching check against the rider just sent out.
        let Some(pick) = solve_assignment_costs(&costs)
            .into_iter()
            .min_by_key(|assignment| assignment.target_index)
        else {
            break;
        };
        let rider = idle[pick.rider_index].entity;
        let pending = remaining.remove(pick.target_index);
        let outcome = assign_idle_rider(world, &pending, rider);
        report(world, &pending, outcome, DispatchSource::Sweep);
    }

    for pending in remaining {
        dispatch(world, pending.entity, DispatchSource::Sweep);
    }
}

fn try_batch(world: &mut World, pending: &PendingOrder, config: &DispatchConfig) -> bool {
    let riders = rider_views(world);
    let Some((rider, home_distance)) = batch_candidate(&riders, pending, config) else {
        return false;
    };
    attach_order(world, pending.entity, rider);
    let outcome = DispatchOutcome::Batched {
        rider,
        home_distance,
    };
    report(world, pending, outcome, DispatchSource::Sweep);
    true
}

//! Rider tick: movement plus the rider state machine.
//!
//! Every rider is evaluated against one snapshot of orders and places taken
//! when the system starts. Rider state is mutated in place; order changes are
//! emitted as [`OrderUpdate`]s and applied by the commit system afterwards.
//!
//! ```text
//! Idle ──dispatch──▶ MovingToHotel ──arrive──▶ WaitingForFood ──all ready──▶ Delivering
//!   ▲                                                                            │
//!   └──────────── arrive ◀── Returning ◀──────── route back to hotel ◀──────────┘
//! ```
//!
//! A rider whose return leg cannot be routed goes straight to Idle.

use std::collections::HashMap;

use bevy_ecs::prelude::{Entity, Or, Query, Res, ResMut, With, Without};
use tracing::{debug, warn};

use crate::clock::SimulationClock;
use crate::ecs::{
    DeliveryStop, Home, Hotel, Label, Order, OrderStatus, Position, Rider, RiderStatus,
};
use crate::grid::{Grid, GridPos};
use crate::route_optimizer::nearest_neighbor_route;
use crate::routing::{RouteProvider, RouteProviderResource};
use crate::systems::order_commit::{OrderUpdate, PendingOrderUpdates, ReleaseReason};
use crate::telemetry::{ActivityKind, PathTrail, SimTelemetry};

/// Slack for accumulated floating point error in the movement accumulator.
const STEP_EPSILON: f64 = 1e-9;

type PlaceFilter = (Without<Rider>, Or<(With<Hotel>, With<Home>)>);

#[derive(Debug, Clone, Copy)]
struct OrderView {
    seq: u64,
    home: Entity,
    rider: Option<Entity>,
    status: OrderStatus,
}

/// Read-only state shared by every rider in one tick.
struct TickView<'a> {
    tick: u64,
    now_ms: u64,
    grid: &'a Grid,
    router: &'a dyn RouteProvider,
    orders: HashMap<Entity, OrderView>,
    places: HashMap<Entity, GridPos>,
}

/// Writes produced during one tick.
struct TickEffects<'a> {
    trail: &'a mut PathTrail,
    pending: &'a mut PendingOrderUpdates,
    telemetry: &'a mut SimTelemetry,
}

/// Add one tick of progress and step along the queue. Returns the cells
/// entered, in order. The accumulator resets once the queue drains.
pub fn advance_along_path(rider: &mut Rider, pos: &mut GridPos) -> Vec<GridPos> {
    let mut stepped = Vec::new();
    if rider.path_queue.is_empty() {
        return stepped;
    }
    rider.movement_accumulator += rider.speed;
    while rider.movement_accumulator >= 1.0 - STEP_EPSILON {
        let Some(next) = rider.path_queue.pop_front() else {
            break;
        };
        *pos = next;
        rider.movement_accumulator = (rider.movement_accumulator - 1.0).max(0.0);
        rider.distance_traveled += 1;
        stepped.push(next);
    }
    if rider.path_queue.is_empty() {
        rider.movement_accumulator = 0.0;
    }
    stepped
}

#[allow(clippy::too_many_arguments)]
pub fn rider_tick_system(
    clock: Res<SimulationClock>,
    grid: Res<Grid>,
    router: Res<RouteProviderResource>,
    mut trail: ResMut<PathTrail>,
    mut pending: ResMut<PendingOrderUpdates>,
    mut telemetry: ResMut<SimTelemetry>,
    orders: Query<(Entity, &Order)>,
    places: Query<(Entity, &Position), PlaceFilter>,
    mut riders: Query<(Entity, &mut Rider, &mut Position, Option<&Label>)>,
) {
    let view = TickView {
        tick: clock.tick(),
        now_ms: clock.now_ms(),
        grid: &grid,
        router: &**router,
        orders: orders
            .iter()
            .map(|(entity, order)| {
                (
                    entity,
                    OrderView {
                        seq: order.seq,
                        home: order.home,
                        rider: order.rider,
                        status: order.status(),
                    },
                )
            })
            .collect(),
        places: places
            .iter()
            .map(|(entity, position)| (entity, position.0))
            .collect(),
    };
    let mut effects = TickEffects {
        trail: &mut trail,
        pending: &mut pending,
        telemetry: &mut telemetry,
    };

    let mut order: Vec<Entity> = riders.iter().map(|(entity, ..)| entity).collect();
    order.sort_unstable();
    for entity in order {
        let Ok((_, mut rider, mut position, label)) = riders.get_mut(entity) else {
            continue;
        };
        let name = label.map_or_else(|| format!("{entity:?}"), |label| label.0.clone());
        tick_rider(&view, &mut effects, entity, &name, &mut rider, &mut position.0);
    }
}

fn tick_rider(
    view: &TickView,
    effects: &mut TickEffects,
    entity: Entity,
    name: &str,
    rider: &mut Rider,
    pos: &mut GridPos,
) {
    for cell in advance_along_path(rider, pos) {
        effects.trail.push(cell);
        if rider.status == RiderStatus::Delivering {
            deliver_at(view, effects, entity, rider, cell);
        }
    }

    if rider.is_moving() {
        return;
    }

    // Transitions chain within a tick: a rider arriving at a hotel with the
    // food ready leaves on the same tick.
    if rider.status == RiderStatus::MovingToHotel {
        rider.status = RiderStatus::WaitingForFood;
        debug!(rider = ?entity, tick = view.tick, at = %pos, "arrived at hotel");
    }
    if rider.status == RiderStatus::WaitingForFood {
        try_start_delivery(view, effects, entity, rider, *pos);
    }
    if rider.status == RiderStatus::Delivering && !rider.is_moving() {
        finish_deliveries(view, effects, entity, name, rider, *pos);
    }
    if rider.status == RiderStatus::Returning && !rider.is_moving() {
        rider.reset_to_idle();
        debug!(rider = ?entity, tick = view.tick, "back at hotel, idle");
    }
}

/// Deliver every planned stop whose home is `cell`.
fn deliver_at(
    view: &TickView,
    effects: &mut TickEffects,
    entity: Entity,
    rider: &mut Rider,
    cell: GridPos,
) {
    let odometer = rider.distance_traveled;
    rider.delivery_queue.retain(|stop| {
        if stop.home != cell {
            return true;
        }
        effects.pending.push(OrderUpdate::Delivered {
            order: stop.order,
            rider: entity,
            at_ms: view.now_ms,
            odometer,
        });
        false
    });
}

fn try_start_delivery(
    view: &TickView,
    effects: &mut TickEffects,
    entity: Entity,
    rider: &mut Rider,
    pos: GridPos,
) {
    // Orders deleted or handed elsewhere are lookup misses.
    rider.assigned_orders.retain(|order| {
        view.orders
            .get(order)
            .is_some_and(|o| o.rider == Some(entity) && o.status != OrderStatus::Delivered)
    });
    if rider.assigned_orders.is_empty() {
        rider.reset_to_idle();
        debug!(rider = ?entity, tick = view.tick, "no orders left, idle");
        return;
    }

    let all_ready = rider
        .assigned_orders
        .iter()
        .filter_map(|order| view.orders.get(order))
        .all(|o| o.status == OrderStatus::Ready);
    if !all_ready {
        return;
    }

    let mut stops: Vec<DeliveryStop> = Vec::with_capacity(rider.assigned_orders.len());
    for order in rider.assigned_orders.clone() {
        let Some(home) = view
            .orders
            .get(&order)
            .and_then(|o| view.places.get(&o.home))
        else {
            release(view, effects, entity, rider, order, ReleaseReason::MissingHome);
            continue;
        };
        stops.push(DeliveryStop { order, home: *home });
    }

    let targets: Vec<GridPos> = stops.iter().map(|stop| stop.home).collect();
    let route = nearest_neighbor_route(view.router, view.grid, pos, &targets);
    for &idx in &route.skipped {
        release(view, effects, entity, rider, stops[idx].order, ReleaseReason::Unreachable);
    }
    for &idx in &route.visit_order {
        effects.pending.push(OrderUpdate::PickedUp {
            order: stops[idx].order,
            rider: entity,
            at_ms: view.now_ms,
        });
    }

    rider.delivery_queue = route.visit_order.iter().map(|&idx| stops[idx]).collect();
    rider.path_queue = route.path.into_iter().collect();
    rider.target = None;
    rider.status = RiderStatus::Delivering;
    debug!(
        rider = ?entity,
        tick = view.tick,
        stops = rider.delivery_queue.len(),
        cells = rider.path_queue.len(),
        "delivery route planned"
    );

    // Homes on the hotel cell itself.
    deliver_at(view, effects, entity, rider, pos);
}

fn finish_deliveries(
    view: &TickView,
    effects: &mut TickEffects,
    entity: Entity,
    name: &str,
    rider: &mut Rider,
    pos: GridPos,
) {
    let leftovers: Vec<Entity> = rider.delivery_queue.drain(..).map(|stop| stop.order).collect();
    for order in leftovers {
        release(view, effects, entity, rider, order, ReleaseReason::NotReached);
    }
    rider.assigned_orders.clear();

    let back = rider
        .base_hotel
        .and_then(|hotel| view.places.get(&hotel).copied())
        .and_then(|hotel_pos| view.router.route(view.grid, pos, hotel_pos));
    match back {
        Some(path) => {
            rider.path_queue = path.into_iter().skip(1).collect();
            rider.status = RiderStatus::Returning;
            debug!(rider = ?entity, tick = view.tick, cells = rider.path_queue.len(), "returning");
            effects.telemetry.record_activity(
                view.now_ms,
                ActivityKind::Returning,
                None,
                format!("{name} heading back, {} cells", rider.path_queue.len()),
            );
        }
        None => {
            warn!(rider = ?entity, tick = view.tick, "no route back to hotel, idling in place");
            effects.telemetry.routing_failures += 1;
            effects.telemetry.record_activity(
                view.now_ms,
                ActivityKind::Idle,
                None,
                format!("{name} cannot reach its hotel, idle at {pos}"),
            );
            rider.reset_to_idle();
        }
    }
}

fn release(
    view: &TickView,
    effects: &mut TickEffects,
    entity: Entity,
    rider: &mut Rider,
    order: Entity,
    reason: ReleaseReason,
) {
    rider.assigned_orders.retain(|assigned| *assigned != order);
    let seq = view.orders.get(&order).map(|o| o.seq);
    debug!(rider = ?entity, order = ?seq, ?reason, "releasing order");
    effects.pending.push(OrderUpdate::Released {
        order,
        rider: entity,
        reason,
    });
}

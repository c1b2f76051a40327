//! Telemetry and read-only snapshots: completed deliveries, the activity log,
//! the rider path trail, and serializable world snapshots for the UI/CLI.

use std::collections::VecDeque;

use bevy_ecs::prelude::{Entity, Resource, World};
use serde::{Deserialize, Serialize};

use crate::clock::SimulationClock;
use crate::ecs::{EntityKind, Label, Order, OrderStatus, Position, Rider, RiderStatus};
use crate::grid::{Grid, GridPos};

/// Default number of cells kept in the path trail.
pub const DEFAULT_TRAIL_LENGTH: usize = 500;

/// Default number of activity entries kept.
pub const DEFAULT_ACTIVITY_CAPACITY: usize = 200;

/// One completed delivery, recorded when the order is committed as delivered.
#[derive(Debug, Clone, PartialEq)]
pub struct DeliveryRecord {
    pub order: Entity,
    pub order_seq: u64,
    pub rider: Entity,
    pub created_at_ms: u64,
    pub pickup_at_ms: Option<u64>,
    pub delivered_at_ms: u64,
    pub duration_ms: u64,
    pub distance_cells: u64,
    pub fare: f64,
}

impl DeliveryRecord {
    /// Time the food spent on the rider's bike, when known.
    pub fn ride_time_ms(&self) -> Option<u64> {
        self.pickup_at_ms
            .map(|pickup| self.delivered_at_ms.saturating_sub(pickup))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    OrderCreated,
    Batched,
    Dispatched,
    ForcedBatch,
    Queued,
    Unroutable,
    PickedUp,
    Delivered,
    Requeued,
    Returning,
    Idle,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityEntry {
    pub at_ms: u64,
    pub kind: ActivityKind,
    pub order_seq: Option<u64>,
    pub detail: String,
}

/// Collects simulation telemetry.
#[derive(Debug, Resource)]
pub struct SimTelemetry {
    pub deliveries: Vec<DeliveryRecord>,
    pub activity: VecDeque<ActivityEntry>,
    pub activity_capacity: usize,
    pub routing_failures: u64,
    pub requeued_orders: u64,
}

impl Default for SimTelemetry {
    fn default() -> Self {
        Self::with_activity_capacity(DEFAULT_ACTIVITY_CAPACITY)
    }
}

impl SimTelemetry {
    pub fn with_activity_capacity(activity_capacity: usize) -> Self {
        Self {
            deliveries: Vec::new(),
            activity: VecDeque::new(),
            activity_capacity,
            routing_failures: 0,
            requeued_orders: 0,
        }
    }

    pub fn record_activity(
        &mut self,
        at_ms: u64,
        kind: ActivityKind,
        order_seq: Option<u64>,
        detail: impl Into<String>,
    ) {
        if self.activity_capacity == 0 {
            return;
        }
        while self.activity.len() >= self.activity_capacity {
            self.activity.pop_front();
        }
        self.activity.push_back(ActivityEntry {
            at_ms,
            kind,
            order_seq,
            detail: detail.into(),
        });
    }

    pub fn average_delivery_ms(&self) -> Option<f64> {
        if self.deliveries.is_empty() {
            return None;
        }
        let total: u64 = self.deliveries.iter().map(|d| d.duration_ms).sum();
        Some(total as f64 / self.deliveries.len() as f64)
    }

    pub fn total_distance_cells(&self) -> u64 {
        self.deliveries.iter().map(|d| d.distance_cells).sum()
    }
}

/// Bounded record of recently stepped cells across all riders.
#[derive(Debug, Clone, Resource)]
pub struct PathTrail {
    cells: VecDeque<GridPos>,
    capacity: usize,
}

impl Default for PathTrail {
    fn default() -> Self {
        Self::new(DEFAULT_TRAIL_LENGTH)
    }
}

impl PathTrail {
    pub fn new(capacity: usize) -> Self {
        Self {
            cells: VecDeque::with_capacity(capacity.min(4_096)),
            capacity,
        }
    }

    pub fn push(&mut self, cell: GridPos) {
        if self.capacity == 0 {
            return;
        }
        if self.cells.len() == self.capacity {
            self.cells.pop_front();
        }
        self.cells.push_back(cell);
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Oldest first.
    pub fn cells(&self) -> impl Iterator<Item = GridPos> + '_ {
        self.cells.iter().copied()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiderSnapshot {
    pub id: u64,
    pub label: String,
    pub pos: GridPos,
    pub status: RiderStatus,
    pub path: Vec<GridPos>,
    pub assigned_orders: Vec<u64>,
    pub target: Option<u64>,
    pub speed: f64,
    pub distance_traveled: u64,
    pub earnings: f64,
    pub deliveries_completed: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderSnapshot {
    pub id: u64,
    pub seq: u64,
    pub label: String,
    pub home: u64,
    pub hotel: u64,
    pub rider: Option<u64>,
    pub status: OrderStatus,
    pub cooking_time_remaining_ms: u64,
    pub created_at_ms: u64,
    pub pickup_at_ms: Option<u64>,
    pub delivered_at_ms: Option<u64>,
    pub delivery_duration_ms: Option<u64>,
    pub distance_covered: Option<u64>,
    /// Held back from dispatch until the walls change.
    pub parked: bool,
}

/// Hotel or home.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaceSnapshot {
    pub id: u64,
    pub kind: EntityKind,
    pub label: String,
    pub pos: GridPos,
}

/// Aggregated counts at a point in time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SimCounts {
    pub riders_idle: usize,
    pub riders_moving_to_hotel: usize,
    pub riders_waiting_for_food: usize,
    pub riders_delivering: usize,
    pub riders_returning: usize,
    pub orders_cooking: usize,
    pub orders_ready: usize,
    pub orders_delivered: usize,
    pub orders_unassigned: usize,
}

impl SimCounts {
    pub fn add_rider(&mut self, status: RiderStatus) {
        match status {
            RiderStatus::Idle => self.riders_idle += 1,
            RiderStatus::MovingToHotel => self.riders_moving_to_hotel += 1,
            RiderStatus::WaitingForFood => self.riders_waiting_for_food += 1,
            RiderStatus::Delivering => self.riders_delivering += 1,
            RiderStatus::Returning => self.riders_returning += 1,
        }
    }

    pub fn add_order(&mut self, order: &Order) {
        match order.status() {
            OrderStatus::Cooking => self.orders_cooking += 1,
            OrderStatus::Ready => self.orders_ready += 1,
            OrderStatus::Delivered => self.orders_delivered += 1,
        }
        if order.is_unassigned() {
            self.orders_unassigned += 1;
        }
    }

    pub fn riders(&self) -> usize {
        self.riders_idle
            + self.riders_moving_to_hotel
            + self.riders_waiting_for_food
            + self.riders_delivering
            + self.riders_returning
    }

    pub fn orders(&self) -> usize {
        self.orders_cooking + self.orders_ready + self.orders_delivered
    }
}

/// Read-only view of the whole simulation at one tick.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorldSnapshot {
    pub tick: u64,
    pub time_ms: u64,
    pub rows: i32,
    pub cols: i32,
    pub counts: SimCounts,
    pub riders: Vec<RiderSnapshot>,
    pub orders: Vec<OrderSnapshot>,
    pub places: Vec<PlaceSnapshot>,
    pub walls: Vec<GridPos>,
    pub trail: Vec<GridPos>,
    pub recent_activity: Vec<ActivityEntry>,
}

fn label_of(label: Option<&Label>, fallback: &str) -> String {
    label.map_or_else(|| fallback.to_string(), |l| l.0.clone())
}

/// Capture a snapshot without touching simulation state.
pub fn capture_snapshot(world: &World) -> WorldSnapshot {
    let (tick, time_ms) = world
        .get_resource::<SimulationClock>()
        .map_or((0, 0), |clock| (clock.tick(), clock.now_ms()));
    let (rows, cols, walls) = world.get_resource::<Grid>().map_or_else(
        || (0, 0, Vec::new()),
        |grid| (grid.rows(), grid.cols(), grid.walls().collect()),
    );
    let revision = world.get_resource::<Grid>().map_or(0, Grid::revision);
    let trail = world
        .get_resource::<PathTrail>()
        .map(|trail| trail.cells().collect())
        .unwrap_or_default();
    let recent_activity = world
        .get_resource::<SimTelemetry>()
        .map(|telemetry| telemetry.activity.iter().cloned().collect())
        .unwrap_or_default();

    let mut counts = SimCounts::default();
    let mut riders = Vec::new();
    let mut orders = Vec::new();
    let mut places = Vec::new();

    for entity_ref in world.iter_entities() {
        let id = entity_ref.id().to_bits();
        if let Some(order) = entity_ref.get::<Order>() {
            counts.add_order(order);
            orders.push(OrderSnapshot {
                id,
                seq: order.seq,
                label: order.label(),
                home: order.home.to_bits(),
                hotel: order.hotel.to_bits(),
                rider: order.rider.map(Entity::to_bits),
                status: order.status(),
                cooking_time_remaining_ms: order.cooking_time_remaining_ms,
                created_at_ms: order.created_at_ms,
                pickup_at_ms: order.pickup_at_ms,
                delivered_at_ms: order.delivered_at_ms,
                delivery_duration_ms: order.delivery_duration_ms,
                distance_covered: order.distance_covered,
                parked: order.is_parked(revision),
            });
            continue;
        }

        let (Some(kind), Some(Position(pos))) =
            (entity_ref.get::<EntityKind>(), entity_ref.get::<Position>())
        else {
            continue;
        };
        let label = label_of(entity_ref.get::<Label>(), kind.name());

        match (kind, entity_ref.get::<Rider>()) {
            (EntityKind::Rider, Some(rider)) => {
                counts.add_rider(rider.status);
                riders.push(RiderSnapshot {
                    id,
                    label,
                    pos: *pos,
                    status: rider.status,
                    path: rider.path_queue.iter().copied().collect(),
                    assigned_orders: rider.assigned_orders.iter().map(|e| e.to_bits()).collect(),
                    target: rider.target.map(Entity::to_bits),
                    speed: rider.speed,
                    distance_traveled: rider.distance_traveled,
                    earnings: rider.earnings,
                    deliveries_completed: rider.deliveries_completed,
                });
            }
            (EntityKind::Hotel | EntityKind::Home, _) => places.push(PlaceSnapshot {
                id,
                kind: *kind,
                label,
                pos: *pos,
            }),
            (EntityKind::Rider, None) => {}
        }
    }

    riders.sort_by_key(|r| r.id);
    places.sort_by_key(|p| p.id);
    orders.sort_by_key(|o| o.seq);

    WorldSnapshot {
        tick,
        time_ms,
        rows,
        cols,
        counts,
        riders,
        orders,
        places,
        walls,
        trail,
        recent_activity,
    }
}

use std::collections::VecDeque;

use bevy_ecs::prelude::{Component, Entity};
use serde::{Deserialize, Serialize};

use crate::grid::GridPos;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Component)]
pub struct Position(pub GridPos);

#[derive(Debug, Clone, PartialEq, Eq, Component)]
pub struct Label(pub String);

/// Kind tag shared by every placed entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Component)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Rider,
    Hotel,
    Home,
}

impl EntityKind {
    pub fn name(self) -> &'static str {
        match self {
            EntityKind::Rider => "Rider",
            EntityKind::Hotel => "Hotel",
            EntityKind::Home => "Home",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Component)]
pub struct Hotel;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Component)]
pub struct Home;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiderStatus {
    #[default]
    Idle,
    MovingToHotel,
    WaitingForFood,
    Delivering,
    Returning,
}

/// One planned drop-off on the current delivery leg.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryStop {
    pub order: Entity,
    pub home: GridPos,
}

#[derive(Debug, Clone, PartialEq, Component)]
pub struct Rider {
    pub status: RiderStatus,
    /// Remaining cells to traverse, excluding the current position.
    pub path_queue: VecDeque<GridPos>,
    /// Orders carried or awaiting pickup, in assignment order.
    pub assigned_orders: Vec<Entity>,
    /// Hotel being approached; cleared once the delivery route is planned.
    pub target: Option<Entity>,
    /// Hotel the current run started from; the return leg heads back here.
    pub base_hotel: Option<Entity>,
    /// Planned visiting sequence for the current delivery leg.
    pub delivery_queue: VecDeque<DeliveryStop>,
    /// Cells per tick. Always positive.
    pub speed: f64,
    /// Fractional progress toward the next cell, in [0, speed).
    pub movement_accumulator: f64,
    /// Cells moved since spawn.
    pub distance_traveled: u64,
    pub earnings: f64,
    pub deliveries_completed: u32,
}

impl Rider {
    pub fn new(speed: f64) -> Self {
        Self {
            status: RiderStatus::Idle,
            path_queue: VecDeque::new(),
            assigned_orders: Vec::new(),
            target: None,
            base_hotel: None,
            delivery_queue: VecDeque::new(),
            speed,
            movement_accumulator: 0.0,
            distance_traveled: 0,
            earnings: 0.0,
            deliveries_completed: 0,
        }
    }

    pub fn is_idle(&self) -> bool {
        self.status == RiderStatus::Idle
    }

    pub fn is_moving(&self) -> bool {
        !self.path_queue.is_empty()
    }

    /// Drop everything tied to the current run and go idle.
    pub fn reset_to_idle(&mut self) {
        self.status = RiderStatus::Idle;
        self.path_queue.clear();
        self.assigned_orders.clear();
        self.delivery_queue.clear();
        self.target = None;
        self.base_hotel = None;
        self.movement_accumulator = 0.0;
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Cooking,
    Ready,
    Delivered,
}

#[derive(Debug, Clone, PartialEq, Component)]
pub struct Order {
    /// Creation sequence; sweep order and display label.
    pub seq: u64,
    pub home: Entity,
    pub hotel: Entity,
    pub rider: Option<Entity>,
    status: OrderStatus,
    pub cooking_time_remaining_ms: u64,
    pub created_at_ms: u64,
    pub assigned_at_ms: Option<u64>,
    /// Rider odometer when the order was attached.
    pub odometer_at_assignment: u64,
    pub pickup_at_ms: Option<u64>,
    pub delivered_at_ms: Option<u64>,
    pub delivery_duration_ms: Option<u64>,
    pub distance_covered: Option<u64>,
    /// Grid revision at which the home proved unreachable. The sweep skips
    /// the order until the walls change.
    pub parked_at_revision: Option<u64>,
}

impl Order {
    pub fn new(seq: u64, home: Entity, hotel: Entity, cooking_time_ms: u64, now_ms: u64) -> Self {
        Self {
            seq,
            home,
            hotel,
            rider: None,
            status: OrderStatus::Cooking,
            cooking_time_remaining_ms: cooking_time_ms,
            created_at_ms: now_ms,
            assigned_at_ms: None,
            odometer_at_assignment: 0,
            pickup_at_ms: None,
            delivered_at_ms: None,
            delivery_duration_ms: None,
            distance_covered: None,
            parked_at_revision: None,
        }
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    /// Move the status forward. Returns `false` (and leaves the order alone)
    /// for a backward or no-op transition.
    pub fn advance_status(&mut self, next: OrderStatus) -> bool {
        if next <= self.status {
            return false;
        }
        self.status = next;
        true
    }

    pub fn is_ready(&self) -> bool {
        self.status == OrderStatus::Ready
    }

    pub fn is_delivered(&self) -> bool {
        self.status == OrderStatus::Delivered
    }

    pub fn is_unassigned(&self) -> bool {
        self.rider.is_none() && !self.is_delivered()
    }

    /// `#N` display label.
    pub fn label(&self) -> String {
        format!("#{}", self.seq)
    }

    /// Detach from the current rider so the dispatch sweep retries it.
    pub fn release(&mut self) {
        self.rider = None;
        self.assigned_at_ms = None;
        self.pickup_at_ms = None;
        self.odometer_at_assignment = 0;
    }

    /// Hold the order back from dispatch until the grid moves past `revision`.
    pub fn park(&mut self, revision: u64) {
        self.parked_at_revision = Some(revision);
    }

    pub fn is_parked(&self, revision: u64) -> bool {
        self.parked_at_revision == Some(revision)
    }
}

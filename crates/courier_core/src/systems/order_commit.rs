//! Second half of the tick: order mutations produced by the rider tick are
//! buffered in [`PendingOrderUpdates`] and applied here in one pass, so no
//! rider ever observes a half-updated order set.

use bevy_ecs::prelude::{Entity, Query, Res, ResMut, Resource};
use tracing::{info, warn};

use crate::clock::SimulationClock;
use crate::ecs::{Label, Order, OrderStatus, Rider};
use crate::grid::Grid;
use crate::pricing::PricingConfig;
use crate::telemetry::{ActivityKind, DeliveryRecord, SimTelemetry};

/// Why a rider gave an order back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseReason {
    /// No route from the hotel to the order's home.
    Unreachable,
    /// The order's home disappeared.
    MissingHome,
    /// The run ended with the stop still queued.
    NotReached,
}

impl ReleaseReason {
    fn describe(self) -> &'static str {
        match self {
            ReleaseReason::Unreachable => "home unreachable from hotel",
            ReleaseReason::MissingHome => "home no longer exists",
            ReleaseReason::NotReached => "rider finished without reaching the home",
        }
    }

    /// Routing failures are retried only once the walls change.
    pub fn parks_order(self) -> bool {
        matches!(self, ReleaseReason::Unreachable | ReleaseReason::NotReached)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderUpdate {
    PickedUp {
        order: Entity,
        rider: Entity,
        at_ms: u64,
    },
    Delivered {
        order: Entity,
        rider: Entity,
        at_ms: u64,
        /// Rider odometer on arrival.
        odometer: u64,
    },
    Released {
        order: Entity,
        rider: Entity,
        reason: ReleaseReason,
    },
}

#[derive(Debug, Default, Resource)]
pub struct PendingOrderUpdates(pub Vec<OrderUpdate>);

impl PendingOrderUpdates {
    pub fn push(&mut self, update: OrderUpdate) {
        self.0.push(update);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

type RiderQuery<'w, 's> = Query<'w, 's, (&'static mut Rider, Option<&'static Label>)>;

fn rider_label(riders: &RiderQuery, rider: Entity) -> String {
    riders
        .get(rider)
        .ok()
        .and_then(|(_, label)| label.map(|l| l.0.clone()))
        .unwrap_or_else(|| format!("{rider:?}"))
}

pub fn commit_order_updates_system(
    clock: Res<SimulationClock>,
    grid: Option<Res<Grid>>,
    pricing: Option<Res<PricingConfig>>,
    mut pending: ResMut<PendingOrderUpdates>,
    mut telemetry: ResMut<SimTelemetry>,
    mut orders: Query<&mut Order>,
    mut riders: RiderQuery,
) {
    if pending.is_empty() {
        return;
    }
    let pricing = pricing.as_deref().copied().unwrap_or_default();
    let now_ms = clock.now_ms();
    let revision = grid.as_deref().map_or(0, Grid::revision);

    for update in pending.0.drain(..) {
        match update {
            OrderUpdate::PickedUp {
                order,
                rider,
                at_ms,
            } => {
                let Ok(mut state) = orders.get_mut(order) else {
                    continue;
                };
                if state.rider != Some(rider) {
                    continue;
                }
                state.pickup_at_ms = Some(at_ms);
                let detail = format!("picked up by {}", rider_label(&riders, rider));
                telemetry.record_activity(now_ms, ActivityKind::PickedUp, Some(state.seq), detail);
            }
            OrderUpdate::Delivered {
                order,
                rider,
                at_ms,
                odometer,
            } => {
                let Ok(mut state) = orders.get_mut(order) else {
                    continue;
                };
                if !state.advance_status(OrderStatus::Delivered) {
                    continue;
                }
                let duration_ms = at_ms.saturating_sub(state.created_at_ms);
                let distance = odometer.saturating_sub(state.odometer_at_assignment);
                state.delivered_at_ms = Some(at_ms);
                state.delivery_duration_ms = Some(duration_ms);
                state.distance_covered = Some(distance);

                let fare = pricing.fare(distance);
                if let Ok((mut rider_state, _)) = riders.get_mut(rider) {
                    rider_state.earnings += fare;
                    rider_state.deliveries_completed += 1;
                }
                let label = rider_label(&riders, rider);
                info!(
                    order = state.seq,
                    rider = %label,
                    duration_ms,
                    distance,
                    "order delivered"
                );
                telemetry.deliveries.push(DeliveryRecord {
                    order,
                    order_seq: state.seq,
                    rider,
                    created_at_ms: state.created_at_ms,
                    pickup_at_ms: state.pickup_at_ms,
                    delivered_at_ms: at_ms,
                    duration_ms,
                    distance_cells: distance,
                    fare,
                });
                telemetry.record_activity(
                    now_ms,
                    ActivityKind::Delivered,
                    Some(state.seq),
                    format!("delivered by {label} in {duration_ms} ms over {distance} cells"),
                );
            }
            OrderUpdate::Released {
                order,
                rider,
                reason,
            } => {
                let Ok(mut state) = orders.get_mut(order) else {
                    continue;
                };
                if state.is_delivered() || state.rider != Some(rider) {
                    continue;
                }
                state.release();
                let detail = if reason.parks_order() {
                    state.park(revision);
                    format!("{}, held until the walls change", reason.describe())
                } else {
                    reason.describe().to_string()
                };
                let label = rider_label(&riders, rider);
                warn!(order = state.seq, rider = %label, reason = reason.describe(), "order re-queued");
                telemetry.requeued_orders += 1;
                telemetry.record_activity(now_ms, ActivityKind::Requeued, Some(state.seq), detail);
            }
        }
    }
}

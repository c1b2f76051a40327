use bevy_ecs::prelude::{Query, Res};
use tracing::debug;

use crate::clock::SimulationClock;
use crate::ecs::{Order, OrderStatus};
use crate::orders::tick_cooking;

/// Counts every cooking order down by one tick and flips finished ones to
/// Ready. No other status change happens here.
pub fn cooking_timer_system(clock: Res<SimulationClock>, mut orders: Query<&mut Order>) {
    let elapsed = clock.tick_ms();
    for mut order in &mut orders {
        if order.status() != OrderStatus::Cooking {
            continue;
        }
        if tick_cooking(&mut order, elapsed) {
            debug!(order = order.seq, tick = clock.tick(), "order ready");
        }
    }
}

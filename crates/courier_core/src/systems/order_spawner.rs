//! Automatic order generation between random hotel/home pairs.

use bevy_ecs::prelude::{Entity, Resource, With, World};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::clock::SimulationClock;
use crate::ecs::{Home, Hotel};
use crate::orders::create_order;

#[derive(Debug, Resource)]
pub struct OrderSpawner {
    rng: StdRng,
    /// Ticks between orders. Zero disables spawning.
    pub interval_ticks: u64,
    pub spawned: u64,
}

impl OrderSpawner {
    pub fn new(seed: u64, interval_ticks: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            interval_ticks,
            spawned: 0,
        }
    }

    fn due(&self, tick: u64) -> bool {
        self.interval_ticks > 0 && tick % self.interval_ticks == 0
    }
}

fn sorted_entities<T: bevy_ecs::component::Component>(world: &mut World) -> Vec<Entity> {
    let mut query = world.query_filtered::<Entity, With<T>>();
    let mut entities: Vec<Entity> = query.iter(world).collect();
    entities.sort_unstable();
    entities
}

/// Exclusive system: on every due tick, order from a random hotel to a random
/// home through the normal creation path.
pub fn auto_order_system(world: &mut World) {
    let tick = world
        .get_resource::<SimulationClock>()
        .map_or(0, SimulationClock::tick);
    if !world
        .get_resource::<OrderSpawner>()
        .is_some_and(|spawner| spawner.due(tick))
    {
        return;
    }

    let hotels = sorted_entities::<Hotel>(world);
    let homes = sorted_entities::<Home>(world);
    if hotels.is_empty() || homes.is_empty() {
        return;
    }

    let Some((hotel, home)) = world
        .get_resource_mut::<OrderSpawner>()
        .map(|mut spawner| {
            let hotel = hotels[spawner.rng.gen_range(0..hotels.len())];
            let home = homes[spawner.rng.gen_range(0..homes.len())];
            spawner.spawned += 1;
            (hotel, home)
        })
    else {
        return;
    };

    match create_order(world, home, hotel) {
        Ok(placed) => debug!(tick, outcome = ?placed.outcome, "auto order placed"),
        Err(err) => debug!(tick, %err, "auto order skipped"),
    }
}

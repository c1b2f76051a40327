//! Per-delivery rider earnings.

use bevy_ecs::prelude::Resource;
use serde::{Deserialize, Serialize};

/// Base fare in currency units.
pub const BASE_FARE: f64 = 2.50;

/// Per-cell rate in currency units.
pub const FARE_PER_CELL: f64 = 0.50;

/// Fare schedule credited to a rider on each delivery.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Resource)]
#[serde(default)]
pub struct PricingConfig {
    pub base_fare: f64,
    pub fare_per_cell: f64,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            base_fare: BASE_FARE,
            fare_per_cell: FARE_PER_CELL,
        }
    }
}

impl PricingConfig {
    /// `fare = base_fare + distance_cells * fare_per_cell`
    pub fn fare(&self, distance_cells: u64) -> f64 {
        self.base_fare + distance_cells as f64 * self.fare_per_cell
    }
}

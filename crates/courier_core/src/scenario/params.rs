use serde::{Deserialize, Serialize};

use crate::clock::DEFAULT_TICK_MS;
use crate::dispatch::{DispatchConfig, DispatchMode};
use crate::grid::DEFAULT_GRID_SIZE;
use crate::orders::DEFAULT_COOKING_TIME_MS;
use crate::pricing::PricingConfig;
use crate::routing::DEFAULT_ROUTE_CACHE_CAPACITY;
use crate::search::SearchStrategy;
use crate::telemetry::{DEFAULT_ACTIVITY_CAPACITY, DEFAULT_TRAIL_LENGTH};

/// Parameters for building a simulation scenario. Every field has a default,
/// so a partial JSON document is a valid configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioParams {
    pub rows: i32,
    pub cols: i32,
    /// Simulation ms per tick.
    pub tick_ms: u64,
    pub seed: Option<u64>,
    /// Fraction of free cells turned into walls by [`super::build_scenario`].
    pub wall_density: f64,
    pub num_riders: usize,
    pub num_hotels: usize,
    pub num_homes: usize,
    /// Cells per tick.
    pub rider_speed: f64,
    pub cooking_time_ms: u64,
    pub dispatch: DispatchConfig,
    /// Strategy used for live routing.
    pub path_strategy: SearchStrategy,
    /// Route cache entries. 0 disables the cache.
    pub path_cache_capacity: usize,
    /// Ticks between automatic orders. 0 disables them.
    pub auto_order_interval_ticks: u64,
    pub trail_length: usize,
    pub activity_capacity: usize,
    pub pricing: PricingConfig,
}

impl Default for ScenarioParams {
    fn default() -> Self {
        Self {
            rows: DEFAULT_GRID_SIZE,
            cols: DEFAULT_GRID_SIZE,
            tick_ms: DEFAULT_TICK_MS,
            seed: None,
            wall_density: 0.1,
            num_riders: 3,
            num_hotels: 2,
            num_homes: 6,
            rider_speed: 0.25,
            cooking_time_ms: DEFAULT_COOKING_TIME_MS,
            dispatch: DispatchConfig::default(),
            path_strategy: SearchStrategy::AStar,
            path_cache_capacity: DEFAULT_ROUTE_CACHE_CAPACITY,
            auto_order_interval_ticks: 0,
            trail_length: DEFAULT_TRAIL_LENGTH,
            activity_capacity: DEFAULT_ACTIVITY_CAPACITY,
            pricing: PricingConfig::default(),
        }
    }
}

impl ScenarioParams {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_grid(mut self, rows: i32, cols: i32) -> Self {
        self.rows = rows;
        self.cols = cols;
        self
    }

    pub fn with_wall_density(mut self, density: f64) -> Self {
        self.wall_density = density;
        self
    }

    /// Riders, hotels and homes placed by the scenario builder.
    pub fn with_counts(mut self, riders: usize, hotels: usize, homes: usize) -> Self {
        self.num_riders = riders;
        self.num_hotels = hotels;
        self.num_homes = homes;
        self
    }

    pub fn with_rider_speed(mut self, speed: f64) -> Self {
        self.rider_speed = speed;
        self
    }

    pub fn with_tick_ms(mut self, tick_ms: u64) -> Self {
        self.tick_ms = tick_ms;
        self
    }

    pub fn with_cooking_time_ms(mut self, cooking_time_ms: u64) -> Self {
        self.cooking_time_ms = cooking_time_ms;
        self
    }

    pub fn with_dispatch_mode(mut self, mode: DispatchMode) -> Self {
        self.dispatch.mode = mode;
        self
    }

    pub fn with_dispatch_config(mut self, dispatch: DispatchConfig) -> Self {
        self.dispatch = dispatch;
        self
    }

    pub fn with_path_strategy(mut self, strategy: SearchStrategy) -> Self {
        self.path_strategy = strategy;
        self
    }

    pub fn with_path_cache_capacity(mut self, capacity: usize) -> Self {
        self.path_cache_capacity = capacity;
        self
    }

    /// Place an automatic order every `ticks` ticks (0 = never).
    pub fn with_auto_orders(mut self, ticks: u64) -> Self {
        self.auto_order_interval_ticks = ticks;
        self
    }

    pub fn with_pricing_config(mut self, pricing: PricingConfig) -> Self {
        self.pricing = pricing;
        self
    }
}

//! Scenario parameters from a JSON file plus command-line overrides.

use std::fs;

use anyhow::{Context, Result};
use courier_core::scenario::ScenarioParams;

use crate::ScenarioOverrides;

pub fn load_params(overrides: &ScenarioOverrides) -> Result<ScenarioParams> {
    let mut params = match &overrides.config {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("reading scenario config {}", path.display()))?;
            serde_json::from_str::<ScenarioParams>(&text)
                .with_context(|| format!("parsing scenario config {}", path.display()))?
        }
        None => ScenarioParams::default(),
    };
    apply_overrides(&mut params, overrides);
    params.validate().context("invalid scenario parameters")?;
    Ok(params)
}

fn apply_overrides(params: &mut ScenarioParams, o: &ScenarioOverrides) {
    if let Some(seed) = o.seed {
        params.seed = Some(seed);
    }
    if let Some(rows) = o.rows {
        params.rows = rows;
    }
    if let Some(cols) = o.cols {
        params.cols = cols;
    }
    if let Some(riders) = o.riders {
        params.num_riders = riders;
    }
    if let Some(hotels) = o.hotels {
        params.num_hotels = hotels;
    }
    if let Some(homes) = o.homes {
        params.num_homes = homes;
    }
    if let Some(density) = o.wall_density {
        params.wall_density = density;
    }
    if let Some(speed) = o.speed {
        params.rider_speed = speed;
    }
    if let Some(tick_ms) = o.tick_ms {
        params.tick_ms = tick_ms;
    }
    if let Some(cooking_ms) = o.cooking_ms {
        params.cooking_time_ms = cooking_ms;
    }
    if let Some(mode) = o.dispatch {
        params.dispatch.mode = mode;
    }
    if let Some(strategy) = o.strategy {
        params.path_strategy = strategy;
    }
    if let Some(ticks) = o.auto_orders {
        params.auto_order_interval_ticks = ticks;
    }
}

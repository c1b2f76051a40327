use bevy_ecs::prelude::Resource;

/// Default tick period in milliseconds.
pub const DEFAULT_TICK_MS: u64 = 50;

/// Fixed-step simulation clock. Time only moves when a tick completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Resource)]
pub struct SimulationClock {
    tick: u64,
    tick_ms: u64,
}

impl Default for SimulationClock {
    fn default() -> Self {
        Self::new(DEFAULT_TICK_MS)
    }
}

impl SimulationClock {
    pub fn new(tick_ms: u64) -> Self {
        Self {
            tick: 0,
            tick_ms: tick_ms.max(1),
        }
    }

    /// Completed ticks.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn tick_ms(&self) -> u64 {
        self.tick_ms
    }

    /// Simulation time in ms.
    pub fn now_ms(&self) -> u64 {
        self.tick * self.tick_ms
    }

    pub fn advance(&mut self) {
        self.tick += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_advances_in_fixed_steps() {
        let mut clock = SimulationClock::new(50);
        assert_eq!(clock.now_ms(), 0);
        clock.advance();
        clock.advance();
        assert_eq!(clock.tick(), 2);
        assert_eq!(clock.now_ms(), 100);
    }

    #[test]
    fn zero_period_is_clamped() {
        assert_eq!(SimulationClock::new(0).tick_ms(), 1);
    }
}

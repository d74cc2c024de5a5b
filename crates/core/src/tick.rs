//! Fixed-timestep accumulator (C4). Kept near-verbatim from teacher `simulation/tick.rs`;
//! its `SimulationState`/`SimulationLoop`/rollback machinery is dropped along with
//! `rapier3d` — this spec has no server-side rollback concept.

pub struct FixedTimestep {
    tick_rate: u32,
    dt: f32,
    accumulator: f32,
}

impl FixedTimestep {
    pub fn new(tick_rate: u32) -> Self {
        Self {
            tick_rate,
            dt: 1.0 / tick_rate as f32,
            accumulator: 0.0,
        }
    }

    pub fn tick_rate(&self) -> u32 {
        self.tick_rate
    }

    pub fn dt(&self) -> f32 {
        self.dt
    }

    pub fn accumulate(&mut self, delta: f32) {
        self.accumulator += delta.min(0.25);
    }

    pub fn should_tick(&self) -> bool {
        self.accumulator >= self.dt
    }

    pub fn consume_tick(&mut self) -> bool {
        if self.accumulator >= self.dt {
            self.accumulator -= self.dt;
            true
        } else {
            false
        }
    }

    pub fn alpha(&self) -> f32 {
        self.accumulator / self.dt
    }

    pub fn reset(&mut self) {
        self.accumulator = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_timestep_accumulation() {
        let mut ts = FixedTimestep::new(60);

        ts.accumulate(1.0 / 30.0);
        assert!(ts.should_tick());
        assert!(ts.consume_tick());
        assert!(ts.consume_tick());
        assert!(!ts.consume_tick());
    }

    #[test]
    fn partial_accumulation_does_not_tick() {
        let mut ts = FixedTimestep::new(60);
        ts.accumulate(1.0 / 120.0);
        assert!(!ts.should_tick());
        assert!(!ts.consume_tick());
    }

    #[test]
    fn large_deltas_are_clamped_to_avoid_spiral_of_death() {
        let mut ts = FixedTimestep::new(60);
        ts.accumulate(10.0);
        let mut ticks = 0;
        while ts.consume_tick() {
            ticks += 1;
        }
        assert!(ticks <= 16, "clamped delta should bound the number of catch-up ticks");
    }
}

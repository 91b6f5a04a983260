use serde::{Deserialize, Serialize};

/// Virtual race clock. All delays are measured against this, never the wall clock.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimClock {
    /// Whole milliseconds since the race started.
    now_ms: u64,
    /// Sub-millisecond remainder carried between ticks.
    carry: f64,
    ticks: u64,
}

impl SimClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance by `dt` seconds and return the elapsed whole milliseconds.
    pub fn advance(&mut self, dt: f32) -> u64 {
        if !dt.is_finite() || dt <= 0.0 {
            return 0;
        }
        let total = self.carry + f64::from(dt) * 1000.0;
        let whole = total.floor();
        self.carry = total - whole;
        let step = whole as u64;
        self.now_ms += step;
        self.ticks += 1;
        step
    }

    pub fn now_ms(&self) -> u64 {
        self.now_ms
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn carries_fractional_milliseconds() {
        let mut clock = SimClock::new();
        for _ in 0..60 {
            clock.advance(1.0 / 60.0);
        }
        // 60 ticks of 16.666.. ms must land on one second (floating error aside).
        assert!((999..=1000).contains(&clock.now_ms()));
        assert_eq!(clock.ticks(), 60);
    }

    #[test]
    fn ignores_non_finite_and_negative_steps() {
        let mut clock = SimClock::new();
        assert_eq!(clock.advance(f32::NAN), 0);
        assert_eq!(clock.advance(-1.0), 0);
        assert_eq!(clock.now_ms(), 0);
    }
}

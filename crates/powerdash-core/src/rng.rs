use rand::Rng;

/// Source of uniform rolls in `[0, 1)`.
///
/// Decision code takes `&mut dyn Roll` so tests can substitute a scripted
/// sequence for a real generator.
pub trait Roll {
    fn roll(&mut self) -> f64;

    /// Uniform index in `0..len`. `len` must be non-zero.
    fn pick(&mut self, len: usize) -> usize {
        let idx = (self.roll() * len as f64) as usize;
        idx.min(len.saturating_sub(1))
    }

    /// Uniform value in `[lo, hi)`.
    fn between(&mut self, lo: f64, hi: f64) -> f64 {
        lo + (hi - lo) * self.roll()
    }
}

impl<R: Rng> Roll for R {
    fn roll(&mut self) -> f64 {
        self.random::<f64>()
    }
}

/// Replays a fixed list of rolls, cycling when exhausted.
#[cfg(any(test, feature = "test-helpers"))]
#[derive(Debug, Clone)]
pub struct ScriptedRolls {
    values: Vec<f64>,
    cursor: usize,
}

#[cfg(any(test, feature = "test-helpers"))]
impl ScriptedRolls {
    pub fn new(values: impl Into<Vec<f64>>) -> Self {
        let values = values.into();
        Self { values, cursor: 0 }
    }

    /// How many rolls have been consumed so far.
    pub fn consumed(&self) -> usize {
        self.cursor
    }
}

#[cfg(any(test, feature = "test-helpers"))]
impl Roll for ScriptedRolls {
    fn roll(&mut self) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        let v = self.values[self.cursor % self.values.len()];
        self.cursor += 1;
        v
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    #[test]
    fn scripted_rolls_cycle() {
        let mut r = ScriptedRolls::new(vec![0.1, 0.9]);
        assert_eq!(r.roll(), 0.1);
        assert_eq!(r.roll(), 0.9);
        assert_eq!(r.roll(), 0.1);
        assert_eq!(r.consumed(), 3);
    }

    #[test]
    fn pick_stays_in_range() {
        let mut r = ScriptedRolls::new(vec![0.0, 0.5, 0.999_999]);
        for _ in 0..3 {
            assert!(r.pick(4) < 4);
        }
    }

    #[test]
    fn std_rng_rolls_are_unit_interval() {
        let mut rng = StdRng::seed_from_u64(7);
        let dyn_rng: &mut dyn Roll = &mut rng;
        for _ in 0..1000 {
            let v = dyn_rng.roll();
            assert!((0.0..1.0).contains(&v));
        }
    }
}

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

/// Index of a platform in the track's platform list.
pub type PlatformId = usize;

/// The single axis a platform travels along.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Axis {
    /// Travels upward from its origin by `amplitude`.
    Vertical,
    /// Travels rightward from its origin by `amplitude`.
    Horizontal,
}

/// Static description of a moving platform, produced by the track builder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformSpec {
    /// Centre position at rest.
    pub origin_x: f64,
    pub origin_y: f64,
    pub width: f64,
    pub height: f64,
    pub axis: Axis,
    pub amplitude: f64,
    /// Full there-and-back cycle length.
    pub period_ms: u64,
    pub phase_offset_ms: u64,
    pub start_delay_ms: u64,
}

/// Eased ping-pong position in `[0, 1]` for a cycle progress in `[0, 1)`.
///
/// Goes 0 -> 1 over the first half and back over the second, with a
/// sine-in-out ease on each leg.
pub fn ping_pong(progress: f64) -> f64 {
    let p = progress.rem_euclid(1.0);
    let leg = if p < 0.5 { 2.0 * p } else { 2.0 - 2.0 * p };
    (1.0 - (PI * leg).cos()) / 2.0
}

/// A platform oscillating along one axis. Positions are a pure function of
/// simulation time, so the off-axis coordinate can never drift.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovingPlatform {
    pub spec: PlatformSpec,
    pub x: f64,
    pub y: f64,
    pub prev_x: f64,
    pub prev_y: f64,
}

impl MovingPlatform {
    pub fn new(spec: PlatformSpec) -> Self {
        let (x, y) = (spec.origin_x, spec.origin_y);
        Self {
            spec,
            x,
            y,
            prev_x: x,
            prev_y: y,
        }
    }

    /// Displacement along the travel axis at `now_ms`.
    pub fn offset_at(&self, now_ms: u64) -> f64 {
        let s = &self.spec;
        if now_ms < s.start_delay_ms || s.period_ms == 0 {
            return 0.0;
        }
        let t = now_ms - s.start_delay_ms + s.phase_offset_ms;
        let progress = (t % s.period_ms) as f64 / s.period_ms as f64;
        s.amplitude * ping_pong(progress)
    }

    /// Move to the position for `now_ms`, keeping the previous one for
    /// carry computations, and pin the non-moving axis to the origin.
    pub fn sync(&mut self, now_ms: u64) {
        self.prev_x = self.x;
        self.prev_y = self.y;
        let offset = self.offset_at(now_ms);
        match self.spec.axis {
            Axis::Vertical => {
                self.x = self.spec.origin_x;
                self.y = self.spec.origin_y - offset;
            },
            Axis::Horizontal => {
                self.x = self.spec.origin_x + offset;
                self.y = self.spec.origin_y;
            },
        }
    }

    /// Movement since the previous sync.
    pub fn displacement(&self) -> (f64, f64) {
        (self.x - self.prev_x, self.y - self.prev_y)
    }

    pub fn left(&self) -> f64 {
        self.x - self.spec.width / 2.0
    }

    pub fn right(&self) -> f64 {
        self.x + self.spec.width / 2.0
    }

    pub fn top(&self) -> f64 {
        self.y - self.spec.height / 2.0
    }

    pub fn overlaps_x(&self, left: f64, right: f64) -> bool {
        right > self.left() && left < self.right()
    }
}

/// The platform a character last stood on and when.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformContact {
    pub platform: PlatformId,
    pub at_ms: u64,
}

impl PlatformContact {
    /// Whether the contact still counts as grounded at `now_ms`.
    pub fn is_fresh(&self, now_ms: u64, grace_ms: u64) -> bool {
        now_ms.saturating_sub(self.at_ms) <= grace_ms
    }
}

//! Fixed chunk templates the procedural generator stitches together.
//!
//! Offsets are relative to the chunk's left edge. Heights (`rise`) are
//! measured upward from the ground top.

use serde::{Deserialize, Serialize};

use crate::platform::Axis;
use crate::powerups::PickupLocation;
use crate::track::SegmentKind;

/// Difficulty tier a pattern is drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    /// Tier for a given progress ratio along the track.
    pub fn for_progress(progress: f64, easy_below: f64, medium_below: f64) -> Self {
        if progress < easy_below {
            Difficulty::Easy
        } else if progress < medium_below {
            Difficulty::Medium
        } else {
            Difficulty::Hard
        }
    }
}

/// One ground or gap span inside a pattern's custom layout.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutPiece {
    pub kind: SegmentKind,
    pub start: f64,
    pub end: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlatformTemplate {
    /// Centre X offset.
    pub x: f64,
    /// Height of the platform top above the ground top at rest.
    pub rise: f64,
    pub axis: Axis,
    pub amplitude: f64,
    pub period_ms: u64,
    pub phase_offset_ms: u64,
    pub start_delay_ms: u64,
    pub width: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PickupTemplate {
    pub x: f64,
    /// Height of the pickup centre above the ground top (ignored when riding a platform).
    pub rise: f64,
    pub location: PickupLocation,
    /// Index into the same pattern's `platforms` when the pickup rides one.
    pub platform: Option<usize>,
}

/// A named, fixed chunk template.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pattern {
    pub name: &'static str,
    pub tier: Difficulty,
    pub width: f64,
    /// Custom ground/gap layout. `None` means one ground span over the whole width.
    pub layout: Option<&'static [LayoutPiece]>,
    /// Wall centre X offsets.
    pub walls: &'static [f64],
    pub platforms: &'static [PlatformTemplate],
    pub pickups: &'static [PickupTemplate],
}

impl Pattern {
    pub fn has_gap(&self) -> bool {
        self.layout
            .is_some_and(|l| l.iter().any(|p| p.kind == SegmentKind::Gap))
    }

    /// Whether the pattern ships something that helps cross its gaps.
    pub fn has_crossing_aid(&self) -> bool {
        let in_bounds = |x: f64| (0.0..=self.width).contains(&x);
        self.walls.iter().any(|&x| in_bounds(x)) || self.platforms.iter().any(|p| in_bounds(p.x))
    }
}

const fn ground(start: f64, end: f64) -> LayoutPiece {
    LayoutPiece {
        kind: SegmentKind::Ground,
        start,
        end,
    }
}

const fn gap(start: f64, end: f64) -> LayoutPiece {
    LayoutPiece {
        kind: SegmentKind::Gap,
        start,
        end,
    }
}

const fn lift(x: f64, rise: f64, amplitude: f64, period_ms: u64, width: f64) -> PlatformTemplate {
    PlatformTemplate {
        x,
        rise,
        axis: Axis::Vertical,
        amplitude,
        period_ms,
        phase_offset_ms: 0,
        start_delay_ms: 0,
        width,
    }
}

const fn shuttle(x: f64, rise: f64, amplitude: f64, period_ms: u64, width: f64) -> PlatformTemplate {
    PlatformTemplate {
        x,
        rise,
        axis: Axis::Horizontal,
        amplitude,
        period_ms,
        phase_offset_ms: 0,
        start_delay_ms: 0,
        width,
    }
}

const fn on_ground(x: f64) -> PickupTemplate {
    PickupTemplate {
        x,
        rise: 16.0,
        location: PickupLocation::Ground,
        platform: None,
    }
}

// ---------------------------------------------------------------- easy

const OPEN_STRETCH: Pattern = Pattern {
    name: "open_stretch",
    tier: Difficulty::Easy,
    width: 300.0,
    layout: None,
    walls: &[],
    platforms: &[],
    pickups: &[on_ground(150.0)],
};

const LONE_WALL: Pattern = Pattern {
    name: "lone_wall",
    tier: Difficulty::Easy,
    width: 350.0,
    layout: None,
    walls: &[175.0],
    platforms: &[],
    pickups: &[PickupTemplate {
        x: 175.0,
        rise: 112.0,
        location: PickupLocation::Wall,
        platform: None,
    }],
};

const SMALL_GAP: Pattern = Pattern {
    name: "small_gap",
    tier: Difficulty::Easy,
    width: 400.0,
    layout: Some(&[ground(0.0, 150.0), gap(150.0, 250.0), ground(250.0, 400.0)]),
    walls: &[],
    platforms: &[lift(200.0, 30.0, 30.0, 2400, 90.0)],
    pickups: &[],
};

// ---------------------------------------------------------------- medium

const WALL_PAIR: Pattern = Pattern {
    name: "wall_pair",
    tier: Difficulty::Medium,
    width: 600.0,
    layout: None,
    walls: &[180.0, 430.0],
    platforms: &[],
    pickups: &[on_ground(305.0)],
};

const LIFT_GAP: Pattern = Pattern {
    name: "lift_gap",
    tier: Difficulty::Medium,
    width: 550.0,
    layout: Some(&[ground(0.0, 180.0), gap(180.0, 330.0), ground(330.0, 550.0)]),
    walls: &[],
    platforms: &[lift(255.0, 40.0, 40.0, 3000, 100.0)],
    pickups: &[PickupTemplate {
        x: 255.0,
        rise: 0.0,
        location: PickupLocation::Platform,
        platform: Some(0),
    }],
};

const WALL_THEN_GAP: Pattern = Pattern {
    name: "wall_then_gap",
    tier: Difficulty::Medium,
    width: 650.0,
    layout: Some(&[ground(0.0, 300.0), gap(300.0, 420.0), ground(420.0, 650.0)]),
    walls: &[150.0],
    platforms: &[shuttle(330.0, 35.0, 60.0, 2600, 90.0)],
    pickups: &[PickupTemplate {
        x: 360.0,
        rise: 90.0,
        location: PickupLocation::Gap,
        platform: None,
    }],
};

// ---------------------------------------------------------------- hard

const DOUBLE_GAP: Pattern = Pattern {
    name: "double_gap",
    tier: Difficulty::Hard,
    width: 800.0,
    layout: Some(&[
        ground(0.0, 150.0),
        gap(150.0, 280.0),
        ground(280.0, 480.0),
        gap(480.0, 620.0),
        ground(620.0, 800.0),
    ]),
    walls: &[380.0],
    platforms: &[
        lift(215.0, 35.0, 35.0, 2200, 90.0),
        PlatformTemplate {
            x: 520.0,
            rise: 40.0,
            axis: Axis::Horizontal,
            amplitude: 50.0,
            period_ms: 2000,
            phase_offset_ms: 500,
            start_delay_ms: 0,
            width: 90.0,
        },
    ],
    pickups: &[],
};

const GAUNTLET: Pattern = Pattern {
    name: "gauntlet",
    tier: Difficulty::Hard,
    width: 900.0,
    layout: Some(&[ground(0.0, 520.0), gap(520.0, 670.0), ground(670.0, 900.0)]),
    walls: &[150.0, 380.0, 800.0],
    platforms: &[PlatformTemplate {
        x: 595.0,
        rise: 45.0,
        axis: Axis::Vertical,
        amplitude: 45.0,
        period_ms: 2000,
        phase_offset_ms: 0,
        start_delay_ms: 300,
        width: 100.0,
    }],
    pickups: &[
        on_ground(265.0),
        PickupTemplate {
            x: 595.0,
            rise: 0.0,
            location: PickupLocation::Platform,
            platform: Some(0),
        },
    ],
};

const SHUTTLE_RUN: Pattern = Pattern {
    name: "shuttle_run",
    tier: Difficulty::Hard,
    width: 700.0,
    layout: Some(&[ground(0.0, 200.0), gap(200.0, 340.0), ground(340.0, 700.0)]),
    walls: &[520.0],
    platforms: &[shuttle(240.0, 30.0, 60.0, 1800, 90.0)],
    pickups: &[PickupTemplate {
        x: 520.0,
        rise: 112.0,
        location: PickupLocation::Wall,
        platform: None,
    }],
};

const EASY: &[Pattern] = &[OPEN_STRETCH, LONE_WALL, SMALL_GAP];
const MEDIUM: &[Pattern] = &[WALL_PAIR, LIFT_GAP, WALL_THEN_GAP];
const HARD: &[Pattern] = &[DOUBLE_GAP, GAUNTLET, SHUTTLE_RUN];

/// Patterns available in a tier.
pub fn catalog(tier: Difficulty) -> &'static [Pattern] {
    match tier {
        Difficulty::Easy => EASY,
        Difficulty::Medium => MEDIUM,
        Difficulty::Hard => HARD,
    }
}

/// Every pattern across all tiers.
pub fn all_patterns() -> impl Iterator<Item = &'static Pattern> {
    EASY.iter().chain(MEDIUM).chain(HARD)
}

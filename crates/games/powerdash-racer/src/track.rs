use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::config::{RaceConfig, TrackLayout};
use crate::patterns::{self, Difficulty, Pattern};
use crate::platform::{PlatformId, PlatformSpec};
use crate::powerups::PickupLocation;

/// Index of a segment in [`Track::segments`].
pub type SegmentId = usize;

/// Platform slab thickness.
pub const PLATFORM_HEIGHT: f64 = 16.0;
/// How far above a platform's top a riding pickup floats.
const PLATFORM_PICKUP_LIFT: f64 = 16.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SegmentKind {
    Ground,
    Gap,
}

/// A half-open horizontal span `[start, end)` of ground or gap.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackSegment {
    pub kind: SegmentKind,
    pub start: f64,
    pub end: f64,
}

impl TrackSegment {
    pub fn width(&self) -> f64 {
        self.end - self.start
    }

    pub fn is_ground(&self) -> bool {
        self.kind == SegmentKind::Ground
    }

    pub fn overlaps(&self, left: f64, right: f64) -> bool {
        right > self.start && left < self.end
    }
}

/// A static obstacle standing on the ground. Position is its centre.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Wall {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Wall {
    pub fn left(&self) -> f64 {
        self.x - self.width / 2.0
    }

    pub fn right(&self) -> f64 {
        self.x + self.width / 2.0
    }

    pub fn top(&self) -> f64 {
        self.y - self.height / 2.0
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height / 2.0
    }
}

/// Where a mystery box starts out.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PickupSpawn {
    pub x: f64,
    pub y: f64,
    pub location: PickupLocation,
    /// Platform the pickup rides, with its offset from the platform centre.
    pub attached: Option<(PlatformId, f64, f64)>,
}

/// Record of a pattern the generator dropped onto the track.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PlacedPattern {
    pub name: &'static str,
    pub tier: Difficulty,
    pub start: f64,
    pub width: f64,
}

/// A finished, immutable race course.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Track {
    pub seed: u64,
    pub width: f64,
    pub ground_top_y: f64,
    /// Contiguous, ordered, covering `[0, width)`, no two neighbours share a kind.
    pub segments: Vec<TrackSegment>,
    /// Sorted by X.
    pub walls: Vec<Wall>,
    pub platforms: Vec<PlatformSpec>,
    pub pickups: Vec<PickupSpawn>,
    pub finish_line_x: f64,
    pub finish_line_width: f64,
    pub placed: Vec<PlacedPattern>,
}

impl Track {
    /// Segment containing `x`, if any.
    pub fn segment_at(&self, x: f64) -> Option<SegmentId> {
        let idx = self.segments.partition_point(|s| s.end <= x);
        (idx < self.segments.len() && self.segments[idx].start <= x).then_some(idx)
    }

    /// First ground segment overlapping the horizontal span.
    pub fn ground_under(&self, left: f64, right: f64) -> Option<SegmentId> {
        let first = self.segments.partition_point(|s| s.end <= left);
        self.segments[first..]
            .iter()
            .take_while(|s| s.start < right)
            .position(|s| s.is_ground())
            .map(|offset| first + offset)
    }

    /// Distance from `right` to the edge of the ground under the span, when
    /// that ground is followed by a gap.
    pub fn gap_ahead(&self, left: f64, right: f64) -> Option<f64> {
        let id = self.ground_under(left, right)?;
        let next = self.segments.get(id + 1)?;
        (next.kind == SegmentKind::Gap).then(|| self.segments[id].end - right)
    }

    pub fn segment(&self, id: SegmentId) -> Option<&TrackSegment> {
        self.segments.get(id)
    }

    /// Whether the horizontal span overlaps the finish line.
    pub fn crosses_finish(&self, left: f64, right: f64) -> bool {
        let half = self.finish_line_width / 2.0;
        right >= self.finish_line_x - half && left <= self.finish_line_x + half
    }
}

/// Build a track for `seed` using the layout named in the config.
pub fn generate_track(config: &RaceConfig, seed: u64) -> Track {
    let track = match config.track.layout {
        TrackLayout::Procedural => build_procedural(config, seed),
        TrackLayout::Fixed => build_fixed(config, seed),
    };
    tracing::debug!(
        seed,
        segments = track.segments.len(),
        walls = track.walls.len(),
        platforms = track.platforms.len(),
        patterns = track.placed.len(),
        "Generated track"
    );
    track
}

fn build_procedural(config: &RaceConfig, seed: u64) -> Track {
    let t = &config.track;
    let mut rng = StdRng::seed_from_u64(seed);
    let mut b = TrackBuilder::new(config);

    b.push_segment(SegmentKind::Ground, 0.0, t.start_zone_width);
    let mut cursor = t.start_zone_width;
    let limit = t.width - t.finish_zone_width;

    while cursor < limit {
        let tier = Difficulty::for_progress(cursor / t.width, t.easy_below, t.medium_below);
        let choices = patterns::catalog(tier);
        let pattern = &choices[rng.random_range(0..choices.len())];
        if cursor + pattern.width > limit {
            break;
        }
        b.place(pattern, cursor);
        cursor += pattern.width;

        let buffer = rng.random_range(t.buffer_min..=t.buffer_max);
        let end = (cursor + buffer).min(t.width);
        b.push_segment(SegmentKind::Ground, cursor, end);
        cursor = end;
    }

    b.push_segment(SegmentKind::Ground, cursor, t.width);
    b.finish(seed)
}

/// Hand-authored course: gaps, walls, and pickups at fixed positions.
const FIXED_GAPS: &[(f64, f64)] = &[
    (700.0, 810.0),
    (1250.0, 1360.0),
    (2000.0, 2150.0),
    (2800.0, 2920.0),
    (3600.0, 3750.0),
    (4400.0, 4500.0),
];
const FIXED_WALLS: &[f64] = &[600.0, 1000.0, 1400.0, 2350.0, 3350.0, 4300.0, 5000.0];
const FIXED_PICKUPS: &[f64] = &[900.0, 1700.0, 2600.0, 4000.0];

fn build_fixed(config: &RaceConfig, seed: u64) -> Track {
    let width = config.track.width;
    let mut b = TrackBuilder::new(config);
    let mut cursor = 0.0;
    for &(start, end) in FIXED_GAPS {
        // Keep the finish zone solid on short tracks.
        if end > width - config.track.finish_zone_width {
            break;
        }
        b.push_segment(SegmentKind::Ground, cursor, start);
        b.push_segment(SegmentKind::Gap, start, end);
        cursor = end;
    }
    b.push_segment(SegmentKind::Ground, cursor, width);

    for &x in FIXED_WALLS.iter().filter(|&&x| x < width) {
        b.wall(x);
    }
    let ground_top = config.physics.ground_top_y;
    for &x in FIXED_PICKUPS.iter().filter(|&&x| x < width) {
        b.pickups.push(PickupSpawn {
            x,
            y: ground_top - 16.0,
            location: PickupLocation::Ground,
            attached: None,
        });
    }
    b.finish(seed)
}

struct TrackBuilder<'a> {
    config: &'a RaceConfig,
    segments: Vec<TrackSegment>,
    walls: Vec<Wall>,
    platforms: Vec<PlatformSpec>,
    pickups: Vec<PickupSpawn>,
    placed: Vec<PlacedPattern>,
}

impl<'a> TrackBuilder<'a> {
    fn new(config: &'a RaceConfig) -> Self {
        Self {
            config,
            segments: Vec::new(),
            walls: Vec::new(),
            platforms: Vec::new(),
            pickups: Vec::new(),
            placed: Vec::new(),
        }
    }

    /// Append a span, merging it into the previous one when kinds match.
    fn push_segment(&mut self, kind: SegmentKind, start: f64, end: f64) {
        if end <= start {
            return;
        }
        if let Some(last) = self.segments.last_mut()
            && last.kind == kind
            && last.end == start
        {
            last.end = end;
            return;
        }
        self.segments.push(TrackSegment { kind, start, end });
    }

    fn wall(&mut self, x: f64) {
        let p = &self.config.physics;
        self.walls.push(Wall {
            x,
            y: p.ground_top_y - p.wall_height / 2.0,
            width: p.wall_width,
            height: p.wall_height,
        });
    }

    fn place(&mut self, pattern: &Pattern, at: f64) {
        match pattern.layout {
            Some(layout) => {
                for piece in layout {
                    self.push_segment(piece.kind, at + piece.start, at + piece.end);
                }
            },
            None => self.push_segment(SegmentKind::Ground, at, at + pattern.width),
        }

        for &x in pattern.walls {
            self.wall(at + x);
        }

        let ground_top = self.config.physics.ground_top_y;
        let first_platform = self.platforms.len();
        for tpl in pattern.platforms {
            self.platforms.push(PlatformSpec {
                origin_x: at + tpl.x,
                origin_y: ground_top - tpl.rise + PLATFORM_HEIGHT / 2.0,
                width: tpl.width,
                height: PLATFORM_HEIGHT,
                axis: tpl.axis,
                amplitude: tpl.amplitude,
                period_ms: tpl.period_ms,
                phase_offset_ms: tpl.phase_offset_ms,
                start_delay_ms: tpl.start_delay_ms,
            });
        }

        for tpl in pattern.pickups {
            let spawn = match tpl.platform {
                Some(local) => {
                    let id = first_platform + local;
                    let plat = &self.platforms[id];
                    let dx = at + tpl.x - plat.origin_x;
                    let dy = -(PLATFORM_HEIGHT / 2.0 + PLATFORM_PICKUP_LIFT);
                    PickupSpawn {
                        x: plat.origin_x + dx,
                        y: plat.origin_y + dy,
                        location: PickupLocation::Platform,
                        attached: Some((id, dx, dy)),
                    }
                },
                None => PickupSpawn {
                    x: at + tpl.x,
                    y: ground_top - tpl.rise,
                    location: tpl.location,
                    attached: None,
                },
            };
            self.pickups.push(spawn);
        }

        self.placed.push(PlacedPattern {
            name: pattern.name,
            tier: pattern.tier,
            start: at,
            width: pattern.width,
        });
    }

    fn finish(self, seed: u64) -> Track {
        let t = &self.config.track;
        Track {
            seed,
            width: t.width,
            ground_top_y: self.config.physics.ground_top_y,
            segments: self.segments,
            walls: self.walls,
            platforms: self.platforms,
            pickups: self.pickups,
            finish_line_x: t.finish_line_x(),
            finish_line_width: t.finish_line_width,
            placed: self.placed,
        }
    }
}

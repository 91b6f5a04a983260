//! Hand-built courses for unit tests.

use crate::config::RaceConfig;
use crate::platform::PlatformSpec;
use crate::track::{SegmentKind, Track, TrackSegment, Wall};

fn blank(width: f64, segments: Vec<TrackSegment>) -> Track {
    let cfg = RaceConfig::default();
    Track {
        seed: 0,
        width,
        ground_top_y: cfg.physics.ground_top_y,
        segments,
        walls: Vec::new(),
        platforms: Vec::new(),
        pickups: Vec::new(),
        finish_line_x: width * cfg.track.finish_line_ratio,
        finish_line_width: cfg.track.finish_line_width,
        placed: Vec::new(),
    }
}

pub fn flat_track(width: f64) -> Track {
    blank(
        width,
        vec![TrackSegment {
            kind: SegmentKind::Ground,
            start: 0.0,
            end: width,
        }],
    )
}

pub fn gap_track(gap_start: f64, gap_end: f64, width: f64) -> Track {
    blank(
        width,
        vec![
            TrackSegment {
                kind: SegmentKind::Ground,
                start: 0.0,
                end: gap_start,
            },
            TrackSegment {
                kind: SegmentKind::Gap,
                start: gap_start,
                end: gap_end,
            },
            TrackSegment {
                kind: SegmentKind::Ground,
                start: gap_end,
                end: width,
            },
        ],
    )
}

pub fn walled_track(width: f64, walls: &[f64]) -> Track {
    let mut track = flat_track(width);
    track.walls = walls.iter().map(|&x| wall(x)).collect();
    track
}

pub fn wall(x: f64) -> Wall {
    let p = RaceConfig::default().physics;
    Wall {
        x,
        y: p.ground_top_y - p.wall_height / 2.0,
        width: p.wall_width,
        height: p.wall_height,
    }
}

pub fn with_platforms(mut track: Track, platforms: Vec<PlatformSpec>) -> Track {
    track.platforms = platforms;
    track
}

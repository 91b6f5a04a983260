use serde::{Deserialize, Serialize};

use crate::config::PhysicsConfig;
use crate::platform::{MovingPlatform, PlatformId};
use crate::track::Track;

/// How far above a surface the previous foot position may be and still
/// count as arriving from above.
const LAND_EPSILON: f64 = 0.5;

/// Axis-aligned dynamic body. Position is the centre; +y points down.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Body {
    pub x: f64,
    pub y: f64,
    pub vx: f64,
    pub vy: f64,
    pub width: f64,
    pub height: f64,
    /// Disabled bodies neither move nor collide.
    pub enabled: bool,
    pub gravity: bool,
}

impl Body {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            vx: 0.0,
            vy: 0.0,
            width,
            height,
            enabled: true,
            gravity: true,
        }
    }

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

    /// Shift by a carrying platform's displacement.
    pub fn carry(&mut self, platform: &MovingPlatform) {
        let (dx, dy) = platform.displacement();
        self.x += dx;
        self.y += dy;
    }
}

/// What a body touched during integration.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Contacts {
    pub on_floor: bool,
    /// First wall whose side blocked the body.
    pub wall: Option<usize>,
    /// Platform the body ended up standing on.
    pub platform: Option<PlatformId>,
}

/// Static and kinematic geometry a body collides with.
pub struct World<'a> {
    pub track: &'a Track,
    pub platforms: &'a [MovingPlatform],
    pub physics: &'a PhysicsConfig,
    pub snap_tolerance: f64,
}

/// Integrate one tick of `dt` seconds in `substeps` equal slices.
pub fn integrate(body: &mut Body, world: &World<'_>, dt: f64) -> Contacts {
    let mut total = Contacts::default();
    if !body.enabled || !dt.is_finite() || dt <= 0.0 {
        return total;
    }
    let substeps = world.physics.substeps.max(1);
    let sub_dt = dt / f64::from(substeps);
    for _ in 0..substeps {
        let c = step(body, world, sub_dt);
        total.on_floor = c.on_floor;
        if total.wall.is_none() {
            total.wall = c.wall;
        }
        if c.platform.is_some() {
            total.platform = c.platform;
        }
    }
    total
}

/// Advance one substep and resolve collisions.
pub fn step(body: &mut Body, world: &World<'_>, dt: f64) -> Contacts {
    let mut c = Contacts::default();
    if !body.enabled {
        return c;
    }

    let prev_bottom = body.bottom();
    if body.gravity {
        body.vy += world.physics.gravity * dt;
    }
    body.x += body.vx * dt;
    body.y += body.vy * dt;

    resolve_walls(body, world, prev_bottom, &mut c);
    resolve_ground(body, world, prev_bottom, &mut c);
    resolve_platforms(body, world, prev_bottom, &mut c);
    clamp_to_world(body, world.track.width);
    c
}

fn resolve_walls(body: &mut Body, world: &World<'_>, prev_bottom: f64, c: &mut Contacts) {
    for (i, wall) in world.track.walls.iter().enumerate() {
        let overlapping = body.right() > wall.left()
            && body.left() < wall.right()
            && body.bottom() > wall.top()
            && body.top() < wall.bottom();
        if !overlapping {
            continue;
        }
        if body.vy >= 0.0 && prev_bottom <= wall.top() + LAND_EPSILON {
            body.y = wall.top() - body.height / 2.0;
            body.vy = 0.0;
            c.on_floor = true;
        } else {
            body.x = wall.left() - body.width / 2.0;
            c.wall.get_or_insert(i);
        }
    }
}

fn resolve_ground(body: &mut Body, world: &World<'_>, prev_bottom: f64, c: &mut Contacts) {
    let top = world.track.ground_top_y;
    let slab_bottom = top + world.physics.ground_segment_height;
    if body.bottom() < top || body.top() >= slab_bottom {
        return;
    }
    let Some(id) = world.track.ground_under(body.left(), body.right()) else {
        return;
    };
    if body.vy >= 0.0 && prev_bottom <= top + LAND_EPSILON {
        body.y = top - body.height / 2.0;
        body.vy = 0.0;
        c.on_floor = true;
    } else if let Some(seg) = world.track.segment(id) {
        // Came in through the side of the slab from a gap.
        body.x = seg.start - body.width / 2.0;
        body.vx = 0.0;
    }
}

fn resolve_platforms(body: &mut Body, world: &World<'_>, prev_bottom: f64, c: &mut Contacts) {
    if body.vy < 0.0 {
        return;
    }
    for (id, p) in world.platforms.iter().enumerate() {
        if !p.overlaps_x(body.left(), body.right()) {
            continue;
        }
        let top = p.top();
        if body.bottom() >= top && prev_bottom <= top + world.snap_tolerance {
            body.y = top - body.height / 2.0;
            body.vy = 0.0;
            c.on_floor = true;
            c.platform = Some(id);
            return;
        }
    }
}

fn clamp_to_world(body: &mut Body, width: f64) {
    let half_w = body.width / 2.0;
    if body.left() < 0.0 {
        body.x = half_w;
    } else if body.right() > width {
        body.x = width - half_w;
        body.vx = 0.0;
    }
    if body.top() < 0.0 {
        body.y = body.height / 2.0;
        body.vy = 0.0;
    }
}

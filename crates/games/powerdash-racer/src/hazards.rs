use serde::{Deserialize, Serialize};

use powerdash_core::game_trait::EntityId;

use crate::config::HazardConfig;
use crate::track::Wall;

/// Longest distance a shuriken covers between collision checks.
const SHURIKEN_MAX_STEP: f64 = 10.0;

/// A character as seen by hazards.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HazardTarget {
    pub id: EntityId,
    pub x: f64,
    pub y: f64,
    /// False while falling, blasted, or finished.
    pub exposed: bool,
}

fn distance(ax: f64, ay: f64, bx: f64, by: f64) -> f64 {
    ((ax - bx).powi(2) + (ay - by).powi(2)).sqrt()
}

/// A proximity mine waiting for its fuse to run out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trap {
    pub id: u64,
    pub x: f64,
    pub y: f64,
    pub deployed_by: EntityId,
    pub deployed_at_ms: u64,
}

/// A trap going off and who was inside the blast.
#[derive(Debug, Clone, PartialEq)]
pub struct Detonation {
    pub trap_id: u64,
    pub x: f64,
    pub y: f64,
    pub deployed_by: EntityId,
    pub caught: Vec<EntityId>,
}

/// Every live trap plus the shared scan cadence.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrapField {
    traps: Vec<Trap>,
    next_id: u64,
    since_scan_ms: u64,
}

impl TrapField {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn deploy(&mut self, x: f64, y: f64, by: EntityId, now_ms: u64) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.traps.push(Trap {
            id,
            x,
            y,
            deployed_by: by,
            deployed_at_ms: now_ms,
        });
        id
    }

    pub fn iter(&self) -> impl Iterator<Item = &Trap> {
        self.traps.iter()
    }

    pub fn len(&self) -> usize {
        self.traps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.traps.is_empty()
    }

    /// Accumulate `elapsed_ms` and, once a scan interval has passed, set off
    /// every trap whose fuse has run out. Detonated traps are removed
    /// whether or not anyone was caught.
    pub fn scan(
        &mut self,
        now_ms: u64,
        elapsed_ms: u64,
        targets: &[HazardTarget],
        cfg: &HazardConfig,
    ) -> Vec<Detonation> {
        self.since_scan_ms += elapsed_ms;
        if self.since_scan_ms < cfg.trap_scan_interval_ms {
            return Vec::new();
        }
        self.since_scan_ms %= cfg.trap_scan_interval_ms.max(1);

        let mut fired = Vec::new();
        self.traps.retain(|trap| {
            if now_ms.saturating_sub(trap.deployed_at_ms) < cfg.trap_fuse_ms {
                return true;
            }
            let caught = targets
                .iter()
                .filter(|t| t.exposed)
                .filter(|t| distance(t.x, t.y, trap.x, trap.y) <= cfg.trap_blast_radius)
                .map(|t| t.id)
                .collect();
            fired.push(Detonation {
                trap_id: trap.id,
                x: trap.x,
                y: trap.y,
                deployed_by: trap.deployed_by,
                caught,
            });
            false
        });
        fired
    }
}

/// Why a shuriken left play.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShurikenEnd {
    HitCharacter,
    SecondImpact,
    ReturnedHome,
}

/// Result of moving a shuriken for one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ShurikenStep {
    Flying,
    /// Bounced off a wall (`Some(index)`) or a world edge (`None`).
    Reflected(Option<usize>),
    Hit(EntityId),
    Destroyed(ShurikenEnd),
}

/// A straight-line projectile that bounces once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shuriken {
    pub id: u64,
    pub x: f64,
    pub y: f64,
    /// +1 right, -1 left.
    pub direction: f64,
    pub speed: f64,
    pub origin_x: f64,
    pub deployed_by: EntityId,
    pub has_reflected: bool,
    pub has_hit_character: bool,
    /// Wall just bounced off, skipped until the shuriken clears it.
    pub ignore_wall: Option<usize>,
    launch_direction: f64,
}

impl Shuriken {
    /// Spawn ahead of the thrower, never past the right edge of the world.
    pub fn launch(
        id: u64,
        thrower: EntityId,
        x: f64,
        y: f64,
        world_width: f64,
        cfg: &HazardConfig,
    ) -> Self {
        let origin_x = (x + cfg.shuriken_spawn_offset).min(world_width);
        Self {
            id,
            x: origin_x,
            y,
            direction: 1.0,
            speed: cfg.shuriken_speed,
            origin_x,
            deployed_by: thrower,
            has_reflected: false,
            has_hit_character: false,
            ignore_wall: None,
            launch_direction: 1.0,
        }
    }

    /// Move for `dt` seconds, checking characters first, then walls, then
    /// the world edges after every short hop.
    pub fn advance(
        &mut self,
        dt: f64,
        targets: &[HazardTarget],
        walls: &[Wall],
        world_width: f64,
        cfg: &HazardConfig,
    ) -> ShurikenStep {
        let travel = self.speed * dt.max(0.0);
        let hops = (travel / SHURIKEN_MAX_STEP).ceil().max(1.0) as u32;
        let hop = travel / f64::from(hops);
        let mut result = ShurikenStep::Flying;

        for _ in 0..hops {
            self.x += self.direction * hop;

            if let Some(victim) = self.victim(targets, cfg.shuriken_hit_radius) {
                self.has_hit_character = true;
                return ShurikenStep::Hit(victim);
            }

            if let Some(i) = self.ignore_wall
                && walls
                    .get(i)
                    .is_none_or(|w| self.wall_distance(w) > cfg.shuriken_wall_radius)
            {
                self.ignore_wall = None;
            }

            let wall_hit = walls.iter().enumerate().find(|&(i, w)| {
                Some(i) != self.ignore_wall
                    && (w.x - self.x) * self.direction >= 0.0
                    && self.wall_distance(w) < cfg.shuriken_wall_radius
            });
            let edge_hit = self.x <= 0.0 || self.x >= world_width;

            if wall_hit.is_some() || edge_hit {
                if self.has_reflected {
                    return ShurikenStep::Destroyed(ShurikenEnd::SecondImpact);
                }
                let wall = wall_hit.map(|(i, _)| i);
                self.has_reflected = true;
                self.direction = -self.direction;
                self.ignore_wall = wall;
                self.x = self.x.clamp(0.0, world_width);
                result = ShurikenStep::Reflected(wall);
                continue;
            }

            if self.has_reflected && (self.x - self.origin_x) * self.launch_direction <= 0.0 {
                return ShurikenStep::Destroyed(ShurikenEnd::ReturnedHome);
            }
        }
        result
    }

    fn wall_distance(&self, wall: &Wall) -> f64 {
        distance(self.x, self.y, wall.x, wall.y)
    }

    /// The thrower is safe until the blade has bounced.
    fn victim(&self, targets: &[HazardTarget], radius: f64) -> Option<EntityId> {
        targets
            .iter()
            .filter(|t| t.exposed)
            .filter(|t| self.has_reflected || t.id != self.deployed_by)
            .find(|t| distance(self.x, self.y, t.x, t.y) < radius)
            .map(|t| t.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit;

    fn target(id: EntityId, x: f64) -> HazardTarget {
        HazardTarget {
            id,
            x,
            y: 372.0,
            exposed: true,
        }
    }

    #[test]
    fn trap_waits_for_fuse() {
        let cfg = HazardConfig::default();
        let mut field = TrapField::new();
        field.deploy(500.0, 372.0, 1, 0);
        let targets = [target(2, 520.0)];
        for step in 1..20 {
            assert!(field.scan(step * 100, 100, &targets, &cfg).is_empty());
        }
        let fired = field.scan(2000, 100, &targets, &cfg);
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].caught, vec![2]);
        assert!(field.is_empty());
    }

    #[test]
    fn trap_blast_catches_owner_but_skips_unexposed_and_distant() {
        let cfg = HazardConfig::default();
        let mut field = TrapField::new();
        field.deploy(500.0, 372.0, 1, 0);
        let mut falling = target(3, 500.0);
        falling.exposed = false;
        let targets = [target(1, 560.0), target(2, 601.0), falling];
        let fired = field.scan(2000, 2000, &targets, &cfg);
        assert_eq!(fired[0].caught, vec![1]);
    }

    #[test]
    fn trap_removed_even_without_victims() {
        let cfg = HazardConfig::default();
        let mut field = TrapField::new();
        field.deploy(500.0, 372.0, 1, 0);
        let fired = field.scan(2500, 2500, &[], &cfg);
        assert_eq!(fired.len(), 1);
        assert!(fired[0].caught.is_empty());
        assert!(field.is_empty());
    }

    #[test]
    fn scans_only_on_interval() {
        let cfg = HazardConfig::default();
        let mut field = TrapField::new();
        field.deploy(0.0, 0.0, 1, 0);
        // 16ms ticks: the scan at 2000ms is skipped until 100ms have built up.
        assert!(field.scan(2000, 16, &[], &cfg).is_empty());
        assert_eq!(field.len(), 1);
        assert!(field.scan(2100, 84, &[], &cfg).len() == 1);
    }

    #[test]
    fn trap_ids_are_unique() {
        let mut field = TrapField::new();
        let a = field.deploy(0.0, 0.0, 1, 0);
        let b = field.deploy(0.0, 0.0, 1, 0);
        assert_ne!(a, b);
    }

    #[test]
    fn shuriken_hits_racer_ahead() {
        let cfg = HazardConfig::default();
        let mut s = Shuriken::launch(0, 1, 100.0, 372.0, 8000.0, &cfg);
        assert_eq!(s.x, 140.0);
        let targets = [target(1, 100.0), target(2, 300.0)];
        let mut outcome = ShurikenStep::Flying;
        for _ in 0..60 {
            outcome = s.advance(1.0 / 60.0, &targets, &[], 8000.0, &cfg);
            if outcome != ShurikenStep::Flying {
                break;
            }
        }
        assert_eq!(outcome, ShurikenStep::Hit(2));
        assert!(s.has_hit_character);
    }

    #[test]
    fn thrower_is_safe_until_reflection() {
        let cfg = HazardConfig::default();
        let mut s = Shuriken::launch(0, 1, 100.0, 372.0, 8000.0, &cfg);
        // Thrower standing right on the spawn point.
        let targets = [target(1, 140.0)];
        assert_eq!(
            s.advance(1.0 / 60.0, &targets, &[], 8000.0, &cfg),
            ShurikenStep::Flying
        );
    }

    #[test]
    fn reflects_off_wall_then_comes_home() {
        let cfg = HazardConfig::default();
        let walls = [testkit::wall(400.0)];
        let mut s = Shuriken::launch(0, 1, 100.0, 372.0, 8000.0, &cfg);
        let mut seen = Vec::new();
        for _ in 0..200 {
            let step = s.advance(1.0 / 60.0, &[], &walls, 8000.0, &cfg);
            if step != ShurikenStep::Flying {
                seen.push(step);
            }
            if matches!(step, ShurikenStep::Destroyed(_)) {
                break;
            }
        }
        assert_eq!(
            seen,
            vec![
                ShurikenStep::Reflected(Some(0)),
                ShurikenStep::Destroyed(ShurikenEnd::ReturnedHome),
            ]
        );
    }

    #[test]
    fn reflected_shuriken_can_hit_its_thrower() {
        let cfg = HazardConfig::default();
        let walls = [testkit::wall(400.0)];
        let mut s = Shuriken::launch(0, 1, 100.0, 372.0, 8000.0, &cfg);
        // Thrower has since run forward.
        let targets = [target(1, 250.0)];
        let mut hits = Vec::new();
        for _ in 0..200 {
            match s.advance(1.0 / 60.0, &targets, &walls, 8000.0, &cfg) {
                ShurikenStep::Hit(id) => {
                    hits.push(id);
                    break;
                },
                ShurikenStep::Destroyed(_) => break,
                _ => {},
            }
        }
        assert_eq!(hits, vec![1]);
    }

    #[test]
    fn second_impact_destroys() {
        let cfg = HazardConfig::default();
        // Wall just behind the spawn point is only met on the way back.
        let walls = [testkit::wall(130.0), testkit::wall(400.0)];
        let mut s = Shuriken::launch(0, 1, 100.0, 372.0, 8000.0, &cfg);
        let mut last = ShurikenStep::Flying;
        for _ in 0..200 {
            last = s.advance(1.0 / 60.0, &[], &walls, 8000.0, &cfg);
            if matches!(last, ShurikenStep::Destroyed(_)) {
                break;
            }
        }
        assert_eq!(last, ShurikenStep::Destroyed(ShurikenEnd::SecondImpact));
    }

    #[test]
    fn world_edge_counts_as_impact() {
        let cfg = HazardConfig::default();
        let mut s = Shuriken::launch(0, 1, 900.0, 372.0, 1000.0, &cfg);
        let step = s.advance(0.2, &[], &[], 1000.0, &cfg);
        assert_eq!(step, ShurikenStep::Reflected(None));
        assert!(s.direction < 0.0);
        assert!(s.x <= 1000.0);
    }

    #[test]
    fn throw_at_world_edge_spawns_inside() {
        let cfg = HazardConfig::default();
        let mut s = Shuriken::launch(0, 1, 980.0, 372.0, 1000.0, &cfg);
        assert_eq!(s.origin_x, 1000.0);
        assert_eq!(s.x, 1000.0);
        let step = s.advance(1.0 / 120.0, &[], &[], 1000.0, &cfg);
        assert_eq!(step, ShurikenStep::Reflected(None));
        assert!(s.has_reflected);
        assert!(s.x <= s.origin_x);
    }

    #[test]
    fn large_tick_cannot_tunnel_through_wall() {
        let cfg = HazardConfig::default();
        let walls = [testkit::wall(400.0)];
        let mut s = Shuriken::launch(0, 1, 100.0, 372.0, 8000.0, &cfg);
        let step = s.advance(1.0, &[], &walls, 8000.0, &cfg);
        assert_eq!(step, ShurikenStep::Reflected(Some(0)));
    }
}

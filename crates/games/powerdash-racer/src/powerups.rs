use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use powerdash_core::game_trait::EntityId;
use powerdash_core::powerup::{self, EffectKind};
use powerdash_core::rng::Roll;

use crate::platform::{MovingPlatform, PlatformId};
use crate::track::PickupSpawn;

/// What a mystery box can contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PowerUpKind {
    Speed,
    Shield,
    Lightning,
    Trap,
    Shuriken,
}

impl PowerUpKind {
    pub const ALL: [PowerUpKind; 5] = [
        PowerUpKind::Speed,
        PowerUpKind::Shield,
        PowerUpKind::Lightning,
        PowerUpKind::Trap,
        PowerUpKind::Shuriken,
    ];

    /// Uniform draw over every kind.
    pub fn roll(rng: &mut dyn Roll) -> Self {
        Self::ALL[rng.pick(Self::ALL.len())]
    }
}

/// Timed or open-ended state attached to a character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RacerEffect {
    SpeedBoost,
    Shield,
    Stun,
    /// Pending respawn after a fall or a blast.
    Respawn,
}

impl EffectKind for RacerEffect {}

pub type RacerEffects = powerup::EffectList<RacerEffect>;

/// Terrain a pickup was placed over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PickupLocation {
    Ground,
    Wall,
    Platform,
    Gap,
}

/// What a character does with a freshly opened box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CollectPolicy {
    /// Keep it until the racer chooses to use it. Full hands skip the box.
    Hold,
    /// Use it on the spot.
    UseImmediately,
}

/// A mystery box on the course. Never consumed; each character has its own
/// re-collect cooldown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MysteryBox {
    pub id: usize,
    pub x: f64,
    pub y: f64,
    pub location: PickupLocation,
    pub attached: Option<(PlatformId, f64, f64)>,
    last_collected: BTreeMap<EntityId, u64>,
}

impl MysteryBox {
    pub fn from_spawn(id: usize, spawn: &PickupSpawn) -> Self {
        Self {
            id,
            x: spawn.x,
            y: spawn.y,
            location: spawn.location,
            attached: spawn.attached,
            last_collected: BTreeMap::new(),
        }
    }

    /// Re-anchor onto the carrying platform, if any.
    pub fn follow_platform(&mut self, platforms: &[MovingPlatform]) {
        if let Some((id, dx, dy)) = self.attached
            && let Some(p) = platforms.get(id)
        {
            self.x = p.x + dx;
            self.y = p.y + dy;
        }
    }

    pub fn touches(&self, x: f64, y: f64, radius: f64) -> bool {
        let (dx, dy) = (self.x - x, self.y - y);
        dx * dx + dy * dy <= radius * radius
    }

    pub fn ready_for(&self, racer: EntityId, now_ms: u64, cooldown_ms: u64) -> bool {
        self.last_collected
            .get(&racer)
            .is_none_or(|&at| now_ms.saturating_sub(at) >= cooldown_ms)
    }

    pub fn mark_collected(&mut self, racer: EntityId, now_ms: u64) {
        self.last_collected.insert(racer, now_ms);
    }

    /// Drop bookkeeping for a racer that left.
    pub fn forget(&mut self, racer: EntityId) {
        self.last_collected.remove(&racer);
    }
}

#[cfg(test)]
mod tests {
    use powerdash_core::powerup::EffectList;
    use powerdash_core::rng::ScriptedRolls;

    use super::*;

    fn ground_box() -> MysteryBox {
        MysteryBox::from_spawn(
            0,
            &PickupSpawn {
                x: 500.0,
                y: 384.0,
                location: PickupLocation::Ground,
                attached: None,
            },
        )
    }

    #[test]
    fn roll_covers_every_kind() {
        let mut rolls = ScriptedRolls::new(vec![0.0, 0.2, 0.4, 0.6, 0.8]);
        let drawn: Vec<_> = (0..5).map(|_| PowerUpKind::roll(&mut rolls)).collect();
        assert_eq!(drawn, PowerUpKind::ALL.to_vec());
    }

    #[test]
    fn speed_boost_restart_extends_expiry() {
        let mut fx: EffectList<RacerEffect> = EffectList::new();
        fx.schedule(RacerEffect::SpeedBoost, Some(5000));
        // Second box at t=2000 replaces the pending expiry.
        fx.schedule(RacerEffect::SpeedBoost, Some(7000));
        assert!(fx.drain_expired(6000).is_empty());
        assert_eq!(fx.drain_expired(7100), vec![RacerEffect::SpeedBoost]);
    }

    #[test]
    fn cooldown_is_per_racer() {
        let mut b = ground_box();
        assert!(b.ready_for(1, 0, 1000));
        b.mark_collected(1, 100);
        assert!(!b.ready_for(1, 600, 1000));
        assert!(b.ready_for(2, 600, 1000));
        assert!(b.ready_for(1, 1100, 1000));
        b.forget(1);
        assert!(b.ready_for(1, 200, 1000));
    }

    #[test]
    fn touch_radius() {
        let b = ground_box();
        assert!(b.touches(500.0, 372.0, 32.0));
        assert!(!b.touches(540.0, 372.0, 32.0));
    }

    #[test]
    fn riding_box_follows_platform() {
        use crate::platform::{Axis, PlatformSpec};
        let mut platform = MovingPlatform::new(PlatformSpec {
            origin_x: 300.0,
            origin_y: 368.0,
            width: 90.0,
            height: 16.0,
            axis: Axis::Horizontal,
            amplitude: 60.0,
            period_ms: 2000,
            phase_offset_ms: 0,
            start_delay_ms: 0,
        });
        let mut b = MysteryBox::from_spawn(
            3,
            &PickupSpawn {
                x: 300.0,
                y: 344.0,
                location: PickupLocation::Platform,
                attached: Some((0, 0.0, -24.0)),
            },
        );
        platform.sync(1000);
        b.follow_platform(std::slice::from_ref(&platform));
        assert!((b.x - 360.0).abs() < 1e-9);
        assert_eq!(b.y, 344.0);
    }
}

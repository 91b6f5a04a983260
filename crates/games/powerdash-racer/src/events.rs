use serde::{Deserialize, Serialize};

use powerdash_core::game_trait::EntityId;

use crate::config::ShakeProfile;
use crate::hazards::ShurikenEnd;
use crate::powerups::PowerUpKind;
use crate::race::RaceSummary;

/// What knocked a racer out (or would have, had a shield not been up).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Threat {
    Lightning,
    Shuriken,
    Trap,
}

/// Everything the presentation layer needs to animate, play sounds, shake
/// the camera, or show a callout. Drained once per tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RaceEvent {
    Jumped {
        racer: EntityId,
        x: f64,
        y: f64,
    },
    WallBump {
        racer: EntityId,
        wall: usize,
        shake: ShakeProfile,
    },
    PowerupCollected {
        racer: EntityId,
        pickup: usize,
        kind: PowerUpKind,
    },
    PowerupUsed {
        racer: EntityId,
        kind: PowerUpKind,
    },
    SpeedBoostStarted {
        racer: EntityId,
        until_ms: u64,
    },
    SpeedBoostEnded {
        racer: EntityId,
    },
    ShieldRaised {
        racer: EntityId,
    },
    ShieldConsumed {
        racer: EntityId,
        threat: Threat,
    },
    Stunned {
        racer: EntityId,
        by: EntityId,
        until_ms: u64,
    },
    StunEnded {
        racer: EntityId,
    },
    /// Lightning used with nobody left to strike.
    LightningFizzled {
        racer: EntityId,
    },
    Blasted {
        racer: EntityId,
        threat: Threat,
    },
    Fell {
        racer: EntityId,
    },
    Respawned {
        racer: EntityId,
        x: f64,
        y: f64,
    },
    TrapDeployed {
        trap: u64,
        by: EntityId,
        x: f64,
        y: f64,
    },
    TrapDetonated {
        trap: u64,
        x: f64,
        y: f64,
        caught: Vec<EntityId>,
        shake: ShakeProfile,
    },
    ShurikenThrown {
        shuriken: u64,
        by: EntityId,
        x: f64,
        y: f64,
    },
    ShurikenReflected {
        shuriken: u64,
        x: f64,
        wall: Option<usize>,
    },
    ShurikenDestroyed {
        shuriken: u64,
        x: f64,
        reason: ShurikenEnd,
    },
    Finished {
        racer: EntityId,
        rank: usize,
        time_ms: u64,
    },
    CalloutExpired {
        racer: EntityId,
    },
    CameraFollowStopped,
    RaceEnded {
        summary: RaceSummary,
    },
}

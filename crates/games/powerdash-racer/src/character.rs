use serde::{Deserialize, Serialize};

use powerdash_core::events::EventQueue;
use powerdash_core::game_trait::EntityId;
use powerdash_core::rng::Roll;

use crate::bot::Personality;
use crate::config::{PhysicsConfig, RaceConfig, ShakeConfig, ShakeProfile};
use crate::events::{RaceEvent, Threat};
use crate::physics::{Body, Contacts};
use crate::platform::{MovingPlatform, PlatformContact};
use crate::powerups::{CollectPolicy, PowerUpKind, RacerEffect, RacerEffects};
use crate::track::{SegmentId, Track};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MotionState {
    Running,
    Jumping,
}

/// Mutually exclusive states that take control away from the racer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Condition {
    Normal,
    Falling,
    Blasted,
    Stunned { pre_stun_vx: f64 },
}

/// Read-only world view handed to a character's decision step.
pub struct TickView<'a> {
    pub now_ms: u64,
    pub dt_ms: u64,
    pub track: &'a Track,
    pub platforms: &'a [MovingPlatform],
    pub config: &'a RaceConfig,
}

/// What a character wants to do this tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Intent {
    pub jump: bool,
    pub use_powerup: bool,
}

/// Input frame sent by a human racer's client.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RacerInput {
    pub jump: bool,
    pub use_powerup: bool,
}

/// State shared by every racer regardless of who steers it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RacerState {
    pub id: EntityId,
    pub body: Body,
    pub normal_speed: f64,
    pub boosted_speed: f64,
    pub current_speed: f64,
    pub motion: MotionState,
    pub condition: Condition,
    pub shield_active: bool,
    pub held: Option<PowerUpKind>,
    pub last_safe_x: f64,
    pub last_safe_segment: Option<SegmentId>,
    /// Centre Y a respawned body is placed at.
    pub spawn_y: f64,
    pub on_floor: bool,
    pub platform_contact: Option<PlatformContact>,
    /// Wall pressed against last tick.
    pub touching_wall: Option<usize>,
    pub finished: bool,
    pub effects: RacerEffects,
}

impl RacerState {
    pub fn new(id: EntityId, x: f64, normal: f64, boosted: f64, physics: &PhysicsConfig) -> Self {
        let y = physics.standing_y();
        Self {
            id,
            body: Body::new(x, y, physics.character_width, physics.character_height),
            normal_speed: normal,
            boosted_speed: boosted,
            current_speed: normal,
            motion: MotionState::Running,
            condition: Condition::Normal,
            shield_active: false,
            held: None,
            last_safe_x: x,
            last_safe_segment: None,
            spawn_y: y,
            on_floor: true,
            platform_contact: None,
            touching_wall: None,
            finished: false,
            effects: RacerEffects::new(),
        }
    }

    pub fn is_falling(&self) -> bool {
        self.condition == Condition::Falling
    }

    pub fn is_blasted(&self) -> bool {
        self.condition == Condition::Blasted
    }

    pub fn is_stunned(&self) -> bool {
        matches!(self.condition, Condition::Stunned { .. })
    }

    /// Hazards and lightning can reach this racer.
    pub fn is_exposed(&self) -> bool {
        !self.is_falling() && !self.is_blasted() && !self.finished
    }

    pub fn can_act(&self) -> bool {
        self.condition == Condition::Normal && !self.finished && self.body.enabled
    }

    /// On the floor, or touched a platform within the grace window.
    pub fn is_grounded(&self, now_ms: u64, grace_ms: u64) -> bool {
        self.on_floor
            || self
                .platform_contact
                .is_some_and(|c| c.is_fresh(now_ms, grace_ms))
    }

    pub fn can_jump(&self, now_ms: u64, grace_ms: u64) -> bool {
        self.can_act() && self.is_grounded(now_ms, grace_ms)
    }

    /// Horizontal velocity the racer should have this tick.
    pub fn desired_vx(&self) -> f64 {
        if self.can_act() {
            self.current_speed
        } else {
            0.0
        }
    }

    /// Launch upward if allowed. Returns whether a jump happened.
    pub fn jump(
        &mut self,
        now_ms: u64,
        config: &RaceConfig,
        events: &mut EventQueue<RaceEvent>,
    ) -> bool {
        if !self.can_jump(now_ms, config.platforms.contact_grace_ms) {
            return false;
        }
        self.body.vy = config.physics.jump_velocity;
        self.motion = MotionState::Jumping;
        self.on_floor = false;
        self.platform_contact = None;
        events.push(RaceEvent::Jumped {
            racer: self.id,
            x: self.body.x,
            y: self.body.bottom(),
        });
        true
    }

    /// Fold a physics result into the grounded bookkeeping.
    pub fn apply_contacts(&mut self, contacts: &Contacts, now_ms: u64) {
        self.on_floor = contacts.on_floor;
        if let Some(platform) = contacts.platform {
            self.platform_contact = Some(PlatformContact {
                platform,
                at_ms: now_ms,
            });
        }
        if self.on_floor && self.motion == MotionState::Jumping && self.body.vy >= 0.0 {
            self.motion = MotionState::Running;
        }
    }

    /// Remember where the racer last stood on solid ground.
    pub fn record_safe_ground(&mut self, track: &Track) {
        if !self.on_floor {
            return;
        }
        self.last_safe_x = self.body.x;
        if let Some(id) = track.ground_under(self.body.left(), self.body.right()) {
            self.last_safe_segment = Some(id);
        }
    }

    /// Respawn X near the far end of the last safe segment, kept fully on it.
    pub fn respawn_x(&self, track: &Track, edge_buffer: f64) -> f64 {
        let half = self.body.width / 2.0;
        match self.last_safe_segment.and_then(|id| track.segment(id)) {
            Some(seg) => (seg.end - (half + edge_buffer))
                .max(seg.start + half)
                .min(seg.end - half),
            None => self.last_safe_x,
        }
    }

    fn knock_out(&mut self, condition: Condition, now_ms: u64, respawn_delay_ms: u64) {
        self.condition = condition;
        self.body.enabled = false;
        self.body.vx = 0.0;
        self.body.vy = 0.0;
        self.on_floor = false;
        self.platform_contact = None;
        self.shield_active = false;
        self.current_speed = self.normal_speed;
        self.effects.cancel(RacerEffect::SpeedBoost);
        self.effects.cancel(RacerEffect::Shield);
        self.effects.cancel(RacerEffect::Stun);
        self.effects
            .schedule(RacerEffect::Respawn, Some(now_ms + respawn_delay_ms));
    }

    /// Dropped below the course. Idempotent while already falling.
    pub fn fall(&mut self, now_ms: u64, config: &RaceConfig, events: &mut EventQueue<RaceEvent>) {
        if self.is_falling() || self.finished {
            return;
        }
        self.knock_out(Condition::Falling, now_ms, config.respawn.delay_ms);
        tracing::debug!(racer = self.id, x = self.body.x, "Racer fell");
        events.push(RaceEvent::Fell { racer: self.id });
    }

    /// Knocked out by a hazard. Ignored if already down.
    pub fn blast(
        &mut self,
        threat: Threat,
        now_ms: u64,
        config: &RaceConfig,
        events: &mut EventQueue<RaceEvent>,
    ) -> bool {
        if !self.is_exposed() {
            return false;
        }
        self.knock_out(Condition::Blasted, now_ms, config.respawn.delay_ms);
        events.push(RaceEvent::Blasted {
            racer: self.id,
            threat,
        });
        true
    }

    /// Spend the shield on an incoming threat. Returns whether it absorbed it.
    pub fn absorb(&mut self, threat: Threat, events: &mut EventQueue<RaceEvent>) -> bool {
        if !self.shield_active {
            return false;
        }
        self.shield_active = false;
        self.effects.cancel(RacerEffect::Shield);
        events.push(RaceEvent::ShieldConsumed {
            racer: self.id,
            threat,
        });
        true
    }

    /// Freeze horizontal motion. A second stun restarts the timer but keeps
    /// the velocity captured by the first.
    pub fn stun(
        &mut self,
        by: EntityId,
        now_ms: u64,
        config: &RaceConfig,
        events: &mut EventQueue<RaceEvent>,
    ) -> bool {
        if !self.is_exposed() {
            return false;
        }
        let pre_stun_vx = match self.condition {
            Condition::Stunned { pre_stun_vx } => pre_stun_vx,
            _ => self.body.vx,
        };
        self.condition = Condition::Stunned { pre_stun_vx };
        self.body.vx = 0.0;
        let until_ms = now_ms + config.powerups.stun_duration_ms;
        self.effects.schedule(RacerEffect::Stun, Some(until_ms));
        events.push(RaceEvent::Stunned {
            racer: self.id,
            by,
            until_ms,
        });
        true
    }

    /// Start (or restart) the speed boost.
    pub fn boost(&mut self, now_ms: u64, config: &RaceConfig, events: &mut EventQueue<RaceEvent>) {
        let until_ms = now_ms + config.powerups.speed_duration_ms;
        self.current_speed = self.boosted_speed;
        self.effects.schedule(RacerEffect::SpeedBoost, Some(until_ms));
        events.push(RaceEvent::SpeedBoostStarted {
            racer: self.id,
            until_ms,
        });
    }

    pub fn raise_shield(&mut self, events: &mut EventQueue<RaceEvent>) {
        self.shield_active = true;
        self.effects.schedule(RacerEffect::Shield, None);
        events.push(RaceEvent::ShieldRaised { racer: self.id });
    }

    /// Resolve every effect whose timer ran out by `now_ms`.
    pub fn expire_effects(
        &mut self,
        now_ms: u64,
        track: &Track,
        config: &RaceConfig,
        events: &mut EventQueue<RaceEvent>,
    ) {
        for effect in self.effects.drain_expired(now_ms) {
            match effect {
                RacerEffect::SpeedBoost => {
                    self.current_speed = self.normal_speed;
                    events.push(RaceEvent::SpeedBoostEnded { racer: self.id });
                },
                RacerEffect::Stun => {
                    if let Condition::Stunned { pre_stun_vx } = self.condition {
                        self.condition = Condition::Normal;
                        self.body.vx = pre_stun_vx;
                    }
                    events.push(RaceEvent::StunEnded { racer: self.id });
                },
                RacerEffect::Respawn => self.respawn(track, config, events),
                RacerEffect::Shield => {},
            }
        }
    }

    fn respawn(&mut self, track: &Track, config: &RaceConfig, events: &mut EventQueue<RaceEvent>) {
        if !self.is_falling() && !self.is_blasted() {
            return;
        }
        let x = self.respawn_x(track, config.respawn.edge_buffer);
        self.body.x = x;
        self.body.y = self.spawn_y;
        self.body.vx = 0.0;
        self.body.vy = 0.0;
        self.body.enabled = true;
        self.condition = Condition::Normal;
        self.motion = MotionState::Running;
        self.on_floor = false;
        tracing::debug!(racer = self.id, x, "Racer respawned");
        events.push(RaceEvent::Respawned {
            racer: self.id,
            x,
            y: self.spawn_y,
        });
    }

    /// Crossed the line: stop and drop out of the simulation.
    pub fn finish(&mut self) {
        self.finished = true;
        self.condition = Condition::Normal;
        self.body.vx = 0.0;
        self.body.vy = 0.0;
        self.body.gravity = false;
        self.shield_active = false;
        self.current_speed = self.normal_speed;
        self.effects.clear();
    }
}

/// Shared behaviour of everything that races: the human's avatar and bots.
pub trait Character: std::fmt::Debug + Send + Sync {
    fn state(&self) -> &RacerState;

    fn state_mut(&mut self) -> &mut RacerState;

    fn name(&self) -> &str;

    fn is_bot(&self) -> bool;

    /// Decide this tick's jump and power-up use. Called once per tick
    /// before physics.
    fn think(&mut self, view: &TickView<'_>, rng: &mut dyn Roll) -> Intent;

    fn collect_policy(&self) -> CollectPolicy;

    /// Camera shake requested when this racer hits a wall.
    fn wall_shake(&self, shake: &ShakeConfig) -> ShakeProfile;

    fn personality(&self) -> Option<Personality> {
        None
    }

    /// Buffer a client input frame. Ignored by AI-driven racers.
    fn queue_input(&mut self, _input: RacerInput) {}
}

/// The human-controlled racer.
#[derive(Debug, Clone)]
pub struct Player {
    state: RacerState,
    name: String,
    pending: RacerInput,
}

impl Player {
    pub fn new(id: EntityId, name: impl Into<String>, config: &RaceConfig) -> Self {
        Self {
            state: RacerState::new(
                id,
                config.rules.player_start_x,
                config.speed.player_normal,
                config.speed.player_boosted,
                &config.physics,
            ),
            name: name.into(),
            pending: RacerInput::default(),
        }
    }
}

impl Character for Player {
    fn state(&self) -> &RacerState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut RacerState {
        &mut self.state
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn is_bot(&self) -> bool {
        false
    }

    fn think(&mut self, view: &TickView<'_>, _rng: &mut dyn Roll) -> Intent {
        self.state.record_safe_ground(view.track);
        let input = std::mem::take(&mut self.pending);
        Intent {
            jump: input.jump,
            use_powerup: input.use_powerup,
        }
    }

    fn collect_policy(&self) -> CollectPolicy {
        CollectPolicy::Hold
    }

    fn wall_shake(&self, shake: &ShakeConfig) -> ShakeProfile {
        shake.player
    }

    // Flags accumulate until the next tick consumes them.
    fn queue_input(&mut self, input: RacerInput) {
        self.pending.jump |= input.jump;
        self.pending.use_powerup |= input.use_powerup;
    }
}

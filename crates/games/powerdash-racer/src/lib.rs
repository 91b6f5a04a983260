pub mod bot;
pub mod character;
pub mod config;
pub mod events;
pub mod hazards;
pub mod patterns;
pub mod physics;
pub mod platform;
pub mod powerups;
pub mod race;
pub mod track;

#[cfg(test)]
mod testkit;

use std::time::Duration;

use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use powerdash_core::events::EventQueue;
use powerdash_core::game_trait::{EntityId, GameMetadata, RaceGame, RaceSetup, Standing};
use powerdash_core::player::Racer;
use powerdash_core::rng::Roll;
use powerdash_core::time::SimClock;

use bot::{Bot, Personality};
use character::{Character, Player, RacerInput, RacerState, TickView};
use config::{RaceConfig, TrackLayout};
use events::{RaceEvent, Threat};
use hazards::{HazardTarget, Shuriken, ShurikenEnd, ShurikenStep, Trap, TrapField};
use physics::World;
use platform::MovingPlatform;
use powerups::{CollectPolicy, MysteryBox, PowerUpKind};
use race::{Callout, Finisher, Progress, RaceOrchestrator};
use track::{Track, generate_track};

/// Serializable view of the race for the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RaceSnapshot {
    pub now_ms: u64,
    pub racers: Vec<RacerSnapshot>,
    pub platforms: Vec<MovingPlatform>,
    pub pickups: Vec<MysteryBox>,
    pub traps: Vec<Trap>,
    pub shurikens: Vec<Shuriken>,
    pub finishers: Vec<Finisher>,
    pub callouts: Vec<Callout>,
    pub complete: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RacerSnapshot {
    pub name: String,
    pub personality: Option<Personality>,
    pub state: RacerState,
}

impl RaceSnapshot {
    pub fn decode(bytes: &[u8]) -> Result<Self, rmp_serde::decode::Error> {
        rmp_serde::from_slice(bytes)
    }
}

/// The PowerDash race: one or more humans against personality-driven bots.
pub struct PowerDash {
    config: RaceConfig,
    track: Track,
    platforms: Vec<MovingPlatform>,
    pickups: Vec<MysteryBox>,
    /// Sorted by id; iteration order is the tie-break order.
    racers: Vec<Box<dyn Character>>,
    traps: TrapField,
    shurikens: Vec<Shuriken>,
    next_shuriken_id: u64,
    race: RaceOrchestrator,
    clock: SimClock,
    events: EventQueue<RaceEvent>,
    rng: StdRng,
    paused: bool,
    end_announced: bool,
}

impl PowerDash {
    pub fn new() -> Self {
        Self::with_config(RaceConfig::load())
    }

    /// Build a race around `config`, falling back to defaults if it fails
    /// validation.
    pub fn with_config(config: RaceConfig) -> Self {
        let config = match config.validate() {
            Ok(()) => config,
            Err(e) => {
                tracing::warn!("Rejected race config: {e}, using defaults");
                RaceConfig::default()
            },
        };
        let track = generate_track(&config, 0);
        let mut game = Self {
            race: RaceOrchestrator::new(config.rules.podium_size, 0),
            config,
            track,
            platforms: Vec::new(),
            pickups: Vec::new(),
            racers: Vec::new(),
            traps: TrapField::new(),
            shurikens: Vec::new(),
            next_shuriken_id: 0,
            clock: SimClock::new(),
            events: EventQueue::new(),
            rng: StdRng::seed_from_u64(0),
            paused: false,
            end_announced: false,
        };
        game.place_course();
        game
    }

    pub fn config(&self) -> &RaceConfig {
        &self.config
    }

    pub fn track(&self) -> &Track {
        &self.track
    }

    pub fn platforms(&self) -> &[MovingPlatform] {
        &self.platforms
    }

    pub fn pickups(&self) -> &[MysteryBox] {
        &self.pickups
    }

    pub fn traps(&self) -> &TrapField {
        &self.traps
    }

    pub fn shurikens(&self) -> &[Shuriken] {
        &self.shurikens
    }

    pub fn race(&self) -> &RaceOrchestrator {
        &self.race
    }

    pub fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }

    pub fn racers(&self) -> impl Iterator<Item = &dyn Character> {
        self.racers.iter().map(|r| r.as_ref())
    }

    pub fn racer(&self, id: EntityId) -> Option<&dyn Character> {
        self.racers
            .iter()
            .find(|r| r.state().id == id)
            .map(|r| r.as_ref())
    }

    pub fn racer_mut(&mut self, id: EntityId) -> Option<&mut (dyn Character + 'static)> {
        self.racers
            .iter_mut()
            .find(|r| r.state().id == id)
            .map(|r| r.as_mut())
    }

    pub fn build_snapshot(&self) -> RaceSnapshot {
        RaceSnapshot {
            now_ms: self.clock.now_ms(),
            racers: self
                .racers
                .iter()
                .map(|r| RacerSnapshot {
                    name: r.name().to_string(),
                    personality: r.personality(),
                    state: r.state().clone(),
                })
                .collect(),
            platforms: self.platforms.clone(),
            pickups: self.pickups.clone(),
            traps: self.traps.iter().cloned().collect(),
            shurikens: self.shurikens.clone(),
            finishers: self.race.finishers().to_vec(),
            callouts: self.race.callouts().to_vec(),
            complete: self.race.is_over(),
        }
    }

    fn place_course(&mut self) {
        self.platforms = self
            .track
            .platforms
            .iter()
            .cloned()
            .map(MovingPlatform::new)
            .collect();
        self.pickups = self
            .track
            .pickups
            .iter()
            .enumerate()
            .map(|(i, spawn)| MysteryBox::from_spawn(i, spawn))
            .collect();
    }

    fn index_of(&self, id: EntityId) -> Option<usize> {
        self.racers.iter().position(|r| r.state().id == id)
    }

    fn hazard_targets(&self) -> Vec<HazardTarget> {
        self.racers
            .iter()
            .map(|r| {
                let s = r.state();
                HazardTarget {
                    id: s.id,
                    x: s.body.x,
                    y: s.body.y,
                    exposed: s.is_exposed(),
                }
            })
            .collect()
    }

    /// Decide, move and collide one racer.
    fn step_racer(&mut self, i: usize, now: u64, dt_ms: u64, dt: f64) {
        if self.racers[i].state().finished {
            return;
        }

        let view = TickView {
            now_ms: now,
            dt_ms,
            track: &self.track,
            platforms: &self.platforms,
            config: &self.config,
        };
        let intent = self.racers[i].think(&view, &mut self.rng);

        if intent.jump {
            self.racers[i]
                .state_mut()
                .jump(now, &self.config, &mut self.events);
        }
        if intent.use_powerup {
            let state = self.racers[i].state_mut();
            if state.body.enabled
                && let Some(kind) = state.held.take()
            {
                self.use_powerup(i, kind, now);
            }
        }

        let grace = self.config.platforms.contact_grace_ms;
        let racer = &mut self.racers[i];
        let shake = racer.wall_shake(&self.config.shake);
        let state = racer.state_mut();
        state.body.vx = state.desired_vx();

        // Ride the platform stood on last tick.
        if state.on_floor
            && let Some(contact) = state.platform_contact
            && contact.is_fresh(now, dt_ms)
            && let Some(platform) = self.platforms.get(contact.platform)
        {
            state.body.carry(platform);
        }

        let world = World {
            track: &self.track,
            platforms: &self.platforms,
            physics: &self.config.physics,
            snap_tolerance: self.config.platforms.snap_tolerance,
        };
        let contacts = physics::integrate(&mut state.body, &world, dt);
        state.apply_contacts(&contacts, now);

        let bumped = contacts.wall.filter(|_| state.can_act());
        if let Some(wall) = bumped
            && state.touching_wall != Some(wall)
        {
            self.events.push(RaceEvent::WallBump {
                racer: state.id,
                wall,
                shake,
            });
        }
        state.touching_wall = bumped;
        if bumped.is_some() && state.is_grounded(now, grace) {
            state.jump(now, &self.config, &mut self.events);
        }

        if state.body.enabled && state.body.y > self.config.physics.fall_death_y() {
            state.fall(now, &self.config, &mut self.events);
        }
    }

    fn use_powerup(&mut self, i: usize, kind: PowerUpKind, now: u64) {
        let id = self.racers[i].state().id;
        self.events.push(RaceEvent::PowerupUsed { racer: id, kind });
        tracing::debug!(racer = id, kind = ?kind, "Power-up used");

        if kind == PowerUpKind::Lightning {
            self.strike_lightning(id, now);
            return;
        }

        let cfg = &self.config;
        let state = self.racers[i].state_mut();
        match kind {
            PowerUpKind::Speed => state.boost(now, cfg, &mut self.events),
            PowerUpKind::Shield => state.raise_shield(&mut self.events),
            PowerUpKind::Trap => {
                let (x, y) = (state.body.x, state.body.y);
                let trap = self.traps.deploy(x, y, id, now);
                self.events
                    .push(RaceEvent::TrapDeployed { trap, by: id, x, y });
            },
            PowerUpKind::Shuriken => {
                let shuriken = Shuriken::launch(
                    self.next_shuriken_id,
                    id,
                    state.body.x,
                    state.body.y,
                    self.track.width,
                    &cfg.hazards,
                );
                self.next_shuriken_id += 1;
                self.events.push(RaceEvent::ShurikenThrown {
                    shuriken: shuriken.id,
                    by: id,
                    x: shuriken.x,
                    y: shuriken.y,
                });
                self.shurikens.push(shuriken);
            },
            PowerUpKind::Lightning => {},
        }
    }

    /// Stun one random opponent that can still be hit.
    fn strike_lightning(&mut self, by: EntityId, now: u64) {
        let candidates: Vec<usize> = self
            .racers
            .iter()
            .enumerate()
            .filter(|(_, r)| r.state().id != by && r.state().is_exposed())
            .map(|(i, _)| i)
            .collect();
        if candidates.is_empty() {
            self.events.push(RaceEvent::LightningFizzled { racer: by });
            return;
        }
        let target = candidates[self.rng.pick(candidates.len())];
        let state = self.racers[target].state_mut();
        if !state.absorb(Threat::Lightning, &mut self.events) {
            state.stun(by, now, &self.config, &mut self.events);
        }
    }

    fn collect_pickups(&mut self, now: u64) {
        let radius = self.config.powerups.pickup_radius;
        let cooldown = self.config.powerups.recollect_cooldown_ms;
        let mut to_use = Vec::new();

        for pickup in &mut self.pickups {
            pickup.follow_platform(&self.platforms);
            for (i, racer) in self.racers.iter_mut().enumerate() {
                let policy = racer.collect_policy();
                let state = racer.state_mut();
                if !state.body.enabled
                    || state.finished
                    || !pickup.touches(state.body.x, state.body.y, radius)
                    || !pickup.ready_for(state.id, now, cooldown)
                {
                    continue;
                }
                // A full hand walks past without starting the cooldown.
                if policy == CollectPolicy::Hold && state.held.is_some() {
                    continue;
                }
                let kind = PowerUpKind::roll(&mut self.rng);
                pickup.mark_collected(state.id, now);
                self.events.push(RaceEvent::PowerupCollected {
                    racer: state.id,
                    pickup: pickup.id,
                    kind,
                });
                match policy {
                    CollectPolicy::Hold => state.held = Some(kind),
                    CollectPolicy::UseImmediately => to_use.push((i, kind)),
                }
            }
        }

        for (i, kind) in to_use {
            self.use_powerup(i, kind, now);
        }
    }

    fn scan_traps(&mut self, now: u64, dt_ms: u64) {
        let targets = self.hazard_targets();
        let detonations = self
            .traps
            .scan(now, dt_ms, &targets, &self.config.hazards);
        for det in detonations {
            tracing::debug!(trap = det.trap_id, caught = det.caught.len(), "Trap detonated");
            self.events.push(RaceEvent::TrapDetonated {
                trap: det.trap_id,
                x: det.x,
                y: det.y,
                caught: det.caught.clone(),
                shake: self.config.shake.trap,
            });
            for id in det.caught {
                self.knock_out(id, Threat::Trap, now);
            }
        }
    }

    fn move_shurikens(&mut self, now: u64, dt: f64) {
        let flying = std::mem::take(&mut self.shurikens);
        let mut remaining = Vec::with_capacity(flying.len());
        for mut shuriken in flying {
            let targets = self.hazard_targets();
            let step = shuriken.advance(
                dt,
                &targets,
                &self.track.walls,
                self.track.width,
                &self.config.hazards,
            );
            match step {
                ShurikenStep::Flying => remaining.push(shuriken),
                ShurikenStep::Reflected(wall) => {
                    self.events.push(RaceEvent::ShurikenReflected {
                        shuriken: shuriken.id,
                        x: shuriken.x,
                        wall,
                    });
                    remaining.push(shuriken);
                },
                ShurikenStep::Hit(victim) => {
                    self.events.push(RaceEvent::ShurikenDestroyed {
                        shuriken: shuriken.id,
                        x: shuriken.x,
                        reason: ShurikenEnd::HitCharacter,
                    });
                    self.knock_out(victim, Threat::Shuriken, now);
                },
                ShurikenStep::Destroyed(reason) => {
                    self.events.push(RaceEvent::ShurikenDestroyed {
                        shuriken: shuriken.id,
                        x: shuriken.x,
                        reason,
                    });
                },
            }
        }
        self.shurikens = remaining;
    }

    /// Blast a racer unless its shield takes the hit.
    fn knock_out(&mut self, id: EntityId, threat: Threat, now: u64) {
        let Some(i) = self.index_of(id) else {
            tracing::debug!(racer = id, "Hazard victim already gone");
            return;
        };
        let state = self.racers[i].state_mut();
        if !state.absorb(threat, &mut self.events) {
            state.blast(threat, now, &self.config, &mut self.events);
        }
    }

    /// `lefts` holds each racer's left edge from before this tick's motion,
    /// so a long step that jumps the whole finish zone still counts.
    fn check_finish(&mut self, now: u64, lefts: &[f64]) {
        let callout_ms = self.config.rules.callout_ms;
        for (racer, &before) in self.racers.iter_mut().zip(lefts) {
            let state = racer.state();
            let swept_left = before.min(state.body.left());
            if state.finished
                || !state.body.enabled
                || !self.track.crosses_finish(swept_left, state.body.right())
            {
                continue;
            }
            let id = state.id;
            if let Some(rank) = self.race.record_finish(id, racer.name(), now, callout_ms) {
                racer.state_mut().finish();
                self.events.push(RaceEvent::Finished {
                    racer: id,
                    rank,
                    time_ms: now,
                });
            }
        }
    }

    fn announce_end(&mut self) {
        if self.end_announced {
            return;
        }
        self.end_announced = true;
        let summary = self.race.summary();
        tracing::info!(
            finishers = summary.finishers.len(),
            total_racers = summary.total_racers,
            now_ms = self.clock.now_ms(),
            "Race ended"
        );
        self.events.push(RaceEvent::CameraFollowStopped);
        self.events.push(RaceEvent::RaceEnded { summary });
    }
}

impl Default for PowerDash {
    fn default() -> Self {
        Self::new()
    }
}

impl RaceGame for PowerDash {
    type Event = RaceEvent;

    fn metadata(&self) -> GameMetadata {
        GameMetadata {
            name: "PowerDash".to_string(),
            description: "Dash, jump and sabotage your way to the podium!".to_string(),
            min_racers: 1,
            max_racers: 8,
            estimated_race_duration: Duration::from_secs(60),
        }
    }

    fn init(&mut self, racers: &[Racer], setup: &RaceSetup) {
        let seed = setup.custom_u64("seed").unwrap_or_else(rand::random);
        match setup.custom_str("layout") {
            Some("procedural") => self.config.track.layout = TrackLayout::Procedural,
            Some("fixed") => self.config.track.layout = TrackLayout::Fixed,
            Some(other) => tracing::warn!(
                "Unknown track layout {other:?}, keeping {:?}",
                self.config.track.layout
            ),
            None => {},
        }

        self.track = generate_track(&self.config, seed);
        self.place_course();

        let mut roster: Vec<&Racer> = racers.iter().collect();
        roster.sort_by_key(|r| r.id);
        roster.dedup_by_key(|r| r.id);
        let mut bots = 0;
        self.racers = roster
            .into_iter()
            .map(|r| -> Box<dyn Character> {
                if r.is_human {
                    Box::new(Player::new(r.id, &r.display_name, &self.config))
                } else {
                    let personality = Personality::for_index(bots);
                    bots += 1;
                    Box::new(Bot::new(r.id, &r.display_name, personality, &self.config))
                }
            })
            .collect();

        self.traps = TrapField::new();
        self.shurikens.clear();
        self.next_shuriken_id = 0;
        self.race = RaceOrchestrator::new(self.config.rules.podium_size, self.racers.len());
        self.clock = SimClock::new();
        self.events.clear();
        self.rng = StdRng::seed_from_u64(seed);
        self.paused = false;
        self.end_announced = false;

        tracing::info!(
            seed,
            racers = self.racers.len(),
            bots,
            layout = ?self.config.track.layout,
            "Race initialized"
        );
    }

    fn update(&mut self, dt: f32) -> Vec<RaceEvent> {
        if self.paused || !dt.is_finite() || dt <= 0.0 {
            return Vec::new();
        }
        if self.race.is_over() {
            self.announce_end();
            return self.events.drain();
        }

        let dt_ms = self.clock.advance(dt);
        let now = self.clock.now_ms();
        let dt = f64::from(dt);

        for platform in &mut self.platforms {
            platform.sync(now);
        }
        for racer in &mut self.racers {
            racer
                .state_mut()
                .expire_effects(now, &self.track, &self.config, &mut self.events);
        }
        let lefts: Vec<f64> = self.racers.iter().map(|r| r.state().body.left()).collect();
        for i in 0..self.racers.len() {
            self.step_racer(i, now, dt_ms, dt);
        }
        self.collect_pickups(now);
        self.scan_traps(now, dt_ms);
        self.move_shurikens(now, dt);
        self.check_finish(now, &lefts);
        for racer in self.race.expire_callouts(now) {
            self.events.push(RaceEvent::CalloutExpired { racer });
        }
        if self.race.is_over() {
            self.announce_end();
        }

        self.events.drain()
    }

    fn snapshot(&self) -> Vec<u8> {
        match rmp_serde::to_vec(&self.build_snapshot()) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!("Failed to encode race snapshot: {e}");
                Vec::new()
            },
        }
    }

    fn apply_input(&mut self, racer_id: EntityId, input: &[u8]) {
        let frame = match rmp_serde::from_slice::<RacerInput>(input) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::warn!(racer = racer_id, "Ignoring malformed input: {e}");
                return;
            },
        };
        match self.racers.iter_mut().find(|r| r.state().id == racer_id) {
            Some(racer) => racer.queue_input(frame),
            None => tracing::debug!(racer = racer_id, "Input for unknown racer"),
        }
    }

    fn racer_left(&mut self, racer_id: EntityId) {
        let before = self.racers.len();
        self.racers.retain(|r| r.state().id != racer_id);
        if self.racers.len() == before {
            return;
        }
        for pickup in &mut self.pickups {
            pickup.forget(racer_id);
        }
        self.race.racer_left(racer_id);
        tracing::info!(racer = racer_id, "Racer left the race");
    }

    fn pause(&mut self) {
        self.paused = true;
    }

    fn resume(&mut self) {
        self.paused = false;
    }

    fn is_race_complete(&self) -> bool {
        self.race.is_over()
    }

    fn standings(&self) -> Vec<Standing> {
        let field: Vec<Progress> = self
            .racers
            .iter()
            .map(|r| Progress {
                racer: r.state().id,
                x: r.state().body.x,
            })
            .collect();
        self.race.standings(&field)
    }
}

#[cfg(test)]
mod tests {
    use powerdash_core::test_helpers::*;

    use super::*;
    use crate::powerups::PickupLocation;
    use crate::track::PickupSpawn;

    const DT: f32 = 1.0 / 60.0;

    fn game_with(bots: usize) -> PowerDash {
        let mut game = PowerDash::with_config(RaceConfig::default());
        game.init(&make_roster(bots), &default_setup(7));
        game
    }

    /// Swap in a hand-built course after init.
    fn on_track(game: &mut PowerDash, track: Track) {
        game.track = track;
        game.place_course();
    }

    fn input(jump: bool, use_powerup: bool) -> Vec<u8> {
        rmp_serde::to_vec(&RacerInput { jump, use_powerup }).unwrap()
    }

    fn state(game: &PowerDash, id: EntityId) -> &RacerState {
        game.racer(id).unwrap().state()
    }

    #[test]
    fn init_builds_players_and_bots() {
        let game = game_with(5);
        let humans: Vec<_> = game.racers().filter(|r| !r.is_bot()).collect();
        assert_eq!(humans.len(), 1);
        assert_eq!(humans[0].state().id, 1);
        let personalities: Vec<_> = game.racers().filter_map(|r| r.personality()).collect();
        assert_eq!(
            personalities,
            vec![
                Personality::Aggressive,
                Personality::Cautious,
                Personality::Erratic,
                Personality::Balanced,
                Personality::Aggressive,
            ]
        );
        assert_eq!(state(&game, 1).body.x, game.config().rules.player_start_x);
        assert_eq!(state(&game, 2).body.x, game.config().rules.bot_start_x);
    }

    #[test]
    fn seed_pins_the_track() {
        let a = game_with(2);
        let b = game_with(2);
        assert_eq!(a.track(), b.track());
        let mut c = PowerDash::with_config(RaceConfig::default());
        c.init(&make_roster(2), &default_setup(8));
        assert_ne!(a.track().segments, c.track().segments);
    }

    #[test]
    fn layout_override_selects_fixed_course() {
        let mut setup = default_setup(3);
        setup
            .custom
            .insert("layout".to_string(), serde_json::Value::from("fixed"));
        let mut game = PowerDash::with_config(RaceConfig::default());
        game.init(&make_roster(1), &setup);
        assert_eq!(game.config().track.layout, TrackLayout::Fixed);
        assert!(game.track().placed.is_empty());
        assert!(game.track().segments.iter().any(|s| !s.is_ground()));
    }

    #[test]
    fn invalid_config_falls_back_to_defaults() {
        let mut cfg = RaceConfig::default();
        cfg.track.buffer_min = cfg.track.buffer_max + 100.0;
        let mut game = PowerDash::with_config(cfg);
        assert_eq!(game.config(), &RaceConfig::default());
        game.init(&make_roster(1), &default_setup(3));
        game.update(DT);
        assert!(game.now_ms() > 0);
    }

    #[test]
    fn jump_input_launches_player() {
        let mut game = game_with(0);
        on_track(&mut game, testkit::flat_track(8000.0));
        game.apply_input(1, &input(true, false));
        let events = game.update(DT);
        assert!(events.contains(&RaceEvent::Jumped {
            racer: 1,
            x: 100.0,
            y: game.config().physics.ground_top_y,
        }));
        assert!(state(&game, 1).body.vy < 0.0);
    }

    #[test]
    fn malformed_input_is_ignored() {
        let mut game = game_with(1);
        let before = game.snapshot();
        game.apply_input(1, &[0xc1, 0xff, 0x00]);
        game.apply_input(99, &input(true, true));
        assert_eq!(before, game.snapshot());
    }

    #[test]
    fn runner_falls_into_gap_and_respawns_before_it() {
        let mut game = game_with(0);
        on_track(&mut game, testkit::gap_track(400.0, 550.0, 8000.0));
        let events = run_ticks(&mut game, 60 * 5, DT);
        let fell = events
            .iter()
            .position(|e| *e == RaceEvent::Fell { racer: 1 })
            .expect("player runs off the ledge");
        let respawned = events
            .iter()
            .position(|e| matches!(e, RaceEvent::Respawned { racer: 1, .. }))
            .expect("player comes back");
        assert!(fell < respawned);
        assert!(events.iter().any(|e| matches!(
            e,
            RaceEvent::Respawned { racer: 1, x, .. } if *x == 400.0 - 37.0
        )));
    }

    #[test]
    fn wall_contact_shakes_and_hops() {
        let mut game = game_with(0);
        on_track(&mut game, testkit::walled_track(8000.0, &[300.0]));
        let events = run_ticks(&mut game, 90, DT);
        let shake = game.config().shake.player;
        let bump = events
            .iter()
            .position(|e| {
                *e == RaceEvent::WallBump {
                    racer: 1,
                    wall: 0,
                    shake,
                }
            })
            .expect("player reaches the wall");
        assert!(
            events[bump..]
                .iter()
                .any(|e| matches!(e, RaceEvent::Jumped { racer: 1, .. }))
        );
        let bumps = events
            .iter()
            .filter(|e| matches!(e, RaceEvent::WallBump { .. }))
            .count();
        assert_eq!(bumps, 1);
    }

    #[test]
    fn player_holds_pickup_until_deploy() {
        let mut game = game_with(0);
        on_track(&mut game, testkit::flat_track(8000.0));
        let y = state(&game, 1).body.y;
        game.pickups = vec![MysteryBox::from_spawn(
            0,
            &PickupSpawn {
                x: 110.0,
                y,
                location: PickupLocation::Ground,
                attached: None,
            },
        )];
        let events = game.update(DT);
        let kind = state(&game, 1).held.expect("box opened");
        assert!(events.contains(&RaceEvent::PowerupCollected {
            racer: 1,
            pickup: 0,
            kind
        }));

        game.apply_input(1, &input(false, true));
        let events = game.update(DT);
        assert!(events.contains(&RaceEvent::PowerupUsed { racer: 1, kind }));
        assert_eq!(state(&game, 1).held, None);
    }

    #[test]
    fn full_hand_skips_pickup_without_cooldown() {
        let mut game = game_with(0);
        on_track(&mut game, testkit::flat_track(8000.0));
        game.racer_mut(1).unwrap().state_mut().held = Some(PowerUpKind::Trap);
        let y = state(&game, 1).body.y;
        game.pickups = vec![MysteryBox::from_spawn(
            0,
            &PickupSpawn {
                x: 110.0,
                y,
                location: PickupLocation::Ground,
                attached: None,
            },
        )];
        let events = game.update(DT);
        assert!(
            !events
                .iter()
                .any(|e| matches!(e, RaceEvent::PowerupCollected { .. }))
        );
        assert!(game.pickups[0].ready_for(1, game.now_ms(), 1000));
        assert_eq!(state(&game, 1).held, Some(PowerUpKind::Trap));
    }

    #[test]
    fn bots_use_what_they_collect() {
        let mut game = game_with(1);
        on_track(&mut game, testkit::flat_track(8000.0));
        let y = state(&game, 2).body.y;
        game.pickups = vec![MysteryBox::from_spawn(
            0,
            &PickupSpawn {
                x: 60.0,
                y,
                location: PickupLocation::Ground,
                attached: None,
            },
        )];
        let events = game.update(DT);
        let collected = events
            .iter()
            .find_map(|e| match e {
                RaceEvent::PowerupCollected { racer: 2, kind, .. } => Some(*kind),
                _ => None,
            })
            .expect("bot opens the box");
        assert!(events.contains(&RaceEvent::PowerupUsed {
            racer: 2,
            kind: collected
        }));
        assert_eq!(state(&game, 2).held, None);
    }

    #[test]
    fn shield_blocks_one_lightning_strike() {
        let mut game = game_with(1);
        on_track(&mut game, testkit::flat_track(8000.0));
        let mut scratch = EventQueue::new();
        game.racer_mut(1)
            .unwrap()
            .state_mut()
            .raise_shield(&mut scratch);
        let bot = game.index_of(2).unwrap();

        game.use_powerup(bot, PowerUpKind::Lightning, 0);
        let events = game.events.drain();
        assert!(events.contains(&RaceEvent::ShieldConsumed {
            racer: 1,
            threat: Threat::Lightning
        }));
        assert!(!state(&game, 1).is_stunned());

        game.use_powerup(bot, PowerUpKind::Lightning, 10);
        let events = game.events.drain();
        assert!(events.contains(&RaceEvent::Stunned {
            racer: 1,
            by: 2,
            until_ms: 10 + game.config().powerups.stun_duration_ms,
        }));
        assert!(state(&game, 1).is_stunned());
    }

    #[test]
    fn shield_soaks_one_trap_blast() {
        let mut game = game_with(0);
        on_track(&mut game, testkit::flat_track(8000.0));
        let mut scratch = EventQueue::new();
        game.racer_mut(1)
            .unwrap()
            .state_mut()
            .raise_shield(&mut scratch);
        let y = state(&game, 1).body.y;

        game.traps.deploy(600.0, y, 9, 0);
        let events = run_ticks(&mut game, 60 * 3, DT);
        assert!(events.contains(&RaceEvent::ShieldConsumed {
            racer: 1,
            threat: Threat::Trap
        }));
        assert!(!events.iter().any(|e| matches!(e, RaceEvent::Blasted { .. })));
        assert!(!state(&game, 1).shield_active);
        assert!(game.traps().is_empty());

        let x = state(&game, 1).body.x;
        game.traps.deploy(x + 500.0, y, 9, game.now_ms());
        let events = run_ticks(&mut game, 60 * 3, DT);
        assert!(events.contains(&RaceEvent::Blasted {
            racer: 1,
            threat: Threat::Trap
        }));
    }

    #[test]
    fn shield_soaks_one_shuriken() {
        let mut game = game_with(1);
        on_track(&mut game, testkit::flat_track(8000.0));
        let mut scratch = EventQueue::new();
        game.racer_mut(1)
            .unwrap()
            .state_mut()
            .raise_shield(&mut scratch);
        let bot = game.index_of(2).unwrap();

        game.use_powerup(bot, PowerUpKind::Shuriken, 0);
        let events = run_ticks(&mut game, 60 * 2, DT);
        assert!(events.contains(&RaceEvent::ShieldConsumed {
            racer: 1,
            threat: Threat::Shuriken
        }));
        assert!(!events.iter().any(|e| matches!(e, RaceEvent::Blasted { racer: 1, .. })));
        assert!(!state(&game, 1).shield_active);
        assert!(game.shurikens().is_empty());

        // Line the thrower up just behind the runner again.
        let (x, y) = (state(&game, 1).body.x, state(&game, 1).body.y);
        let thrower = game.racer_mut(2).unwrap().state_mut();
        thrower.body.x = x - 100.0;
        thrower.body.y = y;
        game.use_powerup(bot, PowerUpKind::Shuriken, game.now_ms());
        let events = run_ticks(&mut game, 60 * 2, DT);
        assert!(events.contains(&RaceEvent::Blasted {
            racer: 1,
            threat: Threat::Shuriken
        }));
    }

    #[test]
    fn shield_survives_wall_hop() {
        let mut game = game_with(0);
        on_track(&mut game, testkit::walled_track(8000.0, &[300.0]));
        let mut scratch = EventQueue::new();
        game.racer_mut(1)
            .unwrap()
            .state_mut()
            .raise_shield(&mut scratch);

        let events = run_ticks(&mut game, 90, DT);
        assert!(
            events
                .iter()
                .any(|e| matches!(e, RaceEvent::WallBump { racer: 1, .. }))
        );
        assert!(
            events
                .iter()
                .any(|e| matches!(e, RaceEvent::Jumped { racer: 1, .. }))
        );
        assert!(
            !events
                .iter()
                .any(|e| matches!(e, RaceEvent::ShieldConsumed { .. }))
        );
        assert!(state(&game, 1).shield_active);
    }

    #[test]
    fn lightning_with_nobody_to_hit_fizzles() {
        let mut game = game_with(0);
        game.use_powerup(0, PowerUpKind::Lightning, 0);
        assert!(
            game.events
                .drain()
                .contains(&RaceEvent::LightningFizzled { racer: 1 })
        );
    }

    #[test]
    fn trap_catches_racer_running_into_it() {
        let mut game = game_with(0);
        on_track(&mut game, testkit::flat_track(8000.0));
        let y = state(&game, 1).body.y;
        // The player covers about 500 units during the fuse.
        game.traps.deploy(600.0, y, 9, 0);
        let events = run_ticks(&mut game, 60 * 3, DT);
        assert!(events.iter().any(|e| matches!(
            e,
            RaceEvent::TrapDetonated { caught, .. } if caught == &vec![1]
        )));
        assert!(events.contains(&RaceEvent::Blasted {
            racer: 1,
            threat: Threat::Trap
        }));
        assert!(game.traps().is_empty());
    }

    #[test]
    fn shuriken_knocks_out_racer_ahead() {
        let mut game = game_with(1);
        on_track(&mut game, testkit::flat_track(8000.0));
        let bot = game.index_of(2).unwrap();
        game.use_powerup(bot, PowerUpKind::Shuriken, 0);
        assert_eq!(game.shurikens().len(), 1);
        let events = run_ticks(&mut game, 60 * 3, DT);
        assert!(events.contains(&RaceEvent::Blasted {
            racer: 1,
            threat: Threat::Shuriken
        }));
        assert!(events.iter().any(|e| matches!(
            e,
            RaceEvent::ShurikenDestroyed {
                reason: ShurikenEnd::HitCharacter,
                ..
            }
        )));
        assert!(game.shurikens().is_empty());
    }

    #[test]
    fn long_tick_cannot_step_over_the_finish_line() {
        let mut game = game_with(0);
        on_track(&mut game, testkit::flat_track(8000.0));
        let line = game.track().finish_line_x;
        game.racer_mut(1).unwrap().state_mut().body.x = line - 40.0;

        let events = game.update(0.5);
        assert!(state(&game, 1).body.left() > line);
        assert!(
            events
                .iter()
                .any(|e| matches!(e, RaceEvent::Finished { racer: 1, rank: 1, .. }))
        );
        assert!(game.is_race_complete());
    }

    #[test]
    fn solo_racer_finishing_ends_the_race() {
        let mut game = game_with(0);
        on_track(&mut game, testkit::flat_track(8000.0));
        let line = game.track().finish_line_x;
        game.racer_mut(1).unwrap().state_mut().body.x = line - 100.0;

        let events = run_ticks(&mut game, 60, DT);
        assert!(
            events
                .iter()
                .any(|e| matches!(e, RaceEvent::Finished { racer: 1, rank: 1, .. }))
        );
        assert!(events.contains(&RaceEvent::CameraFollowStopped));
        let summary = events
            .iter()
            .find_map(|e| match e {
                RaceEvent::RaceEnded { summary } => Some(summary.clone()),
                _ => None,
            })
            .expect("race end announced");
        assert_eq!(summary.total_racers, 1);
        assert_eq!(summary.finishers.len(), 1);
        assert!(game.is_race_complete());
        assert!(state(&game, 1).finished);
        assert!(game.update(DT).is_empty());
    }

    #[test]
    fn simultaneous_finish_ranks_lowest_id_first() {
        let mut game = game_with(2);
        on_track(&mut game, testkit::flat_track(8000.0));
        let line = game.track().finish_line_x;
        for id in [3, 1, 2] {
            game.racer_mut(id).unwrap().state_mut().body.x = line - 31.0;
        }
        let events = game.update(DT);
        let ranks: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                RaceEvent::Finished { racer, rank, .. } => Some((*racer, *rank)),
                _ => None,
            })
            .collect();
        assert_eq!(ranks, vec![(1, 1), (2, 2), (3, 3)]);
    }

    #[test]
    fn snapshot_decodes() {
        let mut game = game_with(3);
        run_ticks(&mut game, 30, DT);
        let snap = RaceSnapshot::decode(&game.snapshot()).unwrap();
        assert_eq!(snap, game.build_snapshot());
        assert_eq!(snap.racers.len(), 4);
        assert_eq!(snap.racers[1].personality, Some(Personality::Aggressive));
    }

    // ================================================================
    // RaceGame contract
    // ================================================================

    #[test]
    fn contract_init_lists_racers() {
        let mut game = PowerDash::with_config(RaceConfig::default());
        contract_init_lists_every_racer(&mut game, 4);
    }

    #[test]
    fn contract_update_advances() {
        let mut game = game_with(2);
        contract_update_advances_time(&mut game);
    }

    #[test]
    fn contract_pause() {
        let mut game = game_with(2);
        contract_pause_stops_updates(&mut game);
    }

    #[test]
    fn contract_race_completes() {
        let mut game = game_with(4);
        contract_race_eventually_completes(&mut game, 60 * 600, DT);
        let standings = contract_standings_are_dense(&game);
        assert!(standings.iter().take(3).all(|s| s.finished));
    }

    #[test]
    fn contract_racer_left() {
        let mut game = game_with(3);
        run_ticks(&mut game, 10, DT);
        contract_racer_left_cleanup(&mut game, 3);
        contract_standings_are_dense(&game);
    }
}

use serde::{Deserialize, Serialize};

use powerdash_core::game_trait::EntityId;
use powerdash_core::rng::Roll;

use crate::character::{Character, Intent, RacerState, TickView};
use crate::config::{BotConfig, RaceConfig, ShakeConfig, ShakeProfile};
use crate::physics::Body;
use crate::platform::{MovingPlatform, PlatformId};
use crate::powerups::CollectPolicy;
use crate::track::Track;

/// Share of mistakes that swallow a needed jump.
const SUPPRESS_SHARE: f64 = 0.3;
/// Upper bound (cumulative) of mistakes that become a mistimed jump.
const MISTIME_SHARE: f64 = 0.6;
/// Chance a mistimed jump actually fires.
const MISTIMED_JUMP_CHANCE: f64 = 0.7;
/// Erratic bots consider a random jump after this much time.
const ERRATIC_INTERVAL_MS: u64 = 3000;
const ERRATIC_JUMP_CHANCE: f64 = 0.08;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Personality {
    Aggressive,
    Cautious,
    Erratic,
    Balanced,
}

/// Fixed tuning for one personality.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PersonalityTraits {
    pub speed_multiplier: f64,
    pub jump_early_multiplier: f64,
    pub mistake_chance: f64,
    pub reaction_time_multiplier: f64,
}

impl PersonalityTraits {
    /// Scale a base lookahead distance.
    pub fn lookahead(&self, base: f64) -> f64 {
        base * self.jump_early_multiplier * self.reaction_time_multiplier
    }
}

impl Personality {
    pub const ALL: [Personality; 4] = [
        Personality::Aggressive,
        Personality::Cautious,
        Personality::Erratic,
        Personality::Balanced,
    ];

    /// Personality for the n-th bot on the grid.
    pub fn for_index(index: usize) -> Self {
        Self::ALL[index % Self::ALL.len()]
    }

    pub fn traits(self) -> PersonalityTraits {
        let (speed, early, mistake, reaction) = match self {
            Personality::Aggressive => (1.05, 1.2, 0.15, 0.9),
            Personality::Cautious => (0.95, 0.8, 0.05, 1.1),
            Personality::Erratic => (0.98, 1.0, 0.20, 1.0),
            Personality::Balanced => (1.0, 1.0, 0.05, 1.0),
        };
        PersonalityTraits {
            speed_multiplier: speed,
            jump_early_multiplier: early,
            mistake_chance: mistake,
            reaction_time_multiplier: reaction,
        }
    }
}

/// Personality-adjusted detection ranges.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Lookahead {
    pub wall: f64,
    pub gap: f64,
    pub platform: f64,
}

impl Lookahead {
    pub fn new(cfg: &BotConfig, traits: &PersonalityTraits) -> Self {
        Self {
            wall: traits.lookahead(cfg.wall_lookahead),
            gap: traits.lookahead(cfg.gap_lookahead),
            platform: traits.lookahead(cfg.platform_lookahead),
        }
    }
}

/// The obstacle that triggered a jump decision.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Obstacle {
    Gap { distance: f64 },
    Wall { index: usize, distance: f64 },
    Platform { id: PlatformId, distance: f64 },
}

/// Look for something to jump over, in order gap, wall, platform.
pub fn scan_ahead(
    body: &Body,
    track: &Track,
    platforms: &[MovingPlatform],
    reach: &Lookahead,
) -> Option<Obstacle> {
    let (left, right) = (body.left(), body.right());

    if let Some(distance) = track.gap_ahead(left, right)
        && distance > 0.0
        && distance < reach.gap
    {
        return Some(Obstacle::Gap { distance });
    }

    // Walls are sorted by x, so the first one ahead is the nearest.
    if let Some((index, wall)) = track
        .walls
        .iter()
        .enumerate()
        .find(|(_, w)| w.left() > right)
    {
        let distance = wall.left() - right;
        if distance < reach.wall {
            return Some(Obstacle::Wall { index, distance });
        }
    }

    platforms
        .iter()
        .enumerate()
        .filter(|(_, p)| p.left() > right && p.top() < body.bottom())
        .map(|(id, p)| (id, p.left() - right))
        .filter(|&(_, distance)| distance < reach.platform)
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(id, distance)| Obstacle::Platform { id, distance })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mistake {
    /// A needed jump was swallowed.
    Suppressed,
    /// Jumped (or not) on a coin weighted toward jumping, regardless of need.
    Mistimed,
    /// Decision left alone; only logged.
    ContextError,
}

/// Perturb a jump decision with probability `chance`.
pub fn inject_mistake(should_jump: bool, chance: f64, rng: &mut dyn Roll) -> (bool, Option<Mistake>) {
    if rng.roll() >= chance {
        return (should_jump, None);
    }
    let kind = rng.roll();
    if kind < SUPPRESS_SHARE {
        (false, Some(Mistake::Suppressed))
    } else if kind < MISTIME_SHARE {
        (rng.roll() < MISTIMED_JUMP_CHANCE, Some(Mistake::Mistimed))
    } else {
        (should_jump, Some(Mistake::ContextError))
    }
}

/// Outcome of one decision pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub obstacle: Option<Obstacle>,
    pub mistake: Option<Mistake>,
    pub forced: bool,
    pub should_jump: bool,
}

/// Per-bot decision state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BotBrain {
    pub personality: Personality,
    pub traits: PersonalityTraits,
    pub mistake_timer_ms: u64,
    pub last_jump_ms: Option<u64>,
    pub last_decision: Decision,
}

impl BotBrain {
    pub fn new(personality: Personality) -> Self {
        Self {
            personality,
            traits: personality.traits(),
            mistake_timer_ms: 0,
            last_jump_ms: None,
            last_decision: Decision::default(),
        }
    }

    /// Run one tick of the decision engine for a racer in `state`.
    pub fn decide(&mut self, state: &RacerState, view: &TickView<'_>, rng: &mut dyn Roll) -> Decision {
        if self.personality == Personality::Erratic {
            self.mistake_timer_ms += view.dt_ms;
        }
        if !state.can_jump(view.now_ms, view.config.platforms.contact_grace_ms) {
            return Decision::default();
        }

        let reach = Lookahead::new(&view.config.bot, &self.traits);
        let obstacle = scan_ahead(&state.body, view.track, view.platforms, &reach);
        let (mut should_jump, mistake) =
            inject_mistake(obstacle.is_some(), self.traits.mistake_chance, rng);
        if mistake == Some(Mistake::ContextError) {
            tracing::debug!(
                racer = state.id,
                personality = ?self.personality,
                obstacle = ?obstacle,
                "Bot context error"
            );
        }

        let mut forced = false;
        if self.personality == Personality::Erratic && self.mistake_timer_ms > ERRATIC_INTERVAL_MS {
            forced = rng.roll() < ERRATIC_JUMP_CHANCE;
            self.mistake_timer_ms = 0;
        }
        should_jump |= forced;

        if should_jump {
            self.last_jump_ms = Some(view.now_ms);
        }
        let decision = Decision {
            obstacle,
            mistake,
            forced,
            should_jump,
        };
        self.last_decision = decision;
        decision
    }
}

/// An AI-controlled racer.
#[derive(Debug, Clone)]
pub struct Bot {
    state: RacerState,
    name: String,
    brain: BotBrain,
}

impl Bot {
    pub fn new(
        id: EntityId,
        name: impl Into<String>,
        personality: Personality,
        config: &RaceConfig,
    ) -> Self {
        let speed = personality.traits().speed_multiplier;
        Self {
            state: RacerState::new(
                id,
                config.rules.bot_start_x,
                config.speed.bot_normal * speed,
                config.speed.bot_boosted * speed,
                &config.physics,
            ),
            name: name.into(),
            brain: BotBrain::new(personality),
        }
    }

    pub fn brain(&self) -> &BotBrain {
        &self.brain
    }
}

impl Character for Bot {
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
        true
    }

    fn think(&mut self, view: &TickView<'_>, rng: &mut dyn Roll) -> Intent {
        if self
            .state
            .is_grounded(view.now_ms, view.config.platforms.contact_grace_ms)
            && !self.state.is_falling()
        {
            self.state.record_safe_ground(view.track);
        }
        let decision = self.brain.decide(&self.state, view, rng);
        Intent {
            jump: decision.should_jump,
            use_powerup: false,
        }
    }

    fn collect_policy(&self) -> CollectPolicy {
        CollectPolicy::UseImmediately
    }

    fn wall_shake(&self, shake: &ShakeConfig) -> ShakeProfile {
        shake.bot
    }

    fn personality(&self) -> Option<Personality> {
        Some(self.brain.personality)
    }
}

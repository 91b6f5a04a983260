use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Stable identifier for a racer (or any other simulated entity).
///
/// Ids are assigned by the caller of [`RaceGame::init`] and never reused
/// within a race, so they double as the deterministic tie-break key.
pub type EntityId = u64;

/// Core trait implemented by a race simulation.
///
/// The presentation layer owns rendering, input capture and scene flow;
/// the race only advances its simulation and reports what happened.
pub trait RaceGame: Send + Sync {
    /// Outbound notifications produced by a tick.
    type Event: Clone + Serialize;

    /// Race metadata for the menu screen.
    fn metadata(&self) -> GameMetadata;

    /// Called once when the racers are on the grid.
    fn init(&mut self, racers: &[super::player::Racer], setup: &RaceSetup);

    /// Advance the simulation by `dt` seconds. Returns events drained this tick.
    fn update(&mut self, dt: f32) -> Vec<Self::Event>;

    /// Serialize a read-only snapshot for the presentation layer.
    fn snapshot(&self) -> Vec<u8>;

    /// Apply a human racer's encoded input.
    fn apply_input(&mut self, racer_id: EntityId, input: &[u8]);

    /// Called when a racer is torn down mid-race. Any pending timed effect
    /// referencing the racer must be discarded with it.
    fn racer_left(&mut self, racer_id: EntityId);

    /// Simulation tick rate in Hz.
    fn tick_rate(&self) -> f32 {
        60.0
    }

    fn pause(&mut self);

    fn resume(&mut self);

    /// Whether the race has ended.
    fn is_race_complete(&self) -> bool;

    /// Live ordering of every racer, usable every frame.
    fn standings(&self) -> Vec<Standing>;
}

/// Race metadata for the menu screen.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameMetadata {
    pub name: String,
    pub description: String,
    pub min_racers: u8,
    pub max_racers: u8,
    pub estimated_race_duration: Duration,
}

/// Per-race setup supplied by the menu flow.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RaceSetup {
    /// Free-form overrides (`seed`, `layout`, ...).
    pub custom: HashMap<String, serde_json::Value>,
}

impl RaceSetup {
    pub fn custom_u64(&self, key: &str) -> Option<u64> {
        self.custom.get(key).and_then(|v| v.as_u64())
    }

    pub fn custom_str(&self, key: &str) -> Option<&str> {
        self.custom.get(key).and_then(|v| v.as_str())
    }
}

/// One row of the live leaderboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Standing {
    pub racer_id: EntityId,
    /// 1-based place.
    pub place: usize,
    pub x: f64,
    pub finished: bool,
}

use serde::{Deserialize, Serialize};

use crate::game_trait::EntityId;

/// A racer entered into a race, human or bot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Racer {
    pub id: EntityId,
    pub display_name: String,
    pub color: RacerColor,
    /// Exactly one racer per race is expected to be human-controlled.
    pub is_human: bool,
}

/// Tint used by the presentation layer for sprites and leaderboard rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RacerColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Default for RacerColor {
    fn default() -> Self {
        Self::GRID[0]
    }
}

impl RacerColor {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Grid colours in starting order. The human always gets the first.
    pub const GRID: [RacerColor; 8] = [
        RacerColor::rgb(66, 135, 245),
        RacerColor::rgb(235, 64, 52),
        RacerColor::rgb(250, 204, 21),
        RacerColor::rgb(34, 197, 94),
        RacerColor::rgb(168, 85, 247),
        RacerColor::rgb(249, 115, 22),
        RacerColor::rgb(20, 184, 166),
        RacerColor::rgb(236, 72, 153),
    ];

    pub fn for_index(index: usize) -> Self {
        Self::GRID[index % Self::GRID.len()]
    }
}

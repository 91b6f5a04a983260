use std::path::Path;

use serde::{Deserialize, Serialize};

/// Environment variable naming an alternate config file.
pub const CONFIG_ENV_VAR: &str = "POWERDASH_CONFIG";
/// Config file consulted when the env var is unset.
pub const DEFAULT_CONFIG_PATH: &str = "config/powerdash.toml";

/// Arcade physics and body dimensions. Screen coordinates: +y points down.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    /// Downward acceleration (units/s^2).
    pub gravity: f64,
    /// Vertical velocity applied on jump (negative = up).
    pub jump_velocity: f64,
    /// Y of the top surface of every ground segment.
    pub ground_top_y: f64,
    pub ground_segment_height: f64,
    /// Extra depth below the ground slab before a fall counts.
    pub fall_death_buffer: f64,
    pub world_height: f64,
    pub character_width: f64,
    pub character_height: f64,
    pub wall_width: f64,
    pub wall_height: f64,
    /// Integration substeps per tick.
    pub substeps: u32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            gravity: 400.0,
            jump_velocity: -300.0,
            ground_top_y: 400.0,
            ground_segment_height: 50.0,
            fall_death_buffer: 20.0,
            world_height: 600.0,
            character_width: 64.0,
            character_height: 56.0,
            wall_width: 32.0,
            wall_height: 96.0,
            substeps: 4,
        }
    }
}

impl PhysicsConfig {
    /// Y beyond which a character is considered to have fallen off the course.
    pub fn fall_death_y(&self) -> f64 {
        self.ground_top_y + self.ground_segment_height + self.fall_death_buffer
    }

    /// Centre Y of a character standing on the ground.
    pub fn standing_y(&self) -> f64 {
        self.ground_top_y - self.character_height / 2.0
    }
}

/// Running speeds (units/s).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeedConfig {
    pub player_normal: f64,
    pub player_boosted: f64,
    pub bot_normal: f64,
    pub bot_boosted: f64,
}

impl Default for SpeedConfig {
    fn default() -> Self {
        Self {
            player_normal: 250.0,
            player_boosted: 400.0,
            bot_normal: 249.0,
            bot_boosted: 390.0,
        }
    }
}

/// Base distances the bot engine scales by personality.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    pub wall_lookahead: f64,
    pub gap_lookahead: f64,
    pub platform_lookahead: f64,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            wall_lookahead: 95.0,
            gap_lookahead: 90.0,
            platform_lookahead: 90.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PowerupConfig {
    pub speed_duration_ms: u64,
    pub stun_duration_ms: u64,
    /// Overlap radius between a character centre and a pickup.
    pub pickup_radius: f64,
    /// Minimum gap between two collections of one pickup by one character.
    pub recollect_cooldown_ms: u64,
}

impl Default for PowerupConfig {
    fn default() -> Self {
        Self {
            speed_duration_ms: 5000,
            stun_duration_ms: 1500,
            pickup_radius: 32.0,
            recollect_cooldown_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HazardConfig {
    pub trap_fuse_ms: u64,
    pub trap_scan_interval_ms: u64,
    pub trap_blast_radius: f64,
    pub shuriken_speed: f64,
    pub shuriken_hit_radius: f64,
    pub shuriken_wall_radius: f64,
    /// Distance ahead of the thrower a shuriken spawns at.
    pub shuriken_spawn_offset: f64,
}

impl Default for HazardConfig {
    fn default() -> Self {
        Self {
            trap_fuse_ms: 2000,
            trap_scan_interval_ms: 100,
            trap_blast_radius: 100.0,
            shuriken_speed: 400.0,
            shuriken_hit_radius: 40.0,
            shuriken_wall_radius: 30.0,
            shuriken_spawn_offset: 40.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RespawnConfig {
    pub delay_ms: u64,
    /// Gap kept between a respawned body and the end of its safe segment.
    pub edge_buffer: f64,
}

impl Default for RespawnConfig {
    fn default() -> Self {
        Self {
            delay_ms: 2000,
            edge_buffer: 5.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformConfig {
    /// How long after platform contact a jump is still accepted.
    pub contact_grace_ms: u64,
    /// How far below a platform top feet may sink and still be snapped up.
    pub snap_tolerance: f64,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            contact_grace_ms: 100,
            snap_tolerance: 12.0,
        }
    }
}

/// Which track builder to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackLayout {
    Procedural,
    Fixed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackConfig {
    pub width: f64,
    pub layout: TrackLayout,
    pub start_zone_width: f64,
    pub finish_zone_width: f64,
    pub buffer_min: f64,
    pub buffer_max: f64,
    /// Finish line position as a fraction of track width.
    pub finish_line_ratio: f64,
    pub finish_line_width: f64,
    /// Progress ratio below which easy patterns are drawn.
    pub easy_below: f64,
    /// Progress ratio below which medium patterns are drawn.
    pub medium_below: f64,
}

impl Default for TrackConfig {
    fn default() -> Self {
        Self {
            width: 8000.0,
            layout: TrackLayout::Procedural,
            start_zone_width: 400.0,
            finish_zone_width: 1000.0,
            buffer_min: 50.0,
            buffer_max: 150.0,
            finish_line_ratio: 0.9,
            finish_line_width: 10.0,
            easy_below: 0.3,
            medium_below: 0.7,
        }
    }
}

impl TrackConfig {
    pub fn finish_line_x(&self) -> f64 {
        self.width * self.finish_line_ratio
    }
}

/// Camera shake requested when a character runs into a wall.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShakeProfile {
    pub intensity: f64,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShakeConfig {
    pub player: ShakeProfile,
    pub bot: ShakeProfile,
    pub trap: ShakeProfile,
}

impl Default for ShakeConfig {
    fn default() -> Self {
        Self {
            player: ShakeProfile {
                intensity: 0.01,
                duration_ms: 150,
            },
            bot: ShakeProfile {
                intensity: 0.005,
                duration_ms: 100,
            },
            trap: ShakeProfile {
                intensity: 0.02,
                duration_ms: 300,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RulesConfig {
    /// Finishers needed to end the race.
    pub podium_size: usize,
    /// Lifetime of the on-screen rank callout.
    pub callout_ms: u64,
    pub player_start_x: f64,
    pub bot_start_x: f64,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            podium_size: 3,
            callout_ms: 3000,
            player_start_x: 100.0,
            bot_start_x: 50.0,
        }
    }
}

/// Top-level race configuration, loadable from TOML.
///
/// Built once and handed to every component by reference.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RaceConfig {
    pub physics: PhysicsConfig,
    pub speed: SpeedConfig,
    pub bot: BotConfig,
    pub powerups: PowerupConfig,
    pub hazards: HazardConfig,
    pub respawn: RespawnConfig,
    pub platforms: PlatformConfig,
    pub track: TrackConfig,
    pub shake: ShakeConfig,
    pub rules: RulesConfig,
}

/// Failure to produce a usable [`RaceConfig`].
#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: String,
        source: std::io::Error,
    },
    Parse(toml::de::Error),
    Invalid(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => write!(f, "failed to read {path}: {source}"),
            Self::Parse(e) => write!(f, "invalid TOML: {e}"),
            Self::Invalid(m) => write!(f, "invalid config: {m}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse(e) => Some(e),
            Self::Invalid(_) => None,
        }
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(e: toml::de::Error) -> Self {
        Self::Parse(e)
    }
}

impl RaceConfig {
    /// Parse and validate a TOML document. Missing keys take defaults.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let cfg: RaceConfig = toml::from_str(content)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Load config from the env-named file or the default path. Falls back to
    /// defaults if the file is missing, unparseable, or fails validation.
    pub fn load() -> Self {
        let path =
            std::env::var(CONFIG_ENV_VAR).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        match Self::from_path(&path) {
            Ok(cfg) => cfg,
            Err(ConfigError::Io { .. }) => {
                tracing::debug!(path = %path, "No race config file, using defaults");
                Self::default()
            },
            Err(e) => {
                tracing::warn!("Failed to load {path}: {e}, using defaults");
                Self::default()
            },
        }
    }

    /// Reject combinations the simulation cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let t = &self.track;
        if t.start_zone_width + t.finish_zone_width >= t.width {
            return Err(ConfigError::Invalid(format!(
                "track width {} leaves no room between start zone {} and finish zone {}",
                t.width, t.start_zone_width, t.finish_zone_width
            )));
        }
        if t.finish_line_x() < t.width - t.finish_zone_width || t.finish_line_x() >= t.width {
            return Err(ConfigError::Invalid(format!(
                "finish line at {} must lie inside the finish zone",
                t.finish_line_x()
            )));
        }
        if t.buffer_min < 0.0 || t.buffer_min > t.buffer_max {
            return Err(ConfigError::Invalid(format!(
                "buffer range {}..{} is empty",
                t.buffer_min, t.buffer_max
            )));
        }
        if !(0.0..=1.0).contains(&t.easy_below) || t.easy_below > t.medium_below {
            return Err(ConfigError::Invalid(
                "difficulty thresholds must satisfy 0 <= easy <= medium <= 1".to_string(),
            ));
        }
        let p = &self.physics;
        if p.substeps == 0 {
            return Err(ConfigError::Invalid("substeps must be at least 1".to_string()));
        }
        if p.gravity <= 0.0 || p.jump_velocity >= 0.0 {
            return Err(ConfigError::Invalid(
                "gravity must pull down and jump velocity must point up".to_string(),
            ));
        }
        if self.rules.podium_size == 0 {
            return Err(ConfigError::Invalid("podium size must be non-zero".to_string()));
        }
        if self.hazards.trap_scan_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "trap scan interval must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

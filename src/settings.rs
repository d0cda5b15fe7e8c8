//! Simulation tuning
//!
//! Every balance knob the simulation consults lives here. Values are plain
//! data so a level pack can ship its own JSON overrides; missing fields fall
//! back to the defaults.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Simulation tuning values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // === AI ===
    /// Radius (world units) within which hostile units pursue the player
    pub detection_range: f32,
    /// Minimum time between two path computations for one unit
    pub path_recompute_ms: u64,
    /// Per-tick fire probability while pursuing
    pub pursuit_fire_chance: f64,
    /// Per-tick fire probability while patrolling and moving
    pub patrol_fire_chance: f64,
    /// Probability of stopping when a patrol leg ends
    pub patrol_stop_chance: f64,
    /// Patrol pause length range (inclusive)
    pub patrol_stop_min_ms: u64,
    pub patrol_stop_max_ms: u64,
    /// Patrol leg length range (inclusive)
    pub patrol_move_min_ms: u64,
    pub patrol_move_max_ms: u64,

    // === Power-ups ===
    /// Age after which a power-up starts blinking
    pub powerup_blink_ms: u64,
    /// Age after which an uncollected power-up disappears
    pub powerup_lifespan_ms: u64,
    /// Time between power-up spawn attempts
    pub powerup_spawn_interval_ms: u64,
    /// Maximum power-ups on the field at once
    pub max_powerups: usize,

    // === Waves ===
    /// Time between hostile reinforcement attempts
    pub reinforcement_interval_ms: u64,
    /// Maximum hostile units alive at once
    pub max_active_enemies: usize,

    // === Player ===
    /// Lives per player slot, including the first spawn
    pub player_lives: u32,
    /// Delay before a destroyed player unit returns
    pub respawn_delay_ms: u64,
    /// Invincibility granted on every player spawn (seconds)
    pub spawn_invincibility_secs: f32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            detection_range: 350.0,
            path_recompute_ms: 2000,
            pursuit_fire_chance: 0.3,
            patrol_fire_chance: 0.1,
            patrol_stop_chance: 0.2,
            patrol_stop_min_ms: 500,
            patrol_stop_max_ms: 2000,
            patrol_move_min_ms: 2000,
            patrol_move_max_ms: 4000,

            powerup_blink_ms: 3000,
            powerup_lifespan_ms: 5000,
            powerup_spawn_interval_ms: 10_000,
            max_powerups: 2,

            reinforcement_interval_ms: 3000,
            max_active_enemies: 4,

            player_lives: 3,
            respawn_delay_ms: 2000,
            spawn_invincibility_secs: 3.0,
        }
    }
}

impl Settings {
    /// Parse settings from JSON; absent fields keep their defaults
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let settings: Settings = serde_json::from_str(json)?;
        Ok(settings.sanitized())
    }

    /// Load settings from a JSON file, falling back to defaults on any error
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(json) => match Self::from_json(&json) {
                Ok(settings) => {
                    log::info!("Loaded settings from {}", path.display());
                    settings
                }
                Err(err) => {
                    log::warn!("Invalid settings in {}: {err}; using defaults", path.display());
                    Self::default()
                }
            },
            Err(err) => {
                log::info!("No settings at {} ({err}); using defaults", path.display());
                Self::default()
            }
        }
    }

    /// Repair inverted ranges and out-of-range probabilities
    pub fn sanitized(mut self) -> Self {
        if self.patrol_stop_min_ms > self.patrol_stop_max_ms {
            std::mem::swap(&mut self.patrol_stop_min_ms, &mut self.patrol_stop_max_ms);
        }
        if self.patrol_move_min_ms > self.patrol_move_max_ms {
            std::mem::swap(&mut self.patrol_move_min_ms, &mut self.patrol_move_max_ms);
        }
        self.pursuit_fire_chance = self.pursuit_fire_chance.clamp(0.0, 1.0);
        self.patrol_fire_chance = self.patrol_fire_chance.clamp(0.0, 1.0);
        self.patrol_stop_chance = self.patrol_stop_chance.clamp(0.0, 1.0);
        self.powerup_blink_ms = self.powerup_blink_ms.min(self.powerup_lifespan_ms);
        self.detection_range = self.detection_range.max(0.0);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let settings = Settings::from_json(r#"{ "detection_range": 200.0 }"#).unwrap();
        assert_eq!(settings.detection_range, 200.0);
        assert_eq!(settings.path_recompute_ms, 2000);
        assert_eq!(settings.powerup_lifespan_ms, 5000);
    }

    #[test]
    fn test_sanitized_swaps_ranges() {
        let settings = Settings {
            patrol_stop_min_ms: 900,
            patrol_stop_max_ms: 100,
            pursuit_fire_chance: 4.0,
            ..Default::default()
        }
        .sanitized();
        assert_eq!(settings.patrol_stop_min_ms, 100);
        assert_eq!(settings.patrol_stop_max_ms, 900);
        assert_eq!(settings.pursuit_fire_chance, 1.0);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let settings = Settings::load_or_default("/nonexistent/tank-arena.json");
        assert_eq!(settings, Settings::default());
    }
}

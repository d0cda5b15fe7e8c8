//! Save/restore of a running level
//!
//! Features:
//! - Versioned JSON envelope
//! - Relative timestamps (time since last shot, power-up age) so a snapshot
//!   is independent of the clock it was taken on
//! - Unknown effect, power-up and archetype names are skipped with a warning
//!   instead of failing the whole load

use std::collections::BTreeMap;

use glam::IVec2;
use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::settings::Settings;
use crate::sim::ai::AiBrain;
use crate::sim::bullet::Bullet;
use crate::sim::geom::Direction;
use crate::sim::level::Level;
use crate::sim::powerup::{PowerUp, PowerUpKind};
use crate::sim::state::{GamePhase, GameState, IdGen, PlayerSlot};
use crate::sim::tank::{Archetype, Faction, Tank};

/// Current snapshot format
pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("snapshot is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unsupported snapshot version {found}, expected {}", SNAPSHOT_VERSION)]
    UnsupportedVersion { found: u32 },
}

/// A record that was dropped while restoring
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LoadWarning {
    #[error("unit {unit}: unknown effect {name:?}")]
    UnknownEffect { unit: u32, name: String },
    #[error("power-up {id}: unknown kind {name:?}")]
    UnknownPowerUp { id: u32, name: String },
    #[error("unit {unit}: unknown archetype {name:?}")]
    UnknownArchetype { unit: u32, name: String },
    #[error("player slot {slot} has no spawn point in this level")]
    NoSpawnForPlayer { slot: usize },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitRecord {
    pub id: u32,
    pub faction: Faction,
    pub archetype: String,
    pub pos: IVec2,
    pub direction: Direction,
    pub health: u32,
    /// None if the unit has never fired
    pub since_last_fire_ms: Option<u64>,
    /// Remaining seconds per effect name
    pub effects: BTreeMap<String, f32>,
    pub player_slot: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PowerUpRecord {
    pub id: u32,
    pub kind: String,
    pub pos: IVec2,
    pub age_ms: u64,
    pub collected: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerRecord {
    pub lives: u32,
    pub respawn_in_ms: Option<u64>,
}

/// Serializable picture of a level in progress
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveSnapshot {
    pub version: u32,
    pub elapsed_ms: u64,
    pub seed: u64,
    pub phase: GamePhase,
    pub score: u64,
    pub enemies_destroyed: u32,
    pub players: Vec<PlayerRecord>,
    pub pending_enemies: Vec<String>,
    pub reinforcement_in_ms: u64,
    pub powerup_in_ms: u64,
    pub next_id: u32,
    pub units: Vec<UnitRecord>,
    pub bullets: Vec<Bullet>,
    pub powerups: Vec<PowerUpRecord>,
}

impl SaveSnapshot {
    pub fn to_json(&self) -> Result<String, SnapshotError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, SnapshotError> {
        let snapshot: Self = serde_json::from_str(json)?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(SnapshotError::UnsupportedVersion {
                found: snapshot.version,
            });
        }
        Ok(snapshot)
    }
}

/// Capture `state`. AI memory is not saved; restored hostiles start fresh.
pub fn save(state: &GameState) -> SaveSnapshot {
    let now = state.now_ms;
    let units = state
        .tanks
        .iter()
        .map(|t| UnitRecord {
            id: t.id,
            faction: t.faction,
            archetype: t.archetype.label().to_string(),
            pos: t.pos,
            direction: t.direction,
            health: t.health,
            since_last_fire_ms: t.last_fire_ms.map(|at| now.saturating_sub(at)),
            effects: t
                .effects
                .iter()
                .map(|(kind, secs)| (kind.label().to_string(), *secs))
                .collect(),
            player_slot: t.player_slot,
        })
        .collect();
    let powerups = state
        .powerups
        .iter()
        .map(|p| PowerUpRecord {
            id: p.id,
            kind: p.kind.label().to_string(),
            pos: p.pos,
            age_ms: p.age_ms(now),
            collected: p.collected,
        })
        .collect();

    SaveSnapshot {
        version: SNAPSHOT_VERSION,
        elapsed_ms: now,
        seed: state.seed,
        phase: state.phase,
        score: state.score,
        enemies_destroyed: state.enemies_destroyed,
        players: state
            .players
            .iter()
            .map(|p| PlayerRecord {
                lives: p.lives,
                respawn_in_ms: p.respawn_at_ms.map(|at| at.saturating_sub(now)),
            })
            .collect(),
        pending_enemies: state
            .pending_enemies
            .iter()
            .map(|a| a.label().to_string())
            .collect(),
        reinforcement_in_ms: state.next_reinforcement_ms.saturating_sub(now),
        powerup_in_ms: state.next_powerup_ms.saturating_sub(now),
        next_id: state.ids.peek(),
        units,
        bullets: state.bullets.clone(),
        powerups,
    }
}

/// Rebuild a level from `snapshot` on top of its static `level` data.
///
/// Timestamps are re-anchored to the restored clock. Records that cannot be
/// interpreted are dropped and reported.
pub fn restore(
    snapshot: &SaveSnapshot,
    level: Level,
    settings: Settings,
) -> (GameState, Vec<LoadWarning>) {
    let settings = settings.sanitized();
    let now = snapshot.elapsed_ms;
    let mut warnings = Vec::new();

    let mut tanks = Vec::with_capacity(snapshot.units.len());
    for record in &snapshot.units {
        let Some(archetype) = Archetype::from_label(&record.archetype) else {
            warnings.push(LoadWarning::UnknownArchetype {
                unit: record.id,
                name: record.archetype.clone(),
            });
            continue;
        };
        let mut tank = Tank::new(
            record.id,
            record.faction,
            archetype,
            record.pos,
            record.direction,
        );
        tank.health = record.health.min(tank.max_health());
        tank.last_fire_ms = record
            .since_last_fire_ms
            .map(|since| now.saturating_sub(since));
        tank.player_slot = record.player_slot;
        if record.faction == Faction::Hostile && record.player_slot.is_none() {
            let mut brain = AiBrain::default();
            brain.patrol.phase_started_ms = now;
            tank.brain = Some(brain);
        }
        for (name, secs) in &record.effects {
            // Health and Bomb apply instantly and are never held as effects
            match PowerUpKind::from_label(name).filter(|kind| kind.is_timed()) {
                Some(kind) => tank.add_effect(kind, *secs),
                None => warnings.push(LoadWarning::UnknownEffect {
                    unit: record.id,
                    name: name.clone(),
                }),
            }
        }
        tanks.push(tank);
    }

    let mut powerups = Vec::with_capacity(snapshot.powerups.len());
    for record in &snapshot.powerups {
        let Some(kind) = PowerUpKind::from_label(&record.kind) else {
            warnings.push(LoadWarning::UnknownPowerUp {
                id: record.id,
                name: record.kind.clone(),
            });
            continue;
        };
        let mut powerup = PowerUp::new(
            record.id,
            kind,
            record.pos,
            now.saturating_sub(record.age_ms),
            settings.powerup_blink_ms,
            settings.powerup_lifespan_ms,
        );
        powerup.collected = record.collected;
        powerups.push(powerup);
    }

    let pending_enemies = snapshot
        .pending_enemies
        .iter()
        .filter_map(|name| {
            let archetype = Archetype::from_label(name);
            if archetype.is_none() {
                warnings.push(LoadWarning::UnknownArchetype {
                    unit: 0,
                    name: name.clone(),
                });
            }
            archetype
        })
        .collect();

    let spawns = level.player_spawns.len();
    for slot in spawns..snapshot.players.len() {
        warnings.push(LoadWarning::NoSpawnForPlayer { slot });
    }
    let players = snapshot
        .players
        .iter()
        .take(spawns)
        .map(|p| PlayerSlot {
            lives: p.lives,
            respawn_at_ms: p.respawn_in_ms.map(|delay| now + delay),
        })
        .collect();

    // Never hand out an id that is already in use
    let highest = tanks
        .iter()
        .map(|t| t.id)
        .chain(snapshot.bullets.iter().map(|b| b.id))
        .chain(powerups.iter().map(|p| p.id))
        .max()
        .unwrap_or(0);

    let state = GameState {
        seed: snapshot.seed,
        now_ms: now,
        time_ticks: 0,
        phase: snapshot.phase,
        tanks,
        bullets: snapshot.bullets.clone(),
        powerups,
        players,
        pending_enemies,
        score: snapshot.score,
        enemies_destroyed: snapshot.enemies_destroyed,
        next_reinforcement_ms: now + snapshot.reinforcement_in_ms,
        next_powerup_ms: now + snapshot.powerup_in_ms,
        rng: Pcg32::seed_from_u64(snapshot.seed.wrapping_add(now)),
        ids: IdGen::starting_at(snapshot.next_id.max(highest + 1)),
        spawn_cursor: 0,
        level,
        settings,
    };

    for warning in &warnings {
        log::warn!("Snapshot restore: {warning}");
    }
    log::info!(
        "Restored level at {} ms: {} units, {} bullets, {} power-ups",
        now,
        state.tanks.len(),
        state.bullets.len(),
        state.powerups.len()
    );
    (state, warnings)
}

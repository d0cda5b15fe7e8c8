//! Game state and core simulation types
//!
//! `GameState` owns every live entity of a level. Presentation reads a
//! [`RenderView`] copied out between ticks; only the tick mutates state.

use std::collections::VecDeque;

use glam::IVec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::bullet::{Bullet, BulletEnd};
use super::collision::Collider;
use super::geom::{Direction, Rect};
use super::level::Level;
use super::powerup::{PowerUp, PowerUpKind};
use super::tank::{Archetype, Faction, Tank};
use crate::consts::{CELL_SIZE, POWERUP_SIZE, TANK_SIZE};
use crate::settings::Settings;

/// Current phase of a level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    Playing,
    /// Roster exhausted and every hostile unit destroyed
    Victory,
    /// Every player unit destroyed with no lives left
    Defeat,
}

/// Discrete outcomes of a tick, for score/audio/effects collaborators
#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    UnitSpawned {
        id: u32,
        faction: Faction,
        archetype: Archetype,
        pos: IVec2,
    },
    UnitDestroyed {
        id: u32,
        faction: Faction,
        archetype: Archetype,
        pos: IVec2,
        /// Unit credited with the kill
        by: Option<u32>,
    },
    BulletSpawned {
        id: u32,
        owner: u32,
        faction: Faction,
    },
    BulletRemoved {
        id: u32,
        reason: BulletEnd,
    },
    PowerUpSpawned {
        id: u32,
        kind: PowerUpKind,
        pos: IVec2,
    },
    PowerUpCollected {
        id: u32,
        kind: PowerUpKind,
        by: u32,
    },
    PowerUpExpired {
        id: u32,
        kind: PowerUpKind,
    },
    BombDetonated {
        by: u32,
        destroyed: u32,
    },
    PhaseChanged {
        phase: GamePhase,
    },
}

/// Monotonic entity id source shared by units, bullets and power-ups
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdGen {
    next: u32,
}

impl Default for IdGen {
    fn default() -> Self {
        Self { next: 1 }
    }
}

impl IdGen {
    pub fn starting_at(next: u32) -> Self {
        Self { next: next.max(1) }
    }

    pub fn allocate(&mut self) -> u32 {
        let id = self.next;
        self.next += 1;
        id
    }

    pub fn peek(&self) -> u32 {
        self.next
    }
}

/// Lives bookkeeping for one input slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerSlot {
    /// Spawns left after the current unit
    pub lives: u32,
    /// When a destroyed unit is due back
    pub respawn_at_ms: Option<u64>,
}

/// Complete level state (deterministic for a given seed and input sequence)
#[derive(Debug, Clone)]
pub struct GameState {
    /// Seed for reproducibility
    pub seed: u64,
    pub settings: Settings,
    pub level: Level,
    /// Simulation clock
    pub now_ms: u64,
    /// Simulation tick counter
    pub time_ticks: u64,
    pub phase: GamePhase,
    /// Live units in spawn order
    pub tanks: Vec<Tank>,
    pub bullets: Vec<Bullet>,
    pub powerups: Vec<PowerUp>,
    pub players: Vec<PlayerSlot>,
    /// Hostile archetypes still to enter
    pub pending_enemies: VecDeque<Archetype>,
    pub score: u64,
    pub enemies_destroyed: u32,
    pub next_reinforcement_ms: u64,
    pub next_powerup_ms: u64,
    pub(crate) rng: Pcg32,
    pub(crate) ids: IdGen,
    /// Rotates reinforcement spawn points
    pub(crate) spawn_cursor: usize,
}

impl GameState {
    /// Start a level with `player_count` human-controlled units
    pub fn new(level: Level, settings: Settings, seed: u64, player_count: usize) -> Self {
        let settings = settings.sanitized();
        let player_count = player_count.min(level.player_spawns.len());
        let lives = settings.player_lives.max(1);
        let mut state = Self {
            seed,
            pending_enemies: level.roster.iter().copied().collect(),
            next_powerup_ms: settings.powerup_spawn_interval_ms,
            settings,
            level,
            now_ms: 0,
            time_ticks: 0,
            phase: GamePhase::Playing,
            tanks: Vec::new(),
            bullets: Vec::new(),
            powerups: Vec::new(),
            players: vec![
                PlayerSlot {
                    lives,
                    respawn_at_ms: Some(0),
                };
                player_count
            ],
            score: 0,
            enemies_destroyed: 0,
            next_reinforcement_ms: 0,
            rng: Pcg32::seed_from_u64(seed),
            ids: IdGen::default(),
            spawn_cursor: 0,
        };

        // Players enter immediately; events for the opening spawns are dropped
        let mut opening = Vec::new();
        state.respawn_players(&mut opening);

        log::info!(
            "Level start: {} players, {} hostile units queued (seed {})",
            state.players.len(),
            state.pending_enemies.len(),
            seed
        );
        state
    }

    pub fn next_entity_id(&mut self) -> u32 {
        self.ids.allocate()
    }

    pub fn tank(&self, id: u32) -> Option<&Tank> {
        self.tanks.iter().find(|t| t.id == id)
    }

    pub fn player_tank(&self, slot: usize) -> Option<&Tank> {
        self.tanks.iter().find(|t| t.player_slot == Some(slot))
    }

    pub fn hostile_count(&self) -> usize {
        self.tanks
            .iter()
            .filter(|t| t.faction == Faction::Hostile)
            .count()
    }

    /// Bring back player units whose respawn time has come
    pub(crate) fn respawn_players(&mut self, events: &mut Vec<GameEvent>) {
        for slot in 0..self.players.len() {
            let due = self.players[slot]
                .respawn_at_ms
                .is_some_and(|at| self.now_ms >= at);
            if !due || self.players[slot].lives == 0 {
                continue;
            }
            let Some(&cell) = self.level.player_spawns.get(slot) else {
                continue;
            };
            let pos = cell * CELL_SIZE;
            if !self.spawn_point_free(pos) {
                continue;
            }

            let id = self.ids.allocate();
            let mut tank = Tank::player(id, slot, pos);
            tank.add_effect(
                PowerUpKind::Invincibility,
                self.settings.spawn_invincibility_secs,
            );
            self.players[slot].lives -= 1;
            self.players[slot].respawn_at_ms = None;
            log::debug!("player {} spawned as unit {} at {:?}", slot, id, pos);
            events.push(GameEvent::UnitSpawned {
                id,
                faction: Faction::Friendly,
                archetype: Archetype::Player,
                pos,
            });
            self.tanks.push(tank);
        }
    }

    /// Release the next queued hostile unit at a free spawn point
    pub(crate) fn spawn_reinforcements(&mut self, events: &mut Vec<GameEvent>) {
        if self.now_ms < self.next_reinforcement_ms
            || self.hostile_count() >= self.settings.max_active_enemies
        {
            return;
        }
        let Some(&archetype) = self.pending_enemies.front() else {
            return;
        };

        let points = self.level.enemy_spawns.len();
        let free = (0..points)
            .map(|offset| (self.spawn_cursor + offset) % points)
            .find(|&i| self.spawn_point_free(self.level.enemy_spawns[i] * CELL_SIZE));
        // All spawn points blocked: try again next tick
        let Some(index) = free else {
            return;
        };

        self.pending_enemies.pop_front();
        self.spawn_cursor = (index + 1) % points;
        self.next_reinforcement_ms = self.now_ms + self.settings.reinforcement_interval_ms;

        let pos = self.level.enemy_spawns[index] * CELL_SIZE;
        let id = self.ids.allocate();
        let mut tank = Tank::enemy(id, archetype, pos);
        if let Some(brain) = tank.brain.as_mut() {
            brain.patrol.phase_started_ms = self.now_ms;
        }
        log::debug!("{} hostile unit {} entered at {:?}", archetype.label(), id, pos);
        events.push(GameEvent::UnitSpawned {
            id,
            faction: Faction::Hostile,
            archetype,
            pos,
        });
        self.tanks.push(tank);
    }

    /// Drop a random power-up on a free floor cell when the timer is up
    pub(crate) fn spawn_powerups(&mut self, events: &mut Vec<GameEvent>) {
        if self.now_ms < self.next_powerup_ms {
            return;
        }
        self.next_powerup_ms = self.now_ms + self.settings.powerup_spawn_interval_ms;
        if self.powerups.len() >= self.settings.max_powerups {
            return;
        }

        let inset = (CELL_SIZE - POWERUP_SIZE) / 2;
        let candidates: Vec<IVec2> = self
            .level
            .grid
            .passable_cells()
            .map(|cell| cell * CELL_SIZE + IVec2::splat(inset))
            .filter(|pos| {
                let rect = Rect::square(*pos, POWERUP_SIZE);
                !self.tanks.iter().any(|t| t.collides_with(&rect))
                    && !self.powerups.iter().any(|p| p.rect().intersects(&rect))
            })
            .collect();
        if candidates.is_empty() {
            return;
        }

        let pos = candidates[self.rng.random_range(0..candidates.len())];
        let kind = PowerUpKind::ALL[self.rng.random_range(0..PowerUpKind::ALL.len())];
        let id = self.ids.allocate();
        self.powerups.push(PowerUp::new(
            id,
            kind,
            pos,
            self.now_ms,
            self.settings.powerup_blink_ms,
            self.settings.powerup_lifespan_ms,
        ));
        log::debug!("power-up {} ({}) spawned at {:?}", id, kind.label(), pos);
        events.push(GameEvent::PowerUpSpawned { id, kind, pos });
    }

    fn spawn_point_free(&self, pos: IVec2) -> bool {
        let collider = Collider::new(&self.level.grid, &self.tanks);
        collider.can_occupy(0, &Rect::square(pos, TANK_SIZE))
    }

    /// Remove destroyed units, scheduling player respawns
    pub(crate) fn sweep_destroyed(&mut self) {
        let now = self.now_ms;
        let delay = self.settings.respawn_delay_ms;
        for tank in self.tanks.iter().filter(|t| t.is_destroyed()) {
            if let Some(slot) = tank.player_slot.and_then(|s| self.players.get_mut(s)) {
                if slot.lives > 0 {
                    slot.respawn_at_ms = Some(now + delay);
                }
            }
        }
        self.tanks.retain(|t| !t.is_destroyed());
    }

    /// Credit a destroyed unit and emit its event
    pub(crate) fn record_destroyed(
        &mut self,
        tank_index: usize,
        by: Option<u32>,
        events: &mut Vec<GameEvent>,
    ) {
        let tank = &self.tanks[tank_index];
        if tank.faction == Faction::Hostile {
            self.score += tank.archetype.score();
            self.enemies_destroyed += 1;
        }
        log::info!(
            "{} {} unit {} destroyed at {:?}",
            tank.faction.as_str(),
            tank.archetype.label(),
            tank.id,
            tank.pos
        );
        events.push(GameEvent::UnitDestroyed {
            id: tank.id,
            faction: tank.faction,
            archetype: tank.archetype,
            pos: tank.pos,
            by,
        });
    }

    /// Re-evaluate win/loss
    pub(crate) fn update_phase(&mut self, events: &mut Vec<GameEvent>) {
        if self.phase != GamePhase::Playing {
            return;
        }
        let next = if self.pending_enemies.is_empty() && self.hostile_count() == 0 {
            Some(GamePhase::Victory)
        } else if !self.players.is_empty()
            && self.tanks.iter().all(|t| t.faction != Faction::Friendly)
            && self.players.iter().all(|p| p.respawn_at_ms.is_none() || p.lives == 0)
        {
            Some(GamePhase::Defeat)
        } else {
            None
        };
        if let Some(phase) = next {
            log::info!("Level over: {:?} (score {})", phase, self.score);
            self.phase = phase;
            events.push(GameEvent::PhaseChanged { phase });
        }
    }

    /// Owned copy of everything a renderer needs
    pub fn render_view(&self) -> RenderView {
        RenderView {
            now_ms: self.now_ms,
            phase: self.phase,
            score: self.score,
            lives: self.players.iter().map(|p| p.lives).collect(),
            units: self
                .tanks
                .iter()
                .map(|t| UnitView {
                    id: t.id,
                    faction: t.faction,
                    archetype: t.archetype,
                    pos: t.pos,
                    direction: t.direction,
                    health: t.health,
                    max_health: t.max_health(),
                    shielded: t.shielded,
                    invincible: t.invincible,
                })
                .collect(),
            bullets: self
                .bullets
                .iter()
                .map(|b| BulletView {
                    id: b.id,
                    pos: b.pos,
                    faction: b.faction,
                })
                .collect(),
            powerups: self
                .powerups
                .iter()
                .map(|p| PowerUpView {
                    id: p.id,
                    kind: p.kind,
                    pos: p.pos,
                    blinking: p.should_blink(self.now_ms),
                })
                .collect(),
        }
    }
}

/// Read-only snapshot for presentation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderView {
    pub now_ms: u64,
    pub phase: GamePhase,
    pub score: u64,
    pub lives: Vec<u32>,
    pub units: Vec<UnitView>,
    pub bullets: Vec<BulletView>,
    pub powerups: Vec<PowerUpView>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitView {
    pub id: u32,
    pub faction: Faction,
    pub archetype: Archetype,
    pub pos: IVec2,
    pub direction: Direction,
    pub health: u32,
    pub max_health: u32,
    pub shielded: bool,
    pub invincible: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulletView {
    pub id: u32,
    pub pos: IVec2,
    pub faction: Faction,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PowerUpView {
    pub id: u32,
    pub kind: PowerUpKind,
    pub pos: IVec2,
    pub blinking: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_level() -> Level {
        Level::parse("E...E\n.....\n..P..").unwrap()
    }

    #[test]
    fn test_new_spawns_players() {
        let state = GameState::new(small_level(), Settings::default(), 1, 1);
        assert_eq!(state.tanks.len(), 1);
        let player = state.player_tank(0).unwrap();
        assert_eq!(player.pos, IVec2::new(80, 80));
        assert!(player.invincible);
        assert_eq!(state.players[0].lives, 2);
        assert_eq!(state.pending_enemies.len(), 10);
    }

    #[test]
    fn test_new_sanitizes_settings() {
        let settings = Settings {
            patrol_stop_min_ms: 2000,
            patrol_stop_max_ms: 500,
            patrol_fire_chance: -1.0,
            ..Default::default()
        };
        let state = GameState::new(small_level(), settings, 1, 1);
        assert_eq!(state.settings.patrol_stop_min_ms, 500);
        assert_eq!(state.settings.patrol_stop_max_ms, 2000);
        assert_eq!(state.settings.patrol_fire_chance, 0.0);
    }

    #[test]
    fn test_player_count_capped_by_spawns() {
        let state = GameState::new(small_level(), Settings::default(), 1, 4);
        assert_eq!(state.players.len(), 1);
    }

    #[test]
    fn test_reinforcements_respect_cap_and_rotation() {
        let settings = Settings {
            max_active_enemies: 2,
            reinforcement_interval_ms: 0,
            ..Default::default()
        };
        let mut state = GameState::new(small_level(), settings, 1, 1);
        let mut events = Vec::new();
        for _ in 0..5 {
            state.spawn_reinforcements(&mut events);
        }
        assert_eq!(state.hostile_count(), 2);
        let hostile: Vec<IVec2> = state
            .tanks
            .iter()
            .filter(|t| t.faction == Faction::Hostile)
            .map(|t| t.pos)
            .collect();
        assert_eq!(hostile, vec![IVec2::new(0, 0), IVec2::new(160, 0)]);
        assert_eq!(state.pending_enemies.len(), 8);
        assert_eq!(events.len(), 2);
    }

    #[test]
    fn test_powerup_spawns_on_free_floor() {
        let settings = Settings {
            powerup_spawn_interval_ms: 0,
            ..Default::default()
        };
        let mut state = GameState::new(small_level(), settings, 9, 1);
        let mut events = Vec::new();
        state.spawn_powerups(&mut events);
        assert_eq!(state.powerups.len(), 1);
        let p = &state.powerups[0];
        assert!(state.level.grid.can_occupy(&p.rect()));
        assert!(!state.tanks.iter().any(|t| t.collides_with(&p.rect())));
        assert!(matches!(events[0], GameEvent::PowerUpSpawned { .. }));
    }

    #[test]
    fn test_sweep_schedules_respawn() {
        let mut state = GameState::new(small_level(), Settings::default(), 1, 1);
        state.now_ms = 500;
        state.tanks[0].invincible = false;
        state.tanks[0].effects.clear();
        state.tanks[0].take_damage(100);
        state.sweep_destroyed();
        assert!(state.tanks.is_empty());
        assert_eq!(state.players[0].respawn_at_ms, Some(2500));
    }
}

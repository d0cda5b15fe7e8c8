//! Armored unit state machine
//!
//! A tank is Active until its health reaches zero, after which it is
//! Destroyed and inert. All time-dependent methods take the simulation clock
//! explicitly; nothing here reads wall time.

use std::collections::BTreeMap;

use glam::IVec2;
use serde::{Deserialize, Serialize};

use super::ai::AiBrain;
use super::bullet::Bullet;
use super::geom::{Direction, Rect};
use super::powerup::PowerUpKind;
use crate::consts::{BULLET_SIZE, TANK_SIZE};

/// Side a unit fights for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Faction {
    Friendly,
    Hostile,
}

impl Faction {
    pub fn as_str(self) -> &'static str {
        match self {
            Faction::Friendly => "friendly",
            Faction::Hostile => "hostile",
        }
    }
}

/// Base stats for an archetype
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArchetypeStats {
    pub max_health: u32,
    /// World units per tick
    pub speed: i32,
    pub attack: u32,
    pub fire_delay_ms: u64,
    /// World units per tick
    pub bullet_speed: i32,
}

/// Unit type, selecting a row of the stats table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Archetype {
    Player,
    Basic,
    Fast,
    Power,
    Armor,
}

impl Archetype {
    pub const HOSTILE: [Archetype; 4] = [
        Archetype::Basic,
        Archetype::Fast,
        Archetype::Power,
        Archetype::Armor,
    ];

    pub fn stats(self) -> ArchetypeStats {
        match self {
            Archetype::Player => ArchetypeStats {
                max_health: 3,
                speed: 4,
                attack: 1,
                fire_delay_ms: 500,
                bullet_speed: 10,
            },
            Archetype::Basic => ArchetypeStats {
                max_health: 1,
                speed: 2,
                attack: 1,
                fire_delay_ms: 1000,
                bullet_speed: 6,
            },
            Archetype::Fast => ArchetypeStats {
                max_health: 1,
                speed: 4,
                attack: 1,
                fire_delay_ms: 800,
                bullet_speed: 8,
            },
            Archetype::Power => ArchetypeStats {
                max_health: 2,
                speed: 2,
                attack: 2,
                fire_delay_ms: 600,
                bullet_speed: 12,
            },
            Archetype::Armor => ArchetypeStats {
                max_health: 4,
                speed: 2,
                attack: 1,
                fire_delay_ms: 900,
                bullet_speed: 8,
            },
        }
    }

    /// Points awarded for destroying this archetype
    pub fn score(self) -> u64 {
        match self {
            Archetype::Player => 0,
            Archetype::Basic => 100,
            Archetype::Fast => 200,
            Archetype::Power => 300,
            Archetype::Armor => 400,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Archetype::Player => "Player",
            Archetype::Basic => "Basic",
            Archetype::Fast => "Fast",
            Archetype::Power => "Power",
            Archetype::Armor => "Armor",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label.to_ascii_lowercase().as_str() {
            "player" => Some(Archetype::Player),
            "basic" => Some(Archetype::Basic),
            "fast" => Some(Archetype::Fast),
            "power" => Some(Archetype::Power),
            "armor" => Some(Archetype::Armor),
            _ => None,
        }
    }
}

/// An armored unit
#[derive(Debug, Clone, PartialEq)]
pub struct Tank {
    pub id: u32,
    pub faction: Faction,
    pub archetype: Archetype,
    /// Top-left corner in world units
    pub pos: IVec2,
    pub direction: Direction,
    pub health: u32,
    /// Sim-clock time of the last shot
    pub last_fire_ms: Option<u64>,
    /// Active timed effects and their remaining seconds
    pub effects: BTreeMap<PowerUpKind, f32>,
    pub shielded: bool,
    pub invincible: bool,
    /// Input slot for player-controlled units
    pub player_slot: Option<usize>,
    /// Decision state for AI-controlled units
    pub brain: Option<AiBrain>,
}

impl Tank {
    pub fn new(
        id: u32,
        faction: Faction,
        archetype: Archetype,
        pos: IVec2,
        direction: Direction,
    ) -> Self {
        Self {
            id,
            faction,
            archetype,
            pos,
            direction,
            health: archetype.stats().max_health,
            last_fire_ms: None,
            effects: BTreeMap::new(),
            shielded: false,
            invincible: false,
            player_slot: None,
            brain: None,
        }
    }

    /// A player-controlled friendly unit bound to an input slot
    pub fn player(id: u32, slot: usize, pos: IVec2) -> Self {
        let mut tank = Self::new(id, Faction::Friendly, Archetype::Player, pos, Direction::Up);
        tank.player_slot = Some(slot);
        tank
    }

    /// An AI-controlled hostile unit
    pub fn enemy(id: u32, archetype: Archetype, pos: IVec2) -> Self {
        let mut tank = Self::new(id, Faction::Hostile, archetype, pos, Direction::Down);
        tank.brain = Some(AiBrain::default());
        tank
    }

    pub fn stats(&self) -> ArchetypeStats {
        self.archetype.stats()
    }

    pub fn max_health(&self) -> u32 {
        self.stats().max_health
    }

    pub fn is_destroyed(&self) -> bool {
        self.health == 0
    }

    pub fn has_effect(&self, kind: PowerUpKind) -> bool {
        self.effects.contains_key(&kind)
    }

    pub fn rect(&self) -> Rect {
        Rect::square(self.pos, TANK_SIZE)
    }

    pub fn center(&self) -> IVec2 {
        self.rect().center()
    }

    pub fn collides_with(&self, other: &Rect) -> bool {
        self.rect().intersects(other)
    }

    /// Base speed, x1.5 under Speed
    pub fn effective_speed(&self) -> i32 {
        let speed = self.stats().speed;
        if self.has_effect(PowerUpKind::Speed) {
            speed * 3 / 2
        } else {
            speed
        }
    }

    /// Base delay, x0.7 under Attack
    pub fn effective_fire_delay_ms(&self) -> u64 {
        let delay = self.stats().fire_delay_ms;
        if self.has_effect(PowerUpKind::Attack) {
            delay * 7 / 10
        } else {
            delay
        }
    }

    /// Attack power, x1.5 (rounded half up) under Attack
    pub fn effective_damage(&self) -> u32 {
        let attack = self.stats().attack;
        if self.has_effect(PowerUpKind::Attack) {
            (attack * 3 + 1) / 2
        } else {
            attack
        }
    }

    /// Where `move_forward` would put the tank
    pub fn next_position(&self) -> IVec2 {
        self.pos + self.direction.delta() * self.effective_speed()
    }

    pub fn move_forward(&mut self) {
        if self.is_destroyed() {
            return;
        }
        self.pos = self.next_position();
    }

    pub fn can_fire(&self, now_ms: u64) -> bool {
        if self.is_destroyed() {
            return false;
        }
        match self.last_fire_ms {
            None => true,
            Some(last) => now_ms.saturating_sub(last) >= self.effective_fire_delay_ms(),
        }
    }

    /// Bullet top-left just outside the hull on the facing side
    pub fn muzzle_position(&self) -> IVec2 {
        let rect = self.rect();
        let across_x = rect.left() + (TANK_SIZE - BULLET_SIZE) / 2;
        let across_y = rect.top() + (TANK_SIZE - BULLET_SIZE) / 2;
        match self.direction {
            Direction::Up => IVec2::new(across_x, rect.top() - BULLET_SIZE),
            Direction::Right => IVec2::new(rect.right(), across_y),
            Direction::Down => IVec2::new(across_x, rect.bottom()),
            Direction::Left => IVec2::new(rect.left() - BULLET_SIZE, across_y),
        }
    }

    /// Fire if the cooldown allows, stamping the shot time
    pub fn fire(&mut self, now_ms: u64, bullet_id: u32) -> Option<Bullet> {
        if !self.can_fire(now_ms) {
            return None;
        }
        self.last_fire_ms = Some(now_ms);
        Some(Bullet::new(
            bullet_id,
            self.muzzle_position(),
            self.direction,
            self.stats().bullet_speed,
            self.effective_damage(),
            self.faction,
            self.id,
        ))
    }

    /// Apply a hit. Returns true only on the hit that destroys the tank.
    ///
    /// Invincibility ignores the hit; a shield absorbs exactly one hit of
    /// any size, including zero.
    pub fn take_damage(&mut self, amount: u32) -> bool {
        if self.is_destroyed() || self.invincible {
            return false;
        }
        if self.shielded {
            self.effects.remove(&PowerUpKind::Shield);
            self.shielded = false;
            return false;
        }
        self.health = self.health.saturating_sub(amount);
        self.health == 0
    }

    /// Register a timed effect, replacing any remaining time
    pub fn add_effect(&mut self, kind: PowerUpKind, secs: f32) {
        if secs <= 0.0 {
            return;
        }
        self.effects.insert(kind, secs);
        match kind {
            PowerUpKind::Shield => self.shielded = true,
            PowerUpKind::Invincibility => self.invincible = true,
            _ => {}
        }
    }

    pub fn apply_power_up(&mut self, kind: PowerUpKind) {
        match kind {
            PowerUpKind::Health => {
                self.health = (self.health + 1).min(self.max_health());
                self.effects.remove(&PowerUpKind::Health);
            }
            // Detonation is handled by the orchestrator
            PowerUpKind::Bomb => {}
            PowerUpKind::Shield
            | PowerUpKind::Invincibility
            | PowerUpKind::Attack
            | PowerUpKind::Speed => self.add_effect(kind, kind.duration_secs()),
        }
    }

    /// Count down every effect, dropping the ones that ran out
    pub fn update_effects(&mut self, dt_secs: f32) {
        let kinds: Vec<PowerUpKind> = self.effects.keys().copied().collect();
        for kind in kinds {
            let expired = match self.effects.get_mut(&kind) {
                Some(remaining) => {
                    *remaining -= dt_secs;
                    *remaining <= 0.0
                }
                None => false,
            };
            if expired {
                self.effects.remove(&kind);
                match kind {
                    PowerUpKind::Shield => self.shielded = false,
                    PowerUpKind::Invincibility => self.invincible = false,
                    _ => {}
                }
            }
        }
    }
}

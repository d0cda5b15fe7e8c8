//! Simulation tick
//!
//! Advances a level by one clock delta. Step order is fixed so that two runs
//! with the same seed and input sequence produce identical trajectories.

use glam::IVec2;

use super::ai::{AiContext, nearest_target, update_enemy};
use super::bullet::BulletEnd;
use super::collision::Collider;
use super::geom::Direction;
use super::powerup::PowerUpKind;
use super::state::{GameEvent, GamePhase, GameState};
use super::tank::Faction;

/// Logical intents for one player unit, already debounced
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlayerInput {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
    pub fire: bool,
}

impl PlayerInput {
    /// Requested heading; when several keys are held, Up > Down > Left > Right
    pub fn direction(&self) -> Option<Direction> {
        if self.up {
            Some(Direction::Up)
        } else if self.down {
            Some(Direction::Down)
        } else if self.left {
            Some(Direction::Left)
        } else if self.right {
            Some(Direction::Right)
        } else {
            None
        }
    }
}

/// Input for a single tick, one entry per player slot
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    pub players: Vec<PlayerInput>,
}

impl TickInput {
    pub fn single(player: PlayerInput) -> Self {
        Self {
            players: vec![player],
        }
    }

    pub fn player(&self, slot: usize) -> PlayerInput {
        self.players.get(slot).copied().unwrap_or_default()
    }
}

/// Advance the level by `dt_ms` and return what happened
pub fn tick(state: &mut GameState, input: &TickInput, dt_ms: u32) -> Vec<GameEvent> {
    let mut events = Vec::new();
    if state.phase != GamePhase::Playing {
        return events;
    }

    state.now_ms += u64::from(dt_ms);
    state.time_ticks += 1;
    let now = state.now_ms;

    // Arrivals claim their spawn cell before anyone moves
    state.respawn_players(&mut events);
    state.spawn_reinforcements(&mut events);
    state.spawn_powerups(&mut events);

    // (a) hostile decisions, (b) player intents. Unit-vs-unit and
    // unit-vs-terrain blocking is enforced by the collider before each
    // move is committed.
    let mut fired = Vec::new();
    {
        let GameState {
            level,
            settings,
            tanks,
            ids,
            rng,
            ..
        } = state;

        let targets: Vec<IVec2> = tanks
            .iter()
            .filter(|t| t.faction == Faction::Friendly && !t.is_destroyed())
            .map(|t| t.center())
            .collect();
        let mut collider = Collider::new(&level.grid, tanks);
        let ctx = AiContext {
            grid: &level.grid,
            settings,
            now_ms: now,
        };

        for tank in tanks.iter_mut().filter(|t| t.brain.is_some()) {
            let target = nearest_target(tank.center(), &targets);
            if let Some(bullet) = update_enemy(tank, target, &ctx, &mut collider, ids, rng) {
                fired.push(bullet);
            }
        }

        for tank in tanks.iter_mut() {
            let Some(slot) = tank.player_slot else {
                continue;
            };
            let intent = input.player(slot);
            if let Some(direction) = intent.direction() {
                tank.direction = direction;
                collider.try_move(tank);
            }
            if intent.fire && tank.can_fire(now) {
                if let Some(bullet) = tank.fire(now, ids.allocate()) {
                    fired.push(bullet);
                }
            }
        }
    }
    for bullet in &fired {
        events.push(GameEvent::BulletSpawned {
            id: bullet.id,
            owner: bullet.owner,
            faction: bullet.faction,
        });
    }
    state.bullets.extend(fired);

    // (c) projectile motion
    let bounds = state.level.grid.bounds();
    for bullet in &mut state.bullets {
        bullet.advance();
        if bullet.is_out_of_bounds(&bounds) {
            bullet.destroyed = true;
            events.push(GameEvent::BulletRemoved {
                id: bullet.id,
                reason: BulletEnd::OutOfBounds,
            });
        }
    }
    state.bullets.retain(|b| !b.destroyed);

    // (e) projectile impacts
    resolve_bullet_hits(state, &mut events);

    // (f) timed effects
    let dt_secs = dt_ms as f32 / 1000.0;
    for tank in &mut state.tanks {
        tank.update_effects(dt_secs);
    }

    // (g) power-up pickup and expiry
    sweep_powerups(state, &mut events);

    state.update_phase(&mut events);
    events
}

fn resolve_bullet_hits(state: &mut GameState, events: &mut Vec<GameEvent>) {
    for b in 0..state.bullets.len() {
        let rect = state.bullets[b].rect();
        if state.level.grid.stops_bullet(&rect) {
            let bullet = &mut state.bullets[b];
            bullet.destroyed = true;
            events.push(GameEvent::BulletRemoved {
                id: bullet.id,
                reason: BulletEnd::Terrain,
            });
            continue;
        }

        let bullet = &state.bullets[b];
        let hit = state
            .tanks
            .iter()
            // Wrecks from earlier hits this tick still absorb bullets until the sweep
            .position(|t| bullet.can_hit(t.faction) && t.collides_with(&rect));
        let Some(target) = hit else {
            continue;
        };

        let (damage, owner, id) = (bullet.damage, bullet.owner, bullet.id);
        state.bullets[b].destroyed = true;
        events.push(GameEvent::BulletRemoved {
            id,
            reason: BulletEnd::HitUnit {
                target: state.tanks[target].id,
            },
        });
        if state.tanks[target].take_damage(damage) {
            state.record_destroyed(target, Some(owner), events);
        }
    }
    state.bullets.retain(|b| !b.destroyed);
    state.sweep_destroyed();
}

fn sweep_powerups(state: &mut GameState, events: &mut Vec<GameEvent>) {
    let now = state.now_ms;
    for p in 0..state.powerups.len() {
        if state.powerups[p].collected {
            continue;
        }
        let picker = state.tanks.iter().position(|t| {
            t.faction == Faction::Friendly && !t.is_destroyed() && state.powerups[p].collides_with(&t.rect())
        });
        let Some(picker) = picker else {
            continue;
        };

        let powerup = &mut state.powerups[p];
        powerup.collect();
        let (id, kind) = (powerup.id, powerup.kind);
        let by = state.tanks[picker].id;
        log::debug!("unit {} collected {}", by, kind.label());
        events.push(GameEvent::PowerUpCollected { id, kind, by });

        state.tanks[picker].apply_power_up(kind);
        if kind == PowerUpKind::Bomb {
            detonate_bomb(state, by, events);
        }
    }

    for powerup in &state.powerups {
        if !powerup.collected && powerup.should_remove(now) {
            events.push(GameEvent::PowerUpExpired {
                id: powerup.id,
                kind: powerup.kind,
            });
        }
    }
    state.powerups.retain(|p| !p.should_remove(now));
}

/// Lethal hit on every hostile unit; shields and invincibility still apply
fn detonate_bomb(state: &mut GameState, by: u32, events: &mut Vec<GameEvent>) {
    let mut destroyed = 0;
    for i in 0..state.tanks.len() {
        let tank = &mut state.tanks[i];
        if tank.faction != Faction::Hostile || tank.is_destroyed() {
            continue;
        }
        let lethal = tank.max_health();
        if tank.take_damage(lethal) {
            destroyed += 1;
            state.record_destroyed(i, Some(by), events);
        }
    }
    log::info!("bomb from unit {} destroyed {} hostile units", by, destroyed);
    events.push(GameEvent::BombDetonated { by, destroyed });
    state.sweep_destroyed();
}

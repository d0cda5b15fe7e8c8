//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Integer clock advanced only by the tick
//! - Seeded RNG only
//! - Stable iteration order (units in spawn order, A* ties by insertion)
//! - No rendering or platform dependencies

pub mod ai;
pub mod bullet;
pub mod collision;
pub mod geom;
pub mod grid;
pub mod level;
pub mod pathfinding;
pub mod powerup;
pub mod state;
pub mod tank;
pub mod tick;

pub use ai::{AiBrain, AiMode};
pub use bullet::{Bullet, BulletEnd};
pub use collision::Collider;
pub use geom::{Direction, Rect};
pub use grid::{Grid, Tile};
pub use level::{Level, LevelError};
pub use pathfinding::find_path;
pub use powerup::{PowerUp, PowerUpKind, PowerUpStage};
pub use state::{GameEvent, GamePhase, GameState, IdGen, PlayerSlot, RenderView};
pub use tank::{Archetype, Faction, Tank};
pub use tick::{PlayerInput, TickInput, tick};

//! Tank Arena - A grid-based arcade tank combat simulation
//!
//! Core modules:
//! - `sim`: Deterministic simulation (units, AI, projectiles, power-ups)
//! - `persistence`: Save/restore snapshots of the simulation state
//! - `settings`: Data-driven game balance

pub mod persistence;
pub mod settings;
pub mod sim;

pub use settings::Settings;

use glam::IVec2;

/// Game configuration constants
pub mod consts {
    /// Edge length of one terrain cell in world units
    pub const CELL_SIZE: i32 = 40;

    /// Tanks occupy exactly one cell when aligned
    pub const TANK_SIZE: i32 = 40;

    /// Bullet bounding box edge
    pub const BULLET_SIZE: i32 = 10;

    /// Power-up bounding box edge
    pub const POWERUP_SIZE: i32 = 30;
    /// Extra margin on every side when testing power-up pickup
    pub const POWERUP_PICKUP_TOLERANCE: i32 = 5;

    /// Nominal frame length for the headless runner (60 Hz)
    pub const FRAME_MS: u32 = 16;
}

/// Grid cell containing a world-space point (floors toward negative infinity)
#[inline]
pub fn cell_of(point: IVec2) -> IVec2 {
    IVec2::new(
        point.x.div_euclid(consts::CELL_SIZE),
        point.y.div_euclid(consts::CELL_SIZE),
    )
}

/// World-space center of a grid cell
#[inline]
pub fn cell_center(cell: IVec2) -> IVec2 {
    cell * consts::CELL_SIZE + IVec2::splat(consts::CELL_SIZE / 2)
}

/// Euclidean distance between two integer points
#[inline]
pub fn distance(a: IVec2, b: IVec2) -> f32 {
    (a - b).as_vec2().length()
}

//! Projectiles
//!
//! Bullets travel in a straight line at constant speed until they leave the
//! map, hit bullet-stopping terrain, or hit a unit of the other faction.

use glam::IVec2;
use serde::{Deserialize, Serialize};

use super::geom::{Direction, Rect};
use super::tank::Faction;
use crate::consts::BULLET_SIZE;

/// Why a bullet left play
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BulletEnd {
    OutOfBounds,
    Terrain,
    HitUnit { target: u32 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bullet {
    pub id: u32,
    /// Top-left corner in world units
    pub pos: IVec2,
    pub direction: Direction,
    /// World units per tick
    pub speed: i32,
    pub damage: u32,
    pub faction: Faction,
    /// Id of the firing unit
    pub owner: u32,
    pub destroyed: bool,
}

impl Bullet {
    pub fn new(
        id: u32,
        pos: IVec2,
        direction: Direction,
        speed: i32,
        damage: u32,
        faction: Faction,
        owner: u32,
    ) -> Self {
        Self {
            id,
            pos,
            direction,
            speed,
            damage,
            faction,
            owner,
            destroyed: false,
        }
    }

    pub fn rect(&self) -> Rect {
        Rect::square(self.pos, BULLET_SIZE)
    }

    pub fn advance(&mut self) {
        if !self.destroyed {
            self.pos += self.direction.delta() * self.speed;
        }
    }

    /// Position has left the playfield rectangle
    pub fn is_out_of_bounds(&self, bounds: &Rect) -> bool {
        self.pos.x < bounds.left()
            || self.pos.y < bounds.top()
            || self.pos.x >= bounds.right()
            || self.pos.y >= bounds.bottom()
    }

    /// Bullets only ever hit the opposing faction
    pub fn can_hit(&self, faction: Faction) -> bool {
        !self.destroyed && self.faction != faction
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bullet(pos: IVec2, direction: Direction) -> Bullet {
        Bullet::new(1, pos, direction, 8, 1, Faction::Friendly, 9)
    }

    #[test]
    fn test_advance_straight_line() {
        let mut b = bullet(IVec2::new(50, 50), Direction::Left);
        b.advance();
        b.advance();
        assert_eq!(b.pos, IVec2::new(34, 50));
    }

    #[test]
    fn test_destroyed_does_not_move() {
        let mut b = bullet(IVec2::new(50, 50), Direction::Up);
        b.destroyed = true;
        b.advance();
        assert_eq!(b.pos, IVec2::new(50, 50));
        assert!(!b.can_hit(Faction::Hostile));
    }

    #[test]
    fn test_out_of_bounds() {
        let bounds = Rect::new(IVec2::ZERO, IVec2::new(200, 120));
        assert!(!bullet(IVec2::new(0, 0), Direction::Up).is_out_of_bounds(&bounds));
        assert!(bullet(IVec2::new(-1, 10), Direction::Left).is_out_of_bounds(&bounds));
        assert!(bullet(IVec2::new(200, 10), Direction::Right).is_out_of_bounds(&bounds));
        assert!(bullet(IVec2::new(10, 120), Direction::Down).is_out_of_bounds(&bounds));
    }

    #[test]
    fn test_no_friendly_fire() {
        let b = bullet(IVec2::ZERO, Direction::Up);
        assert!(!b.can_hit(Faction::Friendly));
        assert!(b.can_hit(Faction::Hostile));
    }
}

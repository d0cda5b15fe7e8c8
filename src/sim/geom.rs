//! Axis-aligned geometry for grid-locked entities
//!
//! Everything in the arena is an integer rectangle moving along one of
//! four compass directions.

use glam::IVec2;
use serde::{Deserialize, Serialize};

/// Facing of a unit or projectile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Direction {
    Up,
    Right,
    Down,
    Left,
}

impl Direction {
    /// All directions in clockwise order starting from `Up`
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Right,
        Direction::Down,
        Direction::Left,
    ];

    /// Unit step vector (screen coordinates, y grows downward)
    pub fn delta(self) -> IVec2 {
        match self {
            Direction::Up => IVec2::new(0, -1),
            Direction::Right => IVec2::new(1, 0),
            Direction::Down => IVec2::new(0, 1),
            Direction::Left => IVec2::new(-1, 0),
        }
    }

    pub fn is_horizontal(self) -> bool {
        matches!(self, Direction::Left | Direction::Right)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Up => "up",
            Direction::Right => "right",
            Direction::Down => "down",
            Direction::Left => "left",
        }
    }

    /// Direction pointing along the dominant axis of `delta`.
    ///
    /// Ties favor the vertical axis. Returns `None` for a zero vector.
    pub fn toward(delta: IVec2) -> Option<Self> {
        if delta == IVec2::ZERO {
            return None;
        }
        Some(if delta.x.abs() > delta.y.abs() {
            if delta.x > 0 { Direction::Right } else { Direction::Left }
        } else if delta.y > 0 {
            Direction::Down
        } else {
            Direction::Up
        })
    }
}

/// Integer axis-aligned rectangle (top-left origin)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub pos: IVec2,
    pub size: IVec2,
}

impl Rect {
    pub fn new(pos: IVec2, size: IVec2) -> Self {
        Self { pos, size }
    }

    pub fn square(pos: IVec2, edge: i32) -> Self {
        Self::new(pos, IVec2::splat(edge))
    }

    #[inline]
    pub fn left(&self) -> i32 {
        self.pos.x
    }

    #[inline]
    pub fn top(&self) -> i32 {
        self.pos.y
    }

    /// Exclusive right edge
    #[inline]
    pub fn right(&self) -> i32 {
        self.pos.x + self.size.x
    }

    /// Exclusive bottom edge
    #[inline]
    pub fn bottom(&self) -> i32 {
        self.pos.y + self.size.y
    }

    pub fn center(&self) -> IVec2 {
        self.pos + self.size / 2
    }

    /// Standard AABB overlap; touching edges do not overlap
    pub fn intersects(&self, other: &Rect) -> bool {
        self.left() < other.right()
            && other.left() < self.right()
            && self.top() < other.bottom()
            && other.top() < self.bottom()
    }

    /// True when `self` lies entirely inside `outer`
    pub fn is_within(&self, outer: &Rect) -> bool {
        self.left() >= outer.left()
            && self.top() >= outer.top()
            && self.right() <= outer.right()
            && self.bottom() <= outer.bottom()
    }

    /// Grow by `margin` on every side
    pub fn inflate(&self, margin: i32) -> Rect {
        Rect::new(
            self.pos - IVec2::splat(margin),
            self.size + IVec2::splat(margin * 2),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intersects_excludes_touching_edges() {
        let a = Rect::square(IVec2::new(0, 0), 40);
        let b = Rect::square(IVec2::new(40, 0), 40);
        let c = Rect::square(IVec2::new(39, 39), 40);
        assert!(!a.intersects(&b));
        assert!(a.intersects(&c));
        assert!(c.intersects(&a));
    }

    #[test]
    fn test_toward_prefers_larger_axis() {
        assert_eq!(Direction::toward(IVec2::new(10, 3)), Some(Direction::Right));
        assert_eq!(Direction::toward(IVec2::new(-2, -9)), Some(Direction::Up));
        assert_eq!(Direction::toward(IVec2::new(5, 5)), Some(Direction::Down));
        assert_eq!(Direction::toward(IVec2::ZERO), None);
    }

    #[test]
    fn test_inflate() {
        let r = Rect::square(IVec2::new(10, 10), 30).inflate(5);
        assert_eq!(r.pos, IVec2::new(5, 5));
        assert_eq!(r.size, IVec2::new(40, 40));
    }
}

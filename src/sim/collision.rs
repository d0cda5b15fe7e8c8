//! Movement blocking
//!
//! Moves are validated before they are committed: a unit may only step into
//! a rectangle that stays on the map, covers passable cells only, and does
//! not overlap another living unit.

use super::geom::Rect;
use super::grid::Grid;
use super::tank::Tank;
use crate::consts::TANK_SIZE;

/// Occupancy view for one tick: terrain plus every living unit's hull
#[derive(Debug, Clone)]
pub struct Collider<'a> {
    grid: &'a Grid,
    hulls: Vec<(u32, Rect)>,
}

impl<'a> Collider<'a> {
    pub fn new(grid: &'a Grid, tanks: &[Tank]) -> Self {
        let hulls = tanks
            .iter()
            .filter(|t| !t.is_destroyed())
            .map(|t| (t.id, t.rect()))
            .collect();
        Self { grid, hulls }
    }

    /// Whether unit `id` may stand on `rect`
    pub fn can_occupy(&self, id: u32, rect: &Rect) -> bool {
        self.grid.can_occupy(rect) && !self.overlaps_unit(id, rect)
    }

    /// Whether `rect` overlaps any living unit other than `id`
    pub fn overlaps_unit(&self, id: u32, rect: &Rect) -> bool {
        self.hulls
            .iter()
            .any(|(other, hull)| *other != id && hull.intersects(rect))
    }

    /// Record a unit's committed position (inserting it if new)
    pub fn update(&mut self, id: u32, rect: Rect) {
        match self.hulls.iter_mut().find(|(other, _)| *other == id) {
            Some((_, hull)) => *hull = rect,
            None => self.hulls.push((id, rect)),
        }
    }

    pub fn remove(&mut self, id: u32) {
        self.hulls.retain(|(other, _)| *other != id);
    }

    /// Step `tank` forward if the destination is free. Returns whether it moved.
    pub fn try_move(&mut self, tank: &mut Tank) -> bool {
        if tank.is_destroyed() {
            return false;
        }
        let next = Rect::square(tank.next_position(), TANK_SIZE);
        if !self.can_occupy(tank.id, &next) {
            return false;
        }
        tank.move_forward();
        self.update(tank.id, tank.rect());
        true
    }
}

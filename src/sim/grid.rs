//! Terrain grid
//!
//! A level is a fixed rectangle of square cells. The grid never changes
//! once a level is loaded, so pathfinding and collision can read it freely.

use glam::IVec2;
use serde::{Deserialize, Serialize};

use super::geom::Rect;
use crate::cell_of;
use crate::consts::CELL_SIZE;

/// Terrain kind of a single cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Tile {
    #[default]
    Floor,
    Brick,
    Steel,
    Water,
    /// Cosmetic cover; behaves like floor
    Grass,
}

impl Tile {
    /// Whether a tank may occupy this tile
    pub fn is_passable(self) -> bool {
        matches!(self, Tile::Floor | Tile::Grass)
    }

    /// Whether a bullet is stopped by this tile
    pub fn blocks_bullets(self) -> bool {
        matches!(self, Tile::Brick | Tile::Steel)
    }

    pub fn from_char(c: char) -> Option<Self> {
        match c {
            '.' => Some(Tile::Floor),
            '#' => Some(Tile::Brick),
            '@' => Some(Tile::Steel),
            '~' => Some(Tile::Water),
            '%' => Some(Tile::Grass),
            _ => None,
        }
    }
}

/// Static passability map
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    width: i32,
    height: i32,
    tiles: Vec<Tile>,
}

impl Grid {
    /// An all-floor grid of `width` x `height` cells
    pub fn new(width: i32, height: i32) -> Self {
        let width = width.max(0);
        let height = height.max(0);
        Self {
            width,
            height,
            tiles: vec![Tile::Floor; (width * height) as usize],
        }
    }

    /// Builder used while assembling a level; out-of-range cells are ignored
    pub fn with_tile(mut self, cell: IVec2, tile: Tile) -> Self {
        if let Some(index) = self.index(cell) {
            self.tiles[index] = tile;
        }
        self
    }

    /// Parse terrain-only rows (see [`Tile::from_char`]).
    ///
    /// Unknown characters become floor; rows are padded to the widest row.
    pub fn from_rows(rows: &[&str]) -> Self {
        let height = rows.len() as i32;
        let width = rows.iter().map(|r| r.chars().count()).max().unwrap_or(0) as i32;
        let mut grid = Grid::new(width, height);
        for (y, row) in rows.iter().enumerate() {
            for (x, c) in row.chars().enumerate() {
                let tile = Tile::from_char(c).unwrap_or_default();
                grid = grid.with_tile(IVec2::new(x as i32, y as i32), tile);
            }
        }
        grid
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn cell_count(&self) -> usize {
        self.tiles.len()
    }

    pub fn in_bounds(&self, cell: IVec2) -> bool {
        cell.x >= 0 && cell.y >= 0 && cell.x < self.width && cell.y < self.height
    }

    fn index(&self, cell: IVec2) -> Option<usize> {
        self.in_bounds(cell)
            .then(|| (cell.y * self.width + cell.x) as usize)
    }

    pub fn tile(&self, cell: IVec2) -> Option<Tile> {
        self.index(cell).map(|i| self.tiles[i])
    }

    /// Out-of-range cells are never passable
    pub fn is_passable(&self, cell: IVec2) -> bool {
        self.tile(cell).is_some_and(Tile::is_passable)
    }

    /// Out-of-range cells always block
    pub fn blocks_bullets(&self, cell: IVec2) -> bool {
        self.tile(cell).is_none_or(Tile::blocks_bullets)
    }

    /// Playfield rectangle in world units
    pub fn bounds(&self) -> Rect {
        Rect::new(IVec2::ZERO, IVec2::new(self.width, self.height) * CELL_SIZE)
    }

    /// Every cell a rectangle overlaps
    pub fn footprint(&self, rect: &Rect) -> impl Iterator<Item = IVec2> + use<> {
        let min = cell_of(rect.pos);
        let max = cell_of(IVec2::new(rect.right() - 1, rect.bottom() - 1));
        (min.y..=max.y).flat_map(move |y| (min.x..=max.x).map(move |x| IVec2::new(x, y)))
    }

    /// True when the rectangle is inside the map and over passable cells only
    pub fn can_occupy(&self, rect: &Rect) -> bool {
        rect.is_within(&self.bounds()) && self.footprint(rect).all(|c| self.is_passable(c))
    }

    /// True when any overlapped cell stops bullets
    pub fn stops_bullet(&self, rect: &Rect) -> bool {
        self.footprint(rect).any(|c| self.blocks_bullets(c))
    }

    /// Cells a tank could stand on, in row-major order
    pub fn passable_cells(&self) -> impl Iterator<Item = IVec2> + '_ {
        (0..self.height)
            .flat_map(move |y| (0..self.width).map(move |x| IVec2::new(x, y)))
            .filter(|c| self.is_passable(*c))
    }
}

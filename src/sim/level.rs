//! Level layouts
//!
//! Text format, one row per line:
//! `.` floor, `#` brick, `@` steel, `~` water, `%` grass,
//! `P` player spawn (floor), `E` enemy spawn (floor).

use glam::IVec2;
use thiserror::Error;

use super::grid::{Grid, Tile};
use super::tank::Archetype;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LevelError {
    #[error("level has no rows")]
    Empty,
    #[error("unknown tile {ch:?} at row {row}, column {column}")]
    UnknownTile { ch: char, row: usize, column: usize },
    #[error("row {row} has {found} cells, expected {expected}")]
    RaggedRow {
        row: usize,
        found: usize,
        expected: usize,
    },
    #[error("level has no player spawn")]
    NoPlayerSpawn,
    #[error("level has no enemy spawn")]
    NoEnemySpawn,
}

/// Terrain plus spawn layout and the hostile roster for one stage
#[derive(Debug, Clone, PartialEq)]
pub struct Level {
    pub grid: Grid,
    /// Player spawn cells, indexed by input slot
    pub player_spawns: Vec<IVec2>,
    pub enemy_spawns: Vec<IVec2>,
    /// Hostile archetypes in the order they enter
    pub roster: Vec<Archetype>,
}

const DEMO_LAYOUT: &str = "\
E.....E.....E
.#.#.#.#.#.#.
.#.#.#@#.#.#.
.#.#.....#.#.
.....#.#.....
@.##.....##.@
.....#.#.....
.#.#.###.#.#.
.#.#.#.#.#.#.
.#.........#.
....P...P....";

impl Level {
    pub fn parse(text: &str) -> Result<Self, LevelError> {
        let rows: Vec<&str> = text
            .lines()
            .map(str::trim_end)
            .filter(|line| !line.is_empty())
            .collect();
        let Some(first) = rows.first() else {
            return Err(LevelError::Empty);
        };
        let width = first.chars().count();

        let mut grid = Grid::new(width as i32, rows.len() as i32);
        let mut player_spawns = Vec::new();
        let mut enemy_spawns = Vec::new();

        for (row, line) in rows.iter().enumerate() {
            let found = line.chars().count();
            if found != width {
                return Err(LevelError::RaggedRow {
                    row,
                    found,
                    expected: width,
                });
            }
            for (column, ch) in line.chars().enumerate() {
                let cell = IVec2::new(column as i32, row as i32);
                let tile = match ch {
                    'P' => {
                        player_spawns.push(cell);
                        Tile::Floor
                    }
                    'E' => {
                        enemy_spawns.push(cell);
                        Tile::Floor
                    }
                    other => Tile::from_char(other).ok_or(LevelError::UnknownTile {
                        ch: other,
                        row,
                        column,
                    })?,
                };
                grid = grid.with_tile(cell, tile);
            }
        }

        if player_spawns.is_empty() {
            return Err(LevelError::NoPlayerSpawn);
        }
        if enemy_spawns.is_empty() {
            return Err(LevelError::NoEnemySpawn);
        }

        log::info!(
            "Parsed {}x{} level: {} player spawns, {} enemy spawns",
            grid.width(),
            grid.height(),
            player_spawns.len(),
            enemy_spawns.len()
        );

        Ok(Self {
            grid,
            player_spawns,
            enemy_spawns,
            roster: default_roster(),
        })
    }

    pub fn with_roster(mut self, roster: Vec<Archetype>) -> Self {
        self.roster = roster;
        self
    }

    /// Built-in stage used by the headless runner
    pub fn demo() -> Result<Self, LevelError> {
        Self::parse(DEMO_LAYOUT)
    }
}

/// Ten units, weighted toward the weaker archetypes
pub fn default_roster() -> Vec<Archetype> {
    use Archetype::*;
    vec![Basic, Basic, Fast, Basic, Power, Fast, Basic, Armor, Power, Armor]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_spawns_and_tiles() {
        let level = Level::parse("E.~\n#.@\nP.%\n").unwrap();
        assert_eq!(level.grid.width(), 3);
        assert_eq!(level.grid.height(), 3);
        assert_eq!(level.enemy_spawns, vec![IVec2::new(0, 0)]);
        assert_eq!(level.player_spawns, vec![IVec2::new(0, 2)]);
        assert!(level.grid.is_passable(IVec2::new(0, 0)));
        assert_eq!(level.grid.tile(IVec2::new(2, 1)), Some(Tile::Steel));
        assert_eq!(level.roster.len(), 10);
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(Level::parse(""), Err(LevelError::Empty));
        assert_eq!(
            Level::parse("E.\nP"),
            Err(LevelError::RaggedRow {
                row: 1,
                found: 1,
                expected: 2
            })
        );
        assert_eq!(
            Level::parse("EX\nP."),
            Err(LevelError::UnknownTile {
                ch: 'X',
                row: 0,
                column: 1
            })
        );
        assert_eq!(Level::parse("E.\n.."), Err(LevelError::NoPlayerSpawn));
        assert_eq!(Level::parse("P.\n.."), Err(LevelError::NoEnemySpawn));
    }

    #[test]
    fn test_demo_layout_is_valid() {
        let level = Level::demo().unwrap();
        assert_eq!(level.player_spawns.len(), 2);
        assert_eq!(level.enemy_spawns.len(), 3);
        assert_eq!(level.grid.width(), 13);
    }
}

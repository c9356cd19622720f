//! Core type definitions for the simulation.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the two competing cultures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Team {
    A,
    B,
}

impl Team {
    pub fn opponent(&self) -> Team {
        match self {
            Team::A => Team::B,
            Team::B => Team::A,
        }
    }

    pub fn all() -> [Team; 2] {
        [Team::A, Team::B]
    }
}

impl fmt::Display for Team {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Team::A => write!(f, "A"),
            Team::B => write!(f, "B"),
        }
    }
}

/// Grid coordinate, row-major. Signed so neighbour offsets can step off the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub row: i32,
    pub col: i32,
}

impl Position {
    pub fn new(row: i32, col: i32) -> Self {
        Self { row, col }
    }

    pub fn add(&self, drow: i32, dcol: i32) -> Self {
        Self {
            row: self.row + drow,
            col: self.col + dcol,
        }
    }

    /// Step `distance` cells in a cardinal direction
    pub fn step(&self, direction: Direction, distance: i32) -> Self {
        let (drow, dcol) = direction.to_delta();
        self.add(drow * distance, dcol * distance)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// Cardinal direction for movement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    North,
    East,
    South,
    West,
}

impl Direction {
    /// `(drow, dcol)` offset
    pub fn to_delta(&self) -> (i32, i32) {
        match self {
            Direction::North => (-1, 0),
            Direction::East => (0, 1),
            Direction::South => (1, 0),
            Direction::West => (0, -1),
        }
    }

    pub fn reverse(&self) -> Direction {
        match self {
            Direction::North => Direction::South,
            Direction::East => Direction::West,
            Direction::South => Direction::North,
            Direction::West => Direction::East,
        }
    }

    /// Fixed scan order: N, E, S, W
    pub fn all() -> [Direction; 4] {
        [
            Direction::North,
            Direction::East,
            Direction::South,
            Direction::West,
        ]
    }
}

/// Offsets of the four diagonal neighbours
pub const DIAGONAL_OFFSETS: [(i32, i32); 4] = [(-1, -1), (-1, 1), (1, -1), (1, 1)];

/// Cell state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CellState {
    Empty,
    Dot,
    Producer,
    Block,
    BombArmed,
    BombHot,
}

/// Kinds of living cell that can be seeded from outside the resolvers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CellKind {
    Dot,
    Producer,
}

impl From<CellKind> for CellState {
    fn from(kind: CellKind) -> Self {
        match kind {
            CellKind::Dot => CellState::Dot,
            CellKind::Producer => CellState::Producer,
        }
    }
}

/// One grid position.
///
/// `team` is `None` exactly when `state` is `Empty`. `health` only means
/// something for dots and producers and stays 0 everywhere else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Cell {
    pub state: CellState,
    pub team: Option<Team>,
    pub health: u8,
}

impl Cell {
    pub fn empty() -> Self {
        Self {
            state: CellState::Empty,
            team: None,
            health: 0,
        }
    }

    pub fn dot(team: Team) -> Self {
        Self {
            state: CellState::Dot,
            team: Some(team),
            health: 0,
        }
    }

    pub fn producer(team: Team) -> Self {
        Self {
            state: CellState::Producer,
            team: Some(team),
            health: 0,
        }
    }

    pub fn block(team: Team) -> Self {
        Self {
            state: CellState::Block,
            team: Some(team),
            health: 0,
        }
    }

    pub fn bomb_armed(team: Team) -> Self {
        Self {
            state: CellState::BombArmed,
            team: Some(team),
            health: 0,
        }
    }

    pub fn bomb_hot(team: Team) -> Self {
        Self {
            state: CellState::BombHot,
            team: Some(team),
            health: 0,
        }
    }

    pub fn living(team: Team, kind: CellKind) -> Self {
        match kind {
            CellKind::Dot => Self::dot(team),
            CellKind::Producer => Self::producer(team),
        }
    }

    pub fn with_health(mut self, health: u8) -> Self {
        self.health = health;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.state == CellState::Empty
    }

    /// Dots and producers: the cells that replicate, fight and get fed
    pub fn is_living(&self) -> bool {
        matches!(self.state, CellState::Dot | CellState::Producer)
    }

    pub fn is_bomb(&self) -> bool {
        matches!(self.state, CellState::BombArmed | CellState::BombHot)
    }

    pub fn is_living_of(&self, team: Team) -> bool {
        self.is_living() && self.team == Some(team)
    }

    pub fn is_wall_of(&self, team: Team) -> bool {
        self.state == CellState::Block && self.team == Some(team)
    }

    /// Non-empty cell owned by the other culture
    pub fn is_enemy_of(&self, team: Team) -> bool {
        matches!(self.team, Some(owner) if owner != team)
    }

    /// Check the state/team/health consistency rules for a single cell
    pub fn is_consistent(&self, max_health: u8) -> bool {
        match self.state {
            CellState::Empty => self.team.is_none() && self.health == 0,
            CellState::Dot | CellState::Producer => {
                self.team.is_some() && self.health <= max_health
            }
            CellState::Block | CellState::BombArmed | CellState::BombHot => {
                self.team.is_some() && self.health == 0
            }
        }
    }
}

impl Default for Cell {
    fn default() -> Self {
        Self::empty()
    }
}

/// Visual hint attached to a cell by the rule resolver. Advisory only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AnimationKind {
    /// Replication or capture
    Spawn,
    /// Pressure relocation
    Move,
    /// Burst dot landing on an empty diagonal
    Plop,
    /// Burst overwrite of an occupied diagonal
    Block,
}

/// Stable identifier for a nutrient token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NutrientId(pub u64);

impl fmt::Display for NutrientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

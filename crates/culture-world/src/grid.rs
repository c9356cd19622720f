//! 2D bounded grid for the board.

use culture_core::{Cell, CellState, Direction, Error, Position, Result, Team};
use serde::{Deserialize, Serialize};

/// Moore neighbourhood offsets, row-major
const MOORE_OFFSETS: [(i32, i32); 8] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, -1),
    (0, 1),
    (1, -1),
    (1, 0),
    (1, 1),
];

/// A fixed-size rectangular grid with no wraparound
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid {
    pub rows: i32,
    pub cols: i32,
    cells: Vec<Cell>,
}

/// Per-team cell counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamCensus {
    pub dots: usize,
    pub producers: usize,
    pub blocks: usize,
    pub bombs: usize,
}

impl TeamCensus {
    pub fn living(&self) -> usize {
        self.dots + self.producers
    }
}

/// Board-wide cell counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Census {
    pub team_a: TeamCensus,
    pub team_b: TeamCensus,
    pub empty: usize,
}

impl Census {
    pub fn team(&self, team: Team) -> &TeamCensus {
        match team {
            Team::A => &self.team_a,
            Team::B => &self.team_b,
        }
    }

    fn team_mut(&mut self, team: Team) -> &mut TeamCensus {
        match team {
            Team::A => &mut self.team_a,
            Team::B => &mut self.team_b,
        }
    }
}

impl Grid {
    /// Empty board. Dimensions whose cell count does not fit in `usize`
    /// give a 0x0 board; `SimConfig::validate` keeps real boards far below that.
    pub fn new(rows: i32, cols: i32) -> Self {
        let (rows, cols) = (rows.max(0), cols.max(0));
        match (rows as usize).checked_mul(cols as usize) {
            Some(size) => Self {
                rows,
                cols,
                cells: vec![Cell::empty(); size],
            },
            None => Self {
                rows: 0,
                cols: 0,
                cells: Vec::new(),
            },
        }
    }

    pub fn in_bounds(&self, pos: Position) -> bool {
        pos.row >= 0 && pos.row < self.rows && pos.col >= 0 && pos.col < self.cols
    }

    /// Get cell at position, `None` off the board
    pub fn get(&self, pos: Position) -> Option<&Cell> {
        if self.in_bounds(pos) {
            Some(&self.cells[self.pos_to_index(pos)])
        } else {
            None
        }
    }

    /// Get mutable cell at position
    pub fn get_mut(&mut self, pos: Position) -> Option<&mut Cell> {
        if self.in_bounds(pos) {
            let index = self.pos_to_index(pos);
            Some(&mut self.cells[index])
        } else {
            None
        }
    }

    /// Set cell at position. Off-board writes are dropped.
    pub fn set(&mut self, pos: Position, cell: Cell) {
        if let Some(slot) = self.get_mut(pos) {
            *slot = cell;
        }
    }

    /// Vacate a cell
    pub fn clear(&mut self, pos: Position) {
        self.set(pos, Cell::empty());
    }

    /// Place a dot or producer on an empty cell.
    ///
    /// Returns `false` without touching the grid when the target is occupied,
    /// off the board, or the cell is not a living kind.
    pub fn seed(&mut self, pos: Position, cell: Cell) -> bool {
        if !cell.is_living() || cell.team.is_none() {
            return false;
        }
        match self.get_mut(pos) {
            Some(slot) if slot.is_empty() => {
                *slot = cell;
                true
            }
            _ => false,
        }
    }

    pub fn is_empty_at(&self, pos: Position) -> bool {
        self.get(pos).map_or(false, Cell::is_empty)
    }

    /// In-bounds cardinal neighbours in N, E, S, W order
    pub fn cardinal_neighbors(
        &self,
        pos: Position,
    ) -> impl Iterator<Item = (Direction, Position)> + '_ {
        Direction::all()
            .into_iter()
            .map(move |direction| (direction, pos.step(direction, 1)))
            .filter(move |(_, neighbor)| self.in_bounds(*neighbor))
    }

    /// In-bounds 8-neighbourhood, row-major
    pub fn moore_neighbors(&self, pos: Position) -> impl Iterator<Item = Position> + '_ {
        MOORE_OFFSETS
            .into_iter()
            .map(move |(drow, dcol)| pos.add(drow, dcol))
            .filter(move |neighbor| self.in_bounds(*neighbor))
    }

    /// Cardinal neighbours that are walls of `team`
    pub fn wall_neighbors(&self, pos: Position, team: Team) -> Vec<(Direction, Position)> {
        self.cardinal_neighbors(pos)
            .filter(|(_, neighbor)| {
                self.get(*neighbor)
                    .map_or(false, |cell| cell.is_wall_of(team))
            })
            .collect()
    }

    fn pos_to_index(&self, pos: Position) -> usize {
        (pos.row * self.cols + pos.col) as usize
    }

    /// Get position from index
    pub fn index_to_pos(&self, index: usize) -> Position {
        let row = (index as i32) / self.cols;
        let col = (index as i32) % self.cols;
        Position::new(row, col)
    }

    /// Iterator over all cells with positions, row-major
    pub fn iter(&self) -> impl Iterator<Item = (Position, &Cell)> + '_ {
        self.cells
            .iter()
            .enumerate()
            .map(move |(i, cell)| (self.index_to_pos(i), cell))
    }

    /// Check every cell against the state/team/health rules
    pub fn validate(&self, max_health: u8) -> Result<()> {
        match self.iter().find(|(_, cell)| !cell.is_consistent(max_health)) {
            Some((pos, cell)) => Err(Error::InvalidState(format!(
                "inconsistent cell at {}: {:?}",
                pos, cell
            ))),
            None => Ok(()),
        }
    }

    pub fn census(&self) -> Census {
        let mut census = Census::default();
        for cell in &self.cells {
            let Some(team) = cell.team else {
                census.empty += 1;
                continue;
            };
            let counts = census.team_mut(team);
            match cell.state {
                CellState::Dot => counts.dots += 1,
                CellState::Producer => counts.producers += 1,
                CellState::Block => counts.blocks += 1,
                CellState::BombArmed | CellState::BombHot => counts.bombs += 1,
                CellState::Empty => {}
            }
        }
        census
    }

    /// Binary snapshot, stable for identical boards
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(bincode::deserialize(bytes)?)
    }

    /// Plain-text board, one line per row.
    ///
    /// Dots are lowercase team letters, producers uppercase, blocks `#`/`%`,
    /// armed bombs `*`, hot bombs `@`, empty cells `.`.
    pub fn render(&self) -> String {
        let mut out = String::with_capacity(self.cells.len() + self.rows.max(0) as usize);
        for row in 0..self.rows {
            for col in 0..self.cols {
                let cell = &self.cells[self.pos_to_index(Position::new(row, col))];
                out.push(glyph(cell));
            }
            out.push('\n');
        }
        out
    }
}

fn glyph(cell: &Cell) -> char {
    match (cell.state, cell.team) {
        (CellState::Empty, _) | (_, None) => '.',
        (CellState::Dot, Some(Team::A)) => 'a',
        (CellState::Dot, Some(Team::B)) => 'b',
        (CellState::Producer, Some(Team::A)) => 'A',
        (CellState::Producer, Some(Team::B)) => 'B',
        (CellState::Block, Some(Team::A)) => '#',
        (CellState::Block, Some(Team::B)) => '%',
        (CellState::BombArmed, Some(_)) => '*',
        (CellState::BombHot, Some(_)) => '@',
    }
}

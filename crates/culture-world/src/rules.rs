//! Per-tick rule resolver.
//!
//! [`step`] runs four phases in a fixed order over an explicit working grid:
//! bomb arming, detonation, replication & combat, and line-of-five pressure.
//! Each phase is exposed on its own so it can be exercised in isolation.

use crate::grid::Grid;
use culture_core::{
    AnimationKind, Cell, CellState, Direction, Position, SimConfig, Team, DIAGONAL_OFFSETS,
};
use rand::seq::SliceRandom;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, trace};

/// Distance-2 cells that may join a blast footprint
const SPILLOVER_OFFSETS: [(i32, i32); 8] = [
    (-2, 0),
    (2, 0),
    (0, -2),
    (0, 2),
    (-2, -2),
    (-2, 2),
    (2, -2),
    (2, 2),
];

/// Cells in a line-of-five window
const PRESSURE_RUN: i32 = 5;

/// Result of one resolver pass
#[derive(Debug, Clone)]
pub struct StepOutcome {
    pub grid: Grid,
    /// Every cell touched by a blast this tick, survivors included
    pub blast_cells: BTreeSet<Position>,
    pub animations: BTreeMap<Position, AnimationKind>,
}

/// What a spawn intent asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntentKind {
    /// Claim an empty cell
    Spawn,
    /// Wear down or capture an enemy dot/producer
    Attack,
}

/// Tick-local proposal produced by the replication scan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpawnIntent {
    pub target: Position,
    pub team: Team,
    pub kind: IntentKind,
}

/// Bombs found on the pre-tick grid
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Detonations {
    /// Cells that were hot at the start of the tick
    pub hot: Vec<Position>,
}

/// Advance the board by one tick
pub fn step(grid: &Grid, config: &SimConfig, rng: &mut ChaCha8Rng) -> StepOutcome {
    let mut animations = BTreeMap::new();

    let (mut working, detonations) = arm_bombs(grid, config);
    let blast_cells = detonate(&mut working, &detonations, config, rng);
    let intents = collect_intents(&working, rng);
    let intent_count = intents.len();
    resolve_intents(&mut working, intents, rng, &mut animations);
    let centers = find_pressure_centers(&working);
    let center_count = centers.len();
    apply_pressure(&mut working, centers, rng, &mut animations);

    debug!(
        hot_bombs = detonations.hot.len(),
        blast_cells = blast_cells.len(),
        intents = intent_count,
        pressure_centers = center_count,
        "Resolved tick"
    );

    StepOutcome {
        grid: working,
        blast_cells,
        animations,
    }
}

/// Phase 1: bomb arming and the armed -> hot advance.
///
/// Reads only the pre-tick grid so nothing produced later in the tick can arm
/// a bomb. Returns the working grid together with the bombs that go off in
/// phase 2.
pub fn arm_bombs(grid: &Grid, config: &SimConfig) -> (Grid, Detonations) {
    let mut working = grid.clone();
    let mut detonations = Detonations::default();

    for (pos, cell) in grid.iter() {
        let Some(team) = cell.team else {
            continue;
        };
        match cell.state {
            CellState::Dot | CellState::Producer => {
                let enemy_blocks = grid
                    .moore_neighbors(pos)
                    .filter(|neighbor| {
                        grid.get(*neighbor)
                            .map_or(false, |other| other.is_wall_of(team.opponent()))
                    })
                    .count();
                if enemy_blocks >= config.bomb_trigger_blocks {
                    trace!(%pos, %team, enemy_blocks, "Bomb armed");
                    working.set(pos, Cell::bomb_armed(team));
                }
            }
            CellState::BombArmed => working.set(pos, Cell::bomb_hot(team)),
            CellState::BombHot => detonations.hot.push(pos),
            CellState::Block | CellState::Empty => {}
        }
    }

    (working, detonations)
}

/// Phase 2: every bomb that was hot before the tick explodes.
pub fn detonate(
    working: &mut Grid,
    detonations: &Detonations,
    config: &SimConfig,
    rng: &mut ChaCha8Rng,
) -> BTreeSet<Position> {
    let mut blast_cells = BTreeSet::new();

    for &center in &detonations.hot {
        let footprint = blast_footprint(working, center, config, rng);
        trace!(%center, cells = footprint.len(), "Bomb detonated");

        for pos in footprint {
            blast_cells.insert(pos);
            let Some(cell) = working.get(pos).copied() else {
                continue;
            };
            if cell.is_empty() {
                continue;
            }
            if cell.is_bomb() || !rng.gen_bool(config.blast_survival_chance) {
                working.clear(pos);
            }
        }
    }

    blast_cells
}

/// The 3x3 block around `center` plus each spillover cell that passes its roll,
/// clipped to the board
fn blast_footprint(
    grid: &Grid,
    center: Position,
    config: &SimConfig,
    rng: &mut ChaCha8Rng,
) -> Vec<Position> {
    let mut footprint: Vec<Position> = std::iter::once(center)
        .chain(grid.moore_neighbors(center))
        .collect();

    for (drow, dcol) in SPILLOVER_OFFSETS {
        let candidate = center.add(drow, dcol);
        if rng.gen_bool(config.spillover_chance) && grid.in_bounds(candidate) {
            footprint.push(candidate);
        }
    }

    footprint
}

/// Phase 3a: every dot/producer proposes at most one intent, row-major.
pub fn collect_intents(working: &Grid, rng: &mut ChaCha8Rng) -> Vec<SpawnIntent> {
    let mut intents = Vec::new();

    for (pos, cell) in working.iter() {
        if !cell.is_living() {
            continue;
        }
        let Some(team) = cell.team else {
            continue;
        };

        let mut directions = Direction::all();
        directions.shuffle(rng);

        if let Some(intent) = directions
            .into_iter()
            .find_map(|direction| propose(working, pos, team, direction))
        {
            intents.push(intent);
        }
    }

    intents
}

/// The intent a cell would emit when trying `direction`, if any
fn propose(grid: &Grid, origin: Position, team: Team, direction: Direction) -> Option<SpawnIntent> {
    let target = origin.step(direction, 1);
    let neighbor = grid.get(target)?;

    if neighbor.is_empty() {
        return Some(SpawnIntent {
            target,
            team,
            kind: IntentKind::Spawn,
        });
    }

    if neighbor.is_living_of(team) {
        let beyond = origin.step(direction, 2);
        return grid.is_empty_at(beyond).then_some(SpawnIntent {
            target: beyond,
            team,
            kind: IntentKind::Spawn,
        });
    }

    if neighbor.is_living_of(team.opponent()) {
        return Some(SpawnIntent {
            target,
            team,
            kind: IntentKind::Attack,
        });
    }

    None
}

/// Phase 3b: resolve all intents in one shuffled order.
///
/// Spawns claim cells that are still empty; attacks on cells that are still
/// enemy dots/producers either absorb a point of health or capture. Every
/// other case fails silently.
pub fn resolve_intents(
    working: &mut Grid,
    mut intents: Vec<SpawnIntent>,
    rng: &mut ChaCha8Rng,
    animations: &mut BTreeMap<Position, AnimationKind>,
) {
    intents.shuffle(rng);

    for intent in intents {
        let Some(target) = working.get_mut(intent.target) else {
            continue;
        };

        match intent.kind {
            IntentKind::Spawn => {
                if target.is_empty() {
                    *target = Cell::dot(intent.team);
                    animations.insert(intent.target, AnimationKind::Spawn);
                }
            }
            IntentKind::Attack => {
                if !target.is_living_of(intent.team.opponent()) {
                    continue;
                }
                if target.health > 0 {
                    target.health -= 1;
                } else {
                    *target = Cell::dot(intent.team);
                    animations.insert(intent.target, AnimationKind::Spawn);
                }
            }
        }
    }
}

/// Phase 4a: centres of every horizontal or vertical window of five
/// same-team dots/producers, each listed once, row-major.
pub fn find_pressure_centers(working: &Grid) -> Vec<(Position, Team)> {
    let mut centers = BTreeSet::new();

    for (start, cell) in working.iter() {
        if !cell.is_living() {
            continue;
        }
        let Some(team) = cell.team else {
            continue;
        };

        for direction in [Direction::East, Direction::South] {
            let complete = (1..PRESSURE_RUN).all(|offset| {
                working
                    .get(start.step(direction, offset))
                    .map_or(false, |other| other.is_living_of(team))
            });
            if complete {
                centers.insert((start.step(direction, PRESSURE_RUN / 2), team));
            }
        }
    }

    centers.into_iter().collect()
}

/// Phase 4b: relocate or burst each pressure centre, in random order.
pub fn apply_pressure(
    working: &mut Grid,
    mut centers: Vec<(Position, Team)>,
    rng: &mut ChaCha8Rng,
    animations: &mut BTreeMap<Position, AnimationKind>,
) {
    centers.shuffle(rng);

    for (center, team) in centers {
        let Some(occupant) = working.get(center).copied() else {
            continue;
        };
        // Already moved away or overwritten by an earlier burst
        if !occupant.is_living_of(team) {
            continue;
        }

        let open: Vec<Position> = working
            .cardinal_neighbors(center)
            .map(|(_, neighbor)| neighbor)
            .filter(|neighbor| working.is_empty_at(*neighbor))
            .collect();

        match open.choose(rng) {
            Some(&destination) => {
                working.set(destination, occupant);
                working.clear(center);
                animations.insert(destination, AnimationKind::Move);
            }
            None => burst(working, center, team, animations),
        }
    }
}

/// Vacate `center` and claim its diagonals: empty ones become dots, anything
/// occupied is overwritten with a block.
fn burst(
    working: &mut Grid,
    center: Position,
    team: Team,
    animations: &mut BTreeMap<Position, AnimationKind>,
) {
    trace!(%center, %team, "Pressure burst");
    working.clear(center);

    for (drow, dcol) in DIAGONAL_OFFSETS {
        let corner = center.add(drow, dcol);
        let Some(cell) = working.get(corner).copied() else {
            continue;
        };
        if cell.is_empty() {
            working.set(corner, Cell::dot(team));
            animations.insert(corner, AnimationKind::Plop);
        } else {
            working.set(corner, Cell::block(team));
            animations.insert(corner, AnimationKind::Block);
        }
    }
}

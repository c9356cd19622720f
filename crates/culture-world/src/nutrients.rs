//! Nutrient tokens travelling along wall networks.

use crate::grid::Grid;
use culture_core::{CellState, Direction, NutrientId, Position, SimConfig, Team};
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, trace};

/// A token sitting on one of its team's walls
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Nutrient {
    pub id: NutrientId,
    pub position: Position,
    pub team: Team,
    /// Last movement vector
    pub direction: Option<Direction>,
    /// Movement vector before `direction`
    pub previous_direction: Option<Direction>,
}

impl Nutrient {
    fn advance(&mut self, direction: Direction, destination: Position) {
        self.previous_direction = self.direction;
        self.direction = Some(direction);
        self.position = destination;
    }
}

/// Read-only view handed to observers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NutrientView {
    pub position: Position,
    pub team: Team,
}

impl From<&Nutrient> for NutrientView {
    fn from(nutrient: &Nutrient) -> Self {
        Self {
            position: nutrient.position,
            team: nutrient.team,
        }
    }
}

/// All live tokens plus the id counter for new ones
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NutrientPool {
    tokens: Vec<Nutrient>,
    next_id: u64,
}

impl NutrientPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tokens(&self) -> &[Nutrient] {
        &self.tokens
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Add a token at `position`, returning its id
    pub fn spawn(&mut self, position: Position, team: Team, direction: Option<Direction>) -> NutrientId {
        let id = NutrientId(self.next_id);
        self.next_id += 1;
        self.tokens.push(Nutrient {
            id,
            position,
            team,
            direction,
            previous_direction: None,
        });
        id
    }

    /// Drop tokens whose host is no longer a wall of their team. Returns how
    /// many were removed.
    pub fn prune(&mut self, grid: &Grid) -> usize {
        let before = self.tokens.len();
        self.tokens.retain(|token| {
            grid.get(token.position)
                .map_or(false, |cell| cell.is_wall_of(token.team))
        });
        before - self.tokens.len()
    }

    /// True when every token sits on a wall of its own team
    pub fn hosts_consistent(&self, grid: &Grid) -> bool {
        self.tokens.iter().all(|token| {
            grid.get(token.position)
                .map_or(false, |cell| cell.is_wall_of(token.team))
        })
    }

    pub fn views(&self) -> Vec<NutrientView> {
        self.tokens.iter().map(NutrientView::from).collect()
    }

    pub fn clear(&mut self) {
        self.tokens.clear();
        self.next_id = 0;
    }
}

/// Result of one nutrient pass
#[derive(Debug, Clone)]
pub struct FlowOutcome {
    pub grid: Grid,
    pub pool: NutrientPool,
    /// Tokens created by producers this pass
    pub emitted: usize,
    /// Cells that received a feeding, in processing order
    pub fed: Vec<Position>,
}

/// Per-cell token counts for one pass
struct Occupancy {
    counts: HashMap<Position, usize>,
    cap: usize,
}

impl Occupancy {
    fn new(tokens: &[Nutrient], cap: usize) -> Self {
        let mut counts = HashMap::new();
        for token in tokens {
            *counts.entry(token.position).or_insert(0) += 1;
        }
        Self { counts, cap }
    }

    fn has_room(&self, pos: Position) -> bool {
        self.counts.get(&pos).copied().unwrap_or(0) < self.cap
    }

    fn enter(&mut self, pos: Position) {
        *self.counts.entry(pos).or_insert(0) += 1;
    }

    fn leave(&mut self, pos: Position) {
        if let Some(count) = self.counts.get_mut(&pos) {
            *count = count.saturating_sub(1);
        }
    }
}

/// Advance every token one step and run producer emission when due
pub fn flow(
    grid: &Grid,
    pool: &NutrientPool,
    nutrient_tick: u64,
    config: &SimConfig,
    rng: &mut ChaCha8Rng,
) -> FlowOutcome {
    let mut working = grid.clone();
    let mut next_pool = pool.clone();
    let pruned = next_pool.prune(grid);

    let mut occupancy = Occupancy::new(&next_pool.tokens, config.nutrient_occupancy_cap);
    let mut fed = Vec::new();
    let mut survivors = Vec::with_capacity(next_pool.tokens.len());

    for mut token in std::mem::take(&mut next_pool.tokens) {
        let mut walls = working.wall_neighbors(token.position, token.team);
        if let Some(heading) = token.direction {
            if walls.len() > 1 {
                walls.retain(|(direction, _)| *direction != heading.reverse());
            }
        }

        match walls.choose(rng) {
            Some(&(direction, destination)) => {
                if occupancy.has_room(destination) {
                    occupancy.leave(token.position);
                    occupancy.enter(destination);
                    token.advance(direction, destination);
                }
                survivors.push(token);
            }
            None => {
                occupancy.leave(token.position);
                if let Some(target) = feed(&mut working, token.position, token.team, config) {
                    trace!(id = %token.id, %target, "Nutrient fed");
                    fed.push(target);
                } else {
                    trace!(id = %token.id, position = %token.position, "Nutrient dissipated");
                }
            }
        }
    }
    next_pool.tokens = survivors;

    let emitted = if nutrient_tick % config.emission_interval == 0 {
        emit(&working, &mut next_pool, &mut occupancy, rng)
    } else {
        0
    };

    debug!(
        nutrient_tick,
        pruned,
        fed = fed.len(),
        emitted,
        tokens = next_pool.tokens.len(),
        "Resolved nutrient tick"
    );

    FlowOutcome {
        grid: working,
        pool: next_pool,
        emitted,
        fed,
    }
}

/// Feed the first friendly dot/producer next to a dead end.
///
/// Health rises by one up to the cap; a fed dot with no enemy on any cardinal
/// side becomes a producer.
fn feed(working: &mut Grid, dead_end: Position, team: Team, config: &SimConfig) -> Option<Position> {
    let target = working
        .cardinal_neighbors(dead_end)
        .map(|(_, neighbor)| neighbor)
        .find(|neighbor| {
            working
                .get(*neighbor)
                .map_or(false, |cell| cell.is_living_of(team))
        })?;

    let exposed = working.cardinal_neighbors(target).any(|(_, neighbor)| {
        working
            .get(neighbor)
            .map_or(false, |cell| cell.is_enemy_of(team))
    });

    let cell = working.get_mut(target)?;
    cell.health = cell.health.saturating_add(1).min(config.max_health);
    if !exposed {
        cell.state = CellState::Producer;
    }

    Some(target)
}

/// Every producer touching its team's walls pushes one token into a random one
fn emit(
    working: &Grid,
    pool: &mut NutrientPool,
    occupancy: &mut Occupancy,
    rng: &mut ChaCha8Rng,
) -> usize {
    let mut emitted = 0;

    for (pos, cell) in working.iter() {
        if cell.state != CellState::Producer {
            continue;
        }
        let Some(team) = cell.team else {
            continue;
        };

        let walls = working.wall_neighbors(pos, team);
        let Some(&(direction, destination)) = walls.choose(rng) else {
            continue;
        };
        if occupancy.has_room(destination) {
            occupancy.enter(destination);
            pool.spawn(destination, team, Some(direction));
            emitted += 1;
        }
    }

    emitted
}

#[cfg(test)]
mod tests {
    use super::*;
    use culture_core::Cell;
    use rand::SeedableRng;

    fn rng() -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(42)
    }

    #[test]
    fn test_prune_removes_orphans() {
        let mut grid = Grid::new(5, 5);
        grid.set(Position::new(1, 1), Cell::block(Team::A));
        grid.set(Position::new(2, 2), Cell::block(Team::B));

        let mut pool = NutrientPool::new();
        pool.spawn(Position::new(1, 1), Team::A, None);
        pool.spawn(Position::new(2, 2), Team::A, None);
        pool.spawn(Position::new(3, 3), Team::B, None);

        assert_eq!(pool.prune(&grid), 2);
        assert_eq!(pool.len(), 1);
        assert!(pool.hosts_consistent(&grid));
    }

    #[test]
    fn test_ids_are_unique_and_increasing() {
        let mut pool = NutrientPool::new();
        let first = pool.spawn(Position::new(0, 0), Team::A, None);
        let second = pool.spawn(Position::new(0, 1), Team::A, None);
        assert!(second > first);

        pool.clear();
        assert!(pool.is_empty());
        assert_eq!(pool.spawn(Position::new(0, 0), Team::B, None), NutrientId(0));
    }

    #[test]
    fn test_dead_end_feeds_and_promotes() {
        let mut grid = Grid::new(5, 5);
        let wall = Position::new(2, 2);
        let dot = Position::new(2, 3);
        grid.set(wall, Cell::block(Team::A));
        grid.set(dot, Cell::dot(Team::A));

        let mut pool = NutrientPool::new();
        pool.spawn(wall, Team::A, None);

        let outcome = flow(&grid, &pool, 1, &SimConfig::default(), &mut rng());
        assert!(outcome.pool.is_empty());
        assert_eq!(outcome.fed, vec![dot]);
        assert_eq!(outcome.grid.get(dot), Some(&Cell::producer(Team::A).with_health(1)));
    }

    #[test]
    fn test_exposed_dot_is_fed_but_not_promoted() {
        let mut grid = Grid::new(5, 5);
        let wall = Position::new(2, 2);
        let dot = Position::new(2, 3);
        grid.set(wall, Cell::block(Team::A));
        grid.set(dot, Cell::dot(Team::A).with_health(3));
        grid.set(Position::new(1, 3), Cell::block(Team::B));

        let mut pool = NutrientPool::new();
        pool.spawn(wall, Team::A, None);

        let outcome = flow(&grid, &pool, 1, &SimConfig::default(), &mut rng());
        assert_eq!(outcome.grid.get(dot), Some(&Cell::dot(Team::A).with_health(3)));
    }

    #[test]
    fn test_feed_at_highest_health_cap_saturates() {
        let mut grid = Grid::new(5, 5);
        let wall = Position::new(2, 2);
        let dot = Position::new(2, 3);
        grid.set(wall, Cell::block(Team::A));
        grid.set(dot, Cell::dot(Team::A).with_health(u8::MAX));

        let mut pool = NutrientPool::new();
        pool.spawn(wall, Team::A, None);

        let config = SimConfig {
            max_health: u8::MAX,
            ..Default::default()
        };
        let outcome = flow(&grid, &pool, 1, &config, &mut rng());
        assert_eq!(outcome.fed, vec![dot]);
        assert_eq!(
            outcome.grid.get(dot),
            Some(&Cell::producer(Team::A).with_health(u8::MAX))
        );
    }

    #[test]
    fn test_feed_scan_order_picks_first() {
        let mut grid = Grid::new(5, 5);
        let wall = Position::new(2, 2);
        grid.set(wall, Cell::block(Team::B));
        grid.set(Position::new(1, 2), Cell::dot(Team::B));
        grid.set(Position::new(3, 2), Cell::dot(Team::B));

        let mut pool = NutrientPool::new();
        pool.spawn(wall, Team::B, None);

        let outcome = flow(&grid, &pool, 1, &SimConfig::default(), &mut rng());
        assert_eq!(outcome.fed, vec![Position::new(1, 2)]);
        assert_eq!(outcome.grid.get(Position::new(3, 2)), Some(&Cell::dot(Team::B)));
    }

    #[test]
    fn test_isolated_token_dissipates() {
        let mut grid = Grid::new(5, 5);
        let wall = Position::new(2, 2);
        grid.set(wall, Cell::block(Team::A));
        grid.set(Position::new(2, 3), Cell::dot(Team::B));

        let mut pool = NutrientPool::new();
        pool.spawn(wall, Team::A, None);

        let outcome = flow(&grid, &pool, 1, &SimConfig::default(), &mut rng());
        assert!(outcome.pool.is_empty());
        assert!(outcome.fed.is_empty());
        assert_eq!(outcome.grid, grid);
    }

    #[test]
    fn test_corridor_allows_doubling_back() {
        let mut grid = Grid::new(3, 5);
        grid.set(Position::new(1, 1), Cell::block(Team::A));
        grid.set(Position::new(1, 2), Cell::block(Team::A));

        let mut pool = NutrientPool::new();
        pool.spawn(Position::new(1, 2), Team::A, Some(Direction::East));

        let outcome = flow(&grid, &pool, 1, &SimConfig::default(), &mut rng());
        let token = &outcome.pool.tokens()[0];
        assert_eq!(token.position, Position::new(1, 1));
        assert_eq!(token.direction, Some(Direction::West));
        assert_eq!(token.previous_direction, Some(Direction::East));
    }

    #[test]
    fn test_branch_never_backtracks() {
        let mut grid = Grid::new(5, 5);
        let junction = Position::new(2, 2);
        for pos in [
            junction,
            Position::new(2, 1),
            Position::new(1, 2),
            Position::new(3, 2),
        ] {
            grid.set(pos, Cell::block(Team::A));
        }

        for seed in 0..32 {
            let mut pool = NutrientPool::new();
            pool.spawn(junction, Team::A, Some(Direction::East));
            let outcome = flow(
                &grid,
                &pool,
                1,
                &SimConfig::default(),
                &mut ChaCha8Rng::seed_from_u64(seed),
            );
            assert_ne!(outcome.pool.tokens()[0].position, Position::new(2, 1));
        }
    }

    #[test]
    fn test_occupancy_cap_holds_token_in_place() {
        let mut grid = Grid::new(3, 3);
        grid.set(Position::new(1, 0), Cell::block(Team::A));
        grid.set(Position::new(1, 1), Cell::block(Team::A));

        let mut pool = NutrientPool::new();
        pool.spawn(Position::new(1, 0), Team::A, None);
        pool.spawn(Position::new(1, 1), Team::A, Some(Direction::East));

        let outcome = flow(&grid, &pool, 1, &SimConfig::default(), &mut rng());
        let positions: Vec<Position> = outcome.pool.tokens().iter().map(|t| t.position).collect();
        // Each token's only wall neighbour is occupied by the other
        assert_eq!(positions, vec![Position::new(1, 0), Position::new(1, 1)]);
    }

    #[test]
    fn test_emission_only_on_cadence() {
        let mut grid = Grid::new(5, 5);
        grid.set(Position::new(2, 2), Cell::producer(Team::A));
        grid.set(Position::new(2, 3), Cell::block(Team::A));
        grid.set(Position::new(2, 4), Cell::block(Team::A));
        let config = SimConfig::default();

        let quiet = flow(&grid, &NutrientPool::new(), 5, &config, &mut rng());
        assert_eq!(quiet.emitted, 0);
        assert!(quiet.pool.is_empty());

        let due = flow(&grid, &NutrientPool::new(), 6, &config, &mut rng());
        assert_eq!(due.emitted, 1);
        let token = &due.pool.tokens()[0];
        assert_eq!(token.position, Position::new(2, 3));
        assert_eq!(token.team, Team::A);
        assert_eq!(token.direction, Some(Direction::East));
    }

    #[test]
    fn test_emission_blocked_by_occupied_wall() {
        let mut grid = Grid::new(3, 3);
        grid.set(Position::new(1, 1), Cell::producer(Team::B));
        grid.set(Position::new(0, 1), Cell::block(Team::B));
        grid.set(Position::new(0, 0), Cell::block(Team::B));
        grid.set(Position::new(0, 2), Cell::block(Team::B));

        // Every wall already holds a token, so nothing moves or gets emitted
        let mut pool = NutrientPool::new();
        pool.spawn(Position::new(0, 0), Team::B, None);
        pool.spawn(Position::new(0, 2), Team::B, None);
        pool.spawn(Position::new(0, 1), Team::B, None);

        let outcome = flow(&grid, &pool, 6, &SimConfig::default(), &mut rng());
        assert_eq!(outcome.emitted, 0);
        assert_eq!(outcome.pool.len(), 3);
    }

    #[test]
    fn test_producer_without_walls_emits_nothing() {
        let mut grid = Grid::new(3, 3);
        grid.set(Position::new(1, 1), Cell::producer(Team::A));
        grid.set(Position::new(0, 1), Cell::block(Team::B));

        let outcome = flow(&grid, &NutrientPool::new(), 12, &SimConfig::default(), &mut rng());
        assert_eq!(outcome.emitted, 0);
    }
}

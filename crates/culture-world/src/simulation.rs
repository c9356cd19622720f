//! Simulation driver owning the board and the nutrient tokens.

use crate::grid::{Census, Grid};
use crate::nutrients::{self, Nutrient, NutrientPool, NutrientView};
use crate::rules;
use culture_core::{AnimationKind, Cell, CellKind, Error, Position, Result, SimConfig, Team};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, instrument};

/// A placement request from outside the resolvers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedCommand {
    pub position: Position,
    pub team: Team,
    pub kind: CellKind,
}

impl SeedCommand {
    pub fn new(position: Position, team: Team, kind: CellKind) -> Self {
        Self {
            position,
            team,
            kind,
        }
    }
}

/// What observers get back from a main tick
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickReport {
    pub tick: u64,
    pub blast_cells: BTreeSet<Position>,
    pub animations: BTreeMap<Position, AnimationKind>,
}

/// What observers get back from a nutrient tick
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NutrientReport {
    pub nutrient_tick: u64,
    pub emitted: usize,
    pub fed: Vec<Position>,
}

pub struct Simulation {
    grid: Grid,
    nutrients: NutrientPool,
    config: SimConfig,
    rng: ChaCha8Rng,
    tick: u64,
    nutrient_tick: u64,
    pending_seeds: Vec<SeedCommand>,
}

impl Simulation {
    pub fn new(config: SimConfig) -> Result<Self> {
        config.validate()?;
        let rng = ChaCha8Rng::seed_from_u64(config.seed);

        info!(
            rows = config.rows,
            cols = config.cols,
            seed = config.seed,
            "Created simulation"
        );

        Ok(Self {
            grid: Grid::new(config.rows, config.cols),
            nutrients: NutrientPool::new(),
            config,
            rng,
            tick: 0,
            nutrient_tick: 0,
            pending_seeds: Vec::new(),
        })
    }

    /// Start from a prepared board instead of an empty one
    pub fn with_grid(config: SimConfig, grid: Grid) -> Result<Self> {
        if grid.rows != config.rows || grid.cols != config.cols {
            return Err(Error::Validation(format!(
                "grid is {}x{} but config expects {}x{}",
                grid.rows, grid.cols, config.rows, config.cols
            )));
        }
        grid.validate(config.max_health)?;

        let mut sim = Self::new(config)?;
        sim.grid = grid;
        Ok(sim)
    }

    /// Place a dot or producer right away. Occupied or off-board targets are
    /// ignored; returns whether the cell was placed.
    pub fn seed(&mut self, position: Position, team: Team, kind: CellKind) -> bool {
        let placed = self.grid.seed(position, Cell::living(team, kind));
        if placed {
            debug!(%position, %team, ?kind, "Seeded cell");
        }
        placed
    }

    /// Defer a placement until just before the next main tick
    pub fn queue_seed(&mut self, command: SeedCommand) {
        self.pending_seeds.push(command);
    }

    pub fn pending_seeds(&self) -> usize {
        self.pending_seeds.len()
    }

    /// Run one rule-resolver pass and commit it
    #[instrument(skip(self), fields(tick = self.tick + 1))]
    pub fn tick(&mut self) -> TickReport {
        for command in std::mem::take(&mut self.pending_seeds) {
            self.seed(command.position, command.team, command.kind);
        }

        let outcome = rules::step(&self.grid, &self.config, &mut self.rng);
        self.grid = outcome.grid;
        self.tick += 1;

        let pruned = self.nutrients.prune(&self.grid);
        if pruned > 0 {
            debug!(pruned, "Dropped nutrients whose walls were lost");
        }
        self.debug_check();

        TickReport {
            tick: self.tick,
            blast_cells: outcome.blast_cells,
            animations: outcome.animations,
        }
    }

    /// Run one nutrient pass and commit it
    #[instrument(skip(self), fields(nutrient_tick = self.nutrient_tick + 1))]
    pub fn nutrient_tick(&mut self) -> NutrientReport {
        self.nutrient_tick += 1;

        let outcome = nutrients::flow(
            &self.grid,
            &self.nutrients,
            self.nutrient_tick,
            &self.config,
            &mut self.rng,
        );
        self.grid = outcome.grid;
        self.nutrients = outcome.pool;
        self.debug_check();

        NutrientReport {
            nutrient_tick: self.nutrient_tick,
            emitted: outcome.emitted,
            fed: outcome.fed,
        }
    }

    /// Back to an empty board with no tokens. The random stream carries on.
    pub fn reset(&mut self) {
        self.grid = Grid::new(self.config.rows, self.config.cols);
        self.nutrients.clear();
        self.pending_seeds.clear();
        self.tick = 0;
        self.nutrient_tick = 0;
        info!("Simulation reset");
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn nutrients(&self) -> Vec<NutrientView> {
        self.nutrients.views()
    }

    pub fn tokens(&self) -> &[Nutrient] {
        self.nutrients.tokens()
    }

    pub fn census(&self) -> Census {
        self.grid.census()
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    pub fn nutrient_tick_count(&self) -> u64 {
        self.nutrient_tick
    }

    fn debug_check(&self) {
        debug_assert!(
            self.grid.validate(self.config.max_health).is_ok(),
            "grid invariant violated: {:?}",
            self.grid.validate(self.config.max_health)
        );
        debug_assert!(
            self.nutrients.hosts_consistent(&self.grid),
            "nutrient found off its team's walls"
        );
    }
}

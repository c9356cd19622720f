//! Thread-safe handle serialising every access to one simulation.

use crate::grid::{Census, Grid};
use crate::nutrients::NutrientView;
use crate::simulation::{NutrientReport, SeedCommand, Simulation, TickReport};
use culture_core::{CellKind, Position, Team};
use parking_lot::Mutex;
use std::sync::Arc;

/// Cloneable handle for periodic drivers and input collaborators.
///
/// Every call holds the lock for its whole duration, so ticks, nutrient ticks,
/// seeds and resets never interleave.
#[derive(Clone)]
pub struct SharedSimulation {
    inner: Arc<Mutex<Simulation>>,
}

impl SharedSimulation {
    pub fn new(simulation: Simulation) -> Self {
        Self {
            inner: Arc::new(Mutex::new(simulation)),
        }
    }

    pub fn seed(&self, position: Position, team: Team, kind: CellKind) -> bool {
        self.inner.lock().seed(position, team, kind)
    }

    pub fn queue_seed(&self, command: SeedCommand) {
        self.inner.lock().queue_seed(command);
    }

    pub fn tick(&self) -> TickReport {
        self.inner.lock().tick()
    }

    pub fn nutrient_tick(&self) -> NutrientReport {
        self.inner.lock().nutrient_tick()
    }

    pub fn reset(&self) {
        self.inner.lock().reset();
    }

    /// Copy of the board at this instant
    pub fn snapshot(&self) -> Grid {
        self.inner.lock().grid().clone()
    }

    pub fn nutrients(&self) -> Vec<NutrientView> {
        self.inner.lock().nutrients()
    }

    pub fn census(&self) -> Census {
        self.inner.lock().census()
    }

    /// `(main ticks, nutrient ticks)` run so far
    pub fn counters(&self) -> (u64, u64) {
        let sim = self.inner.lock();
        (sim.tick_count(), sim.nutrient_tick_count())
    }

    /// Run `f` with exclusive access
    pub fn with<R>(&self, f: impl FnOnce(&mut Simulation) -> R) -> R {
        f(&mut *self.inner.lock())
    }
}

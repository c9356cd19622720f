//! The two periodic drivers sharing one simulation.

use culture_core::Team;
use culture_world::SharedSimulation;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{debug, event, info, Level};

pub struct Scheduler {
    sim: SharedSimulation,
    main_period: Duration,
    nutrient_period: Duration,
    census_every: u64,
}

impl Scheduler {
    pub fn new(
        sim: SharedSimulation,
        main_period: Duration,
        nutrient_period: Duration,
        census_every: u64,
    ) -> Self {
        Self {
            sim,
            main_period,
            nutrient_period,
            census_every: census_every.max(1),
        }
    }

    /// Start both loops. Each handle resolves to the number of ticks it ran
    /// once `shutdown` flips to `true`.
    pub fn spawn(&self, shutdown: watch::Receiver<bool>) -> Vec<JoinHandle<u64>> {
        let main = tokio::spawn(run_main_loop(
            self.sim.clone(),
            self.main_period,
            self.census_every,
            shutdown.clone(),
        ));
        let nutrient = tokio::spawn(run_nutrient_loop(
            self.sim.clone(),
            self.nutrient_period,
            shutdown,
        ));
        vec![main, nutrient]
    }
}

async fn run_main_loop(
    sim: SharedSimulation,
    period: Duration,
    census_every: u64,
    mut shutdown: watch::Receiver<bool>,
) -> u64 {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut ticks = 0;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let report = sim.tick();
                ticks += 1;

                if !report.blast_cells.is_empty() {
                    debug!(
                        tick = report.tick,
                        blast_cells = report.blast_cells.len(),
                        "Explosions this tick"
                    );
                }
                if report.tick % census_every == 0 {
                    emit_population_metrics(&sim, report.tick);
                }
            }
            _ = shutdown.changed() => break,
        }
    }

    info!(ticks, "Main tick loop stopped");
    ticks
}

async fn run_nutrient_loop(
    sim: SharedSimulation,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> u64 {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut ticks = 0;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                sim.nutrient_tick();
                ticks += 1;
            }
            _ = shutdown.changed() => break,
        }
    }

    info!(ticks, "Nutrient tick loop stopped");
    ticks
}

/// Census snapshot as structured fields plus gauges
pub fn emit_population_metrics(sim: &SharedSimulation, tick: u64) {
    let census = sim.census();
    let nutrients = sim.nutrients().len();

    info!(
        event = "population_metrics",
        tick,
        a_dots = census.team_a.dots,
        a_producers = census.team_a.producers,
        a_blocks = census.team_a.blocks,
        a_bombs = census.team_a.bombs,
        b_dots = census.team_b.dots,
        b_producers = census.team_b.producers,
        b_blocks = census.team_b.blocks,
        b_bombs = census.team_b.bombs,
        empty = census.empty,
        nutrients,
        "Population metrics snapshot"
    );

    for team in Team::all() {
        event!(
            Level::INFO,
            gauge_name = "living_cells",
            gauge_value = census.team(team).living(),
            team = %team,
            tick,
            "Living cells gauge"
        );
    }
}

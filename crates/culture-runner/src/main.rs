//! Headless runner driving a board on its two clocks.

mod schedule;
mod telemetry;

use anyhow::{Context, Result};
use clap::Parser;
use culture_core::{CellKind, Position, SimConfig, Team};
use culture_world::{SharedSimulation, Simulation};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::path::PathBuf;
use tokio::signal;
use tokio::sync::watch;
use tokio::time::Duration;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "culture-runner", about = "Run the two-culture automaton headless")]
struct Args {
    /// JSON file with simulation parameters
    #[arg(long)]
    config: Option<PathBuf>,

    /// Seed for the simulation's random stream
    #[arg(long)]
    seed: Option<u64>,

    #[arg(long)]
    rows: Option<i32>,

    #[arg(long)]
    cols: Option<i32>,

    /// Main tick period in milliseconds
    #[arg(long)]
    tick_ms: Option<u64>,

    /// Nutrient tick period in milliseconds
    #[arg(long)]
    nutrient_tick_ms: Option<u64>,

    /// Cells to scatter per team before starting
    #[arg(long, default_value_t = 6)]
    initial_cells: usize,

    /// Stop after this many seconds (0 runs until Ctrl+C)
    #[arg(long, default_value_t = 0)]
    duration_secs: u64,

    /// Log population metrics every N main ticks
    #[arg(long, default_value_t = 20)]
    census_every: u64,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,

    /// Print the final board to stdout
    #[arg(long)]
    print_board: bool,
}

impl Args {
    fn sim_config(&self) -> Result<SimConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let json = std::fs::read_to_string(path)
                    .with_context(|| format!("reading config {}", path.display()))?;
                SimConfig::from_json(&json)?
            }
            None => SimConfig::default(),
        };

        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        if let Some(rows) = self.rows {
            config.rows = rows;
        }
        if let Some(cols) = self.cols {
            config.cols = cols;
        }
        if let Some(tick_ms) = self.tick_ms {
            config.main_tick_ms = tick_ms;
        }
        if let Some(nutrient_tick_ms) = self.nutrient_tick_ms {
            config.nutrient_tick_ms = nutrient_tick_ms;
        }

        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    telemetry::init_telemetry(args.log_json)?;

    let config = args.sim_config()?;
    info!(
        rows = config.rows,
        cols = config.cols,
        seed = config.seed,
        main_tick_ms = config.main_tick_ms,
        nutrient_tick_ms = config.nutrient_tick_ms,
        "Starting culture runner"
    );

    let mut simulation = Simulation::new(config.clone())?;
    scatter_initial_cells(&mut simulation, args.initial_cells, config.seed);
    let sim = SharedSimulation::new(simulation);

    let scheduler = schedule::Scheduler::new(
        sim.clone(),
        Duration::from_millis(config.main_tick_ms),
        Duration::from_millis(config.nutrient_tick_ms),
        args.census_every,
    );
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handles = scheduler.spawn(shutdown_rx);

    if args.duration_secs > 0 {
        tokio::select! {
            _ = tokio::time::sleep(Duration::from_secs(args.duration_secs)) => {
                info!("Run duration elapsed");
            }
            _ = shutdown_signal() => {}
        }
    } else {
        shutdown_signal().await;
    }

    let _ = shutdown_tx.send(true);
    for result in futures::future::join_all(handles).await {
        if let Err(e) = result {
            warn!("Tick loop ended abnormally: {}", e);
        }
    }

    let (ticks, nutrient_ticks) = sim.counters();
    schedule::emit_population_metrics(&sim, ticks);
    info!(ticks, nutrient_ticks, "Runner stopped");

    if args.print_board {
        print!("{}", sim.snapshot().render());
    }

    Ok(())
}

/// Drop `per_team` cells for each culture on its own half of the board. The
/// first one is a producer. Placement uses its own stream so the simulation's
/// stream starts untouched.
fn scatter_initial_cells(sim: &mut Simulation, per_team: usize, seed: u64) {
    let mut rng = ChaCha8Rng::seed_from_u64(seed.wrapping_add(1));
    let (rows, cols) = (sim.config().rows, sim.config().cols);
    let half = (cols / 2).max(1);

    for team in Team::all() {
        let col_range = match team {
            Team::A => 0..half,
            Team::B => (cols - half)..cols,
        };
        let mut placed = 0;

        for attempt in 0..per_team * 20 {
            if placed == per_team {
                break;
            }
            let pos = Position::new(rng.gen_range(0..rows), rng.gen_range(col_range.clone()));
            let kind = if placed == 0 {
                CellKind::Producer
            } else {
                CellKind::Dot
            };
            if sim.seed(pos, team, kind) {
                placed += 1;
            } else if attempt + 1 == per_team * 20 {
                warn!(%team, placed, "Board too crowded for initial cells");
            }
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}

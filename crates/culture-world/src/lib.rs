//! Board simulation engine.
//!
//! This module implements the grid both cultures live on, the per-tick rule
//! resolver, the nutrient flow engine and the driver that commits their
//! results.

pub mod grid;
pub mod rules;
pub mod nutrients;
pub mod simulation;
pub mod shared;

pub use grid::{Census, Grid, TeamCensus};
pub use nutrients::{Nutrient, NutrientPool, NutrientView};
pub use rules::StepOutcome;
pub use simulation::{NutrientReport, SeedCommand, Simulation, TickReport};
pub use shared::SharedSimulation;

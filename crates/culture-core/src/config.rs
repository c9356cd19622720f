//! Configuration types for the simulation.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};

pub const DEFAULT_ROWS: i32 = 24;
pub const DEFAULT_COLS: i32 = 24;
pub const DEFAULT_MAIN_TICK_MS: u64 = 650;
pub const DEFAULT_NUTRIENT_TICK_MS: u64 = 120;
pub const BLAST_SURVIVAL_CHANCE: f64 = 0.12;
pub const SPILLOVER_CHANCE: f64 = 0.25;
pub const MAX_HEALTH: u8 = 3;
pub const EMISSION_INTERVAL: u64 = 6;
pub const NUTRIENT_OCCUPANCY_CAP: usize = 1;
pub const BOMB_TRIGGER_BLOCKS: usize = 4;
/// Largest board the engine accepts, in cells
pub const MAX_GRID_CELLS: i64 = 1 << 22;

/// Simulation parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Number of grid rows
    pub rows: i32,
    /// Number of grid columns
    pub cols: i32,
    /// Seed for the single pseudo-random stream
    pub seed: u64,
    /// Main tick period (milliseconds)
    pub main_tick_ms: u64,
    /// Nutrient tick period (milliseconds)
    pub nutrient_tick_ms: u64,
    /// Chance that a non-bomb cell inside a blast keeps its contents
    pub blast_survival_chance: f64,
    /// Chance that each distance-2 spillover cell joins a blast
    pub spillover_chance: f64,
    /// Health ceiling for dots and producers
    pub max_health: u8,
    /// Producers emit on every nutrient tick divisible by this
    pub emission_interval: u64,
    /// Maximum tokens per wall cell in one nutrient tick
    pub nutrient_occupancy_cap: usize,
    /// Enemy blocks in the 8-neighbourhood needed to arm a bomb
    pub bomb_trigger_blocks: usize,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            rows: DEFAULT_ROWS,
            cols: DEFAULT_COLS,
            seed: 0,
            main_tick_ms: DEFAULT_MAIN_TICK_MS,
            nutrient_tick_ms: DEFAULT_NUTRIENT_TICK_MS,
            blast_survival_chance: BLAST_SURVIVAL_CHANCE,
            spillover_chance: SPILLOVER_CHANCE,
            max_health: MAX_HEALTH,
            emission_interval: EMISSION_INTERVAL,
            nutrient_occupancy_cap: NUTRIENT_OCCUPANCY_CAP,
            bomb_trigger_blocks: BOMB_TRIGGER_BLOCKS,
        }
    }
}

impl SimConfig {
    /// Reject configurations the resolvers cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.rows <= 0 || self.cols <= 0 {
            return Err(Error::Validation(format!(
                "grid dimensions must be positive, got {}x{}",
                self.rows, self.cols
            )));
        }
        if i64::from(self.rows) * i64::from(self.cols) > MAX_GRID_CELLS {
            return Err(Error::Validation(format!(
                "grid of {}x{} exceeds {} cells",
                self.rows, self.cols, MAX_GRID_CELLS
            )));
        }

        for (name, value) in [
            ("blast_survival_chance", self.blast_survival_chance),
            ("spillover_chance", self.spillover_chance),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(Error::Validation(format!(
                    "{} must be within [0, 1], got {}",
                    name, value
                )));
            }
        }

        if self.main_tick_ms == 0 || self.nutrient_tick_ms == 0 {
            return Err(Error::Validation("tick periods must be non-zero".to_string()));
        }
        if self.max_health == 0 {
            return Err(Error::Validation("max_health must be at least 1".to_string()));
        }
        if self.emission_interval == 0 {
            return Err(Error::Validation(
                "emission_interval must be at least 1".to_string(),
            ));
        }
        if self.nutrient_occupancy_cap == 0 {
            return Err(Error::Validation(
                "nutrient_occupancy_cap must be at least 1".to_string(),
            ));
        }

        Ok(())
    }

    /// Parse a JSON document; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self> {
        let config: SimConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SimConfig::default();
        assert_eq!(config.rows, 24);
        assert_eq!(config.cols, 24);
        assert_eq!(config.max_health, 3);
        assert_eq!(config.emission_interval, 6);
        assert_eq!(config.nutrient_occupancy_cap, 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = SimConfig::from_json(r#"{ "rows": 10, "seed": 7 }"#).unwrap();
        assert_eq!(config.rows, 10);
        assert_eq!(config.cols, DEFAULT_COLS);
        assert_eq!(config.seed, 7);
        assert_eq!(config.blast_survival_chance, BLAST_SURVIVAL_CHANCE);
    }

    #[test]
    fn test_invalid_configs_rejected() {
        let bad_dims = SimConfig {
            rows: 0,
            ..Default::default()
        };
        assert!(matches!(bad_dims.validate(), Err(Error::Validation(_))));

        let bad_chance = SimConfig {
            spillover_chance: 1.5,
            ..Default::default()
        };
        assert!(bad_chance.validate().is_err());

        let bad_interval = SimConfig {
            emission_interval: 0,
            ..Default::default()
        };
        assert!(bad_interval.validate().is_err());
    }

    #[test]
    fn test_oversized_grid_rejected() {
        let huge = SimConfig {
            rows: 50_000,
            cols: 50_000,
            ..Default::default()
        };
        assert!(matches!(huge.validate(), Err(Error::Validation(_))));

        let at_cap = SimConfig {
            rows: 2048,
            cols: 2048,
            ..Default::default()
        };
        assert!(at_cap.validate().is_ok());
    }

    #[test]
    fn test_malformed_json_is_serialization_error() {
        let err = SimConfig::from_json("{ rows: ").unwrap_err();
        assert!(matches!(err, Error::Serialization(_)));
    }
}

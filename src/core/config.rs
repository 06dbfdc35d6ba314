//! Engine configuration with documented constants
//!
//! Everything the allocation engine needs to know about the pool and flux
//! layout of the carbon model is collected here, so that the allocation
//! code itself never hard-codes pool or indicator names.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::core::error::{DisturbanceError, Result};
use crate::core::types::ProcessId;

/// Configuration for the disturbance target engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Process id that tags disturbance fluxes
    ///
    /// By convention in the default parameter database, disturbance
    /// matrices run as process 3 (growth and decay use the others).
    pub disturbance_process_id: ProcessId,

    /// Names of the flux indicators that make up disturbance production
    pub production_indicators: ProductionIndicators,

    /// Pool holding softwood stem snags (used by SWSTEMSNAG / TOTALSTEMSNAG)
    pub softwood_stem_snag_pool: String,

    /// Pool holding hardwood stem snags (used by HWSTEMSNAG / TOTALSTEMSNAG)
    pub hardwood_stem_snag_pool: String,

    /// Seed for the default random source used by RANDOMSORT events
    ///
    /// Runs with the same seed and inputs produce identical allocations.
    pub random_seed: u64,
}

/// Flux indicator names read back by the production calculator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProductionIndicators {
    pub softwood: String,
    pub hardwood: String,
    pub dead_organic_matter: String,
}

impl Default for ProductionIndicators {
    fn default() -> Self {
        Self {
            softwood: "DisturbanceSoftProduction".into(),
            hardwood: "DisturbanceHardProduction".into(),
            dead_organic_matter: "DisturbanceDOMProduction".into(),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            disturbance_process_id: ProcessId(3),
            production_indicators: ProductionIndicators::default(),
            softwood_stem_snag_pool: "SoftwoodStemSnag".into(),
            hardwood_stem_snag_pool: "HardwoodStemSnag".into(),
            random_seed: 12345,
        }
    }
}

impl EngineConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a config from a TOML file, missing keys fall back to defaults
    pub fn load_from_toml(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse_toml(&content)
    }

    /// Parse and validate a config from a TOML string
    pub fn parse_toml(content: &str) -> Result<Self> {
        let config: EngineConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> Result<()> {
        let names = [
            ("production_indicators.softwood", &self.production_indicators.softwood),
            ("production_indicators.hardwood", &self.production_indicators.hardwood),
            (
                "production_indicators.dead_organic_matter",
                &self.production_indicators.dead_organic_matter,
            ),
            ("softwood_stem_snag_pool", &self.softwood_stem_snag_pool),
            ("hardwood_stem_snag_pool", &self.hardwood_stem_snag_pool),
        ];
        for (key, value) in names {
            if value.trim().is_empty() {
                return Err(DisturbanceError::configuration(format!(
                    "{} must not be blank",
                    key
                )));
            }
        }

        if self.disturbance_process_id.0 < 0 {
            return Err(DisturbanceError::configuration(format!(
                "disturbance_process_id ({}) must not be negative",
                self.disturbance_process_id
            )));
        }

        Ok(())
    }
}

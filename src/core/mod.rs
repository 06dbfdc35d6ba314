pub mod config;
pub mod error;
pub mod types;

pub use config::{EngineConfig, ProductionIndicators};
pub use error::{DisturbanceError, Result};

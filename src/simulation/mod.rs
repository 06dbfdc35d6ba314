//! Scenario driver - runs scheduled events against an inventory

pub mod apply;
pub mod report;
pub mod runner;
pub mod scenario;

pub use apply::{apply_allocation, disturb_rows};
pub use report::{EventReport, RunStatistics, SimulationReport};
pub use runner::run_scenario;
pub use scenario::{Scenario, ScenarioEvent};

//! Scenario files - inventory, flux schema, matrices and an event schedule
//!
//! ```toml
//! name = "harvest demo"
//! pools = ["SoftwoodMerch", "Products"]
//!
//! [[flux_indicators]]
//! name = "DisturbanceSoftProduction"
//! process_id = 3
//! source_pools = ["SoftwoodMerch"]
//! sink_pools = ["Products"]
//!
//! [[disturbance_matrices]]
//! disturbance_type_id = 1
//! entries = [{ source = "SoftwoodMerch", sink = "Products", proportion = 0.8 }]
//!
//! [[stands]]
//! area = 10.0
//! age = 60
//! pools = [40.0, 0.0]
//!
//! [[events]]
//! timestep = 1
//! sort_type = "MERCHCSORT_TOTAL"
//! target_type = "Area"
//! target = 4.0
//! disturbance_type = 1
//! ```

use serde::Deserialize;
use std::path::Path;

use crate::core::error::Result;
use crate::core::types::Timestep;
use crate::flux::{DisturbanceMatrix, FluxIndicator, MatrixFluxEngine};
use crate::inventory::{StandInventory, StandRecord};
use crate::targets::EventRow;

/// An event scheduled at a timestep
///
/// On disk the timestep sits next to the event row fields.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ScenarioEvent {
    pub timestep: Timestep,
    #[serde(flatten)]
    pub row: EventRow,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub name: String,
    /// Pool names, in the column order of every stand's `pools`
    pub pools: Vec<String>,
    #[serde(default)]
    pub flux_indicators: Vec<FluxIndicator>,
    #[serde(default)]
    pub disturbance_matrices: Vec<DisturbanceMatrix>,
    #[serde(default)]
    pub stands: Vec<StandRecord>,
    #[serde(default)]
    pub events: Vec<ScenarioEvent>,
}

impl Scenario {
    pub fn load_from_toml(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse_toml(&content)
    }

    pub fn parse_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn build_inventory(&self) -> Result<StandInventory> {
        StandInventory::from_records(&self.pools, self.stands.iter().cloned())
    }

    pub fn build_engine(&self) -> Result<MatrixFluxEngine> {
        MatrixFluxEngine::with_matrices(
            &self.pools,
            self.flux_indicators.clone(),
            &self.disturbance_matrices,
        )
    }

    /// Distinct event timesteps, ascending
    pub fn timesteps(&self) -> Vec<Timestep> {
        let mut timesteps: Vec<Timestep> = self.events.iter().map(|e| e.timestep).collect();
        timesteps.sort_unstable();
        timesteps.dedup();
        timesteps
    }

    /// Events at `timestep` with their position in the file, in file order
    pub fn events_at(&self, timestep: Timestep) -> impl Iterator<Item = (usize, &ScenarioEvent)> {
        self.events
            .iter()
            .enumerate()
            .filter(move |(_, e)| e.timestep == timestep)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{DisturbanceTypeId, SpatialReference};

    const SCENARIO: &str = r#"
        name = "two steps"
        pools = ["Merch", "Products"]

        [[flux_indicators]]
        name = "DisturbanceSoftProduction"
        process_id = 3
        source_pools = ["Merch"]
        sink_pools = ["Products"]

        [[disturbance_matrices]]
        disturbance_type_id = 1
        entries = [{ source = "Merch", sink = "Products", proportion = 1.0 }]

        [[stands]]
        area = 5.0
        age = 40
        pools = [10.0, 0.0]

        [[stands]]
        area = 2.5
        age = 80
        spatial_reference = 1050
        pools = [20.0, 0.0]

        [[events]]
        timestep = 2
        sort_type = "SVOID"
        target_type = "Area"
        target = 1
        disturbance_type_id = 1
        spatial_reference = 1050

        [[events]]
        timestep = 1
        sort_type = "SORT_BY_SW_AGE"
        target_type = "Area"
        target = 3.0
        disturbance_type = 1
        efficiency = 0.5
    "#;

    #[test]
    fn test_parse_scenario() {
        let scenario = Scenario::parse_toml(SCENARIO).unwrap();
        assert_eq!(scenario.name, "two steps");
        assert_eq!(scenario.stands.len(), 2);
        assert_eq!(scenario.events.len(), 2);
        assert_eq!(scenario.events[0].row.disturbance_type, DisturbanceTypeId(1));
        assert_eq!(scenario.events[0].row.target, 1.0);
        assert_eq!(scenario.events[0].row.efficiency, 1.0);
        assert_eq!(scenario.events[1].row.efficiency, 0.5);
    }

    #[test]
    fn test_event_row_fields_flattened() {
        let scenario = Scenario::parse_toml(SCENARIO).unwrap();
        let svoid = &scenario.events[0];

        assert_eq!(svoid.timestep, 2);
        assert_eq!(svoid.row.sort_type, "SVOID");
        assert_eq!(svoid.row.spatial_reference, Some(SpatialReference(1050)));
        assert_eq!(scenario.events[1].row.spatial_reference, None);
    }

    #[test]
    fn test_timesteps_sorted_and_events_in_file_order() {
        let scenario = Scenario::parse_toml(SCENARIO).unwrap();
        assert_eq!(scenario.timesteps(), vec![1, 2]);
        let at_two: Vec<usize> = scenario.events_at(2).map(|(i, _)| i).collect();
        assert_eq!(at_two, vec![0]);
    }

    #[test]
    fn test_build_inventory_and_engine() {
        let scenario = Scenario::parse_toml(SCENARIO).unwrap();
        let stands = scenario.build_inventory().unwrap();
        assert_eq!(stands.len(), 2);
        assert_eq!(stands.total_area(), 7.5);

        let engine = scenario.build_engine().unwrap();
        assert!(engine.has_matrix(DisturbanceTypeId(1)));
    }

    #[test]
    fn test_malformed_toml_rejected() {
        assert!(Scenario::parse_toml("pools = 3").is_err());
    }
}

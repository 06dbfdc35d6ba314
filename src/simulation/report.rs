//! Run report and serialization

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::core::error::Result;
use crate::core::types::{DisturbanceTypeId, Timestep};
use crate::targets::{AllocationResult, SortType, TargetStatistics, TargetType};

/// What one event disturbed
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EventReport {
    pub timestep: Timestep,
    /// Position of the event in the scenario file
    pub event_index: usize,
    pub sort_type: SortType,
    pub target_type: TargetType,
    pub target: f64,
    pub disturbance_type: DisturbanceTypeId,
    pub allocation: AllocationResult,
    pub statistics: TargetStatistics,
    pub shortfall: Option<f64>,
    /// Hectares disturbed
    pub disturbed_area: f64,
    /// Production flux x area over the disturbed rows (tonnes C)
    pub production_mass: f64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RunStatistics {
    pub timesteps: usize,
    pub events_processed: usize,
    pub unrealized_events: usize,
    pub total_disturbed_area: f64,
    pub total_production_mass: f64,
    pub final_stand_count: usize,
    pub final_total_area: f64,
    pub elapsed_ms: u64,
}

/// Complete run output
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimulationReport {
    pub scenario: String,
    pub events: Vec<EventReport>,
    pub statistics: RunStatistics,
}

impl SimulationReport {
    pub fn new(
        scenario: String,
        events: Vec<EventReport>,
        timesteps: usize,
        final_stand_count: usize,
        final_total_area: f64,
        elapsed: Duration,
    ) -> Self {
        let statistics = RunStatistics {
            timesteps,
            events_processed: events.len(),
            unrealized_events: events.iter().filter(|e| e.shortfall.is_some()).count(),
            total_disturbed_area: events.iter().map(|e| e.disturbed_area).sum(),
            total_production_mass: events.iter().map(|e| e.production_mass).sum(),
            final_stand_count,
            final_total_area,
            elapsed_ms: elapsed.as_millis() as u64,
        };
        Self { scenario, events, statistics }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn summary(&self) -> String {
        format!(
            "Scenario '{}': {} events over {} timesteps in {}ms\n\
             {:.2} ha disturbed, {:.2} t C produced, {} events short of target\n\
             {} stands, {:.2} ha at end of run",
            self.scenario,
            self.statistics.events_processed,
            self.statistics.timesteps,
            self.statistics.elapsed_ms,
            self.statistics.total_disturbed_area,
            self.statistics.total_production_mass,
            self.statistics.unrealized_events,
            self.statistics.final_stand_count,
            self.statistics.final_total_area,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(shortfall: Option<f64>, area: f64) -> EventReport {
        EventReport {
            timestep: 1,
            event_index: 0,
            sort_type: SortType::RandomSort,
            target_type: TargetType::Area,
            target: 5.0,
            disturbance_type: DisturbanceTypeId(1),
            allocation: AllocationResult::single(0),
            statistics: TargetStatistics::default(),
            shortfall,
            disturbed_area: area,
            production_mass: 2.0 * area,
        }
    }

    #[test]
    fn test_statistics_rollup() {
        let report = SimulationReport::new(
            "demo".into(),
            vec![event(None, 1.5), event(Some(2.0), 3.0)],
            1,
            4,
            20.0,
            Duration::from_millis(12),
        );

        assert_eq!(report.statistics.events_processed, 2);
        assert_eq!(report.statistics.unrealized_events, 1);
        assert_eq!(report.statistics.total_disturbed_area, 4.5);
        assert_eq!(report.statistics.total_production_mass, 9.0);
        assert!(report.summary().contains("1 events short of target"));
    }

    #[test]
    fn test_json_uses_event_table_names() {
        let report =
            SimulationReport::new("demo".into(), vec![event(None, 1.0)], 1, 1, 1.0, Duration::ZERO);
        let json = report.to_json().unwrap();
        assert!(json.contains("\"RANDOMSORT\""));
        assert!(json.contains("\"Area\""));

        let back: SimulationReport = serde_json::from_str(&json).unwrap();
        assert_eq!(back, report);
    }
}

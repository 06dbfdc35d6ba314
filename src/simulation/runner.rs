//! Scenario driver
//!
//! Processes timesteps in ascending order and the events of a timestep in
//! file order. Each outcome is applied to the inventory before the next
//! event is dispatched, so later events see earlier splits and pool changes.

use std::time::Instant;

use crate::core::config::{EngineConfig, ProductionIndicators};
use crate::core::error::Result;
use crate::core::types::StandIndex;
use crate::flux::FluxTable;
use crate::inventory::{EligibleSet, StandInventory};
use crate::simulation::apply::{apply_allocation, disturb_rows};
use crate::simulation::report::{EventReport, SimulationReport};
use crate::simulation::scenario::Scenario;
use crate::targets::{dispatch_event, DispatchContext, EventSpec, FluxProduction, RandomSource};

/// Stands with area that have not been disturbed in this timestep
fn eligible_stands(stands: &StandInventory, disturbed: &[bool]) -> EligibleSet {
    EligibleSet::from_mask(
        stands
            .areas
            .iter()
            .enumerate()
            .map(|(i, &area)| area > 0.0 && !disturbed.get(i).copied().unwrap_or(false))
            .collect(),
    )
}

/// Production flux densities times area, summed over `rows`
///
/// Indicators missing from the flux schema contribute nothing.
fn production_mass(
    flux: &FluxTable,
    stands: &StandInventory,
    rows: &[StandIndex],
    indicators: &ProductionIndicators,
) -> f64 {
    [
        &indicators.softwood,
        &indicators.hardwood,
        &indicators.dead_organic_matter,
    ]
    .into_iter()
    .filter_map(|name| flux.column(name).ok())
    .map(|column| rows.iter().map(|&r| column[r] * stands.areas[r]).sum::<f64>())
    .sum()
}

/// Run every event of `scenario`
pub fn run_scenario(
    scenario: &Scenario,
    config: &EngineConfig,
    random: &mut dyn RandomSource,
) -> Result<SimulationReport> {
    config.validate()?;
    let started = Instant::now();
    let mut stands = scenario.build_inventory()?;
    let mut engine = scenario.build_engine()?;
    let timesteps = scenario.timesteps();

    tracing::info!(
        scenario = %scenario.name,
        stands = stands.len(),
        events = scenario.events.len(),
        timesteps = timesteps.len(),
        "starting disturbance run"
    );

    let mut reports = Vec::with_capacity(scenario.events.len());
    for &timestep in &timesteps {
        let mut disturbed = vec![false; stands.len()];

        for (event_index, event) in scenario.events_at(timestep) {
            let spec = EventSpec::try_from(&event.row)?;
            let eligible = eligible_stands(&stands, &disturbed);

            let outcome = {
                let mut production = FluxProduction::new(&mut engine, config);
                let mut ctx = DispatchContext {
                    config,
                    stands: &stands,
                    eligible: &eligible,
                    production: &mut production,
                    random: &mut *random,
                    spatial_index: &stands,
                };
                dispatch_event(&spec, &mut ctx)?
            };

            if let Some(shortfall) = outcome.shortfall {
                tracing::warn!(
                    timestep,
                    event = event_index,
                    sort_type = %spec.sort_type,
                    target_type = %spec.target_type,
                    target = spec.target,
                    shortfall,
                    "disturbance target not fully realized"
                );
            }

            let rows = apply_allocation(&mut stands, &outcome.allocation, spec.disturbance_type)?;
            disturbed.resize(stands.len(), false);
            for &row in &rows {
                disturbed[row] = true;
            }

            let flux = disturb_rows(
                &mut engine,
                &mut stands,
                &rows,
                spec.disturbance_type,
                config.disturbance_process_id,
            )?;
            let disturbed_area: f64 = rows.iter().map(|&r| stands.areas[r]).sum();
            let mass = production_mass(&flux, &stands, &rows, &config.production_indicators);

            tracing::debug!(
                timestep,
                event = event_index,
                sort_type = %spec.sort_type,
                records = outcome.statistics.num_records_disturbed,
                splits = outcome.statistics.num_splits,
                disturbed_area,
                production_mass = mass,
                "event applied"
            );

            reports.push(EventReport {
                timestep,
                event_index,
                sort_type: spec.sort_type,
                target_type: spec.target_type,
                target: spec.target,
                disturbance_type: spec.disturbance_type,
                allocation: outcome.allocation,
                statistics: outcome.statistics,
                shortfall: outcome.shortfall,
                disturbed_area,
                production_mass: mass,
            });
        }
    }

    let report = SimulationReport::new(
        scenario.name.clone(),
        reports,
        timesteps.len(),
        stands.len(),
        stands.total_area(),
        started.elapsed(),
    );
    tracing::info!(
        events = report.statistics.events_processed,
        unrealized = report.statistics.unrealized_events,
        disturbed_area = report.statistics.total_disturbed_area,
        "disturbance run finished"
    );
    Ok(report)
}

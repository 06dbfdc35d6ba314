//! Target accumulation
//!
//! The greedy allocator behind every ranked event: stands are ordered by
//! priority and disturbed whole until the next one would overshoot the
//! target, which is then split so the target is met exactly. The uniform
//! variants used by PROPORTION_OF_EVERY_RECORD live here too.
//!
//! Indices in the returned allocations are inventory indices. Sort values and
//! production rows are per eligible stand, in ascending inventory order.

use ordered_float::OrderedFloat;
use std::cmp::Reverse;

use crate::core::error::{DisturbanceError, Result};
use crate::core::types::{SpatialReference, StandIndex};
use crate::inventory::{EligibleSet, SpatialIndex, StandInventory};
use crate::targets::allocation::{AllocationResult, TargetOutcome};
use crate::targets::production::ProductionTable;

fn check_target(target: f64) -> Result<()> {
    if !target.is_finite() || target < 0.0 {
        return Err(DisturbanceError::invalid_input(format!(
            "target must be a finite value >= 0, got {}",
            target
        )));
    }
    Ok(())
}

fn check_target_var(target_var: &[f64]) -> Result<()> {
    match target_var
        .iter()
        .position(|v| !v.is_finite() || *v < 0.0)
    {
        Some(i) => Err(DisturbanceError::invalid_input(format!(
            "target variable at record {} must be a finite value >= 0, got {}",
            i, target_var[i]
        ))),
        None => Ok(()),
    }
}

fn check_sort_var(sort_var: &[f64]) -> Result<()> {
    match sort_var.iter().position(|v| !v.is_finite()) {
        Some(i) => Err(DisturbanceError::invalid_input(format!(
            "sort value at record {} must be finite, got {}",
            i, sort_var[i]
        ))),
        None => Ok(()),
    }
}

fn check_efficiency(efficiency: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&efficiency) {
        return Err(DisturbanceError::invalid_input(format!(
            "efficiency must lie in [0, 1], got {}",
            efficiency
        )));
    }
    Ok(())
}

fn check_per_eligible(what: &str, len: usize, n_eligible: usize) -> Result<()> {
    if len != n_eligible {
        return Err(DisturbanceError::invalid_input(format!(
            "{} has {} values but {} stands are eligible",
            what, len, n_eligible
        )));
    }
    Ok(())
}

/// Greedy fill shared by the sorted variants
///
/// Returns the allocation (positions into `target_var`), the total positive
/// target variable and the amount achieved.
fn accumulate(target_var: &[f64], sort_var: &[f64], target: f64) -> Result<(AllocationResult, f64, f64)> {
    if target_var.len() != sort_var.len() {
        return Err(DisturbanceError::invalid_input(format!(
            "target variable has {} records but sort variable has {}",
            target_var.len(),
            sort_var.len()
        )));
    }
    check_target(target)?;
    check_target_var(target_var)?;
    check_sort_var(sort_var)?;

    let mut order: Vec<usize> = (0..target_var.len()).filter(|&i| target_var[i] > 0.0).collect();
    // sort_by_key is stable: equal priorities keep index order
    order.sort_by_key(|&i| Reverse(OrderedFloat(sort_var[i])));

    let total: f64 = order.iter().map(|&i| target_var[i]).sum();
    let mut allocation = AllocationResult::new();
    let mut achieved = 0.0;

    if target > 0.0 {
        for &i in &order {
            let value = target_var[i];
            if achieved + value <= target {
                allocation.push(i, 1.0);
                achieved += value;
                continue;
            }
            // boundary record
            let proportion = ((target - achieved) / value).min(1.0);
            // a remainder too small to represent as a proportion counts as met
            if proportion > 0.0 {
                allocation.push(i, proportion);
            }
            achieved = target;
            break;
        }
    }

    Ok((allocation, total, achieved))
}

/// Disturb records in descending `sort_var` order until `target` is met
///
/// `target_var` is each record's contribution toward the target. Records
/// with no contribution are never disturbed. At most one record receives a
/// proportion below 1. When the records cannot supply the target the
/// outcome carries the exact unmet amount as its shortfall.
pub fn sorted_disturbance_target(target_var: &[f64], sort_var: &[f64], target: f64) -> Result<TargetOutcome> {
    let (allocation, total, achieved) = accumulate(target_var, sort_var, target)?;
    Ok(TargetOutcome::new(
        allocation,
        total,
        achieved,
        target - achieved,
        target_var.len(),
    ))
}

/// Area target over the eligible stands, ordered by `sort_value`
pub fn sorted_area_target(
    area_target: f64,
    sort_value: &[f64],
    stands: &StandInventory,
    eligible: &EligibleSet,
) -> Result<TargetOutcome> {
    eligible.check_len(stands.len())?;
    let positions = eligible.indices();
    check_per_eligible("sort value", sort_value.len(), positions.len())?;

    let areas: Vec<f64> = positions.iter().map(|&i| stands.areas[i]).collect();
    let (allocation, total, achieved) = accumulate(&areas, sort_value, area_target)?;
    Ok(TargetOutcome::new(
        allocation.remap(&positions),
        total,
        achieved,
        area_target - achieved,
        positions.len(),
    ))
}

/// Carbon target over the eligible stands, ordered by `sort_value`
///
/// Each stand contributes `total production x area x efficiency`; the
/// resulting proportions are scaled by `efficiency`.
pub fn sorted_merch_target(
    carbon_target: f64,
    production: &ProductionTable,
    stands: &StandInventory,
    eligible: &EligibleSet,
    sort_value: &[f64],
    efficiency: f64,
) -> Result<TargetOutcome> {
    check_efficiency(efficiency)?;
    eligible.check_len(stands.len())?;
    let positions = eligible.indices();
    check_per_eligible("production table", production.len(), positions.len())?;
    check_per_eligible("sort value", sort_value.len(), positions.len())?;

    let carbon = carbon_contribution(production, stands, &positions, efficiency);
    let (mut allocation, total, achieved) = accumulate(&carbon, sort_value, carbon_target)?;
    allocation.scale(efficiency);
    Ok(TargetOutcome::new(
        allocation.remap(&positions),
        total,
        achieved,
        carbon_target - achieved,
        positions.len(),
    ))
}

fn carbon_contribution(
    production: &ProductionTable,
    stands: &StandInventory,
    positions: &[StandIndex],
    efficiency: f64,
) -> Vec<f64> {
    production
        .total
        .iter()
        .zip(positions)
        .map(|(total, &i)| total * stands.areas[i] * efficiency)
        .collect()
}

/// Same proportion applied to every eligible stand that has a contribution
fn uniform(
    proportion: f64,
    contribution: &[f64],
    positions: &[StandIndex],
) -> AllocationResult {
    let mut allocation = AllocationResult::with_capacity(positions.len());
    if proportion <= 0.0 {
        return allocation;
    }
    for (&value, &index) in contribution.iter().zip(positions) {
        if value > 0.0 {
            allocation.push(index, proportion);
        }
    }
    allocation
}

/// Disturb the literal `proportion` of every eligible stand
pub fn proportion_sort_proportion_target(
    proportion: f64,
    stands: &StandInventory,
    eligible: &EligibleSet,
) -> Result<TargetOutcome> {
    if !(0.0..=1.0).contains(&proportion) {
        return Err(DisturbanceError::invalid_input(format!(
            "proportion target must lie in [0, 1], got {}",
            proportion
        )));
    }
    eligible.check_len(stands.len())?;
    let positions = eligible.indices();
    let areas: Vec<f64> = positions.iter().map(|&i| stands.areas[i]).collect();
    check_target_var(&areas)?;

    let total: f64 = areas.iter().sum();
    Ok(TargetOutcome::new(
        uniform(proportion, &areas, &positions),
        total,
        total * proportion,
        0.0,
        positions.len(),
    ))
}

/// Uniform proportion over the eligible stands sized to meet `target`
fn proportional_fill(
    target: f64,
    contribution: &[f64],
    positions: &[StandIndex],
) -> Result<(AllocationResult, f64, f64)> {
    check_target(target)?;
    check_target_var(contribution)?;
    let total: f64 = contribution.iter().sum();
    let proportion = if total > 0.0 { (target / total).min(1.0) } else { 0.0 };
    Ok((uniform(proportion, contribution, positions), total, target.min(total)))
}

/// Area target spread evenly over every eligible stand
///
/// Every eligible stand is disturbed by `target / eligible area`, capped at
/// 1; any excess target is reported as shortfall.
pub fn proportion_area_target(
    area_target: f64,
    stands: &StandInventory,
    eligible: &EligibleSet,
) -> Result<TargetOutcome> {
    eligible.check_len(stands.len())?;
    let positions = eligible.indices();
    let areas: Vec<f64> = positions.iter().map(|&i| stands.areas[i]).collect();

    let (allocation, total, achieved) = proportional_fill(area_target, &areas, &positions)?;
    Ok(TargetOutcome::new(
        allocation,
        total,
        achieved,
        area_target - achieved,
        positions.len(),
    ))
}

/// Carbon target spread evenly over every eligible stand
///
/// The uniform proportion is `target / eligible carbon`, capped at 1, then
/// scaled by `efficiency`.
pub fn proportion_merch_target(
    carbon_target: f64,
    production: &ProductionTable,
    stands: &StandInventory,
    eligible: &EligibleSet,
    efficiency: f64,
) -> Result<TargetOutcome> {
    check_efficiency(efficiency)?;
    eligible.check_len(stands.len())?;
    let positions = eligible.indices();
    check_per_eligible("production table", production.len(), positions.len())?;

    let carbon = carbon_contribution(production, stands, &positions, efficiency);
    let (mut allocation, total, achieved) = proportional_fill(carbon_target, &carbon, &positions)?;
    allocation.scale(efficiency);
    Ok(TargetOutcome::new(
        allocation,
        total,
        achieved,
        carbon_target - achieved,
        positions.len(),
    ))
}

/// Forced disturbance of the one stand carrying `spatial_reference`
///
/// Eligibility and targets do not apply.
pub fn spatially_indexed_target(
    spatial_reference: SpatialReference,
    index: &dyn SpatialIndex,
) -> Result<TargetOutcome> {
    let stand = index.lookup(spatial_reference)?;
    Ok(TargetOutcome::new(AllocationResult::single(stand), 1.0, 1.0, 0.0, 1))
}

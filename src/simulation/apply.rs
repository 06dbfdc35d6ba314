//! Applying allocations to the inventory

use crate::core::error::{DisturbanceError, Result};
use crate::core::types::{DisturbanceTypeId, ProcessId, StandIndex};
use crate::flux::{FluxTable, OperationGuard, PoolFluxEngine};
use crate::inventory::StandInventory;
use crate::targets::AllocationResult;

/// Mark the allocated stands as disturbed, splitting partial ones
///
/// A stand disturbed by proportion `p < 1` is split: the disturbed part is
/// appended as a new record holding `area * p` and the original keeps the
/// rest. Returns the rows that now represent disturbed area.
pub fn apply_allocation(
    stands: &mut StandInventory,
    allocation: &AllocationResult,
    disturbance_type: DisturbanceTypeId,
) -> Result<Vec<StandIndex>> {
    let n_stands = stands.len();
    for entry in allocation.iter() {
        if entry.disturbed_index >= n_stands {
            return Err(DisturbanceError::invalid_input(format!(
                "allocation refers to stand {} but the inventory has {}",
                entry.disturbed_index, n_stands
            )));
        }
        if !(entry.area_proportion > 0.0 && entry.area_proportion <= 1.0) {
            return Err(DisturbanceError::invalid_input(format!(
                "area proportion for stand {} must be in (0, 1], got {}",
                entry.disturbed_index, entry.area_proportion
            )));
        }
    }

    let mut rows = Vec::with_capacity(allocation.len());
    for entry in allocation.iter() {
        let row = if entry.area_proportion >= 1.0 {
            entry.disturbed_index
        } else {
            stands.split(entry.disturbed_index, entry.area_proportion)?
        };
        stands.last_disturbance_types[row] = disturbance_type;
        rows.push(row);
    }
    Ok(rows)
}

/// Run `disturbance_type` on the pools of `rows`, in place
///
/// Every other row is left untouched. Returns the flux table for the whole
/// inventory (zero outside `rows`).
pub fn disturb_rows<E: PoolFluxEngine + ?Sized>(
    engine: &mut E,
    stands: &mut StandInventory,
    rows: &[StandIndex],
    disturbance_type: DisturbanceTypeId,
    process_id: ProcessId,
) -> Result<FluxTable> {
    let n_stands = stands.len();
    let mut disturbance_types = vec![DisturbanceTypeId::NONE; n_stands];
    for &row in rows {
        let slot = disturbance_types.get_mut(row).ok_or_else(|| {
            DisturbanceError::invalid_input(format!(
                "row {} out of range ({} stands)",
                row, n_stands
            ))
        })?;
        *slot = disturbance_type;
    }

    let mut op = OperationGuard::allocate(engine, n_stands)?;
    op.set_disturbance_matrices(&disturbance_types)?;
    let mut flux = FluxTable::zeros(n_stands, op.flux_indicators());
    op.compute_flux(process_id, &mut stands.pools, &mut flux, None)?;
    Ok(flux)
}

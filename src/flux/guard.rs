//! Scope guard for flux engine operation handles

use crate::core::error::Result;
use crate::core::types::{DisturbanceTypeId, ProcessId};
use crate::flux::{FluxIndicator, FluxTable, OperationHandle, PoolFluxEngine};
use crate::inventory::PoolTable;

/// Owns one allocated operation and frees it when dropped
///
/// Every exit path, including `?` on an engine error, releases the handle.
pub struct OperationGuard<'e, E: PoolFluxEngine + ?Sized> {
    engine: &'e mut E,
    handle: OperationHandle,
}

impl<'e, E: PoolFluxEngine + ?Sized> OperationGuard<'e, E> {
    pub fn allocate(engine: &'e mut E, n_records: usize) -> Result<Self> {
        let handle = engine.allocate_operation(n_records)?;
        Ok(Self { engine, handle })
    }

    pub fn handle(&self) -> OperationHandle {
        self.handle
    }

    pub fn flux_indicators(&self) -> &[FluxIndicator] {
        self.engine.flux_indicators()
    }

    pub fn set_disturbance_matrices(&mut self, disturbance_types: &[DisturbanceTypeId]) -> Result<()> {
        self.engine.set_disturbance_matrices(self.handle, disturbance_types)
    }

    pub fn compute_flux(
        &mut self,
        process_id: ProcessId,
        pools: &mut PoolTable,
        flux: &mut FluxTable,
        enabled: Option<&[bool]>,
    ) -> Result<()> {
        self.engine
            .compute_flux(&[self.handle], &[process_id], pools, flux, enabled)
    }
}

impl<E: PoolFluxEngine + ?Sized> Drop for OperationGuard<'_, E> {
    fn drop(&mut self) {
        self.engine.free_operation(self.handle);
    }
}

//! Pool flux engine boundary
//!
//! The allocation engine never does matrix math itself. It hands pools to a
//! [`PoolFluxEngine`], which applies per-record transfer matrices and
//! accumulates the transfers into named flux indicators. Operation handles
//! are scoped resources; use [`OperationGuard`] so they are always freed.

pub mod guard;
pub mod matrix;

use ahash::AHashMap;
use derive_more::Display;
use serde::{Deserialize, Serialize};

use crate::core::error::{DisturbanceError, Result};
use crate::core::types::{DisturbanceTypeId, ProcessId};
use crate::inventory::PoolTable;

pub use guard::OperationGuard;
pub use matrix::{DisturbanceMatrix, MatrixEntry, MatrixFluxEngine};

/// Handle to an operation allocated inside a flux engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub struct OperationHandle(pub u64);

/// Named accumulator of pool-to-pool transfers for one process
///
/// A transfer counts toward the indicator when it runs under `process_id`,
/// leaves one of `source_pools` and enters one of `sink_pools`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FluxIndicator {
    pub name: String,
    pub process_id: ProcessId,
    pub source_pools: Vec<String>,
    pub sink_pools: Vec<String>,
}

/// Applies transfer matrices to pools and records the resulting fluxes
pub trait PoolFluxEngine {
    /// The indicator schema, in flux table column order
    fn flux_indicators(&self) -> &[FluxIndicator];

    /// Reserve an operation covering `n_records` records
    fn allocate_operation(&mut self, n_records: usize) -> Result<OperationHandle>;

    /// Assign a disturbance matrix to every record of an operation
    fn set_disturbance_matrices(
        &mut self,
        op: OperationHandle,
        disturbance_types: &[DisturbanceTypeId],
    ) -> Result<()>;

    /// Apply `ops` in order, each tagged with the matching process id
    ///
    /// `pools` is updated in place. Transfers are added to `flux`. Records
    /// whose `enabled` flag is false are left untouched.
    fn compute_flux(
        &mut self,
        ops: &[OperationHandle],
        process_ids: &[ProcessId],
        pools: &mut PoolTable,
        flux: &mut FluxTable,
        enabled: Option<&[bool]>,
    ) -> Result<()>;

    /// Release an operation
    fn free_operation(&mut self, op: OperationHandle);
}

/// Column-major table of flux indicator values, one row per record
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FluxTable {
    names: Vec<String>,
    #[serde(skip)]
    lookup: AHashMap<String, usize>,
    columns: Vec<Vec<f64>>,
    n_rows: usize,
}

impl FluxTable {
    /// Zero-initialized table for the given indicator schema
    pub fn zeros(n_rows: usize, indicators: &[FluxIndicator]) -> Self {
        let names: Vec<String> = indicators.iter().map(|f| f.name.clone()).collect();
        let lookup = names.iter().enumerate().map(|(i, n)| (n.clone(), i)).collect();
        Self {
            columns: vec![vec![0.0; n_rows]; names.len()],
            names,
            lookup,
            n_rows,
        }
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn column(&self, name: &str) -> Result<&[f64]> {
        let idx = self.lookup.get(name).ok_or_else(|| {
            DisturbanceError::configuration(format!("flux indicator '{}' is not defined", name))
        })?;
        Ok(&self.columns[*idx])
    }

    /// Add to an indicator value by column position
    pub fn add(&mut self, column: usize, row: usize, amount: f64) {
        self.columns[column][row] += amount;
    }
}

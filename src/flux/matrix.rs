//! In-process flux engine driven by sparse disturbance matrices
//!
//! Each disturbance type is a list of (source pool, sink pool, proportion)
//! entries. Diagonal entries are retention and move nothing; whatever a
//! source pool does not send elsewhere stays where it is.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::core::error::{DisturbanceError, Result};
use crate::core::types::{DisturbanceTypeId, ProcessId};
use crate::flux::{FluxIndicator, FluxTable, OperationHandle, PoolFluxEngine};
use crate::inventory::PoolTable;

/// Outgoing proportions of one source may exceed 1 by this much (rounding)
const PROPORTION_SUM_TOLERANCE: f64 = 1e-9;

/// One cell of a disturbance matrix
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatrixEntry {
    pub source: String,
    pub sink: String,
    pub proportion: f64,
}

/// Transfer matrix for one disturbance type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisturbanceMatrix {
    pub disturbance_type_id: DisturbanceTypeId,
    #[serde(default)]
    pub name: String,
    pub entries: Vec<MatrixEntry>,
}

/// Matrix resolved to pool positions, off-diagonal transfers only
#[derive(Debug, Clone)]
struct CompiledMatrix {
    transfers: Vec<(usize, usize, f64)>,
}

/// Indicator resolved to pool membership flags
#[derive(Debug, Clone)]
struct CompiledIndicator {
    process_id: ProcessId,
    sources: Vec<bool>,
    sinks: Vec<bool>,
}

#[derive(Debug, Clone)]
struct Operation {
    n_records: usize,
    disturbance_types: Option<Vec<DisturbanceTypeId>>,
}

/// Reference [`PoolFluxEngine`] that runs entirely in process
#[derive(Debug, Clone)]
pub struct MatrixFluxEngine {
    pool_names: Vec<String>,
    pool_lookup: AHashMap<String, usize>,
    indicators: Vec<FluxIndicator>,
    compiled_indicators: Vec<CompiledIndicator>,
    matrices: AHashMap<DisturbanceTypeId, CompiledMatrix>,
    operations: AHashMap<OperationHandle, Operation>,
    next_handle: u64,
}

impl MatrixFluxEngine {
    pub fn new(pool_names: &[String], indicators: Vec<FluxIndicator>) -> Result<Self> {
        let pool_lookup: AHashMap<String, usize> = pool_names
            .iter()
            .enumerate()
            .map(|(i, n)| (n.clone(), i))
            .collect();
        if pool_lookup.len() != pool_names.len() {
            return Err(DisturbanceError::configuration("duplicate pool names in flux engine"));
        }

        let mut compiled_indicators = Vec::with_capacity(indicators.len());
        for indicator in &indicators {
            let sources = membership(&pool_lookup, &indicator.source_pools, &indicator.name)?;
            let sinks = membership(&pool_lookup, &indicator.sink_pools, &indicator.name)?;
            compiled_indicators.push(CompiledIndicator {
                process_id: indicator.process_id,
                sources,
                sinks,
            });
        }

        Ok(Self {
            pool_names: pool_names.to_vec(),
            pool_lookup,
            indicators,
            compiled_indicators,
            matrices: AHashMap::new(),
            operations: AHashMap::new(),
            next_handle: 1,
        })
    }

    /// Build an engine and register all the given matrices
    pub fn with_matrices(
        pool_names: &[String],
        indicators: Vec<FluxIndicator>,
        matrices: &[DisturbanceMatrix],
    ) -> Result<Self> {
        let mut engine = Self::new(pool_names, indicators)?;
        for matrix in matrices {
            engine.register_matrix(matrix)?;
        }
        Ok(engine)
    }

    /// Add or replace the matrix for a disturbance type
    pub fn register_matrix(&mut self, matrix: &DisturbanceMatrix) -> Result<()> {
        if matrix.disturbance_type_id.is_none() {
            return Err(DisturbanceError::configuration(format!(
                "disturbance type id {} is reserved for 'no disturbance'",
                matrix.disturbance_type_id
            )));
        }

        let mut outgoing = vec![0.0; self.pool_names.len()];
        let mut transfers = Vec::with_capacity(matrix.entries.len());
        for entry in &matrix.entries {
            let source = self.pool_position(&entry.source, matrix.disturbance_type_id)?;
            let sink = self.pool_position(&entry.sink, matrix.disturbance_type_id)?;
            if !entry.proportion.is_finite() || entry.proportion < 0.0 {
                return Err(DisturbanceError::configuration(format!(
                    "disturbance type {}: proportion {} -> {} must be a non-negative number",
                    matrix.disturbance_type_id, entry.source, entry.sink
                )));
            }
            outgoing[source] += entry.proportion;
            if source != sink {
                transfers.push((source, sink, entry.proportion));
            }
        }

        for (pool, total) in outgoing.iter().enumerate() {
            if *total > 1.0 + PROPORTION_SUM_TOLERANCE {
                return Err(DisturbanceError::configuration(format!(
                    "disturbance type {}: proportions leaving '{}' sum to {} (> 1)",
                    matrix.disturbance_type_id, self.pool_names[pool], total
                )));
            }
        }

        tracing::debug!(
            disturbance_type = %matrix.disturbance_type_id,
            name = %matrix.name,
            transfers = transfers.len(),
            "registered disturbance matrix"
        );
        self.matrices
            .insert(matrix.disturbance_type_id, CompiledMatrix { transfers });
        Ok(())
    }

    pub fn has_matrix(&self, disturbance_type: DisturbanceTypeId) -> bool {
        self.matrices.contains_key(&disturbance_type)
    }

    /// Number of allocated, not yet freed operations
    pub fn live_operations(&self) -> usize {
        self.operations.len()
    }

    fn pool_position(&self, name: &str, disturbance_type: DisturbanceTypeId) -> Result<usize> {
        self.pool_lookup.get(name).copied().ok_or_else(|| {
            DisturbanceError::configuration(format!(
                "disturbance type {} refers to unknown pool '{}'",
                disturbance_type, name
            ))
        })
    }

    fn check_layout(&self, pools: &PoolTable, flux: &FluxTable) -> Result<()> {
        if pools.pool_names() != self.pool_names.as_slice() {
            return Err(DisturbanceError::configuration(
                "pool table layout does not match the flux engine pools",
            ));
        }
        if flux.names().len() != self.indicators.len() {
            return Err(DisturbanceError::invalid_input(format!(
                "flux table has {} indicators, engine defines {}",
                flux.names().len(),
                self.indicators.len()
            )));
        }
        if flux.n_rows() != pools.n_rows() {
            return Err(DisturbanceError::invalid_input(format!(
                "flux table has {} rows but pools have {}",
                flux.n_rows(),
                pools.n_rows()
            )));
        }
        Ok(())
    }
}

fn membership(
    lookup: &AHashMap<String, usize>,
    names: &[String],
    indicator: &str,
) -> Result<Vec<bool>> {
    let mut flags = vec![false; lookup.len()];
    for name in names {
        let idx = lookup.get(name).ok_or_else(|| {
            DisturbanceError::configuration(format!(
                "flux indicator '{}' refers to unknown pool '{}'",
                indicator, name
            ))
        })?;
        flags[*idx] = true;
    }
    Ok(flags)
}

impl PoolFluxEngine for MatrixFluxEngine {
    fn flux_indicators(&self) -> &[FluxIndicator] {
        &self.indicators
    }

    fn allocate_operation(&mut self, n_records: usize) -> Result<OperationHandle> {
        let handle = OperationHandle(self.next_handle);
        self.next_handle += 1;
        self.operations.insert(
            handle,
            Operation { n_records, disturbance_types: None },
        );
        Ok(handle)
    }

    fn set_disturbance_matrices(
        &mut self,
        op: OperationHandle,
        disturbance_types: &[DisturbanceTypeId],
    ) -> Result<()> {
        if let Some(missing) = disturbance_types
            .iter()
            .find(|d| !d.is_none() && !self.matrices.contains_key(d))
        {
            return Err(DisturbanceError::configuration(format!(
                "no matrix registered for disturbance type {}",
                missing
            )));
        }

        let operation = self.operations.get_mut(&op).ok_or_else(|| {
            DisturbanceError::FluxEngine(format!("operation {} is not allocated", op))
        })?;
        if disturbance_types.len() != operation.n_records {
            return Err(DisturbanceError::invalid_input(format!(
                "operation {} covers {} records, got {} disturbance types",
                op,
                operation.n_records,
                disturbance_types.len()
            )));
        }
        operation.disturbance_types = Some(disturbance_types.to_vec());
        Ok(())
    }

    fn compute_flux(
        &mut self,
        ops: &[OperationHandle],
        process_ids: &[ProcessId],
        pools: &mut PoolTable,
        flux: &mut FluxTable,
        enabled: Option<&[bool]>,
    ) -> Result<()> {
        if ops.len() != process_ids.len() {
            return Err(DisturbanceError::invalid_input(format!(
                "{} operations but {} process ids",
                ops.len(),
                process_ids.len()
            )));
        }
        self.check_layout(pools, flux)?;
        if let Some(mask) = enabled {
            if mask.len() != pools.n_rows() {
                return Err(DisturbanceError::invalid_input(format!(
                    "enabled mask has {} entries but pools have {}",
                    mask.len(),
                    pools.n_rows()
                )));
            }
        }

        for (op, process_id) in ops.iter().zip(process_ids) {
            let operation = self.operations.get(op).ok_or_else(|| {
                DisturbanceError::FluxEngine(format!("operation {} is not allocated", op))
            })?;
            let disturbance_types = operation.disturbance_types.as_ref().ok_or_else(|| {
                DisturbanceError::FluxEngine(format!("operation {} has no matrices set", op))
            })?;
            if operation.n_records != pools.n_rows() {
                return Err(DisturbanceError::invalid_input(format!(
                    "operation {} covers {} records but pools have {}",
                    op,
                    operation.n_records,
                    pools.n_rows()
                )));
            }

            let counted: Vec<usize> = self
                .compiled_indicators
                .iter()
                .enumerate()
                .filter(|(_, ind)| ind.process_id == *process_id)
                .map(|(i, _)| i)
                .collect();

            for (row, disturbance_type) in disturbance_types.iter().enumerate() {
                if disturbance_type.is_none() || enabled.is_some_and(|m| !m[row]) {
                    continue;
                }
                let Some(matrix) = self.matrices.get(disturbance_type) else {
                    continue;
                };

                let start = pools.row(row).to_vec();
                let values = pools.row_mut(row);
                for &(source, sink, proportion) in &matrix.transfers {
                    let amount = start[source] * proportion;
                    values[source] -= amount;
                    values[sink] += amount;
                    for &i in &counted {
                        let ind = &self.compiled_indicators[i];
                        if ind.sources[source] && ind.sinks[sink] {
                            flux.add(i, row, amount);
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn free_operation(&mut self, op: OperationHandle) {
        if self.operations.remove(&op).is_none() {
            tracing::warn!(handle = %op, "free of unknown flux operation ignored");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool_names() -> Vec<String> {
        ["SoftwoodMerch", "HardwoodMerch", "SoftwoodStemSnag", "Products", "CO2"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    fn indicators() -> Vec<FluxIndicator> {
        vec![
            FluxIndicator {
                name: "DisturbanceSoftProduction".into(),
                process_id: ProcessId(3),
                source_pools: vec!["SoftwoodMerch".into()],
                sink_pools: vec!["Products".into()],
            },
            FluxIndicator {
                name: "DisturbanceCO2Production".into(),
                process_id: ProcessId(3),
                source_pools: vec!["SoftwoodMerch".into(), "SoftwoodStemSnag".into()],
                sink_pools: vec!["CO2".into()],
            },
            FluxIndicator {
                name: "DecayCO2".into(),
                process_id: ProcessId(1),
                source_pools: vec!["SoftwoodStemSnag".into()],
                sink_pools: vec!["CO2".into()],
            },
        ]
    }

    fn clearcut() -> DisturbanceMatrix {
        DisturbanceMatrix {
            disturbance_type_id: DisturbanceTypeId(4),
            name: "clearcut".into(),
            entries: vec![
                MatrixEntry { source: "SoftwoodMerch".into(), sink: "Products".into(), proportion: 0.8 },
                MatrixEntry { source: "SoftwoodMerch".into(), sink: "CO2".into(), proportion: 0.2 },
                MatrixEntry { source: "SoftwoodStemSnag".into(), sink: "CO2".into(), proportion: 0.5 },
                MatrixEntry { source: "SoftwoodStemSnag".into(), sink: "SoftwoodStemSnag".into(), proportion: 0.5 },
            ],
        }
    }

    fn pools() -> PoolTable {
        let mut pools = PoolTable::new(pool_names()).unwrap();
        pools.push_row(vec![100.0, 10.0, 20.0, 0.0, 0.0]).unwrap();
        pools.push_row(vec![50.0, 0.0, 4.0, 0.0, 0.0]).unwrap();
        pools
    }

    fn engine() -> MatrixFluxEngine {
        MatrixFluxEngine::with_matrices(&pool_names(), indicators(), &[clearcut()]).unwrap()
    }

    #[test]
    fn test_compute_flux_moves_carbon_and_records_indicators() {
        let mut engine = engine();
        let mut pools = pools();
        let mut flux = FluxTable::zeros(2, engine.flux_indicators());

        let op = engine.allocate_operation(2).unwrap();
        engine
            .set_disturbance_matrices(op, &[DisturbanceTypeId(4), DisturbanceTypeId(4)])
            .unwrap();
        engine
            .compute_flux(&[op], &[ProcessId(3)], &mut pools, &mut flux, None)
            .unwrap();
        engine.free_operation(op);

        assert_eq!(pools.row(0), &[0.0, 10.0, 10.0, 80.0, 30.0]);
        assert_eq!(flux.column("DisturbanceSoftProduction").unwrap(), &[80.0, 40.0]);
        assert_eq!(flux.column("DisturbanceCO2Production").unwrap(), &[30.0, 12.0]);
        // wrong process id, nothing counted
        assert_eq!(flux.column("DecayCO2").unwrap(), &[0.0, 0.0]);
        assert_eq!(engine.live_operations(), 0);
    }

    #[test]
    fn test_disabled_and_undisturbed_records_untouched() {
        let mut engine = engine();
        let mut pools = pools();
        let before = pools.clone();
        let mut flux = FluxTable::zeros(2, engine.flux_indicators());

        let op = engine.allocate_operation(2).unwrap();
        engine
            .set_disturbance_matrices(op, &[DisturbanceTypeId(4), DisturbanceTypeId::NONE])
            .unwrap();
        engine
            .compute_flux(&[op], &[ProcessId(3)], &mut pools, &mut flux, Some(&[false, true]))
            .unwrap();

        assert_eq!(pools, before);
        assert_eq!(flux.column("DisturbanceSoftProduction").unwrap(), &[0.0, 0.0]);
    }

    #[test]
    fn test_unknown_disturbance_type_is_configuration_error() {
        let mut engine = engine();
        let op = engine.allocate_operation(1).unwrap();
        let result = engine.set_disturbance_matrices(op, &[DisturbanceTypeId(99)]);
        assert!(matches!(result, Err(DisturbanceError::Configuration(_))));
    }

    #[test]
    fn test_record_count_mismatch_rejected() {
        let mut engine = engine();
        let op = engine.allocate_operation(3).unwrap();
        let result = engine.set_disturbance_matrices(op, &[DisturbanceTypeId(4)]);
        assert!(matches!(result, Err(DisturbanceError::InvalidInput(_))));
    }

    #[test]
    fn test_compute_without_matrices_fails() {
        let mut engine = engine();
        let mut pools = pools();
        let mut flux = FluxTable::zeros(2, engine.flux_indicators());
        let op = engine.allocate_operation(2).unwrap();
        let result = engine.compute_flux(&[op], &[ProcessId(3)], &mut pools, &mut flux, None);
        assert!(matches!(result, Err(DisturbanceError::FluxEngine(_))));
    }

    #[test]
    fn test_overfull_matrix_rejected() {
        let mut engine = engine();
        let mut bad = clearcut();
        bad.disturbance_type_id = DisturbanceTypeId(5);
        bad.entries[0].proportion = 0.9;
        assert!(engine.register_matrix(&bad).is_err());
        assert!(!engine.has_matrix(DisturbanceTypeId(5)));
    }

    #[test]
    fn test_matrix_with_unknown_pool_rejected() {
        let mut engine = engine();
        let mut bad = clearcut();
        bad.entries[0].sink = "Nowhere".into();
        assert!(matches!(
            engine.register_matrix(&bad),
            Err(DisturbanceError::Configuration(_))
        ));
    }

    #[test]
    fn test_indicator_with_unknown_pool_rejected() {
        let mut inds = indicators();
        inds[0].sink_pools.push("Nowhere".into());
        assert!(MatrixFluxEngine::new(&pool_names(), inds).is_err());
    }

    #[test]
    fn test_reserved_disturbance_type_rejected() {
        let mut engine = engine();
        let mut bad = clearcut();
        bad.disturbance_type_id = DisturbanceTypeId::NONE;
        assert!(engine.register_matrix(&bad).is_err());
    }
}

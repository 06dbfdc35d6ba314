//! Disturbance production - carbon a disturbance type would remove
//!
//! Production is computed by running the disturbance matrix on a working
//! copy of the eligible stands' pools and reading back the production flux
//! indicators. Values are densities (tonnes C / ha), one row per eligible
//! stand in ascending inventory order.

use serde::{Deserialize, Serialize};

use crate::core::config::{EngineConfig, ProductionIndicators};
use crate::core::error::{DisturbanceError, Result};
use crate::core::types::{DisturbanceTypeId, ProcessId};
use crate::flux::{FluxTable, OperationGuard, PoolFluxEngine};
use crate::inventory::{EligibleSet, PoolTable, StandInventory};

/// Per-record production split by source
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductionTable {
    pub softwood: Vec<f64>,
    pub hardwood: Vec<f64>,
    pub dead_organic_matter: Vec<f64>,
    /// softwood + hardwood + dead_organic_matter
    pub total: Vec<f64>,
}

impl ProductionTable {
    pub fn from_components(
        softwood: Vec<f64>,
        hardwood: Vec<f64>,
        dead_organic_matter: Vec<f64>,
    ) -> Result<Self> {
        if softwood.len() != hardwood.len() || softwood.len() != dead_organic_matter.len() {
            return Err(DisturbanceError::invalid_input(format!(
                "production components have mismatched lengths ({}, {}, {})",
                softwood.len(),
                hardwood.len(),
                dead_organic_matter.len()
            )));
        }
        let total = softwood
            .iter()
            .zip(&hardwood)
            .zip(&dead_organic_matter)
            .map(|((s, h), d)| s + h + d)
            .collect();
        Ok(Self { softwood, hardwood, dead_organic_matter, total })
    }

    pub fn len(&self) -> usize {
        self.total.len()
    }

    pub fn is_empty(&self) -> bool {
        self.total.is_empty()
    }

    /// Softwood plus DOM production (MERCHCSORT_SW priority)
    pub fn softwood_sort_value(&self) -> Vec<f64> {
        self.softwood
            .iter()
            .zip(&self.dead_organic_matter)
            .map(|(s, d)| s + d)
            .collect()
    }

    /// Hardwood plus DOM production (MERCHCSORT_HW priority)
    pub fn hardwood_sort_value(&self) -> Vec<f64> {
        self.hardwood
            .iter()
            .zip(&self.dead_organic_matter)
            .map(|(h, d)| h + d)
            .collect()
    }
}

/// Computes production for the eligible stands of an event
pub trait DisturbanceProduction {
    fn compute(
        &mut self,
        stands: &StandInventory,
        eligible: &EligibleSet,
        disturbance_type: DisturbanceTypeId,
    ) -> Result<ProductionTable>;
}

/// Run `disturbance_type` over every row of `pools` and collect production
///
/// `pools` is not modified. The operation handle is released on every path.
pub fn compute_disturbance_production<E: PoolFluxEngine + ?Sized>(
    engine: &mut E,
    pools: &PoolTable,
    disturbance_type: DisturbanceTypeId,
    process_id: ProcessId,
    indicators: &ProductionIndicators,
) -> Result<ProductionTable> {
    let n_stands = pools.n_rows();

    let mut op = OperationGuard::allocate(engine, n_stands)?;
    op.set_disturbance_matrices(&vec![disturbance_type; n_stands])?;

    let mut flux = FluxTable::zeros(n_stands, op.flux_indicators());
    let mut working = pools.clone();
    op.compute_flux(process_id, &mut working, &mut flux, None)?;
    drop(op);

    ProductionTable::from_components(
        flux.column(&indicators.softwood)?.to_vec(),
        flux.column(&indicators.hardwood)?.to_vec(),
        flux.column(&indicators.dead_organic_matter)?.to_vec(),
    )
}

/// [`DisturbanceProduction`] backed by a pool flux engine
pub struct FluxProduction<'e, E: PoolFluxEngine + ?Sized> {
    engine: &'e mut E,
    process_id: ProcessId,
    indicators: ProductionIndicators,
}

impl<'e, E: PoolFluxEngine + ?Sized> FluxProduction<'e, E> {
    pub fn new(engine: &'e mut E, config: &EngineConfig) -> Self {
        Self {
            engine,
            process_id: config.disturbance_process_id,
            indicators: config.production_indicators.clone(),
        }
    }
}

impl<E: PoolFluxEngine + ?Sized> DisturbanceProduction for FluxProduction<'_, E> {
    fn compute(
        &mut self,
        stands: &StandInventory,
        eligible: &EligibleSet,
        disturbance_type: DisturbanceTypeId,
    ) -> Result<ProductionTable> {
        eligible.check_len(stands.len())?;
        let eligible_pools = stands.pools.select(&eligible.indices());
        compute_disturbance_production(
            &mut *self.engine,
            &eligible_pools,
            disturbance_type,
            self.process_id,
            &self.indicators,
        )
    }
}

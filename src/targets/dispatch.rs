//! Event dispatch
//!
//! Maps an event's (sort type, target type) pair onto one allocation path,
//! computing production at most once and only when the path needs it.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::core::config::EngineConfig;
use crate::core::error::{DisturbanceError, Result};
use crate::core::types::{DisturbanceTypeId, SpatialReference};
use crate::inventory::{EligibleSet, SpatialIndex, StandInventory};
use crate::targets::accumulate::{
    proportion_area_target, proportion_merch_target, proportion_sort_proportion_target,
    sorted_area_target, sorted_merch_target, spatially_indexed_target,
};
use crate::targets::allocation::TargetOutcome;
use crate::targets::production::{DisturbanceProduction, ProductionTable};
use crate::targets::random::RandomSource;
use crate::targets::sort::{resolve_sort_value, SortType};

/// Quantity an event's target is expressed in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TargetType {
    /// Fraction of every eligible stand
    Proportion,
    /// Hectares
    Area,
    /// Tonnes of carbon
    Merchantable,
}

impl TargetType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetType::Proportion => "Proportion",
            TargetType::Area => "Area",
            TargetType::Merchantable => "Merchantable",
        }
    }
}

impl fmt::Display for TargetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TargetType {
    type Err = DisturbanceError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "Proportion" => Ok(TargetType::Proportion),
            "Area" => Ok(TargetType::Area),
            "Merchantable" => Ok(TargetType::Merchantable),
            other => Err(DisturbanceError::configuration(format!(
                "unknown target_type '{}'",
                other
            ))),
        }
    }
}

impl TryFrom<String> for TargetType {
    type Error = DisturbanceError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<TargetType> for String {
    fn from(value: TargetType) -> Self {
        value.as_str().to_string()
    }
}

fn default_efficiency() -> f64 {
    1.0
}

/// Event as it appears in an event table, enums still as text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRow {
    pub sort_type: String,
    pub target_type: String,
    pub target: f64,
    #[serde(alias = "disturbance_type_id")]
    pub disturbance_type: DisturbanceTypeId,
    #[serde(default = "default_efficiency")]
    pub efficiency: f64,
    #[serde(default)]
    pub spatial_reference: Option<SpatialReference>,
}

/// Typed event specification
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EventSpec {
    pub sort_type: SortType,
    pub target_type: TargetType,
    pub target: f64,
    pub disturbance_type: DisturbanceTypeId,
    pub efficiency: f64,
    pub spatial_reference: Option<SpatialReference>,
}

impl EventSpec {
    pub fn new(
        sort_type: SortType,
        target_type: TargetType,
        target: f64,
        disturbance_type: DisturbanceTypeId,
    ) -> Self {
        Self {
            sort_type,
            target_type,
            target,
            disturbance_type,
            efficiency: 1.0,
            spatial_reference: None,
        }
    }

    pub fn with_efficiency(mut self, efficiency: f64) -> Self {
        self.efficiency = efficiency;
        self
    }

    pub fn with_spatial_reference(mut self, spatial_reference: SpatialReference) -> Self {
        self.spatial_reference = Some(spatial_reference);
        self
    }
}

impl TryFrom<&EventRow> for EventSpec {
    type Error = DisturbanceError;

    fn try_from(row: &EventRow) -> Result<Self> {
        Ok(Self {
            sort_type: row.sort_type.parse()?,
            target_type: row.target_type.parse()?,
            target: row.target,
            disturbance_type: row.disturbance_type,
            efficiency: row.efficiency,
            spatial_reference: row.spatial_reference,
        })
    }
}

/// Allocation strategy selected for an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchPath {
    /// SVOID: one stand located by spatial reference
    SpatialForced,
    UniformProportion,
    UniformArea,
    UniformMerchantable,
    RankedArea,
    RankedMerchantable,
}

/// Strategy table for every (sort type, target type) pair
pub fn dispatch_path(sort_type: SortType, target_type: TargetType) -> Result<DispatchPath> {
    use DispatchPath::*;

    match (sort_type, target_type) {
        (SortType::SVoid, _) => Ok(SpatialForced),
        (SortType::ProportionOfEveryRecord, TargetType::Proportion) => Ok(UniformProportion),
        (SortType::ProportionOfEveryRecord, TargetType::Area) => Ok(UniformArea),
        (SortType::ProportionOfEveryRecord, TargetType::Merchantable) => Ok(UniformMerchantable),
        (_, TargetType::Proportion) => Err(DisturbanceError::configuration(format!(
            "sort_type {} does not support a Proportion target",
            sort_type
        ))),
        (_, TargetType::Area) => Ok(RankedArea),
        (_, TargetType::Merchantable) => Ok(RankedMerchantable),
    }
}

/// Stand state and collaborators for one dispatch call
pub struct DispatchContext<'a> {
    pub config: &'a EngineConfig,
    pub stands: &'a StandInventory,
    pub eligible: &'a EligibleSet,
    pub production: &'a mut dyn DisturbanceProduction,
    pub random: &'a mut dyn RandomSource,
    pub spatial_index: &'a dyn SpatialIndex,
}

impl DispatchContext<'_> {
    fn compute_production(&mut self, disturbance_type: DisturbanceTypeId) -> Result<ProductionTable> {
        self.production.compute(self.stands, self.eligible, disturbance_type)
    }

    fn sort_value(&mut self, sort_type: SortType, production: Option<&ProductionTable>) -> Result<Vec<f64>> {
        resolve_sort_value(sort_type, self.stands, self.eligible, production, self.random, self.config)
    }
}

/// Decide which stands `event` disturbs and by how much
pub fn dispatch_event(event: &EventSpec, ctx: &mut DispatchContext<'_>) -> Result<TargetOutcome> {
    match dispatch_path(event.sort_type, event.target_type)? {
        DispatchPath::SpatialForced => {
            let spatial_reference = event.spatial_reference.ok_or_else(|| {
                DisturbanceError::configuration("SVOID event has no spatial_reference")
            })?;
            spatially_indexed_target(spatial_reference, ctx.spatial_index)
        }
        DispatchPath::UniformProportion => {
            proportion_sort_proportion_target(event.target, ctx.stands, ctx.eligible)
        }
        DispatchPath::UniformArea => proportion_area_target(event.target, ctx.stands, ctx.eligible),
        DispatchPath::UniformMerchantable => {
            let production = ctx.compute_production(event.disturbance_type)?;
            proportion_merch_target(
                event.target,
                &production,
                ctx.stands,
                ctx.eligible,
                event.efficiency,
            )
        }
        DispatchPath::RankedArea => {
            let production = if event.sort_type.requires_production() {
                Some(ctx.compute_production(event.disturbance_type)?)
            } else {
                None
            };
            let sort_value = ctx.sort_value(event.sort_type, production.as_ref())?;
            sorted_area_target(event.target, &sort_value, ctx.stands, ctx.eligible)
        }
        DispatchPath::RankedMerchantable => {
            let production = ctx.compute_production(event.disturbance_type)?;
            let sort_value = ctx.sort_value(event.sort_type, Some(&production))?;
            sorted_merch_target(
                event.target,
                &production,
                ctx.stands,
                ctx.eligible,
                &sort_value,
                event.efficiency,
            )
        }
    }
}

/// Parse `row` and dispatch it
pub fn dispatch_row(row: &EventRow, ctx: &mut DispatchContext<'_>) -> Result<TargetOutcome> {
    let event = EventSpec::try_from(row)?;
    dispatch_event(&event, ctx)
}

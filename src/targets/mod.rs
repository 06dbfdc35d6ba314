//! Disturbance target allocation
//!
//! Given an event and the current stand state, decide which stands are
//! disturbed and what share of each. Nothing in this module logs or
//! mutates the inventory; callers apply the returned allocation.

pub mod accumulate;
pub mod allocation;
pub mod dispatch;
pub mod production;
pub mod random;
pub mod sort;

pub use accumulate::{
    proportion_area_target, proportion_merch_target, proportion_sort_proportion_target,
    sorted_area_target, sorted_disturbance_target, sorted_merch_target, spatially_indexed_target,
};
pub use allocation::{Allocation, AllocationResult, TargetOutcome, TargetStatistics};
pub use dispatch::{
    dispatch_event, dispatch_path, dispatch_row, DispatchContext, DispatchPath, EventRow,
    EventSpec, TargetType,
};
pub use production::{
    compute_disturbance_production, DisturbanceProduction, FluxProduction, ProductionTable,
};
pub use random::{FixedDraws, RandomSource, SeededRandom};
pub use sort::{resolve_sort_value, SortType};

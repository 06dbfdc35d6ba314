//! Allocation results - which stands an event disturbs and by how much

use serde::{Deserialize, Serialize};

use crate::core::types::StandIndex;

/// One disturbed stand and the share of its area to disturb
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Allocation {
    pub disturbed_index: StandIndex,
    /// In (0, 1]; 1 disturbs the entire stand
    pub area_proportion: f64,
}

/// Ordered list of disturbed stands, at most one entry per stand
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AllocationResult {
    entries: Vec<Allocation>,
}

impl AllocationResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self { entries: Vec::with_capacity(capacity) }
    }

    /// A single stand disturbed entirely
    pub fn single(index: StandIndex) -> Self {
        Self {
            entries: vec![Allocation { disturbed_index: index, area_proportion: 1.0 }],
        }
    }

    pub(crate) fn push(&mut self, disturbed_index: StandIndex, area_proportion: f64) {
        debug_assert!(!self.contains(disturbed_index));
        self.entries.push(Allocation { disturbed_index, area_proportion });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Allocation> {
        self.entries.iter()
    }

    pub fn entries(&self) -> &[Allocation] {
        &self.entries
    }

    pub fn indices(&self) -> Vec<StandIndex> {
        self.entries.iter().map(|a| a.disturbed_index).collect()
    }

    pub fn proportions(&self) -> Vec<f64> {
        self.entries.iter().map(|a| a.area_proportion).collect()
    }

    pub fn contains(&self, index: StandIndex) -> bool {
        self.entries.iter().any(|a| a.disturbed_index == index)
    }

    /// Multiply every proportion by `factor`
    pub(crate) fn scale(&mut self, factor: f64) {
        for entry in &mut self.entries {
            entry.area_proportion *= factor;
        }
    }

    /// Translate positions in a subset back to inventory indices
    pub(crate) fn remap(mut self, positions: &[StandIndex]) -> Self {
        for entry in &mut self.entries {
            entry.disturbed_index = positions[entry.disturbed_index];
        }
        self
    }
}

/// Summary of how well an event's target was met
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TargetStatistics {
    /// Sum of the positive target variable over eligible stands
    pub total_eligible_value: f64,
    /// Target variable actually disturbed
    pub total_achieved: f64,
    /// Unmet part of the target, 0 when fully realized
    pub shortfall: f64,
    pub num_records_disturbed: usize,
    /// Stands disturbed with a proportion below 1
    pub num_splits: usize,
    pub num_eligible: usize,
}

/// Allocation plus the unrealized-target signal for one event
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TargetOutcome {
    pub allocation: AllocationResult,
    /// Exact unmet amount when the eligible stands cannot satisfy the target
    pub shortfall: Option<f64>,
    pub statistics: TargetStatistics,
}

impl TargetOutcome {
    pub(crate) fn new(
        allocation: AllocationResult,
        total_eligible_value: f64,
        total_achieved: f64,
        shortfall: f64,
        num_eligible: usize,
    ) -> Self {
        let num_splits = allocation.iter().filter(|a| a.area_proportion < 1.0).count();
        let statistics = TargetStatistics {
            total_eligible_value,
            total_achieved,
            shortfall,
            num_records_disturbed: allocation.len(),
            num_splits,
            num_eligible,
        };
        Self {
            allocation,
            shortfall: (shortfall > 0.0).then_some(shortfall),
            statistics,
        }
    }

    pub fn is_realized(&self) -> bool {
        self.shortfall.is_none()
    }
}

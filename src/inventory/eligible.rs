//! Eligibility mask supplied by the caller for one event

use serde::{Deserialize, Serialize};

use crate::core::error::{DisturbanceError, Result};
use crate::core::types::StandIndex;

/// One flag per stand marking candidates for an event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EligibleSet {
    mask: Vec<bool>,
}

impl EligibleSet {
    pub fn from_mask(mask: Vec<bool>) -> Self {
        Self { mask }
    }

    /// Every stand eligible
    pub fn all(n_stands: usize) -> Self {
        Self { mask: vec![true; n_stands] }
    }

    /// Only the listed stands eligible
    pub fn from_indices(n_stands: usize, indices: &[StandIndex]) -> Result<Self> {
        let mut mask = vec![false; n_stands];
        for &i in indices {
            let slot = mask.get_mut(i).ok_or_else(|| {
                DisturbanceError::invalid_input(format!(
                    "eligible index {} out of range ({} stands)",
                    i, n_stands
                ))
            })?;
            *slot = true;
        }
        Ok(Self { mask })
    }

    pub fn len(&self) -> usize {
        self.mask.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mask.is_empty()
    }

    pub fn is_eligible(&self, index: StandIndex) -> bool {
        self.mask.get(index).copied().unwrap_or(false)
    }

    pub fn count(&self) -> usize {
        self.mask.iter().filter(|&&e| e).count()
    }

    /// Indices of eligible stands in ascending order
    pub fn indices(&self) -> Vec<StandIndex> {
        self.mask
            .iter()
            .enumerate()
            .filter(|(_, &e)| e)
            .map(|(i, _)| i)
            .collect()
    }

    pub fn as_slice(&self) -> &[bool] {
        &self.mask
    }

    /// The mask must describe exactly `n_stands` records
    pub fn check_len(&self, n_stands: usize) -> Result<()> {
        if self.mask.len() != n_stands {
            return Err(DisturbanceError::invalid_input(format!(
                "eligible set has {} entries but the inventory has {} stands",
                self.mask.len(),
                n_stands
            )));
        }
        Ok(())
    }
}

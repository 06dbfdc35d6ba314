//! Core type definitions used throughout the codebase

use derive_more::{Display, From};
use serde::{Deserialize, Serialize};

/// Zero-based index of a stand record, stable for one event evaluation
pub type StandIndex = usize;

/// Simulation timestep counter
pub type Timestep = u32;

/// Identifier of a disturbance type (matrix) in the flux engine
///
/// Id 0 is reserved for "no disturbance".
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Display, From, Serialize,
    Deserialize,
)]
#[serde(transparent)]
pub struct DisturbanceTypeId(pub i32);

impl DisturbanceTypeId {
    pub const NONE: DisturbanceTypeId = DisturbanceTypeId(0);

    pub fn is_none(&self) -> bool {
        self.0 <= 0
    }
}

/// Identifier of a flux process (growth, decay, disturbance, ...)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, From, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProcessId(pub i32);

/// External spatial identifier attached to a stand
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, From, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SpatialReference(pub i64);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disturbance_type_none() {
        assert!(DisturbanceTypeId::NONE.is_none());
        assert!(DisturbanceTypeId(-1).is_none());
        assert!(!DisturbanceTypeId(3).is_none());
    }

    #[test]
    fn test_ids_display_as_inner_value() {
        assert_eq!(DisturbanceTypeId(45).to_string(), "45");
        assert_eq!(SpatialReference::from(1050).to_string(), "1050");
    }

    #[test]
    fn test_ids_serialize_transparently() {
        let json = serde_json::to_string(&ProcessId(3)).unwrap();
        assert_eq!(json, "3");
        let back: SpatialReference = serde_json::from_str("1050").unwrap();
        assert_eq!(back, SpatialReference(1050));
    }
}

//! Stand inventory - areas, ages, classifiers and carbon pools

pub mod eligible;
pub mod pools;
pub mod stand;

pub use eligible::EligibleSet;
pub use pools::PoolTable;
pub use stand::{SpatialIndex, StandInventory, StandRecord};

//! Stand inventory with SoA layout

use serde::{Deserialize, Serialize};

use crate::core::error::{DisturbanceError, Result};
use crate::core::types::{DisturbanceTypeId, SpatialReference, StandIndex};
use crate::inventory::pools::PoolTable;

/// One row of inventory, used when building an inventory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandRecord {
    /// Area in hectares
    pub area: f64,
    /// Stand age in years
    pub age: u32,
    #[serde(default)]
    pub classifiers: Vec<String>,
    #[serde(default)]
    pub spatial_reference: Option<SpatialReference>,
    /// Pool densities, in the inventory's pool order
    pub pools: Vec<f64>,
}

/// Structure of Arrays for stand records
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawStandInventory")]
pub struct StandInventory {
    /// Area of each stand (ha)
    pub areas: Vec<f64>,
    /// Age of each stand (years)
    pub ages: Vec<u32>,
    /// Classifier value set of each stand
    pub classifiers: Vec<Vec<String>>,
    /// Optional external spatial identifier
    pub spatial_references: Vec<Option<SpatialReference>>,
    /// Most recent disturbance applied to the stand
    pub last_disturbance_types: Vec<DisturbanceTypeId>,
    /// Carbon pool densities
    pub pools: PoolTable,
}

impl StandInventory {
    pub fn new(pools: PoolTable) -> Result<Self> {
        if pools.n_rows() != 0 {
            return Err(DisturbanceError::invalid_input(
                "an empty inventory needs an empty pool table",
            ));
        }
        Ok(Self { pools, ..Self::default() })
    }

    /// Build an inventory with the given pool layout from records
    pub fn from_records(
        pool_names: &[String],
        records: impl IntoIterator<Item = StandRecord>,
    ) -> Result<Self> {
        let mut stands = Self::new(PoolTable::new(pool_names.iter().cloned())?)?;
        for record in records {
            stands.push(record)?;
        }
        Ok(stands)
    }

    /// Add a stand, returns its index
    pub fn push(&mut self, record: StandRecord) -> Result<StandIndex> {
        if !record.area.is_finite() || record.area < 0.0 {
            return Err(DisturbanceError::invalid_input(format!(
                "stand area must be a non-negative number, got {}",
                record.area
            )));
        }
        self.pools.push_row(record.pools)?;
        self.areas.push(record.area);
        self.ages.push(record.age);
        self.classifiers.push(record.classifiers);
        self.spatial_references.push(record.spatial_reference);
        self.last_disturbance_types.push(DisturbanceTypeId::NONE);
        Ok(self.areas.len() - 1)
    }

    pub fn len(&self) -> usize {
        self.areas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.areas.is_empty()
    }

    pub fn total_area(&self) -> f64 {
        self.areas.iter().sum()
    }

    /// Split off `proportion` of a stand's area into a new record
    ///
    /// The new record is a copy of the original (pools are densities and are
    /// unchanged) holding `area * proportion`; the original keeps the rest.
    /// Returns the index of the new record.
    pub fn split(&mut self, index: StandIndex, proportion: f64) -> Result<StandIndex> {
        if index >= self.len() {
            return Err(DisturbanceError::invalid_input(format!(
                "stand index {} out of range ({} stands)",
                index,
                self.len()
            )));
        }
        if !(proportion > 0.0 && proportion < 1.0) {
            return Err(DisturbanceError::invalid_input(format!(
                "split proportion must be in (0, 1), got {}",
                proportion
            )));
        }

        let area = self.areas[index];
        self.areas[index] = area * (1.0 - proportion);
        self.areas.push(area * proportion);
        self.ages.push(self.ages[index]);
        self.classifiers.push(self.classifiers[index].clone());
        // the split-off part must not answer spatial lookups for the original
        self.spatial_references.push(None);
        self.last_disturbance_types.push(self.last_disturbance_types[index]);
        self.pools.duplicate_row(index);
        Ok(self.len() - 1)
    }
}

#[derive(Deserialize)]
struct RawStandInventory {
    areas: Vec<f64>,
    ages: Vec<u32>,
    classifiers: Vec<Vec<String>>,
    spatial_references: Vec<Option<SpatialReference>>,
    #[serde(default)]
    last_disturbance_types: Vec<DisturbanceTypeId>,
    pools: PoolTable,
}

impl TryFrom<RawStandInventory> for StandInventory {
    type Error = DisturbanceError;

    fn try_from(raw: RawStandInventory) -> Result<Self> {
        let n = raw.areas.len();
        let last = if raw.last_disturbance_types.is_empty() {
            vec![DisturbanceTypeId::NONE; n]
        } else {
            raw.last_disturbance_types
        };
        let columns = [
            ("ages", raw.ages.len()),
            ("classifiers", raw.classifiers.len()),
            ("spatial_references", raw.spatial_references.len()),
            ("last_disturbance_types", last.len()),
            ("pool rows", raw.pools.n_rows()),
        ];
        if let Some((name, len)) = columns.iter().find(|(_, len)| *len != n) {
            return Err(DisturbanceError::invalid_input(format!(
                "inventory has {} areas but {} {}",
                n, len, name
            )));
        }

        let mut stands = Self::new(PoolTable::new(raw.pools.pool_names().iter().cloned())?)?;
        let records = raw
            .areas
            .into_iter()
            .zip(raw.ages)
            .zip(raw.classifiers)
            .zip(raw.spatial_references)
            .enumerate();
        for (i, (((area, age), classifiers), spatial_reference)) in records {
            stands.push(StandRecord {
                area,
                age,
                classifiers,
                spatial_reference,
                pools: raw.pools.row(i).to_vec(),
            })?;
        }
        stands.last_disturbance_types = last;
        Ok(stands)
    }
}

/// Resolves an external spatial identifier to a stand index
pub trait SpatialIndex {
    fn lookup(&self, reference: SpatialReference) -> Result<StandIndex>;
}

impl SpatialIndex for StandInventory {
    fn lookup(&self, reference: SpatialReference) -> Result<StandIndex> {
        let mut matches = self
            .spatial_references
            .iter()
            .enumerate()
            .filter(|(_, r)| **r == Some(reference))
            .map(|(i, _)| i);

        let first = matches.next().ok_or_else(|| {
            DisturbanceError::invalid_input(format!(
                "no stand matches spatial reference {}",
                reference
            ))
        })?;
        if matches.next().is_some() {
            return Err(DisturbanceError::invalid_input(format!(
                "multiple stands match spatial reference {}",
                reference
            )));
        }
        Ok(first)
    }
}

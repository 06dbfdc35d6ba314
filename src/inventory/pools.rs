//! Named carbon pool values, one row per stand
//!
//! Pool values are area densities (tonnes C / ha). Rows line up with the
//! records of the owning [`StandInventory`](super::StandInventory).

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::core::error::{DisturbanceError, Result};

/// Row-major table of pool values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawPoolTable")]
pub struct PoolTable {
    names: Vec<String>,
    #[serde(skip)]
    lookup: AHashMap<String, usize>,
    rows: Vec<Vec<f64>>,
}

impl PoolTable {
    /// Create an empty table with the given pool layout
    pub fn new<S: Into<String>>(names: impl IntoIterator<Item = S>) -> Result<Self> {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        let mut lookup = AHashMap::with_capacity(names.len());
        for (i, name) in names.iter().enumerate() {
            if lookup.insert(name.clone(), i).is_some() {
                return Err(DisturbanceError::configuration(format!(
                    "duplicate pool name '{}'",
                    name
                )));
            }
        }
        Ok(Self { names, lookup, rows: Vec::new() })
    }

    pub fn pool_names(&self) -> &[String] {
        &self.names
    }

    pub fn n_pools(&self) -> usize {
        self.names.len()
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    /// Position of a pool in each row
    pub fn pool_index(&self, name: &str) -> Option<usize> {
        self.lookup.get(name).copied()
    }

    /// Append a row, its width must match the pool layout
    pub fn push_row(&mut self, values: Vec<f64>) -> Result<usize> {
        if values.len() != self.names.len() {
            return Err(DisturbanceError::invalid_input(format!(
                "pool row has {} values, expected {}",
                values.len(),
                self.names.len()
            )));
        }
        self.rows.push(values);
        Ok(self.rows.len() - 1)
    }

    pub fn row(&self, index: usize) -> &[f64] {
        &self.rows[index]
    }

    pub fn row_mut(&mut self, index: usize) -> &mut [f64] {
        &mut self.rows[index]
    }

    pub fn get(&self, row: usize, pool: &str) -> Option<f64> {
        let col = self.pool_index(pool)?;
        self.rows.get(row).map(|r| r[col])
    }

    /// Copy out one pool's values across all rows
    pub fn column(&self, pool: &str) -> Result<Vec<f64>> {
        let col = self.pool_index(pool).ok_or_else(|| {
            DisturbanceError::invalid_input(format!("pool '{}' is not defined", pool))
        })?;
        Ok(self.rows.iter().map(|r| r[col]).collect())
    }

    /// Subset of rows, in the given order
    pub fn select(&self, indices: &[usize]) -> Self {
        Self {
            names: self.names.clone(),
            lookup: self.lookup.clone(),
            rows: indices.iter().map(|&i| self.rows[i].clone()).collect(),
        }
    }

    /// Append a copy of an existing row, returns the new row index
    pub fn duplicate_row(&mut self, index: usize) -> usize {
        let copy = self.rows[index].clone();
        self.rows.push(copy);
        self.rows.len() - 1
    }
}

#[derive(Deserialize)]
struct RawPoolTable {
    names: Vec<String>,
    rows: Vec<Vec<f64>>,
}

impl TryFrom<RawPoolTable> for PoolTable {
    type Error = DisturbanceError;

    fn try_from(raw: RawPoolTable) -> Result<Self> {
        let mut table = Self::new(raw.names)?;
        for row in raw.rows {
            table.push_row(row)?;
        }
        Ok(table)
    }
}

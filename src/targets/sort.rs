//! Sort types and the per-stand priority values they define

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::core::config::EngineConfig;
use crate::core::error::{DisturbanceError, Result};
use crate::inventory::{EligibleSet, StandInventory};
use crate::targets::production::ProductionTable;
use crate::targets::random::RandomSource;

/// How candidate stands are ranked for an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum SortType {
    /// No ranking, every eligible stand is disturbed by the same proportion
    ProportionOfEveryRecord,
    MerchCSortTotal,
    MerchCSortSoftwood,
    MerchCSortHardwood,
    RandomSort,
    TotalStemSnag,
    SoftwoodStemSnag,
    HardwoodStemSnag,
    SortBySoftwoodAge,
    SortByHardwoodAge,
    /// Forced disturbance of one spatially referenced stand
    SVoid,
}

impl SortType {
    pub const ALL: [SortType; 11] = [
        SortType::ProportionOfEveryRecord,
        SortType::MerchCSortTotal,
        SortType::MerchCSortSoftwood,
        SortType::MerchCSortHardwood,
        SortType::RandomSort,
        SortType::TotalStemSnag,
        SortType::SoftwoodStemSnag,
        SortType::HardwoodStemSnag,
        SortType::SortBySoftwoodAge,
        SortType::SortByHardwoodAge,
        SortType::SVoid,
    ];

    /// Name used in event tables
    pub fn as_str(&self) -> &'static str {
        match self {
            SortType::ProportionOfEveryRecord => "PROPORTION_OF_EVERY_RECORD",
            SortType::MerchCSortTotal => "MERCHCSORT_TOTAL",
            SortType::MerchCSortSoftwood => "MERCHCSORT_SW",
            SortType::MerchCSortHardwood => "MERCHCSORT_HW",
            SortType::RandomSort => "RANDOMSORT",
            SortType::TotalStemSnag => "TOTALSTEMSNAG",
            SortType::SoftwoodStemSnag => "SWSTEMSNAG",
            SortType::HardwoodStemSnag => "HWSTEMSNAG",
            SortType::SortBySoftwoodAge => "SORT_BY_SW_AGE",
            SortType::SortByHardwoodAge => "SORT_BY_HW_AGE",
            SortType::SVoid => "SVOID",
        }
    }

    /// Priority is derived from disturbance production
    pub fn requires_production(&self) -> bool {
        matches!(
            self,
            SortType::MerchCSortTotal | SortType::MerchCSortSoftwood | SortType::MerchCSortHardwood
        )
    }

    /// Stands are ordered by a priority value before accumulation
    pub fn is_ranked(&self) -> bool {
        !matches!(self, SortType::ProportionOfEveryRecord | SortType::SVoid)
    }
}

impl fmt::Display for SortType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortType {
    type Err = DisturbanceError;

    fn from_str(s: &str) -> Result<Self> {
        SortType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s.trim())
            .ok_or_else(|| DisturbanceError::configuration(format!("unknown sort_type '{}'", s)))
    }
}

impl TryFrom<String> for SortType {
    type Error = DisturbanceError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<SortType> for String {
    fn from(value: SortType) -> Self {
        value.as_str().to_string()
    }
}

/// Priority value for every eligible stand, in ascending inventory order
///
/// `production` must be supplied for production-based sorts and have one
/// row per eligible stand. Sort types without a ranking are rejected.
pub fn resolve_sort_value(
    sort_type: SortType,
    stands: &StandInventory,
    eligible: &EligibleSet,
    production: Option<&ProductionTable>,
    random: &mut dyn RandomSource,
    config: &EngineConfig,
) -> Result<Vec<f64>> {
    eligible.check_len(stands.len())?;
    let indices = eligible.indices();
    let n_eligible = indices.len();

    let production_for = |sort_type: SortType| -> Result<&ProductionTable> {
        let table = production.ok_or_else(|| {
            DisturbanceError::invalid_input(format!(
                "sort_type {} needs disturbance production",
                sort_type
            ))
        })?;
        if table.len() != n_eligible {
            return Err(DisturbanceError::invalid_input(format!(
                "production table has {} rows but {} stands are eligible",
                table.len(),
                n_eligible
            )));
        }
        Ok(table)
    };
    let snag_pool = |pool: &str| -> Result<Vec<f64>> {
        let col = stands.pools.pool_index(pool).ok_or_else(|| {
            DisturbanceError::invalid_input(format!("pool '{}' is not defined", pool))
        })?;
        Ok(indices.iter().map(|&i| stands.pools.row(i)[col]).collect())
    };

    match sort_type {
        SortType::MerchCSortTotal => Ok(production_for(sort_type)?.total.clone()),
        SortType::MerchCSortSoftwood => Ok(production_for(sort_type)?.softwood_sort_value()),
        SortType::MerchCSortHardwood => Ok(production_for(sort_type)?.hardwood_sort_value()),
        SortType::RandomSort => {
            let draws = random.draw(n_eligible);
            if draws.len() != n_eligible {
                return Err(DisturbanceError::invalid_input(format!(
                    "random source returned {} values for {} eligible stands",
                    draws.len(),
                    n_eligible
                )));
            }
            if let Some(bad) = draws.iter().find(|v| !v.is_finite()) {
                return Err(DisturbanceError::invalid_input(format!(
                    "random source returned non-finite value {}",
                    bad
                )));
            }
            Ok(draws)
        }
        SortType::TotalStemSnag => {
            let softwood = snag_pool(&config.softwood_stem_snag_pool)?;
            let hardwood = snag_pool(&config.hardwood_stem_snag_pool)?;
            Ok(softwood.iter().zip(&hardwood).map(|(s, h)| s + h).collect())
        }
        SortType::SoftwoodStemSnag => snag_pool(&config.softwood_stem_snag_pool),
        SortType::HardwoodStemSnag => snag_pool(&config.hardwood_stem_snag_pool),
        SortType::SortBySoftwoodAge | SortType::SortByHardwoodAge => {
            Ok(indices.iter().map(|&i| stands.ages[i] as f64).collect())
        }
        SortType::ProportionOfEveryRecord | SortType::SVoid => Err(
            DisturbanceError::configuration(format!("sort_type {} has no priority value", sort_type)),
        ),
    }
}

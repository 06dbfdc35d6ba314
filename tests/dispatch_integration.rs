//! Integration tests for event dispatch
//!
//! These drive `dispatch_event` / `dispatch_row` through every allocation
//! path with substitutable collaborators:
//! - a recording production source, to see when production is computed
//! - fixed random draws, to pin RANDOMSORT ordering
//! - the inventory itself as spatial index for SVOID events

use carbon_disturbance::core::config::EngineConfig;
use carbon_disturbance::core::error::{DisturbanceError, Result};
use carbon_disturbance::core::types::{DisturbanceTypeId, ProcessId, SpatialReference};
use carbon_disturbance::flux::{DisturbanceMatrix, FluxIndicator, MatrixEntry, MatrixFluxEngine};
use carbon_disturbance::inventory::{EligibleSet, StandInventory, StandRecord};
use carbon_disturbance::targets::{
    dispatch_event, dispatch_row, DispatchContext, DisturbanceProduction, EventRow, EventSpec,
    FixedDraws, FluxProduction, ProductionTable, RandomSource, SortType, TargetOutcome,
    TargetType,
};

// ============================================================================
// Fixtures
// ============================================================================

/// Per-stand production, handed back for the eligible stands of each call
struct RecordingProduction {
    softwood: Vec<f64>,
    hardwood: Vec<f64>,
    dead_organic_matter: Vec<f64>,
    calls: Vec<DisturbanceTypeId>,
}

impl RecordingProduction {
    fn new(softwood: Vec<f64>, hardwood: Vec<f64>, dead_organic_matter: Vec<f64>) -> Self {
        Self { softwood, hardwood, dead_organic_matter, calls: Vec::new() }
    }

    fn flat(n: usize, value: f64) -> Self {
        Self::new(vec![value; n], vec![0.0; n], vec![0.0; n])
    }
}

impl DisturbanceProduction for RecordingProduction {
    fn compute(
        &mut self,
        _stands: &StandInventory,
        eligible: &EligibleSet,
        disturbance_type: DisturbanceTypeId,
    ) -> Result<ProductionTable> {
        self.calls.push(disturbance_type);
        let indices = eligible.indices();
        let pick = |values: &[f64]| -> Vec<f64> { indices.iter().map(|&i| values[i]).collect() };
        ProductionTable::from_components(
            pick(&self.softwood),
            pick(&self.hardwood),
            pick(&self.dead_organic_matter),
        )
    }
}

/// Counts how many values were drawn
struct CountingRandom {
    drawn: usize,
}

impl RandomSource for CountingRandom {
    fn draw(&mut self, n: usize) -> Vec<f64> {
        self.drawn += n;
        vec![0.5; n]
    }
}

fn pool_names() -> Vec<String> {
    ["SoftwoodMerch", "SoftwoodStemSnag", "HardwoodStemSnag", "Products"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn stands(areas: &[f64]) -> StandInventory {
    let records = areas.iter().enumerate().map(|(i, &area)| StandRecord {
        area,
        age: 20 + i as u32 * 10,
        classifiers: vec!["softwood".into()],
        spatial_reference: Some(SpatialReference(1048 + i as i64)),
        pools: vec![50.0 + i as f64, 4.0 - i as f64, 1.0, 0.0],
    });
    StandInventory::from_records(&pool_names(), records).unwrap()
}

fn run(
    event: &EventSpec,
    stands: &StandInventory,
    eligible: &EligibleSet,
    production: &mut dyn DisturbanceProduction,
    random: &mut dyn RandomSource,
) -> Result<TargetOutcome> {
    let config = EngineConfig::default();
    let mut ctx = DispatchContext {
        config: &config,
        stands,
        eligible,
        production,
        random,
        spatial_index: stands,
    };
    dispatch_event(event, &mut ctx)
}

fn assert_close(actual: &[f64], expected: &[f64]) {
    assert_eq!(actual.len(), expected.len(), "{:?} vs {:?}", actual, expected);
    for (a, e) in actual.iter().zip(expected) {
        assert!((a - e).abs() < 1e-12, "{:?} vs {:?}", actual, expected);
    }
}

// ============================================================================
// Ranked paths
// ============================================================================

/// MERCHCSORT_SW ranks by softwood + DOM production, not by total production,
/// and scales the carbon allocation by the event's efficiency.
#[test]
fn test_merch_sort_softwood_carbon_target() {
    let stands = stands(&[1.0, 1.0, 1.0]);
    // totals 610, 350, 200 but softwood + DOM 110, 350, 200
    let mut production = RecordingProduction::new(
        vec![100.0, 50.0, 200.0],
        vec![500.0, 0.0, 0.0],
        vec![10.0, 300.0, 0.0],
    );
    let event = EventSpec::new(
        SortType::MerchCSortSoftwood,
        TargetType::Merchantable,
        50.0,
        DisturbanceTypeId(42),
    )
    .with_efficiency(0.1);

    let outcome = run(
        &event,
        &stands,
        &EligibleSet::all(3),
        &mut production,
        &mut FixedDraws::constant(0.0),
    )
    .unwrap();

    assert_eq!(production.calls, vec![DisturbanceTypeId(42)]);
    // carbon 61, 35, 20: stand 1 whole (35), then 15 of stand 2's 20
    assert_eq!(outcome.allocation.indices(), vec![1, 2]);
    assert_close(&outcome.allocation.proportions(), &[0.1, 0.075]);
    assert!(outcome.is_realized());
}

#[test]
fn test_random_sort_ties_keep_index_order() {
    let stands = stands(&[1.0, 1.0, 1.0, 1.0, 1.0]);
    let eligible = EligibleSet::from_mask(vec![true, false, true, true, true]);
    let mut production = RecordingProduction::flat(5, 1.0);
    let event = EventSpec::new(SortType::RandomSort, TargetType::Area, 2.5, DisturbanceTypeId(1));

    let outcome = run(
        &event,
        &stands,
        &eligible,
        &mut production,
        &mut FixedDraws::new(vec![1.0, 1.0, 1.0, 1.0]),
    )
    .unwrap();

    assert_eq!(outcome.allocation.indices(), vec![0, 2, 3]);
    assert_close(&outcome.allocation.proportions(), &[1.0, 1.0, 0.5]);
    assert!(production.calls.is_empty());
}

#[test]
fn test_production_sort_area_target_computes_production_once() {
    let stands = stands(&[2.0, 3.0, 4.0]);
    let mut production =
        RecordingProduction::new(vec![5.0, 9.0, 1.0], vec![0.0; 3], vec![0.0; 3]);
    let event =
        EventSpec::new(SortType::MerchCSortTotal, TargetType::Area, 4.0, DisturbanceTypeId(7));

    let outcome = run(
        &event,
        &stands,
        &EligibleSet::all(3),
        &mut production,
        &mut FixedDraws::constant(0.0),
    )
    .unwrap();

    assert_eq!(production.calls.len(), 1);
    // stand 1 (3 ha) whole, then 1 of stand 0's 2 ha
    assert_eq!(outcome.allocation.indices(), vec![1, 0]);
    assert_close(&outcome.allocation.proportions(), &[1.0, 0.5]);
}

#[test]
fn test_snag_sort_carbon_target_reports_shortfall() {
    let stands = stands(&[1.0, 1.0]);
    let mut production = RecordingProduction::flat(2, 10.0);
    let event = EventSpec::new(
        SortType::TotalStemSnag,
        TargetType::Merchantable,
        25.0,
        DisturbanceTypeId(3),
    );

    let outcome = run(
        &event,
        &stands,
        &EligibleSet::all(2),
        &mut production,
        &mut FixedDraws::constant(0.0),
    )
    .unwrap();

    assert_eq!(production.calls.len(), 1);
    // snags 5 vs 4: stand 0 first
    assert_eq!(outcome.allocation.indices(), vec![0, 1]);
    assert_eq!(outcome.shortfall, Some(5.0));
    assert_eq!(outcome.statistics.total_eligible_value, 20.0);
}

// ============================================================================
// Uniform and forced paths
// ============================================================================

#[test]
fn test_proportion_of_every_record_area_target() {
    let stands = stands(&[10.0, 20.0, 10.0, 5.0]);
    let eligible = EligibleSet::from_mask(vec![true, true, true, false]);
    let mut production = RecordingProduction::flat(4, 1.0);
    let event = EventSpec::new(
        SortType::ProportionOfEveryRecord,
        TargetType::Area,
        13.0,
        DisturbanceTypeId(1),
    );

    let outcome = run(
        &event,
        &stands,
        &eligible,
        &mut production,
        &mut FixedDraws::constant(0.0),
    )
    .unwrap();

    assert_eq!(outcome.allocation.indices(), vec![0, 1, 2]);
    assert_close(&outcome.allocation.proportions(), &[13.0 / 40.0; 3]);
    assert!(outcome.is_realized());
    assert!(production.calls.is_empty());
}

#[test]
fn test_proportion_of_every_record_merch_target() {
    let stands = stands(&[1.0, 3.0]);
    let mut production = RecordingProduction::flat(2, 10.0);
    let event = EventSpec::new(
        SortType::ProportionOfEveryRecord,
        TargetType::Merchantable,
        20.0,
        DisturbanceTypeId(9),
    )
    .with_efficiency(0.5);

    let outcome = run(
        &event,
        &stands,
        &EligibleSet::all(2),
        &mut production,
        &mut FixedDraws::constant(0.0),
    )
    .unwrap();

    assert_eq!(production.calls, vec![DisturbanceTypeId(9)]);
    // carbon 5 + 15 = 20, so every stand at 1 x efficiency
    assert_close(&outcome.allocation.proportions(), &[0.5, 0.5]);
}

#[test]
fn test_svoid_forces_single_stand() {
    let stands = stands(&[1.0, 1.0, 1.0, 1.0]);
    let mut production = RecordingProduction::flat(4, 1.0);
    let mut random = CountingRandom { drawn: 0 };
    let event = EventSpec::new(SortType::SVoid, TargetType::Area, 100.0, DisturbanceTypeId(1))
        .with_spatial_reference(SpatialReference(1050));

    let outcome = run(
        &event,
        &stands,
        &EligibleSet::from_mask(vec![false; 4]),
        &mut production,
        &mut random,
    )
    .unwrap();

    assert_eq!(outcome.allocation.indices(), vec![2]);
    assert_eq!(outcome.allocation.proportions(), vec![1.0]);
    assert!(outcome.is_realized());
    assert!(production.calls.is_empty());
    assert_eq!(random.drawn, 0);
}

#[test]
fn test_svoid_without_reference_is_configuration_error() {
    let stands = stands(&[1.0]);
    let event = EventSpec::new(SortType::SVoid, TargetType::Area, 1.0, DisturbanceTypeId(1));
    let result = run(
        &event,
        &stands,
        &EligibleSet::all(1),
        &mut RecordingProduction::flat(1, 1.0),
        &mut FixedDraws::constant(0.0),
    );
    assert!(matches!(result, Err(DisturbanceError::Configuration(_))));
}

// ============================================================================
// Failure semantics
// ============================================================================

#[test]
fn test_unknown_names_rejected_before_production() {
    let stands = stands(&[1.0, 1.0]);
    let config = EngineConfig::default();
    let mut production = RecordingProduction::flat(2, 1.0);
    let mut random = FixedDraws::constant(0.0);
    let eligible = EligibleSet::all(2);

    for (sort_type, target_type) in [("MERCHCSORT_SOFT", "Merchantable"), ("MERCHCSORT_SW", "Mass")] {
        let row = EventRow {
            sort_type: sort_type.into(),
            target_type: target_type.into(),
            target: 1.0,
            disturbance_type: DisturbanceTypeId(1),
            efficiency: 1.0,
            spatial_reference: None,
        };
        let mut ctx = DispatchContext {
            config: &config,
            stands: &stands,
            eligible: &eligible,
            production: &mut production,
            random: &mut random,
            spatial_index: &stands,
        };
        let result = dispatch_row(&row, &mut ctx);
        assert!(matches!(result, Err(DisturbanceError::Configuration(_))));
    }
    assert!(production.calls.is_empty());
}

#[test]
fn test_ranked_sort_with_proportion_target_rejected() {
    let stands = stands(&[1.0]);
    let event = EventSpec::new(
        SortType::SoftwoodStemSnag,
        TargetType::Proportion,
        0.5,
        DisturbanceTypeId(1),
    );
    let result = run(
        &event,
        &stands,
        &EligibleSet::all(1),
        &mut RecordingProduction::flat(1, 1.0),
        &mut FixedDraws::constant(0.0),
    );
    assert!(matches!(result, Err(DisturbanceError::Configuration(_))));
}

#[test]
fn test_negative_target_is_invalid_input() {
    let stands = stands(&[1.0]);
    let event =
        EventSpec::new(SortType::SortBySoftwoodAge, TargetType::Area, -1.0, DisturbanceTypeId(1));
    let result = run(
        &event,
        &stands,
        &EligibleSet::all(1),
        &mut RecordingProduction::flat(1, 1.0),
        &mut FixedDraws::constant(0.0),
    );
    assert!(matches!(result, Err(DisturbanceError::InvalidInput(_))));
}

#[test]
fn test_eligible_mask_length_checked() {
    let stands = stands(&[1.0, 1.0]);
    let event = EventSpec::new(SortType::RandomSort, TargetType::Area, 1.0, DisturbanceTypeId(1));
    let result = run(
        &event,
        &stands,
        &EligibleSet::all(3),
        &mut RecordingProduction::flat(2, 1.0),
        &mut FixedDraws::constant(0.0),
    );
    assert!(matches!(result, Err(DisturbanceError::InvalidInput(_))));
}

// ============================================================================
// Flux-backed production
// ============================================================================

#[test]
fn test_flux_production_end_to_end() {
    let indicator = |name: &str, source: &str| FluxIndicator {
        name: name.into(),
        process_id: ProcessId(3),
        source_pools: vec![source.into()],
        sink_pools: vec!["Products".into()],
    };
    let mut engine = MatrixFluxEngine::with_matrices(
        &pool_names(),
        vec![
            indicator("DisturbanceSoftProduction", "SoftwoodMerch"),
            indicator("DisturbanceHardProduction", "HardwoodStemSnag"),
            indicator("DisturbanceDOMProduction", "SoftwoodStemSnag"),
        ],
        &[DisturbanceMatrix {
            disturbance_type_id: DisturbanceTypeId(4),
            name: "clearcut".into(),
            entries: vec![MatrixEntry {
                source: "SoftwoodMerch".into(),
                sink: "Products".into(),
                proportion: 1.0,
            }],
        }],
    )
    .unwrap();
    let stands = stands(&[1.0, 1.0, 1.0]);
    let config = EngineConfig::default();

    let outcome = {
        let mut production = FluxProduction::new(&mut engine, &config);
        let event = EventSpec::new(
            SortType::MerchCSortTotal,
            TargetType::Merchantable,
            60.0,
            DisturbanceTypeId(4),
        );
        run(
            &event,
            &stands,
            &EligibleSet::all(3),
            &mut production,
            &mut FixedDraws::constant(0.0),
        )
        .unwrap()
    };

    // merch 50, 51, 52: stand 2 whole, then 8 of stand 1's 51
    assert_eq!(outcome.allocation.indices(), vec![2, 1]);
    assert_close(&outcome.allocation.proportions(), &[1.0, 8.0 / 51.0]);
    assert_eq!(engine.live_operations(), 0);
    assert_eq!(stands.pools.row(2), &[52.0, 2.0, 1.0, 0.0]);
}

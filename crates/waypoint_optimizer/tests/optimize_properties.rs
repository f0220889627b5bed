mod common;

use std::f64::consts::{PI, TAU};

use fxhash::FxHashSet;
use proptest::prelude::*;
use waypoint_optimizer::solver::{
    optimize::{Algorithm, OptimizationOptions, optimize},
    solver_params::{AnnealingParams, GeneticParams},
};

fn stop_set_strategy() -> impl Strategy<Value = Vec<(f64, f64)>> {
    prop::collection::vec((-5_000.0..5_000.0_f64, -5_000.0..5_000.0_f64), 2..12)
}

fn algorithm_strategy() -> impl Strategy<Value = Algorithm> {
    prop_oneof![
        Just(Algorithm::NearestNeighborTwoOpt),
        Just(Algorithm::Genetic),
        Just(Algorithm::SimulatedAnnealing),
    ]
}

fn light_options(seed: u64) -> OptimizationOptions {
    OptimizationOptions {
        seed,
        genetic: GeneticParams {
            population_size: 20,
            generations: 30,
            ..GeneticParams::default()
        },
        annealing: AnnealingParams {
            max_iterations: 500,
            ..AnnealingParams::default()
        },
        ..OptimizationOptions::default()
    }
}

fn ids(points: &[(f64, f64)]) -> Vec<String> {
    (0..points.len()).map(|index| format!("s{index}")).collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    /// Every input stop is in the result exactly once, whatever the algorithm.
    #[test]
    fn result_visits_every_stop_once(
        points in stop_set_strategy(),
        algorithm in algorithm_strategy(),
        seed in any::<u64>(),
        return_to_depot in any::<bool>(),
    ) {
        let names = ids(&points);
        let stops = names
            .iter()
            .zip(&points)
            .map(|(name, &(x, y))| (name.as_str(), x, y))
            .collect::<Vec<_>>();
        let problem = common::problem(&stops, return_to_depot);

        let run = optimize(&problem, None, algorithm, &light_options(seed)).unwrap();

        let result = run.result().stop_ids();
        prop_assert_eq!(result.len(), names.len());
        let unique = result.iter().collect::<FxHashSet<_>>();
        prop_assert_eq!(unique, names.iter().collect::<FxHashSet<_>>());
        prop_assert!(run.excluded_stops().is_empty());
    }

    /// The result is never longer than the committed order or the construction tour.
    #[test]
    fn result_never_worse_than_baseline(
        points in stop_set_strategy(),
        algorithm in algorithm_strategy(),
        seed in any::<u64>(),
    ) {
        let names = ids(&points);
        let stops = names
            .iter()
            .zip(&points)
            .map(|(name, &(x, y))| (name.as_str(), x, y))
            .collect::<Vec<_>>();
        let problem = common::problem(&stops, true);

        let run = optimize(&problem, Some(&names), algorithm, &light_options(seed)).unwrap();

        prop_assert!(run.result().distance() <= run.baseline().distance() + 1e-6);
        prop_assert!(run.result().distance() <= run.construction().distance() + 1e-6);
        prop_assert!(run.improvement_percentage() >= -1e-9);
    }
}

/// Counter-clockwise angle travelled from one stop to the next, around the depot.
fn angular_steps(points: &[(f64, f64)]) -> Vec<f64> {
    points
        .windows(2)
        .map(|pair| {
            let from = pair[0].1.atan2(pair[0].0);
            let to = pair[1].1.atan2(pair[1].0);
            (to - from).rem_euclid(TAU)
        })
        .collect()
}

#[test]
fn test_cross_pattern_is_untangled() {
    let stops = [
        ("n", 0.0, 1000.0),
        ("s", 0.0, -1100.0),
        ("e", 1200.0, 0.0),
        ("w", -1300.0, 0.0),
        ("n2", 0.0, 2600.0),
    ];
    let problem = common::problem(&stops, true);

    let run = optimize(
        &problem,
        None,
        Algorithm::NearestNeighborTwoOpt,
        &OptimizationOptions::default(),
    )
    .unwrap();

    // nearest neighbor zig-zags across the depot
    assert_eq!(run.construction().stop_ids(), ["n", "e", "s", "w", "n2"]);
    assert!((run.construction().distance() - 11_399.759).abs() < 1e-2);

    assert_eq!(run.result().stop_ids(), ["n", "n2", "w", "s", "e"]);
    assert!((run.result().distance() - 10_037.709).abs() < 1e-2);
    assert!(run.improvement_percentage() > 11.9);

    let visited = run
        .result()
        .stop_ids()
        .iter()
        .map(|id| {
            let &(_, x, y) = stops.iter().find(|(name, _, _)| name == id).unwrap();
            (x, y)
        })
        .collect::<Vec<_>>();
    let steps = angular_steps(&visited);
    assert!(steps.iter().all(|&step| step < PI), "{steps:?}");
    assert!(steps.iter().sum::<f64>() <= TAU);
}

#[test]
fn test_same_seed_same_tour() {
    let stops = [
        ("a", 100.0, 900.0),
        ("b", -700.0, 300.0),
        ("c", 450.0, -800.0),
        ("d", -200.0, -350.0),
        ("e", 900.0, 100.0),
        ("f", -950.0, -600.0),
        ("g", 300.0, 300.0),
    ];
    let problem = common::problem(&stops, true);

    for algorithm in [Algorithm::Genetic, Algorithm::SimulatedAnnealing] {
        let first = optimize(&problem, None, algorithm, &light_options(9)).unwrap();
        let second = optimize(&problem, None, algorithm, &light_options(9)).unwrap();

        assert_eq!(first.result(), second.result(), "{algorithm}");
    }
}

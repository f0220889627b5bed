use fixedbitset::FixedBitSet;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::{Level, debug, instrument};

use crate::{
    error::OptimizationError,
    problem::{
        load::Load,
        route_costs::RouteCosts,
        route_problem::{RouteProblem, Waypoint},
        stop::StopIdx,
    },
};

/// What to do with stops that do not fit in the vehicle.
#[derive(Serialize, Deserialize, JsonSchema, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum CapacityPolicy {
    /// Any overflow is a `CapacityExceeded` error.
    #[default]
    Strict,
    /// Stops that do not fit are deferred, re-attempted once, then left out of the tour.
    ExcludeOverflow,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConstructionOutcome {
    pub order: Vec<StopIdx>,
    /// Stops that did not fit even in the second pass.
    pub overflow: Vec<StopIdx>,
}

/// Greedy tour from the vehicle start: always drive to the closest unvisited stop.
///
/// Ties go to the lowest stop index so the result only depends on the input.
#[instrument(skip_all, level = Level::DEBUG)]
pub fn nearest_neighbor(
    problem: &RouteProblem,
    costs: &RouteCosts,
    policy: CapacityPolicy,
) -> Result<ConstructionOutcome, OptimizationError> {
    let capacity = problem.vehicle().capacity();
    let members = costs.members();

    let mut visited = FixedBitSet::with_capacity(problem.num_stops());
    let mut deferred = Vec::new();
    let mut order = Vec::with_capacity(members.len());
    let mut load = Load::ZERO;
    let mut current = Waypoint::Start;

    while let Some(next) = closest(costs, current, members, &visited) {
        visited.insert(next.get());

        let candidate_load = load + *problem.stop(next).demand();
        if capacity.fits(&candidate_load) {
            order.push(next);
            load = candidate_load;
            current = Waypoint::Stop(next);
            continue;
        }

        match policy {
            CapacityPolicy::Strict => {
                return Err(OptimizationError::CapacityExceeded {
                    demand: members
                        .iter()
                        .map(|&stop_id| problem.stop(stop_id).demand())
                        .sum(),
                    capacity: *capacity,
                });
            }
            CapacityPolicy::ExcludeOverflow => deferred.push(next),
        }
    }

    let mut overflow = Vec::new();
    let mut retry = FixedBitSet::with_capacity(problem.num_stops());
    while let Some(next) = closest(costs, current, &deferred, &retry) {
        retry.insert(next.get());

        let candidate_load = load + *problem.stop(next).demand();
        if capacity.fits(&candidate_load) {
            order.push(next);
            load = candidate_load;
            current = Waypoint::Stop(next);
        } else {
            overflow.push(next);
        }
    }

    if !overflow.is_empty() {
        debug!(
            "Nearest neighbor left {} stops out for lack of capacity",
            overflow.len()
        );
    }

    Ok(ConstructionOutcome { order, overflow })
}

fn closest(
    costs: &RouteCosts,
    current: Waypoint,
    candidates: &[StopIdx],
    visited: &FixedBitSet,
) -> Option<StopIdx> {
    let mut best: Option<(f64, StopIdx)> = None;

    for &stop_id in candidates {
        if visited.contains(stop_id.get()) {
            continue;
        }

        let distance = costs.distance(current, Waypoint::Stop(stop_id));
        let is_better = match best {
            None => true,
            Some((best_distance, best_id)) => {
                distance < best_distance || (distance == best_distance && stop_id < best_id)
            }
        };

        if is_better {
            best = Some((distance, stop_id));
        }
    }

    best.map(|(_, stop_id)| stop_id)
}

#[cfg(test)]
mod tests {
    use crate::test_utils::{self, TestProblem};

    use super::*;

    fn ids(order: &[StopIdx]) -> Vec<usize> {
        order.iter().map(|stop_id| stop_id.get()).collect()
    }

    #[test]
    fn test_visits_closest_first() {
        let problem = test_utils::line_problem(&[300.0, 100.0, 200.0]);
        let costs = RouteCosts::for_all_stops(&problem).unwrap();

        let outcome = nearest_neighbor(&problem, &costs, CapacityPolicy::Strict).unwrap();

        assert_eq!(ids(&outcome.order), vec![1, 2, 0]);
        assert!(outcome.overflow.is_empty());
    }

    #[test]
    fn test_ties_go_to_lowest_stop_id() {
        let problem = test_utils::euclidean_problem(&[(0.0, 100.0), (100.0, 0.0), (0.0, -100.0)]);
        let costs = RouteCosts::for_all_stops(&problem).unwrap();

        let outcome = nearest_neighbor(&problem, &costs, CapacityPolicy::Strict).unwrap();

        assert_eq!(outcome.order[0], StopIdx::new(0));
    }

    #[test]
    fn test_strict_capacity() {
        let problem = test_utils::create_test_problem(TestProblem {
            points: &[(100.0, 0.0), (200.0, 0.0)],
            capacity_kg: 100.0,
            weights: Some(&[60.0, 60.0]),
            ..TestProblem::default()
        });
        let costs = RouteCosts::for_all_stops(&problem).unwrap();

        let result = nearest_neighbor(&problem, &costs, CapacityPolicy::Strict);

        assert!(matches!(
            result,
            Err(OptimizationError::CapacityExceeded { demand, .. }) if demand.weight_kg == 120.0
        ));
    }

    #[test]
    fn test_overflow_is_deferred_then_excluded() {
        let problem = test_utils::create_test_problem(TestProblem {
            points: &[(100.0, 0.0), (200.0, 0.0), (300.0, 0.0)],
            capacity_kg: 100.0,
            weights: Some(&[40.0, 70.0, 50.0]),
            ..TestProblem::default()
        });
        let costs = RouteCosts::for_all_stops(&problem).unwrap();

        let outcome = nearest_neighbor(&problem, &costs, CapacityPolicy::ExcludeOverflow).unwrap();

        assert_eq!(ids(&outcome.order), vec![0, 2]);
        assert_eq!(ids(&outcome.overflow), vec![1]);
    }

    #[test]
    fn test_only_members_are_visited() {
        let problem = test_utils::line_problem(&[100.0, 200.0, 300.0]);
        let costs = RouteCosts::build(&problem, &[StopIdx::new(2), StopIdx::new(0)]).unwrap();

        let outcome = nearest_neighbor(&problem, &costs, CapacityPolicy::Strict).unwrap();

        assert_eq!(ids(&outcome.order), vec![0, 2]);
    }
}

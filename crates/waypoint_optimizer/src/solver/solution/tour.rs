use fxhash::FxHashSet;
use serde::Serialize;

use crate::{
    problem::{route_problem::RouteProblem, stop::StopIdx},
    solver::score::Score,
};

use super::tour_metrics::TourMetrics;

/// Visiting order of one vehicle with its score and metrics.
///
/// Tours are values, reordering means building a new one.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Tour {
    stops: Vec<StopIdx>,
    stop_ids: Vec<String>,
    score: Score,
    metrics: TourMetrics,
}

impl Tour {
    pub(crate) fn new(
        problem: &RouteProblem,
        stops: Vec<StopIdx>,
        score: Score,
        metrics: TourMetrics,
    ) -> Self {
        let stop_ids = stops
            .iter()
            .map(|&stop_id| problem.stop(stop_id).external_id().to_owned())
            .collect();

        Tour {
            stops,
            stop_ids,
            score,
            metrics,
        }
    }

    pub fn stops(&self) -> &[StopIdx] {
        &self.stops
    }

    /// External ids in visiting order.
    pub fn stop_ids(&self) -> &[String] {
        &self.stop_ids
    }

    pub fn score(&self) -> Score {
        self.score
    }

    pub fn metrics(&self) -> &TourMetrics {
        &self.metrics
    }

    pub fn distance(&self) -> f64 {
        self.metrics.total_distance
    }

    pub fn is_feasible(&self) -> bool {
        self.metrics.is_feasible
    }

    pub fn len(&self) -> usize {
        self.stops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stops.is_empty()
    }

    /// Same stops, each exactly once, in any order.
    pub fn has_same_stops(&self, other: &[StopIdx]) -> bool {
        let mine = self.stops.iter().collect::<FxHashSet<_>>();
        let theirs = other.iter().collect::<FxHashSet<_>>();

        mine.len() == self.stops.len() && theirs.len() == other.len() && mine == theirs
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        problem::route_costs::RouteCosts, solver::constraints::tour_evaluator::TourEvaluator,
        test_utils,
    };

    use super::*;

    #[test]
    fn test_tour_carries_external_ids() {
        let problem = test_utils::line_problem(&[100.0, 200.0, 300.0]);
        let costs = RouteCosts::for_all_stops(&problem).unwrap();
        let evaluator = TourEvaluator::new(&problem, &costs);

        let tour = evaluator.tour(vec![StopIdx::new(2), StopIdx::new(0), StopIdx::new(1)]);

        assert_eq!(tour.stop_ids(), ["s2", "s0", "s1"]);
        assert_eq!(tour.distance(), 600.0);
        assert_eq!(tour.score().soft_score, 600.0);
    }

    #[test]
    fn test_has_same_stops() {
        let problem = test_utils::line_problem(&[100.0, 200.0]);
        let costs = RouteCosts::for_all_stops(&problem).unwrap();
        let evaluator = TourEvaluator::new(&problem, &costs);
        let tour = evaluator.tour(vec![StopIdx::new(1), StopIdx::new(0)]);

        assert!(tour.has_same_stops(&[StopIdx::new(0), StopIdx::new(1)]));
        assert!(!tour.has_same_stops(&[StopIdx::new(0)]));
        assert!(!tour.has_same_stops(&[StopIdx::new(0), StopIdx::new(0)]));
    }
}

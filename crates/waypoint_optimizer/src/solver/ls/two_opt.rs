use tracing::{Level, debug, instrument};

use crate::{
    problem::{
        route_costs::RouteCosts,
        route_problem::Waypoint,
        stop::StopIdx,
    },
    solver::{
        constraints::tour_evaluator::TourEvaluator, solver_params::TwoOptParams,
        termination::Termination,
    },
};

const EPSILON: f64 = 1e-9;

/// **Intra-Route 2-Opt**
///
/// Reverses the stops between positions `from` and `to` (inclusive).
/// This eliminates crossing edges within a single route.
///
/// ```text
/// BEFORE:
///    ... (prev) --x--> [from] -> ... -> [to] --x--> (next) ...
///          ^             ^               ^            ^
///          A             B               C            D
///
/// AFTER (Sequence Reversed):
///    ... (prev) -----> [to] -> ... -> [from] -----> (next) ...
///          ^             ^               ^            ^
///          A             C               B            D
///
/// Edges Removed: (prev->from), (to->next)
/// Edges Added:   (prev->to),   (from->next)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TwoOptMove {
    pub from: usize,
    pub to: usize,
}

impl TwoOptMove {
    pub fn new(from: usize, to: usize) -> Self {
        debug_assert!(from < to, "TwoOpt: cannot have from >= to");
        TwoOptMove { from, to }
    }

    fn symmetric_delta(&self, costs: &RouteCosts, order: &[StopIdx]) -> f64 {
        let prev = RouteCosts::previous(order, self.from);
        let from = Waypoint::Stop(order[self.from]);
        let to = Waypoint::Stop(order[self.to]);
        let next = RouteCosts::next(order, self.to);

        let current_cost = costs.distance(prev, from) + costs.distance(to, next);
        let new_cost = costs.distance(prev, to) + costs.distance(from, next);

        new_cost - current_cost
    }

    /// Inner edges change direction, so they are costed again.
    fn asymmetric_delta(&self, costs: &RouteCosts, order: &[StopIdx]) -> f64 {
        let mut delta = self.symmetric_delta(costs, order);

        for position in self.from..self.to {
            let a = order[position];
            let b = order[position + 1];
            delta += costs.stop_distance(b, a) - costs.stop_distance(a, b);
        }

        delta
    }

    pub fn distance_delta(&self, costs: &RouteCosts, order: &[StopIdx]) -> f64 {
        if costs.is_symmetric() {
            self.symmetric_delta(costs, order)
        } else {
            self.asymmetric_delta(costs, order)
        }
    }

    pub fn apply(&self, order: &mut [StopIdx]) {
        order[self.from..=self.to].reverse();
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LocalSearchOutcome {
    pub order: Vec<StopIdx>,
    pub passes: usize,
    pub improvements: usize,
    /// The termination condition fired before convergence.
    pub interrupted: bool,
}

/// Best-improvement 2-opt until no move shortens the tour.
///
/// Every pass applies the single most improving move, ties go to the lowest `from` then
/// the lowest `to`. Moves that would make the tour less feasible are skipped, so the
/// distance never increases and the hard score never gets worse.
#[instrument(skip_all, level = Level::DEBUG)]
pub fn two_opt(
    evaluator: &TourEvaluator,
    mut order: Vec<StopIdx>,
    params: &TwoOptParams,
    termination: &Termination,
) -> LocalSearchOutcome {
    let costs = evaluator.costs();
    let check_feasibility = evaluator.is_order_sensitive();

    let window = params
        .window
        .clone()
        .map_or(0..order.len(), |window| {
            window.start.min(order.len())..window.end.min(order.len())
        });

    let mut hard_score = evaluator.score(&order).hard_score;
    let mut passes = 0;
    let mut improvements = 0;
    let mut interrupted = false;

    'search: while passes < params.max_passes {
        if termination.should_stop() {
            interrupted = true;
            break;
        }
        passes += 1;

        let mut best: Option<(TwoOptMove, f64, f64)> = None;

        for from in window.clone() {
            if termination.should_stop() {
                interrupted = true;
                break 'search;
            }

            for to in (from + 1)..window.end {
                let op = TwoOptMove::new(from, to);
                let delta = op.distance_delta(costs, &order);

                let is_better = delta < -EPSILON
                    && best.is_none_or(|(_, best_delta, _)| delta < best_delta - EPSILON);
                if !is_better {
                    continue;
                }

                let candidate_hard_score = if check_feasibility {
                    let mut candidate = order.clone();
                    op.apply(&mut candidate);
                    let candidate_hard_score = evaluator.score(&candidate).hard_score;
                    if candidate_hard_score > hard_score + EPSILON {
                        continue;
                    }
                    candidate_hard_score
                } else {
                    hard_score
                };

                best = Some((op, delta, candidate_hard_score));
            }
        }

        match best {
            Some((op, _, candidate_hard_score)) => {
                op.apply(&mut order);
                hard_score = candidate_hard_score;
                improvements += 1;
            }
            None => break,
        }
    }

    debug!(
        "2-opt: {} passes, {} improvements, interrupted: {}",
        passes, improvements, interrupted
    );

    LocalSearchOutcome {
        order,
        passes,
        improvements,
        interrupted,
    }
}

#[cfg(test)]
mod tests {
    use jiff::SignedDuration;

    use crate::{
        problem::{
            route_costs::RouteCosts, stop::StopIdx, time_window::TimeWindow,
            travel_matrices::TravelMatrices,
        },
        solver::{
            constraints::tour_evaluator::TourEvaluator,
            solver_params::TwoOptParams,
            termination::{CancellationToken, Termination},
        },
        test_utils,
    };

    use super::*;

    fn order(ids: &[usize]) -> Vec<StopIdx> {
        ids.iter().copied().map(StopIdx::new).collect()
    }

    #[test]
    fn test_two_opt_move() {
        let problem = test_utils::line_problem(&[100.0, 200.0, 300.0, 400.0]);
        let costs = RouteCosts::for_all_stops(&problem).unwrap();

        let mut tour = order(&[0, 2, 1, 3]);
        let op = TwoOptMove::new(1, 2);
        let delta = op.distance_delta(&costs, &tour);
        let distance = costs.tour_distance(&tour);

        op.apply(&mut tour);

        assert_eq!(tour, order(&[0, 1, 2, 3]));
        assert_eq!(costs.tour_distance(&tour), distance + delta);
        assert_eq!(delta, -200.0);
    }

    #[test]
    fn test_untangles_line() {
        let problem = test_utils::line_problem(&[100.0, 200.0, 300.0, 400.0, 500.0]);
        let costs = RouteCosts::for_all_stops(&problem).unwrap();
        let evaluator = TourEvaluator::new(&problem, &costs);

        let outcome = two_opt(
            &evaluator,
            order(&[3, 0, 4, 1, 2]),
            &TwoOptParams::default(),
            &Termination::never(),
        );

        assert_eq!(outcome.order, order(&[0, 1, 2, 3, 4]));
        assert_eq!(costs.tour_distance(&outcome.order), 500.0);
        assert!(!outcome.interrupted);
    }

    #[test]
    fn test_never_increases_distance() {
        let problem = test_utils::euclidean_problem(&[
            (120.0, 40.0),
            (-30.0, 90.0),
            (60.0, -110.0),
            (-80.0, -20.0),
            (10.0, 150.0),
            (140.0, -60.0),
        ]);
        let costs = RouteCosts::for_all_stops(&problem).unwrap();
        let evaluator = TourEvaluator::new(&problem, &costs);
        let initial = order(&[0, 1, 2, 3, 4, 5]);

        let outcome = two_opt(
            &evaluator,
            initial.clone(),
            &TwoOptParams::default(),
            &Termination::never(),
        );

        assert!(costs.tour_distance(&outcome.order) <= costs.tour_distance(&initial));

        let mut sorted = outcome.order.clone();
        sorted.sort();
        assert_eq!(sorted, initial);
    }

    #[test]
    fn test_asymmetric_delta_matches_full_cost() {
        let problem = test_utils::line_problem(&[100.0, 200.0, 300.0]);
        let matrices = TravelMatrices::from_rows(
            vec![
                vec![Some(0.0), Some(10.0), Some(20.0), Some(30.0)],
                vec![Some(15.0), Some(0.0), Some(12.0), Some(40.0)],
                vec![Some(25.0), Some(5.0), Some(0.0), Some(9.0)],
                vec![Some(35.0), Some(45.0), Some(7.0), Some(0.0)],
            ],
            vec![vec![Some(1.0); 4]; 4],
        )
        .unwrap();
        let problem = test_utils::with_matrices(&problem, matrices);
        let costs = RouteCosts::for_all_stops(&problem).unwrap();
        assert!(!costs.is_symmetric());

        let tour = order(&[0, 1, 2]);
        let op = TwoOptMove::new(0, 2);
        let delta = op.distance_delta(&costs, &tour);

        let mut reversed = tour.clone();
        op.apply(&mut reversed);

        assert_eq!(
            costs.tour_distance(&reversed) - costs.tour_distance(&tour),
            delta
        );
    }

    #[test]
    fn test_window_restricts_moves() {
        let problem = test_utils::line_problem(&[100.0, 200.0, 300.0, 400.0]);
        let costs = RouteCosts::for_all_stops(&problem).unwrap();
        let evaluator = TourEvaluator::new(&problem, &costs);

        let params = TwoOptParams {
            window: Some(2..4),
            ..TwoOptParams::default()
        };
        let outcome = two_opt(
            &evaluator,
            order(&[1, 0, 3, 2]),
            &params,
            &Termination::never(),
        );

        assert_eq!(outcome.order, order(&[1, 0, 2, 3]));
    }

    #[test]
    fn test_rejects_moves_that_make_stops_late() {
        let departure = test_utils::ts("2025-06-10T12:00:00Z");
        let problem = test_utils::create_test_problem(test_utils::TestProblem {
            points: &[(50.0, 0.0), (0.0, 100.0)],
            departure_time: Some(departure),
            time_windows: vec![(
                1,
                TimeWindow::new(None, Some(departure + SignedDuration::from_secs(12))),
            )],
            ..test_utils::TestProblem::default()
        });
        let costs = RouteCosts::for_all_stops(&problem).unwrap();
        let evaluator = TourEvaluator::new(&problem, &costs);

        // Visiting s0 first is shorter but reaches s1 after 16 seconds
        let outcome = two_opt(
            &evaluator,
            order(&[1, 0]),
            &TwoOptParams::default(),
            &Termination::never(),
        );

        assert_eq!(outcome.order, order(&[1, 0]));
        assert_eq!(outcome.improvements, 0);
    }

    #[test]
    fn test_cancelled_search_is_interrupted() {
        let problem = test_utils::line_problem(&[100.0, 200.0, 300.0]);
        let costs = RouteCosts::for_all_stops(&problem).unwrap();
        let evaluator = TourEvaluator::new(&problem, &costs);

        let token = CancellationToken::new();
        token.cancel();

        let outcome = two_opt(
            &evaluator,
            order(&[2, 1, 0]),
            &TwoOptParams::default(),
            &Termination::never().with_cancellation(token),
        );

        assert!(outcome.interrupted);
        assert_eq!(outcome.order, order(&[2, 1, 0]));
    }
}

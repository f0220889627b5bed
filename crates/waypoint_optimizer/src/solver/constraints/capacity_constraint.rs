use crate::{
    problem::{
        load::{Capacity, Load},
        route_problem::RouteProblem,
    },
    solver::{score::Score, score_level::ScoreLevel},
};

use super::constraint::{TourConstraint, TourContext};

/// Hard score per unit of relative overflow, 10% over weight costs 1000.
pub const CAPACITY_OVERFLOW_WEIGHT: f64 = 10_000.0;

const SCORE_LEVEL: ScoreLevel = ScoreLevel::Hard;

/// Deliveries only, so the load of a tour is the same whatever the order.
#[derive(Clone, Debug)]
pub struct CapacityConstraint {
    capacity: Capacity,
}

impl CapacityConstraint {
    pub fn new(problem: &RouteProblem) -> Self {
        CapacityConstraint {
            capacity: *problem.vehicle().capacity(),
        }
    }
}

impl TourConstraint for CapacityConstraint {
    fn score_level(&self) -> ScoreLevel {
        SCORE_LEVEL
    }

    fn compute_score(&self, context: &TourContext) -> Score {
        let load: Load = context
            .order
            .iter()
            .map(|&stop_id| context.problem.stop(stop_id).demand())
            .sum();

        Score::of(
            SCORE_LEVEL,
            self.capacity.overflow(&load) * CAPACITY_OVERFLOW_WEIGHT,
        )
    }
}

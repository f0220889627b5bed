use crate::solver::{score::Score, score_level::ScoreLevel};

use super::constraint::{TourConstraint, TourContext};

/// Travelled meters, the quantity every algorithm minimizes.
#[derive(Clone, Debug)]
pub struct TransportCostConstraint;

pub const TRANSPORT_COST_WEIGHT: f64 = 1.0;

const SCORE_LEVEL: ScoreLevel = ScoreLevel::Soft;

impl TourConstraint for TransportCostConstraint {
    fn score_level(&self) -> ScoreLevel {
        SCORE_LEVEL
    }

    fn compute_score(&self, context: &TourContext) -> Score {
        let distance = context.costs.tour_distance(context.order);
        Score::of(SCORE_LEVEL, distance * TRANSPORT_COST_WEIGHT)
    }
}

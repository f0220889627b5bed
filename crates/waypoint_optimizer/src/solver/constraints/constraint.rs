use crate::{
    problem::{route_costs::RouteCosts, route_problem::RouteProblem, stop::StopIdx},
    solver::{score::Score, score_level::ScoreLevel},
};

use super::{
    capacity_constraint::CapacityConstraint, time_window_constraint::TimeWindowConstraint,
    transport_cost_constraint::TransportCostConstraint,
};

/// A visiting order together with what is needed to cost it.
pub struct TourContext<'a> {
    pub problem: &'a RouteProblem,
    pub costs: &'a RouteCosts,
    pub order: &'a [StopIdx],
}

pub trait TourConstraint {
    fn score_level(&self) -> ScoreLevel;

    fn compute_score(&self, context: &TourContext) -> Score;
}

#[derive(Clone, Debug)]
pub enum Constraint {
    TransportCost(TransportCostConstraint),
    Capacity(CapacityConstraint),
    TimeWindow(TimeWindowConstraint),
}

impl Constraint {
    pub fn constraint_name(&self) -> &'static str {
        match self {
            Constraint::TransportCost(_) => "transport_cost",
            Constraint::Capacity(_) => "capacity",
            Constraint::TimeWindow(_) => "time_window",
        }
    }
}

impl TourConstraint for Constraint {
    fn score_level(&self) -> ScoreLevel {
        match self {
            Constraint::TransportCost(c) => c.score_level(),
            Constraint::Capacity(c) => c.score_level(),
            Constraint::TimeWindow(c) => c.score_level(),
        }
    }

    fn compute_score(&self, context: &TourContext) -> Score {
        match self {
            Constraint::TransportCost(c) => c.compute_score(context),
            Constraint::Capacity(c) => c.compute_score(context),
            Constraint::TimeWindow(c) => c.compute_score(context),
        }
    }
}

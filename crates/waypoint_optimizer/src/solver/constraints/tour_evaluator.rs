use jiff::SignedDuration;

use crate::{
    problem::{load::Load, route_costs::RouteCosts, route_problem::RouteProblem, stop::StopIdx},
    solver::{
        score::{Score, ScoreAnalysis},
        solution::{tour::Tour, tour_metrics::TourMetrics},
    },
};

use super::{
    capacity_constraint::CapacityConstraint,
    constraint::{Constraint, TourConstraint, TourContext},
    time_window_constraint::TimeWindowConstraint,
    transport_cost_constraint::TransportCostConstraint,
};

/// Shared cost function of every algorithm, so their results are comparable.
pub struct TourEvaluator<'a> {
    problem: &'a RouteProblem,
    costs: &'a RouteCosts,
    constraints: Vec<Constraint>,
}

impl<'a> TourEvaluator<'a> {
    pub fn new(problem: &'a RouteProblem, costs: &'a RouteCosts) -> Self {
        let mut constraints = vec![
            Constraint::TransportCost(TransportCostConstraint),
            Constraint::Capacity(CapacityConstraint::new(problem)),
        ];

        if let Some(time_window) = TimeWindowConstraint::new(problem) {
            constraints.push(Constraint::TimeWindow(time_window));
        }

        TourEvaluator {
            problem,
            costs,
            constraints,
        }
    }

    pub fn problem(&self) -> &'a RouteProblem {
        self.problem
    }

    pub fn costs(&self) -> &'a RouteCosts {
        self.costs
    }

    /// Whether the hard score can change when stops are reordered.
    pub fn is_order_sensitive(&self) -> bool {
        self.constraints
            .iter()
            .any(|constraint| matches!(constraint, Constraint::TimeWindow(_)))
    }

    fn context<'b>(&'b self, order: &'b [StopIdx]) -> TourContext<'b> {
        TourContext {
            problem: self.problem,
            costs: self.costs,
            order,
        }
    }

    pub fn score(&self, order: &[StopIdx]) -> Score {
        let context = self.context(order);
        self.constraints
            .iter()
            .map(|constraint| constraint.compute_score(&context))
            .sum()
    }

    pub fn score_analysis(&self, order: &[StopIdx]) -> ScoreAnalysis {
        let context = self.context(order);
        let mut analysis = ScoreAnalysis::default();
        for constraint in &self.constraints {
            analysis.scores.insert(
                constraint.constraint_name(),
                constraint.compute_score(&context),
            );
        }
        analysis
    }

    pub fn metrics(&self, order: &[StopIdx]) -> TourMetrics {
        let context = self.context(order);

        let total_load: Load = order
            .iter()
            .map(|&stop_id| self.problem.stop(stop_id).demand())
            .sum();
        let service_duration = order
            .iter()
            .map(|&stop_id| self.problem.stop(stop_id).service_duration())
            .fold(SignedDuration::ZERO, |acc, duration| acc + duration);
        let driving_duration = SignedDuration::from_secs_f64(self.costs.tour_duration(order));

        let (lateness, late_stops) = self
            .constraints
            .iter()
            .find_map(|constraint| match constraint {
                Constraint::TimeWindow(time_window) => Some(time_window.lateness(&context)),
                _ => None,
            })
            .unwrap_or((0.0, 0));

        let capacity = self.problem.vehicle().capacity();

        TourMetrics {
            total_distance: self.costs.tour_distance(order),
            driving_duration,
            service_duration,
            total_duration: driving_duration + service_duration,
            total_load,
            capacity_utilization: capacity.utilization(&total_load) * 100.0,
            total_lateness: SignedDuration::from_secs_f64(lateness),
            late_stops,
            is_feasible: capacity.fits(&total_load) && late_stops == 0,
        }
    }

    pub fn tour(&self, order: Vec<StopIdx>) -> Tour {
        let score = self.score(&order);
        let metrics = self.metrics(&order);
        Tour::new(self.problem, order, score, metrics)
    }
}

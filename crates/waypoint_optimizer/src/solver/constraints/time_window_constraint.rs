use crate::{
    problem::route_problem::{RouteProblem, Waypoint},
    solver::{score::Score, score_level::ScoreLevel},
};

use super::constraint::{TourConstraint, TourContext};

/// Hard score per second of lateness.
pub const LATENESS_WEIGHT: f64 = 1.0;

const SCORE_LEVEL: ScoreLevel = ScoreLevel::Hard;

/// Lateness against `latest` with free-flow driving times from the departure time.
///
/// Early vehicles do not wait, matching the ETA calculation.
#[derive(Clone, Debug)]
pub struct TimeWindowConstraint {
    /// Seconds after departure by which each stop must be reached.
    latest_offsets: Vec<Option<f64>>,
    service_durations: Vec<f64>,
}

impl TimeWindowConstraint {
    /// `None` when the problem has no departure time or no stop has a window.
    pub fn new(problem: &RouteProblem) -> Option<Self> {
        let departure_time = problem.departure_time()?;
        if !problem.has_time_windows() {
            return None;
        }

        let latest_offsets = problem
            .stops()
            .iter()
            .map(|stop| {
                stop.time_window()
                    .latest()
                    .map(|latest| latest.duration_since(departure_time).as_secs_f64())
            })
            .collect();

        let service_durations = problem
            .stops()
            .iter()
            .map(|stop| stop.service_duration().as_secs_f64())
            .collect();

        Some(TimeWindowConstraint {
            latest_offsets,
            service_durations,
        })
    }

    /// Total seconds late and the number of late stops.
    pub fn lateness(&self, context: &TourContext) -> (f64, usize) {
        let mut elapsed = 0.0;
        let mut previous = Waypoint::Start;
        let mut total = 0.0;
        let mut late_stops = 0;

        for &stop_id in context.order {
            elapsed += context.costs.duration(previous, Waypoint::Stop(stop_id));

            if let Some(latest) = self.latest_offsets[stop_id.get()]
                && elapsed > latest
            {
                total += elapsed - latest;
                late_stops += 1;
            }

            elapsed += self.service_durations[stop_id.get()];
            previous = Waypoint::Stop(stop_id);
        }

        (total, late_stops)
    }
}

impl TourConstraint for TimeWindowConstraint {
    fn score_level(&self) -> ScoreLevel {
        SCORE_LEVEL
    }

    fn compute_score(&self, context: &TourContext) -> Score {
        let (lateness, _) = self.lateness(context);
        Score::of(SCORE_LEVEL, lateness * LATENESS_WEIGHT)
    }
}

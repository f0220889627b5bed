use jiff::{SignedDuration, Timestamp};
use serde::Serialize;
use waypoint_matrix_providers::traffic_profile::CongestionLevel;

use crate::{
    error::OptimizationError,
    problem::{
        route_problem::{RouteProblem, Waypoint},
        stop::StopIdx,
    },
};

/// Traffic on one leg of a tour if it were driven at a given clock time.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct LegTraffic {
    pub from: String,
    pub to: String,
    pub multiplier: f64,
    pub congestion: CongestionLevel,
    pub free_flow_duration: SignedDuration,
    pub delay: SignedDuration,
}

/// Snapshot of every leg of `stops` at the same `clock`, including the return leg.
///
/// Unlike [`estimate_eta`](super::eta_calculator::estimate_eta) the clock does not move,
/// this answers "how congested is the route right now".
pub fn traffic_conditions(
    problem: &RouteProblem,
    stops: &[StopIdx],
    clock: Timestamp,
) -> Result<Vec<LegTraffic>, OptimizationError> {
    let waypoints = std::iter::once(Waypoint::Start)
        .chain(stops.iter().map(|&stop_id| Waypoint::Stop(stop_id)))
        .chain(problem.has_end().then_some(Waypoint::End))
        .collect::<Vec<_>>();

    waypoints
        .windows(2)
        .map(|leg| {
            let (from, to) = (leg[0], leg[1]);
            let free_flow_duration = problem.travel_duration(from, to)?;
            let multiplier =
                problem.traffic_multiplier(problem.waypoint_location_id(from), clock);

            Ok(LegTraffic {
                from: problem.waypoint_label(from),
                to: problem.waypoint_label(to),
                multiplier,
                congestion: CongestionLevel::from_multiplier(multiplier),
                free_flow_duration,
                delay: free_flow_duration.mul_f64(multiplier) - free_flow_duration,
            })
        })
        .collect()
}

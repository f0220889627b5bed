use jiff::{SignedDuration, Timestamp};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::{Level, debug, instrument};
use waypoint_matrix_providers::traffic_profile::CongestionLevel;

use crate::{
    error::OptimizationError,
    problem::{
        load::Load,
        route_problem::{RouteProblem, Waypoint},
        stop::StopIdx,
        time_window::TimeWindow,
    },
};

#[derive(Serialize, Deserialize, JsonSchema, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ArrivalStatus {
    OnTime,
    /// Arrives before the window opens.
    Early,
    Late,
}

/// Driving part of an ETA, from the previous waypoint.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct LegEta {
    pub distance: f64,
    pub free_flow_duration: SignedDuration,
    pub traffic_duration: SignedDuration,
    pub traffic_multiplier: f64,
    pub congestion: CongestionLevel,
}

impl LegEta {
    pub fn traffic_delay(&self) -> SignedDuration {
        self.traffic_duration - self.free_flow_duration
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct StopEta {
    pub stop_id: StopIdx,
    pub external_id: String,
    pub leg: LegEta,
    pub arrival: Timestamp,
    pub departure: Timestamp,
    pub cumulative_distance: f64,
    /// Load delivered so far, this stop included.
    pub cumulative_load: Load,
    pub time_window: Option<TimeWindow>,
    pub status: ArrivalStatus,
    pub lateness: SignedDuration,
    /// Time between arrival and the opening of the window.
    pub early_slack: SignedDuration,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct EtaReport {
    pub departure_time: Timestamp,
    pub stops: Vec<StopEta>,
    /// Drive back to the depot, when the vehicle returns.
    pub return_leg: Option<LegEta>,
    pub completion_time: Timestamp,
    pub total_distance: f64,
    pub free_flow_driving_duration: SignedDuration,
    pub traffic_driving_duration: SignedDuration,
    pub total_traffic_delay: SignedDuration,
    pub on_time_stops: usize,
    pub late_stops: usize,
}

impl EtaReport {
    pub fn total_duration(&self) -> SignedDuration {
        self.completion_time.duration_since(self.departure_time)
    }

    pub fn on_time_percentage(&self) -> f64 {
        if self.stops.is_empty() {
            return 100.0;
        }
        self.on_time_stops as f64 * 100.0 / self.stops.len() as f64
    }
}

fn leg_eta(
    problem: &RouteProblem,
    from: Waypoint,
    to: Waypoint,
    clock: Timestamp,
) -> Result<LegEta, OptimizationError> {
    let distance = problem.travel_distance(from, to)?;
    let free_flow_duration = problem.travel_duration(from, to)?;
    let traffic_multiplier = problem.traffic_multiplier(problem.waypoint_location_id(from), clock);

    Ok(LegEta {
        distance,
        free_flow_duration,
        traffic_duration: free_flow_duration.mul_f64(traffic_multiplier),
        traffic_multiplier,
        congestion: CongestionLevel::from_multiplier(traffic_multiplier),
    })
}

/// Walks `stops` in order from `departure_time` with traffic-adjusted leg durations.
///
/// The multiplier of a leg is the one at its origin when the vehicle leaves it, so later
/// legs see the time of day they are actually driven at. Arriving late marks the stop
/// as [`ArrivalStatus::Late`] and the walk goes on. Vehicles do not wait for windows
/// to open, an early arrival only reports its slack.
#[instrument(skip_all, level = Level::DEBUG)]
pub fn estimate_eta(
    problem: &RouteProblem,
    stops: &[StopIdx],
    departure_time: Timestamp,
) -> Result<EtaReport, OptimizationError> {
    let mut etas = Vec::with_capacity(stops.len());
    let mut clock = departure_time;
    let mut previous = Waypoint::Start;
    let mut cumulative_distance = 0.0;
    let mut cumulative_load = Load::ZERO;
    let mut free_flow_driving_duration = SignedDuration::ZERO;
    let mut traffic_driving_duration = SignedDuration::ZERO;

    for &stop_id in stops {
        let current = Waypoint::Stop(stop_id);
        let stop = problem.stop(stop_id);
        let leg = leg_eta(problem, previous, current, clock)?;

        let arrival = clock + leg.traffic_duration;
        let departure = arrival + stop.service_duration();

        cumulative_distance += leg.distance;
        cumulative_load += *stop.demand();
        free_flow_driving_duration += leg.free_flow_duration;
        traffic_driving_duration += leg.traffic_duration;

        let time_window = stop.has_time_window().then(|| *stop.time_window());
        let lateness = stop.time_window().lateness(arrival);
        let early_slack = stop.time_window().slack(arrival);
        let status = if !lateness.is_zero() {
            ArrivalStatus::Late
        } else if !early_slack.is_zero() {
            ArrivalStatus::Early
        } else {
            ArrivalStatus::OnTime
        };

        etas.push(StopEta {
            stop_id,
            external_id: stop.external_id().to_owned(),
            leg,
            arrival,
            departure,
            cumulative_distance,
            cumulative_load,
            time_window,
            status,
            lateness,
            early_slack,
        });

        clock = departure;
        previous = current;
    }

    let return_leg = if problem.has_end() {
        let leg = leg_eta(problem, previous, Waypoint::End, clock)?;
        clock += leg.traffic_duration;
        cumulative_distance += leg.distance;
        free_flow_driving_duration += leg.free_flow_duration;
        traffic_driving_duration += leg.traffic_duration;
        Some(leg)
    } else {
        None
    };

    let late_stops = etas
        .iter()
        .filter(|eta| eta.status == ArrivalStatus::Late)
        .count();

    debug!(
        "ETA of {} stops: completion at {}, {} late",
        etas.len(),
        clock,
        late_stops
    );

    Ok(EtaReport {
        departure_time,
        on_time_stops: etas.len() - late_stops,
        late_stops,
        stops: etas,
        return_leg,
        completion_time: clock,
        total_distance: cumulative_distance,
        free_flow_driving_duration,
        traffic_driving_duration,
        total_traffic_delay: traffic_driving_duration - free_flow_driving_duration,
    })
}

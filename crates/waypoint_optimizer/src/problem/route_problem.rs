use std::sync::Arc;

use fxhash::FxHashSet;
use jiff::{SignedDuration, Timestamp};
use waypoint_matrix_providers::traffic_profile::TrafficProfile;

use crate::error::OptimizationError;

use super::{
    distance_method::DistanceMethod,
    load::Load,
    location::{Location, LocationIdx},
    stop::{Stop, StopIdx},
    travel_matrices::TravelMatrices,
    vehicle::Vehicle,
};

/// Straight-line speed used when a problem is built without matrices.
pub const DEFAULT_SPEED_KMH: f64 = 35.0;

/// A node of a tour: the vehicle start, one of the stops, or the closing depot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Waypoint {
    Start,
    Stop(StopIdx),
    End,
}

/// One vehicle, its stops, and everything needed to cost a visiting order.
///
/// Cloning is cheap, the matrices are shared.
#[derive(Debug, Clone)]
pub struct RouteProblem {
    locations: Vec<Location>,
    stops: Vec<Stop>,
    vehicle: Vehicle,
    matrices: TravelMatrices,
    traffic: Arc<TrafficProfile>,
    departure_time: Option<Timestamp>,
    distance_method: DistanceMethod,
}

impl RouteProblem {
    pub fn stops(&self) -> &[Stop] {
        &self.stops
    }

    pub fn stop(&self, stop_id: StopIdx) -> &Stop {
        &self.stops[stop_id]
    }

    pub fn stop_ids(&self) -> impl Iterator<Item = StopIdx> + use<> {
        (0..self.stops.len()).map(StopIdx::new)
    }

    pub fn num_stops(&self) -> usize {
        self.stops.len()
    }

    pub fn find_stop(&self, external_id: &str) -> Option<StopIdx> {
        self.stops
            .iter()
            .position(|stop| stop.external_id() == external_id)
            .map(StopIdx::new)
    }

    /// Maps external ids to stop indices, rejecting unknown and repeated ids.
    pub fn resolve_order<S: AsRef<str>>(
        &self,
        external_ids: &[S],
    ) -> Result<Vec<StopIdx>, OptimizationError> {
        let mut seen = FxHashSet::default();
        external_ids
            .iter()
            .map(|external_id| {
                let external_id = external_id.as_ref();
                let stop_id = self
                    .find_stop(external_id)
                    .ok_or_else(|| OptimizationError::UnknownStop(external_id.to_owned()))?;
                if !seen.insert(stop_id) {
                    return Err(OptimizationError::InvalidOrder(format!(
                        "stop {external_id} appears more than once"
                    )));
                }
                Ok(stop_id)
            })
            .collect()
    }

    pub fn vehicle(&self) -> &Vehicle {
        &self.vehicle
    }

    pub fn locations(&self) -> &[Location] {
        &self.locations
    }

    pub fn location(&self, location_id: LocationIdx) -> &Location {
        &self.locations[location_id]
    }

    pub fn matrices(&self) -> &TravelMatrices {
        &self.matrices
    }

    pub fn traffic(&self) -> &TrafficProfile {
        &self.traffic
    }

    pub fn departure_time(&self) -> Option<Timestamp> {
        self.departure_time
    }

    pub fn distance_method(&self) -> DistanceMethod {
        self.distance_method
    }

    pub fn is_symmetric(&self) -> bool {
        self.matrices.is_symmetric()
    }

    pub fn has_time_windows(&self) -> bool {
        self.stops.iter().any(|stop| stop.has_time_window())
    }

    pub fn total_demand(&self) -> Load {
        self.stops.iter().map(|stop| stop.demand()).sum()
    }

    pub fn has_end(&self) -> bool {
        self.vehicle.end_location_id().is_some()
    }

    /// Location of a waypoint. `End` falls back to the start on open tours.
    pub fn waypoint_location_id(&self, waypoint: Waypoint) -> LocationIdx {
        match waypoint {
            Waypoint::Start => self.vehicle.start_location_id(),
            Waypoint::Stop(stop_id) => self.stops[stop_id].location_id(),
            Waypoint::End => self
                .vehicle
                .end_location_id()
                .unwrap_or(self.vehicle.start_location_id()),
        }
    }

    pub fn waypoint_label(&self, waypoint: Waypoint) -> String {
        match waypoint {
            Waypoint::Start => format!("{} (start)", self.vehicle.external_id()),
            Waypoint::Stop(stop_id) => self.stops[stop_id].external_id().to_owned(),
            Waypoint::End => format!("{} (end)", self.vehicle.external_id()),
        }
    }

    pub(crate) fn unreachable(&self, from: Waypoint, to: Waypoint) -> OptimizationError {
        OptimizationError::UnreachableStop {
            from: self.waypoint_label(from),
            to: self.waypoint_label(to),
        }
    }

    /// Meters between two waypoints.
    pub fn travel_distance(&self, from: Waypoint, to: Waypoint) -> Result<f64, OptimizationError> {
        self.matrices
            .distance(
                self.waypoint_location_id(from),
                self.waypoint_location_id(to),
            )
            .ok_or_else(|| self.unreachable(from, to))
    }

    /// Free-flow driving time between two waypoints.
    pub fn travel_duration(
        &self,
        from: Waypoint,
        to: Waypoint,
    ) -> Result<SignedDuration, OptimizationError> {
        self.matrices
            .time(
                self.waypoint_location_id(from),
                self.waypoint_location_id(to),
            )
            .map(SignedDuration::from_secs_f64)
            .ok_or_else(|| self.unreachable(from, to))
    }

    pub fn traffic_multiplier(&self, location_id: LocationIdx, clock: Timestamp) -> f64 {
        self.traffic
            .multiplier(self.location(location_id).point(), clock)
    }

    /// Driving time when leaving `from` at `departure`, scaled by the traffic at `from`.
    pub fn traffic_aware_duration(
        &self,
        from: Waypoint,
        to: Waypoint,
        departure: Timestamp,
    ) -> Result<SignedDuration, OptimizationError> {
        let free_flow = self.travel_duration(from, to)?;
        let multiplier = self.traffic_multiplier(self.waypoint_location_id(from), departure);

        Ok(free_flow.mul_f64(multiplier))
    }

    pub fn with_vehicle(&self, vehicle: Vehicle) -> Result<RouteProblem, OptimizationError> {
        let problem = RouteProblem {
            vehicle,
            ..self.clone()
        };
        problem.validate()?;
        Ok(problem)
    }

    pub fn with_departure_time(&self, departure_time: Timestamp) -> RouteProblem {
        RouteProblem {
            departure_time: Some(departure_time),
            ..self.clone()
        }
    }

    /// A copy with `stop` appended, returned with its index.
    pub fn with_added_stop(
        &self,
        stop: Stop,
    ) -> Result<(RouteProblem, StopIdx), OptimizationError> {
        let mut stops = self.stops.clone();
        stops.push(stop);

        let problem = RouteProblem {
            stops,
            ..self.clone()
        };
        problem.validate()?;

        let stop_id = StopIdx::new(problem.stops.len() - 1);
        Ok((problem, stop_id))
    }

    /// A copy without `removed`. Remaining stops keep their relative order and are reindexed.
    pub fn without_stop(&self, removed: StopIdx) -> RouteProblem {
        RouteProblem {
            stops: self
                .stops
                .iter()
                .enumerate()
                .filter(|(index, _)| *index != removed.get())
                .map(|(_, stop)| stop.clone())
                .collect(),
            ..self.clone()
        }
    }

    fn validate(&self) -> Result<(), OptimizationError> {
        let num_locations = self.locations.len();

        if self.matrices.num_locations() != num_locations {
            return Err(OptimizationError::InvalidProblem(format!(
                "matrices cover {} locations but the problem has {}",
                self.matrices.num_locations(),
                num_locations
            )));
        }

        let vehicle_locations = [
            Some(self.vehicle.start_location_id()),
            self.vehicle.depot_location_id(),
        ];
        for location_id in vehicle_locations.into_iter().flatten() {
            if location_id.get() >= num_locations {
                return Err(OptimizationError::InvalidProblem(format!(
                    "vehicle {} references unknown location {}",
                    self.vehicle.external_id(),
                    location_id
                )));
            }
        }

        let mut external_ids = FxHashSet::default();
        for stop in &self.stops {
            if stop.location_id().get() >= num_locations {
                return Err(OptimizationError::InvalidProblem(format!(
                    "stop {} references unknown location {}",
                    stop.external_id(),
                    stop.location_id()
                )));
            }

            if !external_ids.insert(stop.external_id()) {
                return Err(OptimizationError::InvalidProblem(format!(
                    "stop id {} is used more than once",
                    stop.external_id()
                )));
            }

            if !stop.time_window().is_valid() {
                return Err(OptimizationError::InvalidProblem(format!(
                    "stop {} has a time window that ends before it starts",
                    stop.external_id()
                )));
            }

            let demand = stop.demand();
            if demand.weight_kg < 0.0 || demand.volume_m3 < 0.0 {
                return Err(OptimizationError::InvalidProblem(format!(
                    "stop {} has a negative demand",
                    stop.external_id()
                )));
            }
        }

        Ok(())
    }
}

#[derive(Default)]
pub struct RouteProblemBuilder {
    locations: Option<Vec<Location>>,
    stops: Option<Vec<Stop>>,
    vehicle: Option<Vehicle>,
    matrices: Option<TravelMatrices>,
    traffic: Option<TrafficProfile>,
    departure_time: Option<Timestamp>,
    distance_method: Option<DistanceMethod>,
}

impl RouteProblemBuilder {
    pub fn set_locations(&mut self, locations: Vec<Location>) -> &mut RouteProblemBuilder {
        self.locations = Some(locations);
        self
    }

    pub fn set_stops(&mut self, stops: Vec<Stop>) -> &mut RouteProblemBuilder {
        self.stops = Some(stops);
        self
    }

    pub fn set_vehicle(&mut self, vehicle: Vehicle) -> &mut RouteProblemBuilder {
        self.vehicle = Some(vehicle);
        self
    }

    pub fn set_matrices(&mut self, matrices: TravelMatrices) -> &mut RouteProblemBuilder {
        self.matrices = Some(matrices);
        self
    }

    pub fn set_traffic(&mut self, traffic: TrafficProfile) -> &mut RouteProblemBuilder {
        self.traffic = Some(traffic);
        self
    }

    pub fn set_departure_time(&mut self, departure_time: Timestamp) -> &mut RouteProblemBuilder {
        self.departure_time = Some(departure_time);
        self
    }

    pub fn set_distance_method(
        &mut self,
        distance_method: DistanceMethod,
    ) -> &mut RouteProblemBuilder {
        self.distance_method = Some(distance_method);
        self
    }

    /// Without explicit matrices, straight-line matrices are derived from the locations.
    pub fn build(self) -> Result<RouteProblem, OptimizationError> {
        let locations = self.locations.unwrap_or_default();
        let distance_method = self.distance_method.unwrap_or_default();
        let vehicle = self
            .vehicle
            .ok_or_else(|| OptimizationError::InvalidProblem("a vehicle is required".into()))?;

        let matrices = self.matrices.unwrap_or_else(|| match distance_method {
            DistanceMethod::Haversine => {
                TravelMatrices::from_haversine(&locations, DEFAULT_SPEED_KMH)
            }
            DistanceMethod::Euclidean => {
                TravelMatrices::from_euclidean(&locations, DEFAULT_SPEED_KMH / 3.6)
            }
        });

        let problem = RouteProblem {
            locations,
            stops: self.stops.unwrap_or_default(),
            vehicle,
            matrices,
            traffic: Arc::new(self.traffic.unwrap_or_default()),
            departure_time: self.departure_time,
            distance_method,
        };

        problem.validate()?;

        Ok(problem)
    }
}

#[cfg(test)]
mod tests {
    use crate::test_utils;

    use super::*;

    #[test]
    fn test_travel_queries() {
        let problem = test_utils::line_problem(&[100.0, 200.0, 300.0]);

        assert_eq!(
            problem.travel_distance(Waypoint::Start, Waypoint::Stop(StopIdx::new(1))),
            Ok(200.0)
        );
        assert_eq!(
            problem.travel_duration(
                Waypoint::Stop(StopIdx::new(0)),
                Waypoint::Stop(StopIdx::new(2))
            ),
            Ok(SignedDuration::from_secs(20))
        );
    }

    #[test]
    fn test_waypoint_lookups() {
        let problem = test_utils::line_problem(&[100.0, 200.0]);
        let second = Waypoint::Stop(StopIdx::new(1));

        let location_id = problem.waypoint_location_id(second);
        assert_eq!(location_id, LocationIdx::new(2));
        assert_eq!(problem.location(location_id).x(), 200.0);
        assert_eq!(problem.waypoint_label(second), "s1");
        assert_eq!(problem.waypoint_location_id(Waypoint::End), LocationIdx::new(0));
    }

    #[test]
    fn test_missing_pair_is_unreachable() {
        let problem = test_utils::problem_with_missing_leg();

        assert_eq!(
            problem.travel_distance(Waypoint::Start, Waypoint::Stop(StopIdx::new(1))),
            Err(OptimizationError::UnreachableStop {
                from: "van-1 (start)".to_owned(),
                to: "b".to_owned(),
            })
        );
    }

    #[test]
    fn test_traffic_aware_duration() {
        let problem = test_utils::line_problem(&[100.0]);
        let rush_hour: Timestamp = "2025-06-10T08:15:00Z".parse().unwrap();
        let noon: Timestamp = "2025-06-10T12:00:00Z".parse().unwrap();

        let from = Waypoint::Start;
        let to = Waypoint::Stop(StopIdx::new(0));

        assert_eq!(
            problem.traffic_aware_duration(from, to, noon),
            Ok(SignedDuration::from_secs(10))
        );
        assert_eq!(
            problem.traffic_aware_duration(from, to, rush_hour),
            Ok(SignedDuration::from_secs(15))
        );
    }

    #[test]
    fn test_resolve_order() {
        let problem = test_utils::line_problem(&[100.0, 200.0]);

        assert_eq!(
            problem.resolve_order(&["s1", "s0"]),
            Ok(vec![StopIdx::new(1), StopIdx::new(0)])
        );
        assert_eq!(
            problem.resolve_order(&["s1", "nope"]),
            Err(OptimizationError::UnknownStop("nope".to_owned()))
        );
        assert!(matches!(
            problem.resolve_order(&["s1", "s1"]),
            Err(OptimizationError::InvalidOrder(_))
        ));
    }

    #[test]
    fn test_duplicate_stop_ids_rejected() {
        let problem = test_utils::line_problem(&[100.0, 200.0]);
        let duplicate = problem.stop(StopIdx::new(0)).clone();

        assert!(matches!(
            problem.with_added_stop(duplicate),
            Err(OptimizationError::InvalidProblem(_))
        ));
    }

    #[test]
    fn test_without_stop_reindexes() {
        let problem = test_utils::line_problem(&[100.0, 200.0, 300.0]);
        let reduced = problem.without_stop(StopIdx::new(0));

        assert_eq!(reduced.num_stops(), 2);
        assert_eq!(reduced.stop(StopIdx::new(0)).external_id(), "s1");
    }
}

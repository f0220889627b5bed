use fxhash::FxHashMap;
use jiff::{SignedDuration, Timestamp};
use parking_lot::RwLock;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::problem::{
    distance_method::DistanceMethod,
    location::Location,
    route_problem::{RouteProblem, Waypoint},
    stop::StopIdx,
};

use super::geometry::{LocalPlane, project_on_segment};

pub const DEFAULT_DEVIATION_THRESHOLD_METERS: f64 = 500.0;

#[derive(Serialize, Deserialize, JsonSchema, Debug, Clone)]
#[serde(default)]
pub struct DeviationParams {
    /// Distance to the planned path above which a position is a deviation.
    pub threshold_meters: f64,
}

impl Default for DeviationParams {
    fn default() -> Self {
        DeviationParams {
            threshold_meters: DEFAULT_DEVIATION_THRESHOLD_METERS,
        }
    }
}

/// Polyline a vehicle is expected to follow: start, stops in order, then the depot when
/// the vehicle returns.
#[derive(Serialize, Debug, Clone)]
pub struct PlannedRoute {
    route_id: String,
    vehicle_id: String,
    stop_ids: Vec<String>,
    path: Vec<Location>,
    distance_method: DistanceMethod,
}

impl PlannedRoute {
    pub fn from_tour(
        route_id: impl Into<String>,
        problem: &RouteProblem,
        stops: &[StopIdx],
    ) -> Self {
        let waypoints = std::iter::once(Waypoint::Start)
            .chain(stops.iter().map(|&stop_id| Waypoint::Stop(stop_id)))
            .chain(problem.has_end().then_some(Waypoint::End));

        PlannedRoute {
            route_id: route_id.into(),
            vehicle_id: problem.vehicle().external_id().to_owned(),
            stop_ids: stops
                .iter()
                .map(|&stop_id| problem.stop(stop_id).external_id().to_owned())
                .collect(),
            path: waypoints
                .map(|waypoint| *problem.location(problem.waypoint_location_id(waypoint)))
                .collect(),
            distance_method: problem.distance_method(),
        }
    }

    pub fn route_id(&self) -> &str {
        &self.route_id
    }

    pub fn vehicle_id(&self) -> &str {
        &self.vehicle_id
    }

    pub fn stop_ids(&self) -> &[String] {
        &self.stop_ids
    }

    pub fn path(&self) -> &[Location] {
        &self.path
    }

    /// Closest point of the path to `observed`, with its distance in meters.
    ///
    /// `None` when the path has no leg.
    pub fn nearest_point(&self, observed: &Location) -> Option<(Location, f64)> {
        let plane = LocalPlane::new(self.distance_method, *observed);
        let position = plane.project(observed);

        self.path
            .windows(2)
            .map(|leg| project_on_segment(position, plane.project(&leg[0]), plane.project(&leg[1])))
            .min_by(|a, b| a.distance.total_cmp(&b.distance))
            .map(|projection| (plane.unproject(projection.nearest), projection.distance))
    }
}

#[derive(Serialize, Deserialize, JsonSchema, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeviationStatus {
    Active,
    Resolved,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct DeviationRecord {
    pub id: Uuid,
    pub route_id: String,
    pub vehicle_id: String,
    pub planned_stop_ids: Vec<String>,
    pub observed_position: Location,
    pub nearest_planned_point: Location,
    pub distance_meters: f64,
    pub first_detected_at: Timestamp,
    pub last_observed_at: Timestamp,
    pub resolved_at: Option<Timestamp>,
    pub status: DeviationStatus,
}

impl DeviationRecord {
    /// How long the vehicle has been (or was) off its route.
    pub fn duration(&self) -> SignedDuration {
        self.resolved_at
            .unwrap_or(self.last_observed_at)
            .duration_since(self.first_detected_at)
    }

    pub fn is_active(&self) -> bool {
        self.status == DeviationStatus::Active
    }
}

/// Compares one observed position with the planned route.
///
/// - off route, no active record: a new `Active` record
/// - off route, `previous` active: `previous` updated with the new position
/// - back on route, `previous` active: `previous` resolved at `at`
/// - back on route otherwise: `None`
pub fn check_route_deviation(
    planned: &PlannedRoute,
    observed: Location,
    previous: Option<&DeviationRecord>,
    at: Timestamp,
    threshold_meters: f64,
) -> Option<DeviationRecord> {
    let active = previous.filter(|record| record.is_active());
    let (nearest, distance) = planned.nearest_point(&observed)?;

    if distance <= threshold_meters {
        return active.map(|record| DeviationRecord {
            observed_position: observed,
            nearest_planned_point: nearest,
            distance_meters: distance,
            last_observed_at: at,
            resolved_at: Some(at),
            status: DeviationStatus::Resolved,
            ..record.clone()
        });
    }

    Some(match active {
        Some(record) => DeviationRecord {
            observed_position: observed,
            nearest_planned_point: nearest,
            distance_meters: distance,
            last_observed_at: at,
            ..record.clone()
        },
        None => DeviationRecord {
            id: Uuid::new_v4(),
            route_id: planned.route_id.clone(),
            vehicle_id: planned.vehicle_id.clone(),
            planned_stop_ids: planned.stop_ids.clone(),
            observed_position: observed,
            nearest_planned_point: nearest,
            distance_meters: distance,
            first_detected_at: at,
            last_observed_at: at,
            resolved_at: None,
            status: DeviationStatus::Active,
        },
    })
}

#[derive(Debug, Clone, PartialEq)]
pub enum DeviationEvent {
    Opened(DeviationRecord),
    Updated(DeviationRecord),
    Resolved(DeviationRecord),
}

type DeviationListener = Box<dyn Fn(&DeviationEvent) + Send + Sync>;

/// Deviation history of many routes, safe to feed from several GPS streams at once.
///
/// At most one record per route is active, a new one is opened if the vehicle leaves
/// its route again after a resolution.
pub struct DeviationTracker {
    params: DeviationParams,
    records: RwLock<FxHashMap<String, Vec<DeviationRecord>>>,
    listener: Option<DeviationListener>,
}

impl DeviationTracker {
    pub fn new(params: DeviationParams) -> Self {
        DeviationTracker {
            params,
            records: RwLock::new(FxHashMap::default()),
            listener: None,
        }
    }

    pub fn on_event<F>(&mut self, listener: F)
    where
        F: Fn(&DeviationEvent) + Send + Sync + 'static,
    {
        self.listener = Some(Box::new(listener));
    }

    pub fn observe(
        &self,
        planned: &PlannedRoute,
        observed: Location,
        at: Timestamp,
    ) -> Option<DeviationRecord> {
        let event = {
            let mut records = self.records.write();
            let history = records.entry(planned.route_id.clone()).or_default();
            let previous = history.last().filter(|record| record.is_active());

            let record = check_route_deviation(
                planned,
                observed,
                previous,
                at,
                self.params.threshold_meters,
            )?;

            let event = match (previous.is_some(), record.status) {
                (false, _) => DeviationEvent::Opened(record.clone()),
                (true, DeviationStatus::Active) => DeviationEvent::Updated(record.clone()),
                (true, DeviationStatus::Resolved) => DeviationEvent::Resolved(record.clone()),
            };

            match event {
                DeviationEvent::Opened(_) => history.push(record),
                _ => {
                    if let Some(last) = history.last_mut() {
                        *last = record;
                    }
                }
            }

            event
        };

        match &event {
            DeviationEvent::Opened(record) => warn!(
                route = %record.route_id,
                "Vehicle {} is {:.0} m off its route",
                record.vehicle_id,
                record.distance_meters
            ),
            DeviationEvent::Resolved(record) => info!(
                route = %record.route_id,
                "Vehicle {} is back on its route after {:?}",
                record.vehicle_id,
                record.duration()
            ),
            DeviationEvent::Updated(_) => {}
        }

        if let Some(listener) = &self.listener {
            listener(&event);
        }

        match event {
            DeviationEvent::Opened(record)
            | DeviationEvent::Updated(record)
            | DeviationEvent::Resolved(record) => Some(record),
        }
    }

    pub fn active(&self, route_id: &str) -> Option<DeviationRecord> {
        self.records
            .read()
            .get(route_id)
            .and_then(|history| history.last())
            .filter(|record| record.is_active())
            .cloned()
    }

    /// Every record of the route, oldest first.
    pub fn history(&self, route_id: &str) -> Vec<DeviationRecord> {
        self.records
            .read()
            .get(route_id)
            .cloned()
            .unwrap_or_default()
    }
}

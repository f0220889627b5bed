use jiff::{SignedDuration, Timestamp};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::instrument;
use waypoint_matrix_providers::{
    cache::MatricesCache, traffic_profile::TrafficProfile,
    travel_matrix_client::TravelMatrixClient, travel_matrix_provider::TravelMatrixProvider,
};

use crate::{
    problem::{
        distance_method::DistanceMethod,
        load::{Capacity, Load},
        location::Location,
        route_problem::{DEFAULT_SPEED_KMH, RouteProblem, RouteProblemBuilder},
        stop::{Priority, Stop, StopBuilder, StopStatus},
        time_window::TimeWindow,
        travel_matrices::TravelMatrices,
        vehicle::{Vehicle, VehicleBuilder},
    },
    simulation::{
        compare_routes::ComparisonWeights, deviation::DeviationParams, scenario::Scenario,
        simulate_route::SimulationOptions,
    },
    solver::{
        optimize::{Algorithm, OptimizationOptions},
        solver_params::TwoOptParams,
    },
};

/// One vehicle's route: everything needed to build a [`RouteProblem`] plus how to
/// optimize it.
#[derive(Deserialize, JsonSchema)]
#[serde(deny_unknown_fields, rename = "RouteRequest")]
pub struct JsonRouteRequest {
    pub id: Option<String>,
    pub locations: Vec<JsonLocation>,
    pub stops: Vec<JsonStop>,
    pub vehicle: JsonVehicle,

    /// `haversine` reads coordinates as `[lon, lat]`, `euclidean` as `[x, y]` in meters.
    pub distance_method: Option<DistanceMethod>,
    pub travel_matrix_provider: Option<TravelMatrixProvider>,
    pub traffic: Option<TrafficProfile>,
    pub departure_time: Option<Timestamp>,

    /// Committed order, as stop ids.
    pub current_order: Option<Vec<String>>,
    pub algorithm: Option<Algorithm>,
    pub options: Option<OptimizationOptions>,
}

#[derive(Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields, rename = "Location")]
pub struct JsonLocation {
    pub coordinates: [f64; 2],
}

impl JsonLocation {
    fn to_location(&self, distance_method: DistanceMethod) -> Location {
        match distance_method {
            DistanceMethod::Haversine => {
                Location::from_lat_lon(self.coordinates[1], self.coordinates[0])
            }
            DistanceMethod::Euclidean => {
                Location::from_cartesian(self.coordinates[0], self.coordinates[1])
            }
        }
    }
}

#[derive(Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields, rename = "Stop")]
pub struct JsonStop {
    pub id: String,
    pub location_id: usize,
    pub demand: Option<Load>,
    pub service_duration: Option<SignedDuration>,
    pub time_window: Option<TimeWindow>,
    pub priority: Option<Priority>,
    pub status: Option<StopStatus>,
}

impl From<&JsonStop> for Stop {
    fn from(value: &JsonStop) -> Self {
        let mut builder = StopBuilder::default();

        builder.set_external_id(value.id.clone());
        builder.set_location_id(value.location_id);

        if let Some(demand) = value.demand {
            builder.set_demand(demand);
        }

        if let Some(service_duration) = value.service_duration {
            builder.set_service_duration(service_duration);
        }

        if let Some(time_window) = value.time_window {
            builder.set_time_window(time_window);
        }

        if let Some(priority) = value.priority {
            builder.set_priority(priority);
        }

        if let Some(status) = value.status {
            builder.set_status(status);
        }

        builder.build()
    }
}

#[derive(Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields, rename = "Vehicle")]
pub struct JsonVehicle {
    pub id: String,
    pub capacity: Capacity,

    /// Current position of the vehicle, the depot when empty.
    pub start_location_id: Option<usize>,
    pub depot_location_id: Option<usize>,
    pub should_return_to_depot: Option<bool>,
    pub fuel_consumption: Option<f64>,
    pub cost_per_km: Option<f64>,
}

impl JsonVehicle {
    fn build(&self) -> Result<Vehicle, anyhow::Error> {
        let mut builder = VehicleBuilder::default();

        builder.set_vehicle_id(self.id.clone());
        builder.set_capacity(self.capacity);

        if let Some(start_location_id) = self.start_location_id {
            builder.set_start_location_id(start_location_id);
        }

        if let Some(depot_location_id) = self.depot_location_id {
            builder.set_depot_location_id(depot_location_id);
        }

        if let Some(should_return) = self.should_return_to_depot {
            builder.set_return(should_return);
        }

        if let Some(fuel_consumption) = self.fuel_consumption {
            builder.set_fuel_consumption(fuel_consumption);
        }

        if let Some(cost_per_km) = self.cost_per_km {
            builder.set_cost_per_km(cost_per_km);
        }

        Ok(builder.build()?)
    }
}

impl JsonRouteRequest {
    pub fn route_id(&self) -> &str {
        self.id.as_deref().unwrap_or(&self.vehicle.id)
    }

    #[instrument(skip_all, level = "debug")]
    pub fn build_problem(
        &self,
        client: &TravelMatrixClient<impl MatricesCache>,
    ) -> Result<RouteProblem, anyhow::Error> {
        let distance_method = self.distance_method.unwrap_or_default();

        let locations = self
            .locations
            .iter()
            .map(|location| location.to_location(distance_method))
            .collect::<Vec<_>>();

        let provider = self
            .travel_matrix_provider
            .clone()
            .unwrap_or_else(|| match distance_method {
                DistanceMethod::Haversine => TravelMatrixProvider::AsTheCrowFlies {
                    speed_kmh: DEFAULT_SPEED_KMH,
                },
                DistanceMethod::Euclidean => TravelMatrixProvider::Euclidean {
                    speed_meters_per_second: DEFAULT_SPEED_KMH / 3.6,
                },
            });

        let matrices = client.fetch_matrix(&locations, provider)?;

        let mut builder = RouteProblemBuilder::default();
        builder
            .set_stops(self.stops.iter().map(Stop::from).collect())
            .set_vehicle(self.vehicle.build()?)
            .set_matrices(TravelMatrices::from_provider(matrices)?)
            .set_locations(locations)
            .set_distance_method(distance_method);

        if let Some(traffic) = &self.traffic {
            builder.set_traffic(traffic.clone());
        }

        if let Some(departure_time) = self.departure_time {
            builder.set_departure_time(departure_time);
        }

        Ok(builder.build()?)
    }
}

#[derive(Deserialize, JsonSchema)]
#[serde(deny_unknown_fields, rename = "BatchRequest")]
pub struct JsonBatchRequest {
    pub routes: Vec<JsonRouteRequest>,
    pub threads: Option<usize>,
    /// Budget of every route without one of its own.
    pub route_time_budget: Option<SignedDuration>,
}

#[derive(Deserialize, JsonSchema)]
#[serde(deny_unknown_fields, rename = "Simulation")]
pub struct JsonSimulation {
    pub name: String,
    pub route: JsonRouteRequest,
    pub start_time: Timestamp,
    pub options: Option<SimulationOptions>,
}

#[derive(Deserialize, JsonSchema)]
#[serde(deny_unknown_fields, rename = "CompareRequest")]
pub struct JsonCompareRequest {
    pub simulations: Vec<JsonSimulation>,
    pub weights: Option<ComparisonWeights>,
}

/// Scenarios derived from the committed order of `route`.
#[derive(Deserialize, JsonSchema)]
#[serde(deny_unknown_fields, rename = "ScenarioRequest")]
pub struct JsonScenarioRequest {
    pub route: JsonRouteRequest,
    pub scenarios: Vec<Scenario>,
    pub two_opt: Option<TwoOptParams>,
}

#[derive(Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields, rename = "GpsFix")]
pub struct JsonGpsFix {
    pub coordinates: [f64; 2],
    pub at: Timestamp,
}

impl JsonGpsFix {
    pub fn to_location(&self, distance_method: DistanceMethod) -> Location {
        JsonLocation {
            coordinates: self.coordinates,
        }
        .to_location(distance_method)
    }
}

/// GPS trace replayed against the committed order of `route`.
#[derive(Deserialize, JsonSchema)]
#[serde(deny_unknown_fields, rename = "DeviationRequest")]
pub struct JsonDeviationRequest {
    pub route: JsonRouteRequest,
    pub positions: Vec<JsonGpsFix>,
    pub params: Option<DeviationParams>,
}

#[cfg(test)]
mod tests {
    use waypoint_matrix_providers::cache::NoCache;

    use crate::problem::{route_problem::Waypoint, stop::StopIdx};

    use super::*;

    const REQUEST: &str = r#"{
        "id": "route-7",
        "distance_method": "euclidean",
        "locations": [
            { "coordinates": [0.0, 0.0] },
            { "coordinates": [300.0, 400.0] },
            { "coordinates": [600.0, 800.0] }
        ],
        "stops": [
            { "id": "a", "location_id": 1, "priority": "URGENT" },
            {
                "id": "b",
                "location_id": 2,
                "demand": { "parcels": 2, "weight_kg": 15.0, "volume_m3": 0.2 },
                "service_duration": "PT2M"
            }
        ],
        "vehicle": {
            "id": "van-3",
            "capacity": { "max_weight_kg": 800.0, "max_volume_m3": 6.0 },
            "depot_location_id": 0,
            "should_return_to_depot": true
        },
        "current_order": ["b", "a"],
        "algorithm": "GENETIC"
    }"#;

    #[test]
    fn test_build_problem() {
        let request: JsonRouteRequest = serde_json::from_str(REQUEST).unwrap();
        let client = TravelMatrixClient::new(NoCache);

        let problem = request.build_problem(&client).unwrap();

        assert_eq!(request.route_id(), "route-7");
        assert_eq!(request.algorithm, Some(Algorithm::Genetic));
        assert_eq!(problem.num_stops(), 2);
        assert_eq!(problem.stop(StopIdx::new(0)).priority(), Priority::Urgent);
        assert_eq!(
            problem.stop(StopIdx::new(1)).service_duration(),
            SignedDuration::from_mins(2)
        );
        assert!(problem.has_end());
        assert_eq!(
            problem.travel_distance(Waypoint::Start, Waypoint::Stop(StopIdx::new(1))),
            Ok(1000.0)
        );
    }

    #[test]
    fn test_haversine_coordinates_are_lon_lat() {
        let location = JsonLocation {
            coordinates: [26.1025, 44.4268],
        }
        .to_location(DistanceMethod::Haversine);

        assert_eq!(location.lat(), 44.4268);
        assert_eq!(location.lon(), 26.1025);
    }

    #[test]
    fn test_unknown_fields_are_rejected() {
        let result = serde_json::from_str::<JsonStop>(r#"{"id": "a", "location_id": 1, "x": 2}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_vehicle_without_location_is_an_error() {
        let vehicle = JsonVehicle {
            id: "van-9".to_owned(),
            capacity: Capacity::new(100.0, 1.0),
            start_location_id: None,
            depot_location_id: None,
            should_return_to_depot: None,
            fuel_consumption: None,
            cost_per_km: None,
        };

        assert!(vehicle.build().is_err());
    }
}

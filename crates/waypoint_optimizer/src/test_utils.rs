use jiff::{SignedDuration, Timestamp};
use waypoint_matrix_providers::traffic_profile::TrafficProfile;

use crate::problem::{
    distance_method::DistanceMethod,
    load::{Capacity, Load},
    location::Location,
    route_problem::{RouteProblem, RouteProblemBuilder},
    stop::{Stop, StopBuilder},
    time_window::TimeWindow,
    travel_matrices::TravelMatrices,
    vehicle::VehicleBuilder,
};

/// Speed of every euclidean test problem, so that 10 meters take 1 second.
pub const TEST_SPEED: f64 = 10.0;

pub struct TestProblem<'a> {
    pub start: (f64, f64),
    pub points: &'a [(f64, f64)],
    pub return_to_depot: bool,
    pub capacity_kg: f64,
    pub weights: Option<&'a [f64]>,
    pub departure_time: Option<Timestamp>,
    pub time_windows: Vec<(usize, TimeWindow)>,
    pub service_duration: SignedDuration,
    pub traffic: TrafficProfile,
}

impl Default for TestProblem<'_> {
    fn default() -> Self {
        TestProblem {
            start: (0.0, 0.0),
            points: &[],
            return_to_depot: false,
            capacity_kg: 1000.0,
            weights: None,
            departure_time: None,
            time_windows: Vec::new(),
            service_duration: SignedDuration::ZERO,
            traffic: TrafficProfile::default(),
        }
    }
}

pub fn ts(value: &str) -> Timestamp {
    value.parse().unwrap()
}

pub fn create_test_stops(test: &TestProblem) -> Vec<Stop> {
    test.points
        .iter()
        .enumerate()
        .map(|(index, _)| {
            let mut builder = StopBuilder::default();
            builder
                .set_external_id(format!("s{index}"))
                .set_location_id(index + 1)
                .set_service_duration(test.service_duration)
                .set_demand(Load::new(
                    1,
                    test.weights.map_or(10.0, |weights| weights[index]),
                    0.1,
                ));

            if let Some((_, time_window)) = test
                .time_windows
                .iter()
                .find(|(stop_index, _)| *stop_index == index)
            {
                builder.set_time_window(*time_window);
            }

            builder.build()
        })
        .collect()
}

/// Location 0 is the vehicle start, stop `i` sits at location `i + 1`.
pub fn create_test_problem(test: TestProblem) -> RouteProblem {
    let locations = std::iter::once(test.start)
        .chain(test.points.iter().copied())
        .map(|(x, y)| Location::from_cartesian(x, y))
        .collect::<Vec<_>>();

    let mut vehicle = VehicleBuilder::default();
    vehicle
        .set_vehicle_id("van-1")
        .set_capacity(Capacity::new(test.capacity_kg, 100.0))
        .set_start_location_id(0)
        .set_return(test.return_to_depot)
        .set_fuel_consumption(10.0);

    let mut builder = RouteProblemBuilder::default();
    builder
        .set_stops(create_test_stops(&test))
        .set_matrices(TravelMatrices::from_euclidean(&locations, TEST_SPEED))
        .set_locations(locations)
        .set_vehicle(vehicle.build().unwrap())
        .set_traffic(test.traffic)
        .set_distance_method(DistanceMethod::Euclidean);

    if let Some(departure_time) = test.departure_time {
        builder.set_departure_time(departure_time);
    }

    builder.build().unwrap()
}

pub fn euclidean_problem(points: &[(f64, f64)]) -> RouteProblem {
    create_test_problem(TestProblem {
        points,
        ..TestProblem::default()
    })
}

/// Stops on the x axis, the vehicle starts at the origin.
pub fn line_problem(xs: &[f64]) -> RouteProblem {
    let points = xs.iter().map(|&x| (x, 0.0)).collect::<Vec<_>>();
    euclidean_problem(&points)
}

pub fn line_problem_returning(xs: &[f64]) -> RouteProblem {
    let points = xs.iter().map(|&x| (x, 0.0)).collect::<Vec<_>>();
    create_test_problem(TestProblem {
        points: &points,
        return_to_depot: true,
        ..TestProblem::default()
    })
}

/// Stops "a" and "b", the matrices have no leg from the start to "b".
pub fn problem_with_missing_leg() -> RouteProblem {
    let locations = vec![
        Location::from_cartesian(0.0, 0.0),
        Location::from_cartesian(100.0, 0.0),
        Location::from_cartesian(200.0, 0.0),
    ];

    let matrices = TravelMatrices::from_rows(
        vec![
            vec![Some(0.0), Some(100.0), None],
            vec![Some(100.0), Some(0.0), Some(100.0)],
            vec![Some(200.0), Some(100.0), Some(0.0)],
        ],
        vec![
            vec![Some(0.0), Some(10.0), None],
            vec![Some(10.0), Some(0.0), Some(10.0)],
            vec![Some(20.0), Some(10.0), Some(0.0)],
        ],
    )
    .unwrap();

    let stops = ["a", "b"]
        .iter()
        .enumerate()
        .map(|(index, id)| {
            let mut builder = StopBuilder::default();
            builder
                .set_external_id(*id)
                .set_location_id(index + 1)
                .set_demand(Load::weight(10.0));
            builder.build()
        })
        .collect();

    let mut vehicle = VehicleBuilder::default();
    vehicle
        .set_vehicle_id("van-1")
        .set_capacity(Capacity::new(1000.0, 100.0))
        .set_start_location_id(0);

    let mut builder = RouteProblemBuilder::default();
    builder
        .set_locations(locations)
        .set_stops(stops)
        .set_vehicle(vehicle.build().unwrap())
        .set_matrices(matrices)
        .set_distance_method(DistanceMethod::Euclidean);

    builder.build().unwrap()
}

/// Same problem, different matrices.
pub fn with_matrices(problem: &RouteProblem, matrices: TravelMatrices) -> RouteProblem {
    let mut builder = RouteProblemBuilder::default();
    builder
        .set_locations(problem.locations().to_vec())
        .set_stops(problem.stops().to_vec())
        .set_vehicle(problem.vehicle().clone())
        .set_matrices(matrices)
        .set_traffic(problem.traffic().clone())
        .set_distance_method(problem.distance_method());

    if let Some(departure_time) = problem.departure_time() {
        builder.set_departure_time(departure_time);
    }

    builder.build().unwrap()
}

use waypoint_optimizer::problem::{
    distance_method::DistanceMethod,
    load::{Capacity, Load},
    location::Location,
    route_problem::{RouteProblem, RouteProblemBuilder},
    stop::StopBuilder,
    travel_matrices::TravelMatrices,
    vehicle::VehicleBuilder,
};

/// Meters per second of every test problem.
pub const SPEED: f64 = 10.0;

/// Depot at the origin (location 0), stop `i` at location `i + 1`, coordinates in meters.
pub fn problem(stops: &[(&str, f64, f64)], return_to_depot: bool) -> RouteProblem {
    let locations = std::iter::once(Location::from_cartesian(0.0, 0.0))
        .chain(stops.iter().map(|&(_, x, y)| Location::from_cartesian(x, y)))
        .collect::<Vec<_>>();
    let matrices = TravelMatrices::from_euclidean(&locations, SPEED);

    problem_with_matrices(stops, locations, matrices, return_to_depot)
}

pub fn problem_with_matrices(
    stops: &[(&str, f64, f64)],
    locations: Vec<Location>,
    matrices: TravelMatrices,
    return_to_depot: bool,
) -> RouteProblem {
    let stops = stops
        .iter()
        .enumerate()
        .map(|(index, &(id, _, _))| {
            let mut builder = StopBuilder::default();
            builder
                .set_external_id(id)
                .set_location_id(index + 1)
                .set_demand(Load::new(1, 10.0, 0.1));
            builder.build()
        })
        .collect();

    let mut vehicle = VehicleBuilder::default();
    vehicle
        .set_vehicle_id("van")
        .set_capacity(Capacity::new(10_000.0, 100.0))
        .set_depot_location_id(0)
        .set_return(return_to_depot);

    let mut builder = RouteProblemBuilder::default();
    builder
        .set_locations(locations)
        .set_matrices(matrices)
        .set_stops(stops)
        .set_vehicle(vehicle.build().unwrap())
        .set_distance_method(DistanceMethod::Euclidean);

    builder.build().unwrap()
}

/// Same stops, but the matrices have no data to or from the last one.
pub fn problem_with_unreachable_stop(stops: &[(&str, f64, f64)]) -> RouteProblem {
    let locations = std::iter::once(Location::from_cartesian(0.0, 0.0))
        .chain(stops.iter().map(|&(_, x, y)| Location::from_cartesian(x, y)))
        .collect::<Vec<_>>();
    let isolated = locations.len() - 1;

    let rows = |per_meter: f64| {
        locations
            .iter()
            .enumerate()
            .map(|(from, a)| {
                locations
                    .iter()
                    .enumerate()
                    .map(|(to, b)| {
                        let reachable = from == to || (from != isolated && to != isolated);
                        reachable.then(|| a.euclidean_distance(b) * per_meter)
                    })
                    .collect()
            })
            .collect::<Vec<Vec<Option<f64>>>>()
    };

    let matrices = TravelMatrices::from_rows(rows(1.0), rows(1.0 / SPEED)).unwrap();
    problem_with_matrices(stops, locations, matrices, false)
}

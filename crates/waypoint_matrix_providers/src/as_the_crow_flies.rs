use geo::{Distance, Euclidean, Haversine};

use crate::travel_matrices::TravelMatrices;

fn build_matrices<P>(
    points: &[P],
    speed_meters_per_second: f64,
    distance: impl Fn(geo_types::Point, geo_types::Point) -> f64,
) -> TravelMatrices
where
    for<'a> &'a P: Into<geo_types::Point>,
{
    let points = points.iter().map(|p| p.into()).collect::<Vec<_>>();
    let num_locations = points.len();
    let mut distances = Vec::with_capacity(num_locations * num_locations);
    let mut times = Vec::with_capacity(num_locations * num_locations);

    for &from in &points {
        for &to in &points {
            let meters = distance(from, to);
            distances.push(Some(meters));
            times.push(Some(meters / speed_meters_per_second));
        }
    }

    TravelMatrices { distances, times }
}

/// Great-circle distances between lon/lat points, travel time at a constant speed.
pub fn as_the_crow_flies_matrices<P>(points: &[P], speed_kmh: f64) -> TravelMatrices
where
    for<'a> &'a P: Into<geo_types::Point>,
{
    build_matrices(points, speed_kmh / 3.6, |from, to| {
        Haversine.distance(from, to)
    })
}

/// Straight-line distances between cartesian points, coordinates are read as meters.
pub fn euclidean_matrices<P>(points: &[P], speed_meters_per_second: f64) -> TravelMatrices
where
    for<'a> &'a P: Into<geo_types::Point>,
{
    build_matrices(points, speed_meters_per_second, |from, to| {
        Euclidean.distance(&from, &to)
    })
}

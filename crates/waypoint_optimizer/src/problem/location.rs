use geo::{Distance, Euclidean, Haversine};
use serde::{Deserialize, Serialize};

use crate::define_index_newtype;

use super::distance_method::DistanceMethod;

define_index_newtype!(LocationIdx, Location);

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct Location {
    point: geo::Point,
}

impl Location {
    pub fn from_cartesian(x: f64, y: f64) -> Self {
        Self {
            point: geo::Point::new(x, y),
        }
    }

    pub fn from_lat_lon(lat: f64, lon: f64) -> Self {
        Self {
            point: geo::Point::new(lon, lat),
        }
    }

    pub fn x(&self) -> f64 {
        self.point.x()
    }

    pub fn y(&self) -> f64 {
        self.point.y()
    }

    pub fn lon(&self) -> f64 {
        self.point.x()
    }

    pub fn lat(&self) -> f64 {
        self.point.y()
    }

    pub fn point(&self) -> geo::Point {
        self.point
    }

    pub fn euclidean_distance(&self, to: &Location) -> f64 {
        Euclidean.distance(&self.point, &to.point)
    }

    pub fn haversine_distance(&self, to: &Location) -> f64 {
        Haversine.distance(self.point, to.point)
    }

    pub fn distance(&self, to: &Location, method: DistanceMethod) -> f64 {
        match method {
            DistanceMethod::Haversine => self.haversine_distance(to),
            DistanceMethod::Euclidean => self.euclidean_distance(to),
        }
    }
}

impl From<&Location> for geo::Point<f64> {
    fn from(location: &Location) -> Self {
        location.point
    }
}

impl From<&Location> for geo::Coord<f64> {
    fn from(location: &Location) -> Self {
        geo::Coord {
            x: location.x(),
            y: location.y(),
        }
    }
}
